mod node;
#[cfg(test)]
mod tests;
mod worker;

pub use node::*;
pub use worker::*;
