mod interface;
mod random;
mod sequential;
#[cfg(test)]
mod tests;

pub use interface::*;
pub use random::*;
pub use sequential::*;
