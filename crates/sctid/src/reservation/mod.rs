mod interface;
mod range;
mod registry;
mod single;

pub use interface::*;
pub use range::*;
pub use registry::*;
pub use single::*;
