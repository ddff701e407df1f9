mod category;
mod namespace;
mod record;
mod status;

pub use category::*;
pub use namespace::*;
pub use record::*;
pub use status::*;
