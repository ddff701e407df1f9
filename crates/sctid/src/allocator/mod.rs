mod bulk;
mod cancel;
mod config;
mod lifecycle;
mod transition;

pub use bulk::*;
pub use cancel::*;
pub use config::*;
pub use lifecycle::*;
pub use transition::*;
