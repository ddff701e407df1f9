mod sctid;
mod verhoeff;

pub use sctid::*;
pub use verhoeff::{compute_check_digit, verify_check_digit};
