#![doc = include_str!("../README.md")]

mod allocator;
mod codec;
mod error;
mod generator;
mod id;
mod rand;
mod reservation;
mod store;

pub use crate::allocator::*;
pub use crate::codec::*;
pub use crate::error::*;
pub use crate::generator::*;
pub use crate::id::*;
pub use crate::rand::*;
pub use crate::reservation::*;
pub use crate::store::*;
