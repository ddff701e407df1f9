//! HTTP service implementation and bulk job dispatch.
//!
//! ## Structure
//!
//! - [`handler`] - `SctidService` and the axum router.
//! - [`request`] - JSON bodies and query strings.

pub mod handler;
pub mod request;

#[cfg(test)]
mod tests;
