//! # zmsync-client
//!
//! Typed access to the Athenz ZMS API.
//!
//! [`ZmsClient`] is the facade the reconcilers consume; [`HttpZmsClient`] is
//! the blocking HTTP implementation. With the `test-support` feature,
//! [`memory::MemoryZms`] provides an in-memory backend that journals calls.

pub mod api;
pub mod error;
pub mod http;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod model;

pub use api::ZmsClient;
pub use error::{ClientError, ClientResult};
pub use http::HttpZmsClient;
