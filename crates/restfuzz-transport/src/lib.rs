//! restfuzz Transport - Sends concrete requests to the server under test.
//!
//! The fuzzer only needs one thing from the network: the status code a
//! request produced. [`Transport`] is that seam; [`HttpTransport`] is the
//! real implementation and tests substitute their own.
//!
//! # Modules
//!
//! - [`http`]: `reqwest`-backed transport and its configuration
//! - [`error`]: transport-specific error types

pub mod error;
pub mod http;

use async_trait::async_trait;

use restfuzz_core::ConcreteRequest;

pub use error::{TransportError, TransportResult};
pub use http::{HttpTransport, TransportConfig};

/// Executes one request and reports the response status code.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ConcreteRequest) -> TransportResult<u16>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, request: &ConcreteRequest) -> TransportResult<u16> {
        (**self).send(request).await
    }
}
