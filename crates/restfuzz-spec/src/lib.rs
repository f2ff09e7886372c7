//! restfuzz Spec - Swagger 2.0 ingestion
//!
//! Reads a Swagger 2.0 document (JSON or YAML, from a file or an `http(s)`
//! URL) and converts it into the [`ApiModel`](restfuzz_core::ApiModel) the
//! generator consumes.
//!
//! # Example
//!
//! ```
//! use restfuzz_core::Method;
//!
//! let model = restfuzz_spec::parse_document(r#"{
//!     "swagger": "2.0",
//!     "paths": {
//!         "/items/{id}": {
//!             "get": {
//!                 "parameters": [{"name": "id", "in": "path", "type": "integer"}],
//!                 "responses": {"404": {"description": "missing"}}
//!             }
//!         }
//!     }
//! }"#).unwrap();
//!
//! let endpoint = model.find_endpoint(Method::Get, "/items/{id}").unwrap();
//! assert!(endpoint.declared_responses.contains(&404));
//! ```

pub mod document;
pub mod error;
mod loader;

pub use document::SwaggerDocument;
pub use error::LoadError;
pub use loader::{convert, load, load_file, parse_document, parse_swagger};
