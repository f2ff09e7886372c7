//! restfuzz Core - Core types for the API fuzzer.
//!
//! This crate provides the types shared by every other restfuzz crate:
//!
//! - [`schema`]: the typed model of an API surface (definitions, endpoints, parameters)
//! - [`value`]: values produced by samplers
//! - [`request`]: concrete requests and the [`RequestBuilder`] that validates them
//! - [`transcript`]: `curl` rendering of concrete requests
//! - [`error`]: configuration and specification errors
//!
//! # Example
//!
//! ```
//! use restfuzz_core::{EndpointIdentity, Method, ParameterBundle, RequestBuilder, Value};
//!
//! let identity = EndpointIdentity::new(Method::Get, "http://localhost:8080", "/items/{id}");
//! let mut bundle = ParameterBundle::default();
//! bundle.path.insert("id".to_string(), Value::from(42));
//!
//! let request = RequestBuilder::build(&identity, bundle).unwrap();
//! assert_eq!(request.url, "http://localhost:8080/items/42");
//! assert_eq!(request.to_string(), "curl -v -X GET 'http://localhost:8080/items/42'");
//! ```

pub mod error;
pub mod request;
pub mod schema;
pub mod transcript;
pub mod value;

pub use error::{ConfigurationError, SpecificationError};
pub use request::{ConcreteRequest, EndpointIdentity, ParameterBundle, RequestBuilder};
pub use schema::{
    ApiModel, ArrayType, Constraints, Endpoint, Location, Method, ObjectType, Parameter,
    ParameterSchema, PrimitiveKind, PrimitiveType, SimpleSchema, Type,
};
pub use value::Value;
