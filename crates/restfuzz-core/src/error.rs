//! Error types for the fuzzing engine.
//!
//! Configuration errors describe a malformed or unsupported API description
//! and are raised while samplers are built, before any request is sent.
//! Specification errors describe an endpoint whose parameters contradict each
//! other and are raised when a concrete request is assembled.

use thiserror::Error;

/// Malformed or unsupported API description.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// A reference names a definition that does not exist.
    #[error("definition `{name}` referenced from {context} is not defined")]
    DanglingReference { name: String, context: String },

    /// An endpoint declares more than one body parameter.
    #[error("endpoint {endpoint} declares more than one body parameter (`{first}` and `{second}`)")]
    MultipleBodyParameters {
        endpoint: String,
        first: String,
        second: String,
    },

    /// The parameter's type, format and location are not a supported combination.
    #[error("unsupported parameter `{parameter}` of endpoint {endpoint}: {reason}")]
    UnsupportedParameter {
        endpoint: String,
        parameter: String,
        reason: String,
    },

    /// HEAD, OPTIONS and anything else outside GET/POST/PUT/PATCH/DELETE.
    #[error("unsupported HTTP method `{0}`")]
    UnsupportedMethod(String),

    /// A schema construct the engine cannot sample.
    #[error("unsupported schema at {context}: {reason}")]
    UnsupportedSchema { context: String, reason: String },
}

impl ConfigurationError {
    /// Creates a new dangling reference error.
    pub fn dangling_reference(name: impl Into<String>, context: impl Into<String>) -> Self {
        Self::DanglingReference {
            name: name.into(),
            context: context.into(),
        }
    }

    /// Creates a new unsupported parameter error.
    pub fn unsupported_parameter(
        endpoint: impl Into<String>,
        parameter: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::UnsupportedParameter {
            endpoint: endpoint.into(),
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new unsupported schema error.
    pub fn unsupported_schema(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedSchema {
            context: context.into(),
            reason: reason.into(),
        }
    }
}

/// An endpoint whose sampled parameters cannot form a valid request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecificationError {
    #[error("error in specification of {endpoint}; GET requests cannot carry a body")]
    GetWithBody { endpoint: String },

    #[error("error in specification of {endpoint}; GET requests cannot carry form fields")]
    GetWithForm { endpoint: String },

    #[error("error in specification of {endpoint}; cannot have both body and form parameters")]
    BodyAndForm { endpoint: String },
}

impl SpecificationError {
    /// The endpoint the error was raised for.
    pub fn endpoint(&self) -> &str {
        match self {
            Self::GetWithBody { endpoint }
            | Self::GetWithForm { endpoint }
            | Self::BodyAndForm { endpoint } => endpoint,
        }
    }
}
