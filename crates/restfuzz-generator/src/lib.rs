//! restfuzz Generator - Schema-aware value samplers
//!
//! This crate turns the schema model into samplers: pure functions from a
//! seeded random source to a value. Recursive and mutually recursive
//! definitions are supported through late-binding reference samplers.
//!
//! # Core Concepts
//!
//! - [`Sampler`]: a shareable, repeatable value sampler
//! - [`GeneratorEngine`]: builds definition and parameter samplers
//! - [`EndpointSampler`]: draws whole requests for one endpoint
//!
//! # Combinators
//!
//! - [`sequence`]: many samplers become one sampler of their ordered outputs
//! - [`constant`], [`one_of`], [`weighted`], [`pick`]: choices
//! - [`nullable`]: sometimes absent
//! - [`list_of`]: bounded-size lists
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use rand::SeedableRng;
//! use restfuzz_core::{Type, Value};
//! use restfuzz_generator::{GeneratorEngine, RandomSource};
//!
//! let definitions = BTreeMap::from([(
//!     "Node".to_string(),
//!     Type::object([
//!         ("value", Type::int32()),
//!         ("next", Type::array(Type::reference("Node"))),
//!     ]),
//! )]);
//!
//! let engine = GeneratorEngine::new(&definitions).unwrap();
//! let node = engine.definition("Node").unwrap();
//!
//! let mut rng = RandomSource::seed_from_u64(42);
//! assert!(matches!(node.sample(&mut rng), Value::Object(_)));
//! ```

pub mod combinators;
mod config;
mod endpoint;
mod engine;
mod primitives;
mod sampler;

pub use combinators::{constant, list_of, nullable, one_of, pick, sequence, weighted};
pub use config::GeneratorConfig;
pub use endpoint::{EndpointSampler, ParameterSamplers};
pub use engine::GeneratorEngine;
pub use primitives::{current_instant, float_sampler, integer_sampler, string_sampler};
pub use sampler::{RandomSource, Sampler};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::combinators::{constant, list_of, nullable, one_of, pick, sequence, weighted};
    pub use crate::config::GeneratorConfig;
    pub use crate::endpoint::{EndpointSampler, ParameterSamplers};
    pub use crate::engine::GeneratorEngine;
    pub use crate::sampler::{RandomSource, Sampler};
}
