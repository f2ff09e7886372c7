//! Generator tuning knobs.

use serde::{Deserialize, Serialize};

/// Settings that shape the values the engine samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Probability that a nullable property or parameter is absent.
    pub absent_probability: f64,

    /// String length upper bound when `maxLength` is not declared.
    pub default_max_length: usize,

    /// Array size upper bound when `maxItems` is not declared.
    pub default_max_items: usize,

    /// Number of entries in a loosely-typed map.
    pub map_size: usize,

    /// Numeric draws come from `[-numeric_span, numeric_span]` besides the
    /// edge values.
    pub numeric_span: i64,

    /// Nesting budget for definition references. Past it, nullable fields
    /// come out absent and references sample to null.
    pub max_depth: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            absent_probability: 0.5,
            default_max_length: 5,
            default_max_items: 5,
            map_size: 4,
            numeric_span: 100,
            max_depth: 8,
        }
    }
}
