//! Per-kind sampling policy for primitive types.

use chrono::{SecondsFormat, Utc};
use rand::Rng;

use restfuzz_core::{Constraints, PrimitiveKind, PrimitiveType, Value};

use crate::combinators::{constant, pick, weighted};
use crate::config::GeneratorConfig;
use crate::sampler::Sampler;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Weight of the ordinary range draw relative to each edge value.
const RANGE_WEIGHT: f64 = 6.0;
const EDGE_WEIGHT: f64 = 1.0;

/// The current instant as an RFC 3339 string.
pub fn current_instant() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Build the sampler for one primitive.
///
/// A non-empty enumeration always wins over the kind's own policy. `now` is
/// the instant every datetime sample reports.
pub fn primitive_sampler(
    primitive: &PrimitiveType,
    config: &GeneratorConfig,
    now: &str,
) -> Sampler<Value> {
    if let Some(values) = primitive.enum_values.as_ref().filter(|v| !v.is_empty()) {
        return pick(values.clone());
    }

    let constraints = &primitive.constraints;
    let span = config.numeric_span;
    match primitive.kind {
        PrimitiveKind::Int32 => {
            integer_sampler(i32::MIN.into(), i32::MAX.into(), constraints, span).map(Value::Int)
        }
        PrimitiveKind::Int64 => {
            integer_sampler(i64::MIN, i64::MAX, constraints, span).map(Value::Int)
        }
        PrimitiveKind::Float32 => float_sampler(f32::MIN.into(), f32::MAX.into(), constraints, span)
            .map(|x| Value::Float(x as f32 as f64)),
        PrimitiveKind::Float64 => {
            float_sampler(f64::MIN, f64::MAX, constraints, span).map(Value::Float)
        }
        PrimitiveKind::String => {
            let min = constraints.min_length.unwrap_or(0);
            let max = constraints
                .max_length
                .unwrap_or_else(|| config.default_max_length.max(min));
            string_sampler(min, max).map(Value::String)
        }
        PrimitiveKind::Boolean => Sampler::new(|rng| Value::Bool(rng.r#gen())),
        PrimitiveKind::DateTime => constant(Value::String(now.to_string())),
    }
}

/// Integers from `[-span, span]`, with the lower and upper bound as edge
/// values.
///
/// The bounds are the type's extremes unless `minimum`/`maximum` narrow them.
pub fn integer_sampler(
    type_min: i64,
    type_max: i64,
    constraints: &Constraints,
    span: i64,
) -> Sampler<i64> {
    let (low, high) = integer_bounds(type_min, type_max, constraints);
    let span = span.max(0);

    let (mut range_low, mut range_high) = (low.max(-span), high.min(span));
    if range_low > range_high {
        // The declared range lies outside the span.
        range_low = low;
        range_high = high;
    }

    weighted(vec![
        (
            RANGE_WEIGHT,
            Sampler::new(move |rng| rng.gen_range(range_low..=range_high)),
        ),
        (EDGE_WEIGHT, constant(low)),
        (EDGE_WEIGHT, constant(high)),
    ])
}

fn integer_bounds(type_min: i64, type_max: i64, constraints: &Constraints) -> (i64, i64) {
    // Float-to-int casts saturate, so huge bounds land on the type extremes.
    let low = constraints
        .minimum
        .filter(|m| !m.is_nan())
        .map_or(type_min, |m| (m.ceil() as i64).clamp(type_min, type_max));
    let high = constraints
        .maximum
        .filter(|m| !m.is_nan())
        .map_or(type_max, |m| (m.floor() as i64).clamp(type_min, type_max));

    if low > high {
        (type_min, type_max)
    } else {
        (low, high)
    }
}

/// Floats from `[-span, span]`, with the bounds, both infinities and NaN as
/// edge values.
pub fn float_sampler(
    type_min: f64,
    type_max: f64,
    constraints: &Constraints,
    span: i64,
) -> Sampler<f64> {
    let finite = |m: &f64| m.is_finite();
    let mut low = constraints
        .minimum
        .filter(finite)
        .map_or(type_min, |m| m.clamp(type_min, type_max));
    let mut high = constraints
        .maximum
        .filter(finite)
        .map_or(type_max, |m| m.clamp(type_min, type_max));
    if low > high {
        low = type_min;
        high = type_max;
    }

    let span = span.max(0) as f64;
    let (mut range_low, mut range_high) = (low.max(-span), high.min(span));
    if range_low > range_high {
        range_low = low;
        range_high = high;
    }

    weighted(vec![
        (
            RANGE_WEIGHT,
            Sampler::new(move |rng| {
                // Interpolate rather than subtract so the full f64 range cannot overflow.
                let t: f64 = rng.r#gen();
                range_low * (1.0 - t) + range_high * t
            }),
        ),
        (EDGE_WEIGHT, constant(low)),
        (EDGE_WEIGHT, constant(high)),
        (EDGE_WEIGHT, constant(f64::INFINITY)),
        (EDGE_WEIGHT, constant(f64::NEG_INFINITY)),
        (EDGE_WEIGHT, constant(f64::NAN)),
    ])
}

/// Strings of ASCII letters with a length uniform in `[min, max]`.
pub fn string_sampler(min: usize, max: usize) -> Sampler<String> {
    let max = max.max(min);
    Sampler::new(move |rng| {
        let len = rng.gen_range(min..=max);
        (0..len)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect()
    })
}
