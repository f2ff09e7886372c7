//! Sampler combinators for composing generation strategies.

use rand::Rng;

use crate::sampler::Sampler;

/// A sampler that always yields a clone of `value`.
pub fn constant<T>(value: T) -> Sampler<T>
where
    T: Clone + Send + Sync + 'static,
{
    Sampler::new(move |_| value.clone())
}

/// Lift a list of independent samplers into one sampler of the list of their
/// outputs.
///
/// The i-th entry of every result comes from the i-th sampler; entries are
/// never reordered or dropped.
pub fn sequence<T: 'static>(samplers: Vec<Sampler<T>>) -> Sampler<Vec<T>> {
    Sampler::new(move |rng| {
        let mut out = Vec::with_capacity(samplers.len());
        for sampler in &samplers {
            out.push(sampler.sample(rng));
        }
        out
    })
}

/// Pick one of `choices` uniformly and delegate to it.
///
/// # Panics
///
/// Panics if `choices` is empty.
pub fn one_of<T: 'static>(choices: Vec<Sampler<T>>) -> Sampler<T> {
    assert!(!choices.is_empty(), "one_of needs at least one choice");
    Sampler::new(move |rng| {
        let index = rng.gen_range(0..choices.len());
        choices[index].sample(rng)
    })
}

/// Pick one of `choices` with probability proportional to its weight.
///
/// Non-positive total weight falls back to the first choice.
///
/// # Panics
///
/// Panics if `choices` is empty.
pub fn weighted<T: 'static>(choices: Vec<(f64, Sampler<T>)>) -> Sampler<T> {
    assert!(!choices.is_empty(), "weighted needs at least one choice");
    let total_weight: f64 = choices.iter().map(|(weight, _)| weight.max(0.0)).sum();

    Sampler::new(move |rng| {
        if total_weight <= 0.0 {
            return choices[0].1.sample(rng);
        }

        let mut roll = rng.r#gen::<f64>() * total_weight;
        for (weight, sampler) in &choices {
            roll -= weight.max(0.0);
            if roll <= 0.0 {
                return sampler.sample(rng);
            }
        }

        choices[choices.len() - 1].1.sample(rng)
    })
}

/// Pick a clone of one of `values` uniformly.
///
/// # Panics
///
/// Panics if `values` is empty.
pub fn pick<T>(values: Vec<T>) -> Sampler<T>
where
    T: Clone + Send + Sync + 'static,
{
    assert!(!values.is_empty(), "pick needs at least one value");
    Sampler::new(move |rng| values[rng.gen_range(0..values.len())].clone())
}

/// Yield `None` with probability `absent_probability`, else a sample of
/// `inner`.
///
/// The probability is clamped to `[0, 1]`; NaN counts as zero.
pub fn nullable<T: 'static>(inner: Sampler<T>, absent_probability: f64) -> Sampler<Option<T>> {
    let p = if absent_probability.is_nan() {
        0.0
    } else {
        absent_probability.clamp(0.0, 1.0)
    };

    Sampler::new(move |rng| {
        if rng.gen_bool(p) {
            None
        } else {
            Some(inner.sample(rng))
        }
    })
}

/// A list of `item` samples whose length is uniform in `[min, max]`.
///
/// A `max` below `min` is raised to `min`.
pub fn list_of<T: 'static>(item: Sampler<T>, min: usize, max: usize) -> Sampler<Vec<T>> {
    let max = max.max(min);
    Sampler::new(move |rng| {
        let len = rng.gen_range(min..=max);
        (0..len).map(|_| item.sample(rng)).collect()
    })
}
