//! The core sampler type.

use std::fmt;
use std::sync::Arc;

use rand_chacha::ChaCha8Rng;

use crate::combinators;

/// The random source every sampler draws from.
pub type RandomSource = ChaCha8Rng;

/// A pure, repeatable function from a random source to one value.
///
/// Samplers are cheap to clone (the function is shared) and safe to use from
/// several threads, each with its own [`RandomSource`]. Calling
/// [`sample`](Sampler::sample) with the same seeded source yields the same
/// value.
pub struct Sampler<T> {
    inner: Arc<dyn Fn(&mut RandomSource) -> T + Send + Sync>,
}

impl<T: 'static> Sampler<T> {
    /// Create a sampler from a function of the random source.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut RandomSource) -> T + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// Draw one value.
    pub fn sample(&self, rng: &mut RandomSource) -> T {
        (self.inner)(rng)
    }

    /// Transform every sampled value.
    pub fn map<U, F>(&self, f: F) -> Sampler<U>
    where
        U: 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let inner = self.clone();
        Sampler::new(move |rng| f(inner.sample(rng)))
    }

    /// Wrap the sampler so it yields `None`, the absent marker, with the given
    /// probability.
    pub fn nullable(&self, absent_probability: f64) -> Sampler<Option<T>> {
        combinators::nullable(self.clone(), absent_probability)
    }
}

impl<T> Clone for Sampler<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Sampler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sampler")
            .field("output", &std::any::type_name::<T>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_same_seed_same_value() {
        let sampler = Sampler::new(|rng| rng.gen_range(0..1_000_000u32));

        let mut rng1 = RandomSource::seed_from_u64(12345);
        let mut rng2 = RandomSource::seed_from_u64(12345);

        assert_eq!(sampler.sample(&mut rng1), sampler.sample(&mut rng2));
    }

    #[test]
    fn test_map() {
        let sampler = Sampler::new(|rng| rng.gen_range(1..10i32)).map(|n| n * 10);
        let mut rng = RandomSource::seed_from_u64(7);

        for _ in 0..50 {
            let value = sampler.sample(&mut rng);
            assert!(value % 10 == 0 && (10..100).contains(&value));
        }
    }

    #[test]
    fn test_sampler_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Sampler<String>>();
    }
}
