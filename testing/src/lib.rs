//! Test utilities: distributions producing predictable values.

#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::default_trait_access)]

use std::cell::Cell;

use rand::distributions::Distribution;

/// This distribution always produces the same value, ignoring the random number generator.
///
/// # Examples
///
/// ```
/// # use rand::distributions::Distribution;
/// # use testing::ConstantDistribution;
/// let dist = ConstantDistribution::new(2.5);
/// let mut rng = rand::rngs::mock::StepRng::new(0, 1);
/// assert_eq!(dist.sample(&mut rng), 2.5);
/// assert_eq!(dist.sample(&mut rng), 2.5);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ConstantDistribution<T>(T);

impl<T> ConstantDistribution<T> {
    /// Constructs a distribution that always returns `value`.
    pub fn new(value: T) -> Self {
        Self(value)
    }
}

impl<T: Copy> Distribution<T> for ConstantDistribution<T> {
    fn sample<R: rand::Rng + ?Sized>(&self, _: &mut R) -> T {
        self.0
    }
}

/// This distribution produces the given values in order, and then keeps repeating the last one.
///
/// This is meant for testing scenarios where a few specific durations matter, and whatever comes
/// after them should stay out of the way, e.g., a very long last value.
///
/// # Examples
///
/// ```
/// # use rand::distributions::Distribution;
/// # use testing::SequenceDistribution;
/// let dist = SequenceDistribution::new(vec![1.0, 2.0, 100.0]);
/// let mut rng = rand::rngs::mock::StepRng::new(0, 1);
/// let values: Vec<f64> = (0..5).map(|_| dist.sample(&mut rng)).collect();
/// assert_eq!(values, vec![1.0, 2.0, 100.0, 100.0, 100.0]);
/// ```
#[derive(Debug, Clone)]
pub struct SequenceDistribution<T> {
    values: Vec<T>,
    position: Cell<usize>,
}

impl<T> SequenceDistribution<T> {
    /// Constructs a distribution returning `values` in order.
    ///
    /// # Panics
    ///
    /// Panics if `values` is empty.
    pub fn new(values: Vec<T>) -> Self {
        assert!(!values.is_empty(), "sequence must not be empty");
        Self {
            values,
            position: Cell::new(0),
        }
    }
}

impl<T: Copy> Distribution<T> for SequenceDistribution<T> {
    fn sample<R: rand::Rng + ?Sized>(&self, _: &mut R) -> T {
        let position = self.position.get();
        let last = self.values.len() - 1;
        self.position.set((position + 1).min(last));
        self.values[position.min(last)]
    }
}
