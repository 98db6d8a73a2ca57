//! Random draws used by generation.
//!
//! Every draw goes through [`RandomSource`] so a level can be replayed from a
//! seed, or driven by a fixed sequence in tests.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Uniform draws consumed by the generator, in a fixed call order.
pub trait RandomSource {
    /// Uniform float in `[0, 1)`.
    fn value(&mut self) -> f32;

    /// Uniform integer in `[min, max)`. Returns `min` when the range is empty.
    fn range_i32(&mut self, min: i32, max: i32) -> i32;

    /// Uniform float in `[min, max)`.
    fn range_f32(&mut self, min: f32, max: f32) -> f32 {
        min + (max - min) * self.value()
    }

    /// Uniform float in `[0, 1]`.
    fn unit_inclusive(&mut self) -> f32 {
        self.value()
    }

    /// Uniform float in `[min, max]`.
    fn range_f32_inclusive(&mut self, min: f32, max: f32) -> f32 {
        min + (max - min) * self.unit_inclusive()
    }

    /// Uniform integer in `[min, max]`.
    fn range_inclusive(&mut self, min: i32, max: i32) -> i32 {
        self.range_i32(min, max.saturating_add(1))
    }

    /// Uniform index into a collection of `len` items.
    fn pick(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.range_i32(0, len as i32) as usize
    }
}

impl<T: RandomSource + ?Sized> RandomSource for &mut T {
    fn value(&mut self) -> f32 {
        (**self).value()
    }

    fn range_i32(&mut self, min: i32, max: i32) -> i32 {
        (**self).range_i32(min, max)
    }

    fn unit_inclusive(&mut self) -> f32 {
        (**self).unit_inclusive()
    }
}

/// Adapter exposing any `rand` generator as a [`RandomSource`].
#[derive(Debug, Clone)]
pub struct RngSource<R>(pub R);

impl<R: Rng> RandomSource for RngSource<R> {
    fn value(&mut self) -> f32 {
        self.0.gen::<f32>()
    }

    fn range_i32(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        self.0.gen_range(min..max)
    }

    fn unit_inclusive(&mut self) -> f32 {
        self.0.gen_range(0.0..=1.0)
    }
}

/// Portable seeded stream, stable across platforms and releases.
pub type SeededRandom = RngSource<ChaCha8Rng>;

impl SeededRandom {
    pub fn from_seed(seed: u64) -> Self {
        RngSource(ChaCha8Rng::seed_from_u64(seed))
    }
}

/// Replays a fixed list of unit values, wrapping around at the end.
///
/// Integer draws map the next value onto the requested range, so a script of
/// `[0.0, 0.99]` alternates between the lowest and highest index.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    values: Vec<f32>,
    cursor: usize,
    draws: usize,
}

impl ScriptedRandom {
    pub fn new(values: Vec<f32>) -> Self {
        Self {
            values,
            cursor: 0,
            draws: 0,
        }
    }

    /// Always returns the same value.
    pub fn constant(value: f32) -> Self {
        Self::new(vec![value])
    }

    /// Number of draws taken so far.
    pub fn draws(&self) -> usize {
        self.draws
    }

    fn next_raw(&mut self) -> f32 {
        self.draws += 1;
        if self.values.is_empty() {
            return 0.0;
        }
        let v = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        v
    }
}

impl RandomSource for ScriptedRandom {
    fn value(&mut self) -> f32 {
        self.next_raw().clamp(0.0, 0.999_999)
    }

    /// A scripted 1.0 reaches the top of an inclusive range.
    fn unit_inclusive(&mut self) -> f32 {
        self.next_raw().clamp(0.0, 1.0)
    }

    fn range_i32(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        let span = (max - min) as f32;
        let offset = (self.value() * span).floor() as i32;
        min + offset.min(max - min - 1)
    }
}
