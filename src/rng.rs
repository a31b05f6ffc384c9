//! Random decision sources
//!
//! Every random decision in a fight (damage samples, skip and critical rolls, song
//! brackets, the opening coin flip) is drawn from a [`Dice`]. Simulation code uses
//! [`FastRng`]; tests swap in [`ScriptedDice`] to force exact outcomes.

use rand::Rng;
use std::collections::VecDeque;

pub trait Dice {
    /// Uniform sample in `[0, 1)`
    fn unit(&mut self) -> f64;

    /// Weighted coin flip, true with probability `p`.
    ///
    /// A chance of zero or less never consumes a draw.
    #[inline(always)]
    fn chance(&mut self, p: f64) -> bool {
        p > 0.0 && self.unit() < p
    }
}

/// Fast RNG wrapper for better performance
#[derive(Clone)]
pub struct FastRng {
    inner: fastrand::Rng,
}

impl FastRng {
    #[inline(always)]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: fastrand::Rng::with_seed(seed),
        }
    }
}

impl Dice for FastRng {
    #[inline(always)]
    fn unit(&mut self) -> f64 {
        self.inner.f64()
    }
}

/// Adapter for any `rand` generator
pub struct RandDice<R: Rng>(pub R);

impl<R: Rng> Dice for RandDice<R> {
    fn unit(&mut self) -> f64 {
        self.0.gen::<f64>()
    }
}

/// Dice that replay fixed outcomes.
///
/// Coin flips and uniform samples come from two separate queues. Once a queue runs dry
/// the matching fallback is returned forever. Every probability asked of [`Dice::chance`]
/// is kept in order.
#[derive(Debug, Clone)]
pub struct ScriptedDice {
    flips: VecDeque<bool>,
    units: VecDeque<f64>,
    fallback_flip: bool,
    fallback_unit: f64,
    asked: Vec<f64>,
}

impl Default for ScriptedDice {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedDice {
    /// Every flip fails, every sample is 0
    pub fn new() -> Self {
        Self {
            flips: VecDeque::new(),
            units: VecDeque::new(),
            fallback_flip: false,
            fallback_unit: 0.0,
            asked: Vec::new(),
        }
    }

    pub fn with_flips(mut self, flips: impl IntoIterator<Item = bool>) -> Self {
        self.flips.extend(flips);
        self
    }

    pub fn with_units(mut self, units: impl IntoIterator<Item = f64>) -> Self {
        self.units.extend(units);
        self
    }

    pub fn always(mut self, flip: bool) -> Self {
        self.fallback_flip = flip;
        self
    }

    pub fn remaining_flips(&self) -> usize {
        self.flips.len()
    }

    pub fn remaining_units(&self) -> usize {
        self.units.len()
    }

    /// Probabilities passed to `chance` so far, zero chances included
    pub fn asked(&self) -> &[f64] {
        &self.asked
    }
}

impl Dice for ScriptedDice {
    fn unit(&mut self) -> f64 {
        self.units.pop_front().unwrap_or(self.fallback_unit)
    }

    fn chance(&mut self, p: f64) -> bool {
        self.asked.push(p);
        if p <= 0.0 {
            return false;
        }
        self.flips.pop_front().unwrap_or(self.fallback_flip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_scripted_dice_replays_in_order() {
        let mut dice = ScriptedDice::new()
            .with_flips([true, false, true])
            .with_units([0.25, 0.75]);

        assert!(dice.chance(0.5));
        assert!(!dice.chance(0.5));
        assert_eq!(dice.unit(), 0.25);
        assert!(dice.chance(0.01));
        assert_eq!(dice.unit(), 0.75);

        // Exhausted queues fall back
        assert!(!dice.chance(0.99));
        assert_eq!(dice.unit(), 0.0);
    }

    #[test]
    fn test_zero_chance_consumes_nothing() {
        let mut dice = ScriptedDice::new().with_flips([true]);

        assert!(!dice.chance(0.0));
        assert!(!dice.chance(-1.0));
        assert_eq!(dice.remaining_flips(), 1);
        assert!(dice.chance(0.1));
        assert_eq!(dice.asked(), &[0.0, -1.0, 0.1]);
    }

    #[test]
    fn test_fast_rng_is_seed_deterministic() {
        let mut a = FastRng::new(7);
        let mut b = FastRng::new(7);

        for _ in 0..100 {
            assert_eq!(a.unit(), b.unit());
        }
    }

    #[test]
    fn test_chance_bounds() {
        let mut rng = RandDice(ChaCha8Rng::seed_from_u64(12345));

        for _ in 0..1000 {
            assert!(rng.chance(1.0));
            assert!(!rng.chance(0.0));
            let sample = rng.unit();
            assert!((0.0..1.0).contains(&sample));
        }
    }
}
