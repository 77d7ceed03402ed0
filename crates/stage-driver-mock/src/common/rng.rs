//! Seeded RNG wrapper for reproducible failure injection.

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Seeded RNG wrapper for reproducible random behavior
pub struct MockRng {
    inner: Mutex<ChaCha8Rng>,
}

impl MockRng {
    /// Create a new RNG with optional seed.
    /// If seed is None, uses a random seed from the OS.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => ChaCha8Rng::seed_from_u64(s),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            inner: Mutex::new(rng),
        }
    }

    /// True with probability `rate` (0.0 never, 1.0 always).
    pub fn should_fail(&self, rate: f64) -> bool {
        if rate <= 0.0 {
            return false;
        }
        if rate >= 1.0 {
            return true;
        }
        self.inner.lock().gen::<f64>() < rate
    }
}

impl Default for MockRng {
    fn default() -> Self {
        Self::new(None)
    }
}

impl std::fmt::Debug for MockRng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockRng")
            .field("inner", &"<Mutex<ChaCha8Rng>>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_rng_is_reproducible() {
        let a = MockRng::new(Some(7));
        let b = MockRng::new(Some(7));
        let xs: Vec<bool> = (0..32).map(|_| a.should_fail(0.5)).collect();
        let ys: Vec<bool> = (0..32).map(|_| b.should_fail(0.5)).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn extreme_rates() {
        let rng = MockRng::new(Some(1));
        assert!(!rng.should_fail(0.0));
        assert!(rng.should_fail(1.0));
    }
}
