//! Injected randomness.
//!
//! The engine never owns global random state: every operation that needs jitter (degenerate
//! distance vectors, fallback placement) draws from a caller-supplied [`RandomSource`]. Feeding the
//! same source state reproduces the same layout.

/// A source of uniformly distributed values in `[0, 1)`.
pub trait RandomSource {
    fn next_f64(&mut self) -> f64;
}

impl<F> RandomSource for F
where
    F: FnMut() -> f64,
{
    fn next_f64(&mut self) -> f64 {
        self()
    }
}

/// Small, seedable xorshift64* generator.
///
/// `next_f64` maps the top 53 bits of each output to `[0, 1)`, which is the same construction a
/// seeded `Math.random()` replacement uses, so browser hosts can mirror the sequence exactly.
#[derive(Debug, Clone)]
pub struct XorShift64Star {
    state: u64,
}

impl XorShift64Star {
    pub fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D_u64)
    }

    /// Maps to `[-1, 1)`.
    pub fn next_f64_signed(&mut self) -> f64 {
        (self.next_unit() * 2.0) - 1.0
    }

    fn next_unit(&mut self) -> f64 {
        let u = self.next_u64() >> 11;
        (u as f64) / ((1u64 << 53) as f64)
    }
}

impl Default for XorShift64Star {
    fn default() -> Self {
        Self::new(1)
    }
}

impl RandomSource for XorShift64Star {
    fn next_f64(&mut self) -> f64 {
        self.next_unit()
    }
}
