//! Deterministic pixel generator

use mosaic_core::{PixelPacket, QUANTUM_RANGE, Quantum};

/// Linear congruential generator for reproducible test data
#[derive(Debug, Clone)]
pub struct Lcg {
    state: u64,
}

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        // LCG parameters from Numerical Recipes
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        // Low bits of an LCG are weak; hand out the high half.
        self.state >> 32
    }

    /// Uniform value in `0..bound` (`bound` > 0)
    pub fn below(&mut self, bound: u64) -> u64 {
        let wide = (self.next_u64() << 32) | self.next_u64();
        wide % bound
    }

    /// Uniform value in `[0, 1)`
    pub fn next_f64(&mut self) -> f64 {
        self.next_u64() as f64 / (1u64 << 32) as f64
    }

    /// Any Quantum value
    pub fn quantum(&mut self) -> Quantum {
        self.below(QUANTUM_RANGE as u64 + 1) as Quantum
    }

    /// Pixel with every sample random
    pub fn pixel(&mut self) -> PixelPacket {
        PixelPacket::new(self.quantum(), self.quantum(), self.quantum(), self.quantum())
    }

    /// `n` random pixels
    pub fn pixels(&mut self, n: usize) -> Vec<PixelPacket> {
        (0..n).map(|_| self.pixel()).collect()
    }

    /// `n` random bytes
    pub fn bytes(&mut self, n: usize) -> Vec<u8> {
        (0..n).map(|_| self.below(256) as u8).collect()
    }
}
