// src/heatmap/mean.rs
// Weighted incremental RGB mean, 16 bytes so a whole slot can be swapped
// in one shot. Stable Rust has no 16-byte compare-and-swap, so the shared
// slot falls back to a per-slot parking_lot mutex (one word, uncontended
// updates are a single CAS); the external contract is the same.

use bytemuck::{Pod, Zeroable};
use parking_lot::Mutex;

/// Welford-style weighted running mean of an RGB value.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct IncrementalMean {
    pub mean_r: f32,
    pub mean_g: f32,
    pub mean_b: f32,
    pub weight: f32,
}

impl IncrementalMean {
    pub fn new(mean_r: f32, mean_g: f32, mean_b: f32, weight: f32) -> Self {
        Self { mean_r, mean_g, mean_b, weight }
    }

    /// Faces without samples (or poisoned by NaN weights) count as empty.
    pub fn is_empty(&self) -> bool {
        self.weight == 0.0 || self.weight.is_nan()
    }
}

impl std::ops::AddAssign for IncrementalMean {
    fn add_assign(&mut self, other: IncrementalMean) {
        self.weight += other.weight;
        let update_rate = other.weight / self.weight;
        self.mean_r += (other.mean_r - self.mean_r) * update_rate;
        self.mean_g += (other.mean_g - self.mean_g) * update_rate;
        self.mean_b += (other.mean_b - self.mean_b) * update_rate;
    }
}

impl std::ops::Add for IncrementalMean {
    type Output = IncrementalMean;

    fn add(mut self, other: IncrementalMean) -> IncrementalMean {
        self += other;
        self
    }
}

/// One shared accumulator slot per (potential) face.
#[derive(Debug, Default)]
pub struct AtomicIncrementalMean {
    slot: Mutex<IncrementalMean>,
}

impl AtomicIncrementalMean {
    pub fn load(&self) -> IncrementalMean {
        *self.slot.lock()
    }

    pub fn store(&self, value: IncrementalMean) {
        *self.slot.lock() = value;
    }

    /// Equivalent of the compare-exchange retry loop on platforms with a
    /// native 16-byte CAS: read-modify-write of the whole slot.
    pub fn accumulate(&self, sample: IncrementalMean) {
        *self.slot.lock() += sample;
    }
}
