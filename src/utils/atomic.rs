//! Lock free floating point cells, stored as raw bits in integer atomics.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

// -------------------------------------------------------------------------------------------------

/// An `f32` which can be shared and updated across threads without locking.
///
/// All accesses use relaxed ordering: each cell is independently meaningful, so no ordering
/// between two different cells is guaranteed.
#[derive(Debug, Default)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed)
    }
}

// -------------------------------------------------------------------------------------------------

/// An `f64` which can be shared and updated across threads without locking.
#[derive(Debug, Default)]
pub struct AtomicF64(AtomicU64);

impl AtomicF64 {
    pub fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    #[inline]
    pub fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed)
    }
}

// -------------------------------------------------------------------------------------------------
