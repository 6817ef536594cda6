//! A single, short sound event.

// -------------------------------------------------------------------------------------------------

/// Represents a single grain of sound.
///
/// Grains are created fully populated by the [`StochasticModel`](crate::StochasticModel), owned
/// exclusively by the [`AudioEngine`](crate::AudioEngine)'s grain pool, advanced once per sample
/// and removed from the pool as soon as their age reaches their duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grain {
    /// Is this grain still playing? Dead grains get removed in the next pool compaction.
    pub alive: bool,
    /// Sequential grain id, assigned by the engine.
    pub id: u32,
    /// Pitch as (fractional) MIDI note number.
    pub pitch: f32,
    /// Stereo position from -1.0 (left) to 1.0 (right).
    pub pan: f32,
    /// Amplitude in range 0.0..=1.0.
    pub amplitude: f32,
    /// Total lifetime in samples.
    pub duration_in_samples: i32,
    /// Number of samples this grain has been playing.
    pub age_in_samples: i32,
    /// Fractional read position: a frame position in the source waveform for sample grains or
    /// the phase in cycles for oscillator grains.
    pub source_position: f64,
}

impl Default for Grain {
    fn default() -> Self {
        Self::new()
    }
}

impl Grain {
    /// Create a new, empty grain.
    pub const fn new() -> Self {
        Self {
            alive: true,
            id: 0,
            pitch: 60.0,
            pan: 0.0,
            amplitude: 0.0,
            duration_in_samples: 0,
            age_in_samples: 0,
            source_position: 0.0,
        }
    }

    /// Check if this grain is still playing.
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Advance the grain's age by one sample, marking it dead once its age reaches its duration.
    #[inline]
    pub fn advance(&mut self) {
        self.age_in_samples += 1;
        if self.age_in_samples >= self.duration_in_samples {
            self.alive = false;
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle() {
        let mut grain = Grain {
            duration_in_samples: 100,
            ..Grain::new()
        };
        for age in 0..100 {
            assert!(grain.is_alive(), "grain should be alive at age {age}");
            assert_eq!(grain.age_in_samples, age);
            grain.advance();
        }
        assert_eq!(grain.age_in_samples, 100);
        assert!(!grain.is_alive());
    }

    #[test]
    fn zero_duration() {
        let mut grain = Grain::new();
        grain.advance();
        assert!(!grain.is_alive());
    }
}
