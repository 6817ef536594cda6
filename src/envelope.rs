//! Grain amplitude envelopes.

use std::f32::consts::PI;

// -------------------------------------------------------------------------------------------------

/// Grain envelope shape selection.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    strum::EnumString,
    strum::Display,
    strum::VariantNames,
    strum::EnumIter,
)]
#[repr(u8)]
pub enum EnvelopeShape {
    /// Linear attack and release ramps of 10% of the grain's length with a flat sustain.
    #[default]
    Trapezoid = 0,
    /// Raised cosine: 0 at the start, 1 at the midpoint.
    Hann = 1,
}

// -------------------------------------------------------------------------------------------------

/// Maps a grain's age and duration to an amplitude multiplier in range 0.0..=1.0.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrainEnvelope {
    shape: EnvelopeShape,
}

impl GrainEnvelope {
    /// Create a new envelope with the given shape.
    pub fn new(shape: EnvelopeShape) -> Self {
        Self { shape }
    }

    pub fn shape(&self) -> EnvelopeShape {
        self.shape
    }

    pub fn set_shape(&mut self, shape: EnvelopeShape) {
        self.shape = shape;
    }

    /// Amplitude at the given age of a grain with the given total duration, both in samples.
    ///
    /// Returns 0 for invalid inputs: a non positive duration or an age outside `0..duration`.
    pub fn amplitude(&self, age: i32, total_duration: i32) -> f32 {
        if total_duration <= 0 || age < 0 || age >= total_duration {
            return 0.0;
        }
        match self.shape {
            EnvelopeShape::Hann => Self::hann(age, total_duration),
            EnvelopeShape::Trapezoid => Self::trapezoid(age, total_duration),
        }
    }

    #[inline]
    fn hann(age: i32, total_duration: i32) -> f32 {
        let phase = age as f32 / total_duration as f32;
        0.5 * (1.0 - (2.0 * PI * phase).cos())
    }

    #[inline]
    fn trapezoid(age: i32, total_duration: i32) -> f32 {
        // a single sample grain is fully audible
        if total_duration == 1 {
            return 1.0;
        }
        let mut ramp = (0.1 * total_duration as f32).round() as i32;
        if ramp == 0 {
            ramp = 1;
        }
        // no room for a sustain phase: degenerate into a triangle
        if 2 * ramp > total_duration {
            ramp = total_duration / 2;
        }
        if ramp == 0 {
            return 1.0;
        }

        if age < ramp {
            // attack
            if ramp == 1 {
                return 1.0;
            }
            age as f32 / ramp as f32
        } else if age < total_duration - ramp {
            // sustain
            1.0
        } else {
            // release, symmetric to the attack
            (total_duration - age) as f32 / ramp as f32
        }
    }
}

// -------------------------------------------------------------------------------------------------
