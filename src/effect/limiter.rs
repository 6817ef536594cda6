use crate::utils::{buffer::InterleavedBufferMut, db_to_linear};

// -------------------------------------------------------------------------------------------------

/// Limiter presets: each personality is a threshold and release time pair.
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
    strum::FromRepr,
)]
#[repr(u8)]
pub enum LimiterPersonality {
    /// Catches peaks only: high threshold, short release.
    #[default]
    Transparent = 0,
    /// Gentle, slowly recovering gain reduction.
    Smooth = 1,
    /// Low threshold and fast release, audibly pumping.
    Punchy = 2,
}

impl LimiterPersonality {
    /// Threshold in dB.
    pub fn threshold(&self) -> f32 {
        match self {
            Self::Transparent => -0.3,
            Self::Smooth => -1.0,
            Self::Punchy => -3.0,
        }
    }

    /// Release time in seconds.
    pub fn release_time(&self) -> f32 {
        match self {
            Self::Transparent => 0.05,
            Self::Smooth => 0.25,
            Self::Punchy => 0.02,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Peak limiter with instant attack and exponential release.
///
/// Frames are limited by their peak across all channels, so the stereo image is kept. The
/// applied gain never exceeds 1.
#[derive(Debug, Clone)]
pub struct Limiter {
    personality: LimiterPersonality,
    sample_rate: f64,
    threshold: f32,
    release_coeff: f32,
    gain: f32,
}

impl Default for Limiter {
    fn default() -> Self {
        Self::new(LimiterPersonality::default())
    }
}

impl Limiter {
    pub const DEFAULT_SAMPLE_RATE: f64 = 44100.0;

    pub fn new(personality: LimiterPersonality) -> Self {
        let mut limiter = Self {
            personality,
            sample_rate: Self::DEFAULT_SAMPLE_RATE,
            threshold: 1.0,
            release_coeff: 0.0,
            gain: 1.0,
        };
        limiter.update_coefficients();
        limiter
    }

    pub fn personality(&self) -> LimiterPersonality {
        self.personality
    }

    /// Apply a new personality. Keeps the current gain reduction.
    pub fn set_personality(&mut self, personality: LimiterPersonality) {
        self.personality = personality;
        self.update_coefficients();
    }

    /// Configure the limiter for the given sample rate and reset its state.
    pub fn prepare(&mut self, sample_rate: f64) {
        if sample_rate > 0.0 && sample_rate.is_finite() {
            self.sample_rate = sample_rate;
        } else {
            self.sample_rate = Self::DEFAULT_SAMPLE_RATE;
        }
        self.update_coefficients();
        self.reset();
    }

    /// Linear threshold of the current personality.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Currently applied linear gain.
    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn reset(&mut self) {
        self.gain = 1.0;
    }

    /// Limit the given interleaved buffer in place.
    pub fn process(&mut self, buffer: &mut [f32], channel_count: usize) {
        if channel_count == 0 {
            return;
        }
        for frame in buffer.frames_mut(channel_count) {
            let peak = frame.iter().fold(0.0f32, |peak, s| peak.max(s.abs()));
            let target_gain = if peak > self.threshold {
                self.threshold / peak
            } else {
                1.0
            };
            if target_gain < self.gain {
                self.gain = target_gain;
            } else {
                self.gain = target_gain + self.release_coeff * (self.gain - target_gain);
            }
            if self.gain < 1.0 {
                for sample in frame.iter_mut() {
                    *sample *= self.gain;
                }
            }
        }
    }

    fn update_coefficients(&mut self) {
        self.threshold = db_to_linear(self.personality.threshold());
        let release_time = self.personality.release_time();
        self.release_coeff = if release_time > 0.0 {
            (-1.0 / (release_time as f64 * self.sample_rate)).exp() as f32
        } else {
            0.0
        };
    }
}

// -------------------------------------------------------------------------------------------------
