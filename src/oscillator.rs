//! Wavetable and noise oscillator, used as grain source.

use std::f32::consts::PI;

use rand::{rngs::SmallRng, Rng, SeedableRng};

// -------------------------------------------------------------------------------------------------

/// Oscillator waveform selection.
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
pub enum Waveform {
    #[default]
    Sine = 0,
    Saw = 1,
    Square = 2,
    /// Uniform white noise in range -1..=1. Does not use a wavetable.
    Noise = 3,
}

// -------------------------------------------------------------------------------------------------

/// Single cycle wavetable oscillator with linear interpolation.
///
/// Periodic waveforms are rendered into a table when selected. Noise bypasses the table and
/// draws a fresh uniform random value on each call.
pub struct Oscillator {
    waveform: Waveform,
    sample_rate: f64,
    frequency: f32,
    phase: f64,
    phase_increment: f64,
    table: Box<[f32; Self::TABLE_SIZE]>,
    rng: SmallRng,
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::new()
    }
}

impl Oscillator {
    /// Wavetable size. Must be a pow2 value.
    pub const TABLE_SIZE: usize = 2048;
    const TABLE_MASK: usize = Self::TABLE_SIZE - 1;

    pub const DEFAULT_SAMPLE_RATE: f64 = 44100.0;
    pub const DEFAULT_FREQUENCY: f32 = 440.0;

    /// Create a new sine oscillator at 440 Hz with a sample rate of 44.1 kHz.
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_os_rng())
    }

    /// Create a new sine oscillator which uses the given random generator for noise.
    pub fn with_rng(rng: SmallRng) -> Self {
        let mut oscillator = Self {
            waveform: Waveform::Sine,
            sample_rate: Self::DEFAULT_SAMPLE_RATE,
            frequency: Self::DEFAULT_FREQUENCY,
            phase: 0.0,
            phase_increment: 0.0,
            table: Box::new([0.0; Self::TABLE_SIZE]),
            rng,
        };
        oscillator.set_waveform(Waveform::Sine);
        oscillator
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Select a new waveform. Periodic waveforms regenerate the wavetable in place.
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
        let table_size = Self::TABLE_SIZE as f32;
        match waveform {
            Waveform::Sine => {
                for (i, value) in self.table.iter_mut().enumerate() {
                    let x = 2.0 * PI * i as f32 / table_size;
                    *value = x.sin();
                }
            }
            Waveform::Saw => {
                for (i, value) in self.table.iter_mut().enumerate() {
                    let x = 2.0 * PI * i as f32 / table_size;
                    *value = x / PI - 1.0;
                }
            }
            Waveform::Square => {
                for (i, value) in self.table.iter_mut().enumerate() {
                    let x = 2.0 * PI * i as f32 / table_size;
                    *value = if x < PI { 1.0 } else { -1.0 };
                }
            }
            Waveform::Noise => {
                // noise is drawn directly from the random generator
            }
        }
        self.update_phase_increment();
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Set a new sample rate. Keeps the selected waveform and frequency.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        if self.sample_rate != sample_rate {
            self.sample_rate = sample_rate;
            self.set_waveform(self.waveform);
        }
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Set a new frequency in Hz.
    pub fn set_frequency(&mut self, frequency: f32) {
        if self.frequency != frequency {
            self.frequency = frequency;
            self.update_phase_increment();
        }
    }

    /// Current phase in cycles (0.0..1.0).
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Phase increment in cycles per sample for the given frequency at the current sample rate.
    #[inline]
    pub fn phase_increment_for(&self, frequency: f32) -> f64 {
        if self.sample_rate > 0.0 {
            frequency as f64 / self.sample_rate
        } else {
            0.0
        }
    }

    /// Advance the internal phase and return the next sample.
    pub fn next_sample(&mut self) -> f32 {
        let value = self.sample_at_phase(self.phase);
        self.phase += self.phase_increment;
        self.phase -= self.phase.floor();
        value
    }

    /// Sample the selected waveform at the given phase in cycles, without touching the
    /// oscillator's own phase. Noise ignores the phase.
    #[inline]
    pub fn sample_at_phase(&mut self, phase: f64) -> f32 {
        match self.waveform {
            Waveform::Noise => self.rng.random::<f32>() * 2.0 - 1.0,
            _ => {
                let index_float = phase.rem_euclid(1.0) * Self::TABLE_SIZE as f64;
                let index = (index_float as usize) & Self::TABLE_MASK;
                let next_index = (index + 1) & Self::TABLE_MASK;
                let fraction = index_float.fract() as f32;
                let a = self.table[index];
                let b = self.table[next_index];
                a + (b - a) * fraction
            }
        }
    }

    fn update_phase_increment(&mut self) {
        self.phase_increment = self.phase_increment_for(self.frequency);
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn sine() {
        let mut oscillator = Oscillator::new();
        oscillator.set_sample_rate(48000.0);
        oscillator.set_frequency(1000.0);
        // 48 samples per cycle
        let samples = (0..48).map(|_| oscillator.next_sample()).collect::<Vec<_>>();
        assert!(samples[0].abs() < 1e-6);
        assert!((samples[12] - 1.0).abs() < 1e-3);
        assert!((samples[36] + 1.0).abs() < 1e-3);
        assert!(oscillator.phase() < 1e-9 || oscillator.phase() > 1.0 - 1e-9);
    }

    #[test]
    fn saw_and_square() {
        let mut oscillator = Oscillator::new();
        oscillator.set_waveform(Waveform::Saw);
        assert!((oscillator.sample_at_phase(0.0) + 1.0).abs() < 1e-6);
        assert!(oscillator.sample_at_phase(0.5).abs() < 1e-3);
        assert!((oscillator.sample_at_phase(0.75) - 0.5).abs() < 1e-3);

        oscillator.set_waveform(Waveform::Square);
        assert_eq!(oscillator.sample_at_phase(0.25), 1.0);
        assert_eq!(oscillator.sample_at_phase(0.75), -1.0);
    }

    #[test]
    fn deterministic() {
        for waveform in Waveform::iter().filter(|w| *w != Waveform::Noise) {
            let mut a = Oscillator::new();
            let mut b = Oscillator::new();
            a.set_waveform(waveform);
            b.set_waveform(waveform);
            a.set_frequency(220.0);
            b.set_frequency(220.0);
            for _ in 0..1000 {
                assert_eq!(a.next_sample(), b.next_sample());
            }
        }
    }

    #[test]
    fn noise() {
        let mut oscillator = Oscillator::with_rng(SmallRng::seed_from_u64(0x5eed));
        oscillator.set_waveform(Waveform::Noise);
        let samples = (0..10000)
            .map(|_| oscillator.next_sample())
            .collect::<Vec<_>>();
        assert!(samples.iter().all(|s| (-1.0..=1.0).contains(s)));
        let mean = samples.iter().sum::<f32>() / samples.len() as f32;
        assert!(mean.abs() < 0.05);
        assert!(samples.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn sample_rate_change_keeps_settings() {
        let mut oscillator = Oscillator::new();
        oscillator.set_waveform(Waveform::Square);
        oscillator.set_frequency(100.0);
        oscillator.set_sample_rate(96000.0);
        assert_eq!(oscillator.waveform(), Waveform::Square);
        assert_eq!(oscillator.frequency(), 100.0);
        assert_eq!(oscillator.sample_rate(), 96000.0);
        assert!((oscillator.phase_increment_for(100.0) - 100.0 / 96000.0).abs() < 1e-12);
        assert_eq!(oscillator.sample_at_phase(0.1), 1.0);
    }
}
