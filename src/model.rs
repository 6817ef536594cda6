//! Stochastic grain parameter model: shared, lock free parameter storage and the render side
//! generator which draws grain timings and properties from it.

use std::sync::{
    atomic::{AtomicBool, AtomicI32, AtomicU8, Ordering},
    Arc,
};

use rand::{rngs::SmallRng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal, Poisson};

use crate::{
    grain::Grain,
    utils::atomic::{AtomicF32, AtomicF64},
};

// -------------------------------------------------------------------------------------------------

/// Statistical model which drives the timing between grains.
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
pub enum TemporalDistribution {
    /// Metronomic timing: every interval is exactly the average interval.
    #[default]
    Uniform = 0,
    /// Irregular, bursty timing: intervals are drawn from a Poisson distribution.
    Poisson = 1,
}

// -------------------------------------------------------------------------------------------------

/// Grain generation parameters, shared between the control and render context.
///
/// Every scalar lives in its own atomic cell, so it can be written from the control context
/// and read from the render context without locking. Values written "together", like a pitch
/// and its dispersion, may be observed at different moments by the reader.
#[derive(Debug)]
pub struct StochasticParameters {
    pitch: AtomicF32,
    dispersion: AtomicF32,
    average_duration_ms: AtomicF32,
    duration_variation: AtomicF32,
    central_pan: AtomicF32,
    pan_spread: AtomicF32,
    density: AtomicF32,
    min_distance_ms: AtomicF32,
    pitch_offset: AtomicI32,
    pan_offset: AtomicF32,
    velocity_offset: AtomicF32,
    duration_offset_ms: AtomicF32,
    tempo_sync: AtomicBool,
    num_voices: AtomicI32,
    num_grains: AtomicI32,
    temporal_distribution: AtomicU8,
    sample_rate: AtomicF64,
    midi_target_pitch: AtomicF32,
    midi_influence: AtomicF32,
    pitch_modulation: AtomicF32,
}

impl Default for StochasticParameters {
    fn default() -> Self {
        Self::new()
    }
}

impl StochasticParameters {
    pub const DEFAULT_PITCH: f32 = 60.0;
    pub const DEFAULT_DISPERSION: f32 = 12.0;
    pub const DEFAULT_AVERAGE_DURATION_MS: f32 = 200.0;
    pub const DEFAULT_DURATION_VARIATION: f32 = 0.25;
    pub const DEFAULT_CENTRAL_PAN: f32 = 0.0;
    pub const DEFAULT_PAN_SPREAD: f32 = 0.5;
    pub const DEFAULT_DENSITY: f32 = 10.0;
    pub const DEFAULT_NUM_VOICES: i32 = 1;
    pub const DEFAULT_NUM_GRAINS: i32 = 100;
    pub const DEFAULT_SAMPLE_RATE: f64 = 44100.0;

    /// Create a new parameter set with default values.
    pub fn new() -> Self {
        Self {
            pitch: AtomicF32::new(Self::DEFAULT_PITCH),
            dispersion: AtomicF32::new(Self::DEFAULT_DISPERSION),
            average_duration_ms: AtomicF32::new(Self::DEFAULT_AVERAGE_DURATION_MS),
            duration_variation: AtomicF32::new(Self::DEFAULT_DURATION_VARIATION),
            central_pan: AtomicF32::new(Self::DEFAULT_CENTRAL_PAN),
            pan_spread: AtomicF32::new(Self::DEFAULT_PAN_SPREAD),
            density: AtomicF32::new(Self::DEFAULT_DENSITY),
            min_distance_ms: AtomicF32::new(0.0),
            pitch_offset: AtomicI32::new(0),
            pan_offset: AtomicF32::new(0.0),
            velocity_offset: AtomicF32::new(0.0),
            duration_offset_ms: AtomicF32::new(0.0),
            tempo_sync: AtomicBool::new(false),
            num_voices: AtomicI32::new(Self::DEFAULT_NUM_VOICES),
            num_grains: AtomicI32::new(Self::DEFAULT_NUM_GRAINS),
            temporal_distribution: AtomicU8::new(TemporalDistribution::Uniform as u8),
            sample_rate: AtomicF64::new(Self::DEFAULT_SAMPLE_RATE),
            midi_target_pitch: AtomicF32::new(Self::DEFAULT_PITCH),
            midi_influence: AtomicF32::new(0.0),
            pitch_modulation: AtomicF32::new(0.0),
        }
    }

    pub fn set_pitch_and_dispersion(&self, pitch: f32, dispersion: f32) {
        self.pitch.store(pitch);
        self.dispersion.store(dispersion);
    }

    pub fn set_duration_and_variation(&self, average_duration_ms: f32, variation: f32) {
        self.average_duration_ms.store(average_duration_ms);
        self.duration_variation.store(variation);
    }

    pub fn set_pan_and_spread(&self, central_pan: f32, spread: f32) {
        self.central_pan.store(central_pan);
        self.pan_spread.store(spread);
    }

    /// Set the average number of grains per second.
    pub fn set_density(&self, density: f32) {
        self.density.store(density);
    }

    /// Set the minimum distance between two grain onsets in milliseconds.
    pub fn set_min_distance(&self, min_distance_ms: f32) {
        self.min_distance_ms.store(min_distance_ms);
    }

    /// Set a global pitch offset in semitones.
    pub fn set_pitch_offset(&self, offset: i32) {
        self.pitch_offset.store(offset, Ordering::Relaxed);
    }

    pub fn set_pan_offset(&self, offset: f32) {
        self.pan_offset.store(offset);
    }

    pub fn set_velocity_offset(&self, offset: f32) {
        self.velocity_offset.store(offset);
    }

    /// Set a global duration offset in milliseconds.
    pub fn set_duration_offset(&self, offset_ms: f32) {
        self.duration_offset_ms.store(offset_ms);
    }

    pub fn set_tempo_sync(&self, enabled: bool) {
        self.tempo_sync.store(enabled, Ordering::Relaxed);
    }

    pub fn set_num_voices(&self, num_voices: i32) {
        self.num_voices.store(num_voices, Ordering::Relaxed);
    }

    /// Set the max number of simultaneously playing grains.
    pub fn set_num_grains(&self, num_grains: i32) {
        self.num_grains.store(num_grains, Ordering::Relaxed);
    }

    pub fn set_temporal_distribution(&self, distribution: TemporalDistribution) {
        self.temporal_distribution
            .store(distribution as u8, Ordering::Relaxed);
    }

    pub fn set_sample_rate(&self, sample_rate: f64) {
        self.sample_rate.store(sample_rate);
    }

    /// Pull the effective pitch towards the given note. An influence of 0 disables the pull,
    /// 1 replaces the central pitch with the note.
    pub fn set_midi_influence(&self, note: f32, influence: f32) {
        self.midi_target_pitch.store(note);
        self.midi_influence.store(influence.clamp(0.0, 1.0));
    }

    /// Set a pitch modulation in semitones, which gets added to the effective pitch.
    pub fn set_pitch_modulation(&self, semitones: f32) {
        self.pitch_modulation.store(semitones);
    }

    pub fn pitch(&self) -> f32 {
        self.pitch.load()
    }
    pub fn dispersion(&self) -> f32 {
        self.dispersion.load()
    }
    pub fn average_duration_ms(&self) -> f32 {
        self.average_duration_ms.load()
    }
    pub fn duration_variation(&self) -> f32 {
        self.duration_variation.load()
    }
    pub fn central_pan(&self) -> f32 {
        self.central_pan.load()
    }
    pub fn pan_spread(&self) -> f32 {
        self.pan_spread.load()
    }
    pub fn density(&self) -> f32 {
        self.density.load()
    }
    pub fn min_distance(&self) -> f32 {
        self.min_distance_ms.load()
    }
    pub fn pitch_offset(&self) -> i32 {
        self.pitch_offset.load(Ordering::Relaxed)
    }
    pub fn pan_offset(&self) -> f32 {
        self.pan_offset.load()
    }
    pub fn velocity_offset(&self) -> f32 {
        self.velocity_offset.load()
    }
    pub fn duration_offset(&self) -> f32 {
        self.duration_offset_ms.load()
    }
    pub fn tempo_sync(&self) -> bool {
        self.tempo_sync.load(Ordering::Relaxed)
    }
    pub fn num_voices(&self) -> i32 {
        self.num_voices.load(Ordering::Relaxed)
    }
    pub fn num_grains(&self) -> i32 {
        self.num_grains.load(Ordering::Relaxed)
    }
    pub fn temporal_distribution(&self) -> TemporalDistribution {
        TemporalDistribution::from_repr(self.temporal_distribution.load(Ordering::Relaxed))
            .unwrap_or_default()
    }
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate.load()
    }
    pub fn midi_target_pitch(&self) -> f32 {
        self.midi_target_pitch.load()
    }
    pub fn midi_influence(&self) -> f32 {
        self.midi_influence.load()
    }
    pub fn pitch_modulation(&self) -> f32 {
        self.pitch_modulation.load()
    }

    /// Central pitch, pulled towards the MIDI target by the MIDI influence, plus the pitch
    /// modulation.
    pub fn effective_pitch(&self) -> f32 {
        let influence = self.midi_influence();
        self.pitch() * (1.0 - influence)
            + self.midi_target_pitch() * influence
            + self.pitch_modulation()
    }
}

// -------------------------------------------------------------------------------------------------

/// Render side grain generator.
///
/// Reads the shared [`StochasticParameters`] and draws grain timings and properties from a
/// single random generator it owns exclusively. Distributions are built from the current
/// parameter values on each draw, so they always reflect the latest writes.
pub struct StochasticModel {
    parameters: Arc<StochasticParameters>,
    rng: SmallRng,
}

impl StochasticModel {
    /// Returned by [`Self::samples_until_next_event`] when no grains should be generated.
    pub const PAUSED: i32 = i32::MAX;

    /// Lowest valid pitch as MIDI note number.
    pub const MIN_PITCH: f32 = 0.0;
    /// Highest valid pitch as MIDI note number.
    pub const MAX_PITCH: f32 = 127.0;
    /// Shortest grain duration in milliseconds.
    pub const MIN_DURATION_MS: f32 = 1.0;
    /// Grain amplitude without a velocity offset.
    pub const DEFAULT_AMPLITUDE: f32 = 0.5;

    pub fn new(parameters: Arc<StochasticParameters>) -> Self {
        Self::with_rng(parameters, SmallRng::from_os_rng())
    }

    /// Create a new model which draws from the given random generator.
    pub fn with_rng(parameters: Arc<StochasticParameters>, rng: SmallRng) -> Self {
        Self { parameters, rng }
    }

    pub fn parameters(&self) -> &Arc<StochasticParameters> {
        &self.parameters
    }

    /// Number of samples until the next grain should start.
    ///
    /// Returns [`Self::PAUSED`] when the density or sample rate are not positive.
    pub fn samples_until_next_event(&mut self) -> i32 {
        let density = self.parameters.density() as f64;
        let sample_rate = self.parameters.sample_rate();
        if density <= 0.0 || sample_rate <= 0.0 || !density.is_finite() {
            return Self::PAUSED;
        }
        let average_samples = sample_rate / density;
        if average_samples <= 0.0 || !average_samples.is_finite() {
            return Self::PAUSED;
        }

        let samples = match self.parameters.temporal_distribution() {
            TemporalDistribution::Uniform => average_samples as i32,
            TemporalDistribution::Poisson => {
                let mean = average_samples.max(f64::EPSILON);
                match Poisson::new(mean) {
                    Ok(poisson) => poisson.sample(&mut self.rng) as i32,
                    Err(_) => average_samples as i32,
                }
            }
        };

        let min_distance_ms = self.parameters.min_distance() as f64;
        if min_distance_ms > 0.0 {
            samples.max((min_distance_ms * sample_rate / 1000.0) as i32)
        } else {
            samples
        }
    }

    /// Populate the given grain with freshly drawn properties. The grain's id is not touched.
    pub fn generate_grain(&mut self, grain: &mut Grain) {
        let params = &*self.parameters;

        // pitch
        let pitch = Self::draw_normal(&mut self.rng, params.effective_pitch(), params.dispersion())
            + params.pitch_offset() as f32;
        grain.pitch = if pitch.is_finite() {
            pitch.clamp(Self::MIN_PITCH, Self::MAX_PITCH)
        } else {
            StochasticParameters::DEFAULT_PITCH
        };

        // pan
        let pan = Self::draw_normal(&mut self.rng, params.central_pan(), params.pan_spread())
            + params.pan_offset();
        grain.pan = if pan.is_finite() {
            pan.clamp(-1.0, 1.0)
        } else {
            0.0
        };

        // duration
        let variation = params.duration_variation().clamp(0.0, 1.0);
        let deviation = (self.rng.random::<f32>() * 2.0 - 1.0) * variation;
        let duration_ms = (params.average_duration_ms() * (1.0 + deviation)
            + params.duration_offset())
        .max(Self::MIN_DURATION_MS);
        let mut sample_rate = params.sample_rate();
        if sample_rate <= 0.0 || !sample_rate.is_finite() {
            sample_rate = StochasticParameters::DEFAULT_SAMPLE_RATE;
        }
        grain.duration_in_samples = ((duration_ms as f64 * sample_rate / 1000.0) as i32).max(1);

        // amplitude
        grain.amplitude = (Self::DEFAULT_AMPLITUDE + params.velocity_offset()).clamp(0.0, 1.0);

        grain.age_in_samples = 0;
        grain.source_position = 0.0;
        grain.alive = true;
    }

    /// Draw from a normal distribution. Invalid deviations collapse to the mean.
    fn draw_normal(rng: &mut SmallRng, mean: f32, deviation: f32) -> f32 {
        match Normal::new(mean, deviation) {
            Ok(normal) => normal.sample(rng),
            Err(_) => mean,
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_model() -> StochasticModel {
        StochasticModel::with_rng(
            Arc::new(StochasticParameters::new()),
            SmallRng::seed_from_u64(0x1234),
        )
    }

    #[test]
    fn uniform_scheduling() {
        let mut model = seeded_model();
        model.parameters().set_density(10.0);
        model.parameters().set_sample_rate(44100.0);
        model
            .parameters()
            .set_temporal_distribution(TemporalDistribution::Uniform);
        for _ in 0..100 {
            assert_eq!(model.samples_until_next_event(), 4410);
        }
    }

    #[test]
    fn poisson_scheduling() {
        let mut model = seeded_model();
        model.parameters().set_density(10.0);
        model.parameters().set_sample_rate(44100.0);
        model
            .parameters()
            .set_temporal_distribution(TemporalDistribution::Poisson);

        const COUNT: usize = 10000;
        let draws = (0..COUNT)
            .map(|_| model.samples_until_next_event() as f64)
            .collect::<Vec<_>>();
        let mean = draws.iter().sum::<f64>() / COUNT as f64;
        let variance = draws.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / COUNT as f64;
        assert!((mean - 4410.0).abs() < 4410.0 * 0.15, "mean {mean}");
        assert!((variance - 4410.0).abs() < 4410.0 * 0.15, "variance {variance}");
        // not metronomic
        assert!(draws.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn paused_scheduling() {
        let mut model = seeded_model();
        model.parameters().set_density(0.0);
        assert_eq!(model.samples_until_next_event(), StochasticModel::PAUSED);
        model.parameters().set_density(-1.0);
        assert_eq!(model.samples_until_next_event(), StochasticModel::PAUSED);
        model.parameters().set_density(10.0);
        model.parameters().set_sample_rate(0.0);
        assert_eq!(model.samples_until_next_event(), StochasticModel::PAUSED);
        model.parameters().set_sample_rate(-44100.0);
        model
            .parameters()
            .set_temporal_distribution(TemporalDistribution::Poisson);
        assert_eq!(model.samples_until_next_event(), StochasticModel::PAUSED);
    }

    #[test]
    fn min_distance() {
        let mut model = seeded_model();
        model.parameters().set_density(50.0);
        model.parameters().set_sample_rate(1000.0);
        assert_eq!(model.samples_until_next_event(), 20);
        model.parameters().set_min_distance(100.0);
        assert_eq!(model.samples_until_next_event(), 100);
        model
            .parameters()
            .set_temporal_distribution(TemporalDistribution::Poisson);
        for _ in 0..100 {
            assert!(model.samples_until_next_event() >= 100);
        }
    }

    #[test]
    fn pan_clamp() {
        let mut model = seeded_model();
        model.parameters().set_pan_and_spread(0.0, 10.0);
        let mut grain = Grain::new();
        let mut saw_edge = false;
        for _ in 0..1000 {
            model.generate_grain(&mut grain);
            assert!((-1.0..=1.0).contains(&grain.pan));
            saw_edge |= grain.pan.abs() == 1.0;
        }
        assert!(saw_edge);

        model.parameters().set_pan_and_spread(0.9, 0.0);
        model.parameters().set_pan_offset(0.5);
        model.generate_grain(&mut grain);
        assert_eq!(grain.pan, 1.0);
    }

    #[test]
    fn pitch_distribution() {
        let mut model = seeded_model();
        let mut grain = Grain::new();
        const COUNT: usize = 10000;
        let mut sum = 0.0;
        for _ in 0..COUNT {
            model.generate_grain(&mut grain);
            assert!((0.0..=127.0).contains(&grain.pitch));
            sum += grain.pitch as f64;
        }
        assert!((sum / COUNT as f64 - 60.0).abs() < 0.5);

        // no dispersion: pitch is exact, offset applied and clamped
        model.parameters().set_pitch_and_dispersion(72.0, 0.0);
        model.generate_grain(&mut grain);
        assert_eq!(grain.pitch, 72.0);
        model.parameters().set_pitch_offset(-12);
        model.generate_grain(&mut grain);
        assert_eq!(grain.pitch, 60.0);
        model.parameters().set_pitch_offset(100);
        model.generate_grain(&mut grain);
        assert_eq!(grain.pitch, 127.0);
    }

    #[test]
    fn midi_influence() {
        let params = StochasticParameters::new();
        params.set_pitch_and_dispersion(60.0, 0.0);
        assert_eq!(params.effective_pitch(), 60.0);
        params.set_midi_influence(72.0, 0.5);
        assert_eq!(params.effective_pitch(), 66.0);
        params.set_midi_influence(72.0, 2.0);
        assert_eq!(params.midi_influence(), 1.0);
        assert_eq!(params.effective_pitch(), 72.0);
        params.set_pitch_modulation(0.5);
        assert_eq!(params.effective_pitch(), 72.5);
    }

    #[test]
    fn grain_duration() {
        let mut model = seeded_model();
        model.parameters().set_sample_rate(1000.0);
        model.parameters().set_duration_and_variation(100.0, 0.0);
        let mut grain = Grain {
            id: 42,
            age_in_samples: 10,
            source_position: 5.0,
            alive: false,
            ..Grain::new()
        };
        model.generate_grain(&mut grain);
        assert_eq!(grain.duration_in_samples, 100);
        assert_eq!(grain.id, 42);
        assert_eq!(grain.age_in_samples, 0);
        assert_eq!(grain.source_position, 0.0);
        assert!(grain.is_alive());
        assert_eq!(grain.amplitude, 0.5);

        // variation stays within bounds
        model.parameters().set_duration_and_variation(100.0, 0.5);
        for _ in 0..1000 {
            model.generate_grain(&mut grain);
            assert!((50..=150).contains(&grain.duration_in_samples));
        }

        // floored at a positive minimum
        model.parameters().set_duration_and_variation(10.0, 0.0);
        model.parameters().set_duration_offset(-100.0);
        model.generate_grain(&mut grain);
        assert_eq!(grain.duration_in_samples, 1);

        // invalid sample rates fall back to a default
        model.parameters().set_duration_offset(0.0);
        model.parameters().set_sample_rate(0.0);
        model.generate_grain(&mut grain);
        assert_eq!(grain.duration_in_samples, 441);
    }

    #[test]
    fn amplitude() {
        let mut model = seeded_model();
        let mut grain = Grain::new();
        model.parameters().set_velocity_offset(0.25);
        model.generate_grain(&mut grain);
        assert_eq!(grain.amplitude, 0.75);
        model.parameters().set_velocity_offset(1.0);
        model.generate_grain(&mut grain);
        assert_eq!(grain.amplitude, 1.0);
        model.parameters().set_velocity_offset(-1.0);
        model.generate_grain(&mut grain);
        assert_eq!(grain.amplitude, 0.0);
    }
}
