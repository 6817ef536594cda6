//! Flat key-value snapshots of the grain model parameters.

use serde::{Deserialize, Serialize};

use crate::{
    model::{StochasticParameters, TemporalDistribution},
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Serializable snapshot of the [`StochasticParameters`].
///
/// All fields are optional: missing fields keep the model's current values when applied.
/// Paired values (pitch and dispersion, duration and variation, pan and spread) are only
/// applied when both values of the pair are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispersion: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_duration_ms: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_variation: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub central_pan: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pan_spread: Option<f32>,
    /// Grains per second.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density: Option<f32>,
    /// Minimum distance between grain onsets in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_distance: Option<f32>,
    /// Pitch offset in semitones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch_offset: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pan_offset: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity_offset: Option<f32>,
    /// Duration offset in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_offset: Option<f32>,
    /// 0 = Uniform, 1 = Poisson.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporal_distribution: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tempo_sync: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_voices: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_grains: Option<i32>,
}

impl ModelSnapshot {
    /// Parse and validate a snapshot from a JSON string. Unknown keys are ignored.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let snapshot = serde_json::from_str::<Self>(json)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Serialize the snapshot into a JSON string.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check that all present values can be applied.
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(distribution) = self.temporal_distribution {
            if TemporalDistribution::from_repr(distribution).is_none() {
                return Err(Error::SnapshotError(format!(
                    "invalid temporal distribution: {distribution}"
                )));
            }
        }
        if self.num_voices.is_some_and(|v| v < 0) {
            return Err(Error::SnapshotError("negative voice count".to_string()));
        }
        if self.num_grains.is_some_and(|v| v < 0) {
            return Err(Error::SnapshotError("negative grain count".to_string()));
        }
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------

impl StochasticParameters {
    /// Capture all global model values.
    pub fn snapshot(&self) -> ModelSnapshot {
        ModelSnapshot {
            pitch: Some(self.pitch()),
            dispersion: Some(self.dispersion()),
            average_duration_ms: Some(self.average_duration_ms()),
            duration_variation: Some(self.duration_variation()),
            central_pan: Some(self.central_pan()),
            pan_spread: Some(self.pan_spread()),
            density: Some(self.density()),
            min_distance: Some(self.min_distance()),
            pitch_offset: Some(self.pitch_offset()),
            pan_offset: Some(self.pan_offset()),
            velocity_offset: Some(self.velocity_offset()),
            duration_offset: Some(self.duration_offset()),
            temporal_distribution: Some(self.temporal_distribution() as u8),
            tempo_sync: Some(self.tempo_sync()),
            num_voices: Some(self.num_voices()),
            num_grains: Some(self.num_grains()),
        }
    }

    /// Apply all present values of the given snapshot. Nothing is applied when the snapshot
    /// fails to validate.
    pub fn apply_snapshot(&self, snapshot: &ModelSnapshot) -> Result<(), Error> {
        snapshot.validate()?;
        if let (Some(pitch), Some(dispersion)) = (snapshot.pitch, snapshot.dispersion) {
            self.set_pitch_and_dispersion(pitch, dispersion);
        }
        if let (Some(duration), Some(variation)) =
            (snapshot.average_duration_ms, snapshot.duration_variation)
        {
            self.set_duration_and_variation(duration, variation);
        }
        if let (Some(pan), Some(spread)) = (snapshot.central_pan, snapshot.pan_spread) {
            self.set_pan_and_spread(pan, spread);
        }
        if let Some(density) = snapshot.density {
            self.set_density(density);
        }
        if let Some(min_distance) = snapshot.min_distance {
            self.set_min_distance(min_distance);
        }
        if let Some(offset) = snapshot.pitch_offset {
            self.set_pitch_offset(offset);
        }
        if let Some(offset) = snapshot.pan_offset {
            self.set_pan_offset(offset);
        }
        if let Some(offset) = snapshot.velocity_offset {
            self.set_velocity_offset(offset);
        }
        if let Some(offset) = snapshot.duration_offset {
            self.set_duration_offset(offset);
        }
        if let Some(distribution) = snapshot
            .temporal_distribution
            .and_then(TemporalDistribution::from_repr)
        {
            self.set_temporal_distribution(distribution);
        }
        if let Some(enabled) = snapshot.tempo_sync {
            self.set_tempo_sync(enabled);
        }
        if let Some(num_voices) = snapshot.num_voices {
            self.set_num_voices(num_voices);
        }
        if let Some(num_grains) = snapshot.num_grains {
            self.set_num_grains(num_grains);
        }
        Ok(())
    }

    /// Parse the given JSON snapshot and apply it. Malformed input leaves all values untouched.
    pub fn load_snapshot_json(&self, json: &str) -> Result<(), Error> {
        let snapshot = ModelSnapshot::from_json(json).inspect_err(|err| {
            log::warn!("Failed to load parameter snapshot: {err}");
        })?;
        self.apply_snapshot(&snapshot)
    }
}

// -------------------------------------------------------------------------------------------------
