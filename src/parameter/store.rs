use std::{fmt, sync::Arc};

use four_cc::FourCC;

use super::{EnumParameter, FloatParameter, Parameter};
use crate::{
    model::{StochasticParameters, TemporalDistribution},
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Callback which receives a parameter's new plain value and the store it was set on.
pub type ParameterListener = Box<dyn Fn(f32, &ParameterStore) + Send + Sync>;

// -------------------------------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Descriptor {
    Float(FloatParameter),
    Enum(EnumParameter),
}

impl Descriptor {
    fn parameter(&self) -> &dyn Parameter {
        match self {
            Self::Float(param) => param,
            Self::Enum(param) => param,
        }
    }

    fn default_value(&self) -> f32 {
        match self {
            Self::Float(param) => param.default_value(),
            Self::Enum(param) => param.default_index() as f32,
        }
    }

    fn clamp_value(&self, value: f32) -> f32 {
        match self {
            Self::Float(param) => param.clamp_value(value),
            Self::Enum(param) => param.clamp_index(value) as f32,
        }
    }

    fn normalize_value(&self, value: f32) -> f32 {
        match self {
            Self::Float(param) => param.normalize_value(value),
            Self::Enum(param) => param.normalize_index(param.clamp_index(value)),
        }
    }

    fn denormalize_value(&self, normalized: f32) -> f32 {
        match self {
            Self::Float(param) => param.denormalize_value(normalized),
            Self::Enum(param) => param.denormalize_index(normalized) as f32,
        }
    }
}

struct Entry {
    descriptor: Descriptor,
    value: f32,
    listeners: Vec<ParameterListener>,
}

// -------------------------------------------------------------------------------------------------

/// Named, range checked parameters which push value changes to registered listeners.
///
/// The store is created explicitly and handed to whoever needs it. The render context never
/// reads it: values reach the grain model through listeners, see [`Self::bind_model`].
/// Enum parameter values are plain value indices, expressed as float.
pub struct ParameterStore {
    entries: Vec<Entry>,
}

impl fmt::Debug for ParameterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.entries
                    .iter()
                    .map(|entry| (entry.descriptor.parameter().id(), entry.value)),
            )
            .finish()
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterStore {
    pub const PITCH_ID: FourCC = FourCC(*b"ptch");
    pub const DISPERSION_ID: FourCC = FourCC(*b"disp");
    pub const AVERAGE_DURATION_ID: FourCC = FourCC(*b"dura");
    pub const DURATION_VARIATION_ID: FourCC = FourCC(*b"dvar");
    pub const PAN_ID: FourCC = FourCC(*b"pan ");
    pub const PAN_SPREAD_ID: FourCC = FourCC(*b"pspr");
    pub const DENSITY_ID: FourCC = FourCC(*b"dens");
    pub const TEMPORAL_DISTRIBUTION_ID: FourCC = FourCC(*b"tdst");

    /// Create a new store with all grain model parameters at their default values.
    pub fn new() -> Self {
        let descriptors = [
            Descriptor::Float(
                FloatParameter::new(
                    Self::PITCH_ID,
                    "Pitch",
                    20.0..=100.0,
                    StochasticParameters::DEFAULT_PITCH,
                )
                .with_unit("st"),
            ),
            Descriptor::Float(
                FloatParameter::new(
                    Self::DISPERSION_ID,
                    "Dispersion",
                    0.0..=24.0,
                    StochasticParameters::DEFAULT_DISPERSION,
                )
                .with_unit("st"),
            ),
            Descriptor::Float(
                FloatParameter::new(
                    Self::AVERAGE_DURATION_ID,
                    "Duration",
                    10.0..=1000.0,
                    StochasticParameters::DEFAULT_AVERAGE_DURATION_MS,
                )
                .with_unit("ms"),
            ),
            Descriptor::Float(FloatParameter::new(
                Self::DURATION_VARIATION_ID,
                "Duration Variation",
                0.0..=1.0,
                StochasticParameters::DEFAULT_DURATION_VARIATION,
            )),
            Descriptor::Float(FloatParameter::new(
                Self::PAN_ID,
                "Pan",
                -1.0..=1.0,
                StochasticParameters::DEFAULT_CENTRAL_PAN,
            )),
            Descriptor::Float(FloatParameter::new(
                Self::PAN_SPREAD_ID,
                "Pan Spread",
                0.0..=1.0,
                StochasticParameters::DEFAULT_PAN_SPREAD,
            )),
            Descriptor::Float(
                FloatParameter::new(
                    Self::DENSITY_ID,
                    "Density",
                    0.1..=50.0,
                    StochasticParameters::DEFAULT_DENSITY,
                )
                .with_unit("Hz"),
            ),
            Descriptor::Enum(EnumParameter::new(
                Self::TEMPORAL_DISTRIBUTION_ID,
                "Temporal Distribution",
                TemporalDistribution::default(),
            )),
        ];
        let entries = descriptors
            .into_iter()
            .map(|descriptor| Entry {
                value: descriptor.default_value(),
                descriptor,
                listeners: Vec::new(),
            })
            .collect();
        Self { entries }
    }

    /// Descriptors of all parameters in the store.
    pub fn parameters(&self) -> Vec<&dyn Parameter> {
        self.entries
            .iter()
            .map(|entry| entry.descriptor.parameter())
            .collect()
    }

    /// Current plain value of the given parameter.
    pub fn value(&self, id: FourCC) -> Result<f32, Error> {
        Ok(self.entry(id)?.value)
    }

    /// Current value of the given parameter, normalized to 0.0-1.0.
    pub fn normalized_value(&self, id: FourCC) -> Result<f32, Error> {
        let entry = self.entry(id)?;
        Ok(entry.descriptor.normalize_value(entry.value))
    }

    /// Set a new plain value, clamped to the parameter's range, and push it to all listeners of
    /// the parameter. Returns the applied value.
    pub fn set_value(&mut self, id: FourCC, value: f32) -> Result<f32, Error> {
        let index = self.entry_index(id)?;
        let entry = &mut self.entries[index];
        let value = entry.descriptor.clamp_value(value);
        entry.value = value;
        self.notify(index);
        Ok(value)
    }

    /// Set a new value from a normalized 0.0-1.0 value and push it to all listeners of the
    /// parameter. Returns the applied plain value.
    pub fn set_normalized_value(&mut self, id: FourCC, normalized: f32) -> Result<f32, Error> {
        let index = self.entry_index(id)?;
        let value = self.entries[index].descriptor.denormalize_value(normalized);
        self.set_value(id, value)
    }

    /// Reset all parameters to their defaults, notifying listeners.
    pub fn reset(&mut self) {
        for index in 0..self.entries.len() {
            let entry = &mut self.entries[index];
            entry.value = entry.descriptor.default_value();
            self.notify(index);
        }
    }

    /// Register a callback which gets called with every new value of the given parameter.
    pub fn add_listener<F>(&mut self, id: FourCC, listener: F) -> Result<(), Error>
    where
        F: Fn(f32, &ParameterStore) + Send + Sync + 'static,
    {
        let index = self.entry_index(id)?;
        self.entries[index].listeners.push(Box::new(listener));
        Ok(())
    }

    /// Push all store values into the given model parameters, and keep pushing them on changes.
    ///
    /// Paired model values (pitch and dispersion, duration and variation, pan and spread) are
    /// written together, using the store's current value of the partner parameter.
    pub fn bind_model(&mut self, model: &Arc<StochasticParameters>) -> Result<(), Error> {
        fn bind<F>(
            store: &mut ParameterStore,
            id: FourCC,
            model: &Arc<StochasticParameters>,
            apply: F,
        ) -> Result<(), Error>
        where
            F: Fn(&StochasticParameters, f32, &ParameterStore) + Send + Sync + 'static,
        {
            let model = Arc::clone(model);
            store.add_listener(id, move |value, store| apply(&model, value, store))
        }

        bind(self, Self::PITCH_ID, model, |model, pitch, store| {
            model.set_pitch_and_dispersion(pitch, store.current(Self::DISPERSION_ID));
        })?;
        bind(self, Self::DISPERSION_ID, model, |model, dispersion, store| {
            model.set_pitch_and_dispersion(store.current(Self::PITCH_ID), dispersion);
        })?;
        bind(self, Self::AVERAGE_DURATION_ID, model, |model, duration, store| {
            model.set_duration_and_variation(duration, store.current(Self::DURATION_VARIATION_ID));
        })?;
        bind(self, Self::DURATION_VARIATION_ID, model, |model, variation, store| {
            model.set_duration_and_variation(store.current(Self::AVERAGE_DURATION_ID), variation);
        })?;
        bind(self, Self::PAN_ID, model, |model, pan, store| {
            model.set_pan_and_spread(pan, store.current(Self::PAN_SPREAD_ID));
        })?;
        bind(self, Self::PAN_SPREAD_ID, model, |model, spread, store| {
            model.set_pan_and_spread(store.current(Self::PAN_ID), spread);
        })?;
        bind(self, Self::DENSITY_ID, model, |model, density, _| {
            model.set_density(density);
        })?;
        bind(self, Self::TEMPORAL_DISTRIBUTION_ID, model, |model, index, _| {
            model.set_temporal_distribution(
                TemporalDistribution::from_repr(index.round() as u8).unwrap_or_default(),
            );
        })?;

        // initial sync
        model.set_pitch_and_dispersion(
            self.current(Self::PITCH_ID),
            self.current(Self::DISPERSION_ID),
        );
        model.set_duration_and_variation(
            self.current(Self::AVERAGE_DURATION_ID),
            self.current(Self::DURATION_VARIATION_ID),
        );
        model.set_pan_and_spread(self.current(Self::PAN_ID), self.current(Self::PAN_SPREAD_ID));
        model.set_density(self.current(Self::DENSITY_ID));
        model.set_temporal_distribution(
            TemporalDistribution::from_repr(self.current(Self::TEMPORAL_DISTRIBUTION_ID) as u8)
                .unwrap_or_default(),
        );
        Ok(())
    }

    fn notify(&self, index: usize) {
        let entry = &self.entries[index];
        for listener in &entry.listeners {
            listener(entry.value, self);
        }
    }

    /// Value of a parameter which is known to exist in the store.
    fn current(&self, id: FourCC) -> f32 {
        self.entries
            .iter()
            .find(|entry| entry.descriptor.parameter().id() == id)
            .map(|entry| entry.value)
            .unwrap_or_default()
    }

    fn entry(&self, id: FourCC) -> Result<&Entry, Error> {
        let index = self.entry_index(id)?;
        Ok(&self.entries[index])
    }

    fn entry_index(&self, id: FourCC) -> Result<usize, Error> {
        self.entries
            .iter()
            .position(|entry| entry.descriptor.parameter().id() == id)
            .ok_or_else(|| {
                log::warn!("Unknown parameter id: '{id}'");
                Error::ParameterError(format!("Unknown parameter: '{id}'"))
            })
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn defaults_and_ranges() {
        let store = ParameterStore::new();
        assert_eq!(store.parameters().len(), 8);
        assert_eq!(store.value(ParameterStore::PITCH_ID).unwrap(), 60.0);
        assert_eq!(store.value(ParameterStore::DISPERSION_ID).unwrap(), 12.0);
        assert_eq!(store.value(ParameterStore::AVERAGE_DURATION_ID).unwrap(), 200.0);
        assert_eq!(store.value(ParameterStore::DURATION_VARIATION_ID).unwrap(), 0.25);
        assert_eq!(store.value(ParameterStore::PAN_ID).unwrap(), 0.0);
        assert_eq!(store.value(ParameterStore::PAN_SPREAD_ID).unwrap(), 0.5);
        assert_eq!(store.value(ParameterStore::DENSITY_ID).unwrap(), 10.0);
        assert_eq!(
            store.value(ParameterStore::TEMPORAL_DISTRIBUTION_ID).unwrap(),
            0.0
        );
        assert!(matches!(
            store.value(FourCC(*b"????")),
            Err(Error::ParameterError(_))
        ));
    }

    #[test]
    fn set_values() {
        let mut store = ParameterStore::new();
        assert_eq!(store.set_value(ParameterStore::PITCH_ID, 120.0).unwrap(), 100.0);
        assert_eq!(store.set_value(ParameterStore::DENSITY_ID, 0.0).unwrap(), 0.1);
        assert_eq!(
            store
                .set_normalized_value(ParameterStore::PAN_ID, 1.0)
                .unwrap(),
            1.0
        );
        assert_eq!(store.normalized_value(ParameterStore::PAN_ID).unwrap(), 1.0);
        assert_eq!(
            store
                .set_value(ParameterStore::TEMPORAL_DISTRIBUTION_ID, 3.0)
                .unwrap(),
            1.0
        );
        assert!(store.set_value(FourCC(*b"????"), 1.0).is_err());

        store.reset();
        assert_eq!(store.value(ParameterStore::PITCH_ID).unwrap(), 60.0);
    }

    #[test]
    fn listeners() {
        let mut store = ParameterStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        store
            .add_listener(ParameterStore::DENSITY_ID, move |value, _| {
                assert_eq!(value, 25.0);
                calls_clone.fetch_add(1, Ordering::Relaxed);
            })
            .unwrap();
        store.set_value(ParameterStore::DENSITY_ID, 25.0).unwrap();
        store.set_value(ParameterStore::PITCH_ID, 25.0).unwrap();
        assert_eq!(calls.load(Ordering::Relaxed), 1);
        assert!(store.add_listener(FourCC(*b"????"), |_, _| {}).is_err());
    }

    #[test]
    fn model_binding() {
        let model = Arc::new(StochasticParameters::new());
        let mut store = ParameterStore::new();
        store.set_value(ParameterStore::DISPERSION_ID, 3.0).unwrap();
        store.bind_model(&model).unwrap();
        // initial sync
        assert_eq!(model.dispersion(), 3.0);

        store.set_value(ParameterStore::PITCH_ID, 72.0).unwrap();
        assert_eq!(model.pitch(), 72.0);
        assert_eq!(model.dispersion(), 3.0);

        store
            .set_value(ParameterStore::DURATION_VARIATION_ID, 0.5)
            .unwrap();
        assert_eq!(model.average_duration_ms(), 200.0);
        assert_eq!(model.duration_variation(), 0.5);

        store.set_value(ParameterStore::PAN_SPREAD_ID, 0.1).unwrap();
        store.set_value(ParameterStore::PAN_ID, -0.5).unwrap();
        assert_eq!(model.central_pan(), -0.5);
        assert_eq!(model.pan_spread(), 0.1);

        store.set_value(ParameterStore::DENSITY_ID, 42.0).unwrap();
        assert_eq!(model.density(), 42.0);

        store
            .set_normalized_value(ParameterStore::TEMPORAL_DISTRIBUTION_ID, 1.0)
            .unwrap();
        assert_eq!(model.temporal_distribution(), TemporalDistribution::Poisson);
    }
}
