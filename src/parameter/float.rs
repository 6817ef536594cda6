use std::ops::RangeInclusive;

use four_cc::FourCC;

use super::{Parameter, ParameterType};

// -------------------------------------------------------------------------------------------------

/// A continuous (float) parameter descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatParameter {
    id: FourCC,
    name: &'static str,
    range: RangeInclusive<f32>,
    default: f32,
    unit: &'static str,
}

impl FloatParameter {
    /// Create a new float parameter descriptor.
    ///
    /// # Panics
    /// When the default value is not within the given range.
    pub fn new(id: FourCC, name: &'static str, range: RangeInclusive<f32>, default: f32) -> Self {
        assert!(
            range.contains(&default),
            "Invalid parameter default value"
        );
        Self {
            id,
            name,
            range,
            default,
            unit: "",
        }
    }

    /// Optional unit for string displays.
    pub fn with_unit(mut self, unit: &'static str) -> Self {
        self.unit = unit;
        self
    }

    /// The parameter's value range.
    pub fn range(&self) -> &RangeInclusive<f32> {
        &self.range
    }

    /// The parameter's default value.
    pub fn default_value(&self) -> f32 {
        self.default
    }

    pub fn unit(&self) -> &'static str {
        self.unit
    }

    /// Clamp the given plain value to the parameter's range. NaN values map to the default.
    pub fn clamp_value(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.default;
        }
        value.clamp(*self.range.start(), *self.range.end())
    }

    /// Normalize the given plain value to a 0.0-1.0 range.
    pub fn normalize_value(&self, value: f32) -> f32 {
        let span = *self.range.end() - *self.range.start();
        if span <= 0.0 {
            return 0.0;
        }
        (self.clamp_value(value) - *self.range.start()) / span
    }

    /// Denormalize a 0.0-1.0 ranged value to the corresponding plain value.
    pub fn denormalize_value(&self, normalized: f32) -> f32 {
        let normalized = if normalized.is_nan() {
            0.0
        } else {
            normalized.clamp(0.0, 1.0)
        };
        *self.range.start() + normalized * (*self.range.end() - *self.range.start())
    }

    /// Convert the given plain value to a string.
    pub fn value_to_string(&self, value: f32, include_unit: bool) -> String {
        if include_unit && !self.unit.is_empty() {
            format!("{:.2} {}", value, self.unit)
        } else {
            format!("{:.2}", value)
        }
    }

    /// Convert the given string to a clamped plain value.
    pub fn string_to_value(&self, string: &str) -> Option<f32> {
        let mut string = string.trim();
        if !self.unit.is_empty() {
            string = string.trim_end_matches(self.unit).trim_end();
        }
        let value = string.parse::<f32>().ok()?;
        Some(self.clamp_value(value))
    }
}

impl Parameter for FloatParameter {
    fn id(&self) -> FourCC {
        self.id
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn parameter_type(&self) -> ParameterType {
        ParameterType::Float {
            range: self.range.clone(),
            default: self.default,
        }
    }

    fn default_normalized_value(&self) -> f32 {
        self.normalize_value(self.default)
    }

    fn normalized_value_to_string(&self, normalized: f32, include_unit: bool) -> String {
        self.value_to_string(self.denormalize_value(normalized), include_unit)
    }

    fn string_to_normalized_value(&self, string: &str) -> Option<f32> {
        let value = self.string_to_value(string)?;
        Some(self.normalize_value(value))
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn duration() -> FloatParameter {
        FloatParameter::new(FourCC(*b"dura"), "Duration", 10.0..=1000.0, 200.0).with_unit("ms")
    }

    #[test]
    fn conversions() {
        let param = duration();
        assert_eq!(param.clamp_value(5.0), 10.0);
        assert_eq!(param.clamp_value(2000.0), 1000.0);
        assert_eq!(param.clamp_value(f32::NAN), 200.0);
        assert_eq!(param.normalize_value(10.0), 0.0);
        assert_eq!(param.normalize_value(1000.0), 1.0);
        assert_eq!(param.denormalize_value(0.5), 505.0);
        assert_eq!(param.denormalize_value(2.0), 1000.0);
        assert!((param.default_normalized_value() - 190.0 / 990.0).abs() < 1e-6);
    }

    #[test]
    fn strings() {
        let param = duration();
        assert_eq!(param.value_to_string(200.0, true), "200.00 ms");
        assert_eq!(param.value_to_string(200.0, false), "200.00");
        assert_eq!(param.string_to_value("250 ms"), Some(250.0));
        assert_eq!(param.string_to_value(" 250ms "), Some(250.0));
        assert_eq!(param.string_to_value("5000"), Some(1000.0));
        assert_eq!(param.string_to_value("fast"), None);
        assert_eq!(param.string_to_normalized_value("1000"), Some(1.0));
        assert_eq!(param.normalized_value_to_string(0.0, true), "10.00 ms");
    }

    #[test]
    #[should_panic]
    fn invalid_default() {
        let _ = FloatParameter::new(FourCC(*b"bad!"), "Bad", 0.0..=1.0, 2.0);
    }
}
