use four_cc::FourCC;
use strum::IntoEnumIterator;

use super::{Parameter, ParameterType};

// -------------------------------------------------------------------------------------------------

/// An enum parameter descriptor. Values are addressed by their index in the enum's variant list.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumParameter {
    id: FourCC,
    name: &'static str,
    values: Vec<String>,
    default_index: usize,
}

impl EnumParameter {
    pub fn new<E: IntoEnumIterator + ToString + PartialEq>(
        id: FourCC,
        name: &'static str,
        default: E,
    ) -> Self {
        let values = E::iter().map(|v| v.to_string()).collect::<Vec<_>>();
        let default_index = E::iter().position(|v| v == default).unwrap_or(0);
        Self {
            id,
            name,
            values,
            default_index,
        }
    }

    /// Display names of all values.
    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn default_index(&self) -> usize {
        self.default_index
    }

    /// Round and clamp the given value to a valid value index.
    pub fn clamp_index(&self, value: f32) -> usize {
        if value.is_nan() || self.values.is_empty() {
            return self.default_index;
        }
        (value.round().max(0.0) as usize).min(self.values.len() - 1)
    }

    pub fn index_of(&self, value: &str) -> Option<usize> {
        self.values
            .iter()
            .position(|v| v.eq_ignore_ascii_case(value.trim()))
    }

    pub fn normalize_index(&self, index: usize) -> f32 {
        if self.values.len() <= 1 {
            return 0.0;
        }
        index.min(self.values.len() - 1) as f32 / (self.values.len() - 1) as f32
    }

    pub fn denormalize_index(&self, normalized: f32) -> usize {
        if self.values.len() <= 1 || normalized.is_nan() {
            return 0;
        }
        (normalized.clamp(0.0, 1.0) * (self.values.len() - 1) as f32).round() as usize
    }
}

impl Parameter for EnumParameter {
    fn id(&self) -> FourCC {
        self.id
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn parameter_type(&self) -> ParameterType {
        ParameterType::Enum {
            values: self.values.clone(),
            default_index: self.default_index,
        }
    }

    fn default_normalized_value(&self) -> f32 {
        self.normalize_index(self.default_index)
    }

    fn normalized_value_to_string(&self, normalized: f32, _include_unit: bool) -> String {
        self.values
            .get(self.denormalize_index(normalized))
            .cloned()
            .unwrap_or_default()
    }

    fn string_to_normalized_value(&self, string: &str) -> Option<f32> {
        self.index_of(string).map(|index| self.normalize_index(index))
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TemporalDistribution;

    #[test]
    fn indices() {
        let param = EnumParameter::new(
            FourCC(*b"tdst"),
            "Distribution",
            TemporalDistribution::Poisson,
        );
        assert_eq!(param.values(), ["Uniform", "Poisson"]);
        assert_eq!(param.default_index(), 1);
        assert_eq!(param.default_normalized_value(), 1.0);
        assert_eq!(param.clamp_index(-3.0), 0);
        assert_eq!(param.clamp_index(0.4), 0);
        assert_eq!(param.clamp_index(0.6), 1);
        assert_eq!(param.clamp_index(7.0), 1);
        assert_eq!(param.denormalize_index(0.2), 0);
        assert_eq!(param.denormalize_index(0.8), 1);
        assert_eq!(param.normalized_value_to_string(0.0, true), "Uniform");
        assert_eq!(param.string_to_normalized_value("poisson"), Some(1.0));
        assert_eq!(param.string_to_normalized_value("Gaussian"), None);
    }
}
