//! Named parameter descriptors and the parameter store which pushes values into the model.

use std::{fmt::Debug, ops::RangeInclusive};

use four_cc::FourCC;

// -------------------------------------------------------------------------------------------------

/// Describes the type of a [`Parameter`] to e.g. select a proper visual representation in a UI.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterType {
    /// A continuous floating-point value.
    Float {
        range: RangeInclusive<f32>,
        default: f32,
    },
    /// A choice from a list of strings (an enum).
    Enum {
        values: Vec<String>,
        default_index: usize,
    },
}

// -------------------------------------------------------------------------------------------------

/// Describes a single parameter of the [`ParameterStore`] for use in UIs or for automation.
pub trait Parameter: Debug + Send + Sync {
    /// The unique id of the parameter.
    fn id(&self) -> FourCC;

    /// The name of the parameter.
    fn name(&self) -> &'static str;

    /// The parameter type.
    fn parameter_type(&self) -> ParameterType;

    /// Default value of parameter, expressed as normalized floating point value in range \[0,1\].
    fn default_normalized_value(&self) -> f32;

    /// Convert the given normalized floating point value to a string value.
    fn normalized_value_to_string(&self, normalized: f32, include_unit: bool) -> String;

    /// Convert the given string value to a normalized floating point value.
    /// Returns `None` when conversion failed, else a valid normalized value.
    fn string_to_normalized_value(&self, string: &str) -> Option<f32>;
}

// -------------------------------------------------------------------------------------------------

mod float;
pub use float::FloatParameter;

mod r#enum;
pub use r#enum::EnumParameter;

mod store;
pub use store::ParameterStore;
