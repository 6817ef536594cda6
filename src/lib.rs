#![doc = include_str!("../README.md")]

// private mods (will be partly re-exported)
mod effect;
mod engine;
mod envelope;
mod error;
mod grain;
mod history;
mod model;
mod oscillator;
mod parameter;
mod preset;
mod source;

// public, flat re-exports
pub use error::Error;

pub use engine::{
    AudioEngine, AudioEngineHandle, GrainSource, MidiEvent, MidiMessage, TransportInfo,
};
pub use envelope::{EnvelopeShape, GrainEnvelope};
pub use grain::Grain;
pub use history::{DecayingNote, NoteHistory};
pub use model::{StochasticModel, StochasticParameters, TemporalDistribution};
pub use oscillator::{Oscillator, Waveform};
pub use parameter::{
    EnumParameter, FloatParameter, Parameter, ParameterStore, ParameterType,
};
pub use preset::ModelSnapshot;
pub use source::SourceBuffer;

pub mod effects {
    //! Output stage effects.

    pub use super::effect::limiter::{Limiter, LimiterPersonality};
}

// public mods
pub mod utils;

// -------------------------------------------------------------------------------------------------

// Install the allocation checker for the test binary, so `process` can be verified to be
// allocation free.
#[cfg(all(test, feature = "assert-allocs"))]
#[global_allocator]
static ALLOCATOR: assert_no_alloc::AllocDisabler = assert_no_alloc::AllocDisabler;
