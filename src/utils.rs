//! Shared helpers: level conversion, atomic float cells, buffer layout and resampling.

pub mod atomic;
pub mod buffer;
pub mod resampler;

// -------------------------------------------------------------------------------------------------

const MINUS_INF_IN_DB: f32 = -200.0f32;

const LIN_TO_DB_FACTOR: f32 = 20.0f32 / std::f32::consts::LN_10;
const DB_TO_LIN_FACTOR: f32 = std::f32::consts::LN_10 / 20.0f32;

// -------------------------------------------------------------------------------------------------

/// Convert a linear gain value to decibels. Values at or below ~-240 dB map to -200 dB.
pub fn linear_to_db(value: f32) -> f32 {
    if value == 1.0 {
        return 0.0; // avoid rounding errors at exactly 0 dB
    } else if value > 1e-12f32 {
        return value.ln() * LIN_TO_DB_FACTOR;
    }
    MINUS_INF_IN_DB
}

/// Convert a decibel value to a linear gain value.
pub fn db_to_linear(value: f32) -> f32 {
    if value == 0.0f32 {
        return 1.0f32; // avoid rounding errors at exactly 0 dB
    } else if value > MINUS_INF_IN_DB {
        return (value * DB_TO_LIN_FACTOR).exp();
    }
    0.0f32
}

// -------------------------------------------------------------------------------------------------

/// Convert a (fractional) MIDI note number to a frequency in Hz, with A4 = note 69 = 440 Hz.
pub fn note_to_frequency(note: f32) -> f32 {
    440.0 * 2.0f32.powf((note - 69.0) / 12.0)
}

/// Playback speed ratio of a (fractional) MIDI note relative to the given root note.
pub fn note_to_speed(note: f32, root_note: f32) -> f64 {
    2.0f64.powf((note - root_note) as f64 / 12.0)
}

// -------------------------------------------------------------------------------------------------
