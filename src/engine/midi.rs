//! Host MIDI events and transport info, as passed to [`AudioEngine::process`](super::AudioEngine).

// -------------------------------------------------------------------------------------------------

/// A MIDI channel message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MidiMessage {
    /// Note on with a normalized velocity in range 0.0..=1.0. A velocity of 0 is a note off.
    NoteOn { note: u8, velocity: f32 },
    NoteOff { note: u8 },
    /// Controller change with a normalized value in range 0.0..=1.0.
    ControlChange { controller: u8, value: f32 },
}

impl MidiMessage {
    /// Controller number of the "all notes off" channel mode message.
    pub const ALL_NOTES_OFF_CONTROLLER: u8 = 123;

    /// Normalize note ons with zero velocity into note offs.
    pub fn normalized(self) -> Self {
        match self {
            Self::NoteOn { note, velocity } if velocity <= 0.0 => Self::NoteOff { note },
            other => other,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// A MIDI message, timestamped within the currently processed block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MidiEvent {
    /// Frame offset of the event from the start of the block.
    pub frame_offset: u32,
    pub message: MidiMessage,
}

impl MidiEvent {
    pub fn new(frame_offset: u32, message: MidiMessage) -> Self {
        Self {
            frame_offset,
            message,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Host transport state at the start of a processed block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportInfo {
    /// Musical position in quarter notes, when the host provides one.
    pub ppq_position: Option<f64>,
    /// Tempo in beats per minute, when the host provides one.
    pub bpm: Option<f64>,
    /// Time signature as (numerator, denominator).
    pub time_signature: (u32, u32),
    pub is_playing: bool,
}

impl Default for TransportInfo {
    fn default() -> Self {
        Self {
            ppq_position: None,
            bpm: None,
            time_signature: (4, 4),
            is_playing: false,
        }
    }
}

impl TransportInfo {
    /// Tempo which is assumed when the host provides none.
    pub const DEFAULT_BPM: f64 = 120.0;

    /// Tempo, falling back to [`Self::DEFAULT_BPM`] for missing or invalid host values.
    pub fn bpm_or_default(&self) -> f64 {
        match self.bpm {
            Some(bpm) if bpm > 0.0 && bpm.is_finite() => bpm,
            _ => Self::DEFAULT_BPM,
        }
    }

    /// Length of a bar in quarter notes.
    pub fn ppq_per_bar(&self) -> f64 {
        let (numerator, denominator) = self.time_signature;
        if numerator == 0 || denominator == 0 {
            return 4.0;
        }
        4.0 * numerator as f64 / denominator as f64
    }

    /// Convert a duration in frames to quarter notes at the current tempo.
    pub fn frames_to_ppq(&self, frames: f64, sample_rate: f64) -> f64 {
        if sample_rate <= 0.0 {
            return 0.0;
        }
        frames / sample_rate * self.bpm_or_default() / 60.0
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_normalization() {
        assert_eq!(
            MidiMessage::NoteOn {
                note: 60,
                velocity: 0.0
            }
            .normalized(),
            MidiMessage::NoteOff { note: 60 }
        );
        let note_on = MidiMessage::NoteOn {
            note: 60,
            velocity: 0.5,
        };
        assert_eq!(note_on.normalized(), note_on);
    }

    #[test]
    fn transport() {
        let mut transport = TransportInfo::default();
        assert_eq!(transport.ppq_per_bar(), 4.0);
        transport.time_signature = (3, 4);
        assert_eq!(transport.ppq_per_bar(), 3.0);
        transport.time_signature = (6, 8);
        assert_eq!(transport.ppq_per_bar(), 3.0);
        transport.time_signature = (4, 0);
        assert_eq!(transport.ppq_per_bar(), 4.0);

        // one second at 120 bpm is two quarter notes
        assert_eq!(transport.frames_to_ppq(48000.0, 48000.0), 2.0);
        transport.bpm = Some(60.0);
        assert_eq!(transport.frames_to_ppq(48000.0, 48000.0), 1.0);
        transport.bpm = Some(-1.0);
        assert_eq!(transport.bpm_or_default(), 120.0);
    }
}
