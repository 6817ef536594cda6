//! Time decaying history of recently played notes.

use std::f64::consts::PI;

// -------------------------------------------------------------------------------------------------

/// A recently played note whose influence halves with every elapsed bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayingNote {
    pub note_number: u8,
    pub initial_influence: f32,
    pub current_influence: f32,
    /// Musical position (in quarter notes) at which the note was played.
    pub start_position: f64,
    pub age_in_bars: f64,
}

// -------------------------------------------------------------------------------------------------

/// Tracks recently played external notes and exposes a time decaying modulation signal.
///
/// Note storage is preallocated: when full, adding a note replaces the oldest one, so the
/// history can be fed from the audio thread.
#[derive(Debug, Clone)]
pub struct NoteHistory {
    notes: Vec<DecayingNote>,
}

impl Default for NoteHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl NoteHistory {
    /// Default max number of remembered notes.
    pub const DEFAULT_CAPACITY: usize = 64;

    /// Notes are removed when their influence falls below this ratio of the initial influence.
    const REMOVAL_RATIO: f32 = 0.125;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            notes: Vec::with_capacity(capacity.max(1)),
        }
    }

    /// Remembered notes, oldest first.
    pub fn notes(&self) -> &[DecayingNote] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn clear(&mut self) {
        self.notes.clear();
    }

    /// Add a new note with the given velocity (0..=1) as initial influence, played at the given
    /// musical position.
    pub fn add_note(&mut self, note_number: u8, velocity: f32, start_position: f64) {
        if self.notes.len() == self.notes.capacity() {
            self.notes.remove(0);
        }
        self.notes.push(DecayingNote {
            note_number,
            initial_influence: velocity,
            current_influence: velocity,
            start_position,
            age_in_bars: 0.0,
        });
    }

    /// Recalculate all note ages and influences for the given musical position and remove notes
    /// which decayed below 1/8 of their initial influence.
    ///
    /// When the position jumps back before a note's start, e.g. when the host transport loops,
    /// the note restarts aging at the new position.
    pub fn update(&mut self, current_position: f64, positions_per_bar: f64) {
        if positions_per_bar <= 0.0 || !positions_per_bar.is_finite() {
            return;
        }
        self.notes.retain_mut(|note| {
            if current_position < note.start_position {
                note.start_position = current_position;
            }
            note.age_in_bars = (current_position - note.start_position) / positions_per_bar;
            note.current_influence =
                note.initial_influence * 0.5f64.powf(note.age_in_bars) as f32;
            note.current_influence >= note.initial_influence * Self::REMOVAL_RATIO
        });
    }

    /// Sum of a per note sine at one cycle per bar, scaled by each note's current influence.
    pub fn modulation_value(&self) -> f32 {
        self.notes
            .iter()
            .map(|note| (note.age_in_bars * 2.0 * PI).sin() as f32 * note.current_influence)
            .sum()
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const PPQ_PER_BAR: f64 = 4.0;

    #[test]
    fn decay() {
        let mut history = NoteHistory::new();
        history.add_note(60, 1.0, 0.0);
        assert_eq!(history.len(), 1);
        assert_eq!(history.notes()[0].current_influence, 1.0);

        history.update(PPQ_PER_BAR, PPQ_PER_BAR);
        assert_eq!(history.len(), 1);
        assert!((history.notes()[0].current_influence - 0.5).abs() < 1e-6);
        assert!((history.notes()[0].age_in_bars - 1.0).abs() < 1e-12);

        history.update(2.0 * PPQ_PER_BAR, PPQ_PER_BAR);
        assert!((history.notes()[0].current_influence - 0.25).abs() < 1e-6);

        // exactly 1/8 is kept, anything below is removed
        history.update(3.0 * PPQ_PER_BAR, PPQ_PER_BAR);
        assert_eq!(history.len(), 1);
        history.update(4.0 * PPQ_PER_BAR, PPQ_PER_BAR);
        assert!(history.is_empty());
    }

    #[test]
    fn removes_only_expired_notes() {
        let mut history = NoteHistory::new();
        history.add_note(60, 1.0, 0.0);
        history.add_note(64, 0.5, 8.0);
        history.update(16.0, PPQ_PER_BAR);
        assert_eq!(history.len(), 1);
        assert_eq!(history.notes()[0].note_number, 64);
        assert!((history.notes()[0].current_influence - 0.125).abs() < 1e-6);
    }

    #[test]
    fn modulation() {
        let mut history = NoteHistory::new();
        assert_eq!(history.modulation_value(), 0.0);

        history.add_note(60, 1.0, 0.0);
        history.update(0.0, PPQ_PER_BAR);
        assert!(history.modulation_value().abs() < 1e-6);

        // a quarter bar in: sine peak, scaled by the decayed influence
        history.update(1.0, PPQ_PER_BAR);
        let expected = 0.5f32.powf(0.25);
        assert!((history.modulation_value() - expected).abs() < 1e-5);

        // notes sum up
        history.add_note(67, 1.0, 0.0);
        history.update(1.0, PPQ_PER_BAR);
        assert!((history.modulation_value() - 2.0 * expected).abs() < 1e-5);
    }

    #[test]
    fn capacity() {
        let mut history = NoteHistory::with_capacity(2);
        history.add_note(1, 1.0, 0.0);
        history.add_note(2, 1.0, 0.0);
        history.add_note(3, 1.0, 0.0);
        assert_eq!(history.len(), 2);
        assert_eq!(history.notes()[0].note_number, 2);
        assert_eq!(history.notes()[1].note_number, 3);
    }

    #[test]
    fn position_jumps_back() {
        let mut history = NoteHistory::new();
        history.add_note(60, 1.0, 32.0);
        history.update(-1.0, PPQ_PER_BAR);
        assert_eq!(history.len(), 1);
        let note = history.notes()[0];
        assert_eq!(note.start_position, -1.0);
        assert_eq!(note.age_in_bars, 0.0);
        assert_eq!(note.current_influence, 1.0);
        assert_eq!(history.modulation_value(), 0.0);

        // decays from the new position on
        history.update(3.0, PPQ_PER_BAR);
        assert!((history.notes()[0].current_influence - 0.5).abs() < 1e-6);
        history.update(15.0, PPQ_PER_BAR);
        assert!(history.is_empty());
    }

    #[test]
    fn clear() {
        let mut history = NoteHistory::new();
        history.add_note(60, 1.0, 0.0);
        history.add_note(64, 0.5, 0.0);
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.modulation_value(), 0.0);
    }

    #[test]
    fn invalid_bar_length() {
        let mut history = NoteHistory::new();
        history.add_note(60, 1.0, 0.0);
        history.update(100.0, 0.0);
        history.update(100.0, f64::NAN);
        assert_eq!(history.len(), 1);
        assert_eq!(history.notes()[0].current_influence, 1.0);
    }
}
