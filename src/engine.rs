//! The grain pool and renderer: schedules, renders and mixes grains in the render context.

use std::{f32::consts::FRAC_PI_4, sync::Arc};

use basedrop::{Collector, Owned};
use crossbeam_queue::ArrayQueue;

use crate::{
    effect::limiter::{Limiter, LimiterPersonality},
    envelope::{EnvelopeShape, GrainEnvelope},
    grain::Grain,
    history::NoteHistory,
    model::{StochasticModel, StochasticParameters},
    oscillator::{Oscillator, Waveform},
    source::SourceBuffer,
    utils::{
        buffer::{clear_buffer, InterleavedBufferMut},
        note_to_frequency, note_to_speed,
        resampler::sinc,
    },
};

// -------------------------------------------------------------------------------------------------

mod handle;
mod midi;

pub use handle::AudioEngineHandle;
pub use midi::{MidiEvent, MidiMessage, TransportInfo};

// -------------------------------------------------------------------------------------------------

/// Where grains read their samples from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrainSource {
    /// The engine's shared oscillator with the given waveform, tuned to each grain's pitch.
    Oscillator(Waveform),
    /// The loaded source waveform, played back at a pitch dependent rate.
    Sample,
}

impl Default for GrainSource {
    fn default() -> Self {
        Self::Oscillator(Waveform::default())
    }
}

impl GrainSource {
    /// Id of the sample source. Ids below are oscillator waveforms.
    pub const SAMPLE_ID: i32 = 4;

    /// Resolve a grain source id. Returns `None` for invalid ids.
    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            Self::SAMPLE_ID => Some(Self::Sample),
            0..Self::SAMPLE_ID => Waveform::from_repr(id as u8).map(Self::Oscillator),
            _ => None,
        }
    }

    pub fn id(&self) -> i32 {
        match self {
            Self::Oscillator(waveform) => *waveform as i32,
            Self::Sample => Self::SAMPLE_ID,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Messages from an [`AudioEngineHandle`] to its engine, applied in the render context.
pub(crate) enum EngineMessage {
    SetGrainSource(i32),
    ApplyMidiInfluence { note: u8, velocity: f32 },
    SetEnvelopeShape(EnvelopeShape),
    SetLimiterPersonality(LimiterPersonality),
    SetSourceBuffer(Owned<SourceBuffer>),
}

// -------------------------------------------------------------------------------------------------

/// Real-time granular synthesis engine.
///
/// Owns the live grain pool, a countdown to the next grain onset, the oscillator, the loaded
/// source waveform, the grain envelope, the output limiter and the note history. It's driven by
/// the host via [`Self::prepare`] and [`Self::process`] in the render context, and controlled
/// via its [`AudioEngineHandle`] from any other thread.
///
/// `process` does not allocate, lock or block: the grain pool's capacity is fixed at creation
/// and new grains are dropped when the pool is full.
pub struct AudioEngine {
    parameters: Arc<StochasticParameters>,
    model: StochasticModel,
    grains: Vec<Grain>,
    grain_offsets: Vec<usize>,
    grain_capacity: usize,
    next_grain_id: u32,
    dropped_grain_count: u64,
    samples_until_next_grain: i64,
    scheduling_paused: bool,
    oscillator: Oscillator,
    grain_source: Option<GrainSource>,
    source_buffer: Option<Owned<SourceBuffer>>,
    envelope: GrainEnvelope,
    limiter: Limiter,
    history: NoteHistory,
    last_note: Option<u8>,
    musical_position: f64,
    sample_rate: f64,
    block_size: usize,
    message_queue: Arc<ArrayQueue<EngineMessage>>,
}

impl AudioEngine {
    /// Default max number of simultaneously playing grains.
    pub const DEFAULT_GRAIN_CAPACITY: usize = 1024;
    /// Max number of pending handle messages.
    pub const MESSAGE_QUEUE_SIZE: usize = 256;
    /// Sample rate used until the engine got prepared, or when the host passes an invalid one.
    pub const DEFAULT_SAMPLE_RATE: f64 = 44100.0;
    /// Root note of source waveforms: grains with this pitch play them at their original speed.
    pub const SAMPLE_ROOT_NOTE: f32 = 60.0;
    /// Pitch modulation depth of the note history in semitones.
    pub const PITCH_MODULATION_DEPTH: f32 = 1.0;

    /// Create a new engine with default parameters and the given grain pool capacity, and a
    /// handle to control it.
    pub fn new(grain_capacity: usize) -> (Self, AudioEngineHandle) {
        let parameters = Arc::new(StochasticParameters::new());
        Self::with_model(StochasticModel::new(parameters), grain_capacity)
    }

    /// Create a new engine which generates grains with the given model.
    pub fn with_model(model: StochasticModel, grain_capacity: usize) -> (Self, AudioEngineHandle) {
        let parameters = Arc::clone(model.parameters());
        let message_queue = Arc::new(ArrayQueue::new(Self::MESSAGE_QUEUE_SIZE));
        let grain_capacity = grain_capacity.max(1);
        let sample_rate = Self::DEFAULT_SAMPLE_RATE;

        let mut oscillator = Oscillator::new();
        oscillator.set_sample_rate(sample_rate);
        parameters.set_sample_rate(sample_rate);

        let engine = Self {
            parameters: Arc::clone(&parameters),
            model,
            grains: Vec::with_capacity(grain_capacity),
            grain_offsets: Vec::with_capacity(grain_capacity),
            grain_capacity,
            next_grain_id: 0,
            dropped_grain_count: 0,
            samples_until_next_grain: 0,
            scheduling_paused: true,
            oscillator,
            grain_source: Some(GrainSource::default()),
            source_buffer: None,
            envelope: GrainEnvelope::default(),
            limiter: Limiter::default(),
            history: NoteHistory::new(),
            last_note: None,
            musical_position: 0.0,
            sample_rate,
            block_size: 0,
            message_queue: Arc::clone(&message_queue),
        };
        let handle = AudioEngineHandle::new(parameters, message_queue, Collector::new());
        (engine, handle)
    }

    /// The engine's shared grain model parameters.
    pub fn parameters(&self) -> &Arc<StochasticParameters> {
        &self.parameters
    }

    /// Currently playing grains.
    pub fn grains(&self) -> &[Grain] {
        &self.grains
    }

    pub fn grain_count(&self) -> usize {
        self.grains.len()
    }

    /// Max number of simultaneously playing grains.
    pub fn grain_capacity(&self) -> usize {
        self.grain_capacity
    }

    /// Number of grains which got dropped because the grain pool was full.
    pub fn dropped_grain_count(&self) -> u64 {
        self.dropped_grain_count
    }

    /// Selected grain source, `None` when an invalid source id got selected.
    pub fn grain_source(&self) -> Option<GrainSource> {
        self.grain_source
    }

    /// Currently loaded source waveform, if any.
    pub fn source_buffer(&self) -> Option<&SourceBuffer> {
        self.source_buffer.as_deref()
    }

    pub fn note_history(&self) -> &NoteHistory {
        &self.history
    }

    pub fn envelope_shape(&self) -> EnvelopeShape {
        self.envelope.shape()
    }

    pub fn limiter_personality(&self) -> LimiterPersonality {
        self.limiter.personality()
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Prepare for streaming with the given sample rate and max block size.
    ///
    /// Stops all playing grains, forgets played notes, rewinds the internal musical clock and
    /// re-arms the grain scheduler.
    pub fn prepare(&mut self, sample_rate: f64, block_size: usize) {
        self.sample_rate = if sample_rate > 0.0 && sample_rate.is_finite() {
            sample_rate
        } else {
            log::warn!(
                "Invalid sample rate {sample_rate}, using {} instead",
                Self::DEFAULT_SAMPLE_RATE
            );
            Self::DEFAULT_SAMPLE_RATE
        };
        self.block_size = block_size;
        log::debug!(
            "Preparing audio engine: {} Hz, {} frames per block",
            self.sample_rate,
            block_size
        );

        self.oscillator.set_sample_rate(self.sample_rate);
        self.parameters.set_sample_rate(self.sample_rate);
        self.limiter.prepare(self.sample_rate);

        self.grains.clear();
        self.grain_offsets.clear();
        self.scheduling_paused = true;
        self.rearm_scheduler();

        self.history.clear();
        self.release_midi_influence();
        self.parameters.set_pitch_modulation(0.0);
        self.musical_position = 0.0;
    }

    /// Render the next block of grains into the given interleaved buffer, replacing its
    /// contents.
    ///
    /// MIDI events steer the grain model's pitch. The transport info drives the note history's
    /// decay; without a host position the engine advances its own musical clock.
    pub fn process(
        &mut self,
        buffer: &mut [f32],
        channel_count: usize,
        midi_events: &[MidiEvent],
        transport: &TransportInfo,
    ) {
        let block_position = transport.ppq_position.unwrap_or(self.musical_position);
        self.process_messages(block_position);

        clear_buffer(buffer);
        if channel_count == 0 {
            return;
        }
        let frame_count = buffer.frame_count(channel_count);

        // note history
        self.process_midi_events(midi_events, block_position, transport);
        self.history.update(block_position, transport.ppq_per_bar());
        self.parameters
            .set_pitch_modulation(self.history.modulation_value() * Self::PITCH_MODULATION_DEPTH);
        self.musical_position =
            block_position + transport.frames_to_ppq(frame_count as f64, self.sample_rate);

        // grains
        self.schedule_grains(frame_count);
        self.render_grains(buffer, channel_count);

        // channels beyond stereo get the stereo mix
        if channel_count > 2 {
            for frame in buffer.frames_mut(channel_count) {
                let center = (frame[0] + frame[1]) * 0.5;
                for sample in &mut frame[2..] {
                    *sample = center;
                }
            }
        }

        self.limiter.process(buffer, channel_count);

        self.grains.retain(Grain::is_alive);
    }

    fn process_messages(&mut self, block_position: f64) {
        while let Some(message) = self.message_queue.pop() {
            match message {
                EngineMessage::SetGrainSource(id) => {
                    self.grain_source = GrainSource::from_id(id);
                    if let Some(GrainSource::Oscillator(waveform)) = self.grain_source {
                        if self.oscillator.waveform() != waveform {
                            self.oscillator.set_waveform(waveform);
                        }
                    }
                }
                EngineMessage::ApplyMidiInfluence { note, velocity } => {
                    self.note_on(note, velocity, block_position);
                }
                EngineMessage::SetEnvelopeShape(shape) => {
                    self.envelope.set_shape(shape);
                }
                EngineMessage::SetLimiterPersonality(personality) => {
                    self.limiter.set_personality(personality);
                }
                EngineMessage::SetSourceBuffer(buffer) => {
                    // the old buffer is released to the handle's collector
                    self.source_buffer = Some(buffer);
                }
            }
        }
    }

    fn process_midi_events(
        &mut self,
        midi_events: &[MidiEvent],
        block_position: f64,
        transport: &TransportInfo,
    ) {
        for event in midi_events {
            match event.message.normalized() {
                MidiMessage::NoteOn { note, velocity } => {
                    let position = block_position
                        + transport.frames_to_ppq(event.frame_offset as f64, self.sample_rate);
                    self.note_on(note, velocity, position);
                }
                MidiMessage::NoteOff { note } => {
                    if self.last_note == Some(note) {
                        self.release_midi_influence();
                    }
                }
                MidiMessage::ControlChange { controller, .. } => {
                    if controller == MidiMessage::ALL_NOTES_OFF_CONTROLLER {
                        self.release_midi_influence();
                    }
                }
            }
        }
    }

    fn note_on(&mut self, note: u8, velocity: f32, position: f64) {
        let velocity = velocity.clamp(0.0, 1.0);
        self.parameters.set_midi_influence(note as f32, velocity);
        // silent notes would never decay out of the history
        if velocity > 0.0 {
            self.history.add_note(note, velocity, position);
            self.last_note = Some(note);
        }
    }

    fn release_midi_influence(&mut self) {
        let target = self.parameters.midi_target_pitch();
        self.parameters.set_midi_influence(target, 0.0);
        self.last_note = None;
    }

    /// Query the model for the next grain interval. Non positive intervals are raised to one
    /// sample, so a single cycle always terminates.
    fn next_grain_interval(&mut self) -> Option<i64> {
        match self.model.samples_until_next_event() {
            StochasticModel::PAUSED => None,
            interval => Some(interval.max(1) as i64),
        }
    }

    fn rearm_scheduler(&mut self) {
        if let Some(interval) = self.next_grain_interval() {
            self.samples_until_next_grain = interval;
            self.scheduling_paused = false;
        } else {
            self.scheduling_paused = true;
        }
    }

    /// Spawn all grains which start in the next `frame_count` frames and memorize their start
    /// frames within the block.
    fn schedule_grains(&mut self, frame_count: usize) {
        self.grain_offsets.clear();
        self.grain_offsets.resize(self.grains.len(), 0);

        // resume when the model stopped pausing
        if self.scheduling_paused {
            self.rearm_scheduler();
        }
        let max_grains = (self.parameters.num_grains().max(0) as usize).min(self.grain_capacity());

        // a countdown of n places the next onset n - 1 frames after the current frame
        let mut frame = 0;
        while !self.scheduling_paused && frame < frame_count {
            let remaining = (frame_count - frame) as i64;
            if self.samples_until_next_grain > remaining {
                self.samples_until_next_grain -= remaining;
                break;
            }
            let onset = frame + (self.samples_until_next_grain.max(1) - 1) as usize;
            if self.grains.len() < max_grains {
                let mut grain = Grain::new();
                self.model.generate_grain(&mut grain);
                grain.id = self.next_grain_id;
                self.next_grain_id = self.next_grain_id.wrapping_add(1);
                self.grains.push(grain);
                self.grain_offsets.push(onset);
            } else {
                self.dropped_grain_count += 1;
            }
            frame = onset + 1;
            match self.next_grain_interval() {
                Some(interval) => self.samples_until_next_grain = interval,
                None => self.scheduling_paused = true,
            }
        }
    }

    /// Mix all live grains into the cleared buffer. Each grain starts rendering at its start
    /// frame within the block.
    fn render_grains(&mut self, buffer: &mut [f32], channel_count: usize) {
        let source_buffer = self.source_buffer.as_deref();
        let source_speed_factor = match source_buffer {
            Some(source) if source.sample_rate() > 0 => {
                source.sample_rate() as f64 / self.sample_rate
            }
            _ => 1.0,
        };

        for (grain, offset) in self.grains.iter_mut().zip(self.grain_offsets.iter()) {
            // equal power panning
            let angle = (grain.pan.clamp(-1.0, 1.0) + 1.0) * FRAC_PI_4;
            let (gain_right, gain_left) = angle.sin_cos();

            let increment = match self.grain_source {
                Some(GrainSource::Oscillator(_)) => self
                    .oscillator
                    .phase_increment_for(note_to_frequency(grain.pitch)),
                Some(GrainSource::Sample) => {
                    note_to_speed(grain.pitch, Self::SAMPLE_ROOT_NOTE) * source_speed_factor
                }
                None => 0.0,
            };

            for frame in buffer.frames_mut(channel_count).skip(*offset) {
                if !grain.is_alive() {
                    break;
                }
                let value = match self.grain_source {
                    Some(GrainSource::Oscillator(_)) => {
                        let value = self.oscillator.sample_at_phase(grain.source_position);
                        grain.source_position = (grain.source_position + increment).fract();
                        value
                    }
                    Some(GrainSource::Sample) => {
                        let value = sinc::sample(source_buffer, 0, grain.source_position);
                        grain.source_position += increment;
                        value
                    }
                    None => 0.0,
                };
                let value = value
                    * self
                        .envelope
                        .amplitude(grain.age_in_samples, grain.duration_in_samples)
                    * grain.amplitude;

                if channel_count == 1 {
                    frame[0] += value * (gain_left + gain_right) * 0.5;
                } else {
                    frame[0] += value * gain_left;
                    frame[1] += value * gain_right;
                }
                grain.advance();
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------
