use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use basedrop::{Collector, Handle, Owned};
use crossbeam_queue::ArrayQueue;

use super::EngineMessage;
use crate::{
    effect::limiter::LimiterPersonality, envelope::EnvelopeShape, model::StochasticParameters,
    source::SourceBuffer, Error,
};

// -------------------------------------------------------------------------------------------------

/// Control context handle of an [`AudioEngine`](super::AudioEngine).
///
/// Parameter changes are written to the shared, lock free [`StochasticParameters`]. All other
/// changes are sent as messages to the engine, which applies them at the start of its next
/// processing cycle. Handles can be cloned and sent to other threads.
#[derive(Clone)]
pub struct AudioEngineHandle {
    parameters: Arc<StochasticParameters>,
    message_queue: Arc<ArrayQueue<EngineMessage>>,
    collector: Arc<Mutex<Collector>>,
    collector_handle: Handle,
}

impl AudioEngineHandle {
    pub(crate) fn new(
        parameters: Arc<StochasticParameters>,
        message_queue: Arc<ArrayQueue<EngineMessage>>,
        collector: Collector,
    ) -> Self {
        let collector_handle = collector.handle();
        Self {
            parameters,
            message_queue,
            collector: Arc::new(Mutex::new(collector)),
            collector_handle,
        }
    }

    /// The engine's shared grain model parameters.
    pub fn parameters(&self) -> &Arc<StochasticParameters> {
        &self.parameters
    }

    /// Select the grain source by id: 0 = sine, 1 = saw, 2 = square, 3 = noise oscillator,
    /// 4 = loaded source waveform. Invalid ids render silence.
    pub fn set_grain_source(&self, source_id: i32) -> Result<(), Error> {
        self.send(EngineMessage::SetGrainSource(source_id), "set_grain_source")
    }

    /// Pull the grain pitch towards the given note with the given normalized velocity as
    /// strength, and add the note to the engine's note history.
    pub fn apply_midi_influence(&self, note: u8, velocity: f32) -> Result<(), Error> {
        self.send(
            EngineMessage::ApplyMidiInfluence { note, velocity },
            "apply_midi_influence",
        )
    }

    pub fn set_envelope_shape(&self, shape: EnvelopeShape) -> Result<(), Error> {
        self.send(EngineMessage::SetEnvelopeShape(shape), "set_envelope_shape")
    }

    pub fn set_limiter_personality(&self, personality: LimiterPersonality) -> Result<(), Error> {
        self.send(
            EngineMessage::SetLimiterPersonality(personality),
            "set_limiter_personality",
        )
    }

    /// Decode the given audio file and hand it over to the engine as sample source.
    ///
    /// Files which fail to decode are logged and replace the engine's source with an empty
    /// buffer, so sample grains play silence. Only a failed handover returns an error.
    pub fn load_source_waveform<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let path = path.as_ref();
        let buffer = SourceBuffer::from_file(path).unwrap_or_else(|err| {
            log::warn!("Failed to load source waveform '{}': {err}", path.display());
            SourceBuffer::empty()
        });
        self.set_source_buffer(buffer)
    }

    /// Decode the given encoded audio file contents and hand them over to the engine as sample
    /// source. Failures are handled like in [`Self::load_source_waveform`].
    pub fn load_source_waveform_from_bytes(&self, bytes: Vec<u8>) -> Result<(), Error> {
        let buffer = SourceBuffer::from_bytes(bytes).unwrap_or_else(|err| {
            log::warn!("Failed to decode source waveform: {err}");
            SourceBuffer::empty()
        });
        self.set_source_buffer(buffer)
    }

    /// Hand over an already decoded source buffer to the engine.
    pub fn set_source_buffer(&self, buffer: SourceBuffer) -> Result<(), Error> {
        let buffer = Owned::new(&self.collector_handle, buffer);
        let result = self.send(
            EngineMessage::SetSourceBuffer(buffer),
            "set_source_buffer",
        );
        self.collect_garbage();
        result
    }

    /// Free resources which the engine released in its processing cycles.
    pub fn collect_garbage(&self) {
        match self.collector.lock() {
            Ok(mut collector) => collector.collect(),
            Err(err) => log::warn!("Failed to access the engine's garbage collector: {err}"),
        }
    }

    fn send(&self, message: EngineMessage, message_name: &str) -> Result<(), Error> {
        if self.message_queue.push(message).is_err() {
            log::warn!("Engine message queue is full. Failed to send a {message_name} message.");
            return Err(Error::SendError("Engine message queue is full".to_string()));
        }
        Ok(())
    }
}
