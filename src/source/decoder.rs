use std::{fs::File, io, path::Path};

use symphonia::core::{
    audio::{SampleBuffer, SignalSpec},
    codecs::{CodecParameters, Decoder, DecoderOptions},
    conv::ConvertibleSample,
    errors::Error as SymphoniaError,
    formats::{FormatOptions, FormatReader},
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
    units::TimeStamp,
};

use crate::error::Error;

// -------------------------------------------------------------------------------------------------

/// Decodes the default track of an audio file or memory buffer with symphonia.
pub struct AudioDecoder {
    track_id: u32,
    decoder: Box<dyn Decoder>,
    format: Box<dyn FormatReader>,
}

impl AudioDecoder {
    /// Create a new decoder from the given file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = File::open(path.as_ref()).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => Error::MediaFileNotFound,
            _ => Error::IoError(err),
        })?;
        let source_stream = MediaSourceStream::new(Box::new(file), Default::default());
        Self::from_source_stream(source_stream)
    }

    /// Create a new decoder from the given encoded file contents.
    pub fn from_buffer(buffer: Vec<u8>) -> Result<Self, Error> {
        let cursor = Box::new(io::Cursor::new(buffer));
        let source_stream = MediaSourceStream::new(cursor, Default::default());
        Self::from_source_stream(source_stream)
    }

    /// Create a new decoder from the given symphonia media source stream.
    pub fn from_source_stream(source_stream: MediaSourceStream) -> Result<Self, Error> {
        // No hint: let the probe guess the format from the contents.
        let hint = Hint::new();

        let format_opts: FormatOptions = Default::default();
        let metadata_opts: MetadataOptions = Default::default();
        let decoder_opts: DecoderOptions = Default::default();

        let probed = symphonia::default::get_probe()
            .format(&hint, source_stream, &format_opts, &metadata_opts)
            .map_err(|_| Error::MediaFileProbeError)?;
        let format = probed.format;

        let track = format.default_track().ok_or(Error::MediaFileNotFound)?;
        let track_id = track.id;

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &decoder_opts)
            .map_err(|err| Error::AudioDecodingError(Box::new(err)))?;

        Ok(Self {
            track_id,
            decoder,
            format,
        })
    }

    pub fn codec_params(&self) -> &CodecParameters {
        self.decoder.codec_params()
    }

    /// Sample rate and channel layout of the decoded track.
    pub fn signal_spec(&self) -> Result<SignalSpec, Error> {
        match (self.codec_params().sample_rate, self.codec_params().channels) {
            (Some(rate), Some(channels)) => Ok(SignalSpec { rate, channels }),
            _ => Err(Error::MediaFileProbeError),
        }
    }

    /// Decode the next packet of the track into the given interleaved sample buffer. The sample
    /// buffer gets reallocated when it's too small for the packet.
    ///
    /// Returns `None` at the end of the stream or on unrecoverable errors.
    pub fn read_packet<S>(&mut self, samples: &mut SampleBuffer<S>) -> Option<TimeStamp>
    where
        S: ConvertibleSample,
    {
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(err))
                    if err.kind() == io::ErrorKind::UnexpectedEof =>
                {
                    return None;
                }
                Err(err) => {
                    log::error!("format error: {err}");
                    return None;
                }
            };
            // consume metadata updates, if any
            while !self.format.metadata().is_latest() {
                self.format.metadata().pop();
            }
            if packet.track_id() != self.track_id {
                continue;
            }
            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let required = decoded.capacity() * decoded.spec().channels.count();
                    if samples.capacity() < required {
                        *samples = SampleBuffer::new(decoded.capacity() as u64, *decoded.spec());
                    }
                    samples.copy_interleaved_ref(decoded);
                    return Some(packet.ts());
                }
                Err(SymphoniaError::IoError(err)) => {
                    // skip packets which failed to decode
                    log::error!("io decode error: {err}");
                    continue;
                }
                Err(SymphoniaError::DecodeError(err)) => {
                    log::error!("decode error: {err}");
                    continue;
                }
                Err(err) => {
                    log::error!("fatal decode error: {err}");
                    return None;
                }
            }
        }
    }
}
