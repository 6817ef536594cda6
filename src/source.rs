//! Decoded, planar source waveforms for sample based grains.

use std::path::Path;

use symphonia::core::audio::SampleBuffer;

use crate::{
    utils::{buffer::interleaved_to_planar, resampler::PlanarSamples},
    Error,
};

mod decoder;
use decoder::AudioDecoder;

// -------------------------------------------------------------------------------------------------

/// An immutable, planar multichannel sample buffer, tagged with its sample rate.
///
/// Loaded and decoded in the control context, then handed over to the
/// [`AudioEngine`](crate::AudioEngine), which reads it through the windowed sinc resampler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl SourceBuffer {
    /// Decode buffer size when the decoder has no packet size hint.
    const DEFAULT_DECODE_FRAMES: u64 = 8 * 1024;

    /// Create a new buffer from planar channels. All channels are truncated to the length of
    /// the shortest one.
    pub fn new(mut channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        let frame_count = channels.iter().map(Vec::len).min().unwrap_or(0);
        for channel in &mut channels {
            channel.truncate(frame_count);
        }
        Self {
            channels,
            sample_rate,
        }
    }

    /// An empty buffer without channels. Reads from it are silent.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Decode the given audio file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::decode(AudioDecoder::from_file(path)?)
    }

    /// Decode the given encoded audio file contents.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, Error> {
        Self::decode(AudioDecoder::from_buffer(bytes)?)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }

    fn decode(mut decoder: AudioDecoder) -> Result<Self, Error> {
        let spec = decoder.signal_spec()?;
        let channel_count = spec.channels.count();
        if channel_count == 0 {
            return Err(Error::MediaFileProbeError);
        }

        let capacity = decoder.codec_params().n_frames.unwrap_or(0) as usize * channel_count;
        let mut interleaved = Vec::with_capacity(capacity);
        let packet_frames = decoder
            .codec_params()
            .max_frames_per_packet
            .unwrap_or(Self::DEFAULT_DECODE_FRAMES);
        let mut decode_buffer = SampleBuffer::<f32>::new(packet_frames, spec);
        while decoder.read_packet(&mut decode_buffer).is_some() {
            interleaved.extend_from_slice(decode_buffer.samples());
        }
        if interleaved.is_empty() {
            return Err(Error::AudioDecodingError(Box::new(
                symphonia::core::errors::Error::DecodeError("file contains no audio samples"),
            )));
        }

        let frame_count = interleaved.len() / channel_count;
        let mut channels = vec![vec![0.0; frame_count]; channel_count];
        interleaved_to_planar(&interleaved, &mut channels);
        log::info!(
            "Decoded source waveform: {frame_count} frames, {channel_count} channels, {} Hz",
            spec.rate
        );
        Ok(Self::new(channels, spec.rate))
    }
}

impl PlanarSamples for SourceBuffer {
    fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn frame_count(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::utils::resampler::sinc;

    fn wav_file(channel_count: u16, frames: &[[i16; 2]]) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: channel_count,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut bytes = Vec::new();
        {
            let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec).unwrap();
            for frame in frames {
                for sample in frame.iter().take(channel_count as usize) {
                    writer.write_sample(*sample).unwrap();
                }
            }
            writer.finalize().unwrap();
        }
        bytes
    }

    #[test]
    fn decode_wav() {
        let frames = (0..1000)
            .map(|i| [(i * 16) as i16, -((i * 16) as i16)])
            .collect::<Vec<_>>();
        let buffer = SourceBuffer::from_bytes(wav_file(2, &frames)).unwrap();
        assert_eq!(buffer.sample_rate(), 22050);
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.frame_count(), 1000);
        assert!(!buffer.is_empty());
        let left = buffer.channel(0).unwrap();
        let right = buffer.channel(1).unwrap();
        assert!((left[500] - 8000.0 / 32768.0).abs() < 1e-4);
        assert!((right[500] + 8000.0 / 32768.0).abs() < 1e-4);

        // resampler reads decoded buffers
        let value = sinc::sample(Some(&buffer), 0, 500.0);
        assert!((value - left[500]).abs() < 1e-3);
    }

    #[test]
    fn decode_errors() {
        assert!(matches!(
            SourceBuffer::from_bytes(b"definitely not an audio file".to_vec()),
            Err(Error::MediaFileProbeError)
        ));
        assert!(SourceBuffer::from_bytes(Vec::new()).is_err());
        assert!(matches!(
            SourceBuffer::from_file("/this/file/does/not/exist.wav"),
            Err(Error::MediaFileNotFound)
        ));
    }

    #[test]
    fn empty_buffer() {
        let buffer = SourceBuffer::empty();
        assert!(buffer.is_empty());
        assert_eq!(buffer.channel_count(), 0);
        assert_eq!(sinc::sample(Some(&buffer), 0, 0.0), 0.0);

        let ragged = SourceBuffer::new(vec![vec![1.0; 10], vec![1.0; 4]], 44100);
        assert_eq!(ragged.frame_count(), 4);
        assert_eq!(ragged.channel(0).unwrap().len(), 4);
    }
}
