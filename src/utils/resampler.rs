//! Fractional position readers for pitched playback of recorded, planar sample buffers.

pub mod sinc;

// -------------------------------------------------------------------------------------------------

/// Read access to a planar, multichannel sample buffer.
pub trait PlanarSamples {
    /// Number of channels in the buffer.
    fn channel_count(&self) -> usize;
    /// Number of sample frames per channel.
    fn frame_count(&self) -> usize;
    /// Samples of the given channel, if it exists.
    fn channel(&self, index: usize) -> Option<&[f32]>;
}

impl PlanarSamples for [Vec<f32>] {
    fn channel_count(&self) -> usize {
        self.len()
    }
    fn frame_count(&self) -> usize {
        self.first().map_or(0, |c| c.len())
    }
    fn channel(&self, index: usize) -> Option<&[f32]> {
        self.get(index).map(|c| c.as_slice())
    }
}

impl PlanarSamples for Vec<Vec<f32>> {
    fn channel_count(&self) -> usize {
        self.as_slice().channel_count()
    }
    fn frame_count(&self) -> usize {
        self.as_slice().frame_count()
    }
    fn channel(&self, index: usize) -> Option<&[f32]> {
        self.as_slice().channel(index)
    }
}
