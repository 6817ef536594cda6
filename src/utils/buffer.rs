//! Interleaved and planar buffer helpers.

// -------------------------------------------------------------------------------------------------

/// Frame wise access to an interleaved sample buffer.
pub trait InterleavedBufferMut {
    /// Iterate over mutable frames of the given channel count. Trailing samples which do not
    /// fill up a whole frame are skipped.
    fn frames_mut(&mut self, channel_count: usize) -> std::slice::ChunksExactMut<'_, f32>;

    /// Number of whole frames in the buffer for the given channel count.
    fn frame_count(&self, channel_count: usize) -> usize;
}

impl InterleavedBufferMut for [f32] {
    fn frames_mut(&mut self, channel_count: usize) -> std::slice::ChunksExactMut<'_, f32> {
        debug_assert!(channel_count > 0, "Need at least one channel");
        self.chunks_exact_mut(channel_count.max(1))
    }

    fn frame_count(&self, channel_count: usize) -> usize {
        self.len() / channel_count.max(1)
    }
}

// -------------------------------------------------------------------------------------------------

/// Copy the given interleaved buffer into a planar one.
/// The planar buffer's layout defines layout of the interleaved buffer (channel and frame count).
pub fn interleaved_to_planar(interleaved: &[f32], planar: &mut [Vec<f32>]) {
    let channel_count = planar.len();
    match channel_count {
        0 => (),
        1 => {
            for (p, i) in planar[0].iter_mut().zip(interleaved) {
                *p = *i;
            }
        }
        _ => {
            for (channel_index, channel_values) in planar.iter_mut().enumerate() {
                for (value, frame) in channel_values
                    .iter_mut()
                    .zip(interleaved.chunks_exact(channel_count))
                {
                    *value = frame[channel_index];
                }
            }
        }
    }
}

/// Fill all channels of the given interleaved buffer with zeros.
#[inline]
pub fn clear_buffer(buffer: &mut [f32]) {
    buffer.fill(0.0);
}

// -------------------------------------------------------------------------------------------------
