//! Blackman windowed sinc interpolation.

use std::{f64::consts::PI, sync::LazyLock};

use super::PlanarSamples;

// -------------------------------------------------------------------------------------------------

/// Number of kernel taps on each side of the read position.
pub const WINDOW_SIDE_POINTS: usize = 16;

/// Blackman window alpha.
const BLACKMAN_ALPHA: f64 = 0.16;

/// Kernel table resolution in entries per sample.
const KERNEL_OVERSAMPLING: usize = 512;

/// Normalized sinc: `sin(pi x) / (pi x)`, 1 at x = 0.
#[inline]
pub fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-12 {
        1.0
    } else {
        let pi_x = PI * x;
        pi_x.sin() / pi_x
    }
}

/// Blackman window at the given distance from the window center. The distance is normalized by
/// [`WINDOW_SIDE_POINTS`] so the window spans [-1, 1] across the kernel's half width. Values
/// outside the kernel support are 0.
#[inline]
pub fn blackman_window(distance: f64) -> f64 {
    let half_width = WINDOW_SIDE_POINTS as f64;
    if distance.abs() > half_width {
        return 0.0;
    }
    let a0 = (1.0 - BLACKMAN_ALPHA) / 2.0;
    let a1 = 0.5;
    let a2 = BLACKMAN_ALPHA / 2.0;
    let t = distance / half_width;
    a0 + a1 * (PI * t).cos() + a2 * (2.0 * PI * t).cos()
}

/// Windowed sinc kernel value at the given distance from the read position.
#[inline]
pub fn kernel(distance: f64) -> f64 {
    sinc(distance) * blackman_window(distance)
}

// -------------------------------------------------------------------------------------------------

/// Precomputed, symmetric kernel table over `[0, WINDOW_SIDE_POINTS]`.
struct SincKernelTable {
    values: Box<[f32]>,
}

impl SincKernelTable {
    fn new() -> Self {
        let len = WINDOW_SIDE_POINTS * KERNEL_OVERSAMPLING + 2;
        let values = (0..len)
            .map(|i| kernel(i as f64 / KERNEL_OVERSAMPLING as f64) as f32)
            .collect();
        Self { values }
    }

    /// Evaluate the kernel at the given distance using linear interpolation between table
    /// entries. Exact at integer distances.
    #[inline]
    fn lookup(&self, distance: f64) -> f32 {
        let index_float = distance.abs() * KERNEL_OVERSAMPLING as f64;
        let index = index_float as usize;
        if index + 1 >= self.values.len() {
            return 0.0;
        }
        let fraction = (index_float - index as f64) as f32;
        let a = self.values[index];
        let b = self.values[index + 1];
        a + (b - a) * fraction
    }
}

/// Static, shared kernel lookup table.
static SINC_KERNEL_LUT: LazyLock<SincKernelTable> = LazyLock::new(SincKernelTable::new);

// -------------------------------------------------------------------------------------------------

/// Interpolate a single channel at a fractional read position with a 33 tap windowed sinc
/// kernel. Samples outside the buffer are treated as zeros.
pub fn sample_channel(samples: &[f32], position: f64) -> f32 {
    if samples.is_empty() || !position.is_finite() {
        return 0.0;
    }
    let kernel_table = &*SINC_KERNEL_LUT;
    let side = WINDOW_SIDE_POINTS as i64;
    let center = position.round() as i64;
    let len = samples.len() as i64;

    let first = (center - side).max(0);
    let last = (center + side).min(len - 1);
    if first > last {
        return 0.0;
    }

    let mut output = 0.0f32;
    for k in first..=last {
        let distance = position - k as f64;
        output += samples[k as usize] * kernel_table.lookup(distance);
    }
    output
}

/// Interpolate the given channel of an optional planar buffer at a fractional read position.
///
/// Returns 0 for a missing or empty buffer, or an out-of-range channel.
pub fn sample<B: PlanarSamples + ?Sized>(buffer: Option<&B>, channel: usize, position: f64) -> f32 {
    let Some(buffer) = buffer else {
        return 0.0;
    };
    if buffer.frame_count() == 0 {
        return 0.0;
    }
    match buffer.channel(channel) {
        Some(samples) => sample_channel(samples, position),
        None => 0.0,
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn impulse(len: usize, at: usize) -> Vec<Vec<f32>> {
        let mut channel = vec![0.0; len];
        channel[at] = 1.0;
        vec![channel]
    }

    #[test]
    fn kernel_shape() {
        assert_eq!(sinc(0.0), 1.0);
        assert!(sinc(1.0).abs() < 1e-12);
        assert!(sinc(3.0).abs() < 1e-12);
        assert!((blackman_window(0.0) - 1.0).abs() < 1e-12);
        assert!(blackman_window(16.0).abs() < 1e-12);
        assert_eq!(blackman_window(16.5), 0.0);
        assert!((kernel(0.5) - kernel(-0.5)).abs() < 1e-12);
        // table lookup follows the exact kernel closely
        let table = &*SINC_KERNEL_LUT;
        for distance in [0.0, 0.1, 0.5, 1.25, 3.7, 10.01, 15.9] {
            assert!((table.lookup(distance) as f64 - kernel(distance)).abs() < 1e-4);
        }
        assert_eq!(table.lookup(17.0), 0.0);
    }

    #[test]
    fn impulse_identity() {
        let buffer = impulse(64, 20);
        assert!((sample(Some(&buffer), 0, 20.0) - 1.0).abs() < 1e-4);
        assert!(sample(Some(&buffer), 0, 21.0).abs() < 1e-4);
        assert!(sample(Some(&buffer), 0, 19.0).abs() < 1e-4);
        // half way between samples the impulse response is symmetric
        let left = sample(Some(&buffer), 0, 19.5);
        let right = sample(Some(&buffer), 0, 20.5);
        assert!((left - right).abs() < 1e-4);
        assert!(left > 0.5 && left < 0.7);
    }

    #[test]
    fn outside_support() {
        let buffer = impulse(64, 20);
        assert_eq!(sample(Some(&buffer), 0, 40.0), 0.0);
        assert_eq!(sample(Some(&buffer), 0, 1000.0), 0.0);
        assert_eq!(sample(Some(&buffer), 0, -100.0), 0.0);
    }

    #[test]
    fn invalid_sources() {
        let buffer = impulse(64, 20);
        let empty: Vec<Vec<f32>> = vec![];
        let empty_channel: Vec<Vec<f32>> = vec![vec![]];
        assert_eq!(sample(Some(&buffer), 1, 20.0), 0.0);
        assert_eq!(sample(Some(&empty), 0, 0.0), 0.0);
        assert_eq!(sample(Some(&empty_channel), 0, 0.0), 0.0);
        assert_eq!(sample::<Vec<Vec<f32>>>(None, 0, 20.0), 0.0);
        assert_eq!(sample(Some(&buffer), 0, f64::NAN), 0.0);
    }

    #[test]
    fn constant_signal_passes() {
        // away from the edges, a DC signal is reproduced at fractional positions
        let buffer = vec![vec![0.5; 256]];
        for position in [100.0, 100.25, 128.5, 140.9] {
            assert!((sample(Some(&buffer), 0, position) - 0.5).abs() < 0.02);
        }
    }
}
