//! Frame compositor: resize normalization and crossfade blending.
//!
//! Everything here is pure and deterministic: no FFmpeg, no I/O. The
//! blend runs in gamma-encoded byte space, which is the standard
//! approximation for SDR content.

use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::probe::OutputGeometry;

/// One decoded video frame: packed RGB24, no stride padding.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Frame {
    /// Wrap a packed RGB24 buffer.
    ///
    /// # Panics
    /// Panics if the buffer length does not match `width * height * 3`.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        assert_eq!(
            data.len(),
            width as usize * height as usize * 3,
            "frame buffer length mismatch for {}x{}",
            width,
            height,
        );
        Self { width, height, data }
    }

    /// Check whether this frame already matches the target geometry.
    pub fn matches(&self, geometry: &OutputGeometry) -> bool {
        self.width == geometry.width && self.height == geometry.height
    }
}

/// Resize a frame to the job's output geometry.
///
/// Pure and deterministic: triangle (bilinear) filtering, same output for
/// the same input. Frames that already match pass through untouched.
pub fn normalize(frame: Frame, geometry: &OutputGeometry) -> Frame {
    if frame.matches(geometry) {
        return frame;
    }

    let src = RgbImage::from_raw(frame.width, frame.height, frame.data)
        .unwrap_or_else(|| unreachable!("Frame invariant guarantees buffer length"));
    let resized = imageops::resize(&src, geometry.width, geometry.height, FilterType::Triangle);

    Frame::new(geometry.width, geometry.height, resized.into_raw())
}

/// Blend two gamma-encoded byte values; `alpha = 0.0` yields `a`, `1.0` yields `b`.
#[inline]
fn blend_byte(a: u8, b: u8, alpha: f64) -> u8 {
    ((1.0 - alpha) * a as f64 + alpha * b as f64).round() as u8
}

/// Lazy crossfade sequence between two normalized frames.
///
/// Yields exactly `steps` frames. Frame `i` (0-based) carries incoming
/// weight `(i + 1) / steps`, so the final step equals the incoming frame;
/// it doubles as that clip's first streamed frame and the caller never
/// re-appends it. Finite, non-restartable, consumed exactly once.
pub struct Crossfade {
    from: Frame,
    to: Frame,
    steps: usize,
    next: usize,
}

impl Iterator for Crossfade {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        if self.next >= self.steps {
            return None;
        }

        let alpha = (self.next + 1) as f64 / self.steps as f64;
        let data: Vec<u8> = self
            .from
            .data
            .iter()
            .zip(self.to.data.iter())
            .map(|(&a, &b)| blend_byte(a, b, alpha))
            .collect();

        self.next += 1;
        Some(Frame::new(self.from.width, self.from.height, data))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.steps - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Crossfade {}

/// Build a crossfade from `from` into `to` over `steps` frames.
///
/// `steps` has a floor of 1; there are no zero-length transitions.
///
/// # Panics
/// Panics if the frames differ in dimensions; callers normalize both
/// sides to the job geometry first.
pub fn crossfade(from: Frame, to: Frame, steps: usize) -> Crossfade {
    assert_eq!(
        (from.width, from.height),
        (to.width, to.height),
        "crossfade requires equal frame dimensions",
    );

    Crossfade {
        from,
        to,
        steps: steps.max(1),
        next: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, value: u8) -> Frame {
        Frame::new(width, height, vec![value; width as usize * height as usize * 3])
    }

    #[test]
    fn test_normalize_passthrough() {
        let g = OutputGeometry { width: 4, height: 2, fps: 30.0 };
        let f = solid(4, 2, 17);
        let out = normalize(f.clone(), &g);
        assert_eq!(out, f);
    }

    #[test]
    fn test_normalize_resizes_to_geometry() {
        let g = OutputGeometry { width: 8, height: 4, fps: 30.0 };
        let out = normalize(solid(4, 2, 100), &g);
        assert_eq!(out.width, 8);
        assert_eq!(out.height, 4);
        assert_eq!(out.data.len(), 8 * 4 * 3);
        // A solid frame stays solid under any interpolating filter.
        assert!(out.data.iter().all(|&v| v == 100));
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let g = OutputGeometry { width: 3, height: 3, fps: 30.0 };
        let mut f = solid(6, 4, 0);
        for (i, v) in f.data.iter_mut().enumerate() {
            *v = (i % 251) as u8;
        }
        let a = normalize(f.clone(), &g);
        let b = normalize(f, &g);
        assert_eq!(a, b);
    }

    #[test]
    fn test_crossfade_length_is_exactly_steps() {
        for steps in [1, 2, 5, 30] {
            let seq: Vec<Frame> = crossfade(solid(2, 2, 0), solid(2, 2, 240), steps).collect();
            assert_eq!(seq.len(), steps);
        }
    }

    #[test]
    fn test_crossfade_weights_follow_formula() {
        let steps = 4;
        let seq: Vec<Frame> = crossfade(solid(2, 2, 0), solid(2, 2, 200), steps).collect();

        // out[i] = 0 * (1 - (i+1)/4) + 200 * ((i+1)/4)
        for (i, frame) in seq.iter().enumerate() {
            let expected = (200.0 * (i + 1) as f64 / steps as f64).round() as u8;
            assert!(
                frame.data.iter().all(|&v| v == expected),
                "step {i}: got {}, expected {expected}",
                frame.data[0],
            );
        }
    }

    #[test]
    fn test_crossfade_final_step_equals_incoming_frame() {
        let to = solid(2, 2, 123);
        let seq: Vec<Frame> = crossfade(solid(2, 2, 7), to.clone(), 6).collect();
        assert_eq!(seq.last().unwrap(), &to);
    }

    #[test]
    fn test_crossfade_complementary_blend_sums() {
        // crossfade(A,B,n)[i] and crossfade(B,A,n)[n-1-i] use complementary
        // weights of the shared endpoints; their per-pixel sum reconstructs
        // A+B within rounding when the pair of weights mirrors across 1/2.
        let n = 5;
        let a = solid(2, 2, 60);
        let b = solid(2, 2, 180);
        let ab: Vec<Frame> = crossfade(a.clone(), b.clone(), n).collect();
        let ba: Vec<Frame> = crossfade(b, a, n).collect();

        for i in 0..n {
            // Weight of B in ab[i] is (i+1)/n; weight of B in ba[n-1-i] is
            // 1 - (n-i)/n = i/n. Sum of B weights: (2i+1)/n, symmetric with
            // the A weights around the midpoint.
            let sum = ab[i].data[0] as i32 + ba[n - 1 - i].data[0] as i32;
            let mirror = ab[n - 1 - i].data[0] as i32 + ba[i].data[0] as i32;
            assert!((sum - mirror).abs() <= 2, "blend not symmetric at step {i}");
        }
    }

    #[test]
    fn test_crossfade_zero_steps_floors_to_one() {
        let seq: Vec<Frame> = crossfade(solid(2, 2, 0), solid(2, 2, 255), 0).collect();
        assert_eq!(seq.len(), 1);
        // Single step jumps straight to the incoming frame.
        assert!(seq[0].data.iter().all(|&v| v == 255));
    }

    #[test]
    #[should_panic(expected = "equal frame dimensions")]
    fn test_crossfade_rejects_mismatched_frames() {
        let _ = crossfade(solid(2, 2, 0), solid(4, 4, 0), 3);
    }

    #[test]
    fn test_blend_byte_endpoints() {
        assert_eq!(blend_byte(0, 255, 0.0), 0);
        assert_eq!(blend_byte(0, 255, 1.0), 255);
        assert_eq!(blend_byte(100, 200, 0.5), 150);
    }
}
