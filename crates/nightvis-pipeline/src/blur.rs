//! Gaussian low-pass filter with an explicit kernel size.
//!
//! The kernel size is what the user controls, so the weights are built
//! from it directly (sigma follows from [`kernel_sigma`]) and handed to
//! [`imageproc::filter::separable_filter_equal`], which applies them as a
//! horizontal pass followed by a vertical pass.
//!
//! Pixels outside the image repeat the nearest edge pixel (replicate
//! border), so a uniform image stays uniform at any kernel size.

use crate::params::kernel_sigma;
use crate::types::Plane;

/// Normalized 1D Gaussian weights for an odd `kernel_size`.
///
/// The weights sum to 1. A kernel size of 1 yields `[1.0]`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn gaussian_kernel(kernel_size: u32) -> Vec<f32> {
    debug_assert!(kernel_size % 2 == 1, "kernel size must be odd");
    let radius = f64::from(kernel_size / 2);
    let sigma = f64::from(kernel_sigma(kernel_size));
    let scale = -0.5 / (sigma * sigma);

    let raw: Vec<f64> = (0..kernel_size)
        .map(|i| {
            let d = f64::from(i) - radius;
            (d * d * scale).exp()
        })
        .collect();
    let sum: f64 = raw.iter().sum();
    raw.into_iter().map(|w| (w / sum) as f32).collect()
}

/// Blur a plane with a Gaussian of the given odd kernel size.
///
/// A kernel size of 1 (or less) returns an exact copy: that is the
/// zero-blur case, and the high-pass signal derived from it is all zero.
#[must_use = "returns the blurred plane"]
pub fn gaussian_blur(plane: &Plane, kernel_size: u32) -> Plane {
    if kernel_size <= 1 {
        return plane.clone();
    }

    let kernel = gaussian_kernel(kernel_size);
    imageproc::filter::separable_filter_equal(plane.as_image(), &kernel).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 10x10 plane with a sharp 0-to-255 boundary at x=5.
    fn sharp_edge_plane() -> Plane {
        Plane::from_fn(10, 10, |x, _y| if x < 5 { 0.0 } else { 255.0 })
    }

    #[test]
    fn kernel_of_size_one_is_identity() {
        assert_eq!(gaussian_kernel(1), vec![1.0]);
    }

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        for size in [3, 5, 11, 99] {
            let k = gaussian_kernel(size);
            assert_eq!(k.len(), size as usize);
            let sum: f32 = k.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5, "size {size}: sum {sum}");
            for i in 0..k.len() / 2 {
                assert!((k[i] - k[k.len() - 1 - i]).abs() < 1e-7);
            }
            // Peak at the center.
            let center = k[k.len() / 2];
            assert!(k.iter().all(|&w| w <= center));
        }
    }

    #[test]
    fn kernel_size_one_returns_identical_plane() {
        let plane = sharp_edge_plane();
        assert_eq!(gaussian_blur(&plane, 1), plane);
    }

    #[test]
    fn output_dimensions_preserved() {
        let plane = Plane::from_fn(17, 31, |_, _| 0.0);
        let blurred = gaussian_blur(&plane, 7);
        assert_eq!(blurred.width(), 17);
        assert_eq!(blurred.height(), 31);
    }

    #[test]
    fn blur_smooths_sharp_edge() {
        let blurred = gaussian_blur(&sharp_edge_plane(), 5);
        let left = blurred.get(4, 5);
        let right = blurred.get(5, 5);
        assert!(left > 0.0, "expected left of edge above 0, got {left}");
        assert!(right < 255.0, "expected right of edge below 255, got {right}");
        // Far from the edge the border replication keeps values intact.
        assert!(blurred.get(0, 0).abs() < 1e-3);
        assert!((blurred.get(9, 9) - 255.0).abs() < 1e-3);
    }

    #[test]
    fn uniform_plane_unchanged_by_blur() {
        let plane = Plane::from_fn(10, 10, |_, _| 128.0);
        for size in [3, 5, 15] {
            let blurred = gaussian_blur(&plane, size);
            for &v in blurred.as_slice() {
                assert!((v - 128.0).abs() < 1e-3, "size {size}: got {v}");
            }
        }
    }

    #[test]
    fn border_pixels_repeat_outward() {
        let plane = Plane::from_fn(3, 1, |x, _| if x == 2 { 90.0 } else { 0.0 });
        let k = gaussian_kernel(3);
        let blurred = gaussian_blur(&plane, 3);
        assert!(blurred.get(0, 0).abs() < 1e-4);
        // The right neighbour of the last pixel is the last pixel itself.
        let expected = (k[1] + k[2]) * 90.0;
        assert!(
            (blurred.get(2, 0) - expected).abs() < 1e-3,
            "expected {expected}, got {}",
            blurred.get(2, 0)
        );
    }

    #[test]
    fn kernel_larger_than_image_is_handled() {
        let plane = Plane::from_fn(2, 2, |x, y| if x == y { 0.0 } else { 100.0 });
        let blurred = gaussian_blur(&plane, 99);
        assert_eq!(blurred.width(), 2);
        for &v in blurred.as_slice() {
            assert!((0.0..=100.0).contains(&v));
        }
    }
}
