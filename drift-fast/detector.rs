use drift_core::{FastParams, Keypoint};
use log::debug;
use rayon::prelude::*;

use crate::error::{FastError, FastResult};
use crate::refinement::KeypointRefinement;
use crate::types::{CornerType, ScoredKeypoint};
use crate::utils::has_contiguous_arc;

/// FAST-9: nine contiguous circle pixels must agree
const ARC_LENGTH: usize = 9;

/// FAST requires at least 7x7 image (3-pixel border on each side)
const MIN_SIZE: usize = 7;

/// Bresenham circle of radius 3, clockwise from 12 o'clock
pub const FAST_OFFSETS: [(i32, i32); 16] = [
    (0, -3), (1, -3), (2, -2), (3, -1),
    (3, 0), (3, 1), (2, 2), (1, 3),
    (0, 3), (-1, 3), (-2, 2), (-3, 1),
    (-3, 0), (-3, -1), (-2, -2), (-1, -3),
];

/// Single-scale FAST corner detector for row-major 8-bit images
#[derive(Debug, Clone)]
pub struct FastDetector {
    params: FastParams,
    w: usize,
    h: usize,
}

impl FastDetector {
    /// Creates a new FAST detector with validation
    pub fn new(params: FastParams, width: usize, height: usize) -> FastResult<Self> {
        if width == 0 || height == 0 {
            return Err(FastError::InvalidImageSize { width, height });
        }

        if width < MIN_SIZE || height < MIN_SIZE {
            return Err(FastError::ImageTooSmall {
                width,
                height,
                min_size: MIN_SIZE,
            });
        }

        // 0 would detect everything, >127 could cause issues with u8 arithmetic
        if params.threshold == 0 || params.threshold > 127 {
            return Err(FastError::InvalidThreshold(params.threshold));
        }

        let min_dim = width.min(height);
        if params.patch_size % 2 == 0 || params.patch_size >= min_dim {
            return Err(FastError::InvalidPatchSize {
                patch_size: params.patch_size,
                min_image_dim: min_dim,
            });
        }

        Ok(Self {
            params,
            w: width,
            h: height,
        })
    }

    /// Validates image data before processing
    fn validate_image(&self, img: &[u8]) -> FastResult<()> {
        let expected_len = self.w * self.h;
        if img.len() != expected_len {
            return Err(FastError::InvalidImageData {
                expected_len,
                actual_len: img.len(),
            });
        }
        Ok(())
    }

    /// Detect, suppress, cap and optionally refine keypoints
    pub fn detect_keypoints(&self, img: &[u8]) -> FastResult<Vec<Keypoint>> {
        let scored_keypoints = self.detect_keypoints_with_response(img)?;
        let mut suppressed =
            KeypointRefinement::non_maximum_suppression(&scored_keypoints, self.params.nms_distance);
        if self.params.max_keypoints > 0 {
            suppressed.truncate(self.params.max_keypoints);
        }
        debug!(
            "FAST {}x{}: {} raw corners, {} after suppression",
            self.w,
            self.h,
            scored_keypoints.len(),
            suppressed.len()
        );

        let keypoints = suppressed.into_iter().map(|sk| {
            if self.params.subpixel_refinement {
                KeypointRefinement::refine_keypoint_subpixel(img, self.w, self.h, sk.keypoint)
            } else {
                sk.keypoint
            }
        });
        Ok(keypoints.collect())
    }

    /// Detect keypoints with corner response scores, in raster order
    pub fn detect_keypoints_with_response(&self, img: &[u8]) -> FastResult<Vec<ScoredKeypoint>> {
        self.validate_image(img)?;

        let keypoints = (3..self.h - 3)
            .into_par_iter()
            .flat_map_iter(|y| {
                let mut row = Vec::new();
                for x in 3..self.w - 3 {
                    let (corner_type, response) = self.segment_test(img, x, y);
                    if corner_type == CornerType::None {
                        continue;
                    }
                    row.push(ScoredKeypoint {
                        keypoint: Keypoint {
                            x: x as f32,
                            y: y as f32,
                            angle: self.compute_orientation(img, x, y),
                        },
                        response,
                    });
                }
                row
            })
            .collect();

        Ok(keypoints)
    }

    /// Segment test plus a mean-absolute-difference response over the arc side
    fn segment_test(&self, img: &[u8], x: usize, y: usize) -> (CornerType, f32) {
        let p = img[y * self.w + x];
        let t = self.params.threshold;

        let mut bright = 0u16;
        let mut dark = 0u16;
        let mut bright_sum = 0i32;
        let mut dark_sum = 0i32;

        for (i, &(dx, dy)) in FAST_OFFSETS.iter().enumerate() {
            let xx = (x as i32 + dx) as usize;
            let yy = (y as i32 + dy) as usize;
            let q = img[yy * self.w + xx];

            if q >= p.saturating_add(t) {
                bright |= 1 << i;
                bright_sum += q as i32 - p as i32;
            } else if q.saturating_add(t) <= p {
                dark |= 1 << i;
                dark_sum += p as i32 - q as i32;
            }
        }

        if has_contiguous_arc(bright, ARC_LENGTH) {
            (CornerType::Bright, bright_sum as f32 / bright.count_ones() as f32)
        } else if has_contiguous_arc(dark, ARC_LENGTH) {
            (CornerType::Dark, dark_sum as f32 / dark.count_ones() as f32)
        } else {
            (CornerType::None, 0.0)
        }
    }

    /// Intensity-centroid orientation; 0 when the patch leaves the image
    pub fn compute_orientation(&self, img: &[u8], x: usize, y: usize) -> f32 {
        let half = (self.params.patch_size / 2) as i64;
        let (cx, cy) = (x as i64, y as i64);

        if cx - half < 0 || cy - half < 0 || cx + half >= self.w as i64 || cy + half >= self.h as i64 {
            return 0.0;
        }

        let mut m10 = 0i64;
        let mut m01 = 0i64;
        for dy in -half..=half {
            let row = ((cy + dy) as usize) * self.w;
            for dx in -half..=half {
                let val = img[row + (cx + dx) as usize] as i64;
                m10 += dx * val;
                m01 += dy * val;
            }
        }

        if m10 == 0 && m01 == 0 {
            0.0
        } else {
            (m01 as f32).atan2(m10 as f32)
        }
    }

    /// Get detector parameters
    pub fn params(&self) -> &FastParams {
        &self.params
    }

    /// Get image dimensions
    pub fn dimensions(&self) -> (usize, usize) {
        (self.w, self.h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_params() -> FastParams {
        FastParams {
            threshold: 20,
            patch_size: 15,
            nms_distance: 3.0,
            subpixel_refinement: false,
            max_keypoints: 0,
        }
    }

    fn create_small_test_params() -> FastParams {
        FastParams {
            patch_size: 5,
            ..create_test_params()
        }
    }

    fn create_corner_image(width: usize, height: usize) -> Vec<u8> {
        let mut img = vec![50; width * height];
        let (cx, cy) = (width / 2, height / 2);
        for y in cy - 2..=cy + 2 {
            for x in cx - 2..=cx + 2 {
                img[y * width + x] = 255;
            }
        }
        img
    }

    #[test]
    fn test_valid_constructor() {
        assert!(FastDetector::new(create_test_params(), 100, 100).is_ok());
    }

    #[test]
    fn test_invalid_dimensions() {
        let result = FastDetector::new(create_test_params(), 0, 100);
        assert!(matches!(result, Err(FastError::InvalidImageSize { .. })));

        let result = FastDetector::new(create_test_params(), 6, 6);
        assert!(matches!(result, Err(FastError::ImageTooSmall { .. })));
    }

    #[test]
    fn test_invalid_threshold() {
        let mut params = create_test_params();
        params.threshold = 0;
        let result = FastDetector::new(params.clone(), 100, 100);
        assert!(matches!(result, Err(FastError::InvalidThreshold(0))));

        params.threshold = 200;
        let result = FastDetector::new(params, 100, 100);
        assert!(matches!(result, Err(FastError::InvalidThreshold(200))));
    }

    #[test]
    fn test_invalid_patch_size() {
        let mut params = create_test_params();
        params.patch_size = 16;
        let result = FastDetector::new(params.clone(), 100, 100);
        assert!(matches!(result, Err(FastError::InvalidPatchSize { .. })));

        params.patch_size = 101;
        let result = FastDetector::new(params, 100, 100);
        assert!(matches!(result, Err(FastError::InvalidPatchSize { .. })));
    }

    #[test]
    fn test_invalid_image_data() {
        let detector = FastDetector::new(create_small_test_params(), 10, 10).unwrap();
        let result = detector.detect_keypoints(&[0; 50]);
        assert!(matches!(
            result,
            Err(FastError::InvalidImageData {
                expected_len: 100,
                actual_len: 50
            })
        ));
    }

    #[test]
    fn test_uniform_image_has_no_corners() {
        let detector = FastDetector::new(create_small_test_params(), 10, 10).unwrap();
        let keypoints = detector.detect_keypoints(&vec![128; 100]).unwrap();
        assert!(keypoints.is_empty());
    }

    #[test]
    fn test_square_corners_detected() {
        let detector = FastDetector::new(create_small_test_params(), 20, 20).unwrap();
        let img = create_corner_image(20, 20);
        let scored = detector.detect_keypoints_with_response(&img).unwrap();
        assert!(!scored.is_empty());
        for sk in &scored {
            assert!(sk.response > 0.0 && sk.response.is_finite());
            // Every corner sits on or next to the bright square
            assert!((sk.keypoint.x - 10.0).abs() <= 4.0);
            assert!((sk.keypoint.y - 10.0).abs() <= 4.0);
        }
    }

    #[test]
    fn test_nms_enforces_min_distance() {
        let detector = FastDetector::new(create_test_params(), 50, 50).unwrap();
        let img = create_corner_image(50, 50);
        let keypoints = detector.detect_keypoints(&img).unwrap();
        for i in 0..keypoints.len() {
            for j in (i + 1)..keypoints.len() {
                let dx = keypoints[i].x - keypoints[j].x;
                let dy = keypoints[i].y - keypoints[j].y;
                assert!((dx * dx + dy * dy).sqrt() >= 3.0);
            }
        }
    }

    #[test]
    fn test_max_keypoints_cap() {
        let mut params = create_small_test_params();
        params.nms_distance = 0.0;
        params.max_keypoints = 2;
        let detector = FastDetector::new(params, 20, 20).unwrap();
        let keypoints = detector.detect_keypoints(&create_corner_image(20, 20)).unwrap();
        assert!(keypoints.len() <= 2);
    }

    #[test]
    fn test_detection_is_deterministic() {
        let detector = FastDetector::new(create_test_params(), 64, 64).unwrap();
        let img: Vec<u8> = (0..64 * 64).map(|i| ((i * 37) % 251) as u8).collect();
        let first = detector.detect_keypoints(&img).unwrap();
        for _ in 0..5 {
            assert_eq!(detector.detect_keypoints(&img).unwrap(), first);
        }
    }

    #[test]
    fn test_orientation_points_towards_bright_side() {
        let detector = FastDetector::new(create_small_test_params(), 20, 20).unwrap();
        let mut img = vec![0u8; 400];
        for y in 0..20 {
            for x in 11..20 {
                img[y * 20 + x] = 200;
            }
        }
        let angle = detector.compute_orientation(&img, 10, 10);
        assert!(angle.abs() < 1e-3, "expected ~0 rad, got {}", angle);
    }

    #[test]
    fn test_orientation_outside_patch_is_zero() {
        let detector = FastDetector::new(create_test_params(), 20, 20).unwrap();
        let img = create_corner_image(20, 20);
        assert_eq!(detector.compute_orientation(&img, 3, 3), 0.0);
    }
}
