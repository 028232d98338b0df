use drift_core::{Descriptor, Keypoint};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use thiserror::Error;

pub mod matcher;

pub use matcher::{BruteForceMatcher, DescriptorMatch, descriptor_distance};

const DESCRIPTOR_BITS: usize = 256;

/// Half-width of the square patch the test pairs are drawn from
pub const PATCH_RADIUS: i32 = 12;

/// Both images of a pair must share this sampling pattern
const PATTERN_SEED: u64 = 0x5eed_b41e;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BriefError {
    #[error("Invalid image dimensions: {width}x{height} (must be > 0)")]
    InvalidImageSize { width: usize, height: usize },
    #[error("Image data length mismatch: expected {expected_len}, got {actual_len}")]
    InvalidImageData { expected_len: usize, actual_len: usize },
}

pub type BriefResult<T> = Result<T, BriefError>;

/// Steered BRIEF: 256 intensity comparisons rotated by the keypoint angle
pub struct BriefGenerator {
    w: usize,
    h: usize,
    pairs: Vec<(f32, f32, f32, f32)>,
}

impl BriefGenerator {
    pub fn new(width: usize, height: usize) -> BriefResult<Self> {
        if width == 0 || height == 0 {
            return Err(BriefError::InvalidImageSize { width, height });
        }
        Ok(Self {
            w: width,
            h: height,
            pairs: sampling_pattern(),
        })
    }

    pub fn generate_descriptors(&self, img: &[u8], kps: &[Keypoint]) -> BriefResult<Vec<Descriptor>> {
        let expected_len = self.w * self.h;
        if img.len() != expected_len {
            return Err(BriefError::InvalidImageData {
                expected_len,
                actual_len: img.len(),
            });
        }

        let descriptors = kps
            .par_iter()
            .map(|kp| {
                let (s, c) = kp.angle.sin_cos();
                let (cx, cy) = (kp.x, kp.y);
                let mut d = [0u8; DESCRIPTOR_BITS / 8];

                for (i, &(dx1, dy1, dx2, dy2)) in self.pairs.iter().enumerate() {
                    // Apply rotation and translation for subpixel coordinates
                    let (rx1, ry1) = (cx + c * dx1 - s * dy1, cy + s * dx1 + c * dy1);
                    let (rx2, ry2) = (cx + c * dx2 - s * dy2, cy + s * dx2 + c * dy2);

                    let val1 = self.bilinear_sample(img, rx1, ry1);
                    let val2 = self.bilinear_sample(img, rx2, ry2);

                    let bit = (val1 < val2) as u8;
                    d[i / 8] |= bit << (i % 8);
                }
                d
            })
            .collect();

        Ok(descriptors)
    }

    /// Bilinear interpolation for subpixel sampling, clamped at the borders
    fn bilinear_sample(&self, img: &[u8], x: f32, y: f32) -> f32 {
        let x0 = x.floor();
        let y0 = y.floor();
        let x1 = x0 + 1.0;
        let y1 = y0 + 1.0;

        if x0 < 0.0 || y0 < 0.0 || x1 >= self.w as f32 || y1 >= self.h as f32 {
            let cx = x.round().clamp(0.0, (self.w - 1) as f32) as usize;
            let cy = y.round().clamp(0.0, (self.h - 1) as f32) as usize;
            return img[cy * self.w + cx] as f32;
        }

        let dx = x - x0;
        let dy = y - y0;
        let (x0_idx, y0_idx) = (x0 as usize, y0 as usize);
        let (x1_idx, y1_idx) = (x1 as usize, y1 as usize);

        let p00 = img[y0_idx * self.w + x0_idx] as f32;
        let p10 = img[y0_idx * self.w + x1_idx] as f32;
        let p01 = img[y1_idx * self.w + x0_idx] as f32;
        let p11 = img[y1_idx * self.w + x1_idx] as f32;

        let top = p00 * (1.0 - dx) + p10 * dx;
        let bottom = p01 * (1.0 - dx) + p11 * dx;
        top * (1.0 - dy) + bottom * dy
    }
}

/// Test pairs drawn uniformly from the patch with a fixed seed
fn sampling_pattern() -> Vec<(f32, f32, f32, f32)> {
    let mut rng = StdRng::seed_from_u64(PATTERN_SEED);
    let mut coord = || rng.random_range(-PATCH_RADIUS..=PATCH_RADIUS) as f32;
    (0..DESCRIPTOR_BITS)
        .map(|_| (coord(), coord(), coord(), coord()))
        .collect()
}
