use crate::error::{CoreError, CoreResult};
use crate::geometry::Rect;

/// Row-major 8-bit grayscale buffer consumed by the keypoint crates
pub type Gray8 = Vec<u8>;

/// Sample depth of an [`Image`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BitDepth {
    Eight,
    Sixteen,
}

impl BitDepth {
    /// Largest representable sample ("pure white")
    pub fn max_value(self) -> u16 {
        match self {
            BitDepth::Eight => u8::MAX as u16,
            BitDepth::Sixteen => u16::MAX,
        }
    }
}

/// Row-major grayscale image with 8- or 16-bit samples.
///
/// Samples are stored widened to `u16` whatever the declared depth, so the
/// algorithms only ever deal with one buffer type. Row `i` is `y`, column `j`
/// is `x`, origin top-left. Images are immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: usize,
    height: usize,
    depth: BitDepth,
    data: Vec<u16>,
}

impl Image {
    /// Creates an image, validating dimensions, buffer length and sample range
    pub fn new(width: usize, height: usize, depth: BitDepth, data: Vec<u16>) -> CoreResult<Self> {
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidImageSize { width, height });
        }
        let expected_len = width * height;
        if data.len() != expected_len {
            return Err(CoreError::InvalidImageData {
                expected_len,
                actual_len: data.len(),
            });
        }
        let max = depth.max_value();
        if let Some((index, &value)) = data.iter().enumerate().find(|(_, v)| **v > max) {
            return Err(CoreError::SampleOutOfRange { index, value, max });
        }
        Ok(Self {
            width,
            height,
            depth,
            data,
        })
    }

    pub fn from_u8(width: usize, height: usize, data: Vec<u8>) -> CoreResult<Self> {
        Self::new(
            width,
            height,
            BitDepth::Eight,
            data.into_iter().map(u16::from).collect(),
        )
    }

    pub fn from_u16(width: usize, height: usize, data: Vec<u16>) -> CoreResult<Self> {
        Self::new(width, height, BitDepth::Sixteen, data)
    }

    /// Builds an image by evaluating `f(row, col)` for every pixel
    pub fn from_fn<F>(width: usize, height: usize, depth: BitDepth, mut f: F) -> CoreResult<Self>
    where
        F: FnMut(usize, usize) -> u16,
    {
        let mut data = Vec::with_capacity(width * height);
        for row in 0..height {
            for col in 0..width {
                data.push(f(row, col));
            }
        }
        Self::new(width, height, depth, data)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// (width, height)
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn depth(&self) -> BitDepth {
        self.depth
    }

    pub fn data(&self) -> &[u16] {
        &self.data
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u16 {
        self.data[row * self.width + col]
    }

    pub fn row(&self, row: usize) -> &[u16] {
        let start = row * self.width;
        &self.data[start..start + self.width]
    }

    /// True when `rect` lies entirely inside the image
    pub fn contains(&self, rect: &Rect) -> bool {
        rect.bottom() <= self.height && rect.right() <= self.width
    }

    /// 8-bit view of the samples; 16-bit samples keep their high byte
    pub fn to_u8(&self) -> Gray8 {
        match self.depth {
            BitDepth::Eight => self.data.iter().map(|&v| v as u8).collect(),
            BitDepth::Sixteen => self.data.iter().map(|&v| (v >> 8) as u8).collect(),
        }
    }

    pub fn to_f32(&self) -> Vec<f32> {
        self.data.iter().map(|&v| f32::from(v)).collect()
    }

    /// Copies out the pixels covered by `rect`
    pub fn crop(&self, rect: Rect) -> CoreResult<Image> {
        if rect.is_empty() || !self.contains(&rect) {
            return Err(CoreError::RegionOutOfBounds {
                top: rect.top,
                left: rect.left,
                height: rect.height,
                width: rect.width,
                image_width: self.width,
                image_height: self.height,
            });
        }
        let mut data = Vec::with_capacity(rect.width * rect.height);
        for row in rect.top..rect.bottom() {
            data.extend_from_slice(&self.row(row)[rect.left..rect.right()]);
        }
        Ok(Image {
            width: rect.width,
            height: rect.height,
            depth: self.depth,
            data,
        })
    }
}

/// Boolean grid of salient pixels, same shape as its source image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaliencyMask {
    width: usize,
    height: usize,
    mask: Vec<bool>,
}

impl SaliencyMask {
    pub fn new(width: usize, height: usize, mask: Vec<bool>) -> CoreResult<Self> {
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidImageSize { width, height });
        }
        if mask.len() != width * height {
            return Err(CoreError::InvalidImageData {
                expected_len: width * height,
                actual_len: mask.len(),
            });
        }
        Ok(Self {
            width,
            height,
            mask,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.mask
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> bool {
        self.mask[row * self.width + col]
    }

    /// Number of salient pixels
    pub fn count(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }

    /// Tight box around every salient pixel, `None` when the mask is empty
    pub fn bounding_box(&self) -> Option<Rect> {
        let mut bounds: Option<(usize, usize, usize, usize)> = None;
        for (idx, _) in self.mask.iter().enumerate().filter(|(_, m)| **m) {
            let (row, col) = (idx / self.width, idx % self.width);
            bounds = Some(match bounds {
                None => (row, row, col, col),
                Some((r0, r1, c0, c1)) => (r0.min(row), r1.max(row), c0.min(col), c1.max(col)),
            });
        }
        bounds.map(|(r0, r1, c0, c1)| Rect::new(r0, c0, r1 - r0 + 1, c1 - c0 + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_dimensions() {
        assert!(matches!(
            Image::from_u8(0, 4, vec![]),
            Err(CoreError::InvalidImageSize { .. })
        ));
        assert!(matches!(
            Image::from_u8(4, 4, vec![0; 15]),
            Err(CoreError::InvalidImageData {
                expected_len: 16,
                actual_len: 15
            })
        ));
    }

    #[test]
    fn test_rejects_samples_above_depth() {
        let result = Image::new(2, 1, BitDepth::Eight, vec![10, 300]);
        assert!(matches!(
            result,
            Err(CoreError::SampleOutOfRange {
                index: 1,
                value: 300,
                max: 255
            })
        ));
    }

    #[test]
    fn test_row_major_layout() {
        let img = Image::from_u8(3, 2, vec![10, 20, 30, 40, 50, 60]).unwrap();
        assert_eq!(img.get(0, 2), 30);
        assert_eq!(img.get(1, 0), 40);
        assert_eq!(img.row(1), &[40, 50, 60]);
        assert_eq!(img.dimensions(), (3, 2));
    }

    #[test]
    fn test_to_u8_keeps_high_byte() {
        let img = Image::from_u16(2, 1, vec![0xffff, 0x1234]).unwrap();
        assert_eq!(img.to_u8(), vec![0xff, 0x12]);
    }

    #[test]
    fn test_crop() {
        let img = Image::from_fn(5, 4, BitDepth::Eight, |r, c| (r * 10 + c) as u16).unwrap();
        let sub = img.crop(Rect::new(1, 2, 2, 3)).unwrap();
        assert_eq!(sub.dimensions(), (3, 2));
        assert_eq!(sub.data(), &[12, 13, 14, 22, 23, 24]);

        let outside = img.crop(Rect::new(3, 3, 2, 2));
        assert!(matches!(outside, Err(CoreError::RegionOutOfBounds { .. })));
    }

    #[test]
    fn test_mask_bounding_box() {
        let mut bits = vec![false; 6 * 5];
        bits[6 + 2] = true;
        bits[3 * 6 + 4] = true;
        let mask = SaliencyMask::new(6, 5, bits).unwrap();
        assert_eq!(mask.count(), 2);
        assert_eq!(mask.bounding_box(), Some(Rect::new(1, 2, 3, 3)));

        let empty = SaliencyMask::new(2, 2, vec![false; 4]).unwrap();
        assert_eq!(empty.bounding_box(), None);
    }
}
