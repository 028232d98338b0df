use drift_core::{CoreError, Image, Rect};
use log::debug;
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{RegistrationError, RegistrationResult};

/// Binarised pattern: pure black is `+1`, pure white is `-1`, everything else `0`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TernaryPattern {
    width: usize,
    height: usize,
    cells: Vec<i8>,
}

impl TernaryPattern {
    #[inline]
    pub fn classify(sample: u16, max: u16) -> i8 {
        if sample == 0 {
            1
        } else if sample == max {
            -1
        } else {
            0
        }
    }

    /// Binarises the pixels of `image` covered by `rect`
    pub fn from_region(image: &Image, rect: Rect) -> RegistrationResult<Self> {
        if rect.is_empty() || !image.contains(&rect) {
            return Err(CoreError::RegionOutOfBounds {
                top: rect.top,
                left: rect.left,
                height: rect.height,
                width: rect.width,
                image_width: image.width(),
                image_height: image.height(),
            }
            .into());
        }
        let max = image.depth().max_value();
        let mut cells = Vec::with_capacity(rect.width * rect.height);
        for row in rect.top..rect.bottom() {
            cells.extend(
                image.row(row)[rect.left..rect.right()]
                    .iter()
                    .map(|&v| Self::classify(v, max)),
            );
        }
        Ok(Self {
            width: rect.width,
            height: rect.height,
            cells,
        })
    }

    pub fn from_cells(width: usize, height: usize, cells: Vec<i8>) -> RegistrationResult<Self> {
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidImageSize { width, height }.into());
        }
        if cells.len() != width * height {
            return Err(CoreError::InvalidImageData {
                expected_len: width * height,
                actual_len: cells.len(),
            }
            .into());
        }
        if let Some(bad) = cells.iter().find(|c| !(-1..=1).contains(*c)) {
            return Err(RegistrationError::invalid(
                "pattern",
                format!("cell value {} is not one of -1, 0, 1", bad),
            ));
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cells(&self) -> &[i8] {
        &self.cells
    }

    /// Cells at either extreme
    pub fn marked_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c != 0).count()
    }

    /// L1 distance to the window of `image` whose top-left corner is `(top, left)`.
    /// The window must fit inside the image.
    fn distance_at(&self, image: &Image, top: usize, left: usize) -> u32 {
        let max = image.depth().max_value();
        let mut dist = 0u32;
        for (r, pattern_row) in self.cells.chunks_exact(self.width).enumerate() {
            let window = &image.row(top + r)[left..left + self.width];
            for (&p, &v) in pattern_row.iter().zip(window) {
                dist += (p - Self::classify(v, max)).unsigned_abs() as u32;
            }
        }
        dist
    }
}

/// Signed pixel position; search origins may sit above or left of the image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridPoint {
    pub row: i64,
    pub col: i64,
}

impl GridPoint {
    pub fn new(row: i64, col: i64) -> Self {
        Self { row, col }
    }
}

/// Best window found by [`search_offset`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SearchHit {
    /// Row displacement from the origin
    pub offset_i: i64,
    /// Column displacement from the origin
    pub offset_j: i64,
    pub top: usize,
    pub left: usize,
    pub distance: u32,
}

/// Exhaustive search of `ref_patch` around `origin` in `candidate`.
///
/// Every `(i, j)` in `[-search_radius, search_radius]²` is tried. Windows that
/// leave the image are skipped. The smallest L1 distance wins, ties going to
/// the first candidate in row-major order over `i` then `j`.
pub fn search_offset(
    ref_patch: &TernaryPattern,
    candidate: &Image,
    origin: GridPoint,
    search_radius: usize,
) -> RegistrationResult<SearchHit> {
    let r = i64::try_from(search_radius)
        .map_err(|_| RegistrationError::invalid("search_radius", format!("{} is too large", search_radius)))?;
    let (w, h) = (candidate.width() as i64, candidate.height() as i64);
    let (pw, ph) = (ref_patch.width as i64, ref_patch.height as i64);

    // Offsets whose window stays inside the candidate
    let (i_lo, i_hi) = ((-r).max(origin.row.saturating_neg()), r.min((h - ph).saturating_sub(origin.row)));
    let (j_lo, j_hi) = ((-r).max(origin.col.saturating_neg()), r.min((w - pw).saturating_sub(origin.col)));

    // Row-major order breaks distance ties
    let best = (i_lo..=i_hi)
        .into_par_iter()
        .flat_map_iter(|i| (j_lo..=j_hi).map(move |j| (i, j)))
        .map(|(i, j)| {
            let (top, left) = ((origin.row + i) as usize, (origin.col + j) as usize);
            SearchHit {
                offset_i: i,
                offset_j: j,
                top,
                left,
                distance: ref_patch.distance_at(candidate, top, left),
            }
        })
        .min_by_key(|hit| (hit.distance, hit.offset_i, hit.offset_j));

    let best = best.ok_or_else(|| {
        RegistrationError::DegenerateGeometry(format!(
            "no {}x{} window within {} px of (row {}, col {}) fits the {}x{} image",
            pw, ph, search_radius, origin.row, origin.col, w, h
        ))
    })?;
    debug!(
        "pattern search: radius {}, best ({}, {}) at distance {}",
        search_radius, best.offset_i, best.offset_j, best.distance
    );
    Ok(best)
}
