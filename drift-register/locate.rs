use drift_core::{
    ExtremeContrastParams, Image, OffsetVector, PatternLocator, Rect, RegistrationConfig,
    SaliencyMask,
};
use log::debug;
use rayon::prelude::*;

use crate::error::{RegistrationError, RegistrationResult};
use crate::saliency::extract_saliency;
use crate::search::{GridPoint, SearchHit, TernaryPattern, search_offset};

/// Tight box around the salient pixels
pub fn locate_salient_region(mask: &SaliencyMask) -> RegistrationResult<Rect> {
    mask.bounding_box()
        .ok_or_else(|| RegistrationError::DegenerateGeometry("saliency mask is empty".to_string()))
}

/// Tight box around pure-black pixels that sit inside a black area and
/// within `reach` of a pure-white pixel
pub fn locate_extreme_contrast(
    image: &Image,
    params: &ExtremeContrastParams,
) -> RegistrationResult<Rect> {
    if params.min_dark_neighbours == 0 || params.min_dark_neighbours > 9 {
        return Err(RegistrationError::invalid(
            "extreme_contrast.min_dark_neighbours",
            "must be within 1-9",
        ));
    }
    if params.reach == 0 {
        return Err(RegistrationError::invalid("extreme_contrast.reach", "must be >= 1"));
    }

    let (w, h) = image.dimensions();
    let white = image.depth().max_value();

    // Column span of qualifying pixels per row
    let spans: Vec<Option<(usize, usize)>> = (0..h)
        .into_par_iter()
        .map(|row| {
            let mut span: Option<(usize, usize)> = None;
            for col in 0..w {
                if image.get(row, col) != 0 {
                    continue;
                }
                let dark = count_in(image, row, col, 1, |v| v == 0);
                if dark < params.min_dark_neighbours {
                    continue;
                }
                // Half-open window, as wide as 2 * reach
                let cols = col.saturating_sub(params.reach)..(col + params.reach).min(w);
                let near_white = (row.saturating_sub(params.reach)..(row + params.reach).min(h))
                    .any(|r| image.row(r)[cols.clone()].iter().any(|&v| v == white));
                if near_white {
                    span = Some(span.map_or((col, col), |(c0, _)| (c0, col)));
                }
            }
            span
        })
        .collect();

    let mut bounds: Option<(usize, usize, usize, usize)> = None;
    for (row, span) in spans.iter().enumerate() {
        if let Some((c0, c1)) = *span {
            bounds = Some(match bounds {
                None => (row, row, c0, c1),
                Some((r0, _, b0, b1)) => (r0, row, b0.min(c0), b1.max(c1)),
            });
        }
    }

    let (r0, r1, c0, c1) = bounds.ok_or_else(|| {
        RegistrationError::DegenerateGeometry(
            "no pure-black pixel found next to a pure-white one".to_string(),
        )
    })?;
    Ok(Rect::new(r0, c0, r1 - r0 + 1, c1 - c0 + 1))
}

/// Pixels matching `pred` in the `(2 * radius + 1)` square around `(row, col)`,
/// clipped to the image
fn count_in(image: &Image, row: usize, col: usize, radius: usize, pred: impl Fn(u16) -> bool) -> usize {
    let rows = row.saturating_sub(radius)..(row + radius + 1).min(image.height());
    let cols = col.saturating_sub(radius)..(col + radius + 1).min(image.width());
    rows.map(|r| image.row(r)[cols.clone()].iter().filter(|&&v| pred(v)).count())
        .sum()
}

/// Loosened localisation box and the margins that were added on the top/left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpandedRegion {
    pub rect: Rect,
    pub margin_top: usize,
    pub margin_left: usize,
}

/// Grows `tight` by a third of each extent, a sixth of it on the top/left,
/// clamped to a `width` x `height` image
pub fn expand_region(tight: Rect, width: usize, height: usize) -> ExpandedRegion {
    let margin_top = (tight.height / 6).min(tight.top);
    let margin_left = (tight.width / 6).min(tight.left);
    let top = tight.top - margin_top;
    let left = tight.left - margin_left;
    let grown_h = (tight.height + tight.height / 3).min(height.saturating_sub(top));
    let grown_w = (tight.width + tight.width / 3).min(width.saturating_sub(left));
    ExpandedRegion {
        rect: Rect::new(top, left, grown_h, grown_w),
        margin_top,
        margin_left,
    }
}

/// Everything [`register_pattern`] worked out, for callers that render it
#[derive(Debug, Clone, PartialEq)]
pub struct PatternMatch {
    pub reference_region: ExpandedRegion,
    pub target_region: Rect,
    pub origin: GridPoint,
    pub hit: SearchHit,
    pub offset: OffsetVector,
}

/// Localise the pattern in both images, then refine the coarse offset by search.
/// Returns `reference position - target position`.
pub fn register_pattern(
    reference: &Image,
    target: &Image,
    config: &RegistrationConfig,
) -> RegistrationResult<OffsetVector> {
    register_pattern_detailed(reference, target, config).map(|m| m.offset)
}

pub fn register_pattern_detailed(
    reference: &Image,
    target: &Image,
    config: &RegistrationConfig,
) -> RegistrationResult<PatternMatch> {
    let locate = |image: &Image| -> RegistrationResult<Rect> {
        match config.locator {
            PatternLocator::Saliency => {
                locate_salient_region(&extract_saliency(image, &config.saliency)?)
            }
            PatternLocator::ExtremeContrast => {
                locate_extreme_contrast(image, &config.extreme_contrast)
            }
        }
    };

    let ref_tight = locate(reference)?;
    let target_region = locate(target)?;

    let reference_region = expand_region(ref_tight, reference.width(), reference.height());
    let pattern = TernaryPattern::from_region(reference, reference_region.rect)?;
    if pattern.marked_count() == 0 {
        return Err(RegistrationError::DegenerateGeometry(format!(
            "reference region {:?} holds no pure-black or pure-white pixels",
            reference_region.rect
        )));
    }

    let origin = GridPoint::new(
        target_region.top as i64 - reference_region.margin_top as i64,
        target_region.left as i64 - reference_region.margin_left as i64,
    );
    let hit = search_offset(&pattern, target, origin, config.search_radius)?;
    let rect = reference_region.rect;
    let offset = OffsetVector::new(
        rect.left as f64 - hit.left as f64,
        rect.top as f64 - hit.top as f64,
    );
    debug!(
        "pattern {:?} in reference, {:?} in target, refined by ({}, {}): offset ({}, {})",
        rect, target_region, hit.offset_i, hit.offset_j, offset.dx, offset.dy
    );

    Ok(PatternMatch {
        reference_region,
        target_region,
        origin,
        hit,
        offset,
    })
}
