use drift_brief::{BriefGenerator, BruteForceMatcher};
use drift_core::{
    CoreError, Correspondence, Descriptor, Gray8, Image, Keypoint, OffsetVector, Point2,
    RegistrationConfig,
};
use drift_fast::FastDetector;
use image::GrayImage;
use imageproc::filter::gaussian_blur_f32;
use log::debug;

use crate::error::{RegistrationError, RegistrationResult};

/// Detects, describes and cross-matches keypoints between the two images.
///
/// Both images are reduced to 8 bits and blurred by `blur_sigma` first.
/// Every accepted match becomes one correspondence; nothing is capped here.
pub fn match_keypoints(
    reference: &Image,
    target: &Image,
    config: &RegistrationConfig,
) -> RegistrationResult<Vec<Correspondence>> {
    let (ref_kps, ref_desc) = describe(reference, config)?;
    let (tgt_kps, tgt_desc) = describe(target, config)?;

    let matcher = BruteForceMatcher::new(config.match_norm, config.cross_check);
    let correspondences: Vec<Correspondence> = matcher
        .match_descriptors(&ref_desc, &tgt_desc)
        .into_iter()
        .map(|m| Correspondence {
            reference: to_point(&ref_kps[m.query_idx]),
            target: to_point(&tgt_kps[m.train_idx]),
            distance: m.distance,
        })
        .collect();

    debug!(
        "keypoints: {} reference, {} target, {} correspondences",
        ref_kps.len(),
        tgt_kps.len(),
        correspondences.len()
    );
    Ok(correspondences)
}

/// The `k` correspondences with the smallest descriptor distance, best first.
/// Meant for display; the estimator uses every correspondence.
pub fn best_k(correspondences: &[Correspondence], k: usize) -> Vec<Correspondence> {
    let mut sorted = correspondences.to_vec();
    sorted.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    sorted.truncate(k);
    sorted
}

pub fn offsets_from(correspondences: &[Correspondence]) -> Vec<OffsetVector> {
    correspondences.iter().map(Correspondence::offset).collect()
}

fn to_point(kp: &Keypoint) -> Point2 {
    Point2::new(kp.x as f64, kp.y as f64)
}

fn describe(
    image: &Image,
    config: &RegistrationConfig,
) -> RegistrationResult<(Vec<Keypoint>, Vec<Descriptor>)> {
    let (w, h) = image.dimensions();
    let gray = smooth(image.to_u8(), w, h, config.blur_sigma)?;

    let detector = FastDetector::new(config.fast.clone(), w, h)?;
    let keypoints = detector.detect_keypoints(&gray)?;

    let brief = BriefGenerator::new(w, h)?;
    let descriptors = brief.generate_descriptors(&gray, &keypoints)?;
    Ok((keypoints, descriptors))
}

fn smooth(gray: Gray8, w: usize, h: usize, sigma: f32) -> RegistrationResult<Gray8> {
    if !sigma.is_finite() {
        return Err(RegistrationError::invalid("blur_sigma", "must be finite"));
    }
    if sigma <= 0.0 {
        return Ok(gray);
    }
    let len = gray.len();
    let buffer = GrayImage::from_raw(w as u32, h as u32, gray).ok_or(CoreError::InvalidImageData {
        expected_len: w * h,
        actual_len: len,
    })?;
    Ok(gaussian_blur_f32(&buffer, sigma).into_raw())
}
