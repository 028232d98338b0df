use drift_core::{CoreError, Image, SaliencyMask, SaliencyParams};
use image::{ImageBuffer, Luma};
use imageproc::filter::gaussian_blur_f32;
use log::debug;

use crate::error::{RegistrationError, RegistrationResult};

/// Floating-point response grid, same shape as the source image
pub type Response = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Difference-of-Gaussians band-pass, smoothed once more.
///
/// `blur(sigma_low) - blur(sigma_high)` is computed in `f32` so negative
/// responses keep their sign. Kernel extents follow from the sigmas.
pub fn band_pass(image: &Image, params: &SaliencyParams) -> RegistrationResult<Response> {
    params.validate().map_err(RegistrationError::from_config)?;

    let (w, h) = image.dimensions();
    let source = Response::from_raw(w as u32, h as u32, image.to_f32()).ok_or(
        CoreError::InvalidImageData {
            expected_len: w * h,
            actual_len: image.data().len(),
        },
    )?;

    let low = gaussian_blur_f32(&source, params.sigma_low);
    let high = gaussian_blur_f32(&source, params.sigma_high);
    let diff: Vec<f32> = low
        .as_raw()
        .iter()
        .zip(high.as_raw())
        .map(|(l, h)| l - h)
        .collect();
    let diff = Response::from_raw(w as u32, h as u32, diff).ok_or(CoreError::InvalidImageSize {
        width: w,
        height: h,
    })?;

    Ok(gaussian_blur_f32(&diff, params.smoothing_sigma))
}

/// Marks every pixel whose band-pass response exceeds `max_response - tolerance`
pub fn extract_saliency(image: &Image, params: &SaliencyParams) -> RegistrationResult<SaliencyMask> {
    let response = band_pass(image, params)?;
    let max_response = response
        .as_raw()
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max);
    let threshold = max_response - params.tolerance;

    let mask: Vec<bool> = response.as_raw().iter().map(|&v| v > threshold).collect();
    let mask = SaliencyMask::new(image.width(), image.height(), mask)?;
    debug!(
        "saliency: max response {:.2}, threshold {:.2}, {} of {} pixels salient",
        max_response,
        threshold,
        mask.count(),
        image.width() * image.height()
    );
    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_core::BitDepth;

    fn small_params(tolerance: f32) -> SaliencyParams {
        SaliencyParams {
            sigma_low: 1.0,
            sigma_high: 2.0,
            smoothing_sigma: 1.0,
            tolerance,
        }
    }

    fn blob_image() -> Image {
        Image::from_fn(64, 64, BitDepth::Eight, |row, col| {
            if (39..=41).contains(&row) && (19..=21).contains(&col) { 255 } else { 100 }
        })
        .unwrap()
    }

    #[test]
    fn test_constant_image_is_all_or_nothing() {
        let image = Image::from_u8(32, 32, vec![90; 32 * 32]).unwrap();

        let mask = extract_saliency(&image, &small_params(10.0)).unwrap();
        assert_eq!(mask.count(), 32 * 32);

        let mask = extract_saliency(&image, &small_params(0.0)).unwrap();
        assert_eq!(mask.count(), 0);
    }

    #[test]
    fn test_band_pass_keeps_sign() {
        let response = band_pass(&blob_image(), &small_params(5.0)).unwrap();
        let raw = response.as_raw();
        assert!(raw.iter().any(|&v| v > 0.0));
        assert!(raw.iter().any(|&v| v < 0.0));
    }

    #[test]
    fn test_blob_is_salient() {
        let mask = extract_saliency(&blob_image(), &small_params(5.0)).unwrap();
        assert!(mask.count() > 0);
        assert!(mask.get(40, 20));

        let bbox = mask.bounding_box().unwrap();
        let centre_row = bbox.top as f32 + bbox.height as f32 / 2.0;
        let centre_col = bbox.left as f32 + bbox.width as f32 / 2.0;
        assert!((centre_row - 40.5).abs() <= 3.0, "bbox {:?}", bbox);
        assert!((centre_col - 20.5).abs() <= 3.0, "bbox {:?}", bbox);
    }

    #[test]
    fn test_sixteen_bit_input() {
        let image = Image::from_fn(48, 48, BitDepth::Sixteen, |row, col| {
            if (20..=23).contains(&row) && (30..=33).contains(&col) { 60_000 } else { 20_000 }
        })
        .unwrap();
        let mask = extract_saliency(&image, &small_params(500.0)).unwrap();
        assert!(mask.get(21, 31));
        assert!(!mask.get(2, 2));
    }

    #[test]
    fn test_invalid_sigmas_rejected() {
        let image = blob_image();
        let params = SaliencyParams {
            sigma_low: 0.0,
            ..small_params(5.0)
        };
        assert!(matches!(
            extract_saliency(&image, &params),
            Err(RegistrationError::InvalidParameter { name: "saliency.sigma_low", .. })
        ));

        let params = SaliencyParams {
            sigma_high: 0.5,
            ..small_params(5.0)
        };
        assert!(matches!(
            band_pass(&image, &params),
            Err(RegistrationError::InvalidParameter { name: "saliency.sigma_high", .. })
        ));
    }
}
