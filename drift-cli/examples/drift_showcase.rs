use drift_cli::drift_register::{best_k, match_keypoints};
use drift_cli::{BitDepth, DriftEstimator, Image};
use drift_core::{PatternLocator, RegistrationConfig, Strategy};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};
use std::time::Instant;

/// Blocky texture moved right by `dx` and down by `dy`
fn texture(width: usize, height: usize, dx: i64, dy: i64) -> Result<Image, Box<dyn std::error::Error>> {
    Ok(Image::from_fn(width, height, BitDepth::Eight, |row, col| {
        let x = (col as i64 - dx + 1000) as u64 / 6;
        let y = (row as i64 - dy + 1000) as u64 / 6;
        let h = (x.wrapping_mul(73_856_093) ^ y.wrapping_mul(19_349_663)).wrapping_mul(2_654_435_761);
        [20u16, 80, 140, 200, 250][((h >> 16) % 5) as usize]
    })?)
}

/// Pure black/white checker on a grey 16-bit stage frame
fn checker(width: usize, height: usize, top: usize, left: usize) -> Result<Image, Box<dyn std::error::Error>> {
    Ok(Image::from_fn(width, height, BitDepth::Sixteen, |row, col| {
        let (r, c) = (row as i64 - top as i64, col as i64 - left as i64);
        if !(0..8).contains(&r) || !(0..8).contains(&c) {
            30_000
        } else if (r < 4) == (c < 4) {
            u16::MAX
        } else {
            0
        }
    })?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Stage Drift Showcase");
    println!("====================\n");

    // Showcase 1: keypoint strategy
    println!("Showcase 1: keypoints + density-mode consensus");
    let (width, height) = (256usize, 256usize);
    let reference = texture(width, height, 0, 0)?;
    let target = texture(width, height, 11, -6)?;

    let estimator = DriftEstimator::new(RegistrationConfig::default())?;
    println!("   {}", estimator.config().summary());

    let start = Instant::now();
    let report = estimator.estimate_detailed(&reference, &target)?;
    println!(
        "   {:.2?}: {} offsets, {} in consensus, translation {}",
        start.elapsed(),
        report.offsets.len(),
        report.consensus.members.len(),
        report.translation
    );

    // Showcase 2: presets
    println!("\nShowcase 2: presets");
    let fast = DriftEstimator::new(RegistrationConfig::fast_preset())?;
    let start = Instant::now();
    let t = fast.estimate(&reference, &target)?;
    println!("   Fast preset: {:.2?}, translation {}", start.elapsed(), t);

    // Showcase 3: pattern search on 16-bit frames
    println!("\nShowcase 3: pattern search");
    let frame_ref = checker(200, 160, 70, 90)?;
    let frame_tgt = checker(200, 160, 74, 83)?;
    for locator in [PatternLocator::ExtremeContrast, PatternLocator::Saliency] {
        let mut config = RegistrationConfig::microscopy_preset();
        config.locator = locator;
        config.saliency.sigma_low = 2.0;
        config.saliency.sigma_high = 3.0;
        config.saliency.smoothing_sigma = 1.0;
        config.saliency.tolerance = 2000.0;
        assert_eq!(config.strategy, Strategy::PatternSearch);

        let start = Instant::now();
        let t = DriftEstimator::new(config)?.estimate(&frame_ref, &frame_tgt)?;
        println!("   {:?}: {:.2?}, translation {}", locator, start.elapsed(), t);
    }

    // Showcase 4: configuration round trip
    println!("\nShowcase 4: configuration serialization");
    let config = RegistrationConfig::microscopy_preset();
    let json = config.to_json()?;
    let toml_str = config.to_toml()?;
    println!("   JSON {} bytes, TOML {} bytes", json.len(), toml_str.len());
    config.save_toml("drift_config.toml")?;
    println!("   Saved drift_config.toml");

    // Showcase 5: visualisation of the strongest correspondences
    println!("\nShowcase 5: visualisation");
    let correspondences = match_keypoints(&reference, &target, estimator.config())?;
    let gray = reference.to_u8();
    let mut canvas = RgbaImage::from_fn(width as u32, height as u32, |x, y| {
        let g = gray[y as usize * width + x as usize];
        Rgba([g, g, g, 255])
    });
    for c in best_k(&correspondences, 50) {
        let from = (c.reference.x as f32, c.reference.y as f32);
        let to = (c.target.x as f32, c.target.y as f32);
        draw_line_segment_mut(&mut canvas, from, to, Rgba([0, 200, 0, 255]));
        draw_hollow_circle_mut(&mut canvas, (from.0 as i32, from.1 as i32), 3, Rgba([255, 0, 0, 255]));
    }
    canvas.save("drift_correspondences.png")?;
    println!("   Saved drift_correspondences.png ({} matches drawn)", correspondences.len().min(50));

    Ok(())
}
