use crate::error::{CoreError, CoreResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How offset vectors are generated from the image pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Strategy {
    /// FAST keypoints + BRIEF descriptors + brute-force matching
    #[default]
    Keypoints,
    /// Localise a high-contrast pattern in both images and refine by exhaustive search
    PatternSearch,
}

/// Coarse localisation used by the pattern-search strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PatternLocator {
    /// Bounding box of the band-pass saliency mask
    #[default]
    Saliency,
    /// Bounding box of pure-black pixels sitting next to pure-white ones
    ExtremeContrast,
}

/// Distance used to compare descriptors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MatchNorm {
    /// Bit count of the XOR, i.e. L1 over the descriptor bits
    #[default]
    Hamming,
    /// L1 over descriptor bytes
    L1,
    /// L2 over descriptor bytes
    L2,
}

/// Difference-of-Gaussians band-pass parameters
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SaliencyParams {
    pub sigma_low: f32,
    pub sigma_high: f32,
    /// Blur applied to the difference before thresholding
    pub smoothing_sigma: f32,
    /// A pixel is salient iff its response exceeds `max_response - tolerance`,
    /// in raw sample units of the source image
    pub tolerance: f32,
}

impl Default for SaliencyParams {
    fn default() -> Self {
        Self {
            sigma_low: 9.0,
            sigma_high: 10.0,
            smoothing_sigma: 3.0,
            tolerance: 10.0,
        }
    }
}

impl SaliencyParams {
    pub fn validate(&self) -> CoreResult<()> {
        if !(self.sigma_low.is_finite() && self.sigma_low > 0.0) {
            return Err(CoreError::config("saliency.sigma_low", "must be finite and > 0"));
        }
        if !(self.sigma_high.is_finite() && self.sigma_high > self.sigma_low) {
            return Err(CoreError::config(
                "saliency.sigma_high",
                format!("must be finite and > sigma_low ({})", self.sigma_low),
            ));
        }
        if !(self.smoothing_sigma.is_finite() && self.smoothing_sigma > 0.0) {
            return Err(CoreError::config("saliency.smoothing_sigma", "must be finite and > 0"));
        }
        if !self.tolerance.is_finite() {
            return Err(CoreError::config("saliency.tolerance", "must be finite"));
        }
        Ok(())
    }
}

/// FAST detector settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FastParams {
    pub threshold: u8,
    /// Side of the square patch used for orientation, odd
    pub patch_size: usize,
    pub nms_distance: f32,
    pub subpixel_refinement: bool,
    /// Strongest keypoints kept after suppression, 0 keeps all
    pub max_keypoints: usize,
}

impl Default for FastParams {
    fn default() -> Self {
        Self {
            threshold: 20,
            patch_size: 15,
            nms_distance: 3.0,
            subpixel_refinement: true,
            max_keypoints: 2000,
        }
    }
}

/// Thresholds for the extreme-contrast pattern locator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExtremeContrastParams {
    /// Minimum pure-black pixels in the 3x3 neighbourhood (centre included)
    pub min_dark_neighbours: usize,
    /// Half-width of the window that must contain a pure-white pixel
    pub reach: usize,
}

impl Default for ExtremeContrastParams {
    fn default() -> Self {
        Self {
            min_dark_neighbours: 7,
            reach: 6,
        }
    }
}

/// Largest accepted pattern-search half-width, in pixels
pub const MAX_SEARCH_RADIUS: usize = 1024;

/// Complete registration configuration, one immutable value handed to every stage.
///
/// Defaults:
///
/// | field              | default      |
/// |--------------------|--------------|
/// | `strategy`         | `Keypoints`  |
/// | `locator`          | `Saliency`   |
/// | `blur_sigma`       | 1.5          |
/// | `match_norm`       | `Hamming`    |
/// | `cross_check`      | true         |
/// | `consensus_radius` | 8.0 px       |
/// | `search_radius`    | 10 px        |
/// | `prefilter`        | false        |
/// | `saliency`         | sigma 9 / 10, smoothing 3, tolerance 10 |
/// | `fast`             | threshold 20, patch 15, NMS 3 px |
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RegistrationConfig {
    pub strategy: Strategy,
    pub locator: PatternLocator,
    /// Denoising blur applied before keypoint detection, 0 disables it
    pub blur_sigma: f32,
    pub match_norm: MatchNorm,
    pub cross_check: bool,
    /// Neighbour radius in offset space for the density-mode estimator
    pub consensus_radius: f64,
    /// Half-width of the pattern-search window
    pub search_radius: usize,
    /// Trim offsets further than one standard deviation from the mean before consensus
    pub prefilter: bool,
    pub n_threads: usize,
    /// Metadata
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub name: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub description: Option<String>,
    pub saliency: SaliencyParams,
    pub fast: FastParams,
    pub extreme_contrast: ExtremeContrastParams,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Keypoints,
            locator: PatternLocator::Saliency,
            blur_sigma: 1.5,
            match_norm: MatchNorm::Hamming,
            cross_check: true,
            consensus_radius: 8.0,
            search_radius: 10,
            prefilter: false,
            n_threads: num_cpus::get().max(1),
            name: None,
            description: None,
            saliency: SaliencyParams::default(),
            fast: FastParams::default(),
            extreme_contrast: ExtremeContrastParams::default(),
        }
    }
}

impl RegistrationConfig {
    /// Pattern search tuned for 16-bit electron-microscopy frames
    pub fn microscopy_preset() -> Self {
        Self {
            strategy: Strategy::PatternSearch,
            locator: PatternLocator::Saliency,
            saliency: SaliencyParams {
                sigma_low: 19.0,
                sigma_high: 20.0,
                smoothing_sigma: 5.5,
                tolerance: 17000.0,
            },
            name: Some("Microscopy".to_string()),
            description: Some("Band-pass pattern localisation for 16-bit stage frames".to_string()),
            ..Self::default()
        }
    }

    /// Keypoint preset that trades matches for speed
    pub fn fast_preset() -> Self {
        Self {
            blur_sigma: 1.0,
            fast: FastParams {
                threshold: 30,
                patch_size: 15,
                nms_distance: 5.0,
                subpixel_refinement: false,
                max_keypoints: 500,
            },
            name: Some("Fast".to_string()),
            description: Some("Fewer, stronger keypoints".to_string()),
            ..Self::default()
        }
    }

    /// Add metadata to configuration
    pub fn with_metadata(mut self, name: &str, description: &str) -> Self {
        self.name = Some(name.to_string());
        self.description = Some(description.to_string());
        self
    }

    /// Generate human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "RegistrationConfig: strategy={:?}, locator={:?}, blur={:.2}, norm={:?}, cross_check={}, radius={:.1}, search={}, prefilter={}, fast=[threshold:{}, patch:{}, nms:{:.1}]",
            self.strategy,
            self.locator,
            self.blur_sigma,
            self.match_norm,
            self.cross_check,
            self.consensus_radius,
            self.search_radius,
            self.prefilter,
            self.fast.threshold,
            self.fast.patch_size,
            self.fast.nms_distance
        )
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> CoreResult<()> {
        if !(self.blur_sigma.is_finite() && self.blur_sigma >= 0.0) {
            return Err(CoreError::config("blur_sigma", "must be finite and >= 0"));
        }
        if !(self.consensus_radius.is_finite() && self.consensus_radius > 0.0) {
            return Err(CoreError::config("consensus_radius", "must be finite and > 0"));
        }
        if self.search_radius > MAX_SEARCH_RADIUS {
            return Err(CoreError::config(
                "search_radius",
                format!("{} exceeds {}", self.search_radius, MAX_SEARCH_RADIUS),
            ));
        }
        if self.n_threads == 0 {
            return Err(CoreError::config("n_threads", "must be >= 1"));
        }
        self.saliency.validate()?;
        if self.fast.threshold == 0 || self.fast.threshold > 127 {
            return Err(CoreError::config(
                "fast.threshold",
                format!("{} is outside 1-127", self.fast.threshold),
            ));
        }
        if self.fast.patch_size < 3 || self.fast.patch_size % 2 == 0 {
            return Err(CoreError::config(
                "fast.patch_size",
                format!("{} must be odd and >= 3", self.fast.patch_size),
            ));
        }
        if !(self.fast.nms_distance.is_finite() && self.fast.nms_distance >= 0.0) {
            return Err(CoreError::config("fast.nms_distance", "must be finite and >= 0"));
        }
        let ec = &self.extreme_contrast;
        if ec.min_dark_neighbours == 0 || ec.min_dark_neighbours > 9 {
            return Err(CoreError::config(
                "extreme_contrast.min_dark_neighbours",
                "must be within 1-9",
            ));
        }
        if ec.reach == 0 {
            return Err(CoreError::config("extreme_contrast.reach", "must be >= 1"));
        }
        Ok(())
    }

    /// Save configuration to JSON file
    #[cfg(feature = "serde")]
    pub fn save_json<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from JSON file
    #[cfg(feature = "serde")]
    pub fn load_json<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Save configuration to TOML file
    #[cfg(feature = "serde")]
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    /// Load configuration from TOML file
    #[cfg(feature = "serde")]
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load from a `.toml` or `.json` file, picked by extension
    #[cfg(feature = "serde")]
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::load_toml(path),
            _ => Self::load_json(path),
        }
    }

    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "serde")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    #[cfg(feature = "serde")]
    pub fn from_toml(toml_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let cfg = RegistrationConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.consensus_radius, 8.0);
        assert_eq!(cfg.search_radius, 10);
        assert!(cfg.cross_check);
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(RegistrationConfig::microscopy_preset().validate().is_ok());
        assert!(RegistrationConfig::fast_preset().validate().is_ok());
        assert_eq!(
            RegistrationConfig::microscopy_preset().strategy,
            Strategy::PatternSearch
        );
    }

    #[test]
    fn test_invalid_sigmas() {
        let mut cfg = RegistrationConfig::default();
        cfg.saliency.sigma_high = cfg.saliency.sigma_low;
        assert!(matches!(
            cfg.validate(),
            Err(CoreError::InvalidConfig {
                field: "saliency.sigma_high",
                ..
            })
        ));

        let mut cfg = RegistrationConfig::default();
        cfg.saliency.smoothing_sigma = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_invalid_radius_and_threshold() {
        let mut cfg = RegistrationConfig::default();
        cfg.consensus_radius = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = RegistrationConfig::default();
        cfg.fast.threshold = 200;
        assert!(matches!(
            cfg.validate(),
            Err(CoreError::InvalidConfig {
                field: "fast.threshold",
                ..
            })
        ));

        let mut cfg = RegistrationConfig::default();
        cfg.fast.patch_size = 16;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_search_radius_is_bounded() {
        let mut cfg = RegistrationConfig::default();
        cfg.search_radius = MAX_SEARCH_RADIUS;
        assert!(cfg.validate().is_ok());

        cfg.search_radius = usize::MAX / 2;
        assert!(matches!(
            cfg.validate(),
            Err(CoreError::InvalidConfig {
                field: "search_radius",
                ..
            })
        ));
    }

    #[test]
    fn test_summary_mentions_strategy() {
        let summary = RegistrationConfig::microscopy_preset().summary();
        assert!(summary.contains("PatternSearch"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_json_and_toml_round_trip() {
        let cfg = RegistrationConfig::microscopy_preset().with_metadata("run", "nightly drift");
        let json = cfg.to_json().unwrap();
        assert_eq!(RegistrationConfig::from_json(&json).unwrap(), cfg);

        let toml = cfg.to_toml().unwrap();
        assert_eq!(RegistrationConfig::from_toml(&toml).unwrap(), cfg);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_partial_file_uses_defaults() {
        let cfg = RegistrationConfig::from_toml("strategy = \"pattern_search\"\nsearch_radius = 4\n").unwrap();
        assert_eq!(cfg.strategy, Strategy::PatternSearch);
        assert_eq!(cfg.search_radius, 4);
        assert_eq!(cfg.consensus_radius, 8.0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_invalid_file_is_rejected() {
        let result = RegistrationConfig::from_json(r#"{ "consensus_radius": -1.0 }"#);
        assert!(result.is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_save_and_load_files() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = RegistrationConfig::fast_preset();

        let json_path = dir.path().join("drift.json");
        cfg.save_json(&json_path).unwrap();
        assert_eq!(RegistrationConfig::load(&json_path).unwrap(), cfg);

        let toml_path = dir.path().join("drift.toml");
        cfg.save_toml(&toml_path).unwrap();
        assert_eq!(RegistrationConfig::load(&toml_path).unwrap(), cfg);
    }
}
