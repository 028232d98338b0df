//! High-level stage-drift estimation.
//!
//! [`find_translation`] takes two loaded images, [`find_translation_from_sources`]
//! also accepts file paths. Both return
//! `translation = position_in_reference - position_in_target`: moving the
//! target by the returned vector aligns it onto the reference.

use std::path::{Path, PathBuf};

use drift_core::{CoreError, OffsetVector, RegistrationConfig, Strategy};
use drift_register::{
    Consensus, RegistrationError, density_mode, match_keypoints, offsets_from, prefilter,
    register_pattern,
};
use log::{debug, warn};
use serde::Serialize;
use thiserror::Error;

pub use drift_core::{self, BitDepth, Image, Translation};
pub use drift_register;

#[derive(Debug, Error)]
pub enum DriftError {
    #[error("failed to load image {}: {source}", .path.display())]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("configuration error: {0}")]
    Config(String),
}

pub type DriftResult<T> = Result<T, DriftError>;

/// Where an input image comes from, resolved once by [`ImageSource::load`]
#[derive(Debug, Clone)]
pub enum ImageSource {
    Path(PathBuf),
    InMemory(Image),
}

impl ImageSource {
    pub fn load(self) -> DriftResult<Image> {
        match self {
            ImageSource::Path(path) => load_image(&path),
            ImageSource::InMemory(image) => Ok(image),
        }
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        ImageSource::Path(path.to_path_buf())
    }
}

impl From<Image> for ImageSource {
    fn from(image: Image) -> Self {
        ImageSource::InMemory(image)
    }
}

/// Decodes an image file to grayscale.
///
/// Colour is reduced to luminance; inputs with 16 or more bits per channel
/// become 16-bit images, everything else 8-bit.
pub fn load_image(path: &Path) -> DriftResult<Image> {
    let dynamic = image::open(path).map_err(|source| DriftError::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;
    let color = dynamic.color();
    let wide = color.bytes_per_pixel() / color.channel_count() >= 2;
    let (w, h) = (dynamic.width() as usize, dynamic.height() as usize);
    debug!("loaded {} ({}x{}, {:?})", path.display(), w, h, color);

    let image = if wide {
        Image::from_u16(w, h, dynamic.into_luma16().into_raw())?
    } else {
        Image::from_u8(w, h, dynamic.into_luma8().into_raw())?
    };
    Ok(image)
}

/// Reads a JSON or TOML configuration, chosen by file extension
pub fn load_config(path: &Path) -> DriftResult<RegistrationConfig> {
    RegistrationConfig::load(path)
        .map_err(|e| DriftError::Config(format!("{}: {}", path.display(), e)))
}

/// Everything the estimator worked out for one image pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriftReport {
    pub strategy: Strategy,
    pub translation: Translation,
    /// Offsets produced by the correspondence stage
    pub offsets: Vec<OffsetVector>,
    /// Offsets handed to the density-mode estimator
    pub retained: Vec<OffsetVector>,
    /// Indices refer to `retained`
    pub consensus: Consensus,
}

/// Validated configuration bound to the estimation pipeline
#[derive(Debug, Clone)]
pub struct DriftEstimator {
    config: RegistrationConfig,
}

impl DriftEstimator {
    pub fn new(config: RegistrationConfig) -> DriftResult<Self> {
        config.validate()?;
        debug!("{}", config.summary());
        Ok(Self { config })
    }

    pub fn config(&self) -> &RegistrationConfig {
        &self.config
    }

    pub fn estimate(&self, reference: &Image, target: &Image) -> DriftResult<Translation> {
        self.estimate_detailed(reference, target).map(|r| r.translation)
    }

    pub fn estimate_detailed(&self, reference: &Image, target: &Image) -> DriftResult<DriftReport> {
        let cfg = &self.config;
        let (offsets, retained) = match cfg.strategy {
            Strategy::Keypoints => {
                let correspondences = match_keypoints(reference, target, cfg)?;
                let offsets = offsets_from(&correspondences);
                if offsets.is_empty() {
                    return Err(RegistrationError::InsufficientData { stage: "matching" }.into());
                }
                let retained = if cfg.prefilter {
                    let kept = prefilter(&offsets);
                    if kept.is_empty() {
                        return Err(RegistrationError::InsufficientData { stage: "prefilter" }.into());
                    }
                    kept
                } else {
                    offsets.clone()
                };
                (offsets, retained)
            }
            Strategy::PatternSearch => {
                if cfg.prefilter {
                    warn!("prefilter ignored: pattern search yields a single offset");
                }
                let offset = register_pattern(reference, target, cfg)?;
                (vec![offset], vec![offset])
            }
        };

        let consensus = density_mode(&retained, cfg.consensus_radius)?;
        Ok(DriftReport {
            strategy: cfg.strategy,
            translation: consensus.translation,
            offsets,
            retained,
            consensus,
        })
    }
}

/// Stage drift between two loaded images
pub fn find_translation(
    reference: &Image,
    target: &Image,
    config: &RegistrationConfig,
) -> DriftResult<Translation> {
    DriftEstimator::new(config.clone())?.estimate(reference, target)
}

/// Stage drift between two images given as paths or pixel grids
pub fn find_translation_from_sources(
    reference: ImageSource,
    target: ImageSource,
    config: &RegistrationConfig,
) -> DriftResult<Translation> {
    let estimator = DriftEstimator::new(config.clone())?;
    let reference = reference.load()?;
    let target = target.load()?;
    estimator.estimate(&reference, &target)
}
