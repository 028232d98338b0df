//! Shared types and configuration for the stage-drift workspace.
//!
//! Every crate in the workspace speaks in terms of the values defined here:
//! grayscale [`Image`]s, boolean [`SaliencyMask`]s, [`Keypoint`]s and their
//! binary [`Descriptor`]s, [`Correspondence`]s, [`OffsetVector`]s and the final
//! [`Translation`]. All of them follow one sign convention:
//!
//! `translation = position_in_reference - position_in_target`
//!
//! with `dx` along columns (x) and `dy` along rows (y).

pub mod config;
pub mod error;
pub mod geometry;
pub mod image;

pub use config::{
    ExtremeContrastParams, FastParams, MAX_SEARCH_RADIUS, MatchNorm, PatternLocator,
    RegistrationConfig, SaliencyParams, Strategy,
};
pub use error::{CoreError, CoreResult};
pub use geometry::{Correspondence, OffsetVector, Point2, Rect, Translation};
pub use image::{BitDepth, Gray8, Image, SaliencyMask};

/// Key-point = FAST corner + orientation (radians) with subpixel precision
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
}

/// 256-bit binary descriptor = 32 bytes
pub type Descriptor = [u8; 32];

/// Initialize Rayon thread pool with the specified number of threads.
///
/// The global pool can be built once per process; later calls keep it and
/// return the error.
pub fn init_thread_pool(n_threads: usize) -> Result<(), rayon::ThreadPoolBuildError> {
    match rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build_global()
    {
        Ok(()) => {
            log::debug!("rayon pool: {} threads", n_threads);
            Ok(())
        }
        Err(e) => {
            log::warn!(
                "rayon pool already running with {} threads, {} requested: {}",
                rayon::current_num_threads(),
                n_threads,
                e
            );
            Err(e)
        }
    }
}
