//! Single-scale FAST-9 corner detection used by the keypoint strategy.

pub mod detector;
pub mod error;
pub mod refinement;
pub mod types;
pub mod utils;

pub use detector::{FastDetector, FAST_OFFSETS};
pub use error::{FastError, FastResult};
pub use refinement::KeypointRefinement;
pub use types::ScoredKeypoint;
