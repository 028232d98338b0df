//! Translation estimation between a reference and a target image.
//!
//! Two ways of producing offset vectors:
//!
//! * [`keypoints`]: FAST corners, steered BRIEF descriptors and a
//!   cross-checked brute-force matcher give one offset per match.
//! * [`search`] + [`locate`]: a high-contrast pattern is localised in both
//!   images and the coarse offset is refined by exhaustive search.
//!
//! The offsets are optionally trimmed by [`prefilter`] and reduced to one
//! integer [`Translation`](drift_core::Translation) by the density-mode
//! estimator in [`consensus`].

pub mod consensus;
pub mod error;
pub mod keypoints;
pub mod locate;
pub mod prefilter;
pub mod saliency;
pub mod search;

pub use consensus::{Consensus, density_mode, estimate_translation};
pub use error::{RegistrationError, RegistrationResult};
pub use keypoints::{best_k, match_keypoints, offsets_from};
pub use locate::{
    ExpandedRegion, PatternMatch, expand_region, locate_extreme_contrast, locate_salient_region,
    register_pattern, register_pattern_detailed,
};
pub use prefilter::{OffsetStatistics, offset_statistics, prefilter};
pub use saliency::{Response, band_pass, extract_saliency};
pub use search::{GridPoint, SearchHit, TernaryPattern, search_offset};
