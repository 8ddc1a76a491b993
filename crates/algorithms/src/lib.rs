//! # morphoseg algorithms
//!
//! Multi-scale morphological profile segmentation.
//!
//! ## Modules
//!
//! - **morphology**: disk structuring elements, flat erosion/dilation,
//!   geodesic reconstruction, opening/closing by reconstruction
//! - **profiles**: opening/closing profiles, profile derivatives and
//!   multi-scale characteristics
//! - **segmentation**: amplitude, convex/concave classification,
//!   connected-component labeling and the end-to-end pipeline

pub(crate) mod maybe_rayon;

pub mod morphology;
pub mod profiles;
pub mod segmentation;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::morphology::{
        closing_by_reconstruction, dilate, erode, opening_by_reconstruction,
        reconstruct_by_dilation, reconstruct_by_erosion, StructuringElement,
    };
    pub use crate::profiles::{
        closing_profile, multiscale_characteristics, opening_profile, profile_derivative,
        CharacteristicsPair, CharacteristicsParams, DerivativeProfile, Profile, ProfileParams,
    };
    pub use crate::segmentation::{
        amplitude, classify_convex_concave, label_components, region_stats, ClassifierParams,
        Convexity, LabelingParams, MorphologicalProfilesSegmentation, RegionStats,
        SegmentationOutput, SegmentationParams,
    };
    pub use morphoseg_core::prelude::*;
}
