//! Segmentation stages and the end-to-end pipeline
//!
//! - **amplitude**: collapse multi-band input to its per-pixel norm
//! - **classify**: convex/concave decision from both characteristic pairs
//! - **labeling**: connected components of equal class values
//! - **pipeline**: the orchestrator wiring every stage together

mod amplitude;
mod classify;
mod labeling;
mod pipeline;

pub use amplitude::{amplitude, Amplitude};
pub use classify::{
    classify_convex_concave, classify_pixel, ClassifiedImage, ClassifierParams,
    ConvexConcaveClassifier, Convexity,
};
pub use labeling::{label_components, region_stats, ConnectedComponents, LabelingParams, RegionStats};
pub use pipeline::{MorphologicalProfilesSegmentation, SegmentationOutput, SegmentationParams};
