//! Morphological profiles and their multi-scale characteristics
//!
//! A profile is the family of openings (or closings) by reconstruction of
//! one source at disk radii `start, start + step, ...`. Its derivative is
//! the absolute difference between consecutive scales, and the
//! characteristics are, per pixel, the largest derivative and the scale
//! where it occurs.

mod characteristics;
mod derivative;
mod profile;

pub use characteristics::{
    multiscale_characteristics, CharacteristicsPair, CharacteristicsParams,
    MultiScaleCharacteristics,
};
pub use derivative::{profile_derivative, DerivativeProfile, ProfileDerivative};
pub use profile::{
    closing_profile, opening_profile, ClosingProfile, OpeningProfile, Profile, ProfileParams,
};
