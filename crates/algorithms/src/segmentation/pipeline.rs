//! End-to-end morphological profile segmentation

use std::borrow::Cow;
use std::time::Instant;

use morphoseg_core::raster::{Connectivity, Raster};
use morphoseg_core::{Algorithm, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::maybe_rayon::join;
use crate::profiles::{
    CharacteristicsPair, CharacteristicsParams, ClosingProfile, MultiScaleCharacteristics,
    OpeningProfile, Profile, ProfileDerivative, ProfileParams,
};

use super::classify::{ClassifierParams, ConvexConcaveClassifier};
use super::labeling::{ConnectedComponents, LabelingParams};

/// User-facing configuration of the whole pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationParams {
    /// Number of scales in each profile
    pub profile_size: usize,
    /// Disk radius of the first scale
    pub profile_start: usize,
    /// Radius increment between scales
    pub profile_step: usize,
    /// Minimum derivative magnitude for a pixel to be classified
    pub sigma: f64,
    /// Offset of convex labels; derived from the profile when `None`
    pub label_separator: Option<u32>,
    /// Adjacency used to group equal class values into regions
    pub connectivity: Connectivity,
    /// Adjacency used by the geodesic reconstructions
    pub reconstruction_connectivity: Connectivity,
    /// Smallest region kept, in pixels
    pub min_region_size: usize,
}

impl Default for SegmentationParams {
    fn default() -> Self {
        Self {
            profile_size: 5,
            profile_start: 1,
            profile_step: 1,
            sigma: 1.0,
            label_separator: None,
            connectivity: Connectivity::Eight,
            reconstruction_connectivity: Connectivity::Four,
            min_region_size: 1,
        }
    }
}

impl SegmentationParams {
    /// Check every parameter before any pixel is touched
    pub fn validate(&self) -> Result<()> {
        self.profile_params().validate()?;
        if self.profile_step == 0 {
            return Err(Error::InvalidParameter {
                name: "profile_step",
                value: "0".to_string(),
                reason: "scales must strictly increase".to_string(),
            });
        }
        self.classifier_params()?.validate()?;
        self.labeling_params().validate()?;

        let separator = self.label_separator()?;
        let largest_characteristic = self
            .profile_size
            .saturating_sub(2)
            .checked_mul(self.profile_step)
            .and_then(|span| span.checked_add(self.profile_start));
        let largest_label = largest_characteristic
            .and_then(|c| u32::try_from(c).ok())
            .and_then(|c| separator.checked_add(c));
        if largest_label.is_none() {
            return Err(Error::InvalidParameter {
                name: "label_separator",
                value: separator.to_string(),
                reason: "convex labels overflow u32".to_string(),
            });
        }
        Ok(())
    }

    /// Explicit separator, or `profile_start + profile_size * profile_step`
    pub fn label_separator(&self) -> Result<u32> {
        if let Some(separator) = self.label_separator {
            return Ok(separator);
        }
        self.profile_size
            .checked_mul(self.profile_step)
            .and_then(|span| span.checked_add(self.profile_start))
            .and_then(|s| u32::try_from(s).ok())
            .ok_or_else(|| Error::InvalidParameter {
                name: "label_separator",
                value: format!(
                    "{} + {} * {}",
                    self.profile_start, self.profile_size, self.profile_step
                ),
                reason: "derived separator does not fit in u32".to_string(),
            })
    }

    pub fn profile_params(&self) -> ProfileParams {
        ProfileParams {
            size: self.profile_size,
            initial_value: self.profile_start,
            step: self.profile_step,
            connectivity: self.reconstruction_connectivity,
        }
    }

    pub fn characteristics_params(&self) -> CharacteristicsParams {
        CharacteristicsParams {
            initial_value: self.profile_start,
            step: self.profile_step,
        }
    }

    pub fn classifier_params(&self) -> Result<ClassifierParams> {
        Ok(ClassifierParams {
            sigma: self.sigma,
            label_separator: self.label_separator()?,
        })
    }

    pub fn labeling_params(&self) -> LabelingParams {
        LabelingParams {
            connectivity: self.connectivity,
            min_region_size: self.min_region_size,
        }
    }
}

/// Everything produced by one run
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationOutput {
    /// Region ids, consecutive from 1, background 0
    pub labels: Raster<u32>,
    /// Per-pixel class value before labeling
    pub classes: Raster<u32>,
    /// Characteristics of the opening profile
    pub opening: CharacteristicsPair,
    /// Characteristics of the closing profile
    pub closing: CharacteristicsPair,
    pub region_count: usize,
}

/// Multi-scale morphological profile segmentation.
///
/// Owns one instance of every stage. `update` reruns the whole chain on the
/// attached source; `segment` does the same for a borrowed raster without
/// touching the stored state.
///
/// # Example
///
/// ```
/// use morphoseg_algorithms::segmentation::{MorphologicalProfilesSegmentation, SegmentationParams};
/// use morphoseg_core::Raster;
///
/// let mut source = Raster::filled(12, 12, 0.0_f64);
/// for r in 4..8 {
///     for c in 4..8 {
///         source.set(r, c, 10.0).unwrap();
///     }
/// }
/// let params = SegmentationParams { sigma: 0.0, ..Default::default() };
/// let pipeline = MorphologicalProfilesSegmentation::new(params).unwrap();
/// let labels = pipeline.segment(&source).unwrap();
/// assert_eq!(labels.get(5, 5).unwrap(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MorphologicalProfilesSegmentation {
    params: SegmentationParams,
    opening_profile: OpeningProfile,
    closing_profile: ClosingProfile,
    opening_derivative: ProfileDerivative,
    closing_derivative: ProfileDerivative,
    opening_characteristics: MultiScaleCharacteristics,
    closing_characteristics: MultiScaleCharacteristics,
    classifier: ConvexConcaveClassifier,
    labeler: ConnectedComponents,
    input: Option<Raster<f64>>,
    output: Option<SegmentationOutput>,
}

impl MorphologicalProfilesSegmentation {
    /// Create a pipeline, failing on an invalid configuration
    pub fn new(params: SegmentationParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            ..Default::default()
        })
    }

    pub fn params(&self) -> &SegmentationParams {
        &self.params
    }

    /// Replace the configuration; the previous output is discarded
    pub fn set_params(&mut self, params: SegmentationParams) -> Result<()> {
        params.validate()?;
        self.params = params;
        self.output = None;
        Ok(())
    }

    /// Attach the source raster used by [`update`](Self::update)
    pub fn set_input(&mut self, source: Raster<f64>) {
        self.input = Some(source);
        self.output = None;
    }

    pub fn input(&self) -> Option<&Raster<f64>> {
        self.input.as_ref()
    }

    /// Run every stage on the attached source
    pub fn update(&mut self) -> Result<&SegmentationOutput> {
        let source = self
            .input
            .as_ref()
            .ok_or(Error::MissingInput("no source raster attached"))?;
        let output = self.run(source)?;
        Ok(self.output.insert(output))
    }

    /// Result of the last successful [`update`](Self::update)
    pub fn output(&self) -> Option<&SegmentationOutput> {
        self.output.as_ref()
    }

    pub fn labels(&self) -> Option<&Raster<u32>> {
        self.output.as_ref().map(|o| &o.labels)
    }

    pub fn classes(&self) -> Option<&Raster<u32>> {
        self.output.as_ref().map(|o| &o.classes)
    }

    pub fn opening_characteristics(&self) -> Option<&CharacteristicsPair> {
        self.output.as_ref().map(|o| &o.opening)
    }

    pub fn closing_characteristics(&self) -> Option<&CharacteristicsPair> {
        self.output.as_ref().map(|o| &o.closing)
    }

    /// Segment `source` and return only the region ids
    pub fn segment(&self, source: &Raster<f64>) -> Result<Raster<u32>> {
        Ok(self.run(source)?.labels)
    }

    /// Run the full chain on `source`
    pub fn run(&self, source: &Raster<f64>) -> Result<SegmentationOutput> {
        self.params.validate()?;
        let started = Instant::now();

        let (filled, mask) = fill_nodata(source);

        let (opening, closing) = join(
            || {
                self.characteristics(
                    &self.opening_profile,
                    &self.opening_derivative,
                    &self.opening_characteristics,
                    &filled,
                )
            },
            || {
                self.characteristics(
                    &self.closing_profile,
                    &self.closing_derivative,
                    &self.closing_characteristics,
                    &filled,
                )
            },
        );
        let (opening, closing) = (opening?, closing?);
        debug!("Profiles and characteristics in {:.2?}", started.elapsed());

        opening
            .max_derivative
            .ensure_same_shape("opening/closing branches", &closing.max_derivative)?;

        let mut classified = self
            .classifier
            .execute((opening, closing), self.params.classifier_params()?)?;
        if let Some(mask) = mask {
            classified
                .classes
                .data_mut()
                .iter_mut()
                .zip(mask)
                .filter(|(_, invalid)| *invalid)
                .for_each(|(class, _)| *class = 0);
        }

        let labels = self
            .labeler
            .execute(classified.classes.clone(), self.params.labeling_params())?;
        let region_count = labels.data().iter().max().copied().unwrap_or(0) as usize;
        debug!(
            "Segmented {}x{} raster into {} regions in {:.2?}",
            source.rows(),
            source.cols(),
            region_count,
            started.elapsed()
        );

        Ok(SegmentationOutput {
            labels,
            classes: classified.classes,
            opening: classified.opening,
            closing: classified.closing,
            region_count,
        })
    }

    fn characteristics<P>(
        &self,
        builder: &P,
        derivative: &ProfileDerivative,
        extractor: &MultiScaleCharacteristics,
        source: &Raster<f64>,
    ) -> Result<CharacteristicsPair>
    where
        P: Algorithm<Input = Raster<f64>, Output = Profile<f64>, Params = ProfileParams, Error = Error>,
    {
        let profile = builder.execute(source.clone(), self.params.profile_params())?;
        let derivative = derivative.execute(profile, ())?;
        extractor.execute(derivative, self.params.characteristics_params())
    }
}

/// Replace nodata and NaN cells by the smallest valid value.
///
/// Returns the raster to run the morphology on and, when anything was
/// replaced, the row-major mask of replaced cells.
fn fill_nodata(source: &Raster<f64>) -> (Cow<'_, Raster<f64>>, Option<Vec<bool>>) {
    let mask: Vec<bool> = source.data().iter().map(|&v| source.is_nodata(v)).collect();
    if !mask.contains(&true) {
        return (Cow::Borrowed(source), None);
    }

    let fill = source
        .data()
        .iter()
        .zip(&mask)
        .filter(|(_, invalid)| !**invalid)
        .map(|(&v, _)| v)
        .fold(f64::INFINITY, f64::min);
    let fill = if fill.is_finite() { fill } else { 0.0 };
    debug!("Filling {} nodata cells with {}", source.nodata_count(), fill);

    let mut filled = source.clone();
    filled
        .data_mut()
        .iter_mut()
        .zip(&mask)
        .filter(|(_, invalid)| **invalid)
        .for_each(|(v, _)| *v = fill);
    filled.set_nodata(None);
    (Cow::Owned(filled), Some(mask))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_separator() {
        let params = SegmentationParams::default();
        assert_eq!(params.label_separator().unwrap(), 6);

        let params = SegmentationParams {
            profile_size: 4,
            profile_start: 2,
            profile_step: 3,
            ..Default::default()
        };
        assert_eq!(params.label_separator().unwrap(), 14);
    }

    #[test]
    fn test_configuration_errors() {
        let cases = [
            SegmentationParams {
                profile_size: 0,
                ..Default::default()
            },
            SegmentationParams {
                profile_step: 0,
                ..Default::default()
            },
            SegmentationParams {
                sigma: f64::NAN,
                ..Default::default()
            },
            SegmentationParams {
                sigma: -0.5,
                ..Default::default()
            },
            SegmentationParams {
                min_region_size: 0,
                ..Default::default()
            },
            SegmentationParams {
                label_separator: Some(u32::MAX),
                ..Default::default()
            },
        ];
        for params in cases {
            let err = MorphologicalProfilesSegmentation::new(params.clone()).unwrap_err();
            assert!(
                matches!(err, Error::InvalidParameter { .. }),
                "{:?} gave {:?}",
                params,
                err
            );
        }
    }

    #[test]
    fn test_params_from_json() {
        let params: SegmentationParams =
            serde_json::from_str(r#"{"profile_size": 8, "sigma": 0.5, "connectivity": "four"}"#).unwrap();
        assert_eq!(params.profile_size, 8);
        assert_eq!(params.sigma, 0.5);
        assert_eq!(params.connectivity, Connectivity::Four);
        assert_eq!(params.profile_start, 1);
        assert_eq!(params.label_separator, None);
    }

    #[test]
    fn test_fill_nodata() {
        let mut source = Raster::filled(2, 2, 5.0);
        source.set(0, 0, 3.0).unwrap();
        source.set(1, 1, f64::NAN).unwrap();
        let (filled, mask) = fill_nodata(&source);
        assert_eq!(filled.get(1, 1).unwrap(), 3.0);
        assert_eq!(mask, Some(vec![false, false, false, true]));

        let clean = Raster::filled(2, 2, 1.0);
        let (filled, mask) = fill_nodata(&clean);
        assert!(matches!(filled, Cow::Borrowed(_)));
        assert!(mask.is_none());
    }

    #[test]
    fn test_nodata_is_background() {
        let mut source = Raster::filled(11, 11, 0.0);
        for r in 3..8 {
            for c in 3..8 {
                source.set(r, c, 10.0).unwrap();
            }
        }
        source.set(5, 5, f64::NAN).unwrap();
        let params = SegmentationParams {
            sigma: 0.0,
            ..Default::default()
        };
        let mut pipeline = MorphologicalProfilesSegmentation::new(params).unwrap();
        pipeline.set_input(source);
        let output = pipeline.update().unwrap();
        assert_eq!(output.classes.get(5, 5).unwrap(), 0);
        assert_eq!(output.labels.get(5, 5).unwrap(), 0);
        assert_eq!(output.classes.get(3, 3).unwrap(), 7);
        assert_eq!(output.labels.get(4, 4).unwrap(), output.labels.get(7, 7).unwrap());
    }

    #[test]
    fn test_accessors_after_update() {
        let mut pipeline = MorphologicalProfilesSegmentation::default();
        assert!(pipeline.output().is_none());
        pipeline.set_input(Raster::filled(4, 4, 2.0));
        pipeline.update().unwrap();
        assert_eq!(pipeline.labels().unwrap().shape(), (4, 4));
        assert_eq!(pipeline.classes().unwrap().shape(), (4, 4));
        assert!(pipeline.opening_characteristics().is_some());
        assert!(pipeline.closing_characteristics().is_some());
        assert_eq!(pipeline.output().unwrap().region_count, 0);
    }
}
