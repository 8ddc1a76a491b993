//! Sample trait for generic raster cell values

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Trait for types that can be stored in a raster cell.
///
/// Morphology only needs ordering and the two extreme values (the neutral
/// elements of erosion and dilation); the per-pixel derivative stages read
/// samples through [`RasterElement::to_f64`].
pub trait RasterElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Minimum value representable by this type
    fn min_value() -> Self;

    /// Maximum value representable by this type
    fn max_value() -> Self;

    /// Default no-data value for this type
    fn default_nodata() -> Self;

    /// Check if this value represents no-data
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Whether this type is a floating point type
    fn is_float() -> bool;

    /// Convert self to f64
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }

    /// Convert an f64 into this type, `None` when out of range
    fn from_f64(value: f64) -> Option<Self> {
        NumCast::from(value)
    }
}

macro_rules! impl_raster_element_int {
    ($t:ty) => {
        impl RasterElement for $t {
            fn min_value() -> Self {
                <$t>::MIN
            }

            fn max_value() -> Self {
                <$t>::MAX
            }

            fn default_nodata() -> Self {
                <$t>::MIN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                nodata.map_or(false, |nd| *self == nd)
            }

            fn is_float() -> bool {
                false
            }
        }
    };
}

macro_rules! impl_raster_element_float {
    ($t:ty) => {
        impl RasterElement for $t {
            fn min_value() -> Self {
                <$t>::NEG_INFINITY
            }

            fn max_value() -> Self {
                <$t>::INFINITY
            }

            fn default_nodata() -> Self {
                <$t>::NAN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                if self.is_nan() {
                    return true;
                }
                match nodata {
                    Some(nd) => (self - nd).abs() < <$t>::EPSILON * 100.0,
                    None => false,
                }
            }

            fn is_float() -> bool {
                true
            }
        }
    };
}

impl_raster_element_int!(i8);
impl_raster_element_int!(i16);
impl_raster_element_int!(i32);
impl_raster_element_int!(i64);
impl_raster_element_int!(u8);
impl_raster_element_int!(u16);
impl_raster_element_int!(u32);
impl_raster_element_int!(u64);
impl_raster_element_float!(f32);
impl_raster_element_float!(f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_extremes_are_infinite() {
        assert_eq!(<f64 as RasterElement>::min_value(), f64::NEG_INFINITY);
        assert_eq!(<f32 as RasterElement>::max_value(), f32::INFINITY);
    }

    #[test]
    fn test_nan_is_always_nodata() {
        assert!(f64::NAN.is_nodata(None));
        assert!(!1.0_f64.is_nodata(None));
        assert!((-9999.0_f64).is_nodata(Some(-9999.0)));
    }

    #[test]
    fn test_int_nodata_needs_explicit_value() {
        assert!(!0_u32.is_nodata(None));
        assert!(0_u32.is_nodata(Some(0)));
    }

    #[test]
    fn test_from_f64_range() {
        assert_eq!(<u8 as RasterElement>::from_f64(200.0), Some(200));
        assert_eq!(<u8 as RasterElement>::from_f64(300.0), None);
    }
}
