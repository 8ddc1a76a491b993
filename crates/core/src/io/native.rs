//! Native GeoTIFF reading/writing built on the `tiff` crate.
//!
//! Only the tags needed to keep georeferencing and no-data intact are
//! handled: ModelPixelScale, ModelTiepoint, a minimal GeoKeyDirectory and
//! GDAL_NODATA.

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use num_traits::NumCast;
use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{ColorType, Gray32, Gray32Float};
use tiff::encoder::{TiffEncoder, TiffValue};
use tiff::tags::Tag;

// The decoder resolves these codes (33550, 33922, 34735, 42113) to named
// variants, so lookups through `Tag::Unknown` never match.
const MODEL_PIXEL_SCALE: Tag = Tag::ModelPixelScaleTag;
const MODEL_TIEPOINT: Tag = Tag::ModelTiepointTag;
const GEO_KEY_DIRECTORY: Tag = Tag::GeoKeyDirectoryTag;
const GDAL_NODATA: Tag = Tag::GdalNodata;

/// Options for writing GeoTIFF files
#[derive(Debug, Clone, Default)]
pub struct GeoTiffOptions {
    /// Write the raster's no-data value as a GDAL_NODATA tag
    pub write_nodata: bool,
}

/// Read the first band of a GeoTIFF file into a Raster
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    let bands = decode_geotiff(file)?;
    first_band(bands)
}

/// Read every band of a (pixel-interleaved) GeoTIFF file
pub fn read_geotiff_bands<T, P>(path: P) -> Result<Vec<Raster<T>>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    decode_geotiff(file)
}

/// Read the first band of a GeoTIFF held in memory
pub fn read_geotiff_from_buffer<T>(data: &[u8]) -> Result<Raster<T>>
where
    T: RasterElement,
{
    let bands = decode_geotiff(Cursor::new(data))?;
    first_band(bands)
}

fn first_band<T: RasterElement>(bands: Vec<Raster<T>>) -> Result<Raster<T>> {
    bands
        .into_iter()
        .next()
        .ok_or_else(|| Error::Other("TIFF contains no bands".into()))
}

fn cast_samples<S, T>(buf: &[S]) -> Vec<T>
where
    S: NumCast + Copy,
    T: RasterElement,
{
    buf.iter()
        .map(|&v| num_traits::cast(v).unwrap_or(T::default_nodata()))
        .collect()
}

fn decode_geotiff<T, R>(reader: R) -> Result<Vec<Raster<T>>>
where
    T: RasterElement,
    R: Read + Seek,
{
    let mut decoder = Decoder::new(reader)
        .map_err(|e| Error::Other(format!("TIFF decode error: {}", e)))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Other(format!("Cannot read dimensions: {}", e)))?;
    let rows = height as usize;
    let cols = width as usize;

    let result = decoder
        .read_image()
        .map_err(|e| Error::Other(format!("Cannot read image data: {}", e)))?;

    let samples: Vec<T> = match result {
        DecodingResult::F32(buf) => cast_samples(&buf),
        DecodingResult::F64(buf) => cast_samples(&buf),
        DecodingResult::U8(buf) => cast_samples(&buf),
        DecodingResult::U16(buf) => cast_samples(&buf),
        DecodingResult::U32(buf) => cast_samples(&buf),
        DecodingResult::U64(buf) => cast_samples(&buf),
        DecodingResult::I8(buf) => cast_samples(&buf),
        DecodingResult::I16(buf) => cast_samples(&buf),
        DecodingResult::I32(buf) => cast_samples(&buf),
        DecodingResult::I64(buf) => cast_samples(&buf),
        #[allow(unreachable_patterns)]
        _ => return Err(Error::UnsupportedDataType("Unsupported TIFF pixel format".to_string())),
    };

    let cells = rows * cols;
    if cells == 0 || samples.len() % cells != 0 {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }
    let band_count = samples.len() / cells;

    let transform = read_geotransform(&mut decoder).ok();
    let nodata = read_nodata::<T, R>(&mut decoder);

    (0..band_count)
        .map(|band| {
            let data: Vec<T> = samples
                .iter()
                .skip(band)
                .step_by(band_count)
                .copied()
                .collect();
            let mut raster = Raster::from_vec(data, rows, cols)?;
            if let Some(transform) = transform {
                raster.set_transform(transform);
            }
            raster.set_nodata(nodata);
            Ok(raster)
        })
        .collect()
}

fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoTransform> {
    let scale = decoder
        .get_tag_f64_vec(MODEL_PIXEL_SCALE)
        .map_err(|_| Error::Other("No pixel scale tag".into()))?;

    let tiepoint = decoder
        .get_tag_f64_vec(MODEL_TIEPOINT)
        .map_err(|_| Error::Other("No tiepoint tag".into()))?;

    if scale.len() >= 2 && tiepoint.len() >= 6 {
        // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
        let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
        let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
        return Ok(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]));
    }

    Err(Error::Other("Cannot determine geotransform".into()))
}

fn read_nodata<T: RasterElement, R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<T> {
    let text = decoder.get_tag_ascii_string(GDAL_NODATA).ok()?;
    let value: f64 = text.trim_matches(char::from(0)).trim().parse().ok()?;
    T::from_f64(value)
}

/// Write a Raster to a GeoTIFF file as 32-bit float
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P, options: Option<GeoTiffOptions>) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    encode_float(raster, file, &options.unwrap_or_default())
}

/// Write a Raster to an in-memory GeoTIFF buffer as 32-bit float
pub fn write_geotiff_to_buffer<T>(raster: &Raster<T>, options: Option<GeoTiffOptions>) -> Result<Vec<u8>>
where
    T: RasterElement,
{
    let mut buf = Vec::new();
    encode_float(raster, Cursor::new(&mut buf), &options.unwrap_or_default())?;
    Ok(buf)
}

/// Write a label raster as 32-bit unsigned integers, preserving every id
pub fn write_label_geotiff<P: AsRef<Path>>(labels: &Raster<u32>, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let data: Vec<u32> = labels.data().iter().copied().collect();
    encode_geotiff::<Gray32, _>(labels.transform(), labels.shape(), &data, None, file)
}

fn encode_float<T, W>(raster: &Raster<T>, writer: W, options: &GeoTiffOptions) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
{
    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
        .collect();
    let nodata = if options.write_nodata {
        raster.nodata().and_then(|nd| nd.to_f64())
    } else {
        None
    };
    encode_geotiff::<Gray32Float, _>(raster.transform(), raster.shape(), &data, nodata, writer)
}

fn encode_geotiff<C, W>(
    transform: &GeoTransform,
    (rows, cols): (usize, usize),
    data: &[C::Inner],
    nodata: Option<f64>,
    writer: W,
) -> Result<()>
where
    C: ColorType,
    [C::Inner]: TiffValue,
    W: Write + Seek,
{
    let mut encoder = TiffEncoder::new(writer)
        .map_err(|e| Error::Other(format!("TIFF encoder error: {}", e)))?;

    let mut image = encoder
        .new_image::<C>(cols as u32, rows as u32)
        .map_err(|e| Error::Other(format!("Cannot create TIFF image: {}", e)))?;

    let scale = [transform.pixel_width, transform.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(MODEL_PIXEL_SCALE, &scale[..])
        .map_err(|e| Error::Other(format!("Cannot write scale tag: {}", e)))?;

    let tiepoint = [0.0, 0.0, 0.0, transform.origin_x, transform.origin_y, 0.0];
    image
        .encoder()
        .write_tag(MODEL_TIEPOINT, &tiepoint[..])
        .map_err(|e| Error::Other(format!("Cannot write tiepoint tag: {}", e)))?;

    // GeoKey directory v1.1.0 with GTModelType=Projected, GTRasterType=PixelIsArea
    let geokeys: [u16; 12] = [1, 1, 0, 2, 1024, 0, 1, 1, 1025, 0, 1, 1];
    image
        .encoder()
        .write_tag(GEO_KEY_DIRECTORY, &geokeys[..])
        .map_err(|e| Error::Other(format!("Cannot write geokey tag: {}", e)))?;

    if let Some(nd) = nodata {
        image
            .encoder()
            .write_tag(GDAL_NODATA, nd.to_string().as_str())
            .map_err(|e| Error::Other(format!("Cannot write nodata tag: {}", e)))?;
    }

    image
        .write_data(data)
        .map_err(|e| Error::Other(format!("Cannot write image data: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_roundtrip_keeps_transform_and_nodata() {
        let mut raster: Raster<f64> = Raster::filled(4, 6, 2.5);
        raster.set(1, 2, -9999.0).unwrap();
        raster.set_nodata(Some(-9999.0));
        raster.set_transform(GeoTransform::new(500.0, 1000.0, 2.0, -2.0));

        let options = GeoTiffOptions { write_nodata: true };
        let buf = write_geotiff_to_buffer(&raster, Some(options)).unwrap();
        let back: Raster<f64> = read_geotiff_from_buffer(&buf).unwrap();

        assert_eq!(back.shape(), (4, 6));
        assert_eq!(back.get(0, 0).unwrap(), 2.5);
        assert_eq!(back.nodata(), Some(-9999.0));
        assert!(back.is_nodata(back.get(1, 2).unwrap()));
        assert_eq!(back.transform().origin_x, 500.0);
        assert_eq!(back.transform().pixel_height, -2.0);
    }

    #[test]
    fn test_interleaved_samples_become_bands() {
        let mut buf = Vec::new();
        let pixels: [u8; 12] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];
        TiffEncoder::new(Cursor::new(&mut buf))
            .unwrap()
            .write_image::<tiff::encoder::colortype::RGB8>(2, 2, &pixels)
            .unwrap();

        let bands: Vec<Raster<f64>> = decode_geotiff(Cursor::new(&buf)).unwrap();
        assert_eq!(bands.len(), 3);
        assert_eq!(bands[0].get(0, 0).unwrap(), 1.0);
        assert_eq!(bands[1].get(0, 1).unwrap(), 5.0);
        assert_eq!(bands[2].get(1, 1).unwrap(), 12.0);
    }

    #[test]
    fn test_label_file_keeps_ids() {
        let mut labels: Raster<u32> = Raster::filled(3, 5, 0);
        labels.set(2, 4, 70_000).unwrap();
        labels.set_transform(GeoTransform::new(10.0, 20.0, 0.5, -0.5));

        let path = std::env::temp_dir().join(format!("morphoseg_labels_{}.tif", std::process::id()));
        write_label_geotiff(&labels, &path).unwrap();
        let back: Raster<u32> = read_geotiff(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(back.get(2, 4).unwrap(), 70_000);
        assert_eq!(back.get(0, 0).unwrap(), 0);
        assert_eq!(back.transform().pixel_width, 0.5);
    }

    #[test]
    fn test_written_buffer_carries_geotiff_tags() {
        let mut raster: Raster<f64> = Raster::filled(2, 3, 1.0);
        raster.set_nodata(Some(-1.0));
        raster.set_transform(GeoTransform::new(100.0, 200.0, 5.0, -5.0));
        let buf = write_geotiff_to_buffer(&raster, Some(GeoTiffOptions { write_nodata: true })).unwrap();

        let mut decoder = Decoder::new(Cursor::new(&buf)).unwrap();
        let scale = decoder.get_tag_f64_vec(MODEL_PIXEL_SCALE).unwrap();
        assert_eq!(&scale[..2], &[5.0, 5.0]);
        let tiepoint = decoder.get_tag_f64_vec(MODEL_TIEPOINT).unwrap();
        assert_eq!(&tiepoint[3..5], &[100.0, 200.0]);
        assert!(decoder.find_tag(GEO_KEY_DIRECTORY).unwrap().is_some());
        let nodata = decoder.get_tag_ascii_string(GDAL_NODATA).unwrap();
        assert_eq!(nodata.trim_matches(char::from(0)), "-1");
    }

    #[test]
    fn test_nodata_tag_omitted_by_default() {
        let mut raster: Raster<f64> = Raster::filled(2, 2, 1.0);
        raster.set_nodata(Some(-1.0));
        let buf = write_geotiff_to_buffer(&raster, None).unwrap();
        let back: Raster<f64> = read_geotiff_from_buffer(&buf).unwrap();
        assert_eq!(back.nodata(), None);
    }

    #[test]
    fn test_garbage_buffer_is_error() {
        let result = read_geotiff_from_buffer::<f64>(b"not a tiff");
        assert!(result.is_err());
    }
}
