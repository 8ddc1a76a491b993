//! GeoTIFF reading and writing for segmentation inputs and label outputs

mod native;

pub use native::{
    read_geotiff, read_geotiff_bands, read_geotiff_from_buffer, write_geotiff,
    write_geotiff_to_buffer, write_label_geotiff, GeoTiffOptions,
};
