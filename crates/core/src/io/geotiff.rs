//! Native GeoTIFF reading/writing via the `tiff` crate.
//!
//! Handles single-band imagery with ModelPixelScale/ModelTiepoint
//! georeferencing, which is what the vegetation-index frames and the
//! phenology products use. Frames are read as whatever sample type the
//! file carries and cast into the requested element type; products are
//! written as Float32 (averages) or Byte (encoded day maps). Projection
//! keys travel through [`CRS`] untouched, so products keep exactly the
//! projection of their source tile.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{Gray32Float, Gray8};
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

/// Read a GeoTIFF file into a Raster.
///
/// Reads the first image of the file and casts samples into `T`.
/// Georeferencing is taken from the pixel-scale and tiepoint tags and
/// the projection from the geokey tags; a file carrying neither keeps
/// the default identity transform, with a warning.
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut decoder = Decoder::new(file)
        .map_err(|e| Error::Other(format!("TIFF decode error in {}: {}", path.display(), e)))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Other(format!("Cannot read dimensions: {}", e)))?;

    let rows = height as usize;
    let cols = width as usize;

    let result = decoder
        .read_image()
        .map_err(|e| Error::Other(format!("Cannot read image data: {}", e)))?;

    let data: Vec<T> = match result {
        DecodingResult::F32(buf) => cast_samples(&buf),
        DecodingResult::F64(buf) => cast_samples(&buf),
        DecodingResult::U8(buf) => cast_samples(&buf),
        DecodingResult::U16(buf) => cast_samples(&buf),
        DecodingResult::U32(buf) => cast_samples(&buf),
        DecodingResult::I8(buf) => cast_samples(&buf),
        DecodingResult::I16(buf) => cast_samples(&buf),
        DecodingResult::I32(buf) => cast_samples(&buf),
        _ => {
            return Err(Error::UnsupportedDataType(
                "Unsupported TIFF pixel format".to_string(),
            ))
        }
    };

    if data.len() != rows * cols {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;

    match read_geotransform(&mut decoder) {
        Ok(transform) => raster.set_transform(transform),
        Err(e) => tracing::warn!(
            path = %path.display(),
            "no geotransform in file, keeping identity: {e}"
        ),
    }
    raster.set_crs(read_crs(&mut decoder));

    Ok(raster)
}

fn cast_samples<S, T>(buf: &[S]) -> Vec<T>
where
    S: Copy + num_traits::NumCast,
    T: RasterElement,
{
    buf.iter()
        .map(|&v| num_traits::cast(v).unwrap_or(T::default_nodata()))
        .collect()
}

/// Attempt to read a GeoTransform from the pixel-scale and tiepoint tags.
fn read_geotransform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Result<GeoTransform> {
    let scale = decoder
        .get_tag_f64_vec(Tag::ModelPixelScaleTag)
        .map_err(|_| Error::Other("No pixel scale tag".into()))?;

    let tiepoint = decoder
        .get_tag_f64_vec(Tag::ModelTiepointTag)
        .map_err(|_| Error::Other("No tiepoint tag".into()))?;

    if scale.len() >= 2 && tiepoint.len() >= 6 {
        // tiepoint: [I, J, K, X, Y, Z]; scale: [ScaleX, ScaleY, ScaleZ]
        let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
        let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
        let pixel_width = scale[0];
        let pixel_height = -scale[1]; // Negative for north-up

        return Ok(GeoTransform::new(
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        ));
    }

    Err(Error::Other("Cannot determine geotransform".into()))
}

/// Read the projection from the geokey tags, if the file has any.
fn read_crs<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Option<CRS> {
    let directory: Vec<u16> = decoder
        .get_tag_u32_vec(Tag::GeoKeyDirectoryTag)
        .ok()?
        .into_iter()
        .map(|v| v as u16)
        .collect();
    let doubles = decoder
        .get_tag_f64_vec(Tag::GeoDoubleParamsTag)
        .unwrap_or_default();
    let ascii = decoder.get_tag_ascii_string(Tag::GeoAsciiParamsTag).ok();

    CRS::from_geo_tags(directory, doubles, ascii)
}

/// GeoTIFF tag payloads for a transform: (pixel scale, tiepoint).
fn geo_tag_values(gt: &GeoTransform) -> (Vec<f64>, Vec<f64>) {
    let scale = vec![gt.pixel_width, gt.pixel_height.abs(), 0.0];
    let tiepoint = vec![0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    (scale, tiepoint)
}

/// Geokey payloads to write: the raster's own, or a minimal directory
/// (GTModelTypeGeoKey=1 Projected, GTRasterTypeGeoKey=1 PixelIsArea)
/// when the raster carries no projection.
fn geo_key_payloads(crs: Option<&CRS>) -> (Vec<u16>, Vec<f64>, Option<String>) {
    match crs {
        Some(crs) => (
            crs.directory().to_vec(),
            crs.doubles().to_vec(),
            crs.ascii().map(str::to_owned),
        ),
        None => (
            vec![
                1, 1, 0, 2, // Version 1.1.0, 2 keys
                1024, 0, 1, 1, // GTModelTypeGeoKey = ModelTypeProjected
                1025, 0, 1, 1, // GTRasterTypeGeoKey = RasterPixelIsArea
            ],
            Vec::new(),
            None,
        ),
    }
}

/// Write a Raster to a single-band Float32 GeoTIFF.
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    let mut encoder = TiffEncoder::new(file)
        .map_err(|e| Error::Other(format!("TIFF encoder error: {}", e)))?;

    let (rows, cols) = raster.shape();
    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
        .collect();

    let mut image = encoder
        .new_image::<Gray32Float>(cols as u32, rows as u32)
        .map_err(|e| Error::Other(format!("Cannot create TIFF image: {}", e)))?;

    let (scale, tiepoint) = geo_tag_values(raster.transform());
    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, scale.as_slice())
        .map_err(|e| Error::Other(format!("Cannot write scale tag: {}", e)))?;
    image
        .encoder()
        .write_tag(Tag::ModelTiepointTag, tiepoint.as_slice())
        .map_err(|e| Error::Other(format!("Cannot write tiepoint tag: {}", e)))?;

    let (directory, doubles, ascii) = geo_key_payloads(raster.crs());
    image
        .encoder()
        .write_tag(Tag::GeoKeyDirectoryTag, directory.as_slice())
        .map_err(|e| Error::Other(format!("Cannot write geokey tag: {}", e)))?;
    if !doubles.is_empty() {
        image
            .encoder()
            .write_tag(Tag::GeoDoubleParamsTag, doubles.as_slice())
            .map_err(|e| Error::Other(format!("Cannot write geokey doubles: {}", e)))?;
    }
    if let Some(text) = &ascii {
        image
            .encoder()
            .write_tag(Tag::GeoAsciiParamsTag, text.as_str())
            .map_err(|e| Error::Other(format!("Cannot write geokey ascii: {}", e)))?;
    }

    image
        .write_data(&data)
        .map_err(|e| Error::Other(format!("Cannot write image data: {}", e)))?;

    Ok(())
}

/// Write a byte raster to a single-band GeoTIFF.
///
/// Used for the encoded phenology products. `description` lands in the
/// ImageDescription tag (e.g. "Growth season onset").
pub fn write_byte_geotiff<P>(raster: &Raster<u8>, path: P, description: Option<&str>) -> Result<()>
where
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    let mut encoder = TiffEncoder::new(file)
        .map_err(|e| Error::Other(format!("TIFF encoder error: {}", e)))?;

    let (rows, cols) = raster.shape();
    let data: Vec<u8> = raster.data().iter().copied().collect();

    let mut image = encoder
        .new_image::<Gray8>(cols as u32, rows as u32)
        .map_err(|e| Error::Other(format!("Cannot create TIFF image: {}", e)))?;

    let (scale, tiepoint) = geo_tag_values(raster.transform());
    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, scale.as_slice())
        .map_err(|e| Error::Other(format!("Cannot write scale tag: {}", e)))?;
    image
        .encoder()
        .write_tag(Tag::ModelTiepointTag, tiepoint.as_slice())
        .map_err(|e| Error::Other(format!("Cannot write tiepoint tag: {}", e)))?;

    let (directory, doubles, ascii) = geo_key_payloads(raster.crs());
    image
        .encoder()
        .write_tag(Tag::GeoKeyDirectoryTag, directory.as_slice())
        .map_err(|e| Error::Other(format!("Cannot write geokey tag: {}", e)))?;
    if !doubles.is_empty() {
        image
            .encoder()
            .write_tag(Tag::GeoDoubleParamsTag, doubles.as_slice())
            .map_err(|e| Error::Other(format!("Cannot write geokey doubles: {}", e)))?;
    }
    if let Some(text) = &ascii {
        image
            .encoder()
            .write_tag(Tag::GeoAsciiParamsTag, text.as_str())
            .map_err(|e| Error::Other(format!("Cannot write geokey ascii: {}", e)))?;
    }

    if let Some(desc) = description {
        image
            .encoder()
            .write_tag(Tag::ImageDescription, desc)
            .map_err(|e| Error::Other(format!("Cannot write description tag: {}", e)))?;
    }

    image
        .write_data(&data)
        .map_err(|e| Error::Other(format!("Cannot write image data: {}", e)))?;

    Ok(())
}
