//! Image loading into 2-D intensity planes.
//!
//! TIFF files go through the `tiff` decoder (first page only), everything
//! else through the `image` crate. Raw sample values are kept; multi-channel
//! data is collapsed to one plane by [`collapse_planes`].

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use figsheet_core::{Column, FileRecord};
use image::DynamicImage;
use ndarray::{s, Array2, ArrayD, Axis, Ix2, Ix3, Ix4, IxDyn};
use tiff::decoder::{Decoder, DecodingResult};

use crate::{Error, Result};

/// Load `directory/filename` as a 2-D `f64` array.
///
/// # Errors
/// Returns an error if the file cannot be read, its format is unsupported
/// (`.nd2`), or the decoded data cannot be reduced to a single plane.
pub fn load_image(directory: &Path, filename: &str) -> Result<Array2<f64>> {
    let path = directory.join(filename);
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let data = match ext.as_str() {
        "nd2" => {
            return Err(Error::UnsupportedFormat(format!(
                "{}: ND2 files are not supported, convert to TIFF first",
                path.display()
            )))
        }
        "tif" | "tiff" => read_tiff(&path)?,
        _ => read_generic(&path)?,
    };
    collapse_planes(data)
}

/// Like [`load_image`] but logs failures and returns `None`.
#[must_use]
pub fn load_image_lenient(directory: &Path, filename: &str) -> Option<Array2<f64>> {
    match load_image(directory, filename) {
        Ok(image) => Some(image),
        Err(e) => {
            log::warn!("could not load {}: {e}", directory.join(filename).display());
            None
        }
    }
}

/// Load the image a table record points to.
///
/// # Errors
/// Returns `MissingColumns` if the record has no directory, otherwise the
/// errors of [`load_image`].
pub fn load_record(record: &FileRecord) -> Result<Array2<f64>> {
    let dir = record
        .directory
        .as_deref()
        .ok_or(figsheet_core::Error::MissingColumns(vec![Column::Directory]))?;
    load_image(dir, &record.filename)
}

/// Reduce an N-d sample array to one 2-D plane.
///
/// - 2-D: unchanged
/// - 3-D `(H, W, 3)`: mean over channels; `(H, W, 4)`: mean of the first
///   three; any other channel count: first channel
/// - 4-D: `[0, 0, :, :]` if the leading axis is longer than one, else
///   `[0, :, :, 0]`
///
/// # Errors
/// Returns `InvalidImage` for any other dimensionality.
pub fn collapse_planes(data: ArrayD<f64>) -> Result<Array2<f64>> {
    let shape = data.shape().to_vec();
    let plane = match shape.len() {
        2 => data.into_dimensionality::<Ix2>().map_err(shape_error)?,
        3 => {
            let cube = data.into_dimensionality::<Ix3>().map_err(shape_error)?;
            match shape[2] {
                3 | 4 => cube
                    .slice(s![.., .., 0..3])
                    .mean_axis(Axis(2))
                    .ok_or_else(|| Error::InvalidImage("empty channel axis".into()))?,
                _ => cube.index_axis(Axis(2), 0).to_owned(),
            }
        }
        4 => {
            let hyper = data.into_dimensionality::<Ix4>().map_err(shape_error)?;
            if shape[0] > 1 {
                hyper.slice(s![0, 0, .., ..]).to_owned()
            } else {
                hyper.slice(s![0, .., .., 0]).to_owned()
            }
        }
        n => {
            return Err(Error::InvalidImage(format!(
                "cannot reduce {n}-dimensional data {shape:?} to a plane"
            )))
        }
    };
    if plane.is_empty() {
        return Err(Error::InvalidImage(format!("empty plane from shape {shape:?}")));
    }
    Ok(plane)
}

#[allow(clippy::needless_pass_by_value)]
fn shape_error(e: ndarray::ShapeError) -> Error {
    Error::InvalidImage(e.to_string())
}

fn read_tiff(path: &Path) -> Result<ArrayD<f64>> {
    let file = File::open(path)?;
    let mut decoder = Decoder::new(BufReader::new(file))?;
    let (width, height) = decoder.dimensions()?;
    let samples = match decoder.read_image()? {
        DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::F64(v) => v,
        #[allow(clippy::cast_precision_loss)]
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f64).collect(),
        #[allow(clippy::cast_precision_loss)]
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f64).collect(),
        #[allow(unreachable_patterns)]
        _ => {
            return Err(Error::UnsupportedFormat(format!(
                "{}: unsupported TIFF sample type",
                path.display()
            )))
        }
    };
    log::debug!("decoded TIFF {} ({width}x{height})", path.display());
    samples_to_array(samples, width, height)
}

fn read_generic(path: &Path) -> Result<ArrayD<f64>> {
    let decoded = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?;
    let (width, height) = (decoded.width(), decoded.height());
    let samples: Vec<f64> = match decoded {
        DynamicImage::ImageLuma8(buf) => buf.into_raw().into_iter().map(f64::from).collect(),
        DynamicImage::ImageLumaA8(buf) => buf.into_raw().into_iter().map(f64::from).collect(),
        DynamicImage::ImageRgb8(buf) => buf.into_raw().into_iter().map(f64::from).collect(),
        DynamicImage::ImageRgba8(buf) => buf.into_raw().into_iter().map(f64::from).collect(),
        DynamicImage::ImageLuma16(buf) => buf.into_raw().into_iter().map(f64::from).collect(),
        DynamicImage::ImageLumaA16(buf) => buf.into_raw().into_iter().map(f64::from).collect(),
        DynamicImage::ImageRgb16(buf) => buf.into_raw().into_iter().map(f64::from).collect(),
        DynamicImage::ImageRgba16(buf) => buf.into_raw().into_iter().map(f64::from).collect(),
        DynamicImage::ImageRgb32F(buf) => buf.into_raw().into_iter().map(f64::from).collect(),
        DynamicImage::ImageRgba32F(buf) => buf.into_raw().into_iter().map(f64::from).collect(),
        other => other
            .into_rgb32f()
            .into_raw()
            .into_iter()
            .map(f64::from)
            .collect(),
    };
    samples_to_array(samples, width, height)
}

fn samples_to_array(samples: Vec<f64>, width: u32, height: u32) -> Result<ArrayD<f64>> {
    let (w, h) = (width as usize, height as usize);
    let pixels = w * h;
    if pixels == 0 || samples.len() % pixels != 0 {
        return Err(Error::InvalidImage(format!(
            "{} samples do not fit a {width}x{height} image",
            samples.len()
        )));
    }
    let channels = samples.len() / pixels;
    let shape: Vec<usize> = if channels == 1 {
        vec![h, w]
    } else {
        vec![h, w, channels]
    };
    ArrayD::from_shape_vec(IxDyn(&shape), samples).map_err(shape_error)
}
