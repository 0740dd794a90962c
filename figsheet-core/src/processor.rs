//! Threshold/fraction math and batch population of the table.

use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};

use ndarray::Array2;

use crate::error::Result;
use crate::record::{Column, FileRecord};
use crate::table::Table;

/// Number of bins in the raw-intensity preview histogram.
pub const PREVIEW_BINS: usize = 256;

/// Share of pixels with value `>= threshold`.
///
/// Returns `None` for an empty image.
#[must_use]
pub fn fraction_above(image: &Array2<f64>, threshold: f64) -> Option<f64> {
    if image.is_empty() {
        return None;
    }
    let above = image.iter().filter(|&&v| v >= threshold).count();
    #[allow(clippy::cast_precision_loss)]
    Some(above as f64 / image.len() as f64)
}

/// Intensity summary of one raw image.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Left edges of the histogram bins (`PREVIEW_BINS + 1` edges).
    pub edges: Vec<f64>,
    pub counts: Vec<u64>,
}

impl PixelStats {
    /// Compute statistics over all finite pixels.
    ///
    /// Returns `None` when the image has no finite pixels.
    #[must_use]
    pub fn compute(image: &Array2<f64>) -> Option<Self> {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut n = 0usize;
        for &v in image.iter().filter(|v| v.is_finite()) {
            min = min.min(v);
            max = max.max(v);
            sum += v;
            n += 1;
        }
        if n == 0 {
            return None;
        }

        let span = if max > min { max - min } else { 1.0 };
        #[allow(clippy::cast_precision_loss)]
        let width = span / PREVIEW_BINS as f64;
        #[allow(clippy::cast_precision_loss)]
        let edges: Vec<f64> = (0..=PREVIEW_BINS).map(|i| min + width * i as f64).collect();
        let mut counts = vec![0u64; PREVIEW_BINS];
        for &v in image.iter().filter(|v| v.is_finite()) {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let bin = (((v - min) / width) as usize).min(PREVIEW_BINS - 1);
            counts[bin] += 1;
        }

        #[allow(clippy::cast_precision_loss)]
        let mean = sum / n as f64;
        Some(Self {
            min,
            max,
            mean,
            edges,
            counts,
        })
    }
}

/// Outcome of a batch processing run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessReport {
    /// Rows whose fraction was computed.
    pub processed: usize,
    /// Per-row failures: filename and reason.
    pub failures: Vec<(String, String)>,
    /// Whether the run stopped early.
    pub cancelled: bool,
}

/// Populate the Threshold column and every row's Fraction.
///
/// Rows whose image fails to load keep an absent fraction and are listed in
/// the report. `cancel` is checked between rows.
///
/// # Errors
/// Returns `MissingColumns` if Filename or Directory is absent.
pub fn process_table<F, E>(
    table: &mut Table,
    threshold: f64,
    mut load: F,
    cancel: &AtomicBool,
) -> Result<ProcessReport>
where
    F: FnMut(&FileRecord) -> std::result::Result<Array2<f64>, E>,
    E: Display,
{
    table.require(&[Column::Filename, Column::Directory])?;
    table.set_threshold(threshold);

    let mut report = ProcessReport::default();
    for index in 0..table.len() {
        if cancel.load(Ordering::Relaxed) {
            log::info!("processing cancelled after {index} rows");
            report.cancelled = true;
            break;
        }
        let record = &table.rows()[index];
        let fraction = match load(record) {
            Ok(image) => fraction_above(&image, threshold),
            Err(e) => {
                log::warn!("failed to load {}: {e}", record.filename);
                report.failures.push((record.filename.clone(), e.to_string()));
                None
            }
        };
        if fraction.is_some() {
            report.processed += 1;
        }
        table.set_fraction(index, fraction)?;
    }
    Ok(report)
}
