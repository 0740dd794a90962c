//! Group sheets: a heatmap grid, histograms and a fraction bar chart on one
//! A4 landscape page.

use std::path::Path;

use figsheet_core::{Colormap, Column, DisplayOptions, GroupSheetInput, SheetRenderer};
use ndarray::Array2;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::charts::{draw_fraction_bars, draw_histograms, SheetHistogram};
use crate::heatmap::{draw_heatmap, draw_placeholder, HeatmapCells};
use crate::layout::{a4_landscape_px, heatmap_grid, pt_to_px};
use crate::{Error, Result};

/// Resolution of on-screen previews.
pub const PREVIEW_DPI: f64 = 100.0;

const FAILED_COLOR: RGBColor = RGBColor(200, 30, 30);

/// Appearance settings shared by every sheet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SheetStyle {
    pub colormap: Colormap,
    /// Upper bound on heatmap cells per axis.
    pub max_cells: usize,
    /// Color of below-threshold cells.
    pub mask: RGBColor,
}

impl Default for SheetStyle {
    fn default() -> Self {
        Self {
            colormap: Colormap::default(),
            max_cells: 128,
            mask: RGBColor(0, 0, 0),
        }
    }
}

/// One file of a sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetPanel {
    pub name: String,
    pub fraction: Option<f64>,
    /// `None` when the image failed to load.
    pub cells: Option<HeatmapCells>,
}

/// Everything drawn on a sheet, with images already loaded and reduced.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetData {
    pub title: String,
    pub threshold: f64,
    pub panels: Vec<SheetPanel>,
    pub histogram: Option<SheetHistogram>,
}

impl SheetData {
    /// Load every image of a group.
    ///
    /// Files that cannot be loaded become "Failed to load" panels.
    ///
    /// # Errors
    /// Returns `MissingColumns` when the group has no threshold.
    pub fn load(
        input: &GroupSheetInput<'_>,
        options: DisplayOptions,
        style: &SheetStyle,
    ) -> Result<Self> {
        let threshold = input
            .threshold
            .ok_or(figsheet_core::Error::MissingColumns(vec![Column::Threshold]))?;
        let images = load_images(input);
        Ok(Self::from_images(input, threshold, &images, options, style))
    }

    /// Build sheet data from already loaded images, one per input row.
    #[must_use]
    pub fn from_images(
        input: &GroupSheetInput<'_>,
        threshold: f64,
        images: &[Option<Array2<f64>>],
        options: DisplayOptions,
        style: &SheetStyle,
    ) -> Self {
        let panels = input
            .rows
            .iter()
            .zip(images)
            .map(|(row, image)| SheetPanel {
                name: row.display_name().to_string(),
                fraction: row.valid_fraction(),
                cells: image
                    .as_ref()
                    .map(|img| HeatmapCells::new(img, threshold, style.max_cells)),
            })
            .collect();
        let refs: Vec<Option<&Array2<f64>>> = images.iter().map(Option::as_ref).collect();
        Self {
            title: input.title(),
            threshold,
            panels,
            histogram: SheetHistogram::build(&refs, threshold, options.normalize),
        }
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.panels.iter().map(|p| p.name.clone()).collect()
    }

    #[must_use]
    pub fn fractions(&self) -> Vec<Option<f64>> {
        self.panels.iter().map(|p| p.fraction).collect()
    }
}

/// Load the image of every row of a group; failures are logged and `None`.
#[must_use]
pub fn load_images(input: &GroupSheetInput<'_>) -> Vec<Option<Array2<f64>>> {
    input
        .rows
        .iter()
        .map(|row| match figsheet_io::load_record(row) {
            Ok(image) => Some(image),
            Err(e) => {
                log::warn!("{}: {e}", row.filename);
                None
            }
        })
        .collect()
}

/// A rendered sheet as packed 8-bit RGB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl SheetImage {
    /// Write the sheet as a PNG file.
    ///
    /// # Errors
    /// Returns `Encode` if the file cannot be written.
    pub fn save_png(&self, path: &Path) -> Result<()> {
        image::save_buffer(
            path,
            &self.pixels,
            self.width,
            self.height,
            image::ColorType::Rgb8,
        )?;
        log::info!("wrote {}", path.display());
        Ok(())
    }
}

/// Draw a whole sheet onto `root`.
///
/// # Errors
/// Returns `Drawing` on backend or font failure.
pub fn draw_sheet<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    data: &SheetData,
    options: DisplayOptions,
    style: &SheetStyle,
    dpi: f64,
) -> Result<()> {
    root.fill(&WHITE)?;
    let (width, height) = root.dim_in_pixel();
    #[allow(clippy::cast_possible_truncation)]
    let title_h = pt_to_px(34.0, dpi) as i32;
    let (title_area, body) = root.split_vertically(title_h);

    let title_style = ("sans-serif", pt_to_px(14.0, dpi))
        .into_font()
        .style(FontStyle::Bold)
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center));
    let sub_style = ("sans-serif", pt_to_px(9.0, dpi))
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center));
    #[allow(clippy::cast_possible_wrap)]
    let cx = width as i32 / 2;
    title_area.draw(&Text::new(data.title.clone(), (cx, title_h * 2 / 5), title_style))?;
    title_area.draw(&Text::new(
        format!("Threshold: {}", data.threshold),
        (cx, title_h * 4 / 5),
        sub_style,
    ))?;

    #[allow(clippy::cast_possible_wrap)]
    let (left, right) = body.split_horizontally(width as i32 * 55 / 100);
    #[allow(clippy::cast_possible_wrap)]
    let (hist_area, bar_area) = right.split_vertically((height as i32 - title_h) / 2);

    draw_heatmap_grid(&left, data, style, dpi)?;
    draw_histograms(
        &hist_area,
        data.histogram.as_ref(),
        &data.names(),
        data.threshold,
        options,
        dpi,
    )?;
    draw_fraction_bars(&bar_area, &data.names(), &data.fractions(), dpi)?;
    Ok(())
}

fn draw_heatmap_grid<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    data: &SheetData,
    style: &SheetStyle,
    dpi: f64,
) -> Result<()> {
    let (rows, cols) = heatmap_grid(data.panels.len());
    if rows == 0 {
        return draw_placeholder(area, "No files", RGBColor(90, 90, 90), pt_to_px(9.0, dpi));
    }
    let margin = pt_to_px(3.0, dpi);
    #[allow(clippy::cast_possible_truncation)]
    let inner = area.margin(margin as i32, margin as i32, margin as i32, margin as i32);
    let cells = inner.split_evenly((rows, cols));
    #[allow(clippy::cast_possible_truncation)]
    let caption_h = pt_to_px(11.0, dpi) as i32;
    let caption_font = pt_to_px(6.0, dpi);

    for (panel, cell) in data.panels.iter().zip(&cells) {
        let cell = cell.margin(2, 2, 2, 2);
        let (caption, image_area) = cell.split_vertically(caption_h);
        #[allow(clippy::cast_possible_wrap)]
        let cx = caption.dim_in_pixel().0 as i32 / 2;
        caption.draw(&Text::new(
            panel.name.clone(),
            (cx, caption_h / 2),
            ("sans-serif", caption_font)
                .into_font()
                .color(&BLACK)
                .pos(Pos::new(HPos::Center, VPos::Center)),
        ))?;
        match &panel.cells {
            Some(heat) => draw_heatmap(&image_area, heat, style.colormap, style.mask)?,
            None => draw_placeholder(
                &image_area,
                "Failed to load",
                FAILED_COLOR,
                pt_to_px(8.0, dpi),
            )?,
        }
    }
    Ok(())
}

/// Render a sheet into an A4 landscape RGB buffer at `dpi`.
///
/// # Errors
/// Returns `Drawing` on backend or font failure.
pub fn render_sheet_rgb(
    data: &SheetData,
    options: DisplayOptions,
    style: &SheetStyle,
    dpi: f64,
) -> Result<SheetImage> {
    let (width, height) = a4_landscape_px(dpi);
    let mut pixels = vec![255u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut pixels, (width, height)).into_drawing_area();
        draw_sheet(&root, data, options, style, dpi)?;
        root.present()?;
    }
    Ok(SheetImage {
        width,
        height,
        pixels,
    })
}

/// Render a sheet as an SVG file sized for A4 landscape at `dpi`.
///
/// # Errors
/// Returns `Drawing` on backend or font failure.
pub fn render_sheet_svg(
    data: &SheetData,
    options: DisplayOptions,
    style: &SheetStyle,
    dpi: f64,
    path: &Path,
) -> Result<()> {
    let root = SVGBackend::new(path, a4_landscape_px(dpi)).into_drawing_area();
    draw_sheet(&root, data, options, style, dpi)?;
    root.present()?;
    log::info!("wrote {}", path.display());
    Ok(())
}

/// Renders preview sheets into RGB buffers.
#[derive(Debug, Clone)]
pub struct RgbSheetRenderer {
    pub style: SheetStyle,
    pub dpi: f64,
}

impl RgbSheetRenderer {
    #[must_use]
    pub fn new(style: SheetStyle, dpi: f64) -> Self {
        Self { style, dpi }
    }
}

impl Default for RgbSheetRenderer {
    fn default() -> Self {
        Self::new(SheetStyle::default(), PREVIEW_DPI)
    }
}

impl SheetRenderer for RgbSheetRenderer {
    type Sheet = SheetImage;
    type Error = Error;

    fn render(
        &mut self,
        input: &GroupSheetInput<'_>,
        options: &DisplayOptions,
    ) -> Result<SheetImage> {
        let data = SheetData::load(input, *options, &self.style)?;
        log::debug!("rendering sheet {}", data.title);
        render_sheet_rgb(&data, *options, &self.style, self.dpi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figsheet_core::FileRecord;
    use ndarray::array;

    fn record(name: &str, fraction: Option<f64>) -> FileRecord {
        FileRecord {
            group: Some("ctrl".into()),
            group_id: Some(1),
            fraction,
            ..FileRecord::new(name)
        }
    }

    #[test]
    fn test_sheet_data_from_images() {
        let a = record("ctrl_00h.tif", Some(0.5));
        let b = record("ctrl_24h.tif", None);
        let input = GroupSheetInput {
            group: "ctrl",
            group_id: 1,
            threshold: Some(2.0),
            rows: vec![&a, &b],
        };
        let images = vec![Some(array![[1.0, 3.0], [4.0, 0.0]]), None];
        let data = SheetData::from_images(
            &input,
            2.0,
            &images,
            DisplayOptions::default(),
            &SheetStyle::default(),
        );
        assert_eq!(data.title, "ctrl (ID: 1)");
        assert_eq!(data.names(), vec!["00h.tif", "24h.tif"]);
        assert_eq!(data.fractions(), vec![Some(0.5), None]);
        assert!(data.panels[0].cells.is_some());
        assert!(data.panels[1].cells.is_none());
        let hist = data.histogram.unwrap();
        assert_eq!(hist.series.len(), 1);
    }

    #[test]
    fn test_missing_threshold_is_rejected() {
        let a = record("ctrl_00h.tif", None);
        let input = GroupSheetInput {
            group: "ctrl",
            group_id: 1,
            threshold: None,
            rows: vec![&a],
        };
        let err = SheetData::load(&input, DisplayOptions::default(), &SheetStyle::default());
        assert!(matches!(
            err,
            Err(Error::CoreError(figsheet_core::Error::MissingColumns(_)))
        ));
    }
}
