//! Texture generation for raw images and rendered sheets.

use eframe::egui::{self, ColorImage, TextureHandle, TextureOptions};
use figsheet_core::{Colormap, DisplayOptions, GroupSheetInput, SheetRenderer};
use figsheet_render::{RgbSheetRenderer, SheetImage};
use ndarray::Array2;

/// Largest side of a raw-image texture; bigger images are subsampled.
pub const RAW_TEXTURE_MAX_SIDE: usize = 1024;

/// Convert a rendered sheet buffer into an egui image.
#[must_use]
pub fn sheet_color_image(sheet: &SheetImage) -> ColorImage {
    ColorImage::from_rgb([sheet.width as usize, sheet.height as usize], &sheet.pixels)
}

/// Color a raw intensity plane, normalized over its finite range.
///
/// Pixels below `threshold` (when given) and non-finite pixels are black.
/// Images wider or taller than `max_side` are subsampled with a fixed stride.
#[must_use]
pub fn raw_color_image(
    image: &Array2<f64>,
    colormap: Colormap,
    threshold: Option<f64>,
    max_side: usize,
) -> ColorImage {
    let (h, w) = image.dim();
    if h == 0 || w == 0 {
        return ColorImage::new([1, 1], egui::Color32::BLACK);
    }
    let step = h.max(w).div_ceil(max_side.max(1));
    let (out_h, out_w) = (h.div_ceil(step), w.div_ceil(step));

    let (lo, hi) = image
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let span = if hi > lo { hi - lo } else { 1.0 };

    let mut pixels = Vec::with_capacity(out_h * out_w * 3);
    for y in 0..out_h {
        for x in 0..out_w {
            let v = image[[y * step, x * step]];
            let visible = v.is_finite() && threshold.map_or(true, |t| v >= t);
            let rgb = if visible {
                colormap.apply((v - lo) / span)
            } else {
                [0, 0, 0]
            };
            pixels.extend_from_slice(&rgb);
        }
    }
    ColorImage::from_rgb([out_w, out_h], &pixels)
}

/// A preview sheet uploaded to the GPU.
#[derive(Clone)]
pub struct SheetTexture {
    pub texture: TextureHandle,
    pub size: [usize; 2],
}

/// Renders preview sheets straight into textures.
pub struct TextureSheetRenderer {
    ctx: egui::Context,
    inner: RgbSheetRenderer,
}

impl TextureSheetRenderer {
    #[must_use]
    pub fn new(ctx: egui::Context, inner: RgbSheetRenderer) -> Self {
        Self { ctx, inner }
    }
}

impl SheetRenderer for TextureSheetRenderer {
    type Sheet = SheetTexture;
    type Error = figsheet_render::Error;

    fn render(
        &mut self,
        input: &GroupSheetInput<'_>,
        options: &DisplayOptions,
    ) -> Result<SheetTexture, Self::Error> {
        let sheet = self.inner.render(input, options)?;
        let image = sheet_color_image(&sheet);
        let size = image.size;
        let texture = self.ctx.load_texture(
            format!("sheet-{}", input.group),
            image,
            TextureOptions::LINEAR,
        );
        Ok(SheetTexture { texture, size })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_image_masks_below_threshold() {
        let image = Array2::from_shape_vec((1, 3), vec![0.0, 5.0, 10.0]).unwrap();
        let color = raw_color_image(&image, Colormap::Grayscale, Some(4.0), 16);
        assert_eq!(color.size, [3, 1]);
        assert_eq!(color.pixels[0], egui::Color32::BLACK);
        assert_eq!(color.pixels[2], egui::Color32::from_rgb(255, 255, 255));
    }

    #[test]
    fn test_raw_image_subsamples_large_planes() {
        let image = Array2::from_elem((100, 50), 1.0);
        let color = raw_color_image(&image, Colormap::Viridis, None, 25);
        assert_eq!(color.size, [13, 25]);
    }

    #[test]
    fn test_sheet_buffer_keeps_dimensions() {
        let sheet = SheetImage {
            width: 4,
            height: 2,
            pixels: vec![10; 4 * 2 * 3],
        };
        let image = sheet_color_image(&sheet);
        assert_eq!(image.size, [4, 2]);
        assert_eq!(image.pixels[7], egui::Color32::from_rgb(10, 10, 10));
    }
}
