//! Multi-page PDF assembly from rendered pages.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use printpdf::{
    ColorBits, ColorSpace, Image, ImageTransform, ImageXObject, Mm, PdfDocument,
    PdfLayerReference, Px,
};

use crate::layout::MM_PER_INCH;
use crate::sheet::SheetImage;
use crate::{Error, Result};

/// Write `pages` as a PDF, one image per page.
///
/// Each page is sized so its image, rendered at `dpi`, fills it exactly.
///
/// # Errors
/// Returns `Pdf` for an empty page list or a serialization failure, and
/// `Io` if the file cannot be created.
pub fn write_pdf(path: &Path, title: &str, pages: &[SheetImage], dpi: f64) -> Result<()> {
    let Some((first, rest)) = pages.split_first() else {
        return Err(Error::Pdf("no pages to write".into()));
    };

    let (w, h) = page_size(first, dpi);
    let (doc, page, layer) = PdfDocument::new(title, w, h, "Layer 1");
    place_image(doc.get_page(page).get_layer(layer), first, dpi);
    for image in rest {
        let (w, h) = page_size(image, dpi);
        let (page, layer) = doc.add_page(w, h, "Layer 1");
        place_image(doc.get_page(page).get_layer(layer), image, dpi);
    }

    let mut writer = BufWriter::new(File::create(path)?);
    doc.save(&mut writer)
        .map_err(|e| Error::Pdf(e.to_string()))?;
    log::info!("wrote {} ({} pages)", path.display(), pages.len());
    Ok(())
}

#[allow(clippy::cast_possible_truncation)]
fn page_size(image: &SheetImage, dpi: f64) -> (Mm, Mm) {
    let mm = |px: u32| Mm((f64::from(px) / dpi * MM_PER_INCH) as f32);
    (mm(image.width), mm(image.height))
}

fn place_image(layer: PdfLayerReference, page: &SheetImage, dpi: f64) {
    let xobject = ImageXObject {
        width: Px(page.width as usize),
        height: Px(page.height as usize),
        color_space: ColorSpace::Rgb,
        bits_per_component: ColorBits::Bit8,
        interpolate: true,
        image_data: page.pixels.clone(),
        image_filter: None,
        smask: None,
        clipping_bbox: None,
    };
    #[allow(clippy::cast_possible_truncation)]
    let transform = ImageTransform {
        dpi: Some(dpi as f32),
        ..Default::default()
    };
    Image::from(xobject).add_to_layer(layer, transform);
}
