use std::collections::BTreeMap;
use std::path::Path;

use figsheet_core::{FigureSelection, ReportLayout, SelectedFile};
use figsheet_render::heatmap::draw_heatmap;
use figsheet_render::{write_pdf, HeatmapCells, ReportFigure, ReportPanel, SheetImage, SheetStyle};
use plotters::prelude::*;

fn write_plane(dir: &Path, name: &str, fill: impl Fn(u32, u32) -> u8) {
    let img = image::GrayImage::from_fn(8, 6, |x, y| image::Luma([fill(x, y)]));
    img.save(dir.join(name)).unwrap();
}

fn selected(dir: &Path, filename: &str, fraction: f64) -> SelectedFile {
    SelectedFile {
        filename: filename.into(),
        directory: dir.to_path_buf(),
        group: "lif".into(),
        group_id: 3,
        fraction: Some(fraction),
        threshold: Some(100.0),
    }
}

#[test]
fn test_report_figure_loads_selected_planes() {
    let dir = tempfile::tempdir().unwrap();
    write_plane(dir.path(), "lif_00h.png", |x, _| if x < 4 { 10 } else { 200 });
    write_plane(dir.path(), "lif_48h.png", |_, _| 250);

    let mut row = BTreeMap::new();
    row.insert("0h".to_string(), selected(dir.path(), "lif_00h.png", 0.5));
    row.insert("48h".to_string(), selected(dir.path(), "lif_48h.png", 1.0));
    row.insert("6h".to_string(), selected(dir.path(), "lif_06h.png", 0.1));
    let mut rows = BTreeMap::new();
    rows.insert("LIF #1".to_string(), row);
    let figure = FigureSelection {
        key: "fig2".into(),
        figure_name: "NF-kB Lychee".into(),
        threshold: Some(100.0),
        source_table: dir.path().join("table.json"),
        rows,
    };

    let layout = ReportLayout::default();
    let fig = ReportFigure::load(&figure, &layout, &SheetStyle::default());
    let lif = fig.rows.iter().find(|r| r.label == "LIF #1").unwrap();

    let ReportPanel::Loaded(first) = &lif.panels[0] else {
        panic!("0h should load");
    };
    assert_eq!(first.dim(), (6, 8));
    assert!(first.is_masked(0, 0));
    assert!(!first.is_masked(0, 7));
    assert_eq!(lif.panels[3], ReportPanel::Failed);
    assert_eq!(lif.panels[1], ReportPanel::Missing);
    assert!(matches!(lif.panels[5], ReportPanel::Loaded(_)));
    assert_eq!(lif.fractions[5], Some(1.0));
    assert!((fig.y_max - 1.1).abs() < 1e-12);
    assert_eq!(fig.file_stem(), "NF-kB_Lychee");
}

#[test]
fn test_heatmap_keeps_square_cells() {
    let image = ndarray::Array2::from_elem((2, 4), 5.0);
    let cells = HeatmapCells::new(&image, 1.0, 64);
    let (w, h) = (80u32, 80u32);
    let mut buf = vec![255u8; (w * h * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buf, (w, h)).into_drawing_area();
        draw_heatmap(
            &root,
            &cells,
            figsheet_core::Colormap::Grayscale,
            RGBColor(0, 0, 0),
        )
        .unwrap();
        root.present().unwrap();
    }
    // A 2x4 grid in an 80x80 area is 80x40, centered vertically.
    let px = |x: u32, y: u32| buf[((y * w + x) * 3) as usize];
    assert_eq!(px(40, 5), 255);
    assert_eq!(px(40, 40), 0);
    assert_eq!(px(40, 75), 255);
}

#[test]
fn test_pdf_pages_follow_image_size() {
    let dir = tempfile::tempdir().unwrap();
    let sheet = SheetImage {
        width: 40,
        height: 28,
        pixels: vec![128; 40 * 28 * 3],
    };
    let report = SheetImage {
        width: 32,
        height: 20,
        pixels: vec![64; 32 * 20 * 3],
    };
    let path = dir.path().join("combined_figures.pdf");
    write_pdf(&path, "report", &[sheet, report], 2.0).unwrap();
    assert!(std::fs::metadata(&path).unwrap().len() > 0);
}
