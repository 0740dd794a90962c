//! Analysis workspace: the table and raw-image thresholding.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use eframe::egui::{self, TextureHandle, TextureOptions};
use egui_plot::{Bar, BarChart, Plot, PlotBounds, PlotImage, PlotPoint, VLine};
use figsheet_core::{
    fraction_above, process_table, Colormap, Column, FileRecord, PixelStats, Table,
};
use figsheet_io::{load_image, load_record, save_table};
use ndarray::Array2;
use rfd::FileDialog;

use super::{open_table, Workspace, WorkspaceContext, WorkspaceKind};
use crate::message::AppMessage;
use crate::ui::texture::{raw_color_image, RAW_TEXTURE_MAX_SIDE};
use crate::ui::theme::{accent, form_label, primary_button, section_header, stat_label, stat_value};
use crate::util::{
    format_fraction, format_number, parse_number, u64_to_f64, usize_to_f32, usize_to_f64,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Table,
    Raw,
}

/// The raw image currently inspected.
struct RawImage {
    label: String,
    image: Array2<f64>,
    stats: Option<PixelStats>,
    texture: Option<TextureHandle>,
}

/// Y-axis settings of the raw histogram.
#[derive(Debug, Clone, Copy, PartialEq)]
struct HistogramAxis {
    log: bool,
    manual: bool,
    y_min: f64,
    y_max: f64,
}

impl Default for HistogramAxis {
    fn default() -> Self {
        Self {
            log: false,
            manual: false,
            y_min: 0.0,
            y_max: 1000.0,
        }
    }
}

impl HistogramAxis {
    fn transform(self, count: u64) -> f64 {
        if self.log {
            if count > 0 {
                u64_to_f64(count).log10()
            } else {
                0.0
            }
        } else {
            u64_to_f64(count)
        }
    }
}

pub struct AnalysisWorkspace {
    tab: Tab,
    sort_new_by_groups: bool,
    selected_row: Option<usize>,
    raw: Option<RawImage>,
    raw_dirty: bool,
    colormap: Colormap,
    preview_threshold: bool,
    threshold_text: String,
    axis: HistogramAxis,
}

impl AnalysisWorkspace {
    #[must_use]
    pub fn new(colormap: Colormap) -> Self {
        Self {
            tab: Tab::Table,
            sort_new_by_groups: true,
            selected_row: None,
            raw: None,
            raw_dirty: false,
            colormap,
            preview_threshold: true,
            threshold_text: String::new(),
            axis: HistogramAxis::default(),
        }
    }

    fn threshold(&self) -> Option<f64> {
        parse_number(&self.threshold_text)
    }

    // ---- table tab ----

    fn new_table(&mut self, cx: &mut WorkspaceContext<'_>) {
        if cx.session.files.is_empty() {
            cx.send(AppMessage::error(
                "No input files",
                "Select files in the Input workspace first.",
            ));
            return;
        }
        match Table::from_grouping(&cx.session.grouping_of_files()) {
            Ok(mut table) => {
                if self.sort_new_by_groups {
                    table.sort_by_groups();
                }
                cx.status(format!("New table with {} rows", table.len()));
                cx.session.set_table(table, None);
                self.selected_row = None;
            }
            Err(e) => cx.send(AppMessage::error("Cannot build table", e)),
        }
    }

    fn save(cx: &mut WorkspaceContext<'_>, ask: bool) {
        let Some(table) = cx.session.table() else {
            return;
        };
        let path = match cx.session.table_path() {
            Some(p) if !ask => p.to_path_buf(),
            _ => {
                let Some(p) = FileDialog::new()
                    .set_title("Save table")
                    .add_filter("Table", &["json"])
                    .set_file_name("table.json")
                    .save_file()
                else {
                    return;
                };
                p
            }
        };
        match save_table(&path, table) {
            Ok(()) => {
                cx.status(format!("Saved {}", path.display()));
                cx.session.set_table_path(path);
            }
            Err(e) => cx.send(AppMessage::error("Cannot save table", e)),
        }
    }

    fn table_toolbar(&mut self, ui: &mut egui::Ui, cx: &mut WorkspaceContext<'_>) {
        let has_table = cx.session.table().is_some();
        ui.horizontal(|ui| {
            if ui.button("New from input").clicked() {
                self.new_table(cx);
            }
            ui.checkbox(&mut self.sort_new_by_groups, "sorted by group");
            ui.separator();
            if ui.button("Load…").clicked() {
                open_table(cx);
                self.selected_row = None;
            }
            if ui.add_enabled(has_table, egui::Button::new("Save")).clicked() {
                Self::save(cx, false);
            }
            if ui
                .add_enabled(has_table, egui::Button::new("Save as…"))
                .clicked()
            {
                Self::save(cx, true);
            }
            ui.separator();
            if ui
                .add_enabled(has_table, egui::Button::new("Sort by groups"))
                .clicked()
            {
                if let Some(table) = cx.session.table_mut() {
                    table.sort_by_groups();
                }
            }
            if ui
                .add_enabled(has_table, egui::Button::new("Sort by filename"))
                .clicked()
            {
                if let Some(table) = cx.session.table_mut() {
                    table.sort_by_filename();
                }
            }
        });
        if let Some(path) = cx.session.table_path() {
            ui.label(stat_label(&path.display().to_string()));
        } else if has_table {
            ui.label(stat_label("unsaved table"));
        }
    }

    fn table_view(&mut self, ui: &mut egui::Ui, table: &Table) -> Option<usize> {
        let columns = table.columns();
        let mut inspect = None;
        let row_height = ui.text_style_height(&egui::TextStyle::Body) + 6.0;
        egui::ScrollArea::both()
            .id_salt("table_view")
            .auto_shrink([false, false])
            .show_rows(ui, row_height, table.len() + 1, |ui, range| {
                egui::Grid::new("table_grid")
                    .striped(true)
                    .min_row_height(row_height)
                    .show(ui, |ui| {
                        for index in range {
                            if index == 0 {
                                for column in columns {
                                    ui.label(section_header(column.name()));
                                }
                                ui.end_row();
                                continue;
                            }
                            let row = index - 1;
                            let record = &table.rows()[row];
                            for column in columns {
                                let text = match column {
                                    Column::Fraction => format_fraction(record.fraction),
                                    other => record.cell(*other),
                                };
                                let selected = self.selected_row == Some(row);
                                if ui.selectable_label(selected, text).clicked() {
                                    self.selected_row = Some(row);
                                }
                            }
                            if ui.small_button("inspect").clicked() {
                                inspect = Some(row);
                            }
                            ui.end_row();
                        }
                    });
            });
        inspect
    }

    fn table_tab(&mut self, ui: &mut egui::Ui, cx: &mut WorkspaceContext<'_>) {
        self.table_toolbar(ui, cx);
        ui.separator();
        let Some(table) = cx.session.table() else {
            ui.centered_and_justified(|ui| ui.label("No table. Build one from the input files or load one."));
            return;
        };
        ui.label(stat_label(&format!(
            "{} rows, {} groups",
            format_number(table.len()),
            table.groups().len()
        )));
        if let Some(row) = self.table_view(ui, table) {
            let record = table.rows()[row].clone();
            self.open_record(&record, cx);
            self.tab = Tab::Raw;
        }
    }

    // ---- raw tab ----

    fn open_record(&mut self, record: &FileRecord, cx: &mut WorkspaceContext<'_>) {
        match load_record(record) {
            Ok(image) => self.set_raw(record.filename.clone(), image),
            Err(e) => cx.send(AppMessage::error(
                format!("Cannot load {}", record.filename),
                e,
            )),
        }
    }

    fn open_file(&mut self, path: PathBuf, cx: &mut WorkspaceContext<'_>) {
        let (Some(dir), Some(name)) = (path.parent(), path.file_name()) else {
            return;
        };
        let name = name.to_string_lossy().into_owned();
        match load_image(dir, &name) {
            Ok(image) => self.set_raw(name, image),
            Err(e) => cx.send(AppMessage::error(format!("Cannot load {name}"), e)),
        }
    }

    fn set_raw(&mut self, label: String, image: Array2<f64>) {
        let stats = PixelStats::compute(&image);
        if self.threshold_text.is_empty() {
            if let Some(s) = &stats {
                self.threshold_text = format!("{:.1}", s.mean);
            }
        }
        let (h, w) = image.dim();
        log::debug!("inspecting {label} ({w}x{h})");
        self.raw = Some(RawImage {
            label,
            image,
            stats,
            texture: None,
        });
        self.raw_dirty = true;
    }

    fn refresh_texture(&mut self, ctx: &egui::Context) {
        if !self.raw_dirty {
            return;
        }
        let threshold = self.threshold().filter(|_| self.preview_threshold);
        if let Some(raw) = &mut self.raw {
            let image = raw_color_image(&raw.image, self.colormap, threshold, RAW_TEXTURE_MAX_SIDE);
            raw.texture = Some(ctx.load_texture("raw-image", image, TextureOptions::NEAREST));
        }
        self.raw_dirty = false;
    }

    fn raw_controls(&mut self, ui: &mut egui::Ui, cx: &mut WorkspaceContext<'_>) {
        ui.horizontal(|ui| {
            if let Some(table) = cx.session.table() {
                let current = self
                    .selected_row
                    .and_then(|i| table.rows().get(i))
                    .map_or("choose a table row", FileRecord::display_name)
                    .to_string();
                let mut pick = None;
                egui::ComboBox::from_id_salt("raw_row")
                    .selected_text(current)
                    .width(260.0)
                    .show_ui(ui, |ui| {
                        for (i, record) in table.rows().iter().enumerate() {
                            if ui
                                .selectable_label(self.selected_row == Some(i), &record.filename)
                                .clicked()
                            {
                                pick = Some((i, record.clone()));
                            }
                        }
                    });
                if let Some((i, record)) = pick {
                    self.selected_row = Some(i);
                    self.open_record(&record, cx);
                }
            }
            if ui.button("Open image…").clicked() {
                if let Some(path) = FileDialog::new()
                    .add_filter("Images", figsheet_core::SUPPORTED_EXTENSIONS)
                    .pick_file()
                {
                    self.open_file(path, cx);
                }
            }
            ui.separator();
            egui::ComboBox::from_id_salt("raw_colormap")
                .selected_text(self.colormap.to_string())
                .show_ui(ui, |ui| {
                    for cmap in Colormap::ALL {
                        if ui
                            .selectable_value(&mut self.colormap, cmap, cmap.to_string())
                            .changed()
                        {
                            self.raw_dirty = true;
                        }
                    }
                });
        });

        ui.horizontal(|ui| {
            ui.label(form_label("Threshold"));
            if ui
                .add(egui::TextEdit::singleline(&mut self.threshold_text).desired_width(90.0))
                .changed()
            {
                self.raw_dirty = true;
            }
            if ui
                .checkbox(&mut self.preview_threshold, "mask below threshold")
                .changed()
            {
                self.raw_dirty = true;
            }
            let can_process = cx.session.table().is_some() && self.threshold().is_some();
            if ui
                .add_enabled(can_process, primary_button("Process all"))
                .on_hover_text("Write Threshold and Fraction for every table row")
                .clicked()
            {
                self.process_all(cx);
            }
        });
    }

    fn process_all(&mut self, cx: &mut WorkspaceContext<'_>) {
        let Some(threshold) = self.threshold() else {
            cx.send(AppMessage::error("Invalid threshold", "Enter a number."));
            return;
        };
        let Some(table) = cx.session.table_mut() else {
            return;
        };
        let cancel = AtomicBool::new(false);
        let report = match process_table(table, threshold, load_record, &cancel) {
            Ok(report) => report,
            Err(e) => {
                cx.send(AppMessage::error("Cannot process table", e));
                return;
            }
        };
        cx.status(format!(
            "Processed {} rows at threshold {threshold}",
            report.processed
        ));
        if !report.failures.is_empty() {
            cx.send(AppMessage::BatchFailures {
                title: "Images that could not be processed".into(),
                failures: report.failures,
            });
        }
        if let Some(path) = cx.session.table_path().map(std::path::Path::to_path_buf) {
            if let Some(table) = cx.session.table() {
                if let Err(e) = save_table(&path, table) {
                    cx.send(AppMessage::error("Cannot save table", e));
                }
            }
        }
    }

    fn raw_stats(&self, ui: &mut egui::Ui, raw: &RawImage) {
        egui::Grid::new("raw_stats").show(ui, |ui| {
            let (h, w) = raw.image.dim();
            ui.label(stat_label("Image"));
            ui.label(stat_value(&format!("{} ({w}x{h})", raw.label)));
            ui.end_row();
            if let Some(s) = &raw.stats {
                ui.label(stat_label("Range"));
                ui.label(stat_value(&format!("{:.1} - {:.1}", s.min, s.max)));
                ui.end_row();
                ui.label(stat_label("Mean"));
                ui.label(stat_value(&format!("{:.2}", s.mean)));
                ui.end_row();
            }
            if let Some(t) = self.threshold() {
                ui.label(stat_label("Above threshold"));
                ui.label(stat_value(&format_fraction(fraction_above(&raw.image, t))));
                ui.end_row();
            }
        });
    }

    fn raw_image_plot(ui: &mut egui::Ui, raw: &RawImage, height: f32) {
        let Some(texture) = &raw.texture else {
            return;
        };
        let [w, h] = texture.size();
        let size = egui::vec2(usize_to_f32(w), usize_to_f32(h));
        let (w, h) = (usize_to_f64(w), usize_to_f64(h));
        Plot::new("raw_image")
            .data_aspect(1.0)
            .height(height)
            .show_axes(false)
            .show(ui, |plot_ui| {
                plot_ui.image(PlotImage::new(
                    texture,
                    PlotPoint::new(w / 2.0, h / 2.0),
                    size,
                ));
            });
    }

    fn raw_histogram(&mut self, ui: &mut egui::Ui, stats: &PixelStats) {
        ui.horizontal(|ui| {
            ui.checkbox(&mut self.axis.log, "Log scale");
            ui.checkbox(&mut self.axis.manual, "Manual y range");
            ui.add_enabled_ui(self.axis.manual, |ui| {
                ui.add(egui::DragValue::new(&mut self.axis.y_min).prefix("min "));
                ui.add(egui::DragValue::new(&mut self.axis.y_max).prefix("max "));
            });
        });

        let axis = self.axis;
        let threshold = self.threshold();
        let width = stats.edges.get(1).zip(stats.edges.first()).map_or(1.0, |(b, a)| b - a);
        let (x_min, x_max) = (stats.min, stats.max.max(stats.min + width));
        Plot::new("raw_histogram")
            .x_axis_label("Intensity")
            .y_axis_label(if axis.log { "Log10(Pixels)" } else { "Pixels" })
            .height(220.0)
            .show(ui, |plot_ui| {
                let bars: Vec<Bar> = stats
                    .counts
                    .iter()
                    .zip(&stats.edges)
                    .map(|(&count, &left)| {
                        Bar::new(left + width / 2.0, axis.transform(count))
                            .width(width)
                            .fill(accent::BLUE)
                    })
                    .collect();
                plot_ui.bar_chart(BarChart::new(bars).name("Pixels"));
                if let Some(t) = threshold {
                    plot_ui.vline(VLine::new(t).color(accent::RED).width(2.0).name("Threshold"));
                }
                if axis.manual && axis.y_max > axis.y_min {
                    plot_ui.set_plot_bounds(PlotBounds::from_min_max(
                        [x_min, axis.y_min],
                        [x_max, axis.y_max],
                    ));
                }
            });
    }

    fn raw_tab(&mut self, ui: &mut egui::Ui, cx: &mut WorkspaceContext<'_>) {
        self.raw_controls(ui, cx);
        self.refresh_texture(ui.ctx());
        ui.separator();

        let Some(raw) = self.raw.take() else {
            ui.centered_and_justified(|ui| ui.label("No image"));
            return;
        };
        self.raw_stats(ui, &raw);
        let plot_height = (ui.available_height() - 280.0).max(200.0);
        Self::raw_image_plot(ui, &raw, plot_height);
        if let Some(stats) = &raw.stats {
            self.raw_histogram(ui, stats);
        } else {
            ui.label(stat_label("No finite pixels"));
        }
        self.raw = Some(raw);
    }
}

impl Workspace for AnalysisWorkspace {
    fn kind(&self) -> WorkspaceKind {
        WorkspaceKind::Analysis
    }

    fn ui(&mut self, ui: &mut egui::Ui, cx: &mut WorkspaceContext<'_>) {
        ui.horizontal(|ui| {
            ui.selectable_value(&mut self.tab, Tab::Table, "Table");
            ui.selectable_value(&mut self.tab, Tab::Raw, "Raw processing");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let ready = cx
                    .session
                    .table()
                    .is_some_and(|t| t.has_column(Column::Threshold));
                if ui
                    .add_enabled(ready, primary_button("Continue to output"))
                    .clicked()
                {
                    cx.send(AppMessage::Navigate(WorkspaceKind::Output));
                }
            });
        });
        ui.separator();
        match self.tab {
            Tab::Table => self.table_tab(ui, cx),
            Tab::Raw => self.raw_tab(ui, cx),
        }
    }

    fn on_deactivated(&mut self, _cx: &mut WorkspaceContext<'_>) {
        // Textures are rebuilt on return.
        if let Some(raw) = &mut self.raw {
            raw.texture = None;
        }
        self.raw_dirty = self.raw.is_some();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_histogram_axis_log_transform() {
        let axis = HistogramAxis {
            log: true,
            ..HistogramAxis::default()
        };
        assert_relative_eq!(axis.transform(1000), 3.0);
        assert_relative_eq!(axis.transform(0), 0.0);
        assert_relative_eq!(HistogramAxis::default().transform(7), 7.0);
    }

    #[test]
    fn test_set_raw_seeds_threshold_from_mean() {
        let mut ws = AnalysisWorkspace::new(Colormap::Viridis);
        let image = Array2::from_shape_vec((1, 4), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        ws.set_raw("a.tif".into(), image);
        assert_eq!(ws.threshold_text, "2.5");
        assert!(ws.raw_dirty);

        let other = Array2::from_elem((2, 2), 9.0);
        ws.set_raw("b.tif".into(), other);
        assert_eq!(ws.threshold(), Some(2.5));
    }
}
