//! Output workspace: sheet previews, export and report building.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use eframe::egui;
use figsheet_core::{
    Column, DisplayOptions, FigureSelection, GroupSummary, PreviewManager, ReportSelection, Table,
};
use figsheet_io::FigsheetConfig;
use figsheet_render::{
    default_export_dir, export_sheets, generate_report, regenerate_report, ExportOptions,
    RgbSheetRenderer, PREVIEW_DPI,
};
use rfd::FileDialog;

use super::{open_table, report_options, sheet_style, Workspace, WorkspaceContext, WorkspaceKind};
use crate::message::AppMessage;
use crate::ui::texture::{SheetTexture, TextureSheetRenderer};
use crate::ui::theme::{error_text, form_label, primary_button, section_header, stat_label};
use crate::util::usize_to_f32;

/// One report figure being assembled: a name and a group per row label.
#[derive(Debug, Clone, PartialEq)]
struct FigureDraft {
    name: String,
    /// Group chosen for each row label, in layout order.
    groups: Vec<Option<String>>,
}

impl FigureDraft {
    fn new(rows: usize) -> Self {
        Self {
            name: String::new(),
            groups: vec![None; rows],
        }
    }

    /// `(row label, group)` pairs for the rows that have a group.
    fn row_groups(&self, labels: &[String]) -> Vec<(String, String)> {
        labels
            .iter()
            .zip(&self.groups)
            .filter_map(|(label, group)| group.clone().map(|g| (label.clone(), g)))
            .collect()
    }

    fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && self.groups.iter().any(Option::is_some)
    }
}

/// Build the report selection from the drafts.
///
/// Returns the selection and human-readable notes about missing timepoints.
fn build_selection(
    drafts: &[FigureDraft],
    table: &Table,
    table_path: Option<PathBuf>,
    config: &FigsheetConfig,
) -> figsheet_core::Result<(ReportSelection, Vec<(String, String)>)> {
    let layout = config.report.clone();
    let mut figures = Vec::with_capacity(drafts.len());
    let mut notes = Vec::new();
    for (i, draft) in drafts.iter().enumerate() {
        let (figure, missing) = FigureSelection::auto(
            &format!("fig{}", i + 1),
            draft.name.trim(),
            table,
            table_path.clone().unwrap_or_default(),
            &draft.row_groups(&layout.row_labels),
            &layout,
        )?;
        for (row, timepoints) in missing {
            notes.push((
                format!("{} / {row}", figure.figure_name),
                format!("no file for {}", timepoints.join(", ")),
            ));
        }
        figures.push(figure);
    }
    Ok((ReportSelection { layout, figures }, notes))
}

pub struct OutputWorkspace {
    preview: PreviewManager<SheetTexture>,
    renderer: Option<TextureSheetRenderer>,
    seen_revision: Option<u64>,
    display: DisplayOptions,
    zoom: f32,
    drafts: Vec<FigureDraft>,
    draft: FigureDraft,
}

impl OutputWorkspace {
    #[must_use]
    pub fn new(config: &FigsheetConfig) -> Self {
        Self {
            preview: PreviewManager::new(config.preview_debounce(), config.renders_per_poll),
            renderer: None,
            seen_revision: None,
            display: DisplayOptions::default(),
            zoom: 1.0,
            drafts: Vec::new(),
            draft: FigureDraft::new(config.report.row_labels.len()),
        }
    }

    /// Drop previews built from an outdated table.
    fn sync_with_session(&mut self, cx: &WorkspaceContext<'_>) {
        let revision = cx.session.revision();
        if self.seen_revision == Some(revision) {
            return;
        }
        let now = Instant::now();
        match cx.session.table() {
            Some(table) => {
                let groups: Vec<String> = table.groups().into_iter().map(|g| g.name).collect();
                let kept: Vec<String> = self
                    .preview
                    .selected()
                    .iter()
                    .filter(|g| groups.contains(g))
                    .cloned()
                    .collect();
                self.preview.set_selected(kept, now);
                self.preview.invalidate_all(now);
            }
            None => self.preview.reset(),
        }
        self.seen_revision = Some(revision);
    }

    fn poll_preview(&mut self, ctx: &egui::Context, cx: &WorkspaceContext<'_>) {
        let Some(table) = cx.session.table() else {
            return;
        };
        let renderer = self.renderer.get_or_insert_with(|| {
            TextureSheetRenderer::new(
                ctx.clone(),
                RgbSheetRenderer::new(sheet_style(cx.config), PREVIEW_DPI),
            )
        });
        let now = Instant::now();
        let outcome = self.preview.poll(now, table, renderer);
        if outcome.changed() {
            log::debug!(
                "preview: +{} -{} ({} pending)",
                outcome.added.len(),
                outcome.removed.len(),
                outcome.remaining
            );
        }
        if outcome.remaining > 0 {
            ctx.request_repaint();
        } else if let Some(wait) = self.preview.time_until_rebuild(now) {
            ctx.request_repaint_after(wait + Duration::from_millis(5));
        }
    }

    fn table_bar(ui: &mut egui::Ui, cx: &mut WorkspaceContext<'_>) {
        ui.horizontal(|ui| {
            ui.label(form_label("Table"));
            let text = cx.session.table_path().map_or_else(
                || {
                    if cx.session.table().is_some() {
                        "unsaved table".to_string()
                    } else {
                        "none".to_string()
                    }
                },
                |p| p.display().to_string(),
            );
            ui.label(stat_label(&text));
            if ui.button("Browse…").clicked() {
                open_table(cx);
            }
        });
    }

    fn group_toggles(&mut self, ui: &mut egui::Ui, groups: &[GroupSummary]) {
        let now = Instant::now();
        ui.label(section_header("Groups"));
        ui.horizontal(|ui| {
            if ui.small_button("All").clicked() {
                self.preview
                    .set_selected(groups.iter().map(|g| g.name.clone()), now);
            }
            if ui.small_button("None").clicked() {
                self.preview.set_selected(Vec::<String>::new(), now);
            }
        });
        egui::ScrollArea::vertical()
            .id_salt("group_toggles")
            .max_height(ui.available_height() * 0.4)
            .show(ui, |ui| {
                for group in groups {
                    let mut on = self.preview.is_selected(&group.name);
                    if ui.checkbox(&mut on, group.label()).changed() {
                        self.preview.toggle(&group.name, on, now);
                    }
                }
            });

        ui.separator();
        let mut display = self.display;
        ui.checkbox(&mut display.log_scale, "Log-scale histograms");
        ui.checkbox(&mut display.normalize, "Normalize histograms");
        if display != self.display {
            self.display = display;
            self.preview.set_options(display, now);
        }
        ui.add(egui::Slider::new(&mut self.zoom, 0.5..=2.0).text("zoom"));
    }

    fn export(&self, cx: &mut WorkspaceContext<'_>) {
        let Some(table) = cx.session.table() else {
            return;
        };
        let groups: Vec<String> = self.preview.selected().iter().cloned().collect();
        let mut dialog = FileDialog::new().set_title("Export folder");
        if let Some(path) = cx.session.table_path() {
            let default = default_export_dir(path);
            if std::fs::create_dir_all(&default).is_ok() {
                dialog = dialog.set_directory(default);
            }
        }
        let Some(out_dir) = dialog.pick_folder() else {
            return;
        };

        let mut options = ExportOptions::new(out_dir);
        options.dpi = f64::from(cx.config.export_dpi);
        options.display = self.display;
        options.style = sheet_style(cx.config);
        let cancel = AtomicBool::new(false);
        match export_sheets(table, &groups, &options, &cancel) {
            Ok(report) => {
                cx.status(format!(
                    "Exported {} files to {}",
                    report.written.len(),
                    options.out_dir.display()
                ));
                if !report.failures.is_empty() {
                    cx.send(AppMessage::BatchFailures {
                        title: "Export failures".into(),
                        failures: report.failures,
                    });
                }
            }
            Err(e) => cx.send(AppMessage::error("Export failed", e)),
        }
    }

    fn sheets_view(&self, ui: &mut egui::Ui) {
        let sheets = self.preview.sheets();
        let failed = self.preview.failed();
        if sheets.is_empty() && failed.is_empty() {
            let text = if self.preview.is_busy() {
                "Rendering…"
            } else {
                "Select groups to preview their sheets."
            };
            ui.centered_and_justified(|ui| ui.label(text));
            return;
        }
        egui::ScrollArea::vertical()
            .id_salt("sheets")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for (group, reason) in failed {
                    ui.label(error_text(&format!("{group}: {reason}")));
                }
                let width = ui.available_width() * self.zoom;
                for (_, sheet) in sheets {
                    let [w, h] = sheet.size;
                    let aspect = usize_to_f32(h) / usize_to_f32(w.max(1));
                    ui.add(
                        egui::Image::new(&sheet.texture)
                            .fit_to_exact_size(egui::vec2(width, width * aspect)),
                    );
                    ui.add_space(8.0);
                }
                if self.preview.is_busy() {
                    ui.spinner();
                }
            });
    }

    fn report_builder(&mut self, ui: &mut egui::Ui, cx: &mut WorkspaceContext<'_>, groups: &[GroupSummary]) {
        let labels = cx.config.report.row_labels.clone();
        if self.draft.groups.len() != labels.len() {
            self.draft = FigureDraft::new(labels.len());
        }
        ui.horizontal(|ui| {
            ui.label(form_label("Figure"));
            ui.text_edit_singleline(&mut self.draft.name);
        });
        egui::Grid::new("report_rows").num_columns(2).show(ui, |ui| {
            for (row, label) in labels.iter().enumerate() {
                ui.label(label);
                let current = self.draft.groups[row].clone().unwrap_or_else(|| "(none)".into());
                egui::ComboBox::from_id_salt(("report_row", row))
                    .selected_text(current)
                    .width(180.0)
                    .show_ui(ui, |ui| {
                        ui.selectable_value(&mut self.draft.groups[row], None, "(none)");
                        for g in groups {
                            ui.selectable_value(
                                &mut self.draft.groups[row],
                                Some(g.name.clone()),
                                g.label(),
                            );
                        }
                    });
                ui.end_row();
            }
        });
        ui.horizontal(|ui| {
            if ui
                .add_enabled(self.draft.is_complete(), egui::Button::new("Add figure"))
                .clicked()
            {
                let next = FigureDraft::new(labels.len());
                self.drafts.push(std::mem::replace(&mut self.draft, next));
            }
            if ui.button("Regenerate from selection…").clicked() {
                Self::regenerate(cx);
            }
        });

        let mut remove = None;
        for (i, draft) in self.drafts.iter().enumerate() {
            ui.horizontal(|ui| {
                ui.label(format!("{}. {}", i + 1, draft.name));
                if ui.small_button("✕").clicked() {
                    remove = Some(i);
                }
            });
        }
        if let Some(i) = remove {
            self.drafts.remove(i);
        }

        let ready = !self.drafts.is_empty()
            && cx
                .session
                .table()
                .is_some_and(|t| t.require(&Column::ALL).is_ok());
        if ui
            .add_enabled(ready, primary_button("Generate report…"))
            .on_disabled_hover_text("Needs processed figures and a table with Fraction")
            .clicked()
        {
            self.generate(cx);
        }
    }

    fn generate(&mut self, cx: &mut WorkspaceContext<'_>) {
        let Some(table) = cx.session.table() else {
            return;
        };
        let table_path = cx.session.table_path().map(std::path::Path::to_path_buf);
        let (selection, notes) = match build_selection(&self.drafts, table, table_path, cx.config) {
            Ok(built) => built,
            Err(e) => {
                cx.send(AppMessage::error("Cannot build report", e));
                return;
            }
        };
        let Some(out_dir) = FileDialog::new().set_title("Report folder").pick_folder() else {
            return;
        };
        match generate_report(&selection, &out_dir, true, &report_options(cx.config)) {
            Ok(output) => {
                cx.status(format!(
                    "Wrote {} report files to {}",
                    output.written.len(),
                    out_dir.display()
                ));
                let mut failures = notes;
                failures.extend(output.failures);
                if !failures.is_empty() {
                    cx.send(AppMessage::BatchFailures {
                        title: "Report notes".into(),
                        failures,
                    });
                }
            }
            Err(e) => cx.send(AppMessage::error("Report failed", e)),
        }
    }

    fn regenerate(cx: &mut WorkspaceContext<'_>) {
        let Some(path) = FileDialog::new()
            .set_title("Open figure selection")
            .add_filter("Selection", &["json"])
            .pick_file()
        else {
            return;
        };
        match regenerate_report(&path, &report_options(cx.config)) {
            Ok(output) => {
                cx.status(format!("Regenerated {} report files", output.written.len()));
                if !output.failures.is_empty() {
                    cx.send(AppMessage::BatchFailures {
                        title: "Report failures".into(),
                        failures: output.failures,
                    });
                }
            }
            Err(e) => cx.send(AppMessage::error("Cannot regenerate report", e)),
        }
    }
}

impl Workspace for OutputWorkspace {
    fn kind(&self) -> WorkspaceKind {
        WorkspaceKind::Output
    }

    fn ui(&mut self, ui: &mut egui::Ui, cx: &mut WorkspaceContext<'_>) {
        self.sync_with_session(cx);
        Self::table_bar(ui, cx);
        ui.separator();

        let Some(table) = cx.session.table() else {
            ui.centered_and_justified(|ui| ui.label("Load or build a table first."));
            return;
        };
        if let Err(e) = table.require(&[Column::Group, Column::GroupId]) {
            ui.label(error_text(&e.to_string()));
            return;
        }
        let groups = table.groups();
        let has_threshold = table.has_column(Column::Threshold);

        egui::SidePanel::left("output_controls")
            .resizable(true)
            .default_width(260.0)
            .show_inside(ui, |ui| {
                self.group_toggles(ui, &groups);
                ui.separator();
                if !has_threshold {
                    ui.label(error_text("Process the table first: no Threshold column."));
                }
                let can_export = has_threshold && !self.preview.selected().is_empty();
                if ui
                    .add_enabled(can_export, primary_button("Export selected…"))
                    .clicked()
                {
                    self.export(cx);
                }
                ui.separator();
                egui::CollapsingHeader::new("Report")
                    .default_open(false)
                    .show(ui, |ui| self.report_builder(ui, cx, &groups));
            });

        self.poll_preview(ui.ctx(), cx);
        egui::CentralPanel::default().show_inside(ui, |ui| self.sheets_view(ui));
    }

    fn on_activated(&mut self, cx: &mut WorkspaceContext<'_>) {
        self.sync_with_session(cx);
    }

    fn wants_repaint(&self) -> bool {
        self.preview.is_busy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figsheet_core::{FileRecord, ReportLayout};
    use std::path::Path;

    fn processed_table() -> Table {
        let mut table = Table::with_columns(&Column::ALL);
        for (group, id, tp, fraction) in [
            ("Ctrl", 1, "00h", 0.2),
            ("Ctrl", 1, "02h", 0.4),
            ("LIF", 2, "00h", 0.5),
        ] {
            let mut r = FileRecord::new(format!("{group}_{tp}.tif"));
            r.directory = Some(PathBuf::from("/d"));
            r.group = Some(group.into());
            r.group_id = Some(id);
            r.threshold = Some(10.0);
            r.fraction = Some(fraction);
            table.push(r).unwrap();
        }
        table
    }

    #[test]
    fn test_draft_pairs_rows_with_groups() {
        let labels: Vec<String> = ["Ctrl #1", "Ctrl #2", "LIF #1"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let mut draft = FigureDraft::new(3);
        assert!(!draft.is_complete());
        draft.name = "Fig 1".into();
        draft.groups[0] = Some("Ctrl".into());
        draft.groups[2] = Some("LIF".into());
        assert!(draft.is_complete());
        assert_eq!(
            draft.row_groups(&labels),
            vec![
                ("Ctrl #1".to_string(), "Ctrl".to_string()),
                ("LIF #1".to_string(), "LIF".to_string()),
            ]
        );
    }

    #[test]
    fn test_build_selection_reports_missing_timepoints() {
        let config = FigsheetConfig::default();
        let labels = ReportLayout::default().row_labels;
        let mut draft = FigureDraft::new(labels.len());
        draft.name = "  Fig 1 ".into();
        draft.groups[0] = Some("Ctrl".into());

        let (selection, notes) = build_selection(
            &[draft],
            &processed_table(),
            Some(PathBuf::from("/d/table.json")),
            &config,
        )
        .unwrap();
        assert_eq!(selection.figures.len(), 1);
        let figure = &selection.figures[0];
        assert_eq!(figure.key, "fig1");
        assert_eq!(figure.figure_name, "Fig 1");
        assert_eq!(figure.source_table, Path::new("/d/table.json"));
        assert_eq!(figure.row(&labels[0]).map(|r| r.len()), Some(2));
        assert_eq!(notes.len(), 1);
        assert!(notes[0].1.contains("4h"));
    }

    #[test]
    fn test_build_selection_rejects_unknown_group() {
        let mut draft = FigureDraft::new(1);
        draft.name = "x".into();
        draft.groups[0] = Some("Nope".into());
        let result = build_selection(&[draft], &processed_table(), None, &FigsheetConfig::default());
        assert!(result.is_err());
    }
}
