//! Input workspace: file selection and grouping rule.

use eframe::egui;
use figsheet_core::{
    FileImporter, GroupPreview, GroupRule, GroupingConfig, SUPPORTED_EXTENSIONS,
};
use rfd::FileDialog;

use super::{Workspace, WorkspaceContext, WorkspaceKind};
use crate::message::AppMessage;
use crate::ui::theme::{error_text, form_label, primary_button, section_header, stat_label, stat_value};
use crate::util::format_number;

/// How the user-entered range is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleKind {
    /// 0-based, end-exclusive segment range.
    Underscore,
    /// 1-based, inclusive character range.
    Characters,
}

impl RuleKind {
    fn hint(self) -> &'static str {
        match self {
            RuleKind::Underscore => "segments START:END, e.g. 0:2",
            RuleKind::Characters => "characters FROM:TO, e.g. 1:6",
        }
    }
}

fn rule_from_text(kind: RuleKind, text: &str) -> figsheet_core::Result<GroupRule> {
    let (a, b) = GroupRule::parse_range(text)?;
    match kind {
        RuleKind::Underscore => Ok(GroupRule::Underscore { start: a, end: b }),
        RuleKind::Characters => GroupRule::from_one_based_chars(a, b),
    }
}

fn rule_to_text(rule: GroupRule) -> (RuleKind, String) {
    match rule {
        GroupRule::Underscore { start, end } => (RuleKind::Underscore, format!("{start}:{end}")),
        GroupRule::Characters { start, end } => {
            (RuleKind::Characters, format!("{}:{end}", start + 1))
        }
    }
}

pub struct InputWorkspace {
    importer: FileImporter,
    enabled: bool,
    kind: RuleKind,
    range: String,
    rule_error: Option<String>,
    preview: GroupPreview,
}

impl InputWorkspace {
    #[must_use]
    pub fn new(grouping: &GroupingConfig) -> Self {
        let (kind, range) = rule_to_text(grouping.rule);
        Self {
            importer: FileImporter::new(),
            enabled: grouping.enabled,
            kind,
            range,
            rule_error: None,
            preview: GroupPreview::default(),
        }
    }

    /// Push the file list and rule into the session and refresh the preview.
    fn commit(&mut self, cx: &mut WorkspaceContext<'_>) {
        cx.session.files = self.importer.files().to_vec();
        match rule_from_text(self.kind, &self.range) {
            Ok(rule) => {
                self.rule_error = None;
                cx.session.grouping = GroupingConfig {
                    enabled: self.enabled,
                    rule,
                };
            }
            Err(e) => {
                self.rule_error = Some(e.to_string());
                cx.session.grouping.enabled = self.enabled;
            }
        }
        self.preview = cx.session.grouping_of_files().preview();
    }

    fn file_buttons(&mut self, ui: &mut egui::Ui, cx: &mut WorkspaceContext<'_>) -> bool {
        let mut changed = false;
        ui.horizontal(|ui| {
            if ui.button("Add files…").clicked() {
                if let Some(paths) = FileDialog::new()
                    .add_filter("Images", SUPPORTED_EXTENSIONS)
                    .pick_files()
                {
                    let added = paths.iter().filter(|p| self.importer.add_file(p)).count();
                    cx.status(format!("Added {added} files"));
                    changed = true;
                }
            }
            if ui.button("Add folder…").clicked() {
                if let Some(dir) = FileDialog::new().pick_folder() {
                    match self.importer.add_dir(&dir) {
                        Ok(added) => cx.status(format!("Added {added} files from {}", dir.display())),
                        Err(e) => cx.send(AppMessage::error("Cannot read folder", e)),
                    }
                    changed = true;
                }
            }
            if ui
                .add_enabled(!self.importer.is_empty(), egui::Button::new("Clear"))
                .clicked()
            {
                self.importer.clear();
                changed = true;
            }
        });
        changed
    }

    fn file_list(&self, ui: &mut egui::Ui) {
        ui.label(stat_label(&format!(
            "{} files selected",
            format_number(self.importer.len())
        )));
        egui::ScrollArea::vertical()
            .id_salt("input_files")
            .max_height(260.0)
            .auto_shrink([false, true])
            .show(ui, |ui| {
                for path in self.importer.files() {
                    let name = path
                        .file_name()
                        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
                    ui.label(name).on_hover_text(path.display().to_string());
                }
            });
    }

    fn grouping_controls(&mut self, ui: &mut egui::Ui) -> bool {
        let mut changed = ui
            .checkbox(&mut self.enabled, "Group files by name")
            .changed();
        ui.add_enabled_ui(self.enabled, |ui| {
            ui.horizontal(|ui| {
                changed |= ui
                    .radio_value(&mut self.kind, RuleKind::Underscore, "Underscore segments")
                    .changed();
                changed |= ui
                    .radio_value(&mut self.kind, RuleKind::Characters, "Characters")
                    .changed();
            });
            ui.horizontal(|ui| {
                ui.label(form_label("Range"));
                changed |= ui
                    .add(
                        egui::TextEdit::singleline(&mut self.range)
                            .hint_text(self.kind.hint())
                            .desired_width(120.0),
                    )
                    .changed();
            });
            if let Some(err) = &self.rule_error {
                ui.label(error_text(err));
            }
        });
        changed
    }

    fn preview_ui(&self, ui: &mut egui::Ui) {
        ui.label(section_header("Preview"));
        if !self.enabled {
            ui.label(stat_label("All files form a single group."));
            return;
        }
        egui::Grid::new("group_preview_stats").show(ui, |ui| {
            ui.label(stat_label("Groups"));
            ui.label(stat_value(&self.preview.group_count.to_string()));
            ui.end_row();
            ui.label(stat_label("Ungrouped"));
            ui.label(stat_value(&self.preview.ungrouped_count.to_string()));
            ui.end_row();
        });
        match &self.preview.first {
            Some((key, names)) => {
                ui.label(format!("First group: {key}"));
                for name in names {
                    ui.label(stat_value(&format!("  {name}")));
                }
            }
            None => {
                ui.label(stat_label("No file matches the rule."));
            }
        }
    }
}

impl Workspace for InputWorkspace {
    fn kind(&self) -> WorkspaceKind {
        WorkspaceKind::Input
    }

    fn ui(&mut self, ui: &mut egui::Ui, cx: &mut WorkspaceContext<'_>) {
        ui.heading("Input files");
        ui.add_space(4.0);
        let mut changed = self.file_buttons(ui, cx);
        self.file_list(ui);

        ui.separator();
        ui.label(section_header("Grouping"));
        changed |= self.grouping_controls(ui);
        if changed {
            self.commit(cx);
        }

        ui.separator();
        self.preview_ui(ui);

        ui.add_space(8.0);
        let ready = !self.importer.is_empty() && self.rule_error.is_none();
        if ui
            .add_enabled(ready, primary_button("Continue to analysis"))
            .clicked()
        {
            cx.send(AppMessage::Navigate(WorkspaceKind::Analysis));
        }
    }

    fn on_activated(&mut self, cx: &mut WorkspaceContext<'_>) {
        if self.importer.files() != cx.session.files.as_slice() {
            self.importer.clear();
            for path in &cx.session.files {
                self.importer.add_file(path);
            }
        }
        self.commit(cx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_character_range_is_one_based() {
        let rule = rule_from_text(RuleKind::Characters, "1:6").unwrap();
        assert_eq!(rule, GroupRule::Characters { start: 0, end: 6 });
        assert!(rule_from_text(RuleKind::Characters, "0:3").is_err());
    }

    #[test]
    fn test_rule_text_round_trips() {
        for rule in [
            GroupRule::Underscore { start: 1, end: 3 },
            GroupRule::Characters { start: 2, end: 5 },
        ] {
            let (kind, text) = rule_to_text(rule);
            assert_eq!(rule_from_text(kind, &text).unwrap(), rule);
        }
    }

    #[test]
    fn test_bad_range_is_reported() {
        assert!(rule_from_text(RuleKind::Underscore, "a:b").is_err());
        assert!(rule_from_text(RuleKind::Underscore, "3").is_err());
    }
}
