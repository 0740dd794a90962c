//! The three workspaces and their shared lifecycle.
//!
//! - `input`: choose files and a grouping rule
//! - `analysis`: build, load and process the table
//! - `output`: preview sheets, export them and build reports

mod analysis;
mod input;
mod output;

use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use eframe::egui;
use figsheet_core::Table;
use figsheet_io::FigsheetConfig;
use figsheet_render::{ReportOptions, SheetStyle};
use rfd::FileDialog;

pub use analysis::AnalysisWorkspace;
pub use input::InputWorkspace;
pub use output::OutputWorkspace;

use crate::message::AppMessage;
use crate::session::Session;

/// Identifies a workspace for navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceKind {
    Input,
    Analysis,
    Output,
}

impl WorkspaceKind {
    pub const ALL: [WorkspaceKind; 3] = [
        WorkspaceKind::Input,
        WorkspaceKind::Analysis,
        WorkspaceKind::Output,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            WorkspaceKind::Input => "Input",
            WorkspaceKind::Analysis => "Analysis",
            WorkspaceKind::Output => "Output",
        }
    }

    #[must_use]
    pub fn index(self) -> usize {
        match self {
            WorkspaceKind::Input => 0,
            WorkspaceKind::Analysis => 1,
            WorkspaceKind::Output => 2,
        }
    }
}

/// What a workspace may touch while it is drawn.
pub struct WorkspaceContext<'a> {
    pub session: &'a mut Session,
    pub config: &'a FigsheetConfig,
    tx: &'a Sender<AppMessage>,
}

impl<'a> WorkspaceContext<'a> {
    pub fn new(
        session: &'a mut Session,
        config: &'a FigsheetConfig,
        tx: &'a Sender<AppMessage>,
    ) -> Self {
        Self { session, config, tx }
    }

    /// Post a message to the app. A closed channel means the app is
    /// shutting down, so the message is dropped.
    pub fn send(&self, message: AppMessage) {
        if self.tx.send(message).is_err() {
            log::debug!("app channel closed, message dropped");
        }
    }

    pub fn status(&self, text: impl Into<String>) {
        self.send(AppMessage::Status(text.into()));
    }
}

/// A top-level view of the application.
///
/// Lifecycle hooks are optional; the defaults do nothing.
pub trait Workspace {
    fn kind(&self) -> WorkspaceKind;

    /// Draw the workspace into the central panel.
    fn ui(&mut self, ui: &mut egui::Ui, cx: &mut WorkspaceContext<'_>);

    /// Called when the workspace becomes visible.
    fn on_activated(&mut self, _cx: &mut WorkspaceContext<'_>) {}

    /// Called when another workspace takes over.
    fn on_deactivated(&mut self, _cx: &mut WorkspaceContext<'_>) {}

    /// Whether the workspace needs another frame without user input.
    fn wants_repaint(&self) -> bool {
        false
    }
}

/// Heatmap styling taken from the configuration.
#[must_use]
pub fn sheet_style(config: &FigsheetConfig) -> SheetStyle {
    SheetStyle {
        colormap: config.colormap,
        max_cells: config.heatmap_max_cells,
        ..SheetStyle::default()
    }
}

/// Report resolutions and styling taken from the configuration.
#[must_use]
pub fn report_options(config: &FigsheetConfig) -> ReportOptions {
    ReportOptions {
        png_dpi: f64::from(config.export_dpi),
        style: sheet_style(config),
        ..ReportOptions::default()
    }
}

/// Ask for a table file.
#[must_use]
pub fn pick_table_file() -> Option<PathBuf> {
    FileDialog::new()
        .set_title("Open table")
        .add_filter("Table", &["json"])
        .pick_file()
}

/// Load a table, asking for the image directory if the table has none.
///
/// # Errors
/// Returns `Cancelled` when the directory prompt is dismissed, otherwise
/// the load error.
pub fn load_table_interactive(path: &Path) -> figsheet_io::Result<Table> {
    let mut ask = |table_path: &Path| {
        let mut dialog = FileDialog::new().set_title("Select the folder holding the table's images");
        if let Some(parent) = table_path.parent() {
            dialog = dialog.set_directory(parent);
        }
        dialog.pick_folder()
    };
    figsheet_io::load_table(path, &mut ask)
}

/// Report the outcome of an interactive table load.
fn report_table_load(cx: &mut WorkspaceContext<'_>, path: PathBuf, result: figsheet_io::Result<Table>) {
    match result {
        Ok(table) => {
            cx.status(format!("Loaded {} rows from {}", table.len(), path.display()));
            cx.session.set_table(table, Some(path));
        }
        Err(figsheet_io::Error::Cancelled) => cx.status("Table load cancelled"),
        Err(e) => cx.send(AppMessage::error("Cannot load table", e)),
    }
}

/// Pick, load and install a table into the session.
pub fn open_table(cx: &mut WorkspaceContext<'_>) {
    if let Some(path) = pick_table_file() {
        let result = load_table_interactive(&path);
        report_table_load(cx, path, result);
    }
}
