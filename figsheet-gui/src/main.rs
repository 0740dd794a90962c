//! figsheet-gui: desktop application for figure sheets.
//!
//! With a `figure_selections.json` argument the report is regenerated next
//! to it and the program exits without opening a window.

mod app;
mod message;
mod session;
mod ui;
mod util;
mod workspace;

use std::path::{Path, PathBuf};

use anyhow::Context;
use eframe::egui;
use figsheet_io::FigsheetConfig;
use figsheet_render::regenerate_report;

use crate::app::FigsheetApp;

/// Environment variable naming an optional JSON config file.
const CONFIG_ENV: &str = "FIGSHEET_CONFIG";

fn load_config() -> anyhow::Result<FigsheetConfig> {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) => {
            let path = PathBuf::from(path);
            FigsheetConfig::from_file(&path)
                .with_context(|| format!("reading config {}", path.display()))
        }
        None => Ok(FigsheetConfig::default()),
    }
}

fn regenerate(selection: &Path, config: &FigsheetConfig) -> anyhow::Result<()> {
    let output = regenerate_report(selection, &workspace::report_options(config))
        .with_context(|| format!("regenerating report from {}", selection.display()))?;
    for path in &output.written {
        println!("{}", path.display());
    }
    for (item, reason) in &output.failures {
        eprintln!("failed: {item}: {reason}");
    }
    if !output.failures.is_empty() {
        anyhow::bail!("{} report outputs could not be written", output.failures.len());
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = load_config()?;

    if let Some(selection) = std::env::args_os().nth(1) {
        return regenerate(Path::new(&selection), &config);
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_title("figsheet"),
        ..Default::default()
    };
    eframe::run_native(
        "figsheet",
        options,
        Box::new(move |cc| {
            ui::theme::configure_style(&cc.egui_ctx);
            Ok(Box::new(FigsheetApp::new(config)))
        }),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}
