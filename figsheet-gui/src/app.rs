//! Main application state and frame loop.
//!
//! `FigsheetApp` owns the session, the workspaces and the message channel.
//! Workspaces post messages while they draw; the app drains them at the
//! start of the next frame.

use std::sync::mpsc::{channel, Receiver, Sender};

use eframe::egui;
use figsheet_io::FigsheetConfig;

use crate::message::AppMessage;
use crate::session::Session;
use crate::ui::theme::{self, accent, error_text, Palette};
use crate::workspace::{
    AnalysisWorkspace, InputWorkspace, OutputWorkspace, Workspace, WorkspaceContext, WorkspaceKind,
};

/// A modal window waiting for acknowledgement.
#[derive(Debug, Clone, PartialEq)]
enum Dialog {
    Error {
        title: String,
        message: String,
    },
    Failures {
        title: String,
        failures: Vec<(String, String)>,
    },
}

pub struct FigsheetApp {
    config: FigsheetConfig,
    session: Session,
    /// Indexed by `WorkspaceKind::index`.
    workspaces: Vec<Box<dyn Workspace>>,
    active: WorkspaceKind,
    activated: bool,
    status: String,
    dialog: Option<Dialog>,
    rx: Receiver<AppMessage>,
    tx: Sender<AppMessage>,
}

impl FigsheetApp {
    #[must_use]
    pub fn new(config: FigsheetConfig) -> Self {
        let (tx, rx) = channel();
        let workspaces: Vec<Box<dyn Workspace>> = vec![
            Box::new(InputWorkspace::new(&config.grouping)),
            Box::new(AnalysisWorkspace::new(config.colormap)),
            Box::new(OutputWorkspace::new(&config)),
        ];
        debug_assert!(WorkspaceKind::ALL
            .iter()
            .all(|k| workspaces[k.index()].kind() == *k));
        Self {
            session: Session::new(config.grouping),
            config,
            workspaces,
            active: WorkspaceKind::Input,
            activated: false,
            status: "Ready".to_string(),
            dialog: None,
            rx,
            tx,
        }
    }

    fn context(&mut self) -> (&mut Box<dyn Workspace>, WorkspaceContext<'_>) {
        let workspace = &mut self.workspaces[self.active.index()];
        let cx = WorkspaceContext::new(&mut self.session, &self.config, &self.tx);
        (workspace, cx)
    }

    /// Make `kind` the visible workspace, running the lifecycle hooks.
    pub fn switch_to(&mut self, kind: WorkspaceKind) {
        if kind == self.active && self.activated {
            return;
        }
        if self.activated {
            let (workspace, mut cx) = self.context();
            workspace.on_deactivated(&mut cx);
        }
        log::debug!("workspace {} -> {}", self.active.label(), kind.label());
        self.active = kind;
        self.activated = true;
        let (workspace, mut cx) = self.context();
        workspace.on_activated(&mut cx);
    }

    /// Apply every pending message from the workspaces.
    pub fn handle_messages(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            match msg {
                AppMessage::Status(text) => {
                    log::info!("{text}");
                    self.status = text;
                }
                AppMessage::Error { title, message } => {
                    log::warn!("{title}: {message}");
                    self.status = title.clone();
                    self.dialog = Some(Dialog::Error { title, message });
                }
                AppMessage::BatchFailures { title, failures } => {
                    for (item, reason) in &failures {
                        log::warn!("{item}: {reason}");
                    }
                    self.dialog = Some(Dialog::Failures { title, failures });
                }
                AppMessage::Navigate(kind) => self.switch_to(kind),
            }
        }
    }

    fn render_top_panel(&mut self, ctx: &egui::Context) {
        let colors = Palette::from_ctx(ctx);
        let mut target = None;
        egui::TopBottomPanel::top("top_bar")
            .frame(
                egui::Frame::none()
                    .fill(colors.bg_header)
                    .inner_margin(egui::Margin::symmetric(16.0, 8.0)),
            )
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        egui::RichText::new("FIGSHEET")
                            .size(14.0)
                            .strong()
                            .color(accent::BLUE),
                    );
                    ui.separator();
                    for kind in WorkspaceKind::ALL {
                        if ui
                            .selectable_label(self.active == kind, kind.label())
                            .clicked()
                        {
                            target = Some(kind);
                        }
                    }
                });
            });
        if let Some(kind) = target {
            self.switch_to(kind);
        }
    }

    fn render_status_bar(&self, ctx: &egui::Context) {
        let colors = Palette::from_ctx(ctx);
        egui::TopBottomPanel::bottom("status_bar")
            .frame(
                egui::Frame::none()
                    .fill(colors.bg_header)
                    .inner_margin(egui::Margin::symmetric(16.0, 4.0)),
            )
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new(&self.status).color(colors.text_muted));
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let files = self.session.files.len();
                        let rows = self.session.table().map_or(0, figsheet_core::Table::len);
                        ui.label(
                            egui::RichText::new(format!("{files} files | {rows} rows"))
                                .color(colors.text_muted),
                        );
                    });
                });
            });
    }

    fn render_dialog(&mut self, ctx: &egui::Context) {
        let Some(dialog) = &self.dialog else {
            return;
        };
        let mut close = false;
        let title = match dialog {
            Dialog::Error { title, .. } | Dialog::Failures { title, .. } => title.clone(),
        };
        egui::Window::new(title)
            .collapsible(false)
            .resizable(true)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                match dialog {
                    Dialog::Error { message, .. } => {
                        ui.label(error_text(message));
                    }
                    Dialog::Failures { failures, .. } => {
                        ui.label(format!("{} items:", failures.len()));
                        egui::ScrollArea::vertical().max_height(300.0).show(ui, |ui| {
                            for (item, reason) in failures {
                                ui.label(format!("{item}: {reason}"));
                            }
                        });
                    }
                }
                ui.add_space(6.0);
                if ui.button("OK").clicked() {
                    close = true;
                }
            });
        if close {
            self.dialog = None;
        }
    }
}

impl eframe::App for FigsheetApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        theme::follow_system_theme(ctx);
        if !self.activated {
            self.switch_to(self.active);
        }
        self.handle_messages();

        self.render_top_panel(ctx);
        self.render_status_bar(ctx);
        let modal = self.dialog.is_some();
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_enabled_ui(!modal, |ui| {
                let (workspace, mut cx) = self.context();
                workspace.ui(ui, &mut cx);
            });
        });
        self.render_dialog(ctx);

        if self.workspaces[self.active.index()].wants_repaint() {
            ctx.request_repaint();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_message_switches_workspace() {
        let mut app = FigsheetApp::new(FigsheetConfig::default());
        app.switch_to(WorkspaceKind::Input);
        app.tx
            .send(AppMessage::Navigate(WorkspaceKind::Analysis))
            .unwrap();
        app.handle_messages();
        assert_eq!(app.active, WorkspaceKind::Analysis);
    }

    #[test]
    fn test_errors_open_a_dialog_and_set_status() {
        let mut app = FigsheetApp::new(FigsheetConfig::default());
        app.tx
            .send(AppMessage::error("Cannot load table", "missing columns"))
            .unwrap();
        app.tx.send(AppMessage::Status("later".into())).unwrap();
        app.handle_messages();
        assert_eq!(app.status, "later");
        assert_eq!(
            app.dialog,
            Some(Dialog::Error {
                title: "Cannot load table".into(),
                message: "missing columns".into(),
            })
        );
    }
}
