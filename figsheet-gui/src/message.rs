//! Application message types.
//!
//! Workspaces never call each other; they post messages on the app channel
//! and the app drains them once per frame.

use crate::workspace::WorkspaceKind;

/// Messages sent from workspaces to the application.
#[derive(Debug, Clone, PartialEq)]
pub enum AppMessage {
    /// Replace the status bar text.
    Status(String),

    /// An operation was blocked; shown in a modal window.
    Error { title: String, message: String },

    /// A batch finished with per-item failures (item, reason).
    BatchFailures {
        title: String,
        failures: Vec<(String, String)>,
    },

    /// Switch to another workspace.
    Navigate(WorkspaceKind),
}

impl AppMessage {
    pub fn error(title: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Error {
            title: title.into(),
            message: message.to_string(),
        }
    }
}
