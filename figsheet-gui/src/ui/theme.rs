//! Application theme.
//!
//! Light and dark palettes that follow the system preference, plus a few
//! styled widgets shared by the workspaces.

use std::sync::atomic::{AtomicU8, Ordering};

use eframe::egui::{self, Color32, FontFamily, FontId, Rounding, Stroke, TextStyle, Visuals};

/// Accent colors, identical in both themes.
pub mod accent {
    use eframe::egui::Color32;

    pub const BLUE: Color32 = Color32::from_rgb(0x34, 0x98, 0xdb);
    pub const GREEN: Color32 = Color32::from_rgb(0x10, 0xb9, 0x81);
    pub const RED: Color32 = Color32::from_rgb(0xef, 0x44, 0x44);
}

/// Colors that change with light/dark mode.
#[derive(Clone, Copy, Debug)]
pub struct Palette {
    pub bg_base: Color32,
    pub bg_panel: Color32,
    pub bg_header: Color32,
    pub bg_input: Color32,
    pub border: Color32,
    pub border_light: Color32,
    pub text_primary: Color32,
    pub text_muted: Color32,
    pub button_hover: Color32,
}

const DARK: Palette = Palette {
    bg_base: Color32::from_rgb(0x1a, 0x1a, 0x1a),
    bg_panel: Color32::from_rgb(0x1f, 0x1f, 0x1f),
    bg_header: Color32::from_rgb(0x25, 0x25, 0x25),
    bg_input: Color32::from_rgb(0x2a, 0x2a, 0x2a),
    border: Color32::from_rgb(0x33, 0x33, 0x33),
    border_light: Color32::from_rgb(0x44, 0x44, 0x44),
    text_primary: Color32::from_rgb(0xe0, 0xe0, 0xe0),
    text_muted: Color32::from_rgb(0x88, 0x88, 0x88),
    button_hover: Color32::from_rgb(0x3a, 0x3a, 0x3a),
};

const LIGHT: Palette = Palette {
    bg_base: Color32::from_rgb(0xf5, 0xf5, 0xf5),
    bg_panel: Color32::from_rgb(0xff, 0xff, 0xff),
    bg_header: Color32::from_rgb(0xfa, 0xfa, 0xfa),
    bg_input: Color32::from_rgb(0xf0, 0xf0, 0xf0),
    border: Color32::from_rgb(0xd0, 0xd0, 0xd0),
    border_light: Color32::from_rgb(0xc0, 0xc0, 0xc0),
    text_primary: Color32::from_rgb(0x1a, 0x1a, 0x1a),
    text_muted: Color32::from_rgb(0x66, 0x66, 0x66),
    button_hover: Color32::from_rgb(0xdd, 0xdd, 0xdd),
};

impl Palette {
    #[must_use]
    pub fn for_dark_mode(dark: bool) -> Self {
        if dark {
            DARK
        } else {
            LIGHT
        }
    }

    #[must_use]
    pub fn from_ctx(ctx: &egui::Context) -> Self {
        Self::for_dark_mode(ctx.style().visuals.dark_mode)
    }
}

fn build_visuals(dark: bool) -> Visuals {
    let p = Palette::for_dark_mode(dark);
    let mut visuals = if dark { Visuals::dark() } else { Visuals::light() };
    let rounding = Rounding::same(4.0);

    visuals.window_fill = p.bg_panel;
    visuals.panel_fill = p.bg_panel;
    visuals.faint_bg_color = p.bg_base;
    visuals.extreme_bg_color = p.bg_input;

    let w = &mut visuals.widgets;
    w.noninteractive.bg_fill = p.bg_input;
    w.noninteractive.fg_stroke = Stroke::new(1.0, p.text_muted);
    w.noninteractive.bg_stroke = Stroke::new(1.0, p.border);
    w.noninteractive.rounding = rounding;

    for state in [&mut w.inactive, &mut w.open] {
        state.bg_fill = p.bg_input;
        state.fg_stroke = Stroke::new(1.0, p.text_primary);
        state.bg_stroke = Stroke::new(1.0, p.border_light);
        state.rounding = rounding;
    }

    w.hovered.bg_fill = p.button_hover;
    w.hovered.fg_stroke = Stroke::new(1.0, p.text_primary);
    w.hovered.bg_stroke = Stroke::new(1.0, accent::BLUE);
    w.hovered.rounding = rounding;

    w.active.bg_fill = accent::BLUE;
    w.active.fg_stroke = Stroke::new(1.0, Color32::WHITE);
    w.active.bg_stroke = Stroke::new(1.0, accent::BLUE);
    w.active.rounding = rounding;

    visuals.selection.bg_fill = accent::BLUE.gamma_multiply(if dark { 0.3 } else { 0.2 });
    visuals.selection.stroke = Stroke::new(1.0, accent::BLUE);
    visuals
}

fn configure_fonts_and_spacing(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();
    style.text_styles = [
        (TextStyle::Small, FontId::new(10.0, FontFamily::Proportional)),
        (TextStyle::Body, FontId::new(13.0, FontFamily::Proportional)),
        (TextStyle::Button, FontId::new(13.0, FontFamily::Proportional)),
        (TextStyle::Heading, FontId::new(16.0, FontFamily::Proportional)),
        (TextStyle::Monospace, FontId::new(12.0, FontFamily::Monospace)),
    ]
    .into();
    style.spacing.item_spacing = egui::vec2(8.0, 6.0);
    style.spacing.button_padding = egui::vec2(10.0, 5.0);
    style.spacing.indent = 16.0;
    ctx.set_style(style);
}

/// Apply visuals for the current dark/light mode plus fonts and spacing.
pub fn configure_style(ctx: &egui::Context) {
    ctx.set_visuals(build_visuals(ctx.style().visuals.dark_mode));
    configure_fonts_and_spacing(ctx);
}

// 0 = not yet applied, 1 = light, 2 = dark.
static APPLIED_MODE: AtomicU8 = AtomicU8::new(0);

/// Re-apply the style when the system switches between light and dark.
pub fn follow_system_theme(ctx: &egui::Context) {
    let mode = if ctx.style().visuals.dark_mode { 2 } else { 1 };
    if APPLIED_MODE.swap(mode, Ordering::Relaxed) != mode {
        configure_style(ctx);
    }
}

/// Primary action button.
pub fn primary_button(text: &str) -> egui::Button<'_> {
    egui::Button::new(egui::RichText::new(text).color(Color32::WHITE))
        .fill(accent::GREEN)
        .rounding(Rounding::same(4.0))
}

/// Section header label.
pub fn section_header(text: &str) -> egui::RichText {
    egui::RichText::new(text.to_uppercase()).size(11.0).strong()
}

/// Small form label.
pub fn form_label(text: &str) -> egui::RichText {
    egui::RichText::new(text.to_uppercase()).size(10.0)
}

pub fn stat_label(text: &str) -> egui::RichText {
    egui::RichText::new(text).size(11.0).weak()
}

pub fn stat_value(text: &str) -> egui::RichText {
    egui::RichText::new(text).size(11.0)
}

/// Error text in the accent red.
pub fn error_text(text: &str) -> egui::RichText {
    egui::RichText::new(text).color(accent::RED)
}
