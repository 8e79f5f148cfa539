//! Application theme and styling.

use egui::{Color32, FontFamily, FontId, Rounding, Stroke, TextStyle, Visuals};

use crate::controller::Severity;

/// Dark color palette.
pub struct ThemeColors;

impl ThemeColors {
    pub const BG_DARK: Color32 = Color32::from_rgb(22, 22, 28);
    pub const BG_MEDIUM: Color32 = Color32::from_rgb(32, 32, 40);
    pub const BG_LIGHT: Color32 = Color32::from_rgb(42, 42, 52);
    pub const BG_HOVER: Color32 = Color32::from_rgb(52, 52, 64);

    pub const ACCENT_PRIMARY: Color32 = Color32::from_rgb(88, 166, 255);
    pub const ACCENT_SUCCESS: Color32 = Color32::from_rgb(46, 204, 113);
    pub const ACCENT_ERROR: Color32 = Color32::from_rgb(231, 76, 60);

    pub const TEXT_PRIMARY: Color32 = Color32::from_rgb(240, 240, 245);
    pub const TEXT_MUTED: Color32 = Color32::from_rgb(150, 150, 165);

    pub const BORDER: Color32 = Color32::from_rgb(54, 54, 68);
}

/// Status-line color for a severity, mirroring the classic
/// gray/blue/green/red convention.
pub fn severity_color(severity: Severity) -> Color32 {
    match severity {
        Severity::Muted => ThemeColors::TEXT_MUTED,
        Severity::Working => ThemeColors::ACCENT_PRIMARY,
        Severity::Success => ThemeColors::ACCENT_SUCCESS,
        Severity::Error => ThemeColors::ACCENT_ERROR,
    }
}

/// Apply the theme to egui.
pub fn apply_theme(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();

    let mut visuals = Visuals::dark();

    visuals.window_fill = ThemeColors::BG_MEDIUM;
    visuals.panel_fill = ThemeColors::BG_DARK;
    visuals.faint_bg_color = ThemeColors::BG_LIGHT;
    visuals.extreme_bg_color = ThemeColors::BG_DARK;

    visuals.widgets.noninteractive.bg_fill = ThemeColors::BG_MEDIUM;
    visuals.widgets.noninteractive.fg_stroke = Stroke::new(1.0, ThemeColors::TEXT_PRIMARY);
    visuals.widgets.noninteractive.rounding = Rounding::same(6.0);

    visuals.widgets.inactive.bg_fill = ThemeColors::BG_LIGHT;
    visuals.widgets.inactive.fg_stroke = Stroke::new(1.0, ThemeColors::TEXT_PRIMARY);
    visuals.widgets.inactive.rounding = Rounding::same(6.0);

    visuals.widgets.hovered.bg_fill = ThemeColors::BG_HOVER;
    visuals.widgets.hovered.fg_stroke = Stroke::new(1.0, ThemeColors::TEXT_PRIMARY);
    visuals.widgets.hovered.rounding = Rounding::same(6.0);

    visuals.widgets.active.bg_fill = ThemeColors::ACCENT_PRIMARY;
    visuals.widgets.active.fg_stroke = Stroke::new(1.0, ThemeColors::TEXT_PRIMARY);
    visuals.widgets.active.rounding = Rounding::same(6.0);

    visuals.selection.bg_fill =
        Color32::from_rgba_unmultiplied(88, 166, 255, 77);
    visuals.selection.stroke = Stroke::new(1.0, ThemeColors::ACCENT_PRIMARY);

    visuals.window_rounding = Rounding::same(8.0);
    visuals.window_stroke = Stroke::new(1.0, ThemeColors::BORDER);

    style.visuals = visuals;

    style.spacing.item_spacing = egui::vec2(8.0, 8.0);
    style.spacing.button_padding = egui::vec2(12.0, 6.0);
    style.spacing.window_margin = egui::Margin::same(16.0);

    style.text_styles = [
        (TextStyle::Small, FontId::new(12.0, FontFamily::Proportional)),
        (TextStyle::Body, FontId::new(15.0, FontFamily::Proportional)),
        (TextStyle::Monospace, FontId::new(14.0, FontFamily::Monospace)),
        (TextStyle::Button, FontId::new(15.0, FontFamily::Proportional)),
        (TextStyle::Heading, FontId::new(20.0, FontFamily::Proportional)),
    ]
    .into();

    ctx.set_style(style);
}
