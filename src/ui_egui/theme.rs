//! Theme module for the egui runner
//!
//! Defines the RunnerTheme structure: window colors plus the colors used to
//! highlight script output.

use egui::Color32;

use crate::services::output::{LineKind, Stream};

/// Colors used across the application
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerTheme {
    /// Whether this is a dark theme (affects base egui::Visuals)
    pub is_dark: bool,

    /// Application background color
    pub app_background: Color32,

    /// Background of the log pane
    pub log_background: Color32,

    /// Widget background
    pub widget_background: Color32,

    /// Hovered/active widget background
    pub widget_highlight: Color32,

    /// Primary text color
    pub text_primary: Color32,

    /// Secondary text color (hints, timestamps)
    pub text_secondary: Color32,

    /// Accent for the progress bar and drop targets
    pub accent: Color32,

    pub log_error: Color32,
    pub log_traceback: Color32,
    pub log_warning: Color32,
    pub log_progress: Color32,
    /// Plain lines that arrived on stderr
    pub log_stderr: Color32,
}

impl RunnerTheme {
    /// Create the default Light theme
    pub fn light() -> Self {
        Self {
            is_dark: false,
            app_background: Color32::from_rgb(245, 245, 245),
            log_background: Color32::from_rgb(255, 255, 255),
            widget_background: Color32::from_rgb(255, 255, 255),
            widget_highlight: Color32::from_rgb(230, 240, 255),
            text_primary: Color32::from_rgb(40, 40, 40),
            text_secondary: Color32::from_rgb(100, 100, 100),
            accent: Color32::from_rgb(76, 139, 245),
            log_error: Color32::from_rgb(190, 30, 30),
            log_traceback: Color32::from_rgb(160, 50, 120),
            log_warning: Color32::from_rgb(170, 110, 0),
            log_progress: Color32::from_rgb(40, 120, 60),
            log_stderr: Color32::from_rgb(120, 70, 70),
        }
    }

    /// Create the default Dark theme
    pub fn dark() -> Self {
        Self {
            is_dark: true,
            app_background: Color32::from_rgb(30, 30, 30),
            log_background: Color32::from_rgb(22, 22, 22),
            widget_background: Color32::from_rgb(45, 45, 45),
            widget_highlight: Color32::from_rgb(50, 60, 80),
            text_primary: Color32::from_rgb(240, 240, 240),
            text_secondary: Color32::from_rgb(170, 170, 170),
            accent: Color32::from_rgb(100, 150, 255),
            log_error: Color32::from_rgb(255, 110, 110),
            log_traceback: Color32::from_rgb(230, 130, 200),
            log_warning: Color32::from_rgb(255, 200, 80),
            log_progress: Color32::from_rgb(110, 210, 130),
            log_stderr: Color32::from_rgb(220, 170, 170),
        }
    }

    pub fn for_dark_mode(dark: bool) -> Self {
        if dark {
            Self::dark()
        } else {
            Self::light()
        }
    }

    /// Text color of a log line
    pub fn line_color(&self, kind: LineKind, stream: Stream) -> Color32 {
        match kind {
            LineKind::Error => self.log_error,
            LineKind::TracebackHeader | LineKind::Traceback => self.log_traceback,
            LineKind::Warning => self.log_warning,
            LineKind::Progress(_) => self.log_progress,
            LineKind::Normal if stream == Stream::Stderr => self.log_stderr,
            LineKind::Normal => self.text_primary,
        }
    }

    /// Icon shown on the theme toggle; it names the theme you switch to
    pub fn toggle_icon(&self) -> &'static str {
        if self.is_dark {
            "☀"
        } else {
            "🌙"
        }
    }

    /// Apply this theme to an egui context
    pub fn apply_to_context(&self, ctx: &egui::Context) {
        let mut visuals = if self.is_dark {
            egui::Visuals::dark()
        } else {
            egui::Visuals::light()
        };

        visuals.window_fill = self.app_background;
        visuals.panel_fill = self.app_background;
        visuals.extreme_bg_color = self.log_background;

        visuals.widgets.inactive.bg_fill = self.widget_background;
        visuals.widgets.hovered.bg_fill = self.widget_highlight;
        visuals.widgets.active.bg_fill = self.widget_highlight;
        visuals.selection.bg_fill = self.accent.gamma_multiply(0.5);

        visuals.override_text_color = Some(self.text_primary);

        ctx.set_visuals(visuals);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_light_theme() {
        let theme = RunnerTheme::light();
        assert!(!theme.is_dark);
        assert_eq!(theme.app_background, Color32::from_rgb(245, 245, 245));
        assert_eq!(theme.toggle_icon(), "🌙");
    }

    #[test]
    fn test_dark_theme() {
        let theme = RunnerTheme::for_dark_mode(true);
        assert!(theme.is_dark);
        assert_eq!(theme.app_background, Color32::from_rgb(30, 30, 30));
    }

    #[test]
    fn test_line_colors() {
        let theme = RunnerTheme::light();
        assert_eq!(theme.line_color(LineKind::Error, Stream::Stdout), theme.log_error);
        assert_eq!(
            theme.line_color(LineKind::Traceback, Stream::Stderr),
            theme.log_traceback
        );
        assert_eq!(theme.line_color(LineKind::Normal, Stream::Stderr), theme.log_stderr);
        assert_eq!(theme.line_color(LineKind::Normal, Stream::Stdout), theme.text_primary);
    }
}
