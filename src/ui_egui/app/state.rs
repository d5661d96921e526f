use crate::models::run::{HistoryEntry, RunId};
use crate::models::template::ArgumentTemplate;
use crate::services::output::OutputFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BottomTab {
    #[default]
    Runs,
    History,
}

/// Screen area of a file field, recorded each frame for drop targeting
#[derive(Debug, Clone, Copy)]
pub struct FieldDropZone {
    pub field: usize,
    pub rect: egui::Rect,
}

pub struct AppState {
    pub selected_script: Option<usize>,
    /// Log file or folder passed to every script
    pub main_path: String,
    pub custom_args: String,
    /// Message in the status bar
    pub status: String,
    /// Run shown in the log pane; the latest run when unset
    pub selected_run: Option<RunId>,
    /// Log line picked for "Paste from Log"
    pub selected_line: Option<String>,
    /// Form field that last had focus
    pub focused_field: Option<usize>,
    pub filter: OutputFilter,
    pub focus_filter_requested: bool,
    pub bottom_tab: BottomTab,
    pub history: Vec<HistoryEntry>,
    /// Templates of the selected script
    pub templates: Vec<ArgumentTemplate>,
    pub selected_template: Option<i64>,
    pub template_name: String,
    pub field_drop_zones: Vec<FieldDropZone>,
    pub script_list_rect: Option<egui::Rect>,
    pub show_about_dialog: bool,
}

impl AppState {
    pub fn new(main_path: String) -> Self {
        Self {
            selected_script: None,
            main_path,
            custom_args: String::new(),
            status: "Ready".to_string(),
            selected_run: None,
            selected_line: None,
            focused_field: None,
            filter: OutputFilter::default(),
            focus_filter_requested: false,
            bottom_tab: BottomTab::default(),
            history: Vec::new(),
            templates: Vec::new(),
            selected_template: None,
            template_name: String::new(),
            field_drop_zones: Vec::new(),
            script_list_rect: None,
            show_about_dialog: false,
        }
    }

    /// File field under `pos`, if any
    pub fn field_at(&self, pos: egui::Pos2) -> Option<usize> {
        self.field_drop_zones
            .iter()
            .find(|zone| zone.rect.contains(pos))
            .map(|zone| zone.field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::{pos2, Rect};

    #[test]
    fn test_field_at() {
        let mut state = AppState::new(String::new());
        state.field_drop_zones = vec![
            FieldDropZone {
                field: 0,
                rect: Rect::from_min_max(pos2(0.0, 0.0), pos2(100.0, 20.0)),
            },
            FieldDropZone {
                field: 3,
                rect: Rect::from_min_max(pos2(0.0, 30.0), pos2(100.0, 50.0)),
            },
        ];

        assert_eq!(state.field_at(pos2(10.0, 10.0)), Some(0));
        assert_eq!(state.field_at(pos2(10.0, 40.0)), Some(3));
        assert_eq!(state.field_at(pos2(10.0, 25.0)), None);
        assert_eq!(state.status, "Ready");
    }
}
