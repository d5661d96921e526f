use egui::{RichText, TextEdit};

use super::state::FieldDropZone;
use super::RunnerApp;
use crate::models::field::FieldValue;
use crate::models::form::FieldBinding;
use crate::services::command::split_custom_args;

/// What a field widget asked for during this frame
#[derive(Default)]
struct FieldEvents {
    focused: Option<usize>,
    browse: Option<usize>,
    drop_zones: Vec<FieldDropZone>,
}

impl RunnerApp {
    pub(super) fn render_main_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let form_height = (ui.available_height() * 0.45).max(140.0);
            egui::ScrollArea::vertical()
                .id_source("parameters_scroll")
                .max_height(form_height)
                .auto_shrink([false, true])
                .show(ui, |ui| {
                    self.render_parameters(ui);
                });
            ui.separator();
            self.render_log_panel(ui);
        });
    }

    fn render_parameters(&mut self, ui: &mut egui::Ui) {
        let Some(script_name) = self.selected_script().map(|s| s.name.clone()) else {
            self.state.field_drop_zones.clear();
            ui.add_space(20.0);
            ui.vertical_centered(|ui| {
                ui.label(RichText::new("Select a script to see its parameters").italics());
            });
            return;
        };

        ui.horizontal(|ui| {
            ui.heading("Parameters");
            ui.label(RichText::new(&script_name).color(self.active_theme.text_secondary));
        });
        self.render_template_bar(ui);
        ui.add_space(4.0);

        if self.form.is_empty() {
            ui.label(RichText::new("This script takes no parameters.").italics());
            self.state.field_drop_zones.clear();
        } else {
            self.render_form_fields(ui);
        }

        ui.add_space(6.0);
        self.render_custom_args(ui);
        self.render_command_preview(ui);
    }

    fn render_form_fields(&mut self, ui: &mut egui::Ui) {
        let focused_before = self.state.focused_field;
        let accent = self.active_theme.accent;
        let mut events = FieldEvents::default();

        egui::Grid::new("parameter_form")
            .num_columns(2)
            .spacing([12.0, 6.0])
            .show(ui, |ui| {
                for (index, binding) in self.form.bindings_mut().iter_mut().enumerate() {
                    let mut label = RichText::new(binding.schema.form_label());
                    if focused_before == Some(index) {
                        label = label.color(accent);
                    }
                    let label_response = ui.label(label);
                    if !binding.schema.key.is_empty() {
                        label_response.on_hover_text(binding.schema.key.as_str());
                    }

                    let response = field_widget(ui, index, binding, &mut events);
                    if response.gained_focus() || response.clicked() || response.changed() {
                        events.focused = Some(index);
                    }
                    ui.end_row();
                }
            });

        if let Some(index) = events.focused {
            self.state.focused_field = Some(index);
        }
        self.state.field_drop_zones = events.drop_zones;
        if let Some(index) = events.browse {
            self.state.focused_field = Some(index);
            self.browse_field(index);
        }
    }

    fn render_template_bar(&mut self, ui: &mut egui::Ui) {
        let mut chosen = None;

        ui.horizontal(|ui| {
            ui.label("Template:");
            let selected_name = self
                .state
                .selected_template
                .and_then(|id| self.state.templates.iter().find(|t| t.id == Some(id)))
                .map(|t| t.name.clone())
                .unwrap_or_else(|| "(none)".to_string());

            egui::ComboBox::from_id_source("template_select")
                .width(160.0)
                .selected_text(selected_name)
                .show_ui(ui, |ui| {
                    if self.state.templates.is_empty() {
                        ui.label(RichText::new("No saved templates").italics());
                    }
                    for template in &self.state.templates {
                        let selected = template.id.is_some() && self.state.selected_template == template.id;
                        if ui.selectable_label(selected, template.name.as_str()).clicked() {
                            chosen = template.id;
                        }
                    }
                });

            ui.add(
                TextEdit::singleline(&mut self.state.template_name)
                    .hint_text("Template name")
                    .desired_width(140.0),
            );
            if ui.button("💾 Save").on_hover_text("Save the current values").clicked() {
                self.save_template();
            }
            if ui
                .add_enabled(
                    self.state.selected_template.is_some(),
                    egui::Button::new("🗑 Delete"),
                )
                .clicked()
            {
                self.request_delete_template();
            }
        });

        if let Some(id) = chosen {
            self.apply_template(id);
        }
    }

    fn render_custom_args(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Custom args:");
            ui.add(
                TextEdit::singleline(&mut self.state.custom_args)
                    .hint_text("--verbose --limit 10")
                    .font(egui::TextStyle::Monospace)
                    .desired_width(f32::INFINITY),
            );
        });
        if let Err(e) = split_custom_args(&self.state.custom_args) {
            ui.label(RichText::new(e.to_string()).small().color(self.active_theme.log_error));
        }
    }

    fn render_command_preview(&mut self, ui: &mut egui::Ui) {
        let Some(command) = self.preview_command() else {
            return;
        };
        let text = command.preview();

        ui.horizontal(|ui| {
            ui.label("Command:");
            if ui.small_button("📋").on_hover_text("Copy command").clicked() {
                ui.output_mut(|o| o.copied_text = text.clone());
                self.toast_manager.info("Command copied");
            }
            // A read-only editor keeps the command selectable
            let mut shown = text.as_str();
            ui.add(
                TextEdit::multiline(&mut shown)
                    .font(egui::TextStyle::Monospace)
                    .desired_rows(1)
                    .desired_width(f32::INFINITY),
            );
        });
    }
}

/// Input widget for one parameter; file fields record their drop zone
fn field_widget(
    ui: &mut egui::Ui,
    index: usize,
    binding: &mut FieldBinding,
    events: &mut FieldEvents,
) -> egui::Response {
    let FieldBinding { schema, value } = binding;
    let hint = schema.placeholder.clone().unwrap_or_default();

    match value {
        FieldValue::Text(text) => ui.add(
            TextEdit::singleline(text)
                .hint_text(hint)
                .desired_width(f32::INFINITY),
        ),
        FieldValue::Int(number) => {
            let (min, max) = schema.int_bounds();
            ui.add(
                egui::DragValue::new(number)
                    .range(min..=max.max(min))
                    .speed(schema.step_or_default()),
            )
        }
        FieldValue::Float(number) => {
            let (min, max) = schema.float_bounds();
            ui.add(
                egui::DragValue::new(number)
                    .range(min..=max.max(min))
                    .speed(schema.step_or_default())
                    .max_decimals(6),
            )
        }
        FieldValue::Select(selected) => {
            egui::ComboBox::from_id_source(("field_select", index))
                .width(180.0)
                .selected_text(selected.as_str())
                .show_ui(ui, |ui| {
                    for option in &schema.options {
                        ui.selectable_value(selected, option.clone(), option.as_str());
                    }
                })
                .response
        }
        FieldValue::Bool(checked) => ui.checkbox(checked, ""),
        FieldValue::Path(path) => {
            let row = ui.horizontal(|ui| {
                let width = (ui.available_width() - 90.0).max(120.0);
                let edit = ui.add(TextEdit::singleline(path).hint_text(hint).desired_width(width));
                if ui.button("Browse...").clicked() {
                    events.browse = Some(index);
                }
                edit
            });
            events.drop_zones.push(FieldDropZone {
                field: index,
                rect: row.response.rect,
            });
            row.inner
        }
    }
}
