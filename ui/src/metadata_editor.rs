//! Dialog for editing a metadata field and the categories it applies to.

use crate::style::{self, Palette};
use crate::Message;
use api_client::{DamBackend, FieldOption};
use iced::widget::{button, column, container, row, scrollable, text, text_input, Column};
use iced::{Alignment, Command, Element, Length};
use std::sync::Arc;
use tasks::{BatchReport, FieldEdit, FieldEditorData, TaskError};

#[derive(Debug, Clone, PartialEq)]
pub enum EditorPhase {
    Loading,
    LoadFailed(String),
    Editing,
    Saving,
    /// Every call of the last batch succeeded; the dialog can close.
    Saved,
}

#[derive(Debug, Clone)]
pub enum EditorMessage {
    Loaded(Result<FieldEditorData, TaskError>),
    LabelChanged(String),
    OptionLabelChanged(usize, String),
    NewOptionChanged(String),
    AddOption,
    RemoveOption(usize),
    ToggleCategory(u64),
    TogglePrimary(u64),
    ToggleRequired(u64),
    ToggleAiEligible,
    Submit,
    Submitted(BatchReport),
}

fn editor(message: EditorMessage) -> Message {
    Message::Editor(message)
}

/// Option value derived from its label: lowercase words joined by `_`.
pub fn option_value(label: &str) -> String {
    label
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

#[derive(Debug)]
pub struct EditorState {
    field_id: u64,
    phase: EditorPhase,
    original: Option<FieldEditorData>,
    edit: Option<FieldEdit>,
    error: Option<String>,
    new_option: String,
}

impl EditorState {
    pub fn open(backend: Arc<dyn DamBackend>, field_id: u64) -> (Self, Command<Message>) {
        let state = Self {
            field_id,
            phase: EditorPhase::Loading,
            original: None,
            edit: None,
            error: None,
            new_option: String::new(),
        };
        let command = Command::perform(tasks::load_field_editor(backend, field_id), |result| {
            editor(EditorMessage::Loaded(result))
        });
        (state, command)
    }

    pub fn update(&mut self, message: EditorMessage, backend: &Arc<dyn DamBackend>) -> Command<Message> {
        match message {
            EditorMessage::Loaded(Ok(data)) => {
                self.edit = Some(data.edit());
                self.original = Some(data);
                self.phase = EditorPhase::Editing;
                Command::none()
            }
            EditorMessage::Loaded(Err(e)) => {
                tracing::warn!(field = self.field_id, error = %e, "failed to load metadata field");
                self.phase = EditorPhase::LoadFailed(e.to_string());
                Command::none()
            }
            EditorMessage::Submitted(report) => {
                match report.first_error() {
                    None => self.phase = EditorPhase::Saved,
                    Some(failure) => {
                        self.phase = EditorPhase::Editing;
                        self.error = Some(format!("{} failed: {}", failure.call, failure.message));
                    }
                }
                Command::none()
            }
            other if self.phase == EditorPhase::Editing => self.edit_form(other, backend),
            _ => Command::none(),
        }
    }

    fn edit_form(&mut self, message: EditorMessage, backend: &Arc<dyn DamBackend>) -> Command<Message> {
        let Some(edit) = self.edit.as_mut() else {
            return Command::none();
        };

        match message {
            EditorMessage::LabelChanged(label) => edit.field.label = label,
            EditorMessage::OptionLabelChanged(index, label) => {
                if let Some(option) = edit.field.options.get_mut(index) {
                    if option.id.is_none() {
                        option.value = option_value(&label);
                    }
                    option.label = label;
                }
            }
            EditorMessage::NewOptionChanged(label) => self.new_option = label,
            EditorMessage::AddOption => {
                let label = self.new_option.trim().to_string();
                if label.is_empty() {
                    return Command::none();
                }
                let value = option_value(&label);
                if edit.field.options.iter().any(|o| o.value == value) {
                    self.error = Some(format!("An option named '{}' already exists", label));
                    return Command::none();
                }
                edit.field.options.push(FieldOption { id: None, label, value });
                self.new_option.clear();
                self.error = None;
            }
            EditorMessage::RemoveOption(index) => {
                if index < edit.field.options.len() {
                    edit.field.options.remove(index);
                }
            }
            EditorMessage::ToggleCategory(id) => edit.toggle_category(id),
            EditorMessage::TogglePrimary(id) => {
                let current = edit.visibility_for(id).is_primary;
                edit.set_primary(id, !current);
            }
            EditorMessage::ToggleRequired(id) => {
                let current = edit.visibility_for(id).is_required;
                edit.set_required(id, !current);
            }
            EditorMessage::ToggleAiEligible => edit.field.is_ai_eligible = !edit.field.is_ai_eligible,
            EditorMessage::Submit => {
                let Some(original) = self.original.clone() else {
                    return Command::none();
                };
                let edited = edit.clone();
                self.phase = EditorPhase::Saving;
                self.error = None;
                return Command::perform(
                    tasks::submit_field_editor(backend.clone(), original, edited),
                    |report| editor(EditorMessage::Submitted(report)),
                );
            }
            EditorMessage::Loaded(_) | EditorMessage::Submitted(_) => {}
        }
        Command::none()
    }

    pub fn field_id(&self) -> u64 {
        self.field_id
    }

    pub fn phase(&self) -> &EditorPhase {
        &self.phase
    }

    pub fn edit(&self) -> Option<&FieldEdit> {
        self.edit.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_saved(&self) -> bool {
        self.phase == EditorPhase::Saved
    }

    pub fn view(&self) -> Element<'_, Message> {
        let title = text(format!("Metadata field #{}", self.field_id)).size(20);
        let body: Element<'_, Message> = match (&self.phase, &self.original, &self.edit) {
            (EditorPhase::Loading, _, _) => text("Loading field…").into(),
            (EditorPhase::LoadFailed(e), _, _) => column![
                text(e).style(Palette::ERROR),
                button("Close").on_press(Message::CloseFieldEditor),
            ]
            .spacing(8)
            .into(),
            (_, Some(original), Some(edit)) => self.form_view(original, edit),
            _ => text("Nothing to edit").into(),
        };
        container(column![title, body].spacing(Palette::SPACING))
            .padding(Palette::SPACING)
            .width(Length::Fixed(560.0))
            .style(style::card())
            .into()
    }

    fn form_view<'a>(&'a self, original: &'a FieldEditorData, edit: &'a FieldEdit) -> Element<'a, Message> {
        let saving = self.phase == EditorPhase::Saving;

        let mut options = Column::new().spacing(4);
        for (index, option) in edit.field.options.iter().enumerate() {
            options = options.push(
                row![
                    text_input("Option label", &option.label)
                        .on_input(move |v| editor(EditorMessage::OptionLabelChanged(index, v))),
                    button("Remove").on_press(editor(EditorMessage::RemoveOption(index))),
                ]
                .spacing(8)
                .align_items(Alignment::Center),
            );
        }
        options = options.push(
            row![
                text_input("New option", &self.new_option)
                    .on_input(|v| editor(EditorMessage::NewOptionChanged(v)))
                    .on_submit(editor(EditorMessage::AddOption)),
                button("Add").on_press(editor(EditorMessage::AddOption)),
            ]
            .spacing(8),
        );

        let mut categories = Column::new().spacing(4).push(text("Categories").size(16));
        for category in &original.categories {
            let enabled = edit.enabled.contains(&category.id);
            let mut line = row![button(text(&category.name))
                .style(style::button_toggle(enabled))
                .on_press(editor(EditorMessage::ToggleCategory(category.id)))]
            .spacing(8)
            .align_items(Alignment::Center);
            if enabled {
                let visibility = edit.visibility_for(category.id);
                line = line
                    .push(
                        button("Primary")
                            .style(style::button_toggle(visibility.is_primary))
                            .on_press(editor(EditorMessage::TogglePrimary(category.id))),
                    )
                    .push(
                        button("Required")
                            .style(style::button_toggle(visibility.is_required))
                            .on_press(editor(EditorMessage::ToggleRequired(category.id))),
                    );
            }
            categories = categories.push(line);
        }

        let mut save = button(if saving { "Saving…" } else { "Save" }).style(style::button_primary());
        if !saving {
            save = save.on_press(editor(EditorMessage::Submit));
        }

        let mut form = column![
            text_input("Label", &edit.field.label).on_input(|v| editor(EditorMessage::LabelChanged(v))),
            text(format!("{} · {}", edit.field.name, edit.field.field_type)).size(12).style(Palette::MUTED),
            text("Options").size(16),
            options,
            categories,
            button("AI suggestions")
                .style(style::button_toggle(edit.field.is_ai_eligible))
                .on_press(editor(EditorMessage::ToggleAiEligible)),
        ]
        .spacing(8);
        if let Some(e) = &self.error {
            form = form.push(text(e).style(Palette::ERROR));
        }
        form = form.push(
            row![save, button("Cancel").on_press(Message::CloseFieldEditor)].spacing(8),
        );
        scrollable(form).height(Length::Fixed(480.0)).into()
    }
}
