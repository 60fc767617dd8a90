use iced::widget::{button, column, row, text, text_input, Row};
use iced::Element;

use crate::style::{self, Palette};
use crate::{AppConfig, Message};

pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Editable copy of the settings shown in the dialog.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsForm {
    pub log_level: String,
    pub api_base_url: String,
    pub poll_interval_ms: String,
}

impl SettingsForm {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            log_level: config.log_level.clone(),
            api_base_url: config.api_base_url.clone(),
            poll_interval_ms: config.poll_interval_ms.to_string(),
        }
    }

    /// Write the form into `config`. Nothing changes when a value is invalid.
    pub fn apply(&self, config: &mut AppConfig) -> Result<(), String> {
        let poll_interval_ms = self
            .poll_interval_ms
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|ms| *ms > 0)
            .ok_or_else(|| format!("Invalid poll interval '{}'", self.poll_interval_ms))?;
        let api_base_url = self.api_base_url.trim().trim_end_matches('/').to_string();
        if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
            return Err(format!("Invalid API URL '{}'", self.api_base_url));
        }
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(format!("Unknown log level '{}'", self.log_level));
        }
        config.log_level = self.log_level.clone();
        config.api_base_url = api_base_url;
        config.poll_interval_ms = poll_interval_ms;
        Ok(())
    }
}

pub fn dialog(form: &SettingsForm) -> Element<'_, Message> {
    let levels = LOG_LEVELS.iter().fold(Row::new().spacing(4), |levels, level| {
        levels.push(
            button(*level)
                .style(style::button_toggle(form.log_level == *level))
                .on_press(Message::SettingsLogLevelChanged(level.to_string())),
        )
    });
    column![
        text("Settings").size(16),
        text("Log level").size(12),
        levels,
        text_input("API base URL", &form.api_base_url).on_input(Message::SettingsApiUrlChanged),
        text_input("Poll interval (ms)", &form.poll_interval_ms).on_input(Message::SettingsPollIntervalChanged),
        text("Log level and API URL apply on next start").size(12).style(Palette::MUTED),
        row![
            button("Save")
                .style(style::button_primary())
                .on_press(Message::SaveSettings),
            button("Cancel")
                .style(style::button_primary())
                .on_press(Message::CloseSettings),
        ]
        .spacing(10),
    ]
    .spacing(10)
    .into()
}
