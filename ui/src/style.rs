//! Material design inspired styling for the UI.
//!
//! This module centralises all colors, spacing and basic widget styles.
//! New components should be built on top of these helpers so the
//! application keeps a consistent look.

use iced::widget::{button, container};
use iced::{theme, Background, Border, Color, Theme};

/// Material color palette
pub struct Palette;

impl Palette {
    pub const PRIMARY: Color = Color { r: 0.25, g: 0.32, b: 0.71, a: 1.0 }; // Indigo 700
    pub const ON_PRIMARY: Color = Color::WHITE;
    pub const SURFACE: Color = Color { r: 0.98, g: 0.98, b: 0.98, a: 1.0 };
    pub const ON_SURFACE: Color = Color { r: 0.1, g: 0.1, b: 0.1, a: 1.0 };
    pub const MUTED: Color = Color { r: 0.45, g: 0.45, b: 0.45, a: 1.0 };
    pub const ERROR: Color = Color { r: 0.80, g: 0.0, b: 0.0, a: 1.0 };
    pub const ERROR_SURFACE: Color = Color { r: 1.0, g: 0.9, b: 0.9, a: 1.0 };

    pub const SPACING: u16 = 16;
    pub const ICON_COLOR: Color = Self::ON_SURFACE;
    pub const ICON_SIZE: u16 = 20;
    pub const PLACEHOLDER_ICON_SIZE: u16 = 64;
}

struct PrimaryButton;

impl button::StyleSheet for PrimaryButton {
    type Style = Theme;

    fn active(&self, _style: &Self::Style) -> button::Appearance {
        button::Appearance {
            background: Some(Background::Color(Palette::PRIMARY)),
            text_color: Palette::ON_PRIMARY,
            border: Border {
                radius: 4.0.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn disabled(&self, style: &Self::Style) -> button::Appearance {
        let active = self.active(style);
        button::Appearance {
            background: Some(Background::Color(Color { a: 0.4, ..Palette::PRIMARY })),
            ..active
        }
    }
}

/// Button that shows whether its option is selected.
struct ToggleButton {
    selected: bool,
}

impl button::StyleSheet for ToggleButton {
    type Style = Theme;

    fn active(&self, _style: &Self::Style) -> button::Appearance {
        let (background, text_color) = if self.selected {
            (Palette::PRIMARY, Palette::ON_PRIMARY)
        } else {
            (Palette::SURFACE, Palette::ON_SURFACE)
        };
        button::Appearance {
            background: Some(Background::Color(background)),
            text_color,
            border: Border {
                color: Palette::PRIMARY,
                width: 1.0,
                radius: 4.0.into(),
            },
            ..Default::default()
        }
    }
}

/// Flat button used for grid tiles.
struct TileButton;

impl button::StyleSheet for TileButton {
    type Style = Theme;

    fn active(&self, _style: &Self::Style) -> button::Appearance {
        button::Appearance {
            background: Some(Background::Color(Palette::SURFACE)),
            text_color: Palette::ON_SURFACE,
            border: Border {
                color: Color { a: 0.2, ..Palette::ON_SURFACE },
                width: 1.0,
                radius: 4.0.into(),
            },
            ..Default::default()
        }
    }
}

struct Card;

impl container::StyleSheet for Card {
    type Style = Theme;

    fn appearance(&self, _style: &Self::Style) -> container::Appearance {
        container::Appearance {
            background: Some(Palette::SURFACE.into()),
            text_color: Some(Palette::ON_SURFACE),
            border: Border {
                color: Palette::PRIMARY,
                width: 1.0,
                radius: 4.0.into(),
            },
            shadow: Default::default(),
        }
    }
}

struct ErrorBanner;

impl container::StyleSheet for ErrorBanner {
    type Style = Theme;

    fn appearance(&self, _style: &Self::Style) -> container::Appearance {
        container::Appearance {
            text_color: Some(Palette::ERROR),
            background: Some(Palette::ERROR_SURFACE.into()),
            border: Border {
                color: Palette::ERROR,
                width: 1.0,
                radius: 2.0.into(),
            },
            shadow: Default::default(),
        }
    }
}

/// Style for primary action buttons.
pub fn button_primary() -> theme::Button {
    theme::Button::Custom(Box::new(PrimaryButton))
}

pub fn button_toggle(selected: bool) -> theme::Button {
    theme::Button::Custom(Box::new(ToggleButton { selected }))
}

pub fn button_tile() -> theme::Button {
    theme::Button::Custom(Box::new(TileButton))
}

/// Container style that mimics Material "cards".
pub fn card() -> theme::Container {
    theme::Container::Custom(Box::new(Card))
}

pub fn error_banner() -> theme::Container {
    theme::Container::Custom(Box::new(ErrorBanner))
}
