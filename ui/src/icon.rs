use crate::style::Palette;
use iced::widget::text;
use iced::{Color, Element};
use preview::FileKind;

pub fn glyph(kind: FileKind) -> &'static str {
    match kind {
        FileKind::Image => "🖼",
        FileKind::Pdf => "📕",
        FileKind::Video => "🎞",
        FileKind::Audio => "🎵",
        FileKind::Document => "📄",
        FileKind::Spreadsheet => "📊",
        FileKind::Presentation => "📽",
        FileKind::Archive => "🗜",
        FileKind::Other => "📁",
    }
}

/// File-type icon drawn where no thumbnail can be shown.
#[derive(Debug, Clone, Copy)]
pub struct Icon {
    kind: FileKind,
    size: u16,
    color: Color,
}

impl Icon {
    pub fn new(kind: FileKind) -> Self {
        Self {
            kind,
            size: Palette::ICON_SIZE,
            color: Palette::ICON_COLOR,
        }
    }

    pub fn size(mut self, size: u16) -> Self {
        self.size = size;
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }
}

impl<'a, Message: 'a> From<Icon> for Element<'a, Message> {
    fn from(icon: Icon) -> Self {
        text(glyph(icon.kind)).size(icon.size).style(icon.color).into()
    }
}
