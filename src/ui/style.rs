use iced::theme::Palette;
use iced::widget::container;
use iced::{color, Background, Border, Color, Theme};

// Purple/pink palette
pub const BG: Color = color!(0x0a0a0f);
pub const SURFACE: Color = color!(0x111118);
pub const BORDER: Color = color!(0x2a2535);
pub const ACCENT_A: Color = color!(0xc9a8ff);
pub const ACCENT_B: Color = color!(0xf0a8d8);
pub const TEXT: Color = color!(0xe8e0f0);
pub const TEXT_DIM: Color = color!(0x8a8099);
pub const ERROR: Color = color!(0xf08090);
pub const SUCCESS: Color = color!(0x90f0c0);

/// Colour of the status line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tone {
    #[default]
    Dim,
    Error,
    Success,
}

impl Tone {
    pub fn color(self) -> Color {
        match self {
            Tone::Dim => TEXT_DIM,
            Tone::Error => ERROR,
            Tone::Success => SUCCESS,
        }
    }
}

/// Message shown under the controls
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Status {
    pub text: String,
    pub tone: Tone,
}

impl Status {
    pub fn dim(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: Tone::Dim,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: Tone::Error,
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: Tone::Success,
        }
    }
}

pub fn theme() -> Theme {
    Theme::custom(
        "Mirror Mirror".to_string(),
        Palette {
            background: BG,
            text: TEXT,
            primary: ACCENT_A,
            success: SUCCESS,
            danger: ERROR,
        },
    )
}

/// Bordered frame around the source and result images
pub fn image_frame(_theme: &Theme) -> container::Style {
    container::Style {
        background: Some(Background::Color(SURFACE)),
        border: Border {
            color: BORDER,
            width: 1.0,
            radius: 4.0.into(),
        },
        ..container::Style::default()
    }
}

/// Dark overlay holding the activity log
pub fn log_panel(_theme: &Theme) -> container::Style {
    container::Style {
        text_color: Some(ACCENT_A),
        background: Some(Background::Color(BG)),
        ..container::Style::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_tones() {
        assert_eq!(Status::error("x").tone.color(), ERROR);
        assert_eq!(Status::success("x").tone.color(), SUCCESS);
        assert_eq!(Status::default().tone, Tone::Dim);
    }
}
