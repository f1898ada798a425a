//! Styling helpers for terminal output.
//!
//! The [`StoryStyle`] trait applies ANSI styling via the `colored` crate to the pieces a
//! terminal presenter draws. Implementations for `&str` and `String` are provided.

use colored::{ColoredString, Colorize};

use crate::events::MessageKind;

/// Convenience trait for applying color and style to text output.
pub trait StoryStyle {
    fn condition_style(&self) -> ColoredString;
    fn choice_style(&self) -> ColoredString;
    fn health_style(&self) -> ColoredString;
    fn item_style(&self) -> ColoredString;
    fn slot_style(&self) -> ColoredString;
    fn achievement_style(&self) -> ColoredString;
    fn ending_style(&self) -> ColoredString;
    fn section_style(&self) -> ColoredString;
    fn error_style(&self) -> ColoredString;
    fn prompt_style(&self) -> ColoredString;
}

impl StoryStyle for &str {
    fn condition_style(&self) -> ColoredString {
        self.truecolor(102, 208, 250)
    }
    fn choice_style(&self) -> ColoredString {
        self.truecolor(110, 220, 110)
    }
    fn health_style(&self) -> ColoredString {
        self.bold().truecolor(230, 60, 60)
    }
    fn item_style(&self) -> ColoredString {
        self.truecolor(220, 180, 40)
    }
    fn slot_style(&self) -> ColoredString {
        self.bold().truecolor(80, 120, 230)
    }
    fn achievement_style(&self) -> ColoredString {
        self.bold().truecolor(13, 170, 60)
    }
    fn ending_style(&self) -> ColoredString {
        self.bold().truecolor(220, 40, 220)
    }
    fn section_style(&self) -> ColoredString {
        let bracketed = format!("[{self}]");
        bracketed.truecolor(75, 80, 75)
    }
    fn error_style(&self) -> ColoredString {
        self.truecolor(230, 30, 30)
    }
    fn prompt_style(&self) -> ColoredString {
        self.truecolor(180, 180, 180)
    }
}

impl StoryStyle for String {
    fn condition_style(&self) -> ColoredString {
        self.as_str().condition_style()
    }
    fn choice_style(&self) -> ColoredString {
        self.as_str().choice_style()
    }
    fn health_style(&self) -> ColoredString {
        self.as_str().health_style()
    }
    fn item_style(&self) -> ColoredString {
        self.as_str().item_style()
    }
    fn slot_style(&self) -> ColoredString {
        self.as_str().slot_style()
    }
    fn achievement_style(&self) -> ColoredString {
        self.as_str().achievement_style()
    }
    fn ending_style(&self) -> ColoredString {
        self.as_str().ending_style()
    }
    fn section_style(&self) -> ColoredString {
        self.as_str().section_style()
    }
    fn error_style(&self) -> ColoredString {
        self.as_str().error_style()
    }
    fn prompt_style(&self) -> ColoredString {
        self.as_str().prompt_style()
    }
}

/// Style an event-sink message by its kind.
pub fn message_style(text: &str, kind: MessageKind) -> ColoredString {
    match kind {
        MessageKind::Info => text.normal(),
        MessageKind::Important => text.bold().truecolor(230, 230, 30),
        MessageKind::Sound => text.italic().truecolor(150, 230, 30),
        MessageKind::Animation => text.italic().dimmed(),
        MessageKind::Error => text.error_style(),
    }
}
