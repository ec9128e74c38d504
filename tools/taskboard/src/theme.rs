//! Dashboard palette.

use crate::types::MessageKind;
use ratatui::style::{Color, Modifier, Style};
use std::ffi::OsStr;

/// `NO_COLOR` asks for monochrome output when it is set to anything but the
/// empty string.
pub fn no_color_requested(value: Option<&OsStr>) -> bool {
    value.is_some_and(|value| !value.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityTier {
    High,
    Medium,
    Low,
}

impl PriorityTier {
    /// Lower numbers are more urgent.
    pub fn for_priority(priority: i64) -> Self {
        if priority <= 2 {
            Self::High
        } else if priority <= 4 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub title: Style,
    pub border: Style,
    pub text: Style,
    pub muted: Style,
    pub error: Style,
    pub success: Style,
    pub warning: Style,
    pub bar_filled: Style,
    pub bar_empty: Style,
    pub pulse_on: Style,
    pub pulse_off: Style,
    pub cursor: Style,
    pub priority_high: Style,
    pub priority_medium: Style,
    pub priority_low: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            title: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            border: Style::default().fg(Color::DarkGray),
            text: Style::default(),
            muted: Style::default().fg(Color::DarkGray),
            error: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            success: Style::default().fg(Color::Green),
            warning: Style::default().fg(Color::Yellow),
            bar_filled: Style::default().fg(Color::Green),
            bar_empty: Style::default().fg(Color::DarkGray),
            pulse_on: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            pulse_off: Style::default().fg(Color::Blue),
            cursor: Style::default().fg(Color::White),
            priority_high: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            priority_medium: Style::default().fg(Color::Yellow),
            priority_low: Style::default().fg(Color::DarkGray),
        }
    }
}

impl Theme {
    /// For `--monochrome`, `display.monochrome`, a non-empty `NO_COLOR`, and
    /// every `--once` frame.
    pub fn monochrome() -> Self {
        let plain = Style::default();
        let bold = plain.add_modifier(Modifier::BOLD);
        Self {
            title: bold,
            border: plain,
            text: plain,
            muted: plain.add_modifier(Modifier::DIM),
            error: bold,
            success: plain,
            warning: plain,
            bar_filled: plain,
            bar_empty: plain.add_modifier(Modifier::DIM),
            pulse_on: bold,
            pulse_off: plain,
            cursor: plain,
            priority_high: bold,
            priority_medium: plain,
            priority_low: plain.add_modifier(Modifier::DIM),
        }
    }

    pub fn priority(&self, tier: PriorityTier) -> Style {
        match tier {
            PriorityTier::High => self.priority_high,
            PriorityTier::Medium => self.priority_medium,
            PriorityTier::Low => self.priority_low,
        }
    }

    pub fn message(&self, kind: MessageKind) -> Style {
        match kind {
            MessageKind::Command => self.title,
            MessageKind::Prompt => self.pulse_off,
            MessageKind::System => self.muted,
            MessageKind::Info => self.text,
            MessageKind::Success => self.success,
            MessageKind::Error => self.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{no_color_requested, PriorityTier, Theme};
    use crate::types::MessageKind;
    use ratatui::style::Color;
    use std::ffi::OsStr;

    #[test]
    fn no_color_needs_a_non_empty_value() {
        assert!(!no_color_requested(None));
        assert!(!no_color_requested(Some(OsStr::new(""))));
        assert!(no_color_requested(Some(OsStr::new("1"))));
    }

    #[test]
    fn priority_tiers_split_at_two_and_four() {
        assert_eq!(PriorityTier::for_priority(-1), PriorityTier::High);
        assert_eq!(PriorityTier::for_priority(2), PriorityTier::High);
        assert_eq!(PriorityTier::for_priority(3), PriorityTier::Medium);
        assert_eq!(PriorityTier::for_priority(4), PriorityTier::Medium);
        assert_eq!(PriorityTier::for_priority(5), PriorityTier::Low);
    }

    #[test]
    fn default_theme_colours_priorities_and_errors() {
        let theme = Theme::default();
        assert_eq!(theme.priority(PriorityTier::High).fg, Some(Color::Red));
        assert_eq!(theme.message(MessageKind::Error).fg, Some(Color::Red));
        assert_eq!(theme.message(MessageKind::Success).fg, Some(Color::Green));
    }

    #[test]
    fn monochrome_theme_has_no_colours() {
        let theme = Theme::monochrome();
        for style in [theme.title, theme.error, theme.bar_filled, theme.priority_high] {
            assert_eq!(style.fg, None);
            assert_eq!(style.bg, None);
        }
    }
}
