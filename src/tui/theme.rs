use crate::palette::Palette;

use ratatui::{
    layout::Alignment,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders},
};

/// Styles shared by the card list, the card editor and the help panel.
pub struct Theme;

impl Theme {
    pub const KEY_FG: Color = Color::Rgb(255, 255, 255);

    pub fn label() -> Style {
        Style::default()
            .fg(Palette::ACCENT.tui())
            .add_modifier(Modifier::BOLD)
    }

    pub fn success() -> Style {
        Style::default()
            .fg(Palette::SUCCESS.tui())
            .add_modifier(Modifier::BOLD)
    }

    pub fn danger() -> Style {
        Style::default()
            .fg(Palette::WARNING.tui())
            .add_modifier(Modifier::BOLD)
    }

    pub fn muted() -> Style {
        Style::default().fg(Palette::BORDER.tui())
    }

    pub fn cloze() -> Style {
        Style::default()
            .fg(Palette::CLOZE.tui())
            .add_modifier(Modifier::BOLD)
    }

    pub fn selection() -> Style {
        Style::default().add_modifier(Modifier::REVERSED)
    }

    pub fn card_row(selected: bool) -> Style {
        if selected {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        }
    }

    pub fn backdrop<'a>() -> Block<'a> {
        Block::default()
    }

    pub fn panel<'a>(title: impl Into<String>) -> Block<'a> {
        Self::panel_with_line(Self::title_line(title))
    }

    pub fn panel_with_line<'a>(title: Line<'a>) -> Block<'a> {
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Self::muted())
            .title(title)
            .title_alignment(Alignment::Left)
    }

    pub fn title_line(title: impl Into<String>) -> Line<'static> {
        Line::from(Span::styled(format!(" {} ", title.into()), Self::label()))
    }

    pub fn label_span(text: impl Into<String>) -> Span<'static> {
        Span::styled(text.into(), Self::label())
    }

    pub fn span(text: impl Into<String>) -> Span<'static> {
        Span::raw(text.into())
    }

    pub fn key_chip(text: impl Into<String>) -> Span<'static> {
        Span::styled(
            format!(" {} ", text.into()),
            Style::default()
                .fg(Self::KEY_FG)
                .bg(Palette::ACCENT.tui())
                .add_modifier(Modifier::BOLD),
        )
    }

    pub fn bullet() -> Span<'static> {
        Self::span(" • ")
    }

    /// `(key, action)` pairs as chips separated by bullets.
    pub fn hint_line(hints: &[(&str, &str)]) -> Line<'static> {
        let mut spans = Vec::with_capacity(hints.len() * 3);
        for (idx, (key, action)) in hints.iter().enumerate() {
            if idx > 0 {
                spans.push(Self::bullet());
            }
            spans.push(Self::key_chip(*key));
            spans.push(Self::span(format!(" {action}")));
        }
        Line::from(spans)
    }
}
