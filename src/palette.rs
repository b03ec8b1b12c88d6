use std::fmt;

use ratatui::style::Color;

/// One color, usable both in the TUI and as an ANSI escape on stdout.
#[derive(Clone, Copy, Debug)]
pub struct PaletteColor {
    tui: Color,
    ansi: &'static str,
}

impl PaletteColor {
    pub const fn new(tui: Color, ansi: &'static str) -> Self {
        Self { tui, ansi }
    }

    pub const fn tui(self) -> Color {
        self.tui
    }

    pub const fn ansi(self) -> &'static str {
        self.ansi
    }
}

pub struct Palette;

impl Palette {
    pub const RESET: &'static str = "\x1b[0m";
    pub const DIM: &'static str = "\x1b[2m";

    pub const ACCENT: PaletteColor = PaletteColor::new(Color::Blue, "\x1b[34m");
    /// Cloze markers in the editor and pipeline progress on the console.
    pub const CLOZE: PaletteColor = PaletteColor::new(Color::Cyan, "\x1b[36m");
    pub const SUCCESS: PaletteColor = PaletteColor::new(Color::Green, "\x1b[32m");
    pub const WARNING: PaletteColor = PaletteColor::new(Color::Yellow, "\x1b[33m");
    pub const BORDER: PaletteColor = PaletteColor::new(Color::Gray, "\x1b[90m");

    pub fn paint(color: PaletteColor, value: impl fmt::Display) -> String {
        format!("{}{}{}", color.ansi(), value, Self::RESET)
    }

    pub fn dim(value: impl fmt::Display) -> String {
        format!("{}{}{}", Self::DIM, value, Self::RESET)
    }

    pub fn progress(value: impl fmt::Display) -> String {
        Self::paint(Self::CLOZE, value)
    }

    pub fn success(value: impl fmt::Display) -> String {
        Self::paint(Self::SUCCESS, value)
    }

    pub fn warning(value: impl fmt::Display) -> String {
        Self::paint(Self::WARNING, value)
    }

    pub fn path(value: impl fmt::Display) -> String {
        Self::paint(Self::ACCENT, value)
    }
}
