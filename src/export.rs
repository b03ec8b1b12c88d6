use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::UserDirs;

use crate::card::Card;
use crate::error::GeneratorError;

pub const EXPORT_FILE_NAME: &str = "cloze_flashcards.txt";
const EXPORT_EXTENSION: &str = "txt";
const LINE_BREAK: &str = "<br>";
const ESCAPED_LINE_BREAK: &str = "&lt;br&gt;";
const AMPERSAND: &str = "&amp;";

/// Renders cards as Anki text-import records: `content\t`, one per line.
///
/// Anki reads each field as HTML. Tabs inside a card become spaces, line
/// breaks become `<br>`, and a literal `&` or `<br>` typed into a card is
/// entity-escaped so it reads back as text rather than as a break.
pub fn to_interchange(cards: &[Card]) -> Result<String, GeneratorError> {
    if cards.is_empty() {
        return Err(GeneratorError::EmptyExport);
    }

    let records: Vec<String> = cards
        .iter()
        .map(|card| format!("{}\t", escape_field(&card.content)))
        .collect();
    Ok(records.join("\n"))
}

/// Card contents from a file written by `to_interchange`. Every non-empty
/// line is one card, blank cards (a bare `\t`) included.
pub fn from_interchange(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| !line.is_empty())
        .map(|line| unescape_field(line.split('\t').next().unwrap_or_default()))
        .collect()
}

fn escape_field(content: &str) -> Cow<'_, str> {
    if !content.contains(['\t', '\n', '\r', '&']) && !content.contains(LINE_BREAK) {
        return Cow::Borrowed(content);
    }
    let escaped = content
        .replace('&', AMPERSAND)
        .replace(LINE_BREAK, ESCAPED_LINE_BREAK)
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\t', " ")
        .replace('\n', LINE_BREAK);
    Cow::Owned(escaped)
}

fn unescape_field(field: &str) -> String {
    field
        .replace(LINE_BREAK, "\n")
        .replace(ESCAPED_LINE_BREAK, LINE_BREAK)
        .replace(AMPERSAND, "&")
}

pub fn default_export_dir() -> PathBuf {
    UserDirs::new()
        .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Resolves where an export lands: directories get the fixed file name,
/// files are forced to the `.txt` extension.
pub fn export_path(target: &Path) -> PathBuf {
    if target.is_dir() {
        return target.join(EXPORT_FILE_NAME);
    }
    let mut path = target.to_path_buf();
    if path.extension().and_then(|ext| ext.to_str()) != Some(EXPORT_EXTENSION) {
        path.set_extension(EXPORT_EXTENSION);
    }
    path
}

pub fn write_export(target: &Path, cards: &[Card]) -> Result<PathBuf> {
    let payload = to_interchange(cards)?;
    let path = export_path(target);
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(&path, payload)
        .with_context(|| format!("Failed to write cards to {}", path.display()))?;
    Ok(path)
}

pub fn read_export(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read cards from {}", path.display()))?;
    Ok(from_interchange(&text))
}
