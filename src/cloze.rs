use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::GeneratorError;

static OPEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{c(\d+)::").unwrap());
static MARKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{\{c(\d+)::(.+?)\}\}").unwrap());

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClozeMarker {
    pub number: u32,
    /// Byte range of the whole `{{cN::...}}` marker.
    pub range: Range<usize>,
    pub text: String,
}

/// Highest cloze number opened in `text`, or 0 when there is none.
pub fn current_max(text: &str) -> u32 {
    OPEN_RE
        .captures_iter(text)
        .filter_map(|caps| caps[1].parse::<u32>().ok())
        .max()
        .unwrap_or(0)
}

/// Complete markers in order of appearance. Markers numbered 0 are skipped.
pub fn markers(text: &str) -> Vec<ClozeMarker> {
    MARKER_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let number = caps[1].parse::<u32>().ok().filter(|n| *n > 0)?;
            let whole = caps.get(0)?;
            Some(ClozeMarker {
                number,
                range: whole.range(),
                text: caps[2].to_string(),
            })
        })
        .collect()
}

pub fn has_well_formed_marker(text: &str) -> bool {
    !markers(text).is_empty()
}

pub fn format_marker(number: u32, text: &str) -> String {
    format!("{{{{c{number}::{text}}}}}")
}

/// Caret/selection in character offsets. `start == end` is a bare caret.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn caret(at: usize) -> Self {
        Self { start: at, end: at }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    fn normalized(self, len: usize) -> Self {
        let start = self.start.min(self.end).min(len);
        let end = self.start.max(self.end).min(len);
        Self { start, end }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClozeInsertion {
    pub content: String,
    pub caret: usize,
    pub inserted: bool,
}

/// Wraps the selected span of `content` in a `{{cN::...}}` marker.
///
/// An empty selection leaves the content untouched. Otherwise the caret
/// collapses right after the inserted marker.
pub fn wrap_selection(content: &str, selection: Selection, number: u32) -> ClozeInsertion {
    let len = content.chars().count();
    let sel = selection.normalized(len);
    if sel.is_empty() {
        return ClozeInsertion {
            content: content.to_string(),
            caret: sel.end,
            inserted: false,
        };
    }

    let start = char_to_byte_index(content, sel.start);
    let end = char_to_byte_index(content, sel.end);
    let marker = format_marker(number, &content[start..end]);

    let mut out = String::with_capacity(content.len() + marker.len() - (end - start));
    out.push_str(&content[..start]);
    out.push_str(&marker);
    out.push_str(&content[end..]);

    ClozeInsertion {
        content: out,
        caret: sel.start + marker.chars().count(),
        inserted: true,
    }
}

/// Running maximum behind the "new cloze" and "same cloze" actions.
///
/// The number is always recomputed from the content first, so edits made
/// outside the tracker (typing a marker by hand) are honored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClozeTracker {
    highest: u32,
}

impl ClozeTracker {
    pub fn new(content: &str) -> Self {
        Self {
            highest: current_max(content),
        }
    }

    pub fn highest(&self) -> u32 {
        self.highest
    }

    /// Fails with `ClozeLimit` when the content already holds `u32::MAX`.
    pub fn insert_new(
        &mut self,
        content: &str,
        selection: Selection,
    ) -> Result<ClozeInsertion, GeneratorError> {
        let number = current_max(content)
            .checked_add(1)
            .ok_or(GeneratorError::ClozeLimit)?;
        let insertion = wrap_selection(content, selection, number);
        if insertion.inserted {
            self.highest = number;
        }
        Ok(insertion)
    }

    pub fn insert_same(&self, content: &str, selection: Selection) -> ClozeInsertion {
        let number = current_max(content).max(1);
        wrap_selection(content, selection, number)
    }
}

fn char_to_byte_index(line: &str, column: usize) -> usize {
    line.char_indices()
        .nth(column)
        .map(|(idx, _)| idx)
        .unwrap_or(line.len())
}
