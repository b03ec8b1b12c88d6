use std::mem;
use std::ops::Range;

use ratatui::{
    style::Style,
    text::{Line, Span, Text},
};

use crate::cloze::{Selection, markers};

use super::Theme;

/// Card text with cloze markers colored and the selection reversed.
pub fn highlight_card(content: &str, selection: Option<Selection>) -> Text<'static> {
    let marker_ranges: Vec<Range<usize>> = markers(content)
        .into_iter()
        .map(|marker| marker.range)
        .collect();

    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut run = String::new();
    let mut run_style = Style::default();

    for (char_idx, (byte_idx, ch)) in content.char_indices().enumerate() {
        if ch == '\n' {
            if !run.is_empty() {
                spans.push(Span::styled(mem::take(&mut run), run_style));
            }
            lines.push(Line::from(mem::take(&mut spans)));
            continue;
        }

        let mut style = Style::default();
        if marker_ranges.iter().any(|range| range.contains(&byte_idx)) {
            style = Theme::cloze();
        }
        if let Some(sel) = selection
            && (sel.start..sel.end).contains(&char_idx)
        {
            style = style.patch(Theme::selection());
        }

        if style != run_style && !run.is_empty() {
            spans.push(Span::styled(mem::take(&mut run), run_style));
        }
        run_style = style;
        run.push(ch);
    }

    if !run.is_empty() {
        spans.push(Span::styled(run, run_style));
    }
    lines.push(Line::from(spans));
    Text::from(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flatten(text: &Text<'_>) -> Vec<Vec<(String, Style)>> {
        text.lines
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|span| (span.content.to_string(), span.style))
                    .collect()
            })
            .collect()
    }

    #[test]
    fn markers_get_their_own_span() {
        let text = highlight_card("a {{c1::x}} b", None);
        let lines = flatten(&text);
        assert_eq!(
            lines,
            vec![vec![
                ("a ".to_string(), Style::default()),
                ("{{c1::x}}".to_string(), Theme::cloze()),
                (" b".to_string(), Style::default()),
            ]]
        );
    }

    #[test]
    fn selection_is_reversed_and_lines_split() {
        let text = highlight_card("ab\ncd", Some(Selection::new(1, 4)));
        let lines = flatten(&text);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0][1], ("b".to_string(), Theme::selection()));
        assert_eq!(lines[1][0], ("c".to_string(), Theme::selection()));
        assert_eq!(lines[1][1], ("d".to_string(), Style::default()));
    }

    #[test]
    fn empty_card_renders_one_blank_line() {
        let text = highlight_card("", None);
        assert_eq!(text.lines.len(), 1);
        assert!(text.lines[0].spans.is_empty());
    }
}
