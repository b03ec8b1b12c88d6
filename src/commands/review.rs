use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::{
    event::{
        self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
};
use tokio::sync::mpsc;
use tokio::task::JoinError;

use crate::card::CardId;
use crate::cloze::{ClozeTracker, current_max};
use crate::collection::CardCollection;
use crate::error::GeneratorError;
use crate::export::write_export;
use crate::llm::{Credential, OpenAiCompletion};
use crate::qbreader::{QbReaderClient, QueryParams};
use crate::submit::{Stage, SubmitGate, apply_response, fetch_response};
use crate::tui::{Editor, Theme, highlight_card};
use crate::utils::pluralize;

const FLASH_SECS: f64 = 2.0;
const PREVIEW_CHARS: usize = 80;

/// Everything needed to run the query again from inside the editor.
#[derive(Clone)]
pub struct Resubmit {
    pub database: Arc<QbReaderClient>,
    pub completion: Arc<OpenAiCompletion>,
    pub params: QueryParams,
    pub credential: Option<Credential>,
}

enum SubmitEvent {
    Stage(Stage),
    Finished(Result<String, GeneratorError>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Continue,
    Submit,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusKind {
    Info,
    Success,
    Error,
}

struct Status {
    message: String,
    kind: StatusKind,
    at: Instant,
}

impl Status {
    /// Errors stay until replaced; other messages flash.
    fn visible(&self) -> bool {
        self.kind == StatusKind::Error || self.at.elapsed().as_secs_f64() < FLASH_SECS
    }
}

struct ReviewState {
    collection: CardCollection,
    selected: Option<CardId>,
    editor: Editor,
    tracker: ClozeTracker,
    export_target: PathBuf,
    status: Option<Status>,
    gate: SubmitGate,
    dirty: bool,
    pending_clear: bool,
    pending_quit: bool,
}

impl ReviewState {
    fn new(collection: CardCollection, export_target: PathBuf) -> Self {
        let mut state = Self {
            collection,
            selected: None,
            editor: Editor::new(),
            tracker: ClozeTracker::default(),
            export_target,
            status: None,
            gate: SubmitGate::default(),
            dirty: false,
            pending_clear: false,
            pending_quit: false,
        };
        state.select_index(0);
        state
    }

    fn selected_index(&self) -> Option<usize> {
        self.selected.and_then(|id| self.collection.position(id))
    }

    /// Loads the card at `idx` (clamped) into the editor. The editor copy is
    /// always rebuilt from the collection, never the other way around.
    fn select_index(&mut self, idx: usize) {
        let cards = self.collection.cards();
        let Some(card) = cards.get(idx.min(cards.len().saturating_sub(1))) else {
            self.selected = None;
            self.editor = Editor::new();
            self.tracker = ClozeTracker::default();
            return;
        };
        self.selected = Some(card.id);
        self.editor = Editor::from_content(&card.content);
        self.tracker = ClozeTracker::new(&card.content);
    }

    fn select_next(&mut self) {
        if let Some(idx) = self.selected_index() {
            self.select_index(idx + 1);
        }
    }

    fn select_prev(&mut self) {
        if let Some(idx) = self.selected_index() {
            self.select_index(idx.saturating_sub(1));
        }
    }

    fn set_status(&mut self, kind: StatusKind, message: impl Into<String>) {
        self.status = Some(Status {
            message: message.into(),
            kind,
            at: Instant::now(),
        });
    }

    fn report(&mut self, err: &GeneratorError) {
        self.set_status(StatusKind::Error, err.to_string());
    }

    /// Writes the editor buffer back into the collection.
    fn commit_editor(&mut self) {
        let Some(id) = self.selected else {
            return;
        };
        let content = self.editor.content();
        if self
            .collection
            .get(id)
            .is_some_and(|card| card.content == content)
        {
            return;
        }
        match self.collection.replace_content(id, content) {
            Ok(updated) => {
                self.collection = updated;
                self.dirty = true;
            }
            Err(err) => {
                self.report(&err);
                self.select_index(0);
            }
        }
    }

    fn new_cloze(&mut self) {
        if self.selected.is_none() {
            return;
        }
        let clozed = self.editor.selected_text();
        let insertion = match self
            .tracker
            .insert_new(&self.editor.content(), self.editor.selection())
        {
            Ok(insertion) => insertion,
            Err(err) => {
                self.report(&err);
                return;
            }
        };
        if self.finish_cloze(insertion.inserted, insertion.content, insertion.caret) {
            let message = format!("'{clozed}' is c{}.", self.tracker.highest());
            self.set_status(StatusKind::Info, message);
        }
    }

    fn same_cloze(&mut self) {
        if self.selected.is_none() {
            return;
        }
        let insertion = self
            .tracker
            .insert_same(&self.editor.content(), self.editor.selection());
        self.finish_cloze(insertion.inserted, insertion.content, insertion.caret);
    }

    fn finish_cloze(&mut self, inserted: bool, content: String, caret: usize) -> bool {
        if !inserted {
            self.set_status(StatusKind::Info, "Select some text first (Shift+arrows).");
            return false;
        }
        self.editor.set_content(&content, caret);
        self.commit_editor();
        true
    }

    fn add_blank(&mut self) {
        self.collection = self.collection.insert_one();
        self.dirty = true;
        self.select_index(0);
    }

    fn delete_selected(&mut self) {
        let (Some(id), Some(idx)) = (self.selected, self.selected_index()) else {
            return;
        };
        self.collection = self.collection.remove_one(id);
        self.dirty = true;
        self.select_index(idx);
        self.set_status(StatusKind::Info, format!("Deleted card {id}."));
    }

    fn request_clear(&mut self) {
        if !self.pending_clear {
            self.pending_clear = true;
            self.set_status(
                StatusKind::Info,
                "Press Ctrl+X again to delete every card.",
            );
            return;
        }
        self.pending_clear = false;
        self.collection = self.collection.clear();
        self.dirty = true;
        self.select_index(0);
        self.set_status(StatusKind::Info, "All cards deleted.");
    }

    fn export(&mut self) {
        match write_export(&self.export_target, self.collection.cards()) {
            Ok(path) => {
                self.dirty = false;
                let message = format!(
                    "Exported {} to {}",
                    pluralize("card", self.collection.len()),
                    path.display()
                );
                self.set_status(StatusKind::Success, message);
            }
            Err(err) => {
                let message = match err.downcast_ref::<GeneratorError>() {
                    Some(known) => known.to_string(),
                    None => GeneratorError::upstream(&err).to_string(),
                };
                self.set_status(StatusKind::Error, message);
            }
        }
    }

    fn begin_submit(&mut self) -> bool {
        match self.gate.begin() {
            Ok(()) => true,
            Err(err) => {
                self.report(&err);
                false
            }
        }
    }

    fn finish_submit(&mut self, result: Result<String, GeneratorError>) {
        self.gate.finish();
        let applied = result.and_then(|raw| apply_response(&raw, &self.collection));
        match applied {
            Ok(applied) => {
                self.collection = applied.collection;
                self.dirty = true;
                self.select_index(0);
                let mut message = format!("Added {}.", pluralize("card", applied.added));
                if applied.rejected > 0 {
                    message.push_str(&format!(
                        " Skipped {}.",
                        pluralize("malformed line", applied.rejected)
                    ));
                }
                self.set_status(StatusKind::Success, message);
            }
            Err(err) => self.report(&err),
        }
    }

    fn handle_key(&mut self, key: KeyEvent, can_submit: bool) -> Action {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);

        let quitting = key.code == KeyCode::Esc || (ctrl && key.code == KeyCode::Char('c'));
        if quitting {
            if self.dirty && !self.collection.is_empty() && !self.pending_quit {
                self.pending_quit = true;
                self.set_status(
                    StatusKind::Info,
                    "Cards are not exported yet. Press Esc again to quit, Ctrl+S to export.",
                );
                return Action::Continue;
            }
            return Action::Quit;
        }
        self.pending_quit = false;

        let clearing = ctrl && key.code == KeyCode::Char('x');
        if !clearing {
            self.pending_clear = false;
        }

        if ctrl {
            match key.code {
                KeyCode::Char('n') => self.new_cloze(),
                KeyCode::Char('k') => self.same_cloze(),
                KeyCode::Char('a') => self.add_blank(),
                KeyCode::Char('d') => self.delete_selected(),
                KeyCode::Char('x') => self.request_clear(),
                KeyCode::Char('s') => self.export(),
                KeyCode::Char('g') if can_submit => {
                    if self.begin_submit() {
                        return Action::Submit;
                    }
                }
                _ => {}
            }
            return Action::Continue;
        }

        match key.code {
            KeyCode::Tab => self.select_next(),
            KeyCode::BackTab => self.select_prev(),
            KeyCode::Left => self.editor.move_left(shift),
            KeyCode::Right => self.editor.move_right(shift),
            KeyCode::Up => self.editor.move_up(shift),
            KeyCode::Down => self.editor.move_down(shift),
            KeyCode::Home => self.editor.move_home(shift),
            KeyCode::End => self.editor.move_end(shift),
            _ if self.selected.is_none() => {}
            KeyCode::Char(c) => {
                self.editor.insert_char(c);
                self.commit_editor();
            }
            KeyCode::Enter => {
                self.editor.insert_newline();
                self.commit_editor();
            }
            KeyCode::Backspace => {
                self.editor.backspace();
                self.commit_editor();
            }
            KeyCode::Delete => {
                self.editor.delete();
                self.commit_editor();
            }
            _ => {}
        }
        Action::Continue
    }
}

pub async fn run(
    collection: CardCollection,
    export_target: PathBuf,
    resubmit: Option<Resubmit>,
    notice: Option<GeneratorError>,
) -> Result<CardCollection> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        PushKeyboardEnhancementFlags(
            KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES
                | KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
        )
    )
    .context("failed to configure terminal")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to start terminal")?;
    terminal.show_cursor()?;

    let mut state = ReviewState::new(collection, export_target);
    if let Some(err) = notice {
        state.report(&err);
    }
    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<SubmitEvent>();

    let loop_result: Result<()> = async {
        loop {
            while let Ok(submit_event) = events_rx.try_recv() {
                match submit_event {
                    SubmitEvent::Stage(stage) => state.set_status(StatusKind::Info, stage.describe()),
                    SubmitEvent::Finished(result) => state.finish_submit(result),
                }
            }

            terminal
                .draw(|frame| draw(frame, &mut state, resubmit.is_some()))
                .context("failed to render frame")?;

            if event::poll(Duration::from_millis(16))?
                && let Event::Key(key) = event::read()?
            {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match state.handle_key(key, resubmit.is_some()) {
                    Action::Continue => {}
                    Action::Quit => break Ok(()),
                    Action::Submit => {
                        if let Some(resubmit) = resubmit.clone() {
                            spawn_submission(resubmit, events_tx.clone());
                        }
                    }
                }
            }
        }
    }
    .await;

    teardown_terminal(&mut terminal)?;

    loop_result.map(|_| state.collection)
}

/// Runs the request on its own task and always reports back, so the gate is
/// released even when the request task panics.
fn spawn_submission(resubmit: Resubmit, events: mpsc::UnboundedSender<SubmitEvent>) {
    let stage_events = events.clone();
    let request = tokio::spawn(async move {
        fetch_response(
            resubmit.database.as_ref(),
            resubmit.completion.as_ref(),
            &resubmit.params,
            resubmit.credential.as_ref(),
            move |stage| {
                let _ = stage_events.send(SubmitEvent::Stage(stage));
            },
        )
        .await
    });
    tokio::spawn(async move {
        let result = settle(request.await);
        let _ = events.send(SubmitEvent::Finished(result));
    });
}

fn settle(
    joined: Result<Result<String, GeneratorError>, JoinError>,
) -> Result<String, GeneratorError> {
    joined.unwrap_or_else(|err| {
        Err(GeneratorError::Upstream(format!(
            "The request stopped unexpectedly: {err}"
        )))
    })
}

fn draw(frame: &mut ratatui::Frame<'_>, state: &mut ReviewState, can_submit: bool) {
    let area = frame.area();
    frame.render_widget(Theme::backdrop(), area);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),
            Constraint::Length(8),
            Constraint::Length(5),
        ])
        .split(area);

    let list_height = chunks[0].height.saturating_sub(2) as usize;
    let selected_idx = state.selected_index();
    let list_top = selected_idx
        .map(|idx| (idx + 1).saturating_sub(list_height.max(1)))
        .unwrap_or(0);
    let list_lines: Vec<Line<'static>> = if state.collection.is_empty() {
        vec![Line::from(Span::styled(
            "No cards yet. Ctrl+A adds a blank card.",
            Theme::muted(),
        ))]
    } else {
        state
            .collection
            .cards()
            .iter()
            .enumerate()
            .skip(list_top)
            .take(list_height.max(1))
            .map(|(idx, card)| {
                let is_selected = Some(idx) == selected_idx;
                let marker = if is_selected { "> " } else { "  " };
                let preview: String = card
                    .content
                    .replace('\n', " ")
                    .chars()
                    .take(PREVIEW_CHARS)
                    .collect();
                Line::from(vec![
                    Theme::label_span(marker),
                    Span::styled(format!("{:>3}. ", idx + 1), Theme::muted()),
                    Span::styled(preview, Theme::card_row(is_selected)),
                ])
            })
            .collect()
    };
    let list_title = Line::from(vec![
        Theme::label_span(" Cards "),
        Theme::span(format!("({}) ", state.collection.len())),
    ]);
    frame.render_widget(
        Paragraph::new(list_lines).block(Theme::panel_with_line(list_title)),
        chunks[0],
    );

    let editor_area = chunks[1];
    let view_height = editor_area.height.saturating_sub(2) as usize;
    let view_width = editor_area.width.saturating_sub(2) as usize;
    state.editor.ensure_cursor_visible(view_height.max(1));
    let (cursor_row, cursor_col) = state.editor.cursor();
    let scroll_left = (cursor_col + 1).saturating_sub(view_width.max(1));

    let editor_title = match state.selected {
        Some(id) => format!(
            "Card {id} • last new cloze c{} • next c{}",
            state.tracker.highest(),
            current_max(&state.editor.content()).saturating_add(1)
        ),
        None => "Card".to_string(),
    };
    let body = highlight_card(&state.editor.content(), Some(state.editor.selection()));
    frame.render_widget(
        Paragraph::new(body)
            .block(Theme::panel(editor_title))
            .scroll((state.editor.scroll_top() as u16, scroll_left as u16)),
        editor_area,
    );

    if state.selected.is_some() {
        let visible_row = cursor_row.saturating_sub(state.editor.scroll_top());
        let cursor_x = editor_area.x
            + 1
            + ((cursor_col - scroll_left) as u16).min(editor_area.width.saturating_sub(2));
        let cursor_y =
            editor_area.y + 1 + (visible_row as u16).min(editor_area.height.saturating_sub(2));
        frame.set_cursor_position((cursor_x, cursor_y));
    }

    frame.render_widget(
        Paragraph::new(help_lines(state, can_submit))
            .block(Theme::panel("Help")),
        chunks[2],
    );
}

fn help_lines(state: &ReviewState, can_submit: bool) -> Vec<Line<'static>> {
    let mut first = vec![
        ("Ctrl+N", "new cloze"),
        ("Ctrl+K", "same cloze"),
        ("Tab", "next card"),
        ("Ctrl+S", "export"),
    ];
    if can_submit {
        let action = if state.gate.is_busy() {
            "working..."
        } else {
            "generate more"
        };
        first.push(("Ctrl+G", action));
    }
    let mut lines = vec![
        Theme::hint_line(&first),
        Theme::hint_line(&[
            ("Ctrl+A", "add card"),
            ("Ctrl+D", "delete card"),
            ("Ctrl+X", "delete all"),
            ("Esc", "exit"),
        ]),
    ];

    if let Some(status) = &state.status
        && status.visible()
    {
        let style = match status.kind {
            StatusKind::Info => Style::default(),
            StatusKind::Success => Theme::success(),
            StatusKind::Error => Theme::danger(),
        };
        lines.push(Line::from(Span::styled(status.message.clone(), style)));
    }
    lines
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        PopKeyboardEnhancementFlags,
        LeaveAlternateScreen
    )
    .context("failed to restore terminal")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}
