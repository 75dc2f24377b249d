//! TUI layer using ratatui and crossterm
//!
//! Stands in for the editor: open files with gutter markers, the pin
//! indicator, the pin prompts, and save detection through a file watcher.

use crate::config::Config;
use crate::document::TextDocument;
use crate::hunk::ChangeKind;
use crate::pin::{self, PinChoice, PinPrompt};
use crate::pipeline::{Annotator, Host, HostEvent, Notice};
use crate::projector::{AnnotationRange, DecorationSurface, Document};
use crate::syntax::{SyntaxHighlight, SyntaxHighlighter};
use crate::vcs::Vcs;
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{debug, warn};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Stdout};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;
use tui_textarea::TextArea;
use unicode_width::UnicodeWidthStr;

/// Decorations currently shown for one document
#[derive(Debug, Default)]
pub struct GutterDecorations {
    ranges: BTreeMap<ChangeKind, Vec<AnnotationRange>>,
}

impl DecorationSurface for GutterDecorations {
    fn clear_ranges(&mut self, kind: ChangeKind) {
        self.ranges.remove(&kind);
    }

    fn apply_ranges(&mut self, kind: ChangeKind, ranges: &[AnnotationRange]) {
        self.ranges.insert(kind, ranges.to_vec());
    }
}

impl GutterDecorations {
    /// Category shown at `line`; later categories draw over earlier ones
    pub fn kind_at(&self, line: usize) -> Option<ChangeKind> {
        ChangeKind::ALL.iter().rev().copied().find(|kind| {
            self.ranges
                .get(kind)
                .is_some_and(|ranges| ranges.iter().any(|r| r.line == line))
        })
    }

    pub fn count(&self, kind: ChangeKind) -> usize {
        self.ranges.get(&kind).map_or(0, Vec::len)
    }
}

pub struct OpenDocument {
    doc: TextDocument,
    display_path: String,
    decorations: GutterDecorations,
    highlights: Vec<Vec<SyntaxHighlight>>,
}

/// Editor-side state the annotator talks to
pub struct Workspace {
    documents: Vec<OpenDocument>,
    active: usize,
    indicator: (String, String),
    notice: Option<Notice>,
}

impl Workspace {
    fn active(&self) -> Option<&OpenDocument> {
        self.documents.get(self.active)
    }
}

impl Host for Workspace {
    fn active_document(&self) -> Option<&dyn Document> {
        self.active().map(|open| &open.doc as &dyn Document)
    }

    fn decorations(&mut self) -> Option<&mut dyn DecorationSurface> {
        self.documents
            .get_mut(self.active)
            .map(|open| &mut open.decorations as &mut dyn DecorationSurface)
    }

    fn set_indicator(&mut self, text: &str, tooltip: &str) {
        self.indicator = (text.to_string(), tooltip.to_string());
    }

    fn notify(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }
}

enum Mode {
    Normal,
    Choose {
        placeholder: String,
        selected: usize,
    },
    Input {
        textarea: TextArea<'static>,
    },
}

/// Application state
pub struct App<V> {
    annotator: Annotator<V>,
    workspace: Workspace,
    config: Config,
    highlighter: Option<SyntaxHighlighter>,
    mode: Mode,
    scroll: usize,
    show_help: bool,
}

fn highlight(highlighter: Option<&SyntaxHighlighter>, doc: &TextDocument) -> Vec<Vec<SyntaxHighlight>> {
    match highlighter {
        Some(h) => h.highlight_lines(doc.lines(), &doc.path().to_string_lossy()),
        None => Vec::new(),
    }
}

impl<V: Vcs> App<V> {
    pub fn new(
        annotator: Annotator<V>,
        docs: Vec<TextDocument>,
        root: &Path,
        config: Config,
        initial_pin: Option<&str>,
    ) -> Self {
        let highlighter = config
            .syntax_highlighting
            .then(|| SyntaxHighlighter::new(config.syntax_theme.as_deref()));

        let documents = docs
            .into_iter()
            .map(|doc| {
                let display_path = doc
                    .path()
                    .strip_prefix(root)
                    .unwrap_or(doc.path())
                    .display()
                    .to_string();
                let highlights = highlight(highlighter.as_ref(), &doc);
                OpenDocument {
                    doc,
                    display_path,
                    decorations: GutterDecorations::default(),
                    highlights,
                }
            })
            .collect();

        let mut app = Self {
            annotator,
            workspace: Workspace {
                documents,
                active: 0,
                indicator: (String::new(), String::new()),
                notice: None,
            },
            config,
            highlighter,
            mode: Mode::Normal,
            scroll: 0,
            show_help: false,
        };

        match initial_pin {
            Some(reference) => app.annotator.submit(Some(reference), &mut app.workspace),
            None => {
                app.annotator.show_indicator(&mut app.workspace);
                app.annotator.refresh(&mut app.workspace);
            }
        }
        app
    }

    pub fn open_paths(&self) -> Vec<PathBuf> {
        self.workspace
            .documents
            .iter()
            .map(|open| open.doc.path().to_path_buf())
            .collect()
    }

    fn focus(&mut self, index: usize) {
        if index == self.workspace.active || index >= self.workspace.documents.len() {
            return;
        }
        self.workspace.active = index;
        self.scroll = 0;
        self.annotator
            .handle(&HostEvent::FocusChanged, &mut self.workspace);
    }

    fn next_document(&mut self) {
        let count = self.workspace.documents.len();
        if count > 1 {
            self.focus((self.workspace.active + 1) % count);
        }
    }

    fn prev_document(&mut self) {
        let count = self.workspace.documents.len();
        if count > 1 {
            self.focus((self.workspace.active + count - 1) % count);
        }
    }

    /// Reload documents written to disk and re-annotate
    pub fn on_saved(&mut self, paths: &[PathBuf]) {
        for path in paths {
            let Some(open) = self
                .workspace
                .documents
                .iter_mut()
                .find(|open| open.doc.path() == path.as_path())
            else {
                continue;
            };

            if let Err(err) = open.doc.reload() {
                warn!("Could not reload {}: {:#}", path.display(), err);
                continue;
            }
            open.highlights = highlight(self.highlighter.as_ref(), &open.doc);

            self.annotator
                .handle(&HostEvent::Saved(path.clone()), &mut self.workspace);
        }
    }

    fn open_prompt(&mut self, prompt: PinPrompt) {
        self.mode = match prompt {
            PinPrompt::Choose { placeholder } => Mode::Choose {
                placeholder,
                selected: 0,
            },
            PinPrompt::Input {
                prompt,
                placeholder,
                initial,
            } => {
                let mut textarea = TextArea::default();
                textarea.set_block(Block::default().borders(Borders::ALL).title(format!(" {prompt} ")));
                textarea.set_placeholder_text(placeholder);
                textarea.set_cursor_line_style(Style::default());
                if let Some(initial) = initial {
                    textarea.insert_str(initial);
                }
                Mode::Input { textarea }
            }
        };
    }

    fn handle_input(&mut self, key: KeyEvent) -> Result<bool> {
        match self.mode {
            Mode::Normal => self.handle_normal_input(key),
            Mode::Choose { .. } => {
                self.handle_choice_input(key);
                Ok(false)
            }
            Mode::Input { .. } => {
                self.handle_text_input(key);
                Ok(false)
            }
        }
    }

    fn handle_normal_input(&mut self, key: KeyEvent) -> Result<bool> {
        // Clear notification on any input
        self.workspace.notice = None;

        let line_count = self
            .workspace
            .active()
            .map_or(0, |open| open.doc.line_count());

        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Ok(true),
            KeyCode::Char('?') => self.show_help = !self.show_help,

            // Navigation
            KeyCode::Char('j') | KeyCode::Down => {
                self.scroll = (self.scroll + 1).min(line_count.saturating_sub(1));
            }
            KeyCode::Char('k') | KeyCode::Up => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::PageDown => {
                self.scroll = (self.scroll + 20).min(line_count.saturating_sub(1));
            }
            KeyCode::PageUp => self.scroll = self.scroll.saturating_sub(20),
            KeyCode::Char('g') => self.scroll = 0,
            KeyCode::Char('G') => self.scroll = line_count.saturating_sub(1),
            KeyCode::Tab => self.next_document(),
            KeyCode::BackTab => self.prev_document(),

            // Pinning
            KeyCode::Char('p') => {
                let prompt = self.annotator.begin_toggle();
                self.open_prompt(prompt);
            }
            KeyCode::Char('u') => self.annotator.clear(&mut self.workspace),
            KeyCode::Char('r') => {
                self.annotator.handle(&HostEvent::Refresh, &mut self.workspace);
            }

            _ => {}
        }

        Ok(false)
    }

    fn handle_choice_input(&mut self, key: KeyEvent) {
        let Mode::Choose { selected, .. } = &mut self.mode else {
            return;
        };

        let answer = match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                *selected = selected.saturating_sub(1);
                return;
            }
            KeyCode::Down | KeyCode::Char('j') => {
                *selected = (*selected + 1).min(PinChoice::ALL.len() - 1);
                return;
            }
            KeyCode::Enter => PinChoice::ALL.get(*selected).copied(),
            KeyCode::Esc => None,
            _ => return,
        };

        self.mode = Mode::Normal;
        if let Some(prompt) = self.annotator.choose(answer, &mut self.workspace) {
            self.open_prompt(prompt);
        }
    }

    fn handle_text_input(&mut self, key: KeyEvent) {
        let Mode::Input { textarea } = &mut self.mode else {
            return;
        };

        let answer = match key.code {
            KeyCode::Esc => None,
            KeyCode::Enter => Some(textarea.lines().join("")),
            _ => {
                textarea.input(key);
                return;
            }
        };

        self.mode = Mode::Normal;
        self.annotator
            .submit(answer.as_deref(), &mut self.workspace);
    }
}

/// Directories to watch; editors often save by rename, so the files alone are not enough
fn watch_dirs(paths: &[PathBuf]) -> BTreeSet<&Path> {
    paths.iter().filter_map(|p| p.parent()).collect()
}

fn start_watcher(paths: &[PathBuf]) -> Result<(RecommendedWatcher, Receiver<notify::Result<notify::Event>>)> {
    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx)?;
    for dir in watch_dirs(paths) {
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
    }
    Ok((watcher, rx))
}

/// Drain pending watcher events into the set of open documents that were written
fn drain_saved(rx: &Receiver<notify::Result<notify::Event>>, open: &[PathBuf]) -> Vec<PathBuf> {
    let mut saved = BTreeSet::new();
    while let Ok(result) = rx.try_recv() {
        match result {
            Ok(event) if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) => {
                saved.extend(event.paths.into_iter().filter(|p| open.contains(p)));
            }
            Ok(_) => {}
            Err(err) => warn!("File watcher error: {err}"),
        }
    }
    saved.into_iter().collect()
}

/// Runs the TUI application
pub fn run<V: Vcs>(mut app: App<V>) -> Result<()> {
    let watch = if app.config.watch {
        match start_watcher(&app.open_paths()) {
            Ok(w) => Some(w),
            Err(err) => {
                warn!("File watching disabled: {err:#}");
                None
            }
        }
    } else {
        None
    };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app, watch.as_ref().map(|(_, rx)| rx));

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    result
}

fn run_app<V: Vcs>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App<V>,
    saves: Option<&Receiver<notify::Result<notify::Event>>>,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if event::poll(Duration::from_millis(200))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && app.handle_input(key)? {
                    return Ok(());
                }
            }
        }

        if let Some(rx) = saves {
            let saved = drain_saved(rx, &app.open_paths());
            if !saved.is_empty() {
                debug!("Saved: {saved:?}");
                app.on_saved(&saved);
            }
        }
    }
}

pub fn parse_hex_color(hex: &str) -> Option<Color> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let v = u32::from_str_radix(hex, 16).ok()?;
    Some(Color::Rgb((v >> 16) as u8, (v >> 8) as u8, v as u8))
}

fn kind_color(config: &Config, kind: ChangeKind) -> Color {
    parse_hex_color(config.colors.for_kind(kind)).unwrap_or(match kind {
        ChangeKind::Modified => Color::Yellow,
        ChangeKind::Added => Color::Green,
        ChangeKind::Removed => Color::Red,
    })
}

fn ui<V: Vcs>(f: &mut Frame, app: &App<V>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Document
            Constraint::Length(3), // Status
        ])
        .split(f.area());

    render_header(f, app, chunks[0]);
    render_document(f, app, chunks[1]);
    render_status(f, app, chunks[2]);

    match &app.mode {
        Mode::Normal => {}
        Mode::Choose {
            placeholder,
            selected,
        } => render_choice(f, placeholder, *selected),
        Mode::Input { textarea } => {
            let area = centered_rect(60, 20, f.area());
            let area = Rect {
                height: area.height.min(3),
                ..area
            };
            f.render_widget(Clear, area);
            f.render_widget(textarea, area);
        }
    }

    if app.show_help {
        render_help(f, app);
    }
}

fn render_header<V: Vcs>(f: &mut Frame, app: &App<V>, area: Rect) {
    let info = match app.workspace.active() {
        Some(open) => {
            let counts: Vec<String> = ChangeKind::ALL
                .iter()
                .map(|k| format!("{} {}", open.decorations.count(*k), k.as_str()))
                .collect();
            format!(
                " {} [{}/{}]  {}",
                open.display_path,
                app.workspace.active + 1,
                app.workspace.documents.len(),
                counts.join(", ")
            )
        }
        None => " No files".to_string(),
    };

    let title = match app.annotator.pins().pinned() {
        Some(reference) => format!(" pingutter vs {} ", pin::short_ref(reference)),
        None => format!(" pingutter vs {} ", app.annotator.target()),
    };
    let header = Paragraph::new(info)
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL).title(title));

    f.render_widget(header, area);
}

fn render_document<V>(f: &mut Frame, app: &App<V>, area: Rect) {
    let Some(open) = app.workspace.active() else {
        f.render_widget(Block::default().borders(Borders::ALL), area);
        return;
    };

    let visible_height = area.height.saturating_sub(2) as usize;
    let number_width = open.doc.line_count().to_string().len().max(3);

    let items: Vec<ListItem> = open
        .doc
        .lines()
        .iter()
        .enumerate()
        .skip(app.scroll)
        .take(visible_height)
        .map(|(idx, text)| {
            let marker = match open.decorations.kind_at(idx) {
                Some(kind) => {
                    let glyph = match kind {
                        ChangeKind::Removed => &app.config.removed_marker,
                        _ => &app.config.change_marker,
                    };
                    Span::styled(glyph.clone(), Style::default().fg(kind_color(&app.config, kind)))
                }
                None => Span::raw(" "),
            };

            let mut spans = vec![
                marker,
                Span::styled(
                    format!(" {:>width$} ", idx + 1, width = number_width),
                    Style::default().fg(Color::DarkGray),
                ),
            ];
            spans.extend(text_spans(text, open.highlights.get(idx)));

            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items).block(Block::default().borders(Borders::ALL));
    f.render_widget(list, area);
}

fn text_spans<'a>(text: &'a str, highlights: Option<&Vec<SyntaxHighlight>>) -> Vec<Span<'a>> {
    let Some(highlights) = highlights.filter(|h| !h.is_empty()) else {
        return vec![Span::raw(text)];
    };

    highlights
        .iter()
        .filter_map(|h| {
            let segment = text.get(h.start..h.end)?;
            let (r, g, b) = h.style.fg;
            let mut style = Style::default().fg(Color::Rgb(r, g, b));
            if h.style.bold {
                style = style.add_modifier(Modifier::BOLD);
            }
            if h.style.italic {
                style = style.add_modifier(Modifier::ITALIC);
            }
            if h.style.underline {
                style = style.add_modifier(Modifier::UNDERLINED);
            }
            Some(Span::styled(segment, style))
        })
        .collect()
}

fn render_status<V>(f: &mut Frame, app: &App<V>, area: Rect) {
    let (indicator, _) = &app.workspace.indicator;
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(indicator.width() as u16 + 4),
        ])
        .split(area);

    let message = match &app.workspace.notice {
        Some(Notice::Info(msg)) => Paragraph::new(format!(" {msg}")).style(Style::default().fg(Color::Green)),
        Some(Notice::Error(msg)) => Paragraph::new(format!(" {msg}")).style(Style::default().fg(Color::Red)),
        None => Paragraph::new(" j/k: scroll | Tab: next file | p: pin | u: unpin | r: refresh | ?: help | q: quit")
            .style(Style::default().fg(Color::Yellow)),
    };

    f.render_widget(message.block(Block::default().borders(Borders::ALL)), chunks[0]);
    f.render_widget(
        Paragraph::new(format!(" {indicator}"))
            .style(Style::default().fg(Color::Magenta))
            .block(Block::default().borders(Borders::ALL)),
        chunks[1],
    );
}

fn render_choice(f: &mut Frame, placeholder: &str, selected: usize) {
    let area = centered_rect(50, 20, f.area());
    let area = Rect {
        height: area.height.min(PinChoice::ALL.len() as u16 + 2),
        ..area
    };

    let items: Vec<ListItem> = PinChoice::ALL
        .iter()
        .map(|choice| ListItem::new(choice.label()))
        .collect();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!(" {placeholder} ")))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = ListState::default();
    state.select(Some(selected));

    f.render_widget(Clear, area);
    f.render_stateful_widget(list, area, &mut state);
}

fn render_help<V: Vcs>(f: &mut Frame, app: &App<V>) {
    let area = centered_rect(60, 70, f.area());
    let (_, tooltip) = &app.workspace.indicator;

    let help_text = [
        "",
        "  Navigation:",
        "    j / ↓     Scroll down",
        "    k / ↑     Scroll up",
        "    g / G     Top / bottom",
        "    Tab       Next file",
        "    Shift-Tab Previous file",
        "",
        "  Comparison:",
        "    p         Pin, change or clear a reference",
        "    u         Unpin, back to the default target",
        "    r         Re-run the diff",
        "",
        "  Other:",
        "    ?         Toggle this help",
        "    q         Quit",
        "",
    ];

    let mut text = format!("\n  {tooltip}\n  Comparing against: {}\n", app.annotator.target());
    text.push_str(&help_text.join("\n"));

    let help = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help ")
                .style(Style::default().bg(Color::DarkGray)),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(Clear, area);
    f.render_widget(help, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
