// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use flipdeck_app::{
    DashboardCommand, DashboardSession, DashboardView, ResultBatch, ResultKind, SortDirection,
    SortKey, SortSpec, project,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs};
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use time::OffsetDateTime;

const PIN_MARK: &str = "★";

/// What a load should do. Everything that can repopulate the record store
/// goes through one of these, so the lifecycle is handled in one place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadRequest {
    Latest,
    Scan,
    OpenCsv(PathBuf),
    Upload(PathBuf),
}

impl LoadRequest {
    pub fn label(&self) -> String {
        match self {
            Self::Latest => "latest reports".to_owned(),
            Self::Scan => "scan".to_owned(),
            Self::OpenCsv(path) => path.display().to_string(),
            Self::Upload(path) => format!("upload of {}", path.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadEvent {
    Completed { request_id: u64, batch: ResultBatch },
    Failed { request_id: u64, error: String },
}

impl LoadEvent {
    const fn request_id(&self) -> u64 {
        match self {
            Self::Completed { request_id, .. } | Self::Failed { request_id, .. } => *request_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
    Load(LoadEvent),
}

/// Seam between the UI loop and whatever produces result batches. The
/// default `spawn_load` runs synchronously; real runtimes override it to
/// keep the UI responsive during network calls.
pub trait AppRuntime {
    fn run_load(&mut self, request: &LoadRequest) -> Result<ResultBatch>;

    fn spawn_load(
        &mut self,
        request_id: u64,
        request: LoadRequest,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let event = match self.run_load(&request) {
            Ok(batch) => InternalEvent::Load(LoadEvent::Completed { request_id, batch }),
            Err(error) => InternalEvent::Load(LoadEvent::Failed {
                request_id,
                error: error.to_string(),
            }),
        };
        tx.send(event)
            .map_err(|_| anyhow::anyhow!("load event channel closed"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptKind {
    Search,
    OpenCsv,
    Upload,
}

impl PromptKind {
    const fn title(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::OpenCsv => "open report file",
            Self::Upload => "upload report file",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct InputPrompt {
    kind: PromptKind,
    buffer: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LoadInFlight {
    request_id: u64,
    label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ViewData {
    input: Option<InputPrompt>,
    in_flight: Option<LoadInFlight>,
    selected: usize,
    status_token: u64,
    next_request_id: u64,
    help_visible: bool,
}

pub fn run_app<R: AppRuntime>(session: &mut DashboardSession, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();

    start_load(session, runtime, &mut view_data, &internal_tx, LoadRequest::Latest);

    let mut result = Ok(());
    loop {
        process_internal_events(session, &mut view_data, &internal_tx, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, session, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(session, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn dispatch(session: &mut DashboardSession, command: DashboardCommand) {
    let DashboardSession { state, store } = session;
    state.dispatch(command, store);
}

fn process_internal_events(
    session: &mut DashboardSession,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                dispatch(session, DashboardCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::Load(event) => handle_load_event(session, view_data, tx, event),
        }
    }
}

fn handle_load_event(
    session: &mut DashboardSession,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    event: LoadEvent,
) {
    let Some(in_flight) = &view_data.in_flight else {
        return;
    };
    if event.request_id() != in_flight.request_id {
        return;
    }
    view_data.in_flight = None;

    match event {
        LoadEvent::Completed { batch, .. } => {
            session.apply_batch(batch, OffsetDateTime::now_utc());
            view_data.selected = 0;
        }
        LoadEvent::Failed { error, .. } => {
            session.fail_load(&error);
        }
    }
    // apply_batch and fail_load write the status line directly; arm the
    // timer so it clears like every other status.
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(tx, view_data.status_token);
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    session: &mut DashboardSession,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    dispatch(session, DashboardCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn start_load<R: AppRuntime>(
    session: &mut DashboardSession,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    request: LoadRequest,
) {
    if view_data.in_flight.is_some() {
        emit_status(session, view_data, internal_tx, "a load is already running");
        return;
    }

    let label = request.label();
    view_data.next_request_id = view_data.next_request_id.saturating_add(1);
    let request_id = view_data.next_request_id;

    session.begin_load(&label);
    view_data.in_flight = Some(LoadInFlight {
        request_id,
        label: label.clone(),
    });
    view_data.selected = 0;

    if let Err(error) = runtime.spawn_load(request_id, request, internal_tx.clone()) {
        view_data.in_flight = None;
        session.fail_load(&error.to_string());
        view_data.status_token = view_data.status_token.saturating_add(1);
        schedule_status_clear(internal_tx, view_data.status_token);
    }
}

fn card_count(session: &DashboardSession) -> usize {
    session.state.pinned.len() + session.state.visible_unpinned(&session.store).len()
}

fn clamp_selection(view_data: &mut ViewData, count: usize) {
    if count == 0 {
        view_data.selected = 0;
    } else if view_data.selected >= count {
        view_data.selected = count - 1;
    }
}

fn selected_card_key(session: &DashboardSession, selected: usize) -> Option<(String, bool)> {
    let pinned = session.state.pinned.len();
    if selected < pinned {
        return session
            .state
            .pinned
            .get_index(selected)
            .map(|(key, _)| (key.clone(), true));
    }
    session
        .state
        .visible_unpinned(&session.store)
        .get(selected - pinned)
        .map(|record| (record.key(), false))
}

fn cycle_category(session: &mut DashboardSession) -> Option<String> {
    let categories = session.store.categories();
    let next = match &session.state.category_filter {
        None => categories.first().cloned(),
        Some(current) => categories
            .iter()
            .position(|category| category == current)
            .and_then(|index| categories.get(index + 1))
            .cloned(),
    };
    dispatch(session, DashboardCommand::SetCategory(next.clone()));
    next
}

fn cycle_sort(session: &mut DashboardSession) -> Option<SortSpec> {
    let next = match session.state.sort {
        None => Some(SortSpec::new(SortKey::ALL_KEYS[0], SortDirection::Desc)),
        Some(spec) => SortKey::ALL_KEYS
            .iter()
            .position(|key| *key == spec.key)
            .and_then(|index| SortKey::ALL_KEYS.get(index + 1))
            .map(|key| SortSpec::new(*key, spec.direction)),
    };
    dispatch(session, DashboardCommand::SetSort(next));
    next
}

fn handle_key_event<R: AppRuntime>(
    session: &mut DashboardSession,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if view_data.help_visible {
        if key.code == KeyCode::Esc || key.code == KeyCode::Char('?') {
            view_data.help_visible = false;
        }
        return false;
    }

    if view_data.input.is_some() {
        handle_prompt_key(session, runtime, view_data, internal_tx, key);
        return false;
    }

    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('?') => view_data.help_visible = true,
        KeyCode::Tab | KeyCode::Right => {
            dispatch(session, DashboardCommand::NextTab);
            view_data.selected = 0;
        }
        KeyCode::BackTab | KeyCode::Left => {
            dispatch(session, DashboardCommand::PrevTab);
            view_data.selected = 0;
        }
        KeyCode::Char('1') => switch_tab(session, view_data, ResultKind::Passed),
        KeyCode::Char('2') => switch_tab(session, view_data, ResultKind::NearMiss),
        KeyCode::Char('3') => switch_tab(session, view_data, ResultKind::All),
        KeyCode::Char('/') => {
            view_data.input = Some(InputPrompt {
                kind: PromptKind::Search,
                buffer: session.state.search.clone(),
            });
        }
        KeyCode::Char('c') => {
            let chosen = cycle_category(session);
            let message = match chosen {
                Some(category) => format!("category: {category}"),
                None => "category filter cleared".to_owned(),
            };
            emit_status(session, view_data, internal_tx, message);
            clamp_selection(view_data, card_count(session));
        }
        KeyCode::Char('s') => {
            let message = match cycle_sort(session) {
                Some(spec) => format!("sort: {} {}", spec.key.label(), spec.direction.as_str()),
                None => "sort cleared".to_owned(),
            };
            emit_status(session, view_data, internal_tx, message);
        }
        KeyCode::Char('r') => match session.state.sort {
            Some(spec) => {
                let toggled = SortSpec::new(spec.key, spec.direction.toggled());
                dispatch(session, DashboardCommand::SetSort(Some(toggled)));
                emit_status(
                    session,
                    view_data,
                    internal_tx,
                    format!("sort: {} {}", toggled.key.label(), toggled.direction.as_str()),
                );
            }
            None => emit_status(session, view_data, internal_tx, "no sort active"),
        },
        KeyCode::Char('j') | KeyCode::Down => {
            let count = card_count(session);
            if count > 0 && view_data.selected + 1 < count {
                view_data.selected += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            view_data.selected = view_data.selected.saturating_sub(1);
        }
        KeyCode::Char('g') => view_data.selected = 0,
        KeyCode::Char('G') => {
            view_data.selected = card_count(session).saturating_sub(1);
        }
        KeyCode::Char('p') => {
            match selected_card_key(session, view_data.selected) {
                Some((card_key, true)) => {
                    dispatch(session, DashboardCommand::Unpin(card_key));
                    emit_status(session, view_data, internal_tx, "unpinned");
                }
                Some((card_key, false)) => {
                    dispatch(session, DashboardCommand::Pin(card_key));
                    emit_status(session, view_data, internal_tx, "pinned");
                }
                None => {}
            }
            clamp_selection(view_data, card_count(session));
        }
        KeyCode::Char('l') => {
            start_load(session, runtime, view_data, internal_tx, LoadRequest::Latest);
        }
        KeyCode::Char('R') => {
            start_load(session, runtime, view_data, internal_tx, LoadRequest::Scan);
        }
        KeyCode::Char('o') => {
            view_data.input = Some(InputPrompt {
                kind: PromptKind::OpenCsv,
                buffer: String::new(),
            });
        }
        KeyCode::Char('u') => {
            view_data.input = Some(InputPrompt {
                kind: PromptKind::Upload,
                buffer: String::new(),
            });
        }
        _ => {}
    }
    false
}

fn switch_tab(session: &mut DashboardSession, view_data: &mut ViewData, kind: ResultKind) {
    dispatch(session, DashboardCommand::SwitchTab(kind));
    view_data.selected = 0;
}

fn handle_prompt_key<R: AppRuntime>(
    session: &mut DashboardSession,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(prompt) = view_data.input.as_mut() else {
        return;
    };
    match key.code {
        KeyCode::Esc => {
            let kind = prompt.kind;
            view_data.input = None;
            if kind == PromptKind::Search {
                dispatch(session, DashboardCommand::SetSearch(String::new()));
                clamp_selection(view_data, card_count(session));
            }
        }
        KeyCode::Enter => {
            let prompt = view_data.input.take().unwrap_or(InputPrompt {
                kind: PromptKind::Search,
                buffer: String::new(),
            });
            match prompt.kind {
                PromptKind::Search => {}
                PromptKind::OpenCsv => {
                    let path = prompt.buffer.trim();
                    if !path.is_empty() {
                        start_load(
                            session,
                            runtime,
                            view_data,
                            internal_tx,
                            LoadRequest::OpenCsv(PathBuf::from(path)),
                        );
                    }
                }
                PromptKind::Upload => {
                    let path = prompt.buffer.trim();
                    if !path.is_empty() {
                        start_load(
                            session,
                            runtime,
                            view_data,
                            internal_tx,
                            LoadRequest::Upload(PathBuf::from(path)),
                        );
                    }
                }
            }
        }
        KeyCode::Backspace => {
            prompt.buffer.pop();
            if prompt.kind == PromptKind::Search {
                let search = prompt.buffer.clone();
                dispatch(session, DashboardCommand::SetSearch(search));
                clamp_selection(view_data, card_count(session));
            }
        }
        KeyCode::Char(character) => {
            prompt.buffer.push(character);
            if prompt.kind == PromptKind::Search {
                let search = prompt.buffer.clone();
                dispatch(session, DashboardCommand::SetSearch(search));
                clamp_selection(view_data, card_count(session));
            }
        }
        _ => {}
    }
}

fn filter_bar_text(view: &DashboardView, view_data: &ViewData) -> String {
    let mut parts = Vec::new();
    if !view.search.is_empty() {
        parts.push(format!("search: {}", view.search));
    }
    if let Some(category) = &view.category_filter {
        parts.push(format!("category: {category}"));
    }
    if let Some(sort) = &view.sort_label {
        parts.push(format!("sort: {sort}"));
    }
    if let Some(in_flight) = &view_data.in_flight {
        parts.push(format!("loading {}...", in_flight.label));
    }
    if parts.is_empty() {
        parts.push("no filters".to_owned());
    }
    parts.join("  |  ")
}

fn table_title(view: &DashboardView) -> String {
    if view.fallback_banner {
        return "no high-value results; showing all scanned items".to_owned();
    }
    view.tabs
        .iter()
        .find(|tab| tab.active)
        .map_or_else(String::new, |tab| tab.kind.label().to_owned())
}

fn status_text(view: &DashboardView) -> String {
    if let Some(status) = &view.status_line {
        return status.clone();
    }
    if let Some(caption) = &view.source_caption {
        return format!("showing {caption}");
    }
    "q quit  / search  c category  s sort  r reverse  p pin  l latest  R scan  o open  u upload  ? help"
        .to_owned()
}

fn help_overlay_text() -> String {
    [
        "q          quit",
        "tab / 1-3  switch result tab",
        "/          search title, brand, category",
        "c          cycle category filter",
        "s          cycle sort column",
        "r          reverse sort direction",
        "j / k      move selection",
        "p          pin or unpin the selected deal",
        "l          load latest reports from the server",
        "R          run a new scan",
        "o          open a local report file",
        "u          upload a report file for analysis",
        "esc        close prompt or overlay",
    ]
    .join("\n")
}

fn render(frame: &mut ratatui::Frame<'_>, session: &DashboardSession, view_data: &ViewData) {
    let view = project(&session.state, &session.store);

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let selected_tab = view.tabs.iter().position(|tab| tab.active).unwrap_or(0);
    let tab_titles: Vec<String> = view
        .tabs
        .iter()
        .map(|tab| format!("{} ({})", tab.kind.label(), tab.count))
        .collect();
    let tabs = Tabs::new(tab_titles)
        .block(Block::default().title("flipdeck").borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected_tab);
    frame.render_widget(tabs, layout[0]);

    let filter_bar = Paragraph::new(filter_bar_text(&view, view_data))
        .block(Block::default().title("filters").borders(Borders::ALL));
    frame.render_widget(filter_bar, layout[1]);

    let header = Row::new(vec![
        "", "title", "brand", "category", "buy", "sell", "profit", "roi", "comps",
    ])
    .style(Style::default().add_modifier(Modifier::BOLD));
    let rows: Vec<Row> = view
        .cards
        .iter()
        .enumerate()
        .map(|(index, card)| {
            let mut style = Style::default();
            if card.pinned {
                style = style.fg(Color::Cyan);
            }
            if index == view_data.selected {
                style = style.bg(Color::DarkGray).add_modifier(Modifier::BOLD);
            }
            Row::new(vec![
                Cell::from(if card.pinned { PIN_MARK } else { "" }),
                Cell::from(card.title.clone()),
                Cell::from(card.brand.clone()),
                Cell::from(card.category.clone()),
                Cell::from(card.buy_price.clone()),
                Cell::from(card.sell_price.clone()),
                Cell::from(card.profit.clone()),
                Cell::from(card.roi.clone()),
                Cell::from(card.sold_comps.clone()),
            ])
            .style(style)
        })
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Length(2),
            Constraint::Min(24),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(8),
            Constraint::Length(6),
        ],
    )
    .header(header)
    .column_spacing(1)
    .block(
        Block::default()
            .title(table_title(&view))
            .borders(Borders::ALL),
    );
    frame.render_widget(table, layout[2]);

    let status = Paragraph::new(status_text(&view))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[3]);

    if let Some(prompt) = &view_data.input {
        let area = centered_rect(60, 20, frame.area());
        frame.render_widget(Clear, area);
        let input = Paragraph::new(format!("{}_", prompt.buffer)).block(
            Block::default()
                .title(prompt.kind.title())
                .borders(Borders::ALL),
        );
        frame.render_widget(input, area);
    }

    if view_data.help_visible {
        let area = centered_rect(70, 70, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn centered_rect(
    percent_x: u16,
    percent_y: u16,
    area: ratatui::layout::Rect,
) -> ratatui::layout::Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
