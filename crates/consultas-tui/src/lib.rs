// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use consultas_app::{
    CATALOG, Console, ConsoleCommand, ConsoleEvent, Credentials, FormValues, QueryDefinition,
    QueryId, QueryResult, RequestGeneration, ResultPager, SessionState, Submission,
};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs, Wrap};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(120);
const STATUS_TTL: Duration = Duration::from_secs(4);
const APP_TITLE: &str = "Portal de Consultas";

#[derive(Debug, Clone, PartialEq)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    Dispatch {
        generation: RequestGeneration,
        outcome: Result<QueryResult, String>,
    },
}

pub trait AppRuntime {
    fn run_query(&mut self, query_id: QueryId, params: &FormValues) -> Result<QueryResult>;

    /// Runs the submission and reports back over `tx`. Implementations that
    /// talk to the network should do the work off the calling thread.
    fn spawn_query(&mut self, submission: Submission, tx: Sender<InternalEvent>) -> Result<()> {
        let outcome = self
            .run_query(submission.query_id, &submission.params)
            .map_err(|error| format!("{error:#}"));
        tx.send(InternalEvent::Dispatch {
            generation: submission.generation,
            outcome,
        })
        .map_err(|_| anyhow!("dispatch event channel closed"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum LoginField {
    #[default]
    Username,
    Password,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct LoginUiState {
    username: String,
    password: String,
    field: LoginField,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Focus {
    #[default]
    Catalog,
    Form,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ViewData {
    login: LoginUiState,
    catalog_cursor: usize,
    focus: Focus,
    field_index: usize,
    status_token: u64,
}

pub fn run_app<R: AppRuntime>(console: &mut Console, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let result = event_loop(&mut terminal, console, runtime);

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn event_loop<B: Backend, R: AppRuntime>(
    terminal: &mut Terminal<B>,
    console: &mut Console,
    runtime: &mut R,
) -> Result<()> {
    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();

    loop {
        process_internal_events(console, &mut view_data, &internal_tx, &internal_rx);

        terminal
            .draw(|frame| render(frame, console, &view_data))
            .context("draw frame")?;

        if event::poll(POLL_INTERVAL).context("poll event")?
            && let Event::Key(key) = event::read().context("read event")?
            && handle_key_event(console, runtime, &mut view_data, &internal_tx, key)
        {
            return Ok(());
        }
    }
}

fn process_internal_events(
    console: &mut Console,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                console.dispatch(ConsoleCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::Dispatch {
                generation,
                outcome,
            } => {
                let events = console.dispatch(ConsoleCommand::Complete {
                    generation,
                    outcome,
                });
                report_completion(console, view_data, tx, events);
            }
        }
    }
}

fn report_completion(
    console: &mut Console,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    events: Vec<ConsoleEvent>,
) {
    for event in events {
        match event {
            ConsoleEvent::ResultReady { query_id, rows } => {
                info!(query = %query_id, rows, "query completed");
                let noun = if rows == 1 { "row" } else { "rows" };
                emit_status(console, view_data, tx, format!("query {query_id}: {rows} {noun}"));
            }
            ConsoleEvent::DispatchFailed(message) => {
                warn!(error = %message, "query failed");
                emit_status(console, view_data, tx, "query failed");
            }
            ConsoleEvent::StaleResponseDiscarded(generation) => {
                debug!(generation = generation.get(), "discarding stale response");
            }
            _ => {}
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_TTL);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    console: &mut Console,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    console.dispatch(ConsoleCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn handle_key_event<R: AppRuntime>(
    console: &mut Console,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return true;
    }

    match console.session_state() {
        SessionState::LoggedOut => handle_login_key(console, view_data, internal_tx, key),
        SessionState::Exited => handle_exited_key(console, view_data, internal_tx, key),
        SessionState::Active => {
            handle_console_key(console, runtime, view_data, internal_tx, key);
            false
        }
    }
}

fn handle_login_key(
    console: &mut Console,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    let login = &mut view_data.login;
    match key.code {
        KeyCode::Esc => return true,
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
            login.field = match login.field {
                LoginField::Username => LoginField::Password,
                LoginField::Password => LoginField::Username,
            };
        }
        KeyCode::Backspace => {
            active_login_input(login).pop();
        }
        KeyCode::Enter => {
            let credentials = Credentials {
                username: login.username.trim().to_owned(),
                password: std::mem::take(&mut login.password),
            };
            let username = credentials.username.clone();
            let events = console.dispatch(ConsoleCommand::Login(credentials));
            if console.session_state() == SessionState::Active {
                info!(user = %username, "session started");
                view_data.focus = Focus::Catalog;
                view_data.catalog_cursor = 0;
                let greeting = if username.is_empty() {
                    "logged in".to_owned()
                } else {
                    format!("logged in as {username}")
                };
                emit_status(console, view_data, internal_tx, greeting);
            } else {
                report_rejections(console, view_data, internal_tx, events);
            }
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            active_login_input(login).push(ch);
        }
        _ => {}
    }
    false
}

fn active_login_input(login: &mut LoginUiState) -> &mut String {
    match login.field {
        LoginField::Username => &mut login.username,
        LoginField::Password => &mut login.password,
    }
}

fn handle_exited_key(
    console: &mut Console,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => return true,
        KeyCode::Left | KeyCode::BackTab => move_catalog_cursor(view_data, -1),
        KeyCode::Right | KeyCode::Tab => move_catalog_cursor(view_data, 1),
        KeyCode::Enter => {
            let id = CATALOG[view_data.catalog_cursor].id;
            select_query(console, view_data, internal_tx, id);
        }
        KeyCode::Char(ch) => {
            if let Some(id) = query_for_digit(ch) {
                select_query(console, view_data, internal_tx, id);
            }
        }
        _ => {}
    }
    false
}

fn handle_console_key<R: AppRuntime>(
    console: &mut Console,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        if key.code == KeyCode::Char('x') {
            let events = console.dispatch(ConsoleCommand::Exit);
            if events.contains(&ConsoleEvent::SessionChanged(SessionState::Exited)) {
                info!("session exited");
                view_data.focus = Focus::Catalog;
                view_data.field_index = 0;
                emit_status(console, view_data, internal_tx, "session ended");
            }
        }
        return;
    }

    match key.code {
        KeyCode::PageDown => {
            console.dispatch(ConsoleCommand::NextPage);
            return;
        }
        KeyCode::PageUp => {
            console.dispatch(ConsoleCommand::PrevPage);
            return;
        }
        _ => {}
    }

    match view_data.focus {
        Focus::Catalog => handle_catalog_key(console, view_data, internal_tx, key),
        Focus::Form => handle_form_key(console, runtime, view_data, internal_tx, key),
    }
}

fn handle_catalog_key(
    console: &mut Console,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Left | KeyCode::BackTab => move_catalog_cursor(view_data, -1),
        KeyCode::Right | KeyCode::Tab => move_catalog_cursor(view_data, 1),
        KeyCode::Enter => {
            let id = CATALOG[view_data.catalog_cursor].id;
            select_query(console, view_data, internal_tx, id);
        }
        KeyCode::Down => {
            if console.form().selected().is_some() {
                view_data.focus = Focus::Form;
            }
        }
        KeyCode::Char('[') => {
            console.dispatch(ConsoleCommand::PrevPage);
        }
        KeyCode::Char(']') => {
            console.dispatch(ConsoleCommand::NextPage);
        }
        KeyCode::Char(ch) => {
            if let Some(id) = query_for_digit(ch) {
                select_query(console, view_data, internal_tx, id);
            }
        }
        _ => {}
    }
}

fn handle_form_key<R: AppRuntime>(
    console: &mut Console,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(definition) = console.form().selected() else {
        view_data.focus = Focus::Catalog;
        return;
    };
    let field_count = definition.fields.len();

    match key.code {
        KeyCode::Esc => view_data.focus = Focus::Catalog,
        KeyCode::Up => {
            if view_data.field_index == 0 {
                view_data.focus = Focus::Catalog;
            } else {
                view_data.field_index -= 1;
            }
        }
        KeyCode::Down => {
            if view_data.field_index + 1 < field_count {
                view_data.field_index += 1;
            }
        }
        KeyCode::Tab if field_count > 0 => {
            view_data.field_index = (view_data.field_index + 1) % field_count;
        }
        KeyCode::Enter => submit_form(console, runtime, view_data, internal_tx),
        KeyCode::Backspace => edit_focused_field(console, view_data, internal_tx, |value| {
            value.pop();
        }),
        KeyCode::Char(ch) => edit_focused_field(console, view_data, internal_tx, |value| {
            value.push(ch);
        }),
        _ => {}
    }
}

fn edit_focused_field(
    console: &mut Console,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    edit: impl FnOnce(&mut String),
) {
    let Some(field) = console
        .form()
        .selected()
        .and_then(|definition| definition.fields.get(view_data.field_index))
    else {
        return;
    };

    let mut value = console.form().value(field.name).to_owned();
    edit(&mut value);
    let events = console.dispatch(ConsoleCommand::SetField {
        name: field.name.to_owned(),
        value,
    });
    report_rejections(console, view_data, internal_tx, events);
}

fn submit_form<R: AppRuntime>(
    console: &mut Console,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    if console.is_loading() {
        emit_status(
            console,
            view_data,
            internal_tx,
            "query already running -- wait for it to finish",
        );
        return;
    }

    for event in console.dispatch(ConsoleCommand::Submit) {
        match event {
            ConsoleEvent::DispatchRequested(submission) => {
                let generation = submission.generation;
                info!(
                    query = %submission.query_id,
                    generation = generation.get(),
                    fields = submission.params.len(),
                    "dispatching query"
                );
                if let Err(error) = runtime.spawn_query(submission, internal_tx.clone()) {
                    let events = console.dispatch(ConsoleCommand::Complete {
                        generation,
                        outcome: Err(format!("{error:#}")),
                    });
                    report_completion(console, view_data, internal_tx, events);
                }
            }
            ConsoleEvent::ValidationFailed(message) => {
                debug!(%message, "form validation failed");
            }
            ConsoleEvent::Rejected(message) => {
                emit_status(console, view_data, internal_tx, message);
            }
            _ => {}
        }
    }
}

fn select_query(
    console: &mut Console,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    id: QueryId,
) {
    let abandoned = console.form().pending_generation();
    let events = console.dispatch(ConsoleCommand::SelectQuery(id));
    if !events.contains(&ConsoleEvent::QuerySelected(id)) {
        report_rejections(console, view_data, internal_tx, events);
        return;
    }

    if let Some(generation) = abandoned {
        debug!(generation = generation.get(), "abandoning in-flight query");
    }
    if events.contains(&ConsoleEvent::SessionChanged(SessionState::Active)) {
        info!("session re-entered");
    }
    view_data.catalog_cursor = catalog_index(id).unwrap_or(view_data.catalog_cursor);
    view_data.focus = Focus::Form;
    view_data.field_index = 0;
}

fn report_rejections(
    console: &mut Console,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    events: Vec<ConsoleEvent>,
) {
    for event in events {
        if let ConsoleEvent::Rejected(message) = event {
            emit_status(console, view_data, internal_tx, message);
        }
    }
}

fn move_catalog_cursor(view_data: &mut ViewData, delta: isize) {
    let len = CATALOG.len() as isize;
    let next = (view_data.catalog_cursor as isize + delta).rem_euclid(len);
    view_data.catalog_cursor = next as usize;
}

fn catalog_index(id: QueryId) -> Option<usize> {
    CATALOG.iter().position(|definition| definition.id == id)
}

fn query_for_digit(ch: char) -> Option<QueryId> {
    match ch {
        '1'..='9' => ch.to_digit(10).map(QueryId::new),
        '0' => Some(QueryId::new(10)),
        _ => None,
    }
}

fn render(frame: &mut ratatui::Frame<'_>, console: &Console, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(frame.area());

    if console.session_state() == SessionState::LoggedOut {
        let header = Paragraph::new("log in with any user and password")
            .block(Block::default().title(APP_TITLE).borders(Borders::ALL));
        frame.render_widget(header, layout[0]);

        let area = centered_rect(50, 40, layout[1]);
        frame.render_widget(Clear, area);
        let login = Paragraph::new(login_text(&view_data.login))
            .block(Block::default().title("login").borders(Borders::ALL));
        frame.render_widget(login, area);
    } else {
        let tabs = Tabs::new(catalog_labels(console, view_data))
            .block(Block::default().title(APP_TITLE).borders(Borders::ALL))
            .style(Style::default().fg(Color::White))
            .highlight_style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .select(highlighted_tab(console, view_data));
        frame.render_widget(tabs, layout[0]);

        if console.session_state() == SessionState::Exited {
            let body = Paragraph::new(exited_text())
                .wrap(Wrap { trim: false })
                .block(Block::default().title("session ended").borders(Borders::ALL));
            frame.render_widget(body, layout[1]);
        } else {
            render_console(frame, layout[1], console, view_data);
        }
    }

    let status = Paragraph::new(status_text(console, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(status, layout[2]);
}

fn render_console(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    console: &Console,
    view_data: &ViewData,
) {
    let form_text = form_panel_text(console, view_data);
    let form_height = (form_text.lines().count() as u16).saturating_add(3);
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(form_height), Constraint::Min(3)])
        .split(area);

    let form_title = console
        .form()
        .selected()
        .map(|definition| format!("query {}", definition.id))
        .unwrap_or_else(|| "queries".to_owned());
    let form_style = if view_data.focus == Focus::Form {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let form = Paragraph::new(form_text).wrap(Wrap { trim: false }).block(
        Block::default()
            .title(form_title)
            .borders(Borders::ALL)
            .border_style(form_style),
    );
    frame.render_widget(form, sections[0]);

    render_result(frame, sections[1], console);
}

fn render_result(frame: &mut ratatui::Frame<'_>, area: Rect, console: &Console) {
    let pager = console.pager();
    let block = Block::default()
        .title(result_title(pager))
        .borders(Borders::ALL);

    if let Some(text) = result_placeholder_text(console) {
        frame.render_widget(Paragraph::new(text).block(block), area);
        return;
    }
    let Some(result) = pager.result() else {
        frame.render_widget(block, area);
        return;
    };

    let widths = vec![Constraint::Min(8); result.columns().len().max(1)];
    let header = Row::new(result.columns().iter().map(|column| {
        Cell::from(column.clone()).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));
    let rows = pager
        .visible_rows()
        .iter()
        .map(|row| Row::new(row.iter().map(|cell| Cell::from(cell.to_string()))));
    let table = Table::new(rows, widths).header(header).block(block);
    frame.render_widget(table, area);
}

/// Text shown in place of the result table, if any.
fn result_placeholder_text(console: &Console) -> Option<&'static str> {
    match console.pager().result() {
        None if console.is_loading() => Some("running query..."),
        None => None,
        Some(result) if result.is_empty() => Some("no rows matched the given parameters"),
        Some(_) => None,
    }
}

/// The selected query's tab, or the browse cursor when nothing is selected.
fn highlighted_tab(console: &Console, view_data: &ViewData) -> usize {
    console
        .form()
        .selected()
        .and_then(|definition| catalog_index(definition.id))
        .unwrap_or(view_data.catalog_cursor)
}

fn catalog_labels(console: &Console, view_data: &ViewData) -> Vec<String> {
    let highlighted = highlighted_tab(console, view_data);
    CATALOG
        .iter()
        .enumerate()
        .map(|(index, definition)| {
            let marker = if index == view_data.catalog_cursor && index != highlighted {
                "> "
            } else {
                ""
            };
            format!("{marker}{} {}", definition.id, definition.title)
        })
        .collect()
}

fn login_text(login: &LoginUiState) -> String {
    let marker = |field: LoginField| if login.field == field { ">" } else { " " };
    format!(
        "{} user:     {}\n{} password: {}\n\nenter log in | tab switch field | esc quit",
        marker(LoginField::Username),
        login.username,
        marker(LoginField::Password),
        "*".repeat(login.password.chars().count()),
    )
}

fn exited_text() -> String {
    "The console was closed. Pick a query (1-9, 0, or enter) to start again, or press esc to quit."
        .to_owned()
}

fn form_panel_text(console: &Console, view_data: &ViewData) -> String {
    let form = console.form();
    let Some(definition) = form.selected() else {
        return "pick a query: left/right to browse, enter or 1-9/0 to select".to_owned();
    };

    let mut out = String::new();
    out.push_str(definition.title);
    out.push('\n');
    out.push_str(definition.description);
    out.push_str("\n\n");
    out.push_str(&form_fields_text(definition, console, view_data));

    out.push('\n');
    out.push_str(if console.is_loading() {
        "[ running... ]"
    } else {
        "[ run query ]"
    });
    if let Some(error) = form.error() {
        out.push_str("\nerror: ");
        out.push_str(error);
    }
    out
}

fn form_fields_text(definition: &QueryDefinition, console: &Console, view_data: &ViewData) -> String {
    if !definition.has_fields() {
        return "(no parameters)\n".to_owned();
    }

    let mut out = String::new();
    for (index, field) in definition.fields.iter().enumerate() {
        let focused = view_data.focus == Focus::Form && index == view_data.field_index;
        let marker = if focused { ">" } else { " " };
        let value = console.form().value(field.name);
        let shown = if value.is_empty() {
            format!("({})", field.placeholder)
        } else if focused {
            format!("{value}_")
        } else {
            value.to_owned()
        };
        out.push_str(&format!("{marker} {}: {shown}\n", field.label));
    }
    out
}

fn result_title(pager: &ResultPager) -> String {
    match pagination_caption(pager) {
        Some(caption) => format!("result | {caption}"),
        None => "result".to_owned(),
    }
}

fn pagination_caption(pager: &ResultPager) -> Option<String> {
    if !pager.needs_pagination() {
        return None;
    }
    let range = pager.range()?;
    Some(format!(
        "page {} of {} | rows {}-{} of {}",
        pager.page(),
        pager.total_pages(),
        range.first,
        range.last,
        range.total,
    ))
}

fn status_text(console: &Console, view_data: &ViewData) -> String {
    if let Some(status) = console.status_line() {
        return status.to_owned();
    }
    match (console.session_state(), view_data.focus) {
        (SessionState::LoggedOut, _) => "enter log in | esc quit".to_owned(),
        (SessionState::Exited, _) => "1-9/0 or enter re-enter | esc quit".to_owned(),
        (SessionState::Active, Focus::Catalog) => {
            "left/right browse | enter select | down form | [ ] page | ctrl-x exit".to_owned()
        }
        (SessionState::Active, Focus::Form) => {
            "type to edit | up/down field | enter run | pgup/pgdn page | esc catalog | ctrl-x exit"
                .to_owned()
        }
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
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
        .split(popup_layout[1])[1]
}
