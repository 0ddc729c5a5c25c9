use std::io;
use std::time::Duration;
use std::time::Instant;

use chrono::DateTime;
use chrono::Local;
use chrono::Utc;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap};
use ratatui::Terminal;
use tracing::info;

use lumen_core::actions::{RuntimeAction, ShellAction, UserAction};
use lumen_core::clock::SystemClock;
use lumen_core::config::Config;
use lumen_core::maintenance::MaintenanceStatus;
use lumen_core::state::{ChatRole, HistoryEntry, Route, ShellState};
use lumen_core::storage::FileStore;
use lumen_core::ticker::Ticker;
use lumen_core::tools::{ToolId, ToolRegistry};
use lumen_core::usage::UsageKind;
use lumen_exec::executor::SimulatedExecutor;

use crate::runtime::Session;

type AppSession = Session<FileStore, SystemClock, SimulatedExecutor>;

/// Upper bound on how long the loop sleeps waiting for input.
const FRAME_BUDGET: Duration = Duration::from_millis(250);

const ROUTE_TABS: [Route; 3] = [Route::Chat, Route::Tools, Route::History];

struct TuiGuard;

impl Drop for TuiGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
    }
}

pub fn run(config: &Config, store: FileStore) -> Result<(), Box<dyn std::error::Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, crossterm::cursor::Hide)?;
    let _guard = TuiGuard;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    run_app(&mut terminal, config, store).map_err(|e| e.into())
}

/// Selection state that only the terminal cares about.
#[derive(Debug, Default)]
struct ViewState {
    /// Index into the history list, newest first.
    history_selected: usize,
}

enum KeyOutcome {
    Ignored,
    Quit,
    View,
    Dispatch(ShellAction),
}

struct Tickers {
    usage: Ticker,
    countdown: Ticker,
}

impl Tickers {
    fn new(config: &Config) -> Self {
        Self {
            usage: Ticker::new(config.ticks.usage()),
            countdown: Ticker::new(config.ticks.countdown()),
        }
    }

    fn until_next(&self, now: Instant) -> Duration {
        self.usage
            .until_next(now)
            .min(self.countdown.until_next(now))
            .min(FRAME_BUDGET)
    }
}

fn mount(config: &Config, store: &FileStore) -> AppSession {
    Session::mount(
        store.clone(),
        SystemClock,
        config.maintenance.settings(),
        SimulatedExecutor,
    )
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    config: &Config,
    store: FileStore,
) -> io::Result<()> {
    let mut session = mount(config, &store);
    let mut tickers = Tickers::new(config);
    let mut view = ViewState::default();

    loop {
        let now = Instant::now();
        if tickers.usage.poll(now) {
            session.dispatch(ShellAction::Runtime(RuntimeAction::UsageTick));
        }
        if tickers.countdown.poll(now) {
            session.dispatch(ShellAction::Runtime(RuntimeAction::MaintenanceTick));
        }

        terminal.draw(|f| ui(f, &session.state, &view))?;

        if !event::poll(tickers.until_next(Instant::now()))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match handle_key(key, &session.state, &mut view) {
            KeyOutcome::Quit => return Ok(()),
            KeyOutcome::Ignored | KeyOutcome::View => {}
            KeyOutcome::Dispatch(action) => {
                if session.dispatch(action) {
                    info!("reloading shell");
                    session = mount(config, &store);
                    tickers = Tickers::new(config);
                    view = ViewState::default();
                }
            }
        }
    }
}

fn handle_key(key: KeyEvent, state: &ShellState, view: &mut ViewState) -> KeyOutcome {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return KeyOutcome::Quit;
    }
    if key.code == KeyCode::Esc {
        return if state.notice.is_some() {
            KeyOutcome::Dispatch(ShellAction::User(UserAction::DismissNotice))
        } else {
            KeyOutcome::Quit
        };
    }
    if key.code == KeyCode::Tab {
        return KeyOutcome::Dispatch(ShellAction::User(UserAction::NextRoute));
    }

    match state.active_route() {
        Route::Maintenance => match key.code {
            KeyCode::Char('q') => KeyOutcome::Quit,
            KeyCode::Char('r') => KeyOutcome::Dispatch(ShellAction::User(UserAction::Reload)),
            _ => KeyOutcome::Ignored,
        },
        Route::History => handle_history_keys(key, state, view),
        Route::Chat | Route::Tools => {
            let action = match key.code {
                KeyCode::Enter => UserAction::SubmitInput,
                KeyCode::Backspace => UserAction::InputBackspace,
                KeyCode::Down if state.active_route() == Route::Tools => UserAction::NextTool,
                KeyCode::Up if state.active_route() == Route::Tools => {
                    UserAction::SelectTool(previous_tool(state.selected_tool))
                }
                KeyCode::Char(ch) => UserAction::InputChar(ch),
                _ => return KeyOutcome::Ignored,
            };
            KeyOutcome::Dispatch(ShellAction::User(action))
        }
    }
}

fn handle_history_keys(key: KeyEvent, state: &ShellState, view: &mut ViewState) -> KeyOutcome {
    let len = state.history.len();
    match key.code {
        KeyCode::Char('q') => KeyOutcome::Quit,
        KeyCode::Down | KeyCode::Char('j') => {
            if len > 0 {
                view.history_selected = (view.history_selected + 1).min(len - 1);
            }
            KeyOutcome::View
        }
        KeyCode::Up | KeyCode::Char('k') => {
            view.history_selected = view.history_selected.saturating_sub(1);
            KeyOutcome::View
        }
        KeyCode::Char('f') | KeyCode::Enter => match selected_entry(state, view) {
            Some(entry) => {
                KeyOutcome::Dispatch(ShellAction::User(UserAction::ToggleFavorite(entry.id)))
            }
            None => KeyOutcome::Ignored,
        },
        _ => KeyOutcome::Ignored,
    }
}

fn previous_tool(current: ToolId) -> ToolId {
    let tools = ToolRegistry::list();
    let idx = tools
        .iter()
        .position(|spec| spec.id == current)
        .unwrap_or(0);
    tools[(idx + tools.len() - 1) % tools.len()].id
}

fn history_newest_first(state: &ShellState) -> Vec<&HistoryEntry> {
    state.history.iter().rev().collect()
}

fn selected_entry<'a>(state: &'a ShellState, view: &ViewState) -> Option<&'a HistoryEntry> {
    let entries = history_newest_first(state);
    let idx = view.history_selected.min(entries.len().saturating_sub(1));
    entries.get(idx).copied()
}

#[derive(Clone, Copy)]
struct UiPalette {
    accent: Color,
    success: Color,
    warning: Color,
    danger: Color,
    muted: Color,
    border: Color,
    selected_bg: Color,
}

const PALETTE: UiPalette = UiPalette {
    accent: Color::Cyan,
    success: Color::Green,
    warning: Color::Yellow,
    danger: Color::Red,
    muted: Color::DarkGray,
    border: Color::Gray,
    selected_bg: Color::DarkGray,
};

fn panel(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(PALETTE.border))
        .title(title)
}

fn ui(f: &mut ratatui::Frame, state: &ShellState, view: &ViewState) {
    if state.active_route() == Route::Maintenance {
        render_maintenance(f, f.area(), state.maintenance);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(3), // Tabs
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Input
            Constraint::Length(1), // Footer
        ])
        .split(f.area());

    render_header(f, chunks[0], state);

    let titles: Vec<&str> = ROUTE_TABS.iter().map(|route| route.label()).collect();
    let selected = ROUTE_TABS
        .iter()
        .position(|route| *route == state.route)
        .unwrap_or(0);
    let tabs = Tabs::new(titles)
        .select(selected)
        .block(panel("Views"))
        .highlight_style(
            Style::default()
                .fg(PALETTE.accent)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(tabs, chunks[1]);

    match state.route {
        Route::Chat | Route::Maintenance => render_chat(f, chunks[2], state),
        Route::Tools => render_tools(f, chunks[2], state),
        Route::History => render_history(f, chunks[2], state, view),
    }

    render_input(f, chunks[3], state);
    render_footer(f, chunks[4], state);
}

fn render_header(f: &mut ratatui::Frame, area: Rect, state: &ShellState) {
    let usage = state.usage;
    let counter = |kind: UsageKind, used: u32, limit: u32| {
        let color = if usage.remaining(kind) == 0 {
            PALETTE.danger
        } else {
            PALETTE.accent
        };
        Span::styled(format!("{used}/{limit}"), Style::default().fg(color))
    };
    let line = Line::from(vec![
        Span::styled(
            "Lumen",
            Style::default()
                .fg(PALETTE.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(" | Chat ", Style::default().fg(PALETTE.muted)),
        counter(UsageKind::Chat, usage.chat_used, usage.chat_limit),
        Span::styled(" | Tools ", Style::default().fg(PALETTE.muted)),
        counter(UsageKind::Tools, usage.tools_used, usage.tools_limit),
        Span::styled(
            format!(" | resets after {}", usage.date),
            Style::default().fg(PALETTE.muted),
        ),
    ]);
    f.render_widget(Paragraph::new(line).block(panel("Daily usage")), area);
}

fn render_chat(f: &mut ratatui::Frame, area: Rect, state: &ShellState) {
    let mut lines: Vec<Line<'static>> = Vec::new();
    for turn in &state.transcript {
        let (who, color) = match turn.role {
            ChatRole::User => ("You", PALETTE.accent),
            ChatRole::Assistant => ("Lumen", PALETTE.success),
        };
        lines.push(Line::from(Span::styled(
            who,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));
        for text_line in turn.text.lines() {
            lines.push(Line::from(format!("  {text_line}")));
        }
        lines.push(Line::default());
    }
    if state.pending.is_some() {
        lines.push(Line::from(Span::styled(
            "Lumen is thinking...",
            Style::default().fg(PALETTE.muted),
        )));
    }
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            format!(
                "Ask anything about growing your audience. {} messages left today.",
                state.usage.remaining(UsageKind::Chat)
            ),
            Style::default().fg(PALETTE.muted),
        )));
    }

    let inner_width = area.width.saturating_sub(2);
    let visible = usize::from(area.height.saturating_sub(2));
    let chat = Paragraph::new(lines).wrap(Wrap { trim: false });
    let overflow = chat.line_count(inner_width).saturating_sub(visible);
    let scroll = u16::try_from(overflow).unwrap_or(u16::MAX);
    f.render_widget(chat.block(panel("Chat")).scroll((scroll, 0)), area);
}

fn render_tools(f: &mut ratatui::Frame, area: Rect, state: &ShellState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(24), Constraint::Min(0)])
        .split(area);

    let items: Vec<ListItem> = ToolRegistry::list()
        .iter()
        .map(|spec| ListItem::new(spec.title))
        .collect();
    let selected = ToolRegistry::list()
        .iter()
        .position(|spec| spec.id == state.selected_tool);
    let mut list_state = ListState::default().with_selected(selected);
    let list = List::new(items)
        .block(panel("Tools"))
        .highlight_style(
            Style::default()
                .bg(PALETTE.selected_bg)
                .fg(PALETTE.accent),
        )
        .highlight_symbol("> ");
    f.render_stateful_widget(list, columns[0], &mut list_state);

    let spec = ToolRegistry::get(state.selected_tool);
    let mut lines = vec![
        Line::from(Span::styled(
            spec.description,
            Style::default().fg(PALETTE.muted),
        )),
        Line::from(Span::styled(
            format!(
                "{} generations left today",
                state.usage.remaining(UsageKind::Tools)
            ),
            Style::default().fg(PALETTE.muted),
        )),
        Line::default(),
    ];
    if state.pending.is_some() {
        lines.push(Line::from("Generating..."));
    } else if let Some(entry) = state
        .history
        .iter()
        .rev()
        .find(|entry| entry.tool == state.selected_tool)
    {
        lines.push(Line::from(Span::styled(
            format!("Latest for \"{}\"", entry.input),
            Style::default().fg(PALETTE.success),
        )));
        lines.extend(entry.output.lines().map(|line| Line::from(line.to_string())));
    } else {
        lines.push(Line::from("Type a topic below and press Enter."));
    }
    let detail = Paragraph::new(lines)
        .block(panel(spec.title))
        .wrap(Wrap { trim: false });
    f.render_widget(detail, columns[1]);
}

fn render_history(f: &mut ratatui::Frame, area: Rect, state: &ShellState, view: &ViewState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let entries = history_newest_first(state);
    let items: Vec<ListItem> = entries
        .iter()
        .map(|entry| {
            let star = if entry.favorite { "*" } else { " " };
            ListItem::new(format!(
                "{star} {} {:<9} {}",
                created_label(entry.created_at_ms),
                entry.tool.as_str(),
                entry.input
            ))
        })
        .collect();
    let title = format!(
        "History ({}, {} favorites)",
        entries.len(),
        state.history.favorites().count()
    );
    let selected = (!entries.is_empty())
        .then(|| view.history_selected.min(entries.len() - 1));
    let mut list_state = ListState::default().with_selected(selected);
    let list = List::new(items)
        .block(panel(&title))
        .highlight_style(Style::default().bg(PALETTE.selected_bg))
        .highlight_symbol("> ");
    f.render_stateful_widget(list, rows[0], &mut list_state);

    let detail = match selected_entry(state, view) {
        Some(entry) => Paragraph::new(entry.output.as_str()),
        None => Paragraph::new("Nothing generated yet this session.")
            .style(Style::default().fg(PALETTE.muted)),
    };
    f.render_widget(
        detail.block(panel("Output")).wrap(Wrap { trim: false }),
        rows[1],
    );
}

fn created_label(created_at_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(created_at_ms)
        .map(|at| at.with_timezone(&Local).format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}

fn render_input(f: &mut ratatui::Frame, area: Rect, state: &ShellState) {
    let (title, enabled) = match state.route {
        Route::Chat => ("Message".to_string(), true),
        Route::Tools => (
            format!("Topic for {}", ToolRegistry::get(state.selected_tool).title),
            true,
        ),
        Route::History | Route::Maintenance => ("Input".to_string(), false),
    };
    let text = if enabled {
        Line::from(vec![
            Span::raw(state.input.clone()),
            Span::styled("_", Style::default().fg(PALETTE.accent)),
        ])
    } else {
        Line::from(Span::styled(
            "f toggles favorite, arrows move",
            Style::default().fg(PALETTE.muted),
        ))
    };
    f.render_widget(Paragraph::new(text).block(panel(&title)), area);
}

fn render_footer(f: &mut ratatui::Frame, area: Rect, state: &ShellState) {
    let line = match &state.notice {
        Some(notice) => Line::from(vec![
            Span::styled(notice.message(), Style::default().fg(PALETTE.warning)),
            Span::styled("  (Esc to dismiss)", Style::default().fg(PALETTE.muted)),
        ]),
        None => Line::from(vec![
            Span::styled("Tab", Style::default().fg(PALETTE.accent)),
            Span::styled(" switch view ", Style::default().fg(PALETTE.muted)),
            Span::styled("Enter", Style::default().fg(PALETTE.accent)),
            Span::styled(" send ", Style::default().fg(PALETTE.muted)),
            Span::styled("Esc", Style::default().fg(PALETTE.warning)),
            Span::styled(" quit", Style::default().fg(PALETTE.muted)),
        ]),
    };
    f.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
}

fn render_maintenance(f: &mut ratatui::Frame, area: Rect, status: MaintenanceStatus) {
    let bold = Style::default()
        .fg(PALETTE.accent)
        .add_modifier(Modifier::BOLD);
    let muted = Style::default().fg(PALETTE.muted);
    let lines = match status {
        MaintenanceStatus::CountingDown(countdown) => vec![
            Line::from(Span::styled("Lumen is down for maintenance", bold)),
            Line::default(),
            Line::from("We're making things better. Back in"),
            Line::from(Span::styled(
                countdown.label(),
                bold.fg(PALETTE.warning),
            )),
            Line::default(),
            Line::from(Span::styled("q quit", muted)),
        ],
        MaintenanceStatus::Complete => vec![
            Line::from(Span::styled("Maintenance complete", bold.fg(PALETTE.success))),
            Line::default(),
            Line::from("Press r to reload."),
            Line::default(),
            Line::from(Span::styled("q quit", muted)),
        ],
        MaintenanceStatus::Inactive => Vec::new(),
    };
    let popup = centered_rect(60, 40, area);
    f.render_widget(Clear, popup);
    f.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(panel("Maintenance"))
            .wrap(Wrap { trim: true }),
        popup,
    );
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
