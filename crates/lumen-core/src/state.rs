use std::collections::VecDeque;

use chrono::NaiveDate;
use serde::Serialize;

use crate::maintenance::MaintenanceStatus;
use crate::tools::ToolId;
use crate::usage::UsageKind;
use crate::usage::UsageSnapshot;
use crate::usage::CHAT_LIMIT;
use crate::usage::TOOLS_LIMIT;

pub const HISTORY_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Maintenance,
    Chat,
    Tools,
    History,
}

impl Route {
    /// Cycles through the routes a user can pick. Maintenance is never picked.
    pub fn next(self) -> Self {
        match self {
            Self::Maintenance | Self::History => Self::Chat,
            Self::Chat => Self::Tools,
            Self::Tools => Self::History,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Maintenance => "Maintenance",
            Self::Chat => "Chat",
            Self::Tools => "Tools",
            Self::History => "History",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "tool", rename_all = "snake_case")]
pub enum GenerationKind {
    Chat,
    Tool(ToolId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingGeneration {
    pub request_id: u64,
    pub kind: GenerationKind,
    pub input: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub id: u64,
    pub tool: ToolId,
    pub input: String,
    pub output: String,
    pub favorite: bool,
    pub created_at_ms: i64,
}

/// Recent tool generations, oldest evicted first.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    cap: usize,
    next_id: u64,
    buf: VecDeque<HistoryEntry>,
}

impl HistoryBuffer {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            next_id: 1,
            buf: VecDeque::with_capacity(cap),
        }
    }

    pub fn append(&mut self, mut entry: HistoryEntry) -> u64 {
        entry.id = self.next_id;
        self.next_id += 1;

        if self.buf.len() == self.cap {
            self.buf.pop_front();
        }
        let id = entry.id;
        self.buf.push_back(entry);
        id
    }

    /// Returns the new flag, or `None` if the entry has been evicted.
    pub fn toggle_favorite(&mut self, id: u64) -> Option<bool> {
        let entry = self.buf.iter_mut().find(|entry| entry.id == id)?;
        entry.favorite = !entry.favorite;
        Some(entry.favorite)
    }

    pub fn favorites(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.buf.iter().filter(|entry| entry.favorite)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> {
        self.buf.iter()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.buf.back()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    LimitReached(UsageKind),
    MaintenanceActive,
    Busy,
    GenerationFailed(String),
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Self::LimitReached(kind) => format!(
                "Daily limit reached: {} {} used. Come back tomorrow.",
                kind.limit(),
                kind.label()
            ),
            Self::MaintenanceActive => "The app is under maintenance.".to_string(),
            Self::Busy => "Still working on the previous request.".to_string(),
            Self::GenerationFailed(reason) => format!("Generation failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShellState {
    /// Route the user picked; maintenance overrides it while active.
    pub route: Route,
    pub maintenance: MaintenanceStatus,
    pub usage: UsageSnapshot,
    pub transcript: Vec<ChatTurn>,
    pub selected_tool: ToolId,
    pub input: String,
    pub history: HistoryBuffer,
    pub notice: Option<Notice>,
    pub pending: Option<PendingGeneration>,
    pub next_request_id: u64,
}

impl ShellState {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            route: Route::Chat,
            maintenance: MaintenanceStatus::Inactive,
            usage: UsageSnapshot {
                date: today,
                chat_used: 0,
                chat_limit: CHAT_LIMIT,
                tools_used: 0,
                tools_limit: TOOLS_LIMIT,
            },
            transcript: Vec::new(),
            selected_tool: ToolId::Caption,
            input: String::new(),
            history: HistoryBuffer::default(),
            notice: None,
            pending: None,
            next_request_id: 1,
        }
    }

    /// The route to render. Nothing but the maintenance screen shows while a
    /// window is counting down or just completed.
    pub fn active_route(&self) -> Route {
        if self.maintenance.blocks_app() {
            Route::Maintenance
        } else {
            self.route
        }
    }
}
