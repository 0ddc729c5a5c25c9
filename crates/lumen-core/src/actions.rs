use super::state::GenerationKind;
use super::state::Route;
use super::tools::ToolId;

#[derive(Debug, Clone)]
pub enum ShellAction {
    User(UserAction),
    Runtime(RuntimeAction),
}

#[derive(Debug, Clone)]
pub enum UserAction {
    InputChar(char),
    InputBackspace,
    /// Sends the input buffer to the active route.
    SubmitInput,
    SubmitChat(String),
    RunTool {
        tool: ToolId,
        input: String,
    },
    SelectTool(ToolId),
    NextTool,
    SelectRoute(Route),
    NextRoute,
    ToggleFavorite(u64),
    DismissNotice,
    /// Only honoured once a maintenance window has completed.
    Reload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationReply {
    Text(String),
    Failed(String),
}

#[derive(Debug, Clone)]
pub enum RuntimeAction {
    Mount,
    UsageTick,
    MaintenanceTick,
    EnableMaintenance,
    DisableMaintenance,
    GenerationFinished {
        request_id: u64,
        reply: GenerationReply,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellEffect {
    RequestFrame,
    Generate {
        request_id: u64,
        kind: GenerationKind,
        prompt: String,
    },
    Reload,
}
