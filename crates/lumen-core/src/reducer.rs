use tracing::debug;
use tracing::info;

use super::actions::GenerationReply;
use super::actions::RuntimeAction;
use super::actions::ShellAction;
use super::actions::ShellEffect;
use super::actions::UserAction;
use super::clock::Clock;
use super::maintenance::MaintenanceSettings;
use super::maintenance::MaintenanceStatus;
use super::maintenance::MaintenanceWindow;
use super::state::ChatRole;
use super::state::ChatTurn;
use super::state::GenerationKind;
use super::state::HistoryEntry;
use super::state::Notice;
use super::state::PendingGeneration;
use super::state::Route;
use super::state::ShellState;
use super::storage::KeyValueStore;
use super::tools::ToolId;
use super::tools::ToolRegistry;
use super::usage::UsageKind;
use super::usage::UsageLimiter;

/// The two state machines the shell consults, sharing one clock and one
/// backing store.
#[derive(Debug)]
pub struct Services<S, C> {
    pub usage: UsageLimiter<S, C>,
    pub maintenance: MaintenanceWindow<S, C>,
    clock: C,
}

impl<S: KeyValueStore + Clone, C: Clock + Clone> Services<S, C> {
    /// Each machine gets its own clone of `store`. `FileStore` clones share
    /// one file; `MemoryStore` clones are independent maps. The two machines
    /// write disjoint keys, so either way neither reads the other's state.
    pub fn mount(store: S, clock: C, settings: MaintenanceSettings) -> Self {
        Self {
            maintenance: MaintenanceWindow::mount(store.clone(), clock.clone(), settings),
            usage: UsageLimiter::mount(store, clock.clone()),
            clock,
        }
    }
}

impl<S, C: Clock> Services<S, C> {
    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }
}

pub fn reduce<S: KeyValueStore, C: Clock>(
    state: &mut ShellState,
    services: &mut Services<S, C>,
    action: ShellAction,
) -> Vec<ShellEffect> {
    match action {
        ShellAction::User(user) => reduce_user(state, services, user),
        ShellAction::Runtime(runtime) => reduce_runtime(state, services, runtime),
    }
}

fn reduce_user<S: KeyValueStore, C: Clock>(
    state: &mut ShellState,
    services: &mut Services<S, C>,
    action: UserAction,
) -> Vec<ShellEffect> {
    match action {
        UserAction::InputChar(ch) => {
            state.input.push(ch);
            vec![ShellEffect::RequestFrame]
        }
        UserAction::InputBackspace => {
            state.input.pop();
            vec![ShellEffect::RequestFrame]
        }
        UserAction::SubmitInput => {
            let input = state.input.clone();
            let effects = match state.active_route() {
                Route::Chat => submit(state, services, GenerationKind::Chat, input),
                Route::Tools => {
                    let tool = state.selected_tool;
                    submit(state, services, GenerationKind::Tool(tool), input)
                }
                Route::History | Route::Maintenance => return Vec::new(),
            };
            if effects
                .iter()
                .any(|effect| matches!(effect, ShellEffect::Generate { .. }))
            {
                state.input.clear();
            }
            effects
        }
        UserAction::SubmitChat(text) => submit(state, services, GenerationKind::Chat, text),
        UserAction::RunTool { tool, input } => {
            submit(state, services, GenerationKind::Tool(tool), input)
        }
        UserAction::SelectTool(tool) => {
            state.selected_tool = tool;
            vec![ShellEffect::RequestFrame]
        }
        UserAction::NextTool => {
            state.selected_tool = next_tool(state.selected_tool);
            vec![ShellEffect::RequestFrame]
        }
        UserAction::SelectRoute(route) => {
            if route == Route::Maintenance || state.maintenance.blocks_app() {
                return Vec::new();
            }
            state.route = route;
            vec![ShellEffect::RequestFrame]
        }
        UserAction::NextRoute => {
            if state.maintenance.blocks_app() {
                return Vec::new();
            }
            state.route = state.route.next();
            vec![ShellEffect::RequestFrame]
        }
        UserAction::ToggleFavorite(id) => match state.history.toggle_favorite(id) {
            Some(_) => vec![ShellEffect::RequestFrame],
            None => Vec::new(),
        },
        UserAction::DismissNotice => {
            state.notice = None;
            vec![ShellEffect::RequestFrame]
        }
        UserAction::Reload => {
            if state.maintenance == MaintenanceStatus::Complete {
                info!("reload requested after maintenance");
                vec![ShellEffect::Reload]
            } else {
                Vec::new()
            }
        }
    }
}

fn reduce_runtime<S: KeyValueStore, C: Clock>(
    state: &mut ShellState,
    services: &mut Services<S, C>,
    action: RuntimeAction,
) -> Vec<ShellEffect> {
    match action {
        RuntimeAction::Mount => {
            services.usage.check_reset();
            state.usage = services.usage.snapshot();
            state.maintenance = services.maintenance.check();
            vec![ShellEffect::RequestFrame]
        }
        RuntimeAction::UsageTick => {
            if services.usage.check_reset()
                && matches!(state.notice, Some(Notice::LimitReached(_)))
            {
                state.notice = None;
            }
            state.usage = services.usage.snapshot();
            vec![ShellEffect::RequestFrame]
        }
        RuntimeAction::MaintenanceTick => {
            let previous = state.maintenance;
            state.maintenance = services.maintenance.check();
            if previous != state.maintenance {
                debug!(
                    from = previous.label(),
                    to = state.maintenance.label(),
                    "maintenance status changed"
                );
            }
            vec![ShellEffect::RequestFrame]
        }
        RuntimeAction::EnableMaintenance => {
            state.maintenance = services.maintenance.enable_maintenance_mode();
            vec![ShellEffect::RequestFrame]
        }
        RuntimeAction::DisableMaintenance => {
            state.maintenance = services.maintenance.disable_maintenance_mode();
            vec![ShellEffect::RequestFrame]
        }
        RuntimeAction::GenerationFinished { request_id, reply } => {
            let Some(pending) = state.pending.take() else {
                return Vec::new();
            };
            if pending.request_id != request_id {
                state.pending = Some(pending);
                return Vec::new();
            }
            match (pending.kind, reply) {
                (GenerationKind::Chat, GenerationReply::Text(text)) => {
                    state.transcript.push(ChatTurn {
                        role: ChatRole::Assistant,
                        text,
                    });
                }
                (GenerationKind::Tool(tool), GenerationReply::Text(output)) => {
                    state.history.append(HistoryEntry {
                        id: 0,
                        tool,
                        input: pending.input,
                        output,
                        favorite: false,
                        created_at_ms: services.now_ms(),
                    });
                }
                (_, GenerationReply::Failed(reason)) => {
                    state.notice = Some(Notice::GenerationFailed(reason));
                }
            }
            vec![ShellEffect::RequestFrame]
        }
    }
}

/// Quota-gated submission. The guard runs first; the counter is only spent
/// once every other precondition has passed.
fn submit<S: KeyValueStore, C: Clock>(
    state: &mut ShellState,
    services: &mut Services<S, C>,
    kind: GenerationKind,
    input: String,
) -> Vec<ShellEffect> {
    let text = input.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if state.maintenance.blocks_app() {
        state.notice = Some(Notice::MaintenanceActive);
        return vec![ShellEffect::RequestFrame];
    }
    if state.pending.is_some() {
        state.notice = Some(Notice::Busy);
        return vec![ShellEffect::RequestFrame];
    }

    let usage_kind = match kind {
        GenerationKind::Chat => UsageKind::Chat,
        GenerationKind::Tool(_) => UsageKind::Tools,
    };
    services.usage.check_reset();
    let allowed = services.usage.can_use(usage_kind) && services.usage.try_consume(usage_kind);
    state.usage = services.usage.snapshot();
    if !allowed {
        state.notice = Some(Notice::LimitReached(usage_kind));
        return vec![ShellEffect::RequestFrame];
    }

    let prompt = match kind {
        GenerationKind::Chat => {
            state.transcript.push(ChatTurn {
                role: ChatRole::User,
                text: text.to_string(),
            });
            text.to_string()
        }
        GenerationKind::Tool(tool) => ToolRegistry::get(tool).build_prompt(text),
    };
    let request_id = state.next_request_id;
    state.next_request_id += 1;
    state.pending = Some(PendingGeneration {
        request_id,
        kind,
        input: text.to_string(),
    });
    state.notice = None;

    vec![
        ShellEffect::RequestFrame,
        ShellEffect::Generate {
            request_id,
            kind,
            prompt,
        },
    ]
}

fn next_tool(current: ToolId) -> ToolId {
    let tools = ToolRegistry::list();
    let idx = tools
        .iter()
        .position(|spec| spec.id == current)
        .unwrap_or(0);
    tools[(idx + 1) % tools.len()].id
}

#[cfg(test)]
mod tests;
