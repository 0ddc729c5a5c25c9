use pretty_assertions::assert_eq;

pub(super) use super::reduce;
pub(super) use super::Services;
pub(super) use crate::actions::GenerationReply;
pub(super) use crate::actions::RuntimeAction;
pub(super) use crate::actions::ShellAction;
pub(super) use crate::actions::ShellEffect;
pub(super) use crate::actions::UserAction;
pub(super) use crate::clock::Clock;
pub(super) use crate::clock::ManualClock;
pub(super) use crate::maintenance::MaintenanceSettings;
pub(super) use crate::maintenance::MaintenanceStatus;
pub(super) use crate::state::ChatRole;
pub(super) use crate::state::GenerationKind;
pub(super) use crate::state::Notice;
pub(super) use crate::state::Route;
pub(super) use crate::state::ShellState;
pub(super) use crate::storage::MemoryStore;
pub(super) use crate::tools::ToolId;
pub(super) use crate::usage::UsageKind;
pub(super) use crate::usage::CHAT_LIMIT;
pub(super) use crate::usage::TOOLS_LIMIT;

mod quota_gating;

type TestServices<'a> = Services<MemoryStore, &'a ManualClock>;

fn clock() -> ManualClock {
    ManualClock::at("2024-01-01T20:00:00+01:00").expect("clock")
}

/// Shell with maintenance switched off so quota paths are reachable.
fn mounted(clock: &ManualClock) -> (ShellState, TestServices<'_>) {
    let settings = MaintenanceSettings {
        enabled: false,
        ..MaintenanceSettings::default()
    };
    mounted_with(clock, settings)
}

fn mounted_with(
    clock: &ManualClock,
    settings: MaintenanceSettings,
) -> (ShellState, TestServices<'_>) {
    let mut state = ShellState::new(clock.today());
    let mut services = Services::mount(MemoryStore::new(), clock, settings);
    let effects = reduce(
        &mut state,
        &mut services,
        ShellAction::Runtime(RuntimeAction::Mount),
    );
    assert_eq!(effects, vec![ShellEffect::RequestFrame]);
    (state, services)
}

fn user(
    state: &mut ShellState,
    services: &mut TestServices<'_>,
    action: UserAction,
) -> Vec<ShellEffect> {
    reduce(state, services, ShellAction::User(action))
}

fn runtime(
    state: &mut ShellState,
    services: &mut TestServices<'_>,
    action: RuntimeAction,
) -> Vec<ShellEffect> {
    reduce(state, services, ShellAction::Runtime(action))
}

fn generated(effects: &[ShellEffect]) -> Option<(u64, GenerationKind, String)> {
    effects.iter().find_map(|effect| match effect {
        ShellEffect::Generate {
            request_id,
            kind,
            prompt,
        } => Some((*request_id, *kind, prompt.clone())),
        _ => None,
    })
}

/// Submits a chat message and immediately answers it.
fn chat_round_trip(
    state: &mut ShellState,
    services: &mut TestServices<'_>,
    text: &str,
) -> bool {
    let effects = user(state, services, UserAction::SubmitChat(text.to_string()));
    let Some((request_id, _, _)) = generated(&effects) else {
        return false;
    };
    runtime(
        state,
        services,
        RuntimeAction::GenerationFinished {
            request_id,
            reply: GenerationReply::Text(format!("re: {text}")),
        },
    );
    true
}
