use std::collections::VecDeque;

use lumen_core::actions::RuntimeAction;
use lumen_core::actions::ShellAction;
use lumen_core::actions::ShellEffect;
use lumen_core::clock::Clock;
use lumen_core::maintenance::MaintenanceSettings;
use lumen_core::reducer::reduce;
use lumen_core::reducer::Services;
use lumen_core::state::ShellState;
use lumen_core::storage::KeyValueStore;
use lumen_exec::contracts::GenerationRequest;
use lumen_exec::executor::GenerationExecutor;
use tracing::debug;

/// Shell state plus the services and executor its effects run against.
pub struct Session<S, C, E> {
    pub state: ShellState,
    pub services: Services<S, C>,
    executor: E,
}

impl<S, C, E> Session<S, C, E>
where
    S: KeyValueStore + Clone,
    C: Clock + Clone,
    E: GenerationExecutor,
{
    /// Fresh state, both state machines mounted against `store`.
    pub fn mount(store: S, clock: C, settings: MaintenanceSettings, executor: E) -> Self {
        let state = ShellState::new(clock.today());
        let services = Services::mount(store, clock, settings);
        let mut session = Self {
            state,
            services,
            executor,
        };
        session.dispatch(ShellAction::Runtime(RuntimeAction::Mount));
        session
    }
}

impl<S, C, E> Session<S, C, E>
where
    S: KeyValueStore,
    C: Clock,
    E: GenerationExecutor,
{
    /// Runs `action` and every follow-up it causes. Generation effects are
    /// executed inline and their results fed back as runtime actions.
    /// Returns `true` when a reload was requested.
    pub fn dispatch(&mut self, action: ShellAction) -> bool {
        let mut reload = false;
        let mut queue = VecDeque::from([action]);
        while let Some(action) = queue.pop_front() {
            for effect in reduce(&mut self.state, &mut self.services, action) {
                match effect {
                    ShellEffect::RequestFrame => {}
                    ShellEffect::Generate {
                        request_id,
                        kind,
                        prompt,
                    } => {
                        let outcome = self.executor.execute(GenerationRequest {
                            request_id,
                            kind,
                            prompt,
                        });
                        for line in &outcome.logs {
                            debug!(executor = self.executor.name(), "{line}");
                        }
                        queue.push_back(ShellAction::Runtime(
                            RuntimeAction::GenerationFinished {
                                request_id,
                                reply: outcome.into_reply(),
                            },
                        ));
                    }
                    ShellEffect::Reload => reload = true,
                }
            }
        }
        if let Some(notice) = &self.state.notice {
            debug!(notice = %notice.message(), "shell notice");
        }
        reload
    }
}
