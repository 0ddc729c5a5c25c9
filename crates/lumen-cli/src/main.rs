mod logger;
mod runtime;
mod settings;
mod ui;

use std::env;

use lumen_core::actions::RuntimeAction;
use lumen_core::actions::ShellAction;
use lumen_core::actions::UserAction;
use lumen_core::clock::SystemClock;
use lumen_core::config::Config;
use lumen_core::maintenance::MaintenanceStatus;
use lumen_core::state::ChatRole;
use lumen_core::state::Notice;
use lumen_core::storage::FileStore;
use lumen_core::tools::ToolId;
use lumen_core::tools::ToolRegistry;
use lumen_core::usage::UsageKind;
use lumen_core::usage::UsageSnapshot;
use lumen_exec::executor::SimulatedExecutor;
use serde::Serialize;

use crate::logger::LogTarget;
use crate::runtime::Session;

type CliSession = Session<FileStore, SystemClock, SimulatedExecutor>;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = env::args().skip(1);
    let command = args.next().unwrap_or_else(|| "status".to_string());

    match command.as_str() {
        "--help" | "-h" | "help" => {
            print_help();
            return Ok(());
        }
        "--version" | "-V" | "version" => {
            println!("lumen {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    let config = settings::load_config()?;
    let data_dir = settings::data_dir(&config);
    let log_dir = data_dir.join("logs");
    let _log_guard = if command == "ui" {
        logger::init_logger(&config.log.level, LogTarget::File(&log_dir))
    } else {
        logger::init_logger(&config.log.level, LogTarget::Stderr)
    };
    let store = FileStore::open(&data_dir)
        .map_err(|err| format!("failed to open data dir {}: {err}", data_dir.display()))?;

    let rest: Vec<String> = args.collect();
    match command.as_str() {
        "status" => {
            let session = open_session(&config, store);
            if rest.iter().any(|arg| arg == "--json") {
                let report = StatusReport::from(&session);
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_status(&session);
            }
            Ok(())
        }
        "chat" => run_chat(&config, store, &rest),
        "tool" => run_tool(&config, store, &rest),
        "tools" => {
            for spec in ToolRegistry::list() {
                println!(
                    "{:<9} {:<18} {}",
                    spec.id.as_str(),
                    spec.title,
                    spec.description
                );
            }
            Ok(())
        }
        "maintenance" => run_maintenance(&config, store, rest.first().map(String::as_str)),
        "ui" => ui::run(&config, store),
        other => Err(format!("unknown command '{other}'; see `lumen --help`").into()),
    }
}

fn open_session(config: &Config, store: FileStore) -> CliSession {
    Session::mount(
        store,
        SystemClock,
        config.maintenance.settings(),
        SimulatedExecutor,
    )
}

fn run_chat(
    config: &Config,
    store: FileStore,
    words: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let message = words.join(" ");
    if message.trim().is_empty() {
        return Err("usage: lumen chat <message>".into());
    }
    let mut session = open_session(config, store);
    session.dispatch(ShellAction::User(UserAction::SubmitChat(message)));
    refuse_on_notice(&session)?;

    if let Some(reply) = session
        .state
        .transcript
        .iter()
        .rev()
        .find(|turn| turn.role == ChatRole::Assistant)
    {
        println!("{}", reply.text);
    }
    print_remaining(&session, UsageKind::Chat);
    Ok(())
}

fn run_tool(
    config: &Config,
    store: FileStore,
    args: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let Some((kind, words)) = args.split_first() else {
        return Err("usage: lumen tool <kind> <topic>".into());
    };
    let Some(tool) = ToolId::parse(kind) else {
        let known: Vec<&str> = ToolRegistry::list()
            .iter()
            .map(|spec| spec.id.as_str())
            .collect();
        return Err(format!(
            "unknown tool '{kind}'; expected one of: {}",
            known.join(", ")
        )
        .into());
    };
    let input = words.join(" ");
    if input.trim().is_empty() {
        return Err("usage: lumen tool <kind> <topic>".into());
    }

    let mut session = open_session(config, store);
    session.dispatch(ShellAction::User(UserAction::RunTool { tool, input }));
    refuse_on_notice(&session)?;

    if let Some(entry) = session.state.history.latest() {
        println!("{}", entry.output);
    }
    print_remaining(&session, UsageKind::Tools);
    Ok(())
}

fn run_maintenance(
    config: &Config,
    store: FileStore,
    sub: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = open_session(config, store);
    match sub.unwrap_or("status") {
        "status" => {}
        "enable" => {
            session.dispatch(ShellAction::Runtime(RuntimeAction::EnableMaintenance));
        }
        "disable" => {
            session.dispatch(ShellAction::Runtime(RuntimeAction::DisableMaintenance));
        }
        other => {
            return Err(format!(
                "unknown maintenance command '{other}'; expected status, enable or disable"
            )
            .into())
        }
    }
    println!("{}", maintenance_line(&session));
    Ok(())
}

/// Turns a refusal left by the last submission into a command error.
fn refuse_on_notice(session: &CliSession) -> Result<(), Box<dyn std::error::Error>> {
    match &session.state.notice {
        None => Ok(()),
        Some(Notice::MaintenanceActive) => Err(format!(
            "{} {}",
            Notice::MaintenanceActive.message(),
            maintenance_line(session)
        )
        .into()),
        Some(notice) => Err(notice.message().into()),
    }
}

fn maintenance_line(session: &CliSession) -> String {
    match session.state.maintenance {
        MaintenanceStatus::Inactive => "Maintenance: not active.".to_string(),
        MaintenanceStatus::CountingDown(countdown) => {
            let until = session
                .services
                .maintenance
                .ends_at()
                .map(|end| format!(" (until {})", end.format("%Y-%m-%d %H:%M:%S")))
                .unwrap_or_default();
            format!("Maintenance: back in {}{until}.", countdown.label())
        }
        MaintenanceStatus::Complete => {
            "Maintenance: complete. Run the command again to continue.".to_string()
        }
    }
}

#[derive(Debug, Serialize)]
struct StatusReport {
    maintenance: MaintenanceStatus,
    maintenance_ends_at: Option<String>,
    usage: UsageSnapshot,
    chat_remaining: u32,
    tools_remaining: u32,
}

impl From<&CliSession> for StatusReport {
    fn from(session: &CliSession) -> Self {
        let usage = session.state.usage;
        Self {
            maintenance: session.state.maintenance,
            maintenance_ends_at: session
                .services
                .maintenance
                .ends_at()
                .map(|end| end.to_rfc3339()),
            usage,
            chat_remaining: usage.remaining(UsageKind::Chat),
            tools_remaining: usage.remaining(UsageKind::Tools),
        }
    }
}

fn print_status(session: &CliSession) {
    let usage = session.state.usage;
    println!("{}", maintenance_line(session));
    println!(
        "Chat messages:    {}/{} used, {} left",
        usage.chat_used,
        usage.chat_limit,
        usage.remaining(UsageKind::Chat)
    );
    println!(
        "Tool generations: {}/{} used, {} left",
        usage.tools_used,
        usage.tools_limit,
        usage.remaining(UsageKind::Tools)
    );
    println!("Counters reset at local midnight after {}.", usage.date);
}

fn print_remaining(session: &CliSession, kind: UsageKind) {
    eprintln!(
        "({} {} left today)",
        session.state.usage.remaining(kind),
        kind.label()
    );
}

fn print_help() {
    println!(
        "lumen {}

AI content assistant with daily usage limits and a maintenance window.

USAGE:
    lumen [COMMAND]

COMMANDS:
    status [--json]                Show usage counters and maintenance state (default)
    chat <message>                 Send one chat message
    tool <kind> <topic>            Run a creator tool (caption, hashtags, script, bio, ideas)
    tools                          List the creator tools
    maintenance [status|enable|disable]
                                   Inspect or control the maintenance window
    ui                             Open the terminal interface
    help, --help, -h               Show this help
    version, --version, -V         Show the version

CONFIG:
    {} overrides the config file path (default: <config dir>/lumen/config.toml).
    RUST_LOG overrides the configured log level.",
        env!("CARGO_PKG_VERSION"),
        settings::CONFIG_ENV
    );
}
