//! readonly-bash-hook
//!
//! A permission-decision hook for an agentic coding assistant: reads one
//! hook-protocol JSON document from stdin describing a pending `Bash` tool
//! call, decides whether the command is obviously read-only, and either
//! auto-approves it or falls through to the host's normal permission
//! prompt. Never hard-denies — the worst this hook ever does is stay
//! quiet and let something else decide.

mod config;
mod error;
mod fragment;
mod handlers;
mod logging;
mod orchestrator;
mod parser;
mod pipeline;
mod protocol;

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use config::EffectiveConfig;
use fragment::HookDecision;
use logging::{DebugLog, Verbosity};
use protocol::HookInput;

#[derive(Parser)]
#[command(name = "readonly-bash-hook")]
#[command(about = "Auto-approves obviously read-only bash commands", long_about = None)]
#[command(version)]
struct Cli {
    /// Override the settings.json path instead of searching the usual
    /// project/user locations. Intended for tests and manual debugging.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut raw = String::new();
    if io::stdin().read_to_string(&mut raw).is_err() {
        // Can't even read the request; stay silent and let the host decide.
        return ExitCode::SUCCESS;
    }

    let decision = run(&raw, cli.config.as_deref());

    match decision {
        Some((input, HookDecision::Approve)) => {
            if let Some(output) = protocol::render_decision(&input, HookDecision::Approve) {
                // A broken stdout pipe is not this hook's problem to solve.
                let _ = writeln!(io::stdout(), "{output}");
            }
        }
        _ => {
            // Fallthrough, or any internal error collapsed to fallthrough:
            // empty stdout, exit 0.
        }
    }

    ExitCode::SUCCESS
}

fn run(raw: &str, config_override: Option<&std::path::Path>) -> Option<(HookInput, HookDecision)> {
    let (input, command) = HookInput::parse_command(raw).ok()?;

    let config = match config_override {
        Some(path) => EffectiveConfig::load_from(path),
        None => EffectiveConfig::load(),
    };

    let log = DebugLog::new(Verbosity::from_env());
    let decision = orchestrator::decide(&command, &config, &log);
    Some((input, decision))
}
