//! Adversarial code-refinement loop CLI.
//!
//! Runs a Creator/Reviewer/Critic triad of stateless CLI agents through a
//! fixed number of review → critique → revision cycles, prints progress to
//! stderr, and writes a JSON transcript per session.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use triad::core::session::RoleAssignment;
use triad::core::types::ToolKey;
use triad::exit_codes;
use triad::io::config::load_config;
use triad::io::invoker::CliInvoker;
use triad::io::transcript::save_transcript;
use triad::logging;
use triad::orchestrator::{LoopEvent, RunSettings, run_session};

#[derive(Parser)]
#[command(
    name = "triad",
    version,
    about = "Creator/Reviewer/Critic feedback loop over CLI coding agents"
)]
struct Cli {
    /// The coding task to solve.
    task: String,

    /// Tool for the creator role (overrides config).
    #[arg(long, value_enum)]
    creator: Option<ToolKey>,

    /// Tool for the reviewer role (overrides config).
    #[arg(long, value_enum)]
    reviewer: Option<ToolKey>,

    /// Tool for the critic role (overrides config).
    #[arg(long, value_enum)]
    critic: Option<ToolKey>,

    /// Number of review → critique → revise cycles.
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u32).range(1..))]
    iterations: Option<u32>,

    /// Per-agent-call timeout in seconds.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Write the final code to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip writing the session transcript.
    #[arg(long)]
    no_save: bool,

    /// Directory for session transcripts (overrides config).
    #[arg(long)]
    sessions_dir: Option<PathBuf>,

    /// Path to the config file.
    #[arg(long, default_value = "triad.toml")]
    config: PathBuf,
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(exit_codes::INVALID);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    let roles = RoleAssignment {
        creator: cli.creator.unwrap_or(cfg.creator),
        reviewer: cli.reviewer.unwrap_or(cfg.reviewer),
        critic: cli.critic.unwrap_or(cfg.critic),
    };
    let settings = RunSettings {
        roles,
        cycles: cli.iterations.unwrap_or(cfg.iterations),
        call_timeout: Duration::from_secs(cli.timeout.unwrap_or(cfg.timeout_secs)),
    };
    let sessions_dir = cli.sessions_dir.unwrap_or(cfg.sessions_dir);

    let invoker = CliInvoker::new(cfg.output_limit_bytes);
    let report = run_session(&cli.task, &settings, &invoker, print_event)?;

    if !cli.no_save {
        let path = save_transcript(&sessions_dir, &report.session)?;
        eprintln!("transcript: {}", path.display());
    }

    if let Some(failure) = report.failure {
        return Err(anyhow::Error::new(failure).context("run aborted"));
    }

    let final_code = report
        .session
        .final_code()
        .context("run completed without producing code")?;
    match cli.output {
        Some(path) => {
            fs::write(&path, format!("{final_code}\n"))
                .with_context(|| format!("write {}", path.display()))?;
            eprintln!("final code: {}", path.display());
        }
        None => println!("{final_code}"),
    }
    Ok(())
}

/// Progress reporting on stderr; stdout is reserved for the final code.
fn print_event(event: &LoopEvent) {
    match event {
        LoopEvent::StepStarted { phase, role, tool } => {
            eprintln!("[{phase}] {role} ({tool}) ...");
        }
        LoopEvent::StepCompleted {
            phase,
            role,
            tool,
            output,
        } => {
            eprintln!("[{phase}] {role} ({tool}) done, {} bytes", output.len());
        }
        LoopEvent::CycleCompleted { index, planned } => {
            eprintln!("=== cycle {index}/{planned} complete ===");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal() {
        let cli = Cli::parse_from(["triad", "write a parser"]);
        assert_eq!(cli.task, "write a parser");
        assert!(cli.creator.is_none());
        assert!(!cli.no_save);
        assert_eq!(cli.config, PathBuf::from("triad.toml"));
    }

    #[test]
    fn parse_role_overrides() {
        let cli = Cli::parse_from([
            "triad",
            "task",
            "--creator",
            "gemini",
            "--reviewer",
            "claude",
            "--critic",
            "codex",
            "-n",
            "3",
            "--timeout",
            "60",
        ]);
        assert_eq!(cli.creator, Some(ToolKey::Gemini));
        assert_eq!(cli.reviewer, Some(ToolKey::Claude));
        assert_eq!(cli.critic, Some(ToolKey::Codex));
        assert_eq!(cli.iterations, Some(3));
        assert_eq!(cli.timeout, Some(60));
    }

    #[test]
    fn rejects_zero_iterations() {
        assert!(Cli::try_parse_from(["triad", "task", "-n", "0"]).is_err());
    }

    #[test]
    fn rejects_unknown_tool() {
        assert!(Cli::try_parse_from(["triad", "task", "--creator", "cursor"]).is_err());
    }
}
