//! The feedback-loop state machine.
//!
//! Drives phase 0 (initial generation) followed by N repair cycles of
//! review → critique → revision:
//!
//! ```text
//! Create → [cycle 1: Review → Critique → Revise] → ... → [cycle N] → done
//! ```
//!
//! A single control thread issues every agent call; each call blocks until
//! it returns or times out. The session log is the only carrier of
//! continuity — every prompt is rebuilt from it, and a cycle's three
//! results are held in a local draft and appended whole, so a failed step
//! aborts the cycle without leaving a partial record behind.

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::core::sanitize::strip_code_fences;
use crate::core::session::{Cycle, RoleAssignment, Session};
use crate::core::types::{AgentError, Role, ToolKey};
use crate::io::invoker::{InvokeRequest, Invoker};
use crate::prompt::PromptBuilder;

/// Where in the run an agent call happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Initial code generation, before any cycle.
    Create,
    /// Review step of the given cycle.
    Review(u32),
    /// Critique step of the given cycle.
    Critique(u32),
    /// Revision step of the given cycle.
    Revise(u32),
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Create => write!(f, "initial generation"),
            Phase::Review(i) => write!(f, "cycle {i} review"),
            Phase::Critique(i) => write!(f, "cycle {i} critique"),
            Phase::Revise(i) => write!(f, "cycle {i} revision"),
        }
    }
}

/// Failure of a single step, annotated with where the run stopped.
#[derive(Debug, Error)]
#[error("{role} ({tool}) failed during {phase}")]
pub struct StepError {
    pub phase: Phase,
    pub role: Role,
    pub tool: ToolKey,
    #[source]
    pub source: AgentError,
}

/// Settings for one run, fixed at start.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub roles: RoleAssignment,
    /// Planned number of repair cycles (positive).
    pub cycles: u32,
    /// Per-agent-call timeout.
    pub call_timeout: Duration,
}

/// Progress notifications emitted as the loop advances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopEvent {
    StepStarted {
        phase: Phase,
        role: Role,
        tool: ToolKey,
    },
    StepCompleted {
        phase: Phase,
        role: Role,
        tool: ToolKey,
        output: String,
    },
    CycleCompleted {
        index: u32,
        planned: u32,
    },
}

/// Result of driving a session to its end or to its first failure.
///
/// An aborted run still yields a usable partial session: every fully
/// completed cycle remains recorded and eligible for transcript recording.
#[derive(Debug)]
pub struct RunReport {
    pub session: Session,
    /// The step that aborted the run, if any.
    pub failure: Option<StepError>,
}

/// Run the full loop for `task`.
///
/// Returns `Err` only for internal failures (template rendering, session
/// bookkeeping); agent-call failures are reported through
/// [`RunReport::failure`] so the caller can still persist the session.
#[instrument(skip_all, fields(cycles = settings.cycles))]
pub fn run_session<I: Invoker, F: FnMut(&LoopEvent)>(
    task: &str,
    settings: &RunSettings,
    invoker: &I,
    mut on_event: F,
) -> Result<RunReport> {
    let prompts = PromptBuilder::new();
    let mut session = Session::new(task, settings.roles, settings.cycles);
    let roles = settings.roles;

    // ---------------------------------------------------------------- //
    // Phase 0: initial code generation — only the task is available.
    // ---------------------------------------------------------------- //
    let phase = Phase::Create;
    let prompt = prompts.creator_initial(task)?;
    let output = match call(
        invoker,
        phase,
        Role::Creator,
        roles.creator,
        prompt,
        settings.call_timeout,
        &mut on_event,
    ) {
        Ok(text) => text,
        Err(failure) => {
            return Ok(RunReport {
                session,
                failure: Some(failure),
            });
        }
    };
    session
        .set_initial_code(strip_code_fences(&output))
        .context("record initial code")?;
    info!("initial code recorded");

    // ---------------------------------------------------------------- //
    // Repair cycles. No step begins until the previous step's result is
    // in hand; no two cycles overlap.
    // ---------------------------------------------------------------- //
    for index in 1..=settings.cycles {
        // The code under review is fixed for the whole cycle.
        let code = session
            .current_code()
            .context("current code missing after phase 0")?
            .to_string();

        // (a) Review. Cycle 1 originates a stance; later cycles update it
        // against the reviewer's own previous review and the critique that
        // challenged it — the prior cycle's critique, never this cycle's.
        let phase = Phase::Review(index);
        let prompt = if index == 1 {
            prompts.reviewer_initial(task, &code)?
        } else {
            let previous_review = session
                .previous_review()
                .context("previous review missing after cycle 1")?;
            let prior_critique = session
                .prior_critique()
                .context("prior critique missing after cycle 1")?;
            prompts.reviewer_update(task, &code, previous_review, prior_critique, index)?
        };
        let review = match call(
            invoker,
            phase,
            Role::Reviewer,
            roles.reviewer,
            prompt,
            settings.call_timeout,
            &mut on_event,
        ) {
            Ok(text) => text,
            Err(failure) => {
                return Ok(RunReport {
                    session,
                    failure: Some(failure),
                });
            }
        };

        // (b) Critique — evaluates the review just produced, never a stale
        // one, against the same code snapshot.
        let phase = Phase::Critique(index);
        let prompt = prompts.critic(task, &code, &review, session.prior_critique(), index)?;
        let critique = match call(
            invoker,
            phase,
            Role::Critic,
            roles.critic,
            prompt,
            settings.call_timeout,
            &mut on_event,
        ) {
            Ok(text) => text,
            Err(failure) => {
                return Ok(RunReport {
                    session,
                    failure: Some(failure),
                });
            }
        };

        // (c) Revision — same-cycle review and critique.
        let phase = Phase::Revise(index);
        let prompt = prompts.creator_revision(task, &code, &review, &critique, index)?;
        let revision = match call(
            invoker,
            phase,
            Role::Creator,
            roles.creator,
            prompt,
            settings.call_timeout,
            &mut on_event,
        ) {
            Ok(text) => strip_code_fences(&text),
            Err(failure) => {
                return Ok(RunReport {
                    session,
                    failure: Some(failure),
                });
            }
        };

        session
            .push_cycle(Cycle {
                index,
                review,
                critique,
                revision,
            })
            .with_context(|| format!("append cycle {index}"))?;
        info!(cycle = index, "cycle completed");
        on_event(&LoopEvent::CycleCompleted {
            index,
            planned: settings.cycles,
        });
    }

    session.complete();
    Ok(RunReport {
        session,
        failure: None,
    })
}

/// Issue one agent call and wrap any failure with its phase and role.
fn call<I: Invoker, F: FnMut(&LoopEvent)>(
    invoker: &I,
    phase: Phase,
    role: Role,
    tool: ToolKey,
    prompt: String,
    timeout: Duration,
    on_event: &mut F,
) -> Result<String, StepError> {
    on_event(&LoopEvent::StepStarted { phase, role, tool });
    let request = InvokeRequest {
        tool,
        role,
        prompt,
        timeout,
    };
    match invoker.invoke(&request) {
        Ok(output) => {
            on_event(&LoopEvent::StepCompleted {
                phase,
                role,
                tool,
                output: output.clone(),
            });
            Ok(output)
        }
        Err(source) => {
            warn!(%phase, %role, %tool, error = %source, "agent call failed, aborting cycle");
            Err(StepError {
                phase,
                role,
                tool,
                source,
            })
        }
    }
}
