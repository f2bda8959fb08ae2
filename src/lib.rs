//! Adversarial code-refinement loop over stateless CLI agents.
//!
//! This crate coordinates three roles — Creator, Reviewer, Critic — through
//! a fixed number of review → critique → revision cycles against an initial
//! code draft. The agents are external CLI tools with no memory between
//! calls; the session log is the single source of continuity, and every
//! prompt is rebuilt from it. The architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (session state, tool identity,
//!   output sanitization). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (process execution, config,
//!   transcript persistence). Isolated to enable mocking in tests.
//!
//! The [`orchestrator`] module coordinates core logic with I/O to implement
//! the loop; [`prompt`] renders the per-call prompts.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod orchestrator;
pub mod prompt;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
