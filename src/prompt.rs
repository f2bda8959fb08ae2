//! Prompt construction for each role × phase.
//!
//! The agents carry no memory between calls, so every prompt must be fully
//! self-contained: all code, review, and critique context an agent needs is
//! embedded in the prompt text by the loop controller before dispatch.
//!
//! Phases per role:
//! - Creator: `initial` (phase 0), `revision` (every cycle)
//! - Reviewer: `initial` (cycle 1), `update` (cycle 2+)
//! - Critic: single phase, with its own prior critique folded in from
//!   cycle 2 on

use anyhow::{Context, Result};
use minijinja::{Environment, context};

const CREATOR_INITIAL: &str = include_str!("prompts/creator_initial.md");
const CREATOR_REVISION: &str = include_str!("prompts/creator_revision.md");
const REVIEWER_INITIAL: &str = include_str!("prompts/reviewer_initial.md");
const REVIEWER_UPDATE: &str = include_str!("prompts/reviewer_update.md");
const CRITIC: &str = include_str!("prompts/critic.md");

/// Renders the per-call prompt from embedded templates.
pub struct PromptBuilder {
    env: Environment<'static>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("creator_initial", CREATOR_INITIAL)
            .expect("creator_initial template should be valid");
        env.add_template("creator_revision", CREATOR_REVISION)
            .expect("creator_revision template should be valid");
        env.add_template("reviewer_initial", REVIEWER_INITIAL)
            .expect("reviewer_initial template should be valid");
        env.add_template("reviewer_update", REVIEWER_UPDATE)
            .expect("reviewer_update template should be valid");
        env.add_template("critic", CRITIC)
            .expect("critic template should be valid");
        Self { env }
    }

    /// Phase 0: the creator sees only the original task.
    pub fn creator_initial(&self, task: &str) -> Result<String> {
        self.render("creator_initial", context! { task })
    }

    /// Revision step: same-cycle review and critique, plus the current code.
    pub fn creator_revision(
        &self,
        task: &str,
        code: &str,
        review: &str,
        critique: &str,
        cycle: u32,
    ) -> Result<String> {
        self.render(
            "creator_revision",
            context! { task, code, review, critique, cycle },
        )
    }

    /// Cycle 1 review: no prior stance exists.
    pub fn reviewer_initial(&self, task: &str, code: &str) -> Result<String> {
        self.render("reviewer_initial", context! { task, code })
    }

    /// Cycle 2+ review: the reviewer's own last stance plus the critique
    /// that challenged it (the prior cycle's critique, by contract).
    pub fn reviewer_update(
        &self,
        task: &str,
        code: &str,
        previous_review: &str,
        prior_critique: &str,
        cycle: u32,
    ) -> Result<String> {
        self.render(
            "reviewer_update",
            context! { task, code, previous_review, prior_critique, cycle },
        )
    }

    /// Critique step: evaluates the review just produced in this cycle.
    pub fn critic(
        &self,
        task: &str,
        code: &str,
        review: &str,
        prior_critique: Option<&str>,
        cycle: u32,
    ) -> Result<String> {
        self.render(
            "critic",
            context! { task, code, review, prior_critique, cycle },
        )
    }

    fn render(&self, name: &str, ctx: minijinja::Value) -> Result<String> {
        let template = self
            .env
            .get_template(name)
            .with_context(|| format!("missing template {name}"))?;
        template
            .render(ctx)
            .with_context(|| format!("render template {name}"))
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}
