//! Session data model: the append-only record of one feedback-loop run.
//!
//! The external agents are stateless; the session log is the sole holder of
//! continuity between calls. Derived views ([`Session::current_code`],
//! [`Session::previous_review`], [`Session::prior_critique`]) are pure
//! functions recomputed from the log on demand — nothing here performs I/O
//! and no view is ever mutated in place.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::ToolKey;

/// Fixed mapping of logical role to concrete tool, set once at run start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub creator: ToolKey,
    pub reviewer: ToolKey,
    pub critic: ToolKey,
}

/// One completed review → critique → revision iteration.
///
/// Cycles are appended whole: a cycle that fails partway through never
/// reaches the log, so every stored cycle has all three fields set and no
/// field is ever overwritten afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    /// 1-based position in the cycle log.
    pub index: u32,
    /// Reviewer's stance on the code entering this cycle.
    pub review: String,
    /// Critic's evaluation of that same review.
    pub critique: String,
    /// Creator's revised code, superseding the prior code.
    pub revision: String,
}

/// Violation of the session's append-only write discipline.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("initial code is already set")]
    InitialCodeAlreadySet,
    #[error("cycle index {index} does not extend the log (next is {expected})")]
    NonContiguousCycle { index: u32, expected: u32 },
    #[error("cycle log is full ({planned} cycles planned)")]
    PlannedCyclesExceeded { planned: u32 },
    #[error("cycle appended before initial code exists")]
    MissingInitialCode,
}

/// The mutable record of one end-to-end run.
///
/// Owned exclusively by the loop controller for the duration of the run;
/// all writes are sequential, so no synchronization is needed. Handed
/// read-only to the transcript recorder at run end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: String,
    task: String,
    roles: RoleAssignment,
    planned_cycles: u32,
    started_at: u64,
    completed_at: Option<u64>,
    initial_code: Option<String>,
    cycles: Vec<Cycle>,
}

impl Session {
    pub fn new(task: impl Into<String>, roles: RoleAssignment, planned_cycles: u32) -> Self {
        let started_at = unix_now();
        Self {
            id: format!("session-{started_at}"),
            task: task.into(),
            roles,
            planned_cycles,
            started_at,
            completed_at: None,
            initial_code: None,
            cycles: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn roles(&self) -> RoleAssignment {
        self.roles
    }

    pub fn planned_cycles(&self) -> u32 {
        self.planned_cycles
    }

    pub fn started_at(&self) -> u64 {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<u64> {
        self.completed_at
    }

    pub fn initial_code(&self) -> Option<&str> {
        self.initial_code.as_deref()
    }

    /// Completed cycles, strictly ordered by index with no gaps.
    pub fn cycles(&self) -> &[Cycle] {
        &self.cycles
    }

    /// Index the next appended cycle must carry.
    pub fn next_cycle_index(&self) -> u32 {
        self.cycles.len() as u32 + 1
    }

    // ------------------------------------------------------------------ //
    // Mutators — called by the loop controller as phases complete
    // ------------------------------------------------------------------ //

    /// Record the phase-0 artifact. Write-once.
    pub fn set_initial_code(&mut self, code: impl Into<String>) -> Result<(), SessionError> {
        if self.initial_code.is_some() {
            return Err(SessionError::InitialCodeAlreadySet);
        }
        self.initial_code = Some(code.into());
        Ok(())
    }

    /// Append a completed cycle to the log.
    pub fn push_cycle(&mut self, cycle: Cycle) -> Result<(), SessionError> {
        if self.initial_code.is_none() {
            return Err(SessionError::MissingInitialCode);
        }
        let expected = self.next_cycle_index();
        if cycle.index != expected {
            return Err(SessionError::NonContiguousCycle {
                index: cycle.index,
                expected,
            });
        }
        if expected > self.planned_cycles {
            return Err(SessionError::PlannedCyclesExceeded {
                planned: self.planned_cycles,
            });
        }
        self.cycles.push(cycle);
        Ok(())
    }

    /// Mark the run finished. Idempotent; keeps the first completion time.
    pub fn complete(&mut self) {
        if self.completed_at.is_none() {
            self.completed_at = Some(unix_now());
        }
    }

    // ------------------------------------------------------------------ //
    // Derived views — the read contract every prompt is built from
    // ------------------------------------------------------------------ //

    /// The most recently produced code: the last revision if any cycle is
    /// complete, else the initial code.
    ///
    /// Never falls back to the initial code while a newer revision exists,
    /// and is always defined once phase 0 has landed.
    pub fn current_code(&self) -> Option<&str> {
        self.cycles
            .last()
            .map(|cycle| cycle.revision.as_str())
            .or(self.initial_code.as_deref())
    }

    /// The reviewer's own stance from the most recently completed cycle.
    ///
    /// `None` until a cycle has completed, i.e. the cycle-1 review has no
    /// prior stance to update.
    pub fn previous_review(&self) -> Option<&str> {
        self.cycles.last().map(|cycle| cycle.review.as_str())
    }

    /// The critique that challenged the previous review.
    ///
    /// Deliberately lagged by one cycle: when the reviewer updates its
    /// stance in cycle `i`, the relevant critique is the one written against
    /// its cycle `i-1` review. Because only completed cycles reach the log,
    /// the last entry is exactly that critique — a same-cycle critique
    /// cannot leak into the review step, since it does not exist yet when
    /// the review runs. Preserve this lag; it is a temporal contract, not
    /// an off-by-one.
    pub fn prior_critique(&self) -> Option<&str> {
        self.cycles.last().map(|cycle| cycle.critique.as_str())
    }

    /// The code a finished run hands back; same as [`Session::current_code`].
    pub fn final_code(&self) -> Option<&str> {
        self.current_code()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles() -> RoleAssignment {
        RoleAssignment {
            creator: ToolKey::Claude,
            reviewer: ToolKey::Codex,
            critic: ToolKey::Gemini,
        }
    }

    fn cycle(index: u32) -> Cycle {
        Cycle {
            index,
            review: format!("review {index}"),
            critique: format!("critique {index}"),
            revision: format!("revision {index}"),
        }
    }

    #[test]
    fn current_code_is_initial_before_any_cycle() {
        let mut session = Session::new("task", roles(), 2);
        assert_eq!(session.current_code(), None);
        session.set_initial_code("v0").expect("set");
        assert_eq!(session.current_code(), Some("v0"));
    }

    /// Once any revision exists, `initial_code` must never be served as the
    /// current code again.
    #[test]
    fn current_code_tracks_latest_revision() {
        let mut session = Session::new("task", roles(), 3);
        session.set_initial_code("v0").expect("set");
        session.push_cycle(cycle(1)).expect("push");
        assert_eq!(session.current_code(), Some("revision 1"));
        session.push_cycle(cycle(2)).expect("push");
        assert_eq!(session.current_code(), Some("revision 2"));
        assert_ne!(session.current_code(), session.initial_code());
    }

    /// The critique exposed to a cycle-`i` review update is the cycle `i-1`
    /// critique (`cycles[i-2]` 0-based), never a same-cycle critique.
    #[test]
    fn prior_critique_lags_one_cycle() {
        let mut session = Session::new("task", roles(), 3);
        session.set_initial_code("v0").expect("set");

        // Cycle 1's review step: no critique may be visible at all.
        assert_eq!(session.prior_critique(), None);
        assert_eq!(session.previous_review(), None);

        session.push_cycle(cycle(1)).expect("push");
        // Cycle 2's review step sees exactly cycle 1's critique and review.
        assert_eq!(session.prior_critique(), Some("critique 1"));
        assert_eq!(session.previous_review(), Some("review 1"));

        session.push_cycle(cycle(2)).expect("push");
        // Cycle 3's review step: critique 2, never critique 3 (nonexistent).
        assert_eq!(session.prior_critique(), Some("critique 2"));
        assert_eq!(
            session.prior_critique(),
            Some(session.cycles()[1].critique.as_str())
        );
    }

    /// Derived views are pure: reading twice from an unmodified session
    /// yields identical values.
    #[test]
    fn derived_views_are_idempotent() {
        let mut session = Session::new("task", roles(), 2);
        session.set_initial_code("v0").expect("set");
        session.push_cycle(cycle(1)).expect("push");

        assert_eq!(session.current_code(), session.current_code());
        assert_eq!(session.previous_review(), session.previous_review());
        assert_eq!(session.prior_critique(), session.prior_critique());
    }

    #[test]
    fn initial_code_is_write_once() {
        let mut session = Session::new("task", roles(), 1);
        session.set_initial_code("v0").expect("set");
        assert_eq!(
            session.set_initial_code("v1"),
            Err(SessionError::InitialCodeAlreadySet)
        );
        assert_eq!(session.initial_code(), Some("v0"));
    }

    #[test]
    fn push_cycle_rejects_gaps_and_duplicates() {
        let mut session = Session::new("task", roles(), 3);
        session.set_initial_code("v0").expect("set");
        assert_eq!(
            session.push_cycle(cycle(2)),
            Err(SessionError::NonContiguousCycle {
                index: 2,
                expected: 1
            })
        );
        session.push_cycle(cycle(1)).expect("push");
        assert_eq!(
            session.push_cycle(cycle(1)),
            Err(SessionError::NonContiguousCycle {
                index: 1,
                expected: 2
            })
        );
    }

    #[test]
    fn push_cycle_enforces_planned_count() {
        let mut session = Session::new("task", roles(), 1);
        session.set_initial_code("v0").expect("set");
        session.push_cycle(cycle(1)).expect("push");
        assert_eq!(
            session.push_cycle(cycle(2)),
            Err(SessionError::PlannedCyclesExceeded { planned: 1 })
        );
        assert_eq!(session.cycles().len(), 1);
    }

    #[test]
    fn push_cycle_requires_initial_code() {
        let mut session = Session::new("task", roles(), 1);
        assert_eq!(
            session.push_cycle(cycle(1)),
            Err(SessionError::MissingInitialCode)
        );
    }

    #[test]
    fn complete_keeps_first_timestamp() {
        let mut session = Session::new("task", roles(), 1);
        session.complete();
        let first = session.completed_at();
        assert!(first.is_some());
        session.complete();
        assert_eq!(session.completed_at(), first);
    }
}
