//! Transcript persistence for finished sessions.
//!
//! The written shape is a durable contract: other tooling may replay a run
//! offline from these fields alone. Written unconditionally when saving is
//! enabled, unaffected by `RUST_LOG`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::session::Session;
use crate::core::types::ToolKey;

/// Serialized form of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    pub id: String,
    pub task: String,
    pub started_at: u64,
    pub completed_at: Option<u64>,
    pub config: TranscriptConfig,
    pub initial_code: String,
    /// The final `current_code` of the session.
    pub final_code: String,
    pub iterations: Vec<CycleRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptConfig {
    pub creator: ToolKey,
    pub reviewer: ToolKey,
    pub critic: ToolKey,
    pub iterations: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleRecord {
    pub number: u32,
    pub review: String,
    pub critique: String,
    pub revision: String,
}

impl TranscriptRecord {
    /// Project a session (finished, or aborted after k complete cycles)
    /// into its durable form.
    pub fn from_session(session: &Session) -> Self {
        let roles = session.roles();
        Self {
            id: session.id().to_string(),
            task: session.task().to_string(),
            started_at: session.started_at(),
            completed_at: session.completed_at(),
            config: TranscriptConfig {
                creator: roles.creator,
                reviewer: roles.reviewer,
                critic: roles.critic,
                iterations: session.planned_cycles(),
            },
            initial_code: session.initial_code().unwrap_or_default().to_string(),
            final_code: session.final_code().unwrap_or_default().to_string(),
            iterations: session
                .cycles()
                .iter()
                .map(|cycle| CycleRecord {
                    number: cycle.index,
                    review: cycle.review.clone(),
                    critique: cycle.critique.clone(),
                    revision: cycle.revision.clone(),
                })
                .collect(),
        }
    }
}

/// Write the session transcript to `<dir>/<session-id>.json`.
pub fn save_transcript(dir: &Path, session: &Session) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("create sessions dir {}", dir.display()))?;
    let path = dir.join(format!("{}.json", session.id()));
    let record = TranscriptRecord::from_session(session);
    let mut buf = serde_json::to_string_pretty(&record).context("serialize transcript")?;
    buf.push('\n');
    fs::write(&path, buf).with_context(|| format!("write transcript {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::{Cycle, RoleAssignment};

    fn session_with_cycle() -> Session {
        let mut session = Session::new(
            "write a binary search function",
            RoleAssignment {
                creator: ToolKey::Claude,
                reviewer: ToolKey::Codex,
                critic: ToolKey::Gemini,
            },
            2,
        );
        session.set_initial_code("v0").expect("set");
        session
            .push_cycle(Cycle {
                index: 1,
                review: "r1".to_string(),
                critique: "c1".to_string(),
                revision: "v1".to_string(),
            })
            .expect("push");
        session.complete();
        session
    }

    #[test]
    fn record_mirrors_session_fields() {
        let session = session_with_cycle();
        let record = TranscriptRecord::from_session(&session);

        assert_eq!(record.id, session.id());
        assert_eq!(record.task, "write a binary search function");
        assert_eq!(record.config.iterations, 2);
        assert_eq!(record.initial_code, "v0");
        assert_eq!(record.final_code, "v1");
        assert_eq!(record.iterations.len(), 1);
        assert_eq!(record.iterations[0].number, 1);
        assert_eq!(record.iterations[0].critique, "c1");
    }

    #[test]
    fn save_writes_readable_json() {
        let temp = tempfile::tempdir().expect("tempdir");
        let session = session_with_cycle();

        let path = save_transcript(temp.path(), &session).expect("save");
        assert!(path.ends_with(format!("{}.json", session.id())));

        let contents = fs::read_to_string(&path).expect("read");
        let parsed: TranscriptRecord = serde_json::from_str(&contents).expect("parse");
        assert_eq!(parsed, TranscriptRecord::from_session(&session));
    }

    #[test]
    fn aborted_session_still_serializes_completed_cycles() {
        let mut session = Session::new(
            "task",
            RoleAssignment {
                creator: ToolKey::Claude,
                reviewer: ToolKey::Claude,
                critic: ToolKey::Claude,
            },
            3,
        );
        session.set_initial_code("v0").expect("set");
        // Run aborted mid-cycle-2: only cycle 1 reached the log.
        session
            .push_cycle(Cycle {
                index: 1,
                review: "r1".to_string(),
                critique: "c1".to_string(),
                revision: "v1".to_string(),
            })
            .expect("push");

        let record = TranscriptRecord::from_session(&session);
        assert_eq!(record.iterations.len(), 1);
        assert_eq!(record.final_code, "v1");
        assert_eq!(record.completed_at, None);
    }
}
