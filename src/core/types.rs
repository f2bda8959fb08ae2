//! Shared deterministic types for the feedback loop.
//!
//! These types define stable contracts between core logic and the io layer.
//! They do not depend on external state or I/O and must remain deterministic
//! across runs.

use std::fmt;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Logical role an agent plays for the duration of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Writes the initial code and every revision.
    Creator,
    /// Reviews the current code each cycle.
    Reviewer,
    /// Challenges the review, not the code.
    Critic,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Creator => "Creator",
            Role::Reviewer => "Reviewer",
            Role::Critic => "Critic",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported external agent CLI. The key set is shared across roles; the
/// flags passed to a tool differ per role (see [`ToolKey::argv`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum ToolKey {
    Claude,
    Codex,
    Gemini,
}

/// How the prompt reaches the child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptChannel {
    /// Prompt is embedded in the argument list.
    Arg,
    /// Prompt is piped to the child's stdin.
    Stdin,
}

impl ToolKey {
    /// Resolve a user-facing key (config values, API callers) to a tool.
    pub fn from_key(key: &str) -> Result<Self, AgentError> {
        match key {
            "claude" => Ok(ToolKey::Claude),
            "codex" => Ok(ToolKey::Codex),
            "gemini" => Ok(ToolKey::Gemini),
            other => Err(AgentError::UnknownAgent {
                key: other.to_string(),
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ToolKey::Claude => "claude",
            ToolKey::Codex => "codex",
            ToolKey::Gemini => "gemini",
        }
    }

    /// Name of the executable on `PATH`.
    pub fn program(self) -> &'static str {
        self.as_str()
    }

    pub fn prompt_channel(self) -> PromptChannel {
        match self {
            ToolKey::Codex => PromptChannel::Stdin,
            ToolKey::Claude | ToolKey::Gemini => PromptChannel::Arg,
        }
    }

    /// Build the argument list for invoking this tool in the given role.
    ///
    /// For [`PromptChannel::Stdin`] tools the prompt does not appear in the
    /// argv; callers pipe it separately.
    pub fn argv(self, role: Role, prompt: &str) -> Vec<String> {
        match self {
            ToolKey::Claude => {
                // The critic only reads; it never edits the artifact.
                let allowed = match role {
                    Role::Critic => "Bash,Read,Glob,Grep",
                    Role::Creator | Role::Reviewer => "Bash,Write,Read,Edit,Glob,Grep,Task",
                };
                vec![
                    "-p".to_string(),
                    prompt.to_string(),
                    "--allowedTools".to_string(),
                    allowed.to_string(),
                ]
            }
            ToolKey::Codex => vec![
                "exec".to_string(),
                "--skip-git-repo-check".to_string(),
                "-".to_string(),
            ],
            ToolKey::Gemini => {
                let mut args = Vec::new();
                if matches!(role, Role::Reviewer | Role::Critic) {
                    args.push("--approval-mode".to_string());
                    args.push("yolo".to_string());
                }
                args.push("-p".to_string());
                args.push(prompt.to_string());
                args
            }
        }
    }
}

impl fmt::Display for ToolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform failure family for a single agent call.
///
/// Every way a call can fail lives in one enum so the loop controller can
/// abort the current cycle and report which phase and role stopped the run
/// without unpacking layered error types.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("unknown agent key '{key}' (expected claude, codex, or gemini)")]
    UnknownAgent { key: String },

    #[error("'{program}' not found on PATH; is it installed?")]
    ToolNotFound { tool: ToolKey, program: String },

    #[error("{tool} timed out after {timeout:?}; try a larger --timeout")]
    Timeout { tool: ToolKey, timeout: Duration },

    #[error("{tool} produced no output on stdout or stderr (exit code {exit_code:?})")]
    EmptyResponse {
        tool: ToolKey,
        exit_code: Option<i32>,
    },

    #[error("invalid agent request: {reason}")]
    InvalidRequest { reason: String },

    #[error("failed to run {tool}: {source}")]
    Io {
        tool: ToolKey,
        #[source]
        source: std::io::Error,
    },
}
