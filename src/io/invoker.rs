//! Agent invocation over external CLI tools.
//!
//! The [`Invoker`] trait decouples the loop controller from the concrete
//! agent backend; tests use scripted invokers that return predetermined
//! outputs without spawning processes. The real [`CliInvoker`] spawns one
//! child process per call and owns no cross-call state — each invocation
//! must carry its full context in the prompt.

use std::process::Command;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::core::types::{AgentError, PromptChannel, Role, ToolKey};
use crate::io::process::{CapturedOutput, run_command_with_timeout};

/// Session-identifying marker stripped from the child environment. A nested
/// `claude` invocation refuses to start when it sees this set.
const NESTED_SESSION_MARKER: &str = "CLAUDECODE";

/// Parameters for one stateless agent call.
#[derive(Debug, Clone)]
pub struct InvokeRequest {
    pub tool: ToolKey,
    pub role: Role,
    /// Fully-formed prompt; must be non-empty.
    pub prompt: String,
    /// Per-call wall-clock budget; must be positive.
    pub timeout: Duration,
}

/// Abstraction over agent execution backends.
pub trait Invoker {
    /// Execute one fully self-contained call and return the agent's text.
    fn invoke(&self, request: &InvokeRequest) -> Result<String, AgentError>;
}

/// Invoker that spawns the mapped CLI binary per call. No retries here;
/// retry policy, if any, belongs to the caller.
#[derive(Debug, Clone)]
pub struct CliInvoker {
    output_limit_bytes: usize,
}

impl CliInvoker {
    pub fn new(output_limit_bytes: usize) -> Self {
        Self { output_limit_bytes }
    }
}

impl Invoker for CliInvoker {
    #[instrument(skip_all, fields(tool = %request.tool, role = %request.role, timeout_secs = request.timeout.as_secs()))]
    fn invoke(&self, request: &InvokeRequest) -> Result<String, AgentError> {
        validate_request(request)?;

        let tool = request.tool;
        let mut cmd = Command::new(tool.program());
        cmd.args(tool.argv(request.role, &request.prompt));
        cmd.env_remove(NESTED_SESSION_MARKER);

        let stdin = match tool.prompt_channel() {
            PromptChannel::Stdin => Some(request.prompt.as_bytes()),
            PromptChannel::Arg => None,
        };

        info!("invoking agent");
        let output = run_command_with_timeout(cmd, stdin, request.timeout, self.output_limit_bytes)
            .map_err(|err| classify_process_error(tool, err))?;

        if output.timed_out {
            warn!("agent call timed out, child killed");
            return Err(AgentError::Timeout {
                tool,
                timeout: request.timeout,
            });
        }

        select_output(tool, &output)
    }
}

fn validate_request(request: &InvokeRequest) -> Result<(), AgentError> {
    if request.prompt.trim().is_empty() {
        return Err(AgentError::InvalidRequest {
            reason: "prompt is empty".to_string(),
        });
    }
    if request.timeout.is_zero() {
        return Err(AgentError::InvalidRequest {
            reason: "timeout must be positive".to_string(),
        });
    }
    Ok(())
}

fn classify_process_error(tool: ToolKey, err: anyhow::Error) -> AgentError {
    match err.downcast::<std::io::Error>() {
        Ok(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => AgentError::ToolNotFound {
            tool,
            program: tool.program().to_string(),
        },
        Ok(io_err) => AgentError::Io {
            tool,
            source: io_err,
        },
        Err(other) => AgentError::Io {
            tool,
            source: std::io::Error::other(other.to_string()),
        },
    }
}

/// Pick the usable text from a finished process.
///
/// stdout wins; an empty stdout falls back to stderr, since some tools
/// report success-path output there — which also means a non-zero exit with
/// stderr text is surfaced as output, not as an error. Both streams empty
/// is a reportable failure, never a silent empty success.
fn select_output(tool: ToolKey, output: &CapturedOutput) -> Result<String, AgentError> {
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if !stdout.is_empty() {
        debug!(bytes = stdout.len(), "using stdout");
        return Ok(stdout);
    }
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if !stderr.is_empty() {
        debug!(bytes = stderr.len(), "stdout empty, using stderr");
        return Ok(stderr);
    }
    Err(AgentError::EmptyResponse {
        tool,
        exit_code: output.status.code(),
    })
}
