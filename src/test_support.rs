//! Test-only helpers for scripting agent replies.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::core::types::AgentError;
use crate::io::invoker::{InvokeRequest, Invoker};

/// One scripted outcome for a single agent call.
#[derive(Debug)]
pub enum ScriptedReply {
    Text(String),
    Fail(AgentError),
}

/// An [`Invoker`] that pops pre-scripted replies in call order and records
/// every request it receives, so tests can assert on prompt contents.
pub struct ScriptedInvoker {
    replies: Mutex<VecDeque<ScriptedReply>>,
    seen: Mutex<Vec<InvokeRequest>>,
}

impl ScriptedInvoker {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, in call order.
    pub fn requests(&self) -> Vec<InvokeRequest> {
        self.seen.lock().unwrap().clone()
    }
}

impl Invoker for ScriptedInvoker {
    fn invoke(&self, request: &InvokeRequest) -> Result<String, AgentError> {
        self.seen.lock().unwrap().push(request.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted reply left for {}", request.role));
        match reply {
            ScriptedReply::Text(text) => Ok(text),
            ScriptedReply::Fail(error) => Err(error),
        }
    }
}
