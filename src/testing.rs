//! Test doubles for running the service without a model provider.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::error::GenerationError;
use crate::generation::{CompletionBackend, CompletionRequest};

pub const DEFAULT_REPLY: &str = "Once upon a time, the emoji told a tale.";

/// Backend that answers from a script, then falls back to [`DEFAULT_REPLY`].
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    script: Arc<Mutex<VecDeque<Result<String, GenerationError>>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful raw completion.
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()));
        self
    }

    /// Queue a failure.
    pub fn fail(self, error: GenerationError) -> Self {
        self.push(Err(error));
        self
    }

    fn push(&self, item: Result<String, GenerationError>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(item);
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Every request seen so far, in call order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl CompletionBackend for ScriptedBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<String, GenerationError> {
        if let Ok(mut seen) = self.requests.lock() {
            seen.push(request);
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        next.unwrap_or_else(|| Ok(DEFAULT_REPLY.to_string()))
    }
}
