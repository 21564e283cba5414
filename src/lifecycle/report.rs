//! Summary of a finished run, printed by the binary.

use serde::Serialize;

use crate::error::ClientResult;
use crate::lifecycle::signal::{Outcome, SignalView};

/// Final state of one completion signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "lowercase")]
pub enum SignalReport {
    Pending,
    Succeeded,
    Failed(String),
}

impl SignalReport {
    pub fn from_view(view: &SignalView<()>) -> Self {
        Self::from_outcome(view.try_get())
    }

    fn from_outcome(outcome: Option<Outcome<()>>) -> Self {
        match outcome {
            None => SignalReport::Pending,
            Some(Ok(())) => SignalReport::Succeeded,
            Some(Err(e)) => SignalReport::Failed(e.to_string()),
        }
    }
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub client_id: u64,
    pub target: String,
    pub connected: SignalReport,
    pub payload_sent: SignalReport,
    pub threshold_received: SignalReport,
    pub error: Option<String>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn with_result(mut self, result: &ClientResult<()>) -> Self {
        self.error = result.as_ref().err().map(ToString::to_string);
        self
    }
}
