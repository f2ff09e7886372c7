//! Aggregated outcome of a fuzzing session.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::executor::RunError;
use crate::result::CheckResult;

/// What happened to one endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EndpointOutcome {
    /// The run reached a verdict.
    Checked(CheckResult),
    /// The run ended without a verdict.
    Errored {
        endpoint: String,
        error: String,
        transcript: Option<String>,
    },
}

impl EndpointOutcome {
    pub fn endpoint(&self) -> &str {
        match self {
            EndpointOutcome::Checked(result) => &result.endpoint,
            EndpointOutcome::Errored { endpoint, .. } => endpoint,
        }
    }
}

/// Results of every endpoint run in one session.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub seed: u64,
    pub allow_undeclared: bool,
    pub outcomes: Vec<EndpointOutcome>,
}

impl RunSummary {
    pub fn new(seed: u64, allow_undeclared: bool) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            seed,
            allow_undeclared,
            outcomes: Vec::new(),
        }
    }

    pub fn record_result(&mut self, result: CheckResult) {
        self.outcomes.push(EndpointOutcome::Checked(result));
    }

    pub fn record_error(&mut self, endpoint: impl Into<String>, error: &RunError) {
        self.outcomes.push(EndpointOutcome::Errored {
            endpoint: endpoint.into(),
            error: error.to_string(),
            transcript: error.transcript().map(str::to_string),
        });
    }

    /// Stamp the finish time.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn passed(&self) -> usize {
        self.count(|o| matches!(o, EndpointOutcome::Checked(r) if r.is_pass()))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, EndpointOutcome::Checked(r) if r.is_fail()))
    }

    pub fn errored(&self) -> usize {
        self.count(|o| matches!(o, EndpointOutcome::Errored { .. }))
    }

    /// True when every endpoint passed.
    pub fn is_success(&self) -> bool {
        self.passed() == self.outcomes.len()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    fn count(&self, predicate: impl Fn(&EndpointOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(o)).count()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} endpoint(s): {} passed, {} failed, {} errored (seed {})",
            self.outcomes.len(),
            self.passed(),
            self.failed(),
            self.errored(),
            self.seed
        )
    }
}
