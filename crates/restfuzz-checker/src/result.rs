//! Result types for endpoint runs.

use std::fmt;
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::oracle::Verdict;

/// The result of checking one endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    /// The endpoint, e.g. `GET /items/{id}`.
    pub endpoint: String,
    /// The overall status of the check.
    pub status: CheckStatus,
    /// Number of trials actually executed.
    pub trials: usize,
    /// Number of trials requested.
    pub requested: usize,
    /// Counterexample if the check failed.
    pub counterexample: Option<Counterexample>,
    /// Every executed trial, in order.
    pub history: Vec<TrialRecord>,
    /// Time taken to perform the check.
    #[serde(serialize_with = "serialize_millis")]
    pub duration: Option<Duration>,
    /// Seed of the random source the run drew from.
    pub seed: Option<u64>,
}

impl CheckResult {
    /// Create a passing result.
    pub fn pass(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            status: CheckStatus::Pass,
            trials: 0,
            requested: 0,
            counterexample: None,
            history: Vec::new(),
            duration: None,
            seed: None,
        }
    }

    /// Create a failing result with a counterexample.
    pub fn fail(endpoint: impl Into<String>, counterexample: Counterexample) -> Self {
        Self {
            status: CheckStatus::Fail,
            counterexample: Some(counterexample),
            ..Self::pass(endpoint)
        }
    }

    /// Record how many trials ran out of how many were requested.
    pub fn with_trials(mut self, trials: usize, requested: usize) -> Self {
        self.trials = trials;
        self.requested = requested;
        self
    }

    /// Add the trial history to this result.
    pub fn with_history(mut self, history: Vec<TrialRecord>) -> Self {
        self.history = history;
        self
    }

    /// Add the duration to this result.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Add the seed to this result.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn is_pass(&self) -> bool {
        matches!(self.status, CheckStatus::Pass)
    }

    pub fn is_fail(&self) -> bool {
        matches!(self.status, CheckStatus::Fail)
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} after {}/{} trials",
            self.endpoint, self.status, self.trials, self.requested
        )?;
        if let Some(duration) = self.duration {
            write!(f, " in {:?}", duration)?;
        }
        if let Some(ref ce) = self.counterexample {
            write!(f, "\n{}", ce)?;
        }
        Ok(())
    }
}

/// The status of an endpoint check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    /// Every trial passed.
    Pass,
    /// A trial failed; the run stopped there.
    Fail,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckStatus::Pass => write!(f, "PASS"),
            CheckStatus::Fail => write!(f, "FAIL"),
        }
    }
}

/// The failing request of a check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Counterexample {
    /// A human-readable description of the failure.
    pub description: String,
    /// 1-based index of the failing trial.
    pub trial: usize,
    /// Status code the server answered with.
    pub status_code: u16,
    /// `curl` command reproducing the request.
    pub transcript: String,
}

impl Counterexample {
    pub fn new(
        description: impl Into<String>,
        status_code: u16,
        transcript: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            trial: 0,
            status_code,
            transcript: transcript.into(),
        }
    }

    /// Set the trial index.
    pub fn with_trial(mut self, trial: usize) -> Self {
        self.trial = trial;
        self
    }
}

impl fmt::Display for Counterexample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Counterexample (trial {}): {}", self.trial, self.description)?;
        write!(f, "  {}", self.transcript)
    }
}

/// One executed trial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrialRecord {
    /// 1-based trial index.
    pub trial: usize,
    /// Full URL including the query string.
    pub url: String,
    pub status: u16,
    pub verdict: Verdict,
}

fn serialize_millis<S: Serializer>(duration: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
    match duration {
        Some(d) => s.serialize_some(&(d.as_millis() as u64)),
        None => s.serialize_none(),
    }
}
