//! Sequential trial execution for one endpoint.

use std::fmt;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use restfuzz_core::SpecificationError;
use restfuzz_generator::{EndpointSampler, RandomSource};
use restfuzz_transport::{Transport, TransportError};

use crate::oracle::{Oracle, Verdict};
use crate::result::{CheckResult, Counterexample, TrialRecord};

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Sampling,
    Executing,
    Classifying,
    /// Every trial passed.
    Done,
    /// A trial failed or the run errored.
    Failed,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Idle => "idle",
            RunPhase::Sampling => "sampling",
            RunPhase::Executing => "executing",
            RunPhase::Classifying => "classifying",
            RunPhase::Done => "done",
            RunPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A run that ended without a verdict.
#[derive(Debug, Error)]
pub enum RunError {
    /// The request could not be delivered.
    #[error("transport failure on trial {trial} of {endpoint}: {source}\n  {transcript}")]
    Transport {
        endpoint: String,
        trial: usize,
        transcript: String,
        #[source]
        source: TransportError,
    },

    /// The endpoint's parameters cannot form a valid request.
    #[error(transparent)]
    Specification(#[from] SpecificationError),
}

impl RunError {
    /// The `curl` transcript of the request that could not be delivered.
    pub fn transcript(&self) -> Option<&str> {
        match self {
            RunError::Transport { transcript, .. } => Some(transcript),
            RunError::Specification(_) => None,
        }
    }
}

/// Called with every trial as soon as it is classified.
pub type ProgressFn = Box<dyn Fn(&TrialRecord) + Send + Sync>;

/// Draws requests for an endpoint, sends them one at a time and classifies
/// each response.
pub struct Executor<T> {
    transport: T,
    allow_undeclared: bool,
    phase: RunPhase,
    progress: Option<ProgressFn>,
}

impl<T: Transport> Executor<T> {
    pub fn new(transport: T, allow_undeclared: bool) -> Self {
        Self {
            transport,
            allow_undeclared,
            phase: RunPhase::Idle,
            progress: None,
        }
    }

    /// Report each classified trial to `progress`.
    pub fn with_progress(
        mut self,
        progress: impl Fn(&TrialRecord) + Send + Sync + 'static,
    ) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    /// Phase the last run reached.
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Run up to `example_count` trials against the endpoint, stopping at the
    /// first failure.
    #[instrument(skip_all, fields(endpoint = %sampler.identity()))]
    pub async fn run(
        &mut self,
        sampler: &EndpointSampler,
        example_count: usize,
        rng: &mut RandomSource,
    ) -> Result<CheckResult, RunError> {
        let started = Instant::now();
        let endpoint = sampler.identity().to_string();
        let oracle = Oracle::new(sampler.declared_responses().clone(), self.allow_undeclared);
        let mut history = Vec::with_capacity(example_count);

        self.phase = RunPhase::Idle;
        info!(examples = example_count, "starting run");

        for trial in 1..=example_count {
            self.transition(RunPhase::Sampling);
            let request = match sampler.sample_request(rng) {
                Ok(request) => request,
                Err(e) => {
                    self.transition(RunPhase::Failed);
                    return Err(e.into());
                }
            };

            self.transition(RunPhase::Executing);
            let status = match self.transport.send(&request).await {
                Ok(status) => status,
                Err(source) => {
                    self.transition(RunPhase::Failed);
                    warn!(trial, error = %source, "transport failure");
                    return Err(RunError::Transport {
                        endpoint,
                        trial,
                        transcript: request.to_string(),
                        source,
                    });
                }
            };

            self.transition(RunPhase::Classifying);
            let verdict = oracle.classify(status);
            let record = TrialRecord {
                trial,
                url: request.full_url(),
                status,
                verdict,
            };
            info!(trial, url = %record.url, status, %verdict, "trial classified");
            if let Some(progress) = &self.progress {
                progress(&record);
            }
            history.push(record);

            if verdict == Verdict::Fail {
                self.transition(RunPhase::Failed);
                warn!(trial, status, "check failed");
                let counterexample =
                    Counterexample::new(oracle.describe_failure(status), status, request.to_string())
                        .with_trial(trial);
                return Ok(CheckResult::fail(endpoint, counterexample)
                    .with_trials(trial, example_count)
                    .with_history(history)
                    .with_duration(started.elapsed()));
            }
        }

        self.transition(RunPhase::Done);
        info!(trials = example_count, "check passed");
        Ok(CheckResult::pass(endpoint)
            .with_trials(example_count, example_count)
            .with_history(history)
            .with_duration(started.elapsed()))
    }

    fn transition(&mut self, next: RunPhase) {
        if self.phase != next {
            debug!(from = %self.phase, to = %next, "run phase");
            self.phase = next;
        }
    }
}
