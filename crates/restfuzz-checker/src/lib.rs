//! restfuzz Checker - Response oracle and trial execution
//!
//! This crate drives the fuzzing loop for one endpoint at a time:
//! - [`Executor`]: draws requests, sends them sequentially, stops at the first failure
//! - [`Oracle`]: classifies response status codes
//! - [`CheckResult`] and [`RunSummary`]: per-endpoint and per-session outcomes
//!
//! # Example
//!
//! ```rust,ignore
//! use restfuzz_checker::Executor;
//! use restfuzz_transport::{HttpTransport, TransportConfig};
//!
//! let transport = HttpTransport::new(&TransportConfig::default())?;
//! let mut executor = Executor::new(transport, false);
//! let result = executor.run(&endpoint_sampler, 100, &mut rng).await?;
//! println!("{}", result);
//! ```

pub mod executor;
pub mod oracle;
pub mod result;
pub mod summary;

pub use executor::{Executor, ProgressFn, RunError, RunPhase};
pub use oracle::{Oracle, Verdict};
pub use result::{CheckResult, CheckStatus, Counterexample, TrialRecord};
pub use summary::{EndpointOutcome, RunSummary};
