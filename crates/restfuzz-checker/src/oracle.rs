//! Pass/fail classification of response status codes.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The verdict for one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Fail,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => write!(f, "PASS"),
            Verdict::Fail => write!(f, "FAIL"),
        }
    }
}

/// Classifies status codes against an endpoint's declared responses.
///
/// Rules, first match wins:
///
/// | status | verdict |
/// |---|---|
/// | 500-599 | FAIL |
/// | 200-299 | PASS |
/// | declared | PASS |
/// | anything else | PASS only when undeclared codes are allowed |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Oracle {
    declared: BTreeSet<u16>,
    allow_undeclared: bool,
}

impl Oracle {
    pub fn new(declared: BTreeSet<u16>, allow_undeclared: bool) -> Self {
        Self {
            declared,
            allow_undeclared,
        }
    }

    pub fn declared(&self) -> &BTreeSet<u16> {
        &self.declared
    }

    pub fn allows_undeclared(&self) -> bool {
        self.allow_undeclared
    }

    pub fn classify(&self, status: u16) -> Verdict {
        if is_server_error(status) {
            Verdict::Fail
        } else if (200..=299).contains(&status)
            || self.declared.contains(&status)
            || self.allow_undeclared
        {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }

    /// Why `status` failed, for counterexample descriptions.
    pub fn describe_failure(&self, status: u16) -> String {
        if is_server_error(status) {
            format!("server error {}", status)
        } else {
            format!(
                "undeclared response code {} (declared: {:?})",
                status, self.declared
            )
        }
    }
}

fn is_server_error(status: u16) -> bool {
    (500..=599).contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oracle_table() {
        let strict = Oracle::new(BTreeSet::from([404]), false);
        assert_eq!(strict.classify(201), Verdict::Pass);
        assert_eq!(strict.classify(404), Verdict::Pass);
        assert_eq!(strict.classify(500), Verdict::Fail);
        assert_eq!(strict.classify(403), Verdict::Fail);

        let lenient = Oracle::new(BTreeSet::from([404]), true);
        assert_eq!(lenient.classify(403), Verdict::Pass);
        assert_eq!(lenient.classify(503), Verdict::Fail);
    }

    #[test]
    fn test_declared_server_error_still_fails() {
        let oracle = Oracle::new(BTreeSet::from([500]), true);
        assert_eq!(oracle.classify(500), Verdict::Fail);
    }

    #[test]
    fn test_describe_failure() {
        let oracle = Oracle::new(BTreeSet::from([404]), false);
        assert_eq!(oracle.describe_failure(502), "server error 502");
        assert!(oracle.describe_failure(403).contains("undeclared response code 403"));
    }
}
