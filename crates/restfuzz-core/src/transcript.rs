//! `curl` transcripts of concrete requests.
//!
//! The transcript is the human-readable form of a request and the artifact
//! reported when a trial fails, so it must replay the exact request.

use std::fmt;

use crate::request::ConcreteRequest;

/// Quote `arg` for a POSIX shell.
pub fn shell_quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', r"'\''"))
}

impl fmt::Display for ConcreteRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "curl -v -X {} {}",
            self.method,
            shell_quote(&self.full_url())
        )?;

        for (name, value) in &self.headers {
            write!(f, " -H {}", shell_quote(&format!("{}: {}", name, value)))?;
        }

        if let Some(body) = self.body_json() {
            write!(f, " -H {}", shell_quote("Content-Type: application/json"))?;
            write!(f, " -d {}", shell_quote(&body))?;
        } else if let Some(form) = self.form_body() {
            write!(f, " -d {}", shell_quote(&form))?;
        }

        Ok(())
    }
}
