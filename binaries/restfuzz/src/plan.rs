//! Plan files: a persisted list of endpoints and example counts.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use restfuzz_core::{ApiModel, Endpoint, Method};

/// Example count written into generated plans.
pub const DEFAULT_EXAMPLES: usize = 100;

/// One planned check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub method: Method,
    /// Path template, matched exactly.
    pub endpoint: String,
    pub examples: usize,
}

/// Errors that can occur while reading or resolving a plan.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("failed to read plan {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write plan: {0}")]
    Write(#[source] std::io::Error),

    #[error("malformed plan: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("plan entry {method} {endpoint} matches no endpoint")]
    UnknownEndpoint { method: Method, endpoint: String },
}

/// An endpoint selected for a run, with its example count.
#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
    pub endpoint: &'a Endpoint,
    pub examples: usize,
}

/// One entry per endpoint, in model order.
pub fn plan_for(model: &ApiModel, examples: usize) -> Vec<PlanEntry> {
    model
        .endpoints
        .iter()
        .map(|endpoint| PlanEntry {
            method: endpoint.method,
            endpoint: endpoint.path.clone(),
            examples,
        })
        .collect()
}

/// Write the default plan for `model` as YAML.
pub fn write_plan<W: Write>(model: &ApiModel, mut writer: W) -> Result<(), PlanError> {
    let text = serde_yaml::to_string(&plan_for(model, DEFAULT_EXAMPLES))?;
    writer.write_all(text.as_bytes()).map_err(PlanError::Write)?;
    writer.flush().map_err(PlanError::Write)
}

pub fn parse_plan(text: &str) -> Result<Vec<PlanEntry>, PlanError> {
    Ok(serde_yaml::from_str(text)?)
}

pub fn read_plan(path: &Path) -> Result<Vec<PlanEntry>, PlanError> {
    let text = std::fs::read_to_string(path).map_err(|source| PlanError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_plan(&text)
}

/// Look up every entry by exact method and path. An entry with no
/// matching endpoint is an error.
pub fn resolve<'a>(
    model: &'a ApiModel,
    entries: &[PlanEntry],
) -> Result<Vec<Selection<'a>>, PlanError> {
    entries
        .iter()
        .map(|entry| {
            model
                .find_endpoint(entry.method, &entry.endpoint)
                .map(|endpoint| Selection {
                    endpoint,
                    examples: entry.examples,
                })
                .ok_or_else(|| PlanError::UnknownEndpoint {
                    method: entry.method,
                    endpoint: entry.endpoint.clone(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> ApiModel {
        ApiModel {
            definitions: Default::default(),
            endpoints: vec![
                Endpoint::new(Method::Get, "/pets").with_response(200),
                Endpoint::new(Method::Post, "/pets").with_response(201),
                Endpoint::new(Method::Delete, "/pets/{id}"),
            ],
        }
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let model = model();
        let mut out = Vec::new();
        write_plan(&model, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("method: GET"));
        assert!(text.contains("/pets/{id}"));

        let entries = parse_plan(&text).unwrap();
        assert_eq!(entries, plan_for(&model, DEFAULT_EXAMPLES));

        let selections = resolve(&model, &entries).unwrap();
        assert_eq!(selections.len(), 3);
        for (selection, endpoint) in selections.iter().zip(&model.endpoints) {
            assert_eq!(selection.endpoint, endpoint);
            assert_eq!(selection.examples, 100);
        }
    }

    #[test]
    fn test_read_plan_keeps_order_and_counts() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "- method: DELETE\n  endpoint: /pets/{{id}}\n  examples: 3\n- method: GET\n  endpoint: /pets\n  examples: 7"
        )
        .unwrap();

        let model = model();
        let entries = read_plan(file.path()).unwrap();
        let selections = resolve(&model, &entries).unwrap();

        assert_eq!(selections[0].endpoint.method, Method::Delete);
        assert_eq!(selections[0].examples, 3);
        assert_eq!(selections[1].endpoint.path, "/pets");
        assert_eq!(selections[1].examples, 7);
    }

    #[test]
    fn test_unknown_endpoint_is_an_error() {
        let entries = vec![
            PlanEntry {
                method: Method::Get,
                endpoint: "/pets".to_string(),
                examples: 1,
            },
            PlanEntry {
                method: Method::Put,
                endpoint: "/pets".to_string(),
                examples: 1,
            },
        ];

        let err = resolve(&model(), &entries).unwrap_err();
        assert!(matches!(
            err,
            PlanError::UnknownEndpoint { method: Method::Put, ref endpoint } if endpoint == "/pets"
        ));
        assert_eq!(err.to_string(), "plan entry PUT /pets matches no endpoint");
    }

    #[test]
    fn test_malformed_plan() {
        assert!(matches!(
            parse_plan("- method: HEAD\n  endpoint: /\n  examples: 1"),
            Err(PlanError::Yaml(_))
        ));

        let missing = read_plan(Path::new("/nonexistent/plan.yaml")).unwrap_err();
        assert!(matches!(missing, PlanError::Io { .. }));
    }
}
