//! Fuzzer configuration.
//!
//! Configuration comes from an optional TOML file, then CLI arguments, then
//! the proxy environment variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use restfuzz_generator::GeneratorConfig;
use restfuzz_transport::TransportConfig;

/// Environment variables consulted for a proxy, in order.
const PROXY_VARIABLES: [&str; 2] = ["http_proxy", "HTTP_PROXY"];

/// Fuzzer configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzConfig {
    /// Run behaviour.
    pub run: RunConfig,

    /// Value generation.
    pub generator: GeneratorConfig,

    /// HTTP client.
    pub transport: TransportConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Run behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Examples per endpoint in interactive mode and in generated plans.
    pub examples: usize,

    /// Accept response codes the description does not declare.
    pub allow_undeclared: bool,

    /// Seed for the random source. A random seed is drawn and logged when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Where to write the JSON run summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_path: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            examples: crate::plan::DEFAULT_EXAMPLES,
            allow_undeclared: false,
            seed: None,
            report_path: None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    /// Log format (pretty, json, compact).
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl FuzzConfig {
    /// Loads configuration from a file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Merges CLI arguments into the configuration.
    pub fn merge_cli_args(&mut self, args: &super::CliArgs) {
        if args.allow_undeclared {
            self.run.allow_undeclared = true;
        }

        if let Some(seed) = args.seed {
            self.run.seed = Some(seed);
        }

        if let Some(ref path) = args.report {
            self.run.report_path = Some(path.clone());
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }

        if args.json_logs {
            self.logging.format = "json".to_string();
        }
    }

    /// Route requests through the proxy named by `http_proxy` or
    /// `HTTP_PROXY`, when either is set.
    pub fn apply_proxy_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let proxy = PROXY_VARIABLES
            .iter()
            .filter_map(|name| lookup(name))
            .find(|value| !value.trim().is_empty());

        if let Some(proxy) = proxy {
            self.transport.proxy = Some(proxy);
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("Invalid log level: {}", self.logging.level);
        }

        let valid_formats = ["pretty", "json", "compact"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            anyhow::bail!("Invalid log format: {}", self.logging.format);
        }

        let p = self.generator.absent_probability;
        if !(0.0..=1.0).contains(&p) {
            anyhow::bail!("generator.absent_probability must be within [0, 1], got {}", p);
        }

        if self.generator.numeric_span < 0 {
            anyhow::bail!("generator.numeric_span must not be negative");
        }

        if self.generator.max_depth == 0 {
            anyhow::bail!("generator.max_depth must be positive");
        }

        if self.run.examples == 0 {
            anyhow::bail!("run.examples must be positive");
        }

        if self.transport.timeout_secs == Some(0) {
            anyhow::bail!("transport.timeout_secs must be positive when set");
        }

        Ok(())
    }
}
