//! restfuzz - Schema-aware HTTP API fuzzer.
//!
//! Reads a Swagger 2.0 description, generates random well-typed requests for
//! its endpoints and reports every request the server answers with a 5xx or
//! an undeclared status code.
//!
//! # Usage
//!
//! ```bash
//! # Pick an endpoint interactively
//! restfuzz http://localhost:8080 petstore.yaml
//!
//! # Print a plan covering every endpoint, edit it, then run it
//! restfuzz http://localhost:8080 petstore.yaml --plan > plan.yaml
//! restfuzz http://localhost:8080 petstore.yaml --plan=plan.yaml --seed 42
//! ```

mod config;
mod interactive;
mod plan;

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rand::SeedableRng;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::FuzzConfig;
use plan::Selection;
use restfuzz_checker::{Executor, RunSummary, TrialRecord};
use restfuzz_core::{ApiModel, Method};
use restfuzz_generator::{EndpointSampler, GeneratorEngine, RandomSource};
use restfuzz_transport::HttpTransport;

/// CLI arguments for restfuzz.
#[derive(Parser, Debug)]
#[command(
    name = "restfuzz",
    about = "Fuzz an HTTP API from its Swagger 2.0 description",
    version
)]
pub struct CliArgs {
    /// Base URL of the server under test, e.g. http://localhost:8080.
    #[arg(value_name = "SERVER_URL", required_unless_present = "print_config")]
    server_url: Option<String>,

    /// Path or http(s) URL of the Swagger document (JSON or YAML).
    #[arg(value_name = "SPEC", required_unless_present = "print_config")]
    spec_location: Option<String>,

    /// Accept response codes the description does not declare.
    #[arg(long)]
    allow_undeclared: bool,

    /// Print a plan for every endpoint, or run the plan in FILE.
    #[arg(long, value_name = "FILE", num_args = 0..=1, require_equals = true)]
    plan: Option<Option<PathBuf>>,

    /// Path to the configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Seed for the random source.
    #[arg(long, value_name = "N")]
    seed: Option<u64>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Enable JSON log output.
    #[arg(long)]
    json_logs: bool,

    /// Write a JSON summary of the run to FILE.
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Print the default configuration and exit.
    #[arg(long)]
    print_config: bool,
}

/// What the invocation asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    WritePlan,
    ReadPlan(PathBuf),
    Interactive,
}

impl CliArgs {
    fn mode(&self) -> Mode {
        match &self.plan {
            Some(Some(path)) => Mode::ReadPlan(path.clone()),
            Some(None) => Mode::WritePlan,
            None => Mode::Interactive,
        }
    }
}

/// A loaded API with a sampler for each of its endpoints.
struct FuzzApp {
    config: FuzzConfig,
    server_url: String,
    model: ApiModel,
    samplers: HashMap<(Method, String), EndpointSampler>,
}

impl FuzzApp {
    /// Builds every endpoint sampler up front so an unsupported description
    /// fails before any request is sent.
    fn new(config: FuzzConfig, server_url: String, model: ApiModel) -> Result<Self> {
        let engine = GeneratorEngine::with_config(&model.definitions, config.generator.clone())
            .context("Unsupported API description")?;

        let samplers = model
            .endpoints
            .iter()
            .map(|endpoint| {
                engine
                    .endpoint_sampler(endpoint, &server_url)
                    .map(|sampler| ((endpoint.method, endpoint.path.clone()), sampler))
                    .with_context(|| format!("Unsupported endpoint {}", endpoint))
            })
            .collect::<Result<HashMap<_, _>>>()?;

        info!(
            endpoints = samplers.len(),
            definitions = model.definitions.len(),
            "API description loaded"
        );

        Ok(Self {
            config,
            server_url,
            model,
            samplers,
        })
    }

    async fn run(&self, mode: Mode) -> Result<()> {
        let selections = match mode {
            Mode::WritePlan => {
                plan::write_plan(&self.model, std::io::stdout().lock())?;
                return Ok(());
            }
            Mode::ReadPlan(path) => {
                let entries = plan::read_plan(&path)?;
                plan::resolve(&self.model, &entries)?
            }
            Mode::Interactive => {
                let stdin = std::io::stdin();
                let chosen = interactive::choose(
                    &self.model,
                    &self.server_url,
                    self.config.run.examples,
                    &mut stdin.lock(),
                    &mut std::io::stdout(),
                )?;
                match chosen {
                    Some(selection) => vec![selection],
                    None => {
                        info!("Run cancelled");
                        return Ok(());
                    }
                }
            }
        };

        let summary = self.check(&selections).await?;
        println!("{}", summary);

        if let Some(ref path) = self.config.run.report_path {
            std::fs::write(path, summary.to_json()?)
                .with_context(|| format!("Failed to write report to {:?}", path))?;
            info!(path = ?path, "Report written");
        }

        if !summary.is_success() {
            anyhow::bail!(
                "{} endpoint(s) failed, {} errored",
                summary.failed(),
                summary.errored()
            );
        }
        Ok(())
    }

    /// Checks the selected endpoints in order with one random source.
    async fn check(&self, selections: &[Selection<'_>]) -> Result<RunSummary> {
        let seed = self.config.run.seed.unwrap_or_else(rand::random);
        info!(seed, "Seeded random source");

        let transport =
            HttpTransport::new(&self.config.transport).context("Failed to build HTTP client")?;
        let mut executor = Executor::new(transport, self.config.run.allow_undeclared)
            .with_progress(|record| println!("{}", trial_line(record)));
        let mut rng = RandomSource::seed_from_u64(seed);
        let mut summary = RunSummary::new(seed, self.config.run.allow_undeclared);

        for selection in selections {
            let key = (selection.endpoint.method, selection.endpoint.path.clone());
            let sampler = self
                .samplers
                .get(&key)
                .with_context(|| format!("No sampler for {}", selection.endpoint))?;

            match executor.run(sampler, selection.examples, &mut rng).await {
                Ok(result) => {
                    println!("{}", result);
                    summary.record_result(result.with_seed(seed));
                }
                Err(e) => {
                    error!(endpoint = %sampler.identity(), error = %e, "Run aborted");
                    println!("{}: ERROR {}", sampler.identity(), e);
                    if let Some(transcript) = e.transcript() {
                        println!("{}", transcript);
                    }
                    summary.record_error(sampler.identity().to_string(), &e);
                }
            }
        }

        summary.finish();
        if !summary.is_success() {
            warn!(
                failed = summary.failed(),
                errored = summary.errored(),
                "Run found problems"
            );
        }
        Ok(summary)
    }
}

/// One progress line per classified trial.
fn trial_line(record: &TrialRecord) -> String {
    format!(
        "  trial {}: {} {} {}",
        record.trial, record.status, record.verdict, record.url
    )
}

/// Initialize the tracing subscriber. Logs go to stderr so stdout carries
/// only plans and results.
fn init_tracing(config: &config::LoggingConfig, json_logs: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("Failed to parse log filter")?;

    let format = if json_logs || config.format == "json" {
        "json"
    } else {
        &config.format
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;
        }
        "compact" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    if args.print_config {
        let config = FuzzConfig::default();
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let mut config = if let Some(ref config_path) = args.config {
        FuzzConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else {
        FuzzConfig::default()
    };

    config.merge_cli_args(&args);
    config.apply_proxy_env(|name| std::env::var(name).ok());
    config.validate().context("Invalid configuration")?;

    init_tracing(&config.logging, args.json_logs)?;

    info!(version = env!("CARGO_PKG_VERSION"), "restfuzz starting");

    // clap enforces both positionals unless --print-config was given.
    let (Some(server_url), Some(spec_location)) =
        (args.server_url.clone(), args.spec_location.clone())
    else {
        anyhow::bail!("SERVER_URL and SPEC are required");
    };

    let model = restfuzz_spec::load(&spec_location)
        .await
        .with_context(|| format!("Failed to load API description from {}", spec_location))?;

    let app = FuzzApp::new(config, server_url, model)?;
    if let Err(e) = app.run(args.mode()).await {
        error!(error = %e, "restfuzz failed");
        return Err(e);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use restfuzz_checker::Verdict;
    use restfuzz_core::{Endpoint, Parameter, SimpleSchema};

    #[test]
    fn test_trial_line() {
        let record = TrialRecord {
            trial: 3,
            url: "http://localhost:8080/pets?limit=2".to_string(),
            status: 503,
            verdict: Verdict::Fail,
        };
        assert_eq!(
            trial_line(&record),
            "  trial 3: 503 FAIL http://localhost:8080/pets?limit=2"
        );
    }

    #[test]
    fn test_cli_args_parsing() {
        let args = CliArgs::parse_from(["restfuzz", "http://localhost:8080", "petstore.yaml"]);
        assert_eq!(args.server_url.as_deref(), Some("http://localhost:8080"));
        assert_eq!(args.spec_location.as_deref(), Some("petstore.yaml"));
        assert!(!args.allow_undeclared);
        assert!(args.config.is_none());
        assert_eq!(args.mode(), Mode::Interactive);
    }

    #[test]
    fn test_plan_flag_modes() {
        let args = CliArgs::parse_from(["restfuzz", "--plan", "http://h", "api.json"]);
        assert_eq!(args.mode(), Mode::WritePlan);
        assert_eq!(args.server_url.as_deref(), Some("http://h"));

        let args = CliArgs::parse_from(["restfuzz", "http://h", "api.json", "--plan=plan.yaml"]);
        assert_eq!(args.mode(), Mode::ReadPlan(PathBuf::from("plan.yaml")));
    }

    #[test]
    fn test_cli_args_with_options() {
        let args = CliArgs::parse_from([
            "restfuzz",
            "http://h",
            "api.json",
            "--allow-undeclared",
            "--seed",
            "9",
            "-l",
            "debug",
            "--json-logs",
        ]);

        assert!(args.allow_undeclared);
        assert_eq!(args.seed, Some(9));
        assert_eq!(args.log_level, Some("debug".to_string()));
        assert!(args.json_logs);
    }

    #[test]
    fn test_malformed_invocation() {
        assert!(CliArgs::try_parse_from(["restfuzz"]).is_err());
        assert!(CliArgs::try_parse_from(["restfuzz", "http://h"]).is_err());
        assert!(CliArgs::try_parse_from(["restfuzz", "http://h", "api.json", "--bogus"]).is_err());

        let args = CliArgs::try_parse_from(["restfuzz", "--print-config"]).unwrap();
        assert!(args.print_config);
    }

    #[test]
    fn test_app_rejects_unsupported_endpoint() {
        let model = ApiModel {
            definitions: Default::default(),
            endpoints: vec![
                Endpoint::new(Method::Get, "/ok")
                    .with_parameter(Parameter::query("q", SimpleSchema::string())),
                Endpoint::new(Method::Get, "/bad")
                    .with_parameter(Parameter::query("q", SimpleSchema::new("object"))),
            ],
        };

        let err = FuzzApp::new(FuzzConfig::default(), "http://h".to_string(), model)
            .err()
            .unwrap();
        assert!(err.to_string().contains("GET /bad"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_reported_as_error() {
        let model = ApiModel {
            definitions: Default::default(),
            endpoints: vec![Endpoint::new(Method::Get, "/ping").with_response(200)],
        };
        let mut config = FuzzConfig::default();
        config.run.seed = Some(1);

        let app = FuzzApp::new(config, "http://127.0.0.1:1".to_string(), model).unwrap();
        let selection = Selection {
            endpoint: &app.model.endpoints[0],
            examples: 3,
        };

        let summary = app.check(&[selection]).await.unwrap();
        assert_eq!(summary.errored(), 1);
        assert_eq!(summary.seed, 1);
        assert!(!summary.is_success());
    }
}
