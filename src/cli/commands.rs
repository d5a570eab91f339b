//! CLI command implementations
//!
//! Every command reads its inputs from files, runs one engine operation and
//! returns a JSON document. `run_command` writes that document to stdout as
//! `{"status": "ok", "data": ...}`.

use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::epistemic::EventValidator;
use crate::executor::ChainExecutor;
use crate::horizon::{EventProvider, HorizonDescriptor, HorizonLattice};
use crate::observability::{log_event, LogEvent, Logger, MetricsRegistry, Severity};
use crate::operator::{build_chain, BuildOptions, ChainValidator, OperatorChain};
use crate::store::{MemoryEventStore, MemorySourceStore};

use super::args::{Command, DEFAULT_CONFIG_PATH};
use super::errors::{CliError, CliResult};
use super::io::write_response;

/// Engine configuration, loaded from JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Minimum log severity: trace, info, warn, error or fatal (default: "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Upper bound on rows held between steps; unset means unbounded
    #[serde(default)]
    pub max_rows: Option<usize>,

    /// Promote advisory chain warnings to blocking errors at build time
    #[serde(default)]
    pub treat_warnings_as_errors: bool,

    /// Actor recorded on emitted set-defined events (default: "system")
    #[serde(default = "default_actor")]
    pub default_actor: String,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_actor() -> String {
    "system".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            max_rows: None,
            treat_warnings_as_errors: false,
            default_actor: default_actor(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load the explicit path, or the default path when present, or defaults.
    ///
    /// An explicit path that does not exist is an error.
    pub fn resolve(explicit: Option<&Path>) -> CliResult<Self> {
        let (config, source) = match explicit {
            Some(path) => (Self::load(path)?, path.display().to_string()),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    (Self::load(default_path)?, DEFAULT_CONFIG_PATH.to_string())
                } else {
                    (Self::default(), "defaults".to_string())
                }
            }
        };
        log_event(
            LogEvent::ConfigLoaded,
            &[
                ("log_level", config.log_level.as_str()),
                ("source", source.as_str()),
            ],
        );
        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if Severity::parse(&self.log_level).is_none() {
            return Err(CliError::config_error(format!(
                "Invalid log_level: '{}'. Must be one of trace, info, warn, error, fatal.",
                self.log_level
            )));
        }

        if self.max_rows == Some(0) {
            return Err(CliError::config_error("max_rows must be > 0"));
        }

        if self.default_actor.trim().is_empty() {
            return Err(CliError::config_error("default_actor must not be empty"));
        }

        Ok(())
    }

    /// Parsed minimum log severity
    pub fn severity(&self) -> Severity {
        Severity::parse(&self.log_level).unwrap_or(Severity::Info)
    }

    pub fn build_options<'a>(&self, metrics: Option<&'a MetricsRegistry>) -> BuildOptions<'a> {
        BuildOptions {
            treat_warnings_as_errors: self.treat_warnings_as_errors,
            metrics,
        }
    }
}

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    let config = Config::resolve(cli.config.as_deref())?;
    Logger::set_min_severity(config.severity());
    let data = run_command(&config, cli.command)?;
    write_response(data)
}

/// Run one command and return its JSON output
pub fn run_command(config: &Config, cmd: Command) -> CliResult<Value> {
    match cmd {
        Command::Validate { chain } => validate(config, &chain),
        Command::Execute { chain, sources } => execute(config, &chain, &sources),
        Command::Audit { events } => audit(&events),
        Command::Gate {
            events,
            horizons,
            horizon,
        } => gate(&events, &horizons, &horizon),
        Command::Verify {
            events,
            horizons,
            parent,
            child,
        } => verify(&events, &horizons, &parent, &child),
    }
}

/// Validate a chain file.
///
/// An invalid chain is a normal report, not an error. A valid one also
/// carries the set definition and its set-defined event.
pub fn validate(config: &Config, chain_path: &Path) -> CliResult<Value> {
    let chain = load_chain(chain_path)?;
    let validation = ChainValidator::validate(&chain);
    let produced_type = chain.produced_type();
    let blocked = !validation.is_valid()
        || (config.treat_warnings_as_errors && !validation.warnings.is_empty());

    let mut report = json!({
        "valid": !blocked,
        "produced_type": produced_type.as_str(),
        "errors": validation.errors,
        "warnings": validation.warnings,
        "flagged": validation.flagged,
    });

    if !blocked {
        let set = build_chain(chain, config.build_options(None))?;
        let event = set.to_event(&config.default_actor, Utc::now())?;
        report["set"] = serde_json::to_value(&set)?;
        report["event"] = event.to_value();
    }
    Ok(report)
}

/// Build a chain and execute it against a sources file
pub fn execute(config: &Config, chain_path: &Path, sources_path: &Path) -> CliResult<Value> {
    let metrics = MetricsRegistry::new();
    let chain = load_chain(chain_path)?;
    let set = build_chain(chain, config.build_options(Some(&metrics)))?;
    let sources = MemorySourceStore::load(sources_path)?;

    let result = ChainExecutor::new(&sources)
        .with_max_rows(config.max_rows)
        .with_metrics(&metrics)
        .execute(&set)?;

    Ok(json!({
        "set_id": set.id(),
        "name": set.name(),
        "strategy": set.strategy().as_str(),
        "fingerprint": set.fingerprint(),
        "result": result.to_value(),
        "metrics": metrics.snapshot(),
    }))
}

/// Run the advisory validator over every event in a file
pub fn audit(events_path: &Path) -> CliResult<Value> {
    let store = MemoryEventStore::load(events_path, false)?;

    let mut violations = Vec::new();
    let mut clean = 0usize;
    for event in store.iter() {
        let found = EventValidator::validate(event);
        if found.is_empty() {
            clean += 1;
        }
        violations.extend(found);
    }

    let superseded: Vec<&str> = store
        .iter()
        .map(|e| e.id())
        .filter(|id| store.is_superseded(id))
        .collect();

    Ok(json!({
        "events": store.len(),
        "clean": clean,
        "violations": violations,
        "superseded": superseded,
    }))
}

/// List what one horizon can see, and why the rest is denied
pub fn gate(events_path: &Path, horizons_path: &Path, horizon_id: &str) -> CliResult<Value> {
    let store = MemoryEventStore::load(events_path, false)?;
    let lattice = load_lattice(horizons_path)?;
    let metrics = MetricsRegistry::new();
    let gate = lattice.gate(horizon_id, &store)?.with_metrics(&metrics);

    let mut available = Vec::new();
    let mut denied = Vec::new();
    for event in store.events() {
        if gate.is_available(event) {
            available.push(event.id());
            continue;
        }
        let reason = gate.denial_reason(event).map_or("unknown", |r| r.as_str());
        denied.push(json!({
            "event_id": event.id(),
            "reason": reason,
        }));
    }

    Ok(json!({
        "horizon": horizon_id,
        "available": available,
        "denied": denied,
        "metrics": metrics.snapshot(),
    }))
}

/// Operational restrictivity check for one parent/child pair
pub fn verify(
    events_path: &Path,
    horizons_path: &Path,
    parent: &str,
    child: &str,
) -> CliResult<Value> {
    let store = MemoryEventStore::load(events_path, false)?;
    let lattice = load_lattice(horizons_path)?;
    let check = lattice.verify_restrictivity(parent, child, &store)?;
    Ok(json!({
        "parent": parent,
        "child": child,
        "holds": check.holds(),
        "check": check,
    }))
}

fn read_json(path: &Path) -> CliResult<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        CliError::io_error(format!("Failed to read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content)
        .map_err(|e| CliError::input_error(format!("Invalid JSON in {}: {}", path.display(), e)))
}

fn load_chain(path: &Path) -> CliResult<OperatorChain> {
    let value = read_json(path)?;
    Ok(OperatorChain::from_value(&value)?)
}

/// Descriptors as a bare array or under a `horizons` key
fn load_lattice(path: &Path) -> CliResult<HorizonLattice> {
    let value = read_json(path)?;
    let list = match value {
        Value::Object(mut obj) => obj.remove("horizons").ok_or_else(|| {
            CliError::input_error(format!("{}: expected a 'horizons' array", path.display()))
        })?,
        other => other,
    };
    let descriptors: Vec<HorizonDescriptor> = serde_json::from_value(list).map_err(|e| {
        CliError::input_error(format!("Invalid horizon descriptors: {}", e))
    })?;
    Ok(HorizonLattice::import(descriptors)?)
}
