//! `orca` command line: runs task batches against the orchestrator and prints
//! monitoring reports over the persisted execution history.

mod simulated;

use clap::{Parser, Subcommand};
use orca_core::{Priority, TaskType};
use orca_history::FileLogStore;
use orca_orchestrator::{
    default_agents, AgentConfig, AgentDescriptor, AlertThresholds, Coordinator, MonitorConfig,
    MonitorScheduler, OrchestratorConfig, TaskPayload, TimeRange,
};
use serde::Deserialize;
use simulated::SimulatedAgent;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "orca", about = "Orca: agent task orchestration")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "orca.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a batch of task requests and wait for them to finish
    Run {
        /// JSON file holding an array of task requests
        batch: PathBuf,
        /// Give up waiting on a task after this many seconds
        #[arg(long, default_value_t = 300)]
        wait_secs: u64,
    },
    /// List configured agents and their capabilities
    Agents,
    /// Print a monitoring report over the persisted history
    Report {
        /// Window: 1h, 24h, 7d or 30d
        #[arg(long, default_value = "24h")]
        range: String,
    },
}

#[derive(Deserialize, Default)]
struct OrcaConfig {
    #[serde(default = "default_data_dir")]
    data_dir: PathBuf,
    #[serde(default)]
    orchestrator: OrchestratorConfig,
    #[serde(default)]
    alerts: AlertThresholds,
    #[serde(default)]
    monitor: MonitorConfig,
    #[serde(default)]
    simulation: SimulationConfig,
    #[serde(default)]
    agents: Vec<AgentConfig>,
}

#[derive(Deserialize, Default)]
struct SimulationConfig {
    /// Artificial latency added to every simulated invocation.
    #[serde(default)]
    latency_ms: u64,
}

/// One entry of a batch file: the tagged payload plus who asked and how urgently.
#[derive(Deserialize)]
struct BatchEntry {
    #[serde(default = "default_requested_by")]
    requested_by: String,
    #[serde(default)]
    priority: Priority,
    #[serde(flatten)]
    payload: TaskPayload,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_requested_by() -> String {
    "cli".to_string()
}

async fn load_config(path: &Path) -> anyhow::Result<OrcaConfig> {
    if !path.exists() {
        warn!(path = %path.display(), "Config file not found, using defaults");
        return Ok(OrcaConfig {
            data_dir: default_data_dir(),
            ..OrcaConfig::default()
        });
    }
    let config_str = tokio::fs::read_to_string(path).await.map_err(|e| {
        anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e)
    })?;
    Ok(toml::from_str(&config_str)?)
}

fn agent_roster(config: &OrcaConfig) -> anyhow::Result<Vec<AgentDescriptor>> {
    if config.agents.is_empty() {
        return Ok(default_agents());
    }
    config
        .agents
        .iter()
        .map(|a| a.to_descriptor().map_err(anyhow::Error::from))
        .collect()
}

async fn build_coordinator(config: &OrcaConfig) -> anyhow::Result<Arc<Coordinator>> {
    let history = Arc::new(FileLogStore::new(config.data_dir.join("history")).await?);
    let coordinator = Arc::new(Coordinator::new(
        config.orchestrator.clone(),
        config.alerts.clone(),
        history,
    )?);

    let latency = Duration::from_millis(config.simulation.latency_ms);
    for descriptor in agent_roster(config)? {
        coordinator.register_agent(descriptor, Arc::new(SimulatedAgent::new(latency)));
    }
    Ok(coordinator)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config).await?;

    match cli.command {
        Commands::Run { batch, wait_secs } => {
            let raw = tokio::fs::read_to_string(&batch).await.map_err(|e| {
                anyhow::anyhow!("Failed to read batch file '{}': {}", batch.display(), e)
            })?;
            let entries: Vec<BatchEntry> = serde_json::from_str(&raw)?;

            let coordinator = build_coordinator(&config).await?;
            let monitor = MonitorScheduler::from_config(&config.monitor)?.start(coordinator.clone());

            let mut accepted = Vec::new();
            let mut rejected = Vec::new();
            for (index, entry) in entries.into_iter().enumerate() {
                match coordinator.create_task(&entry.requested_by, entry.payload, entry.priority) {
                    Ok(receipt) => accepted.push(receipt.task_id),
                    Err(e) => {
                        warn!(index, error = %e, "Batch entry rejected");
                        rejected.push(serde_json::json!({ "index": index, "error": e.to_string() }));
                    }
                }
            }
            info!(accepted = accepted.len(), rejected = rejected.len(), "Batch submitted");

            let mut tasks = Vec::new();
            for id in accepted {
                let waited = tokio::time::timeout(
                    Duration::from_secs(wait_secs),
                    coordinator.orchestrator().wait_for_terminal(id),
                )
                .await;
                match waited {
                    Ok(Some(task)) => tasks.push(task),
                    Ok(None) => warn!(task_id = %id, "Task record disappeared"),
                    Err(_) => {
                        warn!(task_id = %id, "Task still pending after wait limit");
                        if let Some(task) = coordinator.get_task_status(id) {
                            tasks.push(task);
                        }
                    }
                }
            }
            monitor.abort();

            if tokio::time::timeout(
                Duration::from_secs(5),
                coordinator.orchestrator().wait_for_in_flight(),
            )
            .await
            .is_err()
            {
                warn!("Some invocations are still running; report may be incomplete");
            }
            let range = TimeRange::from_str(&config.monitor.report_range)?;
            let report = coordinator.get_monitoring_report(range).await?;
            let output = serde_json::json!({
                "tasks": tasks,
                "rejected": rejected,
                "report": report,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Agents => {
            let agents = agent_roster(&config)?;
            println!("Configured agents:");
            for agent in &agents {
                let caps: Vec<&str> = agent.capabilities.iter().map(TaskType::as_str).collect();
                let state = if agent.active { "active" } else { "inactive" };
                println!("  {} ({state}): {}", agent.name, caps.join(", "));
            }
            println!("\nTotal: {} agent(s)", agents.len());
        }
        Commands::Report { range } => {
            let range = TimeRange::from_str(&range)?;
            let coordinator = build_coordinator(&config).await?;
            let report = coordinator.get_monitoring_report(range).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_config_parses() {
        let config: OrcaConfig = toml::from_str(include_str!("../../../orca.toml")).unwrap();
        assert_eq!(config.orchestrator.max_concurrent, 5);
        assert_eq!(config.monitor.report_range, "1h");
        assert_eq!(config.simulation.latency_ms, 250);
        assert_eq!(agent_roster(&config).unwrap().len(), 4);
    }

    #[test]
    fn test_empty_config_uses_default_roster() {
        let config: OrcaConfig = toml::from_str("").unwrap();
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(agent_roster(&config).unwrap().len(), default_agents().len());
    }

    #[test]
    fn test_demo_batch_parses() {
        let entries: Vec<BatchEntry> =
            serde_json::from_str(include_str!("../../../demos/batch.json")).unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].priority, Priority::High);
        assert_eq!(entries[0].requested_by, "marketing-site");
        assert_eq!(entries[1].priority, Priority::Medium);
        assert_eq!(entries[1].requested_by, "cli");
        assert_eq!(entries[2].payload.task_type(), TaskType::VoiceAgentDeployment);
        assert!(entries.iter().all(|e| e.payload.validate().is_ok()));
    }

    #[tokio::test]
    async fn test_build_coordinator_registers_roster() {
        let dir = tempfile::tempdir().unwrap();
        let config = OrcaConfig {
            data_dir: dir.path().to_path_buf(),
            ..OrcaConfig::default()
        };
        let coordinator = build_coordinator(&config).await.unwrap();
        let status = coordinator.get_agent_status();
        assert_eq!(status.len(), 4);
        assert!(status.values().all(|active| *active));
    }
}
