//! Singularity reconciler CLI
//!
//! Entry point for the `singularity-ctl` command-line tool.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use singularity_reconciler::api::TransportError;
use singularity_reconciler::config::{env_overrides, ConfigError, EffectiveConfig};
use singularity_reconciler::manifest::ManifestError;
use singularity_reconciler::reconcile::{
    DeploymentReconciler, DeploymentRecord, FailureKind, JobReconciler, ReconcileError,
};
use singularity_reconciler::{Manifest, SingularityClient};

const DEFAULT_CONFIG: &str = "singularity.toml";

#[derive(Parser)]
#[command(name = "singularity-ctl")]
#[command(about = "Reconcile Singularity jobs and deploys", version)]
struct Cli {
    /// Path to config file (default: singularity.toml if present)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Scheduler host
    #[arg(long, global = true)]
    host: Option<String>,

    /// Scheduler port (0 or 80 = http, 443 = https)
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Attempts per request
    #[arg(long, global = true)]
    retry: Option<u32>,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile a manifest
    Apply {
        /// Manifest with optional [job] and [deployment] tables
        manifest: PathBuf,
    },

    /// Print the remote state of a resource as JSON
    Read {
        #[command(subcommand)]
        resource: ReadCommands,
    },

    /// Adopt an existing resource and print its record
    Import {
        #[command(subcommand)]
        resource: ImportCommands,
    },

    /// Delete a resource
    Delete {
        #[command(subcommand)]
        resource: DeleteCommands,
    },

    /// List job ids with their state
    List,
}

#[derive(Subcommand)]
enum ReadCommands {
    /// Read a job
    Job { id: String },
    /// Read a job's active deploy (pending if none is active)
    Deploy {
        job_id: String,
        /// Specific deploy id
        #[arg(long)]
        deploy_id: Option<String>,
    },
}

#[derive(Subcommand)]
enum ImportCommands {
    /// Import a job by id
    Job { id: String },
    /// Import a deploy by id
    Deploy { deploy_id: String },
}

#[derive(Subcommand)]
enum DeleteCommands {
    /// Delete a job
    Job { id: String },
    /// Cancel a pending deploy, or delete the job of an active one
    Deploy { job_id: String, deploy_id: String },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Invalid endpoint: {0}")]
    Endpoint(#[from] TransportError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::Endpoint(_) => FailureKind::Config as i32,
            CliError::Manifest(ManifestError::Io { .. }) | CliError::Manifest(ManifestError::Parse(_)) => {
                FailureKind::Config as i32
            }
            CliError::Manifest(_) => FailureKind::Validation as i32,
            CliError::Reconcile(err) => err.exit_code(),
            CliError::Output(_) => 1,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli) {
        if let CliError::Reconcile(inner) = &err {
            if let Some(record) = inner.partial_record() {
                // Partial progress still goes to stdout so callers can persist it.
                if let Ok(rendered) = serde_json::to_string_pretty(record) {
                    println!("{}", rendered);
                }
            }
        }
        eprintln!("Error: {}", err);
        process::exit(err.exit_code());
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(&cli)?;
    let client = config.client_settings()?.connect()?;
    let settings = config.reconcile_settings();
    let jobs = JobReconciler::new(settings.clone());
    let deploys = DeploymentReconciler::new(settings);

    match cli.command {
        Commands::Apply { manifest } => run_apply(&client, &jobs, &deploys, &manifest),
        Commands::Read { resource } => match resource {
            ReadCommands::Job { id } => print_json(&jobs.read(&client, &id)?),
            ReadCommands::Deploy { job_id, deploy_id } => {
                print_json(&deploys.read(&client, &job_id, deploy_id.as_deref())?)
            }
        },
        Commands::Import { resource } => match resource {
            ImportCommands::Job { id } => print_json(&jobs.import(&client, &id)?),
            ImportCommands::Deploy { deploy_id } => print_json(&deploys.import(&client, &deploy_id)?),
        },
        Commands::Delete { resource } => match resource {
            DeleteCommands::Job { id } => Ok(jobs.delete(&client, &id)?),
            DeleteCommands::Deploy { job_id, deploy_id } => run_delete_deploy(&client, &deploys, &job_id, &deploy_id),
        },
        Commands::List => run_list(&client),
    }
}

fn load_config(cli: &Cli) -> Result<EffectiveConfig, CliError> {
    let path = cli.config.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    if cli.config.is_some() && !path.exists() {
        return Err(ConfigError::IoError(format!("config file not found: {}", path.display())).into());
    }

    let env = env_overrides(|name| std::env::var(name).ok())?;

    let mut flags = Map::new();
    if let Some(host) = &cli.host {
        flags.insert("host".to_string(), json!(host));
    }
    if let Some(port) = cli.port {
        flags.insert("port".to_string(), json!(port));
    }
    if let Some(retry) = cli.retry {
        flags.insert("retry".to_string(), json!(retry));
    }
    let flags = if flags.is_empty() { None } else { Some(Value::Object(flags)) };

    Ok(EffectiveConfig::build(Some(&path), env, flags)?)
}

fn run_apply(
    client: &SingularityClient,
    jobs: &JobReconciler,
    deploys: &DeploymentReconciler,
    path: &Path,
) -> Result<(), CliError> {
    let manifest = Manifest::load(path)?;
    if manifest.is_empty() {
        warn!(path = %path.display(), "manifest declares nothing");
    }

    let mut output = Map::new();

    if let Some(job) = &manifest.job {
        let applied = jobs.apply(client, job)?;
        info!(job_id = %applied.id(), "job applied");
        output.insert("job".to_string(), serde_json::to_value(&applied)?);
    }

    if let Some(deployment) = &manifest.deployment {
        let applied = deploys.apply(client, deployment)?;
        info!(job_id = %applied.job_id(), deploy_id = %applied.id(), "deploy applied");
        output.insert("deployment".to_string(), serde_json::to_value(&applied)?);
    }

    println!("{}", serde_json::to_string_pretty(&Value::Object(output))?);
    Ok(())
}

fn run_delete_deploy(
    client: &SingularityClient,
    deploys: &DeploymentReconciler,
    job_id: &str,
    deploy_id: &str,
) -> Result<(), CliError> {
    let record: DeploymentRecord = match deploys.read(client, job_id, Some(deploy_id)) {
        Ok(record) => record,
        Err(ReconcileError::NotFound { .. }) => {
            info!(job_id, deploy_id, "deploy already gone");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };
    Ok(deploys.delete(client, &record)?)
}

fn run_list(client: &SingularityClient) -> Result<(), CliError> {
    let (response, parents) = client.list_jobs().map_err(ReconcileError::from)?;
    let parents = parents.ok_or_else(|| ReconcileError::Remote {
        status: response.status,
        body: response.body.clone(),
    })?;
    for parent in parents {
        println!("{}\t{}", parent.request.id, parent.state);
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
