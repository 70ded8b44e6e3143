//! `jobgate` -- command-line caller for the execution and data-transfer
//! services.
//!
//! Submits jobs, queries their status, and moves zipped data sets in and
//! out of job directories. JSON responses go to stdout, logs to stderr.
//!
//! # Environment variables
//!
//! | Variable                       | Required | Default | Description                       |
//! |--------------------------------|----------|---------|-----------------------------------|
//! | `COMPUTE_SERVICE_URL`          | yes      | --      | Execution service endpoint        |
//! | `DATA_SERVICE_URL`             | yes      | --      | Data-transfer service endpoint    |
//! | `SERVICE_CONNECT_TIMEOUT_SECS` | no       | `1000`  | Connect timeout for both services |
//! | `RUST_LOG`                     | no       | `jobgate=info,jobgate_client=info` | Log filter |

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use jobgate_client::{ServiceClients, ServiceConfig, ServiceResponse};
use jobgate_core::JobDescriptor;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "jobgate", version, about = "Run plugin jobs and move their data")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Submit a job to the execution service.
    Run {
        /// Job id; falls back to the descriptor's `job_id`.
        job_id: Option<String>,
        /// JSON file holding the job descriptor.
        #[arg(long)]
        descriptor: PathBuf,
        /// Shared-storage directory; falls back to the descriptor's `share_dir`.
        #[arg(long)]
        share_dir: Option<String>,
    },
    /// Show a job's state on the execution service.
    Status { job_id: String },
    /// Delete a job (not supported by the execution service).
    Delete { job_id: String },
    /// Upload a zipped data set into a job's input directory.
    Push { job_id: String, file: PathBuf },
    /// Download a job's output directory as a zip archive.
    Pull {
        job_id: String,
        #[arg(long, short)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jobgate=info,jobgate_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = ServiceConfig::from_env().context("Failed to load service configuration")?;
    tracing::info!(
        execution_url = %config.execution_url,
        data_url = %config.data_url,
        connect_timeout_secs = config.connect_timeout.as_secs(),
        "Loaded service configuration",
    );

    let clients = ServiceClients::from_config(&config)?;

    match cli.command {
        Command::Run {
            job_id,
            descriptor,
            share_dir,
        } => {
            let descriptor = load_descriptor(&descriptor).await?;
            let (job_id, share_dir) = resolve_run_target(&descriptor, job_id, share_dir)?;
            let response = clients.execution.run(&job_id, &descriptor, &share_dir).await?;
            print_json(&response)
        }
        Command::Status { job_id } => {
            let response = clients.execution.status(&job_id).await?;
            print_json(&response)
        }
        Command::Delete { job_id } => {
            clients.execution.delete(&job_id).await?;
            Ok(())
        }
        Command::Push { job_id, file } => {
            let Some(filename) = file.file_name().map(|f| f.to_string_lossy().into_owned()) else {
                bail!("{} does not name a file", file.display());
            };
            let content = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let response = clients.data.push(&job_id, &filename, content).await?;
            print_json(&response)
        }
        Command::Pull { job_id, output } => {
            let content = clients.data.pull(&job_id).await?;
            tokio::fs::write(&output, &content)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            tracing::info!(path = %output.display(), bytes = content.len(), "Saved pulled data");
            Ok(())
        }
    }
}

async fn load_descriptor(path: &Path) -> anyhow::Result<JobDescriptor> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read descriptor {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Invalid job descriptor in {}", path.display()))
}

/// Pick the job id and shared-storage directory, preferring explicit values.
fn resolve_run_target(
    descriptor: &JobDescriptor,
    job_id: Option<String>,
    share_dir: Option<String>,
) -> anyhow::Result<(String, String)> {
    let job_id = job_id
        .or_else(|| descriptor.job_id.clone())
        .context("A job id is required (argument or descriptor `job_id`)")?;
    let share_dir = share_dir
        .or_else(|| descriptor.share_dir.clone())
        .context("A shared-storage directory is required (--share-dir or descriptor `share_dir`)")?;
    Ok((job_id, share_dir))
}

fn print_json(response: &ServiceResponse) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Write;

    use clap::CommandFactory;

    use super::*;

    const DESCRIPTOR_JSON: &str = r#"{
        "job_id": "job42",
        "owner_id": "chris",
        "args": "--dir /x/y",
        "path_flags": "--dir",
        "exec_path": "/app",
        "exec_name": "run.py",
        "exec_shell": "python3",
        "plugin_type": "ds",
        "image": "fnndsc/pl-simpledsapp",
        "limits": { "cpu": 1000, "memory": 200, "gpu": 0 },
        "worker_count": 1,
        "share_dir": "/var/storage/job42"
    }"#;

    fn descriptor() -> JobDescriptor {
        serde_json::from_str(DESCRIPTOR_JSON).unwrap()
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_with_descriptor_only() {
        let cli = Cli::try_parse_from(["jobgate", "run", "--descriptor", "job.json"]).unwrap();
        match cli.command {
            Command::Run {
                job_id, share_dir, ..
            } => {
                assert!(job_id.is_none());
                assert!(share_dir.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_pull_with_short_output() {
        let cli = Cli::try_parse_from(["jobgate", "pull", "job42", "-o", "out.zip"]).unwrap();
        match cli.command {
            Command::Pull { job_id, output } => {
                assert_eq!(job_id, "job42");
                assert_eq!(output, PathBuf::from("out.zip"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn explicit_run_target_wins() {
        let (job_id, share_dir) = resolve_run_target(
            &descriptor(),
            Some("job7".to_string()),
            Some("/tmp/share".to_string()),
        )
        .unwrap();
        assert_eq!(job_id, "job7");
        assert_eq!(share_dir, "/tmp/share");
    }

    #[test]
    fn run_target_falls_back_to_descriptor() {
        let (job_id, share_dir) = resolve_run_target(&descriptor(), None, None).unwrap();
        assert_eq!(job_id, "job42");
        assert_eq!(share_dir, "/var/storage/job42");
    }

    #[test]
    fn run_target_requires_a_job_id() {
        let mut d = descriptor();
        d.job_id = None;
        assert!(resolve_run_target(&d, None, Some("/tmp".to_string())).is_err());
    }

    #[tokio::test]
    async fn loads_descriptor_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        file.write_all(DESCRIPTOR_JSON.as_bytes()).expect("write descriptor");

        let loaded = load_descriptor(file.path()).await.unwrap();
        assert_eq!(loaded, descriptor());
    }

    #[tokio::test]
    async fn rejects_malformed_descriptor() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        file.write_all(b"{\"owner_id\": 3}").expect("write descriptor");

        let err = load_descriptor(file.path()).await.unwrap_err();
        assert!(err.to_string().starts_with("Invalid job descriptor"));
    }
}
