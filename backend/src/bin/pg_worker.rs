//! Helper invoked by `pg-embed-setup-unpriv` to drive the embedded cluster
//! when integration tests run as root.
//!
//! Usage: `pg-worker <setup|start|stop> <payload.json>`. The payload is the
//! library's [`WorkerPayload`]: PostgreSQL settings plus environment
//! overrides to apply before the cluster operation runs.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Context, Report, Result};
use pg_embedded_setup_unpriv::worker::WorkerPayload;
use postgresql_embedded::PostgreSQL;
use tokio::runtime::Builder;

/// Cluster lifecycle step requested by the bootstrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Operation {
    Setup,
    Start,
    Stop,
}

#[derive(Debug, Parser)]
#[command(name = "pg-worker", about = "Run one embedded PostgreSQL lifecycle step")]
struct WorkerArgs {
    #[arg(value_enum)]
    operation: Operation,
    /// JSON payload written by the bootstrapper.
    payload: PathBuf,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = WorkerArgs::try_parse()?;
    let payload = read_payload(&args.payload)?;
    run(args.operation, payload)
}

fn read_payload(path: &Path) -> Result<WorkerPayload> {
    let raw = fs::read(path).with_context(|| format!("read worker payload {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("parse worker payload {}", path.display()))
}

fn run(operation: Operation, payload: WorkerPayload) -> Result<()> {
    let settings = payload
        .settings
        .into_settings()
        .map_err(|err| Report::new(err).wrap_err("rebuild postgres settings"))?;
    for (key, value) in payload.environment {
        // SAFETY: single-threaded until the runtime below is built.
        match value {
            Some(value) => unsafe { env::set_var(&key, value.expose()) },
            None => unsafe { env::remove_var(&key) },
        }
    }

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("create worker runtime")?;
    let mut postgres = PostgreSQL::new(settings);
    runtime
        .block_on(async move {
            match operation {
                Operation::Setup => postgres.setup().await,
                Operation::Start => postgres.start().await,
                Operation::Stop => postgres.stop().await,
            }
        })
        .with_context(|| format!("embedded postgres {operation:?} failed"))
}
