//! Operator CLI for the SCIM user store: apply migrations and inspect users.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result, eyre};
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use scim_backend::config::ProviderSettings;
use scim_backend::domain::ports::UserProvisioning;
use scim_backend::domain::{
    CORE_USER_SCHEMA, CorrelationId, Filter, QueryParameters, UserProvisioningService,
};
use scim_backend::outbound::persistence::{DbPool, DieselUserStore, run_pending_migrations};
use tokio::runtime::Builder;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

/// `scim-admin` command arguments.
#[derive(Debug, Parser)]
#[command(name = "scim-admin", about = "Administer the SCIM user store", version)]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply pending schema migrations.
    Migrate,
    /// Print one user as JSON.
    Show {
        /// Server-assigned user identifier.
        id: String,
    },
    /// Print users as a JSON array, optionally filtered by `userName`.
    List {
        #[arg(long = "user-name", value_name = "name")]
        user_name: Option<String>,
        #[arg(long = "external-id", value_name = "id")]
        external_id: Option<String>,
    },
    /// Delete one user and its attribute collections.
    Delete {
        /// Server-assigned user identifier.
        id: String,
    },
}

impl Command {
    fn query_parameters(user_name: Option<String>, external_id: Option<String>) -> QueryParameters {
        let filters = [("userName", user_name), ("externalId", external_id)]
            .into_iter()
            .filter_map(|(path, value)| value.map(|value| Filter::equals(path, value)))
            .collect();
        QueryParameters {
            schema_identifier: Some(CORE_USER_SCHEMA.to_owned()),
            filters: Some(filters),
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(error) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .with_writer(std::io::stderr)
        .try_init()
    {
        warn!(%error, "tracing init failed");
    }

    let args = CliArgs::parse();
    let settings = ProviderSettings::load_from_iter([OsString::from("scim-admin")])
        .map_err(|error| eyre!("load provider settings: {error}"))?;

    if let Command::Migrate = args.command {
        let applied =
            run_pending_migrations(settings.database_url()?).wrap_err("apply migrations")?;
        println!("{}", serde_json::json!({ "applied": applied }));
        return Ok(());
    }

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("create Tokio runtime")?;
    runtime.block_on(CorrelationId::scope(
        CorrelationId::generate(),
        run(args.command, settings),
    ))
}

async fn run(command: Command, settings: ProviderSettings) -> Result<()> {
    let pool = DbPool::new(settings.pool_config()?)
        .await
        .wrap_err("create database pool")?;
    let service =
        UserProvisioningService::new(Arc::new(DieselUserStore::new(pool)), Arc::new(DefaultClock));

    let output = match command {
        Command::Migrate => return Ok(()),
        Command::Show { id } => serde_json::to_string_pretty(&service.retrieve(&id).await?)?,
        Command::List {
            user_name,
            external_id,
        } => {
            let parameters = Command::query_parameters(user_name, external_id);
            serde_json::to_string_pretty(&service.query(&parameters).await?)?
        }
        Command::Delete { id } => {
            service.delete(&id).await?;
            serde_json::json!({ "deleted": id }).to_string()
        }
    };
    println!("{output}");
    Ok(())
}
