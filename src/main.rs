//! Database Backup Tool
//!
//! Dumps a PostgreSQL database to a tar archive and uploads it to B2 object storage.

// b2backup/src/main.rs
mod backup;
mod config;
mod errors;
mod restore;
mod storage;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{
    RawJsonConfig, load_backup_config, load_restore_config, load_storage_config,
    load_transfer_config,
};
use errors::AppError;
use std::path::PathBuf;
use std::process::ExitCode;
use storage::Uploader;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "PostgreSQL backups to B2 object storage")]
struct Cli {
    /// Path to the JSON configuration file; environment variables override it
    #[arg(long, global = true, default_value = "config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Take one backup and upload it
    Backup,
    /// Take a backup now and then on every backup interval
    Daemon,
    /// Restore RESTORE_FILE_NAME from the backup directory
    Restore,
    /// Upload an existing file
    Upload {
        path: PathBuf,
        /// Object name in the bucket (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::from_filename(".dev.vars").ok();
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run_app(Cli::parse()).await {
        Ok(_) => {
            info!("✅ Operation completed successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("❌ Error: {:#}", e);
            if let Some(api_error) = e.downcast_ref::<AppError>().and_then(AppError::api_error) {
                error!(
                    "Storage service responded with status {:?}: {}",
                    api_error.status(),
                    api_error.body()
                );
            }
            ExitCode::FAILURE
        }
    }
}

async fn run_app(cli: Cli) -> Result<()> {
    let raw_config = RawJsonConfig::load(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    match cli.command {
        Command::Backup => {
            info!("🚀 Starting Backup Process...");
            let backup_config = load_backup_config(&raw_config)?;
            let uploader = build_uploader(&raw_config)?;
            backup::run_backup_flow(&backup_config, &uploader)
                .await
                .context("Backup process failed")?;
        }
        Command::Daemon => {
            info!("🕑 Starting Backup Daemon...");
            let backup_config = load_backup_config(&raw_config)?;
            let uploader = build_uploader(&raw_config)?;
            backup::run_backup_loop(&backup_config, &uploader).await?;
        }
        Command::Restore => {
            info!("🔄 Starting Restore Process...");
            let restore_config = load_restore_config(&raw_config)?;
            restore::run_restore_flow(&restore_config)
                .await
                .context("Restore process failed")?;
        }
        Command::Upload { path, name } => {
            let object_name = match name {
                Some(name) => name,
                None => path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .context("Upload path has no usable file name; pass --name")?
                    .to_string(),
            };
            let uploader = build_uploader(&raw_config)?;
            let result = uploader
                .upload_path(&path, &object_name)
                .await
                .with_context(|| format!("Failed to upload {}", path.display()))?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }
    Ok(())
}

fn build_uploader(raw_config: &RawJsonConfig) -> Result<Uploader<storage::b2::B2Client>> {
    let storage_config = load_storage_config(raw_config)?;
    let transfer_config = load_transfer_config(raw_config)?;
    Ok(Uploader::from_config(&storage_config, transfer_config))
}
