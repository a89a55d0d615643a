// b2backup/src/backup/db_dump.rs
use anyhow::{Context, Result};
use std::path::Path;
use tokio::process::Command;
use tracing::info;

use crate::utils::pg_url::{requires_ssl, tool_connection_uri};
use crate::utils::{find_pg_executable, run_command};

/// Dumps the database behind `database_url` into a tar-format archive at `output_file`.
pub async fn dump_database_to_tar(database_url: &str, output_file: &Path) -> Result<()> {
    let pg_dump_path = find_pg_executable("pg_dump")?;
    info!("Found pg_dump executable at: {}", pg_dump_path.display());

    if let Some(parent) = output_file.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create backup directory: {}", parent.display()))?;
    }

    let db_uri = tool_connection_uri(database_url)?;
    let mut command = Command::new(&pg_dump_path);
    command
        .arg(format!("--dbname={}", db_uri))
        .arg("--no-owner")
        .arg("--no-privileges")
        .arg("--format=tar")
        .arg(format!("--file={}", output_file.display()));
    if requires_ssl(database_url) {
        command.env("PGSSLMODE", "require");
    }

    info!("Dumping database to {}...", output_file.display());
    run_command(command, "pg_dump")
        .await
        .with_context(|| format!("pg_dump failed for {}", output_file.display()))?;

    info!("✓ Backup completed: {}", output_file.display());
    Ok(())
}
