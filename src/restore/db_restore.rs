// b2backup/src/restore/db_restore.rs
use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::info;

use crate::backup::archive::verify_dump_archive;
use crate::config::RestoreConfig;
use crate::utils::pg_url::{redact_url, requires_ssl, tool_connection_uri};
use crate::utils::{find_pg_executable, run_command};

/// Restores a tar-format archive into the target database with `pg_restore`.
pub async fn restore_database_from_tar(restore_config: &RestoreConfig) -> Result<()> {
    let archive_path = &restore_config.archive_path;
    verify_dump_archive(archive_path)
        .with_context(|| format!("Refusing to restore from {}", archive_path.display()))?;

    let pg_restore_path = find_pg_executable("pg_restore")?;
    let db_uri = tool_connection_uri(&restore_config.database_url)?;

    let mut command = Command::new(&pg_restore_path);
    command
        .arg(format!("--dbname={}", db_uri))
        .arg("--no-owner")
        .arg("--no-privileges")
        .arg("--format=tar")
        .arg(archive_path);
    if requires_ssl(&restore_config.database_url) {
        command.env("PGSSLMODE", "require");
    }

    info!(
        "Restoring {} into {}...",
        archive_path.display(),
        redact_url(&restore_config.database_url)
    );
    run_command(command, "pg_restore")
        .await
        .with_context(|| format!("pg_restore failed for {}", archive_path.display()))?;

    info!("✓ Restore completed: {}", archive_path.display());
    Ok(())
}
