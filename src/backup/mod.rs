mod logic;
pub(crate) mod archive;
pub(crate) mod db_dump;
pub(crate) mod naming;
pub(crate) mod schedule;

use anyhow::Result;
use tracing::info;

use crate::config::BackupConfig;
use crate::storage::Uploader;
use crate::storage::api::StorageApi;

/// Runs a single backup and upload.
pub async fn run_backup_flow<A: StorageApi>(
    backup_config: &BackupConfig,
    uploader: &Uploader<A>,
) -> Result<()> {
    let result = logic::perform_backup_orchestration(backup_config, uploader).await?;
    info!("Backup stored as {}", result.file_name);
    Ok(())
}

/// Runs backups forever on the configured interval.
pub async fn run_backup_loop<A: StorageApi>(
    backup_config: &BackupConfig,
    uploader: &Uploader<A>,
) -> Result<()> {
    info!(
        "Starting backup loop: every {:?}, checking every {:?}",
        backup_config.interval, backup_config.tick
    );
    schedule::run_every(backup_config.interval, backup_config.tick, move || async move {
        logic::perform_backup_orchestration(backup_config, uploader)
            .await
            .map(|_| ())
    })
    .await;
    Ok(())
}
