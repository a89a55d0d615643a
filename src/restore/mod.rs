pub(crate) mod db_restore;

use anyhow::Result;
use tracing::info;

use crate::config::RestoreConfig;

/// Public entry point for the restore process.
pub async fn run_restore_flow(restore_config: &RestoreConfig) -> Result<()> {
    info!("Restore started from {}", restore_config.archive_path.display());
    db_restore::restore_database_from_tar(restore_config).await
}
