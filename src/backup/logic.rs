// b2backup/src/backup/logic.rs
use anyhow::{Context, Result};
use chrono::Local;
use tracing::{info, warn};

use super::archive::verify_dump_archive;
use super::db_dump::dump_database_to_tar;
use super::naming::backup_name;
use crate::config::BackupConfig;
use crate::storage::Uploader;
use crate::storage::api::{StorageApi, UploadResult};
use crate::utils::pg_url::{parse_postgres_url, redact_url, tool_connection_uri};
use crate::utils::setting::check_db_connection;

/// One backup run: dump, verify, upload, then remove the local archive.
///
/// The local archive is left in place when the upload fails.
pub async fn perform_backup_orchestration<A: StorageApi>(
    backup_config: &BackupConfig,
    uploader: &Uploader<A>,
) -> Result<UploadResult> {
    let db = parse_postgres_url(&backup_config.database_url)?;
    let connection_uri = tool_connection_uri(&backup_config.database_url)?;
    if !check_db_connection(&connection_uri).await {
        anyhow::bail!(
            "Cannot proceed with backup - connection to {} failed",
            redact_url(&backup_config.database_url)
        );
    }

    info!(
        "Backing up database {} on {}:{} as {}",
        db.database,
        db.host,
        db.port.unwrap_or(5432),
        db.user
    );
    let name = backup_name(&db.database, Local::now().naive_local());
    let archive_path = backup_config.backup_dir.join(&name.file_name);

    dump_database_to_tar(&backup_config.database_url, &archive_path).await?;
    verify_dump_archive(&archive_path)?;

    let result = uploader
        .upload_path(&archive_path, &name.object_key)
        .await
        .with_context(|| {
            format!(
                "Failed to upload {} as {}; local archive kept",
                archive_path.display(),
                name.object_key
            )
        })?;
    info!(
        "Uploaded backup {} (file id {}, bucket {})",
        result.file_name, result.file_id, result.bucket_id
    );

    if backup_config.keep_local_backup {
        info!("Keeping local backup file {}", archive_path.display());
    } else {
        match tokio::fs::remove_file(&archive_path).await {
            Ok(()) => info!("Deleted local backup file: {}", archive_path.display()),
            Err(e) => warn!(
                "Uploaded, but could not delete local backup file {}: {}",
                archive_path.display(),
                e
            ),
        }
    }

    Ok(result)
}
