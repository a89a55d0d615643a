pub mod pg_url;
pub mod setting;

use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;
use which::which;

use crate::errors::AppError;

/// Finds a PostgreSQL client executable (`pg_dump`, `pg_restore`) in the system PATH.
pub fn find_pg_executable(name: &str) -> Result<PathBuf> {
    which(name).with_context(|| {
        format!(
            "{} executable not found in PATH. Please ensure PostgreSQL client tools are installed and in your PATH.",
            name
        )
    })
}

/// Runs `command` to completion, turning a non-zero exit into `AppError::Command`.
pub async fn run_command(mut command: Command, program: &str) -> std::result::Result<(), AppError> {
    debug!("Running {}", program);
    let output = command.output().await?;

    if !output.status.success() {
        return Err(AppError::Command {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}
