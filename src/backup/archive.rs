// b2backup/src/backup/archive.rs
use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;
use tar::Archive;
use tracing::info;

/// Table of contents written by `pg_dump --format=tar`.
const PG_DUMP_TOC: &str = "toc.dat";

/// Checks that `archive_path` is a readable tar archive produced by `pg_dump`.
///
/// Returns the number of entries in the archive.
pub fn verify_dump_archive(archive_path: &Path) -> Result<usize> {
    if !archive_path.is_file() {
        return Err(anyhow::anyhow!(
            "Backup archive is not a file: {}",
            archive_path.display()
        ));
    }

    let archive_file = File::open(archive_path).with_context(|| {
        format!("Failed to open archive file: {}", archive_path.display())
    })?;
    let mut archive = Archive::new(archive_file);

    let mut entry_count = 0;
    let mut has_toc = false;
    for entry in archive
        .entries()
        .with_context(|| format!("Failed to read archive {}", archive_path.display()))?
    {
        let entry = entry.with_context(|| {
            format!("Corrupt entry in archive {}", archive_path.display())
        })?;
        let path = entry.path().with_context(|| {
            format!("Invalid entry path in archive {}", archive_path.display())
        })?;
        if path.file_name().is_some_and(|name| name == PG_DUMP_TOC) {
            has_toc = true;
        }
        entry_count += 1;
    }

    if entry_count == 0 {
        return Err(anyhow::anyhow!(
            "Backup archive {} contains no entries",
            archive_path.display()
        ));
    }
    if !has_toc {
        return Err(anyhow::anyhow!(
            "Backup archive {} has no {}; it was not written by pg_dump --format=tar",
            archive_path.display(),
            PG_DUMP_TOC
        ));
    }

    info!(
        "✓ Verified archive {} ({} entries)",
        archive_path.display(),
        entry_count
    );
    Ok(entry_count)
}
