// b2backup/src/config/mod.rs
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::errors::{AppError, Result};
use crate::storage::api::AccountKey;
use crate::storage::b2::DEFAULT_AUTH_URL;

const MIB: u64 = 1024 * 1024;

pub const DEFAULT_LARGE_THRESHOLD_BYTES: u64 = 100 * MIB;
pub const DEFAULT_PART_SIZE_BYTES: u64 = 100 * MIB;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;
pub const DEFAULT_CONTENT_TYPE: &str = "application/x-tar";
pub const DEFAULT_BACKUP_DIR: &str = "/tmp/backup";
pub const DEFAULT_BACKUP_INTERVAL_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_SCHEDULE_TICK_SECS: u64 = 60;

/// Service limits for a single part of a large file.
pub const MIN_PART_SIZE_BYTES: u64 = 5_000_000;
pub const MAX_PART_SIZE_BYTES: u64 = 5_000_000_000;

// Struct for deserializing config.json. Every field may also come from the environment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJsonConfig {
    pub key_id: Option<String>,
    pub application_key: Option<String>,
    pub bucket_id: Option<String>,
    pub auth_url: Option<String>,
    pub large_threshold_bytes: Option<u64>,
    pub part_size_bytes: Option<u64>,
    pub max_retries: Option<u32>,
    pub retry_base_delay_ms: Option<u64>,
    pub part_concurrency: Option<usize>,
    pub content_type: Option<String>,
    pub database_url: Option<String>,
    pub backup_dir: Option<PathBuf>,
    pub backup_interval_secs: Option<u64>,
    pub schedule_tick_secs: Option<u64>,
    pub keep_local_backup: Option<bool>,
    pub restore_file_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub auth_url: String,
    pub account_key: AccountKey,
    pub bucket_id: String,
}

/// Tunables of the transfer engine.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    pub large_threshold_bytes: u64,
    pub part_size_bytes: u64,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub part_concurrency: usize,
    pub content_type: String,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            large_threshold_bytes: DEFAULT_LARGE_THRESHOLD_BYTES,
            part_size_bytes: DEFAULT_PART_SIZE_BYTES,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
            part_concurrency: 1,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }
}

impl TransferConfig {
    pub fn validate(&self) -> Result<()> {
        if self.large_threshold_bytes == 0 {
            return Err(AppError::config("large_threshold_bytes must be greater than zero"));
        }
        if !(MIN_PART_SIZE_BYTES..=MAX_PART_SIZE_BYTES).contains(&self.part_size_bytes) {
            return Err(AppError::config(format!(
                "part_size_bytes {} is outside the allowed range {}..={}",
                self.part_size_bytes, MIN_PART_SIZE_BYTES, MAX_PART_SIZE_BYTES
            )));
        }
        if self.max_retries == 0 {
            return Err(AppError::config("max_retries must be at least 1"));
        }
        if self.part_concurrency == 0 {
            return Err(AppError::config("part_concurrency must be at least 1"));
        }
        if self.content_type.trim().is_empty() {
            return Err(AppError::config("content_type cannot be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct BackupConfig {
    pub database_url: String,
    pub backup_dir: PathBuf,
    pub interval: Duration,
    pub tick: Duration,
    pub keep_local_backup: bool,
}

#[derive(Debug, Clone)]
pub struct RestoreConfig {
    pub database_url: String,
    pub archive_path: PathBuf,
}

impl RawJsonConfig {
    /// Reads `config_path` if it exists, then lets the process environment
    /// override individual values.
    pub fn load(config_path: &Path) -> Result<Self> {
        Self::from_file(config_path)?.with_env(|name| std::env::var(name).ok())
    }

    /// Reads `config_path`, or returns an empty config when there is no file.
    pub fn from_file(config_path: &Path) -> Result<Self> {
        let raw = if config_path.exists() {
            let config_content = fs::read_to_string(config_path)?;
            debug!("Loaded configuration file {}", config_path.display());
            serde_json::from_str(&config_content)?
        } else {
            debug!("No configuration file at {}, using environment only", config_path.display());
            RawJsonConfig::default()
        };
        Ok(raw)
    }

    /// Applies environment overrides supplied by `lookup`.
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("BACKBLAZE_KEY_ID") {
            self.key_id = Some(v);
        }
        if let Some(v) = var("BACKBLAZE_APPLICATION_KEY") {
            self.application_key = Some(v);
        }
        if let Some(v) = var("BACKBLAZE_BUCKET_ID") {
            self.bucket_id = Some(v);
        }
        if let Some(v) = var("BACKBLAZE_AUTH_URL") {
            self.auth_url = Some(v);
        }
        if let Some(v) = var("LARGE_FILE_THRESHOLD_BYTES") {
            self.large_threshold_bytes = Some(parse_number("LARGE_FILE_THRESHOLD_BYTES", &v)?);
        }
        if let Some(v) = var("PART_SIZE_BYTES") {
            self.part_size_bytes = Some(parse_number("PART_SIZE_BYTES", &v)?);
        }
        if let Some(v) = var("MAX_RETRIES") {
            self.max_retries = Some(parse_number("MAX_RETRIES", &v)?);
        }
        if let Some(v) = var("RETRY_BASE_DELAY_MS") {
            self.retry_base_delay_ms = Some(parse_number("RETRY_BASE_DELAY_MS", &v)?);
        }
        if let Some(v) = var("PART_CONCURRENCY") {
            self.part_concurrency = Some(parse_number("PART_CONCURRENCY", &v)?);
        }
        if let Some(v) = var("BACKUP_CONTENT_TYPE") {
            self.content_type = Some(v);
        }
        if let Some(v) = var("DATABASE_URL") {
            self.database_url = Some(v);
        }
        if let Some(v) = var("BACKUP_DIR") {
            self.backup_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = var("BACKUP_INTERVAL_SECS") {
            self.backup_interval_secs = Some(parse_number("BACKUP_INTERVAL_SECS", &v)?);
        }
        if let Some(v) = var("SCHEDULE_TICK_SECS") {
            self.schedule_tick_secs = Some(parse_number("SCHEDULE_TICK_SECS", &v)?);
        }
        if let Some(v) = var("KEEP_LOCAL_BACKUP") {
            self.keep_local_backup = Some(parse_bool("KEEP_LOCAL_BACKUP", &v)?);
        }
        if let Some(v) = var("RESTORE_FILE_NAME") {
            self.restore_file_name = Some(v);
        }
        Ok(self)
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| {
            AppError::config(format!(
                "{} must be a non-negative integer, got `{}`",
                name, value
            ))
        })
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(AppError::config(format!("{} must be true or false, got `{}`", name, value))),
    }
}

fn required(value: &Option<String>, what: &str) -> Result<String> {
    value
        .as_ref()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            AppError::config(format!(
                "{} must be set in config.json or the environment",
                what
            ))
        })
}

pub fn load_storage_config(raw: &RawJsonConfig) -> Result<StorageConfig> {
    Ok(StorageConfig {
        auth_url: raw.auth_url.clone().unwrap_or_else(|| DEFAULT_AUTH_URL.to_string()),
        account_key: AccountKey {
            key_id: required(&raw.key_id, "key_id (BACKBLAZE_KEY_ID)")?,
            application_key: required(
                &raw.application_key,
                "application_key (BACKBLAZE_APPLICATION_KEY)",
            )?,
        },
        bucket_id: required(&raw.bucket_id, "bucket_id (BACKBLAZE_BUCKET_ID)")?,
    })
}

pub fn load_transfer_config(raw: &RawJsonConfig) -> Result<TransferConfig> {
    let defaults = TransferConfig::default();
    let transfer = TransferConfig {
        large_threshold_bytes: raw.large_threshold_bytes.unwrap_or(defaults.large_threshold_bytes),
        part_size_bytes: raw.part_size_bytes.unwrap_or(defaults.part_size_bytes),
        max_retries: raw.max_retries.unwrap_or(defaults.max_retries),
        retry_base_delay: raw
            .retry_base_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry_base_delay),
        part_concurrency: raw.part_concurrency.unwrap_or(defaults.part_concurrency),
        content_type: raw.content_type.clone().unwrap_or(defaults.content_type),
    };
    transfer.validate()?;
    Ok(transfer)
}

pub fn load_backup_config(raw: &RawJsonConfig) -> Result<BackupConfig> {
    let database_url = required(&raw.database_url, "database_url (DATABASE_URL)")?;
    let backup_dir = raw
        .backup_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_BACKUP_DIR));
    if backup_dir.as_os_str().is_empty() {
        return Err(AppError::config("backup_dir cannot be empty"));
    }

    let interval_secs = raw.backup_interval_secs.unwrap_or(DEFAULT_BACKUP_INTERVAL_SECS);
    let tick_secs = raw.schedule_tick_secs.unwrap_or(DEFAULT_SCHEDULE_TICK_SECS);
    if interval_secs == 0 || tick_secs == 0 {
        return Err(AppError::config(
            "backup_interval_secs and schedule_tick_secs must be greater than zero",
        ));
    }
    if tick_secs > interval_secs {
        warn!(
            "schedule_tick_secs ({}) is longer than backup_interval_secs ({}); backups will run once per tick",
            tick_secs, interval_secs
        );
    }

    Ok(BackupConfig {
        database_url,
        backup_dir,
        interval: Duration::from_secs(interval_secs),
        tick: Duration::from_secs(tick_secs),
        keep_local_backup: raw.keep_local_backup.unwrap_or(false),
    })
}

pub fn load_restore_config(raw: &RawJsonConfig) -> Result<RestoreConfig> {
    let restore_file_name =
        required(&raw.restore_file_name, "restore_file_name (RESTORE_FILE_NAME)")?;
    let database_url = required(&raw.database_url, "database_url (DATABASE_URL)")?;
    let backup_dir = raw
        .backup_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_BACKUP_DIR));

    Ok(RestoreConfig {
        database_url,
        archive_path: backup_dir.join(restore_file_name),
    })
}
