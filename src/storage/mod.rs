// b2backup/src/storage/mod.rs
pub mod api;
pub mod b2;
pub mod large;
pub mod part;
pub mod session;
pub mod small;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

use bytes::Bytes;
use std::path::Path;
use tracing::info;

use crate::config::{StorageConfig, TransferConfig};
use crate::errors::Result;
use api::{AccountKey, StorageApi, UploadResult};
use b2::B2Client;
use session::CredentialSession;
use strategy::{UploadStrategy, choose_strategy};

/// Transfer engine entry point: owns the protocol client, the account key and
/// the tunables, and picks the upload path for each object.
///
/// Holds no per-transfer state, so one `Uploader` can serve concurrent uploads.
pub struct Uploader<A: StorageApi> {
    api: A,
    credentials: CredentialSession,
    bucket_id: String,
    config: TransferConfig,
}

impl Uploader<B2Client> {
    pub fn from_config(storage: &StorageConfig, transfer: TransferConfig) -> Self {
        Uploader::new(
            B2Client::new(&storage.auth_url),
            storage.account_key.clone(),
            &storage.bucket_id,
            transfer,
        )
    }
}

impl<A: StorageApi> Uploader<A> {
    pub fn new(api: A, key: AccountKey, bucket_id: &str, config: TransferConfig) -> Self {
        Self {
            api,
            credentials: CredentialSession::new(key),
            bucket_id: bucket_id.to_string(),
            config,
        }
    }

    #[cfg(test)]
    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn strategy_for(&self, size_bytes: u64) -> UploadStrategy {
        choose_strategy(size_bytes, self.config.large_threshold_bytes)
    }

    /// Uploads the file at `path` as `object_name`, choosing the path by size.
    /// Zero-byte files always take the single-shot path.
    pub async fn upload_path(&self, path: &Path, object_name: &str) -> Result<UploadResult> {
        let size = tokio::fs::metadata(path).await?.len();
        let content_type = self.config.content_type.as_str();
        let strategy = self.strategy_for(size);
        info!(
            "Uploading {} ({} bytes) as {} using the {:?} path",
            path.display(),
            size,
            object_name,
            strategy
        );

        match strategy {
            UploadStrategy::Small => {
                let buffer = Bytes::from(tokio::fs::read(path).await?);
                self.upload_small(object_name, buffer, content_type).await
            }
            UploadStrategy::Large => {
                let file = tokio::fs::File::open(path).await?;
                self.upload_large(object_name, file, content_type).await
            }
        }
    }
}
