// b2backup/src/storage/large.rs
use bytes::Bytes;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info};

use super::Uploader;
use super::api::{StorageApi, UploadResult};
use super::part::PartWorker;
use crate::errors::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartRecord {
    pub part_number: u32,
    pub sha1: String,
}

/// A started large file. Parts are reserved in ascending order and their
/// digests land in the slot of their part number, whatever order they finish in.
/// `into_manifest` consumes the transfer, so it can only be finalized once.
#[derive(Debug)]
pub struct FileTransfer {
    pub file_id: String,
    pub file_name: String,
    pub bucket_id: String,
    pub content_type: String,
    slots: Vec<Option<String>>,
}

impl FileTransfer {
    pub fn new(file_id: String, file_name: &str, bucket_id: &str, content_type: &str) -> Self {
        Self {
            file_id,
            file_name: file_name.to_string(),
            bucket_id: bucket_id.to_string(),
            content_type: content_type.to_string(),
            slots: Vec::new(),
        }
    }

    /// Allocates the next 1-based part number.
    pub fn reserve_part(&mut self) -> u32 {
        self.slots.push(None);
        self.slots.len() as u32
    }

    pub fn record_part(&mut self, part_number: u32, sha1: String) -> Result<()> {
        let slot = part_number
            .checked_sub(1)
            .and_then(|index| self.slots.get_mut(index as usize))
            .ok_or_else(|| AppError::Manifest(format!("part {} was never reserved", part_number)))?;
        if slot.is_some() {
            return Err(AppError::Manifest(format!("part {} recorded twice", part_number)));
        }
        *slot = Some(sha1);
        Ok(())
    }

    /// The ordered manifest, available once every reserved part is recorded.
    pub fn into_manifest(self) -> Result<Vec<PartRecord>> {
        if self.slots.is_empty() {
            return Err(AppError::EmptySource(self.file_name));
        }
        self.slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                let part_number = index as u32 + 1;
                slot.map(|sha1| PartRecord { part_number, sha1 }).ok_or_else(|| {
                    AppError::Manifest(format!("part {} has no recorded digest", part_number))
                })
            })
            .collect()
    }
}

/// Reads up to `part_size` bytes; a short chunk means the source is exhausted.
async fn read_chunk<R: AsyncRead + Unpin>(reader: &mut R, part_size: u64) -> Result<Bytes> {
    let mut buf = Vec::with_capacity(part_size.min(64 * 1024 * 1024) as usize);
    (&mut *reader).take(part_size).read_to_end(&mut buf).await?;
    Ok(Bytes::from(buf))
}

impl<A: StorageApi> Uploader<A> {
    /// Uploads `reader` as a large file: start, parts in `part_size_bytes`
    /// chunks, then finish with the manifest in part-number order.
    ///
    /// At most `part_concurrency` parts are in flight, each through its own
    /// part-upload credential. With the default of one, part k+1 is not read
    /// until part k is recorded. An empty source is refused before the large
    /// file is started.
    pub async fn upload_large<R: AsyncRead + Unpin>(
        &self,
        object_name: &str,
        mut reader: R,
        content_type: &str,
    ) -> Result<UploadResult> {
        let part_size = self.config.part_size_bytes;
        let first_chunk = read_chunk(&mut reader, part_size).await?;
        if first_chunk.is_empty() {
            return Err(AppError::EmptySource(object_name.to_string()));
        }

        let session = self.credentials.get_session(&self.api).await?;
        let file_id = self
            .api
            .start_large_file(&session, &self.bucket_id, object_name, content_type)
            .await
            .map_err(|source| AppError::Protocol { call: "start_large_file", source })?;
        let mut transfer = FileTransfer::new(file_id, object_name, &self.bucket_id, content_type);
        info!(
            "Started large file {} for {} in bucket {} ({})",
            transfer.file_id, transfer.file_name, transfer.bucket_id, transfer.content_type
        );
        let concurrency = self.config.part_concurrency.max(1);
        let mut idle_workers: Vec<PartWorker> = Vec::new();
        let mut in_flight = FuturesUnordered::new();
        let mut pending = Some(first_chunk);
        let mut exhausted = false;

        loop {
            while !exhausted && in_flight.len() < concurrency {
                let chunk = match pending.take() {
                    Some(chunk) => chunk,
                    None => read_chunk(&mut reader, part_size).await?,
                };
                if (chunk.len() as u64) < part_size {
                    exhausted = true;
                }
                if chunk.is_empty() {
                    break;
                }

                let part_number = transfer.reserve_part();
                let mut worker = match idle_workers.pop() {
                    Some(worker) => worker,
                    None => PartWorker::new(&self.api, &session, &transfer.file_id).await?,
                };
                let api = &self.api;
                let credentials = &self.credentials;
                let config = &self.config;
                in_flight.push(async move {
                    let outcome = worker
                        .upload_part(api, credentials, config, part_number, chunk)
                        .await;
                    (worker, part_number, outcome)
                });
            }

            match in_flight.next().await {
                Some((worker, part_number, outcome)) => {
                    let sha1 = outcome?;
                    debug!("Recorded part {} of {} (sha1 {})", part_number, transfer.file_id, sha1);
                    transfer.record_part(part_number, sha1)?;
                    idle_workers.push(worker);
                }
                None => break,
            }
        }

        let file_id = transfer.file_id.clone();
        let manifest = transfer.into_manifest()?;
        let part_sha1s: Vec<String> = manifest
            .iter()
            .map(|part| {
                debug!("Manifest part {}: {}", part.part_number, part.sha1);
                part.sha1.clone()
            })
            .collect();

        let session = self.credentials.get_session(&self.api).await?;
        let result = self
            .api
            .finish_large_file(&session, &file_id, &part_sha1s)
            .await
            .map_err(|source| AppError::Protocol { call: "finish_large_file", source })?;

        info!(
            "Finished large file {} ({} parts) as {}",
            result.file_id,
            manifest.len(),
            result.file_name
        );
        Ok(result)
    }
}
