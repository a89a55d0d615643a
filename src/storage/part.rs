// b2backup/src/storage/part.rs
use bytes::Bytes;
use tracing::{debug, warn};

use super::api::{Session, StorageApi, UploadCredential};
use super::session::CredentialSession;
use super::small::sha1_hex;
use crate::config::TransferConfig;
use crate::errors::{AppError, Result};

/// Uploads parts of one large file through a single part-upload credential,
/// replacing the credential when the service stops accepting it.
#[derive(Debug)]
pub struct PartWorker {
    file_id: String,
    credential: UploadCredential,
}

impl PartWorker {
    /// Requests a part-upload credential bound to `file_id`.
    pub async fn new<A: StorageApi + ?Sized>(
        api: &A,
        session: &Session,
        file_id: &str,
    ) -> Result<Self> {
        let credential = api
            .get_upload_part_url(session, file_id)
            .await
            .map_err(|source| AppError::Protocol { call: "get_upload_part_url", source })?;
        Ok(Self {
            file_id: file_id.to_string(),
            credential,
        })
    }

    pub fn credential(&self) -> &UploadCredential {
        &self.credential
    }

    async fn refresh_credential<A: StorageApi + ?Sized>(
        &mut self,
        api: &A,
        credentials: &CredentialSession,
    ) -> Result<()> {
        let session = credentials.get_session(api).await?;
        *self = PartWorker::new(api, &session, &self.file_id).await?;
        debug!("Using new part upload URL {}", self.credential().upload_url);
        Ok(())
    }

    /// Sends one chunk, retrying up to `config.max_retries` attempts in total.
    ///
    /// Returns the SHA-1 of `chunk`, which is computed once before the first
    /// attempt and sent unchanged with every retry.
    pub async fn upload_part<A: StorageApi + ?Sized>(
        &mut self,
        api: &A,
        credentials: &CredentialSession,
        config: &TransferConfig,
        part_number: u32,
        chunk: Bytes,
    ) -> Result<String> {
        let sha1 = sha1_hex(&chunk);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            debug!(
                "Uploading part {} of {} ({} bytes), attempt {}/{}",
                part_number,
                self.file_id,
                chunk.len(),
                attempt,
                config.max_retries
            );

            let err = match api
                .upload_part(&self.credential, part_number, chunk.clone(), &sha1)
                .await
            {
                Ok(()) => return Ok(sha1),
                Err(e) => e,
            };

            if attempt >= config.max_retries {
                return Err(AppError::Transfer {
                    part: part_number,
                    attempts: attempt,
                    source: err,
                });
            }

            if err.is_auth_expired() {
                warn!(
                    "Part {} attempt {} rejected ({}), requesting a new part upload URL",
                    part_number, attempt, err
                );
                self.refresh_credential(api, credentials).await?;
            } else {
                let delay = config.retry_base_delay * attempt;
                warn!(
                    "Part {} attempt {} failed ({}), retrying in {:?}",
                    part_number, attempt, err, delay
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
