// b2backup/src/storage/small.rs
use bytes::Bytes;
use sha1::{Digest, Sha1};
use tracing::{debug, info};

use super::Uploader;
use super::api::{StorageApi, UploadResult};
use crate::errors::{AppError, Result};

/// Lowercase hex SHA-1 of exactly the bytes given.
pub fn sha1_hex(data: &[u8]) -> String {
    hex::encode(Sha1::digest(data))
}

impl<A: StorageApi> Uploader<A> {
    /// Uploads a whole object in one request.
    ///
    /// The digest is computed from the buffer that is sent, and the body is a
    /// single in-memory buffer so the declared length is known up front.
    /// Failures are returned as-is, there is no retry on this path.
    pub async fn upload_small(
        &self,
        object_name: &str,
        source: Bytes,
        content_type: &str,
    ) -> Result<UploadResult> {
        let session = self.credentials.get_session(&self.api).await?;
        let credential = self
            .api
            .get_upload_url(&session, &self.bucket_id)
            .await
            .map_err(|source| AppError::Protocol { call: "get_upload_url", source })?;

        let sha1 = sha1_hex(&source);
        debug!(
            "Uploading {} ({} bytes, sha1 {}) in a single request",
            object_name,
            source.len(),
            sha1
        );

        let result = self
            .api
            .upload_file(&credential, object_name, content_type, source, &sha1)
            .await
            .map_err(|source| AppError::Upload {
                object: object_name.to_string(),
                source,
            })?;

        info!("Uploaded {} as file {}", result.file_name, result.file_id);
        Ok(result)
    }
}
