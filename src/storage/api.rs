// b2backup/src/storage/api.rs
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Key pair used for basic-auth against the authorize endpoint.
#[derive(Clone)]
pub struct AccountKey {
    pub key_id: String,
    pub application_key: String,
}

impl std::fmt::Debug for AccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountKey")
            .field("key_id", &self.key_id)
            .field("application_key", &"<redacted>")
            .finish()
    }
}

/// Authorization context issued by the storage service. Replaced wholesale on
/// re-authentication, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Session {
    #[serde(rename = "apiUrl")]
    pub api_base_url: String,
    #[serde(rename = "authorizationToken")]
    pub auth_token: String,
    #[serde(rename = "downloadUrl")]
    pub download_url: String,
    #[serde(rename = "accountId")]
    pub account_id: String,
}

/// Upload URL and token, scoped either to a bucket (single-shot) or to one
/// large file's part stream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadCredential {
    #[serde(rename = "uploadUrl")]
    pub upload_url: String,
    #[serde(rename = "authorizationToken")]
    pub auth_token: String,
}

/// Terminal success descriptor, same shape for both upload paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub file_id: String,
    pub file_name: String,
    pub account_id: String,
    pub bucket_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// A failed call against the storage service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(_) => None,
        }
    }

    pub fn body(&self) -> &str {
        match self {
            ApiError::Status { body, .. } => body,
            ApiError::Transport(msg) => msg,
        }
    }

    /// 401 and 403 mean the token we sent is no longer accepted.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }
}

/// The remote object-storage protocol consumed by the transfer engine.
///
/// Implementations perform exactly one request per call and never retry;
/// retry and credential refresh live in the engine.
#[async_trait]
pub trait StorageApi: Send + Sync {
    async fn authorize(&self, key: &AccountKey) -> Result<Session, ApiError>;

    async fn get_upload_url(
        &self,
        session: &Session,
        bucket_id: &str,
    ) -> Result<UploadCredential, ApiError>;

    /// Returns the file id assigned to the new large file.
    async fn start_large_file(
        &self,
        session: &Session,
        bucket_id: &str,
        file_name: &str,
        content_type: &str,
    ) -> Result<String, ApiError>;

    async fn get_upload_part_url(
        &self,
        session: &Session,
        file_id: &str,
    ) -> Result<UploadCredential, ApiError>;

    async fn upload_file(
        &self,
        credential: &UploadCredential,
        file_name: &str,
        content_type: &str,
        body: Bytes,
        sha1: &str,
    ) -> Result<UploadResult, ApiError>;

    async fn upload_part(
        &self,
        credential: &UploadCredential,
        part_number: u32,
        body: Bytes,
        sha1: &str,
    ) -> Result<(), ApiError>;

    async fn finish_large_file(
        &self,
        session: &Session,
        file_id: &str,
        part_sha1s: &[String],
    ) -> Result<UploadResult, ApiError>;
}
