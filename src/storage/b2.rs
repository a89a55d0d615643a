// b2backup/src/storage/b2.rs
use async_trait::async_trait;
use bytes::Bytes;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Client as HttpClient, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::api::{AccountKey, ApiError, Session, StorageApi, UploadCredential, UploadResult};

pub const DEFAULT_AUTH_URL: &str = "https://api.backblazeb2.com";

/// Characters left unescaped in `X-Bz-File-Name`: the URI component set plus `/`,
/// which B2 accepts as a path separator in file names.
const FILE_NAME_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'/');

/// `StorageApi` over the B2 native v2 HTTP/JSON endpoints.
#[derive(Debug, Clone)]
pub struct B2Client {
    auth_url: String,
    client: HttpClient,
}

#[derive(Deserialize)]
struct StartLargeFileResponse {
    #[serde(rename = "fileId")]
    file_id: String,
}

impl B2Client {
    pub fn new(auth_url: impl Into<String>) -> Self {
        Self {
            auth_url: auth_url.into().trim_end_matches('/').to_string(),
            client: HttpClient::new(),
        }
    }

    fn api_call(&self, session: &Session, operation: &str) -> RequestBuilder {
        let endpoint = format!(
            "{}/b2api/v2/{}",
            session.api_base_url.trim_end_matches('/'),
            operation
        );
        debug!("POST {}", endpoint);
        self.client
            .post(endpoint)
            .header("Authorization", &session.auth_token)
    }
}

pub fn escape_file_name(name: &str) -> String {
    utf8_percent_encode(name, FILE_NAME_ESCAPE).to_string()
}

async fn send(request: RequestBuilder) -> Result<Response, ApiError> {
    let res = request
        .send()
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))?;

    if res.status().is_success() {
        Ok(res)
    } else {
        let status = res.status().as_u16();
        let body = res.text().await.unwrap_or_default();
        Err(ApiError::Status { status, body })
    }
}

async fn json_body<T: serde::de::DeserializeOwned>(res: Response) -> Result<T, ApiError> {
    res.json::<T>()
        .await
        .map_err(|e| ApiError::Transport(format!("invalid response body: {}", e)))
}

#[async_trait]
impl StorageApi for B2Client {
    async fn authorize(&self, key: &AccountKey) -> Result<Session, ApiError> {
        let endpoint = format!("{}/b2api/v2/b2_authorize_account", self.auth_url);
        debug!("GET {}", endpoint);
        let res = send(
            self.client
                .get(endpoint)
                .basic_auth(&key.key_id, Some(&key.application_key)),
        )
        .await?;
        json_body(res).await
    }

    async fn get_upload_url(
        &self,
        session: &Session,
        bucket_id: &str,
    ) -> Result<UploadCredential, ApiError> {
        let res = send(
            self.api_call(session, "b2_get_upload_url")
                .json(&json!({ "bucketId": bucket_id })),
        )
        .await?;
        json_body(res).await
    }

    async fn start_large_file(
        &self,
        session: &Session,
        bucket_id: &str,
        file_name: &str,
        content_type: &str,
    ) -> Result<String, ApiError> {
        let res = send(self.api_call(session, "b2_start_large_file").json(&json!({
            "bucketId": bucket_id,
            "fileName": file_name,
            "contentType": content_type,
        })))
        .await?;
        let started: StartLargeFileResponse = json_body(res).await?;
        Ok(started.file_id)
    }

    async fn get_upload_part_url(
        &self,
        session: &Session,
        file_id: &str,
    ) -> Result<UploadCredential, ApiError> {
        let res = send(
            self.api_call(session, "b2_get_upload_part_url")
                .json(&json!({ "fileId": file_id })),
        )
        .await?;
        json_body(res).await
    }

    async fn upload_file(
        &self,
        credential: &UploadCredential,
        file_name: &str,
        content_type: &str,
        body: Bytes,
        sha1: &str,
    ) -> Result<UploadResult, ApiError> {
        // reqwest omits Content-Length for an empty body; B2 requires it.
        let res = send(
            self.client
                .post(&credential.upload_url)
                .header("Authorization", &credential.auth_token)
                .header("Content-Type", content_type)
                .header(CONTENT_LENGTH, body.len())
                .header("X-Bz-File-Name", escape_file_name(file_name))
                .header("X-Bz-Content-Sha1", sha1)
                .body(body),
        )
        .await?;
        json_body(res).await
    }

    async fn upload_part(
        &self,
        credential: &UploadCredential,
        part_number: u32,
        body: Bytes,
        sha1: &str,
    ) -> Result<(), ApiError> {
        send(
            self.client
                .post(&credential.upload_url)
                .header("Authorization", &credential.auth_token)
                .header("Content-Type", "application/octet-stream")
                .header(CONTENT_LENGTH, body.len())
                .header("X-Bz-Part-Number", part_number.to_string())
                .header("X-Bz-Content-Sha1", sha1)
                .body(body),
        )
        .await?;
        Ok(())
    }

    async fn finish_large_file(
        &self,
        session: &Session,
        file_id: &str,
        part_sha1s: &[String],
    ) -> Result<UploadResult, ApiError> {
        let res = send(self.api_call(session, "b2_finish_large_file").json(&json!({
            "fileId": file_id,
            "partSha1Array": part_sha1s,
        })))
        .await?;
        json_body(res).await
    }
}
