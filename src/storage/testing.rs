// b2backup/src/storage/testing.rs
//! In-memory `StorageApi` that records every call and replays scripted failures.
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use super::api::{AccountKey, ApiError, Session, StorageApi, UploadCredential, UploadResult};
use super::small::sha1_hex;

pub const ACCOUNT_ID: &str = "account-1";
pub const BUCKET_ID: &str = "bucket-1";

#[derive(Debug, Clone)]
pub struct SmallUpload {
    pub file_name: String,
    pub content_type: String,
    pub token: String,
    pub sha1: String,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub struct PartAttempt {
    pub part_number: u32,
    pub token: String,
    pub len: usize,
    pub sha1: String,
    pub succeeded: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Calls {
    pub authorize: usize,
    pub get_upload_url: usize,
    pub start_large_file: Vec<String>,
    pub get_upload_part_url: Vec<String>,
    pub small_uploads: Vec<SmallUpload>,
    pub part_attempts: Vec<PartAttempt>,
    pub finish: Vec<(String, Vec<String>)>,
    pub max_parts_in_flight: usize,
}

impl Calls {
    pub fn attempts_for(&self, part_number: u32) -> Vec<&PartAttempt> {
        self.part_attempts
            .iter()
            .filter(|a| a.part_number == part_number)
            .collect()
    }
}

#[derive(Default)]
struct Script {
    authorize: Option<ApiError>,
    start_large_file: Option<ApiError>,
    finish_large_file: Option<ApiError>,
    upload_file: Option<ApiError>,
    get_upload_part_url: Option<ApiError>,
    part_statuses: HashMap<u32, VecDeque<u16>>,
}

#[derive(Default)]
pub struct FakeStorage {
    calls: Mutex<Calls>,
    script: Mutex<Script>,
    in_flight: Mutex<usize>,
}

fn status(status: u16, body: &str) -> ApiError {
    ApiError::Status { status, body: body.to_string() }
}

impl FakeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account_key() -> AccountKey {
        AccountKey {
            key_id: "key-id".to_string(),
            application_key: "application-key".to_string(),
        }
    }

    pub fn calls(&self) -> Calls {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_authorize(&self, code: u16, body: &str) {
        self.script.lock().unwrap().authorize = Some(status(code, body));
    }

    pub fn fail_start(&self, code: u16, body: &str) {
        self.script.lock().unwrap().start_large_file = Some(status(code, body));
    }

    pub fn fail_finish(&self, code: u16, body: &str) {
        self.script.lock().unwrap().finish_large_file = Some(status(code, body));
    }

    pub fn fail_upload_file(&self, code: u16, body: &str) {
        self.script.lock().unwrap().upload_file = Some(status(code, body));
    }

    pub fn fail_part_url(&self, code: u16, body: &str) {
        self.script.lock().unwrap().get_upload_part_url = Some(status(code, body));
    }

    /// Queues HTTP statuses returned for `part_number` before it is accepted.
    pub fn fail_part(&self, part_number: u32, statuses: &[u16]) {
        self.script
            .lock()
            .unwrap()
            .part_statuses
            .entry(part_number)
            .or_default()
            .extend(statuses.iter().copied());
    }
}

#[async_trait]
impl StorageApi for FakeStorage {
    async fn authorize(&self, _key: &AccountKey) -> Result<Session, ApiError> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.authorize += 1;
            calls.authorize
        };
        if let Some(err) = self.script.lock().unwrap().authorize.clone() {
            return Err(err);
        }
        Ok(Session {
            api_base_url: "https://api.test".to_string(),
            auth_token: format!("account-token-{}", n),
            download_url: "https://download.test".to_string(),
            account_id: ACCOUNT_ID.to_string(),
        })
    }

    async fn get_upload_url(
        &self,
        _session: &Session,
        bucket_id: &str,
    ) -> Result<UploadCredential, ApiError> {
        let mut calls = self.calls.lock().unwrap();
        calls.get_upload_url += 1;
        Ok(UploadCredential {
            upload_url: format!("https://upload.test/{}", bucket_id),
            auth_token: format!("upload-token-{}", calls.get_upload_url),
        })
    }

    async fn start_large_file(
        &self,
        _session: &Session,
        _bucket_id: &str,
        file_name: &str,
        _content_type: &str,
    ) -> Result<String, ApiError> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.start_large_file.push(file_name.to_string());
            calls.start_large_file.len()
        };
        if let Some(err) = self.script.lock().unwrap().start_large_file.clone() {
            return Err(err);
        }
        Ok(format!("large-file-{}", n))
    }

    async fn get_upload_part_url(
        &self,
        _session: &Session,
        file_id: &str,
    ) -> Result<UploadCredential, ApiError> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.get_upload_part_url.push(file_id.to_string());
            calls.get_upload_part_url.len()
        };
        if let Some(err) = self.script.lock().unwrap().get_upload_part_url.clone() {
            return Err(err);
        }
        Ok(UploadCredential {
            upload_url: format!("https://upload.test/part/{}", file_id),
            auth_token: format!("part-token-{}", n),
        })
    }

    async fn upload_file(
        &self,
        credential: &UploadCredential,
        file_name: &str,
        content_type: &str,
        body: Bytes,
        sha1: &str,
    ) -> Result<UploadResult, ApiError> {
        self.calls.lock().unwrap().small_uploads.push(SmallUpload {
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            token: credential.auth_token.clone(),
            sha1: sha1.to_string(),
            body: body.clone(),
        });
        if let Some(err) = self.script.lock().unwrap().upload_file.clone() {
            return Err(err);
        }
        if sha1_hex(&body) != sha1 {
            return Err(status(400, "checksum did not match data received"));
        }
        Ok(UploadResult {
            file_id: format!("small-{}", file_name),
            file_name: file_name.to_string(),
            account_id: ACCOUNT_ID.to_string(),
            bucket_id: BUCKET_ID.to_string(),
            content_type: Some(content_type.to_string()),
        })
    }

    async fn upload_part(
        &self,
        credential: &UploadCredential,
        part_number: u32,
        body: Bytes,
        sha1: &str,
    ) -> Result<(), ApiError> {
        {
            let mut in_flight = self.in_flight.lock().unwrap();
            *in_flight += 1;
            let mut calls = self.calls.lock().unwrap();
            calls.max_parts_in_flight = calls.max_parts_in_flight.max(*in_flight);
        }
        tokio::task::yield_now().await;
        *self.in_flight.lock().unwrap() -= 1;

        let scripted = self
            .script
            .lock()
            .unwrap()
            .part_statuses
            .get_mut(&part_number)
            .and_then(|queue| queue.pop_front());
        let outcome = match scripted {
            Some(code) => Err(status(code, &format!("scripted failure for part {}", part_number))),
            None if sha1_hex(&body) != sha1 => {
                Err(status(400, "checksum did not match data received"))
            }
            None => Ok(()),
        };

        self.calls.lock().unwrap().part_attempts.push(PartAttempt {
            part_number,
            token: credential.auth_token.clone(),
            len: body.len(),
            sha1: sha1.to_string(),
            succeeded: outcome.is_ok(),
        });
        outcome
    }

    async fn finish_large_file(
        &self,
        _session: &Session,
        file_id: &str,
        part_sha1s: &[String],
    ) -> Result<UploadResult, ApiError> {
        let file_name = {
            let mut calls = self.calls.lock().unwrap();
            calls.finish.push((file_id.to_string(), part_sha1s.to_vec()));
            calls.start_large_file.last().cloned().unwrap_or_default()
        };
        if let Some(err) = self.script.lock().unwrap().finish_large_file.clone() {
            return Err(err);
        }
        Ok(UploadResult {
            file_id: file_id.to_string(),
            file_name,
            account_id: ACCOUNT_ID.to_string(),
            bucket_id: BUCKET_ID.to_string(),
            content_type: Some("application/x-tar".to_string()),
        })
    }
}
