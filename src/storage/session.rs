// b2backup/src/storage/session.rs
use tracing::{debug, warn};

use super::api::{AccountKey, Session, StorageApi};
use crate::errors::{AppError, Result};

/// Issues a fresh `Session` on every call. Nothing is cached here; callers hold
/// on to the returned value and call again when the service rejects it.
#[derive(Debug, Clone)]
pub struct CredentialSession {
    key: AccountKey,
}

impl CredentialSession {
    pub fn new(key: AccountKey) -> Self {
        Self { key }
    }

    pub async fn get_session<A: StorageApi + ?Sized>(&self, api: &A) -> Result<Session> {
        debug!("Authorizing account key {}", self.key.key_id);
        match api.authorize(&self.key).await {
            Ok(session) => {
                debug!(
                    "Authorized account {} (api {}, downloads {})",
                    session.account_id, session.api_base_url, session.download_url
                );
                Ok(session)
            }
            Err(e) => {
                warn!("Authorization with key {} failed: {}", self.key.key_id, e);
                Err(AppError::Auth(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::testing::FakeStorage;

    #[tokio::test]
    async fn test_each_call_reauthenticates() -> anyhow::Result<()> {
        let api = FakeStorage::new();
        let credentials = CredentialSession::new(FakeStorage::account_key());

        let first = credentials.get_session(&api).await?;
        let second = credentials.get_session(&api).await?;

        assert_eq!(api.calls().authorize, 2);
        assert_ne!(first.auth_token, second.auth_token);
        Ok(())
    }

    #[tokio::test]
    async fn test_rejected_authorization_carries_status_and_body() {
        let api = FakeStorage::new();
        api.fail_authorize(401, "bad_auth_token");
        let credentials = CredentialSession::new(FakeStorage::account_key());

        let err = credentials.get_session(&api).await.unwrap_err();

        assert!(matches!(err, AppError::Auth(_)));
        let source = err.api_error().unwrap();
        assert_eq!(source.status(), Some(401));
        assert_eq!(source.body(), "bad_auth_token");
        assert_eq!(api.calls().authorize, 1);
    }
}
