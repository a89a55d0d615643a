use sqlx::{Connection, PgConnection};
use tracing::{error, info};

use super::pg_url::redact_url;

pub async fn check_db_connection(db_url: &str) -> bool {
    match PgConnection::connect(db_url).await {
        Ok(conn) => {
            info!("Successfully connected to {}", redact_url(db_url));
            let _ = conn.close().await;
            true
        }
        Err(e) => {
            error!("Failed to connect to {}: {}", redact_url(db_url), e);
            false
        }
    }
}
