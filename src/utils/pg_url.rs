// b2backup/src/utils/pg_url.rs
use anyhow::{Context, Result};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgUrlParts {
    pub host: String,
    pub user: String,
    pub port: Option<u16>,
    pub database: String,
}

pub fn parse_postgres_url(db_url: &str) -> Result<PgUrlParts> {
    let url = Url::parse(db_url).context("Invalid PostgreSQL URL")?;
    if !matches!(url.scheme(), "postgres" | "postgresql") {
        anyhow::bail!("Database URL must use the postgres:// or postgresql:// scheme");
    }
    let host = url.host_str().context("Database URL has no host")?.to_string();
    let database = url.path().trim_start_matches('/').to_string();
    if database.is_empty() {
        anyhow::bail!("Database URL has no database name");
    }

    Ok(PgUrlParts {
        host,
        user: url.username().to_string(),
        port: url.port(),
        database,
    })
}

/// Neon routes connections by endpoint id, the first label of the host
/// (`ep-...`). Clients without SNI need it passed as a startup option.
fn endpoint_id(host: &str) -> Option<&str> {
    host.split('.').next().filter(|label| label.starts_with("ep-"))
}

/// Connection URI handed to `pg_dump`/`pg_restore`, with the endpoint option
/// added for Neon hosts when the URL does not already carry `options`.
pub fn tool_connection_uri(db_url: &str) -> Result<String> {
    let mut url = Url::parse(db_url).context("Invalid PostgreSQL URL")?;
    let has_options = url.query_pairs().any(|(k, _)| k == "options");
    let endpoint = url.host_str().and_then(endpoint_id).map(str::to_string);

    if let (Some(endpoint), false) = (endpoint, has_options) {
        url.query_pairs_mut()
            .append_pair("options", &format!("endpoint={}", endpoint));
    }
    Ok(url.to_string())
}

/// Whether the tools should be forced onto TLS with `PGSSLMODE=require`.
pub fn requires_ssl(db_url: &str) -> bool {
    let Ok(url) = Url::parse(db_url) else {
        return true;
    };
    let local = matches!(url.host_str(), Some("localhost" | "127.0.0.1" | "::1" | "[::1]"));
    let explicit = url.query_pairs().any(|(k, _)| k == "sslmode");
    !local && !explicit
}

/// Masks the password so the URL can be logged.
pub fn redact_url(db_url: &str) -> String {
    match Url::parse(db_url) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("****"));
            }
            url.to_string()
        }
        Err(_) => "<invalid url>".to_string(),
    }
}
