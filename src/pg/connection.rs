use crate::util::{sanitize_connection_error, sanitize_url, Result, SchemaError};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

/// Connection settings, passed explicitly to [`PgConnection::connect`].
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub url: String,
    pub max_connections: u32,
}

impl ConnectionConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 5,
        }
    }
}

pub struct PgConnection {
    pool: Pool<Postgres>,
}

impl PgConnection {
    pub async fn new(connection_string: &str) -> Result<Self> {
        Self::connect(&ConnectionConfig::new(connection_string)).await
    }

    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        tracing::debug!(url = %sanitize_url(&config.url), "connecting");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(|e| {
                let sanitized_error = sanitize_connection_error(&config.url, &e.to_string());
                SchemaError::DatabaseError(format!(
                    "Failed to connect to {}: {sanitized_error}",
                    sanitize_url(&config.url)
                ))
            })?;

        Ok(PgConnection { pool })
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}
