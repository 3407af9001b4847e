use crate::config::Config;
use crate::error::{ReliefError, Result};
use deadpool_postgres::{Config as PoolConfig, Pool, Runtime};
use std::time::Duration;
use tokio_postgres::NoTls;
use tracing::info;

/// Create the service pool and verify the database answers.
pub async fn connect(config: &Config) -> Result<Pool> {
    let pool = create_pool(&config.database_url, config.max_connections, config.pool_timeout)?;

    let client = pool.get().await?;

    // Simple ping query
    client
        .execute("SELECT 1", &[])
        .await
        .map_err(|e| ReliefError::ConnectionFailed {
            cause: format!("Ping failed: {}", e),
        })?;

    info!(
        "Connected to PostgreSQL (max {} connections)",
        config.max_connections
    );

    Ok(pool)
}

pub async fn ping(pool: &Pool) -> bool {
    match pool.get().await {
        Ok(client) => client.execute("SELECT 1", &[]).await.is_ok(),
        Err(_) => false,
    }
}

pub fn create_pool(database_url: &str, max_size: u32, timeout: Duration) -> Result<Pool> {
    let mut cfg = PoolConfig::new();
    cfg.url = Some(database_url.to_string());

    cfg.pool = Some(deadpool_postgres::PoolConfig {
        max_size: max_size as usize,
        timeouts: deadpool_postgres::Timeouts {
            wait: Some(timeout),
            create: Some(timeout),
            recycle: Some(Duration::from_secs(5)),
        },
        ..Default::default()
    });

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(|e| ReliefError::Internal(format!("Failed to create pool: {}", e)))
}

/// Check a table name against the live catalog of the current schema.
pub async fn table_exists(
    client: &deadpool_postgres::Transaction<'_>,
    table_name: &str,
) -> Result<bool> {
    let row = client
        .query_opt(
            r#"
            SELECT 1 FROM information_schema.tables
            WHERE table_schema = current_schema()
            AND table_name::text = $1
            "#,
            &[&table_name],
        )
        .await
        .map_err(|e| ReliefError::storage(format!("catalog lookup for {}", table_name), e))?;

    Ok(row.is_some())
}

/// Names that are safe to splice into DDL without quoting.
pub fn is_valid_identifier(name: &str) -> bool {
    if name.is_empty() || name.len() > 63 {
        return false;
    }

    let first_char = match name.chars().next() {
        Some(c) => c,
        None => return false,
    };
    if !first_char.is_ascii_lowercase() && first_char != '_' {
        return false;
    }

    name.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
