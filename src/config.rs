use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
    pub pool_timeout: Duration,
    pub disasters_root: PathBuf,
    pub log_dir: PathBuf,
    pub table_setup_attempts: u32,
    pub table_setup_base_delay: Duration,
    pub ddl_lock_timeout: Duration,
    pub prediction_horizon_days: u32,
    pub spike_z_threshold: f64,
    pub trend_stable_band: f64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // Build database_url from individual fields or use DATABASE_URL if provided
        let database_url = if let Ok(url) = env::var("DATABASE_URL") {
            url
        } else {
            let db_host = env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
            let db_port = env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
            let db_name = env::var("DB_NAME").unwrap_or_else(|_| "drms".to_string());
            let db_user = env::var("DB_USER").unwrap_or_else(|_| "drms".to_string());
            let db_password = env::var("DB_PASSWORD").unwrap_or_else(|_| "password".to_string());

            // URL-encode password to handle special characters
            let encoded_password = urlencoding::encode(&db_password);

            format!("postgres://{}:{}@{}:{}/{}", db_user, encoded_password, db_host, db_port, db_name)
        };

        let host = env::var("DRMS_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = env_or("DRMS_PORT", 5000);
        let max_connections = env_or("MAX_CONNECTIONS", 10);
        let pool_timeout_secs: u64 = env_or("POOL_TIMEOUT_SECS", 20);

        let disasters_root = env::var("DISASTERS_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./Disasters"));

        let log_dir = env::var("LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./logs"));

        let table_setup_attempts = env_or("TABLE_SETUP_ATTEMPTS", 3);
        let table_setup_base_delay_ms: u64 = env_or("TABLE_SETUP_BASE_DELAY_MS", 500);
        let ddl_lock_timeout_ms: u64 = env_or("DDL_LOCK_TIMEOUT_MS", 2000);

        let prediction_horizon_days = env_or("PREDICTION_HORIZON_DAYS", 7);
        let spike_z_threshold = env_or("SPIKE_Z_THRESHOLD", 2.0);
        let trend_stable_band = env_or("TREND_STABLE_BAND", 0.05);

        if table_setup_attempts == 0 {
            anyhow::bail!("TABLE_SETUP_ATTEMPTS must be at least 1");
        }

        Ok(Config {
            database_url,
            host,
            port,
            max_connections,
            pool_timeout: Duration::from_secs(pool_timeout_secs),
            disasters_root,
            log_dir,
            table_setup_attempts,
            table_setup_base_delay: Duration::from_millis(table_setup_base_delay_ms),
            ddl_lock_timeout: Duration::from_millis(ddl_lock_timeout_ms),
            prediction_horizon_days,
            spike_z_threshold,
            trend_stable_band,
        })
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|e| anyhow::anyhow!("Invalid socket address: {}", e))
    }
}

/// Parse an environment variable, falling back to `default` when unset or malformed.
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
