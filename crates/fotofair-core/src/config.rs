//! Configuration module
//!
//! Environment-driven configuration for the API server, storage backends,
//! and the ingestion task queue. Values come from the process environment
//! (optionally seeded from a `.env` file via dotenvy) with sensible defaults
//! for development.

use std::env;
use std::str::FromStr;

const SERVER_PORT: u16 = 3000;
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MAX_ARCHIVE_SIZE_BYTES: usize = 10 * 1024 * 1024 * 1024;
const TASK_QUEUE_MAX_WORKERS: usize = 4;
const TASK_QUEUE_POLL_INTERVAL_MS: u64 = 1000;
const TASK_QUEUE_MAX_ATTEMPTS: i32 = 3;
const TASK_QUEUE_RETRY_BACKOFF_BASE_SECS: u64 = 5;
const TASK_QUEUE_DEFAULT_TIMEOUT_SECS: i32 = 3600;

/// Which object storage backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Local,
    S3,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(StorageBackend::Local),
            "s3" => Ok(StorageBackend::S3),
            _ => Err(anyhow::anyhow!("Unsupported storage backend: {}", s)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    /// Custom endpoint for S3-compatible providers (MinIO, DigitalOcean Spaces, etc.)
    pub s3_endpoint: Option<String>,
    pub local_storage_path: String,
    pub local_storage_base_url: String,
    // Ingestion configuration
    pub watermark_path: String,
    pub upload_tmp_dir: String,
    pub max_archive_size_bytes: usize,
    // Task queue configuration
    pub task_queue_max_workers: usize,
    pub task_queue_poll_interval_ms: u64,
    pub task_queue_max_attempts: i32,
    pub task_queue_retry_backoff_base_secs: u64,
    pub task_queue_default_timeout_seconds: i32,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

        let storage_backend = env_or("STORAGE_BACKEND", "local").parse()?;

        let cors_origins = env_or("CORS_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Config {
            server_port: env_parse("SERVER_PORT", SERVER_PORT),
            cors_origins,
            environment: env_or("ENVIRONMENT", "development"),
            database_url,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", MAX_CONNECTIONS),
            db_timeout_seconds: env_parse("DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS),
            storage_backend,
            s3_bucket: env_opt("S3_BUCKET"),
            s3_region: env_opt("S3_REGION"),
            s3_endpoint: env_opt("S3_ENDPOINT"),
            local_storage_path: env_or("LOCAL_STORAGE_PATH", "./data/storage"),
            local_storage_base_url: env_or(
                "LOCAL_STORAGE_BASE_URL",
                "http://localhost:3000/files",
            ),
            watermark_path: env_or("WATERMARK_PATH", "./assets/watermark.png"),
            upload_tmp_dir: env_or("UPLOAD_TMP_DIR", "./data/tmp"),
            max_archive_size_bytes: env_parse("MAX_ARCHIVE_SIZE_BYTES", MAX_ARCHIVE_SIZE_BYTES),
            task_queue_max_workers: env_parse("TASK_QUEUE_MAX_WORKERS", TASK_QUEUE_MAX_WORKERS),
            task_queue_poll_interval_ms: env_parse(
                "TASK_QUEUE_POLL_INTERVAL_MS",
                TASK_QUEUE_POLL_INTERVAL_MS,
            ),
            task_queue_max_attempts: env_parse("TASK_QUEUE_MAX_ATTEMPTS", TASK_QUEUE_MAX_ATTEMPTS),
            task_queue_retry_backoff_base_secs: env_parse(
                "TASK_QUEUE_RETRY_BACKOFF_BASE_SECS",
                TASK_QUEUE_RETRY_BACKOFF_BASE_SECS,
            ),
            task_queue_default_timeout_seconds: env_parse(
                "TASK_QUEUE_DEFAULT_TIMEOUT_SECS",
                TASK_QUEUE_DEFAULT_TIMEOUT_SECS,
            ),
        })
    }

    /// Fail fast on configurations that cannot work at runtime.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.storage_backend == StorageBackend::S3 {
            if self.s3_bucket.is_none() {
                anyhow::bail!("S3_BUCKET must be set when STORAGE_BACKEND=s3");
            }
            if self.s3_region.is_none() {
                anyhow::bail!("S3_REGION must be set when STORAGE_BACKEND=s3");
            }
        }
        if self.task_queue_max_workers == 0 {
            anyhow::bail!("TASK_QUEUE_MAX_WORKERS must be at least 1");
        }
        if self.task_queue_max_attempts < 1 {
            anyhow::bail!("TASK_QUEUE_MAX_ATTEMPTS must be at least 1");
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            server_port: 3000,
            cors_origins: vec!["*".to_string()],
            environment: "test".to_string(),
            database_url: "postgres://localhost/fotofair".to_string(),
            db_max_connections: 20,
            db_timeout_seconds: 30,
            storage_backend: StorageBackend::Local,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            local_storage_path: "./data/storage".to_string(),
            local_storage_base_url: "http://localhost:3000/files".to_string(),
            watermark_path: "./assets/watermark.png".to_string(),
            upload_tmp_dir: "./data/tmp".to_string(),
            max_archive_size_bytes: MAX_ARCHIVE_SIZE_BYTES,
            task_queue_max_workers: 4,
            task_queue_poll_interval_ms: 1000,
            task_queue_max_attempts: 3,
            task_queue_retry_backoff_base_secs: 5,
            task_queue_default_timeout_seconds: 3600,
        }
    }

    #[test]
    fn local_backend_validates_without_s3_settings() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn s3_backend_requires_bucket_and_region() {
        let mut config = base_config();
        config.storage_backend = StorageBackend::S3;
        assert!(config.validate().is_err());

        config.s3_bucket = Some("photos".to_string());
        config.s3_region = Some("eu-central-1".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn storage_backend_from_str() {
        assert_eq!(
            "local".parse::<StorageBackend>().unwrap(),
            StorageBackend::Local
        );
        assert_eq!("S3".parse::<StorageBackend>().unwrap(), StorageBackend::S3);
        assert!("ftp".parse::<StorageBackend>().is_err());
    }
}
