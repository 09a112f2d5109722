use std::collections::HashSet;
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceType {
    /// Decode/validate/transform only, no model predictions.
    Basic,
    /// Full pipeline including the classifier.
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateStoreBackend {
    Redis,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Local,
    S3,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub jwt_secret: String,

    // Upload validation
    pub max_upload_size: usize,
    pub supported_formats: HashSet<String>,

    // Audio processing
    pub max_duration_seconds: f64,
    pub sample_rate: u32,
    pub processing_timeout: u64,
    pub service_type: ServiceType,

    // Background queue
    pub queue_capacity: usize,
    pub worker_concurrency: usize,

    // State store
    pub state_store: StateStoreBackend,
    pub redis_host: String,
    pub redis_port: u16,
    pub redis_db: u32,

    // Blob storage
    pub storage_backend: StorageBackend,
    pub storage_path: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub aws_region: String,
    pub s3_endpoint: Option<String>,
    pub s3_bucket_name: String,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let supported_formats = env_or("SUPPORTED_FORMATS", "wav,mp3,ogg,flac,m4a,aac")
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let service_type = match env_or("SERVICE_TYPE", "basic").to_lowercase().as_str() {
            "full" => ServiceType::Full,
            _ => ServiceType::Basic,
        };

        let state_store = match env_or("STATE_STORE", "redis").to_lowercase().as_str() {
            "memory" => StateStoreBackend::Memory,
            _ => StateStoreBackend::Redis,
        };

        let storage_backend = match env_or("STORAGE_BACKEND", "local").to_lowercase().as_str() {
            "s3" => StorageBackend::S3,
            _ => StorageBackend::Local,
        };

        Self {
            port: env_parse("PORT", 3000),
            jwt_secret: env_or("JWT_SECRET", "secret"),
            max_upload_size: env_parse("MAX_UPLOAD_SIZE", 50 * 1024 * 1024),
            supported_formats,
            max_duration_seconds: env_parse("MAX_DURATION_SECONDS", 300.0),
            sample_rate: env_parse("SAMPLE_RATE", 16000),
            processing_timeout: env_parse("PROCESSING_TIMEOUT", 300),
            service_type,
            queue_capacity: env_parse("QUEUE_CAPACITY", 64),
            worker_concurrency: env_parse("WORKER_CONCURRENCY", 4),
            state_store,
            redis_host: env_or("REDIS_HOST", "localhost"),
            redis_port: env_parse("REDIS_PORT", 6379),
            redis_db: env_parse("REDIS_DB", 0),
            storage_backend,
            storage_path: env_or("STORAGE_PATH", "uploads"),
            aws_access_key_id: env_or("AWS_ACCESS_KEY_ID", ""),
            aws_secret_access_key: env_or("AWS_SECRET_ACCESS_KEY", ""),
            aws_region: env_or("AWS_REGION", "us-east-1"),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            s3_bucket_name: env_or("S3_BUCKET_NAME", "soundgate"),
        }
    }
}

#[cfg(test)]
impl Config {
    /// In-memory defaults so tests never touch the environment or the network.
    pub fn for_tests(storage_path: &str) -> Self {
        Self {
            port: 0,
            jwt_secret: "test-secret".to_string(),
            max_upload_size: 50 * 1024 * 1024,
            supported_formats: ["wav", "mp3", "ogg", "flac", "m4a", "aac"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_duration_seconds: 300.0,
            sample_rate: 16000,
            processing_timeout: 30,
            service_type: ServiceType::Full,
            queue_capacity: 8,
            worker_concurrency: 2,
            state_store: StateStoreBackend::Memory,
            redis_host: "localhost".to_string(),
            redis_port: 6379,
            redis_db: 0,
            storage_backend: StorageBackend::Local,
            storage_path: storage_path.to_string(),
            aws_access_key_id: String::new(),
            aws_secret_access_key: String::new(),
            aws_region: "us-east-1".to_string(),
            s3_endpoint: None,
            s3_bucket_name: "soundgate".to_string(),
        }
    }
}
