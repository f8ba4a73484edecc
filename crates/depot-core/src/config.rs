//! Configuration module
//!
//! Server configuration is read once from the environment (after loading an
//! optional `.env` file) and shared read-only through application state.

use std::collections::HashMap;
use std::env;
use std::str::FromStr;

use crate::models::{ArchiveFormat, ResourceCategory};
use crate::rules::{
    CategoryRule, UploadRules, DEFAULT_MAX_ARCHIVE_SIZE_MB, DEFAULT_MAX_AUDIO_SIZE_MB,
    DEFAULT_MAX_FILE_SIZE_MB, DEFAULT_MAX_IMAGE_SIZE_MB, DEFAULT_MAX_VIDEO_SIZE_MB,
};
use crate::storage_types::StorageBackend;

const SERVER_PORT: u16 = 4000;
const DB_MAX_CONNECTIONS: u32 = 20;
const UPLOAD_URL_TTL_SECS: u64 = 3600;
const DOWNLOAD_URL_TTL_SECS: u64 = 3600;
const SIGNED_URL_BATCH_MAX: usize = 100;
const LISTING_CACHE_CAPACITY: usize = 256;
const MAX_ARCHIVE_ENTRIES: usize = 10_000;
const MAX_ARCHIVE_TOTAL_MB: u64 = 500;
const MIN_SIGNING_SECRET_LEN: usize = 32;

/// Scope value granting write access to every group.
pub const WILDCARD_SCOPE: &str = "*";

#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO etc.)
    pub local_storage_path: String,
    pub local_storage_base_url: String,
    pub url_signing_secret: String,
    // Presigned URL behavior
    pub upload_url_ttl_secs: u64,
    pub download_url_ttl_secs: u64,
    pub signed_url_batch_max: usize,
    pub verify_uploaded_objects: bool,
    pub listing_cache_capacity: usize,
    /// token -> group scopes (`*` grants all groups). Empty means open access.
    pub api_tokens: HashMap<String, Vec<String>>,
    // Ingestion
    pub max_archive_entries: usize,
    /// Ceiling on the decompressed size of all entries of one archive.
    pub max_archive_total_bytes: u64,
    pub upload_rules: UploadRules,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: SERVER_PORT,
            environment: "development".to_string(),
            cors_origins: vec![WILDCARD_SCOPE.to_string()],
            database_url: None,
            db_max_connections: DB_MAX_CONNECTIONS,
            storage_backend: StorageBackend::Local,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            local_storage_path: "./data/objects".to_string(),
            local_storage_base_url: format!("http://localhost:{}", SERVER_PORT),
            url_signing_secret: String::new(),
            upload_url_ttl_secs: UPLOAD_URL_TTL_SECS,
            download_url_ttl_secs: DOWNLOAD_URL_TTL_SECS,
            signed_url_batch_max: SIGNED_URL_BATCH_MAX,
            verify_uploaded_objects: true,
            listing_cache_capacity: LISTING_CACHE_CAPACITY,
            api_tokens: HashMap::new(),
            max_archive_entries: MAX_ARCHIVE_ENTRIES,
            max_archive_total_bytes: MAX_ARCHIVE_TOTAL_MB * 1024 * 1024,
            upload_rules: UploadRules::default(),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins: Vec<String> = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| WILDCARD_SCOPE.to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let server_port = env_or("PORT", SERVER_PORT);

        let storage_backend = match env_opt("STORAGE_BACKEND") {
            Some(value) => value
                .parse::<StorageBackend>()
                .map_err(|e| anyhow::anyhow!("Invalid STORAGE_BACKEND: {}", e))?,
            None => StorageBackend::Local,
        };

        let upload_rules = UploadRules::new(
            [
                (ResourceCategory::Image, env_or("MAX_IMAGE_SIZE_MB", DEFAULT_MAX_IMAGE_SIZE_MB)),
                (ResourceCategory::Audio, env_or("MAX_AUDIO_SIZE_MB", DEFAULT_MAX_AUDIO_SIZE_MB)),
                (ResourceCategory::Video, env_or("MAX_VIDEO_SIZE_MB", DEFAULT_MAX_VIDEO_SIZE_MB)),
                (
                    ResourceCategory::Archive,
                    env_or("MAX_ARCHIVE_SIZE_MB", DEFAULT_MAX_ARCHIVE_SIZE_MB),
                ),
                (ResourceCategory::File, env_or("MAX_FILE_SIZE_MB", DEFAULT_MAX_FILE_SIZE_MB)),
            ]
            .into_iter()
            .map(|(category, mb)| (category, CategoryRule::from_megabytes(mb)))
            .collect(),
            parse_archive_formats(
                &env::var("ARCHIVE_ALLOWED_FORMATS").unwrap_or_else(|_| "zip".to_string()),
            )?,
        );

        let api_tokens = parse_api_tokens(&env::var("API_TOKENS").unwrap_or_default())?;

        let config = Config {
            server_port,
            environment,
            cors_origins,
            database_url: env_opt("DATABASE_URL"),
            db_max_connections: env_or("DB_MAX_CONNECTIONS", DB_MAX_CONNECTIONS),
            storage_backend,
            s3_bucket: env_opt("S3_BUCKET"),
            s3_region: env_opt("S3_REGION").or_else(|| env_opt("AWS_REGION")),
            s3_endpoint: env_opt("S3_ENDPOINT"),
            local_storage_path: env::var("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|_| "./data/objects".to_string()),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}", server_port)),
            url_signing_secret: env::var("URL_SIGNING_SECRET").unwrap_or_default(),
            upload_url_ttl_secs: env_or("UPLOAD_URL_TTL_SECS", UPLOAD_URL_TTL_SECS),
            download_url_ttl_secs: env_or("DOWNLOAD_URL_TTL_SECS", DOWNLOAD_URL_TTL_SECS),
            signed_url_batch_max: env_or("SIGNED_URL_BATCH_MAX", SIGNED_URL_BATCH_MAX),
            verify_uploaded_objects: env_or("VERIFY_UPLOADED_OBJECTS", true),
            listing_cache_capacity: env_or("LISTING_CACHE_CAPACITY", LISTING_CACHE_CAPACITY),
            api_tokens,
            max_archive_entries: env_or("MAX_ARCHIVE_ENTRIES", MAX_ARCHIVE_ENTRIES),
            max_archive_total_bytes: env_or("MAX_ARCHIVE_TOTAL_MB", MAX_ARCHIVE_TOTAL_MB)
                .saturating_mul(1024 * 1024),
            upload_rules,
        };

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.is_production() && self.cors_origins.iter().any(|o| o == WILDCARD_SCOPE) {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if let Some(url) = &self.database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!("S3_BUCKET is required when STORAGE_BACKEND=s3"));
                }
            }
            StorageBackend::Local => {
                if self.url_signing_secret.is_empty() {
                    return Err(anyhow::anyhow!(
                        "URL_SIGNING_SECRET is required when STORAGE_BACKEND=local"
                    ));
                }
                if self.is_production() && self.url_signing_secret.len() < MIN_SIGNING_SECRET_LEN {
                    return Err(anyhow::anyhow!(
                        "URL_SIGNING_SECRET must be at least {} characters long in production",
                        MIN_SIGNING_SECRET_LEN
                    ));
                }
            }
        }

        if self.upload_url_ttl_secs == 0 || self.download_url_ttl_secs == 0 {
            return Err(anyhow::anyhow!("Presigned URL TTLs must be greater than zero"));
        }

        if self.max_archive_total_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_ARCHIVE_TOTAL_MB must be greater than zero"));
        }

        if self.signed_url_batch_max == 0 {
            return Err(anyhow::anyhow!("SIGNED_URL_BATCH_MAX must be greater than zero"));
        }

        if self.is_production() && self.api_tokens.is_empty() {
            return Err(anyhow::anyhow!("API_TOKENS must be configured in production"));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn server_port(&self) -> u16 {
        self.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.cors_origins
    }

    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref()
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.storage_backend
    }

    pub fn upload_rules(&self) -> &UploadRules {
        &self.upload_rules
    }
}

/// Parse `API_TOKENS` in the form `token=group1|group2;token2=*`.
pub fn parse_api_tokens(raw: &str) -> Result<HashMap<String, Vec<String>>, anyhow::Error> {
    let mut tokens = HashMap::new();
    for pair in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let (token, scopes) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("API_TOKENS entry '{}' is missing '='", pair))?;
        let token = token.trim();
        if token.is_empty() {
            return Err(anyhow::anyhow!("API_TOKENS entry has an empty token"));
        }
        let scopes: Vec<String> = scopes
            .split('|')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        tokens.insert(token.to_string(), scopes);
    }
    Ok(tokens)
}

fn parse_archive_formats(raw: &str) -> Result<Vec<ArchiveFormat>, anyhow::Error> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<ArchiveFormat>())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_api_tokens() {
        let tokens = parse_api_tokens("abc=g1|g2; admin=*").unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens["abc"], vec!["g1".to_string(), "g2".to_string()]);
        assert_eq!(tokens["admin"], vec!["*".to_string()]);
        assert!(parse_api_tokens("").unwrap().is_empty());
        assert!(parse_api_tokens("missing-separator").is_err());
    }

    #[test]
    fn test_parse_archive_formats() {
        let formats = parse_archive_formats("zip, tar").unwrap();
        assert_eq!(formats, vec![ArchiveFormat::Zip, ArchiveFormat::Tar]);
        assert!(parse_archive_formats("zip,cpio").is_err());
    }

    #[test]
    fn test_validate_local_requires_secret() {
        let config = Config::default();
        assert!(config.validate().is_err());

        let config = Config {
            url_signing_secret: "dev-secret".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_production_rules() {
        let config = Config {
            environment: "production".to_string(),
            url_signing_secret: "dev-secret".to_string(),
            ..Config::default()
        };
        // wildcard CORS
        assert!(config.validate().is_err());

        let mut config = Config {
            cors_origins: vec!["https://app.example.com".to_string()],
            url_signing_secret: "s".repeat(32),
            ..config
        };
        assert!(config.validate().is_err(), "tokens are required in production");

        config.api_tokens = parse_api_tokens("t=*").unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_s3_requires_bucket() {
        let config = Config {
            storage_backend: StorageBackend::S3,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
