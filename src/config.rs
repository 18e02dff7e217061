use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Which origins the CORS layer lets through.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum CorsPolicy {
    AllowAll,
    AllowList(Vec<String>),
}

impl CorsPolicy {
    /// `None`, empty or `*` means allow-all, anything else is a comma-separated list.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") | Some("*") => CorsPolicy::AllowAll,
            Some(list) => CorsPolicy::AllowList(
                list.split(',')
                    .map(|o| o.trim().trim_end_matches('/').to_string())
                    .filter(|o| !o.is_empty())
                    .collect(),
            ),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

#[derive(Debug, Clone, Deserialize)]
pub enum StorageConfig {
    Local { dir: PathBuf },
    S3(S3Config),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// `None` runs against the in-memory stores.
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub cors: CorsPolicy,
    pub allow_admin_self_registration: bool,
    pub public_base_url: String,
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Defaults for everything except the signing secret.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            database_url: None,
            jwt: JwtConfig {
                secret: jwt_secret.into(),
                issuer: "sinfonia".into(),
                audience: "sinfonia-clients".into(),
                ttl_minutes: 60 * 24,
            },
            cors: CorsPolicy::AllowAll,
            allow_admin_self_registration: false,
            public_base_url: "http://localhost:8080".into(),
            storage: StorageConfig::Local {
                dir: PathBuf::from("uploads"),
            },
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        let mut cfg = Self::new(secret);

        if let Ok(host) = std::env::var("APP_HOST") {
            cfg.host = host;
        }
        if let Ok(port) = std::env::var("APP_PORT") {
            cfg.port = port.parse().context("APP_PORT must be a port number")?;
        }
        cfg.database_url = std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());

        if let Ok(issuer) = std::env::var("JWT_ISSUER") {
            cfg.jwt.issuer = issuer;
        }
        if let Ok(audience) = std::env::var("JWT_AUDIENCE") {
            cfg.jwt.audience = audience;
        }
        cfg.jwt.ttl_minutes = std::env::var("JWT_TTL_MINUTES")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(cfg.jwt.ttl_minutes);

        cfg.cors = CorsPolicy::parse(std::env::var("CORS_ORIGINS").ok().as_deref());
        cfg.allow_admin_self_registration = std::env::var("ALLOW_ADMIN_SELF_REGISTRATION")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        cfg.public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", cfg.port))
            .trim_end_matches('/')
            .to_string();

        cfg.storage = match std::env::var("STORAGE_BACKEND").as_deref() {
            Ok("s3") => StorageConfig::S3(S3Config {
                endpoint: std::env::var("S3_ENDPOINT").context("S3_ENDPOINT must be set")?,
                bucket: std::env::var("S3_BUCKET").context("S3_BUCKET must be set")?,
                access_key: std::env::var("S3_ACCESS_KEY").context("S3_ACCESS_KEY must be set")?,
                secret_key: std::env::var("S3_SECRET_KEY").context("S3_SECRET_KEY must be set")?,
                region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
            }),
            Ok("local") | Err(_) => StorageConfig::Local {
                dir: std::env::var("UPLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("uploads")),
            },
            Ok(other) => anyhow::bail!("unknown STORAGE_BACKEND {other:?} (expected local or s3)"),
        };

        Ok(cfg)
    }
}
