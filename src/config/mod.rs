//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

pub use cli::{CliArgs, Command, DatabaseOverride, ServeArgs, ServeOverrides, SetPasswordArgs};

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroU64},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "folio";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_SESSION_LIFETIME_SECS: u64 = 86_400;
const DEFAULT_SEARCH_MIN_RANK: f32 = 0.05;
const DEFAULT_STORAGE_BACKEND: &str = "memory";
const DEFAULT_STORAGE_LOCAL_PATH: &str = "storage";
const DEFAULT_STORAGE_REGION: &str = "us-east-1";
const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;
const DEFAULT_AUTH_MAX_ATTEMPTS: u64 = 10;
const DEFAULT_AUTH_WINDOW_SECS: u64 = 60;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub sessions: SessionSettings,
    pub search: SearchSettings,
    pub storage: StorageSettings,
    pub auth: AuthSettings,
    pub cover: CoverSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub lifetime: Duration,
}

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub min_rank: f32,
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub max_upload_bytes: NonZeroU64,
}

/// Where attachments live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Local {
        path: PathBuf,
    },
    /// S3 or any S3-compatible service such as MinIO.
    S3 {
        endpoint: String,
        access_key: String,
        secret_key: String,
        bucket: String,
        region: String,
    },
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub max_attempts: NonZeroU32,
    pub window_seconds: NonZeroU32,
}

#[derive(Debug, Clone, Default)]
pub struct CoverSettings {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("FOLIO").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::SetPassword(args)) => raw.apply_database_override(&args.database),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    sessions: RawSessionSettings,
    search: RawSearchSettings,
    storage: RawStorageSettings,
    auth: RawAuthSettings,
    cover: RawCoverSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.port {
            self.server.port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(backend) = overrides.storage_backend.as_ref() {
            self.storage.backend = Some(backend.clone());
        }
        if let Some(path) = overrides.storage_local_path.as_ref() {
            self.storage.local_path = Some(path.clone());
        }
        if let Some(limit) = overrides.max_upload_bytes {
            self.storage.max_upload_bytes = Some(limit);
        }
    }

    fn apply_database_override(&mut self, overrides: &DatabaseOverride) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            sessions,
            search,
            storage,
            auth,
            cover,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            sessions: build_session_settings(sessions)?,
            search: build_search_settings(search)?,
            storage: build_storage_settings(storage)?,
            auth: build_auth_settings(auth)?,
            cover: CoverSettings { path: cover.path },
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    Ok(ServerSettings { addr })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database.url.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_session_settings(sessions: RawSessionSettings) -> Result<SessionSettings, LoadError> {
    let seconds = sessions
        .lifetime_seconds
        .unwrap_or(DEFAULT_SESSION_LIFETIME_SECS);
    if seconds == 0 {
        return Err(LoadError::invalid(
            "sessions.lifetime_seconds",
            "must be greater than zero",
        ));
    }
    // Cookie Max-Age and timestamp arithmetic both want a signed 64-bit value.
    if i64::try_from(seconds).is_err() {
        return Err(LoadError::invalid(
            "sessions.lifetime_seconds",
            "value exceeds supported range",
        ));
    }

    Ok(SessionSettings {
        lifetime: Duration::from_secs(seconds),
    })
}

fn build_search_settings(search: RawSearchSettings) -> Result<SearchSettings, LoadError> {
    let min_rank = search.min_rank.unwrap_or(DEFAULT_SEARCH_MIN_RANK);
    if !(0.0..=1.0).contains(&min_rank) {
        return Err(LoadError::invalid(
            "search.min_rank",
            "must be between 0 and 1",
        ));
    }

    Ok(SearchSettings { min_rank })
}

fn build_storage_settings(storage: RawStorageSettings) -> Result<StorageSettings, LoadError> {
    let max_upload_bytes_value = storage
        .max_upload_bytes
        .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);
    let max_upload_bytes = NonZeroU64::new(max_upload_bytes_value).ok_or_else(|| {
        LoadError::invalid("storage.max_upload_bytes", "must be greater than zero")
    })?;
    usize::try_from(max_upload_bytes_value).map_err(|_| {
        LoadError::invalid(
            "storage.max_upload_bytes",
            "value exceeds supported range for usize",
        )
    })?;

    let backend_name = storage
        .backend
        .unwrap_or_else(|| DEFAULT_STORAGE_BACKEND.to_string());
    let backend = match backend_name.trim().to_ascii_lowercase().as_str() {
        "memory" => StorageBackend::Memory,
        "local" => {
            let path = storage
                .local_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_LOCAL_PATH));
            if path.as_os_str().is_empty() {
                return Err(LoadError::invalid(
                    "storage.local_path",
                    "path must not be empty",
                ));
            }
            StorageBackend::Local { path }
        }
        "s3" => StorageBackend::S3 {
            endpoint: required(storage.endpoint, "storage.endpoint")?,
            access_key: required(storage.access_key, "storage.access_key")?,
            secret_key: required(storage.secret_key, "storage.secret_key")?,
            bucket: required(storage.bucket, "storage.bucket")?,
            region: storage
                .region
                .unwrap_or_else(|| DEFAULT_STORAGE_REGION.to_string()),
        },
        other => {
            return Err(LoadError::invalid(
                "storage.backend",
                format!("unknown backend `{other}` (expected memory, local or s3)"),
            ));
        }
    };

    Ok(StorageSettings {
        backend,
        max_upload_bytes,
    })
}

fn build_auth_settings(auth: RawAuthSettings) -> Result<AuthSettings, LoadError> {
    let max_attempts = non_zero_u32(
        auth.max_attempts.unwrap_or(DEFAULT_AUTH_MAX_ATTEMPTS),
        "auth.max_attempts",
    )?;
    let window_seconds = non_zero_u32(
        auth.window_seconds.unwrap_or(DEFAULT_AUTH_WINDOW_SECS),
        "auth.window_seconds",
    )?;

    Ok(AuthSettings {
        max_attempts,
        window_seconds,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSessionSettings {
    lifetime_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSearchSettings {
    min_rank: Option<f32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStorageSettings {
    backend: Option<String>,
    local_path: Option<PathBuf>,
    endpoint: Option<String>,
    access_key: Option<String>,
    secret_key: Option<String>,
    bucket: Option<String>,
    region: Option<String>,
    max_upload_bytes: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAuthSettings {
    max_attempts: Option<u64>,
    window_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCoverSettings {
    path: Option<PathBuf>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn required(value: Option<String>, key: &'static str) -> Result<String, LoadError> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| LoadError::invalid(key, "required by the s3 backend"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
