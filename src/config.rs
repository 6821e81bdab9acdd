//! Configuration loading and constants.
//!
//! Settings come from the process environment, optionally seeded by a `.env` file.
//! Variable names are matched case-insensitively, so `MONGODB_USERNAME` and
//! `mongodb_username` populate the same field. `Settings` is built once at startup
//! and shared read-only for the lifetime of the process.

use std::collections::HashMap;
use std::ffi::OsString;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};

// =============================================================================
// Defaults
// =============================================================================

/// Service name reported by the health endpoint
pub const SERVICE_NAME: &str = "loopy-api";

/// Default `.env` file path
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Default log filter when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = "loopy_api=debug,tower_http=info";

pub const DEFAULT_MONGODB_DATABASE: &str = "myCGMitc";
pub const DEFAULT_API_HOST: &str = "0.0.0.0";
pub const DEFAULT_API_PORT: u16 = 8000;
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

/// Environment variable whose presence `/debug` reports. Read only, never written.
pub const MONGODB_URI_ENV: &str = "MONGODB_URI";

/// Collection holding CGM readings
pub const ENTRIES_COLLECTION: &str = "entries";

/// Upper bound for the whole `/debug` probe (connect, count, find)
pub const DEBUG_PROBE_TIMEOUT_SECS: u64 = 5;

/// Seconds to drain in-flight requests after SIGTERM/SIGINT
pub const SHUTDOWN_GRACE_SECS: u64 = 30;

/// Diagnostics are always fresh
pub const CACHE_CONTROL_NO_STORE: &str = "no-store";

/// Random bytes in a generated API key
const API_KEY_BYTES: usize = 32;

const USERNAME_PLACEHOLDER: &str = "{username}";
const PASSWORD_PLACEHOLDER: &str = "{password}";
const REDACTED: &str = "****";

/// Shorter passwords are only masked inside `user:password@` userinfo
const MIN_BARE_REDACT_LEN: usize = 6;

// Field keys, lowercase. Incoming variable names are lowercased before lookup.
const KEY_MONGODB_USERNAME: &str = "mongodb_username";
const KEY_MONGODB_PW: &str = "mongodb_pw";
const KEY_MONGODB_URI_TEMPLATE: &str = "mongodb_uri_template";
const KEY_MONGODB_DATABASE: &str = "mongodb_database";
const KEY_API_HOST: &str = "api_host";
const KEY_API_PORT: &str = "api_port";
const KEY_API_RELOAD: &str = "api_reload";
const KEY_API_KEY: &str = "api_key";
const KEY_CORS_ORIGINS: &str = "cors_origins";
const KEY_LOG_FORMAT: &str = "log_format";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Process-wide settings, immutable after load.
#[derive(Debug)]
pub struct Settings {
    pub mongodb_username: String,
    pub mongodb_pw: SecretString,
    /// Connection string with `{username}` and `{password}` placeholders left intact
    pub mongodb_uri_template: String,
    pub mongodb_database: String,
    pub api_host: String,
    pub api_port: u16,
    /// Accepted for compatibility; hot reload is not supported
    pub api_reload: bool,
    pub api_key: SecretString,
    /// Whether `api_key` came from configuration rather than being generated
    pub api_key_configured: bool,
    /// Comma-separated list of allowed origins
    pub cors_origins: String,
    pub log_format: LogFormat,
}

impl Settings {
    /// Load settings from an optional `.env` file overlaid by the process environment.
    ///
    /// A missing `.env` file is ignored. Process environment values win over file values.
    pub fn load(env_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut vars: Vec<(String, String)> = Vec::new();

        if let Some(path) = env_file {
            match dotenvy::from_path_iter(path) {
                Ok(iter) => {
                    for item in iter {
                        vars.push(item?);
                    }
                }
                // The file is optional
                Err(dotenvy::Error::Io(e)) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        vars.extend(utf8_vars(std::env::vars_os()));
        Self::from_vars(vars)
    }

    /// Build settings from key/value pairs. Later pairs override earlier ones.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut values: HashMap<String, String> = HashMap::new();
        for (key, value) in vars {
            values.insert(key.as_ref().to_ascii_lowercase(), value.into());
        }

        let missing: Vec<String> = [KEY_MONGODB_USERNAME, KEY_MONGODB_PW, KEY_MONGODB_URI_TEMPLATE]
            .into_iter()
            .filter(|key| !values.contains_key(*key))
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let mut take = |key: &str| values.remove(key);

        let mongodb_username = take(KEY_MONGODB_USERNAME).unwrap_or_default();
        let mongodb_pw = SecretString::from(take(KEY_MONGODB_PW).unwrap_or_default());
        let mongodb_uri_template = take(KEY_MONGODB_URI_TEMPLATE).unwrap_or_default();
        let mongodb_database =
            take(KEY_MONGODB_DATABASE).unwrap_or_else(|| DEFAULT_MONGODB_DATABASE.to_string());
        let api_host = take(KEY_API_HOST).unwrap_or_else(|| DEFAULT_API_HOST.to_string());

        let api_port = match take(KEY_API_PORT) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                key: KEY_API_PORT,
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => DEFAULT_API_PORT,
        };

        let api_reload = match take(KEY_API_RELOAD) {
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::Invalid {
                key: KEY_API_RELOAD,
                value: raw.clone(),
                reason: "expected a boolean".to_string(),
            })?,
            None => false,
        };

        let (api_key, api_key_configured) = match take(KEY_API_KEY).filter(|k| !k.is_empty()) {
            Some(key) => (SecretString::from(key), true),
            None => (SecretString::from(generate_api_key()), false),
        };

        let cors_origins =
            take(KEY_CORS_ORIGINS).unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string());

        let log_format = match take(KEY_LOG_FORMAT) {
            Some(raw) => {
                let normalized = raw.trim().to_ascii_lowercase();
                match normalized.as_str() {
                    "text" => LogFormat::Text,
                    "json" => LogFormat::Json,
                    _ => {
                        return Err(ConfigError::Invalid {
                            key: KEY_LOG_FORMAT,
                            value: raw,
                            reason: "expected \"text\" or \"json\"".to_string(),
                        })
                    }
                }
            }
            None => LogFormat::default(),
        };

        Ok(Self {
            mongodb_username,
            mongodb_pw,
            mongodb_uri_template,
            mongodb_database,
            api_host,
            api_port,
            api_reload,
            api_key,
            api_key_configured,
            cors_origins,
            log_format,
        })
    }

    /// Resolved connection string. Recomputed on every call; never log or return it.
    pub fn mongodb_uri(&self) -> String {
        self.mongodb_uri_template
            .replace(USERNAME_PLACEHOLDER, &self.mongodb_username)
            .replace(PASSWORD_PLACEHOLDER, self.mongodb_pw.expose_secret())
    }

    /// Allowed CORS origins, trimmed, empty entries dropped.
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Socket address to listen on.
    ///
    /// `api_host` may be an IPv4/IPv6 literal (optionally bracketed) or a hostname,
    /// which is resolved and the first address used.
    pub async fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let host = self.api_host.trim();
        let literal = host.strip_prefix('[').and_then(|h| h.strip_suffix(']')).unwrap_or(host);
        if let Ok(ip) = literal.parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, self.api_port));
        }

        let invalid = |reason: String| ConfigError::Invalid {
            key: KEY_API_HOST,
            value: self.api_host.clone(),
            reason,
        };
        let mut addrs = tokio::net::lookup_host((host, self.api_port))
            .await
            .map_err(|e| invalid(e.to_string()))?;
        addrs
            .next()
            .ok_or_else(|| invalid("host resolved to no addresses".to_string()))
    }

    /// Strip credentials from text that is about to leave the process.
    ///
    /// The resolved URI is replaced by its template and resolved `user:password@`
    /// userinfo is masked. A bare password is masked only when it is at least
    /// `MIN_BARE_REDACT_LEN` long, so short passwords do not mangle ordinary words.
    pub fn redact(&self, text: &str) -> String {
        let mut out = text.to_string();
        let uri = self.mongodb_uri();
        if !uri.is_empty() && uri != self.mongodb_uri_template {
            out = out.replace(&uri, &self.mongodb_uri_template);
        }
        let password = self.mongodb_pw.expose_secret();
        if password.is_empty() {
            return out;
        }
        let userinfo = format!("{}:{}@", self.mongodb_username, password);
        out = out.replace(&userinfo, &format!("{}:{}@", self.mongodb_username, REDACTED));
        if password.chars().count() >= MIN_BARE_REDACT_LEN {
            out = out.replace(password, REDACTED);
        }
        out
    }
}

/// Keep only variables whose name and value are valid UTF-8.
fn utf8_vars<I>(vars: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}

/// Fresh URL-safe token from 32 random bytes.
fn generate_api_key() -> String {
    let mut bytes = [0u8; API_KEY_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required settings: {}", .0.join(", "))]
    Missing(Vec<String>),
    #[error("Invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("Failed to read .env file: {0}")]
    EnvFile(#[from] dotenvy::Error),
}
