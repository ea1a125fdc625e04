//! Shared configuration for Freightline tools.
//!
//! TOML profiles, token resolution (env + keyring + plaintext), and
//! translation to `freightline_core::SyncConfig` and `Session`. The CLI
//! layers its `GlobalOpts` overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use freightline_core::{ReconnectConfig, Session, SyncConfig, TlsVerification};

/// Keyring service name for stored session tokens.
const KEYRING_SERVICE: &str = "freightline";

/// Fallback env var for the session token when a profile names none.
const TOKEN_ENV: &str = "FREIGHTLINE_TOKEN";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no session token configured for profile '{profile}'")]
    NoToken { profile: String },

    #[error("profile '{name}' not found in config")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up a profile, falling back to `default_profile` when `name` is `None`.
    pub fn profile(&self, name: Option<&str>) -> Result<(&str, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");

        self.profiles
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Seconds between snapshot refreshes while watching. 0 = never.
    #[serde(default)]
    pub refresh_interval: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
            refresh_interval: 0,
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named backend profile.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// REST API root (e.g., "https://api.freightline.example/v1").
    pub api_url: String,

    /// Push WebSocket URL. Derived from `api_url` when unset.
    pub ws_url: Option<String>,

    /// User id the token belongs to. Defaults to the profile name.
    pub user: Option<String>,

    /// Session token (plaintext -- prefer keyring or env var).
    pub token: Option<String>,

    /// Environment variable name containing the session token.
    pub token_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout.
    pub timeout: Option<u64>,

    /// Override refresh interval.
    pub refresh_interval: Option<u64>,

    /// Reconnect dropped push connections with exponential backoff.
    #[serde(default)]
    pub reconnect: bool,

    /// Give up after this many consecutive reconnect attempts.
    pub max_retries: Option<u32>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "freightline", "freightline").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("freightline");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from `path` + environment.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("FREIGHTLINE_").split("_"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(&config_path(), cfg)
}

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Token resolution ────────────────────────────────────────────────

/// Resolve the session token: env var, then system keyring, then plaintext.
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    resolve_token_from(
        profile,
        profile_name,
        |name| std::env::var(name).ok(),
        |account| {
            keyring::Entry::new(KEYRING_SERVICE, account)
                .and_then(|entry| entry.get_password())
                .ok()
        },
    )
}

fn resolve_token_from(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    // 1. Profile's token_env (or the global fallback) → env var lookup
    let env_name = profile.token_env.as_deref().unwrap_or(TOKEN_ENV);
    if let Some(val) = env(env_name) {
        debug!(env = env_name, "session token from environment");
        return Ok(SecretString::from(val));
    }

    // 2. System keyring
    if let Some(secret) = keyring(&keyring_account(profile_name)) {
        debug!(profile = profile_name, "session token from keyring");
        return Ok(SecretString::from(secret));
    }

    // 3. Plaintext in config
    if let Some(ref token) = profile.token {
        return Ok(SecretString::from(token.clone()));
    }

    Err(ConfigError::NoToken {
        profile: profile_name.into(),
    })
}

/// Store a session token in the system keyring for `profile_name`.
pub fn store_token(profile_name: &str, token: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &keyring_account(profile_name))?;
    entry.set_password(token)?;
    Ok(())
}

fn keyring_account(profile_name: &str) -> String {
    format!("{profile_name}/token")
}

// ── Translation into core types ─────────────────────────────────────

/// Build a `SyncConfig` from a profile, falling back to global defaults.
pub fn profile_to_sync_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<SyncConfig, ConfigError> {
    let api_url = parse_url("api_url", &profile.api_url)?;
    let ws_url = profile
        .ws_url
        .as_deref()
        .map(|raw| parse_url("ws_url", raw))
        .transpose()?;

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let reconnect = profile.reconnect.then(|| ReconnectConfig {
        max_retries: profile.max_retries,
        ..ReconnectConfig::default()
    });

    Ok(SyncConfig {
        api_url,
        ws_url,
        tls,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
        refresh_interval_secs: profile.refresh_interval.unwrap_or(defaults.refresh_interval),
        reconnect,
        push_enabled: true,
    })
}

/// Build the signed-in `Session` for a profile.
pub fn profile_session(profile: &Profile, profile_name: &str) -> Result<Session, ConfigError> {
    let token = resolve_token(profile, profile_name)?;
    let user = profile.user.as_deref().unwrap_or(profile_name);
    Ok(Session::new(user, token))
}

fn parse_url(field: &str, raw: &str) -> Result<url::Url, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {raw}"),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    fn profile(api_url: &str) -> Profile {
        Profile {
            api_url: api_url.into(),
            ..Profile::default()
        }
    }

    #[test]
    fn save_then_load_round_trips_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        let mut p = profile("https://api.freightline.example/v1");
        p.user = Some("carrier-17".into());
        p.reconnect = true;
        cfg.profiles.insert("default".into(), p);
        save_config_to(&path, &cfg).unwrap();

        let loaded = load_config_from(&path).unwrap();
        let (name, p) = loaded.profile(None).unwrap();
        assert_eq!(name, "default");
        assert_eq!(p.api_url, "https://api.freightline.example/v1");
        assert_eq!(p.user.as_deref(), Some("carrier-17"));
        assert!(p.reconnect);
        assert_eq!(loaded.defaults.timeout, 30);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn unknown_profile_is_an_error() {
        let cfg = Config::default();
        let err = cfg.profile(Some("staging")).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProfile { name } if name == "staging"));
    }

    #[test]
    fn env_token_beats_keyring_and_plaintext() {
        let mut p = profile("https://api.example.com");
        p.token_env = Some("MY_TOKEN".into());
        p.token = Some("plain".into());

        let token = resolve_token_from(
            &p,
            "default",
            |name| (name == "MY_TOKEN").then(|| "from-env".to_string()),
            |_| Some("from-keyring".into()),
        )
        .unwrap();
        assert_eq!(token.expose_secret(), "from-env");
    }

    #[test]
    fn keyring_beats_plaintext() {
        let mut p = profile("https://api.example.com");
        p.token = Some("plain".into());

        let token = resolve_token_from(
            &p,
            "prod",
            |_| None,
            |account| (account == "prod/token").then(|| "from-keyring".to_string()),
        )
        .unwrap();
        assert_eq!(token.expose_secret(), "from-keyring");
    }

    #[test]
    fn plaintext_is_last_resort() {
        let mut p = profile("https://api.example.com");
        p.token = Some("plain".into());
        let token = resolve_token_from(&p, "default", |_| None, |_| None).unwrap();
        assert_eq!(token.expose_secret(), "plain");

        p.token = None;
        let err = resolve_token_from(&p, "default", |_| None, |_| None).unwrap_err();
        assert!(matches!(err, ConfigError::NoToken { .. }));
    }

    #[test]
    fn sync_config_from_profile() {
        let mut p = profile("https://api.freightline.example/v1");
        p.ca_cert = Some(PathBuf::from("/etc/ssl/freightline.pem"));
        p.refresh_interval = Some(60);
        p.reconnect = true;
        p.max_retries = Some(3);

        let config = profile_to_sync_config(&p, &Defaults::default()).unwrap();
        assert_eq!(config.api_url.as_str(), "https://api.freightline.example/v1");
        assert_eq!(
            config.tls,
            TlsVerification::CustomCa(PathBuf::from("/etc/ssl/freightline.pem"))
        );
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.refresh_interval_secs, 60);
        assert_eq!(config.reconnect.unwrap().max_retries, Some(3));
    }

    #[test]
    fn sync_config_without_reconnect_never_retries() {
        let config = profile_to_sync_config(&profile("http://localhost:8080"), &Defaults::default())
            .unwrap();
        assert!(config.reconnect.is_none());
        assert_eq!(config.tls, TlsVerification::SystemDefaults);
    }

    #[test]
    fn invalid_api_url_is_validation_error() {
        let err = profile_to_sync_config(&profile("not a url"), &Defaults::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { field, .. } if field == "api_url"));
    }
}
