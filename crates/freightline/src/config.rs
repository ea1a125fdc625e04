//! CLI configuration: thin wrapper around `freightline_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides (--api-url,
//! --token, etc.) on top of the shared profile handling.

use std::time::Duration;

use secrecy::SecretString;

use freightline_core::{Session, SyncConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use freightline_config::{Config, config_path, load_config_or_default};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build the sync configuration and signed-in session for this invocation.
///
/// CLI flag overrides take priority over profile values. Without a
/// profile, `--api-url` and `--token` alone are enough.
pub fn resolve(global: &GlobalOpts) -> Result<(SyncConfig, Session), CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    if let Some(profile) = cfg.profiles.get(&profile_name) {
        let mut sync = freightline_config::profile_to_sync_config(profile, &cfg.defaults)?;
        apply_overrides(&mut sync, global)?;

        let token = match global.token {
            Some(ref token) => SecretString::from(token.clone()),
            None => freightline_config::resolve_token(profile, &profile_name)?,
        };
        let user = global
            .user
            .as_deref()
            .or(profile.user.as_deref())
            .unwrap_or(&profile_name);
        return Ok((sync, Session::new(user, token)));
    }

    // An explicitly requested profile must exist.
    if global.profile.is_some() {
        let mut names: Vec<_> = cfg.profiles.keys().cloned().collect();
        names.sort();
        return Err(CliError::ProfileNotFound {
            name: profile_name,
            available: if names.is_empty() {
                "(none)".into()
            } else {
                names.join(", ")
            },
            path: config_path().display().to_string(),
        });
    }

    // No profile -- build from flags / env vars alone
    let url_str = global.api_url.as_deref().ok_or_else(|| CliError::NoConfig {
        path: config_path().display().to_string(),
    })?;
    let mut sync = SyncConfig::new(parse_api_url(url_str)?);
    sync.timeout = Duration::from_secs(cfg.defaults.timeout);
    apply_overrides(&mut sync, global)?;

    let token = global
        .token
        .clone()
        .map(SecretString::from)
        .ok_or(CliError::NoToken {
            profile: profile_name.clone(),
        })?;
    let user = global.user.clone().unwrap_or(profile_name);
    Ok((sync, Session::new(user, token)))
}

fn apply_overrides(sync: &mut SyncConfig, global: &GlobalOpts) -> Result<(), CliError> {
    if let Some(ref url) = global.api_url {
        sync.api_url = parse_api_url(url)?;
    }
    if global.insecure {
        sync.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        sync.timeout = Duration::from_secs(secs);
    }
    Ok(())
}

fn parse_api_url(raw: &str) -> Result<url::Url, CliError> {
    raw.parse().map_err(|_| CliError::Validation {
        field: "api_url".into(),
        reason: format!("invalid URL: {raw}"),
    })
}
