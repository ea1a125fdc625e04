//! Config subcommand handlers.

use std::fmt::Write as _;
use std::io::BufRead;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking tokens.
fn format_config_redacted(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "insecure = {}", cfg.defaults.insecure);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(out, "refresh_interval = {}", cfg.defaults.refresh_interval);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let p = &cfg.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "api_url = \"{}\"", p.api_url);
        if let Some(ref ws) = p.ws_url {
            let _ = writeln!(out, "ws_url = \"{ws}\"");
        }
        if let Some(ref user) = p.user {
            let _ = writeln!(out, "user = \"{user}\"");
        }
        if p.token.is_some() {
            let _ = writeln!(out, "token = \"****\"");
        }
        if let Some(ref env) = p.token_env {
            let _ = writeln!(out, "token_env = \"{env}\"");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(interval) = p.refresh_interval {
            let _ = writeln!(out, "refresh_interval = {interval}");
        }
        if p.reconnect {
            let _ = writeln!(out, "reconnect = true");
        }
        if let Some(max) = p.max_retries {
            let _ = writeln!(out, "max_retries = {max}");
        }
    }

    out
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            output::print_output(format_config_redacted(&cfg).trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::SetToken => {
            let cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);

            let mut token = String::new();
            std::io::stdin().lock().read_line(&mut token)?;
            let token = token.trim();
            if token.is_empty() {
                return Err(CliError::Validation {
                    field: "token".into(),
                    reason: "token cannot be empty".into(),
                });
            }

            freightline_config::store_token(&profile_name, token)?;
            if !global.quiet {
                eprintln!("Token stored in system keyring for profile '{profile_name}'");
            }
            Ok(())
        }
    }
}
