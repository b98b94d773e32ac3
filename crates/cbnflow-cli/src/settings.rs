//! Command line and environment handling.

use std::path::{Path, PathBuf};

use cbnflow::{RunConfig, RunMode, ServiceConfig};

use crate::error::{ConfigError, Result};

pub const USAGE: &str = "Usage: cbnflow <datastage|stored_procedure|cpp|documentation>";

/// Everything the engine needs, resolved from argv and the environment.
#[derive(Clone)]
pub struct Settings {
    pub service: ServiceConfig,
    pub password: String,
    pub run: RunConfig,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("service", &self.service)
            .field("run", &self.run)
            .finish_non_exhaustive()
    }
}

/// Parse argv (including argv[0]) into the run mode.
pub fn parse_args(args: &[String]) -> Result<RunMode> {
    match args {
        [_, mode] if mode == "--help" || mode == "-h" => Err(ConfigError::Usage(String::new())),
        [_, mode] => mode
            .parse()
            .map_err(|e: cbnflow::UnknownMode| ConfigError::Usage(e.to_string())),
        [_] | [] => Err(ConfigError::Usage("missing required argument: <mode>".to_string())),
        [_, _, extra, ..] => Err(ConfigError::Usage(format!("unexpected argument: {extra}"))),
    }
}

fn required(env: &impl Fn(&str) -> Option<String>, var: &'static str) -> Result<String> {
    env(var)
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingEnv(var))
}

fn optional(env: &impl Fn(&str) -> Option<String>, var: &'static str) -> Option<String> {
    env(var).filter(|v| !v.trim().is_empty())
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnv {
            var,
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}

/// Resolve settings for `mode` from an environment lookup.
///
/// The password is checked first so a missing credential fails fast.
pub fn load(mode: RunMode, env: impl Fn(&str) -> Option<String>) -> Result<Settings> {
    let password = required(&env, "CBN_PASSWORD")?;

    let service = ServiceConfig {
        base_url: required(&env, "CBN_URL_BASE")?,
        auth_url: required(&env, "CBN_AUTH_URL")?,
        username: required(&env, "CBN_USERNAME")?,
        client_id: required(&env, "CBN_CLIENT_ID")?,
        project: required(&env, "CBN_PROJECT")?,
        namespace: optional(&env, "CBN_NAMESPACE"),
    };

    let input_root = optional(&env, "CBN_INPUT_DIR").unwrap_or_else(|| "input".to_string());
    let output_root = optional(&env, "CBN_OUTPUT_DIR").unwrap_or_else(|| "output".to_string());
    let resolve_blobs = match optional(&env, "CBN_RESOLVE_BLOBS") {
        Some(v) => parse_bool("CBN_RESOLVE_BLOBS", &v)?,
        None => true,
    };

    let run = RunConfig::new(
        mode,
        PathBuf::from(input_root).join(mode.as_str()),
        PathBuf::from(output_root).join(mode.as_str()),
    )
    .with_resolve_blobs(resolve_blobs);

    Ok(Settings {
        service,
        password,
        run,
    })
}

/// Require a non-empty input directory and create the output directory.
pub fn prepare_dirs(input: &Path, output: &Path) -> Result<()> {
    let has_entries = std::fs::read_dir(input)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false);
    if !has_entries {
        return Err(ConfigError::NoInput(input.display().to_string()));
    }

    std::fs::create_dir_all(output).map_err(|source| ConfigError::OutputDir {
        path: output.display().to_string(),
        source,
    })
}
