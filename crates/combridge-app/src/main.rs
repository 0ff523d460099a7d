// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// combridge: late-bound automation from the command line
//
// Entry point. Loads configuration, initialises logging, activates the
// script's component on the default runtime and prints each step's result.

mod script;

use std::path::PathBuf;
use std::process::ExitCode;

use combridge_core::config::BridgeConfig;
use tracing_subscriber::EnvFilter;

use script::Script;

const CONFIG_ENV: &str = "COMBRIDGE_CONFIG";

fn main() -> ExitCode {
    let config_path = config_path(|key| std::env::var(key).ok());
    let loaded = BridgeConfig::load_or_default(&config_path);
    let filter = loaded
        .as_ref()
        .map(|c| c.log_filter.clone())
        .unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(path = %config_path.display(), error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let Some(script_path) = std::env::args_os().nth(1) else {
        eprintln!("usage: combridge <script.json>");
        return ExitCode::from(2);
    };

    let script = match Script::load(&script_path) {
        Ok(script) => script,
        Err(e) => {
            tracing::error!(path = ?script_path, error = %e, "cannot read script");
            return ExitCode::FAILURE;
        }
    };

    let runtime = combridge_native::default_runtime();
    tracing::info!(runtime = runtime.runtime_name(), "combridge starting");

    match script.run(runtime, &config) {
        Ok(outcomes) => {
            for outcome in outcomes {
                println!("{outcome}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "script failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Config file location: `$COMBRIDGE_CONFIG`, then the XDG config dir, then
/// `~/.config`, then the working directory.
fn config_path(env: impl Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(explicit) = env(CONFIG_ENV) {
        return PathBuf::from(explicit);
    }
    let base = env("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env("HOME").map(|home| PathBuf::from(home).join(".config")));
    match base {
        Some(dir) => dir.join("combridge").join("config.json"),
        None => PathBuf::from("combridge.json"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn explicit_config_wins() {
        let path = config_path(lookup(&[(CONFIG_ENV, "/etc/combridge.json"), ("HOME", "/home/a")]));
        assert_eq!(path, PathBuf::from("/etc/combridge.json"));
    }

    #[test]
    fn falls_back_through_config_dirs() {
        assert_eq!(
            config_path(lookup(&[("XDG_CONFIG_HOME", "/xdg"), ("HOME", "/home/a")])),
            PathBuf::from("/xdg/combridge/config.json")
        );
        assert_eq!(
            config_path(lookup(&[("HOME", "/home/a")])),
            PathBuf::from("/home/a/.config/combridge/config.json")
        );
        assert_eq!(config_path(lookup(&[])), PathBuf::from("combridge.json"));
    }
}
