// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};
use crate::types::LocaleId;

/// Persistent bridge settings, read from a JSON file.
///
/// Missing keys fall back to their defaults, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Locale used when resolving member names to dispatch ids.
    pub locale_id: u32,
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Emit a `debug` event for every native round-trip.
    pub trace_native_calls: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            locale_id: LocaleId::USER_DEFAULT.0,
            log_filter: "info".into(),
            trace_native_calls: false,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: BridgeConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn locale(&self) -> LocaleId {
        LocaleId(self.locale_id)
    }

    fn validate(&self) -> Result<()> {
        // LCID bits 20..32 are reserved.
        if self.locale_id > 0x000F_FFFF {
            return Err(BridgeError::Config(format!(
                "locale id {:#x} is out of range",
                self.locale_id
            )));
        }
        if self.log_filter.trim().is_empty() {
            return Err(BridgeError::Config("log_filter must not be empty".into()));
        }
        Ok(())
    }
}
