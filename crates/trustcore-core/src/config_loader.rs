// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Trustcore Project Contributors

//! Configuration loader for [`crate::engine::GovernanceCore`].
//!
//! Supports two load strategies:
//!
//! 1. **TOML file** — [`load_config`] reads and deserialises a TOML file into
//!    a [`GovernanceConfig`] struct.
//! 2. **Environment variables** — [`load_config_from_env`] reads `WEB4_`-prefixed
//!    environment variables and constructs a [`GovernanceConfig`].
//!
//! Both loaders are only available when the `std` feature is active
//! (the default).
//!
//! # File format
//!
//! ```toml
//! storage_root            = "/var/lib/trustcore"
//! backend                 = "native"     # "native" | "fallback"
//! default_policy_preset   = "safety"     # "permissive" | "safety" | "strict" | "audit-only"
//! session_action_budget   = 500
//! rate_limit_window_ms    = 60000
//! rate_limit_max_count    = 120
//! ```
//!
//! # Environment variables
//!
//! | Variable                        | Type    | Default   |
//! |----------------------------------|---------|-----------|
//! | `WEB4_ROOT`                      | path    | `~/.web4/`|
//! | `WEB4_BACKEND`                   | string  | "native"  |
//! | `WEB4_DEFAULT_POLICY_PRESET`     | string  | "safety"  |
//! | `WEB4_SESSION_BUDGET`            | integer | unset     |
//! | `WEB4_RATE_LIMIT_WINDOW_MS`      | integer | 60000     |
//! | `WEB4_RATE_LIMIT_MAX_COUNT`      | integer | 120       |

// Only compile this module when the "config-loader" feature is enabled.
// "config-loader" implies "std", so std facilities are always available here.
#![cfg(feature = "config-loader")]

use std::fmt;
use std::fs;
use std::num::ParseIntError;

use serde::{Deserialize, Serialize};

use crate::policy::PolicyPreset;

// ---------------------------------------------------------------------------
// GovernanceConfig
// ---------------------------------------------------------------------------

/// Storage backend selector. `Fallback` is a pure-language, non-optimized
/// implementation kept for testing; unknown values fail fast rather than
/// silently choosing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// The optimized, platform-native implementation.
    #[default]
    Native,
    /// Pure-language fallback, used for testing.
    Fallback,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Native => write!(f, "native"),
            Backend::Fallback => write!(f, "fallback"),
        }
    }
}

impl Backend {
    fn from_str_case_insensitive(s: &str) -> Result<Self, ConfigError> {
        match s.to_ascii_lowercase().as_str() {
            "native" => Ok(Backend::Native),
            "fallback" => Ok(Backend::Fallback),
            other => Err(ConfigError::ParseField {
                field: "WEB4_BACKEND".into(),
                value: other.into(),
                reason: "expected one of: native, fallback".into(),
            }),
        }
    }
}

fn preset_from_str(s: &str) -> Result<PolicyPreset, ConfigError> {
    match s.to_ascii_lowercase().as_str() {
        "permissive" => Ok(PolicyPreset::Permissive),
        "safety" => Ok(PolicyPreset::Safety),
        "strict" => Ok(PolicyPreset::Strict),
        "audit-only" | "audit_only" => Ok(PolicyPreset::AuditOnly),
        other => Err(ConfigError::ParseField {
            field: "default_policy_preset".into(),
            value: other.into(),
            reason: "expected one of: permissive, safety, strict, audit-only".into(),
        }),
    }
}

/// Flat configuration struct for [`crate::engine::GovernanceCore`] construction.
///
/// Distinct from the engine-internal [`crate::config::Config`] to provide a
/// stable, serialisation-friendly representation loadable from TOML files or
/// environment variables without coupling to the engine's internal
/// representation. Use [`GovernanceConfig::into_config`] to convert after
/// loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceConfig {
    /// Storage root directory, overriding the default `~/.web4/`.
    #[serde(default = "default_storage_root")]
    pub storage_root: String,
    /// Storage backend selector.
    #[serde(default)]
    pub backend: Backend,
    /// Preset newly opened sessions adopt absent an explicit policy entity.
    #[serde(default = "default_policy_preset")]
    pub default_policy_preset: PolicyPreset,
    /// Soft per-session action budget. `None` means unbounded.
    #[serde(default)]
    pub session_action_budget: Option<u64>,
    /// Sliding rate-limit window, in milliseconds.
    #[serde(default = "default_rate_limit_window_ms")]
    pub rate_limit_window_ms: u64,
    /// Maximum actions permitted per rate-limit key per window.
    #[serde(default = "default_rate_limit_max_count")]
    pub rate_limit_max_count: u32,
}

fn default_storage_root() -> String {
    "~/.web4/".to_string()
}
fn default_policy_preset() -> PolicyPreset {
    PolicyPreset::Safety
}
fn default_rate_limit_window_ms() -> u64 {
    60_000
}
fn default_rate_limit_max_count() -> u32 {
    120
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            storage_root: default_storage_root(),
            backend: Backend::default(),
            default_policy_preset: default_policy_preset(),
            session_action_budget: None,
            rate_limit_window_ms: default_rate_limit_window_ms(),
            rate_limit_max_count: default_rate_limit_max_count(),
        }
    }
}

impl GovernanceConfig {
    /// Project this flat, loadable representation onto the engine-internal
    /// [`crate::config::Config`].
    pub fn into_config(self) -> crate::config::Config {
        crate::config::Config {
            default_policy_preset: self.default_policy_preset,
            default_observer_trust: true,
            session_action_budget: self.session_action_budget,
            rate_limit_window_ms: self.rate_limit_window_ms,
            rate_limit_max_count: self.rate_limit_max_count,
        }
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors that can occur while loading or parsing governance configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// A required file could not be opened.
    FileRead { path: String, source: std::io::Error },
    /// The TOML content could not be deserialised.
    TomlParse { source: toml::de::Error },
    /// A field could not be parsed to its expected type.
    ParseField { field: String, value: String, reason: String },
    /// A field value is outside the permitted range.
    InvalidRange { field: String, value: String, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileRead { path, source } => write!(f, "failed to read config file \"{path}\": {source}"),
            ConfigError::TomlParse { source } => write!(f, "failed to parse TOML config: {source}"),
            ConfigError::ParseField { field, value, reason } => {
                write!(f, "field \"{field}\": cannot parse \"{value}\" — {reason}")
            }
            ConfigError::InvalidRange { field, value, reason } => {
                write!(f, "field \"{field}\": value \"{value}\" out of range — {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::FileRead { source, .. } => Some(source),
            ConfigError::TomlParse { source } => Some(source),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// TOML loader
// ---------------------------------------------------------------------------

/// Load a [`GovernanceConfig`] from a TOML file.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read or if the TOML
/// content does not match the expected schema.
pub fn load_config(path: &str) -> Result<GovernanceConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::FileRead { path: path.to_owned(), source })?;
    toml::from_str::<GovernanceConfig>(&content).map_err(|source| ConfigError::TomlParse { source })
}

// ---------------------------------------------------------------------------
// Environment variable loader
// ---------------------------------------------------------------------------

/// Load a [`GovernanceConfig`] from `WEB4_`-prefixed environment variables.
///
/// Unset variables fall back to their defaults. An unrecognized
/// `WEB4_BACKEND` value fails fast rather than silently picking a backend.
pub fn load_config_from_env() -> Result<GovernanceConfig, ConfigError> {
    let storage_root = std::env::var("WEB4_ROOT").unwrap_or_else(|_| default_storage_root());

    let backend = match std::env::var("WEB4_BACKEND") {
        Ok(val) => Backend::from_str_case_insensitive(&val)?,
        Err(_) => Backend::default(),
    };

    let default_policy_preset = match std::env::var("WEB4_DEFAULT_POLICY_PRESET") {
        Ok(val) => preset_from_str(&val)?,
        Err(_) => default_policy_preset(),
    };

    let session_action_budget = match std::env::var("WEB4_SESSION_BUDGET") {
        Ok(val) => Some(read_u64("WEB4_SESSION_BUDGET", &val)?),
        Err(_) => None,
    };

    let rate_limit_window_ms = match std::env::var("WEB4_RATE_LIMIT_WINDOW_MS") {
        Ok(val) => read_u64("WEB4_RATE_LIMIT_WINDOW_MS", &val)?,
        Err(_) => default_rate_limit_window_ms(),
    };

    let rate_limit_max_count = match std::env::var("WEB4_RATE_LIMIT_MAX_COUNT") {
        Ok(val) => read_u32("WEB4_RATE_LIMIT_MAX_COUNT", &val)?,
        Err(_) => default_rate_limit_max_count(),
    };

    Ok(GovernanceConfig {
        storage_root,
        backend,
        default_policy_preset,
        session_action_budget,
        rate_limit_window_ms,
        rate_limit_max_count,
    })
}

fn read_u64(key: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse::<u64>().map_err(|source: ParseIntError| ConfigError::ParseField {
        field: key.to_owned(),
        value: raw.to_owned(),
        reason: source.to_string(),
    })
}

fn read_u32(key: &str, raw: &str) -> Result<u32, ConfigError> {
    raw.trim().parse::<u32>().map_err(|source: ParseIntError| ConfigError::ParseField {
        field: key.to_owned(),
        value: raw.to_owned(),
        reason: source.to_string(),
    })
}
