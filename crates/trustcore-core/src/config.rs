// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Trustcore Project Contributors

//! Engine-level configuration.
//!
//! [`Config`] is the single entry point for tuning [`crate::engine::GovernanceCore`]
//! at construction time. All fields have sensible defaults so that
//! `Config::default()` is always a valid starting point.

use serde::{Deserialize, Serialize};

use crate::policy::PolicyPreset;

/// Top-level configuration for [`crate::engine::GovernanceCore`].
///
/// # Examples
///
/// ```rust
/// use trustcore_core::config::Config;
/// use trustcore_core::policy::PolicyPreset;
///
/// let config = Config {
///     default_policy_preset: PolicyPreset::Strict,
///     ..Config::default()
/// };
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Config {
    /// Preset newly opened sessions adopt when no explicit policy entity id
    /// is supplied to `open_session`.
    pub default_policy_preset: PolicyPreset,
    /// When `true`, an entity with no stored trust record is treated as a
    /// neutral (`0.5`) observer rather than surfacing a missing-record
    /// error from callers that expect a tensor unconditionally.
    pub default_observer_trust: bool,
    /// Soft action budget newly opened sessions adopt when the caller does
    /// not specify one explicitly.
    pub session_action_budget: Option<u64>,
    /// Sliding-window width, in milliseconds, used by
    /// [`crate::engine::GovernanceCore::dispatch`]'s built-in rate limiting.
    pub rate_limit_window_ms: u64,
    /// Maximum actions permitted per rate-limit key per window.
    pub rate_limit_max_count: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_policy_preset: PolicyPreset::Safety,
            default_observer_trust: true,
            session_action_budget: None,
            rate_limit_window_ms: 60_000,
            rate_limit_max_count: 120,
        }
    }
}
