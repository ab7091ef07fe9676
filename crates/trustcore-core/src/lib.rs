// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Trustcore Project Contributors

//! # trustcore-core
//!
//! Trust-native agent governance core: a per-session, append-only,
//! hash-linked audit and policy-enforcement substrate mediating every
//! externally visible action an autonomous agent attempts.
//!
//! This crate is `no_std`-compatible (requires `alloc`). Enable the `std`
//! feature (on by default) to lift that restriction and gain access to
//! rate limiting, async, and config-loading facilities.
//!
//! ## Architecture
//!
//! ```text
//! GovernanceCore<S: Storage>
//!   ├── IdentityStore<S>    — mint / verify / revoke / delegate LCTs
//!   ├── TrustEngine<S>      — T3/V3 tensor query, update, decay, aggregate
//!   ├── GovernanceLedger<S> — hash-chained R6 audit append, query, report
//!   └── PolicyEngine<S>     — content-addressed policy entities, evaluate
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use trustcore_core::{
//!     engine::GovernanceCore,
//!     storage::InMemoryStorage,
//!     config::Config,
//!     types::{ActionStatus, R6Fields, Request, Resource, ResultInfo, Role},
//! };
//!
//! let mut core = GovernanceCore::new(Config::default(), InMemoryStorage::new());
//! let session = core.open_session("demo-project", b"nonce", None, None, 0).unwrap();
//!
//! let fields = R6Fields {
//!     r6_request_id: "req-1".into(),
//!     role: Role { lct: "lct:agent".into(), active_agent: "agent-1".into() },
//!     request: Request { name: "Read".into(), category: "file".into(), target: "README.md".into() },
//!     resource: Resource::default(),
//! };
//!
//! let record = core
//!     .dispatch(&session.session_id, &session.session_id, fields, 1, || ResultInfo {
//!         status: ActionStatus::Success,
//!         output_hash: None,
//!         duration_ms: 2,
//!     })
//!     .unwrap();
//! assert_eq!(record.action_index, 1);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod config;
pub mod crypto;
pub mod engine;
pub mod identity;
pub mod ledger;
pub mod policy;
pub mod storage;
pub mod trust;
pub mod types;

// Rate limiting requires std: the sliding window relies on `parking_lot`,
// which needs OS-level thread parking unavailable on bare no_std targets.
#[cfg(feature = "std")]
pub mod rate_limit;

// Async facade — only compiled when the "async" feature is enabled.
// Requires the "std" feature (Tokio cannot run in no_std environments).
#[cfg(feature = "async")]
pub mod async_core;

// Config loader — TOML file and environment variable loading.
// Only compiled when the "config-loader" feature is enabled.
#[cfg(feature = "config-loader")]
pub mod config_loader;

// Re-export the most commonly used items at the crate root so consumers can
// write `use trustcore_core::GovernanceCore;` instead of the fully
// qualified path.
pub use engine::{GovernanceCore, GovernanceError};
pub use storage::{InMemoryStorage, Storage};
pub use types::{
    AggregateMethod, AuditFilter, Lct, LctType, Outcome, R6Record, Session, TrustRecord,
};

// Re-export the async facade at the crate root for ergonomic imports.
#[cfg(feature = "async")]
pub use async_core::AsyncGovernanceCore;

// Re-export config loader types at the crate root.
#[cfg(feature = "config-loader")]
pub use config_loader::{load_config, load_config_from_env, Backend, ConfigError, GovernanceConfig};
