// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Trustcore Project Contributors

//! # trustcore-std
//!
//! `std`-only storage backend for `trustcore-core`.
//!
//! This crate provides [`FileStorage`], a directory-backed implementation of
//! the four governance storage traits, suitable for CLI tools, local agents,
//! and server-side deployments that do not need a full database.
//!
//! ## Layout
//!
//! ```text
//! <root>/
//!   governance/
//!     sessions/{session_id}.json
//!     roles/{entity_id}__{role}.json
//!     lcts/{lct_id}.json
//!     witnesses/{subject_lct}.jsonl
//!     policies/{entity_id}.json
//!     policy_witnesses/{policy_entity_id}.jsonl
//!   audit/{session_id}.jsonl
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use trustcore_std::FileStorage;
//! use trustcore_core::{engine::GovernanceCore, config::Config};
//!
//! let storage = FileStorage::open("/var/lib/trustcore")
//!     .expect("failed to open storage root");
//!
//! let mut core = GovernanceCore::new(Config::default(), storage);
//! ```

pub mod storage;

pub use storage::file::FileStorage;
