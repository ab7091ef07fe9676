// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Trustcore Project Contributors

//! Tokio-backed async facade over [`GovernanceCore`].
//!
//! The synchronous core performs no I/O and has no suspension points by
//! design — this module exists purely so hosts running inside a Tokio
//! executor are not forced to hop onto a blocking thread for every call.
//! It wraps a [`GovernanceCore`]
//! in `Arc<tokio::sync::RwLock<...>>` and exposes `async fn` equivalents of
//! its public surface; writers take the write half, pure reads take the
//! read half.

use alloc::string::String;
use alloc::sync::Arc;

use tokio::sync::RwLock;

use crate::config::Config;
use crate::engine::{GovernanceCore, GovernanceError};
use crate::storage::Storage;
use crate::types::{AuditFilter, AuditPage, R6Fields, R6Record, ResultInfo, Session};

/// Shared, lock-guarded handle to a [`GovernanceCore`].
///
/// Cloning an [`AsyncGovernanceCore`] is a cheap `Arc` clone; every clone
/// observes the same underlying state.
pub struct AsyncGovernanceCore<S: Storage> {
    inner: Arc<RwLock<GovernanceCore<S>>>,
}

impl<S: Storage> Clone for AsyncGovernanceCore<S> {
    fn clone(&self) -> Self {
        AsyncGovernanceCore { inner: self.inner.clone() }
    }
}

impl<S: Storage + Clone> AsyncGovernanceCore<S> {
    /// Wrap a freshly constructed [`GovernanceCore`].
    pub fn new(config: Config, storage: S) -> Self {
        AsyncGovernanceCore { inner: Arc::new(RwLock::new(GovernanceCore::new(config, storage))) }
    }
}

impl<S: Storage> AsyncGovernanceCore<S> {
    /// Wrap an already-constructed [`GovernanceCore`].
    pub fn from_core(core: GovernanceCore<S>) -> Self {
        AsyncGovernanceCore { inner: Arc::new(RwLock::new(core)) }
    }

    /// Open a session. Takes the write half.
    pub async fn open_session(
        &self,
        project: &str,
        nonce: &[u8],
        action_budget: Option<u64>,
        policy_entity_id: Option<String>,
        now_ms: u64,
    ) -> Result<Session, GovernanceError> {
        let mut core = self.inner.write().await;
        core.open_session(project, nonce, action_budget, policy_entity_id, now_ms)
    }

    /// Dispatch one action. Takes the write half for the full duration of
    /// `execute`, matching the synchronous core's single-writer-per-call
    /// contract; callers that need concurrent dispatch across independent
    /// sessions should shard across multiple [`AsyncGovernanceCore`]
    /// instances rather than relying on internal parallelism here.
    pub async fn dispatch<F>(
        &self,
        session_id: &str,
        rate_limit_key: &str,
        fields: R6Fields,
        now_ms: u64,
        execute: F,
    ) -> Result<R6Record, GovernanceError>
    where
        F: FnOnce() -> ResultInfo,
    {
        let mut core = self.inner.write().await;
        core.dispatch(session_id, rate_limit_key, fields, now_ms, execute)
    }

    /// Query the audit ledger. Takes the read half.
    pub async fn query_audit(&self, filter: &AuditFilter) -> AuditPage {
        let core = self.inner.read().await;
        core.query_audit(filter)
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;
    use crate::types::{ActionStatus, Request, Resource, Role};

    #[tokio::test]
    async fn dispatch_appends_one_record_per_call() {
        let core = AsyncGovernanceCore::new(Config::default(), InMemoryStorage::new());
        let session = core.open_session("proj", b"nonce", None, None, 0).await.unwrap();

        let fields = R6Fields {
            r6_request_id: "req-1".into(),
            role: Role { lct: "lct:agent".into(), active_agent: "agent-1".into() },
            request: Request { name: "Read".into(), category: "file".into(), target: "a.txt".into() },
            resource: Resource::default(),
        };
        let record = core
            .dispatch(&session.session_id, &session.session_id, fields, 1, || ResultInfo {
                status: ActionStatus::Success,
                output_hash: None,
                duration_ms: 1,
            })
            .await
            .unwrap();
        assert_eq!(record.action_index, 1);

        let records = core.query_audit(&AuditFilter { session_id: Some(session.session_id), ..Default::default() }).await;
        assert_eq!(records.len(), 1);
    }
}
