// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Trustcore Project Contributors

//! Storage abstraction for the governance core.
//!
//! Each subsystem gets its own narrow trait (`IdentityStorage`,
//! `TrustStorage`, `LedgerStorage`, `PolicyStorage`) rather than one flat
//! interface: the identity store owns LCTs, the trust engine owns trust
//! records, the ledger owns audit records and sessions, and the policy
//! engine owns policy entities. Cross-component references are stable
//! string ids, never shared mutable handles.
//! `Storage` is the union of all four so callers that want one object
//! satisfying every manager can use it, while managers that only need one
//! slice can be generic over just that slice's trait.
//!
//! This crate ships [`InMemoryStorage`] for development and testing.
//! Production implementations (file-based, database, etc.) live in
//! downstream crates so that this core crate remains `no_std`.

use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::HashMap;

use crate::policy::PolicyEntity;
use crate::types::{
    AuditFilter, AuditPage, Lct, PolicyWitnessLink, R6Record, Session, TrustRecord, WitnessRecord,
};

/// Failure taxonomy for storage backends.
///
/// [`InMemoryStorage`] never returns this — every one of its methods is a
/// plain map lookup or insert. File- or network-backed implementations
/// (e.g. `trustcore-std`'s `FileStorage`) use it to surface read, write, or
/// parse failures instead of panicking; a locked file or a truncated JSONL
/// line is normal operation for a persistence layer, not an abort
/// condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The underlying medium could not be read or written.
    Io(String),
    /// A stored record could not be parsed; the backing file or row is
    /// corrupt.
    CorruptState(String),
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StorageError::Io(message) => write!(f, "storage i/o error: {message}"),
            StorageError::CorruptState(message) => write!(f, "corrupt storage state: {message}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for StorageError {}

/// Persistence interface for the identity store (C2).
pub trait IdentityStorage: Send + Sync {
    /// Retrieve an LCT by id.
    fn get_lct(&self, id: &str) -> Result<Option<Lct>, StorageError>;

    /// Insert or overwrite an LCT.
    fn set_lct(&mut self, id: &str, lct: Lct) -> Result<(), StorageError>;

    /// All LCT ids, for query/scan operations.
    fn all_lct_ids(&self) -> Result<Vec<String>, StorageError>;

    /// All direct children of `parent_id`, for cascade revocation.
    fn children_of(&self, parent_id: &str) -> Result<Vec<String>, StorageError>;

    /// Append a witness record to `subject_lct`'s witness sequence.
    fn append_witness(&mut self, subject_lct: &str, record: WitnessRecord) -> Result<(), StorageError>;

    /// All witness records attached to `subject_lct`, arrival order.
    fn witnesses_of(&self, subject_lct: &str) -> Result<Vec<WitnessRecord>, StorageError>;
}

/// Persistence interface for the trust engine (C3).
pub trait TrustStorage: Send + Sync {
    /// Retrieve the trust record for `(entity_id, role)`, if any.
    fn get_trust_record(&self, entity_id: &str, role: &str) -> Result<Option<TrustRecord>, StorageError>;

    /// Insert or overwrite the trust record for `(entity_id, role)`.
    fn set_trust_record(&mut self, entity_id: &str, role: &str, record: TrustRecord) -> Result<(), StorageError>;

    /// Append a policy-witness link for `policy_entity_id`.
    fn append_policy_witness(&mut self, policy_entity_id: &str, link: PolicyWitnessLink) -> Result<(), StorageError>;

    /// All policy-witness links recorded for `policy_entity_id`, arrival
    /// order.
    fn policy_witnesses_of(&self, policy_entity_id: &str) -> Result<Vec<PolicyWitnessLink>, StorageError>;
}

/// Persistence interface for the governance ledger (C4).
pub trait LedgerStorage: Send + Sync {
    /// Retrieve a session by id.
    fn get_session(&self, session_id: &str) -> Result<Option<Session>, StorageError>;

    /// Insert or overwrite a session.
    fn set_session(&mut self, session_id: &str, session: Session) -> Result<(), StorageError>;

    /// Append an immutable R6 record.
    fn append_record(&mut self, record: R6Record) -> Result<(), StorageError>;

    /// All records for `session_id`, append order.
    fn records_for_session(&self, session_id: &str) -> Result<AuditPage, StorageError>;

    /// All records matching `filter`.
    fn query_records(&self, filter: &AuditFilter) -> Result<AuditPage, StorageError>;
}

/// Persistence interface for the policy engine (C5).
pub trait PolicyStorage: Send + Sync {
    /// Retrieve a policy entity by id.
    fn get_policy(&self, entity_id: &str) -> Result<Option<PolicyEntity>, StorageError>;

    /// Insert a policy entity. Policy entities are immutable once inserted;
    /// callers must mint a new entity id for any change.
    fn set_policy(&mut self, entity_id: &str, entity: PolicyEntity) -> Result<(), StorageError>;
}

/// Union of the four subsystem storage traits.
///
/// Implementations MUST be `Send + Sync` so a `GovernanceCore` can be
/// shared across threads when wrapped in `Arc<Mutex<...>>`.
pub trait Storage: IdentityStorage + TrustStorage + LedgerStorage + PolicyStorage {}

impl<T> Storage for T where T: IdentityStorage + TrustStorage + LedgerStorage + PolicyStorage {}

// ---------------------------------------------------------------------------
// InMemoryStorage
// ---------------------------------------------------------------------------

/// A volatile, heap-allocated [`Storage`] implementation backed by
/// [`hashbrown::HashMap`].
///
/// All data lives in process memory and is lost when the core is dropped.
/// Suitable for tests and WASM environments where persistence is managed
/// outside the engine.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStorage {
    lcts: HashMap<String, Lct>,
    witnesses: HashMap<String, Vec<WitnessRecord>>,
    trust: HashMap<String, TrustRecord>,
    policy_witnesses: HashMap<String, Vec<PolicyWitnessLink>>,
    sessions: HashMap<String, Session>,
    records: HashMap<String, Vec<R6Record>>,
    policies: HashMap<String, PolicyEntity>,
}

impl InMemoryStorage {
    /// Create a new, empty [`InMemoryStorage`].
    pub fn new() -> Self {
        Self::default()
    }

    fn trust_key(entity_id: &str, role: &str) -> String {
        let mut key = String::with_capacity(entity_id.len() + 1 + role.len());
        key.push_str(entity_id);
        key.push(':');
        key.push_str(role);
        key
    }
}

impl IdentityStorage for InMemoryStorage {
    fn get_lct(&self, id: &str) -> Result<Option<Lct>, StorageError> {
        Ok(self.lcts.get(id).cloned())
    }

    fn set_lct(&mut self, id: &str, lct: Lct) -> Result<(), StorageError> {
        self.lcts.insert(id.into(), lct);
        Ok(())
    }

    fn all_lct_ids(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.lcts.keys().cloned().collect())
    }

    fn children_of(&self, parent_id: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .lcts
            .values()
            .filter(|lct| {
                lct.delegation
                    .as_ref()
                    .map(|info| info.parent_id == parent_id)
                    .unwrap_or(false)
            })
            .map(|lct| lct.id.clone())
            .collect())
    }

    fn append_witness(&mut self, subject_lct: &str, record: WitnessRecord) -> Result<(), StorageError> {
        self.witnesses.entry(subject_lct.into()).or_default().push(record);
        Ok(())
    }

    fn witnesses_of(&self, subject_lct: &str) -> Result<Vec<WitnessRecord>, StorageError> {
        Ok(self.witnesses.get(subject_lct).cloned().unwrap_or_default())
    }
}

impl TrustStorage for InMemoryStorage {
    fn get_trust_record(&self, entity_id: &str, role: &str) -> Result<Option<TrustRecord>, StorageError> {
        Ok(self.trust.get(&Self::trust_key(entity_id, role)).cloned())
    }

    fn set_trust_record(&mut self, entity_id: &str, role: &str, record: TrustRecord) -> Result<(), StorageError> {
        self.trust.insert(Self::trust_key(entity_id, role), record);
        Ok(())
    }

    fn append_policy_witness(&mut self, policy_entity_id: &str, link: PolicyWitnessLink) -> Result<(), StorageError> {
        self.policy_witnesses.entry(policy_entity_id.into()).or_default().push(link);
        Ok(())
    }

    fn policy_witnesses_of(&self, policy_entity_id: &str) -> Result<Vec<PolicyWitnessLink>, StorageError> {
        Ok(self.policy_witnesses.get(policy_entity_id).cloned().unwrap_or_default())
    }
}

impl LedgerStorage for InMemoryStorage {
    fn get_session(&self, session_id: &str) -> Result<Option<Session>, StorageError> {
        Ok(self.sessions.get(session_id).cloned())
    }

    fn set_session(&mut self, session_id: &str, session: Session) -> Result<(), StorageError> {
        self.sessions.insert(session_id.into(), session);
        Ok(())
    }

    fn append_record(&mut self, record: R6Record) -> Result<(), StorageError> {
        self.records.entry(record.session_id.clone()).or_default().push(record);
        Ok(())
    }

    fn records_for_session(&self, session_id: &str) -> Result<AuditPage, StorageError> {
        Ok(self.records.get(session_id).cloned().unwrap_or_default())
    }

    fn query_records(&self, filter: &AuditFilter) -> Result<AuditPage, StorageError> {
        Ok(self
            .records
            .values()
            .flatten()
            .filter(|record| {
                if let Some(ref session_id) = filter.session_id {
                    if &record.session_id != session_id {
                        return false;
                    }
                }
                if let Some(ref tool) = filter.tool {
                    if &record.tool_name != tool {
                        return false;
                    }
                }
                if let Some(ref category) = filter.category {
                    if &record.category != category {
                        return false;
                    }
                }
                if let Some(status) = filter.status {
                    if record.result.status != status {
                        return false;
                    }
                }
                if let Some(ref target) = filter.target {
                    if !record.target.contains(target.as_str()) {
                        return false;
                    }
                }
                if let Some(since_ms) = filter.since_ms {
                    if record.timestamp_ms < since_ms {
                        return false;
                    }
                }
                true
            })
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }
}

impl PolicyStorage for InMemoryStorage {
    fn get_policy(&self, entity_id: &str) -> Result<Option<PolicyEntity>, StorageError> {
        Ok(self.policies.get(entity_id).cloned())
    }

    fn set_policy(&mut self, entity_id: &str, entity: PolicyEntity) -> Result<(), StorageError> {
        self.policies.insert(entity_id.into(), entity);
        Ok(())
    }
}
