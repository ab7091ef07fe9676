// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Trustcore Project Contributors

//! Directory-based storage backend.
//!
//! [`FileStorage`] persists governance state as a tree of JSON and JSONL
//! files under a root directory, following the authoritative on-disk layout:
//! one file per session/role/LCT/policy entity, plus one append-only JSONL
//! file per session's audit trail and per policy entity's witness sequence.
//! Every write to a non-append file uses an atomic write-rename so a crash
//! mid-write never leaves a torn file; audit and witness records are
//! appended with a single `write` syscall per line.
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
//! A relational `ledger.db`, `preferences.json`, a per-day `r6/` index, and
//! `heartbeat/*.jsonl` are not implemented — none of them back a governance
//! operation, and the per-file JSONL layout here already gives every record
//! a durable, hash-linked home.
//!
//! ## Caveats
//!
//! * Every read goes to disk; this backend is not an in-memory cache. It
//!   favors a simple, inspectable on-disk shape over write throughput.
//! * Concurrent access from multiple processes is not supported — a single
//!   process should own a given root directory at a time.
//! * I/O and parse failures surface as [`StorageError`] rather than
//!   panicking; a locked file or a truncated JSONL line reaches the calling
//!   subsystem as an ordinary error.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use trustcore_core::policy::PolicyEntity;
use trustcore_core::storage::{IdentityStorage, LedgerStorage, PolicyStorage, StorageError, TrustStorage};
use trustcore_core::types::{AuditFilter, AuditPage, Lct, PolicyWitnessLink, R6Record, Session, TrustRecord, WitnessRecord};

/// A directory-backed storage implementation over JSON and JSONL files.
///
/// # Examples
///
/// ```rust,no_run
/// use trustcore_std::FileStorage;
/// use trustcore_core::storage::TrustStorage;
///
/// let storage = FileStorage::open("/tmp/trustcore-demo")
///     .expect("could not open storage root");
///
/// assert!(storage.get_trust_record("agent-001", "default").unwrap().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Open (creating if absent) a directory-backed storage root.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] if the root directory cannot be created.
    pub fn open<P: AsRef<Path>>(root: P) -> io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn session_path(&self, session_id: &str) -> PathBuf {
        self.root.join("governance").join("sessions").join(format!("{session_id}.json"))
    }

    fn audit_path(&self, session_id: &str) -> PathBuf {
        self.root.join("audit").join(format!("{session_id}.jsonl"))
    }

    fn role_path(&self, entity_id: &str, role: &str) -> PathBuf {
        self.root.join("governance").join("roles").join(format!("{entity_id}__{role}.json"))
    }

    fn lct_path(&self, lct_id: &str) -> PathBuf {
        self.root.join("governance").join("lcts").join(format!("{lct_id}.json"))
    }

    fn witness_path(&self, subject_lct: &str) -> PathBuf {
        self.root.join("governance").join("witnesses").join(format!("{subject_lct}.jsonl"))
    }

    fn policy_path(&self, entity_id: &str) -> PathBuf {
        self.root.join("governance").join("policies").join(format!("{entity_id}.json"))
    }

    fn policy_witness_path(&self, policy_entity_id: &str) -> PathBuf {
        self.root.join("governance").join("policy_witnesses").join(format!("{policy_entity_id}.jsonl"))
    }

    fn audit_dir(&self) -> PathBuf {
        self.root.join("audit")
    }

    fn lct_dir(&self) -> PathBuf {
        self.root.join("governance").join("lcts")
    }
}

/// Read and deserialise a JSON file, returning `Ok(None)` if it does not
/// exist. An I/O failure becomes [`StorageError::Io`]; a malformed file
/// becomes [`StorageError::CorruptState`].
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|error| StorageError::Io(format!("reading {}: {error}", path.display())))?;
    let value = serde_json::from_str(&raw)
        .map_err(|error| StorageError::CorruptState(format!("parsing {}: {error}", path.display())))?;
    Ok(Some(value))
}

/// Serialise `value` and write it to `path` via an atomic write-rename.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|error| StorageError::Io(format!("creating {}: {error}", parent.display())))?;
    }
    let json = serde_json::to_vec_pretty(value)
        .map_err(|error| StorageError::CorruptState(format!("serialising value for {}: {error}", path.display())))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, &json).map_err(|error| StorageError::Io(format!("writing {}: {error}", tmp_path.display())))?;
    fs::rename(&tmp_path, path)
        .map_err(|error| StorageError::Io(format!("renaming {} to {}: {error}", tmp_path.display(), path.display())))
}

/// Append one JSON-encoded line to `path`, creating it if absent.
fn append_line<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|error| StorageError::Io(format!("creating {}: {error}", parent.display())))?;
    }
    let mut line = serde_json::to_vec(value)
        .map_err(|error| StorageError::CorruptState(format!("serialising record for {}: {error}", path.display())))?;
    line.push(b'\n');
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|error| StorageError::Io(format!("opening {} for append: {error}", path.display())))?;
    file.write_all(&line).map_err(|error| StorageError::Io(format!("appending to {}: {error}", path.display())))
}

/// Read and deserialise every line of a JSONL file, in file order. Returns
/// an empty vector if the file does not exist.
fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StorageError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = fs::read_to_string(path).map_err(|error| StorageError::Io(format!("reading {}: {error}", path.display())))?;
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line)
                .map_err(|error| StorageError::CorruptState(format!("parsing line in {}: {error}", path.display())))
        })
        .collect()
}

/// List the file stems (filename without the given extension) of every file
/// directly inside `dir`, or an empty vector if `dir` does not exist.
fn file_stems(dir: &Path, ext: &str) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().into_string().ok()?;
            name.strip_suffix(ext).map(str::to_owned)
        })
        .collect()
}

impl IdentityStorage for FileStorage {
    fn get_lct(&self, id: &str) -> Result<Option<Lct>, StorageError> {
        read_json(&self.lct_path(id))
    }

    fn set_lct(&mut self, id: &str, lct: Lct) -> Result<(), StorageError> {
        write_json_atomic(&self.lct_path(id), &lct)
    }

    fn all_lct_ids(&self) -> Result<Vec<String>, StorageError> {
        Ok(file_stems(&self.lct_dir(), ".json"))
    }

    fn children_of(&self, parent_id: &str) -> Result<Vec<String>, StorageError> {
        let mut children = Vec::new();
        for id in self.all_lct_ids()? {
            if let Some(lct) = self.get_lct(&id)? {
                if lct.delegation.as_ref().map(|info| info.parent_id == parent_id).unwrap_or(false) {
                    children.push(lct.id);
                }
            }
        }
        Ok(children)
    }

    fn append_witness(&mut self, subject_lct: &str, record: WitnessRecord) -> Result<(), StorageError> {
        append_line(&self.witness_path(subject_lct), &record)
    }

    fn witnesses_of(&self, subject_lct: &str) -> Result<Vec<WitnessRecord>, StorageError> {
        read_jsonl(&self.witness_path(subject_lct))
    }
}

impl TrustStorage for FileStorage {
    fn get_trust_record(&self, entity_id: &str, role: &str) -> Result<Option<TrustRecord>, StorageError> {
        read_json(&self.role_path(entity_id, role))
    }

    fn set_trust_record(&mut self, entity_id: &str, role: &str, record: TrustRecord) -> Result<(), StorageError> {
        write_json_atomic(&self.role_path(entity_id, role), &record)
    }

    fn append_policy_witness(&mut self, policy_entity_id: &str, link: PolicyWitnessLink) -> Result<(), StorageError> {
        append_line(&self.policy_witness_path(policy_entity_id), &link)
    }

    fn policy_witnesses_of(&self, policy_entity_id: &str) -> Result<Vec<PolicyWitnessLink>, StorageError> {
        read_jsonl(&self.policy_witness_path(policy_entity_id))
    }
}

impl LedgerStorage for FileStorage {
    fn get_session(&self, session_id: &str) -> Result<Option<Session>, StorageError> {
        read_json(&self.session_path(session_id))
    }

    fn set_session(&mut self, session_id: &str, session: Session) -> Result<(), StorageError> {
        write_json_atomic(&self.session_path(session_id), &session)
    }

    fn append_record(&mut self, record: R6Record) -> Result<(), StorageError> {
        append_line(&self.audit_path(&record.session_id), &record)
    }

    fn records_for_session(&self, session_id: &str) -> Result<AuditPage, StorageError> {
        read_jsonl(&self.audit_path(session_id))
    }

    fn query_records(&self, filter: &AuditFilter) -> Result<AuditPage, StorageError> {
        let session_ids = match &filter.session_id {
            Some(session_id) => vec![session_id.clone()],
            None => file_stems(&self.audit_dir(), ".jsonl"),
        };

        let mut matched = Vec::new();
        for session_id in &session_ids {
            for record in self.records_for_session(session_id)? {
                if let Some(ref tool) = filter.tool {
                    if &record.tool_name != tool {
                        continue;
                    }
                }
                if let Some(ref category) = filter.category {
                    if &record.category != category {
                        continue;
                    }
                }
                if let Some(status) = filter.status {
                    if record.result.status != status {
                        continue;
                    }
                }
                if let Some(ref target) = filter.target {
                    if !record.target.contains(target.as_str()) {
                        continue;
                    }
                }
                if let Some(since_ms) = filter.since_ms {
                    if record.timestamp_ms < since_ms {
                        continue;
                    }
                }
                matched.push(record);
                if matched.len() >= filter.limit.unwrap_or(usize::MAX) {
                    return Ok(matched);
                }
            }
        }
        Ok(matched)
    }
}

impl PolicyStorage for FileStorage {
    fn get_policy(&self, entity_id: &str) -> Result<Option<PolicyEntity>, StorageError> {
        read_json(&self.policy_path(entity_id))
    }

    fn set_policy(&mut self, entity_id: &str, entity: PolicyEntity) -> Result<(), StorageError> {
        write_json_atomic(&self.policy_path(entity_id), &entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trustcore_core::types::{LctType, RevocationState};

    fn temp_root(label: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("trustcore-std-test-{label}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&path);
        path
    }

    fn sample_lct(id: &str) -> Lct {
        Lct {
            id: id.to_string(),
            uri: format!("lct://core:{id}:subject@trustcore"),
            lct_type: LctType::Root,
            subject: "subject".to_string(),
            issuer: "issuer".to_string(),
            public_key: [7u8; 32],
            issued_at_ms: 0,
            expires_at_ms: None,
            delegation: None,
            hardware_binding: None,
            revocation: RevocationState::default(),
            signature: [0u8; 64],
        }
    }

    #[test]
    fn round_trips_an_lct_through_disk() {
        let mut storage = FileStorage::open(temp_root("lct")).unwrap();
        let lct = sample_lct("deadbeef");
        storage.set_lct(&lct.id, lct.clone()).unwrap();

        let reopened = FileStorage::open(storage.root.clone()).unwrap();
        let loaded = reopened.get_lct("deadbeef").unwrap().expect("lct should persist across reopen");
        assert_eq!(loaded.id, lct.id);
        assert_eq!(loaded.subject, lct.subject);
    }

    #[test]
    fn missing_lct_returns_none() {
        let storage = FileStorage::open(temp_root("missing")).unwrap();
        assert!(storage.get_lct("nonexistent").unwrap().is_none());
    }

    #[test]
    fn audit_records_append_in_order_and_filter_by_session() {
        let mut storage = FileStorage::open(temp_root("audit")).unwrap();

        for index in 1..=3u64 {
            let mut record = sample_record("session-a", index);
            record.tool_name = "Read".to_string();
            storage.append_record(record).unwrap();
        }
        storage.append_record(sample_record("session-b", 1)).unwrap();

        let session_a = storage.records_for_session("session-a").unwrap();
        assert_eq!(session_a.len(), 3);
        assert_eq!(session_a[0].action_index, 1);
        assert_eq!(session_a[2].action_index, 3);

        let filtered = storage.query_records(&AuditFilter { session_id: Some("session-a".into()), ..Default::default() }).unwrap();
        assert_eq!(filtered.len(), 3);
    }

    fn sample_record(session_id: &str, action_index: u64) -> R6Record {
        use trustcore_core::types::{ActionStatus, Reference, Request, Resource, ResultInfo, Role, Rules};

        R6Record {
            record_id: format!("r6:{session_id}:{action_index}"),
            r6_request_id: format!("req-{action_index}"),
            session_id: session_id.to_string(),
            action_index,
            timestamp_ms: action_index,
            tool_name: "Read".to_string(),
            category: "file".to_string(),
            target: "a.txt".to_string(),
            rules: Rules { preset_name: None, policy_entity_id: None, enforce_flag: false },
            role: Role { lct: "lct:agent".into(), active_agent: "agent".into() },
            request: Request { name: "Read".into(), category: "file".into(), target: "a.txt".into() },
            reference: Reference { prev_record_hash: "seed".into(), prev_r6_id: None },
            resource: Resource::default(),
            result: ResultInfo { status: ActionStatus::Success, output_hash: None, duration_ms: 1 },
            provenance_hash: format!("hash-{action_index}"),
        }
    }

    #[test]
    fn trust_records_key_by_entity_and_role_independently() {
        let mut storage = FileStorage::open(temp_root("trust")).unwrap();
        let record = TrustRecord::neutral("agent-1".to_string(), "builder".to_string(), 0);
        storage.set_trust_record("agent-1", "builder", record.clone()).unwrap();

        assert!(storage.get_trust_record("agent-1", "builder").unwrap().is_some());
        assert!(storage.get_trust_record("agent-1", "reviewer").unwrap().is_none());
        assert!(storage.get_trust_record("agent-2", "builder").unwrap().is_none());
    }

    #[test]
    fn policy_witnesses_append_in_order() {
        use trustcore_core::policy::RuleDecision;
        use trustcore_core::types::PolicyWitnessKind;

        let mut storage = FileStorage::open(temp_root("policy-witness")).unwrap();
        let link = PolicyWitnessLink {
            policy_entity_id: "policy:safety".to_string(),
            subject: "session-a".to_string(),
            kind: PolicyWitnessKind::SessionWitnessesPolicy,
            decision: RuleDecision::Allow,
            success: Some(true),
            timestamp_ms: 0,
        };
        storage.append_policy_witness("policy:safety", link.clone()).unwrap();

        let links = storage.policy_witnesses_of("policy:safety").unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].subject, "session-a");
        assert!(storage.policy_witnesses_of("policy:unknown").unwrap().is_empty());
    }

    #[test]
    fn corrupt_lct_file_surfaces_as_storage_error_not_panic() {
        let root = temp_root("corrupt");
        let storage = FileStorage::open(&root).unwrap();
        let path = storage.lct_path("broken");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"not json").unwrap();

        let result = storage.get_lct("broken");
        assert!(matches!(result, Err(StorageError::CorruptState(_))));
    }
}
