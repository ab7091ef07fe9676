// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Trustcore Project Contributors

//! Governance ledger (C4): per-session, hash-chained, append-only R6 audit
//! records plus their query/report surface.
//!
//! Every action produces exactly one record, whether it was allowed,
//! denied, or errored — the chain is the source of truth and every
//! in-memory count derived from it is a cache, not an authority.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::crypto;
use crate::storage::{LedgerStorage, StorageError};
use crate::types::{
    ActionStatus, AuditFilter, AuditPage, LedgerReport, LedgerStats, R6Fields, R6Record, Reference,
    Rules, Session, TimelineBucket, ToolReport, VerifyChainResult,
};

/// Failure taxonomy for ledger operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Referenced session does not exist.
    NotFound,
    /// `tool`/`target` missing, or another malformed input.
    InvalidInput,
    /// Session has exhausted its action budget.
    RateLimited,
    /// Session is quarantined pending operator verification.
    CorruptState,
    /// The storage backend failed to read or write.
    Storage(StorageError),
}

impl core::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LedgerError::NotFound => write!(f, "session not found"),
            LedgerError::InvalidInput => write!(f, "invalid r6 fields"),
            LedgerError::RateLimited => write!(f, "session action budget exhausted"),
            LedgerError::CorruptState => write!(f, "session is quarantined"),
            LedgerError::Storage(inner) => write!(f, "{}", inner),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for LedgerError {}

impl From<StorageError> for LedgerError {
    fn from(error: StorageError) -> Self {
        LedgerError::Storage(error)
    }
}

fn degrade<T: Default>(result: Result<T, StorageError>) -> T {
    result.unwrap_or_default()
}

#[derive(serde::Serialize)]
struct RecordContent<'a> {
    r6_request_id: &'a str,
    session_id: &'a str,
    action_index: u64,
    timestamp_ms: u64,
    tool_name: &'a str,
    category: &'a str,
    target: &'a str,
    rules: &'a Rules,
    role: &'a crate::types::Role,
    request: &'a crate::types::Request,
    reference: &'a Reference,
    resource: &'a crate::types::Resource,
    result: &'a crate::types::ResultInfo,
}

/// Manager for sessions and their hash-chained R6 records, generic over any
/// [`LedgerStorage`] backend.
pub struct GovernanceLedger<S: LedgerStorage> {
    storage: S,
}

impl<S: LedgerStorage> GovernanceLedger<S> {
    /// Construct a new [`GovernanceLedger`] over `storage`.
    pub fn new(storage: S) -> Self {
        GovernanceLedger { storage }
    }

    /// Borrow the underlying storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Open a new session anchored by a seed hash derived from `nonce` and
    /// `now_ms`. The seed hash serves as `prev_record_hash` for the
    /// session's first appended record.
    pub fn open_session(
        &mut self,
        project: &str,
        nonce: &[u8],
        action_budget: Option<u64>,
        initial_policy_entity_id: Option<String>,
        now_ms: u64,
    ) -> Result<Session, LedgerError> {
        let mut seed_input = Vec::with_capacity(nonce.len() + 8);
        seed_input.extend_from_slice(nonce);
        seed_input.extend_from_slice(&now_ms.to_le_bytes());
        let seed_hash = crypto::hex_encode(&crypto::content_hash(&seed_input));
        let session_id = format!("session:{seed_hash}");

        let session = Session {
            session_id: session_id.clone(),
            project: project.to_string(),
            started_at_ms: now_ms,
            seed_hash: seed_hash.clone(),
            action_budget,
            actions_taken: 0,
            active_policy_entity_id: initial_policy_entity_id,
            last_hash: seed_hash,
            last_timestamp_ms: now_ms,
            quarantined: false,
        };
        self.storage.set_session(&session_id, session.clone())?;
        Ok(session)
    }

    /// Append one R6 record to `session_id`'s chain.
    ///
    /// Implements the append algorithm verbatim: validate non-empty
    /// `tool`/`target` → resolve the rules section from session state →
    /// assemble the record → read the previous hash under the session's
    /// logical lock (callers serialize concurrent appends on one session
    /// themselves, per the single-writer-per-session concurrency model) →
    /// `provenance_hash = SHA256(canonical(record) || prev_hash)` → persist
    /// → advance the session's `last_hash`/`actions_taken`.
    ///
    /// Does not itself emit the policy witness or trust update named in the
    /// append algorithm's final step — those cross cut into the identity
    /// and trust subsystems and are orchestrated by the caller (typically
    /// `GovernanceCore::dispatch`) once this call returns the persisted
    /// record.
    pub fn append(
        &mut self,
        session_id: &str,
        fields: R6Fields,
        result: crate::types::ResultInfo,
        now_ms: u64,
    ) -> Result<R6Record, LedgerError> {
        #[cfg(feature = "std")]
        let span = tracing::info_span!(
            "r6_append",
            session_id = %session_id,
            action_index = tracing::field::Empty,
            latency_ms = tracing::field::Empty
        );
        #[cfg(feature = "std")]
        let _guard = span.enter();
        #[cfg(feature = "std")]
        let start = std::time::Instant::now();

        let record = self.append_inner(session_id, fields, result, now_ms);

        #[cfg(feature = "std")]
        {
            let elapsed = start.elapsed().as_millis() as u64;
            span.record("latency_ms", elapsed);
            match &record {
                Ok(record) => {
                    span.record("action_index", record.action_index);
                    tracing::debug!("append committed");
                }
                Err(error) => tracing::error!(error = %error, "append failed"),
            }
        }

        record
    }

    fn append_inner(
        &mut self,
        session_id: &str,
        fields: R6Fields,
        result: crate::types::ResultInfo,
        now_ms: u64,
    ) -> Result<R6Record, LedgerError> {
        if fields.request.name.is_empty() || fields.request.target.is_empty() {
            return Err(LedgerError::InvalidInput);
        }

        let mut session = self.storage.get_session(session_id)?.ok_or(LedgerError::NotFound)?;
        if session.quarantined {
            return Err(LedgerError::CorruptState);
        }
        if let Some(budget) = session.action_budget {
            if session.actions_taken >= budget {
                return Err(LedgerError::RateLimited);
            }
        }

        let rules = Rules {
            preset_name: None,
            policy_entity_id: session.active_policy_entity_id.clone(),
            enforce_flag: session.active_policy_entity_id.is_some(),
        };

        let action_index = session.actions_taken + 1;
        let timestamp_ms = core::cmp::max(session.last_timestamp_ms + 1, now_ms);
        let prev_record_hash = session.last_hash.clone();

        let reference = Reference { prev_record_hash: prev_record_hash.clone(), prev_r6_id: None };

        let content = RecordContent {
            r6_request_id: &fields.r6_request_id,
            session_id,
            action_index,
            timestamp_ms,
            tool_name: &fields.request.name,
            category: &fields.request.category,
            target: &fields.request.target,
            rules: &rules,
            role: &fields.role,
            request: &fields.request,
            reference: &reference,
            resource: &fields.resource,
            result: &result,
        };
        let mut bytes = crypto::canonical_encode(&content).map_err(|_| LedgerError::InvalidInput)?;
        bytes.extend_from_slice(prev_record_hash.as_bytes());
        let provenance_hash = crypto::hex_encode(&crypto::content_hash(&bytes));
        let record_id = format!("r6:{provenance_hash}");

        let record = R6Record {
            record_id,
            r6_request_id: fields.r6_request_id,
            session_id: session_id.to_string(),
            action_index,
            timestamp_ms,
            tool_name: fields.request.name.clone(),
            category: fields.request.category.clone(),
            target: fields.request.target.clone(),
            rules,
            role: fields.role,
            request: fields.request,
            reference,
            resource: fields.resource,
            result,
            provenance_hash: provenance_hash.clone(),
        };

        self.storage.append_record(record.clone())?;

        session.actions_taken = action_index;
        session.last_hash = provenance_hash;
        session.last_timestamp_ms = timestamp_ms;
        self.storage.set_session(session_id, session)?;

        Ok(record)
    }

    /// Recompute every record's `provenance_hash` in order and check
    /// `action_index` monotonicity, `prev_record_hash` linkage, and
    /// timestamp non-regression. A storage failure is reported the same way
    /// a missing session is: invalid, first bad index `0`.
    pub fn verify_chain(&self, session_id: &str) -> VerifyChainResult {
        let session = match self.storage.get_session(session_id) {
            Ok(Some(session)) => session,
            Ok(None) | Err(_) => return VerifyChainResult { valid: false, first_bad_index: Some(0) },
        };
        let records = degrade(self.storage.records_for_session(session_id));

        let mut expected_prev = session.seed_hash;
        let mut expected_index = 1u64;
        let mut last_timestamp_ms = 0u64;

        for record in &records {
            if record.action_index != expected_index {
                return VerifyChainResult { valid: false, first_bad_index: Some(record.action_index) };
            }
            if record.reference.prev_record_hash != expected_prev {
                return VerifyChainResult { valid: false, first_bad_index: Some(record.action_index) };
            }
            if record.timestamp_ms < last_timestamp_ms {
                return VerifyChainResult { valid: false, first_bad_index: Some(record.action_index) };
            }

            let content = RecordContent {
                r6_request_id: &record.r6_request_id,
                session_id: &record.session_id,
                action_index: record.action_index,
                timestamp_ms: record.timestamp_ms,
                tool_name: &record.tool_name,
                category: &record.category,
                target: &record.target,
                rules: &record.rules,
                role: &record.role,
                request: &record.request,
                reference: &record.reference,
                resource: &record.resource,
                result: &record.result,
            };
            let mut bytes = match crypto::canonical_encode(&content) {
                Ok(bytes) => bytes,
                Err(_) => return VerifyChainResult { valid: false, first_bad_index: Some(record.action_index) },
            };
            bytes.extend_from_slice(expected_prev.as_bytes());
            let recomputed = crypto::hex_encode(&crypto::content_hash(&bytes));
            if recomputed != record.provenance_hash {
                return VerifyChainResult { valid: false, first_bad_index: Some(record.action_index) };
            }

            expected_prev = record.provenance_hash.clone();
            expected_index += 1;
            last_timestamp_ms = record.timestamp_ms;
        }

        VerifyChainResult { valid: true, first_bad_index: None }
    }

    /// Query records matching `filter` across all sessions. A storage
    /// failure degrades to an empty page.
    pub fn query(&self, filter: &AuditFilter) -> AuditPage {
        degrade(self.storage.query_records(filter))
    }

    /// Aggregated counts over `session_id`'s records, or over every session
    /// if `session_id` is `None`.
    pub fn stats(&self, session_id: Option<&str>) -> LedgerStats {
        let records = match session_id {
            Some(id) => degrade(self.storage.records_for_session(id)),
            None => degrade(self.storage.query_records(&AuditFilter::default())),
        };
        stats_from(&self.report_from(&records), &records)
    }

    /// Purely derived report over an arbitrary record set: tool stats,
    /// category breakdown, policy stats, error top-k, and a per-minute
    /// timeline. Performs no mutation.
    pub fn report(&self, records: &[R6Record]) -> LedgerReport {
        self.report_from(records)
    }

    fn report_from(&self, records: &[R6Record]) -> LedgerReport {
        let mut tools: Vec<(String, u64, u64, u64)> = Vec::new(); // name, count, successes, total_duration
        let mut by_category: Vec<(String, u64)> = Vec::new();
        let mut by_policy_entity: Vec<(String, u64)> = Vec::new();
        let mut top_errors: Vec<(String, u64)> = Vec::new();
        let mut timeline: Vec<TimelineBucket> = Vec::new();

        for record in records {
            bump(&mut by_category, &record.category);
            if let Some(ref policy_id) = record.rules.policy_entity_id {
                bump(&mut by_policy_entity, policy_id);
            }
            if record.result.status == ActionStatus::Error {
                bump(&mut top_errors, &record.target);
            }

            let minute_start_ms = (record.timestamp_ms / 60_000) * 60_000;
            match timeline.iter_mut().find(|bucket| bucket.minute_start_ms == minute_start_ms) {
                Some(bucket) => bucket.count += 1,
                None => timeline.push(TimelineBucket { minute_start_ms, count: 1 }),
            }

            match tools.iter_mut().find(|(name, _, _, _)| name == &record.tool_name) {
                Some(entry) => {
                    entry.1 += 1;
                    if record.result.status == ActionStatus::Success {
                        entry.2 += 1;
                    }
                    entry.3 += record.result.duration_ms;
                }
                None => tools.push((
                    record.tool_name.clone(),
                    1,
                    (record.result.status == ActionStatus::Success) as u64,
                    record.result.duration_ms,
                )),
            }
        }

        top_errors.sort_by(|a, b| b.1.cmp(&a.1));
        timeline.sort_by_key(|bucket| bucket.minute_start_ms);

        let tool_reports = tools
            .into_iter()
            .map(|(tool, count, successes, total_duration)| ToolReport {
                tool,
                count,
                success_rate: if count > 0 { successes as f64 / count as f64 } else { 0.0 },
                average_duration_ms: if count > 0 { total_duration as f64 / count as f64 } else { 0.0 },
            })
            .collect();

        LedgerReport { tools: tool_reports, by_category, by_policy_entity, top_errors, timeline }
    }
}

fn bump(counts: &mut Vec<(String, u64)>, key: &str) {
    match counts.iter_mut().find(|(existing, _)| existing == key) {
        Some(entry) => entry.1 += 1,
        None => counts.push((key.to_string(), 1)),
    }
}

/// Build [`LedgerStats`] from a report's tool/category breakdown plus the
/// underlying record set, which is the only place per-record status and
/// duration actually live.
fn stats_from(report: &LedgerReport, records: &[R6Record]) -> LedgerStats {
    let mut by_status: Vec<(ActionStatus, u64)> = vec![
        (ActionStatus::Success, 0),
        (ActionStatus::Error, 0),
        (ActionStatus::Denied, 0),
        (ActionStatus::Partial, 0),
    ];
    let mut durations: Vec<u64> = Vec::with_capacity(records.len());
    for record in records {
        if let Some(entry) = by_status.iter_mut().find(|(status, _)| *status == record.result.status) {
            entry.1 += 1;
        }
        durations.push(record.result.duration_ms);
    }

    durations.sort_unstable();
    let percentile = |p: f64| -> u64 {
        if durations.is_empty() {
            return 0;
        }
        let idx = ((durations.len() as f64 - 1.0) * p).round() as usize;
        durations[idx.min(durations.len() - 1)]
    };

    LedgerStats {
        total_records: records.len() as u64,
        by_tool: report.tools.iter().map(|t| (t.tool.clone(), t.count)).collect(),
        by_category: report.by_category.clone(),
        by_status,
        duration_percentiles_ms: (percentile(0.5), percentile(0.9), percentile(0.99)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;
    use crate::types::{ActionStatus, Request, Resource, ResultInfo, Role};

    fn ledger() -> GovernanceLedger<InMemoryStorage> {
        GovernanceLedger::new(InMemoryStorage::new())
    }

    fn fields(name: &str, target: &str) -> R6Fields {
        R6Fields {
            r6_request_id: format!("req-{name}-{target}"),
            role: Role { lct: "lct:agent".to_string(), active_agent: "agent-1".to_string() },
            request: Request { name: name.to_string(), category: "file".to_string(), target: target.to_string() },
            resource: Resource::default(),
        }
    }

    fn ok_result() -> ResultInfo {
        ResultInfo { status: ActionStatus::Success, output_hash: None, duration_ms: 5 }
    }

    #[test]
    fn open_session_seeds_last_hash_from_seed_hash() {
        let mut ledger = ledger();
        let session = ledger.open_session("proj", b"nonce", None, None, 0).unwrap();
        assert_eq!(session.last_hash, session.seed_hash);
    }

    #[test]
    fn append_rejects_empty_target() {
        let mut ledger = ledger();
        let session = ledger.open_session("proj", b"nonce", None, None, 0).unwrap();
        let mut bad = fields("Read", "x");
        bad.request.target = String::new();
        let result = ledger.append(&session.session_id, bad, ok_result(), 1);
        assert_eq!(result.unwrap_err(), LedgerError::InvalidInput);
    }

    #[test]
    fn sequential_appends_chain_correctly() {
        let mut ledger = ledger();
        let session = ledger.open_session("proj", b"nonce", None, None, 0).unwrap();
        let r1 = ledger.append(&session.session_id, fields("Read", "a.txt"), ok_result(), 1).unwrap();
        let r2 = ledger.append(&session.session_id, fields("Read", "b.txt"), ok_result(), 2).unwrap();
        assert_eq!(r1.action_index, 1);
        assert_eq!(r2.action_index, 2);
        assert_eq!(r2.reference.prev_record_hash, r1.provenance_hash);
        let verify = ledger.verify_chain(&session.session_id);
        assert!(verify.valid);
    }

    #[test]
    fn clock_skew_forces_non_decreasing_timestamps() {
        let mut ledger = ledger();
        let session = ledger.open_session("proj", b"nonce", None, None, 100).unwrap();
        let r1 = ledger.append(&session.session_id, fields("Read", "a"), ok_result(), 100).unwrap();
        let r2 = ledger.append(&session.session_id, fields("Read", "b"), ok_result(), 50).unwrap();
        assert!(r2.timestamp_ms > r1.timestamp_ms);
    }

    #[test]
    fn action_budget_exhaustion_denies_further_appends() {
        let mut ledger = ledger();
        let session = ledger.open_session("proj", b"nonce", Some(1), None, 0).unwrap();
        ledger.append(&session.session_id, fields("Read", "a"), ok_result(), 1).unwrap();
        let result = ledger.append(&session.session_id, fields("Read", "b"), ok_result(), 2);
        assert_eq!(result.unwrap_err(), LedgerError::RateLimited);
    }

    #[test]
    fn verify_chain_detects_tampering() {
        let mut ledger = ledger();
        let session = ledger.open_session("proj", b"nonce", None, None, 0).unwrap();
        ledger.append(&session.session_id, fields("Read", "a"), ok_result(), 1).unwrap();

        let mut tampered_storage = InMemoryStorage::new();
        let mut tampered_record = ledger.storage.records_for_session(&session.session_id).unwrap()[0].clone();
        tampered_record.target = "tampered".to_string();
        tampered_storage
            .set_session(&session.session_id, ledger.storage.get_session(&session.session_id).unwrap().unwrap())
            .unwrap();
        tampered_storage.append_record(tampered_record).unwrap();

        let tampered_ledger = GovernanceLedger::new(tampered_storage);
        let verify = tampered_ledger.verify_chain(&session.session_id);
        assert!(!verify.valid);
    }

    #[test]
    fn report_computes_success_rate_and_category_counts() {
        let mut ledger = ledger();
        let session = ledger.open_session("proj", b"nonce", None, None, 0).unwrap();
        ledger.append(&session.session_id, fields("Read", "a"), ok_result(), 1).unwrap();
        let mut failed = ok_result();
        failed.status = ActionStatus::Error;
        ledger.append(&session.session_id, fields("Read", "b"), failed, 2).unwrap();
        let records = ledger.storage.records_for_session(&session.session_id).unwrap();
        let report = ledger.report(&records);
        let read_report = report.tools.iter().find(|t| t.tool == "Read").unwrap();
        assert_eq!(read_report.count, 2);
        assert!((read_report.success_rate - 0.5).abs() < f64::EPSILON);
        assert_eq!(report.top_errors[0].0, "b");
    }
}
