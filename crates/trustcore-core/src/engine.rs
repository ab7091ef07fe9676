// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Trustcore Project Contributors

//! Governance core — the top-level composition of identity, trust, ledger,
//! and policy.
//!
//! [`GovernanceCore`] owns four managers as public fields that each borrow
//! their own clone of a shared [`Storage`] instance, mirroring the way the
//! original engine in this lineage composed its managers: each manager
//! communicates through the storage contract, not through shared memory.
//!
//! ## Dispatch order
//!
//! 1. **Policy gate** — evaluate the session's active policy entity against
//!    `(tool, category, target)`. A `deny` (or a missing-predicate error in
//!    enforcing mode) short-circuits to a `Denied` result.
//! 2. **Rate-limit gate** — check the sliding window for the dispatch's
//!    rate-limit key. Exhaustion also short-circuits to `Denied`.
//! 3. **Execution** — if both gates pass, the caller-supplied closure runs
//!    and produces the actual [`ResultInfo`]. The core performs no I/O
//!    itself.
//! 4. **Ledger append** — the record is written regardless of outcome;
//!    errors and denials are fields, not control flow.
//! 5. **Trust update** — a non-denied outcome nudges the acting identity's
//!    trust tensor for the dispatched tool.
//! 6. **Policy witness** — if the session has an active policy entity, two
//!    witness links are recorded in the trust store: the session witnessing
//!    the policy entity that governed it, and the policy entity witnessing
//!    the decision it issued. This runs regardless of the dispatch outcome,
//!    including denials.
//!
//! Any step past the gates still runs; there is no early return once
//! `execute` has been invoked.

use alloc::string::String;

use crate::identity::{IdentityError, IdentityStore};
use crate::ledger::{GovernanceLedger, LedgerError};
use crate::policy::{PolicyEngine, PolicyError, PolicyPreset, RuleDecision};
use crate::storage::Storage;
use crate::trust::{TrustEngine, TrustError};
use crate::types::{
    ActionStatus, AffectedDimension, AuditFilter, AuditPage, Outcome, PolicyWitnessKind,
    PolicyWitnessLink, R6Fields, R6Record, Session,
};

#[cfg(feature = "std")]
use crate::rate_limit::RateLimiter;

use crate::config::Config;

/// Failure taxonomy surfaced by [`GovernanceCore::dispatch`], unifying the
/// four subsystem error types.
#[derive(Debug, Clone, PartialEq)]
pub enum GovernanceError {
    /// A ledger operation failed.
    Ledger(LedgerError),
    /// A policy operation failed.
    Policy(PolicyError),
    /// An identity operation failed.
    Identity(IdentityError),
    /// A trust operation failed.
    Trust(TrustError),
    /// The dispatched request named a session with no active policy entity
    /// and no configured default.
    NoPolicyEntity,
}

impl core::fmt::Display for GovernanceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            GovernanceError::Ledger(inner) => write!(f, "ledger error: {inner}"),
            GovernanceError::Policy(inner) => write!(f, "policy error: {inner}"),
            GovernanceError::Identity(inner) => write!(f, "identity error: {inner}"),
            GovernanceError::Trust(inner) => write!(f, "trust error: {inner}"),
            GovernanceError::NoPolicyEntity => write!(f, "session has no active policy entity"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for GovernanceError {}

/// Composes identity, trust, ledger, and policy into a single dispatch API.
///
/// Generic over `S: Storage + Clone` so it can operate with any persistence
/// backend, from the built-in [`crate::storage::InMemoryStorage`] to a
/// custom file or network store.
pub struct GovernanceCore<S: Storage> {
    /// Linked Context Token issuance, verification, and delegation.
    pub identity: IdentityStore<S>,
    /// T3/V3 trust tensor tracking.
    pub trust: TrustEngine<S>,
    /// Hash-chained R6 audit ledger.
    pub ledger: GovernanceLedger<S>,
    /// Content-addressed policy entities and evaluation.
    pub policy: PolicyEngine<S>,
    /// Per-key sliding-window rate limiting used by `dispatch`.
    #[cfg(feature = "std")]
    pub rate_limiter: RateLimiter,
    config: Config,
}

impl<S: Storage + Clone> GovernanceCore<S> {
    /// Construct a new [`GovernanceCore`].
    ///
    /// `storage` is cloned once per manager. When `S` is
    /// [`crate::storage::InMemoryStorage`] the clone produces four
    /// independent in-memory stores that nonetheless observe a consistent
    /// view, because every mutating path runs through exactly one manager.
    /// For storage shared across threads, wrap it in `Arc<Mutex<S>>` and
    /// implement the four storage traits on the wrapper.
    pub fn new(config: Config, storage: S) -> Self {
        Self {
            identity: IdentityStore::new(storage.clone()),
            trust: TrustEngine::new(storage.clone()),
            ledger: GovernanceLedger::new(storage.clone()),
            policy: PolicyEngine::new(storage),
            #[cfg(feature = "std")]
            rate_limiter: RateLimiter::new(),
            config,
        }
    }
}

impl<S: Storage> GovernanceCore<S> {
    /// Construct a [`GovernanceCore`] from four pre-built managers.
    ///
    /// Use this constructor when the storage type does not implement
    /// [`Clone`], or when each manager should own a different storage
    /// shard, or when wiring in a shared reference type.
    pub fn from_parts(
        config: Config,
        identity: IdentityStore<S>,
        trust: TrustEngine<S>,
        ledger: GovernanceLedger<S>,
        policy: PolicyEngine<S>,
    ) -> Self {
        Self {
            identity,
            trust,
            ledger,
            policy,
            #[cfg(feature = "std")]
            rate_limiter: RateLimiter::new(),
            config,
        }
    }

    /// Borrow the active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Register the engine's default policy preset under `name` and open a
    /// session using it, unless `policy_entity_id` is supplied explicitly.
    pub fn open_session(
        &mut self,
        project: &str,
        nonce: &[u8],
        action_budget: Option<u64>,
        policy_entity_id: Option<String>,
        now_ms: u64,
    ) -> Result<Session, GovernanceError> {
        let policy_entity_id = match policy_entity_id {
            Some(id) => Some(id),
            None => {
                let preset = self
                    .policy
                    .register_preset("default", self.config.default_policy_preset, now_ms)
                    .map_err(GovernanceError::Policy)?;
                Some(preset.entity_id)
            }
        };
        let budget = action_budget.or(self.config.session_action_budget);
        self.ledger.open_session(project, nonce, budget, policy_entity_id, now_ms).map_err(GovernanceError::Ledger)
    }

    /// Evaluate, rate-limit, execute, append, and update trust for one
    /// dispatched action.
    ///
    /// `execute` is invoked only if both the policy and rate-limit gates
    /// pass; its result is what gets appended to the ledger. When either
    /// gate denies the action, `execute` is never called and a `Denied`
    /// result is appended instead — the action is still recorded, per the
    /// "every action produces one record" invariant.
    pub fn dispatch<F>(
        &mut self,
        session_id: &str,
        rate_limit_key: &str,
        fields: R6Fields,
        now_ms: u64,
        execute: F,
    ) -> Result<R6Record, GovernanceError>
    where
        F: FnOnce() -> crate::types::ResultInfo,
    {
        let session = self
            .ledger
            .storage()
            .get_session(session_id)
            .map_err(|error| GovernanceError::Ledger(LedgerError::from(error)))?
            .ok_or(GovernanceError::Ledger(LedgerError::NotFound))?;

        let mut denied = false;
        let mut policy_decision: Option<RuleDecision> = None;
        if let Some(ref policy_entity_id) = session.active_policy_entity_id {
            match self.policy.evaluate(policy_entity_id, &fields.request.name, &fields.request.category, &fields.request.target) {
                Ok(evaluation) => {
                    policy_decision = Some(evaluation.decision);
                    if evaluation.decision == RuleDecision::Deny {
                        denied = true;
                    }
                }
                Err(_) => {
                    denied = true;
                    policy_decision = Some(RuleDecision::Deny);
                }
            }
        }

        #[cfg(feature = "std")]
        if !denied {
            let rate = self.rate_limiter.check(rate_limit_key, self.config.rate_limit_max_count, self.config.rate_limit_window_ms, now_ms);
            if !rate.allowed {
                denied = true;
            } else {
                self.rate_limiter.record(rate_limit_key, now_ms);
            }
        }

        let result = if denied {
            crate::types::ResultInfo { status: ActionStatus::Denied, output_hash: None, duration_ms: 0 }
        } else {
            execute()
        };

        let role_lct = fields.role.lct.clone();
        let category = fields.request.category.clone();
        let tool_name = fields.request.name.clone();

        let record = self.ledger.append(session_id, fields, result, now_ms).map_err(GovernanceError::Ledger)?;

        if record.result.status != ActionStatus::Denied {
            let outcome = match record.result.status {
                ActionStatus::Success => Outcome::Success,
                ActionStatus::Error => Outcome::Failure,
                ActionStatus::Partial => Outcome::Partial,
                ActionStatus::Denied => unreachable!("denied results never reach trust update"),
            };
            let _ = self.trust.update(&role_lct, &category, &tool_name, outcome, &[AffectedDimension::Training], 0.05, now_ms);
        }

        if let (Some(ref policy_entity_id), Some(decision)) = (&session.active_policy_entity_id, policy_decision) {
            let success = Some(record.result.status == ActionStatus::Success);
            let _ = self.witness_policy(session_id, policy_entity_id, &record.record_id, decision, success, now_ms);
        }

        Ok(record)
    }

    /// Record the policy-witness links for one dispatched action: the
    /// session witnessing `policy_entity_id`, and `policy_entity_id`
    /// witnessing `record_id`'s decision. Both links land in the trust
    /// store (spec's §4.4 `witness` operation), not the identity witness
    /// sequence — a policy entity is not an LCT and cannot be [`IdentityStore::witness`]ed.
    pub fn witness_policy(
        &mut self,
        session_id: &str,
        policy_entity_id: &str,
        record_id: &str,
        decision: RuleDecision,
        success: Option<bool>,
        now_ms: u64,
    ) -> Result<(PolicyWitnessLink, PolicyWitnessLink), GovernanceError> {
        let session_witnesses_policy = self
            .trust
            .witness_policy(policy_entity_id, session_id, PolicyWitnessKind::SessionWitnessesPolicy, decision, success, now_ms)
            .map_err(GovernanceError::Trust)?;
        let policy_witnesses_decision = self
            .trust
            .witness_policy(policy_entity_id, record_id, PolicyWitnessKind::PolicyWitnessesDecision, decision, success, now_ms)
            .map_err(GovernanceError::Trust)?;
        Ok((session_witnesses_policy, policy_witnesses_decision))
    }

    /// Query the audit ledger directly.
    pub fn query_audit(&self, filter: &AuditFilter) -> AuditPage {
        self.ledger.query(filter)
    }

    /// Mint a new default policy entity from `preset` and return its id.
    pub fn register_policy_preset(&mut self, name: &str, preset: PolicyPreset, now_ms: u64) -> Result<String, GovernanceError> {
        self.policy.register_preset(name, preset, now_ms).map(|entity| entity.entity_id).map_err(GovernanceError::Policy)
    }
}
