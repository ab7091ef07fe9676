// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Trustcore Project Contributors

//! Trust engine (C3): bounded T3/V3 tensors, per-`(entity_id, role)` state.
//!
//! Arithmetic always clamps before storage and uses 64-bit floats
//! throughout. Updates on the same `(entity_id, role)` must be serialized by
//! the caller (e.g. behind a `parking_lot::Mutex<TrustEngine<S>>`) — this
//! type itself takes `&mut self` and performs no internal locking.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::policy::RuleDecision;
use crate::storage::{StorageError, TrustStorage};
use crate::types::{
    AffectedDimension, AggregateMethod, AggregateResult, AggregateSource, CompareResult,
    ContextWeights, DecayResult, Outcome, PolicyWitnessKind, PolicyWitnessLink, T3Tensor,
    TrustHistoryEntry, TrustQueryResult, TrustRecord, TrustUpdateResult,
};

/// Failure taxonomy for trust engine operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustError {
    /// Caller-supplied argument was out of range (e.g. magnitude `<= 0`,
    /// half-life `<= 0`).
    InvalidInput,
    /// The storage backend failed to read or write.
    Storage(StorageError),
}

impl core::fmt::Display for TrustError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TrustError::InvalidInput => write!(f, "invalid input"),
            TrustError::Storage(inner) => write!(f, "{}", inner),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for TrustError {}

impl From<StorageError> for TrustError {
    fn from(error: StorageError) -> Self {
        TrustError::Storage(error)
    }
}

fn degrade<T: Default>(result: Result<T, StorageError>) -> T {
    result.unwrap_or_default()
}

/// Manager for T3/V3 trust tensors, generic over any [`TrustStorage`]
/// backend.
pub struct TrustEngine<S: TrustStorage> {
    storage: S,
    context_weights: ContextWeights,
}

impl<S: TrustStorage> TrustEngine<S> {
    /// Construct a new [`TrustEngine`] with the default (equal) context
    /// weights.
    pub fn new(storage: S) -> Self {
        TrustEngine { storage, context_weights: ContextWeights::default() }
    }

    /// Construct a [`TrustEngine`] with custom context weights.
    pub fn with_weights(storage: S, context_weights: ContextWeights) -> Self {
        TrustEngine { storage, context_weights }
    }

    /// Borrow the underlying storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Query the trust record for `(entity_id, role)`. Creates nothing. A
    /// storage failure degrades to the same result an absent record would
    /// produce.
    pub fn query(&self, entity_id: &str, role: &str) -> TrustQueryResult {
        let record = self.storage.get_trust_record(entity_id, role).ok().flatten();
        let aggregate = record.as_ref().map(|r| self.context_weights.dot(&r.t3));
        TrustQueryResult { record, aggregate }
    }

    /// Apply one outcome to the trust record for `(entity_id, role)`,
    /// creating a neutral record first if none exists.
    ///
    /// `magnitude` must be in `(0, 1]`.
    pub fn update(
        &mut self,
        entity_id: &str,
        role: &str,
        action: &str,
        outcome: Outcome,
        affected_dimensions: &[AffectedDimension],
        magnitude: f64,
        now_ms: u64,
    ) -> Result<TrustUpdateResult, TrustError> {
        #[cfg(feature = "std")]
        let span = tracing::info_span!("trust_update", entity_id = %entity_id, role = %role, latency_ms = tracing::field::Empty);
        #[cfg(feature = "std")]
        let _guard = span.enter();
        #[cfg(feature = "std")]
        let start = std::time::Instant::now();

        let result = self.update_inner(entity_id, role, action, outcome, affected_dimensions, magnitude, now_ms);

        #[cfg(feature = "std")]
        {
            let elapsed = start.elapsed().as_millis() as u64;
            span.record("latency_ms", elapsed);
            match &result {
                Ok(_) => tracing::debug!("trust update committed"),
                Err(error) => tracing::error!(error = %error, "trust update failed"),
            }
        }

        result
    }

    fn update_inner(
        &mut self,
        entity_id: &str,
        role: &str,
        action: &str,
        outcome: Outcome,
        affected_dimensions: &[AffectedDimension],
        magnitude: f64,
        now_ms: u64,
    ) -> Result<TrustUpdateResult, TrustError> {
        if !(magnitude > 0.0 && magnitude <= 1.0) {
            return Err(TrustError::InvalidInput);
        }

        let mut record = self
            .storage
            .get_trust_record(entity_id, role)?
            .unwrap_or_else(|| TrustRecord::neutral(entity_id.to_string(), role.to_string(), now_ms));

        let prev_t3 = record.t3;
        let prev_dynamics = record.dynamics;

        let direction = outcome.direction();
        for &dim in affected_dimensions {
            let old_value = record.t3.get(dim);
            let new_value = (old_value + magnitude * direction).clamp(0.0, 1.0);
            let actual_delta = new_value - old_value;
            record.t3.set(dim, new_value);
            record.dynamics.apply_delta(dim, actual_delta);
        }

        record.update_count += 1;
        record.last_updated_ms = now_ms;
        record.history.push(TrustHistoryEntry {
            timestamp_ms: now_ms,
            t3_snapshot: record.t3,
            action: action.to_string(),
            outcome: Some(outcome),
        });

        let new_t3 = record.t3;
        let new_dynamics = record.dynamics;
        self.storage.set_trust_record(entity_id, role, record)?;

        Ok(TrustUpdateResult { prev_t3, new_t3, prev_dynamics, new_dynamics })
    }

    /// Ordered history entries for `(entity_id, role)`, most recent last,
    /// optionally bounded by `limit` (most recent `limit` entries kept) and
    /// `since_ms` (entries at or after this timestamp). A storage failure
    /// degrades to an empty history.
    pub fn history(
        &self,
        entity_id: &str,
        role: &str,
        limit: Option<usize>,
        since_ms: Option<u64>,
    ) -> Vec<TrustHistoryEntry> {
        let record = match self.storage.get_trust_record(entity_id, role) {
            Ok(Some(record)) => record,
            Ok(None) | Err(_) => return Vec::new(),
        };
        let mut entries: Vec<TrustHistoryEntry> = record
            .history
            .into_iter()
            .filter(|entry| since_ms.map(|since| entry.timestamp_ms >= since).unwrap_or(true))
            .collect();
        if let Some(limit) = limit {
            let start = entries.len().saturating_sub(limit);
            entries = entries.split_off(start);
        }
        entries
    }

    /// Compare two entities' trust in the same role.
    pub fn compare(&self, e1: (&str, &str), e2: (&str, &str)) -> CompareResult {
        let t3_1 = self.query(e1.0, e1.1).record.map(|r| r.t3).unwrap_or_else(T3Tensor::neutral);
        let t3_2 = self.query(e2.0, e2.1).record.map(|r| r.t3).unwrap_or_else(T3Tensor::neutral);

        let aggregate_1 = self.context_weights.dot(&t3_1);
        let aggregate_2 = self.context_weights.dot(&t3_2);
        let aggregate_delta = aggregate_2 - aggregate_1;

        let more_reliable = if aggregate_delta > 0.0 {
            Some(e2.0.to_string())
        } else if aggregate_delta < 0.0 {
            Some(e1.0.to_string())
        } else {
            None
        };

        CompareResult {
            talent_delta: t3_2.talent - t3_1.talent,
            training_delta: t3_2.training - t3_1.training,
            temperament_delta: t3_2.temperament - t3_1.temperament,
            aggregate_delta,
            more_reliable,
        }
    }

    /// Combine multiple sources' T3 tensors by `method`. Missing sources are
    /// skipped; if all are missing, returns the neutral tensor with
    /// `source_count = 0`.
    pub fn aggregate(&self, sources: &[AggregateSource], method: AggregateMethod) -> AggregateResult {
        let tensors: Vec<(T3Tensor, f64)> = sources
            .iter()
            .filter_map(|source| {
                self.storage
                    .get_trust_record(&source.entity_id, &source.role)
                    .ok()
                    .flatten()
                    .map(|record| (record.t3, source.weight.unwrap_or(1.0)))
            })
            .collect();

        if tensors.is_empty() {
            return AggregateResult { t3: T3Tensor::neutral(), aggregate_score: 0.5, source_count: 0 };
        }

        let t3 = match method {
            AggregateMethod::WeightedAverage => weighted_average(&tensors),
            AggregateMethod::Minimum => extremum(&tensors, f64::min),
            AggregateMethod::Maximum => extremum(&tensors, f64::max),
            AggregateMethod::Consensus => consensus_median(&tensors),
        };

        AggregateResult {
            t3,
            aggregate_score: self.context_weights.dot(&t3),
            source_count: tensors.len(),
        }
    }

    /// Apply temporal decay toward neutral (0.5) to `(entity_id, role)`.
    /// `half_life_days` must be `> 0`. `last_updated_ms` is set to `now_ms`
    /// so repeated calls at the same timestamp do not double-decay.
    pub fn decay(
        &mut self,
        entity_id: &str,
        role: &str,
        half_life_days: f64,
        now_ms: u64,
    ) -> Result<DecayResult, TrustError> {
        if half_life_days <= 0.0 {
            return Err(TrustError::InvalidInput);
        }

        let mut record = self
            .storage
            .get_trust_record(entity_id, role)?
            .unwrap_or_else(|| TrustRecord::neutral(entity_id.to_string(), role.to_string(), now_ms));

        let prev_t3 = record.t3;
        let days_since_update = (now_ms.saturating_sub(record.last_updated_ms)) as f64 / 86_400_000.0;
        let factor = pow2(-days_since_update / half_life_days);

        let decay_dim = |old: f64| 0.5 + (old - 0.5) * factor;
        record.t3 = T3Tensor {
            talent: decay_dim(record.t3.talent),
            training: decay_dim(record.t3.training),
            temperament: decay_dim(record.t3.temperament),
        };
        record.last_updated_ms = now_ms;

        let new_t3 = record.t3;
        self.storage.set_trust_record(entity_id, role, record)?;

        Ok(DecayResult { prev_t3, new_t3, days_since_update })
    }

    /// Record a witness link for `policy_entity_id` in the trust store:
    /// `subject` is the session id for [`PolicyWitnessKind::SessionWitnessesPolicy`]
    /// or the R6 record id for [`PolicyWitnessKind::PolicyWitnessesDecision`].
    pub fn witness_policy(
        &mut self,
        policy_entity_id: &str,
        subject: &str,
        kind: PolicyWitnessKind,
        decision: RuleDecision,
        success: Option<bool>,
        now_ms: u64,
    ) -> Result<PolicyWitnessLink, TrustError> {
        let link = PolicyWitnessLink {
            policy_entity_id: policy_entity_id.to_string(),
            subject: subject.to_string(),
            kind,
            decision,
            success,
            timestamp_ms: now_ms,
        };
        self.storage.append_policy_witness(policy_entity_id, link.clone())?;
        Ok(link)
    }

    /// All policy-witness links recorded for `policy_entity_id`, arrival
    /// order. A storage failure degrades to an empty list.
    pub fn policy_witnesses(&self, policy_entity_id: &str) -> Vec<PolicyWitnessLink> {
        degrade(self.storage.policy_witnesses_of(policy_entity_id))
    }
}

fn weighted_average(tensors: &[(T3Tensor, f64)]) -> T3Tensor {
    let total_weight: f64 = tensors.iter().map(|(_, w)| w).sum();
    if total_weight <= 0.0 {
        return T3Tensor::neutral();
    }
    let mut sum = T3Tensor { talent: 0.0, training: 0.0, temperament: 0.0 };
    for (t3, weight) in tensors {
        sum.talent += t3.talent * weight;
        sum.training += t3.training * weight;
        sum.temperament += t3.temperament * weight;
    }
    T3Tensor {
        talent: sum.talent / total_weight,
        training: sum.training / total_weight,
        temperament: sum.temperament / total_weight,
    }
}

fn extremum(tensors: &[(T3Tensor, f64)], pick: fn(f64, f64) -> f64) -> T3Tensor {
    let mut result = tensors[0].0;
    for (t3, _) in &tensors[1..] {
        result.talent = pick(result.talent, t3.talent);
        result.training = pick(result.training, t3.training);
        result.temperament = pick(result.temperament, t3.temperament);
    }
    result
}

fn consensus_median(tensors: &[(T3Tensor, f64)]) -> T3Tensor {
    let mut talents: Vec<f64> = tensors.iter().map(|(t, _)| t.talent).collect();
    let mut trainings: Vec<f64> = tensors.iter().map(|(t, _)| t.training).collect();
    let mut temperaments: Vec<f64> = tensors.iter().map(|(t, _)| t.temperament).collect();
    T3Tensor {
        talent: median(&mut talents),
        training: median(&mut trainings),
        temperament: median(&mut temperaments),
    }
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(core::cmp::Ordering::Equal));
    let len = values.len();
    if len % 2 == 1 {
        values[len / 2]
    } else {
        (values[len / 2 - 1] + values[len / 2]) / 2.0
    }
}

/// `2^x` via `exp(x * ln 2)`, needed because `f64::powf` requires `std`.
/// Good to float precision for the slowly varying exponents decay produces.
fn pow2(x: f64) -> f64 {
    const LN2: f64 = core::f64::consts::LN_2;
    exp_approx(x * LN2)
}

fn exp_approx(x: f64) -> f64 {
    const LN2: f64 = core::f64::consts::LN_2;
    // Range-reduce so the Taylor series converges quickly: x = k*ln2 + r.
    let k = (x / LN2).round();
    let r = x - k * LN2;
    let mut term = 1.0;
    let mut sum = 1.0;
    for n in 1..20 {
        term *= r / (n as f64);
        sum += term;
    }
    sum * 2f64.powi(k as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;

    fn engine() -> TrustEngine<InMemoryStorage> {
        TrustEngine::new(InMemoryStorage::new())
    }

    #[test]
    fn query_on_empty_store_returns_none() {
        let engine = engine();
        let result = engine.query("agent:claude", "reviewer");
        assert!(result.record.is_none());
        assert!(result.aggregate.is_none());
    }

    #[test]
    fn success_update_raises_affected_dimensions() {
        let mut engine = engine();
        let result = engine
            .update(
                "agent:claude",
                "reviewer",
                "review_pr",
                Outcome::Success,
                &[AffectedDimension::Talent, AffectedDimension::Training],
                0.1,
                0,
            )
            .unwrap();
        assert!((result.new_t3.talent - 0.6).abs() < 1e-9);
        assert!((result.new_t3.training - 0.6).abs() < 1e-9);
    }

    #[test]
    fn failure_update_lowers_affected_dimension() {
        let mut engine = engine();
        engine
            .update("agent:claude", "reviewer", "a", Outcome::Success, &[AffectedDimension::Training], 0.1, 0)
            .unwrap();
        let result = engine
            .update("agent:claude", "reviewer", "b", Outcome::Failure, &[AffectedDimension::Training], 0.1, 1)
            .unwrap();
        assert!((result.new_t3.training - 0.5).abs() < 1e-9);
    }

    #[test]
    fn partial_outcome_leaves_tensor_unchanged_but_logs_history() {
        let mut engine = engine();
        engine
            .update("e", "r", "a", Outcome::Partial, &[AffectedDimension::Talent], 0.1, 0)
            .unwrap();
        let record = engine.query("e", "r").record.unwrap();
        assert_eq!(record.t3.talent, 0.5);
        assert_eq!(record.history.len(), 1);
    }

    #[test]
    fn decay_moves_halfway_toward_neutral_after_one_half_life() {
        let mut engine = engine();
        engine
            .update(
                "agent:claude",
                "reviewer",
                "a",
                Outcome::Success,
                &[AffectedDimension::Talent],
                0.1,
                0,
            )
            .unwrap();
        let thirty_days_ms: u64 = 30 * 86_400_000;
        let result = engine.decay("agent:claude", "reviewer", 30.0, thirty_days_ms).unwrap();
        assert!((result.new_t3.talent - 0.55).abs() < 1e-6);
    }

    #[test]
    fn decay_rejects_zero_half_life() {
        let mut engine = engine();
        assert_eq!(engine.decay("e", "r", 0.0, 1000), Err(TrustError::InvalidInput));
    }

    #[test]
    fn consensus_aggregate_returns_median_of_five_sources() {
        let mut engine = engine();
        // Drive talent to the target values via one success/failure update
        // each, then read back through aggregate() rather than touching
        // storage directly.
        let deltas = [-0.3, -0.1, 0.0, 0.2, 0.4];
        for (idx, delta) in deltas.into_iter().enumerate() {
            let entity = alloc::format!("entity-{idx}");
            if delta > 0.0 {
                engine.update(&entity, "coder", "seed", Outcome::Success, &[AffectedDimension::Talent], delta, 0).unwrap();
            } else if delta < 0.0 {
                engine.update(&entity, "coder", "seed", Outcome::Failure, &[AffectedDimension::Talent], -delta, 0).unwrap();
            } else {
                engine.update(&entity, "coder", "seed", Outcome::Success, &[AffectedDimension::Talent], 0.1, 0).unwrap();
                engine.update(&entity, "coder", "seed", Outcome::Failure, &[AffectedDimension::Talent], 0.1, 1).unwrap();
            }
        }
        let sources: Vec<AggregateSource> = (0..5)
            .map(|idx| AggregateSource { entity_id: alloc::format!("entity-{idx}"), role: "coder".into(), weight: None })
            .collect();
        let result = engine.aggregate(&sources, AggregateMethod::Consensus);
        assert_eq!(result.source_count, 5);
        assert!((result.t3.talent - 0.5).abs() < 1e-6);
    }
}
