// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Trustcore Project Contributors

//! Shared data types used across all governance sub-systems.
//!
//! All types implement [`Clone`], [`Debug`], [`serde::Serialize`], and
//! [`serde::Deserialize`] so they can be serialised to JSON, stored, and
//! transmitted across WASM boundaries without additional conversion steps.

use alloc::string::String;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Linked Context Tokens (LCTs)
// ---------------------------------------------------------------------------

/// Position of an [`Lct`] in the identity hierarchy.
///
/// # Examples
///
/// ```rust
/// use trustcore_core::types::LctType;
/// assert_ne!(LctType::Root, LctType::Delegated);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LctType {
    /// A self-issued, non-delegated identity at the top of a chain.
    Root,
    /// A physical or virtual device identity.
    Device,
    /// A software component identity (e.g. a specific agent binary).
    Software,
    /// A short-lived identity scoped to one session.
    Session,
    /// An identity minted by delegation from a parent LCT.
    Delegated,
}

/// Hardware attestation kind bound to an [`Lct`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HardwareBindingKind {
    /// Trusted Platform Module.
    Tpm,
    /// CPU-backed secure enclave (e.g. SGX, SEV, Secure Enclave).
    SecureEnclave,
    /// FIDO2/WebAuthn authenticator.
    Fido,
    /// Software-only attestation (no dedicated hardware root of trust).
    Software,
}

/// A hardware attestation bound to an [`Lct`].
///
/// Once set on an LCT, a binding is append-only: [`IdentityStore::bind`]
/// fails with `AlreadyBound` on a second call. There is no rebind API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareBinding {
    /// Kind of attestation root.
    pub kind: HardwareBindingKind,
    /// Opaque device identifier supplied by the attesting hardware.
    pub device_id: String,
    /// Optional raw attestation blob (vendor-specific encoding).
    pub attestation: Option<Vec<u8>>,
    /// Unix epoch milliseconds at which the binding was recorded.
    pub bound_at_ms: u64,
}

/// Delegation metadata present only on LCTs of type [`LctType::Delegated`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegationInfo {
    /// Identifier of the LCT this token was delegated from.
    pub parent_id: String,
    /// Capability strings granted to the delegated token.
    pub scope: Vec<String>,
    /// Free-form name/value constraints narrowing the delegation.
    pub constraints: Vec<(String, String)>,
    /// Unix epoch milliseconds at which the delegation was minted.
    pub delegated_at_ms: u64,
}

/// Revocation state carried on every [`Lct`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RevocationState {
    /// Whether the token has been revoked.
    pub revoked: bool,
    /// Unix epoch milliseconds at which the revocation occurred.
    pub revoked_at_ms: Option<u64>,
    /// Human-readable reason supplied at revocation time.
    pub reason: Option<String>,
}

/// A Linked Context Token: a signed, content-addressed identity object.
///
/// See the module-level documentation in [`crate::identity`] for lifecycle
/// and invariants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lct {
    /// Stable content-hash identifier, independent of the URI.
    pub id: String,
    /// Opaque URI of the form `lct://<component>:<instance>:<role>@<network>`.
    pub uri: String,
    /// Position in the identity hierarchy.
    pub lct_type: LctType,
    /// Identifier of the entity this token represents.
    pub subject: String,
    /// Identifier of the party that issued this token.
    pub issuer: String,
    /// Ed25519 public key bytes for this token.
    pub public_key: [u8; 32],
    /// Unix epoch milliseconds at which the token was issued.
    pub issued_at_ms: u64,
    /// Optional Unix epoch milliseconds after which the token expires.
    pub expires_at_ms: Option<u64>,
    /// Present only when [`Lct::lct_type`] is [`LctType::Delegated`].
    pub delegation: Option<DelegationInfo>,
    /// Hardware binding, if one has been recorded.
    pub hardware_binding: Option<HardwareBinding>,
    /// Current revocation state.
    pub revocation: RevocationState,
    /// Ed25519 signature over the canonical encoding of the fields above.
    #[serde(with = "serde_big_array::BigArray")]
    pub signature: [u8; 64],
}

/// Outcome of [`IdentityStore::verify`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyResult {
    /// `true` iff every check in the verification chain passed.
    pub valid: bool,
    /// All failure kinds observed, in evaluation order.
    pub errors: Vec<String>,
}

/// A signed attestation by one LCT about another LCT's action or state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WitnessRecord {
    /// Unique identifier for this witness record.
    pub id: String,
    /// LCT identifier of the subject being witnessed.
    pub subject_lct: String,
    /// LCT identifier of the witnessing party.
    pub witness_lct: String,
    /// Free-form label describing what was witnessed.
    pub action: String,
    /// Unix epoch milliseconds at which the witness was recorded.
    pub timestamp_ms: u64,
    /// Free-form name/value metadata attached to the witness.
    pub metadata: Vec<(String, String)>,
    /// Ed25519 signature by the witness over `(subject_lct, witness_lct,
    /// action, timestamp_ms, metadata)`.
    #[serde(with = "serde_big_array::BigArray")]
    pub signature: [u8; 64],
}

/// Direction of a policy-witness link (see [`PolicyWitnessLink`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyWitnessKind {
    /// The session observed the policy entity that governed its dispatch.
    SessionWitnessesPolicy,
    /// The policy entity observed the decision it issued.
    PolicyWitnessesDecision,
}

/// A witness link between a policy entity and the session or R6 record it
/// governed, recorded in the trust store rather than the identity witness
/// sequence (policy entities are not LCTs).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyWitnessLink {
    /// The policy entity being witnessed or doing the witnessing.
    pub policy_entity_id: String,
    /// Session id (`session_witnesses_policy`) or R6 record id
    /// (`policy_witnesses_decision`) this link is about.
    pub subject: String,
    /// Which direction this link records.
    pub kind: PolicyWitnessKind,
    /// The decision rendered for the witnessed action.
    pub decision: crate::policy::RuleDecision,
    /// Whether the witnessed action ultimately succeeded, if known.
    pub success: Option<bool>,
    /// Unix epoch milliseconds at which the link was recorded.
    pub timestamp_ms: u64,
}

/// Result of [`IdentityStore::chain`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChainResult {
    /// Witness records attached to the queried LCT, arrival order.
    pub witnesses: Vec<WitnessRecord>,
    /// Delegation ancestry, nearest parent first, ending at a root.
    pub delegation_chain: Vec<String>,
}

/// Filter used to narrow the results of [`IdentityStore::query`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LctFilter {
    /// If set, only return LCTs whose subject contains this substring.
    pub subject_contains: Option<String>,
    /// If set, only return LCTs of this type.
    pub lct_type: Option<LctType>,
    /// If set, only return LCTs with this revocation state.
    pub revoked: Option<bool>,
    /// If set, limit the number of returned tokens.
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// T3 / V3 trust tensors
// ---------------------------------------------------------------------------

/// Bounded three-dimensional trust tensor: talent, training, temperament.
///
/// Every dimension is clamped to `[0, 1]` before it is ever stored.
///
/// # Examples
///
/// ```rust
/// use trustcore_core::types::T3Tensor;
/// let neutral = T3Tensor::neutral();
/// assert_eq!(neutral.talent, 0.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct T3Tensor {
    /// Raw capability to perform the task class.
    pub talent: f64,
    /// Learned reliability accumulated from outcomes.
    pub training: f64,
    /// Alignment with the role's intended behaviour.
    pub temperament: f64,
}

impl T3Tensor {
    /// The neutral tensor, all dimensions at `0.5`.
    pub fn neutral() -> Self {
        T3Tensor { talent: 0.5, training: 0.5, temperament: 0.5 }
    }

    /// Dimension accessor by [`AffectedDimension`], used by the update loop.
    pub fn get(&self, dim: AffectedDimension) -> f64 {
        match dim {
            AffectedDimension::Talent => self.talent,
            AffectedDimension::Training => self.training,
            AffectedDimension::Temperament => self.temperament,
        }
    }

    /// Dimension setter by [`AffectedDimension`], used by the update loop.
    pub fn set(&mut self, dim: AffectedDimension, value: f64) {
        match dim {
            AffectedDimension::Talent => self.talent = value,
            AffectedDimension::Training => self.training = value,
            AffectedDimension::Temperament => self.temperament = value,
        }
    }
}

/// Fixed three-weight context vector used to reduce a [`T3Tensor`] to a
/// single aggregate score via dot product. Weights should sum to ~1 but this
/// is not enforced at construction — callers own that invariant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ContextWeights {
    /// Weight applied to [`T3Tensor::talent`].
    pub talent: f64,
    /// Weight applied to [`T3Tensor::training`].
    pub training: f64,
    /// Weight applied to [`T3Tensor::temperament`].
    pub temperament: f64,
}

impl Default for ContextWeights {
    fn default() -> Self {
        ContextWeights { talent: 1.0 / 3.0, training: 1.0 / 3.0, temperament: 1.0 / 3.0 }
    }
}

impl ContextWeights {
    /// Dot product of a [`T3Tensor`] with these weights.
    pub fn dot(&self, t3: &T3Tensor) -> f64 {
        t3.talent * self.talent + t3.training * self.training + t3.temperament * self.temperament
    }
}

/// Six-dimensional bounded value tensor (V3-as-value).
///
/// Distinct from [`Dynamics`] (V3-as-dynamics) per the governing design
/// decision recorded in `DESIGN.md`: the two are separate entities, not two
/// views of the same data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueTensor {
    /// Raw throughput/availability dimension.
    pub energy: f64,
    /// Direct contribution to the role's objective.
    pub contribution: f64,
    /// Care taken of shared resources.
    pub stewardship: f64,
    /// Standing within the collaboration graph.
    pub network: f64,
    /// Externally observed reputation.
    pub reputation: f64,
    /// Consistency of contribution over time.
    pub temporal: f64,
}

impl ValueTensor {
    /// The neutral tensor, all dimensions at `0.5`.
    pub fn neutral() -> Self {
        ValueTensor {
            energy: 0.5,
            contribution: 0.5,
            stewardship: 0.5,
            network: 0.5,
            reputation: 0.5,
            temporal: 0.5,
        }
    }
}

/// Which [`T3Tensor`] dimensions an [`Outcome`] affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AffectedDimension {
    /// [`T3Tensor::talent`].
    Talent,
    /// [`T3Tensor::training`].
    Training,
    /// [`T3Tensor::temperament`].
    Temperament,
}

/// The result observed for a single trust-affecting action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The action succeeded; affected dimensions move up.
    Success,
    /// The action failed; affected dimensions move down.
    Failure,
    /// Neither a clear success nor failure; no movement, history still logs.
    Partial,
}

impl Outcome {
    /// Sign applied to the update magnitude: `+1`/`-1`/`0`.
    pub fn direction(self) -> f64 {
        match self {
            Outcome::Success => 1.0,
            Outcome::Failure => -1.0,
            Outcome::Partial => 0.0,
        }
    }
}

/// Per-dimension exponential-moving-average velocity and surprise-driven
/// volatility, tracked alongside a [`T3Tensor`] (V3-as-dynamics).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dynamics {
    /// Velocity of [`T3Tensor::talent`].
    pub talent_velocity: f64,
    /// Volatility of [`T3Tensor::talent`], bounded `[0, 1]`.
    pub talent_volatility: f64,
    /// Velocity of [`T3Tensor::training`].
    pub training_velocity: f64,
    /// Volatility of [`T3Tensor::training`], bounded `[0, 1]`.
    pub training_volatility: f64,
    /// Velocity of [`T3Tensor::temperament`].
    pub temperament_velocity: f64,
    /// Volatility of [`T3Tensor::temperament`], bounded `[0, 1]`.
    pub temperament_volatility: f64,
}

impl Dynamics {
    fn velocity(&self, dim: AffectedDimension) -> f64 {
        match dim {
            AffectedDimension::Talent => self.talent_velocity,
            AffectedDimension::Training => self.training_velocity,
            AffectedDimension::Temperament => self.temperament_velocity,
        }
    }

    fn set_velocity(&mut self, dim: AffectedDimension, value: f64) {
        match dim {
            AffectedDimension::Talent => self.talent_velocity = value,
            AffectedDimension::Training => self.training_velocity = value,
            AffectedDimension::Temperament => self.temperament_velocity = value,
        }
    }

    fn set_volatility(&mut self, dim: AffectedDimension, value: f64) {
        match dim {
            AffectedDimension::Talent => self.talent_volatility = value,
            AffectedDimension::Training => self.training_volatility = value,
            AffectedDimension::Temperament => self.temperament_volatility = value,
        }
    }

    /// Apply one outcome's worth of velocity/volatility update to `dim`,
    /// given the delta actually applied to the tensor this update.
    pub(crate) fn apply_delta(&mut self, dim: AffectedDimension, actual_delta: f64) {
        let old_velocity = self.velocity(dim);
        let new_velocity = 0.7 * old_velocity + 0.3 * actual_delta;
        let surprise = (actual_delta - old_velocity).abs();
        let old_volatility = match dim {
            AffectedDimension::Talent => self.talent_volatility,
            AffectedDimension::Training => self.training_volatility,
            AffectedDimension::Temperament => self.temperament_volatility,
        };
        let new_volatility = (0.8 * old_volatility + 0.4 * surprise).clamp(0.0, 1.0);
        self.set_velocity(dim, new_velocity);
        self.set_volatility(dim, new_volatility);
    }
}

/// One entry in a [`TrustRecord`]'s append-only history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustHistoryEntry {
    /// Unix epoch milliseconds at which this entry was appended.
    pub timestamp_ms: u64,
    /// Snapshot of the T3 tensor immediately after this entry's effect.
    pub t3_snapshot: T3Tensor,
    /// Free-form label for the action that produced this entry.
    pub action: String,
    /// The outcome recorded, if this entry came from [`TrustEngine::update`].
    pub outcome: Option<Outcome>,
}

/// Per-`(entity_id, role)` trust state.
///
/// Created lazily on first query; never deleted, only decayed toward
/// neutral.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustRecord {
    /// Stable identifier of the entity this record tracks.
    pub entity_id: String,
    /// Role under which this tensor applies.
    pub role: String,
    /// Current T3 tensor.
    pub t3: T3Tensor,
    /// Current V3 value tensor.
    pub v3: ValueTensor,
    /// Current velocity/volatility dynamics.
    pub dynamics: Dynamics,
    /// Unix epoch milliseconds of the most recent mutation (update or decay).
    pub last_updated_ms: u64,
    /// Number of [`TrustEngine::update`] calls applied to this record.
    pub update_count: u64,
    /// Append-only history of every mutation.
    pub history: Vec<TrustHistoryEntry>,
}

impl TrustRecord {
    /// A freshly created, neutral record for `(entity_id, role)`.
    pub fn neutral(entity_id: String, role: String, now_ms: u64) -> Self {
        TrustRecord {
            entity_id,
            role,
            t3: T3Tensor::neutral(),
            v3: ValueTensor::neutral(),
            dynamics: Dynamics::default(),
            last_updated_ms: now_ms,
            update_count: 0,
            history: Vec::new(),
        }
    }
}

/// Result of [`TrustEngine::query`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustQueryResult {
    /// The stored record, or `None` if nothing has been recorded yet.
    pub record: Option<TrustRecord>,
    /// `dot(t3, context_weights)`, or `None` when `record` is `None`.
    pub aggregate: Option<f64>,
}

/// Result of [`TrustEngine::update`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustUpdateResult {
    /// Tensor before this update.
    pub prev_t3: T3Tensor,
    /// Tensor after this update.
    pub new_t3: T3Tensor,
    /// Dynamics before this update.
    pub prev_dynamics: Dynamics,
    /// Dynamics after this update.
    pub new_dynamics: Dynamics,
}

/// Result of [`TrustEngine::decay`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecayResult {
    /// Tensor before decay was applied.
    pub prev_t3: T3Tensor,
    /// Tensor after decay was applied.
    pub new_t3: T3Tensor,
    /// Whole days elapsed since `last_updated_ms`, used in the decay formula.
    pub days_since_update: f64,
}

/// Result of [`TrustEngine::compare`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareResult {
    /// `e2.talent - e1.talent`.
    pub talent_delta: f64,
    /// `e2.training - e1.training`.
    pub training_delta: f64,
    /// `e2.temperament - e1.temperament`.
    pub temperament_delta: f64,
    /// `aggregate(e2) - aggregate(e1)`.
    pub aggregate_delta: f64,
    /// Identifier of the entity with the higher aggregate score, `None` on
    /// an exact tie.
    pub more_reliable: Option<String>,
}

/// Aggregation strategy for [`TrustEngine::aggregate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateMethod {
    /// Weight-normalized mean of available sources.
    WeightedAverage,
    /// Per-dimension minimum across available sources.
    Minimum,
    /// Per-dimension maximum across available sources.
    Maximum,
    /// Per-dimension median across available sources.
    Consensus,
}

/// A single source fed into [`TrustEngine::aggregate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateSource {
    /// Entity to pull a [`TrustRecord`] for.
    pub entity_id: String,
    /// Role to pull a [`TrustRecord`] for.
    pub role: String,
    /// Relative weight; only meaningful for
    /// [`AggregateMethod::WeightedAverage`]. Defaults to `1.0`.
    pub weight: Option<f64>,
}

/// Result of [`TrustEngine::aggregate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateResult {
    /// Combined tensor.
    pub t3: T3Tensor,
    /// `dot(t3, context_weights)` for the combined tensor.
    pub aggregate_score: f64,
    /// Number of sources that had a stored record.
    pub source_count: usize,
}

// ---------------------------------------------------------------------------
// R6 governance ledger record
// ---------------------------------------------------------------------------

/// Terminal status of an audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// The action completed as intended.
    Success,
    /// The action was attempted and failed.
    Error,
    /// The action was not attempted; policy or rate limiting denied it.
    Denied,
    /// The action partially completed.
    Partial,
}

/// The "Rules" element of an R6 record: which policy was in force.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rules {
    /// Name of the preset in force, if any.
    pub preset_name: Option<String>,
    /// Content-addressed id of the policy entity evaluated, if any.
    pub policy_entity_id: Option<String>,
    /// Whether the policy was evaluated in enforcing mode.
    pub enforce_flag: bool,
}

/// The "Role" element of an R6 record: the acting identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    /// LCT identifier of the acting identity.
    pub lct: String,
    /// Human-readable label for the acting agent/session.
    pub active_agent: String,
}

/// The "Request" element of an R6 record: what was asked for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Name of the tool/action invoked.
    pub name: String,
    /// Category classifying the request (e.g. "command", "file", "http").
    pub category: String,
    /// Target of the request (e.g. a path, command line, or URL).
    pub target: String,
}

/// The "Reference" element of an R6 record: chain linkage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    /// `provenance_hash` of the preceding record, or the session seed hash
    /// for the first record in a session.
    pub prev_record_hash: String,
    /// `record_id` of the preceding record, if any.
    pub prev_r6_id: Option<String>,
}

/// The "Resource" element of an R6 record: estimated cost.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Resource {
    /// Estimated cost of the action, in the session's budget unit.
    pub estimated_cost: Option<f64>,
}

/// The "Result" element of an R6 record: what actually happened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultInfo {
    /// Terminal status of the action.
    pub status: ActionStatus,
    /// Content hash of the action's output, if one was produced.
    pub output_hash: Option<[u8; 32]>,
    /// Wall-clock duration of the action, in milliseconds.
    pub duration_ms: u64,
}

/// One immutable, hash-chained audit record: the R6 action framework
/// (Rules + Role + Request + Reference + Resource → Result).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct R6Record {
    /// Content-hash identifier of this record.
    pub record_id: String,
    /// Identifier of the originating request, stable across retries.
    pub r6_request_id: String,
    /// Session this record belongs to.
    pub session_id: String,
    /// Monotonically increasing, 1-based index within the session.
    pub action_index: u64,
    /// Unix epoch milliseconds at which this record was appended.
    pub timestamp_ms: u64,
    /// Tool name, duplicated from `request.name` for fast filtering.
    pub tool_name: String,
    /// Category, duplicated from `request.category` for fast filtering.
    pub category: String,
    /// Target, duplicated from `request.target` for fast filtering.
    pub target: String,
    /// Rules element.
    pub rules: Rules,
    /// Role element.
    pub role: Role,
    /// Request element.
    pub request: Request,
    /// Reference element.
    pub reference: Reference,
    /// Resource element.
    pub resource: Resource,
    /// Result element.
    pub result: ResultInfo,
    /// `SHA256(canonical(record fields) || prev_record_hash)`.
    pub provenance_hash: String,
}

/// Fields supplied by a caller to [`GovernanceLedger::append`]; the ledger
/// fills in `record_id`, `action_index`, `timestamp_ms`, `reference`, and
/// `provenance_hash`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct R6Fields {
    /// Caller-supplied request identifier, stable across retries.
    pub r6_request_id: String,
    /// Role element.
    pub role: Role,
    /// Request element.
    pub request: Request,
    /// Resource element.
    pub resource: Resource,
}

/// Filter used to narrow the results of [`GovernanceLedger::query`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditFilter {
    /// If set, only return records from this session.
    pub session_id: Option<String>,
    /// If set, only return records with this exact tool name.
    pub tool: Option<String>,
    /// If set, only return records with this exact category.
    pub category: Option<String>,
    /// If set, only return records with this status.
    pub status: Option<ActionStatus>,
    /// If set, only return records whose target contains this substring.
    pub target: Option<String>,
    /// If set, only return records at or after this Unix epoch millisecond.
    pub since_ms: Option<u64>,
    /// If set, limit the number of returned records.
    pub limit: Option<usize>,
}

/// Page of [`R6Record`]s returned from a query.
pub type AuditPage = Vec<R6Record>;

/// Result of [`GovernanceLedger::verify_chain`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyChainResult {
    /// `true` iff every record's linkage and monotonicity checks pass.
    pub valid: bool,
    /// The `action_index` of the first record that failed a check, if any.
    pub first_bad_index: Option<u64>,
}

/// Result of [`RateLimiter::check`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitResult {
    /// `true` iff the window has headroom for one more action.
    pub allowed: bool,
    /// Remaining headroom before the window is exhausted.
    pub remaining: u32,
    /// Unix epoch milliseconds at which the oldest entry will age out.
    pub reset_at_ms: u64,
}

/// Aggregated counts returned by [`GovernanceLedger::stats`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerStats {
    /// Total records observed.
    pub total_records: u64,
    /// Count per exact tool name.
    pub by_tool: Vec<(String, u64)>,
    /// Count per exact category.
    pub by_category: Vec<(String, u64)>,
    /// Count per [`ActionStatus`].
    pub by_status: Vec<(ActionStatus, u64)>,
    /// Duration percentiles in milliseconds: (p50, p90, p99).
    pub duration_percentiles_ms: (u64, u64, u64),
}

/// A single tool's breakdown within [`LedgerReport`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolReport {
    /// Tool name.
    pub tool: String,
    /// Number of invocations observed.
    pub count: u64,
    /// Fraction of invocations with [`ActionStatus::Success`], `[0, 1]`.
    pub success_rate: f64,
    /// Mean duration across all invocations of this tool.
    pub average_duration_ms: f64,
}

/// A single minute's activity within [`LedgerReport::timeline`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineBucket {
    /// Unix epoch milliseconds truncated to the minute boundary.
    pub minute_start_ms: u64,
    /// Number of records appended within this minute.
    pub count: u64,
}

/// Structured, purely derived report produced by [`GovernanceLedger::report`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerReport {
    /// Per-tool breakdown.
    pub tools: Vec<ToolReport>,
    /// Count per category.
    pub by_category: Vec<(String, u64)>,
    /// Count per policy entity id observed.
    pub by_policy_entity: Vec<(String, u64)>,
    /// Most frequent error targets, highest count first.
    pub top_errors: Vec<(String, u64)>,
    /// Per-minute activity, chronological order.
    pub timeline: Vec<TimelineBucket>,
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// A bounded sequence of actions with its own hash-linked audit chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Stable session identifier.
    pub session_id: String,
    /// Project label the session belongs to.
    pub project: String,
    /// Unix epoch milliseconds at which the session was opened.
    pub started_at_ms: u64,
    /// Hex-encoded seed hash anchoring the chain; used as the first record's
    /// `prev_record_hash`.
    pub seed_hash: String,
    /// Soft ATP-style action budget. Exceeding it surfaces as a `denied`
    /// decision rather than an error.
    pub action_budget: Option<u64>,
    /// Count of actions appended so far.
    pub actions_taken: u64,
    /// Policy entity currently in force for new appends, if any.
    pub active_policy_entity_id: Option<String>,
    /// Hash of the most recently appended record, or `seed_hash` if empty.
    pub last_hash: String,
    /// Unix epoch milliseconds of the most recently appended record's
    /// timestamp, used to enforce non-decreasing clocks.
    pub last_timestamp_ms: u64,
    /// Set when a corrupt-chain condition has been detected; the session
    /// refuses further appends until an operator verifies/repairs it.
    pub quarantined: bool,
}
