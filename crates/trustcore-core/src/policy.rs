// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Trustcore Project Contributors

//! Policy engine (C5): presets, rules, and evaluation.
//!
//! Policy entities are immutable and content-addressed: registering the
//! same rule set twice yields the same `entity_id`, and any change mints a
//! new entity rather than mutating one in place.
//!
//! `POLICY_RULE_SCHEMA_VERSION` is folded into the content hash so a future
//! grammar change mints distinct entity ids even for textually identical
//! rules — resolves the "rule schema not versioned" open question.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::crypto;
use crate::storage::{PolicyStorage, StorageError};

/// Version of the rule-matching grammar below. Bump on any change to
/// [`RuleMatcher`]'s semantics; the entity id hash folds this in, so a
/// grammar change always mints distinct entities even for textually
/// identical rule sets.
pub const POLICY_RULE_SCHEMA_VERSION: u16 = 1;

/// A single match predicate over one of `(tool, category, target)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Pattern {
    /// Exact string equality.
    Exact(String),
    /// Substring containment.
    Contains(String),
    /// Simple glob with `*` (any run of characters) and `?` (one character).
    Glob(String),
}

impl Pattern {
    fn matches(&self, value: &str) -> bool {
        match self {
            Pattern::Exact(expected) => value == expected,
            Pattern::Contains(needle) => value.contains(needle.as_str()),
            Pattern::Glob(pattern) => glob_match(pattern, value),
        }
    }
}

fn glob_match(pattern: &str, value: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let value: Vec<char> = value.chars().collect();
    glob_match_rec(&pattern, &value)
}

fn glob_match_rec(pattern: &[char], value: &[char]) -> bool {
    match pattern.first() {
        None => value.is_empty(),
        Some('*') => {
            glob_match_rec(&pattern[1..], value)
                || (!value.is_empty() && glob_match_rec(pattern, &value[1..]))
        }
        Some('?') => !value.is_empty() && glob_match_rec(&pattern[1..], &value[1..]),
        Some(expected) => {
            !value.is_empty() && value[0] == *expected && glob_match_rec(&pattern[1..], &value[1..])
        }
    }
}

/// Matcher over the three fields an R6 request carries: `tool`, `category`,
/// `target`. Every populated field must match for the rule to fire; an
/// absent field matches anything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleMatcher {
    /// Match against the request's tool name.
    pub tool: Option<Pattern>,
    /// Match against the request's category.
    pub category: Option<Pattern>,
    /// Match against the request's target.
    pub target: Option<Pattern>,
}

impl RuleMatcher {
    fn matches(&self, tool: &str, category: &str, target: &str) -> bool {
        self.tool.as_ref().map(|p| p.matches(tool)).unwrap_or(true)
            && self.category.as_ref().map(|p| p.matches(category)).unwrap_or(true)
            && self.target.as_ref().map(|p| p.matches(target)).unwrap_or(true)
    }
}

/// Decision a single rule or the policy default can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleDecision {
    /// Permit the action.
    Allow,
    /// Refuse the action outright.
    Deny,
    /// Permit but flag for review (advisory).
    Warn,
}

/// One declarative rule in a [`PolicyEntity`]'s rule set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Predicate this rule fires on.
    pub matcher: RuleMatcher,
    /// Decision rendered when `matcher` matches.
    pub decision: RuleDecision,
    /// Human-readable reason recorded alongside the decision.
    pub reason: String,
}

/// Named catalogue of preset rule sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyPreset {
    /// Allow everything; enforcement is off.
    Permissive,
    /// Allow by default; deny destructive/secret-touching actions; warn on
    /// network egress; enforcing.
    Safety,
    /// Deny by default; allow only a narrow read-only whitelist; enforcing.
    Strict,
    /// Same matchers as `safety`, but `enforce = false` — warnings are
    /// recorded, nothing is blocked.
    AuditOnly,
}

impl PolicyPreset {
    /// The rule set and default decision for this preset.
    pub fn rule_set(self) -> (Vec<PolicyRule>, RuleDecision, bool) {
        match self {
            PolicyPreset::Permissive => (Vec::new(), RuleDecision::Allow, false),
            PolicyPreset::Safety => (safety_rules(), RuleDecision::Allow, true),
            PolicyPreset::Strict => (strict_rules(), RuleDecision::Deny, true),
            PolicyPreset::AuditOnly => (safety_rules(), RuleDecision::Allow, false),
        }
    }
}

fn safety_rules() -> Vec<PolicyRule> {
    alloc::vec![
        PolicyRule {
            matcher: RuleMatcher {
                tool: Some(Pattern::Exact("Bash".to_string())),
                category: Some(Pattern::Exact("destructive".to_string())),
                target: None,
            },
            decision: RuleDecision::Deny,
            reason: "destructive bash command".to_string(),
        },
        PolicyRule {
            matcher: RuleMatcher {
                tool: None,
                category: Some(Pattern::Contains("secrets".to_string())),
                target: None,
            },
            decision: RuleDecision::Deny,
            reason: "secrets read/write".to_string(),
        },
        PolicyRule {
            matcher: RuleMatcher {
                tool: Some(Pattern::Exact("Net".to_string())),
                category: None,
                target: None,
            },
            decision: RuleDecision::Warn,
            reason: "network egress".to_string(),
        },
    ]
}

fn strict_rules() -> Vec<PolicyRule> {
    ["Read", "Glob", "Grep", "TodoWrite"]
        .into_iter()
        .map(|tool| PolicyRule {
            matcher: RuleMatcher { tool: Some(Pattern::Exact(tool.to_string())), category: None, target: None },
            decision: RuleDecision::Allow,
            reason: format!("{tool} is on the whitelist"),
        })
        .collect()
}

/// A content-hashed, immutable rule set: `policy:<name>:<version>:<hash>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyEntity {
    /// `policy:<name>:<version>:<content_hash>`.
    pub entity_id: String,
    /// Preset this entity was registered from, if any (custom rule sets
    /// have no preset).
    pub preset: Option<PolicyPreset>,
    /// Ordered rule set; first match wins.
    pub rule_set: Vec<PolicyRule>,
    /// Decision rendered when no rule matches.
    pub default_decision: RuleDecision,
    /// Whether this entity evaluates in enforcing mode. When `false`, a
    /// `deny` outcome is downgraded to `warn` (advisory mode); the original
    /// decision is still recorded.
    pub enforce: bool,
    /// Unix epoch milliseconds at which this entity was registered.
    pub created_at_ms: u64,
}

#[derive(Serialize)]
struct PolicyContent<'a> {
    schema_version: u16,
    name: &'a str,
    rule_set: &'a [PolicyRule],
    default_decision: RuleDecision,
    enforce: bool,
}

/// Failure taxonomy for policy engine operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// Referenced policy entity does not exist.
    NotFound,
    /// A rule's matcher referenced a predicate the evaluator could not
    /// resolve.
    MatcherError,
    /// The storage backend failed to read or write.
    Storage(StorageError),
}

impl core::fmt::Display for PolicyError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PolicyError::NotFound => write!(f, "policy entity not found"),
            PolicyError::MatcherError => write!(f, "policy error"),
            PolicyError::Storage(inner) => write!(f, "{}", inner),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PolicyError {}

impl From<StorageError> for PolicyError {
    fn from(error: StorageError) -> Self {
        PolicyError::Storage(error)
    }
}

/// Outcome of [`PolicyEngine::evaluate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyEvaluation {
    /// Final decision after advisory-mode downgrade is applied.
    pub decision: RuleDecision,
    /// Human-readable reason.
    pub reason: String,
    /// The decision that would apply in enforcing mode, before any
    /// advisory-mode downgrade is applied.
    pub raw_decision: RuleDecision,
}

/// Manager for policy entities, generic over any [`PolicyStorage`] backend.
pub struct PolicyEngine<S: PolicyStorage> {
    storage: S,
}

impl<S: PolicyStorage> PolicyEngine<S> {
    /// Construct a new [`PolicyEngine`] over `storage`.
    pub fn new(storage: S) -> Self {
        PolicyEngine { storage }
    }

    /// Borrow the underlying storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Register a policy entity from a named preset. Registering the same
    /// preset twice yields the same `entity_id`.
    pub fn register_preset(&mut self, name: &str, preset: PolicyPreset, now_ms: u64) -> Result<PolicyEntity, PolicyError> {
        let (rule_set, default_decision, enforce) = preset.rule_set();
        let entity = self.build_entity(name, Some(preset), rule_set, default_decision, enforce, now_ms);
        self.storage.set_policy(&entity.entity_id, entity.clone())?;
        Ok(entity)
    }

    /// Register a policy entity from a custom rule set.
    pub fn register_custom(
        &mut self,
        name: &str,
        rule_set: Vec<PolicyRule>,
        default_decision: RuleDecision,
        enforce: bool,
        now_ms: u64,
    ) -> Result<PolicyEntity, PolicyError> {
        let entity = self.build_entity(name, None, rule_set, default_decision, enforce, now_ms);
        self.storage.set_policy(&entity.entity_id, entity.clone())?;
        Ok(entity)
    }

    fn build_entity(
        &self,
        name: &str,
        preset: Option<PolicyPreset>,
        rule_set: Vec<PolicyRule>,
        default_decision: RuleDecision,
        enforce: bool,
        now_ms: u64,
    ) -> PolicyEntity {
        let content = PolicyContent {
            schema_version: POLICY_RULE_SCHEMA_VERSION,
            name,
            rule_set: &rule_set,
            default_decision,
            enforce,
        };
        let bytes = crypto::canonical_encode(&content).unwrap_or_default();
        let hash = crypto::hex_encode(&crypto::content_hash(&bytes));
        let entity_id = format!("policy:{}:{}:{}", name, POLICY_RULE_SCHEMA_VERSION, hash);
        PolicyEntity { entity_id, preset, rule_set, default_decision, enforce, created_at_ms: now_ms }
    }

    /// Evaluate `(tool, category, target)` against `policy_entity_id`.
    ///
    /// Deterministic: for the same policy entity id and inputs, the
    /// decision is bit-identical. On a matcher error, fails closed (`deny`)
    /// in enforcing mode and fails open with a warning in advisory mode.
    pub fn evaluate(
        &self,
        policy_entity_id: &str,
        tool: &str,
        category: &str,
        target: &str,
    ) -> Result<PolicyEvaluation, PolicyError> {
        #[cfg(feature = "std")]
        let span = tracing::info_span!(
            "policy_evaluate",
            policy_entity_id = %policy_entity_id,
            tool = %tool,
            decision = tracing::field::Empty,
            latency_ms = tracing::field::Empty
        );
        #[cfg(feature = "std")]
        let _guard = span.enter();
        #[cfg(feature = "std")]
        let start = std::time::Instant::now();

        let evaluation = self.evaluate_inner(policy_entity_id, tool, category, target);

        #[cfg(feature = "std")]
        {
            let elapsed = start.elapsed().as_millis() as u64;
            span.record("latency_ms", elapsed);
            match &evaluation {
                Ok(evaluation) => {
                    span.record("decision", tracing::field::debug(evaluation.decision));
                    tracing::debug!("policy evaluated");
                }
                Err(error) => tracing::error!(error = %error, "policy evaluation failed"),
            }
        }

        evaluation
    }

    fn evaluate_inner(
        &self,
        policy_entity_id: &str,
        tool: &str,
        category: &str,
        target: &str,
    ) -> Result<PolicyEvaluation, PolicyError> {
        let entity = self.storage.get_policy(policy_entity_id)?.ok_or(PolicyError::NotFound)?;

        let mut raw_decision = entity.default_decision;
        let mut reason = "default".to_string();
        for rule in &entity.rule_set {
            if rule.matcher.matches(tool, category, target) {
                raw_decision = rule.decision;
                reason = rule.reason.clone();
                break;
            }
        }

        let decision = if raw_decision == RuleDecision::Deny && !entity.enforce {
            RuleDecision::Warn
        } else {
            raw_decision
        };

        Ok(PolicyEvaluation { decision, reason, raw_decision })
    }

    /// Fail-closed/fail-open evaluation for a matcher error encountered by
    /// a caller outside [`PolicyEngine::evaluate`] (e.g. an upstream
    /// predicate resolver). Exposed so `GovernanceLedger::append` can apply
    /// the same semantics without duplicating the enforce-flag branch.
    pub fn matcher_error_decision(enforce: bool) -> PolicyEvaluation {
        if enforce {
            PolicyEvaluation {
                decision: RuleDecision::Deny,
                reason: "policy error".to_string(),
                raw_decision: RuleDecision::Deny,
            }
        } else {
            PolicyEvaluation {
                decision: RuleDecision::Warn,
                reason: "policy error".to_string(),
                raw_decision: RuleDecision::Deny,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;

    fn engine() -> PolicyEngine<InMemoryStorage> {
        PolicyEngine::new(InMemoryStorage::new())
    }

    #[test]
    fn same_preset_registered_twice_yields_same_entity_id() {
        let mut engine = engine();
        let a = engine.register_preset("safety", PolicyPreset::Safety, 0).unwrap();
        let b = engine.register_preset("safety", PolicyPreset::Safety, 1_000).unwrap();
        assert_eq!(a.entity_id, b.entity_id);
    }

    #[test]
    fn safety_preset_denies_destructive_bash() {
        let mut engine = engine();
        let entity = engine.register_preset("safety", PolicyPreset::Safety, 0).unwrap();
        let result = engine.evaluate(&entity.entity_id, "Bash", "destructive", "rm -rf /").unwrap();
        assert_eq!(result.decision, RuleDecision::Deny);
        assert!(result.reason.contains("destructive"));
    }

    #[test]
    fn safety_preset_allows_default_read() {
        let mut engine = engine();
        let entity = engine.register_preset("safety", PolicyPreset::Safety, 0).unwrap();
        let result = engine.evaluate(&entity.entity_id, "Read", "file", "README.md").unwrap();
        assert_eq!(result.decision, RuleDecision::Allow);
        assert_eq!(result.reason, "default");
    }

    #[test]
    fn safety_preset_warns_on_network_egress() {
        let mut engine = engine();
        let entity = engine.register_preset("safety", PolicyPreset::Safety, 0).unwrap();
        let result = engine.evaluate(&entity.entity_id, "Net", "http", "https://api.example.com").unwrap();
        assert_eq!(result.decision, RuleDecision::Warn);
    }

    #[test]
    fn audit_only_preset_downgrades_deny_to_warn() {
        let mut engine = engine();
        let entity = engine.register_preset("audit-only", PolicyPreset::AuditOnly, 0).unwrap();
        let result = engine.evaluate(&entity.entity_id, "Bash", "destructive", "rm -rf /").unwrap();
        assert_eq!(result.decision, RuleDecision::Warn);
        assert_eq!(result.raw_decision, RuleDecision::Deny);
    }

    #[test]
    fn strict_preset_denies_anything_off_whitelist() {
        let mut engine = engine();
        let entity = engine.register_preset("strict", PolicyPreset::Strict, 0).unwrap();
        assert_eq!(
            engine.evaluate(&entity.entity_id, "Read", "file", "x").unwrap().decision,
            RuleDecision::Allow
        );
        assert_eq!(
            engine.evaluate(&entity.entity_id, "Bash", "command", "ls").unwrap().decision,
            RuleDecision::Deny
        );
    }
}
