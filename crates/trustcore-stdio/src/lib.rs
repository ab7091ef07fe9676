// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Trustcore Project Contributors

//! # trustcore-stdio
//!
//! Newline-delimited JSON host shim for `trustcore-core`.
//!
//! This crate lets a host process written in any language drive the
//! governance core over stdin/stdout without binding against Rust directly:
//! one JSON [`ShimCommand`] per line in, one JSON [`ShimDecision`] per line
//! out.
//!
//! ## Architecture
//!
//! ```text
//! Host process
//!     |
//!     v
//! [write ShimCommand as one JSON line to child stdin]
//!     |
//!     v
//! [StdioGovernanceShim::run reads the line, dispatches to GovernanceCore]
//!     |
//!     +--- OpenSession          --> SessionOpened { session_id }
//!     +--- RegisterPolicyPreset --> PolicyRegistered { entity_id }
//!     +--- Dispatch             --> Allow | Deny | RateLimited { record }
//!     |
//!     v
//! [write ShimDecision as one JSON line to child stdout]
//! ```
//!
//! `Dispatch` carries the [`trustcore_core::types::ResultInfo`] the host
//! already observed for the action — the shim does not execute anything
//! itself. It runs the policy and rate-limit gates, appends the resulting
//! R6 record (overriding the supplied result to `Denied` if a gate fires),
//! and reports back which gate (if any) fired.
//!
//! ## Fire Line
//!
//! Policy entities and rate limits are configured per-core at startup or
//! via `RegisterPolicyPreset`; there is no automatic promotion, no
//! behavioral analysis, and no adaptive logic.

use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};

use trustcore_core::config::Config;
use trustcore_core::engine::{GovernanceCore, GovernanceError};
use trustcore_core::policy::PolicyPreset;
use trustcore_core::storage::InMemoryStorage;
use trustcore_core::types::{R6Fields, R6Record, ResultInfo};

// ---------------------------------------------------------------------------
// Wire protocol
// ---------------------------------------------------------------------------

/// One line of shim input.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ShimCommand {
    /// Open a governed session and return its id.
    OpenSession {
        project: String,
        /// Hex-encoded seed bytes for the session's hash chain.
        nonce_hex: String,
        action_budget: Option<u64>,
        policy_entity_id: Option<String>,
        now_ms: u64,
    },
    /// Mint a policy entity from a named preset and return its id.
    RegisterPolicyPreset { name: String, preset: PolicyPreset, now_ms: u64 },
    /// Gate and record one already-executed action.
    Dispatch {
        session_id: String,
        rate_limit_key: String,
        fields: R6Fields,
        /// The outcome the host actually observed for this action.
        result: ResultInfo,
        now_ms: u64,
    },
}

/// One line of shim output.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ShimDecision {
    /// A session was opened.
    SessionOpened { session_id: String },
    /// A policy entity was minted.
    PolicyRegistered { entity_id: String },
    /// The action was permitted and recorded as observed.
    Allow { record: R6Record },
    /// The action was denied by the policy gate; the recorded result
    /// status is `Denied` regardless of what the host reported.
    Deny { record: R6Record },
    /// The action was denied by the rate-limit gate.
    RateLimited { record: R6Record },
    /// The command could not be processed.
    Error { message: String },
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure modes for [`StdioGovernanceShim::run`].
#[derive(Debug, thiserror::Error)]
pub enum ShimError {
    /// Reading a line from the input stream failed.
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
    /// A line was not valid JSON or did not match [`ShimCommand`]'s shape.
    #[error("malformed command: {0}")]
    Parse(#[from] serde_json::Error),
    /// The hex-encoded session nonce was malformed.
    #[error("invalid nonce hex: {0}")]
    InvalidNonce(String),
}

// ---------------------------------------------------------------------------
// Shim
// ---------------------------------------------------------------------------

/// Newline-delimited JSON host shim over a [`GovernanceCore`].
pub struct StdioGovernanceShim {
    core: GovernanceCore<InMemoryStorage>,
}

impl StdioGovernanceShim {
    /// Construct a shim with default configuration.
    pub fn new() -> Self {
        Self { core: GovernanceCore::new(Config::default(), InMemoryStorage::new()) }
    }

    /// Construct a shim with explicit configuration.
    pub fn with_config(config: Config) -> Self {
        Self { core: GovernanceCore::new(config, InMemoryStorage::new()) }
    }

    /// Read [`ShimCommand`] lines from `input`, dispatch each to the
    /// governance core, and write one [`ShimDecision`] line per command to
    /// `output`. Returns once `input` reaches EOF.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> Result<(), ShimError> {
        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let decision = self.handle_line(&line);
            let encoded = serde_json::to_string(&decision).unwrap_or_else(|error| {
                serde_json::to_string(&ShimDecision::Error { message: error.to_string() })
                    .expect("Error variant must always serialise")
            });
            writeln!(output, "{encoded}")?;
            output.flush()?;
        }
        Ok(())
    }

    fn handle_line(&mut self, line: &str) -> ShimDecision {
        let command: ShimCommand = match serde_json::from_str(line) {
            Ok(command) => command,
            Err(error) => return ShimDecision::Error { message: error.to_string() },
        };

        match command {
            ShimCommand::OpenSession { project, nonce_hex, action_budget, policy_entity_id, now_ms } => {
                match hex_decode(&nonce_hex) {
                    Ok(nonce) => match self.core.open_session(&project, &nonce, action_budget, policy_entity_id, now_ms) {
                        Ok(session) => ShimDecision::SessionOpened { session_id: session.session_id },
                        Err(error) => ShimDecision::Error { message: format_governance_error(&error) },
                    },
                    Err(message) => ShimDecision::Error { message },
                }
            }
            ShimCommand::RegisterPolicyPreset { name, preset, now_ms } => {
                match self.core.register_policy_preset(&name, preset, now_ms) {
                    Ok(entity_id) => ShimDecision::PolicyRegistered { entity_id },
                    Err(error) => ShimDecision::Error { message: format_governance_error(&error) },
                }
            }
            ShimCommand::Dispatch { session_id, rate_limit_key, fields, result, now_ms } => {
                let reason = self.predict_gate(&session_id, &rate_limit_key, &fields, now_ms);
                match self.core.dispatch(&session_id, &rate_limit_key, fields, now_ms, move || result) {
                    Ok(record) => classify(record, reason),
                    Err(error) => ShimDecision::Error { message: format_governance_error(&error) },
                }
            }
        }
    }

    /// Determine which gate, if any, will deny this action — mirrors the
    /// read-only checks `GovernanceCore::dispatch` runs internally, since
    /// its return value alone does not say which gate fired.
    fn predict_gate(&self, session_id: &str, rate_limit_key: &str, fields: &R6Fields, now_ms: u64) -> Option<GateReason> {
        use trustcore_core::policy::RuleDecision;
        use trustcore_core::storage::LedgerStorage;

        let session = self.core.ledger.storage().get_session(session_id).ok()??;

        if let Some(ref policy_entity_id) = session.active_policy_entity_id {
            match self.core.policy.evaluate(policy_entity_id, &fields.request.name, &fields.request.category, &fields.request.target) {
                Ok(evaluation) if evaluation.decision == RuleDecision::Deny => return Some(GateReason::Policy),
                Err(_) => return Some(GateReason::Policy),
                Ok(_) => {}
            }
        }

        #[cfg(feature = "std")]
        {
            let rate = self.core.rate_limiter.check(rate_limit_key, self.core.config().rate_limit_max_count, self.core.config().rate_limit_window_ms, now_ms);
            if !rate.allowed {
                return Some(GateReason::RateLimit);
            }
        }

        None
    }
}

/// Which gate, if either, is expected to deny the in-flight action.
#[derive(Debug, Clone, Copy)]
enum GateReason {
    Policy,
    RateLimit,
}

impl Default for StdioGovernanceShim {
    fn default() -> Self {
        Self::new()
    }
}

fn classify(record: R6Record, reason: Option<GateReason>) -> ShimDecision {
    match reason {
        Some(GateReason::Policy) => ShimDecision::Deny { record },
        Some(GateReason::RateLimit) => ShimDecision::RateLimited { record },
        None => ShimDecision::Allow { record },
    }
}

fn format_governance_error(error: &GovernanceError) -> String {
    format!("{error}")
}

fn hex_decode(hex: &str) -> Result<Vec<u8>, String> {
    if hex.len() % 2 != 0 {
        return Err("odd-length hex string".to_string());
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|error| error.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_commands(commands: &[&str]) -> Vec<ShimDecision> {
        let mut shim = StdioGovernanceShim::new();
        let input = commands.join("\n");
        let mut output = Vec::new();
        shim.run(input.as_bytes(), &mut output).expect("shim run should not error");
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| {
                let value: serde_json::Value = serde_json::from_str(line).unwrap();
                let outcome = value["outcome"].as_str().unwrap().to_string();
                match outcome.as_str() {
                    "session_opened" => {
                        ShimDecision::SessionOpened { session_id: value["session_id"].as_str().unwrap().to_string() }
                    }
                    "error" => ShimDecision::Error { message: value["message"].as_str().unwrap().to_string() },
                    other => panic!("unexpected outcome for this helper: {other}"),
                }
            })
            .collect()
    }

    #[test]
    fn open_session_returns_session_id() {
        let decisions = run_commands(&[r#"{"command":"open_session","project":"demo","nonce_hex":"6e6f6e6365","action_budget":null,"policy_entity_id":null,"now_ms":0}"#]);
        assert_eq!(decisions.len(), 1);
        match &decisions[0] {
            ShimDecision::SessionOpened { session_id } => assert!(!session_id.is_empty()),
            other => panic!("expected SessionOpened, got {other:?}"),
        }
    }

    #[test]
    fn malformed_nonce_hex_produces_error() {
        let decisions = run_commands(&[r#"{"command":"open_session","project":"demo","nonce_hex":"zz","action_budget":null,"policy_entity_id":null,"now_ms":0}"#]);
        assert!(matches!(decisions[0], ShimDecision::Error { .. }));
    }

    #[test]
    fn malformed_json_produces_error() {
        let decisions = run_commands(&["not json at all"]);
        assert!(matches!(decisions[0], ShimDecision::Error { .. }));
    }

    #[test]
    fn dispatch_without_active_policy_is_allowed() {
        let mut shim = StdioGovernanceShim::new();

        let mut output = Vec::new();
        shim.run(
            r#"{"command":"open_session","project":"demo","nonce_hex":"6e6f6e6365","action_budget":null,"policy_entity_id":null,"now_ms":0}"#.as_bytes(),
            &mut output,
        )
        .unwrap();
        let opened: serde_json::Value = serde_json::from_str(String::from_utf8(output).unwrap().trim()).unwrap();
        let session_id = opened["session_id"].as_str().unwrap().to_string();

        let fields = r#""fields":{"r6_request_id":"req-1","role":{"lct":"lct:agent","active_agent":"agent"},"request":{"name":"Read","category":"file","target":"a.txt"},"resource":{}}"#;
        let result = r#""result":{"status":"success","output_hash":null,"duration_ms":1}"#;
        let dispatch_line = format!(r#"{{"command":"dispatch","session_id":"{session_id}","rate_limit_key":"{session_id}",{fields},{result},"now_ms":1}}"#);

        let mut output = Vec::new();
        shim.run(dispatch_line.as_bytes(), &mut output).unwrap();
        let decoded: serde_json::Value = serde_json::from_str(String::from_utf8(output).unwrap().trim()).unwrap();
        assert_eq!(decoded["outcome"], "allow");
        assert_eq!(decoded["record"]["action_index"], 1);
    }

    #[test]
    fn strict_preset_denies_an_unlisted_action() {
        let mut shim = StdioGovernanceShim::new();

        let mut output = Vec::new();
        shim.run(r#"{"command":"register_policy_preset","name":"default","preset":"strict","now_ms":0}"#.as_bytes(), &mut output).unwrap();
        let registered: serde_json::Value = serde_json::from_str(String::from_utf8(output).unwrap().trim()).unwrap();
        let entity_id = registered["entity_id"].as_str().unwrap().to_string();

        let mut output = Vec::new();
        let open_line = format!(
            r#"{{"command":"open_session","project":"demo","nonce_hex":"6e6f6e6365","action_budget":null,"policy_entity_id":"{entity_id}","now_ms":0}}"#
        );
        shim.run(open_line.as_bytes(), &mut output).unwrap();
        let opened: serde_json::Value = serde_json::from_str(String::from_utf8(output).unwrap().trim()).unwrap();
        let session_id = opened["session_id"].as_str().unwrap().to_string();

        let fields = r#""fields":{"r6_request_id":"req-1","role":{"lct":"lct:agent","active_agent":"agent"},"request":{"name":"DeleteFile","category":"file","target":"a.txt"},"resource":{}}"#;
        let result = r#""result":{"status":"success","output_hash":null,"duration_ms":1}"#;
        let dispatch_line = format!(r#"{{"command":"dispatch","session_id":"{session_id}","rate_limit_key":"{session_id}",{fields},{result},"now_ms":1}}"#);

        let mut output = Vec::new();
        shim.run(dispatch_line.as_bytes(), &mut output).unwrap();
        let decoded: serde_json::Value = serde_json::from_str(String::from_utf8(output).unwrap().trim()).unwrap();
        assert_eq!(decoded["outcome"], "deny");
        assert_eq!(decoded["record"]["result"]["status"], "denied");
    }
}
