// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Trustcore Project Contributors

//! # trustcore-wasm
//!
//! WebAssembly bindings for the `trustcore-core` governance engine.
//!
//! This crate exposes [`trustcore_core::engine::GovernanceCore`] to
//! JavaScript and TypeScript consumers running in browser or edge-worker
//! environments via `wasm-bindgen`.
//!
//! ## Architecture
//!
//! Each handle wraps a `GovernanceCore<InMemoryStorage>`. Core instances are
//! stored in a thread-local registry keyed by integer handles because WASM
//! is single-threaded and `wasm_bindgen` cannot export opaque Rust structs
//! across the JS boundary without serialisation overhead. Complex payloads
//! (LCTs, trust records, R6 records, policy entities) cross the boundary as
//! JSON strings rather than individual scalar fields.
//!
//! ## Exported Functions
//!
//! | Function                  | Description                                         |
//! |----------------------------|------------------------------------------------------|
//! | `create_core`              | Create a new core with default config               |
//! | `create_core_with_config`  | Create a new core with explicit JSON config          |
//! | `destroy_core`             | Release a core handle and free its memory            |
//! | `open_session`             | Open a governed session, return its id               |
//! | `mint_lct`                 | Mint a root or expiring LCT                          |
//! | `verify_lct`               | Verify an LCT's full validity chain                  |
//! | `revoke_lct`               | Revoke an LCT and cascade to its descendants         |
//! | `delegate_lct`             | Mint a delegated LCT scoped under a parent           |
//! | `trust_query`              | Query an entity/role's current trust tensor          |
//! | `trust_update`             | Apply an outcome-driven trust update                 |
//! | `r6_append`                | Append one R6 audit record to a session              |
//! | `verify_chain`             | Verify a session's hash chain                        |
//! | `policy_evaluate`          | Evaluate a policy entity against a request           |
//! | `register_policy_preset`   | Mint a policy entity from a named preset             |
//! | `query_audit`              | Query the audit ledger with a JSON filter            |
//! | `get_audit_trail`          | Return a session's full audit trail                  |
//!
//! ## JavaScript Usage
//!
//! ```js
//! import init, {
//!   create_core,
//!   open_session,
//!   mint_lct,
//!   r6_append,
//!   get_audit_trail,
//! } from '@trustcore/wasm';
//!
//! await init();
//!
//! const handle = create_core();
//! const sessionId = open_session(handle, 'demo-project', '6e6f6e6365', null, null, 0n);
//!
//! const minted = JSON.parse(mint_lct(handle, 'root', 'agent-001', 'issuer', null, 0n));
//! console.log(minted.lct.id);
//!
//! const record = JSON.parse(r6_append(
//!   handle,
//!   sessionId,
//!   JSON.stringify({ r6_request_id: 'req-1', role: { lct: minted.lct.id, active_agent: 'agent-001' },
//!                     request: { name: 'Read', category: 'file', target: 'a.txt' }, resource: {} }),
//!   JSON.stringify({ status: 'success', output_hash: null, duration_ms: 2 }),
//!   1n,
//! ));
//! console.log(record.action_index);
//!
//! console.log(get_audit_trail(handle, sessionId));
//! ```

use std::cell::RefCell;
use std::collections::HashMap;

use wasm_bindgen::prelude::*;

use trustcore_core::config::Config;
use trustcore_core::engine::GovernanceCore;
use trustcore_core::policy::PolicyPreset;
use trustcore_core::storage::InMemoryStorage;
use trustcore_core::types::{AffectedDimension, AuditFilter, LctType, Outcome, R6Fields, ResultInfo};

// ---------------------------------------------------------------------------
// Core registry
// ---------------------------------------------------------------------------

// WASM is single-threaded; RefCell<HashMap<...>> is safe here.
thread_local! {
    static CORES: RefCell<HashMap<u32, GovernanceCore<InMemoryStorage>>> = RefCell::new(HashMap::new());
    static NEXT_HANDLE: RefCell<u32> = RefCell::new(0);
}

/// Allocate a new core handle. Handles wrap around at `u32::MAX - 1` to
/// reserve `u32::MAX` as the error sentinel.
fn next_handle() -> u32 {
    NEXT_HANDLE.with(|counter| {
        let handle = *counter.borrow();
        let next = if handle >= u32::MAX - 1 { 0 } else { handle + 1 };
        *counter.borrow_mut() = next;
        handle
    })
}

/// Run a closure with mutable access to a core. Returns `Err(message)` if
/// the handle is unknown.
fn with_core_mut<F, R>(handle: u32, callback: F) -> Result<R, String>
where
    F: FnOnce(&mut GovernanceCore<InMemoryStorage>) -> R,
{
    CORES.with(|cores| {
        let mut map = cores.borrow_mut();
        match map.get_mut(&handle) {
            Some(core) => Ok(callback(core)),
            None => Err(format!("unknown core handle {handle}")),
        }
    })
}

/// Run a closure with shared access to a core.
fn with_core<F, R>(handle: u32, callback: F) -> Result<R, String>
where
    F: FnOnce(&GovernanceCore<InMemoryStorage>) -> R,
{
    CORES.with(|cores| {
        let map = cores.borrow();
        match map.get(&handle) {
            Some(core) => Ok(callback(core)),
            None => Err(format!("unknown core handle {handle}")),
        }
    })
}

/// JSON-encode an `{"error": "..."}` payload.
fn error_json(message: impl core::fmt::Display) -> String {
    serde_json::json!({ "error": message.to_string() }).to_string()
}

/// Parse a bare JS string (e.g. `"root"`) into an enum with a
/// `#[serde(rename_all = ...)]` representation by quoting it as JSON first.
fn parse_tag<T: serde::de::DeserializeOwned>(tag: &str) -> Result<T, serde_json::Error> {
    serde_json::from_value(serde_json::Value::String(tag.to_string()))
}

// ---------------------------------------------------------------------------
// Core lifecycle
// ---------------------------------------------------------------------------

/// Create a new [`GovernanceCore`] with default configuration.
///
/// Returns its integer handle; pass it to every subsequent call.
#[wasm_bindgen]
pub fn create_core() -> u32 {
    let handle = next_handle();
    let core = GovernanceCore::new(Config::default(), InMemoryStorage::new());
    CORES.with(|cores| {
        cores.borrow_mut().insert(handle, core);
    });
    handle
}

/// Create a new [`GovernanceCore`] with explicit configuration.
///
/// `config_json` must match the [`Config`] shape. Returns `u32::MAX` on
/// parse error.
#[wasm_bindgen]
pub fn create_core_with_config(config_json: &str) -> u32 {
    let config: Config = match serde_json::from_str(config_json) {
        Ok(cfg) => cfg,
        Err(_) => return u32::MAX,
    };
    let handle = next_handle();
    let core = GovernanceCore::new(config, InMemoryStorage::new());
    CORES.with(|cores| {
        cores.borrow_mut().insert(handle, core);
    });
    handle
}

/// Release the core associated with `handle`, freeing its memory.
///
/// After calling this function the handle is no longer valid.
#[wasm_bindgen]
pub fn destroy_core(handle: u32) {
    CORES.with(|cores| {
        cores.borrow_mut().remove(&handle);
    });
}

/// Open a governed session and return its session id.
///
/// `nonce_hex` is a hex-encoded byte string seeding the session's chain.
/// `policy_entity_id` defaults to the core's configured preset when `null`.
#[wasm_bindgen]
pub fn open_session(
    handle: u32,
    project: &str,
    nonce_hex: &str,
    action_budget: Option<u64>,
    policy_entity_id: Option<String>,
    now_ms: u64,
) -> String {
    let nonce = match hex_decode(nonce_hex) {
        Ok(bytes) => bytes,
        Err(error) => return error_json(error),
    };
    let outcome = with_core_mut(handle, |core| core.open_session(project, &nonce, action_budget, policy_entity_id, now_ms));
    match outcome {
        Ok(Ok(session)) => session.session_id,
        Ok(Err(error)) => error_json(error),
        Err(error) => error_json(error),
    }
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

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Mint a new LCT. `lct_type` is one of `"root"`, `"device"`, `"software"`,
/// `"session"`. Returns `{"lct": Lct, "private_key": "<hex>"}` or
/// `{"error": "..."}`.
#[wasm_bindgen]
pub fn mint_lct(
    handle: u32,
    lct_type: &str,
    subject: &str,
    issuer: &str,
    expires_in_ms: Option<u64>,
    now_ms: u64,
) -> String {
    let lct_type: LctType = match parse_tag(lct_type) {
        Ok(value) => value,
        Err(error) => return error_json(format!("invalid lct_type: {error}")),
    };

    let result = with_core_mut(handle, |core| core.identity.create(lct_type, subject, issuer, expires_in_ms, now_ms));

    match result {
        Ok(Ok((lct, private_key))) => {
            serde_json::json!({ "lct": lct, "private_key": trustcore_core::crypto::hex_encode(&private_key) }).to_string()
        }
        Ok(Err(error)) => error_json(error),
        Err(error) => error_json(error),
    }
}

/// Verify an LCT's full validity chain. Returns a JSON [`trustcore_core::types::VerifyResult`].
#[wasm_bindgen]
pub fn verify_lct(handle: u32, lct_id: &str, now_ms: u64) -> String {
    with_core(handle, |core| {
        let result = core.identity.verify(lct_id, now_ms);
        serde_json::to_string(&result).unwrap_or_else(|error| error_json(error))
    })
    .unwrap_or_else(error_json)
}

/// Revoke an LCT, cascading to every descendant in its delegation tree.
/// Returns `{"ok": true}` or `{"error": "..."}`.
#[wasm_bindgen]
pub fn revoke_lct(handle: u32, lct_id: &str, reason: Option<String>, now_ms: u64) -> String {
    let result = with_core_mut(handle, |core| core.identity.revoke(lct_id, reason.as_deref(), now_ms));
    match result {
        Ok(Ok(())) => serde_json::json!({ "ok": true }).to_string(),
        Ok(Err(error)) => error_json(error),
        Err(error) => error_json(error),
    }
}

/// Mint a delegated LCT under `parent_id`.
///
/// `scope_json` and `constraints_json` are JSON arrays: `scope_json` of
/// strings, `constraints_json` of `[key, value]` pairs. Returns
/// `{"lct": Lct, "private_key": "<hex>"}` or `{"error": "..."}`.
#[wasm_bindgen]
pub fn delegate_lct(
    handle: u32,
    parent_id: &str,
    subject: &str,
    scope_json: &str,
    constraints_json: &str,
    expires_in_ms: Option<u64>,
    now_ms: u64,
) -> String {
    let scope: Vec<String> = match serde_json::from_str(scope_json) {
        Ok(value) => value,
        Err(error) => return error_json(format!("invalid scope_json: {error}")),
    };
    let constraints: Vec<(String, String)> = match serde_json::from_str(constraints_json) {
        Ok(value) => value,
        Err(error) => return error_json(format!("invalid constraints_json: {error}")),
    };

    let result =
        with_core_mut(handle, |core| core.identity.delegate(parent_id, subject, scope, constraints, expires_in_ms, now_ms));

    match result {
        Ok(Ok((lct, private_key))) => {
            serde_json::json!({ "lct": lct, "private_key": trustcore_core::crypto::hex_encode(&private_key) }).to_string()
        }
        Ok(Err(error)) => error_json(error),
        Err(error) => error_json(error),
    }
}

// ---------------------------------------------------------------------------
// Trust
// ---------------------------------------------------------------------------

/// Query an entity/role's current trust tensor. Returns a JSON
/// [`trustcore_core::types::TrustQueryResult`].
#[wasm_bindgen]
pub fn trust_query(handle: u32, entity_id: &str, role: &str) -> String {
    with_core(handle, |core| {
        let result = core.trust.query(entity_id, role);
        serde_json::to_string(&result).unwrap_or_else(|error| error_json(error))
    })
    .unwrap_or_else(error_json)
}

/// Apply an outcome-driven trust update. `outcome` is one of `"success"`,
/// `"failure"`, `"partial"`; `dimensions_json` is a JSON array drawn from
/// `"talent"`, `"training"`, `"temperament"`.
#[wasm_bindgen]
pub fn trust_update(
    handle: u32,
    entity_id: &str,
    role: &str,
    action: &str,
    outcome: &str,
    dimensions_json: &str,
    magnitude: f64,
    now_ms: u64,
) -> String {
    let outcome: Outcome = match parse_tag(outcome) {
        Ok(value) => value,
        Err(error) => return error_json(format!("invalid outcome: {error}")),
    };
    let dimensions: Vec<AffectedDimension> = match serde_json::from_str(dimensions_json) {
        Ok(value) => value,
        Err(error) => return error_json(format!("invalid dimensions_json: {error}")),
    };

    let result = with_core_mut(handle, |core| core.trust.update(entity_id, role, action, outcome, &dimensions, magnitude, now_ms));

    match result {
        Ok(Ok(update)) => serde_json::to_string(&update).unwrap_or_else(|error| error_json(error)),
        Ok(Err(error)) => error_json(error),
        Err(error) => error_json(error),
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Append one R6 audit record to `session_id`.
///
/// `fields_json` matches [`R6Fields`]; `result_json` matches [`ResultInfo`].
/// Returns a JSON [`trustcore_core::types::R6Record`] or `{"error": "..."}`.
#[wasm_bindgen]
pub fn r6_append(handle: u32, session_id: &str, fields_json: &str, result_json: &str, now_ms: u64) -> String {
    let fields: R6Fields = match serde_json::from_str(fields_json) {
        Ok(value) => value,
        Err(error) => return error_json(format!("invalid fields_json: {error}")),
    };
    let result_info: ResultInfo = match serde_json::from_str(result_json) {
        Ok(value) => value,
        Err(error) => return error_json(format!("invalid result_json: {error}")),
    };

    let outcome = with_core_mut(handle, |core| core.ledger.append(session_id, fields, result_info, now_ms));

    match outcome {
        Ok(Ok(record)) => serde_json::to_string(&record).unwrap_or_else(|error| error_json(error)),
        Ok(Err(error)) => error_json(error),
        Err(error) => error_json(error),
    }
}

/// Verify a session's hash chain. Returns a JSON
/// [`trustcore_core::types::VerifyChainResult`].
#[wasm_bindgen]
pub fn verify_chain(handle: u32, session_id: &str) -> String {
    with_core(handle, |core| {
        let result = core.ledger.verify_chain(session_id);
        serde_json::to_string(&result).unwrap_or_else(|error| error_json(error))
    })
    .unwrap_or_else(error_json)
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Mint a policy entity from a named preset (`"permissive"`, `"safety"`,
/// `"strict"`, `"audit-only"`). Returns the entity id or `{"error": "..."}`.
#[wasm_bindgen]
pub fn register_policy_preset(handle: u32, name: &str, preset: &str, now_ms: u64) -> String {
    let preset: PolicyPreset = match parse_tag(preset) {
        Ok(value) => value,
        Err(error) => return error_json(format!("invalid preset: {error}")),
    };
    let outcome = with_core_mut(handle, |core| core.register_policy_preset(name, preset, now_ms));
    match outcome {
        Ok(Ok(entity_id)) => entity_id,
        Ok(Err(error)) => error_json(error),
        Err(error) => error_json(error),
    }
}

/// Evaluate a policy entity against `(tool, category, target)`. Returns a
/// JSON [`trustcore_core::policy::PolicyEvaluation`] or `{"error": "..."}`.
#[wasm_bindgen]
pub fn policy_evaluate(handle: u32, policy_entity_id: &str, tool: &str, category: &str, target: &str) -> String {
    let result = with_core(handle, |core| core.policy.evaluate(policy_entity_id, tool, category, target));
    match result {
        Ok(Ok(evaluation)) => serde_json::to_string(&evaluation).unwrap_or_else(|error| error_json(error)),
        Ok(Err(error)) => error_json(error),
        Err(error) => error_json(error),
    }
}

// ---------------------------------------------------------------------------
// Audit trail
// ---------------------------------------------------------------------------

/// Return one session's full audit trail as a JSON array of
/// [`trustcore_core::types::R6Record`]s. Returns `"[]"` on error.
#[wasm_bindgen]
pub fn get_audit_trail(handle: u32, session_id: &str) -> String {
    let filter = AuditFilter { session_id: Some(session_id.to_string()), ..Default::default() };
    with_core(handle, |core| {
        let records = core.query_audit(&filter);
        serde_json::to_string(&records).unwrap_or_else(|_| "[]".into())
    })
    .unwrap_or_else(|_| "[]".into())
}

/// Query the audit ledger with an explicit JSON [`AuditFilter`]. Pass `"{}"`
/// to retrieve every record.
#[wasm_bindgen]
pub fn query_audit(handle: u32, filter_json: &str) -> String {
    let filter: AuditFilter = serde_json::from_str(filter_json).unwrap_or_default();
    with_core(handle, |core| {
        let records = core.query_audit(&filter);
        serde_json::to_string(&records).unwrap_or_else(|_| "[]".into())
    })
    .unwrap_or_else(|_| "[]".into())
}

// ---------------------------------------------------------------------------
// wasm-bindgen-test stubs
// ---------------------------------------------------------------------------

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_create_and_destroy_core() {
        let handle = create_core();
        assert_ne!(handle, u32::MAX);
        destroy_core(handle);
    }

    #[wasm_bindgen_test]
    fn test_mint_and_verify_lct() {
        let handle = create_core();
        let minted = mint_lct(handle, "root", "agent-001", "issuer", None, 0);
        assert!(!minted.contains("error"));

        let lct: serde_json::Value = serde_json::from_str(&minted).unwrap();
        let lct_id = lct["lct"]["id"].as_str().unwrap();

        let verified = verify_lct(handle, lct_id, 1);
        assert!(verified.contains("\"valid\":true"));
        destroy_core(handle);
    }

    #[wasm_bindgen_test]
    fn test_unknown_handle_returns_error() {
        let result = verify_lct(99999, "whatever", 0);
        assert!(result.contains("error"));
    }
}

// ---------------------------------------------------------------------------
// Native unit tests (run with `cargo test` outside of WASM)
// ---------------------------------------------------------------------------

#[cfg(test)]
#[cfg(not(target_arch = "wasm32"))]
mod native_tests {
    use super::*;

    #[test]
    fn test_core_lifecycle() {
        let handle = create_core();
        assert_ne!(handle, u32::MAX);
        destroy_core(handle);
    }

    #[test]
    fn test_create_core_with_invalid_config_is_sentinel() {
        let handle = create_core_with_config("not json");
        assert_eq!(handle, u32::MAX);
    }

    #[test]
    fn test_mint_verify_and_revoke_round_trip() {
        let handle = create_core();
        let minted = mint_lct(handle, "root", "agent-001", "issuer", None, 0);
        let lct: serde_json::Value = serde_json::from_str(&minted).unwrap();
        let lct_id = lct["lct"]["id"].as_str().unwrap().to_string();

        assert!(verify_lct(handle, &lct_id, 1).contains("\"valid\":true"));

        let revoked = revoke_lct(handle, &lct_id, Some("test".to_string()), 2);
        assert!(revoked.contains("\"ok\":true"));
        assert!(verify_lct(handle, &lct_id, 3).contains("revoked"));

        destroy_core(handle);
    }

    #[test]
    fn test_trust_update_and_query_round_trip() {
        let handle = create_core();
        let update = trust_update(handle, "agent-001", "default", "deploy", "success", "[\"training\"]", 0.2, 0);
        assert!(!update.contains("error"));

        let query = trust_query(handle, "agent-001", "default");
        assert!(!query.contains("error"));
        destroy_core(handle);
    }

    #[test]
    fn test_session_and_r6_append_flow() {
        let handle = create_core();
        let session_id = open_session(handle, "demo", "6e6f6e6365", None, None, 0);
        assert!(!session_id.contains("error"));

        let fields = r#"{"r6_request_id":"req-1","role":{"lct":"lct:agent","active_agent":"agent"},"request":{"name":"Read","category":"file","target":"a.txt"},"resource":{}}"#;
        let result = r#"{"status":"success","output_hash":null,"duration_ms":1}"#;
        let record = r6_append(handle, &session_id, fields, result, 1);
        assert!(!record.contains("\"error\""));

        let chain = verify_chain(handle, &session_id);
        assert!(chain.contains("\"valid\":true"));

        let trail = get_audit_trail(handle, &session_id);
        assert!(trail.contains("req-1"));

        destroy_core(handle);
    }

    #[test]
    fn test_policy_preset_and_evaluate() {
        let handle = create_core();
        let entity_id = register_policy_preset(handle, "safety", "safety", 0);
        assert!(!entity_id.contains("error"));

        let evaluation = policy_evaluate(handle, &entity_id, "Bash", "destructive", "rm -rf /");
        assert!(evaluation.contains("\"deny\""));
        destroy_core(handle);
    }

    #[test]
    fn test_unknown_handle_returns_error() {
        let result = verify_lct(99999, "whatever", 0);
        assert!(result.contains("error"));
    }
}
