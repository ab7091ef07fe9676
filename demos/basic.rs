// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Trustcore Project Contributors

//! # Basic Governance Core Walkthrough
//!
//! Demonstrates minting an identity, updating trust, opening a session,
//! dispatching actions through the policy/rate-limit gates, and querying the
//! resulting audit trail, all against the in-memory storage backend. Run
//! with:
//!
//! ```bash
//! cargo run --bin basic
//! ```

use trustcore_core::config::Config;
use trustcore_core::engine::GovernanceCore;
use trustcore_core::policy::PolicyPreset;
use trustcore_core::storage::InMemoryStorage;
use trustcore_core::types::{
    ActionStatus, AffectedDimension, AuditFilter, LctType, Outcome, R6Fields, Request, Resource, ResultInfo, Role,
};

fn main() {
    println!("trustcore — Basic Walkthrough\n");

    let mut core = GovernanceCore::new(Config::default(), InMemoryStorage::new());

    // -------------------------------------------------------------------
    // 1. Mint a root identity and a delegated agent identity.
    // -------------------------------------------------------------------
    let (root_lct, _root_key) = core
        .identity
        .create(LctType::Root, "owner", "owner", None, 0)
        .expect("minting the root LCT cannot fail with fresh storage");
    let (agent_lct, _agent_key) = core
        .identity
        .delegate(&root_lct.id, "agent-finance-001", Vec::new(), Vec::new(), None, 0)
        .expect("delegating under a freshly minted, unexpired root cannot fail");
    println!("Root LCT:  {}", root_lct.id);
    println!("Agent LCT: {}\n", agent_lct.id);

    // -------------------------------------------------------------------
    // 2. Record an initial trust signal for the agent in the "finance" role.
    // -------------------------------------------------------------------
    let update = core
        .trust
        .update(&agent_lct.id, "finance", "send_invoice", Outcome::Success, &[AffectedDimension::Training], 0.2, 0)
        .expect("updating trust with a valid magnitude cannot fail");
    println!("Trust after one success: {:?}\n", update.new_t3);

    // -------------------------------------------------------------------
    // 3. Register a policy preset and open a governed session under it.
    // -------------------------------------------------------------------
    let policy_entity_id = core
        .register_policy_preset("finance-safety", PolicyPreset::Safety, 0)
        .expect("registering a fresh preset cannot fail");
    let session = core
        .open_session("demo-project", b"walkthrough-nonce", Some(10), Some(policy_entity_id), 1)
        .expect("opening a session with a freshly registered policy entity cannot fail");
    println!("Opened session: {}\n", session.session_id);

    // Action A — ordinary read, should be allowed.
    dispatch_and_report(&mut core, &session.session_id, "send_invoice", "financial", "invoice-42", ActionStatus::Success, 2);

    // Action B — matches the safety preset's deny list, should be denied.
    dispatch_and_report(&mut core, &session.session_id, "delete_cluster", "ops", "prod-cluster", ActionStatus::Success, 3);

    // -------------------------------------------------------------------
    // 4. Query the audit trail.
    // -------------------------------------------------------------------
    println!("\nAudit trail for this session:");
    let records = core.query_audit(&AuditFilter { session_id: Some(session.session_id.clone()), ..AuditFilter::default() });
    for record in &records {
        println!(
            "  [{}] action={} status={:?} id={}",
            record.action_index,
            record.tool_name,
            record.result.status,
            &record.record_id[..8.min(record.record_id.len())]
        );
    }

    let chain = core.ledger.verify_chain(&session.session_id);
    println!("\nChain valid: {}", chain.valid);
}

#[allow(clippy::too_many_arguments)]
fn dispatch_and_report(
    core: &mut GovernanceCore<InMemoryStorage>,
    session_id: &str,
    tool: &str,
    category: &str,
    target: &str,
    observed_status: ActionStatus,
    now_ms: u64,
) {
    let fields = R6Fields {
        r6_request_id: format!("req-{tool}"),
        role: Role { lct: "lct:agent-finance-001".into(), active_agent: "agent-finance-001".into() },
        request: Request { name: tool.into(), category: category.into(), target: target.into() },
        resource: Resource::default(),
    };

    let record = core
        .dispatch(session_id, session_id, fields, now_ms, || ResultInfo { status: observed_status, output_hash: None, duration_ms: 5 })
        .expect("session exists and has not been quarantined");

    println!("[{tool}] recorded status={:?}", record.result.status);
}
