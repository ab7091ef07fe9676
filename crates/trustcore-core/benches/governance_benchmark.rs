// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Trustcore Project Contributors

//! Criterion benchmark suite for the Trustcore governance core.
//!
//! Benchmarks cover the four core governance operations:
//!
//! - LCT mint + verify
//! - Trust tensor update + decay
//! - R6 ledger append + chain verification
//! - Policy evaluation
//!
//! Run with: `cargo bench --bench governance_benchmark`

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use trustcore_core::config::Config;
use trustcore_core::engine::GovernanceCore;
use trustcore_core::identity::IdentityStore;
use trustcore_core::ledger::GovernanceLedger;
use trustcore_core::policy::{PolicyEngine, PolicyPreset};
use trustcore_core::storage::InMemoryStorage;
use trustcore_core::trust::TrustEngine;
use trustcore_core::types::{
    ActionStatus, AffectedDimension, LctType, Outcome, R6Fields, Request, Resource, ResultInfo, Role,
};

// ---------------------------------------------------------------------------
// Identity benchmark
// ---------------------------------------------------------------------------

/// Benchmark LCT minting and verification.
///
/// Measures the dominant cost of the identity store: Ed25519 keypair
/// generation and signature verification.
fn identity_benchmark(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("identity");

    let mut store = IdentityStore::new(InMemoryStorage::new());
    let (root, _private) = store.create(LctType::Root, "bench-subject", "bench-issuer", None, 0).unwrap();

    group.bench_function("mint_root_lct", |bencher| {
        bencher.iter(|| {
            let result = store.create(
                black_box(LctType::Root),
                black_box("bench-subject"),
                black_box("bench-issuer"),
                black_box(None),
                black_box(0),
            );
            black_box(result).unwrap();
        });
    });

    group.bench_function("verify_existing_lct", |bencher| {
        bencher.iter(|| {
            let result = store.verify(black_box(&root.id), black_box(1));
            black_box(result);
        });
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Trust engine benchmark
// ---------------------------------------------------------------------------

/// Benchmark trust tensor update and decay.
///
/// Measures the cost of the EMA velocity/volatility update loop and the
/// Taylor-series `2^x` decay computation.
fn trust_benchmark(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("trust");

    let mut engine = TrustEngine::new(InMemoryStorage::new());
    for index in 0..100 {
        let entity_id = format!("agent-{index:04}");
        engine
            .update(&entity_id, "default", "seed", Outcome::Success, &[AffectedDimension::Talent], 0.1, 0)
            .unwrap();
    }

    group.bench_function("update_existing_entity", |bencher| {
        bencher.iter(|| {
            let result = engine.update(
                black_box("agent-0042"),
                black_box("default"),
                black_box("bench_action"),
                black_box(Outcome::Success),
                black_box(&[AffectedDimension::Talent, AffectedDimension::Training]),
                black_box(0.05),
                black_box(1_000),
            );
            black_box(result).unwrap();
        });
    });

    group.bench_function("decay_entity", |bencher| {
        bencher.iter(|| {
            let result = engine.decay(black_box("agent-0042"), black_box("default"), black_box(30.0), black_box(2_000_000));
            black_box(result).unwrap();
        });
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Ledger benchmark
// ---------------------------------------------------------------------------

fn bench_fields(index: u64) -> R6Fields {
    R6Fields {
        r6_request_id: format!("req-{index}"),
        role: Role { lct: "lct:bench-agent".to_string(), active_agent: "bench-agent".to_string() },
        request: Request { name: "Read".to_string(), category: "file".to_string(), target: format!("file-{index}.txt") },
        resource: Resource::default(),
    }
}

fn ok_result() -> ResultInfo {
    ResultInfo { status: ActionStatus::Success, output_hash: None, duration_ms: 1 }
}

/// Benchmark R6 ledger append and full chain verification.
///
/// Measures the dominant cost of the ledger: canonical encoding and
/// SHA-256 hashing per appended record.
fn ledger_benchmark(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("ledger");

    let mut ledger = GovernanceLedger::new(InMemoryStorage::new());
    let session = ledger.open_session("bench-project", b"bench-nonce", None, None, 0).unwrap();

    for index in 0..500 {
        ledger.append(&session.session_id, bench_fields(index), ok_result(), index + 1).unwrap();
    }

    group.bench_function("append_record", |bencher| {
        let mut counter = 1_000u64;
        bencher.iter(|| {
            counter += 1;
            let result = ledger.append(
                black_box(&session.session_id),
                black_box(bench_fields(counter)),
                black_box(ok_result()),
                black_box(counter),
            );
            black_box(result).unwrap();
        });
    });

    group.bench_function("verify_chain_500_records", |bencher| {
        bencher.iter(|| {
            let result = ledger.verify_chain(black_box(&session.session_id));
            black_box(result);
        });
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Policy benchmark
// ---------------------------------------------------------------------------

/// Benchmark policy evaluation under each preset.
fn policy_benchmark(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("policy");

    let mut engine = PolicyEngine::new(InMemoryStorage::new());
    let safety = engine.register_preset("safety", PolicyPreset::Safety, 0).unwrap();
    let strict = engine.register_preset("strict", PolicyPreset::Strict, 0).unwrap();

    group.bench_function("evaluate_safety_allow", |bencher| {
        bencher.iter(|| {
            let result = engine.evaluate(black_box(&safety.entity_id), black_box("Read"), black_box("file"), black_box("a.txt"));
            black_box(result).unwrap();
        });
    });

    group.bench_function("evaluate_safety_deny", |bencher| {
        bencher.iter(|| {
            let result = engine.evaluate(black_box(&safety.entity_id), black_box("Bash"), black_box("destructive"), black_box("rm -rf /"));
            black_box(result).unwrap();
        });
    });

    group.bench_function("evaluate_strict_whitelist_scan", |bencher| {
        bencher.iter(|| {
            let result = engine.evaluate(black_box(&strict.entity_id), black_box("Bash"), black_box("command"), black_box("ls"));
            black_box(result).unwrap();
        });
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Full dispatch benchmark
// ---------------------------------------------------------------------------

/// Benchmark the complete `GovernanceCore::dispatch` pipeline: policy gate,
/// rate-limit gate, ledger append, and trust update.
fn dispatch_benchmark(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("dispatch");

    let mut core = GovernanceCore::new(Config::default(), InMemoryStorage::new());
    let session = core.open_session("bench-project", b"bench-nonce", None, None, 0).unwrap();

    group.bench_function("dispatch_allowed_action", |bencher| {
        let mut counter = 0u64;
        bencher.iter(|| {
            counter += 1;
            let record = core.dispatch(
                black_box(&session.session_id),
                black_box(&session.session_id),
                black_box(bench_fields(counter)),
                black_box(counter + 1),
                || ok_result(),
            );
            black_box(record).unwrap();
        });
    });

    group.finish();
}

criterion_group!(benches, identity_benchmark, trust_benchmark, ledger_benchmark, policy_benchmark, dispatch_benchmark);
criterion_main!(benches);
