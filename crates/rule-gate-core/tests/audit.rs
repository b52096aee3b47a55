// crates/rule-gate-core/tests/audit.rs
// ============================================================================
// Module: Audit Event Tests
// Description: Event sequences, payloads, and JSON-lines sinks.
// ============================================================================
//! ## Overview
//! Audit events describe what the engine did, in order, without affecting
//! any evaluation outcome.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod support;

use std::fs;

use rule_gate_core::AuditEvent;
use rule_gate_core::Engine;
use rule_gate_core::EngineConfig;
use rule_gate_core::InMemoryAuditSink;
use rule_gate_core::JsonlAuditSink;
use rule_gate_core::OrchestratorId;
use rule_gate_core::TableId;
use serde_json::Value as Json;
use support::TestResult;
use support::ensure;
use support::fail;
use support::scenarios::access_input;
use support::scenarios::definitions;
use support::scenarios::order_input;

/// Engine recording into a shared in-memory sink.
fn recording_engine() -> (Engine<InMemoryAuditSink>, InMemoryAuditSink) {
    let sink = InMemoryAuditSink::new();
    let engine = Engine::new(definitions(), EngineConfig::default()).with_audit(sink.clone());
    (engine, sink)
}

#[test]
fn successful_run_emits_ordered_events() -> TestResult {
    let (engine, sink) = recording_engine();
    engine.run(&OrchestratorId::new("order_flow"), &order_input("admin", true, 1.0))?;

    let names = sink.event_names();
    let expected = [
        "table_evaluated",
        "step_completed",
        "gate_evaluated",
        "table_evaluated",
        "step_completed",
        "run_finished",
    ];
    ensure(names == expected, format!("unexpected events: {names:?}"))?;
    match sink.events().last() {
        Some(AuditEvent::RunFinished {
            status,
            completed_steps,
            ..
        }) => ensure(*status == "succeeded" && *completed_steps == 2, "wrong run summary"),
        other => fail(format!("expected run_finished, got {other:?}")),
    }
}

#[test]
fn failed_gate_is_recorded_before_run_finishes() -> TestResult {
    let (engine, sink) = recording_engine();
    let result = engine.run(&OrchestratorId::new("order_flow"), &order_input("guest", false, 1.0));
    ensure(result.is_err(), "guest must fail the gate")?;

    let events = sink.events();
    let gate = events.iter().find_map(|event| match event {
        AuditEvent::GateEvaluated {
            condition,
            passed,
            ..
        } => Some((condition.clone(), *passed)),
        _ => None,
    });
    ensure(gate == Some(("check_access >= 50".to_string(), false)), format!("unexpected gate event: {gate:?}"))?;
    match events.last() {
        Some(AuditEvent::RunFinished {
            status,
            completed_steps,
            ..
        }) => ensure(*status == "gate_failed" && *completed_steps == 1, "wrong run summary"),
        other => fail(format!("expected run_finished, got {other:?}")),
    }
}

#[test]
fn table_events_carry_the_matching_rule() -> TestResult {
    let (engine, sink) = recording_engine();
    let table = TableId::new("access_level");
    engine.evaluate(&table, &access_input("member", true))?;
    let _ = engine.evaluate(&table, &access_input("other", true));

    let payloads: Vec<Json> = sink.events().iter().map(serde_json::to_value).collect::<Result<_, _>>()?;
    ensure(payloads.len() == 2, "one event per evaluation")?;
    ensure(payloads[0]["event"] == "table_evaluated", "event tag")?;
    ensure(payloads[0]["table_id"] == "access_level", "table id")?;
    ensure(payloads[0]["rule_index"] == 1, "rule index")?;
    ensure(payloads[0]["rule_id"] == "verified_member", "rule id")?;
    ensure(payloads[0]["outcome"] == "matched", "outcome")?;
    ensure(payloads[1]["outcome"] == "no_rule_matched", "failure outcome")?;
    ensure(payloads[1]["rule_index"].is_null(), "no rule index on failure")?;
    ensure(payloads[1]["timestamp_ms"].is_number(), "timestamp present")
}

#[test]
fn nested_runs_finish_before_outer_run() -> TestResult {
    let (engine, sink) = recording_engine();
    engine.run(&OrchestratorId::new("checkout"), &order_input("admin", true, 1.0))?;

    let finished: Vec<String> = sink
        .events()
        .iter()
        .filter_map(|event| match event {
            AuditEvent::RunFinished {
                orchestrator_id,
                ..
            } => Some(orchestrator_id.to_string()),
            _ => None,
        })
        .collect();
    ensure(finished == ["order_flow", "checkout"], format!("unexpected order: {finished:?}"))
}

#[test]
fn unknown_orchestrator_still_emits_run_finished() -> TestResult {
    let (engine, sink) = recording_engine();
    let _ = engine.run(&OrchestratorId::new("missing"), &order_input("admin", true, 1.0));
    match sink.events().as_slice() {
        [AuditEvent::RunFinished {
            status,
            ..
        }] => ensure(*status == "unknown_orchestrator", format!("unexpected status: {status}")),
        other => fail(format!("expected a single run_finished, got {other:?}")),
    }
}

#[test]
fn jsonl_sink_appends_one_line_per_event() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("audit.jsonl");
    let engine = Engine::new(definitions(), EngineConfig::default()).with_audit(JsonlAuditSink::new(&path)?);

    engine.evaluate(&TableId::new("access_level"), &access_input("admin", false))?;
    engine.run(&OrchestratorId::new("order_flow"), &order_input("admin", false, 1.0))?;

    let contents = fs::read_to_string(&path)?;
    let lines: Vec<&str> = contents.lines().collect();
    ensure(lines.len() == 7, format!("expected 7 lines, got {}", lines.len()))?;
    for line in lines {
        let payload: Json = serde_json::from_str(line)?;
        ensure(payload["event"].is_string(), format!("untagged line: {line}"))?;
    }
    Ok(())
}
