// crates/rule-gate-core/examples/order_flow.rs
// ============================================================================
// Module: Rule Gate Order Flow Example
// Description: Access check gated before a shipping quote.
// Purpose: Demonstrate table registration, a gated orchestration, and audit.
// Dependencies: rule-gate-core
// ============================================================================

//! ## Overview
//! Registers an access-level table and a shipping-rate table, chains them in a
//! gated orchestration, and runs it twice: once for a verified member (passes
//! the gate) and once for a guest (stopped by the gate). Audit events are
//! written to stderr as JSON lines.

use rule_gate_core::DecisionTableSpec;
use rule_gate_core::Definitions;
use rule_gate_core::Engine;
use rule_gate_core::EngineConfig;
use rule_gate_core::FieldPath;
use rule_gate_core::InputBinding;
use rule_gate_core::OrchestrationError;
use rule_gate_core::OrchestratorId;
use rule_gate_core::OrchestratorSpec;
use rule_gate_core::OutputField;
use rule_gate_core::Record;
use rule_gate_core::RecordShape;
use rule_gate_core::RuleId;
use rule_gate_core::RuleResult;
use rule_gate_core::RuleSpec;
use rule_gate_core::StderrAuditSink;
use rule_gate_core::StepSpec;
use rule_gate_core::StepTarget;
use rule_gate_core::TableId;
use rule_gate_core::Value;
use rule_gate_core::ValueSource;
use rule_gate_core::ValueType;
use rule_gate_core::parse_condition;

/// Error type for example preconditions.
#[derive(Debug)]
struct ExampleError(&'static str);

impl std::fmt::Display for ExampleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

impl std::error::Error for ExampleError {}

/// Builds a rule from condition text and a result.
fn rule(rule_id: &str, when: &str, then: RuleResult) -> Result<RuleSpec, Box<dyn std::error::Error>> {
    Ok(RuleSpec {
        rule_id: RuleId::new(rule_id),
        when: parse_condition(when)?,
        then,
    })
}

/// Builds a `weight_kg * coefficient + offset` result.
fn per_kg(coefficient: f64, offset: f64) -> Result<RuleResult, Box<dyn std::error::Error>> {
    Ok(RuleResult::Linear {
        field: FieldPath::parse("weight_kg")?,
        coefficient,
        offset,
    })
}

/// Registers both tables and the orchestration.
fn build_definitions() -> Result<Definitions, Box<dyn std::error::Error>> {
    let mut definitions = Definitions::new();
    definitions.add_table(DecisionTableSpec {
        table_id: TableId::new("access_level"),
        input: RecordShape::new().field("role", ValueType::Str).field("verified", ValueType::Bool),
        output: ValueType::Int,
        rules: vec![
            rule("admin", r#"role == "admin""#, RuleResult::Literal(Value::Int(100)))?,
            rule("member", r#"role == "member" && verified"#, RuleResult::Literal(Value::Int(50)))?,
            rule("fallback", "true", RuleResult::Literal(Value::Int(10)))?,
        ],
    })?;
    definitions.add_table(DecisionTableSpec {
        table_id: TableId::new("shipping_rate"),
        input: RecordShape::new().field("weight_kg", ValueType::Float).field("priority", ValueType::Bool),
        output: ValueType::Float,
        rules: vec![rule("priority", "priority", per_kg(8.0, 10.0)?)?, rule("standard", "true", per_kg(5.0, 7.0)?)?],
    })?;
    definitions.add_orchestrator(OrchestratorSpec {
        orchestrator_id: OrchestratorId::new("order_flow"),
        input: RecordShape::new()
            .field("role", ValueType::Str)
            .field("verified", ValueType::Bool)
            .field("weight_kg", ValueType::Float)
            .field("priority", ValueType::Bool),
        steps: vec![
            StepSpec::new(
                "check_access",
                StepTarget::Table(TableId::new("access_level")),
                vec![InputBinding::from_input("role"), InputBinding::from_input("verified")],
            )
            .gated(parse_condition("check_access >= 50")?)
            .with_gate_message("access level below 50"),
            StepSpec::new(
                "calc_shipping",
                StepTarget::Table(TableId::new("shipping_rate")),
                vec![InputBinding::from_input("weight_kg"), InputBinding::from_input("priority")],
            )
            .with_timeout_ms(250),
        ],
        outputs: vec![OutputField {
            name: "shipping_cost".into(),
            ty: ValueType::Float,
            source: ValueSource::step("calc_shipping"),
        }],
    })?;
    Ok(definitions)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let engine = Engine::new(build_definitions()?, EngineConfig::default()).with_audit(StderrAuditSink);
    let order_flow = OrchestratorId::new("order_flow");

    let member = Record::new()
        .with("role", "member")
        .with("verified", true)
        .with("weight_kg", 10.0)
        .with("priority", true);
    let quote = engine.run(&order_flow, &member)?;
    if quote.get("shipping_cost") != Some(&Value::Float(90.0)) {
        return Err(Box::new(ExampleError("verified member should be quoted 90.0")));
    }

    let guest = member.with("role", "guest");
    match engine.run(&order_flow, &guest) {
        Err(OrchestrationError::GateFailed {
            message: Some(_),
            ..
        }) => Ok(()),
        _ => Err(Box::new(ExampleError("guest should be stopped by the access gate"))),
    }
}
