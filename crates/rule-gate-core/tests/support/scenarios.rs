// crates/rule-gate-core/tests/support/scenarios.rs
// ============================================================================
// Module: Test Scenarios
// Description: Shared table and orchestration definitions for tests.
// ============================================================================

//! Access-level and shipping-rate tables, the `order_flow` orchestration
//! chaining them, and a `checkout` orchestration nesting `order_flow`.

use rule_gate_core::Definitions;
use rule_gate_core::DecisionTableSpec;
use rule_gate_core::Engine;
use rule_gate_core::EngineConfig;
use rule_gate_core::FieldPath;
use rule_gate_core::FieldPredicate;
use rule_gate_core::InputBinding;
use rule_gate_core::OrchestratorId;
use rule_gate_core::OrchestratorSpec;
use rule_gate_core::OutputField;
use rule_gate_core::Record;
use rule_gate_core::RecordShape;
use rule_gate_core::Requirement;
use rule_gate_core::RuleId;
use rule_gate_core::RuleResult;
use rule_gate_core::RuleSpec;
use rule_gate_core::StepName;
use rule_gate_core::StepSpec;
use rule_gate_core::StepTarget;
use rule_gate_core::TableId;
use rule_gate_core::Value;
use rule_gate_core::ValueSource;
use rule_gate_core::ValueType;
use rule_gate_core::parse_condition;

/// Parses condition text, panicking on malformed fixtures.
pub fn condition(text: &str) -> Requirement<FieldPredicate> {
    parse_condition(text).expect("fixture condition parses")
}

/// Parses a field path, panicking on malformed fixtures.
pub fn path(text: &str) -> FieldPath {
    FieldPath::parse(text).expect("fixture path parses")
}

/// Builds a literal rule.
pub fn literal_rule(rule_id: &str, when: &str, value: impl Into<Value>) -> RuleSpec {
    RuleSpec {
        rule_id: RuleId::new(rule_id),
        when: condition(when),
        then: RuleResult::Literal(value.into()),
    }
}

/// Builds a `weight_kg * coefficient + offset` rule.
pub fn linear_rule(rule_id: &str, when: &str, coefficient: f64, offset: f64) -> RuleSpec {
    RuleSpec {
        rule_id: RuleId::new(rule_id),
        when: condition(when),
        then: RuleResult::Linear {
            field: path("weight_kg"),
            coefficient,
            offset,
        },
    }
}

// ============================================================================
// SECTION: Tables
// ============================================================================

/// `access_level`: role and verification status to an integer level.
pub fn access_level_table() -> DecisionTableSpec {
    DecisionTableSpec {
        table_id: TableId::new("access_level"),
        input: RecordShape::new().field("role", ValueType::Str).field("verified", ValueType::Bool),
        output: ValueType::Int,
        rules: vec![
            literal_rule("admin", r#"role == "admin""#, 100_i64),
            literal_rule("verified_member", r#"role == "member" && verified"#, 50_i64),
            literal_rule("unverified_member", r#"role == "member" && !verified"#, 25_i64),
            literal_rule("guest", r#"role == "guest""#, 10_i64),
        ],
    }
}

/// `shipping_rate`: priority rules precede tier rules, which precede zone defaults.
pub fn shipping_rate_table() -> DecisionTableSpec {
    DecisionTableSpec {
        table_id: TableId::new("shipping_rate"),
        input: RecordShape::new()
            .field("weight_kg", ValueType::Float)
            .field("zone", ValueType::Str)
            .field("priority", ValueType::Bool)
            .field("member_tier", ValueType::Str),
        output: ValueType::Float,
        rules: vec![
            literal_rule(
                "gold_domestic",
                r#"member_tier == "gold" && zone == "domestic""#,
                0.0,
            ),
            linear_rule("priority_international", r#"priority && zone == "international""#, 25.0, 50.0),
            linear_rule("priority_north_america", r#"priority && zone == "north_america""#, 15.0, 20.0),
            linear_rule("priority_domestic", r#"priority && zone == "domestic""#, 8.0, 10.0),
            linear_rule(
                "silver_international",
                r#"member_tier == "silver" && zone == "international""#,
                16.0,
                30.0,
            ),
            linear_rule(
                "silver_north_america",
                r#"member_tier == "silver" && zone == "north_america""#,
                8.0,
                12.0,
            ),
            linear_rule("silver_domestic", r#"member_tier == "silver" && zone == "domestic""#, 4.0, 5.0),
            linear_rule("international", r#"zone == "international""#, 20.0, 40.0),
            linear_rule("north_america", r#"zone == "north_america""#, 10.0, 15.0),
            linear_rule("domestic", r#"zone == "domestic""#, 5.0, 7.0),
        ],
    }
}

/// `loyalty_discount`: discount fraction by access level.
pub fn loyalty_discount_table() -> DecisionTableSpec {
    DecisionTableSpec {
        table_id: TableId::new("loyalty_discount"),
        input: RecordShape::new().field("access_level", ValueType::Int),
        output: ValueType::Float,
        rules: vec![
            literal_rule("staff", "access_level >= 100", 0.2),
            literal_rule("member", "access_level >= 50", 0.1),
            literal_rule("none", "true", 0.0),
        ],
    }
}

// ============================================================================
// SECTION: Orchestrations
// ============================================================================

/// Input shape shared by `order_flow` and `checkout`.
pub fn order_input_shape() -> RecordShape {
    RecordShape::new()
        .field("role", ValueType::Str)
        .field("verified", ValueType::Bool)
        .field("weight_kg", ValueType::Float)
        .field("zone", ValueType::Str)
        .field("priority", ValueType::Bool)
        .field("member_tier", ValueType::Str)
}

/// Binds every `order_flow` input field from the caller's input of the same name.
fn order_bindings() -> Vec<InputBinding> {
    ["role", "verified", "weight_kg", "zone", "priority", "member_tier"]
        .into_iter()
        .map(InputBinding::from_input)
        .collect()
}

/// `order_flow`: `check_access` (gated on `check_access >= 50`) then `calc_shipping`.
pub fn order_flow() -> OrchestratorSpec {
    OrchestratorSpec {
        orchestrator_id: OrchestratorId::new("order_flow"),
        input: order_input_shape(),
        steps: vec![
            StepSpec {
                name: StepName::new("check_access"),
                target: StepTarget::Table(TableId::new("access_level")),
                inputs: vec![InputBinding::from_input("role"), InputBinding::from_input("verified")],
                gate: Some(condition("check_access >= 50")),
                gate_message: None,
                timeout_ms: None,
            },
            StepSpec {
                name: StepName::new("calc_shipping"),
                target: StepTarget::Table(TableId::new("shipping_rate")),
                inputs: vec![
                    InputBinding::from_input("weight_kg"),
                    InputBinding::from_input("zone"),
                    InputBinding::from_input("priority"),
                    InputBinding::from_input("member_tier"),
                ],
                gate: None,
                gate_message: None,
                timeout_ms: None,
            },
        ],
        outputs: vec![
            OutputField {
                name: "access_level".into(),
                ty: ValueType::Int,
                source: ValueSource::step("check_access"),
            },
            OutputField {
                name: "shipping_cost".into(),
                ty: ValueType::Float,
                source: ValueSource::step("calc_shipping"),
            },
            OutputField {
                name: "can_order".into(),
                ty: ValueType::Bool,
                source: ValueSource::Constant(Value::Bool(true)),
            },
        ],
    }
}

/// `checkout`: nests `order_flow`, then prices a loyalty discount from its access level.
pub fn checkout() -> OrchestratorSpec {
    OrchestratorSpec {
        orchestrator_id: OrchestratorId::new("checkout"),
        input: order_input_shape(),
        steps: vec![
            StepSpec {
                name: StepName::new("order"),
                target: StepTarget::Orchestrator(OrchestratorId::new("order_flow")),
                inputs: order_bindings(),
                gate: Some(condition("order.shipping_cost < 500")),
                gate_message: Some("shipping must stay under 500".into()),
                timeout_ms: None,
            },
            StepSpec {
                name: StepName::new("discount"),
                target: StepTarget::Table(TableId::new("loyalty_discount")),
                inputs: vec![InputBinding::new(
                    "access_level",
                    ValueSource::step_field("order", path("access_level")),
                )],
                gate: None,
                gate_message: None,
                timeout_ms: None,
            },
        ],
        outputs: vec![
            OutputField {
                name: "shipping_cost".into(),
                ty: ValueType::Float,
                source: ValueSource::step_field("order", path("shipping_cost")),
            },
            OutputField {
                name: "discount".into(),
                ty: ValueType::Float,
                source: ValueSource::step("discount"),
            },
            OutputField {
                name: "zone".into(),
                ty: ValueType::Str,
                source: ValueSource::Input("zone".into()),
            },
        ],
    }
}

// ============================================================================
// SECTION: Registry and Inputs
// ============================================================================

/// Registers every scenario definition in dependency order.
pub fn definitions() -> Definitions {
    let mut definitions = Definitions::new();
    definitions.add_table(access_level_table()).expect("access_level registers");
    definitions.add_table(shipping_rate_table()).expect("shipping_rate registers");
    definitions.add_table(loyalty_discount_table()).expect("loyalty_discount registers");
    definitions.add_orchestrator(order_flow()).expect("order_flow registers");
    definitions.add_orchestrator(checkout()).expect("checkout registers");
    definitions
}

/// Engine over every scenario definition with default configuration.
pub fn engine() -> Engine {
    Engine::new(definitions(), EngineConfig::default())
}

/// Input for `access_level`.
pub fn access_input(role: &str, verified: bool) -> Record {
    Record::new().with("role", role).with("verified", verified)
}

/// Input for `shipping_rate`.
pub fn shipping_input(weight_kg: f64, zone: &str, priority: bool, member_tier: &str) -> Record {
    Record::new()
        .with("weight_kg", weight_kg)
        .with("zone", zone)
        .with("priority", priority)
        .with("member_tier", member_tier)
}

/// Input for `order_flow` and `checkout`: a domestic, non-priority, bronze order.
pub fn order_input(role: &str, verified: bool, weight_kg: f64) -> Record {
    Record::new()
        .with("role", role)
        .with("verified", verified)
        .with("weight_kg", weight_kg)
        .with("zone", "domestic")
        .with("priority", false)
        .with("member_tier", "bronze")
}
