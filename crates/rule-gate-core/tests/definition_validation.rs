// crates/rule-gate-core/tests/definition_validation.rs
// ============================================================================
// Module: Definition Validation Tests
// Description: Static consistency checks for tables and orchestrations.
// ============================================================================
//! ## Overview
//! Every structural defect must be rejected when the definition is
//! registered, before any run could observe it.

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

use rule_gate_core::DecisionTable;
use rule_gate_core::DefinitionError;
use rule_gate_core::Definitions;
use rule_gate_core::EngineLimits;
use rule_gate_core::FieldPath;
use rule_gate_core::FieldPredicate;
use rule_gate_core::InputBinding;
use rule_gate_core::OrchestratorId;
use rule_gate_core::OrchestratorSpec;
use rule_gate_core::OutputField;
use rule_gate_core::RecordShape;
use rule_gate_core::RuleResult;
use rule_gate_core::StepName;
use rule_gate_core::StepSpec;
use rule_gate_core::StepTarget;
use rule_gate_core::TableId;
use rule_gate_core::Value;
use rule_gate_core::ValueSource;
use rule_gate_core::ValueType;
use serde_json::json;
use support::TestResult;
use support::ensure;
use support::fail;
use support::scenarios::access_level_table;
use support::scenarios::checkout;
use support::scenarios::condition;
use support::scenarios::linear_rule;
use support::scenarios::literal_rule;
use support::scenarios::loyalty_discount_table;
use support::scenarios::order_flow;
use support::scenarios::path;
use support::scenarios::shipping_rate_table;

// ========================================================================
// SECTION: Helpers
// ========================================================================

/// Registry holding the three scenario tables only.
fn tables_only() -> Definitions {
    let mut definitions = Definitions::new();
    definitions.add_table(access_level_table()).expect("access_level");
    definitions.add_table(shipping_rate_table()).expect("shipping_rate");
    definitions.add_table(loyalty_discount_table()).expect("loyalty_discount");
    definitions
}

/// Registers `spec` against the scenario tables and returns the rejection.
fn reject_orchestrator(spec: OrchestratorSpec) -> TestResult<DefinitionError> {
    match tables_only().add_orchestrator(spec) {
        Ok(_) => fail("expected definition to be rejected"),
        Err(error) => Ok(error),
    }
}

/// Returns `order_flow` after `edit`.
fn order_flow_with(edit: impl FnOnce(&mut OrchestratorSpec)) -> OrchestratorSpec {
    let mut spec = order_flow();
    edit(&mut spec);
    spec
}

// ========================================================================
// SECTION: Tables
// ========================================================================

#[test]
fn table_without_rules_is_rejected() -> TestResult {
    let mut spec = access_level_table();
    spec.rules.clear();
    match DecisionTable::new(spec) {
        Err(DefinitionError::EmptyTable {
            table,
        }) => ensure(table.as_str() == "access_level", "wrong table"),
        other => fail(format!("expected EmptyTable, got {other:?}")),
    }
}

#[test]
fn duplicate_rule_ids_are_rejected() -> TestResult {
    let mut spec = access_level_table();
    spec.rules.push(literal_rule("admin", r#"role == "root""#, 1000_i64));
    match DecisionTable::new(spec) {
        Err(DefinitionError::DuplicateRuleId {
            rule,
            ..
        }) => ensure(rule.as_str() == "admin", "wrong rule"),
        other => fail(format!("expected DuplicateRuleId, got {other:?}")),
    }
}

#[test]
fn predicate_on_undeclared_field_is_rejected() -> TestResult {
    let mut spec = access_level_table();
    spec.rules.push(literal_rule("gold", r#"tier == "gold""#, 75_i64));
    match DecisionTable::new(spec) {
        Err(DefinitionError::UnknownPredicateField {
            path,
            ..
        }) => ensure(path == "tier", format!("wrong path: {path}")),
        other => fail(format!("expected UnknownPredicateField, got {other:?}")),
    }
}

#[test]
fn ill_typed_predicates_are_rejected() -> TestResult {
    for text in ["role > 5", "verified == \"yes\"", "role", r#"role < "m""#] {
        let mut spec = access_level_table();
        spec.rules.push(literal_rule("bad", text, 1_i64));
        match DecisionTable::new(spec) {
            Err(DefinitionError::PredicateTypeMismatch {
                ..
            }) => {}
            other => return fail(format!("{text}: expected PredicateTypeMismatch, got {other:?}")),
        }
    }
    Ok(())
}

#[test]
fn record_output_is_rejected() -> TestResult {
    let mut spec = access_level_table();
    spec.output = ValueType::Record(RecordShape::new().field("level", ValueType::Int));
    match DecisionTable::new(spec) {
        Err(DefinitionError::OutputNotScalar {
            ..
        }) => Ok(()),
        other => fail(format!("expected OutputNotScalar, got {other:?}")),
    }
}

#[test]
fn results_must_fit_output_type() -> TestResult {
    let mut literal = access_level_table();
    literal.rules.push(literal_rule("text", "verified", "high"));
    ensure(
        matches!(DecisionTable::new(literal), Err(DefinitionError::InvalidResult { .. })),
        "string literal in int table",
    )?;

    let mut linear = access_level_table();
    linear.rules.push(linear_rule("scaled", "verified", 2.0, 1.0));
    ensure(
        matches!(DecisionTable::new(linear), Err(DefinitionError::InvalidResult { .. })),
        "linear result in int table",
    )?;

    let mut operand = shipping_rate_table();
    operand.rules[1].then = RuleResult::Linear {
        field: path("zone"),
        coefficient: 1.0,
        offset: 0.0,
    };
    ensure(
        matches!(DecisionTable::new(operand), Err(DefinitionError::InvalidResult { .. })),
        "string operand",
    )?;

    let mut infinite = shipping_rate_table();
    infinite.rules.push(linear_rule("inf", "priority", f64::INFINITY, 0.0));
    ensure(
        matches!(DecisionTable::new(infinite), Err(DefinitionError::InvalidResult { .. })),
        "non-finite coefficient",
    )
}

#[test]
fn table_limits_are_enforced() -> TestResult {
    let few_rules = EngineLimits {
        max_rules: 3,
        ..EngineLimits::default()
    };
    ensure(
        matches!(
            DecisionTable::with_limits(access_level_table(), &few_rules),
            Err(DefinitionError::TooManyRules { count: 4, max: 3, .. })
        ),
        "rule count limit",
    )?;

    let shallow = EngineLimits {
        max_condition_depth: 1,
        ..EngineLimits::default()
    };
    ensure(
        matches!(
            DecisionTable::with_limits(access_level_table(), &shallow),
            Err(DefinitionError::ConditionTooComplex { .. })
        ),
        "condition depth limit",
    )
}

#[test]
fn duplicate_table_ids_are_rejected() -> TestResult {
    let mut definitions = tables_only();
    match definitions.add_table(access_level_table()) {
        Err(DefinitionError::DuplicateTable(id)) => ensure(id.as_str() == "access_level", "wrong id"),
        other => fail(format!("expected DuplicateTable, got {other:?}")),
    }
}

// ========================================================================
// SECTION: Names and Shapes
// ========================================================================

#[test]
fn comparison_text_cannot_hide_in_field_paths() -> TestResult {
    for text in ["check_access.level>=50", "level==1", "1st", "zone-code", "and"] {
        ensure(FieldPath::parse(text).is_err(), format!("`{text}` should not parse as a path"))?;
    }
    let smuggled = serde_json::from_value::<FieldPredicate>(json!({ "truthy": "check_access.level>=50" }));
    ensure(smuggled.is_err(), "deserialized paths follow the same grammar")
}

#[test]
fn non_identifier_field_names_are_rejected() -> TestResult {
    let mut spec = access_level_table();
    spec.input = spec.input.field("level>=50", ValueType::Bool);
    match DecisionTable::new(spec) {
        Err(DefinitionError::InvalidFieldName {
            owner,
            field,
        }) => {
            ensure(owner == "table `access_level` input", format!("wrong owner: {owner}"))?;
            ensure(field == "level>=50", format!("wrong field: {field}"))
        }
        other => fail(format!("expected InvalidFieldName, got {other:?}")),
    }?;

    let output = reject_orchestrator(order_flow_with(|spec| {
        spec.outputs.push(OutputField {
            name: "level>=50".into(),
            ty: ValueType::Bool,
            source: ValueSource::Constant(Value::Bool(true)),
        });
    }))?;
    ensure(matches!(output, DefinitionError::InvalidFieldName { .. }), format!("got {output:?}"))?;

    let step = reject_orchestrator(order_flow_with(|spec| {
        spec.steps[1].name = StepName::new("calc shipping");
    }))?;
    ensure(matches!(step, DefinitionError::InvalidStepName { .. }), format!("got {step:?}"))
}

#[test]
fn nested_shapes_are_checked_for_duplicates_and_names() -> TestResult {
    let duplicated = RecordShape::new().field("zip", ValueType::Int).field("zip", ValueType::Str);
    let mut table = access_level_table();
    table.input = table.input.field("address", ValueType::Record(duplicated.clone()));
    match DecisionTable::new(table) {
        Err(DefinitionError::DuplicateField {
            field,
            ..
        }) => ensure(field == "address.zip", format!("wrong field: {field}")),
        other => fail(format!("expected DuplicateField, got {other:?}")),
    }?;

    let error = reject_orchestrator(order_flow_with(|spec| {
        spec.input = spec.input.clone().field("address", ValueType::Record(duplicated));
    }))?;
    ensure(
        error.to_string() == "orchestrator `order_flow` input declares field `address.zip` more than once",
        format!("unexpected message: {error}"),
    )?;

    let badly_named = RecordShape::new().field("zip code", ValueType::Str);
    let mut table = access_level_table();
    table.input = table.input.field("address", ValueType::Record(badly_named));
    match DecisionTable::new(table) {
        Err(DefinitionError::InvalidFieldName {
            field,
            ..
        }) => ensure(field == "address.zip code", format!("wrong field: {field}")),
        other => fail(format!("expected InvalidFieldName, got {other:?}")),
    }
}

// ========================================================================
// SECTION: Step Structure
// ========================================================================

#[test]
fn scenario_orchestrations_register() -> TestResult {
    let mut definitions = tables_only();
    let order_flow = definitions.add_orchestrator(order_flow())?;
    let checkout = definitions.add_orchestrator(checkout())?;
    ensure(order_flow.signature().nesting_depth == 1, "order_flow calls tables only")?;
    ensure(checkout.signature().nesting_depth == 2, "checkout nests order_flow")?;
    ensure(
        order_flow.output_shape().field_type("shipping_cost") == Some(&ValueType::Float),
        "output shape follows declared outputs",
    )
}

#[test]
fn empty_orchestration_is_rejected() -> TestResult {
    let error = reject_orchestrator(order_flow_with(|spec| spec.steps.clear()))?;
    ensure(matches!(error, DefinitionError::EmptyOrchestrator { .. }), format!("got {error:?}"))
}

#[test]
fn duplicate_step_names_are_rejected() -> TestResult {
    let error = reject_orchestrator(order_flow_with(|spec| {
        spec.steps[1].name = StepName::new("check_access");
    }))?;
    ensure(matches!(error, DefinitionError::DuplicateStep { .. }), format!("got {error:?}"))
}

#[test]
fn unregistered_target_is_rejected() -> TestResult {
    let error = reject_orchestrator(order_flow_with(|spec| {
        spec.steps[1].target = StepTarget::Table(TableId::new("tax_rate"));
    }))?;
    match error {
        DefinitionError::UnknownTarget {
            step,
            target,
            ..
        } => {
            ensure(step.as_str() == "calc_shipping", "wrong step")?;
            ensure(target == "table `tax_rate`", format!("wrong target: {target}"))
        }
        other => fail(format!("expected UnknownTarget, got {other:?}")),
    }
}

#[test]
fn self_reference_is_an_unknown_target() -> TestResult {
    let error = reject_orchestrator(order_flow_with(|spec| {
        spec.steps[1].target = StepTarget::Orchestrator(OrchestratorId::new("order_flow"));
    }))?;
    ensure(matches!(error, DefinitionError::UnknownTarget { .. }), format!("got {error:?}"))
}

#[test]
fn step_count_and_nesting_limits_are_enforced() -> TestResult {
    let mut definitions = Definitions::with_limits(EngineLimits {
        max_nesting_depth: 1,
        ..EngineLimits::default()
    });
    definitions.add_table(access_level_table())?;
    definitions.add_table(shipping_rate_table())?;
    definitions.add_table(loyalty_discount_table())?;
    definitions.add_orchestrator(order_flow())?;
    ensure(
        matches!(
            definitions.add_orchestrator(checkout()),
            Err(DefinitionError::NestingTooDeep { depth: 2, max: 1, .. })
        ),
        "nesting limit",
    )?;

    let mut narrow = Definitions::with_limits(EngineLimits {
        max_steps: 1,
        ..EngineLimits::default()
    });
    narrow.add_table(access_level_table())?;
    narrow.add_table(shipping_rate_table())?;
    ensure(
        matches!(narrow.add_orchestrator(order_flow()), Err(DefinitionError::TooManySteps { count: 2, .. })),
        "step limit",
    )
}

#[test]
fn duplicate_orchestrator_ids_are_rejected() -> TestResult {
    let mut definitions = tables_only();
    definitions.add_orchestrator(order_flow())?;
    ensure(
        matches!(definitions.add_orchestrator(order_flow()), Err(DefinitionError::DuplicateOrchestrator(_))),
        "duplicate id",
    )
}

// ========================================================================
// SECTION: Bindings
// ========================================================================

#[test]
fn every_target_field_must_be_bound_once() -> TestResult {
    let missing = reject_orchestrator(order_flow_with(|spec| {
        spec.steps[0].inputs.pop();
    }))?;
    ensure(
        matches!(&missing, DefinitionError::MissingBinding { field, .. } if field.as_str() == "verified"),
        format!("got {missing:?}"),
    )?;

    let duplicate = reject_orchestrator(order_flow_with(|spec| {
        spec.steps[0].inputs.push(InputBinding::from_input("role"));
    }))?;
    ensure(matches!(duplicate, DefinitionError::DuplicateBinding { .. }), format!("got {duplicate:?}"))?;

    let unknown = reject_orchestrator(order_flow_with(|spec| {
        spec.steps[0].inputs.push(InputBinding::from_input("zone"));
    }))?;
    ensure(matches!(unknown, DefinitionError::UnknownBindingField { .. }), format!("got {unknown:?}"))
}

#[test]
fn bindings_must_read_declared_inputs() -> TestResult {
    let error = reject_orchestrator(order_flow_with(|spec| {
        spec.steps[0].inputs[0] = InputBinding::new("role", ValueSource::Input("user_role".into()));
    }))?;
    ensure(
        matches!(&error, DefinitionError::UnknownInputField { field, .. } if field.as_str() == "user_role"),
        format!("got {error:?}"),
    )
}

#[test]
fn bindings_cannot_read_later_or_unknown_steps() -> TestResult {
    let forward = reject_orchestrator(order_flow_with(|spec| {
        spec.steps[0].inputs[0] = InputBinding::new("role", ValueSource::step("calc_shipping"));
    }))?;
    ensure(
        matches!(&forward, DefinitionError::ForwardStepReference { step, .. } if step.as_str() == "calc_shipping"),
        format!("got {forward:?}"),
    )?;

    let own = reject_orchestrator(order_flow_with(|spec| {
        spec.steps[0].inputs[0] = InputBinding::new("role", ValueSource::step("check_access"));
    }))?;
    ensure(matches!(own, DefinitionError::ForwardStepReference { .. }), format!("got {own:?}"))?;

    let unknown = reject_orchestrator(order_flow_with(|spec| {
        spec.steps[1].inputs[0] = InputBinding::new("weight_kg", ValueSource::step("weigh_parcel"));
    }))?;
    ensure(matches!(unknown, DefinitionError::UnknownStepReference { .. }), format!("got {unknown:?}"))
}

#[test]
fn binding_types_must_be_assignable() -> TestResult {
    // An int result may feed a float field, but a string input may not feed an int field.
    let mut definitions = tables_only();
    definitions.add_orchestrator(order_flow_with(|spec| {
        spec.steps[1].inputs[0] = InputBinding::new("weight_kg", ValueSource::step("check_access"));
    }))?;

    let mismatch = reject_orchestrator(order_flow_with(|spec| {
        spec.steps[1].inputs[0] = InputBinding::new("weight_kg", ValueSource::Input("zone".into()));
    }))?;
    ensure(matches!(mismatch, DefinitionError::SourceTypeMismatch { .. }), format!("got {mismatch:?}"))
}

#[test]
fn step_paths_must_exist_in_record_results() -> TestResult {
    let mut definitions = tables_only();
    definitions.add_orchestrator(order_flow())?;
    let mut spec = checkout();
    spec.steps[1].inputs[0] =
        InputBinding::new("access_level", ValueSource::step_field("order", path("loyalty_points")));
    match definitions.add_orchestrator(spec) {
        Err(DefinitionError::InvalidStepPath {
            path,
            ..
        }) => ensure(path == "loyalty_points", format!("wrong path: {path}")),
        other => fail(format!("expected InvalidStepPath, got {other:?}")),
    }
}

#[test]
fn scalar_results_have_no_fields() -> TestResult {
    let error = reject_orchestrator(order_flow_with(|spec| {
        spec.outputs[0].source = ValueSource::step_field("check_access", path("level"));
    }))?;
    ensure(matches!(error, DefinitionError::InvalidStepPath { .. }), format!("got {error:?}"))
}

// ========================================================================
// SECTION: Gates
// ========================================================================

#[test]
fn gate_may_not_read_later_steps() -> TestResult {
    let error = reject_orchestrator(order_flow_with(|spec| {
        spec.steps[0].gate = Some(condition("calc_shipping < 100"));
    }))?;
    ensure(matches!(error, DefinitionError::ForwardStepReference { .. }), format!("got {error:?}"))
}

#[test]
fn gate_may_read_earlier_steps() -> TestResult {
    let mut definitions = tables_only();
    definitions.add_orchestrator(order_flow_with(|spec| {
        spec.steps[1].gate = Some(condition("check_access >= 50 && calc_shipping < 100"));
    }))?;
    Ok(())
}

#[test]
fn gate_predicates_must_type_check() -> TestResult {
    let mismatch = reject_orchestrator(order_flow_with(|spec| {
        spec.steps[0].gate = Some(condition(r#"check_access == "admin""#));
    }))?;
    ensure(matches!(mismatch, DefinitionError::PredicateTypeMismatch { .. }), format!("got {mismatch:?}"))?;

    let unknown = reject_orchestrator(order_flow_with(|spec| {
        spec.steps[0].gate = Some(condition("audit_score > 3"));
    }))?;
    ensure(matches!(unknown, DefinitionError::UnknownStepReference { .. }), format!("got {unknown:?}"))
}

#[test]
fn gate_messages_require_a_gate() -> TestResult {
    let error = reject_orchestrator(order_flow_with(|spec| {
        spec.steps[1].gate_message = Some("shipping unavailable".into());
    }))?;
    match error {
        DefinitionError::GateMessageWithoutGate {
            step,
            ..
        } => ensure(step.as_str() == "calc_shipping", format!("wrong step: {step}"))?,
        other => return fail(format!("expected GateMessageWithoutGate, got {other:?}")),
    }

    let mut definitions = tables_only();
    definitions.add_orchestrator(order_flow_with(|spec| {
        spec.steps[0].gate_message = Some("access level too low".into());
    }))?;
    Ok(())
}

#[test]
fn step_budgets_must_be_positive() -> TestResult {
    let error = reject_orchestrator(order_flow_with(|spec| {
        spec.steps[0].timeout_ms = Some(0);
    }))?;
    ensure(matches!(error, DefinitionError::ZeroStepBudget { .. }), format!("got {error:?}"))?;

    let mut definitions = tables_only();
    definitions.add_orchestrator(order_flow_with(|spec| {
        spec.steps[0].timeout_ms = Some(1);
    }))?;
    Ok(())
}

#[test]
fn step_options_deserialize_from_json() -> TestResult {
    let gate = serde_json::to_value(condition("check_access >= 50"))?;
    let step: StepSpec = serde_json::from_value(json!({
        "name": "check_access",
        "target": { "table": "access_level" },
        "inputs": [],
        "gate": gate,
        "gate_message": "access level too low",
        "timeout_ms": 250
    }))?;
    let expected = StepSpec::new("check_access", StepTarget::Table(TableId::new("access_level")), Vec::new())
        .gated(condition("check_access >= 50"))
        .with_gate_message("access level too low")
        .with_timeout_ms(250);
    ensure(step == expected, format!("unexpected step: {step:?}"))?;

    let plain: StepSpec = serde_json::from_value(json!({
        "name": "calc_shipping",
        "target": { "table": "shipping_rate" },
        "inputs": []
    }))?;
    ensure(plain.gate_message.is_none() && plain.timeout_ms.is_none(), "options default to absent")
}

// ========================================================================
// SECTION: Outputs
// ========================================================================

#[test]
fn outputs_must_be_unique_and_typed() -> TestResult {
    let duplicate = reject_orchestrator(order_flow_with(|spec| {
        spec.outputs.push(OutputField {
            name: "can_order".into(),
            ty: ValueType::Bool,
            source: ValueSource::Constant(Value::Bool(false)),
        });
    }))?;
    ensure(matches!(duplicate, DefinitionError::DuplicateOutput { .. }), format!("got {duplicate:?}"))?;

    let mismatch = reject_orchestrator(order_flow_with(|spec| {
        spec.outputs[0].ty = ValueType::Str;
    }))?;
    ensure(matches!(mismatch, DefinitionError::SourceTypeMismatch { .. }), format!("got {mismatch:?}"))
}

#[test]
fn outputs_must_resolve() -> TestResult {
    let error = reject_orchestrator(order_flow_with(|spec| {
        spec.outputs.push(OutputField {
            name: "tax".into(),
            ty: ValueType::Float,
            source: ValueSource::step("calc_tax"),
        });
    }))?;
    ensure(matches!(error, DefinitionError::UnknownStepReference { .. }), format!("got {error:?}"))
}

#[test]
fn definition_errors_render_context() -> TestResult {
    let error = reject_orchestrator(order_flow_with(|spec| {
        spec.steps[0].inputs[0] = InputBinding::new("role", ValueSource::step("calc_shipping"));
    }))?;
    let message = error.to_string();
    ensure(
        message == "step `check_access` field `role` in `order_flow` reads step `calc_shipping` before it has run",
        format!("unexpected message: {message}"),
    )
}
