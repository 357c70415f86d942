//! Rule condition evaluation.
//!
//! Evaluation is total: a missing field, an unsupported operator or a value
//! that cannot be coerced makes the condition false, never an error.

use crate::domain::{AssignmentRule, ConditionOperator, LeadRecord, RuleCondition};
use serde_json::Value;
use std::cmp::Ordering;

/// True iff every condition of the rule holds for the record.
pub fn rule_matches(rule: &AssignmentRule, record: &LeadRecord) -> bool {
    rule.conditions.iter().all(|c| eval_condition(c, record))
}

pub fn eval_condition(condition: &RuleCondition, record: &LeadRecord) -> bool {
    let Some(left) = record.field_value(&condition.field) else {
        return false;
    };
    let expected = &condition.value;

    match condition.operator {
        ConditionOperator::Equals => values_equal(&left, expected),
        ConditionOperator::GreaterThan => {
            compare_numbers(&left, expected) == Some(Ordering::Greater)
        }
        ConditionOperator::LessThan => compare_numbers(&left, expected) == Some(Ordering::Less),
        ConditionOperator::Contains => contains(&left, expected),
        ConditionOperator::Unsupported => false,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_lowercase()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn compare_numbers(left: &Value, right: &Value) -> Option<Ordering> {
    let l = as_number(left)?;
    let r = as_number(right)?;
    l.partial_cmp(&r)
}

fn values_equal(left: &Value, right: &Value) -> bool {
    if left.is_number() || right.is_number() {
        return compare_numbers(left, right) == Some(Ordering::Equal);
    }
    match (left, right) {
        (Value::String(a), Value::String(b)) => a.trim().eq_ignore_ascii_case(b.trim()),
        _ => left == right,
    }
}

fn contains(left: &Value, expected: &Value) -> bool {
    let (Some(haystack), Some(needle)) = (as_text(left), as_text(expected)) else {
        return false;
    };
    !needle.is_empty() && haystack.contains(&needle)
}
