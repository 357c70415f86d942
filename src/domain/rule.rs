//! Assignment rule domain models

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

/// Comparison applied by a rule condition.
///
/// Operators this build does not know deserialize to `Unsupported` instead of
/// failing the whole rule set; such a condition simply never matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    GreaterThan,
    LessThan,
    Contains,
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleCondition {
    pub field: String,
    pub operator: ConditionOperator,
    #[serde(default)]
    pub value: Value,
}

impl RuleCondition {
    pub fn new(field: impl Into<String>, operator: ConditionOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }
}

/// Condition-to-assignee mapping. Lower `priority` is evaluated first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRule {
    pub id: String,
    pub name: String,
    /// ANDed; an empty list matches every record
    #[serde(default)]
    pub conditions: Vec<RuleCondition>,
    /// Team member id or display name
    pub assign_to: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Input for creating an assignment rule
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRuleInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(custom(function = "validate_conditions"))]
    pub conditions: Vec<RuleCondition>,
    #[validate(length(min = 1, max = 255))]
    pub assign_to: String,
    #[validate(range(min = 0, max = 10000))]
    pub priority: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// Input for updating an assignment rule; `None` keeps the existing value
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRuleInput {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(custom(function = "validate_conditions"))]
    pub conditions: Option<Vec<RuleCondition>>,
    #[validate(length(min = 1, max = 255))]
    pub assign_to: Option<String>,
    #[validate(range(min = 0, max = 10000))]
    pub priority: Option<i32>,
    pub is_active: Option<bool>,
}

/// Rejects operators unknown to the engine and ordering comparisons against
/// non-numeric values. Stored rules are still evaluated totally; this only
/// keeps obviously dead conditions out of new rules.
fn validate_conditions(conditions: &[RuleCondition]) -> Result<(), validator::ValidationError> {
    for condition in conditions {
        if condition.field.trim().is_empty() {
            return Err(validator::ValidationError::new("empty_condition_field"));
        }
        match condition.operator {
            ConditionOperator::Unsupported => {
                return Err(validator::ValidationError::new("unsupported_operator"));
            }
            ConditionOperator::GreaterThan | ConditionOperator::LessThan => {
                let numeric = match &condition.value {
                    Value::Number(_) => true,
                    Value::String(s) => s.trim().parse::<f64>().is_ok(),
                    _ => false,
                };
                if !numeric {
                    return Err(validator::ValidationError::new("non_numeric_comparison"));
                }
            }
            ConditionOperator::Equals | ConditionOperator::Contains => {
                if condition.value.is_null() {
                    return Err(validator::ValidationError::new("missing_condition_value"));
                }
            }
        }
    }
    Ok(())
}
