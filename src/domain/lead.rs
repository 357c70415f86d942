//! Lead records

use super::common::{field_key, non_blank, OwnedRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Qualified,
    Proposal,
    Converted,
    Customer,
    Lost,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Proposal => "proposal",
            LeadStatus::Converted => "converted",
            LeadStatus::Customer => "customer",
            LeadStatus::Lost => "lost",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeadPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl LeadPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadPriority::Low => "low",
            LeadPriority::Medium => "medium",
            LeadPriority::High => "high",
            LeadPriority::Urgent => "urgent",
        }
    }
}

/// A lead as captured on intake.
///
/// Descriptive fields are optional: intake forms, imports and API clients all
/// produce partial records, and every matching and rule operation treats a
/// missing or blank value as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadRecord {
    pub id: String,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub lead_source: Option<String>,
    #[serde(default, deserialize_with = "non_negative_value")]
    pub estimated_value: Option<f64>,
    #[serde(default)]
    pub status: LeadStatus,
    #[serde(default)]
    pub priority: LeadPriority,
    /// Team member id (or display name for legacy records)
    #[serde(default)]
    pub assigned_to: Option<String>,
    pub created_date: NaiveDate,
    /// Set once the record has been absorbed into another by a merge
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub retired: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_into: Option<String>,
}

impl LeadRecord {
    pub fn new(id: impl Into<String>, created_date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            contact_person: None,
            company_name: None,
            email: None,
            phone: None,
            industry: None,
            lead_source: None,
            estimated_value: None,
            status: LeadStatus::New,
            priority: LeadPriority::Medium,
            assigned_to: None,
            created_date,
            retired: false,
            merged_into: None,
        }
    }

    pub fn is_unassigned(&self) -> bool {
        non_blank(self.assigned_to.as_deref()).is_none()
    }

    /// Typed value of a named field, for rule evaluation.
    ///
    /// Field names are matched loosely (`estimatedValue` / `estimated_value`).
    /// Blank strings and unknown fields yield `None`.
    pub fn field_value(&self, field: &str) -> Option<Value> {
        let text = |v: &Option<String>| non_blank(v.as_deref()).map(|s| json!(s));
        match field_key(field).as_str() {
            "id" => Some(json!(self.id)),
            "contactperson" => text(&self.contact_person),
            "companyname" | "company" => text(&self.company_name),
            "email" => text(&self.email),
            "phone" => text(&self.phone),
            "industry" => text(&self.industry),
            "leadsource" | "source" => text(&self.lead_source),
            "estimatedvalue" | "value" => self
                .estimated_value
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            "status" => Some(json!(self.status.as_str())),
            "priority" => Some(json!(self.priority.as_str())),
            "assignedto" => text(&self.assigned_to),
            "createddate" => Some(json!(self.created_date.to_string())),
            _ => None,
        }
    }
}

fn non_negative_value<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<f64>::deserialize(deserializer)? {
        Some(value) if !value.is_finite() || value < 0.0 => Err(serde::de::Error::custom(
            format!("estimatedValue must be a non-negative number, got {}", value),
        )),
        value => Ok(value),
    }
}

impl OwnedRecord for LeadRecord {
    fn owner(&self) -> Option<&str> {
        self.assigned_to.as_deref()
    }
}
