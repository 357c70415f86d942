//! Common test fixtures

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use leadflow_core::domain::{
    Actor, AssignmentRule, ConditionOperator, LeadRecord, Role, RuleCondition, Snapshot,
    TeamMember,
};
use leadflow_core::notify::{Notifier, RoutingEvent};
use leadflow_core::Result;
use serde_json::json;
use std::sync::Mutex;

pub fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).unwrap()
}

pub fn manager() -> Actor {
    Actor::new("tm-1", Role::SalesManager, "Navneet Kumar")
}

pub fn admin() -> Actor {
    Actor::new("adm-1", Role::Admin, "Operations")
}

pub fn rep(id: &str) -> Actor {
    Actor::new(id, Role::SalesRep, "Rep")
}

pub fn team() -> Vec<TeamMember> {
    vec![
        TeamMember::new("tm-1", "Navneet Kumar", Role::SalesManager, 5),
        TeamMember::new("tm-2", "Priya Sharma", Role::SalesRep, 8),
        TeamMember::new("tm-3", "Amit Verma", Role::SalesRep, 3),
    ]
}

pub fn rules() -> Vec<AssignmentRule> {
    vec![
        AssignmentRule {
            id: "r-high-value".to_string(),
            name: "High value deals".to_string(),
            conditions: vec![RuleCondition::new(
                "estimatedValue",
                ConditionOperator::GreaterThan,
                json!(500000),
            )],
            assign_to: "Navneet Kumar".to_string(),
            priority: 1,
            is_active: true,
        },
        AssignmentRule {
            id: "r-tech".to_string(),
            name: "Technology leads".to_string(),
            conditions: vec![RuleCondition::new(
                "industry",
                ConditionOperator::Equals,
                json!("Technology"),
            )],
            assign_to: "tm-2".to_string(),
            priority: 2,
            is_active: true,
        },
    ]
}

pub fn leads() -> Vec<LeadRecord> {
    vec![
        LeadRecord {
            contact_person: Some("Rajesh Kumar".to_string()),
            company_name: Some("Tech Solutions Pvt Ltd".to_string()),
            email: Some("rajesh@techsolutions.com".to_string()),
            industry: Some("Technology".to_string()),
            estimated_value: Some(750000.0),
            ..LeadRecord::new("L-1", date(12, 15))
        },
        LeadRecord {
            contact_person: Some("Rajesh K.".to_string()),
            company_name: Some("Tech Solutions".to_string()),
            email: Some("Rajesh@TechSolutions.com".to_string()),
            phone: Some("+91 98765 43210".to_string()),
            industry: Some("Technology".to_string()),
            estimated_value: Some(120000.0),
            ..LeadRecord::new("L-2", date(12, 18))
        },
        LeadRecord {
            contact_person: Some("Meera Nair".to_string()),
            company_name: Some("Green Farms".to_string()),
            industry: Some("Agriculture".to_string()),
            estimated_value: Some(40000.0),
            ..LeadRecord::new("L-3", date(12, 1))
        },
        LeadRecord {
            contact_person: Some("Owned Lead".to_string()),
            assigned_to: Some("u9".to_string()),
            ..LeadRecord::new("L-4", date(11, 20))
        },
    ]
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        leads: leads(),
        rules: rules(),
        team: team(),
        duplicate_groups: vec![],
    }
}

/// Notifier that keeps every event for later inspection.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<RoutingEvent>>,
}

impl RecordingNotifier {
    pub fn event_types(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.event_type.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn publish(&self, event: RoutingEvent) -> Result<()> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}
