//! Rule-based lead assignment.
//!
//! Per record: `unassigned → evaluating → assigned | unassigned (no match)`.
//! Active rules run in ascending priority; the first match wins. The only
//! deviation is the workload cap: an overloaded target is relieved by the
//! least-loaded member holding the same role.

use super::condition::rule_matches;
use crate::config::AssignmentConfig;
use crate::domain::{find_member, AssignmentRule, ConditionOperator, LeadRecord, TeamMember};
use serde::Serialize;

/// Result of routing one lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub lead_id: String,
    pub rule_id: String,
    pub member_id: String,
    pub member_name: String,
    /// Original rule target when the lead was rerouted for workload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerouted_from: Option<String>,
}

/// A stored rule that can never fire as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleIssue {
    pub rule_id: String,
    pub message: String,
}

pub struct AssignmentEngine<'a> {
    rules: Vec<&'a AssignmentRule>,
    workload_cap: u32,
}

impl<'a> AssignmentEngine<'a> {
    pub fn new(rules: &'a [AssignmentRule], config: &AssignmentConfig) -> Self {
        let mut active: Vec<&AssignmentRule> = rules.iter().filter(|r| r.is_active).collect();
        active.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        Self {
            rules: active,
            workload_cap: config.workload_cap,
        }
    }

    /// Active rules in evaluation order.
    pub fn rules(&self) -> &[&'a AssignmentRule] {
        &self.rules
    }

    /// Decide the assignee for a record without touching any state.
    ///
    /// Rules whose assignee does not resolve to a team member are skipped as
    /// if they had not matched.
    pub fn evaluate(&self, record: &LeadRecord, team: &[TeamMember]) -> Option<Assignment> {
        for rule in &self.rules {
            if !rule_matches(rule, record) {
                continue;
            }
            let Some(target) = find_member(team, &rule.assign_to) else {
                tracing::warn!(
                    rule_id = %rule.id,
                    assign_to = %rule.assign_to,
                    "rule matched but its assignee is not a team member"
                );
                continue;
            };

            let chosen = self.relieve_overload(target, team);
            let rerouted_from = (chosen.id != target.id).then(|| target.id.clone());
            if let Some(from) = &rerouted_from {
                tracing::info!(
                    lead_id = %record.id,
                    rule_id = %rule.id,
                    from = %from,
                    to = %chosen.id,
                    workload = target.workload,
                    cap = self.workload_cap,
                    "assignee over workload cap, rerouting"
                );
            }

            return Some(Assignment {
                lead_id: record.id.clone(),
                rule_id: rule.id.clone(),
                member_id: chosen.id.clone(),
                member_name: chosen.name.clone(),
                rerouted_from,
            });
        }
        None
    }

    /// Evaluate and apply: sets `assigned_to` and bumps the member's workload
    /// by exactly one. Leaves both untouched when no rule matches.
    pub fn assign(&self, record: &mut LeadRecord, team: &mut [TeamMember]) -> Option<Assignment> {
        let assignment = self.evaluate(record, team)?;
        if let Some(member) = team.iter_mut().find(|m| m.id == assignment.member_id) {
            member.workload = member.workload.saturating_add(1);
        }
        record.assigned_to = Some(assignment.member_id.clone());
        tracing::debug!(
            lead_id = %record.id,
            member_id = %assignment.member_id,
            rule_id = %assignment.rule_id,
            "lead assigned"
        );
        Some(assignment)
    }

    /// Pick the least-loaded member sharing the target's role when the target
    /// is over the cap. Ties go to the smallest id. The target is kept when
    /// nobody in its role carries strictly less work.
    fn relieve_overload<'t>(&self, target: &'t TeamMember, team: &'t [TeamMember]) -> &'t TeamMember {
        if target.workload <= self.workload_cap {
            return target;
        }
        team.iter()
            .filter(|m| m.role == target.role && m.workload < target.workload)
            .min_by(|a, b| a.workload.cmp(&b.workload).then_with(|| a.id.cmp(&b.id)))
            .unwrap_or(target)
    }

    /// Active rules that cannot fire: unknown assignee or an operator the
    /// engine does not understand.
    pub fn rule_issues(&self, team: &[TeamMember]) -> Vec<RuleIssue> {
        let mut issues = vec![];
        for rule in &self.rules {
            if find_member(team, &rule.assign_to).is_none() {
                issues.push(RuleIssue {
                    rule_id: rule.id.clone(),
                    message: format!("assignee '{}' is not a team member", rule.assign_to),
                });
            }
            if let Some(c) = rule
                .conditions
                .iter()
                .find(|c| c.operator == ConditionOperator::Unsupported)
            {
                issues.push(RuleIssue {
                    rule_id: rule.id.clone(),
                    message: format!("condition on '{}' uses an unsupported operator", c.field),
                });
            }
        }
        issues
    }
}
