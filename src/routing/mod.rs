//! Lead routing: assignment, duplicate detection and merging.
//!
//! [`RoutingCoordinator::run_cycle`] ties the pure engines together over one
//! snapshot. It performs no I/O and never fails as a whole; per-item
//! failures are collected into the report.

pub mod assignment;
pub mod condition;
pub mod match_index;
pub mod merge;

pub use assignment::{Assignment, AssignmentEngine, RuleIssue};
pub use match_index::{group_id, normalize, MatchIndex};
pub use merge::{MergePlan, MergeResolver};

use crate::config::{AssignmentConfig, Config, MatchConfig, MergeConfig};
use crate::domain::{Actor, AssignmentRule, DuplicateGroup, LeadRecord, TeamMember};
use crate::error::AppError;
use crate::policy::{filter_records, has_permission, permissions, RecordType};
use metrics::{counter, histogram};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Cooperative cancellation shared between a running cycle and its caller.
/// Checked between records and between groups.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A failure scoped to one record, rule or group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleError {
    pub item_id: String,
    pub kind: String,
    pub message: String,
}

impl CycleError {
    fn from_app_error(item_id: impl Into<String>, err: &AppError) -> Self {
        Self {
            item_id: item_id.into(),
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    /// Records visible to the actor, after assignment and merging
    pub updated_records: Vec<LeadRecord>,
    /// Team with workloads bumped by this cycle's assignments
    pub team: Vec<TeamMember>,
    pub assignments: Vec<Assignment>,
    pub duplicate_groups: Vec<DuplicateGroup>,
    pub merges: Vec<MergePlan>,
    pub errors: Vec<CycleError>,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RoutingCoordinator {
    assignment: AssignmentConfig,
    matching: MatchConfig,
    merge: MergeConfig,
}

impl RoutingCoordinator {
    pub fn new(config: &Config) -> Self {
        Self {
            assignment: config.assignment.clone(),
            matching: config.matching.clone(),
            merge: config.merge.clone(),
        }
    }

    pub fn run_cycle(
        &self,
        actor: &Actor,
        records: &[LeadRecord],
        rules: &[AssignmentRule],
        team: &[TeamMember],
    ) -> CycleReport {
        self.run_cycle_with(actor, records, rules, team, &[], &CancelFlag::new())
    }

    /// Full cycle: filter → assign → scan → optional auto-merge.
    ///
    /// `ignored` holds ids of groups previously dismissed, which the scan
    /// drops. When `cancel` trips, the cycle stops at the next record or
    /// group boundary and returns what it has so far.
    pub fn run_cycle_with(
        &self,
        actor: &Actor,
        records: &[LeadRecord],
        rules: &[AssignmentRule],
        team: &[TeamMember],
        ignored: &[String],
        cancel: &CancelFlag,
    ) -> CycleReport {
        let started = Instant::now();
        let mut report = CycleReport {
            updated_records: filter_records(
                Some(actor.role),
                &actor.id,
                records,
                Some(&RecordType::Leads),
            ),
            team: team.to_vec(),
            ..Default::default()
        };

        let engine = AssignmentEngine::new(rules, &self.assignment);
        for issue in engine.rule_issues(&report.team) {
            report.errors.push(CycleError {
                item_id: issue.rule_id,
                kind: "validation".to_string(),
                message: issue.message,
            });
        }

        self.assign_unassigned(&engine, &mut report, cancel);

        if !report.cancelled {
            report.duplicate_groups = MatchIndex::new(&self.matching)
                .with_ignored(ignored.iter().cloned())
                .scan(&report.updated_records);
            counter!("leadflow_duplicate_groups_total")
                .increment(report.duplicate_groups.len() as u64);
        }

        if !report.cancelled {
            if let Some(threshold) = self.merge.auto_merge_threshold {
                if has_permission(actor.role, permissions::MERGE_DUPLICATES) {
                    auto_merge(threshold, &mut report, cancel);
                } else {
                    tracing::debug!(
                        actor_id = %actor.id,
                        role = %actor.role,
                        "auto-merge skipped, actor may not merge"
                    );
                }
            }
        }

        if !report.errors.is_empty() {
            counter!("leadflow_cycle_errors_total").increment(report.errors.len() as u64);
        }
        histogram!("leadflow_cycle_duration_seconds").record(started.elapsed().as_secs_f64());

        tracing::info!(
            actor_id = %actor.id,
            visible = report.updated_records.len(),
            assigned = report.assignments.len(),
            groups = report.duplicate_groups.len(),
            merges = report.merges.len(),
            errors = report.errors.len(),
            cancelled = report.cancelled,
            "routing cycle finished"
        );
        report
    }

    fn assign_unassigned(
        &self,
        engine: &AssignmentEngine<'_>,
        report: &mut CycleReport,
        cancel: &CancelFlag,
    ) {
        for record in report.updated_records.iter_mut() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                return;
            }
            if record.retired || !record.is_unassigned() {
                continue;
            }
            match engine.assign(record, &mut report.team) {
                Some(assignment) => {
                    counter!("leadflow_assignments_total").increment(1);
                    report.assignments.push(assignment);
                }
                None => {
                    counter!("leadflow_unassigned_total").increment(1);
                    tracing::debug!(lead_id = %record.id, "no rule matched, lead stays unassigned");
                }
            }
        }
    }
}

fn auto_merge(threshold: f64, report: &mut CycleReport, cancel: &CancelFlag) {
    let resolver = MergeResolver::new();
    let mut retired: HashSet<String> = HashSet::new();

    for index in 0..report.duplicate_groups.len() {
        if cancel.is_cancelled() {
            report.cancelled = true;
            return;
        }
        let group = &report.duplicate_groups[index];
        if group.confidence < threshold || !group.is_pending() {
            continue;
        }

        if let Some(gone) = group.members.iter().find(|m| retired.contains(&m.id)) {
            let err = AppError::InvalidState(format!(
                "member {} was already merged in this cycle",
                gone.id
            ));
            tracing::warn!(group_id = %group.id, error = %err, "auto-merge aborted for group");
            report
                .errors
                .push(CycleError::from_app_error(group.id.clone(), &err));
            continue;
        }

        // Earlier merges may have back-filled a member; plan on current data.
        let current: HashMap<&str, &LeadRecord> = report
            .updated_records
            .iter()
            .map(|r| (r.id.as_str(), r))
            .collect();
        let mut fresh = group.clone();
        for member in fresh.members.iter_mut() {
            if let Some(latest) = current.get(member.id.as_str()) {
                *member = (*latest).clone();
            }
        }

        match resolver.merge(&fresh) {
            Ok(plan) => {
                plan.apply(&mut report.updated_records);
                retired.extend(plan.retired_ids.iter().cloned());
                report.duplicate_groups[index] = plan.group.clone();
                counter!("leadflow_merges_total").increment(1);
                tracing::info!(
                    group_id = %plan.group.id,
                    primary_id = %plan.primary.id,
                    retired = plan.retired_ids.len(),
                    "duplicate group auto-merged"
                );
                report.merges.push(plan);
            }
            Err(err) => {
                tracing::warn!(group_id = %fresh.id, error = %err, "auto-merge failed");
                report.errors.push(CycleError::from_app_error(fresh.id, &err));
            }
        }
    }
}
