//! Routing service: cycles and the duplicate group lifecycle

use crate::config::Config;
use crate::domain::{Actor, DuplicateGroup, GroupStatus, LeadRecord, Snapshot};
use crate::error::{AppError, Result};
use crate::notify::{self, Notifier, RoutingEvent};
use crate::policy::{enforce, filter_records, permissions, RecordType};
use crate::repository::SnapshotRepository;
use crate::routing::{
    CancelFlag, CycleReport, MatchIndex, MergePlan, MergeResolver, RoutingCoordinator,
};
use metrics::counter;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct RoutingService<R: SnapshotRepository> {
    repo: Arc<R>,
    config: Config,
    coordinator: RoutingCoordinator,
    notifier: Option<Arc<dyn Notifier>>,
    /// Serializes load → modify → save against the repository
    write_lock: Mutex<()>,
}

impl<R: SnapshotRepository> RoutingService<R> {
    pub fn new(repo: Arc<R>, config: Config, notifier: Option<Arc<dyn Notifier>>) -> Self {
        Self {
            repo,
            coordinator: RoutingCoordinator::new(&config),
            config,
            notifier,
            write_lock: Mutex::new(()),
        }
    }

    /// Run one routing cycle over the stored snapshot and persist the result.
    ///
    /// A cancelled cycle still persists the assignments made before the flag
    /// tripped.
    pub async fn run_cycle(&self, actor: &Actor, cancel: &CancelFlag) -> Result<CycleReport> {
        let _guard = self.write_lock.lock().await;
        let mut snapshot = self.repo.load().await?;

        let ignored = ignored_ids(&snapshot);
        let report = self.coordinator.run_cycle_with(
            actor,
            &snapshot.leads,
            &snapshot.rules,
            &snapshot.team,
            &ignored,
            cancel,
        );

        snapshot.upsert_leads(report.updated_records.iter().cloned());
        snapshot.team = report.team.clone();
        if !report.cancelled {
            replace_pending_groups(
                &mut snapshot,
                &report.updated_records,
                &report.duplicate_groups,
            );
        }
        self.repo.save(&snapshot).await?;

        for assignment in &report.assignments {
            self.publish(RoutingEvent::new(
                notify::LEAD_ASSIGNED,
                json!({
                    "lead_id": assignment.lead_id,
                    "member_id": assignment.member_id,
                    "rule_id": assignment.rule_id,
                    "rerouted_from": assignment.rerouted_from,
                }),
            ))
            .await;
        }
        for group in report.duplicate_groups.iter().filter(|g| g.is_pending()) {
            self.publish(detected_event(group)).await;
        }
        for plan in &report.merges {
            self.publish(merged_event(plan)).await;
        }

        Ok(report)
    }

    /// Scan the actor's visible leads for duplicates and store the pending
    /// groups so they can be merged or ignored by id.
    pub async fn scan_duplicates(&self, actor: &Actor) -> Result<Vec<DuplicateGroup>> {
        enforce(actor, permissions::MANAGE_DUPLICATE_DETECTION)?;
        let _guard = self.write_lock.lock().await;
        let mut snapshot = self.repo.load().await?;

        let visible = filter_records(
            Some(actor.role),
            &actor.id,
            &snapshot.leads,
            Some(&RecordType::Leads),
        );
        let groups = MatchIndex::new(&self.config.matching)
            .with_ignored(ignored_ids(&snapshot))
            .scan(&visible);
        counter!("leadflow_duplicate_groups_total").increment(groups.len() as u64);

        replace_pending_groups(&mut snapshot, &visible, &groups);
        self.repo.save(&snapshot).await?;

        for group in &groups {
            self.publish(detected_event(group)).await;
        }
        Ok(groups)
    }

    /// Stored groups, optionally narrowed to one status.
    pub async fn list_groups(
        &self,
        actor: &Actor,
        status: Option<GroupStatus>,
    ) -> Result<Vec<DuplicateGroup>> {
        enforce(actor, permissions::MANAGE_DUPLICATE_DETECTION)?;
        let snapshot = self.repo.load().await?;
        Ok(snapshot
            .duplicate_groups
            .into_iter()
            .filter(|g| status.map_or(true, |s| g.status == s))
            .collect())
    }

    /// Merge a stored pending group into its primary record.
    pub async fn merge_group(&self, actor: &Actor, group_id: &str) -> Result<MergePlan> {
        enforce(actor, permissions::MERGE_DUPLICATES)?;
        let _guard = self.write_lock.lock().await;
        let mut snapshot = self.repo.load().await?;

        let group = find_group(&snapshot, group_id)?;
        let current = refresh_members(group, &snapshot.leads)?;
        let plan = MergeResolver::new().merge(&current)?;

        plan.apply(&mut snapshot.leads);
        snapshot.upsert_group(plan.group.clone());
        self.repo.save(&snapshot).await?;

        counter!("leadflow_merges_total").increment(1);
        tracing::info!(
            actor_id = %actor.id,
            group_id = %plan.group.id,
            primary_id = %plan.primary.id,
            retired = plan.retired_ids.len(),
            "duplicate group merged"
        );
        self.publish(merged_event(&plan)).await;
        Ok(plan)
    }

    /// Mark a pending group as "not a duplicate"; later scans skip it.
    pub async fn ignore_group(&self, actor: &Actor, group_id: &str) -> Result<DuplicateGroup> {
        self.transition(
            actor,
            group_id,
            GroupStatus::Pending,
            GroupStatus::Ignored,
            notify::GROUP_IGNORED,
        )
        .await
    }

    /// Put an ignored group back up for review.
    pub async fn retrigger_group(&self, actor: &Actor, group_id: &str) -> Result<DuplicateGroup> {
        self.transition(
            actor,
            group_id,
            GroupStatus::Ignored,
            GroupStatus::Pending,
            notify::GROUP_RETRIGGERED,
        )
        .await
    }

    async fn transition(
        &self,
        actor: &Actor,
        group_id: &str,
        from: GroupStatus,
        to: GroupStatus,
        event_type: &str,
    ) -> Result<DuplicateGroup> {
        enforce(actor, permissions::MANAGE_DUPLICATE_DETECTION)?;
        let _guard = self.write_lock.lock().await;
        let mut snapshot = self.repo.load().await?;

        let mut group = find_group(&snapshot, group_id)?.clone();
        if group.status != from {
            return Err(AppError::InvalidState(format!(
                "duplicate group {} is {}, expected {}",
                group.id,
                group.status.as_str(),
                from.as_str()
            )));
        }
        group.status = to;
        snapshot.upsert_group(group.clone());
        self.repo.save(&snapshot).await?;

        tracing::info!(
            actor_id = %actor.id,
            group_id = %group.id,
            status = to.as_str(),
            "duplicate group status changed"
        );
        self.publish(RoutingEvent::new(
            event_type,
            json!({ "group_id": group.id, "actor_id": actor.id }),
        ))
        .await;
        Ok(group)
    }

    async fn publish(&self, event: RoutingEvent) {
        if let Some(notifier) = &self.notifier {
            let event_type = event.event_type.clone();
            if let Err(e) = notifier.publish(event).await {
                tracing::warn!("Failed to publish {} event: {}", event_type, e);
            }
        }
    }
}

fn ignored_ids(snapshot: &Snapshot) -> Vec<String> {
    snapshot
        .duplicate_groups
        .iter()
        .filter(|g| g.status == GroupStatus::Ignored)
        .map(|g| g.id.clone())
        .collect()
}

fn find_group<'a>(snapshot: &'a Snapshot, group_id: &str) -> Result<&'a DuplicateGroup> {
    snapshot
        .find_group(group_id)
        .ok_or_else(|| AppError::NotFound(format!("Duplicate group {} not found", group_id)))
}

/// Swap each member for its stored version. A member that has since been
/// removed or merged elsewhere makes the group stale.
fn refresh_members(group: &DuplicateGroup, leads: &[LeadRecord]) -> Result<DuplicateGroup> {
    let mut current = group.clone();
    for member in current.members.iter_mut() {
        match leads.iter().find(|l| l.id == member.id) {
            Some(latest) if !latest.retired => *member = latest.clone(),
            _ => {
                return Err(AppError::InvalidState(format!(
                    "member {} of duplicate group {} is no longer active",
                    member.id, group.id
                )))
            }
        }
    }
    Ok(current)
}

/// Drop stored pending groups that were fully within the scanned records
/// (the scan would have re-emitted them), then store the new scan result.
fn replace_pending_groups(
    snapshot: &mut Snapshot,
    scanned: &[LeadRecord],
    groups: &[DuplicateGroup],
) {
    let scanned: HashSet<&str> = scanned.iter().map(|r| r.id.as_str()).collect();
    snapshot.duplicate_groups.retain(|g| {
        !g.is_pending() || !g.members.iter().all(|m| scanned.contains(m.id.as_str()))
    });
    for group in groups {
        snapshot.upsert_group(group.clone());
    }
}

fn detected_event(group: &DuplicateGroup) -> RoutingEvent {
    RoutingEvent::new(
        notify::DUPLICATES_DETECTED,
        json!({
            "group_id": group.id,
            "match_field": group.match_field.as_str(),
            "member_ids": group.member_ids(),
            "confidence": group.confidence,
        }),
    )
}

fn merged_event(plan: &MergePlan) -> RoutingEvent {
    RoutingEvent::new(
        notify::GROUP_MERGED,
        json!({
            "group_id": plan.group.id,
            "primary_id": plan.primary.id,
            "retired_ids": plan.retired_ids,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MatchField, Role};
    use crate::notify::MockNotifier;
    use crate::repository::MockSnapshotRepository;
    use chrono::NaiveDate;

    fn manager() -> Actor {
        Actor::new("tm-1", Role::SalesManager, "Navneet Kumar")
    }

    fn rep() -> Actor {
        Actor::new("tm-2", Role::SalesRep, "Priya Sharma")
    }

    fn lead(id: &str, day: u32) -> LeadRecord {
        LeadRecord {
            email: Some("rajesh@techsolutions.com".to_string()),
            ..LeadRecord::new(id, NaiveDate::from_ymd_opt(2024, 12, day).unwrap())
        }
    }

    fn snapshot_with_group(status: GroupStatus) -> Snapshot {
        let members = vec![lead("L-1", 15), lead("L-2", 18)];
        Snapshot {
            leads: members.clone(),
            duplicate_groups: vec![DuplicateGroup {
                id: "g-1".to_string(),
                match_field: MatchField::Email,
                match_value: "rajesh@techsolutions.com".to_string(),
                members,
                confidence: 100.0,
                status,
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_merge_group_forbidden_for_rep() {
        let mut mock = MockSnapshotRepository::new();
        mock.expect_load().never();
        mock.expect_save().never();

        let service = RoutingService::new(Arc::new(mock), Config::default(), None);

        let err = service.merge_group(&rep(), "g-1").await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_merge_group_saves_and_notifies() {
        let mut mock = MockSnapshotRepository::new();
        mock.expect_load()
            .returning(|| Ok(snapshot_with_group(GroupStatus::Pending)));
        mock.expect_save()
            .withf(|s: &Snapshot| {
                s.find_group("g-1").map(|g| g.status) == Some(GroupStatus::Merged)
                    && s.leads.iter().any(|l| l.id == "L-2" && l.retired)
            })
            .times(1)
            .returning(|_| Ok(()));

        let mut notifier = MockNotifier::new();
        notifier
            .expect_publish()
            .withf(|e: &RoutingEvent| e.event_type == notify::GROUP_MERGED)
            .times(1)
            .returning(|_| Ok(()));

        let service =
            RoutingService::new(Arc::new(mock), Config::default(), Some(Arc::new(notifier)));

        let plan = service.merge_group(&manager(), "g-1").await.unwrap();
        assert_eq!(plan.primary.id, "L-1");
        assert_eq!(plan.retired_ids, vec!["L-2".to_string()]);
    }

    #[tokio::test]
    async fn test_merge_group_succeeds_when_publish_fails() {
        let mut mock = MockSnapshotRepository::new();
        mock.expect_load()
            .returning(|| Ok(snapshot_with_group(GroupStatus::Pending)));
        mock.expect_save().times(1).returning(|_| Ok(()));

        let mut notifier = MockNotifier::new();
        notifier
            .expect_publish()
            .times(1)
            .returning(|_| Err(AppError::Internal(anyhow::anyhow!("broker unavailable"))));

        let service =
            RoutingService::new(Arc::new(mock), Config::default(), Some(Arc::new(notifier)));

        let plan = service.merge_group(&manager(), "g-1").await.unwrap();
        assert_eq!(plan.group.member_ids(), vec!["L-1"]);
    }

    #[tokio::test]
    async fn test_merge_group_rejects_non_pending_without_saving() {
        let mut mock = MockSnapshotRepository::new();
        mock.expect_load()
            .returning(|| Ok(snapshot_with_group(GroupStatus::Ignored)));
        mock.expect_save().never();

        let service = RoutingService::new(Arc::new(mock), Config::default(), None);

        let err = service.merge_group(&manager(), "g-1").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_merge_group_with_retired_member_is_invalid_state() {
        let mut mock = MockSnapshotRepository::new();
        mock.expect_load().returning(|| {
            let mut snapshot = snapshot_with_group(GroupStatus::Pending);
            snapshot.leads[1].retired = true;
            Ok(snapshot)
        });
        mock.expect_save().never();

        let service = RoutingService::new(Arc::new(mock), Config::default(), None);

        let err = service.merge_group(&manager(), "g-1").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_unknown_group_is_not_found() {
        let mut mock = MockSnapshotRepository::new();
        mock.expect_load().returning(|| Ok(Snapshot::default()));

        let service = RoutingService::new(Arc::new(mock), Config::default(), None);

        let err = service.ignore_group(&manager(), "missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_ignore_then_retrigger() {
        let mut mock = MockSnapshotRepository::new();
        mock.expect_load()
            .times(1)
            .returning(|| Ok(snapshot_with_group(GroupStatus::Pending)));
        mock.expect_save().times(1).returning(|_| Ok(()));

        let service = RoutingService::new(Arc::new(mock), Config::default(), None);

        let group = service.ignore_group(&manager(), "g-1").await.unwrap();
        assert_eq!(group.status, GroupStatus::Ignored);

        let mut mock = MockSnapshotRepository::new();
        mock.expect_load()
            .returning(|| Ok(snapshot_with_group(GroupStatus::Ignored)));
        mock.expect_save().returning(|_| Ok(()));
        let service = RoutingService::new(Arc::new(mock), Config::default(), None);

        let group = service.retrigger_group(&manager(), "g-1").await.unwrap();
        assert_eq!(group.status, GroupStatus::Pending);
    }

    #[tokio::test]
    async fn test_retrigger_requires_ignored_group() {
        let mut mock = MockSnapshotRepository::new();
        mock.expect_load()
            .returning(|| Ok(snapshot_with_group(GroupStatus::Merged)));
        mock.expect_save().never();

        let service = RoutingService::new(Arc::new(mock), Config::default(), None);

        let err = service.retrigger_group(&manager(), "g-1").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_scan_skips_ignored_groups() {
        let mut mock = MockSnapshotRepository::new();
        mock.expect_load().returning(|| {
            let mut snapshot = snapshot_with_group(GroupStatus::Ignored);
            // stored id must match the id a scan would compute
            snapshot.duplicate_groups[0].id = crate::routing::group_id(
                MatchField::Email,
                "rajesh@techsolutions.com",
                &["L-1", "L-2"],
            );
            Ok(snapshot)
        });
        mock.expect_save()
            .withf(|s: &Snapshot| s.duplicate_groups.len() == 1)
            .returning(|_| Ok(()));

        let service = RoutingService::new(Arc::new(mock), Config::default(), None);

        let groups = service.scan_duplicates(&manager()).await.unwrap();
        assert!(groups.is_empty());
    }

    #[tokio::test]
    async fn test_repository_failure_propagates() {
        let mut mock = MockSnapshotRepository::new();
        mock.expect_load()
            .returning(|| Err(AppError::NotFound("snapshot file".to_string())));

        let service = RoutingService::new(Arc::new(mock), Config::default(), None);

        let err = service.run_cycle(&manager(), &CancelFlag::new()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
