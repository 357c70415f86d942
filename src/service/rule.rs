//! Assignment rule management service

use crate::config::AssignmentConfig;
use crate::domain::{Actor, AssignmentRule, CreateRuleInput, UpdateRuleInput};
use crate::error::{AppError, Result};
use crate::notify::{self, Notifier, RoutingEvent};
use crate::policy::{enforce, permissions};
use crate::repository::SnapshotRepository;
use crate::routing::{AssignmentEngine, RuleIssue};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;
use validator::Validate;

pub struct RuleService<R: SnapshotRepository> {
    repo: Arc<R>,
    config: AssignmentConfig,
    notifier: Option<Arc<dyn Notifier>>,
    write_lock: Mutex<()>,
}

impl<R: SnapshotRepository> RuleService<R> {
    pub fn new(
        repo: Arc<R>,
        config: AssignmentConfig,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        Self {
            repo,
            config,
            notifier,
            write_lock: Mutex::new(()),
        }
    }

    /// Rules in evaluation order (priority, then id), inactive ones included.
    pub async fn list(&self, actor: &Actor) -> Result<Vec<AssignmentRule>> {
        enforce(actor, permissions::MANAGE_ASSIGNMENT_RULES)?;
        let mut rules = self.repo.load().await?.rules;
        rules.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        Ok(rules)
    }

    pub async fn create(&self, actor: &Actor, input: CreateRuleInput) -> Result<AssignmentRule> {
        enforce(actor, permissions::MANAGE_ASSIGNMENT_RULES)?;
        input.validate()?;

        let _guard = self.write_lock.lock().await;
        let mut snapshot = self.repo.load().await?;

        let rule = AssignmentRule {
            id: Uuid::new_v4().to_string(),
            name: input.name,
            conditions: input.conditions,
            assign_to: input.assign_to,
            priority: input.priority,
            is_active: input.is_active,
        };
        snapshot.rules.push(rule.clone());
        self.repo.save(&snapshot).await?;

        tracing::info!(actor_id = %actor.id, rule_id = %rule.id, "assignment rule created");
        self.publish(notify::RULE_CREATED, &rule.id, actor).await;
        Ok(rule)
    }

    pub async fn update(
        &self,
        actor: &Actor,
        id: &str,
        input: UpdateRuleInput,
    ) -> Result<AssignmentRule> {
        enforce(actor, permissions::MANAGE_ASSIGNMENT_RULES)?;
        input.validate()?;

        let _guard = self.write_lock.lock().await;
        let mut snapshot = self.repo.load().await?;

        let rule = snapshot
            .rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Assignment rule {} not found", id)))?;

        if let Some(name) = input.name {
            rule.name = name;
        }
        if let Some(conditions) = input.conditions {
            rule.conditions = conditions;
        }
        if let Some(assign_to) = input.assign_to {
            rule.assign_to = assign_to;
        }
        if let Some(priority) = input.priority {
            rule.priority = priority;
        }
        if let Some(is_active) = input.is_active {
            rule.is_active = is_active;
        }
        let rule = rule.clone();
        self.repo.save(&snapshot).await?;

        tracing::info!(actor_id = %actor.id, rule_id = %rule.id, "assignment rule updated");
        self.publish(notify::RULE_UPDATED, &rule.id, actor).await;
        Ok(rule)
    }

    pub async fn delete(&self, actor: &Actor, id: &str) -> Result<()> {
        enforce(actor, permissions::MANAGE_ASSIGNMENT_RULES)?;

        let _guard = self.write_lock.lock().await;
        let mut snapshot = self.repo.load().await?;

        let before = snapshot.rules.len();
        snapshot.rules.retain(|r| r.id != id);
        if snapshot.rules.len() == before {
            return Err(AppError::NotFound(format!(
                "Assignment rule {} not found",
                id
            )));
        }
        self.repo.save(&snapshot).await?;

        tracing::info!(actor_id = %actor.id, rule_id = %id, "assignment rule deleted");
        self.publish(notify::RULE_DELETED, id, actor).await;
        Ok(())
    }

    /// Active rules that can never fire against the current team.
    pub async fn issues(&self, actor: &Actor) -> Result<Vec<RuleIssue>> {
        enforce(actor, permissions::MANAGE_ASSIGNMENT_RULES)?;
        let snapshot = self.repo.load().await?;
        let engine = AssignmentEngine::new(&snapshot.rules, &self.config);
        Ok(engine.rule_issues(&snapshot.team))
    }

    async fn publish(&self, event_type: &str, rule_id: &str, actor: &Actor) {
        if let Some(notifier) = &self.notifier {
            let event = RoutingEvent::new(
                event_type,
                json!({ "rule_id": rule_id, "actor_id": actor.id }),
            );
            if let Err(e) = notifier.publish(event).await {
                tracing::warn!("Failed to publish {} event: {}", event_type, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConditionOperator, Role, RuleCondition, Snapshot, TeamMember};
    use crate::notify::MockNotifier;
    use crate::repository::MockSnapshotRepository;
    use serde_json::json;

    fn manager() -> Actor {
        Actor::new("tm-1", Role::SalesManager, "Navneet Kumar")
    }

    fn stored_rule(id: &str, priority: i32) -> AssignmentRule {
        AssignmentRule {
            id: id.to_string(),
            name: format!("Rule {}", id),
            conditions: vec![],
            assign_to: "tm-1".to_string(),
            priority,
            is_active: true,
        }
    }

    fn high_value_input() -> CreateRuleInput {
        CreateRuleInput {
            name: "High value".to_string(),
            conditions: vec![RuleCondition::new(
                "estimatedValue",
                ConditionOperator::GreaterThan,
                json!(500000),
            )],
            assign_to: "Navneet Kumar".to_string(),
            priority: 1,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_create_rule_success() {
        let mut mock = MockSnapshotRepository::new();
        mock.expect_load().returning(|| Ok(Snapshot::default()));
        mock.expect_save()
            .withf(|s: &Snapshot| s.rules.len() == 1 && s.rules[0].name == "High value")
            .times(1)
            .returning(|_| Ok(()));

        let mut notifier = MockNotifier::new();
        notifier
            .expect_publish()
            .withf(|e: &RoutingEvent| e.event_type == notify::RULE_CREATED)
            .times(1)
            .returning(|_| Ok(()));

        let service = RuleService::new(
            Arc::new(mock),
            AssignmentConfig::default(),
            Some(Arc::new(notifier)),
        );
        let rule = service.create(&manager(), high_value_input()).await.unwrap();

        assert_eq!(rule.assign_to, "Navneet Kumar");
        assert!(Uuid::parse_str(&rule.id).is_ok());
    }

    #[tokio::test]
    async fn test_create_rule_validation_error() {
        let mut mock = MockSnapshotRepository::new();
        mock.expect_load().never();
        mock.expect_save().never();

        let service = RuleService::new(Arc::new(mock), AssignmentConfig::default(), None);
        let mut input = high_value_input();
        input.conditions[0].value = json!("lots");

        let err = service.create(&manager(), input).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_rule_forbidden_for_rep() {
        let mock = MockSnapshotRepository::new();
        let service = RuleService::new(Arc::new(mock), AssignmentConfig::default(), None);
        let rep = Actor::new("tm-2", Role::SalesRep, "Priya Sharma");

        let err = service.create(&rep, high_value_input()).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_update_rule_partial() {
        let mut mock = MockSnapshotRepository::new();
        mock.expect_load().returning(|| {
            Ok(Snapshot {
                rules: vec![stored_rule("r1", 5)],
                ..Default::default()
            })
        });
        mock.expect_save()
            .withf(|s: &Snapshot| !s.rules[0].is_active && s.rules[0].priority == 5)
            .returning(|_| Ok(()));

        let service = RuleService::new(Arc::new(mock), AssignmentConfig::default(), None);
        let input = UpdateRuleInput {
            is_active: Some(false),
            ..Default::default()
        };

        let rule = service.update(&manager(), "r1", input).await.unwrap();
        assert!(!rule.is_active);
        assert_eq!(rule.name, "Rule r1");
    }

    #[tokio::test]
    async fn test_update_missing_rule_is_not_found() {
        let mut mock = MockSnapshotRepository::new();
        mock.expect_load().returning(|| Ok(Snapshot::default()));
        mock.expect_save().never();

        let service = RuleService::new(Arc::new(mock), AssignmentConfig::default(), None);
        let err = service
            .update(&manager(), "nope", UpdateRuleInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_rule() {
        let mut mock = MockSnapshotRepository::new();
        mock.expect_load().returning(|| {
            Ok(Snapshot {
                rules: vec![stored_rule("r1", 1), stored_rule("r2", 2)],
                ..Default::default()
            })
        });
        mock.expect_save()
            .withf(|s: &Snapshot| s.rules.len() == 1 && s.rules[0].id == "r2")
            .returning(|_| Ok(()));

        let service = RuleService::new(Arc::new(mock), AssignmentConfig::default(), None);
        assert!(service.delete(&manager(), "r1").await.is_ok());
    }

    #[tokio::test]
    async fn test_list_is_in_evaluation_order() {
        let mut mock = MockSnapshotRepository::new();
        mock.expect_load().returning(|| {
            Ok(Snapshot {
                rules: vec![stored_rule("r3", 2), stored_rule("r2", 1), stored_rule("r1", 2)],
                ..Default::default()
            })
        });

        let service = RuleService::new(Arc::new(mock), AssignmentConfig::default(), None);
        let ids: Vec<String> = service
            .list(&manager())
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["r2", "r1", "r3"]);
    }

    #[tokio::test]
    async fn test_issues_reports_unknown_assignee() {
        let mut mock = MockSnapshotRepository::new();
        mock.expect_load().returning(|| {
            let mut ghost = stored_rule("r1", 1);
            ghost.assign_to = "Former Employee".to_string();
            Ok(Snapshot {
                rules: vec![ghost, stored_rule("r2", 2)],
                team: vec![TeamMember::new("tm-1", "Navneet Kumar", Role::SalesManager, 0)],
                ..Default::default()
            })
        });

        let config = AssignmentConfig { workload_cap: 1 };
        let service = RuleService::new(Arc::new(mock), config, None);
        let issues = service.issues(&manager()).await.unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].rule_id, "r1");
    }

    #[tokio::test]
    async fn test_delete_succeeds_when_publish_fails() {
        let mut mock = MockSnapshotRepository::new();
        mock.expect_load().returning(|| {
            Ok(Snapshot {
                rules: vec![stored_rule("r1", 1)],
                ..Default::default()
            })
        });
        mock.expect_save().times(1).returning(|_| Ok(()));

        let mut notifier = MockNotifier::new();
        notifier
            .expect_publish()
            .times(1)
            .returning(|_| Err(AppError::Internal(anyhow::anyhow!("broker unavailable"))));

        let service = RuleService::new(
            Arc::new(mock),
            AssignmentConfig::default(),
            Some(Arc::new(notifier)),
        );
        assert!(service.delete(&manager(), "r1").await.is_ok());
    }
}
