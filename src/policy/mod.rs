//! Centralized access policy: permissions, view access and record visibility.
//!
//! Everything here is a pure function over the static tables in [`table`].
//! Lookups never fail: an unknown role, permission or view is denied and the
//! caller decides whether that is worth reporting.

pub mod table;

pub use table::permissions;

use crate::domain::{Actor, OwnedRecord, Role};
use crate::error::AppError;
use std::str::FromStr;
use table::{ROLE_PERMISSIONS, VIEW_ACCESS};

pub type PolicyResult<T> = std::result::Result<T, AppError>;

/// Kind of record being filtered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordType {
    Leads,
    Customers,
    /// Any other record kind. Sales managers only see their own records of
    /// these types until a team-wide grant is added for them.
    Other(String),
}

impl FromStr for RecordType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "leads" | "lead" => RecordType::Leads,
            "customers" | "customer" => RecordType::Customers,
            other => RecordType::Other(other.to_string()),
        })
    }
}

pub fn has_permission(role: Role, permission: &str) -> bool {
    ROLE_PERMISSIONS
        .get(&role)
        .map(|set| set.contains(permission))
        .unwrap_or(false)
}

/// String-keyed variant for callers holding an unparsed role.
pub fn has_permission_for(role: &str, permission: &str) -> bool {
    role.parse::<Role>()
        .map(|role| has_permission(role, permission))
        .unwrap_or(false)
}

/// Sorted permission list of a role.
pub fn permissions_for(role: Role) -> Vec<&'static str> {
    let mut out: Vec<&'static str> = ROLE_PERMISSIONS
        .get(&role)
        .map(|set| set.iter().copied().collect())
        .unwrap_or_default();
    out.sort_unstable();
    out
}

/// Deny-by-default: views without an entry in the access map are closed.
pub fn can_access_view(role: Role, view_id: &str) -> bool {
    VIEW_ACCESS
        .iter()
        .find(|(id, _)| *id == view_id)
        .map(|(_, required)| required.iter().any(|p| has_permission(role, p)))
        .unwrap_or(false)
}

/// Views the role may open, in navigation order.
pub fn accessible_views(role: Role) -> Vec<&'static str> {
    VIEW_ACCESS
        .iter()
        .filter(|(_, required)| required.iter().any(|p| has_permission(role, p)))
        .map(|(id, _)| *id)
        .collect()
}

/// Subset of `records` visible to the actor.
///
/// Never mutates the input and is idempotent. A missing role or record type
/// yields an empty result, which callers must read as "nothing visible".
pub fn filter_records<T>(
    role: Option<Role>,
    actor_id: &str,
    records: &[T],
    record_type: Option<&RecordType>,
) -> Vec<T>
where
    T: OwnedRecord + Clone,
{
    let (Some(role), Some(record_type)) = (role, record_type) else {
        return vec![];
    };

    match role {
        Role::SuperAdmin | Role::Admin => records.to_vec(),
        Role::SalesManager => match record_type {
            RecordType::Leads | RecordType::Customers => records.to_vec(),
            RecordType::Other(_) => owned_by(actor_id, records),
        },
        Role::SalesRep => owned_by(actor_id, records),
    }
}

fn owned_by<T: OwnedRecord + Clone>(actor_id: &str, records: &[T]) -> Vec<T> {
    let actor_id = actor_id.trim();
    if actor_id.is_empty() {
        return vec![];
    }
    records
        .iter()
        .filter(|r| r.owner().map(str::trim) == Some(actor_id))
        .cloned()
        .collect()
}

/// Authorize an action for the service layer.
pub fn enforce(actor: &Actor, permission: &str) -> PolicyResult<()> {
    if has_permission(actor.role, permission) {
        Ok(())
    } else {
        tracing::debug!(
            actor_id = %actor.id,
            role = %actor.role,
            permission,
            "permission denied"
        );
        Err(AppError::Forbidden(format!(
            "Role {} lacks permission {}",
            actor.role, permission
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LeadRecord;
    use chrono::NaiveDate;
    use rstest::rstest;

    fn lead(id: &str, assigned_to: Option<&str>) -> LeadRecord {
        LeadRecord {
            assigned_to: assigned_to.map(str::to_string),
            ..LeadRecord::new(id, NaiveDate::from_ymd_opt(2024, 12, 1).unwrap())
        }
    }

    fn sample() -> Vec<LeadRecord> {
        vec![
            lead("L-1", Some("u9")),
            lead("L-2", Some("u10")),
            lead("L-3", None),
            lead("L-4", Some("u9")),
        ]
    }

    fn ids(records: &[LeadRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[rstest]
    #[case(Role::SuperAdmin, permissions::MANAGE_ROLES, true)]
    #[case(Role::Admin, permissions::MANAGE_ROLES, false)]
    #[case(Role::Admin, permissions::MANAGE_USERS, true)]
    #[case(Role::SalesManager, permissions::MERGE_DUPLICATES, true)]
    #[case(Role::SalesManager, permissions::MANAGE_USERS, false)]
    #[case(Role::SalesRep, permissions::VIEW_OWN_LEADS, true)]
    #[case(Role::SalesRep, permissions::VIEW_ALL_LEADS, false)]
    #[case(Role::SalesRep, "not_a_permission", false)]
    fn test_has_permission(#[case] role: Role, #[case] permission: &str, #[case] expected: bool) {
        assert_eq!(has_permission(role, permission), expected);
    }

    #[test]
    fn test_has_permission_for_unknown_role_is_false() {
        assert!(has_permission_for("sales-manager", permissions::ASSIGN_LEADS));
        assert!(!has_permission_for("intern", permissions::VIEW_DASHBOARD));
        assert!(!has_permission_for("", permissions::VIEW_DASHBOARD));
    }

    #[rstest]
    #[case(Role::SalesRep, "dashboard", true)]
    #[case(Role::SalesRep, "duplicate-detection", false)]
    #[case(Role::SalesManager, "duplicate-detection", true)]
    #[case(Role::SalesManager, "user-management", false)]
    #[case(Role::Admin, "system-settings", false)]
    #[case(Role::SuperAdmin, "system-settings", true)]
    #[case(Role::SuperAdmin, "unmapped-view", false)]
    fn test_can_access_view(#[case] role: Role, #[case] view: &str, #[case] expected: bool) {
        assert_eq!(can_access_view(role, view), expected);
    }

    #[test]
    fn test_accessible_views_for_rep() {
        let views = accessible_views(Role::SalesRep);
        assert!(views.contains(&"leads"));
        assert!(views.contains(&"calendar"));
        assert!(!views.contains(&"lead-assignment"));
    }

    #[test]
    fn test_permissions_for_is_sorted() {
        let perms = permissions_for(Role::SalesRep);
        let mut sorted = perms.clone();
        sorted.sort_unstable();
        assert_eq!(perms, sorted);
        assert!(perms.contains(&permissions::VIEW_OWN_LEADS));
    }

    #[test]
    fn test_filter_records_sales_rep_sees_only_own() {
        let visible = filter_records(Some(Role::SalesRep), "u9", &sample(), Some(&RecordType::Leads));
        assert_eq!(ids(&visible), vec!["L-1", "L-4"]);
    }

    #[test]
    fn test_filter_records_admin_and_manager_see_all_leads() {
        for role in [Role::SuperAdmin, Role::Admin, Role::SalesManager] {
            let visible = filter_records(Some(role), "m1", &sample(), Some(&RecordType::Leads));
            assert_eq!(visible, sample());
        }
    }

    #[test]
    fn test_filter_records_manager_narrowed_for_other_types() {
        let visible = filter_records(
            Some(Role::SalesManager),
            "u10",
            &sample(),
            Some(&RecordType::Other("activities".to_string())),
        );
        assert_eq!(ids(&visible), vec!["L-2"]);
    }

    #[test]
    fn test_filter_records_missing_inputs_yield_empty() {
        assert!(filter_records(None, "u9", &sample(), Some(&RecordType::Leads)).is_empty());
        assert!(filter_records(Some(Role::Admin), "u9", &sample(), None).is_empty());
        assert!(filter_records::<LeadRecord>(Some(Role::Admin), "u9", &[], Some(&RecordType::Leads)).is_empty());
        assert!(filter_records(Some(Role::SalesRep), " ", &sample(), Some(&RecordType::Leads)).is_empty());
    }

    #[test]
    fn test_filter_records_is_idempotent() {
        let records = sample();
        for role in Role::ALL {
            for record_type in [
                RecordType::Leads,
                RecordType::Customers,
                RecordType::Other("tasks".to_string()),
            ] {
                let once = filter_records(Some(role), "u9", &records, Some(&record_type));
                let twice = filter_records(Some(role), "u9", &once, Some(&record_type));
                assert_eq!(once, twice, "{} / {:?}", role, record_type);
            }
        }
        assert_eq!(records, sample());
    }

    #[test]
    fn test_record_type_parse() {
        assert_eq!("leads".parse::<RecordType>().unwrap(), RecordType::Leads);
        assert_eq!("Customers".parse::<RecordType>().unwrap(), RecordType::Customers);
        assert_eq!(
            "deals".parse::<RecordType>().unwrap(),
            RecordType::Other("deals".to_string())
        );
    }

    #[test]
    fn test_enforce() {
        let rep = Actor::new("u9", Role::SalesRep, "Asha");
        assert!(enforce(&rep, permissions::VIEW_OWN_LEADS).is_ok());
        let err = enforce(&rep, permissions::MERGE_DUPLICATES).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
