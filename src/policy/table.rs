//! Static role → permission and view → permission tables.
//!
//! Built once on first use and never mutated afterwards; there is no API to
//! grant a permission at runtime.

use crate::domain::Role;
use std::collections::{HashMap, HashSet};

pub mod permissions {
    pub const VIEW_DASHBOARD: &str = "view_dashboard";
    pub const VIEW_ALL_LEADS: &str = "view_all_leads";
    pub const VIEW_OWN_LEADS: &str = "view_own_leads";
    pub const CREATE_LEADS: &str = "create_leads";
    pub const EDIT_LEADS: &str = "edit_leads";
    pub const DELETE_LEADS: &str = "delete_leads";
    pub const ASSIGN_LEADS: &str = "assign_leads";
    pub const VIEW_ALL_CUSTOMERS: &str = "view_all_customers";
    pub const VIEW_OWN_CUSTOMERS: &str = "view_own_customers";
    pub const EDIT_CUSTOMERS: &str = "edit_customers";
    pub const DELETE_CUSTOMERS: &str = "delete_customers";
    pub const MANAGE_ASSIGNMENT_RULES: &str = "manage_assignment_rules";
    pub const MANAGE_DUPLICATE_DETECTION: &str = "manage_duplicate_detection";
    pub const MERGE_DUPLICATES: &str = "merge_duplicates";
    pub const VIEW_REPORTS: &str = "view_reports";
    pub const VIEW_TEAM_REPORTS: &str = "view_team_reports";
    pub const VIEW_OWN_REPORTS: &str = "view_own_reports";
    pub const VIEW_ANALYTICS: &str = "view_analytics";
    pub const EXPORT_DATA: &str = "export_data";
    pub const IMPORT_DATA: &str = "import_data";
    pub const MANAGE_TEMPLATES: &str = "manage_templates";
    pub const VIEW_CALENDAR: &str = "view_calendar";
    pub const SEND_MESSAGES: &str = "send_messages";
    pub const MANAGE_USERS: &str = "manage_users";
    pub const MANAGE_ROLES: &str = "manage_roles";
    pub const MANAGE_INTEGRATIONS: &str = "manage_integrations";
    pub const MANAGE_SETTINGS: &str = "manage_settings";
    pub const MANAGE_SYSTEM_SETTINGS: &str = "manage_system_settings";

    pub const ALL: &[&str] = &[
        VIEW_DASHBOARD,
        VIEW_ALL_LEADS,
        VIEW_OWN_LEADS,
        CREATE_LEADS,
        EDIT_LEADS,
        DELETE_LEADS,
        ASSIGN_LEADS,
        VIEW_ALL_CUSTOMERS,
        VIEW_OWN_CUSTOMERS,
        EDIT_CUSTOMERS,
        DELETE_CUSTOMERS,
        MANAGE_ASSIGNMENT_RULES,
        MANAGE_DUPLICATE_DETECTION,
        MERGE_DUPLICATES,
        VIEW_REPORTS,
        VIEW_TEAM_REPORTS,
        VIEW_OWN_REPORTS,
        VIEW_ANALYTICS,
        EXPORT_DATA,
        IMPORT_DATA,
        MANAGE_TEMPLATES,
        VIEW_CALENDAR,
        SEND_MESSAGES,
        MANAGE_USERS,
        MANAGE_ROLES,
        MANAGE_INTEGRATIONS,
        MANAGE_SETTINGS,
        MANAGE_SYSTEM_SETTINGS,
    ];
}

use permissions::*;

const SALES_MANAGER_PERMISSIONS: &[&str] = &[
    VIEW_DASHBOARD,
    VIEW_ALL_LEADS,
    CREATE_LEADS,
    EDIT_LEADS,
    ASSIGN_LEADS,
    VIEW_ALL_CUSTOMERS,
    EDIT_CUSTOMERS,
    MANAGE_ASSIGNMENT_RULES,
    MANAGE_DUPLICATE_DETECTION,
    MERGE_DUPLICATES,
    VIEW_TEAM_REPORTS,
    VIEW_ANALYTICS,
    EXPORT_DATA,
    MANAGE_TEMPLATES,
    VIEW_CALENDAR,
    SEND_MESSAGES,
];

const SALES_REP_PERMISSIONS: &[&str] = &[
    VIEW_DASHBOARD,
    VIEW_OWN_LEADS,
    CREATE_LEADS,
    EDIT_LEADS,
    VIEW_OWN_CUSTOMERS,
    VIEW_OWN_REPORTS,
    VIEW_CALENDAR,
    SEND_MESSAGES,
];

/// Admins run the tenant but do not edit role definitions or platform-level
/// settings.
const ADMIN_EXCLUDED: &[&str] = &[MANAGE_ROLES, MANAGE_SYSTEM_SETTINGS];

/// View id → any-of permission list. Views missing here are denied.
pub const VIEW_ACCESS: &[(&str, &[&str])] = &[
    ("dashboard", &[VIEW_DASHBOARD]),
    ("leads", &[VIEW_ALL_LEADS, VIEW_OWN_LEADS]),
    ("lead-details", &[VIEW_ALL_LEADS, VIEW_OWN_LEADS]),
    ("customers", &[VIEW_ALL_CUSTOMERS, VIEW_OWN_CUSTOMERS]),
    ("lead-assignment", &[MANAGE_ASSIGNMENT_RULES]),
    ("duplicate-detection", &[MANAGE_DUPLICATE_DETECTION]),
    ("reports", &[VIEW_REPORTS, VIEW_TEAM_REPORTS, VIEW_OWN_REPORTS]),
    ("analytics", &[VIEW_ANALYTICS]),
    ("import-export", &[IMPORT_DATA, EXPORT_DATA]),
    ("templates", &[MANAGE_TEMPLATES]),
    ("calendar", &[VIEW_CALENDAR]),
    ("messages", &[SEND_MESSAGES]),
    ("user-management", &[MANAGE_USERS]),
    ("role-management", &[MANAGE_ROLES]),
    ("integrations", &[MANAGE_INTEGRATIONS]),
    ("settings", &[MANAGE_SETTINGS]),
    ("system-settings", &[MANAGE_SYSTEM_SETTINGS]),
];

lazy_static::lazy_static! {
    pub(crate) static ref ROLE_PERMISSIONS: HashMap<Role, HashSet<&'static str>> = {
        let mut table = HashMap::new();
        table.insert(Role::SuperAdmin, ALL.iter().copied().collect());
        table.insert(
            Role::Admin,
            ALL.iter()
                .copied()
                .filter(|p| !ADMIN_EXCLUDED.contains(p))
                .collect(),
        );
        table.insert(
            Role::SalesManager,
            SALES_MANAGER_PERMISSIONS.iter().copied().collect(),
        );
        table.insert(Role::SalesRep, SALES_REP_PERMISSIONS.iter().copied().collect());
        table
    };
}
