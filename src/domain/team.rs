//! Sales team members

use super::actor::Role;
use serde::{Deserialize, Serialize};

/// A routable member of the sales team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: String,
    pub name: String,
    pub role: Role,
    /// Currently assigned open leads
    #[serde(default)]
    pub workload: u32,
}

impl TeamMember {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: Role, workload: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
            workload,
        }
    }

    /// Whether `reference` (from a rule or a lead) designates this member,
    /// by exact id or case-insensitive display name.
    pub fn is_referenced_by(&self, reference: &str) -> bool {
        let reference = reference.trim();
        self.id == reference || self.name.trim().eq_ignore_ascii_case(reference)
    }
}

/// Resolve a member reference against the team, preferring an id match over
/// a name match so that ids never lose to a colliding display name.
pub fn find_member<'a>(team: &'a [TeamMember], reference: &str) -> Option<&'a TeamMember> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }
    team.iter()
        .find(|m| m.id == reference)
        .or_else(|| team.iter().find(|m| m.is_referenced_by(reference)))
}
