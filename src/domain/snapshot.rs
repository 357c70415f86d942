//! Dataset snapshot exchanged with the record source

use super::{AssignmentRule, DuplicateGroup, LeadRecord, TeamMember};
use serde::{Deserialize, Serialize};

/// Full dataset a routing cycle reads and writes back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub leads: Vec<LeadRecord>,
    #[serde(default)]
    pub rules: Vec<AssignmentRule>,
    #[serde(default)]
    pub team: Vec<TeamMember>,
    /// Groups that were proposed, merged or ignored in earlier scans
    #[serde(default)]
    pub duplicate_groups: Vec<DuplicateGroup>,
}

impl Snapshot {
    /// Replace leads by id; ids not present in the snapshot are appended.
    pub fn upsert_leads(&mut self, updated: impl IntoIterator<Item = LeadRecord>) {
        for lead in updated {
            match self.leads.iter_mut().find(|l| l.id == lead.id) {
                Some(existing) => *existing = lead,
                None => self.leads.push(lead),
            }
        }
    }

    /// Replace or insert a duplicate group by id.
    pub fn upsert_group(&mut self, group: DuplicateGroup) {
        match self.duplicate_groups.iter_mut().find(|g| g.id == group.id) {
            Some(existing) => *existing = group,
            None => self.duplicate_groups.push(group),
        }
    }

    pub fn find_group(&self, id: &str) -> Option<&DuplicateGroup> {
        self.duplicate_groups.iter().find(|g| g.id == id)
    }
}
