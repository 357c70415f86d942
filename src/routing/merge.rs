//! Canonical record selection for duplicate groups.

use crate::domain::{non_blank, DuplicateGroup, GroupStatus, LeadRecord};
use crate::error::{AppError, Result};
use serde::Serialize;
use std::collections::HashMap;

/// Outcome of merging one group. Nothing is written until [`MergePlan::apply`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergePlan {
    /// Survivor with empty fields back-filled from the other members
    pub primary: LeadRecord,
    pub retired_ids: Vec<String>,
    /// The source group, transitioned to `merged` with the primary as its
    /// only member
    pub group: DuplicateGroup,
    /// Names of primary fields that were back-filled
    pub filled_fields: Vec<&'static str>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MergeResolver;

impl MergeResolver {
    pub fn new() -> Self {
        Self
    }

    /// Plan the merge of a pending group.
    ///
    /// The primary is the oldest member (`created_date`, then `id`). Donors
    /// are visited in the same order and the first non-empty value wins.
    pub fn merge(&self, group: &DuplicateGroup) -> Result<MergePlan> {
        if !group.is_pending() {
            return Err(AppError::InvalidState(format!(
                "duplicate group {} is {}, expected pending",
                group.id,
                group.status.as_str()
            )));
        }
        if group.members.len() < 2 {
            return Err(AppError::Validation(format!(
                "duplicate group {} has fewer than two members",
                group.id
            )));
        }

        let mut ordered: Vec<&LeadRecord> = group.members.iter().collect();
        ordered.sort_by(|a, b| {
            a.created_date
                .cmp(&b.created_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        let (first, donors) = ordered.split_first().ok_or_else(|| {
            AppError::Validation(format!("duplicate group {} has no members", group.id))
        })?;

        let mut primary = (*first).clone();
        primary.retired = false;
        primary.merged_into = None;

        let mut filled_fields = vec![];
        for donor in donors {
            backfill(&mut primary, donor, &mut filled_fields);
        }

        let retired_ids: Vec<String> = donors.iter().map(|d| d.id.clone()).collect();

        let mut merged_group = group.clone();
        merged_group.status = GroupStatus::Merged;
        merged_group.members = vec![primary.clone()];

        tracing::debug!(
            group_id = %group.id,
            primary_id = %primary.id,
            retired = retired_ids.len(),
            filled = ?filled_fields,
            "merge planned"
        );

        Ok(MergePlan {
            primary,
            retired_ids,
            group: merged_group,
            filled_fields,
        })
    }
}

fn backfill(primary: &mut LeadRecord, donor: &LeadRecord, filled: &mut Vec<&'static str>) {
    fill_text("contactPerson", &mut primary.contact_person, &donor.contact_person, filled);
    fill_text("companyName", &mut primary.company_name, &donor.company_name, filled);
    fill_text("email", &mut primary.email, &donor.email, filled);
    fill_text("phone", &mut primary.phone, &donor.phone, filled);
    fill_text("industry", &mut primary.industry, &donor.industry, filled);
    fill_text("leadSource", &mut primary.lead_source, &donor.lead_source, filled);
    fill_text("assignedTo", &mut primary.assigned_to, &donor.assigned_to, filled);

    let donor_value = donor.estimated_value.filter(|v| *v >= 0.0);
    if primary.estimated_value.is_none() && donor_value.is_some() {
        primary.estimated_value = donor_value;
        filled.push("estimatedValue");
    }
}

fn fill_text(
    name: &'static str,
    target: &mut Option<String>,
    donor: &Option<String>,
    filled: &mut Vec<&'static str>,
) {
    if non_blank(target.as_deref()).is_some() {
        return;
    }
    if let Some(value) = non_blank(donor.as_deref()) {
        *target = Some(value.to_string());
        filled.push(name);
    }
}

impl MergePlan {
    /// Write the plan into a record set: replace the primary, retire the
    /// others and repoint records previously merged into a retired id.
    /// Returns how many records changed.
    pub fn apply(&self, records: &mut [LeadRecord]) -> usize {
        let redirects = self.redirects();
        let mut changed = 0;
        for record in records.iter_mut() {
            if record.id == self.primary.id {
                *record = self.primary.clone();
                changed += 1;
            } else if redirects.contains_key(record.id.as_str()) {
                record.retired = true;
                record.merged_into = Some(self.primary.id.clone());
                changed += 1;
            } else if let Some(target) = record
                .merged_into
                .as_deref()
                .and_then(|id| redirects.get(id))
            {
                record.merged_into = Some((*target).to_string());
                changed += 1;
            }
        }
        changed
    }

    /// Retired id → primary id.
    pub fn redirects(&self) -> HashMap<&str, &str> {
        self.retired_ids
            .iter()
            .map(|id| (id.as_str(), self.primary.id.as_str()))
            .collect()
    }
}
