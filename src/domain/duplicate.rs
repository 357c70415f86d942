//! Duplicate detection domain models

use super::lead::LeadRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity key a duplicate group was formed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchField {
    Email,
    Phone,
    CompanyName,
}

impl MatchField {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchField::Email => "email",
            MatchField::Phone => "phone",
            MatchField::CompanyName => "companyName",
        }
    }

    /// Precedence when two fields produce the same member set; lower wins.
    pub fn precedence(&self) -> u8 {
        match self {
            MatchField::Email => 0,
            MatchField::Phone => 1,
            MatchField::CompanyName => 2,
        }
    }

    /// Raw (un-normalized) value of this field on a record
    pub fn raw_value<'a>(&self, record: &'a LeadRecord) -> Option<&'a str> {
        match self {
            MatchField::Email => record.email.as_deref(),
            MatchField::Phone => record.phone.as_deref(),
            MatchField::CompanyName => record.company_name.as_deref(),
        }
    }
}

impl fmt::Display for MatchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match super::common::field_key(s).as_str() {
            "email" => Ok(MatchField::Email),
            "phone" => Ok(MatchField::Phone),
            "companyname" | "company" => Ok(MatchField::CompanyName),
            _ => Err(format!("unknown match field: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    #[default]
    Pending,
    Ignored,
    Merged,
}

impl GroupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupStatus::Pending => "pending",
            GroupStatus::Ignored => "ignored",
            GroupStatus::Merged => "merged",
        }
    }
}

/// Records believed to represent the same real-world entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateGroup {
    /// Stable across scans: derived from the match field and normalized value
    pub id: String,
    pub match_field: MatchField,
    /// Normalized value shared by every member
    pub match_value: String,
    /// Oldest first (`createdDate`, then `id`)
    pub members: Vec<LeadRecord>,
    /// 0-100
    pub confidence: f64,
    #[serde(default)]
    pub status: GroupStatus,
}

impl DuplicateGroup {
    pub fn member_ids(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.id.as_str()).collect()
    }

    pub fn is_pending(&self) -> bool {
        self.status == GroupStatus::Pending
    }
}
