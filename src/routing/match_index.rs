//! Duplicate candidate detection.
//!
//! Records are bucketed per identity field on a normalized value. Each bucket
//! holding two or more records becomes a candidate group, scored by how many
//! identity fields its members agree on.

use crate::config::MatchConfig;
use crate::domain::{non_blank, DuplicateGroup, GroupStatus, LeadRecord, MatchField};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

lazy_static! {
    static ref COMPANY_PUNCTUATION: Regex = Regex::new(r"[^\p{L}\p{N}\s]+").unwrap();
}

/// Trailing tokens dropped from company names before comparison.
const LEGAL_SUFFIXES: &[&str] = &[
    "inc",
    "incorporated",
    "llc",
    "llp",
    "ltd",
    "limited",
    "pvt",
    "private",
    "corp",
    "corporation",
    "co",
    "company",
    "plc",
    "gmbh",
];

/// Normalized comparison key of a raw field value; `None` when nothing is left.
pub fn normalize(field: MatchField, raw: &str) -> Option<String> {
    let value = raw.trim().to_lowercase();
    let normalized = match field {
        MatchField::Email => value,
        MatchField::Phone => value.chars().filter(|c| c.is_alphanumeric()).collect(),
        MatchField::CompanyName => normalize_company(&value),
    };
    (!normalized.is_empty()).then_some(normalized)
}

fn normalize_company(lowercased: &str) -> String {
    let stripped = COMPANY_PUNCTUATION.replace_all(lowercased, " ");
    let mut tokens: Vec<&str> = stripped.split_whitespace().collect();
    while tokens.len() > 1 && tokens.last().is_some_and(|t| LEGAL_SUFFIXES.contains(t)) {
        tokens.pop();
    }
    tokens.join(" ")
}

fn normalized_value(field: MatchField, record: &LeadRecord) -> Option<String> {
    non_blank(field.raw_value(record)).and_then(|raw| normalize(field, raw))
}

/// Stable group id: the same field, value and member set always map to the
/// same id, so ignore decisions survive a re-scan.
pub fn group_id(field: MatchField, value: &str, member_ids: &[&str]) -> String {
    let mut ids = member_ids.to_vec();
    ids.sort_unstable();
    let name = format!("{}:{}:{}", field.as_str(), value, ids.join(","));
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
}

pub struct MatchIndex<'a> {
    config: &'a MatchConfig,
    ignored: HashSet<String>,
}

impl<'a> MatchIndex<'a> {
    pub fn new(config: &'a MatchConfig) -> Self {
        Self {
            config,
            ignored: HashSet::new(),
        }
    }

    /// Group ids a user marked as "not a duplicate".
    pub fn with_ignored<I, S>(mut self, ignored: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored.extend(ignored.into_iter().map(Into::into));
        self
    }

    /// Candidate groups over `records`, best first.
    pub fn scan(&self, records: &[LeadRecord]) -> Vec<DuplicateGroup> {
        let live: Vec<&LeadRecord> = records.iter().filter(|r| !r.retired).collect();

        let mut fields = self.config.fields.clone();
        fields.sort_by_key(MatchField::precedence);
        fields.dedup();

        let mut claimed: HashSet<Vec<String>> = HashSet::new();
        let mut groups = vec![];

        for field in fields {
            let mut buckets: BTreeMap<String, Vec<&LeadRecord>> = BTreeMap::new();
            for &record in &live {
                if let Some(value) = normalized_value(field, record) {
                    buckets.entry(value).or_default().push(record);
                }
            }

            for (value, mut members) in buckets {
                if members.len() < 2 {
                    continue;
                }
                members.sort_by(|a, b| {
                    a.created_date
                        .cmp(&b.created_date)
                        .then_with(|| a.id.cmp(&b.id))
                });

                let mut key: Vec<String> = members.iter().map(|m| m.id.clone()).collect();
                key.sort_unstable();
                if !claimed.insert(key) {
                    continue;
                }

                let ids: Vec<&str> = members.iter().map(|m| m.id.as_str()).collect();
                let id = group_id(field, &value, &ids);
                if self.ignored.contains(&id) {
                    tracing::debug!(group_id = %id, field = %field, "skipping ignored group");
                    continue;
                }

                let confidence = self.confidence(&members);
                if confidence < self.config.confidence_threshold {
                    continue;
                }

                groups.push(DuplicateGroup {
                    id,
                    match_field: field,
                    match_value: value,
                    members: members.into_iter().cloned().collect(),
                    confidence,
                    status: GroupStatus::Pending,
                });
            }
        }

        groups.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| earliest(a).cmp(&earliest(b)))
                .then_with(|| a.match_field.precedence().cmp(&b.match_field.precedence()))
                .then_with(|| a.id.cmp(&b.id))
        });

        tracing::debug!(
            records = live.len(),
            groups = groups.len(),
            "duplicate scan complete"
        );
        groups
    }

    /// Weighted agreement score in 0-100, rounded to one decimal.
    ///
    /// A field only contributes when every member carries it. When the
    /// members agree on email the earned weight is scaled over the weights
    /// that applied; otherwise the score is the earned weight itself, so a
    /// group without a shared email never scores above what it matched.
    pub fn confidence(&self, members: &[&LeadRecord]) -> f64 {
        let mut applicable = 0.0;
        let mut earned = 0.0;
        let mut email_agrees = false;

        for (field, weight) in [
            (MatchField::Email, self.config.email_weight),
            (MatchField::Phone, self.config.phone_weight),
        ] {
            let Some(values) = all_values(field, members) else {
                continue;
            };
            applicable += weight;
            if values.windows(2).all(|w| w[0] == w[1]) {
                earned += weight;
                email_agrees |= field == MatchField::Email;
            }
        }

        if let Some(names) = all_values(MatchField::CompanyName, members) {
            applicable += self.config.company_weight;
            let similarity = min_pairwise_similarity(&names);
            if similarity >= self.config.company_similarity {
                earned += self.config.company_weight * similarity;
            }
        }

        if applicable <= 0.0 {
            return 0.0;
        }
        let score = if email_agrees {
            earned / applicable * 100.0
        } else {
            earned
        };
        (score.min(100.0) * 10.0).round() / 10.0
    }
}

fn all_values(field: MatchField, members: &[&LeadRecord]) -> Option<Vec<String>> {
    members
        .iter()
        .map(|m| normalized_value(field, m))
        .collect::<Option<Vec<_>>>()
}

fn min_pairwise_similarity(names: &[String]) -> f64 {
    let mut min = 1.0_f64;
    for (i, a) in names.iter().enumerate() {
        for b in &names[i + 1..] {
            min = min.min(strsim::jaro_winkler(a, b));
        }
    }
    min
}

fn earliest(group: &DuplicateGroup) -> Option<chrono::NaiveDate> {
    group.members.iter().map(|m| m.created_date).min()
}
