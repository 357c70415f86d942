//! Common types for domain models

/// A record that may be owned by (assigned to) a single actor.
///
/// Access filtering only needs the owner reference, so any record type that
/// exposes one can be narrowed by the access policy.
pub trait OwnedRecord {
    fn owner(&self) -> Option<&str>;
}

/// Returns the trimmed value when it carries any content.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Canonical key for a field name: `estimatedValue`, `estimated_value` and
/// `Estimated Value` all map to `estimatedvalue`.
pub fn field_key(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}
