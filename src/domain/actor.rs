//! Actors and roles

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Access level of an actor. Fixed set; determines the permission set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    SuperAdmin,
    Admin,
    SalesManager,
    SalesRep,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::SuperAdmin,
        Role::Admin,
        Role::SalesManager,
        Role::SalesRep,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super-admin",
            Role::Admin => "admin",
            Role::SalesManager => "sales-manager",
            Role::SalesRep => "sales-rep",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "super-admin" => Ok(Role::SuperAdmin),
            "admin" => Ok(Role::Admin),
            "sales-manager" => Ok(Role::SalesManager),
            "sales-rep" => Ok(Role::SalesRep),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// The user performing an operation. The role is fixed for the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub name: String,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            name: name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_str() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn test_role_accepts_underscore_form() {
        assert_eq!("sales_rep".parse::<Role>().unwrap(), Role::SalesRep);
        assert_eq!("SUPER_ADMIN".parse::<Role>().unwrap(), Role::SuperAdmin);
    }

    #[test]
    fn test_unknown_role() {
        let err = "intern".parse::<Role>().unwrap_err();
        assert_eq!(err.to_string(), "unknown role: intern");
    }

    #[test]
    fn test_role_serde_uses_kebab_case() {
        let json = serde_json::to_string(&Role::SalesManager).unwrap();
        assert_eq!(json, "\"sales-manager\"");
    }
}
