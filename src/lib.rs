//! Leadflow Core - lead routing and deduplication
//!
//! This crate provides the decision logic behind the Leadflow CRM: role-based
//! access policy, rule-based lead assignment, duplicate detection and
//! merging, plus the services and CLI that run them over a stored snapshot.

pub mod config;
pub mod domain;
pub mod error;
pub mod notify;
pub mod policy;
pub mod repository;
pub mod routing;
pub mod service;
pub mod telemetry;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
