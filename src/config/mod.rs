//! Configuration management for Leadflow Core

use crate::domain::MatchField;
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Assignment engine configuration
    pub assignment: AssignmentConfig,
    /// Duplicate detection configuration
    pub matching: MatchConfig,
    /// Merge behaviour during routing cycles
    pub merge: MergeConfig,
    /// Snapshot storage configuration
    pub storage: StorageConfig,
    /// Logging and metrics configuration
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone)]
pub struct AssignmentConfig {
    /// A rule target whose workload exceeds this cap is relieved by the
    /// least-loaded member of the same role.
    pub workload_cap: u32,
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self { workload_cap: 20 }
    }
}

/// Weights and thresholds used to score duplicate groups.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Fields to bucket on, in precedence order
    pub fields: Vec<MatchField>,
    /// Groups scoring below this (0-100) are dropped
    pub confidence_threshold: f64,
    pub email_weight: f64,
    pub phone_weight: f64,
    pub company_weight: f64,
    /// Minimum Jaro-Winkler similarity (0-1) for company names to count
    pub company_similarity: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            fields: vec![MatchField::Email, MatchField::Phone, MatchField::CompanyName],
            confidence_threshold: 70.0,
            email_weight: 50.0,
            phone_weight: 30.0,
            company_weight: 20.0,
            company_similarity: 0.85,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MergeConfig {
    /// When set, groups at or above this confidence are merged during a
    /// routing cycle by actors allowed to merge. Disabled by default.
    pub auto_merge_threshold: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Path of the JSON snapshot used by the CLI
    pub snapshot_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("leadflow-snapshot.json"),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Log output format: "text" or "json"
    pub log_format: String,
    /// Whether to install the Prometheus recorder
    pub metrics_enabled: bool,
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            metrics_enabled: false,
            service_name: "leadflow-core".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = MatchConfig::default();
        let matching = MatchConfig {
            fields: match env::var("LEADFLOW_MATCH_FIELDS") {
                Ok(raw) => parse_match_fields(&raw)?,
                Err(_) => defaults.fields,
            },
            confidence_threshold: parse_env_f64(
                "LEADFLOW_CONFIDENCE_THRESHOLD",
                defaults.confidence_threshold,
            )?,
            email_weight: parse_env_f64("LEADFLOW_EMAIL_WEIGHT", defaults.email_weight)?,
            phone_weight: parse_env_f64("LEADFLOW_PHONE_WEIGHT", defaults.phone_weight)?,
            company_weight: parse_env_f64("LEADFLOW_COMPANY_WEIGHT", defaults.company_weight)?,
            company_similarity: parse_env_f64(
                "LEADFLOW_COMPANY_SIMILARITY",
                defaults.company_similarity,
            )?,
        };

        if !(0.0..=1.0).contains(&matching.company_similarity) {
            anyhow::bail!("LEADFLOW_COMPANY_SIMILARITY must be between 0 and 1");
        }

        Ok(Self {
            assignment: AssignmentConfig {
                workload_cap: env::var("LEADFLOW_WORKLOAD_CAP")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .context("Invalid LEADFLOW_WORKLOAD_CAP")?,
            },
            matching,
            merge: MergeConfig {
                auto_merge_threshold: env::var("LEADFLOW_AUTO_MERGE_THRESHOLD")
                    .ok()
                    .filter(|v| !v.trim().is_empty())
                    .map(|v| v.trim().parse::<f64>())
                    .transpose()
                    .context("Invalid LEADFLOW_AUTO_MERGE_THRESHOLD")?,
            },
            storage: StorageConfig {
                snapshot_path: env::var("LEADFLOW_SNAPSHOT_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| StorageConfig::default().snapshot_path),
            },
            telemetry: TelemetryConfig {
                log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string()),
                metrics_enabled: env::var("METRICS_ENABLED")
                    .map(|v| v == "true" || v == "1")
                    .unwrap_or(false),
                service_name: env::var("SERVICE_NAME")
                    .unwrap_or_else(|_| "leadflow-core".to_string()),
            },
        })
    }
}

fn parse_env_f64(key: &str, default: f64) -> Result<f64> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<f64>()
            .with_context(|| format!("Invalid {}", key)),
        Err(_) => Ok(default),
    }
}

/// Parse a comma-separated list such as `email,phone,companyName`.
pub fn parse_match_fields(raw: &str) -> Result<Vec<MatchField>> {
    let fields = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<MatchField>()
                .map_err(|_| anyhow::anyhow!("Unknown match field: {}", s))
        })
        .collect::<Result<Vec<_>>>()?;
    if fields.is_empty() {
        anyhow::bail!("LEADFLOW_MATCH_FIELDS must name at least one field");
    }
    Ok(fields)
}
