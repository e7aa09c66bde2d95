//! Subsystem configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Capability that grants unrestricted visibility.
pub const DEFAULT_ADMIN_CAPABILITY: &str = "administrator";

/// Field holding the owning actor on monitored entities.
pub const DEFAULT_OWNER_FIELD: &str = "owner";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document could not be parsed.
    #[error("invalid audit configuration: {0}")]
    Parse(#[from] serde_json::Error),
    /// A value parsed but is unusable.
    #[error("invalid audit configuration: {0}")]
    Invalid(String),
}

/// Settings shared by the tracker, the access scope and the policies.
///
/// Every field has a default, so a partial document is accepted.
///
/// # Examples
///
/// ```
/// use audit_scope::AuditConfig;
///
/// let config = AuditConfig::from_json(r#"{ "monitored_types": ["Person"] }"#).unwrap();
/// assert_eq!(config.admin_capability, "administrator");
/// assert_eq!(config.monitored_types, vec!["Person".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Capability whose holders see and touch every row.
    pub admin_capability: String,
    /// Name of the owner field in entity snapshots.
    pub owner_field: String,
    /// Fields never reported in update diffs. The owner field is always
    /// added to this list.
    pub excluded_fields: Vec<String>,
    /// Entity type names subject to change tracking.
    pub monitored_types: Vec<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            admin_capability: DEFAULT_ADMIN_CAPABILITY.to_string(),
            owner_field: DEFAULT_OWNER_FIELD.to_string(),
            excluded_fields: vec![
                "id".to_string(),
                "created_at".to_string(),
                "updated_at".to_string(),
            ],
            monitored_types: Vec::new(),
        }
    }
}

impl AuditConfig {
    /// Parses a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the document is malformed or names an
    /// empty administrator capability or owner field.
    pub fn from_json(document: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that deserialize fine but cannot work.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for blank names.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.admin_capability.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "admin_capability must not be empty".to_string(),
            ));
        }
        if self.owner_field.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "owner_field must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Exclusion list for diffs, owner field included.
    pub fn diff_exclusions(&self) -> Vec<String> {
        let mut fields = self.excluded_fields.clone();
        if !fields.contains(&self.owner_field) {
            fields.push(self.owner_field.clone());
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_exclude_identity_timestamps_and_owner() {
        let exclusions = AuditConfig::default().diff_exclusions();
        for field in ["id", "created_at", "updated_at", "owner"] {
            assert!(exclusions.iter().any(|f| f == field), "missing {field}");
        }
    }

    #[test]
    fn custom_owner_field_is_excluded() {
        let config = AuditConfig::from_json(r#"{ "owner_field": "usuario" }"#).unwrap();
        assert!(config.diff_exclusions().contains(&"usuario".to_string()));
        assert!(!config.diff_exclusions().contains(&"owner".to_string()));
    }

    #[test]
    fn blank_admin_capability_is_rejected() {
        let err = AuditConfig::from_json(r#"{ "admin_capability": " " }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_document_is_rejected() {
        assert!(matches!(
            AuditConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
