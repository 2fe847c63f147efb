//! Error types for store metadata and configuration.

// These warnings are false positives - the fields are used by derive macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors that can occur while building metadata or loading configuration.
#[derive(Error, Debug, Diagnostic)]
pub enum SchemaError {
    /// Error reading a file.
    #[error("failed to read file: {path}")]
    #[diagnostic(code(relmap::schema::io_error))]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML")]
    #[diagnostic(code(relmap::schema::toml_error))]
    TomlError {
        #[source]
        source: toml::de::Error,
    },

    /// Invalid entity definition.
    #[error("invalid entity `{name}`: {message}")]
    #[diagnostic(code(relmap::schema::invalid_entity))]
    InvalidEntity { name: String, message: String },

    /// Invalid relation definition.
    #[error("invalid relation `{entity}.{relation}`: {message}")]
    #[diagnostic(code(relmap::schema::invalid_relation))]
    InvalidRelation {
        entity: String,
        relation: String,
        message: String,
    },

    /// Duplicate definition.
    #[error("duplicate {kind} `{name}`")]
    #[diagnostic(code(relmap::schema::duplicate))]
    Duplicate { kind: String, name: String },

    /// A relation points at an entity that was never declared.
    #[error("relation `{entity}.{relation}` targets unknown entity `{target}`")]
    #[diagnostic(
        code(relmap::schema::unknown_target),
        help("declare `{target}` under [entities] or fix the `target` key")
    )]
    UnknownTarget {
        entity: String,
        relation: String,
        target: String,
    },

    /// Configuration error.
    #[error("configuration error: {message}")]
    #[diagnostic(code(relmap::schema::config_error))]
    ConfigError { message: String },

    /// Validation error with multiple issues.
    #[error("schema validation failed with {count} error(s)")]
    #[diagnostic(code(relmap::schema::validation_failed))]
    ValidationFailed {
        count: usize,
        #[related]
        errors: Vec<SchemaError>,
    },
}

impl SchemaError {
    /// Create an invalid entity error.
    pub fn invalid_entity(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEntity {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid relation error.
    pub fn invalid_relation(
        entity: impl Into<String>,
        relation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidRelation {
            entity: entity.into(),
            relation: relation.into(),
            message: message.into(),
        }
    }

    /// Create a duplicate definition error.
    pub fn duplicate(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Duplicate {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[allow(unused_assignments)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_entity_display() {
        let err = SchemaError::invalid_entity("Customer", "no table");
        assert_eq!(err.to_string(), "invalid entity `Customer`: no table");
    }

    #[test]
    fn test_invalid_relation_display() {
        let err = SchemaError::invalid_relation("Customer", "orders", "empty references");
        assert!(err.to_string().contains("Customer.orders"));
    }

    #[test]
    fn test_unknown_target_has_help() {
        let err = SchemaError::UnknownTarget {
            entity: "Customer".into(),
            relation: "orders".into(),
            target: "Order".into(),
        };
        let help = err.help().map(|h| h.to_string()).unwrap_or_default();
        assert!(help.contains("Order"));
    }

    #[test]
    fn test_validation_failed_collects_related() {
        let err = SchemaError::ValidationFailed {
            count: 2,
            errors: vec![
                SchemaError::duplicate("entity", "Order"),
                SchemaError::config("bad"),
            ],
        };
        assert_eq!(err.related().map(|r| r.count()), Some(2));
    }
}
