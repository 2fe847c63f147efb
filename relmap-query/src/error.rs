//! Error types for relationship fetching with actionable messages.
//!
//! Every failure carries an [`ErrorCode`] that places it in one of three
//! categories a mapping engine cares about:
//!
//! - 1xxx: Configuration errors, detected while building a relationship
//!   descriptor. Not retryable.
//! - 2xxx: Store execution errors, raised by the batch query or by entity
//!   materialization. Propagated unchanged; retry policy belongs to the caller.
//! - 3xxx: Callback errors, raised by a fetch item's completion callback.
//! - 9xxx: Internal errors
//!
//! ```rust
//! use relmap_query::{ErrorCode, ErrorKind, FetchError};
//!
//! let err = FetchError::composite_identifier("OrderLine", 2);
//! assert_eq!(err.code, ErrorCode::CompositeIdentifier);
//! assert_eq!(err.kind(), ErrorKind::Configuration);
//! assert!(err.to_string().contains("OrderLine"));
//! ```

use std::fmt;
use thiserror::Error;

use crate::value::Value;

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Boxed error returned by user-supplied callbacks and backends.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Configuration errors (1xxx)
    /// Entity not present in store metadata (R1001).
    UnknownEntity = 1001,
    /// Entity or view exposes no identifier field (R1002).
    MissingIdentifier = 1002,
    /// Entity identifier spans more than one field (R1003).
    CompositeIdentifier = 1003,
    /// Relation path names an undeclared relation (R1004).
    UnknownRelation = 1004,
    /// Relation path does not end at the expected dependent entity (R1005).
    UnsupportedRelationShape = 1005,
    /// Invalid mapping or fetch configuration (R1006).
    InvalidConfiguration = 1006,

    // Store execution errors (2xxx)
    /// Batch query or materialization failed (R2001).
    QueryFailed = 2001,
    /// Batch query or materialization timed out (R2002).
    QueryTimeout = 2002,
    /// Store connection failed (R2003).
    ConnectionFailed = 2003,
    /// The store rejected the query description (R2004).
    MalformedQuery = 2004,
    /// A store row could not be turned into a destination object (R2005).
    RowDecode = 2005,

    // Callback errors (3xxx)
    /// A completion callback failed (R3001).
    CallbackFailed = 3001,

    // Internal errors (9xxx)
    /// Internal error (R9001).
    Internal = 9001,
}

/// Broad category of an [`ErrorCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Detected at descriptor build time.
    Configuration,
    /// Raised while talking to the store.
    StoreExecution,
    /// Raised by a completion callback.
    Callback,
    /// A bug in relmap.
    Internal,
}

impl ErrorCode {
    /// Get the error code string (e.g., "R1001").
    pub fn code(&self) -> String {
        format!("R{}", *self as u16)
    }

    /// Get the category of this code.
    pub fn kind(&self) -> ErrorKind {
        match *self as u16 {
            1000..=1999 => ErrorKind::Configuration,
            2000..=2999 => ErrorKind::StoreExecution,
            3000..=3999 => ErrorKind::Callback,
            _ => ErrorKind::Internal,
        }
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::UnknownEntity => "Unknown entity",
            Self::MissingIdentifier => "Missing identifier field",
            Self::CompositeIdentifier => "Composite identifier unsupported",
            Self::UnknownRelation => "Unknown relation",
            Self::UnsupportedRelationShape => "Unsupported relation shape",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::QueryFailed => "Query failed",
            Self::QueryTimeout => "Query timeout",
            Self::ConnectionFailed => "Connection failed",
            Self::MalformedQuery => "Malformed query",
            Self::RowDecode => "Row decode failed",
            Self::CallbackFailed => "Completion callback failed",
            Self::Internal => "Internal error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that was being performed.
    pub operation: Option<String>,
    /// The entity involved.
    pub entity: Option<String>,
    /// The relation path involved.
    pub relation: Option<String>,
    /// The field involved.
    pub field: Option<String>,
    /// The rendered SQL (if available).
    pub sql: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<String>,
    /// Help text.
    pub help: Option<String>,
}

/// Errors that can occur while describing, planning or applying a relationship fetch.
#[derive(Error, Debug)]
pub struct FetchError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<BoxError>,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl FetchError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Get the category of this error.
    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }

    /// Add context about the operation.
    pub fn with_context(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(suggestion.into());
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.context.help = Some(help.into());
        self
    }

    /// Set the entity.
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.context.entity = Some(entity.into());
        self
    }

    /// Set the relation path.
    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.context.relation = Some(relation.into());
        self
    }

    /// Set the field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.context.field = Some(field.into());
        self
    }

    /// Set the rendered SQL.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.context.sql = Some(sql.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Set an already boxed source error.
    pub fn with_boxed_source(mut self, source: BoxError) -> Self {
        self.source = Some(source);
        self
    }

    // ============== Configuration ==============

    /// Entity is not present in store metadata.
    pub fn unknown_entity(entity: impl Into<String>) -> Self {
        let entity = entity.into();
        Self::new(
            ErrorCode::UnknownEntity,
            format!("Entity `{}` is not present in store metadata", entity),
        )
        .with_entity(&entity)
        .with_suggestion(format!("Register `{}` in the schema before mapping it", entity))
    }

    /// Entity or destination view has no identifier field.
    pub fn missing_identifier(entity: impl Into<String>) -> Self {
        let entity = entity.into();
        Self::new(
            ErrorCode::MissingIdentifier,
            format!("No identifier field found on `{}`", entity),
        )
        .with_entity(&entity)
        .with_help("Relationship fetching correlates rows by a single identifier field")
    }

    /// Identifier spans several fields.
    pub fn composite_identifier(entity: impl Into<String>, count: usize) -> Self {
        let entity = entity.into();
        Self::new(
            ErrorCode::CompositeIdentifier,
            format!("`{}` has a composite identifier of {} fields", entity, count),
        )
        .with_entity(&entity)
        .with_help("Composite keys are not supported by batch relationship fetching")
    }

    /// Relation path segment is not a declared relation.
    pub fn unknown_relation(entity: impl Into<String>, relation: impl Into<String>) -> Self {
        let entity = entity.into();
        let relation = relation.into();
        Self::new(
            ErrorCode::UnknownRelation,
            format!("`{}` declares no relation named `{}`", entity, relation),
        )
        .with_entity(&entity)
        .with_relation(&relation)
    }

    /// Relation path has a shape the fetcher cannot correlate.
    pub fn unsupported_shape(relation: impl Into<String>, message: impl Into<String>) -> Self {
        let relation = relation.into();
        let message = message.into();
        Self::new(
            ErrorCode::UnsupportedRelationShape,
            format!("Relation `{}` has an unsupported shape: {}", relation, message),
        )
        .with_relation(&relation)
    }

    /// General configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfiguration, message)
    }

    // ============== Store execution ==============

    /// Batch query or materialization failed.
    pub fn query_failed(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::QueryFailed, format!("Store query failed: {}", message))
            .with_suggestion("Check the store logs for more details")
    }

    /// Batch query or materialization timed out.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::new(
            ErrorCode::QueryTimeout,
            format!("Relationship fetch timed out after {}ms", duration_ms),
        )
        .with_suggestion("Increase `query_timeout_ms` in relmap.toml")
        .with_help("No completion callback ran for the timed out batch")
    }

    /// Store connection failed.
    pub fn connection(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::ConnectionFailed, format!("Connection error: {}", message))
    }

    /// Store rejected the query description.
    pub fn malformed_query(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MalformedQuery, message)
    }

    /// Row could not be turned into a destination object.
    pub fn row_decode(entity: impl Into<String>, message: impl Into<String>) -> Self {
        let entity = entity.into();
        let message = message.into();
        Self::new(
            ErrorCode::RowDecode,
            format!("Failed to decode `{}` row: {}", entity, message),
        )
        .with_entity(&entity)
    }

    // ============== Callback ==============

    /// A completion callback failed.
    pub fn callback(parent_id: &Value, source: BoxError) -> Self {
        Self::new(
            ErrorCode::CallbackFailed,
            format!("Completion callback for parent {} failed: {}", parent_id, source),
        )
        .with_help("Callbacks of sibling fetch items may already have completed")
        .with_boxed_source(source)
    }

    /// Internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::Internal, format!("Internal error: {}", message))
            .with_help("This is likely a bug in relmap - please report it")
    }

    // ============== Error Checks ==============

    /// Check if this is a configuration error.
    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }

    /// Check if this is a store execution error.
    pub fn is_store_execution(&self) -> bool {
        self.kind() == ErrorKind::StoreExecution
    }

    /// Check if this is a callback error.
    pub fn is_callback(&self) -> bool {
        self.kind() == ErrorKind::Callback
    }

    /// Check if this is a timeout.
    pub fn is_timeout(&self) -> bool {
        self.code == ErrorCode::QueryTimeout
    }

    /// Display the full error with all context and suggestions.
    pub fn display_full(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Error [{}]: {}\n", self.code.code(), self.message));

        if let Some(ref op) = self.context.operation {
            output.push_str(&format!("  → While: {}\n", op));
        }
        if let Some(ref entity) = self.context.entity {
            output.push_str(&format!("  → Entity: {}\n", entity));
        }
        if let Some(ref relation) = self.context.relation {
            output.push_str(&format!("  → Relation: {}\n", relation));
        }
        if let Some(ref field) = self.context.field {
            output.push_str(&format!("  → Field: {}\n", field));
        }
        if let Some(ref sql) = self.context.sql {
            let sql_display = if sql.len() > 200 {
                format!("{}...", &sql[..200])
            } else {
                sql.clone()
            };
            output.push_str(&format!("  → SQL: {}\n", sql_display));
        }

        if !self.context.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for (i, suggestion) in self.context.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        if let Some(ref help) = self.context.help {
            output.push_str(&format!("\nHelp: {}\n", help));
        }

        output
    }
}

impl From<relmap_schema::SchemaError> for FetchError {
    fn from(err: relmap_schema::SchemaError) -> Self {
        FetchError::configuration(err.to_string()).with_source(err)
    }
}
