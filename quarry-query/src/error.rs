//! Error types for query specification, compilation and execution.
//!
//! Every failure surfaces as a [`QueryError`] carrying an [`ErrorCode`]. The
//! codes group into three families that callers branch on:
//!
//! - validation (`is_validation`): a malformed request spec, raised while
//!   resolving or compiling, before anything touches the data store
//! - not found (`is_not_found`): an identifier lookup missed
//! - data store (`is_data_store`): the underlying store failed; the original
//!   driver error is kept as the source
//!
//! Error codes follow a pattern: Q{category}{number}
//! - 1xxx: Request errors (missing relationship, invalid relation, ...)
//! - 3xxx: Connection errors
//! - 5xxx: Execution errors
//! - 6xxx: Data errors
//! - 7xxx: Configuration errors
//! - 9xxx: Internal errors
//!
//! ```rust
//! use quarry_query::{QueryError, ErrorCode};
//!
//! let err = QueryError::not_found("User");
//! assert_eq!(err.code, ErrorCode::RecordNotFound);
//! assert!(err.to_string().contains("Q1001"));
//!
//! let err = QueryError::missing_field("load", "relationship");
//! assert!(err.is_validation());
//! ```

use std::fmt;
use thiserror::Error;

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Request errors (1xxx)
    /// Record not found (Q1001).
    RecordNotFound = 1001,
    /// Invalid filter or sort clause (Q1003).
    InvalidFilter = 1003,
    /// Invalid field selection (Q1004).
    InvalidSelect = 1004,
    /// Required field missing (Q1005).
    RequiredFieldMissing = 1005,
    /// Unknown entity or relation (Q1006).
    InvalidRelation = 1006,
    /// Nesting deeper than supported (Q1007).
    UnsupportedNesting = 1007,
    /// Configured limit exceeded (Q1008).
    LimitExceeded = 1008,
    /// Invalid parameter value (Q1009).
    InvalidParameter = 1009,

    // Connection errors (3xxx)
    /// Database connection failed (Q3001).
    ConnectionFailed = 3001,
    /// Connection pool exhausted (Q3002).
    PoolExhausted = 3002,

    // Execution errors (5xxx)
    /// General database error (Q5005).
    DatabaseError = 5005,

    // Data errors (6xxx)
    /// Serialization error (Q6002).
    SerializationError = 6002,
    /// Deserialization error (Q6003).
    DeserializationError = 6003,

    // Configuration errors (7xxx)
    /// Invalid configuration (Q7001).
    InvalidConfiguration = 7001,

    // Internal errors (9xxx)
    /// Internal error (Q9001).
    Internal = 9001,
}

impl ErrorCode {
    /// Get the error code string (e.g., "Q1001").
    pub fn code(&self) -> String {
        format!("Q{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::RecordNotFound => "Record not found",
            Self::InvalidFilter => "Invalid filter condition",
            Self::InvalidSelect => "Invalid field selection",
            Self::RequiredFieldMissing => "Required field missing",
            Self::InvalidRelation => "Unknown entity or relation",
            Self::UnsupportedNesting => "Unsupported nesting depth",
            Self::LimitExceeded => "Configured limit exceeded",
            Self::InvalidParameter => "Invalid parameter",
            Self::ConnectionFailed => "Database connection failed",
            Self::PoolExhausted => "Connection pool exhausted",
            Self::DatabaseError => "Database error",
            Self::SerializationError => "Serialization error",
            Self::DeserializationError => "Deserialization error",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::Internal => "Internal error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Suggestion for fixing an error.
#[derive(Debug, Clone)]
pub struct Suggestion {
    /// The suggestion text.
    pub text: String,
}

impl Suggestion {
    /// Create a new suggestion.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that was being performed.
    pub operation: Option<String>,
    /// The entity involved.
    pub entity: Option<String>,
    /// The field or request key involved.
    pub field: Option<String>,
    /// The SQL statement (if available).
    pub sql: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<Suggestion>,
    /// Help text.
    pub help: Option<String>,
}

/// Errors that can occur while resolving, compiling or executing a query.
#[derive(Error, Debug)]
pub struct QueryError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl QueryError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add context about the operation.
    pub fn with_context(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(Suggestion::new(suggestion));
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

    /// Set the field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.context.field = Some(field.into());
        self
    }

    /// Set the SQL statement.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.context.sql = Some(sql.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// Create a not found error.
    pub fn not_found(entity: impl Into<String>) -> Self {
        let entity = entity.into();
        Self::new(
            ErrorCode::RecordNotFound,
            format!("No {} record found matching the identifier", entity),
        )
        .with_entity(&entity)
        .with_suggestion(format!("Verify the {} exists before updating or deleting it", entity))
    }

    /// Create an error for a directive missing a required key.
    pub fn missing_field(directive: impl Into<String>, field: impl Into<String>) -> Self {
        let directive = directive.into();
        let field = field.into();
        Self::new(
            ErrorCode::RequiredFieldMissing,
            format!("{} must have '{}' key", directive, field),
        )
        .with_context(format!("resolving {}", directive))
        .with_field(&field)
    }

    /// Create an invalid input error.
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        let field = field.into();
        let message = message.into();
        Self::new(
            ErrorCode::InvalidParameter,
            format!("Invalid input for {}: {}", field, message),
        )
        .with_field(&field)
    }

    /// Create an invalid filter or sort error.
    pub fn invalid_filter(field: impl Into<String>, message: impl Into<String>) -> Self {
        let field = field.into();
        let message = message.into();
        Self::new(ErrorCode::InvalidFilter, format!("Invalid filter on {}: {}", field, message))
            .with_field(&field)
    }

    /// Create an unknown relation error.
    pub fn unknown_relation(entity: impl Into<String>, relation: impl Into<String>) -> Self {
        let entity = entity.into();
        let relation = relation.into();
        Self::new(
            ErrorCode::InvalidRelation,
            format!("Entity {} has no relation named '{}'", entity, relation),
        )
        .with_entity(&entity)
        .with_field(&relation)
        .with_suggestion("Check the relation name against the entity schema")
    }

    /// Create an unknown entity error.
    pub fn unknown_entity(entity: impl Into<String>) -> Self {
        let entity = entity.into();
        Self::new(ErrorCode::InvalidRelation, format!("Unknown entity '{}'", entity))
            .with_entity(&entity)
    }

    /// Create an unsupported nesting error.
    pub fn unsupported_nesting(relation: impl Into<String>) -> Self {
        let relation = relation.into();
        Self::new(
            ErrorCode::UnsupportedNesting,
            format!("Load directive for '{}' cannot contain a nested load", relation),
        )
        .with_field(&relation)
        .with_help("Only one level of nested load is supported inside an existence filter")
    }

    /// Create a limit exceeded error.
    pub fn limit_exceeded(what: impl Into<String>, actual: u64, max: u64) -> Self {
        let what = what.into();
        Self::new(
            ErrorCode::LimitExceeded,
            format!("{} of {} exceeds the configured maximum of {}", what, actual, max),
        )
        .with_field(&what)
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::ConnectionFailed, format!("Connection error: {}", message))
            .with_suggestion("Verify the database URL is correct")
    }

    /// Create a pool exhausted error.
    pub fn pool_exhausted(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PoolExhausted, message.into())
    }

    /// Create a general database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message.into())
            .with_suggestion("Check the database logs for more details")
    }

    /// Create a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SerializationError, message.into())
    }

    /// Create a deserialization error.
    pub fn deserialization(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(
            ErrorCode::DeserializationError,
            format!("Failed to deserialize result: {}", message),
        )
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfiguration, message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::Internal, format!("Internal error: {}", message))
    }

    // ============== Error Checks ==============

    /// Check if this is a not found error.
    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::RecordNotFound
    }

    /// Check if this error rejects a malformed request spec.
    pub fn is_validation(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::InvalidFilter
                | ErrorCode::InvalidSelect
                | ErrorCode::RequiredFieldMissing
                | ErrorCode::InvalidRelation
                | ErrorCode::UnsupportedNesting
                | ErrorCode::LimitExceeded
                | ErrorCode::InvalidParameter
        )
    }

    /// Check if this error came from the underlying data store.
    pub fn is_data_store(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::ConnectionFailed
                | ErrorCode::PoolExhausted
                | ErrorCode::DatabaseError
                | ErrorCode::SerializationError
                | ErrorCode::DeserializationError
        )
    }

    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        matches!(self.code, ErrorCode::ConnectionFailed | ErrorCode::PoolExhausted)
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
        if let Some(ref field) = self.context.field {
            output.push_str(&format!("  → Field: {}\n", field));
        }

        // SQL (truncated if too long)
        if let Some(ref sql) = self.context.sql {
            let sql_display = if sql.chars().count() > 200 {
                format!("{}...", sql.chars().take(200).collect::<String>())
            } else {
                sql.clone()
            };
            output.push_str(&format!("  → SQL: {}\n", sql_display));
        }

        if !self.context.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for (i, suggestion) in self.context.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion.text));
            }
        }

        if let Some(ref help) = self.context.help {
            output.push_str(&format!("\nHelp: {}\n", help));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_format() {
        assert_eq!(ErrorCode::RecordNotFound.code(), "Q1001");
        assert_eq!(ErrorCode::ConnectionFailed.code(), "Q3001");
        assert_eq!(ErrorCode::DatabaseError.to_string(), "Q5005");
    }

    #[test]
    fn test_not_found_error() {
        let err = QueryError::not_found("User");
        assert!(err.is_not_found());
        assert!(!err.is_validation());
        assert!(err.message.contains("User"));
        assert_eq!(err.context.entity, Some("User".to_string()));
    }

    #[test]
    fn test_missing_field_is_validation() {
        let err = QueryError::missing_field("load", "relationship");
        assert!(err.is_validation());
        assert_eq!(err.message, "load must have 'relationship' key");
        assert_eq!(err.context.field, Some("relationship".to_string()));
    }

    #[test]
    fn test_validation_family() {
        assert!(QueryError::unknown_relation("User", "pets").is_validation());
        assert!(QueryError::unsupported_nesting("posts").is_validation());
        assert!(QueryError::limit_exceeded("limit", 500, 100).is_validation());
        assert!(QueryError::invalid_filter("sort.name", "bad direction").is_validation());
        assert!(!QueryError::database("disk I/O error").is_validation());
    }

    #[test]
    fn test_data_store_family() {
        assert!(QueryError::database("locked").is_data_store());
        assert!(QueryError::connection("refused").is_data_store());
        assert!(QueryError::connection("refused").is_connection_error());
        assert!(!QueryError::not_found("User").is_data_store());
    }

    #[test]
    fn test_display_full() {
        let err = QueryError::unknown_relation("User", "pets")
            .with_context("compiling query")
            .with_sql("SELECT 1");

        let output = err.display_full();
        assert!(output.contains("Q1006"));
        assert!(output.contains("pets"));
        assert!(output.contains("compiling query"));
        assert!(output.contains("SELECT 1"));
        assert!(output.contains("Suggestions"));
    }

    #[test]
    fn test_source_is_kept() {
        let io = std::io::Error::other("boom");
        let err = QueryError::database("write failed").with_source(io);
        assert!(std::error::Error::source(&err).is_some());
    }
}
