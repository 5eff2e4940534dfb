//! Error types for rawdb

use thiserror::Error;

/// Result type alias for rawdb operations
pub type DbResult<T> = Result<T, DbError>;

/// Error types for repository operations
#[derive(Debug, Error)]
pub enum DbError {
    /// A condition, operator list or value had an unsupported shape.
    #[error("Parameter type error: {0}")]
    ParameterType(String),

    /// An execution mode outside `execute` / `fetch` was requested.
    #[error("Mode operator error: {0} (valid modes are 'sql' or 'as_pd')")]
    ModeOperator(String),

    /// The record type is not registered in the schema registry.
    #[error("Unbound model: {0}")]
    UnboundModel(String),

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Statement execution error
    #[error("Execution error: {0}")]
    Execution(#[from] tokio_postgres::Error),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Attribute-style lookup on a result map missed.
    #[error("Column {0} not exist in fields")]
    FieldNotFound(String),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl DbError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a parameter type error
    pub fn parameter(message: impl Into<String>) -> Self {
        Self::ParameterType(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if this is a parameter type error
    pub fn is_parameter_type(&self) -> bool {
        matches!(self, Self::ParameterType(_))
    }

    /// Check if this is a field-not-found error
    pub fn is_field_not_found(&self) -> bool {
        matches!(self, Self::FieldNotFound(_))
    }

    /// Check if this is an unbound model error
    pub fn is_unbound_model(&self) -> bool {
        matches!(self, Self::UnboundModel(_))
    }

    /// Check if the statement itself failed on the server
    pub fn is_execution(&self) -> bool {
        matches!(
            self,
            Self::Execution(_)
                | Self::UniqueViolation(_)
                | Self::ForeignKeyViolation(_)
                | Self::CheckViolation(_)
        )
    }

    /// Parse a tokio_postgres error into a more specific DbError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{}: {}", constraint, message)),
                "23503" => {
                    return Self::ForeignKeyViolation(format!("{}: {}", constraint, message));
                }
                "23514" => return Self::CheckViolation(format!("{}: {}", constraint, message)),
                _ => {}
            }
        }
        if err.is_closed() {
            return Self::Connection(err.to_string());
        }
        Self::Execution(err)
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for DbError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Connection(err.to_string())
    }
}
