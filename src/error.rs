//! Error types for QuillDB
//!
//! This module defines all error types used throughout the engine, plus the
//! classification the session layer uses to decide whether an error is
//! reported inside a `QueryResult` or raised to the caller.

use thiserror::Error;

/// The main error type for QuillDB
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // ========== Lexer Errors ==========
    #[error("Lexer error: unexpected character '{0}' at position {1}")]
    UnexpectedCharacter(char, usize),

    #[error("Lexer error: unterminated string literal starting at position {0}")]
    UnterminatedString(usize),

    #[error("Lexer error: unterminated comment starting at position {0}")]
    UnterminatedComment(usize),

    #[error("Lexer error: invalid number format at position {0}")]
    InvalidNumber(usize),

    // ========== Parser Errors ==========
    #[error("Parse error: unexpected token '{found}' at position {position}, expected {expected}")]
    UnexpectedToken {
        expected: String,
        found: String,
        position: usize,
    },

    #[error("Parse error: unexpected end of input, expected {0}")]
    UnexpectedEof(String),

    #[error("Parse error: {what} is not supported (at position {position})")]
    Unsupported { what: String, position: usize },

    // ========== Catalog Errors ==========
    #[error("Catalog error: table '{0}' not found")]
    TableNotFound(String),

    #[error("Catalog error: table '{0}' already exists")]
    TableAlreadyExists(String),

    #[error("Catalog error: column '{0}' not found in table '{1}'")]
    ColumnNotFound(String, String),

    #[error("Catalog error: column '{0}' already exists in table '{1}'")]
    ColumnAlreadyExists(String, String),

    #[error("Catalog error: index '{0}' not found")]
    IndexNotFound(String),

    #[error("Catalog error: index '{0}' already exists")]
    IndexAlreadyExists(String),

    #[error("Catalog error: variable '@{0}' is not declared")]
    VariableNotFound(String),

    // ========== Type Errors ==========
    #[error("Type error: cannot convert {from} to {to}")]
    TypeMismatch { from: String, to: String },

    #[error("Type error: null value not allowed for column '{0}'")]
    NullNotAllowed(String),

    #[error("Type error: value too large for column '{0}'")]
    ValueTooLarge(String),

    #[error("Type error: numeric overflow in {0}")]
    NumericOverflow(String),

    // ========== Execution Errors ==========
    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Execution error: division by zero")]
    DivisionByZero,

    #[error("Execution error: constraint violation - {0}")]
    ConstraintViolation(String),

    #[error("Execution error: primary key violation for table '{0}'")]
    PrimaryKeyViolation(String),

    #[error("Execution error: unique index '{0}' violated")]
    UniqueViolation(String),

    #[error("Execution error: table '{0}' is locked by another transaction")]
    LockConflict(String),

    // ========== Session Errors ==========
    #[error("Session error: a transaction is already active")]
    TransactionAlreadyActive,

    #[error("Session error: no transaction is active")]
    NoActiveTransaction,

    #[error("Session error: an open reader exists")]
    ReaderAlreadyOpen,

    #[error("Session error: session is closed")]
    SessionClosed,

    #[error("Session error: invalid credentials for user '{0}'")]
    AuthFailed(String),

    #[error("Session error: database '{0}' not found")]
    DatabaseNotFound(String),

    // ========== Configuration Errors ==========
    #[error("Configuration error: invalid connection string - {0}")]
    InvalidConnectionString(String),

    // ========== Internal Errors ==========
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Syntax,
    TableNotFound,
    ColumnNotFound,
    DuplicateTable,
    ConstraintViolation,
    TypeMismatch,
    TransactionAlreadyActive,
    NoActiveTransaction,
    ReaderAlreadyOpen,
    Auth,
    Session,
    Configuration,
    Execution,
    Internal,
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnexpectedCharacter(..)
            | Error::UnterminatedString(_)
            | Error::UnterminatedComment(_)
            | Error::InvalidNumber(_)
            | Error::UnexpectedToken { .. }
            | Error::UnexpectedEof(_)
            | Error::Unsupported { .. } => ErrorKind::Syntax,
            Error::TableNotFound(_) => ErrorKind::TableNotFound,
            Error::ColumnNotFound(..) | Error::VariableNotFound(_) => ErrorKind::ColumnNotFound,
            Error::TableAlreadyExists(_)
            | Error::ColumnAlreadyExists(..)
            | Error::IndexAlreadyExists(_) => ErrorKind::DuplicateTable,
            Error::NullNotAllowed(_)
            | Error::ConstraintViolation(_)
            | Error::PrimaryKeyViolation(_)
            | Error::UniqueViolation(_) => ErrorKind::ConstraintViolation,
            Error::TypeMismatch { .. } | Error::ValueTooLarge(_) | Error::NumericOverflow(_) => {
                ErrorKind::TypeMismatch
            }
            Error::TransactionAlreadyActive => ErrorKind::TransactionAlreadyActive,
            Error::NoActiveTransaction => ErrorKind::NoActiveTransaction,
            Error::ReaderAlreadyOpen => ErrorKind::ReaderAlreadyOpen,
            Error::AuthFailed(_) => ErrorKind::Auth,
            Error::SessionClosed | Error::DatabaseNotFound(_) => ErrorKind::Session,
            Error::InvalidConnectionString(_) => ErrorKind::Configuration,
            Error::IndexNotFound(_)
            | Error::ExecutionError(_)
            | Error::DivisionByZero
            | Error::LockConflict(_) => ErrorKind::Execution,
            Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// True for syntax errors raised by the lexer or parser
    pub fn is_syntax_error(&self) -> bool {
        self.kind() == ErrorKind::Syntax
    }

    /// Session-protocol faults are raised to the caller instead of being
    /// reported inside a result.
    pub fn is_session_fault(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::TransactionAlreadyActive
                | ErrorKind::NoActiveTransaction
                | ErrorKind::ReaderAlreadyOpen
                | ErrorKind::Session
                | ErrorKind::Auth
                | ErrorKind::Configuration
                | ErrorKind::Internal
        )
    }

    /// Numeric error code carried in error results
    pub fn code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Syntax => 1001,
            ErrorKind::TableNotFound => 2001,
            ErrorKind::ColumnNotFound => 2002,
            ErrorKind::DuplicateTable => 2003,
            ErrorKind::ConstraintViolation => 3001,
            ErrorKind::TypeMismatch => 3002,
            ErrorKind::Execution => 4001,
            ErrorKind::TransactionAlreadyActive => 5001,
            ErrorKind::NoActiveTransaction => 5002,
            ErrorKind::ReaderAlreadyOpen => 5003,
            ErrorKind::Session => 5004,
            ErrorKind::Auth => 5005,
            ErrorKind::Configuration => 6001,
            ErrorKind::Internal => 9001,
        }
    }
}

/// Result type alias for QuillDB operations
pub type Result<T> = std::result::Result<T, Error>;
