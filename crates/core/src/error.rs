//! Unified error types for the attribution engine.
//!
//! Error codes:
//! - CONFIG_001: Configuration errors (broken KPI rules)
//! - VALID_001-003: Validation errors
//! - NOT_FOUND_001-003: Lookup errors
//! - DB_001-003: Storage errors

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorCode {
    /// CONFIG_001: KPI match column does not name a known event field
    UnknownColumn,
}

impl ConfigErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownColumn => "CONFIG_001",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        400
    }
}

/// Validation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorCode {
    /// VALID_001: Invalid JSON / Invalid format
    InvalidFormat,
    /// VALID_002: KPI is missing column, value or name
    MissingKpiFields,
    /// VALID_003: A field exceeds its length limit
    FieldTooLong,
}

impl ValidationErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidFormat => "VALID_001",
            Self::MissingKpiFields => "VALID_002",
            Self::FieldTooLong => "VALID_003",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        400
    }
}

/// Lookup error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundErrorCode {
    /// NOT_FOUND_001: KPI does not exist for this owner
    Kpi,
    /// NOT_FOUND_002: Event does not exist for this owner
    Event,
    /// NOT_FOUND_003: Conversion does not exist for this owner
    Conversion,
}

impl NotFoundErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Kpi => "NOT_FOUND_001",
            Self::Event => "NOT_FOUND_002",
            Self::Conversion => "NOT_FOUND_003",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        404
    }
}

/// Database error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorCode {
    /// DB_001: Failed to write to a store
    WriteFailed,
    /// DB_002: Failed to read from a store
    ReadFailed,
    /// DB_003: Query did not finish before its deadline
    DeadlineExceeded,
}

impl DbErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::WriteFailed => "DB_001",
            Self::ReadFailed => "DB_002",
            Self::DeadlineExceeded => "DB_003",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::WriteFailed | Self::ReadFailed => 500,
            Self::DeadlineExceeded => 504,
        }
    }
}

/// Unified error type for the attribution engine.
#[derive(Debug, Error)]
pub enum Error {
    /// A KPI rule is malformed. Fatal for the request that hit it.
    #[error("[{code}] {message}")]
    Configuration {
        code: &'static str,
        message: String,
        http_status: u16,
    },

    /// Input rejected before any persistence attempt.
    #[error("[{code}] {message}")]
    Validation {
        code: &'static str,
        message: String,
        http_status: u16,
    },

    /// Lookup by id found nothing.
    #[error("[{code}] {message}")]
    NotFound {
        code: &'static str,
        message: String,
        http_status: u16,
    },

    /// Any persistence-layer failure.
    #[error("[{code}] {message}")]
    Storage {
        code: &'static str,
        message: String,
        http_status: u16,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a configuration error.
    pub fn configuration(code: ConfigErrorCode, msg: impl Into<String>) -> Self {
        Self::Configuration {
            code: code.code(),
            message: msg.into(),
            http_status: code.http_status(),
        }
    }

    /// Create a validation error with code.
    pub fn validation(code: ValidationErrorCode, msg: impl Into<String>) -> Self {
        Self::Validation {
            code: code.code(),
            message: msg.into(),
            http_status: code.http_status(),
        }
    }

    /// Create a lookup error.
    pub fn not_found(code: NotFoundErrorCode, msg: impl Into<String>) -> Self {
        Self::NotFound {
            code: code.code(),
            message: msg.into(),
            http_status: code.http_status(),
        }
    }

    /// Create a database error.
    pub fn storage(code: DbErrorCode, msg: impl Into<String>) -> Self {
        Self::Storage {
            code: code.code(),
            message: msg.into(),
            http_status: code.http_status(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Configuration { http_status, .. } => *http_status,
            Self::Validation { http_status, .. } => *http_status,
            Self::NotFound { http_status, .. } => *http_status,
            Self::Storage { http_status, .. } => *http_status,
            Self::Serialization(_) => 500,
            Self::Internal(_) => 500,
        }
    }

    /// Get the error code if this is a coded error.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Configuration { code, .. } => Some(code),
            Self::Validation { code, .. } => Some(code),
            Self::NotFound { code, .. } => Some(code),
            Self::Storage { code, .. } => Some(code),
            _ => None,
        }
    }
}
