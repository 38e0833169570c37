//! Error types for port operations.

use skirmish_domain::DomainError;

use super::types::SettlementRefusal;

/// Repository operation errors with context for debugging.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Entity not found - includes entity type and ID for actionable error messages.
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Database operation failed - includes operation name for tracing.
    #[error("Database error in {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },

    /// Serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A conditional write found a newer version than the one it was computed from.
    #[error("{entity_type} {id} changed since version {expected_version}")]
    StaleWrite {
        entity_type: &'static str,
        id: String,
        expected_version: u64,
    },

    /// The defender no longer meets the settlement's precondition.
    #[error("Settlement on {id} refused: {}", reason.as_str())]
    Refused {
        id: String,
        reason: SettlementRefusal,
    },

    /// Business constraint violated.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

impl RepoError {
    /// Create a NotFound error with entity type and ID context.
    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    /// Create a Database error with operation context.
    pub fn database(operation: &'static str, message: impl ToString) -> Self {
        Self::Database {
            operation,
            message: message.to_string(),
        }
    }

    /// Create a Serialization error.
    pub fn serialization(message: impl ToString) -> Self {
        Self::Serialization(message.to_string())
    }

    pub fn stale(entity_type: &'static str, id: impl ToString, expected_version: u64) -> Self {
        Self::StaleWrite {
            entity_type,
            id: id.to_string(),
            expected_version,
        }
    }

    pub fn refused(id: impl ToString, reason: SettlementRefusal) -> Self {
        Self::Refused {
            id: id.to_string(),
            reason,
        }
    }

    /// Create a ConstraintViolation error.
    pub fn constraint(message: impl ToString) -> Self {
        Self::ConstraintViolation(message.to_string())
    }

    /// Check if this is a NotFound error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StaleWrite { .. })
    }

    pub fn is_refused(&self) -> bool {
        matches!(self, Self::Refused { .. })
    }
}

impl From<DomainError> for RepoError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::CorruptRecord(msg) | DomainError::Parse(msg) => Self::Serialization(msg),
            other => Self::ConstraintViolation(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum OracleError {
    #[error("Combat resolution failed: {0}")]
    ResolutionFailed(String),
    #[error("Combat service unavailable")]
    Unavailable,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),
    #[error(transparent)]
    Store(#[from] RepoError),
}
