//! Purchase-flow error taxonomy.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | Unauthorized | 403 (401 when no identity at all) |
//! | NotFound | 404 |
//! | GatewayUnavailable | 503 |
//! | GatewayRejected | 502 |
//! | InvalidState | 400 |
//! | ValidationFailed | 400 |
//! | DuplicateReference | 500 |
//! | Inconsistent | 500 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{DomainError, ErrorCode, MovieId};

use super::TxRef;

/// What could not be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingResource {
    Transaction,
    Movie,
    Plan,
}

impl MissingResource {
    fn label(&self) -> &'static str {
        match self {
            MissingResource::Transaction => "Transaction",
            MissingResource::Movie => "Movie",
            MissingResource::Plan => "Subscription plan",
        }
    }
}

/// Errors surfaced by purchase, reconciliation and refund operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseError {
    /// Caller may not act on this resource.
    Unauthorized { reason: String },

    /// Unknown transaction, movie or plan.
    NotFound { resource: MissingResource, id: String },

    /// Gateway unreachable or answered 5xx. Caller may retry.
    GatewayUnavailable { reason: String },

    /// Gateway refused the request data. Retrying will not help.
    GatewayRejected { reason: String },

    /// Transition not allowed from the current state.
    InvalidState { message: String },

    /// Input failed validation.
    ValidationFailed { field: String, message: String },

    /// Freshly generated tx_ref already existed.
    DuplicateReference(String),

    /// Ledger and entitlement disagree after a partial failure.
    Inconsistent { tx_ref: String, detail: String },

    /// Storage or other infrastructure failure.
    Infrastructure(String),
}

impl PurchaseError {
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        PurchaseError::Unauthorized {
            reason: reason.into(),
        }
    }

    pub fn transaction_not_found(tx_ref: &TxRef) -> Self {
        PurchaseError::NotFound {
            resource: MissingResource::Transaction,
            id: tx_ref.to_string(),
        }
    }

    pub fn movie_not_found(movie_id: &MovieId) -> Self {
        PurchaseError::NotFound {
            resource: MissingResource::Movie,
            id: movie_id.to_string(),
        }
    }

    pub fn plan_not_found(plan: impl Into<String>) -> Self {
        PurchaseError::NotFound {
            resource: MissingResource::Plan,
            id: plan.into(),
        }
    }

    pub fn gateway_unavailable(reason: impl Into<String>) -> Self {
        PurchaseError::GatewayUnavailable {
            reason: reason.into(),
        }
    }

    pub fn gateway_rejected(reason: impl Into<String>) -> Self {
        PurchaseError::GatewayRejected {
            reason: reason.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        PurchaseError::InvalidState {
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        PurchaseError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn inconsistent(tx_ref: &TxRef, detail: impl Into<String>) -> Self {
        PurchaseError::Inconsistent {
            tx_ref: tx_ref.to_string(),
            detail: detail.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        PurchaseError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            PurchaseError::Unauthorized { .. } => ErrorCode::Forbidden,
            PurchaseError::NotFound { resource, .. } => match resource {
                MissingResource::Transaction => ErrorCode::TransactionNotFound,
                MissingResource::Movie => ErrorCode::MovieNotFound,
                MissingResource::Plan => ErrorCode::PlanNotFound,
            },
            PurchaseError::GatewayUnavailable { .. } => ErrorCode::GatewayUnavailable,
            PurchaseError::GatewayRejected { .. } => ErrorCode::GatewayRejected,
            PurchaseError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            PurchaseError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            PurchaseError::DuplicateReference(_) => ErrorCode::DuplicateReference,
            PurchaseError::Inconsistent { .. } => ErrorCode::Inconsistent,
            PurchaseError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-friendly error message.
    pub fn message(&self) -> String {
        match self {
            PurchaseError::Unauthorized { reason } => format!("Not allowed: {}", reason),
            PurchaseError::NotFound { resource, id } => {
                format!("{} not found: {}", resource.label(), id)
            }
            PurchaseError::GatewayUnavailable { .. } => {
                "Payment service is temporarily unavailable, please try again".to_string()
            }
            PurchaseError::GatewayRejected { reason } => {
                format!("Payment could not be started: {}", reason)
            }
            PurchaseError::InvalidState { message } => message.clone(),
            PurchaseError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            PurchaseError::DuplicateReference(tx_ref) => {
                format!("Transaction reference already exists: {}", tx_ref)
            }
            PurchaseError::Inconsistent { tx_ref, detail } => {
                format!("Transaction {} needs operator attention: {}", tx_ref, detail)
            }
            PurchaseError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// Returns true if the caller may retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PurchaseError::GatewayUnavailable { .. } | PurchaseError::Infrastructure(_)
        )
    }
}

impl std::fmt::Display for PurchaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for PurchaseError {}

impl From<DomainError> for PurchaseError {
    fn from(err: DomainError) -> Self {
        let detail = |key: &str| err.details.get(key).cloned();
        match err.code {
            ErrorCode::TransactionNotFound => PurchaseError::NotFound {
                resource: MissingResource::Transaction,
                id: detail("tx_ref").unwrap_or_else(|| err.message.clone()),
            },
            ErrorCode::MovieNotFound => PurchaseError::NotFound {
                resource: MissingResource::Movie,
                id: detail("movie_id").unwrap_or_else(|| err.message.clone()),
            },
            ErrorCode::PlanNotFound => PurchaseError::NotFound {
                resource: MissingResource::Plan,
                id: detail("plan").unwrap_or_else(|| err.message.clone()),
            },
            ErrorCode::DuplicateReference => PurchaseError::DuplicateReference(
                detail("tx_ref").unwrap_or_else(|| err.message.clone()),
            ),
            ErrorCode::InvalidStateTransition => PurchaseError::InvalidState {
                message: err.message.clone(),
            },
            ErrorCode::ValidationFailed => PurchaseError::ValidationFailed {
                field: detail("field").unwrap_or_else(|| "unknown".to_string()),
                message: err.message.clone(),
            },
            ErrorCode::Unauthorized | ErrorCode::Forbidden => PurchaseError::Unauthorized {
                reason: err.message.clone(),
            },
            _ => PurchaseError::Infrastructure(err.to_string()),
        }
    }
}

impl From<PurchaseError> for DomainError {
    fn from(err: PurchaseError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx_ref() -> TxRef {
        TxRef::parse("tx_1_abc").unwrap()
    }

    #[test]
    fn only_gateway_unavailable_and_infrastructure_are_retryable() {
        assert!(PurchaseError::gateway_unavailable("503").is_retryable());
        assert!(PurchaseError::infrastructure("pool timeout").is_retryable());
        assert!(!PurchaseError::gateway_rejected("bad amount").is_retryable());
        assert!(!PurchaseError::invalid_state("not completed").is_retryable());
        assert!(!PurchaseError::unauthorized("not owner").is_retryable());
    }

    #[test]
    fn not_found_codes_follow_resource() {
        assert_eq!(
            PurchaseError::transaction_not_found(&tx_ref()).code(),
            ErrorCode::TransactionNotFound
        );
        assert_eq!(
            PurchaseError::movie_not_found(&MovieId::new()).code(),
            ErrorCode::MovieNotFound
        );
        assert_eq!(PurchaseError::plan_not_found("gold").code(), ErrorCode::PlanNotFound);
    }

    #[test]
    fn domain_not_found_keeps_tx_ref() {
        let err = DomainError::new(ErrorCode::TransactionNotFound, "missing")
            .with_detail("tx_ref", "tx_9_zz");
        assert_eq!(
            PurchaseError::from(err),
            PurchaseError::NotFound {
                resource: MissingResource::Transaction,
                id: "tx_9_zz".to_string()
            }
        );
    }

    #[test]
    fn domain_state_error_maps_to_invalid_state() {
        let err = DomainError::new(ErrorCode::InvalidStateTransition, "pending -> refunded");
        assert!(matches!(
            PurchaseError::from(err),
            PurchaseError::InvalidState { .. }
        ));
    }

    #[test]
    fn database_error_maps_to_infrastructure() {
        let err = DomainError::database("connection reset");
        assert!(matches!(
            PurchaseError::from(err),
            PurchaseError::Infrastructure(_)
        ));
    }

    #[test]
    fn inconsistent_message_names_transaction() {
        let err = PurchaseError::inconsistent(&tx_ref(), "revoke failed");
        assert!(err.message().contains("tx_1_abc"));
        assert_eq!(err.code(), ErrorCode::Inconsistent);
    }
}
