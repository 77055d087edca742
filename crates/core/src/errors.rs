use serde::Serialize;
use thiserror::Error;

use crate::cart::CartError;
use crate::domain::order::OrderState;
use crate::selection::SelectionError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid order transition from {from:?} to {to:?}")]
    InvalidOrderTransition { from: OrderState, to: OrderState },
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    Cart(#[from] CartError),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("collaborator failure: {0}")]
    Collaborator(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

/// The uniform `{error}` shape every collaborator failure is converted to at
/// the call site. Nothing propagates across a screen boundary uncaught, and
/// nothing is retried automatically; retries are user-initiated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorShape {
    pub error: String,
}

impl ErrorShape {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}

impl ApplicationError {
    /// Stable, user-safe message for the failure class. Validation failures
    /// block the action; collaborator failures are transient with a manual
    /// retry affordance.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Domain(_) => "The selection could not be processed. Check inputs and try again.",
            Self::Storage(_) => "Saved cart data could not be read or written.",
            Self::Collaborator(_) => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Configuration(_) => "An unexpected internal error occurred.",
        }
    }

    pub fn into_shape(self) -> ErrorShape {
        ErrorShape::new(self.user_message())
    }
}
