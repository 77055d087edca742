use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::platform::Platform;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

/// Lifecycle state of a placed order. The backend owns the transitions; the
/// client only renders states and, for staff tooling, submits a requested
/// next state that the backend validates and applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    Assigned,
    ReAssigned,
    InProgress,
    Delayed,
    Disputed,
    Complete,
}

impl OrderState {
    /// States staff tooling may request from the current one. This restricts
    /// the selectable target list client-side; the backend remains the
    /// authority on legality.
    pub fn legal_next_states(self) -> &'static [OrderState] {
        use OrderState::{Assigned, Complete, Delayed, Disputed, InProgress, ReAssigned};
        match self {
            Assigned => &[ReAssigned, InProgress],
            ReAssigned => &[InProgress],
            InProgress => &[Delayed, Disputed, Complete],
            Delayed => &[InProgress, Disputed, Complete],
            Disputed => &[Complete],
            Complete => &[],
        }
    }

    pub fn can_transition_to(self, next: OrderState) -> bool {
        self.legal_next_states().contains(&next)
    }

    pub fn request_transition(self, next: OrderState) -> Result<OrderState, DomainError> {
        if self.can_transition_to(next) {
            return Ok(next);
        }
        Err(DomainError::InvalidOrderTransition { from: self, to: next })
    }
}

/// Wire shape of a persisted order as the order collaborator returns it.
/// `order_data` is a list of independently JSON-encoded per-line metadata
/// strings (a flat-column backend workaround we stay read-compatible with);
/// the materializer rehydrates it into a structured summary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    #[serde(default)]
    pub order_data: Vec<String>,
    #[serde(default)]
    pub promo_data: Option<String>,
    #[serde(default)]
    pub platform: Option<Platform>,
    pub state: OrderState,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::OrderState;
    use crate::errors::DomainError;

    #[test]
    fn assigned_allows_reassignment_and_start() {
        assert!(OrderState::Assigned.can_transition_to(OrderState::ReAssigned));
        assert!(OrderState::Assigned.can_transition_to(OrderState::InProgress));
        assert!(!OrderState::Assigned.can_transition_to(OrderState::Complete));
    }

    #[test]
    fn complete_is_terminal() {
        assert!(OrderState::Complete.legal_next_states().is_empty());
    }

    #[test]
    fn illegal_request_is_rejected() {
        let error = OrderState::Disputed
            .request_transition(OrderState::Delayed)
            .expect_err("disputed cannot go back to delayed");
        assert!(matches!(
            error,
            DomainError::InvalidOrderTransition { from: OrderState::Disputed, to: OrderState::Delayed }
        ));
    }

    #[test]
    fn delayed_can_resume_or_escalate() {
        assert!(OrderState::Delayed.can_transition_to(OrderState::InProgress));
        assert!(OrderState::Delayed.can_transition_to(OrderState::Disputed));
        assert!(OrderState::Delayed.can_transition_to(OrderState::Complete));
        assert!(!OrderState::Delayed.can_transition_to(OrderState::ReAssigned));
    }

    #[test]
    fn states_serialize_snake_case() {
        let json = serde_json::to_string(&OrderState::ReAssigned).expect("serialize");
        assert_eq!(json, "\"re_assigned\"");
        let parsed: OrderState = serde_json::from_str("\"in_progress\"").expect("deserialize");
        assert_eq!(parsed, OrderState::InProgress);
    }
}
