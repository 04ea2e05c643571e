// State machine for the delivery lifecycle of scheduled communications
//
// Status rows in courier_statuses form a closed vocabulary; this module owns
// which status-to-status moves are legal. All writes that change a schedule's
// status go through `next_state` / `event_for_target`.

pub mod events;
pub mod states;

pub use events::DeliveryEvent;
pub use states::DeliveryState;

use thiserror::Error;

/// Errors raised when a requested transition is not legal
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateMachineError {
    #[error("Invalid transition from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },
}

impl DeliveryEvent {
    /// The state this event drives toward, independent of the current state
    pub fn target_state(&self) -> DeliveryState {
        match self {
            Self::MarkSent => DeliveryState::Sent,
            Self::Fail(_) => DeliveryState::Failed,
            Self::Cancel => DeliveryState::Canceled,
        }
    }
}

/// Determine the target state for an event applied to the current state
pub fn next_state(
    current: DeliveryState,
    event: &DeliveryEvent,
) -> Result<DeliveryState, StateMachineError> {
    let target = match (current, event) {
        // Dispatch outcomes
        (DeliveryState::Scheduled, DeliveryEvent::MarkSent) => DeliveryState::Sent,
        (DeliveryState::Scheduled, DeliveryEvent::Fail(_)) => DeliveryState::Failed,

        // Cancel transitions; re-canceling is an idempotent no-op
        (DeliveryState::Scheduled, DeliveryEvent::Cancel) => DeliveryState::Canceled,
        (DeliveryState::Canceled, DeliveryEvent::Cancel) => DeliveryState::Canceled,

        // Everything else is rejected
        (from, event) => {
            return Err(StateMachineError::InvalidTransition {
                from: from.to_string(),
                to: event.target_state().to_string(),
            })
        }
    };

    Ok(target)
}

/// Map a requested target status onto a transition event.
///
/// Used by name-driven status updates. Writing the status a schedule already
/// has is tolerated as a no-op (`Ok(None)`); anything else must be a legal
/// transition in `next_state`.
pub fn event_for_target(
    current: DeliveryState,
    target: DeliveryState,
) -> Result<Option<DeliveryEvent>, StateMachineError> {
    if current == target {
        return Ok(None);
    }

    let event = match target {
        DeliveryState::Sent => DeliveryEvent::MarkSent,
        DeliveryState::Failed => DeliveryEvent::fail_with_error("marked failed by status update"),
        DeliveryState::Canceled => DeliveryEvent::Cancel,
        // Nothing moves back to scheduled
        DeliveryState::Scheduled => {
            return Err(StateMachineError::InvalidTransition {
                from: current.to_string(),
                to: target.to_string(),
            })
        }
    };

    next_state(current, &event)?;
    Ok(Some(event))
}
