use crate::error::EngineError;
use crate::models::delivery::DeliveryStatus;
use crate::models::log::LogAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Assign,
    MarkInTransit,
    MarkArrived,
    Complete,
    Fail,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Assign => "assign",
            Action::MarkInTransit => "mark_in_transit",
            Action::MarkArrived => "mark_arrived",
            Action::Complete => "complete",
            Action::Fail => "fail",
        }
    }

    pub fn log_action(self) -> LogAction {
        match self {
            Action::Assign => LogAction::Assigned,
            Action::MarkInTransit => LogAction::InTransit,
            Action::MarkArrived => LogAction::ArrivedZone,
            Action::Complete => LogAction::Delivered,
            Action::Fail => LogAction::Failed,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single authority over the legal transition graph. Every mutating
/// operation consults this table before touching the store.
pub fn next_status(current: DeliveryStatus, action: Action) -> Result<DeliveryStatus, EngineError> {
    use DeliveryStatus::*;

    let next = match (current, action) {
        (Created, Action::Assign) => Assigned,
        (Assigned, Action::MarkInTransit) => InTransit,
        (InTransit, Action::MarkArrived) => ArrivedZone,
        (ArrivedZone, Action::Complete) => Delivered,
        (current, Action::Fail) if !current.is_terminal() => Failed,
        (current, action) => return Err(EngineError::InvalidTransition { current, action }),
    };

    Ok(next)
}
