//! Per-operation results in wire shape
//!
//! Accessors return the values of the response fields: an empty string
//! stands for "unset", as on the wire.

use crate::qos::Decision;
use crate::registry::RoomId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Valid { user_id: String },
    Invalid { reason: String },
}

impl AuthOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, AuthOutcome::Valid { .. })
    }

    pub fn user_id(&self) -> &str {
        match self {
            AuthOutcome::Valid { user_id } => user_id,
            AuthOutcome::Invalid { .. } => "",
        }
    }

    pub fn error(&self) -> &str {
        match self {
            AuthOutcome::Valid { .. } => "",
            AuthOutcome::Invalid { reason } => reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateRoomOutcome {
    Created { room_id: RoomId },
    Failed { reason: String },
}

impl CreateRoomOutcome {
    pub fn room_id(&self) -> &str {
        match self {
            CreateRoomOutcome::Created { room_id } => room_id.as_str(),
            CreateRoomOutcome::Failed { .. } => "",
        }
    }

    pub fn error(&self) -> &str {
        match self {
            CreateRoomOutcome::Created { .. } => "",
            CreateRoomOutcome::Failed { reason } => reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QosOutcome {
    /// The policy ran
    Decided(Decision),
    /// The request was refused before the policy ran
    Invalid { reason: String },
}

impl QosOutcome {
    pub fn accepted(&self) -> bool {
        matches!(self, QosOutcome::Decided(decision) if decision.accepted)
    }

    pub fn error(&self) -> &str {
        match self {
            QosOutcome::Decided(decision) => decision.reason.as_deref().unwrap_or(""),
            QosOutcome::Invalid { reason } => reason,
        }
    }
}
