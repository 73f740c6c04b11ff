use serde::{Deserialize, Serialize};
use shared::domain::RequestId;

/// Confirm-then-act deletion: `Idle -> PendingConfirmation -> Deleting -> Idle`,
/// or back to `Idle` on cancel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "target", rename_all = "snake_case")]
pub enum DeleteFlow {
    #[default]
    Idle,
    PendingConfirmation(RequestId),
    Deleting(RequestId),
}

impl DeleteFlow {
    /// Asking again while a confirmation is pending retargets it; a running
    /// deletion is left alone.
    pub fn request(&self, id: RequestId) -> Self {
        match self {
            Self::Deleting(_) => self.clone(),
            Self::Idle | Self::PendingConfirmation(_) => Self::PendingConfirmation(id),
        }
    }

    pub fn cancel(&self) -> Self {
        match self {
            Self::PendingConfirmation(_) => Self::Idle,
            _ => self.clone(),
        }
    }

    pub fn confirm(&self) -> (Self, Option<RequestId>) {
        match self {
            Self::PendingConfirmation(id) => (Self::Deleting(id.clone()), Some(id.clone())),
            _ => (self.clone(), None),
        }
    }

    pub fn finish(&self) -> Self {
        match self {
            Self::Deleting(_) => Self::Idle,
            _ => self.clone(),
        }
    }

    pub fn pending_target(&self) -> Option<&RequestId> {
        match self {
            Self::PendingConfirmation(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_deleting(&self) -> bool {
        matches!(self, Self::Deleting(_))
    }
}

#[cfg(test)]
#[path = "../tests/delete_tests.rs"]
mod tests;
