//! Events broadcast by [`crate::RequestDesk`] and user-facing failure wording.

use shared::{
    domain::RequestId,
    protocol::{Pagination, RequestRecord},
};

use crate::{derived::DuplicateSummary, error::ClientError};

#[derive(Debug, Clone)]
pub enum DeskEvent {
    ListUpdated {
        pagination: Pagination,
        duplicates: DuplicateSummary,
    },
    ListFetchFailed(String),
    StaleResponseDiscarded {
        generation: u64,
    },
    RequestCreated(Option<RequestRecord>),
    RequestRejected(String),
    RequestDeleted(RequestId),
    DeleteFailed {
        id: RequestId,
        message: String,
    },
}

pub fn classify_fetch_failure(err: &ClientError) -> String {
    match err {
        ClientError::Decode(_) => {
            "Server sent an unexpected response; the list was not updated.".to_string()
        }
        err if err.is_transport() => "Server unreachable; check the API URL and retry.".to_string(),
        err => format!("Could not load requests: {err}"),
    }
}
