//! Drives the list, form and delete controllers against a [`RequestApi`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::domain::{RequestId, SortOrder};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{
    controller::{
        delete::DeleteFlow,
        events::DeskEvent,
        form::{FormDraft, FormState, FormSubmit, SubmitOutcome},
        list_state::{FetchTicket, ListAction, ListOutcome, ListState},
    },
    derived::{present_rows, DuplicateSummary, RequestRow},
    error::ClientError,
    RequestApi,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub list: ListState,
    pub form: FormState,
    pub delete: DeleteFlow,
}

impl ViewState {
    pub fn new(page_size: u32) -> Self {
        Self {
            list: ListState::new(page_size),
            form: FormState::default(),
            delete: DeleteFlow::Idle,
        }
    }

    /// Single coarse loading flag: a list fetch or a deletion is running.
    pub fn is_busy(&self) -> bool {
        self.list.is_loading() || self.delete.is_deleting()
    }
}

pub struct RequestDesk<A: RequestApi> {
    api: Arc<A>,
    view: Mutex<ViewState>,
    events: broadcast::Sender<DeskEvent>,
}

impl<A: RequestApi> RequestDesk<A> {
    pub fn new(api: Arc<A>, page_size: u32) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            api,
            view: Mutex::new(ViewState::new(page_size)),
            events,
        })
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DeskEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> ViewState {
        self.view.lock().await.clone()
    }

    pub async fn is_busy(&self) -> bool {
        self.view.lock().await.is_busy()
    }

    pub async fn duplicates(&self) -> DuplicateSummary {
        self.view.lock().await.list.duplicates().clone()
    }

    pub async fn rows(&self, now: DateTime<Utc>) -> Vec<RequestRow> {
        let guard = self.view.lock().await;
        present_rows(guard.list.records(), now, |id| self.api.image_url(id))
    }

    pub async fn refresh(&self) -> Result<ListOutcome, ClientError> {
        self.dispatch_list(ListAction::Refresh).await
    }

    pub async fn set_search(&self, search: impl Into<String>) -> Result<ListOutcome, ClientError> {
        self.dispatch_list(ListAction::SetSearch(search.into())).await
    }

    pub async fn clear_search(&self) -> Result<ListOutcome, ClientError> {
        self.dispatch_list(ListAction::ClearSearch).await
    }

    pub async fn toggle_sort(&self) -> Result<ListOutcome, ClientError> {
        self.dispatch_list(ListAction::ToggleSort).await
    }

    pub async fn set_order(&self, order: SortOrder) -> Result<ListOutcome, ClientError> {
        self.dispatch_list(ListAction::SetOrder(order)).await
    }

    pub async fn go_to_page(&self, page: u32) -> Result<ListOutcome, ClientError> {
        self.dispatch_list(ListAction::GoToPage(page)).await
    }

    /// Loads one page for an explicit query in a single fetch.
    pub async fn load(
        &self,
        search: impl Into<String>,
        order: SortOrder,
        page: u32,
    ) -> Result<ListOutcome, ClientError> {
        self.dispatch_list(ListAction::SetQuery {
            search: search.into(),
            order,
            page,
        })
        .await
    }

    async fn dispatch_list(&self, action: ListAction) -> Result<ListOutcome, ClientError> {
        let ticket = {
            let mut guard = self.view.lock().await;
            let transition = guard.list.apply(action);
            guard.list = transition.state;
            match transition.fetch {
                Some(ticket) => ticket,
                None => return Ok(transition.outcome),
            }
        };
        self.run_fetch(ticket).await
    }

    /// Runs `ticket` and any follow-up fetch the reducer asks for.
    async fn run_fetch(&self, mut ticket: FetchTicket) -> Result<ListOutcome, ClientError> {
        loop {
            let generation = ticket.generation;
            let result = self.api.list_requests(&ticket.query).await;

            let mut guard = self.view.lock().await;
            let page = match result {
                Ok(page) => page,
                Err(err) => {
                    let transition = guard.list.apply(ListAction::LoadFailed {
                        generation,
                        message: err.to_string(),
                    });
                    guard.list = transition.state;
                    if transition.outcome == ListOutcome::Stale {
                        self.note_stale(generation, guard.list.issued_generation());
                        return Ok(ListOutcome::Stale);
                    }
                    warn!(
                        generation,
                        error = %err,
                        "requests: list fetch failed; keeping previous page"
                    );
                    let _ = self.events.send(DeskEvent::ListFetchFailed(err.to_string()));
                    return Err(err);
                }
            };

            let transition = guard.list.apply(ListAction::PageLoaded { generation, page });
            guard.list = transition.state;
            match transition.outcome {
                ListOutcome::Applied => {
                    debug!(
                        generation,
                        rows = guard.list.records().len(),
                        total_items = guard.list.pagination().total_items,
                        "requests: page applied"
                    );
                    let _ = self.events.send(DeskEvent::ListUpdated {
                        pagination: guard.list.pagination(),
                        duplicates: guard.list.duplicates().clone(),
                    });
                }
                ListOutcome::Stale => self.note_stale(generation, guard.list.issued_generation()),
                _ => {}
            }

            match transition.fetch {
                Some(next) => {
                    debug!(
                        generation,
                        page = next.query.page,
                        "requests: requested page is gone; loading last page"
                    );
                    ticket = next;
                }
                None => return Ok(transition.outcome),
            }
        }
    }

    fn note_stale(&self, generation: u64, latest: u64) {
        debug!(generation, latest, "requests: discarded superseded list response");
        let _ = self.events.send(DeskEvent::StaleResponseDiscarded { generation });
    }

    pub async fn open_form(&self) {
        let mut guard = self.view.lock().await;
        guard.form = guard.form.open();
    }

    pub async fn close_form(&self) {
        let mut guard = self.view.lock().await;
        guard.form = guard.form.close();
    }

    pub async fn edit_draft(&self, edit: impl FnOnce(&mut FormDraft) + Send) {
        let mut guard = self.view.lock().await;
        guard.form = guard.form.edit(edit);
    }

    /// Validates and submits the draft; a created request refreshes the list
    /// at the current query.
    pub async fn submit_form(&self) -> SubmitOutcome {
        let submission = {
            let mut guard = self.view.lock().await;
            let (next, submit) = guard.form.submit();
            guard.form = next;
            match submit {
                FormSubmit::Ready(submission) => submission,
                FormSubmit::Invalid => return SubmitOutcome::Invalid,
                FormSubmit::InFlight => return SubmitOutcome::InFlight,
            }
        };

        let result = self.api.create_request(submission).await;
        let outcome = {
            let mut guard = self.view.lock().await;
            let (next, outcome) = guard.form.resolve(result);
            guard.form = next;
            outcome
        };

        match &outcome {
            SubmitOutcome::Created(record) => {
                let _ = self.events.send(DeskEvent::RequestCreated(record.clone()));
                if let Err(err) = self.refresh().await {
                    warn!(error = %err, "requests: refresh after create failed");
                }
            }
            SubmitOutcome::Rejected { message } => {
                info!(%message, "requests: backend rejected new request");
                let _ = self.events.send(DeskEvent::RequestRejected(message.clone()));
            }
            SubmitOutcome::Failed { message } => {
                warn!(%message, "requests: create request failed in transport");
            }
            SubmitOutcome::Invalid | SubmitOutcome::InFlight => {}
        }
        outcome
    }

    pub async fn request_delete(&self, id: RequestId) {
        let mut guard = self.view.lock().await;
        guard.delete = guard.delete.request(id);
    }

    pub async fn cancel_delete(&self) {
        let mut guard = self.view.lock().await;
        guard.delete = guard.delete.cancel();
    }

    /// Deletes the pending target, if any, then refreshes the list whether or
    /// not the delete succeeded. Returns the deleted id.
    pub async fn confirm_delete(&self) -> Result<Option<RequestId>, ClientError> {
        let target = {
            let mut guard = self.view.lock().await;
            let (next, target) = guard.delete.confirm();
            guard.delete = next;
            target
        };
        let Some(id) = target else {
            return Ok(None);
        };

        let result = self.api.delete_request(&id).await;
        match &result {
            Ok(()) => {
                let _ = self.events.send(DeskEvent::RequestDeleted(id.clone()));
            }
            Err(err) => {
                warn!(request_id = %id, error = %err, "requests: delete failed");
                let _ = self.events.send(DeskEvent::DeleteFailed {
                    id: id.clone(),
                    message: err.to_string(),
                });
            }
        }

        if let Err(err) = self.refresh().await {
            warn!(error = %err, "requests: refresh after delete failed");
        }

        {
            let mut guard = self.view.lock().await;
            guard.delete = guard.delete.finish();
        }

        result.map(|()| Some(id))
    }
}

#[cfg(test)]
#[path = "../tests/orchestration_tests.rs"]
mod tests;
