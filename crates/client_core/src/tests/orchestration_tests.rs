use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use shared::{
    error::PHONE_EXISTS_MESSAGE,
    protocol::{ListRequestsQuery, PageResponse, RequestRecord},
};

use super::*;
use crate::{
    controller::form::{NAME_REQUIRED, SERVER_ERROR},
    test_support::MemoryBackend,
    RequestSubmission,
};

struct FakeApi {
    backend: MemoryBackend,
    list_delays: HashMap<String, Duration>,
    delete_delay: Option<Duration>,
    fail_lists: AtomicBool,
    echo_missing_page: AtomicBool,
    garble_creates: AtomicBool,
    list_calls: AtomicUsize,
    create_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl FakeApi {
    fn new(backend: MemoryBackend) -> Self {
        Self {
            backend,
            list_delays: HashMap::new(),
            delete_delay: None,
            fail_lists: AtomicBool::new(false),
            echo_missing_page: AtomicBool::new(false),
            garble_creates: AtomicBool::new(false),
            list_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    fn with_list_delay(mut self, search: &str, delay: Duration) -> Self {
        self.list_delays.insert(search.to_string(), delay);
        self
    }

    fn with_delete_delay(mut self, delay: Duration) -> Self {
        self.delete_delay = Some(delay);
        self
    }
}

#[async_trait]
impl RequestApi for FakeApi {
    async fn list_requests(&self, query: &ListRequestsQuery) -> Result<PageResponse, ClientError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.list_delays.get(&query.search) {
            tokio::time::sleep(*delay).await;
        }
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(ClientError::Backend {
                status: 503,
                message: "database offline".to_string(),
            });
        }
        let mut page = self.backend.list(query);
        // Some backends echo the requested page even when it no longer exists.
        if self.echo_missing_page.load(Ordering::SeqCst)
            && query.page > page.pagination.total_pages
        {
            page.data.clear();
            page.pagination.current_page = query.page;
        }
        Ok(page)
    }

    async fn create_request(
        &self,
        submission: RequestSubmission,
    ) -> Result<Option<RequestRecord>, ClientError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.garble_creates.load(Ordering::SeqCst) {
            return Err(ClientError::Decode(
                serde_json::from_str::<RequestRecord>("<html>").expect_err("not json"),
            ));
        }
        self.backend
            .insert(
                &submission.name,
                &submission.phone,
                &submission.title,
                submission.image.is_some(),
                Utc::now(),
            )
            .map(Some)
            .map_err(|message| ClientError::Backend {
                status: 400,
                message,
            })
    }

    async fn delete_request(&self, id: &RequestId) -> Result<(), ClientError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delete_delay {
            tokio::time::sleep(delay).await;
        }
        if self.backend.remove(id) {
            Ok(())
        } else {
            Err(ClientError::Backend {
                status: 404,
                message: "Request not found".to_string(),
            })
        }
    }

    async fn fetch_image(&self, _id: &RequestId) -> Result<Vec<u8>, ClientError> {
        Ok(Vec::new())
    }

    fn image_url(&self, id: &RequestId) -> String {
        format!("memory://request/image/{id}")
    }
}

fn desk_with(api: FakeApi) -> Arc<RequestDesk<FakeApi>> {
    RequestDesk::new(Arc::new(api), 5)
}

fn seeded_desk() -> Arc<RequestDesk<FakeApi>> {
    desk_with(FakeApi::new(MemoryBackend::seeded(&[
        ("Ada", "1111111111", "Laptop"),
        ("Grace", "2222222222", "Monitor"),
        ("Linus", "3333333333", "Laptop"),
    ])))
}

#[tokio::test]
async fn refresh_loads_page_and_duplicate_summary() {
    let desk = seeded_desk();
    let mut events = desk.subscribe();

    let outcome = desk.refresh().await.expect("refresh");
    assert_eq!(outcome, ListOutcome::Applied);

    let view = desk.snapshot().await;
    assert_eq!(view.list.records().len(), 3);
    assert_eq!(view.list.pagination().total_items, 3);
    assert_eq!(
        desk.duplicates().await,
        DuplicateSummary::from([("Laptop".to_string(), 2)])
    );
    assert!(!desk.is_busy().await);

    match events.recv().await.expect("event") {
        DeskEvent::ListUpdated { duplicates, .. } => {
            assert_eq!(duplicates.get("Laptop"), Some(&2));
        }
        other => panic!("unexpected event {other:?}"),
    }

    let rows = desk.rows(Utc::now()).await;
    assert!(rows.iter().all(|row| row.recent));
    assert!(rows.iter().all(|row| row.image_url.is_none()));
}

#[tokio::test]
async fn slower_superseded_search_does_not_overwrite_newer_results() {
    let api = FakeApi::new(MemoryBackend::seeded(&[
        ("Ada", "1111111111", "old lamp"),
        ("Grace", "2222222222", "new desk"),
    ]))
    .with_list_delay("old", Duration::from_millis(200));
    let desk = desk_with(api);

    let slow = {
        let desk = Arc::clone(&desk);
        tokio::spawn(async move { desk.set_search("old").await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(desk.is_busy().await);

    let fast = desk.set_search("new").await.expect("new search");
    assert_eq!(fast, ListOutcome::Applied);

    let late = slow.await.expect("join").expect("old search");
    assert_eq!(late, ListOutcome::Stale);

    let view = desk.snapshot().await;
    assert_eq!(view.list.query().search, "new");
    let titles: Vec<_> = view
        .list
        .records()
        .iter()
        .map(|record| record.title.as_str())
        .collect();
    assert_eq!(titles, vec!["new desk"]);
    assert!(!view.is_busy());
}

#[tokio::test]
async fn failed_fetch_is_reported_and_keeps_previous_page() {
    let desk = seeded_desk();
    desk.refresh().await.expect("initial load");
    let before = desk.snapshot().await;

    desk.api().fail_lists.store(true, Ordering::SeqCst);
    let mut events = desk.subscribe();
    let err = desk.toggle_sort().await.expect_err("fetch should fail");
    assert_eq!(err.backend_message(), Some("database offline"));

    let after = desk.snapshot().await;
    assert_eq!(after.list.records(), before.list.records());
    assert_eq!(after.list.query().order, SortOrder::Asc);
    assert!(after.list.last_error().is_some());
    assert!(!after.is_busy());
    assert!(matches!(
        events.recv().await.expect("event"),
        DeskEvent::ListFetchFailed(_)
    ));
}

#[tokio::test]
async fn invalid_form_never_reaches_backend() {
    let desk = seeded_desk();
    desk.open_form().await;
    desk.edit_draft(|draft| {
        draft.phone = "0123456789".to_string();
        draft.title = "Chair".to_string();
    })
    .await;

    assert_eq!(desk.submit_form().await, SubmitOutcome::Invalid);
    assert_eq!(desk.api().create_calls.load(Ordering::SeqCst), 0);
    let view = desk.snapshot().await;
    assert_eq!(view.form.errors().name.as_deref(), Some(NAME_REQUIRED));
    assert!(view.form.is_open());
}

#[tokio::test]
async fn created_request_closes_form_and_refreshes_list() {
    let desk = seeded_desk();
    desk.refresh().await.expect("initial load");
    let lists_before = desk.api().list_calls.load(Ordering::SeqCst);

    desk.open_form().await;
    desk.edit_draft(|draft| {
        draft.name = "Barbara".to_string();
        draft.phone = "4444444444".to_string();
        draft.title = "Chair".to_string();
    })
    .await;

    let outcome = desk.submit_form().await;
    assert!(matches!(outcome, SubmitOutcome::Created(Some(_))));
    assert_eq!(
        desk.api().list_calls.load(Ordering::SeqCst),
        lists_before + 1
    );

    let view = desk.snapshot().await;
    assert!(!view.form.is_open());
    assert_eq!(view.form.draft(), &FormDraft::default());
    assert_eq!(view.list.pagination().total_items, 4);
    assert!(view
        .list
        .records()
        .iter()
        .any(|record| record.title == "Chair"));
}

#[tokio::test]
async fn duplicate_phone_lands_on_phone_field_with_draft_intact() {
    let desk = seeded_desk();
    desk.refresh().await.expect("initial load");
    let lists_before = desk.api().list_calls.load(Ordering::SeqCst);

    desk.open_form().await;
    desk.edit_draft(|draft| {
        draft.name = "Impostor".to_string();
        draft.phone = "1111111111".to_string();
        draft.title = "Tablet".to_string();
    })
    .await;

    let outcome = desk.submit_form().await;
    assert_eq!(
        outcome,
        SubmitOutcome::Rejected {
            message: PHONE_EXISTS_MESSAGE.to_string()
        }
    );

    let view = desk.snapshot().await;
    assert!(view.form.is_open());
    assert_eq!(view.form.errors().phone.as_deref(), Some(PHONE_EXISTS_MESSAGE));
    assert!(view.form.banner().is_none());
    assert_eq!(view.form.draft().name, "Impostor");
    assert_eq!(view.form.draft().title, "Tablet");
    assert_eq!(desk.api().list_calls.load(Ordering::SeqCst), lists_before);
}

#[tokio::test]
async fn unreadable_create_response_shows_server_error() {
    let desk = seeded_desk();
    desk.api().garble_creates.store(true, Ordering::SeqCst);
    desk.open_form().await;
    desk.edit_draft(|draft| {
        draft.name = "Barbara".to_string();
        draft.phone = "4444444444".to_string();
        draft.title = "Chair".to_string();
    })
    .await;

    assert!(matches!(
        desk.submit_form().await,
        SubmitOutcome::Failed { .. }
    ));
    let view = desk.snapshot().await;
    assert_eq!(view.form.banner(), Some(SERVER_ERROR));
    assert_eq!(view.form.draft().phone, "4444444444");
    assert!(!view.form.is_submitting());
}

#[tokio::test]
async fn confirmed_delete_removes_request_from_next_fetch() {
    let desk = seeded_desk();
    desk.refresh().await.expect("initial load");
    let target = desk.snapshot().await.list.records()[0].id.clone();

    desk.request_delete(target.clone()).await;
    assert_eq!(
        desk.snapshot().await.delete.pending_target(),
        Some(&target)
    );

    let deleted = desk.confirm_delete().await.expect("delete");
    assert_eq!(deleted, Some(target.clone()));

    let view = desk.snapshot().await;
    assert_eq!(view.delete, DeleteFlow::Idle);
    assert!(view.list.records().iter().all(|record| record.id != target));
    assert_eq!(view.list.pagination().total_items, 2);
}

#[tokio::test]
async fn failed_delete_still_refreshes_list() {
    let desk = seeded_desk();
    desk.refresh().await.expect("initial load");
    let lists_before = desk.api().list_calls.load(Ordering::SeqCst);

    desk.request_delete(RequestId::from("missing")).await;
    let err = desk.confirm_delete().await.expect_err("unknown id");
    assert_eq!(err.backend_message(), Some("Request not found"));
    assert_eq!(
        desk.api().list_calls.load(Ordering::SeqCst),
        lists_before + 1
    );
    assert_eq!(desk.snapshot().await.delete, DeleteFlow::Idle);
}

#[tokio::test]
async fn cancelled_delete_makes_no_call() {
    let desk = seeded_desk();
    desk.request_delete(RequestId::from("anything")).await;
    desk.cancel_delete().await;

    assert_eq!(desk.confirm_delete().await.expect("no-op"), None);
    assert_eq!(desk.api().delete_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn page_navigation_follows_backend_pagination() {
    let rows: Vec<(String, String, String)> = (0..12)
        .map(|index| {
            (
                format!("user-{index}"),
                format!("55500000{index:02}"),
                format!("title-{index:02}"),
            )
        })
        .collect();
    let borrowed: Vec<(&str, &str, &str)> = rows
        .iter()
        .map(|(name, phone, title)| (name.as_str(), phone.as_str(), title.as_str()))
        .collect();
    let desk = desk_with(FakeApi::new(MemoryBackend::seeded(&borrowed)));

    desk.refresh().await.expect("initial load");
    assert_eq!(desk.snapshot().await.list.pagination().total_pages, 3);

    desk.go_to_page(3).await.expect("page 3");
    let view = desk.snapshot().await;
    assert_eq!(view.list.pagination().current_page, 3);
    assert_eq!(view.list.records().len(), 2);
    assert_eq!(view.list.records()[0].title, "title-10");

    assert_eq!(
        desk.go_to_page(7).await.expect("clamped"),
        ListOutcome::Unchanged
    );
}

#[tokio::test]
async fn busy_flag_covers_delete_and_its_refresh() {
    let api = FakeApi::new(MemoryBackend::seeded(&[
        ("Ada", "1111111111", "Laptop"),
        ("Grace", "2222222222", "Monitor"),
    ]))
    .with_delete_delay(Duration::from_millis(100))
    .with_list_delay("", Duration::from_millis(150));
    let desk = desk_with(api);
    desk.refresh().await.expect("initial load");
    assert!(!desk.is_busy().await);
    let lists_before = desk.api().list_calls.load(Ordering::SeqCst);

    let target = desk.snapshot().await.list.records()[0].id.clone();
    desk.request_delete(target.clone()).await;
    assert!(!desk.is_busy().await);

    let running = {
        let desk = Arc::clone(&desk);
        tokio::spawn(async move { desk.confirm_delete().await })
    };

    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(desk.is_busy().await);
    assert!(desk.snapshot().await.delete.is_deleting());
    assert_eq!(desk.api().delete_calls.load(Ordering::SeqCst), 1);
    assert_eq!(desk.api().list_calls.load(Ordering::SeqCst), lists_before);

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(desk.api().list_calls.load(Ordering::SeqCst), lists_before + 1);
    assert!(desk.is_busy().await);
    assert!(desk.snapshot().await.delete.is_deleting());

    let deleted = running.await.expect("join").expect("delete");
    assert_eq!(deleted, Some(target));
    assert!(!desk.is_busy().await);
    assert_eq!(desk.snapshot().await.delete, DeleteFlow::Idle);
}

#[tokio::test]
async fn deleting_only_row_of_last_page_loads_new_last_page() {
    let rows: Vec<(String, String, String)> = (0..11)
        .map(|index| {
            (
                format!("user-{index}"),
                format!("55500000{index:02}"),
                format!("title-{index:02}"),
            )
        })
        .collect();
    let borrowed: Vec<(&str, &str, &str)> = rows
        .iter()
        .map(|(name, phone, title)| (name.as_str(), phone.as_str(), title.as_str()))
        .collect();
    let desk = desk_with(FakeApi::new(MemoryBackend::seeded(&borrowed)));
    desk.api().echo_missing_page.store(true, Ordering::SeqCst);

    desk.refresh().await.expect("initial load");
    desk.go_to_page(3).await.expect("page 3");
    let view = desk.snapshot().await;
    assert_eq!(view.list.records().len(), 1);
    let target = view.list.records()[0].id.clone();
    let lists_before = desk.api().list_calls.load(Ordering::SeqCst);

    desk.request_delete(target).await;
    desk.confirm_delete().await.expect("delete");

    assert_eq!(desk.api().list_calls.load(Ordering::SeqCst), lists_before + 2);
    let view = desk.snapshot().await;
    assert_eq!(view.list.query().page, 2);
    assert_eq!(view.list.pagination().current_page, 2);
    assert_eq!(view.list.pagination().total_pages, 2);
    let titles: Vec<_> = view
        .list
        .records()
        .iter()
        .map(|record| record.title.as_str())
        .collect();
    assert_eq!(
        titles,
        vec!["title-05", "title-06", "title-07", "title-08", "title-09"]
    );
    assert!(!view.is_busy());
}

#[tokio::test]
async fn search_retried_after_failure_reaches_backend_again() {
    let desk = seeded_desk();
    desk.refresh().await.expect("initial load");

    desk.api().fail_lists.store(true, Ordering::SeqCst);
    desk.set_search("Monitor").await.expect_err("offline");
    assert_eq!(desk.snapshot().await.list.query().search, "");

    desk.api().fail_lists.store(false, Ordering::SeqCst);
    let retry = desk.set_search("Monitor").await.expect("retry");
    assert_eq!(retry, ListOutcome::Applied);

    let view = desk.snapshot().await;
    assert_eq!(view.list.query().search, "Monitor");
    assert_eq!(view.list.records().len(), 1);
    assert!(view.list.last_error().is_none());
}
