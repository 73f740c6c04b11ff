//! Reducer for the request list: query parameters, the loaded page and the
//! generation tokens that keep late responses from overwriting newer ones.

use serde::{Deserialize, Serialize};
use shared::{
    domain::{SortField, SortOrder, DEFAULT_PAGE_SIZE},
    protocol::{ListRequestsQuery, PageResponse, Pagination, RequestRecord},
};

use crate::derived::{duplicate_titles, DuplicateSummary};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    pub search: String,
    pub order: SortOrder,
    pub page: u32,
    pub page_size: u32,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            order: SortOrder::Asc,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ListQuery {
    pub fn to_wire(&self) -> ListRequestsQuery {
        ListRequestsQuery {
            search: self.search.clone(),
            page: self.page,
            limit: self.page_size,
            sort_by: SortField::Title,
            order: self.order,
        }
    }
}

/// A fetch the caller must perform; its response is only accepted while
/// `generation` is still the latest one issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    pub query: ListRequestsQuery,
}

#[derive(Debug, Clone)]
pub enum ListAction {
    SetSearch(String),
    ClearSearch,
    ToggleSort,
    SetOrder(SortOrder),
    GoToPage(u32),
    /// Replaces search, order and page at once (page size is kept).
    SetQuery {
        search: String,
        order: SortOrder,
        page: u32,
    },
    Refresh,
    PageLoaded {
        generation: u64,
        page: PageResponse,
    },
    LoadFailed {
        generation: u64,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOutcome {
    Unchanged,
    FetchIssued,
    Applied,
    Failed,
    Stale,
}

#[derive(Debug, Clone)]
pub struct ListTransition {
    pub state: ListState,
    pub fetch: Option<FetchTicket>,
    pub outcome: ListOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListState {
    query: ListQuery,
    /// Query whose response is currently held in `records`.
    applied_query: ListQuery,
    records: Vec<RequestRecord>,
    pagination: Pagination,
    duplicates: DuplicateSummary,
    loading: bool,
    last_error: Option<String>,
    issued_generation: u64,
    applied_generation: u64,
}

impl Default for ListState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl ListState {
    pub fn new(page_size: u32) -> Self {
        let page_size = page_size.max(1);
        let query = ListQuery {
            page_size,
            ..ListQuery::default()
        };
        Self {
            applied_query: query.clone(),
            query,
            records: Vec::new(),
            pagination: Pagination {
                items_per_page: page_size,
                ..Pagination::default()
            },
            duplicates: DuplicateSummary::new(),
            loading: false,
            last_error: None,
            issued_generation: 0,
            applied_generation: 0,
        }
    }

    pub fn query(&self) -> &ListQuery {
        &self.query
    }

    pub fn applied_query(&self) -> &ListQuery {
        &self.applied_query
    }

    pub fn records(&self) -> &[RequestRecord] {
        &self.records
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn duplicates(&self) -> &DuplicateSummary {
        &self.duplicates
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn issued_generation(&self) -> u64 {
        self.issued_generation
    }

    pub fn applied_generation(&self) -> u64 {
        self.applied_generation
    }

    pub fn apply(&self, action: ListAction) -> ListTransition {
        match action {
            ListAction::SetSearch(search) => {
                if search == self.query.search {
                    return self.unchanged();
                }
                let mut next = self.clone();
                next.query.search = search;
                next.query.page = 1;
                next.issue()
            }
            ListAction::ClearSearch => self.apply(ListAction::SetSearch(String::new())),
            ListAction::ToggleSort => self.apply(ListAction::SetOrder(self.query.order.toggled())),
            ListAction::SetOrder(order) => {
                if order == self.query.order {
                    return self.unchanged();
                }
                let mut next = self.clone();
                next.query.order = order;
                next.issue()
            }
            ListAction::GoToPage(page) => {
                let page = page.clamp(1, self.pagination.total_pages.max(1));
                if page == self.query.page {
                    return self.unchanged();
                }
                let mut next = self.clone();
                next.query.page = page;
                next.issue()
            }
            ListAction::SetQuery {
                search,
                order,
                page,
            } => {
                let mut next = self.clone();
                next.query.search = search;
                next.query.order = order;
                next.query.page = page.max(1);
                next.issue()
            }
            ListAction::Refresh => self.clone().issue(),
            ListAction::PageLoaded { generation, page } => {
                if generation != self.issued_generation {
                    return self.stale();
                }
                let pagination = page.pagination.normalized();
                // The requested page no longer exists; ask for the last one.
                if page.pagination.current_page != pagination.current_page
                    && self.query.page > pagination.total_pages
                {
                    let mut next = self.clone();
                    next.query.page = pagination.total_pages;
                    return next.issue();
                }
                let mut next = self.clone();
                next.duplicates = duplicate_titles(&page.data);
                next.records = page.data;
                next.pagination = pagination;
                next.query.page = pagination.current_page;
                next.applied_query = next.query.clone();
                next.loading = false;
                next.last_error = None;
                next.applied_generation = generation;
                ListTransition {
                    state: next,
                    fetch: None,
                    outcome: ListOutcome::Applied,
                }
            }
            ListAction::LoadFailed {
                generation,
                message,
            } => {
                if generation != self.issued_generation {
                    return self.stale();
                }
                let mut next = self.clone();
                next.query = self.applied_query.clone();
                next.loading = false;
                next.last_error = Some(message);
                ListTransition {
                    state: next,
                    fetch: None,
                    outcome: ListOutcome::Failed,
                }
            }
        }
    }

    fn issue(mut self) -> ListTransition {
        self.issued_generation += 1;
        self.loading = true;
        let fetch = FetchTicket {
            generation: self.issued_generation,
            query: self.query.to_wire(),
        };
        ListTransition {
            state: self,
            fetch: Some(fetch),
            outcome: ListOutcome::FetchIssued,
        }
    }

    fn unchanged(&self) -> ListTransition {
        ListTransition {
            state: self.clone(),
            fetch: None,
            outcome: ListOutcome::Unchanged,
        }
    }

    fn stale(&self) -> ListTransition {
        ListTransition {
            state: self.clone(),
            fetch: None,
            outcome: ListOutcome::Stale,
        }
    }
}

#[cfg(test)]
#[path = "../tests/list_state_tests.rs"]
mod tests;
