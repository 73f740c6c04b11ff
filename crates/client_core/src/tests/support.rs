//! In-memory stand-in for the request backend, shared by the HTTP and
//! controller tests.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use shared::{
    domain::{RequestId, SortOrder},
    error::PHONE_EXISTS_MESSAGE,
    protocol::{ImageRef, ListRequestsQuery, PageResponse, Pagination, RequestRecord},
};

#[derive(Default)]
pub struct MemoryBackend {
    records: Mutex<Vec<RequestRecord>>,
}

impl MemoryBackend {
    pub fn seeded(rows: &[(&str, &str, &str)]) -> Self {
        let backend = Self::default();
        for (name, phone, title) in rows {
            backend
                .insert(name, phone, title, false, Utc::now())
                .expect("seed row");
        }
        backend
    }

    pub fn insert(
        &self,
        name: &str,
        phone: &str,
        title: &str,
        has_image: bool,
        timestamp: DateTime<Utc>,
    ) -> Result<RequestRecord, String> {
        let mut records = self.records.lock().expect("backend lock");
        if records.iter().any(|record| record.phone == phone) {
            return Err(PHONE_EXISTS_MESSAGE.to_string());
        }
        let record = RequestRecord {
            id: RequestId::new(uuid::Uuid::new_v4().simple().to_string()),
            name: name.to_string(),
            phone: phone.to_string(),
            title: title.to_string(),
            image: has_image.then(|| ImageRef(serde_json::json!({ "contentType": "image/png" }))),
            timestamp,
        };
        records.push(record.clone());
        Ok(record)
    }

    pub fn remove(&self, id: &RequestId) -> bool {
        let mut records = self.records.lock().expect("backend lock");
        let before = records.len();
        records.retain(|record| &record.id != id);
        records.len() != before
    }

    pub fn ids(&self) -> Vec<RequestId> {
        self.records
            .lock()
            .expect("backend lock")
            .iter()
            .map(|record| record.id.clone())
            .collect()
    }

    pub fn find_by_title(&self, title: &str) -> Option<RequestRecord> {
        self.records
            .lock()
            .expect("backend lock")
            .iter()
            .find(|record| record.title == title)
            .cloned()
    }

    pub fn list(&self, query: &ListRequestsQuery) -> PageResponse {
        let needle = query.search.to_lowercase();
        let mut matching: Vec<RequestRecord> = self
            .records
            .lock()
            .expect("backend lock")
            .iter()
            .filter(|record| record.title.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.title.cmp(&b.title));
        if query.order == SortOrder::Desc {
            matching.reverse();
        }

        let limit = query.limit.max(1) as usize;
        let total_items = matching.len();
        let total_pages = total_items.div_ceil(limit).max(1);
        let current_page = (query.page.max(1) as usize).min(total_pages);
        let data = matching
            .into_iter()
            .skip((current_page - 1) * limit)
            .take(limit)
            .collect();

        PageResponse {
            data,
            pagination: Pagination {
                current_page: current_page as u32,
                total_pages: total_pages as u32,
                total_items: total_items as u64,
                items_per_page: limit as u32,
            },
        }
    }
}
