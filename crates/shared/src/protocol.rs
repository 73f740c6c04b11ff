use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::{RequestId, SortField, SortOrder, DEFAULT_PAGE_SIZE};

/// Backend-side reference to a stored image. Its shape is owned by the backend;
/// the client only cares whether one exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(pub Value);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    #[serde(rename = "_id", alias = "id")]
    pub id: RequestId,
    pub name: String,
    pub phone: String,
    pub title: String,
    #[serde(
        default,
        deserialize_with = "deserialize_image_ref",
        skip_serializing_if = "Option::is_none"
    )]
    pub image: Option<ImageRef>,
    pub timestamp: DateTime<Utc>,
}

impl RequestRecord {
    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }
}

// null, false and "" all mean "no image".
fn deserialize_image_ref<'de, D>(deserializer: D) -> Result<Option<ImageRef>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .filter(|value| match value {
            Value::Null | Value::Bool(false) => false,
            Value::String(text) => !text.is_empty(),
            _ => true,
        })
        .map(ImageRef))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub items_per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            current_page: 1,
            total_pages: 1,
            total_items: 0,
            items_per_page: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    /// Clamps the metadata so that `total_pages >= 1` and
    /// `1 <= current_page <= total_pages`.
    pub fn normalized(self) -> Self {
        let total_pages = self.total_pages.max(1);
        Self {
            current_page: self.current_page.clamp(1, total_pages),
            total_pages,
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResponse {
    pub data: Vec<RequestRecord>,
    pub pagination: Pagination,
}

/// Query string of `GET /requests`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequestsQuery {
    pub search: String,
    pub page: u32,
    pub limit: u32,
    pub sort_by: SortField,
    pub order: SortOrder,
}

impl Default for ListRequestsQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            sort_by: SortField::Title,
            order: SortOrder::Asc,
        }
    }
}
