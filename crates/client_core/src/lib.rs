use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, Response,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use shared::{
    domain::RequestId,
    error::{ApiError, GENERIC_BACKEND_ERROR},
    protocol::{ListRequestsQuery, PageResponse, RequestRecord},
};
use tracing::{debug, info};
use url::Url;

pub mod controller;
pub mod derived;
pub mod error;

pub use controller::{
    delete::DeleteFlow,
    events::DeskEvent,
    form::{FieldErrors, FormDraft, FormState, SubmitOutcome},
    list_state::{FetchTicket, ListAction, ListOutcome, ListQuery, ListState},
    orchestration::{RequestDesk, ViewState},
};
pub use derived::{duplicate_titles, is_recent, DuplicateSummary, RequestRow};
pub use error::ClientError;

pub const DEFAULT_API_URL: &str = "http://localhost:4000/api";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Image file attached to a create-request submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUpload {
    pub filename: String,
    pub mime_type: Option<String>,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

/// Validated input for `POST /request`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSubmission {
    pub name: String,
    pub phone: String,
    pub title: String,
    pub image: Option<ImageUpload>,
}

impl RequestSubmission {
    fn into_multipart(self) -> Result<Form, ClientError> {
        let form = Form::new()
            .text("name", self.name)
            .text("phone", self.phone)
            .text("title", self.title);

        let Some(image) = self.image else {
            return Ok(form);
        };

        let mut part = Part::bytes(image.bytes).file_name(image.filename);
        if let Some(mime_type) = image.mime_type.as_deref() {
            part = part.mime_str(mime_type)?;
        }
        Ok(form.part("image", part))
    }
}

#[async_trait]
pub trait RequestApi: Send + Sync {
    async fn list_requests(&self, query: &ListRequestsQuery) -> Result<PageResponse, ClientError>;
    /// Returns the created record when the backend echoes one back.
    async fn create_request(
        &self,
        submission: RequestSubmission,
    ) -> Result<Option<RequestRecord>, ClientError>;
    async fn delete_request(&self, id: &RequestId) -> Result<(), ClientError>;
    async fn fetch_image(&self, id: &RequestId) -> Result<Vec<u8>, ClientError>;
    fn image_url(&self, id: &RequestId) -> String;
}

/// Trims whitespace and trailing slashes from a configured base URL.
pub fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

pub struct HttpRequestApi {
    http: Client,
    base_url: Url,
}

impl HttpRequestApi {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Self::with_client(http, base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self, ClientError> {
        let normalized = normalize_base_url(base_url);
        let base_url = Url::parse(&normalized).map_err(|err| ClientError::InvalidUrl {
            url: normalized.clone(),
            reason: err.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl {
                url: normalized,
                reason: "url cannot carry a path".to_string(),
            });
        }
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

async fn read_success_body(response: Response) -> Result<Vec<u8>, ClientError> {
    let status = response.status();
    let body = response.bytes().await?;
    if status.is_success() {
        return Ok(body.to_vec());
    }

    let message = serde_json::from_slice::<ApiError>(&body)
        .map(|err| err.message().to_string())
        .unwrap_or_else(|_| GENERIC_BACKEND_ERROR.to_string());
    Err(ClientError::Backend {
        status: status.as_u16(),
        message,
    })
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let body = read_success_body(response).await?;
    Ok(serde_json::from_slice(&body)?)
}

#[async_trait]
impl RequestApi for HttpRequestApi {
    async fn list_requests(&self, query: &ListRequestsQuery) -> Result<PageResponse, ClientError> {
        debug!(
            search = %query.search,
            page = query.page,
            limit = query.limit,
            order = %query.order,
            "requests: fetching page"
        );
        let response = self
            .http
            .get(self.endpoint(&["requests"]))
            .query(query)
            .send()
            .await?;
        decode_json(response).await
    }

    async fn create_request(
        &self,
        submission: RequestSubmission,
    ) -> Result<Option<RequestRecord>, ClientError> {
        let has_image = submission.image.is_some();
        let form = submission.into_multipart()?;
        let response = self
            .http
            .post(self.endpoint(&["request"]))
            .multipart(form)
            .send()
            .await?;
        let body = read_success_body(response).await?;
        info!(has_image, "requests: created request");

        match serde_json::from_slice::<RequestRecord>(&body) {
            Ok(record) => Ok(Some(record)),
            Err(err) => {
                debug!(%err, "requests: create response carried no request record");
                Ok(None)
            }
        }
    }

    async fn delete_request(&self, id: &RequestId) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.endpoint(&["request", id.as_str()]))
            .send()
            .await?;
        read_success_body(response).await?;
        info!(request_id = %id, "requests: deleted request");
        Ok(())
    }

    async fn fetch_image(&self, id: &RequestId) -> Result<Vec<u8>, ClientError> {
        let response = self
            .http
            .get(self.endpoint(&["request", "image", id.as_str()]))
            .send()
            .await?;
        read_success_body(response).await
    }

    fn image_url(&self, id: &RequestId) -> String {
        self.endpoint(&["request", "image", id.as_str()]).to_string()
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
