//! Create-request dialog: draft, client-side validation and submit results.

use serde::{Deserialize, Serialize};
use shared::{error::is_phone_conflict, protocol::RequestRecord};

use crate::{error::ClientError, ImageUpload, RequestSubmission};

pub const NAME_REQUIRED: &str = "Name is required";
pub const PHONE_REQUIRED: &str = "Phone number is required";
pub const PHONE_DIGITS_ONLY: &str = "Phone must contain digits only";
pub const PHONE_LENGTH: &str = "Phone must be 10 digits";
pub const TITLE_REQUIRED: &str = "Title is required";
pub const SERVER_ERROR: &str = "Server Error";

const PHONE_DIGITS: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormDraft {
    pub name: String,
    pub phone: String,
    pub title: String,
    pub image: Option<ImageUpload>,
}

impl FormDraft {
    fn to_submission(&self) -> RequestSubmission {
        RequestSubmission {
            name: self.name.clone(),
            phone: self.phone.clone(),
            title: self.title.clone(),
            image: self.image.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrors {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub title: Option<String>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none() && self.title.is_none()
    }
}

/// First failing phone rule, checked in order: presence, digits, length.
pub fn validate_phone(phone: &str) -> Option<&'static str> {
    if phone.trim().is_empty() {
        Some(PHONE_REQUIRED)
    } else if !phone.chars().all(|c| c.is_ascii_digit()) {
        Some(PHONE_DIGITS_ONLY)
    } else if phone.len() != PHONE_DIGITS {
        Some(PHONE_LENGTH)
    } else {
        None
    }
}

pub fn validate(draft: &FormDraft) -> FieldErrors {
    let required = |value: &str, message: &str| {
        value.trim().is_empty().then(|| message.to_string())
    };
    FieldErrors {
        name: required(&draft.name, NAME_REQUIRED),
        phone: validate_phone(&draft.phone).map(str::to_string),
        title: required(&draft.title, TITLE_REQUIRED),
    }
}

/// Result of starting a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormSubmit {
    Ready(RequestSubmission),
    Invalid,
    InFlight,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Invalid,
    InFlight,
    Created(Option<RequestRecord>),
    Rejected { message: String },
    Failed { message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormState {
    open: bool,
    draft: FormDraft,
    errors: FieldErrors,
    banner: Option<String>,
    submitting: bool,
}

impl FormState {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn draft(&self) -> &FormDraft {
        &self.draft
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Backend or transport message not tied to a single field.
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn open(&self) -> Self {
        Self {
            open: true,
            errors: FieldErrors::default(),
            banner: None,
            ..self.clone()
        }
    }

    pub fn close(&self) -> Self {
        Self {
            open: false,
            ..self.clone()
        }
    }

    pub fn edit(&self, edit: impl FnOnce(&mut FormDraft)) -> Self {
        let mut next = self.clone();
        edit(&mut next.draft);
        next
    }

    pub fn submit(&self) -> (Self, FormSubmit) {
        if self.submitting {
            return (self.clone(), FormSubmit::InFlight);
        }

        let mut next = self.clone();
        next.errors = validate(&self.draft);
        if !next.errors.is_empty() {
            return (next, FormSubmit::Invalid);
        }

        next.banner = None;
        next.submitting = true;
        let submission = next.draft.to_submission();
        (next, FormSubmit::Ready(submission))
    }

    pub fn resolve(
        &self,
        result: Result<Option<RequestRecord>, ClientError>,
    ) -> (Self, SubmitOutcome) {
        let mut next = self.clone();
        next.submitting = false;

        match result {
            Ok(record) => {
                next.draft = FormDraft::default();
                next.errors = FieldErrors::default();
                next.banner = None;
                next.open = false;
                (next, SubmitOutcome::Created(record))
            }
            Err(ClientError::Backend { message, .. }) => {
                if is_phone_conflict(&message) {
                    next.errors.phone = Some(message.clone());
                } else {
                    next.banner = Some(message.clone());
                }
                (next, SubmitOutcome::Rejected { message })
            }
            Err(_) => {
                next.banner = Some(SERVER_ERROR.to_string());
                (
                    next,
                    SubmitOutcome::Failed {
                        message: SERVER_ERROR.to_string(),
                    },
                )
            }
        }
    }
}

#[cfg(test)]
#[path = "../tests/form_tests.rs"]
mod tests;
