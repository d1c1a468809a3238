//! Declarative field checks for every write endpoint, plus the 400 response body
//! they produce when they fail.
//!
//! Validation never partially persists anything: handlers collect all field errors
//! first and only touch the datastore once the form is clean.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

/// Field-level validation failures, serialized as `{"errors": {field: message}}`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FormErrors {
    pub errors: BTreeMap<String, String>,
}

impl FormErrors {
    /// Run a form's declarative checks and collect whatever failed.
    pub fn validate<F: Validate>(form: &F) -> Self {
        match form.validate() {
            Ok(()) => Self::default(),
            Err(errors) => Self::from(&errors),
        }
    }

    pub fn add(&mut self, field: &str, message: &str) {
        self.errors.insert(field.to_owned(), message.to_owned());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// The "entered twice" check for password fields.
    pub fn require_match(&mut self, field: &str, first: &str, second: &str) {
        if first != second {
            self.add(field, "passwords do not match");
        }
    }
}

impl From<&ValidationErrors> for FormErrors {
    fn from(errors: &ValidationErrors) -> Self {
        let mut form_errors = Self::default();
        for (field, field_errors) in errors.field_errors() {
            let message = field_errors
                .first()
                .and_then(|e| e.message.as_ref())
                .map(|m| m.to_string())
                .unwrap_or_else(|| "invalid value".to_owned());
            form_errors.errors.insert((*field).to_owned(), message);
        }
        form_errors
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "validation failed on {} field(s)", self.errors.len())
    }
}

impl ResponseError for FormErrors {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::BadRequest().json(self)
    }
}

/// Submission form for creating or editing a post.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PostForm {
    #[validate(length(min = 1, message = "this field is required"))]
    pub text: String,
    pub group_id: Option<Uuid>,
    pub image: Option<String>,
}

impl PostForm {
    pub fn blank() -> Self {
        Self {
            text: String::new(),
            group_id: None,
            image: None,
        }
    }

    /// Strip surrounding whitespace first, so whitespace-only text fails the
    /// length check.
    pub fn trimmed(mut self) -> Self {
        self.text = self.text.trim().to_owned();
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CommentForm {
    #[validate(length(min = 1, message = "this field is required"))]
    pub text: String,
}

impl CommentForm {
    pub fn trimmed(mut self) -> Self {
        self.text = self.text.trim().to_owned();
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SignupForm {
    pub first_name: String,
    pub last_name: String,
    #[validate(length(min = 1, message = "this field is required"))]
    pub username: String,
    #[validate(email(message = "enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password1: String,
    pub password2: String,
}

impl SignupForm {
    /// Trim everything except the passwords, which are taken verbatim.
    pub fn trimmed(mut self) -> Self {
        self.first_name = self.first_name.trim().to_owned();
        self.last_name = self.last_name.trim().to_owned();
        self.username = self.username.trim().to_owned();
        self.email = self.email.trim().to_owned();
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    /// Where to land after logging in; filled from the `?next=` redirect parameter.
    pub next: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct PasswordChangeForm {
    pub old_password: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub new_password1: String,
    pub new_password2: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct PasswordResetForm {
    #[validate(email(message = "enter a valid email address"))]
    pub email: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ResetConfirmForm {
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub new_password1: String,
    pub new_password2: String,
}

/// Admin form for creating a group.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GroupForm {
    #[validate(length(min = 1, message = "this field is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "this field is required"))]
    pub slug: String,
    #[serde(default)]
    pub description: String,
}
