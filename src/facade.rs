//! `facade::FacadeError` pairs an internal Rust error with a public face that is safe
//! to serialize to users. This stops readers of the API from seeing internal errors,
//! which might contain sensitive implementation details that should be kept private.

mod extensions;
mod integrations;
pub mod publicface;

pub use extensions::*;
pub use publicface::{Kind, PublicFace};

use anyhow::anyhow;
use std::fmt;
use std::fmt::{Display, Formatter};

/// Wraps a Rust error type with a public face. The internal error is logged, never
/// serialized; the public face is what API users see.
#[derive(Debug)]
pub struct FacadeError {
    /// The underlying error, from some function. May contain sensitive information, so it
    /// should not be shown to users.
    pub internal: anyhow::Error,
    /// A user-friendly error that doesn't contain any sensitive information.
    pub public: PublicFace,
}

impl FacadeError {
    /// An error caused entirely by user input. The internal and public texts are the
    /// same because there is nothing to hide.
    pub fn user(kind: Kind, text: &'static str) -> Self {
        Self {
            internal: anyhow!(text),
            public: PublicFace { kind, text },
        }
    }

    pub fn not_found(text: &'static str) -> Self {
        Self::user(Kind::NotFound, text)
    }

    pub fn invalid_action(text: &'static str) -> Self {
        Self::user(Kind::InvalidAction, text)
    }

    pub fn bad_auth(text: &'static str) -> Self {
        Self::user(Kind::BadAuth, text)
    }
}

/// Displaying a FacadeError will only display the public face. The internal error
/// remains private.
impl Display for FacadeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::result::Result<(), fmt::Error> {
        write!(f, "{}", self.public)
    }
}

/// Return type of a function that could fail. If it fails, it includes a facade error
/// (an error with both an internal and a public value).
pub type Fallible<T> = Result<T, FacadeError>;
