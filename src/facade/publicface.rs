use actix_web::http::StatusCode;
use std::fmt;

/// Used to create HTTP responses with the given text and status code.
#[derive(Debug)]
pub struct PublicFace {
    /// A user-facing classification of what caused the error.
    pub kind: Kind,
    /// Error text that will describe the problem to the user.
    pub text: &'static str,
}

/// A user-facing classification of what caused the error.
#[derive(Debug, Clone, Copy)]
pub enum Kind {
    ServerError,
    InvalidAction,
    InvalidField,
    BadAuth,
    Conflict,
    NotFound,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        // Make fmt::Display the same as fmt::Debug, i.e. each variant's name.
        write!(f, "{:?}", self)
    }
}

impl From<Kind> for StatusCode {
    /// Kinds can be mapped to HTTP status codes. PublicFace doesn't use status codes
    /// directly, because some components (e.g. the datastore) shouldn't need to know
    /// about HTTP codes.
    fn from(kind: Kind) -> StatusCode {
        match kind {
            Kind::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
            Kind::InvalidAction => StatusCode::BAD_REQUEST,
            Kind::InvalidField => StatusCode::BAD_REQUEST,
            Kind::BadAuth => StatusCode::UNAUTHORIZED,
            Kind::Conflict => StatusCode::CONFLICT,
            Kind::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl fmt::Display for PublicFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}: {}", self.kind, self.text)
    }
}

impl Default for PublicFace {
    // Default to ServerError and a very vague generic message.
    fn default() -> Self {
        Self {
            kind: Kind::ServerError,
            text: "Internal server error",
        }
    }
}
