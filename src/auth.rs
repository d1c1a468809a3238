//! Sessions, password hashing, and the login-redirect guard.
//!
//! A session is a signed token in the `session` cookie. Handlers that need a logged-in
//! user take an [`Identity`] argument; extraction failure is not an error page but a
//! redirect to the login form carrying the original path in `?next=`.

use crate::facade::Fallible;
use actix_web::dev::Payload;
use actix_web::http::{header, StatusCode};
use actix_web::{web, FromRequest, HttpMessage, HttpRequest, HttpResponse, ResponseError};
use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2, PasswordHash, PasswordVerifier,
};
use chrono::offset::Utc;
use futures::future::{err, ok, Ready};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "session";
pub const LOGIN_URL: &str = "/auth/login/";

/// Reset links go stale after an hour.
const RESET_TTL_SECS: i64 = 3600;

/// Issues and verifies the signed tokens behind session cookies and reset links.
#[derive(Clone)]
pub struct Authenticator {
    secret: String,
    session_ttl_secs: i64,
}

#[derive(Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    name: String,
    purpose: Purpose,
    exp: usize,
}

/// Tokens are purpose-bound: a reset link must never pass as a session cookie.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum Purpose {
    Session,
    Reset,
}

impl Authenticator {
    pub fn new(secret: String, session_ttl_secs: i64) -> Self {
        Self {
            secret,
            session_ttl_secs,
        }
    }

    pub fn issue_session(&self, user_id: Uuid, username: &str) -> Fallible<String> {
        self.issue(user_id, username, Purpose::Session, self.session_ttl_secs)
    }

    pub fn verify_session(&self, token: &str) -> Option<Identity> {
        self.verify(token, Purpose::Session)
    }

    pub fn issue_reset(&self, user_id: Uuid, username: &str) -> Fallible<String> {
        self.issue(user_id, username, Purpose::Reset, RESET_TTL_SECS)
    }

    pub fn verify_reset(&self, token: &str) -> Option<Identity> {
        self.verify(token, Purpose::Reset)
    }

    fn issue(&self, user_id: Uuid, username: &str, purpose: Purpose, ttl_secs: i64) -> Fallible<String> {
        let claims = Claims {
            sub: user_id,
            name: username.to_owned(),
            purpose,
            exp: (Utc::now().timestamp() + ttl_secs) as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;
        Ok(token)
    }

    fn verify(&self, token: &str, purpose: Purpose) -> Option<Identity> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .ok()?;
        if data.claims.purpose != purpose {
            return None;
        }
        Some(Identity {
            user_id: data.claims.sub,
            username: data.claims.name,
        })
    }
}

pub fn hash_password(password: &str) -> Fallible<String> {
    let salt = SaltString::generate(rand::thread_rng());
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// The logged-in user, as established by the session cookie.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub username: String,
}

impl FromRequest for Identity {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;
    type Config = ();

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let authenticator = req.app_data::<web::Data<Authenticator>>();
        let cookie = req.cookie(SESSION_COOKIE);
        if let (Some(authenticator), Some(cookie)) = (authenticator, cookie) {
            if let Some(identity) = authenticator.verify_session(cookie.value()) {
                return ok(identity);
            }
        }
        err(LoginRedirect::from_path(req.path()).into())
    }
}

/// The "error" produced when a guest hits a protected route: a 302 to the login form,
/// remembering where they were headed.
#[derive(Debug)]
pub struct LoginRedirect {
    next: String,
}

impl LoginRedirect {
    pub fn from_path(path: &str) -> Self {
        Self {
            next: path.to_owned(),
        }
    }

    pub fn location(&self) -> String {
        format!("{}?next={}", LOGIN_URL, self.next)
    }
}

impl fmt::Display for LoginRedirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "authentication required for {}", self.next)
    }
}

impl ResponseError for LoginRedirect {
    fn status_code(&self) -> StatusCode {
        StatusCode::FOUND
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::Found()
            .header(header::LOCATION, self.location())
            .finish()
    }
}
