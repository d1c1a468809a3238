//! HTTP handlers, generic over the datastore [`Client`] so tests can swap in the mock.
//!
//! For every business-logic struct in `datastore`, this module has a matching view
//! struct which redacts non-public fields before serialization.

use crate::datastore::structs::{Comment, Group, PostRecord, User};
use crate::facade::FacadeError;
use crate::metrics;
use crate::pagecache::PageCache;
use crate::pagination::{Page, Pager};
use actix_web::http::header;
use actix_web::HttpResponse;
use chrono::{offset::Utc, DateTime};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

pub mod accounts;
pub mod admin;
pub mod follows;
pub mod forms;
pub mod pages;
pub mod posts;

#[derive(Clone)]
pub struct State<DS> {
    pub ds: Arc<DS>,
    pub cache: Arc<PageCache>,
    pub pager: Pager,
}

pub trait CoerceColl<T>
where
    Self: IntoIterator<Item = T>,
{
    fn coerce_into<U: From<T>>(self) -> Vec<U>;
}

impl<T> CoerceColl<T> for Vec<T> {
    fn coerce_into<U: From<T>>(self) -> Vec<U> {
        self.into_iter().map(|v| v.into()).collect()
    }
}

/// Execute the closure, then log its operational metrics, e.g. time taken, whether it returned Ok/Err, etc.
async fn observe<F, Fut, R, E>(name: &'static str, f: F) -> Result<R, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    let start = Instant::now();
    let return_val = f().await;
    let duration = start.elapsed();
    metrics::HANDLER_SECS
        .with_label_values(&[name])
        .observe(duration.as_secs_f64());
    metrics::RESPONSES
        .with_label_values(&[name, variant_name(&return_val)])
        .inc();
    return_val
}

fn variant_name<T, E>(result: &Result<T, E>) -> &'static str {
    if result.is_ok() {
        "ok"
    } else {
        "err"
    }
}

/// The raw `?page=` parameter. Kept as a string so garbage input can default to
/// page 1 instead of failing query extraction.
#[derive(Deserialize, Default)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// A subset of User that doesn't include credentials or contact details.
#[derive(Serialize, Deserialize, Eq, PartialEq, Debug)]
pub struct AuthorView {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<User> for AuthorView {
    // Discard credential fields to convert User into AuthorView
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

#[derive(Serialize, Deserialize, Eq, PartialEq, Debug)]
pub struct GroupView {
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl From<Group> for GroupView {
    fn from(group: Group) -> Self {
        Self {
            title: group.title,
            slug: group.slug,
            description: group.description,
        }
    }
}

#[derive(Serialize, Deserialize, Eq, PartialEq, Debug)]
pub struct PostView {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub text: String,
    pub image: Option<String>,
    pub author: AuthorView,
    pub group: Option<GroupView>,
}

impl From<PostRecord> for PostView {
    fn from((post, author, group): PostRecord) -> Self {
        Self {
            id: post.id,
            created_at: post.created_at,
            text: post.text,
            image: post.image,
            author: author.into(),
            group: group.map(GroupView::from),
        }
    }
}

#[derive(Serialize, Deserialize, Eq, PartialEq, Debug)]
pub struct CommentView {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub text: String,
    pub author: AuthorView,
}

impl From<(Comment, User)> for CommentView {
    fn from((comment, author): (Comment, User)) -> Self {
        Self {
            id: comment.id,
            created_at: comment.created_at,
            text: comment.text,
            author: author.into(),
        }
    }
}

/// One serialized page of a listing, with enough metadata to render pager links.
#[derive(Serialize, Deserialize, Debug)]
pub struct PageView<T> {
    pub items: Vec<T>,
    pub number: u32,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> PageView<T> {
    pub fn new(items: Vec<T>, page: &Page) -> Self {
        Self {
            items,
            number: page.number,
            total_pages: page.total_pages,
            has_next: page.has_next(),
            has_previous: page.has_previous(),
        }
    }
}

pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .header(header::LOCATION, location)
        .finish()
}

/// Fallback for routes nothing matched: the API's custom 404 body.
pub async fn not_found() -> HttpResponse {
    use actix_web::ResponseError;
    FacadeError::not_found("page not found").error_response()
}
