//! Operator endpoints, guarded by a bearer token from config rather than a session:
//! unredacted post listings, soft deletion, group creation, and the cache switch.

use crate::api::forms::{FormErrors, GroupForm};
use crate::api::{observe, State};
use crate::datastore::postfilters;
use crate::datastore::structs::{NewGroup, Post};
use crate::datastore::Client;
use crate::facade::{FacadeError, Fallible};
use actix_web::{web, Error as ActixError, HttpResponse};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The bearer token the /admin endpoints require, from config.
#[derive(Clone)]
pub struct AdminKey(pub String);

pub fn configure<DS: Client + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/posts").route(web::get().to(list_all_posts::<DS>)))
        .service(web::resource("/posts/{post_id}").route(web::delete().to(delete_post::<DS>)))
        .service(web::resource("/groups").route(web::post().to(create_group::<DS>)))
        .service(web::resource("/cache/clear").route(web::post().to(clear_cache::<DS>)));
}

fn check_token(credentials: &BearerAuth, key: &AdminKey) -> Fallible<()> {
    if credentials.token() == key.0 {
        Ok(())
    } else {
        Err(FacadeError::bad_auth("invalid admin token"))
    }
}

/// Filters operators can specify via the API. No implicit visibility filter is
/// added: admins see soft-deleted posts too.
#[derive(Default, Serialize, Deserialize, Debug, Eq, PartialEq)]
pub struct AdminPostFilters {
    pub author_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub is_deleted: Option<bool>,
    pub text_contains: Option<String>,
    pub uuid: Option<Uuid>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

impl AdminPostFilters {
    pub fn into_datastore_filters(self) -> postfilters::PostFilters {
        postfilters::PostFilters {
            id: self.uuid,
            author_id: self.author_id,
            group_id: self.group_id,
            is_deleted: self.is_deleted,
            text_contains: self.text_contains,
            offset: 0,
            limit: self.limit,
        }
    }
}

// Admin endpoint: posts with no field redaction.
async fn list_all_posts<DS: Client>(
    state: web::Data<State<DS>>,
    key: web::Data<AdminKey>,
    credentials: BearerAuth,
    filters: web::Query<AdminPostFilters>,
) -> Fallible<web::Json<Vec<Post>>> {
    observe("admin_list_posts", || async {
        check_token(&credentials, &key)?;
        let records = state
            .ds
            .list_posts(filters.into_inner().into_datastore_filters())
            .await?;
        Ok(web::Json(
            records.into_iter().map(|(post, _, _)| post).collect(),
        ))
    })
    .await
}

async fn delete_post<DS: Client>(
    state: web::Data<State<DS>>,
    key: web::Data<AdminKey>,
    credentials: BearerAuth,
    post_id: web::Path<Uuid>,
) -> Fallible<web::Json<Post>> {
    observe("admin_delete_post", || async {
        check_token(&credentials, &key)?;
        guard!(let Some(post) = state.ds.delete_post(*post_id).await? else {
            return Err(FacadeError::not_found("post not found"))
        });
        Ok(web::Json(post))
    })
    .await
}

async fn create_group<DS: Client>(
    state: web::Data<State<DS>>,
    key: web::Data<AdminKey>,
    credentials: BearerAuth,
    body: web::Json<GroupForm>,
) -> Result<HttpResponse, ActixError> {
    observe("admin_create_group", || async {
        check_token(&credentials, &key)?;
        let form = body.into_inner();
        let errors = FormErrors::validate(&form);
        if !errors.is_empty() {
            return Err(errors.into());
        }
        let group = state
            .ds
            .create_group(NewGroup {
                title: form.title,
                slug: form.slug,
                description: form.description,
            })
            .await?;
        Ok(HttpResponse::Created().json(&group))
    })
    .await
}

async fn clear_cache<DS: Client>(
    state: web::Data<State<DS>>,
    key: web::Data<AdminKey>,
    credentials: BearerAuth,
) -> Fallible<HttpResponse> {
    observe("admin_clear_cache", || async {
        check_token(&credentials, &key)?;
        state.cache.clear();
        Ok(HttpResponse::Ok().json(&CacheCleared { cleared: true }))
    })
    .await
}

#[derive(Serialize, Deserialize, Debug)]
struct CacheCleared {
    cleared: bool,
}
