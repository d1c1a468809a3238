//! Follow edges and the feed they produce.
//!
//! Following and unfollowing are GET endpoints that bounce back to the author's
//! profile, so a plain link can drive them. The uniqueness of an edge is enforced
//! by the storage layer; this module just translates the conflict for users.

use crate::api::{observe, redirect, CoerceColl, PageQuery, PageView, PostView, State};
use crate::auth::Identity;
use crate::datastore::Client;
use crate::facade::{FacadeError, Fallible};
use actix_web::{web, HttpResponse};

pub fn configure<DS: Client + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/follow/").route(web::get().to(feed::<DS>)))
        .service(
            web::resource("/profile/{username}/follow/")
                .route(web::get().to(follow_author::<DS>)),
        )
        .service(
            web::resource("/profile/{username}/unfollow/")
                .route(web::get().to(unfollow_author::<DS>)),
        );
}

async fn follow_author<DS: Client>(
    state: web::Data<State<DS>>,
    identity: Identity,
    username: web::Path<String>,
) -> Fallible<HttpResponse> {
    observe("follow_author", || async {
        guard!(let Some(author) = state.ds.find_user(&username).await? else {
            return Err(FacadeError::not_found("profile not found"))
        });
        if author.id == identity.user_id {
            return Err(FacadeError::invalid_action("you cannot follow yourself"));
        }
        state.ds.follow(identity.user_id, author.id).await?;
        Ok(redirect(&format!("/profile/{}/", author.username)))
    })
    .await
}

async fn unfollow_author<DS: Client>(
    state: web::Data<State<DS>>,
    identity: Identity,
    username: web::Path<String>,
) -> Fallible<HttpResponse> {
    observe("unfollow_author", || async {
        guard!(let Some(author) = state.ds.find_user(&username).await? else {
            return Err(FacadeError::not_found("profile not found"))
        });
        // Unfollowing someone you don't follow is a no-op, not an error.
        state.ds.unfollow(identity.user_id, author.id).await?;
        Ok(redirect(&format!("/profile/{}/", author.username)))
    })
    .await
}

async fn feed<DS: Client>(
    state: web::Data<State<DS>>,
    identity: Identity,
    query: web::Query<PageQuery>,
) -> Fallible<HttpResponse> {
    observe("feed", || async {
        let total = state.ds.count_feed(identity.user_id).await?;
        let page = state.pager.page(total, query.page.as_deref());
        let items: Vec<PostView> = state
            .ds
            .feed(identity.user_id, page.offset(), page.limit())
            .await?
            .coerce_into();
        Ok(HttpResponse::Ok().json(&PageView::new(items, &page)))
    })
    .await
}
