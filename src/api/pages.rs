//! The public read side: index, group listings, profiles, post detail.
//! Everything here is readable without logging in.

use crate::api::{
    observe, AuthorView, CoerceColl, CommentView, GroupView, PageQuery, PageView, PostView, State,
};
use crate::auth::Identity;
use crate::datastore::{postfilters::PostFilters, Client};
use crate::facade::{FacadeError, Fallible};
use actix_web::http::header;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub fn configure<DS: Client + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(index::<DS>)))
        .service(web::resource("/group/{slug}/").route(web::get().to(group_posts::<DS>)))
        .service(web::resource("/profile/{username}/").route(web::get().to(profile::<DS>)))
        .service(web::resource("/posts/{post_id}/").route(web::get().to(post_detail::<DS>)));
}

#[derive(Serialize, Deserialize, Debug)]
pub struct GroupPage {
    pub group: GroupView,
    pub page: PageView<PostView>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ProfilePage {
    pub author: AuthorView,
    pub posts_count: i64,
    /// Whether the authenticated viewer follows this author. Always false for guests.
    pub following: bool,
    pub page: PageView<PostView>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PostDetailPage {
    pub post: PostView,
    pub comments: Vec<CommentView>,
}

async fn index<DS: Client>(
    state: web::Data<State<DS>>,
    query: web::Query<PageQuery>,
) -> Fallible<HttpResponse> {
    observe("index", || async {
        // Only the default page goes through the cache, so there is exactly one
        // entry to invalidate. The payload never varies per viewer.
        let cacheable = query.page.is_none();
        if cacheable {
            if let Some(body) = state.cache.get() {
                return Ok(json_bytes(body));
            }
        }
        let mut filters = PostFilters::visible();
        let total = state.ds.count_posts(filters.clone()).await?;
        let page = state.pager.page(total, query.page.as_deref());
        filters.offset = page.offset();
        filters.limit = page.limit();
        let items: Vec<PostView> = state.ds.list_posts(filters).await?.coerce_into();
        let body = serde_json::to_vec(&PageView::new(items, &page))?;
        if cacheable {
            state.cache.put(&body);
        }
        Ok(json_bytes(body))
    })
    .await
}

fn json_bytes(body: Vec<u8>) -> HttpResponse {
    HttpResponse::Ok()
        .header(header::CONTENT_TYPE, "application/json")
        .body(body)
}

async fn group_posts<DS: Client>(
    state: web::Data<State<DS>>,
    slug: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Fallible<HttpResponse> {
    observe("group_posts", || async {
        guard!(let Some(group) = state.ds.find_group(&slug).await? else {
            return Err(FacadeError::not_found("group not found"))
        });
        let mut filters = PostFilters::visible();
        filters.group_id = Some(group.id);
        let total = state.ds.count_posts(filters.clone()).await?;
        let page = state.pager.page(total, query.page.as_deref());
        filters.offset = page.offset();
        filters.limit = page.limit();
        let items: Vec<PostView> = state.ds.list_posts(filters).await?.coerce_into();
        Ok(HttpResponse::Ok().json(&GroupPage {
            group: group.into(),
            page: PageView::new(items, &page),
        }))
    })
    .await
}

async fn profile<DS: Client>(
    state: web::Data<State<DS>>,
    username: web::Path<String>,
    query: web::Query<PageQuery>,
    viewer: Option<Identity>,
) -> Fallible<HttpResponse> {
    observe("profile", || async {
        guard!(let Some(author) = state.ds.find_user(&username).await? else {
            return Err(FacadeError::not_found("profile not found"))
        });
        let following = match &viewer {
            Some(viewer) => state.ds.is_following(viewer.user_id, author.id).await?,
            None => false,
        };
        let mut filters = PostFilters::visible();
        filters.author_id = Some(author.id);
        let total = state.ds.count_posts(filters.clone()).await?;
        let page = state.pager.page(total, query.page.as_deref());
        filters.offset = page.offset();
        filters.limit = page.limit();
        let items: Vec<PostView> = state.ds.list_posts(filters).await?.coerce_into();
        Ok(HttpResponse::Ok().json(&ProfilePage {
            author: author.into(),
            posts_count: total,
            following,
            page: PageView::new(items, &page),
        }))
    })
    .await
}

async fn post_detail<DS: Client>(
    state: web::Data<State<DS>>,
    post_id: web::Path<Uuid>,
) -> Fallible<HttpResponse> {
    observe("post_detail", || async {
        guard!(let Some(record) = state.ds.find_post(*post_id).await? else {
            return Err(FacadeError::not_found("post not found"))
        });
        let comments: Vec<CommentView> = state.ds.list_comments(*post_id).await?.coerce_into();
        Ok(HttpResponse::Ok().json(&PostDetailPage {
            post: record.into(),
            comments,
        }))
    })
    .await
}
