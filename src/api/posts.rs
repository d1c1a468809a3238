//! The authenticated write side for posts: create, edit (author only), comment.

use crate::api::forms::{CommentForm, FormErrors, PostForm};
use crate::api::{observe, redirect, State};
use crate::auth::Identity;
use crate::datastore::structs::{NewComment, NewPost, PostEdit};
use crate::datastore::Client;
use crate::facade::FacadeError;
use actix_web::{web, Error as ActixError, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub fn configure<DS: Client + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/create/")
            .route(web::get().to(new_post_form))
            .route(web::post().to(create_post::<DS>)),
    )
    .service(
        web::resource("/posts/{post_id}/edit/")
            .route(web::get().to(edit_post_form::<DS>))
            .route(web::post().to(edit_post::<DS>)),
    )
    .service(web::resource("/posts/{post_id}/comment/").route(web::post().to(add_comment::<DS>)));
}

/// What the create/edit pages serialize: the form's current field values.
#[derive(Serialize, Deserialize, Debug)]
pub struct FormPage {
    pub form: PostForm,
    pub is_edit: bool,
}

async fn new_post_form(_identity: Identity) -> HttpResponse {
    HttpResponse::Ok().json(&FormPage {
        form: PostForm::blank(),
        is_edit: false,
    })
}

/// Validate the submitted form against the datastore, returning all field errors at
/// once. Nothing is persisted unless this comes back empty.
async fn validate_post_form<DS: Client>(
    state: &State<DS>,
    form: &PostForm,
) -> Result<FormErrors, FacadeError> {
    let mut errors = FormErrors::validate(form);
    if let Some(group_id) = form.group_id {
        if !state.ds.group_exists(group_id).await? {
            errors.add("group_id", "unknown group");
        }
    }
    Ok(errors)
}

async fn create_post<DS: Client>(
    state: web::Data<State<DS>>,
    identity: Identity,
    body: web::Json<PostForm>,
) -> Result<HttpResponse, ActixError> {
    observe("create_post", || async {
        let form = body.into_inner().trimmed();
        let errors = validate_post_form(&state, &form).await?;
        if !errors.is_empty() {
            return Err(errors.into());
        }
        state
            .ds
            .new_post(NewPost {
                text: form.text,
                image: form.image,
                author_id: identity.user_id,
                group_id: form.group_id,
            })
            .await?;
        Ok(redirect(&format!("/profile/{}/", identity.username)))
    })
    .await
}

async fn edit_post_form<DS: Client>(
    state: web::Data<State<DS>>,
    identity: Identity,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse, ActixError> {
    observe("edit_post_form", || async {
        guard!(let Some(record) = state.ds.find_post(*post_id).await? else {
            return Err(FacadeError::not_found("post not found").into())
        });
        let (post, _, _) = record;
        if post.author_id != identity.user_id {
            // Only the author may edit; everyone else lands back on the post.
            return Ok(redirect(&format!("/posts/{}/", post.id)));
        }
        Ok(HttpResponse::Ok().json(&FormPage {
            form: PostForm {
                text: post.text,
                group_id: post.group_id,
                image: post.image,
            },
            is_edit: true,
        }))
    })
    .await
}

async fn edit_post<DS: Client>(
    state: web::Data<State<DS>>,
    identity: Identity,
    post_id: web::Path<Uuid>,
    body: web::Json<PostForm>,
) -> Result<HttpResponse, ActixError> {
    observe("edit_post", || async {
        guard!(let Some(record) = state.ds.find_post(*post_id).await? else {
            return Err(FacadeError::not_found("post not found").into())
        });
        let (post, _, _) = record;
        if post.author_id != identity.user_id {
            return Ok(redirect(&format!("/posts/{}/", post.id)));
        }
        let form = body.into_inner().trimmed();
        let errors = validate_post_form(&state, &form).await?;
        if !errors.is_empty() {
            return Err(errors.into());
        }
        state
            .ds
            .edit_post(
                post.id,
                PostEdit {
                    text: form.text,
                    image: form.image,
                    group_id: form.group_id,
                },
            )
            .await?;
        Ok(redirect(&format!("/posts/{}/", post.id)))
    })
    .await
}

async fn add_comment<DS: Client>(
    state: web::Data<State<DS>>,
    identity: Identity,
    post_id: web::Path<Uuid>,
    body: web::Json<CommentForm>,
) -> Result<HttpResponse, ActixError> {
    observe("add_comment", || async {
        guard!(let Some(record) = state.ds.find_post(*post_id).await? else {
            return Err(FacadeError::not_found("post not found").into())
        });
        let (post, _, _) = record;
        let form = body.into_inner().trimmed();
        let errors = FormErrors::validate(&form);
        if !errors.is_empty() {
            return Err(errors.into());
        }
        state
            .ds
            .new_comment(NewComment {
                text: form.text,
                author_id: identity.user_id,
                post_id: post.id,
            })
            .await?;
        Ok(redirect(&format!("/posts/{}/", post.id)))
    })
    .await
}
