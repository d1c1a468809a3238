//! The credential lifecycle under `/auth/`: signup, login/logout, password change,
//! and the password reset flow.
//!
//! Reset links are delivered by logging them; wiring a mail transport in front of
//! that log line is a deployment concern, not an API one.

use crate::api::forms::{
    FormErrors, LoginForm, PasswordChangeForm, PasswordResetForm, ResetConfirmForm, SignupForm,
};
use crate::api::{observe, redirect, State};
use crate::auth::{self, Authenticator, Identity, SESSION_COOKIE};
use crate::datastore::structs::NewUser;
use crate::datastore::Client;
use crate::facade::FacadeError;
use actix_web::cookie::Cookie;
use actix_web::http::header;
use actix_web::{web, Error as ActixError, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

pub fn configure<DS: Client + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/signup/")
            .route(web::get().to(signup_form))
            .route(web::post().to(signup::<DS>)),
    )
    .service(
        web::resource("/login/")
            .route(web::get().to(login_form))
            .route(web::post().to(login::<DS>)),
    )
    .service(web::resource("/logout/").route(web::get().to(logout)))
    .service(
        web::resource("/password_change/")
            .route(web::get().to(password_change_form))
            .route(web::post().to(change_password::<DS>)),
    )
    .service(web::resource("/password_change/done/").route(web::get().to(password_change_done)))
    .service(
        web::resource("/password_reset/")
            .route(web::get().to(password_reset_form))
            .route(web::post().to(request_password_reset::<DS>)),
    )
    .service(web::resource("/password_reset/done/").route(web::get().to(password_reset_done)))
    .service(web::resource("/reset/done/").route(web::get().to(reset_done)))
    .service(
        web::resource("/reset/{uid}/{token}/")
            .route(web::get().to(reset_confirm_form))
            .route(web::post().to(confirm_password_reset::<DS>)),
    );
}

#[derive(Serialize)]
struct FormContext<'a, F> {
    form: &'a F,
}

#[derive(Serialize)]
struct Detail {
    detail: &'static str,
}

fn bad_credentials() -> FacadeError {
    FacadeError::bad_auth("invalid username or password")
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .finish()
}

async fn signup_form() -> HttpResponse {
    HttpResponse::Ok().json(&FormContext {
        form: &SignupForm::default(),
    })
}

async fn signup<DS: Client>(
    state: web::Data<State<DS>>,
    body: web::Json<SignupForm>,
) -> Result<HttpResponse, ActixError> {
    observe("signup", || async {
        let form = body.into_inner().trimmed();
        let mut errors = FormErrors::validate(&form);
        errors.require_match("password2", &form.password1, &form.password2);
        if !errors.is_empty() {
            return Err(errors.into());
        }
        let password_hash = auth::hash_password(&form.password1)?;
        let user = state
            .ds
            .create_user(NewUser {
                username: form.username,
                email: form.email,
                password_hash,
                first_name: form.first_name,
                last_name: form.last_name,
            })
            .await?;
        info!(username = &user.username[..], "new account registered");
        Ok(redirect("/"))
    })
    .await
}

async fn login_form() -> HttpResponse {
    HttpResponse::Ok().json(&FormContext {
        form: &LoginForm::default(),
    })
}

async fn login<DS: Client>(
    state: web::Data<State<DS>>,
    authenticator: web::Data<Authenticator>,
    body: web::Json<LoginForm>,
) -> Result<HttpResponse, ActixError> {
    observe("login", || async {
        let form = body.into_inner();
        guard!(let Some(user) = state.ds.find_user(form.username.trim()).await? else {
            return Err(bad_credentials().into())
        });
        if !auth::verify_password(&form.password, &user.password_hash) {
            return Err(bad_credentials().into());
        }
        let token = authenticator.issue_session(user.id, &user.username)?;
        // Only site-relative targets; anything else would be an open redirect.
        let target = form
            .next
            .filter(|next| next.starts_with('/') && !next.starts_with("//"))
            .unwrap_or_else(|| "/".to_owned());
        Ok(HttpResponse::Found()
            .cookie(session_cookie(token))
            .header(header::LOCATION, target)
            .finish())
    })
    .await
}

async fn logout() -> HttpResponse {
    HttpResponse::Ok()
        .del_cookie(&Cookie::new(SESSION_COOKIE, ""))
        .json(&Detail {
            detail: "logged out",
        })
}

async fn password_change_form(_identity: Identity) -> HttpResponse {
    HttpResponse::Ok().json(&FormContext {
        form: &PasswordChangeForm::default(),
    })
}

async fn change_password<DS: Client>(
    state: web::Data<State<DS>>,
    identity: Identity,
    body: web::Json<PasswordChangeForm>,
) -> Result<HttpResponse, ActixError> {
    observe("change_password", || async {
        guard!(let Some(user) = state.ds.get_user(identity.user_id).await? else {
            return Err(bad_credentials().into())
        });
        let form = body.into_inner();
        let mut errors = FormErrors::validate(&form);
        errors.require_match("new_password2", &form.new_password1, &form.new_password2);
        if !auth::verify_password(&form.old_password, &user.password_hash) {
            errors.add("old_password", "wrong password");
        }
        if !errors.is_empty() {
            return Err(errors.into());
        }
        let password_hash = auth::hash_password(&form.new_password1)?;
        state.ds.set_password(user.id, password_hash).await?;
        Ok(redirect("/auth/password_change/done/"))
    })
    .await
}

async fn password_change_done(_identity: Identity) -> HttpResponse {
    HttpResponse::Ok().json(&Detail {
        detail: "password changed",
    })
}

async fn password_reset_form() -> HttpResponse {
    HttpResponse::Ok().json(&FormContext {
        form: &PasswordResetForm::default(),
    })
}

async fn request_password_reset<DS: Client>(
    state: web::Data<State<DS>>,
    authenticator: web::Data<Authenticator>,
    body: web::Json<PasswordResetForm>,
) -> Result<HttpResponse, ActixError> {
    observe("request_password_reset", || async {
        let form = body.into_inner();
        let errors = FormErrors::validate(&form);
        if !errors.is_empty() {
            return Err(errors.into());
        }
        // The response is the same whether or not the address has an account, so the
        // endpoint can't be used to probe which emails are registered.
        if let Some(user) = state.ds.find_user_by_email(form.email.trim()).await? {
            let token = authenticator.issue_reset(user.id, &user.username)?;
            let uid = base64::encode_config(user.id.as_bytes(), base64::URL_SAFE_NO_PAD);
            info!(
                username = &user.username[..],
                "password reset requested, confirm at /auth/reset/{}/{}/", uid, token
            );
        }
        Ok(redirect("/auth/password_reset/done/"))
    })
    .await
}

async fn password_reset_done() -> HttpResponse {
    HttpResponse::Ok().json(&Detail {
        detail: "reset link sent if the address has an account",
    })
}

/// Just a named pair that can be extracted from the path of the reset endpoints.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ResetPath {
    pub uid: String,
    pub token: String,
}

/// A reset link is valid when the token verifies and names the same user the uid does.
fn reset_identity(authenticator: &Authenticator, path: &ResetPath) -> Option<Identity> {
    let identity = authenticator.verify_reset(&path.token)?;
    let decoded = base64::decode_config(&path.uid, base64::URL_SAFE_NO_PAD).ok()?;
    let uid = Uuid::from_slice(&decoded).ok()?;
    if uid != identity.user_id {
        return None;
    }
    Some(identity)
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ResetLink {
    pub valid: bool,
}

async fn reset_confirm_form(
    authenticator: web::Data<Authenticator>,
    path: web::Path<ResetPath>,
) -> HttpResponse {
    let valid = reset_identity(&authenticator, &path).is_some();
    HttpResponse::Ok().json(&ResetLink { valid })
}

async fn confirm_password_reset<DS: Client>(
    state: web::Data<State<DS>>,
    authenticator: web::Data<Authenticator>,
    path: web::Path<ResetPath>,
    body: web::Json<ResetConfirmForm>,
) -> Result<HttpResponse, ActixError> {
    observe("confirm_password_reset", || async {
        guard!(let Some(identity) = reset_identity(&authenticator, &path) else {
            return Err(FacadeError::invalid_action("invalid or expired reset link").into())
        });
        let form = body.into_inner();
        let mut errors = FormErrors::validate(&form);
        errors.require_match("new_password2", &form.new_password1, &form.new_password2);
        if !errors.is_empty() {
            return Err(errors.into());
        }
        let password_hash = auth::hash_password(&form.new_password1)?;
        state.ds.set_password(identity.user_id, password_hash).await?;
        info!(username = &identity.username[..], "password reset completed");
        Ok(redirect("/auth/reset/done/"))
    })
    .await
}

async fn reset_done() -> HttpResponse {
    HttpResponse::Ok().json(&Detail {
        detail: "password reset complete",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testutil;
    use crate::datastore::mock;
    use actix_web::{test, App};

    fn location(resp: &actix_web::dev::ServiceResponse) -> &str {
        resp.headers()
            .get(header::LOCATION)
            .expect("response should redirect")
            .to_str()
            .unwrap()
    }

    fn signup_form_data() -> SignupForm {
        SignupForm {
            first_name: "Test".to_owned(),
            last_name: "User".to_owned(),
            username: "TestUser".to_owned(),
            email: "testuser@example.com".to_owned(),
            password1: "FrniHzE4secret".to_owned(),
            password2: "FrniHzE4secret".to_owned(),
        }
    }

    #[actix_rt::test]
    async fn test_signup_creates_user_and_redirects_to_index() {
        let ds = mock::Client::default();
        let state = testutil::state(ds.clone());
        let mut app = test::init_service(
            App::new()
                .data(state)
                .data(testutil::authenticator())
                .service(web::scope("/auth").configure(configure::<mock::Client>)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/auth/signup/")
            .set_json(&signup_form_data())
            .to_request();
        let resp = test::call_service(&mut app, req).await;
        assert_eq!(resp.status(), 302);
        assert_eq!(location(&resp), "/");

        let user = crate::datastore::Client::find_user(&ds, "TestUser")
            .await
            .unwrap()
            .expect("signup should create the user");
        assert_eq!(user.email, "testuser@example.com");
        assert_eq!(user.first_name, "Test");
        assert!(auth::verify_password("FrniHzE4secret", &user.password_hash));
    }

    #[actix_rt::test]
    async fn test_signup_duplicate_username_conflicts() {
        let ds = mock::Client::default();
        ds.add_user("TestUser");
        let state = testutil::state(ds);
        let mut app = test::init_service(
            App::new()
                .data(state)
                .data(testutil::authenticator())
                .service(web::scope("/auth").configure(configure::<mock::Client>)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/auth/signup/")
            .set_json(&signup_form_data())
            .to_request();
        let resp = test::call_service(&mut app, req).await;
        assert_eq!(resp.status(), 409);
    }

    #[actix_rt::test]
    async fn test_signup_password_mismatch_is_a_field_error() {
        let ds = mock::Client::default();
        let state = testutil::state(ds);
        let mut app = test::init_service(
            App::new()
                .data(state)
                .data(testutil::authenticator())
                .service(web::scope("/auth").configure(configure::<mock::Client>)),
        )
        .await;

        let mut form = signup_form_data();
        form.password2 = "somethingElse99".to_owned();
        let req = test::TestRequest::post()
            .uri("/auth/signup/")
            .set_json(&form)
            .to_request();
        let resp = test::call_service(&mut app, req).await;
        assert_eq!(resp.status(), 400);
        let body = test::read_body(resp).await;
        let errors: FormErrors = serde_json::from_slice(&body).unwrap();
        assert!(errors.errors.contains_key("password2"));
    }

    #[actix_rt::test]
    async fn test_login_sets_session_and_honours_next() {
        let ds = mock::Client::default();
        let user = ds.add_user_with_password("TestUser", "FrniHzE4secret");
        let state = testutil::state(ds);
        let mut app = test::init_service(
            App::new()
                .data(state)
                .data(testutil::authenticator())
                .service(web::scope("/auth").configure(configure::<mock::Client>)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/auth/login/")
            .set_json(&LoginForm {
                username: user.username.clone(),
                password: "FrniHzE4secret".to_owned(),
                next: Some("/create/".to_owned()),
            })
            .to_request();
        let resp = test::call_service(&mut app, req).await;
        assert_eq!(resp.status(), 302);
        assert_eq!(location(&resp), "/create/");
        let has_session = resp
            .response()
            .cookies()
            .any(|cookie| cookie.name() == SESSION_COOKIE && !cookie.value().is_empty());
        assert!(has_session, "login should set the session cookie");
    }

    #[actix_rt::test]
    async fn test_login_rejects_bad_password() {
        let ds = mock::Client::default();
        ds.add_user_with_password("TestUser", "FrniHzE4secret");
        let state = testutil::state(ds);
        let mut app = test::init_service(
            App::new()
                .data(state)
                .data(testutil::authenticator())
                .service(web::scope("/auth").configure(configure::<mock::Client>)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/auth/login/")
            .set_json(&LoginForm {
                username: "TestUser".to_owned(),
                password: "not the password".to_owned(),
                next: None,
            })
            .to_request();
        let resp = test::call_service(&mut app, req).await;
        assert_eq!(resp.status(), 401);
    }

    #[actix_rt::test]
    async fn test_guest_password_change_redirects_to_login() {
        let ds = mock::Client::default();
        let state = testutil::state(ds);
        let mut app = test::init_service(
            App::new()
                .data(state)
                .data(testutil::authenticator())
                .service(web::scope("/auth").configure(configure::<mock::Client>)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/auth/password_change/")
            .to_request();
        let resp = test::call_service(&mut app, req).await;
        assert_eq!(resp.status(), 302);
        assert_eq!(
            location(&resp),
            "/auth/login/?next=/auth/password_change/"
        );
    }

    #[actix_rt::test]
    async fn test_change_password_verifies_old_and_stores_new() {
        let ds = mock::Client::default();
        let user = ds.add_user_with_password("TestUser", "oldPassword1");
        let authenticator = testutil::authenticator();
        let cookie = testutil::session_cookie(&authenticator, &user);
        let state = testutil::state(ds.clone());
        let mut app = test::init_service(
            App::new()
                .data(state)
                .data(authenticator)
                .service(web::scope("/auth").configure(configure::<mock::Client>)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/auth/password_change/")
            .cookie(cookie)
            .set_json(&PasswordChangeForm {
                old_password: "oldPassword1".to_owned(),
                new_password1: "newPassword2".to_owned(),
                new_password2: "newPassword2".to_owned(),
            })
            .to_request();
        let resp = test::call_service(&mut app, req).await;
        assert_eq!(resp.status(), 302);
        assert_eq!(location(&resp), "/auth/password_change/done/");

        let stored = ds.user(user.id).unwrap();
        assert!(auth::verify_password("newPassword2", &stored.password_hash));
        assert!(!auth::verify_password("oldPassword1", &stored.password_hash));
    }

    #[actix_rt::test]
    async fn test_reset_flow_round_trip() {
        let ds = mock::Client::default();
        let user = ds.add_user_with_password("TestUser", "forgottenPass1");
        let authenticator = testutil::authenticator();
        let token = authenticator.issue_reset(user.id, &user.username).unwrap();
        let uid = base64::encode_config(user.id.as_bytes(), base64::URL_SAFE_NO_PAD);
        let state = testutil::state(ds.clone());
        let mut app = test::init_service(
            App::new()
                .data(state)
                .data(authenticator)
                .service(web::scope("/auth").configure(configure::<mock::Client>)),
        )
        .await;

        // The link checks out.
        let req = test::TestRequest::get()
            .uri(&format!("/auth/reset/{}/{}/", uid, token))
            .to_request();
        let body = test::read_response(&mut app, req).await;
        let link: ResetLink = serde_json::from_slice(&body).unwrap();
        assert!(link.valid);

        // A garbled token does not.
        let req = test::TestRequest::get()
            .uri(&format!("/auth/reset/{}/not-a-token/", uid))
            .to_request();
        let body = test::read_response(&mut app, req).await;
        let link: ResetLink = serde_json::from_slice(&body).unwrap();
        assert!(!link.valid);

        let req = test::TestRequest::post()
            .uri(&format!("/auth/reset/{}/{}/", uid, token))
            .set_json(&ResetConfirmForm {
                new_password1: "rememberedPass2".to_owned(),
                new_password2: "rememberedPass2".to_owned(),
            })
            .to_request();
        let resp = test::call_service(&mut app, req).await;
        assert_eq!(resp.status(), 302);
        assert_eq!(location(&resp), "/auth/reset/done/");

        let stored = ds.user(user.id).unwrap();
        assert!(auth::verify_password("rememberedPass2", &stored.password_hash));
    }

    #[actix_rt::test]
    async fn test_reset_request_never_reveals_accounts() {
        let ds = mock::Client::default();
        let state = testutil::state(ds);
        let mut app = test::init_service(
            App::new()
                .data(state)
                .data(testutil::authenticator())
                .service(web::scope("/auth").configure(configure::<mock::Client>)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/auth/password_reset/")
            .set_json(&PasswordResetForm {
                email: "nobody@example.com".to_owned(),
            })
            .to_request();
        let resp = test::call_service(&mut app, req).await;
        assert_eq!(resp.status(), 302);
        assert_eq!(location(&resp), "/auth/password_reset/done/");
    }
}
