
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::json;

use crate::session::{AdminCredentials, AdminSession, CookiePolicy, SessionCodec};

pub const LOGIN_PAGE: &str = "/admin/login";
pub const LOGIN_FAILED_PAGE: &str = "/admin/login?e=1";
pub const AFTER_LOGIN_PAGE: &str = "/admin/dishes";

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

pub async fn login(
    State(admin): State<AdminCredentials>,
    State(codec): State<SessionCodec>,
    State(cookies): State<CookiePolicy>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> (CookieJar, Redirect) {
    if !admin.matches(&form.email, &form.password) {
        tracing::warn!("failed login for '{}'", form.email);
        return (jar, Redirect::to(LOGIN_FAILED_PAGE));
    }

    tracing::info!("{} logged in", form.email);
    let token = codec.issue(&form.email);
    (jar.add(cookies.session_cookie(token)), Redirect::to(AFTER_LOGIN_PAGE))
}

pub async fn logout(
    State(cookies): State<CookiePolicy>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    (jar.add(cookies.removal_cookie()), Redirect::to(LOGIN_PAGE))
}

pub async fn end_session(
    State(cookies): State<CookiePolicy>,
    jar: CookieJar,
) -> (CookieJar, StatusCode) {
    (jar.add(cookies.removal_cookie()), StatusCode::NO_CONTENT)
}

/// 200 with the principal if the cookie holds a valid session, 401 otherwise.
pub async fn session(session: Option<AdminSession>) -> Response {
    match session {
        Some(AdminSession(session)) => {
            Json(json!({
                "ok": true,
                "email": session.email,
                "expiresAt": session.expires_at,
            })).into_response()
        },
        None => (StatusCode::UNAUTHORIZED, Json(json!({ "ok": false }))).into_response(),
    }
}
