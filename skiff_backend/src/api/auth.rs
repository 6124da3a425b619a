use super::templates::{LoginTemplate, RegisterTemplate};
use super::{render_html, ApiError, AppState, CurrentUser, SessionToken};
use crate::accounts::AccountService;
use crate::error::ForumError;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Extension, Form};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct CredentialsForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

pub(crate) async fn login_page(Extension(user): Extension<CurrentUser>) -> Response {
    if user.0.is_some() {
        return Redirect::to("/").into_response();
    }
    match render_html(LoginTemplate {
        viewer: None,
        error: None,
    }) {
        Ok(html) => html.into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn login_submit(
    State(state): State<AppState>,
    Extension(token): Extension<SessionToken>,
    Form(form): Form<CredentialsForm>,
) -> Response {
    let accounts = AccountService::new(state.database.clone());
    match accounts.login(&form.username, &form.password) {
        Ok(user) => {
            state.sessions.set_user(&token.0, Some(user.id));
            tracing::info!(user_id = user.id, username = %user.username, "user logged in");
            Redirect::to("/").into_response()
        }
        Err(err @ ForumError::Validation(_)) => {
            login_form_error(StatusCode::BAD_REQUEST, err.to_string())
        }
        Err(err @ ForumError::Unauthorized(_)) => {
            login_form_error(StatusCode::UNAUTHORIZED, err.to_string())
        }
        Err(err) => ApiError::page(err).into_response(),
    }
}

fn login_form_error(status: StatusCode, message: String) -> Response {
    match render_html(LoginTemplate {
        viewer: None,
        error: Some(message),
    }) {
        Ok(Html(html)) => (status, Html(html)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn logout(
    State(state): State<AppState>,
    Extension(token): Extension<SessionToken>,
) -> Redirect {
    state.sessions.set_user(&token.0, None);
    Redirect::to("/")
}

pub(crate) async fn register_page(Extension(user): Extension<CurrentUser>) -> Response {
    if user.0.is_some() {
        return Redirect::to("/").into_response();
    }
    match render_html(RegisterTemplate {
        viewer: None,
        error: None,
    }) {
        Ok(html) => html.into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn register_submit(
    State(state): State<AppState>,
    Extension(token): Extension<SessionToken>,
    Form(form): Form<CredentialsForm>,
) -> Response {
    let accounts = AccountService::new(state.database.clone());
    match accounts.register(&form.username, &form.password) {
        Ok(user) => {
            state.sessions.set_user(&token.0, Some(user.id));
            tracing::info!(user_id = user.id, username = %user.username, "user registered");
            Redirect::to("/").into_response()
        }
        Err(err @ ForumError::Validation(_)) => {
            let body = RegisterTemplate {
                viewer: None,
                error: Some(err.to_string()),
            };
            match render_html(body) {
                Ok(Html(html)) => (StatusCode::BAD_REQUEST, Html(html)).into_response(),
                Err(err) => err.into_response(),
            }
        }
        Err(err) => ApiError::page(err).into_response(),
    }
}
