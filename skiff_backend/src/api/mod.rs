mod auth;
mod comments;
mod posts;
mod templates;

use crate::config::SkiffConfig;
use crate::database::models::UserRecord;
use crate::database::repositories::UserRepository;
use crate::database::Database;
use crate::error::ForumError;
use crate::session::{SessionStore, SESSION_COOKIE};
use anyhow::Result;
use askama::Template;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub config: SkiffConfig,
    pub database: Database,
    pub sessions: Arc<dyn SessionStore>,
}

/// How this request wants its response represented, resolved once by content
/// negotiation instead of ad-hoc header checks inside handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    Page,
    Json,
}

impl ResponseMode {
    fn negotiate(headers: &HeaderMap) -> Self {
        let requested_with = headers
            .get("x-requested-with")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.eq_ignore_ascii_case("xmlhttprequest"))
            .unwrap_or(false);
        if requested_with {
            return ResponseMode::Json;
        }
        let accepts_json = headers
            .get(header::ACCEPT)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.contains("application/json"))
            .unwrap_or(false);
        if accepts_json {
            ResponseMode::Json
        } else {
            ResponseMode::Page
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for ResponseMode
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ResponseMode::negotiate(&parts.headers))
    }
}

/// Opaque session token for the current request, inserted by the session
/// middleware.
#[derive(Clone)]
pub(crate) struct SessionToken(pub String);

/// The authenticated user attached to the current session, if any.
#[derive(Clone)]
pub(crate) struct CurrentUser(pub Option<UserRecord>);

#[derive(Debug)]
pub struct ApiError {
    mode: ResponseMode,
    kind: ForumError,
}

impl ApiError {
    pub fn new(mode: ResponseMode, kind: ForumError) -> Self {
        Self { mode, kind }
    }

    pub fn page(kind: ForumError) -> Self {
        Self::new(ResponseMode::Page, kind)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self.kind {
            ForumError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ForumError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ForumError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ForumError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ForumError::Internal(err) => {
                tracing::error!(error = ?err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "something went wrong".to_string(),
                )
            }
        };
        match self.mode {
            ResponseMode::Json => (status, Json(ErrorBody { error: message })).into_response(),
            ResponseMode::Page => {
                let template = templates::ErrorTemplate {
                    viewer: None,
                    message: message.clone(),
                };
                match template.render() {
                    Ok(html) => (status, Html(html)).into_response(),
                    Err(err) => {
                        tracing::error!(error = %err, "failed to render error page");
                        (status, message).into_response()
                    }
                }
            }
        }
    }
}

/// Renders an askama template into a page response.
pub(crate) fn render_html<T: Template>(template: T) -> Result<Html<String>, ApiError> {
    template.render().map(Html).map_err(|err| {
        ApiError::page(ForumError::Internal(anyhow::anyhow!(
            "template rendering failed: {err}"
        )))
    })
}

/// Rejects the request unless the session carries an authenticated user.
pub(crate) fn require_user(
    mode: ResponseMode,
    user: &CurrentUser,
) -> Result<UserRecord, ApiError> {
    user.0
        .clone()
        .ok_or_else(|| ApiError::new(mode, ForumError::unauthorized("login required")))
}

/// Ensures every request runs under a live session: a known unexpired token
/// slides its expiry, anything else gets a freshly minted session and a
/// Set-Cookie on the way out. Unknown and expired tokens are handled exactly
/// like an absent one.
async fn session_layer(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let presented = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    let (token, minted) = match presented {
        Some(token) if state.sessions.load(&token).is_some() => {
            state.sessions.touch(&token);
            (token, false)
        }
        _ => (state.sessions.create(), true),
    };

    let user = resolve_user(&state, &token);
    request.extensions_mut().insert(SessionToken(token.clone()));
    request.extensions_mut().insert(CurrentUser(user));

    let response = next.run(request).await;
    if minted {
        let cookie = Cookie::build((SESSION_COOKIE, token))
            .http_only(true)
            .path("/")
            .max_age(time::Duration::seconds(state.config.session.ttl_secs));
        (jar.add(cookie), response).into_response()
    } else {
        response
    }
}

fn resolve_user(state: &AppState, token: &str) -> Option<UserRecord> {
    let user_id = state.sessions.load(token)?.user_id?;
    match state
        .database
        .with_repositories(|repos| repos.users().get(user_id))
    {
        Ok(user) => user,
        Err(err) => {
            tracing::error!(error = ?err, user_id, "failed to resolve session user");
            None
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/", get(posts::list_top))
        .route("/urls", get(posts::list_urls))
        .route("/questions", get(posts::list_questions))
        .route("/login", get(auth::login_page).post(auth::login_submit))
        .route("/logout", get(auth::logout))
        .route(
            "/register",
            get(auth::register_page).post(auth::register_submit),
        )
        .route("/post/new", get(posts::new_post_page))
        .route("/post", post(posts::create_post))
        .route("/post/:id", get(posts::post_detail))
        .route("/post/:id/delete", post(posts::delete_post))
        .route("/post/:id/vote", post(posts::vote_post))
        .route("/post/:id/comment", post(comments::create_comment))
        .route("/comment/:id/delete", post(comments::delete_comment))
        .route("/comment/:id/update", post(comments::update_comment))
        .route("/comment/:id/vote", post(comments::vote_comment))
        .layer(middleware::from_fn_with_state(state.clone(), session_layer))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Tries to bind to the given port, or finds the next available port
async fn find_available_port(start_port: u16) -> Result<(TcpListener, u16)> {
    const MAX_PORT_ATTEMPTS: u16 = 100;

    for offset in 0..MAX_PORT_ATTEMPTS {
        let port = start_port + offset;
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok((listener, port)),
            Err(e) => {
                if offset == 0 {
                    tracing::debug!(port, error = %e, "port in use, trying next port");
                }
                continue;
            }
        }
    }

    anyhow::bail!(
        "could not find available port in range {}-{}",
        start_port,
        start_port + MAX_PORT_ATTEMPTS - 1
    )
}

pub async fn serve_http(
    config: SkiffConfig,
    database: Database,
    sessions: Arc<dyn SessionStore>,
) -> Result<()> {
    let state = AppState {
        config: config.clone(),
        database,
        sessions,
    };
    let router = build_router(state);

    let (listener, actual_port) = find_available_port(config.http_port).await?;
    let addr = SocketAddr::from(([0, 0, 0, 0], actual_port));

    if actual_port != config.http_port {
        tracing::warn!(
            requested_port = config.http_port,
            actual_port,
            "configured port was in use, bound to next available port"
        );
    }

    tracing::info!(?addr, "HTTP server listening");
    axum::serve(listener, router.into_make_service()).await?;
    Ok(())
}
