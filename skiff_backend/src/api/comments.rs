use super::{require_user, ApiError, AppState, CurrentUser, ResponseMode};
use crate::comments::{CommentService, CreateCommentInput};
use crate::database::models::VoteTarget;
use crate::error::ForumError;
use crate::utils::non_empty;
use crate::votes::VoteService;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Extension, Form, Json};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub(crate) struct CommentForm {
    #[serde(default)]
    content: String,
    /// Arrives as a (possibly blank) form field; blank means top-level.
    #[serde(default)]
    parent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateCommentForm {
    #[serde(default)]
    content: String,
}

fn parse_parent_id(raw: Option<String>, mode: ResponseMode) -> Result<Option<i64>, ApiError> {
    match non_empty(raw) {
        None => Ok(None),
        Some(value) => value
            .parse::<i64>()
            .map(Some)
            .map_err(|_| ApiError::new(mode, ForumError::validation("invalid parent comment id"))),
    }
}

pub(crate) async fn create_comment(
    State(state): State<AppState>,
    mode: ResponseMode,
    Extension(user): Extension<CurrentUser>,
    Path(post_id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> Result<Response, ApiError> {
    let user = require_user(mode, &user)?;
    let parent_id = parse_parent_id(form.parent_id, mode)?;

    let comment = CommentService::new(state.database.clone())
        .create(
            user.id,
            CreateCommentInput {
                post_id,
                parent_id,
                content: form.content,
            },
        )
        .map_err(|err| ApiError::new(mode, err))?;
    tracing::info!(comment_id = comment.id, post_id, user_id = user.id, "comment created");

    Ok(match mode {
        ResponseMode::Json => (
            StatusCode::CREATED,
            Json(json!({ "success": true, "comment": comment })),
        )
            .into_response(),
        ResponseMode::Page => Redirect::to(&format!("/post/{post_id}")).into_response(),
    })
}

pub(crate) async fn update_comment(
    State(state): State<AppState>,
    mode: ResponseMode,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Form(form): Form<UpdateCommentForm>,
) -> Result<Response, ApiError> {
    let user = require_user(mode, &user)?;
    let comment = CommentService::new(state.database.clone())
        .update(id, user.id, &form.content)
        .map_err(|err| ApiError::new(mode, err))?;

    Ok(match mode {
        ResponseMode::Json => {
            Json(json!({ "success": true, "comment": comment })).into_response()
        }
        ResponseMode::Page => {
            Redirect::to(&format!("/post/{}", comment.post_id)).into_response()
        }
    })
}

pub(crate) async fn delete_comment(
    State(state): State<AppState>,
    mode: ResponseMode,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let user = require_user(mode, &user)?;
    let post_id = CommentService::new(state.database.clone())
        .delete(id, user.id)
        .map_err(|err| ApiError::new(mode, err))?;
    tracing::info!(comment_id = id, user_id = user.id, "comment deleted");

    Ok(match mode {
        ResponseMode::Json => Json(json!({ "success": true })).into_response(),
        ResponseMode::Page => Redirect::to(&format!("/post/{post_id}")).into_response(),
    })
}

pub(crate) async fn vote_comment(
    State(state): State<AppState>,
    mode: ResponseMode,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let user = require_user(mode, &user)?;
    let delta = VoteService::new(state.database.clone())
        .toggle(user.id, VoteTarget::Comment(id))
        .map_err(|err| ApiError::new(mode, err))?;

    Ok(match mode {
        ResponseMode::Json => Json(json!({ "success": true, "delta": delta })).into_response(),
        ResponseMode::Page => {
            // back to the thread the comment lives on
            let post_id = state
                .database
                .with_repositories(|repos| {
                    use crate::database::repositories::CommentRepository;
                    Ok(repos.comments().get(id)?.map(|c| c.post_id))
                })
                .ok()
                .flatten();
            match post_id {
                Some(post_id) => Redirect::to(&format!("/post/{post_id}")).into_response(),
                None => Redirect::to("/").into_response(),
            }
        }
    })
}
