use super::templates::{CommentItem, NewPostTemplate, PostDetailTemplate, PostItem, PostListTemplate};
use super::{render_html, require_user, ApiError, AppState, CurrentUser, ResponseMode};
use crate::database::models::{PostType, VoteTarget};
use crate::error::ForumError;
use crate::posts::{CreatePostInput, PostService, PAGE_SIZE};
use crate::threading::flatten_comment_tree;
use crate::utils::non_empty;
use crate::votes::VoteService;
use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Extension, Form, Json};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery {
    #[serde(default)]
    page: Option<usize>,
}

pub(crate) async fn list_top(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> Result<Html<String>, ApiError> {
    render_listing(&state, &user, None, "Top", "/", query.page)
}

pub(crate) async fn list_urls(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> Result<Html<String>, ApiError> {
    render_listing(&state, &user, Some(PostType::Url), "Links", "/urls", query.page)
}

pub(crate) async fn list_questions(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> Result<Html<String>, ApiError> {
    render_listing(
        &state,
        &user,
        Some(PostType::Question),
        "Questions",
        "/questions",
        query.page,
    )
}

fn render_listing(
    state: &AppState,
    user: &CurrentUser,
    filter: Option<PostType>,
    heading: &str,
    base_path: &str,
    page: Option<usize>,
) -> Result<Html<String>, ApiError> {
    let page = page.unwrap_or(1).max(1);
    let listing = PostService::new(state.database.clone())
        .list(filter, page)
        .map_err(ApiError::page)?;

    render_html(PostListTemplate {
        viewer: user.0.as_ref().map(|u| u.username.clone()),
        heading: heading.to_string(),
        base_path: base_path.to_string(),
        posts: listing.posts.iter().map(PostItem::listing).collect(),
        start_index: (listing.page - 1) * PAGE_SIZE + 1,
        has_prev: listing.page > 1,
        has_next: listing.has_next,
        prev_page: listing.page.saturating_sub(1),
        next_page: listing.page + 1,
    })
}

pub(crate) async fn new_post_page(
    mode: ResponseMode,
    Extension(user): Extension<CurrentUser>,
) -> Result<Html<String>, ApiError> {
    let user = require_user(mode, &user)?;
    render_html(NewPostTemplate {
        viewer: Some(user.username),
        error: None,
    })
}

#[derive(Debug, Deserialize)]
pub(crate) struct NewPostForm {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    post_type: Option<String>,
}

pub(crate) async fn create_post(
    State(state): State<AppState>,
    mode: ResponseMode,
    Extension(user): Extension<CurrentUser>,
    Form(form): Form<NewPostForm>,
) -> Result<Redirect, ApiError> {
    let user = require_user(mode, &user)?;
    let post_type = non_empty(form.post_type)
        .and_then(|raw| PostType::parse(&raw))
        .ok_or_else(|| {
            ApiError::new(mode, ForumError::validation("a valid post type is required"))
        })?;

    let id = PostService::new(state.database.clone())
        .create(
            user.id,
            CreatePostInput {
                title: form.title,
                url: non_empty(form.url),
                description: non_empty(form.description),
                post_type,
            },
        )
        .map_err(|err| ApiError::new(mode, err))?;
    tracing::info!(post_id = id, user_id = user.id, "post created");
    Ok(Redirect::to(&format!("/post/{id}")))
}

pub(crate) async fn post_detail(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Html<String>, ApiError> {
    let details = PostService::new(state.database.clone())
        .get(id)
        .map_err(ApiError::page)?;
    let viewer_id = user.0.as_ref().map(|u| u.id);
    let comments = flatten_comment_tree(&details.comments)
        .iter()
        .map(|flat| CommentItem::from_flat(flat, viewer_id))
        .collect();

    render_html(PostDetailTemplate {
        viewer: user.0.as_ref().map(|u| u.username.clone()),
        can_delete: viewer_id == Some(details.post.user_id),
        post: PostItem::detail(&details.post),
        comments,
    })
}

pub(crate) async fn delete_post(
    State(state): State<AppState>,
    mode: ResponseMode,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let user = require_user(mode, &user)?;
    PostService::new(state.database.clone())
        .delete(id, user.id)
        .map_err(|err| ApiError::new(mode, err))?;
    tracing::info!(post_id = id, user_id = user.id, "post deleted");

    Ok(match mode {
        ResponseMode::Json => Json(json!({ "success": true })).into_response(),
        ResponseMode::Page => Redirect::to("/").into_response(),
    })
}

pub(crate) async fn vote_post(
    State(state): State<AppState>,
    mode: ResponseMode,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let user = require_user(mode, &user)?;
    let delta = VoteService::new(state.database.clone())
        .toggle(user.id, VoteTarget::Post(id))
        .map_err(|err| ApiError::new(mode, err))?;

    Ok(match mode {
        ResponseMode::Json => Json(json!({ "success": true, "delta": delta })).into_response(),
        ResponseMode::Page => Redirect::to(&format!("/post/{id}")).into_response(),
    })
}
