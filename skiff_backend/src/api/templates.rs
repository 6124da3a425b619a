//! Askama templates for the server-rendered navigational pages.

use crate::posts::PostSummary;
use crate::threading::FlatComment;
use crate::utils::preview;
use askama::Template;
use chrono::DateTime;

/// Listing previews cut descriptions down to this many characters.
const PREVIEW_CHARS: usize = 100;

/// Indentation applied per nesting level when rendering a comment thread.
const INDENT_PX: usize = 24;

fn display_date(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.format("%b %e, %Y").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// One post row as the pages show it.
pub(crate) struct PostItem {
    pub id: i64,
    pub title: String,
    pub url: Option<String>,
    pub description: Option<String>,
    pub score: i64,
    pub author: String,
    pub comment_count: i64,
    pub created_at: String,
}

impl PostItem {
    /// Listing shape: description reduced to a preview.
    pub fn listing(summary: &PostSummary) -> Self {
        let mut item = Self::detail(summary);
        item.description = summary
            .description
            .as_deref()
            .map(|text| preview(text, PREVIEW_CHARS));
        item
    }

    /// Detail shape: full description.
    pub fn detail(summary: &PostSummary) -> Self {
        Self {
            id: summary.id,
            title: summary.title.clone(),
            url: summary.url.clone(),
            description: summary.description.clone(),
            score: summary.score,
            author: summary.author.clone(),
            comment_count: summary.comment_count,
            created_at: display_date(&summary.created_at),
        }
    }
}

/// One comment row in display order, with its indentation precomputed.
pub(crate) struct CommentItem {
    pub id: i64,
    pub author: String,
    pub content: String,
    pub score: i64,
    pub created_at: String,
    pub indent_px: usize,
    pub editable: bool,
}

impl CommentItem {
    pub fn from_flat(flat: &FlatComment, viewer_id: Option<i64>) -> Self {
        Self {
            id: flat.id,
            author: flat.author.clone(),
            content: flat.content.clone(),
            score: flat.score,
            created_at: display_date(&flat.created_at),
            indent_px: flat.depth * INDENT_PX,
            editable: viewer_id == Some(flat.user_id),
        }
    }
}

#[derive(Template)]
#[template(path = "post_list.html")]
pub(crate) struct PostListTemplate {
    pub viewer: Option<String>,
    pub heading: String,
    pub base_path: String,
    pub posts: Vec<PostItem>,
    pub start_index: usize,
    pub has_prev: bool,
    pub has_next: bool,
    pub prev_page: usize,
    pub next_page: usize,
}

#[derive(Template)]
#[template(path = "post_detail.html")]
pub(crate) struct PostDetailTemplate {
    pub viewer: Option<String>,
    pub post: PostItem,
    pub can_delete: bool,
    pub comments: Vec<CommentItem>,
}

#[derive(Template)]
#[template(path = "post_new.html")]
pub(crate) struct NewPostTemplate {
    pub viewer: Option<String>,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "login.html")]
pub(crate) struct LoginTemplate {
    pub viewer: Option<String>,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "register.html")]
pub(crate) struct RegisterTemplate {
    pub viewer: Option<String>,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "error.html")]
pub(crate) struct ErrorTemplate {
    pub viewer: Option<String>,
    pub message: String,
}
