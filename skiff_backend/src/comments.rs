use crate::database::models::{CommentRecord, NewComment};
use crate::database::repositories::{CommentRepository, PostRepository, UserRepository};
use crate::database::Database;
use crate::error::ForumError;
use crate::utils::now_utc_iso;
use anyhow::anyhow;
use serde::Serialize;

#[derive(Clone)]
pub struct CommentService {
    database: Database,
}

/// A stored comment together with its author's username, the shape the JSON
/// response mode returns to AJAX callers.
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub parent_id: Option<i64>,
    pub author: String,
    pub content: String,
    pub score: i64,
    pub created_at: String,
}

impl CommentView {
    fn from_record(record: CommentRecord, author: String) -> Self {
        Self {
            id: record.id,
            post_id: record.post_id,
            user_id: record.user_id,
            parent_id: record.parent_id,
            author,
            content: record.content,
            score: record.score,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateCommentInput {
    pub post_id: i64,
    pub parent_id: Option<i64>,
    pub content: String,
}

impl CommentService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn create(&self, user_id: i64, input: CreateCommentInput) -> Result<CommentView, ForumError> {
        let content = input.content.trim().to_string();
        if content.is_empty() {
            return Err(ForumError::validation("comment content is required"));
        }

        let post_exists = self
            .database
            .with_repositories(|repos| repos.posts().exists(input.post_id))?;
        if !post_exists {
            return Err(ForumError::not_found("post not found"));
        }

        if let Some(parent_id) = input.parent_id {
            let parent = self
                .database
                .with_repositories(|repos| repos.comments().get(parent_id))?;
            match parent {
                Some(parent) if parent.post_id == input.post_id => {}
                _ => {
                    return Err(ForumError::validation(
                        "parent comment not found on this post",
                    ))
                }
            }
        }

        let record = NewComment {
            post_id: input.post_id,
            user_id,
            parent_id: input.parent_id,
            content,
            created_at: now_utc_iso(),
        };
        let view = self.database.with_repositories(|repos| {
            let id = repos.comments().create(&record)?;
            let stored = repos
                .comments()
                .get(id)?
                .ok_or_else(|| anyhow!("comment {id} vanished after insert"))?;
            let author = repos
                .users()
                .get(user_id)?
                .map(|user| user.username)
                .ok_or_else(|| anyhow!("comment author {user_id} missing"))?;
            Ok(CommentView::from_record(stored, author))
        })?;
        Ok(view)
    }

    pub fn update(&self, id: i64, user_id: i64, content: &str) -> Result<CommentView, ForumError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ForumError::validation("comment content is required"));
        }

        let affected = self
            .database
            .with_repositories(|repos| repos.comments().update_owned(id, user_id, content))?;
        if affected == 0 {
            let exists = self
                .database
                .with_repositories(|repos| repos.comments().exists(id))?;
            return Err(if exists {
                ForumError::forbidden("only the author may edit this comment")
            } else {
                ForumError::not_found("comment not found")
            });
        }

        let view = self.database.with_repositories(|repos| {
            let stored = repos
                .comments()
                .get(id)?
                .ok_or_else(|| anyhow!("comment {id} vanished after update"))?;
            let author = repos
                .users()
                .get(stored.user_id)?
                .map(|user| user.username)
                .ok_or_else(|| anyhow!("comment author missing"))?;
            Ok(CommentView::from_record(stored, author))
        })?;
        Ok(view)
    }

    /// Deletes an owned comment and returns the post id it belonged to, so
    /// the page response mode can redirect back to the thread.
    pub fn delete(&self, id: i64, user_id: i64) -> Result<i64, ForumError> {
        let existing = self
            .database
            .with_repositories(|repos| repos.comments().get(id))?
            .ok_or_else(|| ForumError::not_found("comment not found"))?;

        let affected = self
            .database
            .with_repositories(|repos| repos.comments().delete_owned(id, user_id))?;
        if affected == 0 {
            return Err(ForumError::forbidden(
                "only the author may delete this comment",
            ));
        }
        Ok(existing.post_id)
    }
}
