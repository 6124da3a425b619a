use crate::database::models::{NewPost, PostListingRecord, PostType};
use crate::database::repositories::{CommentRepository, PostRepository};
use crate::database::Database;
use crate::error::ForumError;
use crate::threading::{build_comment_tree, CommentNode};
use crate::utils::now_utc_iso;
use serde::{Deserialize, Serialize};

/// Listing page size.
pub const PAGE_SIZE: usize = 30;

#[derive(Clone)]
pub struct PostService {
    database: Database,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub url: Option<String>,
    pub description: Option<String>,
    pub post_type: PostType,
    pub score: i64,
    pub created_at: String,
    pub author: String,
    pub comment_count: i64,
}

impl PostSummary {
    fn from_record(record: PostListingRecord) -> Self {
        Self {
            id: record.post.id,
            user_id: record.post.user_id,
            title: record.post.title,
            url: record.post.url,
            description: record.post.description,
            post_type: record.post.post_type,
            score: record.post.score,
            created_at: record.post.created_at,
            author: record.author,
            comment_count: record.comment_count,
        }
    }
}

/// A post page: the post itself plus its reply forest.
#[derive(Debug, Clone, Serialize)]
pub struct PostDetails {
    pub post: PostSummary,
    pub comments: Vec<CommentNode>,
}

#[derive(Debug, Clone)]
pub struct CreatePostInput {
    pub title: String,
    pub url: Option<String>,
    pub description: Option<String>,
    pub post_type: PostType,
}

/// One page of listings plus whether a further page exists.
#[derive(Debug, Clone)]
pub struct PostPage {
    pub posts: Vec<PostSummary>,
    pub page: usize,
    pub has_next: bool,
}

impl PostService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn list(&self, filter: Option<PostType>, page: usize) -> Result<PostPage, ForumError> {
        let page = page.max(1);
        let offset = (page - 1) * PAGE_SIZE;
        let records = self
            .database
            .with_repositories(|repos| repos.posts().list(filter, PAGE_SIZE + 1, offset))?;
        let has_next = records.len() > PAGE_SIZE;
        let posts = records
            .into_iter()
            .take(PAGE_SIZE)
            .map(PostSummary::from_record)
            .collect();
        Ok(PostPage {
            posts,
            page,
            has_next,
        })
    }

    pub fn get(&self, id: i64) -> Result<PostDetails, ForumError> {
        let listing = self
            .database
            .with_repositories(|repos| repos.posts().get_listing(id))?
            .ok_or_else(|| ForumError::not_found("post not found"))?;
        let comments = self
            .database
            .with_repositories(|repos| repos.comments().list_for_post(id))?;
        Ok(PostDetails {
            post: PostSummary::from_record(listing),
            comments: build_comment_tree(comments),
        })
    }

    pub fn create(&self, user_id: i64, input: CreatePostInput) -> Result<i64, ForumError> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(ForumError::validation("title is required"));
        }
        if input.post_type == PostType::Url && input.url.as_deref().map_or(true, str::is_empty) {
            return Err(ForumError::validation("url posts require a url"));
        }

        let record = NewPost {
            user_id,
            title,
            url: input.url,
            description: input.description,
            post_type: input.post_type,
            created_at: now_utc_iso(),
        };
        let id = self
            .database
            .with_repositories(|repos| repos.posts().create(&record))?;
        Ok(id)
    }

    /// Deletes the post when `user_id` owns it. Zero affected rows with the
    /// row still present means someone else's post, which is forbidden, not
    /// absent.
    pub fn delete(&self, id: i64, user_id: i64) -> Result<(), ForumError> {
        let affected = self
            .database
            .with_repositories(|repos| repos.posts().delete_owned(id, user_id))?;
        if affected == 0 {
            let exists = self
                .database
                .with_repositories(|repos| repos.posts().exists(id))?;
            return Err(if exists {
                ForumError::forbidden("only the author may delete this post")
            } else {
                ForumError::not_found("post not found")
            });
        }
        Ok(())
    }
}
