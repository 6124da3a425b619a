use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    Url,
    Question,
}

impl PostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostType::Url => "url",
            PostType::Question => "question",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "url" => Some(PostType::Url),
            "question" => Some(PostType::Question),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub url: Option<String>,
    pub description: Option<String>,
    pub post_type: PostType,
    pub score: i64,
    pub created_at: String,
}

/// A post row joined with its author's username and comment count, the shape
/// the listing and detail queries produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostListingRecord {
    pub post: PostRecord,
    pub author: String,
    pub comment_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub parent_id: Option<i64>,
    pub content: String,
    pub score: i64,
    pub created_at: String,
}

/// A comment row joined with its author's username.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentListingRecord {
    pub comment: CommentRecord,
    pub author: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRecord {
    pub id: i64,
    pub user_id: i64,
    pub post_id: Option<i64>,
    pub comment_id: Option<i64>,
    pub created_at: String,
}

/// The two kinds of row a vote may reference; exactly one per vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTarget {
    Post(i64),
    Comment(i64),
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub user_id: i64,
    pub title: String,
    pub url: Option<String>,
    pub description: Option<String>,
    pub post_type: PostType,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: i64,
    pub user_id: i64,
    pub parent_id: Option<i64>,
    pub content: String,
    pub created_at: String,
}
