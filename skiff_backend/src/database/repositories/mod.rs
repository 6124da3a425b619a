mod comments;
mod posts;
mod users;
mod votes;

use super::models::{
    CommentListingRecord, CommentRecord, NewComment, NewPost, PostListingRecord, PostRecord,
    PostType, UserRecord, VoteRecord, VoteTarget,
};
use anyhow::Result;
use rusqlite::Connection;

pub trait UserRepository {
    fn create(&self, username: &str, password_hash: &str, created_at: &str) -> Result<UserRecord>;
    fn get(&self, id: i64) -> Result<Option<UserRecord>>;
    fn get_by_username(&self, username: &str) -> Result<Option<UserRecord>>;
}

pub trait PostRepository {
    fn create(&self, record: &NewPost) -> Result<i64>;
    fn get(&self, id: i64) -> Result<Option<PostRecord>>;
    /// Listing rows joined with author username and comment count, ordered by
    /// score descending then recency descending.
    fn list(
        &self,
        filter: Option<PostType>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PostListingRecord>>;
    fn get_listing(&self, id: i64) -> Result<Option<PostListingRecord>>;
    /// Deletes only when `user_id` owns the row; returns affected row count.
    fn delete_owned(&self, id: i64, user_id: i64) -> Result<usize>;
    fn exists(&self, id: i64) -> Result<bool>;
    fn adjust_score(&self, id: i64, delta: i64) -> Result<()>;
}

pub trait CommentRepository {
    fn create(&self, record: &NewComment) -> Result<i64>;
    fn get(&self, id: i64) -> Result<Option<CommentRecord>>;
    /// Comment rows for one post joined with author username, ordered by
    /// score descending then creation time ascending.
    fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentListingRecord>>;
    fn update_owned(&self, id: i64, user_id: i64, content: &str) -> Result<usize>;
    fn delete_owned(&self, id: i64, user_id: i64) -> Result<usize>;
    fn exists(&self, id: i64) -> Result<bool>;
    fn adjust_score(&self, id: i64, delta: i64) -> Result<()>;
}

pub trait VoteRepository {
    fn find(&self, user_id: i64, target: VoteTarget) -> Result<Option<VoteRecord>>;
    fn insert(&self, user_id: i64, target: VoteTarget, created_at: &str) -> Result<i64>;
    fn delete(&self, vote_id: i64) -> Result<()>;
    fn count_for(&self, target: VoteTarget) -> Result<i64>;
}

pub struct SqliteRepositories<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRepositories<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn users(&self) -> impl UserRepository + '_ {
        users::SqliteUserRepository { conn: self.conn }
    }

    pub fn posts(&self) -> impl PostRepository + '_ {
        posts::SqlitePostRepository { conn: self.conn }
    }

    pub fn comments(&self) -> impl CommentRepository + '_ {
        comments::SqliteCommentRepository { conn: self.conn }
    }

    pub fn votes(&self) -> impl VoteRepository + '_ {
        votes::SqliteVoteRepository { conn: self.conn }
    }

    pub fn conn(&self) -> &'conn Connection {
        self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MIGRATIONS;

    fn setup_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("in-memory db");
        conn.execute_batch(MIGRATIONS).expect("migrations");
        conn
    }

    fn insert_user(repos: &SqliteRepositories<'_>, username: &str) -> UserRecord {
        repos
            .users()
            .create(username, "$argon2id$stub", "2024-01-01T00:00:00Z")
            .expect("create user")
    }

    fn insert_post(repos: &SqliteRepositories<'_>, user_id: i64, title: &str) -> i64 {
        repos
            .posts()
            .create(&NewPost {
                user_id,
                title: title.into(),
                url: Some("https://example.com".into()),
                description: None,
                post_type: PostType::Url,
                created_at: "2024-01-01T00:00:00Z".into(),
            })
            .expect("create post")
    }

    #[test]
    fn user_repository_roundtrip() {
        let conn = setup_conn();
        let repos = SqliteRepositories::new(&conn);

        let user = insert_user(&repos, "alice");
        assert_eq!(user.username, "alice");

        let by_id = repos.users().get(user.id).unwrap().unwrap();
        assert_eq!(by_id.username, "alice");

        let by_name = repos.users().get_by_username("alice").unwrap().unwrap();
        assert_eq!(by_name.id, user.id);

        assert!(repos.users().get_by_username("bob").unwrap().is_none());
    }

    #[test]
    fn duplicate_username_is_rejected_by_schema() {
        let conn = setup_conn();
        let repos = SqliteRepositories::new(&conn);
        insert_user(&repos, "alice");
        let err = repos
            .users()
            .create("alice", "$argon2id$other", "2024-01-02T00:00:00Z");
        assert!(err.is_err());
    }

    #[test]
    fn post_listing_joins_author_and_comment_count() {
        let conn = setup_conn();
        let repos = SqliteRepositories::new(&conn);
        let user = insert_user(&repos, "alice");
        let post_id = insert_post(&repos, user.id, "First");

        repos
            .comments()
            .create(&NewComment {
                post_id,
                user_id: user.id,
                parent_id: None,
                content: "hi".into(),
                created_at: "2024-01-01T00:01:00Z".into(),
            })
            .unwrap();

        let listing = repos.posts().list(None, 30, 0).unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].author, "alice");
        assert_eq!(listing[0].comment_count, 1);

        let detail = repos.posts().get_listing(post_id).unwrap().unwrap();
        assert_eq!(detail.post.title, "First");
    }

    #[test]
    fn post_list_orders_by_score_then_recency_and_paginates() {
        let conn = setup_conn();
        let repos = SqliteRepositories::new(&conn);
        let user = insert_user(&repos, "alice");
        let older = insert_post(&repos, user.id, "older");
        conn.execute(
            "UPDATE posts SET created_at = '2024-01-01T00:00:00Z' WHERE id = ?1",
            [older],
        )
        .unwrap();
        let newer = insert_post(&repos, user.id, "newer");
        conn.execute(
            "UPDATE posts SET created_at = '2024-01-02T00:00:00Z' WHERE id = ?1",
            [newer],
        )
        .unwrap();
        let scored = insert_post(&repos, user.id, "scored");
        repos.posts().adjust_score(scored, 5).unwrap();

        let listing = repos.posts().list(None, 30, 0).unwrap();
        let titles: Vec<_> = listing.iter().map(|p| p.post.title.as_str()).collect();
        assert_eq!(titles, vec!["scored", "newer", "older"]);

        let second_page = repos.posts().list(None, 2, 2).unwrap();
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].post.title, "older");
    }

    #[test]
    fn post_list_filters_by_type() {
        let conn = setup_conn();
        let repos = SqliteRepositories::new(&conn);
        let user = insert_user(&repos, "alice");
        insert_post(&repos, user.id, "a link");
        repos
            .posts()
            .create(&NewPost {
                user_id: user.id,
                title: "a question".into(),
                url: None,
                description: Some("why?".into()),
                post_type: PostType::Question,
                created_at: "2024-01-01T00:00:00Z".into(),
            })
            .unwrap();

        let urls = repos.posts().list(Some(PostType::Url), 30, 0).unwrap();
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].post.title, "a link");

        let questions = repos.posts().list(Some(PostType::Question), 30, 0).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].post.post_type, PostType::Question);
    }

    #[test]
    fn delete_owned_requires_matching_owner() {
        let conn = setup_conn();
        let repos = SqliteRepositories::new(&conn);
        let alice = insert_user(&repos, "alice");
        let mallory = insert_user(&repos, "mallory");
        let post_id = insert_post(&repos, alice.id, "mine");

        let affected = repos.posts().delete_owned(post_id, mallory.id).unwrap();
        assert_eq!(affected, 0);
        assert!(repos.posts().exists(post_id).unwrap());

        let affected = repos.posts().delete_owned(post_id, alice.id).unwrap();
        assert_eq!(affected, 1);
        assert!(!repos.posts().exists(post_id).unwrap());
    }

    #[test]
    fn comment_listing_orders_by_score_then_time() {
        let conn = setup_conn();
        let repos = SqliteRepositories::new(&conn);
        let user = insert_user(&repos, "alice");
        let post_id = insert_post(&repos, user.id, "post");

        let first = repos
            .comments()
            .create(&NewComment {
                post_id,
                user_id: user.id,
                parent_id: None,
                content: "first".into(),
                created_at: "2024-01-01T00:00:01Z".into(),
            })
            .unwrap();
        let second = repos
            .comments()
            .create(&NewComment {
                post_id,
                user_id: user.id,
                parent_id: None,
                content: "second".into(),
                created_at: "2024-01-01T00:00:02Z".into(),
            })
            .unwrap();
        repos.comments().adjust_score(second, 3).unwrap();

        let rows = repos.comments().list_for_post(post_id).unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.comment.id).collect();
        assert_eq!(ids, vec![second, first]);
        assert_eq!(rows[0].author, "alice");
    }

    #[test]
    fn vote_repository_enforces_mutual_exclusion() {
        let conn = setup_conn();
        let repos = SqliteRepositories::new(&conn);
        let user = insert_user(&repos, "alice");
        let post_id = insert_post(&repos, user.id, "post");

        repos
            .votes()
            .insert(user.id, VoteTarget::Post(post_id), "2024-01-01T00:00:00Z")
            .unwrap();
        assert_eq!(
            repos.votes().count_for(VoteTarget::Post(post_id)).unwrap(),
            1
        );

        let vote = repos
            .votes()
            .find(user.id, VoteTarget::Post(post_id))
            .unwrap()
            .unwrap();
        assert_eq!(vote.post_id, Some(post_id));
        assert_eq!(vote.comment_id, None);

        repos.votes().delete(vote.id).unwrap();
        assert_eq!(
            repos.votes().count_for(VoteTarget::Post(post_id)).unwrap(),
            0
        );

        // a row claiming both targets violates the CHECK constraint
        let bad = conn.execute(
            "INSERT INTO votes (user_id, post_id, comment_id, created_at) VALUES (?1, ?2, ?2, 'now')",
            [user.id, post_id],
        );
        assert!(bad.is_err());
    }
}
