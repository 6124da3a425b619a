use crate::database::models::{VoteRecord, VoteTarget};
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(super) struct SqliteVoteRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

fn map_vote(row: &Row<'_>) -> rusqlite::Result<VoteRecord> {
    Ok(VoteRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        post_id: row.get(2)?,
        comment_id: row.get(3)?,
        created_at: row.get(4)?,
    })
}

impl<'conn> super::VoteRepository for SqliteVoteRepository<'conn> {
    fn find(&self, user_id: i64, target: VoteTarget) -> Result<Option<VoteRecord>> {
        let query = match target {
            VoteTarget::Post(_) => {
                r#"
                SELECT id, user_id, post_id, comment_id, created_at
                FROM votes
                WHERE user_id = ?1 AND post_id = ?2
                "#
            }
            VoteTarget::Comment(_) => {
                r#"
                SELECT id, user_id, post_id, comment_id, created_at
                FROM votes
                WHERE user_id = ?1 AND comment_id = ?2
                "#
            }
        };
        let target_id = match target {
            VoteTarget::Post(id) | VoteTarget::Comment(id) => id,
        };
        Ok(self
            .conn
            .query_row(query, params![user_id, target_id], map_vote)
            .optional()?)
    }

    fn insert(&self, user_id: i64, target: VoteTarget, created_at: &str) -> Result<i64> {
        let (post_id, comment_id) = match target {
            VoteTarget::Post(id) => (Some(id), None),
            VoteTarget::Comment(id) => (None, Some(id)),
        };
        self.conn.execute(
            r#"
            INSERT INTO votes (user_id, post_id, comment_id, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![user_id, post_id, comment_id, created_at],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn delete(&self, vote_id: i64) -> Result<()> {
        self.conn.execute(
            r#"
            DELETE FROM votes
            WHERE id = ?1
            "#,
            params![vote_id],
        )?;
        Ok(())
    }

    fn count_for(&self, target: VoteTarget) -> Result<i64> {
        let query = match target {
            VoteTarget::Post(_) => "SELECT COUNT(*) FROM votes WHERE post_id = ?1",
            VoteTarget::Comment(_) => "SELECT COUNT(*) FROM votes WHERE comment_id = ?1",
        };
        let target_id = match target {
            VoteTarget::Post(id) | VoteTarget::Comment(id) => id,
        };
        let count: i64 = self
            .conn
            .query_row(query, params![target_id], |row| row.get(0))?;
        Ok(count)
    }
}
