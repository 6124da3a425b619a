use crate::database::models::{CommentListingRecord, CommentRecord, NewComment};
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(super) struct SqliteCommentRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

fn map_comment(row: &Row<'_>) -> rusqlite::Result<CommentRecord> {
    Ok(CommentRecord {
        id: row.get(0)?,
        post_id: row.get(1)?,
        user_id: row.get(2)?,
        parent_id: row.get(3)?,
        content: row.get(4)?,
        score: row.get(5)?,
        created_at: row.get(6)?,
    })
}

impl<'conn> super::CommentRepository for SqliteCommentRepository<'conn> {
    fn create(&self, record: &NewComment) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO comments (post_id, user_id, parent_id, content, score, created_at)
            VALUES (?1, ?2, ?3, ?4, 0, ?5)
            "#,
            params![
                record.post_id,
                record.user_id,
                record.parent_id,
                record.content,
                record.created_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get(&self, id: i64) -> Result<Option<CommentRecord>> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT id, post_id, user_id, parent_id, content, score, created_at
                FROM comments
                WHERE id = ?1
                "#,
                params![id],
                map_comment,
            )
            .optional()?)
    }

    fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentListingRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT c.id, c.post_id, c.user_id, c.parent_id, c.content, c.score, c.created_at,
                   u.username
            FROM comments c
            INNER JOIN users u ON u.id = c.user_id
            WHERE c.post_id = ?1
            ORDER BY c.score DESC, datetime(c.created_at) ASC
            "#,
        )?;
        let mapped = stmt.query_map(params![post_id], |row| {
            Ok(CommentListingRecord {
                comment: map_comment(row)?,
                author: row.get(7)?,
            })
        })?;
        let mut rows = Vec::new();
        for row in mapped {
            rows.push(row?);
        }
        Ok(rows)
    }

    fn update_owned(&self, id: i64, user_id: i64, content: &str) -> Result<usize> {
        let affected = self.conn.execute(
            r#"
            UPDATE comments
            SET content = ?1
            WHERE id = ?2 AND user_id = ?3
            "#,
            params![content, id, user_id],
        )?;
        Ok(affected)
    }

    fn delete_owned(&self, id: i64, user_id: i64) -> Result<usize> {
        let affected = self.conn.execute(
            r#"
            DELETE FROM comments
            WHERE id = ?1 AND user_id = ?2
            "#,
            params![id, user_id],
        )?;
        Ok(affected)
    }

    fn exists(&self, id: i64) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM comments WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn adjust_score(&self, id: i64, delta: i64) -> Result<()> {
        self.conn.execute(
            r#"
            UPDATE comments
            SET score = score + ?1
            WHERE id = ?2
            "#,
            params![delta, id],
        )?;
        Ok(())
    }
}
