use crate::database::models::{NewPost, PostListingRecord, PostRecord, PostType};
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(super) struct SqlitePostRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

fn parse_post_type(idx: usize, raw: String) -> rusqlite::Result<PostType> {
    PostType::parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown post type: {raw}").into(),
        )
    })
}

fn map_post(row: &Row<'_>) -> rusqlite::Result<PostRecord> {
    let raw_type: String = row.get(5)?;
    Ok(PostRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        url: row.get(3)?,
        description: row.get(4)?,
        post_type: parse_post_type(5, raw_type)?,
        score: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn map_listing(row: &Row<'_>) -> rusqlite::Result<PostListingRecord> {
    Ok(PostListingRecord {
        post: map_post(row)?,
        author: row.get(8)?,
        comment_count: row.get(9)?,
    })
}

const LISTING_COLUMNS: &str = r#"
    p.id, p.user_id, p.title, p.url, p.description, p.post_type, p.score, p.created_at,
    u.username,
    (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count
"#;

impl<'conn> super::PostRepository for SqlitePostRepository<'conn> {
    fn create(&self, record: &NewPost) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO posts (user_id, title, url, description, post_type, score, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
            "#,
            params![
                record.user_id,
                record.title,
                record.url,
                record.description,
                record.post_type.as_str(),
                record.created_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get(&self, id: i64) -> Result<Option<PostRecord>> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT id, user_id, title, url, description, post_type, score, created_at
                FROM posts
                WHERE id = ?1
                "#,
                params![id],
                map_post,
            )
            .optional()?)
    }

    fn list(
        &self,
        filter: Option<PostType>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PostListingRecord>> {
        let mut rows = Vec::new();
        match filter {
            Some(post_type) => {
                let mut stmt = self.conn.prepare(&format!(
                    r#"
                    SELECT {LISTING_COLUMNS}
                    FROM posts p
                    INNER JOIN users u ON u.id = p.user_id
                    WHERE p.post_type = ?1
                    ORDER BY p.score DESC, datetime(p.created_at) DESC
                    LIMIT ?2 OFFSET ?3
                    "#
                ))?;
                let mapped = stmt.query_map(
                    params![post_type.as_str(), limit as i64, offset as i64],
                    map_listing,
                )?;
                for row in mapped {
                    rows.push(row?);
                }
            }
            None => {
                let mut stmt = self.conn.prepare(&format!(
                    r#"
                    SELECT {LISTING_COLUMNS}
                    FROM posts p
                    INNER JOIN users u ON u.id = p.user_id
                    ORDER BY p.score DESC, datetime(p.created_at) DESC
                    LIMIT ?1 OFFSET ?2
                    "#
                ))?;
                let mapped = stmt.query_map(params![limit as i64, offset as i64], map_listing)?;
                for row in mapped {
                    rows.push(row?);
                }
            }
        }
        Ok(rows)
    }

    fn get_listing(&self, id: i64) -> Result<Option<PostListingRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!(
                    r#"
                    SELECT {LISTING_COLUMNS}
                    FROM posts p
                    INNER JOIN users u ON u.id = p.user_id
                    WHERE p.id = ?1
                    "#
                ),
                params![id],
                map_listing,
            )
            .optional()?)
    }

    fn delete_owned(&self, id: i64, user_id: i64) -> Result<usize> {
        let affected = self.conn.execute(
            r#"
            DELETE FROM posts
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
                "SELECT 1 FROM posts WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn adjust_score(&self, id: i64, delta: i64) -> Result<()> {
        self.conn.execute(
            r#"
            UPDATE posts
            SET score = score + ?1
            WHERE id = ?2
            "#,
            params![delta, id],
        )?;
        Ok(())
    }
}
