use crate::database::models::UserRecord;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(super) struct SqliteUserRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        created_at: row.get(3)?,
    })
}

impl<'conn> super::UserRepository for SqliteUserRepository<'conn> {
    fn create(&self, username: &str, password_hash: &str, created_at: &str) -> Result<UserRecord> {
        self.conn.execute(
            r#"
            INSERT INTO users (username, password_hash, created_at)
            VALUES (?1, ?2, ?3)
            "#,
            params![username, password_hash, created_at],
        )?;
        let id = self.conn.last_insert_rowid();
        Ok(UserRecord {
            id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: created_at.to_string(),
        })
    }

    fn get(&self, id: i64) -> Result<Option<UserRecord>> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT id, username, password_hash, created_at
                FROM users
                WHERE id = ?1
                "#,
                params![id],
                map_user,
            )
            .optional()?)
    }

    fn get_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT id, username, password_hash, created_at
                FROM users
                WHERE username = ?1
                "#,
                params![username],
                map_user,
            )
            .optional()?)
    }
}
