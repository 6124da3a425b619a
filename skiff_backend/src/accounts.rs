use crate::database::models::UserRecord;
use crate::database::repositories::UserRepository;
use crate::database::Database;
use crate::error::ForumError;
use crate::utils::now_utc_iso;
use anyhow::anyhow;
use rand::RngCore;

const BAD_CREDENTIALS: &str = "unknown username or wrong password";

#[derive(Clone)]
pub struct AccountService {
    database: Database,
}

impl AccountService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Creates an account and returns it. The username must be unused; a
    /// duplicate fails without touching the users relation.
    pub fn register(&self, username: &str, password: &str) -> Result<UserRecord, ForumError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(ForumError::validation("username and password are required"));
        }

        let taken = self
            .database
            .with_repositories(|repos| repos.users().get_by_username(username))?
            .is_some();
        if taken {
            return Err(ForumError::validation("username is already taken"));
        }

        let password_hash = hash_password(password)?;
        let created_at = now_utc_iso();
        let user = self
            .database
            .with_repositories(|repos| repos.users().create(username, &password_hash, &created_at))?;
        Ok(user)
    }

    /// Verifies credentials against the stored argon2 hash. Unknown usernames
    /// and wrong passwords fail identically; login never creates accounts.
    pub fn login(&self, username: &str, password: &str) -> Result<UserRecord, ForumError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(ForumError::validation("username and password are required"));
        }

        let user = self
            .database
            .with_repositories(|repos| repos.users().get_by_username(username))?
            .ok_or_else(|| ForumError::unauthorized(BAD_CREDENTIALS))?;

        if !verify_password(&user.password_hash, password)? {
            return Err(ForumError::unauthorized(BAD_CREDENTIALS));
        }
        Ok(user)
    }

    pub fn get(&self, id: i64) -> Result<Option<UserRecord>, ForumError> {
        Ok(self
            .database
            .with_repositories(|repos| repos.users().get(id))?)
    }
}

fn hash_password(password: &str) -> Result<String, ForumError> {
    let mut salt = [0u8; 16];
    rand::rng().fill_bytes(&mut salt);
    argon2::hash_encoded(password.as_bytes(), &salt, &argon2::Config::default())
        .map_err(|err| ForumError::Internal(anyhow!("password hashing failed: {err}")))
}

fn verify_password(encoded: &str, password: &str) -> Result<bool, ForumError> {
    argon2::verify_encoded(encoded, password.as_bytes())
        .map_err(|err| ForumError::Internal(anyhow!("password verification failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn setup_service() -> AccountService {
        let conn = Connection::open_in_memory().expect("in-memory db");
        let db = Database::from_connection(conn, true);
        db.ensure_migrations().expect("migrations");
        AccountService::new(db)
    }

    #[test]
    fn register_then_login_roundtrip() {
        let service = setup_service();
        let user = service.register("alice", "hunter2").expect("register");
        assert_eq!(user.username, "alice");
        assert_ne!(user.password_hash, "hunter2");

        let logged_in = service.login("alice", "hunter2").expect("login");
        assert_eq!(logged_in.id, user.id);
    }

    #[test]
    fn login_rejects_wrong_password_and_unknown_user() {
        let service = setup_service();
        service.register("alice", "hunter2").expect("register");

        assert!(matches!(
            service.login("alice", "wrong"),
            Err(ForumError::Unauthorized(_))
        ));
        assert!(matches!(
            service.login("nobody", "hunter2"),
            Err(ForumError::Unauthorized(_))
        ));
    }

    #[test]
    fn register_requires_both_fields() {
        let service = setup_service();
        assert!(matches!(
            service.register("", "pw"),
            Err(ForumError::Validation(_))
        ));
        assert!(matches!(
            service.register("alice", ""),
            Err(ForumError::Validation(_))
        ));
    }

    #[test]
    fn duplicate_username_fails_without_second_row() {
        let service = setup_service();
        let first = service.register("alice", "pw1").expect("register");
        assert!(matches!(
            service.register("alice", "pw2"),
            Err(ForumError::Validation(_))
        ));

        // the original row is untouched
        let still_there = service.get(first.id).expect("lookup").expect("row");
        assert_eq!(still_there.username, "alice");
        let login = service.login("alice", "pw1").expect("original password");
        assert_eq!(login.id, first.id);
    }
}
