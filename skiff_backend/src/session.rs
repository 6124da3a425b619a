use crate::config::SessionConfig;
use crate::utils::now_unix;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::Instant;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "skiff_session";

/// When the JSON snapshot is written: after every mutation, or at most once
/// per interval (opportunistic, piggybacking on whichever mutation crosses
/// the boundary — there is no background flusher).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushPolicy {
    OnWrite,
    Interval(u64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user_id: Option<i64>,
    pub expires_at: i64,
}

impl SessionRecord {
    fn expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }
}

/// Server-side session state, injected into the request path. Tokens are
/// opaque; an unknown or expired token is indistinguishable from no token.
pub trait SessionStore: Send + Sync {
    /// Returns the live record for a token, or `None` for unknown/expired.
    fn load(&self, token: &str) -> Option<SessionRecord>;
    /// Mints a fresh anonymous session and returns its token.
    fn create(&self) -> String;
    /// Slides the expiry of a live session to now + TTL.
    fn touch(&self, token: &str);
    /// Attaches or clears the authenticated user on a live session.
    fn set_user(&self, token: &str, user_id: Option<i64>);
    fn remove(&self, token: &str);
    /// Drops every expired record.
    fn purge_expired(&self);
}

struct StoreInner {
    sessions: HashMap<String, SessionRecord>,
    last_flush: Option<Instant>,
}

pub struct FileSessionStore {
    path: PathBuf,
    ttl_secs: i64,
    policy: FlushPolicy,
    inner: RwLock<StoreInner>,
}

impl FileSessionStore {
    /// Opens the snapshot at `path`, dropping expired records. A missing file
    /// starts an empty store; a corrupt one is logged and discarded rather
    /// than refusing to boot.
    pub fn open(path: &Path, config: &SessionConfig) -> Result<Self> {
        let mut sessions: HashMap<String, SessionRecord> = if path.exists() {
            let raw = fs::read(path)
                .with_context(|| format!("failed to read session snapshot {}", path.display()))?;
            match serde_json::from_slice(&raw) {
                Ok(parsed) => parsed,
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        path = %path.display(),
                        "discarding unreadable session snapshot"
                    );
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        let now = now_unix();
        sessions.retain(|_, record| !record.expired(now));

        Ok(Self {
            path: path.to_path_buf(),
            ttl_secs: config.ttl_secs,
            policy: config.flush,
            inner: RwLock::new(StoreInner {
                sessions,
                last_flush: None,
            }),
        })
    }

    #[cfg(test)]
    pub fn session_count(&self) -> usize {
        self.read_inner().sessions.len()
    }

    fn read_inner(&self) -> std::sync::RwLockReadGuard<'_, StoreInner> {
        // a poisoned lock only means another request panicked mid-write;
        // the map itself is still usable
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn maybe_flush(&self, inner: &mut StoreInner) {
        let due = match self.policy {
            FlushPolicy::OnWrite => true,
            FlushPolicy::Interval(secs) => inner
                .last_flush
                .map_or(true, |at| at.elapsed().as_secs() >= secs),
        };
        if !due {
            return;
        }
        match serde_json::to_vec(&inner.sessions) {
            Ok(bytes) => {
                if let Err(err) = fs::write(&self.path, bytes) {
                    tracing::warn!(
                        error = %err,
                        path = %self.path.display(),
                        "failed to persist session snapshot"
                    );
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize session snapshot");
            }
        }
        inner.last_flush = Some(Instant::now());
    }

    fn with_write<T>(&self, f: impl FnOnce(&mut StoreInner) -> T) -> T {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let value = f(&mut guard);
        self.maybe_flush(&mut guard);
        value
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self, token: &str) -> Option<SessionRecord> {
        let guard = self.read_inner();
        let record = guard.sessions.get(token)?;
        if record.expired(now_unix()) {
            return None;
        }
        Some(record.clone())
    }

    fn create(&self) -> String {
        let token = Uuid::new_v4().to_string();
        let record = SessionRecord {
            user_id: None,
            expires_at: now_unix() + self.ttl_secs,
        };
        self.with_write(|inner| {
            inner.sessions.insert(token.clone(), record);
        });
        token
    }

    fn touch(&self, token: &str) {
        let now = now_unix();
        self.with_write(|inner| {
            if let Some(record) = inner.sessions.get_mut(token) {
                if !record.expired(now) {
                    record.expires_at = now + self.ttl_secs;
                }
            }
        });
    }

    fn set_user(&self, token: &str, user_id: Option<i64>) {
        let now = now_unix();
        self.with_write(|inner| {
            if let Some(record) = inner.sessions.get_mut(token) {
                if !record.expired(now) {
                    record.user_id = user_id;
                    record.expires_at = now + self.ttl_secs;
                }
            }
        });
    }

    fn remove(&self, token: &str) {
        self.with_write(|inner| {
            inner.sessions.remove(token);
        });
    }

    fn purge_expired(&self) {
        let now = now_unix();
        self.with_write(|inner| {
            inner.sessions.retain(|_, record| !record.expired(now));
        });
    }
}
