use crate::session::FlushPolicy;
use anyhow::{anyhow, Result};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct SkiffConfig {
    pub http_port: u16,
    pub paths: SkiffPaths,
    pub session: SessionConfig,
}

impl SkiffConfig {
    pub fn from_env() -> Result<Self> {
        let paths = SkiffPaths::discover()?;
        let http_port = env::var("SKIFF_HTTP_PORT")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(8080);
        let session = SessionConfig::from_env();
        Ok(Self {
            http_port,
            paths,
            session,
        })
    }

    pub fn new(http_port: u16, paths: SkiffPaths, session: SessionConfig) -> Self {
        Self {
            http_port,
            paths,
            session,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ttl_secs: i64,
    pub flush: FlushPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 7 * 24 * 60 * 60,
            flush: FlushPolicy::OnWrite,
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let ttl_secs = env::var("SKIFF_SESSION_TTL_SECS")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(defaults.ttl_secs);
        let flush = match env::var("SKIFF_SESSION_FLUSH").ok().as_deref() {
            Some("interval") => {
                let secs = env::var("SKIFF_SESSION_FLUSH_SECS")
                    .ok()
                    .and_then(|raw| raw.parse().ok())
                    .unwrap_or(30);
                FlushPolicy::Interval(secs)
            }
            _ => FlushPolicy::OnWrite,
        };
        Self { ttl_secs, flush }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SkiffPaths {
    pub base: PathBuf,
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub sessions_path: PathBuf,
    pub logs_dir: PathBuf,
}

impl SkiffPaths {
    pub fn discover() -> Result<Self> {
        if let Ok(base) = env::var("SKIFF_BASE_DIR") {
            return Self::from_base_dir(base);
        }
        let exe_path = std::env::current_exe()
            .map_err(|err| anyhow!("failed to resolve current executable: {err}"))?;
        let base = exe_path
            .parent()
            .ok_or_else(|| anyhow!("executable path missing parent"))?
            .to_path_buf();
        Self::from_base_dir(base)
    }

    pub fn from_base_dir<P: AsRef<Path>>(base: P) -> Result<Self> {
        let base = base.as_ref().to_path_buf();
        let data_dir = base.join("data");
        let db_path = data_dir.join("skiff.db");
        let sessions_path = data_dir.join("sessions.json");
        let logs_dir = base.join("logs");

        Ok(Self {
            base,
            data_dir,
            db_path,
            sessions_path,
            logs_dir,
        })
    }
}
