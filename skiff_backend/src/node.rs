use crate::api;
use crate::bootstrap::{self, BootstrapResources};
use crate::config::SkiffConfig;
use crate::database::Database;
use crate::session::SessionStore;
use anyhow::Result;
use std::sync::Arc;

/// Convenience wrapper that bootstraps the backend once and hands out cloned
/// handles for whichever entrypoint needs them.
pub struct SkiffNode {
    config: SkiffConfig,
    bootstrap: BootstrapResources,
}

impl SkiffNode {
    /// Bootstraps all persistent state: directories, database, session store.
    pub fn start(config: SkiffConfig) -> Result<Self> {
        let bootstrap = bootstrap::initialize(&config)?;

        tracing::info!(
            directories_created = ?bootstrap.directories_created,
            database_initialized = bootstrap.database_initialized,
            "skiff node initialized"
        );

        Ok(Self { config, bootstrap })
    }

    /// Returns a snapshot of the node's reusable handles.
    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            config: self.config.clone(),
            database: self.bootstrap.database.clone(),
            sessions: self.bootstrap.sessions.clone(),
        }
    }

    /// Runs the HTTP server until shutdown.
    pub async fn run_http_server(&self) -> Result<()> {
        let snapshot = self.snapshot();
        api::serve_http(snapshot.config, snapshot.database, snapshot.sessions).await
    }

    pub fn database(&self) -> Database {
        self.bootstrap.database.clone()
    }
}

/// Cloned handles for consumers that just need access to backend services
/// without owning the entire node struct.
#[derive(Clone)]
pub struct NodeSnapshot {
    pub config: SkiffConfig,
    pub database: Database,
    pub sessions: Arc<dyn SessionStore>,
}
