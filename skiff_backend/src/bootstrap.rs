use crate::config::SkiffConfig;
use crate::database::Database;
use crate::session::FileSessionStore;
use anyhow::Result;
use std::fs;
use std::sync::Arc;

pub struct BootstrapResources {
    pub directories_created: Vec<String>,
    pub database_initialized: bool,
    pub database: Database,
    pub sessions: Arc<FileSessionStore>,
}

pub fn initialize(config: &SkiffConfig) -> Result<BootstrapResources> {
    let mut directories_created = Vec::new();
    create_dir_if_missing(&config.paths.data_dir, &mut directories_created)?;
    create_dir_if_missing(&config.paths.logs_dir, &mut directories_created)?;

    let database = Database::connect(&config.paths)?;
    let database_initialized = database.ensure_migrations()?;

    let sessions = Arc::new(FileSessionStore::open(
        &config.paths.sessions_path,
        &config.session,
    )?);

    Ok(BootstrapResources {
        directories_created,
        database_initialized,
        database,
        sessions,
    })
}

fn create_dir_if_missing(path: &std::path::Path, created: &mut Vec<String>) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
        created.push(path.display().to_string());
    }
    Ok(())
}
