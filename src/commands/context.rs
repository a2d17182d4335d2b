use crate::database::connection::connect;
use crate::services::archive::{backend_for, ArchiveBackend};
use crate::services::composer::resolve_build_order;
use crate::services::config::{AppSettings, ConfigService};
use crate::services::workspace::mods::{list_mods, ModMeta};
use crate::services::workspace::{Workspace, DEFAULT_WORKSPACE_DIR};
use crate::types::errors::CommandResult;
use sqlx::SqlitePool;
use std::path::PathBuf;

/// What every command handler works against.
pub struct Context {
    pub workspace: Workspace,
}

impl Context {
    pub fn new(root: Option<PathBuf>) -> Self {
        let root = root.unwrap_or_else(|| PathBuf::from(DEFAULT_WORKSPACE_DIR));
        Self {
            workspace: Workspace::new(root),
        }
    }

    pub fn config(&self) -> CommandResult<ConfigService> {
        self.workspace.require_initialized()?;
        self.workspace.load_config()
    }

    pub fn settings(&self) -> CommandResult<AppSettings> {
        Ok(self.config()?.get_settings())
    }

    pub fn backend(&self, settings: &AppSettings) -> Box<dyn ArchiveBackend> {
        backend_for(settings.archive_format)
    }

    /// Mods on disk in effective build order.
    pub fn build_order(&self) -> CommandResult<Vec<ModMeta>> {
        let explicit = self
            .workspace
            .read_manifest()?
            .map(|m| m.build_order)
            .unwrap_or_default();
        Ok(resolve_build_order(&explicit, &list_mods(&self.workspace)?))
    }

    /// Open the relational store. Callers close the pool when done.
    pub async fn open_store(&self) -> CommandResult<SqlitePool> {
        let config = self.config()?;
        let url = self.workspace.database_url(&config);
        log::info!("Connecting to {url}");
        connect(&url).await
    }
}
