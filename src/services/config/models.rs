use crate::services::archive::ArchiveFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// MD5 of the unmodified 3.3.5a (12340) client executable.
pub const KNOWN_GOOD_EXE_MD5: &str = "45892bdedd0ad70aed4ccd22d9fb5984";

pub const DEFAULT_SCRIPTS_SUBDIR: &str = "src/server/scripts/Custom";

/// External command template. `{database}` inside an argument is replaced
/// with the target database name at invocation time.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CommandTemplate {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandTemplate {
    pub fn render_args(&self, database: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace("{database}", database))
            .collect()
    }
}

impl Default for CommandTemplate {
    fn default() -> Self {
        Self {
            program: "mysql".into(),
            args: vec![
                "--host=127.0.0.1".into(),
                "--user=root".into(),
                "--password=password".into(),
                "{database}".into(),
            ],
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    /// The client `Data` directory.
    pub client_data_path: Option<PathBuf>,
    /// Directory the server reads tabular files from.
    pub server_dbc_path: Option<PathBuf>,
    /// Defaults to `Wow.exe` next to the data directory.
    pub exe_path: Option<PathBuf>,
    pub expected_exe_md5: String,
    /// Defaults to a SQLite file inside the workspace.
    pub database_url: Option<String>,
    pub sql_runner: CommandTemplate,
    pub source_dir: Option<PathBuf>,
    pub scripts_subdir: String,
    pub archive_format: ArchiveFormat,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            client_data_path: None,
            server_dbc_path: None,
            exe_path: None,
            expected_exe_md5: KNOWN_GOOD_EXE_MD5.into(),
            database_url: None,
            sql_runner: CommandTemplate::default(),
            source_dir: None,
            scripts_subdir: DEFAULT_SCRIPTS_SUBDIR.into(),
            archive_format: ArchiveFormat::default(),
        }
    }
}

impl AppSettings {
    /// Executable path, explicit or derived from the client data directory.
    pub fn resolved_exe_path(&self) -> Option<PathBuf> {
        if let Some(exe) = &self.exe_path {
            return Some(exe.clone());
        }
        self.client_data_path
            .as_ref()
            .and_then(|data| data.parent())
            .map(|root| root.join("Wow.exe"))
    }
}
