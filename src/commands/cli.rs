use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mithril")]
#[command(about = "Modding workbench for the 3.3.5a client")]
#[command(version)]
pub struct Cli {
    /// Workspace root (defaults to ./mithril-data)
    #[arg(long, global = true, env = "MITHRIL_DATA")]
    pub workspace: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the workspace layout and a default config
    Init,
    /// Show baseline, mods, build order and tracker counts
    Status,
    /// Extract the baseline or load it into the relational store
    Baseline {
        #[command(subcommand)]
        action: BaselineAction,
    },
    /// Create, list, remove and order mods
    Mod {
        #[command(subcommand)]
        action: ModAction,
    },
    /// Convert tabular files to and from CSV
    Dbc {
        #[command(subcommand)]
        action: DbcAction,
    },
    /// Build patch archives and deploy them to the client
    Build(BuildArgs),
    /// Byte-patch the client executable
    Patch {
        #[command(subcommand)]
        action: PatchAction,
    },
    /// Run server database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Apply core diffs and deploy native scripts to the server source
    Source {
        #[command(subcommand)]
        action: SourceAction,
    },
    /// Tracker and workspace maintenance
    Workspace {
        #[command(subcommand)]
        action: WorkspaceAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum BaselineAction {
    /// Extract the effective tables and interface files from the client
    Extract {
        /// Client data directory (overrides the config)
        #[arg(long)]
        client: Option<PathBuf>,
        /// Locale to extract (detected when omitted)
        #[arg(long)]
        locale: Option<String>,
    },
    /// Load baseline tables into the relational store
    Import {
        /// Re-import every table, not only the ones that drifted
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ModAction {
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    List,
    Remove {
        name: String,
    },
    /// Show or set the build order
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },
    /// Seed `<mod>/dbc/<Table>.dbc.csv` from the baseline
    EditTable {
        #[arg(value_name = "MOD")]
        mod_name: String,
        table: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum OrderAction {
    Show,
    /// Replace the build order; later mods win
    Set {
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum DbcAction {
    ToCsv {
        input: PathBuf,
        output: PathBuf,
        /// Schema name (defaults to the input file stem)
        #[arg(long)]
        table: Option<String>,
    },
    FromCsv {
        input: PathBuf,
        output: PathBuf,
        #[arg(long)]
        table: String,
    },
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Build only these mods (repeatable)
    #[arg(long = "mod", value_name = "NAME")]
    pub mods: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum PatchAction {
    Apply {
        /// Apply only this mod's patches
        #[arg(long = "mod", value_name = "NAME")]
        mod_name: Option<String>,
    },
    Restore,
    Status,
}

#[derive(Subcommand, Debug)]
pub enum MigrateAction {
    Apply,
    Rollback {
        #[arg(long = "mod", value_name = "NAME")]
        mod_name: String,
        /// Migration file (defaults to the most recent one)
        #[arg(long)]
        file: Option<String>,
        /// Run the forward script again afterwards
        #[arg(long)]
        reapply: bool,
    },
    Status,
}

#[derive(Subcommand, Debug)]
pub enum SourceAction {
    Apply,
}

#[derive(Subcommand, Debug)]
pub enum WorkspaceAction {
    /// Drop tracker entries whose mod or file is gone
    Prune,
    /// Remove the workspace
    Clean {
        /// Back up mod directories and restore them afterwards
        #[arg(long)]
        keep_mods: bool,
    },
}
