//! Command-line surface: argument parsing and thin handlers over the services.

pub mod baseline_cmds;
pub mod build_cmds;
pub mod cli;
pub mod context;
pub mod dbc_cmds;
pub mod migrate_cmds;
pub mod mod_cmds;
pub mod patch_cmds;
pub mod source_cmds;
pub mod workspace_cmds;

use cli::{
    BaselineAction, Cli, Command, DbcAction, MigrateAction, ModAction, OrderAction, PatchAction,
    SourceAction, WorkspaceAction,
};
use context::Context;

pub async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let ctx = Context::new(cli.workspace);
    match cli.command {
        Command::Init => workspace_cmds::init(&ctx),
        Command::Status => workspace_cmds::status(&ctx),
        Command::Baseline { action } => match action {
            BaselineAction::Extract { client, locale } => {
                baseline_cmds::extract(&ctx, client, locale)
            }
            BaselineAction::Import { force } => baseline_cmds::import(&ctx, force).await,
        },
        Command::Mod { action } => match action {
            ModAction::Create { name, description } => mod_cmds::create(&ctx, &name, description),
            ModAction::List => mod_cmds::list(&ctx),
            ModAction::Remove { name } => mod_cmds::remove(&ctx, &name),
            ModAction::Order { action } => match action {
                OrderAction::Show => mod_cmds::order_show(&ctx),
                OrderAction::Set { names } => mod_cmds::order_set(&ctx, &names),
            },
            ModAction::EditTable { mod_name, table } => {
                mod_cmds::edit_table(&ctx, &mod_name, &table)
            }
        },
        Command::Dbc { action } => match action {
            DbcAction::ToCsv {
                input,
                output,
                table,
            } => dbc_cmds::to_csv(&input, &output, table.as_deref()),
            DbcAction::FromCsv {
                input,
                output,
                table,
            } => dbc_cmds::from_csv(&input, &output, &table),
        },
        Command::Build(args) => build_cmds::run(&ctx, &args.mods).await,
        Command::Patch { action } => match action {
            PatchAction::Apply { mod_name } => patch_cmds::apply(&ctx, mod_name.as_deref()),
            PatchAction::Restore => patch_cmds::restore(&ctx),
            PatchAction::Status => patch_cmds::status(&ctx),
        },
        Command::Migrate { action } => match action {
            MigrateAction::Apply => migrate_cmds::apply(&ctx),
            MigrateAction::Rollback {
                mod_name,
                file,
                reapply,
            } => migrate_cmds::rollback(&ctx, &mod_name, file.as_deref(), reapply),
            MigrateAction::Status => migrate_cmds::status(&ctx),
        },
        Command::Source { action } => match action {
            SourceAction::Apply => source_cmds::apply(&ctx),
        },
        Command::Workspace { action } => match action {
            WorkspaceAction::Prune => workspace_cmds::prune(&ctx),
            WorkspaceAction::Clean { keep_mods } => workspace_cmds::clean(&ctx, keep_mods),
        },
    }
}
