mod common;

use clap::Parser;
use common::{spell_name, Fixture};
use mithril_lib::commands::{cli::Cli, dispatch};
use mithril_lib::services::config::AppSettings;
use mithril_lib::services::archive::ArchiveFormat;
use mithril_lib::services::workspace::mods::list_mods;
use std::path::Path;

async fn run(workspace: &Path, args: &[&str]) -> anyhow::Result<()> {
    let mut argv = vec!["mithril", "--workspace"];
    let root = workspace.to_string_lossy().to_string();
    argv.push(&root);
    argv.extend_from_slice(args);
    dispatch(Cli::try_parse_from(argv)?).await
}

fn configure(fx: &Fixture) {
    let config = fx.workspace.load_config().unwrap();
    config
        .save_settings(AppSettings {
            client_data_path: Some(fx.data_dir()),
            archive_format: ArchiveFormat::Loose,
            ..AppSettings::default()
        })
        .unwrap();
}

#[tokio::test]
async fn test_commands_require_initialized_workspace() {
    let tmp = tempfile::TempDir::new().unwrap();
    let root = tmp.path().join("mithril-data");
    let err = run(&root, &["mod", "list"]).await.unwrap_err();
    assert!(err.to_string().contains("mithril init"));

    run(&root, &["init"]).await.unwrap();
    run(&root, &["mod", "create", "red-bolt", "--description", "Renames Fireball"])
        .await
        .unwrap();
    assert!(run(&root, &["mod", "create", "red-bolt"]).await.is_err());
    run(&root, &["mod", "list"]).await.unwrap();
    run(&root, &["status"]).await.unwrap();
}

#[tokio::test]
async fn test_edit_table_then_build_through_cli() {
    let fx = Fixture::new().with_baseline(&[(133, "Fireball")]);
    configure(&fx);
    let root = fx.workspace.root().to_path_buf();

    run(&root, &["mod", "create", "red-bolt"]).await.unwrap();
    run(&root, &["mod", "edit-table", "red-bolt", "Spell"]).await.unwrap();
    let csv = fx.workspace.mod_dir("red-bolt").join("dbc/Spell.dbc.csv");
    let text = std::fs::read_to_string(&csv).unwrap();
    std::fs::write(&csv, text.replace("Fireball", "Mithril Bolt")).unwrap();
    assert!(run(&root, &["mod", "edit-table", "red-bolt", "Spell"]).await.is_err());

    run(&root, &["build"]).await.unwrap();
    assert_eq!(
        spell_name(&fx.data_dir().join("patch-A.MPQ/DBFilesClient/Spell.dbc"), 133),
        "Mithril Bolt"
    );

    run(&root, &["mod", "order", "set", "red-bolt"]).await.unwrap();
    run(&root, &["mod", "order", "show"]).await.unwrap();
    run(&root, &["workspace", "clean", "--keep-mods"]).await.unwrap();
    let mods = list_mods(&fx.workspace).unwrap();
    assert_eq!(mods.len(), 1);
    assert_eq!(mods[0].slot.as_deref(), Some("A"));
}

#[tokio::test]
async fn test_dbc_csv_round_trip_through_cli() {
    let fx = Fixture::new().with_baseline(&[(133, "Fireball"), (116, "Frostbolt")]);
    let root = fx.workspace.root().to_path_buf();
    let source = fx.workspace.baseline_dbc_dir().join("Spell.dbc");
    let csv = fx.tmp.path().join("Spell.csv");
    let rebuilt = fx.tmp.path().join("Rebuilt.dbc");

    run(&root, &["dbc", "to-csv", source.to_str().unwrap(), csv.to_str().unwrap(), "--table", "Spell"])
        .await
        .unwrap();
    run(&root, &["dbc", "from-csv", csv.to_str().unwrap(), rebuilt.to_str().unwrap(), "--table", "Spell"])
        .await
        .unwrap();
    assert_eq!(spell_name(&rebuilt, 116), "Frostbolt");
    assert!(run(&root, &["dbc", "from-csv", "x.csv", "y.dbc", "--table", "NoSuchTable"])
        .await
        .is_err());
}
