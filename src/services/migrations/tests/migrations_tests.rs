use super::*;
use crate::services::workspace::mods::{create_mod, list_mods};
use crate::test_utils::{test_workspace, write_file};

/// Records every script it runs; fails for file names in `fail_on`.
#[derive(Default)]
struct FakeRunner {
    calls: Vec<(String, String)>,
    fail_on: Vec<String>,
}

impl ScriptRunner for FakeRunner {
    fn run(&mut self, database: &str, script: &Path) -> Result<(), String> {
        let name = script.file_name().unwrap().to_string_lossy().to_string();
        self.calls.push((database.to_string(), name.clone()));
        if self.fail_on.contains(&name) {
            return Err("ERROR 1064 (42000): syntax error".into());
        }
        Ok(())
    }
}

fn sql(ws: &Workspace, mod_name: &str, database: &str, file: &str) {
    write_file(
        &ws.mod_dir(mod_name).join("sql").join(database).join(file),
        b"SELECT 1;",
    );
}

#[test]
fn test_discovery_is_numeric_and_skips_rollbacks() {
    let (_tmp, ws) = test_workspace();
    create_mod(&ws, "m1", None).unwrap();
    for file in ["010_late.sql", "2_early.sql", "001_first.sql", "001_first.rollback.sql", "notes.txt"] {
        sql(&ws, "m1", "world", file);
    }
    sql(&ws, "m1", "auth", "001_account.sql");

    let found: Vec<(String, String, bool)> = discover_mod(&ws, "m1")
        .unwrap()
        .into_iter()
        .map(|m| (m.database, m.file, m.rollback_path.is_some()))
        .collect();
    assert_eq!(
        found,
        vec![
            ("auth".into(), "001_account.sql".into(), false),
            ("world".into(), "001_first.sql".into(), true),
            ("world".into(), "2_early.sql".into(), false),
            ("world".into(), "010_late.sql".into(), false),
        ]
    );
}

#[test]
fn test_misnamed_scripts_are_not_migrations() {
    let (_tmp, ws) = test_workspace();
    create_mod(&ws, "m1", None).unwrap();
    for file in ["001.sql", "first.sql", "001_first.SQL", "002_second.sql"] {
        sql(&ws, "m1", DBC_DATABASE, file);
    }

    let dir = ws.mod_dir("m1").join("sql").join(DBC_DATABASE);
    let found: Vec<String> = discover_database("m1", DBC_DATABASE, &dir)
        .unwrap()
        .into_iter()
        .map(|m| m.file)
        .collect();
    assert_eq!(found, vec!["002_second.sql"]);
}

#[test]
fn test_apply_in_build_order_and_skip_tracked() {
    let (_tmp, ws) = test_workspace();
    create_mod(&ws, "a", None).unwrap();
    create_mod(&ws, "b", None).unwrap();
    sql(&ws, "a", "world", "001_a.sql");
    sql(&ws, "b", "world", "001_b.sql");
    sql(&ws, "b", "dbc", "001_spell.sql");
    let mods = list_mods(&ws).unwrap();
    let order = vec![mods[1].clone(), mods[0].clone()];

    let mut runner = FakeRunner::default();
    let report = apply_migrations(&ws, &order, &mut runner).unwrap();
    assert_eq!(report.applied.len(), 2);
    assert_eq!(
        runner.calls,
        vec![
            ("world".to_string(), "001_b.sql".to_string()),
            ("world".to_string(), "001_a.sql".to_string())
        ]
    );

    let mut second = FakeRunner::default();
    let again = apply_migrations(&ws, &order, &mut second).unwrap();
    assert!(again.applied.is_empty());
    assert_eq!(again.already_applied, 2);
    assert!(second.calls.is_empty());
}

#[test]
fn test_failure_stops_run_and_is_not_tracked() {
    let (_tmp, ws) = test_workspace();
    create_mod(&ws, "M1", None).unwrap();
    sql(&ws, "M1", "world", "001_add_npc.sql");
    sql(&ws, "M1", "world", "002_add_loot.sql");
    let order = list_mods(&ws).unwrap();

    let mut failing = FakeRunner {
        fail_on: vec!["001_add_npc.sql".into()],
        ..Default::default()
    };
    let err = apply_migrations(&ws, &order, &mut failing).unwrap_err();
    assert!(matches!(err, CommandError::ExternalFailure(ref m) if m.contains("syntax error")));
    assert_eq!(failing.calls.len(), 1);

    let tracker = Tracker::<MigrationRecord>::load(&ws.tracker_path(MIGRATIONS_TRACKER)).unwrap();
    assert!(tracker.is_empty());

    let mut retry = FakeRunner {
        fail_on: vec!["001_add_npc.sql".into()],
        ..Default::default()
    };
    assert!(apply_migrations(&ws, &order, &mut retry).is_err());
    assert_eq!(
        retry.calls,
        vec![("world".to_string(), "001_add_npc.sql".to_string())]
    );
}

#[test]
fn test_rollback_latest_and_named_with_reapply() {
    let (_tmp, ws) = test_workspace();
    create_mod(&ws, "m1", None).unwrap();
    for file in ["001_a.sql", "001_a.rollback.sql", "002_b.sql", "002_b.rollback.sql"] {
        sql(&ws, "m1", "world", file);
    }
    let order = list_mods(&ws).unwrap();
    apply_migrations(&ws, &order, &mut FakeRunner::default()).unwrap();

    let mut runner = FakeRunner::default();
    let latest = rollback_migration(&ws, "m1", None, false, &mut runner).unwrap();
    assert_eq!(latest.rolled_back.file, "002_b.sql");
    assert_eq!(runner.calls[0].1, "002_b.rollback.sql");

    let mut runner = FakeRunner::default();
    let named = rollback_migration(&ws, "m1", Some("001_a.sql"), true, &mut runner).unwrap();
    assert_eq!(named.rolled_back.file, "001_a.sql");
    assert!(named.reapplied.is_some());
    assert_eq!(
        runner.calls.iter().map(|c| c.1.as_str()).collect::<Vec<_>>(),
        vec!["001_a.rollback.sql", "001_a.sql"]
    );

    let tracker = Tracker::<MigrationRecord>::load(&ws.tracker_path(MIGRATIONS_TRACKER)).unwrap();
    let files: Vec<&str> = tracker.entries().iter().map(|r| r.file.as_str()).collect();
    assert_eq!(files, vec!["001_a.sql"]);
}

#[test]
fn test_rollback_requires_script_and_applied_entry() {
    let (_tmp, ws) = test_workspace();
    create_mod(&ws, "m1", None).unwrap();
    sql(&ws, "m1", "world", "001_a.sql");
    let order = list_mods(&ws).unwrap();

    let err = rollback_migration(&ws, "m1", None, false, &mut FakeRunner::default()).unwrap_err();
    assert!(matches!(err, CommandError::BadInput(_)));

    apply_migrations(&ws, &order, &mut FakeRunner::default()).unwrap();
    let err = rollback_migration(&ws, "m1", None, false, &mut FakeRunner::default()).unwrap_err();
    assert!(matches!(err, CommandError::BadInput(ref m) if m.contains("rollback")));

    let tracker = Tracker::<MigrationRecord>::load(&ws.tracker_path(MIGRATIONS_TRACKER)).unwrap();
    assert_eq!(tracker.len(), 1);
}

#[test]
fn test_status_reports_pending_and_applied() {
    let (_tmp, ws) = test_workspace();
    create_mod(&ws, "m1", None).unwrap();
    sql(&ws, "m1", "world", "001_a.sql");
    let order = list_mods(&ws).unwrap();

    let before = migration_status(&ws, &order).unwrap();
    assert_eq!(before.len(), 1);
    assert!(before[0].applied_at.is_none());

    apply_migrations(&ws, &order, &mut FakeRunner::default()).unwrap();
    sql(&ws, "m1", "world", "002_b.sql");
    let after = migration_status(&ws, &order).unwrap();
    assert!(after[0].applied_at.is_some());
    assert!(after[1].applied_at.is_none());
}

#[test]
fn test_rollback_name() {
    assert_eq!(rollback_name("001_add_npc.sql"), "001_add_npc.rollback.sql");
}
