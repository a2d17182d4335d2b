use super::checksum_repo::{
    baseline_checksum, ensure_checksum_table, live_checksum, source_hash, table_columns,
};
use super::dbc_repo::*;
use super::ddl::{create_table_sql, KeyStrategy, ROW_ID_COLUMN};
use crate::services::dbc::{
    decode, read_dbc, registry, DbcFile, DbcRecord, FieldValue, StringHeapBuilder,
};
use crate::test_utils::{init_test_db, item_dbc, spell_icon_dbc};
use tempfile::TempDir;

fn icons(rows: &[(i32, &str)]) -> DbcFile {
    let schema = registry().get("SpellIcon").unwrap();
    decode(&spell_icon_dbc(rows), schema).unwrap()
}

#[test]
fn test_create_table_sql_declared_and_synthetic() {
    let schema = registry().get("SpellIcon").unwrap();
    let declared = create_table_sql(
        "spellicon",
        &schema.columns(),
        &KeyStrategy::Declared(vec!["id".into()]),
    );
    assert!(declared.contains("\"id\" INT NOT NULL"));
    assert!(declared.contains("\"texture_filename\" TEXT NOT NULL"));
    assert!(declared.contains("PRIMARY KEY (\"id\")"));

    let synthetic = create_table_sql("spellicon", &schema.columns(), &KeyStrategy::Synthetic);
    assert!(synthetic.contains("\"_row_id\" INTEGER PRIMARY KEY"));
}

#[test]
fn test_rows_per_batch_respects_both_limits() {
    assert_eq!(rows_per_batch(2), MAX_ROWS_PER_BATCH);
    assert_eq!(rows_per_batch(298), 107);
    assert_eq!(rows_per_batch(0), MAX_ROWS_PER_BATCH);
    assert!(rows_per_batch(298) * 298 <= MAX_PARAMS_PER_STATEMENT);
}

#[tokio::test]
async fn test_unmodified_table_is_not_exported() {
    let ctx = init_test_db().await;
    let schema = registry().get("SpellIcon").unwrap();
    import_table(&ctx.pool, schema, &icons(&[(1, "a"), (2, "b")]))
        .await
        .unwrap();

    let baseline = baseline_checksum(&ctx.pool, "spellicon").await.unwrap();
    let live = live_checksum(&ctx.pool, "spellicon").await.unwrap();
    assert_eq!(baseline.as_deref(), Some(live.as_str()));
    assert!(modified_tables(&ctx.pool).await.unwrap().is_empty());

    let out = TempDir::new().unwrap();
    let report = export_modified(&ctx.pool, out.path()).await.unwrap();
    assert!(report.written.is_empty());
}

#[tokio::test]
async fn test_modified_table_exports_in_sort_order() {
    let ctx = init_test_db().await;
    let schema = registry().get("SpellIcon").unwrap();
    import_table(&ctx.pool, schema, &icons(&[(2, "b"), (1, "a")]))
        .await
        .unwrap();

    sqlx::query("UPDATE spellicon SET texture_filename = 'Mithril' WHERE id = 2")
        .execute(&ctx.pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO spellicon (id, texture_filename) VALUES (3, 'Mithril')")
        .execute(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(modified_tables(&ctx.pool).await.unwrap(), vec!["SpellIcon.dbc"]);

    let out = TempDir::new().unwrap();
    let report = export_modified(&ctx.pool, out.path()).await.unwrap();
    assert_eq!(report.written, vec!["SpellIcon.dbc"]);

    let file = read_dbc(&out.path().join("SpellIcon.dbc"), schema).unwrap();
    let ids: Vec<i64> = file
        .records
        .iter()
        .map(|r| r.values[0].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(file.header.record_count, 3);
    assert_eq!(file.header.field_count, 2);

    let FieldValue::StringRef(two) = file.records[1].values[1] else {
        panic!("expected string");
    };
    let FieldValue::StringRef(three) = file.records[2].values[1] else {
        panic!("expected string");
    };
    assert_eq!(file.string(two), "Mithril");
    // Identical strings share one heap entry.
    assert_eq!(two, three);
    assert_eq!(file.string_block[0], 0);
}

#[tokio::test]
async fn test_loc_columns_round_trip() {
    let ctx = init_test_db().await;
    let schema = registry().get("CharTitles").unwrap();

    let mut heap = StringHeapBuilder::new();
    let mut name = [0u32; 17];
    name[0] = heap.intern_str("Private");
    name[3] = heap.intern_str("Gefreiter");
    name[16] = 0x00FF_FFEC;
    let record = DbcRecord {
        values: vec![
            FieldValue::Int32(1),
            FieldValue::Int32(0),
            FieldValue::Loc(name),
            FieldValue::Loc([0; 17]),
            FieldValue::Int32(1),
        ],
    };
    let file = DbcFile::new(schema, vec![record], heap.into_bytes());
    import_table(&ctx.pool, schema, &file).await.unwrap();

    let columns = table_columns(&ctx.pool, "char_titles").await.unwrap();
    assert_eq!(columns[2], "name_enUS");
    assert_eq!(columns[18], "name_flags");

    let (de, flags): (String, i64) =
        sqlx::query_as("SELECT name_deDE, name_flags FROM char_titles WHERE id = 1")
            .fetch_one(&ctx.pool)
            .await
            .unwrap();
    assert_eq!(de, "Gefreiter");
    assert_eq!(flags, 0x00FF_FFEC);

    sqlx::query("UPDATE char_titles SET name_enUS = 'Mithril Private' WHERE id = 1")
        .execute(&ctx.pool)
        .await
        .unwrap();
    let exported = export_table(&ctx.pool, schema).await.unwrap();
    let FieldValue::Loc(offsets) = exported.records[0].values[2] else {
        panic!("expected Loc");
    };
    assert_eq!(exported.string(offsets[0]), "Mithril Private");
    assert_eq!(exported.string(offsets[3]), "Gefreiter");
    assert_eq!(offsets[1], 0);
    assert_eq!(offsets[16], 0x00FF_FFEC);
}

#[tokio::test]
async fn test_duplicate_keys_fall_back_to_synthetic_key() {
    let ctx = init_test_db().await;
    let schema = registry().get("SpellIcon").unwrap();
    import_table(&ctx.pool, schema, &icons(&[(7, "x"), (7, "y")]))
        .await
        .unwrap();

    let columns = table_columns(&ctx.pool, "spellicon").await.unwrap();
    assert_eq!(columns[0], ROW_ID_COLUMN);
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM spellicon")
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(count.0, 2);
}

#[tokio::test]
async fn test_unique_key_duplicates_warn_but_load() {
    let ctx = init_test_db().await;
    let schema = registry().get("CharTitles").unwrap();
    let record = |id| DbcRecord {
        values: vec![
            FieldValue::Int32(id),
            FieldValue::Int32(0),
            FieldValue::Loc([0; 17]),
            FieldValue::Loc([0; 17]),
            FieldValue::Int32(5),
        ],
    };
    let file = DbcFile::new(schema, vec![record(1), record(2)], vec![0]);
    assert_eq!(import_table(&ctx.pool, schema, &file).await.unwrap(), 2);
}

#[tokio::test]
async fn test_floats_are_sanitized() {
    let ctx = init_test_db().await;
    let schema = registry().get("AreaTrigger").unwrap();
    let row = |id: i32, x: f32| DbcRecord {
        values: std::iter::once(FieldValue::Int32(id))
            .chain(std::iter::once(FieldValue::Int32(571)))
            .chain(std::iter::once(FieldValue::Float(x)))
            .chain(std::iter::repeat(FieldValue::Float(0.25)).take(7))
            .collect(),
    };
    let file = DbcFile::new(
        schema,
        vec![row(1, f32::NAN), row(2, 1.0e-40), row(3, 5872.5)],
        vec![0],
    );
    import_table(&ctx.pool, schema, &file).await.unwrap();

    let exported = export_table(&ctx.pool, schema).await.unwrap();
    let xs: Vec<FieldValue> = exported.records.iter().map(|r| r.values[2]).collect();
    assert_eq!(
        xs,
        vec![
            FieldValue::Float(0.0),
            FieldValue::Float(0.0),
            FieldValue::Float(5872.5)
        ]
    );
    assert_eq!(exported.records[0].values[9], FieldValue::Float(0.25));
}

#[tokio::test]
async fn test_large_import_is_batched() {
    let ctx = init_test_db().await;
    let schema = registry().get("Item").unwrap();
    let rows: Vec<[i32; 8]> = (1..=4_500).map(|id| [id, 2, 7, -1, 1, id * 3, 13, 0]).collect();
    let file = decode(&item_dbc(&rows), schema).unwrap();

    assert_eq!(import_table(&ctx.pool, schema, &file).await.unwrap(), 4_500);
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM item")
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(count.0, 4_500);
}

#[tokio::test]
async fn test_import_baseline_resets_only_stale_tables() {
    let ctx = init_test_db().await;
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("SpellIcon.dbc"), spell_icon_dbc(&[(1, "a")])).unwrap();
    std::fs::write(dir.path().join("item.dbc"), item_dbc(&[[1, 0, 0, 0, 0, 0, 0, 0]])).unwrap();

    let first = import_baseline(&ctx.pool, dir.path(), false).await.unwrap();
    assert_eq!(first.imported, vec!["Item.dbc", "SpellIcon.dbc"]);

    sqlx::query("UPDATE item SET material = 9")
        .execute(&ctx.pool)
        .await
        .unwrap();
    let reset = import_baseline(&ctx.pool, dir.path(), true).await.unwrap();
    assert_eq!(reset.imported, vec!["Item.dbc"]);
    assert!(modified_tables(&ctx.pool).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_import_baseline_reloads_tables_whose_file_changed() {
    let ctx = init_test_db().await;
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("SpellIcon.dbc");
    std::fs::write(&path, spell_icon_dbc(&[(1, "a")])).unwrap();

    import_baseline(&ctx.pool, dir.path(), false).await.unwrap();
    let recorded = source_hash(&ctx.pool, "spellicon").await.unwrap();
    assert!(recorded.is_some());

    // Unchanged file and table: nothing to do.
    let idle = import_baseline(&ctx.pool, dir.path(), true).await.unwrap();
    assert!(idle.imported.is_empty());

    // A re-extract replaced the baseline file; the untouched table is stale.
    std::fs::write(&path, spell_icon_dbc(&[(1, "a"), (2, "b")])).unwrap();
    let reset = import_baseline(&ctx.pool, dir.path(), true).await.unwrap();
    assert_eq!(reset.imported, vec!["SpellIcon.dbc"]);
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM spellicon")
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(count.0, 2);
    assert_ne!(source_hash(&ctx.pool, "spellicon").await.unwrap(), recorded);
}

#[tokio::test]
async fn test_checksum_table_gains_source_hash_column() {
    let ctx = init_test_db().await;
    sqlx::query("CREATE TABLE dbc_checksum (table_name TEXT PRIMARY KEY, checksum TEXT NOT NULL)")
        .execute(&ctx.pool)
        .await
        .unwrap();

    ensure_checksum_table(&ctx.pool).await.unwrap();
    ensure_checksum_table(&ctx.pool).await.unwrap();

    let columns = table_columns(&ctx.pool, "dbc_checksum").await.unwrap();
    assert_eq!(columns, vec!["table_name", "checksum", "source_hash"]);
}

#[tokio::test]
async fn test_import_baseline_skips_corrupt_tables() {
    let ctx = init_test_db().await;
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("SpellIcon.dbc"), b"WDBC\x01\x00").unwrap();

    let report = import_baseline(&ctx.pool, dir.path(), false).await.unwrap();
    assert!(report.imported.is_empty());
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].0, "SpellIcon.dbc");
}
