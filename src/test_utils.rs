use crate::services::dbc::{encode, registry, DbcFile, DbcRecord, FieldValue, StringHeapBuilder};
use crate::services::workspace::Workspace;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::sync::Once;
use tempfile::TempDir;

static INIT: Once = Once::new();

pub fn init_logger() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

pub struct TestContext {
    pub pool: Pool<Sqlite>,
}

pub async fn init_test_db() -> TestContext {
    init_logger();

    // One connection: every query must see the same in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    TestContext { pool }
}

/// A fresh, initialized workspace inside a temp dir.
pub fn test_workspace() -> (TempDir, Workspace) {
    init_logger();
    let tmp = TempDir::new().expect("temp dir");
    let workspace = Workspace::new(tmp.path().join("mithril-data"));
    workspace.init().expect("init workspace");
    (tmp, workspace)
}

/// `SpellIcon.dbc` bytes for `(id, texture)` rows.
pub fn spell_icon_dbc(rows: &[(i32, &str)]) -> Vec<u8> {
    let schema = registry().get("SpellIcon").expect("SpellIcon schema");
    let mut heap = StringHeapBuilder::new();
    let records = rows
        .iter()
        .map(|(id, texture)| DbcRecord {
            values: vec![
                FieldValue::Int32(*id),
                FieldValue::StringRef(heap.intern_str(texture)),
            ],
        })
        .collect();
    let file = DbcFile::new(schema, records, heap.into_bytes());
    encode(&file, schema).expect("encode SpellIcon")
}

/// `Item.dbc` bytes; each row is the eight integer columns.
pub fn item_dbc(rows: &[[i32; 8]]) -> Vec<u8> {
    let schema = registry().get("Item").expect("Item schema");
    let records = rows
        .iter()
        .map(|row| DbcRecord {
            values: row.iter().map(|v| FieldValue::Int32(*v)).collect(),
        })
        .collect();
    let file = DbcFile::new(schema, records, vec![0]);
    encode(&file, schema).expect("encode Item")
}

pub fn write_file(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent");
    }
    std::fs::write(path, bytes).expect("write fixture");
}
