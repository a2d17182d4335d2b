#![allow(dead_code)]

use mithril_lib::services::archive::LooseBackend;
use mithril_lib::services::baseline::extract_baseline;
use mithril_lib::services::dbc::{
    encode, read_dbc, registry, DbcFile, DbcRecord, FieldType, FieldValue, StringHeapBuilder,
};
use mithril_lib::services::workspace::Workspace;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::fs;
use std::path::{Path, PathBuf};
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

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    TestContext { pool }
}

/// A client install with loose-directory archives and an initialized
/// workspace next to it.
pub struct Fixture {
    pub tmp: TempDir,
    pub workspace: Workspace,
}

impl Fixture {
    pub fn new() -> Self {
        init_logger();
        let tmp = TempDir::new().expect("temp dir");
        let workspace = Workspace::new(tmp.path().join("mithril-data"));
        workspace.init().expect("init workspace");
        Self { tmp, workspace }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.tmp.path().join("Data")
    }

    pub fn server_dir(&self) -> PathBuf {
        self.tmp.path().join("server").join("dbc")
    }

    /// `common.MPQ` with `Spell.dbc`, `enUS/locale-enUS.MPQ` with one
    /// interface file, then a baseline extraction.
    pub fn with_baseline(self, spells: &[(i32, &str)]) -> Self {
        let data = self.data_dir();
        write_file(
            &data.join("common.MPQ/DBFilesClient/Spell.dbc"),
            &spell_dbc(spells),
        );
        write_file(
            &data.join("enUS/locale-enUS.MPQ/Interface/FrameXML/SpellBookFrame.lua"),
            b"-- stock spellbook",
        );
        fs::create_dir_all(self.server_dir()).expect("server dir");
        extract_baseline(&self.workspace, &data, None, &LooseBackend).expect("extract baseline");
        self
    }
}

/// `Spell.dbc` bytes with `(id, enUS name)` rows; every other cell is zero.
pub fn spell_dbc(rows: &[(i32, &str)]) -> Vec<u8> {
    let schema = registry().get("Spell").expect("Spell schema");
    let elements = schema.elements();
    let mut heap = StringHeapBuilder::new();
    let records = rows
        .iter()
        .map(|(id, name)| {
            let values = elements
                .iter()
                .map(|element| match (element.name.as_str(), element.field_type) {
                    ("id", _) => FieldValue::Int32(*id),
                    ("spell_name", FieldType::Loc) => {
                        let mut slots = [0u32; 17];
                        slots[0] = heap.intern_str(name);
                        FieldValue::Loc(slots)
                    }
                    (_, FieldType::Int32) => FieldValue::Int32(0),
                    (_, FieldType::UInt32) => FieldValue::UInt32(0),
                    (_, FieldType::UInt8) => FieldValue::UInt8(0),
                    (_, FieldType::Float) => FieldValue::Float(0.0),
                    (_, FieldType::String) => FieldValue::StringRef(0),
                    (_, FieldType::Loc) => FieldValue::Loc([0; 17]),
                })
                .collect();
            DbcRecord { values }
        })
        .collect();
    let file = DbcFile::new(schema, records, heap.into_bytes());
    encode(&file, schema).expect("encode Spell")
}

/// enUS spell name of row `id` in a `Spell.dbc` on disk.
pub fn spell_name(path: &Path, id: i64) -> String {
    let schema = registry().get("Spell").expect("Spell schema");
    let file = read_dbc(path, schema).expect("read Spell.dbc");
    let name_index = schema
        .elements()
        .iter()
        .position(|e| e.name == "spell_name")
        .expect("spell_name element");
    let record = file.find_by_key(0, id).expect("spell row");
    match &record.values[name_index] {
        FieldValue::Loc(slots) => file.string(slots[0]).to_string(),
        other => panic!("unexpected {other:?}"),
    }
}

pub fn write_file(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, bytes).expect("write fixture");
}
