use super::*;
use crate::services::dbc::{decode, registry};
use crate::test_utils::{spell_icon_dbc, write_file};
use tempfile::TempDir;

fn title_file() -> DbcFile {
    let schema = registry().get("CharTitles").unwrap();
    let mut heap = StringHeapBuilder::new();
    let mut name = [0u32; 17];
    name[0] = heap.intern_str("Sergeant, \"Sarge\"");
    name[2] = heap.intern_str("Sergent");
    name[16] = 16_712_190;
    let record = DbcRecord {
        values: vec![
            FieldValue::Int32(2),
            FieldValue::Int32(-1),
            FieldValue::Loc(name),
            FieldValue::Loc([0; 17]),
            FieldValue::Int32(2),
        ],
    };
    DbcFile::new(schema, vec![record], heap.into_bytes())
}

#[test]
fn test_header_is_expanded_column_list() {
    let schema = registry().get("CharTitles").unwrap();
    let csv = String::from_utf8(to_csv(&title_file(), schema).unwrap()).unwrap();
    let header = csv.lines().next().unwrap();
    assert!(header.starts_with("id,condition_id,name_enUS,name_koKR,name_frFR"));
    assert!(header.ends_with("name1_unknown4,name1_flags,mask_id"));
}

#[test]
fn test_text_round_trip_is_semantic() {
    let schema = registry().get("CharTitles").unwrap();
    let original = title_file();
    let csv = to_csv(&original, schema).unwrap();
    let parsed = from_csv(&csv, schema).unwrap();

    assert_eq!(parsed.records.len(), 1);
    let FieldValue::Loc(offsets) = parsed.records[0].values[2] else {
        panic!("expected Loc");
    };
    assert_eq!(parsed.string(offsets[0]), "Sergeant, \"Sarge\"");
    assert_eq!(parsed.string(offsets[2]), "Sergent");
    assert_eq!(offsets[1], 0);
    assert_eq!(offsets[16], 16_712_190);
    assert_eq!(parsed.records[0].values[1], FieldValue::Int32(-1));

    // Same records render to the same text even with a different heap.
    assert_eq!(to_csv(&parsed, schema).unwrap(), csv);
}

#[test]
fn test_floats_keep_exact_value() {
    let schema = registry().get("AreaTrigger").unwrap();
    let mut values = vec![FieldValue::Int32(45), FieldValue::Int32(0)];
    values.extend([0.1f32, -8949.95, 3.4e38, 1.0e-7, 0.0, 6.0, 2.5, 1.5707964].map(FieldValue::Float));
    let file = DbcFile::new(schema, vec![DbcRecord { values }], vec![0]);

    let parsed = from_csv(&to_csv(&file, schema).unwrap(), schema).unwrap();
    assert_eq!(parsed.records, file.records);
}

#[test]
fn test_header_mismatch_is_bad_input() {
    let schema = registry().get("SpellIcon").unwrap();
    let err = from_csv(b"id,texture\n1,a\n", schema).unwrap_err();
    assert!(matches!(err, CommandError::BadInput(ref m) if m.contains("texture")));

    let err = from_csv(b"id\n1\n", schema).unwrap_err();
    assert!(matches!(err, CommandError::BadInput(_)));
}

#[test]
fn test_bad_number_names_row_and_column() {
    let schema = registry().get("SpellIcon").unwrap();
    let err = from_csv(b"id,texture_filename\n1,a\nx,b\n", schema).unwrap_err();
    let CommandError::BadInput(message) = err else {
        panic!("expected BadInput");
    };
    assert!(message.contains("row 3"));
    assert!(message.contains("column id"));
}

#[test]
fn test_file_helpers_and_baseline_hash() {
    let tmp = TempDir::new().unwrap();
    let schema = registry().get("SpellIcon").unwrap();
    let dbc = tmp.path().join("baseline").join("SpellIcon.dbc");
    write_file(&dbc, &spell_icon_dbc(&[(1, "Spell_Fire_FireBolt"), (2, "")]));

    let csv_path = tmp.path().join("SpellIcon.dbc.csv");
    assert_eq!(dbc_file_to_csv(&dbc, &csv_path, schema).unwrap(), 2);

    let hash = baseline_csv_hash(dbc.parent().unwrap(), schema).unwrap();
    assert_eq!(hash, Some(hash_bytes(&fs::read(&csv_path).unwrap())));

    let rebuilt = tmp.path().join("out").join("SpellIcon.dbc");
    assert_eq!(csv_file_to_dbc(&csv_path, &rebuilt, schema).unwrap(), 2);
    let decoded = decode(&fs::read(&rebuilt).unwrap(), schema).unwrap();
    assert_eq!(decoded, decode(&fs::read(&dbc).unwrap(), schema).unwrap());

    assert_eq!(baseline_csv_hash(tmp.path(), schema).unwrap(), None);
}

#[test]
fn test_table_from_override() {
    assert_eq!(table_from_override("Spell.dbc.csv"), Some("Spell"));
    assert_eq!(table_from_override("SpellIcon.DBC.CSV"), Some("SpellIcon"));
    assert_eq!(table_from_override(".dbc.csv"), None);
    assert_eq!(table_from_override("Spell.csv"), None);
}
