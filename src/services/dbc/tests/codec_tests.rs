use super::*;
use crate::services::dbc::schema::{FieldDef, SortDirection, SortKey};
use crate::services::dbc::StringHeapBuilder;

fn icon_schema() -> DbcSchema {
    DbcSchema {
        file: "SpellIcon.dbc".into(),
        table: None,
        fields: vec![
            FieldDef {
                name: "id".into(),
                field_type: FieldType::Int32,
                count: 1,
            },
            FieldDef {
                name: "texture_filename".into(),
                field_type: FieldType::String,
                count: 1,
            },
        ],
        primary_keys: vec!["id".into()],
        unique_keys: vec![],
        sort_order: vec![SortKey {
            field: "id".into(),
            direction: SortDirection::Asc,
        }],
    }
}

fn mixed_schema() -> DbcSchema {
    DbcSchema {
        file: "Mixed.dbc".into(),
        table: None,
        fields: vec![
            FieldDef {
                name: "id".into(),
                field_type: FieldType::Int32,
                count: 1,
            },
            FieldDef {
                name: "flags".into(),
                field_type: FieldType::UInt8,
                count: 4,
            },
            FieldDef {
                name: "scale".into(),
                field_type: FieldType::Float,
                count: 1,
            },
            FieldDef {
                name: "title".into(),
                field_type: FieldType::Loc,
                count: 1,
            },
        ],
        primary_keys: vec!["id".into()],
        unique_keys: vec![],
        sort_order: vec![],
    }
}

/// Hand-assembled SpellIcon file: two records and a three-string heap.
fn icon_bytes() -> Vec<u8> {
    let heap: &[u8] = b"\0Interface\\Icons\\Spell_Fire\0Interface\\Icons\\Spell_Frost\0";
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"WDBC");
    for v in [2u32, 2, 8, heap.len() as u32] {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    for (id, offset) in [(1i32, 1u32), (2, 28)] {
        bytes.extend_from_slice(&id.to_le_bytes());
        bytes.extend_from_slice(&offset.to_le_bytes());
    }
    bytes.extend_from_slice(heap);
    bytes
}

#[test]
fn test_decode_reads_records_and_strings() {
    let file = decode(&icon_bytes(), &icon_schema()).unwrap();
    assert_eq!(file.header.record_count, 2);
    assert_eq!(file.records.len(), 2);
    assert_eq!(file.records[0].values[0], FieldValue::Int32(1));
    match file.records[1].values[1] {
        FieldValue::StringRef(offset) => {
            assert_eq!(file.string(offset), "Interface\\Icons\\Spell_Frost")
        }
        other => panic!("expected string ref, got {other:?}"),
    }
}

#[test]
fn test_encode_after_decode_is_byte_identical() {
    let bytes = icon_bytes();
    let file = decode(&bytes, &icon_schema()).unwrap();
    let encoded = encode(&file, &icon_schema()).unwrap();
    assert_eq!(encoded, bytes);
}

#[test]
fn test_bad_magic() {
    let mut bytes = icon_bytes();
    bytes[..4].copy_from_slice(b"WDB2");
    let err = decode(&bytes, &icon_schema()).unwrap_err();
    assert!(matches!(err, DbcError::BadMagic(m) if &m == b"WDB2"));
}

#[test]
fn test_short_header_is_truncated() {
    let err = decode(b"WDBC\x01\x00", &icon_schema()).unwrap_err();
    assert!(matches!(err, DbcError::Truncated { needed: 20, .. }));
}

#[test]
fn test_missing_body_is_truncated() {
    let bytes = icon_bytes();
    let err = decode(&bytes[..30], &icon_schema()).unwrap_err();
    assert!(matches!(err, DbcError::Truncated { .. }));
}

#[test]
fn test_record_size_disagreement_is_schema_mismatch() {
    let mut schema = icon_schema();
    schema.fields.push(FieldDef {
        name: "extra".into(),
        field_type: FieldType::Int32,
        count: 1,
    });
    let err = decode(&icon_bytes(), &schema).unwrap_err();
    match err {
        DbcError::SchemaMismatch {
            expected, actual, ..
        } => {
            assert_eq!(expected, 12);
            assert_eq!(actual, 8);
        }
        other => panic!("expected schema mismatch, got {other:?}"),
    }
}

#[test]
fn test_uint8_layout_round_trip() {
    let schema = mixed_schema();
    // 4 (id) + 4x1 (flags) + 4 (scale) + 68 (Loc)
    assert_eq!(schema.record_size(), 80);

    let mut heap = StringHeapBuilder::new();
    let mut loc = [0u32; 17];
    loc[0] = heap.intern_str("Hello");
    loc[3] = heap.intern_str("Hallo");
    loc[16] = 0x00FF_FFFE;
    let record = DbcRecord {
        values: vec![
            FieldValue::Int32(7),
            FieldValue::UInt8(1),
            FieldValue::UInt8(2),
            FieldValue::UInt8(3),
            FieldValue::UInt8(255),
            FieldValue::Float(0.25),
            FieldValue::Loc(loc),
        ],
    };
    let file = DbcFile::new(&schema, vec![record.clone()], heap.into_bytes());
    let bytes = encode(&file, &schema).unwrap();

    // field count is derived as record size / 4
    assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 20);
    assert_eq!(u32::from_le_bytes(bytes[12..16].try_into().unwrap()), 80);

    let decoded = decode(&bytes, &schema).unwrap();
    assert_eq!(decoded.records, vec![record]);
    match decoded.records[0].values[6] {
        FieldValue::Loc(slots) => {
            assert_eq!(decoded.string(slots[0]), "Hello");
            assert_eq!(decoded.string(slots[3]), "Hallo");
            assert_eq!(slots[16], 0x00FF_FFFE);
        }
        other => panic!("expected Loc, got {other:?}"),
    }
}

#[test]
fn test_encode_rejects_misshapen_record() {
    let schema = icon_schema();
    let file = DbcFile::new(
        &schema,
        vec![DbcRecord {
            values: vec![FieldValue::Int32(1)],
        }],
        vec![0],
    );
    assert!(matches!(
        encode(&file, &schema),
        Err(DbcError::SchemaMismatch { .. })
    ));
}

#[test]
fn test_find_by_key() {
    let file = decode(&icon_bytes(), &icon_schema()).unwrap();
    let record = file.find_by_key(0, 2).unwrap();
    assert_eq!(record.values[0], FieldValue::Int32(2));
    assert!(file.find_by_key(0, 3).is_none());
}
