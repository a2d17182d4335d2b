//! WDBC decode/encode.
//!
//! Layout: 20-byte header (`WDBC`, record count, field count, record size,
//! string block size; all little-endian u32), then the fixed-width records,
//! then the string heap.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::borrow::Cow;
use std::io::Cursor;

use super::schema::{DbcSchema, FieldType, LOC_SLOTS};
use super::string_heap;
use super::DbcError;

pub const MAGIC: [u8; 4] = *b"WDBC";
pub const HEADER_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbcHeader {
    pub record_count: u32,
    pub field_count: u32,
    pub record_size: u32,
    pub string_block_size: u32,
}

/// One decoded record element. Strings stay as heap offsets until resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Int32(i32),
    UInt32(u32),
    UInt8(u8),
    Float(f32),
    StringRef(u32),
    Loc([u32; 17]),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Int32(_) => FieldType::Int32,
            FieldValue::UInt32(_) => FieldType::UInt32,
            FieldValue::UInt8(_) => FieldType::UInt8,
            FieldValue::Float(_) => FieldType::Float,
            FieldValue::StringRef(_) => FieldType::String,
            FieldValue::Loc(_) => FieldType::Loc,
        }
    }

    /// Integer view used for key lookups; `None` for strings, floats and `Loc`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            FieldValue::Int32(v) => Some(v as i64),
            FieldValue::UInt32(v) => Some(v as i64),
            FieldValue::UInt8(v) => Some(v as i64),
            _ => None,
        }
    }
}

/// A record: one value per schema element (arrays expanded, `Loc` kept whole).
#[derive(Debug, Clone, PartialEq)]
pub struct DbcRecord {
    pub values: Vec<FieldValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DbcFile {
    pub header: DbcHeader,
    pub records: Vec<DbcRecord>,
    pub string_block: Vec<u8>,
}

impl DbcFile {
    /// Build a file from records and a heap, deriving the header from the schema.
    pub fn new(schema: &DbcSchema, records: Vec<DbcRecord>, string_block: Vec<u8>) -> Self {
        let record_size = schema.record_size() as u32;
        Self {
            header: DbcHeader {
                record_count: records.len() as u32,
                field_count: record_size / 4,
                record_size,
                string_block_size: string_block.len() as u32,
            },
            records,
            string_block,
        }
    }

    pub fn string(&self, offset: u32) -> Cow<'_, str> {
        string_heap::read_string(&self.string_block, offset)
    }

    /// Find the first record whose element `index` holds the integer `key`.
    pub fn find_by_key(&self, index: usize, key: i64) -> Option<&DbcRecord> {
        self.records
            .iter()
            .find(|r| r.values.get(index).and_then(FieldValue::as_i64) == Some(key))
    }
}

fn read_header(bytes: &[u8]) -> Result<DbcHeader, DbcError> {
    if bytes.len() < HEADER_SIZE {
        return Err(DbcError::Truncated {
            needed: HEADER_SIZE as u64,
            available: bytes.len() as u64,
        });
    }
    let mut magic = [0u8; 4];
    magic.copy_from_slice(&bytes[..4]);
    if magic != MAGIC {
        return Err(DbcError::BadMagic(magic));
    }

    let mut cursor = Cursor::new(&bytes[4..HEADER_SIZE]);
    let mut next = || {
        cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| DbcError::Truncated {
                needed: HEADER_SIZE as u64,
                available: bytes.len() as u64,
            })
    };
    Ok(DbcHeader {
        record_count: next()?,
        field_count: next()?,
        record_size: next()?,
        string_block_size: next()?,
    })
}

/// Decode a whole WDBC buffer against `schema`.
pub fn decode(bytes: &[u8], schema: &DbcSchema) -> Result<DbcFile, DbcError> {
    let header = read_header(bytes)?;

    let expected = schema.record_size() as u32;
    if header.record_size != expected {
        return Err(DbcError::SchemaMismatch {
            schema: schema.file.clone(),
            expected,
            actual: header.record_size,
        });
    }
    if !schema.has_uint8() && header.field_count.wrapping_mul(4) != header.record_size {
        return Err(DbcError::SchemaMismatch {
            schema: schema.file.clone(),
            expected,
            actual: header.field_count.wrapping_mul(4),
        });
    }

    let body_len = header.record_count as u64 * header.record_size as u64;
    let needed = HEADER_SIZE as u64 + body_len + header.string_block_size as u64;
    if needed > bytes.len() as u64 {
        return Err(DbcError::Truncated {
            needed,
            available: bytes.len() as u64,
        });
    }

    let body_end = HEADER_SIZE + body_len as usize;
    let truncated = || DbcError::Truncated {
        needed,
        available: bytes.len() as u64,
    };

    let elements = schema.elements();
    let mut cursor = Cursor::new(&bytes[HEADER_SIZE..body_end]);
    let mut records = Vec::with_capacity(header.record_count as usize);
    for _ in 0..header.record_count {
        let mut values = Vec::with_capacity(elements.len());
        for element in &elements {
            let value = match element.field_type {
                FieldType::Int32 => {
                    FieldValue::Int32(cursor.read_i32::<LittleEndian>().map_err(|_| truncated())?)
                }
                FieldType::UInt32 => {
                    FieldValue::UInt32(cursor.read_u32::<LittleEndian>().map_err(|_| truncated())?)
                }
                FieldType::UInt8 => FieldValue::UInt8(cursor.read_u8().map_err(|_| truncated())?),
                FieldType::Float => {
                    FieldValue::Float(cursor.read_f32::<LittleEndian>().map_err(|_| truncated())?)
                }
                FieldType::String => FieldValue::StringRef(
                    cursor.read_u32::<LittleEndian>().map_err(|_| truncated())?,
                ),
                FieldType::Loc => {
                    let mut slots = [0u32; 17];
                    for slot in slots.iter_mut() {
                        *slot = cursor.read_u32::<LittleEndian>().map_err(|_| truncated())?;
                    }
                    FieldValue::Loc(slots)
                }
            };
            values.push(value);
        }
        records.push(DbcRecord { values });
    }

    let string_end = body_end + header.string_block_size as usize;
    Ok(DbcFile {
        header,
        records,
        string_block: bytes[body_end..string_end].to_vec(),
    })
}

/// Encode `file` against `schema`.
///
/// The header is recomputed from the record list, the schema record size and
/// the current heap length. The heap is written verbatim.
pub fn encode(file: &DbcFile, schema: &DbcSchema) -> Result<Vec<u8>, DbcError> {
    let elements = schema.elements();
    let record_size = schema.record_size();

    let mut out =
        Vec::with_capacity(HEADER_SIZE + file.records.len() * record_size + file.string_block.len());
    out.extend_from_slice(&MAGIC);
    // Writes into a Vec cannot fail.
    let _ = out.write_u32::<LittleEndian>(file.records.len() as u32);
    let _ = out.write_u32::<LittleEndian>((record_size / 4) as u32);
    let _ = out.write_u32::<LittleEndian>(record_size as u32);
    let _ = out.write_u32::<LittleEndian>(file.string_block.len() as u32);

    for (index, record) in file.records.iter().enumerate() {
        if record.values.len() != elements.len() {
            return Err(DbcError::SchemaMismatch {
                schema: format!("{} (record {index})", schema.file),
                expected: elements.len() as u32,
                actual: record.values.len() as u32,
            });
        }
        for (value, element) in record.values.iter().zip(&elements) {
            if value.field_type() != element.field_type {
                return Err(DbcError::SchemaMismatch {
                    schema: format!("{} (record {index}, {})", schema.file, element.name),
                    expected: element.field_type.element_size() as u32,
                    actual: value.field_type().element_size() as u32,
                });
            }
            let _ = match *value {
                FieldValue::Int32(v) => out.write_i32::<LittleEndian>(v),
                FieldValue::UInt32(v) | FieldValue::StringRef(v) => out.write_u32::<LittleEndian>(v),
                FieldValue::UInt8(v) => out.write_u8(v),
                FieldValue::Float(v) => out.write_f32::<LittleEndian>(v),
                FieldValue::Loc(slots) => {
                    for slot in slots.iter().take(LOC_SLOTS.len()) {
                        let _ = out.write_u32::<LittleEndian>(*slot);
                    }
                    Ok(())
                }
            };
        }
    }

    out.extend_from_slice(&file.string_block);
    Ok(out)
}

#[cfg(test)]
#[path = "tests/codec_tests.rs"]
mod tests;
