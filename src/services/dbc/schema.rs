//! Table schema model: field definitions, column expansion and record layout.
//!
//! The 17-slot `Loc` vector below is part of the on-disk contract. Column
//! names derived from it feed the relational bridge and the CSV bridge, so
//! the order must never change.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::DbcError;

/// Locale slot names of a `Loc` field, in on-disk order. The last slot is the flags integer.
pub const LOC_SLOTS: [&str; 17] = [
    "enUS", "koKR", "frFR", "deDE", "zhCN", "zhTW", "esES", "esMX", "ruRU", "jaJP", "ptPT",
    "itIT", "unknown1", "unknown2", "unknown3", "unknown4", "flags",
];

/// Number of text slots in a `Loc` field (the 17th slot is the flags integer).
pub const LOC_TEXT_SLOTS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FieldType {
    Int32,
    UInt32,
    UInt8,
    Float,
    String,
    Loc,
}

impl FieldType {
    /// Size of one element of this type inside a record, in bytes.
    pub fn element_size(self) -> usize {
        match self {
            FieldType::Int32 | FieldType::UInt32 | FieldType::Float | FieldType::String => 4,
            FieldType::UInt8 => 1,
            FieldType::Loc => 4 * LOC_SLOTS.len(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Int32 => "int32",
            FieldType::UInt32 => "uint32",
            FieldType::UInt8 => "uint8",
            FieldType::Float => "float",
            FieldType::String => "string",
            FieldType::Loc => "Loc",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = DbcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int32" | "int" => Ok(FieldType::Int32),
            "uint32" | "uint" => Ok(FieldType::UInt32),
            "uint8" | "byte" => Ok(FieldType::UInt8),
            "float" => Ok(FieldType::Float),
            "string" => Ok(FieldType::String),
            "Loc" | "loc" => Ok(FieldType::Loc),
            other => Err(DbcError::UnknownFieldType(other.to_string())),
        }
    }
}

impl TryFrom<String> for FieldType {
    type Error = DbcError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FieldType> for String {
    fn from(value: FieldType) -> Self {
        value.as_str().to_string()
    }
}

fn default_count() -> usize {
    1
}

/// One declared field. `count > 1` declares an inline array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default = "default_count")]
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

/// A record element after array expansion: one value slot in a decoded record.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaElement {
    pub name: String,
    pub field_type: FieldType,
}

/// Storage class of a single expanded column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Int32,
    UInt32,
    UInt8,
    Float,
    Text,
    LocText(usize),
    LocFlags,
}

/// A relational/CSV column produced by expanding arrays and `Loc` fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    /// Index of the record element this column reads from.
    pub element: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbcSchema {
    /// Physical file name, e.g. `Spell.dbc`.
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub primary_keys: Vec<String>,
    #[serde(default)]
    pub unique_keys: Vec<Vec<String>>,
    #[serde(default)]
    pub sort_order: Vec<SortKey>,
}

impl DbcSchema {
    /// File name without its extension (`Spell` for `Spell.dbc`).
    pub fn stem(&self) -> &str {
        self.file
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(&self.file)
    }

    /// Relational table name; defaults to the lowercased file stem.
    pub fn table_name(&self) -> String {
        self.table
            .clone()
            .unwrap_or_else(|| self.stem().to_lowercase())
    }

    /// Record size in bytes as derived from the field list.
    pub fn record_size(&self) -> usize {
        self.fields
            .iter()
            .map(|f| f.field_type.element_size() * f.count)
            .sum()
    }

    pub fn has_uint8(&self) -> bool {
        self.fields
            .iter()
            .any(|f| f.field_type == FieldType::UInt8)
    }

    /// Record elements in on-disk order, arrays expanded to `name_1..name_n`.
    pub fn elements(&self) -> Vec<SchemaElement> {
        let mut out = Vec::new();
        for field in &self.fields {
            if field.count > 1 {
                for i in 1..=field.count {
                    out.push(SchemaElement {
                        name: format!("{}_{}", field.name, i),
                        field_type: field.field_type,
                    });
                }
            } else {
                out.push(SchemaElement {
                    name: field.name.clone(),
                    field_type: field.field_type,
                });
            }
        }
        out
    }

    /// Fully expanded column list (arrays and `Loc` slots), in schema order.
    pub fn columns(&self) -> Vec<Column> {
        let mut out = Vec::new();
        for (element_index, element) in self.elements().into_iter().enumerate() {
            let single = |kind| Column {
                name: element.name.clone(),
                kind,
                element: element_index,
            };
            match element.field_type {
                FieldType::Int32 => out.push(single(ColumnKind::Int32)),
                FieldType::UInt32 => out.push(single(ColumnKind::UInt32)),
                FieldType::UInt8 => out.push(single(ColumnKind::UInt8)),
                FieldType::Float => out.push(single(ColumnKind::Float)),
                FieldType::String => out.push(single(ColumnKind::Text)),
                FieldType::Loc => {
                    for (slot, locale) in LOC_SLOTS.iter().enumerate() {
                        let kind = if slot < LOC_TEXT_SLOTS {
                            ColumnKind::LocText(slot)
                        } else {
                            ColumnKind::LocFlags
                        };
                        out.push(Column {
                            name: format!("{}_{}", element.name, locale),
                            kind,
                            element: element_index,
                        });
                    }
                }
            }
        }
        out
    }

    /// Check internal consistency: unique names, positive counts, and that
    /// unique-key and sort references name real columns. Primary keys are not
    /// checked here; the relational bridge falls back to a synthetic key.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = std::collections::HashSet::new();
        for field in &self.fields {
            if field.count == 0 {
                return Err(format!("{}: field '{}' has count 0", self.file, field.name));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(format!("{}: duplicate field '{}'", self.file, field.name));
            }
        }

        let columns: std::collections::HashSet<String> =
            self.columns().into_iter().map(|c| c.name).collect();
        let referenced = self
            .unique_keys
            .iter()
            .flatten()
            .chain(self.sort_order.iter().map(|s| &s.field));
        for name in referenced {
            if !columns.contains(name) {
                return Err(format!("{}: unknown column '{}'", self.file, name));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/schema_tests.rs"]
mod tests;
