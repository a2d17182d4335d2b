//! Compile-time schema registry, indexed by normalized file stem.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use super::schema::DbcSchema;

const EMBEDDED: &[(&str, &str)] = &[
    ("AreaTrigger", include_str!("../../../schemas/AreaTrigger.json")),
    ("CharTitles", include_str!("../../../schemas/CharTitles.json")),
    ("Item", include_str!("../../../schemas/Item.json")),
    ("SkillLine", include_str!("../../../schemas/SkillLine.json")),
    ("Spell", include_str!("../../../schemas/Spell.json")),
    ("SpellIcon", include_str!("../../../schemas/SpellIcon.json")),
    (
        "SpellItemEnchantmentCondition",
        include_str!("../../../schemas/SpellItemEnchantmentCondition.json"),
    ),
];

static REGISTRY: LazyLock<SchemaRegistry> = LazyLock::new(SchemaRegistry::embedded);

/// The registry of every schema shipped with the binary.
pub fn registry() -> &'static SchemaRegistry {
    &REGISTRY
}

/// Normalize a table reference to a registry key.
///
/// Accepts `Spell`, `spell.dbc`, `DBFilesClient\Spell.dbc` or `Spell.dbc.csv`.
pub fn normalize_table_key(name: &str) -> String {
    let file = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let mut stem = file.to_lowercase();
    for suffix in [".csv", ".dbc"] {
        if let Some(stripped) = stem.strip_suffix(suffix) {
            stem = stripped.to_string();
        }
    }
    stem
}

#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, DbcSchema>,
}

impl SchemaRegistry {
    fn embedded() -> Self {
        let mut registry = Self::default();
        for (name, raw) in EMBEDDED {
            let schema: DbcSchema = serde_json::from_str(raw)
                .unwrap_or_else(|e| panic!("bundled schema {name} is invalid: {e}"));
            registry.insert(schema);
        }
        registry
    }

    pub fn insert(&mut self, schema: DbcSchema) {
        self.schemas
            .insert(normalize_table_key(&schema.file), schema);
    }

    pub fn get(&self, name: &str) -> Option<&DbcSchema> {
        self.schemas.get(&normalize_table_key(name))
    }

    /// All schemas, ordered by normalized stem.
    pub fn iter(&self) -> impl Iterator<Item = &DbcSchema> {
        self.schemas.values()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
