//! Key layout introspection
//!
//! Derives the key structure of an entity from its schema in a single pass:
//! primary hash key, primary range key, locally indexed fields and global
//! indexes. Computed once at registration and shared by every operation.

use serde::Serialize;

use super::types::{FieldType, Schema};

/// Suffix appended to a field name to form its global index name
pub const GLOBAL_INDEX_SUFFIX: &str = "_global";

/// A global secondary index derived from a `globalIndex` descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalIndex {
    /// Synthesized index name (`{field}_global`)
    pub name: String,
    /// Hash key field of the index
    pub hash_key: String,
    /// Declared type of the hash key field
    pub hash_key_type: Option<FieldType>,
    /// Field the index is sorted by
    pub indexed_field: String,
    /// Declared type of the indexed field
    pub indexed_type: FieldType,
}

/// An index selected by name for sorting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexRef<'a> {
    /// Local index named after its field
    Local(&'a str),
    /// Global index
    Global(&'a GlobalIndex),
}

impl<'a> IndexRef<'a> {
    /// Index name as sent to the backend
    pub fn name(&self) -> &'a str {
        match self {
            IndexRef::Local(field) => field,
            IndexRef::Global(index) => &index.name,
        }
    }

    /// Field the index is ordered by
    pub fn sort_field(&self) -> &'a str {
        match self {
            IndexRef::Local(field) => field,
            IndexRef::Global(index) => &index.indexed_field,
        }
    }
}

/// Key structure of an entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLayout {
    hash_key: Option<String>,
    range_key: Option<String>,
    local_indexes: Vec<String>,
    global_indexes: Vec<GlobalIndex>,
}

impl KeyLayout {
    /// Scan the schema once. The first flagged field wins for each key.
    pub fn from_schema(schema: &Schema) -> Self {
        let mut layout = KeyLayout {
            hash_key: None,
            range_key: None,
            local_indexes: Vec::new(),
            global_indexes: Vec::new(),
        };

        for (name, descriptor) in schema.fields() {
            if descriptor.is_hash_key && layout.hash_key.is_none() {
                layout.hash_key = Some(name.to_string());
            }
            if descriptor.is_range_key && layout.range_key.is_none() {
                layout.range_key = Some(name.to_string());
            }
            if descriptor.is_local_index {
                layout.local_indexes.push(name.to_string());
            }
            if let Some(spec) = &descriptor.global_index {
                layout.global_indexes.push(GlobalIndex {
                    name: format!("{}{}", name, GLOBAL_INDEX_SUFFIX),
                    hash_key: spec.hash_key.clone(),
                    hash_key_type: schema.field(&spec.hash_key).map(|d| d.field_type),
                    indexed_field: name.to_string(),
                    indexed_type: descriptor.field_type,
                });
            }
        }

        layout
    }

    /// Primary hash and range key names. `None` hash key means the entity
    /// has no addressable primary key.
    pub fn primary_keys(&self) -> (Option<&str>, Option<&str>) {
        (self.hash_key.as_deref(), self.range_key.as_deref())
    }

    pub fn hash_key(&self) -> Option<&str> {
        self.hash_key.as_deref()
    }

    pub fn range_key(&self) -> Option<&str> {
        self.range_key.as_deref()
    }

    /// Locally indexed fields in declaration order
    pub fn indexed_fields(&self) -> &[String] {
        &self.local_indexes
    }

    pub fn is_locally_indexed(&self, field: &str) -> bool {
        self.local_indexes.iter().any(|f| f == field)
    }

    /// Global indexes in declaration order
    pub fn global_indexes(&self) -> &[GlobalIndex] {
        &self.global_indexes
    }

    /// Look up a global index by its synthesized name
    pub fn global_index(&self, name: &str) -> Option<&GlobalIndex> {
        self.global_indexes.iter().find(|g| g.name == name)
    }

    /// Resolve an index name: a global index name, or a locally indexed field
    pub fn resolve_index(&self, name: &str) -> Option<IndexRef<'_>> {
        if let Some(global) = self.global_index(name) {
            return Some(IndexRef::Global(global));
        }
        self.local_indexes
            .iter()
            .find(|f| *f == name)
            .map(|f| IndexRef::Local(f.as_str()))
    }

    /// Keys that uniquely position a row within the given sort order.
    ///
    /// For a global index: `[indexed field, index hash key]` with the primary
    /// hash key excluded. Otherwise `[hash key, range key]` minus absent keys.
    pub fn required_keys(&self, sort_index: Option<&str>) -> Vec<String> {
        if let Some(global) = sort_index.and_then(|name| self.global_index(name)) {
            return vec![global.indexed_field.clone(), global.hash_key.clone()];
        }

        self.hash_key
            .iter()
            .chain(self.range_key.iter())
            .cloned()
            .collect()
    }

    /// Fields copied from a row into a synthesized continuation cursor:
    /// the required keys, then the sort field, then any primary key not yet
    /// listed. Index reads need the table key as well as the index key to
    /// resume.
    pub fn cursor_keys(&self, sort_index: Option<&str>) -> Vec<String> {
        let mut keys = self.required_keys(sort_index);
        let sort_field = sort_index
            .and_then(|name| self.resolve_index(name))
            .map(|index| index.sort_field());

        for field in sort_field
            .into_iter()
            .chain(self.hash_key.as_deref())
            .chain(self.range_key.as_deref())
        {
            if !keys.iter().any(|k| k == field) {
                keys.push(field.to_string());
            }
        }
        keys
    }
}
