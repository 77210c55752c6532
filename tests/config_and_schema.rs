//! Configuration and Schema Loading Tests
//!
//! Tests for the JSON-facing setup path:
//! - Config files load with defaults for every missing field
//! - Invalid configs are rejected before any entity is built
//! - Schemas loaded from files drive entities end to end

use std::fs;
use std::sync::Arc;

use polyquery::schema::SchemaLoader;
use polyquery::store::RetryPolicy;
use polyquery::{
    CompileOptions, KvEntity, MemoryDocumentStore, MemoryKvStore, Predicate, QueryConfig, Row, StoreError,
    WriteContext,
};
use serde_json::{json, Value};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn row(value: Value) -> Row {
    value.as_object().cloned().unwrap()
}

fn write_file(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

const USERS_SCHEMA: &str = r#"[
    { "name": "id", "type": "String", "isHashKey": true },
    { "name": "createdAt", "type": "Date", "isRangeKey": true },
    { "name": "name", "type": "String" },
    { "name": "status", "type": "String", "isLocalIndex": true }
]"#;

// =============================================================================
// Config Loading
// =============================================================================

/// A partial config file fills the rest from defaults.
#[test]
fn test_config_file_with_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "query.json",
        r#"{ "table_prefix": "prod_", "total_segments": 4, "retry": { "max_attempts": 3 } }"#,
    );

    let config = QueryConfig::from_file(&path).unwrap();

    assert_eq!(config.table_prefix, "prod_");
    assert_eq!(config.total_segments, 4);
    assert_eq!(config.page_size, 100);
    assert_eq!(config.batch_write_chunk, 25);
    assert_eq!(config.retry.max_attempts, 3);
    assert_eq!(config.retry.initial_backoff_ms, RetryPolicy::default().initial_backoff_ms);
    assert_eq!(config.table_name("users"), "prod_users");
}

/// Zero sizes are configuration errors.
#[test]
fn test_config_rejects_zero_segments() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "query.json", r#"{ "total_segments": 0 }"#);

    let err = QueryConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, StoreError::InvalidConfig(_)));
    assert!(err.is_configuration());
}

/// Missing files and malformed JSON surface as configuration errors.
#[test]
fn test_config_unreadable_or_malformed() {
    let dir = TempDir::new().unwrap();

    let missing = QueryConfig::from_file(dir.path().join("absent.json")).unwrap_err();
    assert_eq!(missing.code(), "STORE_INVALID_CONFIG");

    let path = write_file(&dir, "broken.json", "{ not json");
    let malformed = QueryConfig::from_file(&path).unwrap_err();
    assert_eq!(malformed.code(), "STORE_INVALID_CONFIG");
}

/// An entity refuses a config that fails validation.
#[test]
fn test_entity_rejects_invalid_config() {
    let schema = SchemaLoader::from_json_str("users", USERS_SCHEMA).unwrap();
    let config = QueryConfig::default().with_page_size(0);

    let err = KvEntity::new(schema, Arc::new(MemoryKvStore::new()), config).unwrap_err();
    assert!(err.is_configuration());
}

// =============================================================================
// Schema Loading
// =============================================================================

/// A schema file drives a key-value entity end to end, table prefix included.
#[tokio::test]
async fn test_schema_file_drives_kv_entity() {
    let dir = TempDir::new().unwrap();
    let schema_path = write_file(&dir, "users.json", USERS_SCHEMA);
    let schema = SchemaLoader::from_json_str("users", &fs::read_to_string(schema_path).unwrap()).unwrap();

    let store = Arc::new(MemoryKvStore::new().with_table("app_users", &["id", "createdAt"]));
    let config = QueryConfig::default().with_table_prefix("app_");
    let users = KvEntity::new(schema, Arc::clone(&store) as _, config).unwrap();
    assert_eq!(users.table_name(), "app_users");

    users
        .insert(
            row(json!({"id": "u1", "createdAt": 1709251200000i64, "name": "Ann", "status": "active"})),
            &WriteContext::new(),
        )
        .await
        .unwrap();

    let rows = users
        .query_all(&Predicate::new().eq("id", "u1"), CompileOptions::query(), None)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], json!("Ann"));
    assert_eq!(store.rows("app_users").len(), 1);
}

/// A global index pointing at an undeclared field fails registration.
#[test]
fn test_schema_with_dangling_global_index() {
    let err = SchemaLoader::from_value(
        "users",
        &json!({
            "id": {"type": "String", "isHashKey": true},
            "createdAt": {"type": "Date", "globalIndex": {"hashKey": "owner"}}
        }),
    )
    .unwrap_err();

    assert_eq!(err.code(), "SCHEMA_UNKNOWN_INDEX_HASH_KEY");
}

/// The same schema file serves the document backend.
#[tokio::test]
async fn test_schema_file_drives_document_entity() {
    let schema = SchemaLoader::from_json_str("users", USERS_SCHEMA).unwrap();
    let store = Arc::new(MemoryDocumentStore::new().with_collection("users", &["id", "createdAt"]));
    let users = polyquery::DocumentEntity::new(schema, Arc::clone(&store) as _, QueryConfig::default()).unwrap();

    users
        .insert(row(json!({"id": "u1", "createdAt": 5, "name": "Ann"})), &WriteContext::new())
        .await
        .unwrap();

    let found = users
        .get(&row(json!({"id": "u1", "createdAt": 5})), None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found["name"], json!("Ann"));
}
