//! Predicate Compilation Properties
//!
//! Cross-backend properties of the predicate compiler:
//! - The hash key is bound exactly once, on one side
//! - Partial updates never assign key fields
//! - Negation applies to list fields only
//! - Output is independent of predicate insertion order
//! - Missing index hash keys fail before any backend call

use polyquery::document::DocumentQuery;
use polyquery::kv::UpdateStatement;
use polyquery::predicate::CompileError;
use polyquery::schema::SchemaLoader;
use polyquery::{
    Comparison, CompileOptions, FieldDescriptor, KvFilter, MatchMode, Predicate, RegisteredSchema, Row, Schema,
    SortSpec,
};
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn events() -> RegisteredSchema {
    RegisteredSchema::register(
        Schema::new("events")
            .with_field("id", FieldDescriptor::string().hash_key())
            .with_field("ts", FieldDescriptor::number().range_key())
            .with_field("name", FieldDescriptor::string())
            .with_field("owner", FieldDescriptor::string())
            .with_field("status", FieldDescriptor::string().local_index())
            .with_field("tags", FieldDescriptor::list())
            .with_field("createdAt", FieldDescriptor::date().global_index("owner")),
    )
    .unwrap()
}

fn compile(predicate: &Predicate, options: CompileOptions) -> KvFilter {
    KvFilter::compile(predicate, &events(), &options, "events", None).unwrap()
}

fn row(value: Value) -> Row {
    value.as_object().cloned().unwrap()
}

fn occurrences(haystack: Option<&str>, needle: &str) -> usize {
    haystack.map(|h| h.matches(needle).count()).unwrap_or(0)
}

// =============================================================================
// Hash Key Placement
// =============================================================================

/// Across every lookup and comparison, the hash key shows up in exactly one
/// of key condition or filter.
#[test]
fn test_hash_key_bound_exactly_once() {
    let predicate = Predicate::new().eq("id", "u1").eq("name", "a").eq("owner", "o");

    for options in [
        CompileOptions::query(),
        CompileOptions::scan(),
        CompileOptions::query().with_comparison(Comparison::Or),
        CompileOptions::scan().with_comparison(Comparison::Or),
        CompileOptions::scan().with_match_mode(MatchMode::Contains),
    ] {
        let f = compile(&predicate, options.clone());
        let total = occurrences(f.key_condition_expression.as_deref(), "#id ")
            + occurrences(f.filter_expression.as_deref(), "#id ");
        assert_eq!(total, 1, "options: {options:?}, filter: {f:?}");
    }
}

/// A narrowing lookup puts the hash key on the key side.
#[test]
fn test_query_hash_key_on_key_side() {
    let f = compile(&Predicate::new().eq("id", "u1").eq("name", "a"), CompileOptions::query());

    assert_eq!(f.key_condition_expression.as_deref(), Some("#id = :id"));
    assert_eq!(f.filter_expression.as_deref(), Some("#name = :name"));
}

/// Under OR the hash key stays outside the disjunction: on its own side in
/// a lookup, ANDed before a parenthesized group in a scan.
#[test]
fn test_or_keeps_hash_key_outside_disjunction() {
    let predicate = Predicate::new().eq("id", "u1").eq("name", "a").eq("owner", "o");

    let query = compile(&predicate, CompileOptions::query().with_comparison(Comparison::Or));
    assert_eq!(query.key_condition_expression.as_deref(), Some("#id = :id"));
    assert_eq!(query.filter_expression.as_deref(), Some("#name = :name or #owner = :owner"));

    let scan = compile(&predicate, CompileOptions::scan().with_comparison(Comparison::Or));
    assert!(scan.key_condition_expression.is_none());
    assert_eq!(
        scan.filter_expression.as_deref(),
        Some("#id = :id and (#name = :name or #owner = :owner)")
    );
}

/// A numeric value for a string-typed hash key binds as text on both sides.
#[test]
fn test_numeric_value_for_string_hash_key_binds_as_text() {
    let predicate = Predicate::new().eq("id", 42);

    let query = compile(&predicate, CompileOptions::query());
    assert_eq!(query.key_condition_expression.as_deref(), Some("#id = :id"));
    assert_eq!(query.expression_attribute_values[":id"], json!("42"));

    let scan = compile(&predicate, CompileOptions::scan());
    assert_eq!(scan.expression_attribute_values[":id"], json!("42"));

    let document = DocumentQuery::compile(&predicate, &events(), &CompileOptions::scan(), None).unwrap();
    assert_eq!(document.conditions["id"], json!("42"));
}

// =============================================================================
// Match Modes and Negation
// =============================================================================

/// A substring scan on a non-key string has no key condition.
#[test]
fn test_contains_scan_has_only_filter() {
    let f = compile(
        &Predicate::new().eq("name", "alice"),
        CompileOptions::scan().with_match_mode(MatchMode::Contains),
    );

    assert!(f.key_condition_expression.is_none());
    assert_eq!(f.filter_expression.as_deref(), Some("contains(#name, :name)"));
    assert_eq!(f.expression_attribute_values[":name"], json!("alice"));
}

/// `!value` negates membership on a list field.
#[test]
fn test_negation_on_list_field() {
    let f = compile(&Predicate::new().not_contains("tags", "spam"), CompileOptions::scan());

    assert_eq!(f.filter_expression.as_deref(), Some("not contains(#tags, :tags)"));
    assert_eq!(f.expression_attribute_values[":tags"], json!("spam"));
}

/// A plain value on a list field is a membership test.
#[test]
fn test_plain_value_on_list_field_is_membership() {
    let f = compile(&Predicate::new().eq("tags", "news"), CompileOptions::scan());
    assert_eq!(f.filter_expression.as_deref(), Some("contains(#tags, :tags)"));
}

/// The negation marker on a string field is literal text.
#[test]
fn test_negation_marker_on_string_field_is_literal() {
    let f = compile(&Predicate::new().eq("name", "!bob"), CompileOptions::scan());

    assert_eq!(f.filter_expression.as_deref(), Some("#name = :name"));
    assert_eq!(f.expression_attribute_values[":name"], json!("!bob"));
}

/// The document renderer reads the same plan: substring becomes a
/// case-insensitive escaped regex, negation becomes `$ne`.
#[test]
fn test_document_renderer_shares_semantics() {
    let query = DocumentQuery::compile(
        &Predicate::new().eq("name", "a.b").not_contains("tags", "spam"),
        &events(),
        &CompileOptions::scan().with_match_mode(MatchMode::Contains),
        None,
    )
    .unwrap();

    assert_eq!(
        Value::Object(query.conditions),
        json!({
            "name": {"$regex": "a\\.b", "$options": "i"},
            "tags": {"$ne": "spam"}
        })
    );
}

// =============================================================================
// Updates
// =============================================================================

/// Neither the hash key nor the range key is ever assigned.
#[test]
fn test_update_never_assigns_keys() {
    let statement = UpdateStatement::build(
        &row(json!({"id": "u1", "ts": 3, "name": "n", "status": "", "owner": null})),
        &events(),
        "events",
    )
    .unwrap();

    let expression = statement.update_expression.clone().unwrap();
    assert_eq!(expression, "set #name= :name");
    assert!(!statement.expression_attribute_names.values().any(|f| f == "id" || f == "ts"));
    assert_eq!(Value::Object(statement.key), json!({"id": "u1", "ts": 3}));
}

/// Document updates follow the same rule.
#[test]
fn test_document_update_never_sets_keys() {
    let update = polyquery::document::DocumentUpdate::build(
        &row(json!({"id": "u1", "ts": 3, "name": "n"})),
        &events(),
    )
    .unwrap();

    assert_eq!(Value::Object(update.set), json!({"name": "n"}));
    assert_eq!(Value::Object(update.filter), json!({"id": "u1", "ts": 3}));
}

// =============================================================================
// Determinism
// =============================================================================

/// Compilation ignores insertion order and repeats byte for byte.
#[test]
fn test_compilation_is_idempotent() {
    let a = Predicate::new()
        .eq("owner", "o")
        .between("createdAt", 1_700_000_000_000i64, 1_800_000_000_000i64)
        .any_of("name", ["x", "y"])
        .eq("id", "u1");
    let b = Predicate::new()
        .eq("id", "u1")
        .any_of("name", ["x", "y"])
        .between("createdAt", 1_700_000_000_000i64, 1_800_000_000_000i64)
        .eq("owner", "o");

    for options in [CompileOptions::query(), CompileOptions::scan()] {
        let first = compile(&a, options.clone());
        assert_eq!(first, compile(&a, options.clone()));
        assert_eq!(first, compile(&b, options.clone()));
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&compile(&b, options)).unwrap()
        );
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Sorting on a global index without its hash key fails at compile time.
#[test]
fn test_missing_global_index_hash_key() {
    let err = KvFilter::compile(
        &Predicate::new().eq("name", "a"),
        &events(),
        &CompileOptions::query().with_sort(Some(SortSpec::desc("createdAt_global"))),
        "events",
        None,
    )
    .unwrap_err();

    assert_eq!(
        err,
        CompileError::MissingIndexHashKey {
            index: "createdAt_global".into(),
            hash_key: "owner".into(),
        }
    );
    assert!(err.is_configuration());
}

/// Schemas loaded from JSON compile the same as schemas built in code.
#[test]
fn test_loaded_schema_compiles_like_built_schema() {
    let loaded = SchemaLoader::from_value(
        "events",
        &json!({
            "id": {"type": "String", "isHashKey": true},
            "ts": {"type": "Number", "isRangeKey": true},
            "name": {"type": "String"}
        }),
    )
    .unwrap();
    let registered = RegisteredSchema::register(loaded).unwrap();
    let predicate = Predicate::new().eq("id", "u1").eq("name", "a");

    let f = KvFilter::compile(&predicate, &registered, &CompileOptions::query(), "events", None).unwrap();
    assert_eq!(f.key_condition_expression.as_deref(), Some("#id = :id"));
    assert_eq!(f.filter_expression.as_deref(), Some("#name = :name"));
}
