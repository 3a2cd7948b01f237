//! Cross-crate integration and E2E tests
//!
//! These tests run the full answer pipeline - embed, encode, search,
//! resolve - against a real in-memory database with the vec0 index built,
//! using the mock embedder for deterministic vectors.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use mimir_query::{
    MockEmbedder, NO_RESULTS_MESSAGE, QueryService, Tool, ToolRegistry, WhoTool,
    create_query_tools,
};
use mimir_store::{Database, DocumentResolver, VectorIndex, encode_vector};

const DIM: usize = 4;

fn write_doc(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    write!(f, "{}", content).unwrap();
    path.to_str().unwrap().to_string()
}

fn seed(db: &Arc<Database>, path: &str, vector: &[f32]) -> String {
    let record = db.upsert_file(path, "text/plain", "hash").unwrap();
    db.replace_embedding(&record.id, vector).unwrap();
    record.id
}

fn built_index(db: &Arc<Database>) -> VectorIndex {
    let index = VectorIndex::with_dimensions(Arc::clone(db), DIM);
    index.rebuild().unwrap();
    index
}

/// E2E: a query whose embedding equals a stored vector returns that
/// document's text, trimmed.
#[tokio::test]
async fn test_e2e_answer_returns_document_text() {
    let dir = tempfile::tempdir().unwrap();
    let alice = write_doc(dir.path(), "alice.txt", "Alice bio.\n");

    let db = Arc::new(Database::open_in_memory().unwrap());
    seed(&db, &alice, &[1.0, 0.0, 0.0, 0.0]);

    let mock = MockEmbedder::new(DIM);
    mock.set_response("Alice", vec![1.0, 0.0, 0.0, 0.0]);

    let service = QueryService::new(
        Arc::new(mock),
        built_index(&db),
        DocumentResolver::new(db),
    );

    assert_eq!(service.answer("Alice").await, "Alice bio.");
}

/// E2E: an index built from zero rows answers with the fixed no-results
/// message for any query.
#[tokio::test]
async fn test_e2e_empty_store_returns_no_information() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let mock = MockEmbedder::new(DIM).with_fallback(vec![1.0, 0.0, 0.0, 0.0]);

    let service = QueryService::new(
        Arc::new(mock),
        built_index(&db),
        DocumentResolver::new(db),
    );

    assert_eq!(service.answer("anyone").await, NO_RESULTS_MESSAGE);
    assert_eq!(service.answer("anything else").await, NO_RESULTS_MESSAGE);
}

/// E2E: the query's embedding always encodes to 4 * dimensions bytes.
#[tokio::test]
async fn test_e2e_embedding_encodes_to_fixed_width() {
    let mock = MockEmbedder::new(512).with_fallback(vec![0.25; 512]);
    let embedding = mimir_query::TextEmbedder::embed(&mock, "any text at all")
        .await
        .unwrap();
    assert_eq!(encode_vector(&embedding).len(), 2048);
}

/// E2E: a search hit whose file id has no files row becomes an error
/// string, never a fault.
#[tokio::test]
async fn test_e2e_dangling_hit_reports_error() {
    let dir = tempfile::tempdir().unwrap();
    let alice = write_doc(dir.path(), "alice.txt", "Alice bio.");

    let db = Arc::new(Database::open_in_memory().unwrap());
    seed(&db, &alice, &[1.0, 0.0, 0.0, 0.0]);
    let index = built_index(&db);

    // The file record disappears after the index was built.
    db.delete_file(&alice).unwrap();

    let mock = MockEmbedder::new(DIM).with_fallback(vec![1.0, 0.0, 0.0, 0.0]);
    let service = QueryService::new(Arc::new(mock), index, DocumentResolver::new(db));

    let answer = service.answer("Alice").await;
    assert!(answer.starts_with("Error"), "got: {}", answer);
}

/// E2E: an unreadable document path becomes an error string.
#[tokio::test]
async fn test_e2e_unreadable_path_reports_error() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    seed(&db, "/nonexistent/alice.txt", &[1.0, 0.0, 0.0, 0.0]);

    let mock = MockEmbedder::new(DIM).with_fallback(vec![1.0, 0.0, 0.0, 0.0]);
    let service = QueryService::new(
        Arc::new(mock),
        built_index(&db),
        DocumentResolver::new(db),
    );

    let answer = service.answer("Alice").await;
    assert!(answer.starts_with("Error"), "got: {}", answer);
}

/// E2E: with a limit above one, result texts join with the separator line,
/// nearest first.
#[tokio::test]
async fn test_e2e_multiple_results_join_with_separator() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_doc(dir.path(), "a.txt", "A");
    let b = write_doc(dir.path(), "b.txt", "B");

    let db = Arc::new(Database::open_in_memory().unwrap());
    seed(&db, &a, &[1.0, 0.0, 0.0, 0.0]);
    seed(&db, &b, &[0.8, 0.6, 0.0, 0.0]);

    // Nearer to A than to B, so the order is deterministic.
    let mock = MockEmbedder::new(DIM).with_fallback(vec![1.0, 0.1, 0.0, 0.0]);
    let service = QueryService::new(
        Arc::new(mock),
        built_index(&db),
        DocumentResolver::new(db),
    )
    .with_limit(2);

    assert_eq!(service.answer("both").await, "A\n---\nB");
}

/// E2E: rebuilding the index does not change what a fixed query returns.
#[tokio::test]
async fn test_e2e_rebuild_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    let alice = write_doc(dir.path(), "alice.txt", "Alice bio.");
    let bob = write_doc(dir.path(), "bob.txt", "Bob bio.");

    let db = Arc::new(Database::open_in_memory().unwrap());
    seed(&db, &alice, &[1.0, 0.0, 0.0, 0.0]);
    seed(&db, &bob, &[0.0, 1.0, 0.0, 0.0]);

    let index = built_index(&db);
    let query = encode_vector(&[0.9, 0.2, 0.0, 0.0]);
    let first = index.search(&query, 2).unwrap();

    index.rebuild().unwrap();
    let second = index.search(&query, 2).unwrap();
    assert_eq!(first, second);
}

/// E2E: the full tool surface - registry dispatch down to document text.
#[tokio::test]
async fn test_e2e_who_tool_through_registry() {
    let dir = tempfile::tempdir().unwrap();
    let alice = write_doc(dir.path(), "alice.txt", "Alice bio.");

    let db = Arc::new(Database::open_in_memory().unwrap());
    seed(&db, &alice, &[1.0, 0.0, 0.0, 0.0]);

    let mock = MockEmbedder::new(DIM);
    mock.set_response("Alice", vec![1.0, 0.0, 0.0, 0.0]);

    let service = Arc::new(QueryService::new(
        Arc::new(mock),
        built_index(&db),
        DocumentResolver::new(db),
    ));

    let mut registry = ToolRegistry::new();
    for tool in create_query_tools(service) {
        registry.register_arc(tool);
    }
    assert_eq!(registry.len(), 1);

    let result = registry
        .execute("who", serde_json::json!({"name": "Alice"}))
        .await;
    assert!(!result.is_error());
    assert_eq!(result.content(), "Alice bio.");

    // Unknown tools come back as error results, not faults.
    let result = registry.execute("nope", serde_json::json!({})).await;
    assert!(result.is_error());
}

/// The tool definition advertises exactly one required string argument.
#[test]
fn test_who_tool_definition_shape() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let mock = MockEmbedder::new(DIM).with_fallback(vec![1.0, 0.0, 0.0, 0.0]);
    let service = Arc::new(QueryService::new(
        Arc::new(mock),
        VectorIndex::with_dimensions(Arc::clone(&db), DIM),
        DocumentResolver::new(db),
    ));

    let def = WhoTool::new(service).to_definition();
    assert_eq!(def.name, "who");
    assert_eq!(def.input_schema["required"], serde_json::json!(["name"]));
    assert_eq!(def.input_schema["properties"]["name"]["type"], "string");
}
