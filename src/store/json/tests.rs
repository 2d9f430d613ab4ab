use super::*;
use serde_json::json;
use tempfile::TempDir;

fn document(id: &str, embedding: Vec<f32>) -> Document {
    let mut metadata = crate::store::Metadata::new();
    metadata.insert("name".to_string(), json!(id));
    Document {
        id: id.to_string(),
        text: format!("Food: {}", id),
        metadata,
        embedding,
    }
}

fn create_test_store() -> (JsonFileStore, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = JsonFileStore::new(temp_dir.path().join("rag").join("foods.json"));
    (store, temp_dir)
}

#[tokio::test]
async fn missing_file_loads_empty() {
    let (store, _temp_dir) = create_test_store();
    assert!(store.load().await.is_empty());
    assert!(!store.path().exists());
}

#[tokio::test]
async fn save_creates_directories_and_reloads() {
    let (store, _temp_dir) = create_test_store();
    let documents = vec![
        document("rice", vec![1.0, 0.0]),
        document("dal", vec![0.0, 1.0]),
    ];

    store.save(&documents).await.expect("should save documents");
    assert!(store.path().exists());

    let reloaded = JsonFileStore::new(store.path()).load().await;
    assert_eq!(reloaded, documents);
}

#[tokio::test]
async fn persisted_format_is_a_plain_json_array() {
    let (store, _temp_dir) = create_test_store();
    store
        .save(&[document("ghee", vec![0.5, 0.5])])
        .await
        .expect("should save documents");

    let raw = std::fs::read_to_string(store.path()).expect("should read store file");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("store file is json");
    assert_eq!(
        value,
        json!([{
            "id": "ghee",
            "text": "Food: ghee",
            "metadata": { "name": "ghee" },
            "embedding": [0.5, 0.5]
        }])
    );
}

#[tokio::test]
async fn save_overwrites_previous_contents() {
    let (store, _temp_dir) = create_test_store();
    store
        .save(&[document("rice", vec![1.0]), document("dal", vec![2.0])])
        .await
        .expect("first save");
    store
        .save(&[document("ghee", vec![3.0])])
        .await
        .expect("second save");

    let ids: Vec<String> = store.load().await.into_iter().map(|d| d.id).collect();
    assert_eq!(ids, vec!["ghee".to_string()]);
    assert!(!store.path().with_extension("json.tmp").exists());
}

#[tokio::test]
async fn corrupt_file_loads_empty() {
    let (store, _temp_dir) = create_test_store();
    std::fs::create_dir_all(store.path().parent().expect("has parent")).expect("mkdir");
    std::fs::write(store.path(), "{ this is not json").expect("should write garbage");

    assert!(store.load().await.is_empty());
}

#[tokio::test]
async fn non_array_file_loads_empty() {
    let (store, _temp_dir) = create_test_store();
    std::fs::create_dir_all(store.path().parent().expect("has parent")).expect("mkdir");
    std::fs::write(store.path(), r#"{"id": "rice"}"#).expect("should write object");

    assert!(store.load().await.is_empty());
}

#[tokio::test]
async fn documents_without_metadata_are_accepted() {
    let (store, _temp_dir) = create_test_store();
    std::fs::create_dir_all(store.path().parent().expect("has parent")).expect("mkdir");
    std::fs::write(
        store.path(),
        r#"[{"id": "rice", "text": "Food: Rice", "embedding": [1, 0]}]"#,
    )
    .expect("should write store");

    let documents = store.load().await;
    assert_eq!(documents.len(), 1);
    assert!(documents[0].metadata.is_empty());
    assert_eq!(documents[0].embedding, vec![1.0, 0.0]);
}

#[tokio::test]
async fn external_rewrite_invalidates_cache() {
    let (store, _temp_dir) = create_test_store();
    store
        .save(&[document("rice", vec![1.0])])
        .await
        .expect("should save");
    assert_eq!(store.load().await.len(), 1);

    // Another process replaces the file with a different length
    let other = JsonFileStore::new(store.path());
    other
        .save(&[document("rice", vec![1.0]), document("moong-dal", vec![2.0])])
        .await
        .expect("should save from second handle");

    let ids: Vec<String> = store.load().await.into_iter().map(|d| d.id).collect();
    assert_eq!(ids, vec!["rice".to_string(), "moong-dal".to_string()]);
}
