use super::*;
use crate::embeddings::testing::FakeGateway;
use crate::store::JsonFileStore;
use serde_json::json;
use std::fs;
use tempfile::TempDir;

fn row(pairs: &[(&str, &str)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

#[test]
fn slugify_collapses_and_trims() {
    assert_eq!(slugify("Basmati Rice"), "basmati-rice");
    assert_eq!(slugify("Mung Dal!"), "mung-dal");
    assert_eq!(slugify("mung-dal"), "mung-dal");
    assert_eq!(slugify("  Ghee (clarified)  "), "ghee-clarified");
    assert_eq!(slugify("Dosa / Masala__Dosa"), "dosa-masala-dosa");
    assert_eq!(slugify("Apple"), slugify("APPLE"));
}

#[test]
fn slugify_without_alphanumerics_uses_sentinel() {
    assert_eq!(slugify("!!!"), "unknown");
    assert_eq!(slugify(""), "unknown");
}

#[test]
fn slugify_is_deterministic() {
    let name = "Paneer Tikka (Tandoori)";
    assert_eq!(slugify(name), slugify(name));
}

#[test]
fn maps_primary_column_names() {
    let document = row_to_document(&row(&[
        ("food", "Apple"),
        ("Caloric Value", "52"),
        ("Protein", "0.3"),
        ("Carbohydrates", "14"),
        ("Fat", "0.2"),
        ("Dietary Fiber", "2.4"),
    ]));

    assert_eq!(document.id, "apple");
    assert_eq!(
        document.text,
        "Food: Apple | Calories: 52 | Protein: 0.3g | Carbs: 14g | Fat: 0.2g | Fiber: 2.4g"
    );
    assert_eq!(document.metadata["name"], json!("Apple"));
    assert_eq!(document.metadata["calories"], json!("52"));
    assert_eq!(document.metadata["fiber"], json!("2.4"));
    assert_eq!(document.metadata["source"], json!("foods_csv"));
}

#[test]
fn maps_alternate_column_names() {
    let document = row_to_document(&row(&[
        ("name", "Moong Dal"),
        ("calories_per_100g", "347"),
        ("protein_g", "24"),
        ("carbs_g", "63"),
        ("fat_g", "1.2"),
        ("fiber_g", "16"),
    ]));

    assert_eq!(document.id, "moong-dal");
    assert_eq!(
        document.text,
        "Food: Moong Dal | Calories: 347 | Protein: 24g | Carbs: 63g | Fat: 1.2g | Fiber: 16g"
    );
}

#[test]
fn earlier_alias_wins_and_empty_values_fall_through() {
    let document = row_to_document(&row(&[
        ("food", ""),
        ("name", "Ghee"),
        ("Caloric Value", "900"),
        ("calories", "880"),
        ("Protein", " "),
        ("protein_g", "0"),
    ]));

    assert_eq!(document.metadata["name"], json!("Ghee"));
    assert_eq!(document.metadata["calories"], json!("900"));
    assert_eq!(document.metadata["protein"], json!("0"));
    assert_eq!(
        document.text,
        "Food: Ghee | Calories: 900 | Protein: 0g"
    );
}

#[test]
fn values_are_not_parsed() {
    let document = row_to_document(&row(&[("food", "Jaggery"), ("Caloric Value", "~383 kcal")]));
    assert_eq!(document.metadata["calories"], json!("~383 kcal"));
    assert_eq!(document.text, "Food: Jaggery | Calories: ~383 kcal");
}

#[test]
fn row_without_known_fields_gets_sentinel() {
    let document = row_to_document(&row(&[("unrelated", "x")]));

    assert_eq!(document.id, "unknown");
    assert_eq!(document.text, "Food: Unknown");
    assert_eq!(document.metadata["name"], json!("Unknown"));
    assert_eq!(document.metadata["calories"], json!(""));
    assert_eq!(document.metadata["source"], json!("foods_csv"));
}

#[test]
fn reads_csv_with_trimming_and_short_rows() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("foods.csv");
    fs::write(
        &path,
        "food, Caloric Value ,Protein\n Apple ,52, 0.3\n\"Rice, Basmati\",130\n",
    )
    .expect("should write csv");

    let rows = read_csv_file(&path).expect("should read csv");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["food"], "Apple");
    assert_eq!(rows[0]["Caloric Value"], "52");
    assert_eq!(rows[1]["food"], "Rice, Basmati");
    assert!(!rows[1].contains_key("Protein"));
}

#[test]
fn missing_file_is_an_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let result = read_csv_file(&temp_dir.path().join("absent.csv"));
    assert!(matches!(result, Err(RagError::Ingest(message)) if message.contains("absent.csv")));
}

#[test]
fn discovers_csv_files_in_directories() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(temp_dir.path().join("b.csv"), "food\nRice\n").expect("write");
    fs::write(temp_dir.path().join("a.CSV"), "food\nDal\n").expect("write");
    fs::write(temp_dir.path().join("notes.txt"), "ignore me").expect("write");

    let sources =
        discover_sources(&[temp_dir.path().to_path_buf()]).expect("should find sources");
    let names: Vec<String> = sources
        .iter()
        .map(|p| p.file_name().expect("file name").to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.CSV".to_string(), "b.csv".to_string()]);
}

#[test]
fn discovery_errors() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let empty = discover_sources(&[temp_dir.path().to_path_buf()]);
    assert!(matches!(empty, Err(RagError::Ingest(_))));

    let missing = discover_sources(&[temp_dir.path().join("nope")]);
    assert!(matches!(missing, Err(RagError::Ingest(message)) if message.contains("not found")));
}

#[tokio::test]
async fn ingest_paths_merges_all_files_in_one_batch() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let data_dir = temp_dir.path().join("data");
    fs::create_dir_all(&data_dir).expect("mkdir");
    fs::write(
        data_dir.join("nutrition.csv"),
        "food,Caloric Value,Protein\nApple,52,0.3\nBasmati Rice,130,2.7\n",
    )
    .expect("write");
    fs::write(
        data_dir.join("indian.csv"),
        "name,calories_per_100g,protein_g\nMoong Dal,347,24\n",
    )
    .expect("write");

    let store = Arc::new(JsonFileStore::new(temp_dir.path().join("foods.json")));
    let gateway = Arc::new(FakeGateway::constant(vec![0.1, 0.2, 0.3]));
    let ingestor = Ingestor::new(Arc::<JsonFileStore>::clone(&store), Arc::<FakeGateway>::clone(&gateway));

    let report = ingestor
        .ingest_paths(&[data_dir])
        .await
        .expect("ingestion succeeds");

    assert_eq!(report.files, 2);
    assert_eq!(report.rows, 3);
    assert_eq!(report.merge.added, 3);
    assert_eq!(gateway.calls(), 1);

    let ids: Vec<String> = store.load().await.into_iter().map(|d| d.id).collect();
    assert_eq!(ids, vec!["moong-dal", "apple", "basmati-rice"]);
}

#[tokio::test]
async fn unreadable_file_aborts_before_merge() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let good = temp_dir.path().join("good.csv");
    let bad = temp_dir.path().join("bad.csv");
    fs::write(&good, "food\nApple\n").expect("write");
    fs::write(&bad, b"food\n\xff\xfe\n").expect("write");

    let store = Arc::new(JsonFileStore::new(temp_dir.path().join("foods.json")));
    let gateway = Arc::new(FakeGateway::constant(vec![1.0]));
    let ingestor = Ingestor::new(Arc::<JsonFileStore>::clone(&store), Arc::<FakeGateway>::clone(&gateway));

    let result = ingestor.ingest_paths(&[good, bad]).await;

    assert!(matches!(result, Err(RagError::Ingest(message)) if message.contains("bad.csv")));
    assert_eq!(gateway.calls(), 0);
    assert!(!store.path().exists());
}

#[tokio::test]
async fn alias_conventions_collapse_to_one_document() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = Arc::new(JsonFileStore::new(temp_dir.path().join("foods.json")));

    let first = Arc::new(FakeGateway::constant(vec![1.0, 0.0]));
    Ingestor::new(Arc::<JsonFileStore>::clone(&store), Arc::<FakeGateway>::clone(&first))
        .ingest_rows(&[row(&[("food", "Apple"), ("Caloric Value", "52")])])
        .await
        .expect("first run succeeds");

    let second = Arc::new(FakeGateway::constant(vec![0.0, 1.0]));
    let report = Ingestor::new(Arc::<JsonFileStore>::clone(&store), Arc::<FakeGateway>::clone(&second))
        .ingest_rows(&[row(&[("name", "Apple"), ("calories_per_100g", "52")])])
        .await
        .expect("second run succeeds");

    assert_eq!(report.added, 0);
    assert_eq!(second.calls(), 0);

    let stored = store.load().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, "apple");
    assert_eq!(stored[0].embedding, vec![1.0, 0.0]);
}
