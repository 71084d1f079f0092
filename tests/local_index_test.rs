use ekphrasis::error::IndexError;
use ekphrasis::index::local::LocalIndex;
use ekphrasis::index::{IndexRecord, RecordMetadata, VectorIndexClient, UNKNOWN_TITLE};
use tempfile::TempDir;

const DIMS: usize = 8;

fn spike(pos: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; DIMS];
    v[pos] = 1.0;
    v
}

fn record(id: &str, values: Vec<f32>, title: Option<&str>) -> IndexRecord {
    IndexRecord {
        id: Some(id.into()),
        values,
        metadata: RecordMetadata {
            title: title.map(Into::into),
            text: Some(format!("text of {id}")),
        },
    }
}

fn seeded() -> LocalIndex {
    let index = LocalIndex::open_in_memory(DIMS).unwrap();
    index
        .upsert(&[
            record("a", spike(0), Some("Because I could not stop for Death")),
            record("b", spike(1), Some("Hope is the thing with feathers")),
            record("c", vec![0.9, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0], None),
        ])
        .unwrap();
    index
}

#[tokio::test]
async fn nearest_document_comes_first() {
    let index = seeded();

    let results = index.search(&spike(0), 3).await.unwrap();

    let ids: Vec<&str> = results.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "c", "b"]);
    assert_eq!(results[0].title, "Because I could not stop for Death");
    assert_eq!(results[0].vector, spike(0));
    assert!((results[0].score - 1.0).abs() < 1e-5);
    assert!(results[0].score > results[1].score);
}

#[tokio::test]
async fn top_k_is_respected() {
    let index = seeded();
    assert_eq!(index.search(&spike(1), 2).await.unwrap().len(), 2);
    assert!(index.search(&spike(1), 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_title_falls_back() {
    let index = seeded();
    let results = index.search(&spike(0), 2).await.unwrap();
    assert_eq!(results[1].id, "c");
    assert_eq!(results[1].title, UNKNOWN_TITLE);
}

#[tokio::test]
async fn wrong_width_query_is_a_dimension_error() {
    let index = seeded();
    let err = index.search(&[1.0, 0.0], 3).await.unwrap_err();
    assert!(matches!(
        err,
        IndexError::Dimension {
            expected: 8,
            actual: 2
        }
    ));
    assert!(err.into_fatal().is_some());
}

#[test]
fn upsert_overwrites_and_assigns_ids() {
    let index = seeded();
    index
        .upsert(&[
            record("a", spike(2), Some("Renamed")),
            IndexRecord {
                id: None,
                values: spike(3),
                metadata: RecordMetadata::default(),
            },
        ])
        .unwrap();
    assert_eq!(index.count().unwrap(), 4);
}

#[tokio::test]
async fn reopening_persists_and_checks_width() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("nested").join("index.db");

    {
        let index = LocalIndex::open(&path, DIMS).unwrap();
        index.upsert(&[record("a", spike(0), Some("First"))]).unwrap();
    }
    assert!(path.exists());

    let reopened = LocalIndex::open(&path, DIMS).unwrap();
    let results = reopened.search(&spike(0), 1).await.unwrap();
    assert_eq!(results[0].title, "First");

    drop(reopened);
    assert!(LocalIndex::open(&path, 16).is_err());
}
