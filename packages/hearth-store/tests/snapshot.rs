use std::{path::PathBuf, sync::Arc};

use time::macros::datetime;

use hearth_config::Retrieval;
use hearth_domain::Partition;
use hearth_service::{FetchRequest, PartitionBatch, RecallRequest, StoreAdapter, TimeWindow};
use hearth_store::{Error, SnapshotStore};
use hearth_testkit::{FixedEmbedding, ScriptedRerank};

fn fixture() -> SnapshotStore {
	let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/snapshot.json");

	SnapshotStore::load(&path).expect("Failed to load snapshot fixture.")
}

fn request(elderly_id: &str, time_window: TimeWindow) -> FetchRequest {
	FetchRequest {
		elderly_id: elderly_id.to_string(),
		query_text: "insulin".to_string(),
		time_window,
	}
}

async fn fetch(
	store: &SnapshotStore,
	partition: Partition,
	request: &FetchRequest,
) -> PartitionBatch {
	let adapter = store
		.adapters()
		.into_iter()
		.find(|adapter| adapter.partition() == partition)
		.expect("adapter missing");

	adapter.fetch(request).await.expect("fetch failed")
}

fn ids(batch: &PartitionBatch) -> Vec<&str> {
	batch.candidates.iter().map(|candidate| candidate.id()).collect()
}

#[test]
fn builds_one_adapter_per_core_table() {
	let store = fixture();
	let partitions: Vec<_> = store.adapters().iter().map(|adapter| adapter.partition()).collect();

	assert_eq!(partitions, vec![Partition::LongTerm, Partition::Healthcare, Partition::ShortTerm]);
	assert_eq!(store.row_count(Partition::ShortTerm), 3);
	assert_eq!(store.row_count(Partition::Other), 0);
}

#[tokio::test]
async fn filters_rows_by_owner() {
	let store = fixture();
	let batch =
		fetch(&store, Partition::LongTerm, &request("elder-1", TimeWindow::default())).await;

	assert_eq!(ids(&batch), vec!["long_term:1", "long_term:2"]);
	assert_eq!(batch.skipped, 0);
	assert_eq!(batch.candidates[1].embedding(), Some(&[0.2, 0.3, 0.9][..]));
	assert_eq!(
		batch.candidates[0].text(),
		"family: daughter = Maria visits every Sunday afternoon"
	);
}

#[tokio::test]
async fn malformed_embeddings_are_skipped_and_counted() {
	let store = fixture();
	let batch =
		fetch(&store, Partition::Healthcare, &request("elder-1", TimeWindow::default())).await;

	assert_eq!(ids(&batch), vec!["healthcare:10"]);
	assert_eq!(batch.skipped, 1);
	assert_eq!(batch.candidates[0].text(), "Insulin glargine 10 units at bedtime (medication)");
}

#[tokio::test]
async fn malformed_rows_are_skipped_and_window_applies() {
	let store = fixture();
	let window = TimeWindow { since: Some(datetime!(2024-05-01 00:00 UTC)), until: None };
	let batch = fetch(&store, Partition::ShortTerm, &request("elder-1", window)).await;

	assert_eq!(ids(&batch), vec!["stm-1"]);
	assert_eq!(batch.skipped, 1);
	assert_eq!(batch.candidates[0].last_updated(), Some(datetime!(2024-05-31 16:00 UTC)));
}

#[tokio::test]
async fn unknown_person_gets_nothing() {
	let store = fixture();

	for adapter in store.adapters() {
		let batch = adapter
			.fetch(&request("elder-9", TimeWindow::default()))
			.await
			.expect("fetch failed");

		assert!(batch.candidates.is_empty());
		assert_eq!(batch.skipped, 0);
	}
}

#[tokio::test]
async fn other_table_gets_an_adapter_when_present() {
	let raw = r#"{"other": [
		{"id": 5, "elderly_id": "e", "text": "Likes the window seat", "fields": {"room": "12B"}}
	]}"#;
	let store = SnapshotStore::from_json(raw).expect("parse failed");
	let adapters = store.adapters();

	assert_eq!(adapters.len(), 4);

	let batch = fetch(&store, Partition::Other, &request("e", TimeWindow::default())).await;

	assert_eq!(ids(&batch), vec!["other:5"]);
	assert_eq!(batch.candidates[0].text(), "Likes the window seat");
}

#[test]
fn rejects_unknown_tables_and_non_array_tables() {
	let unknown = SnapshotStore::from_json(r#"{"episodic": []}"#).expect_err("Expected an error.");
	let scalar = SnapshotStore::from_json(r#"{"healthcare": 3}"#).expect_err("Expected an error.");
	let root = SnapshotStore::from_json("[]").expect_err("Expected an error.");

	assert!(matches!(unknown, Error::InvalidSnapshot { .. }), "Unexpected error: {unknown}");
	assert!(scalar.to_string().contains("healthcare"), "Unexpected error: {scalar}");
	assert!(matches!(root, Error::InvalidSnapshot { .. }));
}

#[tokio::test]
async fn serial_ids_shared_across_tables_stay_distinct() {
	let raw = r#"{
		"long_term": [{
			"id": 1, "elderly_id": "e", "category": "lifestyle", "key": "fridge",
			"value": "Keeps insulin in the fridge"
		}],
		"healthcare": [{
			"id": 1, "elderly_id": "e", "record_type": "medication",
			"description": "Insulin at bedtime"
		}]
	}"#;
	let store = SnapshotStore::from_json(raw).expect("parse failed");
	let service = hearth_testkit::service(
		Retrieval::default(),
		store.adapters(),
		Arc::new(FixedEmbedding::new(vec![1.0, 0.0, 0.0])),
		Arc::new(ScriptedRerank::new(Vec::<(String, f32)>::new())),
	);
	let response =
		service.recall(RecallRequest::new("e", "insulin")).await.expect("recall failed");
	let mut ids: Vec<_> = response.items.iter().map(|item| item.id()).collect();

	ids.sort();

	assert_eq!(ids, vec!["healthcare:1", "long_term:1"]);
}
