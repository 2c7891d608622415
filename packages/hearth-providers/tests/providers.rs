use reqwest::header::AUTHORIZATION;
use serde_json::{Map, Value};
use tokio::{
	io::{AsyncReadExt, AsyncWriteExt},
	net::TcpListener,
};

use hearth_config::{EmbeddingProviderConfig, ProviderConfig};
use hearth_providers::{Error, embedding, rerank};

/// Serves exactly one HTTP response with the given JSON body and returns the base URL.
async fn serve_once(body: Value) -> String {
	let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind listener.");
	let addr = listener.local_addr().expect("Listener must have an address.");

	tokio::spawn(async move {
		let (mut stream, _) = listener.accept().await.expect("Failed to accept connection.");
		let mut buf = vec![0_u8; 16 * 1024];
		let _ = stream.read(&mut buf).await;
		let payload = body.to_string();
		let response = format!(
			"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
			payload.len(),
			payload
		);

		stream.write_all(response.as_bytes()).await.expect("Failed to write response.");
	});

	format!("http://{addr}")
}

fn embedding_cfg(api_base: String, dimensions: u32) -> EmbeddingProviderConfig {
	EmbeddingProviderConfig {
		provider_id: "test".to_string(),
		api_base,
		api_key: "secret".to_string(),
		path: "/embeddings".to_string(),
		model: "test-embed".to_string(),
		dimensions,
		timeout_ms: 2_000,
		default_headers: Map::new(),
	}
}

fn rerank_cfg(api_base: String) -> ProviderConfig {
	ProviderConfig {
		provider_id: "test".to_string(),
		api_base,
		api_key: "secret".to_string(),
		path: "/rerank".to_string(),
		model: "test-rerank".to_string(),
		timeout_ms: 2_000,
		default_headers: Map::new(),
	}
}

#[test]
fn builds_bearer_auth_header() {
	let headers =
		hearth_providers::auth_headers("secret", &Map::new()).expect("Failed to build headers.");
	let value = headers.get(AUTHORIZATION).expect("Missing authorization header.");

	assert_eq!(value, "Bearer secret");
}

#[tokio::test]
async fn embed_returns_vectors_from_endpoint() {
	let base = serve_once(serde_json::json!({
		"data": [{ "index": 0, "embedding": [0.6, 0.8] }]
	}))
	.await;
	let cfg = embedding_cfg(base, 2);
	let vectors =
		embedding::embed(&cfg, &["walks in the garden".to_string()]).await.expect("embed failed");

	assert_eq!(vectors, vec![vec![0.6, 0.8]]);
}

#[tokio::test]
async fn embed_rejects_dimension_mismatch() {
	let base = serve_once(serde_json::json!({
		"data": [{ "index": 0, "embedding": [0.6, 0.8, 0.0] }]
	}))
	.await;
	let cfg = embedding_cfg(base, 2);
	let err = embedding::embed(&cfg, &["tea".to_string()]).await.expect_err("Expected mismatch.");

	assert!(matches!(err, Error::InvalidResponse { .. }));
}

#[tokio::test]
async fn rerank_returns_scores_aligned_with_documents() {
	let base = serve_once(serde_json::json!({
		"results": [
			{ "index": 1, "relevance_score": 0.1 },
			{ "index": 0, "relevance_score": 0.7 }
		]
	}))
	.await;
	let cfg = rerank_cfg(base);
	let docs = vec!["insulin schedule".to_string(), "garden visit".to_string()];
	let scores = rerank::rerank(&cfg, "insulin", &docs).await.expect("rerank failed");

	assert_eq!(scores, vec![0.7, 0.1]);
}

#[tokio::test]
async fn rerank_reports_transport_errors() {
	let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind listener.");
	let addr = listener.local_addr().expect("Listener must have an address.");

	drop(listener);

	let cfg = rerank_cfg(format!("http://{addr}"));
	let err = rerank::rerank(&cfg, "insulin", &["doc".to_string()])
		.await
		.expect_err("Expected connection failure.");

	assert!(matches!(err, Error::Reqwest(_)));
}
