pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("All partitions failed: {}.", .failed_partitions.join(", "))]
	AllPartitionsFailed { failed_partitions: Vec<String> },
	#[error("Partition {partition} unavailable: {message}")]
	PartitionUnavailable { partition: String, message: String },
	#[error("Embedding service unavailable: {message}")]
	EmbeddingServiceUnavailable { message: String },
	#[error("Reranker unavailable: {message}")]
	RerankerUnavailable { message: String },
}
