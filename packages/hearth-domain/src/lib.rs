pub mod candidate;
pub mod partition;
pub mod text;
pub mod vector;

pub use candidate::{Candidate, HEALTH_RECORD_TYPES, LONG_TERM_CATEGORIES, PartitionPayload};
pub use partition::{Partition, UnknownPartition};
pub use text::{query_terms, tokenize};
pub use vector::{VectorTextError, cosine_similarity, parse_vector_text};
