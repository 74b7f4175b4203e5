//! # relay-retrieval
//!
//! The vector-retrieval capability and the evidence aggregator. A turn asks
//! the aggregator to consult an ordered list of named sources; each source is
//! a collection in one of the configured vector stores. A tight distance
//! threshold routes immediately; a wider one defers the borderline cases to
//! the intent classifier.

pub mod aggregator;
pub mod client;
pub mod mock;
pub mod source;

pub use aggregator::SourceSet;
pub use client::{CollectionInfo, Hit, HttpVectorStore, QueryOptions, QueryReply, VectorStore};
pub use source::{Source, sources_from_config};
