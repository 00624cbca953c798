// Embeddings, document parsing and context retrieval

pub mod document_processor;
pub mod embedder;
pub mod vector_search;

pub use document_processor::*;
pub use embedder::*;
pub use vector_search::*;
