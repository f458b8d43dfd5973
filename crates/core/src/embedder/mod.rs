//! Embedder module for computing segment vectors.

mod config;
mod ollama;
mod traits;

pub use config::EmbedderConfig;
pub use ollama::OllamaEmbedder;
pub use traits::Embedder;
