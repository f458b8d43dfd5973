//! Enricher module for making transcript segments easier to find.

mod anthropic;
mod config;
mod traits;

pub use anthropic::AnthropicEnricher;
pub use config::EnricherConfig;
pub use traits::Enricher;
