use super::{types::Config, ConfigError};
use crate::transcriber::TranscriberBackend;

/// Validate configuration
/// Currently validates:
/// - Concurrency bounds are at least 1
/// - Retry policy makes at least one attempt
/// - Embedding dimension is not 0
/// - Cloud backends in use have an API key
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.scheduler.concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "scheduler.concurrency cannot be 0".to_string(),
        ));
    }

    if config.orchestrator.segment_concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.segment_concurrency cannot be 0".to_string(),
        ));
    }

    if config.orchestrator.retry.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.retry.max_attempts cannot be 0".to_string(),
        ));
    }

    if config.embedder.dimension == 0 {
        return Err(ConfigError::ValidationError(
            "embedder.dimension cannot be 0".to_string(),
        ));
    }

    if config.orchestrator.enrich && !has_key(&config.enricher.api_key) {
        return Err(ConfigError::ValidationError(
            "enrichment is enabled but no Anthropic API key is set (enricher.api_key or ANTHROPIC_API_KEY)"
                .to_string(),
        ));
    }

    if config.transcriber.backend == TranscriberBackend::AssemblyAi
        && !has_key(&config.transcriber.assembly_ai.api_key)
    {
        return Err(ConfigError::ValidationError(
            "transcriber.backend is assembly_ai but no API key is set (transcriber.assembly_ai.api_key or ASSEMBLYAI_API_KEY)"
                .to_string(),
        ));
    }

    Ok(())
}

fn has_key(key: &Option<String>) -> bool {
    key.as_deref().is_some_and(|k| !k.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        let mut config = Config::default();
        config.enricher.api_key = Some("sk-ant".to_string());
        config
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn test_validate_enrich_disabled_needs_no_key() {
        let mut config = Config::default();
        config.orchestrator.enrich = false;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_concurrency_zero_fails() {
        let mut config = valid();
        config.scheduler.concurrency = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_segment_concurrency_zero_fails() {
        let mut config = valid();
        config.orchestrator.segment_concurrency = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_attempts_fails() {
        let mut config = valid();
        config.orchestrator.retry.max_attempts = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_dimension_fails() {
        let mut config = valid();
        config.embedder.dimension = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_missing_enricher_key_fails() {
        let mut config = valid();
        config.enricher.api_key = Some("   ".to_string());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_assembly_ai_requires_key() {
        let mut config = valid();
        config.transcriber.backend = TranscriberBackend::AssemblyAi;
        assert!(validate_config(&config).is_err());

        config.transcriber.assembly_ai.api_key = Some("aai".to_string());
        assert!(validate_config(&config).is_ok());
    }
}
