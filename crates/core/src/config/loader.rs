use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix of environment overrides, e.g. `RTT_SCHEDULER__CONCURRENCY=4`.
const ENV_PREFIX: &str = "RTT_";

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    extract(Figment::new().merge(Toml::file(path)))
}

/// Load configuration from defaults and environment variables only
pub fn load_config_from_env() -> Result<Config, ConfigError> {
    extract(Figment::new())
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

fn extract(figment: Figment) -> Result<Config, ConfigError> {
    let mut config: Config = figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    apply_key_fallbacks(&mut config, |name| std::env::var(name).ok());
    Ok(config)
}

/// Fills API keys missing from the file from their conventional variables.
fn apply_key_fallbacks(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if config.enricher.api_key.is_none() {
        config.enricher.api_key = lookup("ANTHROPIC_API_KEY").filter(|k| !k.is_empty());
    }
    if config.transcriber.assembly_ai.api_key.is_none() {
        config.transcriber.assembly_ai.api_key =
            lookup("ASSEMBLYAI_API_KEY").filter(|k| !k.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[scheduler]
concurrency = 3

[workspace]
work_dir = "/tmp/rtt-work"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.scheduler.concurrency, 3);
        assert_eq!(config.workspace.work_dir, PathBuf::from("/tmp/rtt-work"));
    }

    #[test]
    fn test_load_config_from_str_bad_type() {
        let toml = r#"
[scheduler]
concurrency = "lots"
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/rtt.toml"));
        assert!(matches!(result.unwrap_err(), ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[workspace]
output_dir = "/srv/rtt"

[embedder]
url = "http://gpu-box:11434"
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.workspace.output_dir, PathBuf::from("/srv/rtt"));
        assert_eq!(config.embedder.url, "http://gpu-box:11434");
        assert_eq!(config.embedder.model, "nomic-embed-text");
    }

    #[test]
    fn test_key_fallbacks() {
        let mut config = Config::default();
        apply_key_fallbacks(&mut config, |name| match name {
            "ANTHROPIC_API_KEY" => Some("sk-ant".to_string()),
            "ASSEMBLYAI_API_KEY" => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.enricher.api_key.as_deref(), Some("sk-ant"));
        assert!(config.transcriber.assembly_ai.api_key.is_none());
    }

    #[test]
    fn test_key_fallbacks_do_not_override_file() {
        let mut config = Config::default();
        config.enricher.api_key = Some("from-file".to_string());
        apply_key_fallbacks(&mut config, |_| Some("from-env".to_string()));
        assert_eq!(config.enricher.api_key.as_deref(), Some("from-file"));
    }
}
