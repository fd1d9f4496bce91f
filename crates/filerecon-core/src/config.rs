use crate::resolver::DuplicatePolicy;
use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TOKEN_PATTERN: &str = r"(\d+)";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Worker pool size. 0 means twice the available parallelism.
    pub workers: usize,
    /// Regex applied to file names during audits. Capture group 1 is used when present.
    pub token_pattern: String,
    /// Reduce extracted tokens to their digits.
    pub digits_only: bool,
    pub audit_extensions: Vec<String>,
    pub organize_extensions: Vec<String>,
    pub header_keywords: Vec<String>,
    /// Directory globs skipped during enumeration.
    pub ignore_patterns: Vec<String>,
    pub duplicate_policy: DuplicatePolicy,
    pub db_path: String,
    pub record_operations: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            token_pattern: DEFAULT_TOKEN_PATTERN.to_string(),
            digits_only: true,
            audit_extensions: vec!["pdf".to_string()],
            organize_extensions: ["pdf", "png", "jpg", "jpeg", "tiff", "bmp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            header_keywords: crate::reference::DEFAULT_HEADER_KEYWORDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ignore_patterns: Vec::new(),
            duplicate_policy: DuplicatePolicy::Rename,
            db_path: "filerecon.db".to_string(),
            record_operations: true,
        }
    }
}

impl AppConfig {
    /// Effective worker count after resolving the `0 = auto` default.
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        default_worker_count()
    }
}

pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        * 2
}

/// Load `Config.toml` (optional) with `FILERECON_*` environment overrides.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(Environment::with_prefix("FILERECON"))
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.token_pattern, r"(\d+)");
        assert_eq!(config.audit_extensions, vec!["pdf".to_string()]);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Rename);
        assert!(config.worker_count() >= 2);
    }

    #[test]
    fn test_explicit_worker_count() {
        let config = AppConfig {
            workers: 3,
            ..AppConfig::default()
        };
        assert_eq!(config.worker_count(), 3);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let parsed: AppConfig = Config::builder()
            .add_source(config::File::from_str(
                "workers = 5\nduplicate_policy = \"compare\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(parsed.workers, 5);
        assert_eq!(parsed.duplicate_policy, DuplicatePolicy::CompareHash);
        assert!(parsed.digits_only);
        assert_eq!(parsed.db_path, "filerecon.db");
    }
}
