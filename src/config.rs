//! YAML configuration for the convert command.
//!
//! Every field is optional in the file; CLI flags override file values.
//!
//! ```yaml
//! chunk_size: 134217728
//! compress: true
//! allow: "app_.+"
//! deny: "app_(sessions|cache)"
//! strip_ip_suffix: false
//! ```

use crate::error::{ConvertError, Result};
use crate::router::{SkipPolicy, DEFAULT_CHUNK_SIZE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Chunk size ceiling in bytes of INSERT payload.
    pub chunk_size: u64,
    /// Write `.csv.gz` chunks instead of plain `.csv`.
    pub compress: bool,
    /// Tables whose whole name matches are converted.
    pub allow: String,
    /// Tables whose whole name matches are skipped, even if allowed.
    pub deny: String,
    /// Strip `, a.b.c.d` sequences from quoted values.
    pub strip_ip_suffix: bool,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            compress: false,
            allow: ".+".to_string(),
            deny: String::new(),
            strip_ip_suffix: false,
        }
    }
}

impl ConvertConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConvertError::io(path, e))?;
        Self::from_yaml(&content)
            .map_err(|e| ConvertError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_yaml(content: &str) -> std::result::Result<Self, serde_yaml_ng::Error> {
        serde_yaml_ng::from_str(content)
    }

    pub fn skip_policy(&self) -> Result<SkipPolicy> {
        SkipPolicy::new(&self.allow, &self.deny)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ConvertError::Config(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        self.skip_policy().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConvertConfig::default();
        assert_eq!(config.chunk_size, 128 * 1024 * 1024);
        assert!(!config.compress);

        let policy = config.skip_policy().unwrap();
        assert!(!policy.is_skipped("users"));
        assert!(!policy.is_skipped("a"));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = ConvertConfig::from_yaml("compress: true\ndeny: \"tmp_.*\"\n").unwrap();
        assert!(config.compress);
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.allow, ".+");

        let policy = config.skip_policy().unwrap();
        assert!(policy.is_skipped("tmp_import"));
        assert!(!policy.is_skipped("orders"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = ConvertConfig {
            chunk_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ConvertConfig {
            allow: "(".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConvertError::Config(_))));
    }

    #[test]
    fn test_unknown_field_is_ignored() {
        let config = ConvertConfig::from_yaml("chunk_size: 1024\nextra: 1\n").unwrap();
        assert_eq!(config.chunk_size, 1024);
    }
}
