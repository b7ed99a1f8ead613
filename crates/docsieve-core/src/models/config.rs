//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};

/// Default cap on input size (25 MiB).
pub const DEFAULT_MAX_FILE_BYTES: usize = 25 * 1024 * 1024;

/// Default cap on one inflated package part (100 MiB).
pub const DEFAULT_MAX_PART_BYTES: usize = 100 * 1024 * 1024;

/// Main configuration for docsieve.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DocsieveConfig {
    /// Input limits applied before decoding.
    pub limits: LimitsConfig,

    /// PDF text extraction configuration.
    pub pdf: PdfConfig,

    /// HTTP server configuration.
    pub server: ServerConfig,
}

/// Input limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest accepted document in bytes (0 = unlimited).
    pub max_file_bytes: usize,

    /// Largest decompressed `.docx` part in bytes (0 = unlimited).
    pub max_part_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            max_part_bytes: DEFAULT_MAX_PART_BYTES,
        }
    }
}

/// PDF text extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PdfConfig {
    /// A `TJ` adjustment below this value (thousandths of an em) becomes a space.
    pub tj_space_threshold: f32,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            tj_space_threshold: -250.0,
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,

    /// Bind port.
    pub port: u16,

    /// Maximum multipart request body in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
            max_upload_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

impl DocsieveConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
    }

    /// Socket address string for the HTTP server.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: DocsieveConfig = serde_json::from_str(r#"{"server": {"port": 9000}}"#).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.limits.max_file_bytes, DEFAULT_MAX_FILE_BYTES);
        assert_eq!(config.limits.max_part_bytes, DEFAULT_MAX_PART_BYTES);
        assert_eq!(config.pdf.tj_space_threshold, -250.0);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = DocsieveConfig::default();
        config.limits.max_file_bytes = 1024;
        config.save(&path).unwrap();

        let loaded = DocsieveConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.bind_address(), "127.0.0.1:8787");
    }

    #[test]
    fn test_invalid_json_is_invalid_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = DocsieveConfig::from_file(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
