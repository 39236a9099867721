use crate::core::geometry::tree::DEFAULT_LEAF_SIZE;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_BUFFER_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for parameter '{parameter}': {reason}")]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

/// Tuning knobs shared by every query executed against a context.
///
/// ```toml
/// leaf-size = 16
/// buffer-capacity = 128
/// eager-tree = true
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct QueryConfig {
    /// Maximum number of points in a spatial index leaf.
    pub leaf_size: usize,
    /// Initial capacity of the result buffers used by radius queries.
    pub buffer_capacity: usize,
    /// Build the spatial index when the context is created instead of on first use.
    pub eager_tree: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            leaf_size: DEFAULT_LEAF_SIZE,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            eager_tree: false,
        }
    }
}

impl QueryConfig {
    pub fn builder() -> QueryConfigBuilder {
        QueryConfigBuilder::new()
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::parse_toml(&content, &path.to_string_lossy())
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse_toml(content, "<string>")
    }

    fn parse_toml(content: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: QueryConfig = toml::from_str(content).map_err(|e| ConfigError::Toml {
            path: origin.to_string(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.leaf_size == 0 {
            return Err(ConfigError::InvalidParameter {
                parameter: "leaf_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.buffer_capacity == 0 {
            return Err(ConfigError::InvalidParameter {
                parameter: "buffer_capacity",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct QueryConfigBuilder {
    leaf_size: Option<usize>,
    buffer_capacity: Option<usize>,
    eager_tree: Option<bool>,
}

impl QueryConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration, e.g. one loaded from a file.
    pub fn from_config(config: QueryConfig) -> Self {
        Self {
            leaf_size: Some(config.leaf_size),
            buffer_capacity: Some(config.buffer_capacity),
            eager_tree: Some(config.eager_tree),
        }
    }

    pub fn leaf_size(mut self, size: usize) -> Self {
        self.leaf_size = Some(size);
        self
    }
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = Some(capacity);
        self
    }
    pub fn eager_tree(mut self, eager: bool) -> Self {
        self.eager_tree = Some(eager);
        self
    }

    pub fn build(self) -> Result<QueryConfig, ConfigError> {
        let defaults = QueryConfig::default();
        let config = QueryConfig {
            leaf_size: self.leaf_size.unwrap_or(defaults.leaf_size),
            buffer_capacity: self.buffer_capacity.unwrap_or(defaults.buffer_capacity),
            eager_tree: self.eager_tree.unwrap_or(defaults.eager_tree),
        };
        config.validate()?;
        Ok(config)
    }
}
