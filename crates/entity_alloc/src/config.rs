//! # Configuration
//!
//! Configuration for allocators and stores, loadable from TOML or RON files.
//!
//! ## Configuration Categories
//!
//! - **Allocator Config**: capacity bound, pre-reserved slots, generation overflow policy
//! - **Store Config**: initial slot count for new stores
//! - **Alloc Config**: top-level document including the log level

use serde::{Deserialize, Serialize};

use crate::allocator::MAX_SLOTS;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Values that parse but cannot be used
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// What to do when a slot's generation counter reaches its maximum
///
/// `Saturate` is the default: the slot is retired when freed at the maximum
/// generation and is never handed out again, so no stale handle can ever
/// collide with a new occupant. `Wrap` resets the counter to 0, which makes a
/// collision possible after 2^32 reuses of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationPolicy {
    /// Retire the slot permanently
    #[default]
    Saturate,
    /// Wrap the generation back to 0
    Wrap,
}

/// # Allocator Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    /// Maximum number of slots (None = unbounded)
    pub capacity: Option<usize>,
    /// Slots created up front and placed on the free list
    pub initial_reserve: usize,
    /// Generation overflow policy
    pub generation_policy: GenerationPolicy,
}

impl AllocatorConfig {
    /// Create an unbounded allocator configuration
    pub fn new() -> Self {
        Self {
            capacity: None,
            initial_reserve: 0,
            generation_policy: GenerationPolicy::Saturate,
        }
    }

    /// Bound the allocator at `capacity` slots
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Pre-create `slots` slots
    pub fn with_initial_reserve(mut self, slots: usize) -> Self {
        self.initial_reserve = slots;
        self
    }

    /// Set generation overflow policy
    pub fn with_generation_policy(mut self, policy: GenerationPolicy) -> Self {
        self.generation_policy = policy;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let max_slots = MAX_SLOTS;

        if let Some(capacity) = self.capacity {
            if capacity > max_slots {
                return Err(ConfigError::Invalid(format!(
                    "capacity {capacity} exceeds the {max_slots} addressable slots"
                )));
            }
            if self.initial_reserve > capacity {
                return Err(ConfigError::Invalid(format!(
                    "initial reserve {} exceeds capacity {capacity}",
                    self.initial_reserve
                )));
            }
        }

        if self.initial_reserve > max_slots {
            return Err(ConfigError::Invalid(format!(
                "initial reserve {} exceeds the {max_slots} addressable slots",
                self.initial_reserve
            )));
        }

        Ok(())
    }
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Store Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Number of empty cells allocated when a store is created
    pub initial_slots: usize,
}

impl StoreConfig {
    /// Create a new store configuration
    pub fn new() -> Self {
        Self { initial_slots: 0 }
    }

    /// Set initial slot count
    pub fn with_initial_slots(mut self, slots: usize) -> Self {
        self.initial_slots = slots;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_slots > MAX_SLOTS {
            return Err(ConfigError::Invalid(format!(
                "initial store slots {} exceed the {MAX_SLOTS} addressable slots",
                self.initial_slots
            )));
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Complete Configuration
///
/// Top-level document applications load from disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocConfig {
    /// Log level passed to `env_logger` when no `RUST_LOG` is set
    pub log_level: String,
    /// Allocator configuration
    pub allocator: AllocatorConfig,
    /// Store configuration
    pub store: StoreConfig,
}

impl AllocConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            allocator: AllocatorConfig::default(),
            store: StoreConfig::default(),
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.allocator.validate()?;
        self.store.validate()?;
        if let Some(capacity) = self.allocator.capacity {
            if self.store.initial_slots > capacity {
                return Err(ConfigError::Invalid(format!(
                    "initial store slots {} exceed allocator capacity {capacity}",
                    self.store.initial_slots
                )));
            }
        }
        if self.log_level.parse::<log::LevelFilter>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "unknown log level: {}",
                self.log_level
            )));
        }
        Ok(())
    }
}

impl Default for AllocConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for AllocConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> String {
        std::env::temp_dir()
            .join(format!("entity_alloc_{}_{name}", std::process::id()))
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = AllocConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.allocator.capacity, None);
        assert_eq!(config.allocator.generation_policy, GenerationPolicy::Saturate);
    }

    #[test]
    fn test_reserve_beyond_capacity_is_rejected() {
        let config = AllocatorConfig::new().with_capacity(4).with_initial_reserve(8);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_capacity_beyond_slot_width_is_rejected() {
        let config = AllocatorConfig::new().with_capacity(MAX_SLOTS.saturating_add(1));
        if MAX_SLOTS < usize::MAX {
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        }
        assert!(AllocatorConfig::new().with_capacity(MAX_SLOTS).validate().is_ok());
    }

    #[test]
    fn test_oversized_store_is_rejected() {
        let config: AllocConfig = toml::from_str(
            r#"
            [store]
            initial_slots = 4611686018427387903
            "#,
        )
        .unwrap();

        if MAX_SLOTS < usize::MAX {
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
            assert!(matches!(config.store.validate(), Err(ConfigError::Invalid(_))));
        }
    }

    #[test]
    fn test_store_slots_beyond_allocator_capacity_are_rejected() {
        let config = AllocConfig {
            allocator: AllocatorConfig::new().with_capacity(4),
            store: StoreConfig::new().with_initial_slots(5),
            ..AllocConfig::default()
        };
        assert!(config.store.validate().is_ok());
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let fits = AllocConfig {
            store: StoreConfig::new().with_initial_slots(4),
            ..config
        };
        assert!(fits.validate().is_ok());
    }

    #[test]
    fn test_unknown_log_level_is_rejected() {
        let config = AllocConfig::new().with_log_level("loud");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_toml_round_trip() {
        let path = temp_path("config.toml");
        let config = AllocConfig::new().with_log_level("debug");
        let config = AllocConfig {
            allocator: AllocatorConfig::new()
                .with_capacity(64)
                .with_initial_reserve(16)
                .with_generation_policy(GenerationPolicy::Wrap),
            ..config
        };

        config.save_to_file(&path).unwrap();
        let loaded = AllocConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_ron_round_trip() {
        let path = temp_path("config.ron");
        let config = AllocConfig {
            store: StoreConfig::new().with_initial_slots(32),
            ..AllocConfig::default()
        };

        config.save_to_file(&path).unwrap();
        let loaded = AllocConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AllocConfig = toml::from_str(
            r#"
            [allocator]
            capacity = 10
            generation_policy = "wrap"
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level, "info");
        assert_eq!(config.allocator.capacity, Some(10));
        assert_eq!(config.allocator.initial_reserve, 0);
        assert_eq!(config.allocator.generation_policy, GenerationPolicy::Wrap);
    }

    #[test]
    fn test_unsupported_extension() {
        let result = AllocConfig::default().save_to_file("config.json");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
}
