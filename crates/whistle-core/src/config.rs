//! Configuration for the Whistle client.
//!
//! Groups the settings for vault storage, passphrase hashing, the private
//! sending queue and mailbox notifications.
//!
//! # Example
//!
//! ```
//! use whistle_core::config::{ClientConfig, ClientConfigBuilder};
//!
//! // Use defaults
//! let config = ClientConfig::default();
//!
//! // Or use builder for customization
//! let config = ClientConfigBuilder::new()
//!     .with_data_dir("/tmp/whistle".into())
//!     .with_queue_capacity(16)
//!     .build();
//! assert_eq!(config.queue.capacity, 16);
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use whistle_store::KdfParams;

/// Default number of slots in the sending queue.
const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Largest sending queue accepted.
const MAX_QUEUE_CAPACITY: usize = 4096;

/// Default buffer size of the mailbox event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 64;

/// Name of the vault directory inside the data directory.
const VAULT_DIR_NAME: &str = "vault";

/// Main client configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Storage configuration.
    pub storage: StorageConfig,

    /// Passphrase key derivation cost.
    pub kdf: KdfConfig,

    /// Private sending queue configuration.
    pub queue: QueueConfig,

    /// Messaging configuration.
    pub messaging: MessagingConfig,
}

impl ClientConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Configuration rooted at `dir` with a cheap KDF, for tests.
    pub fn for_testing(dir: impl AsRef<Path>) -> Self {
        ClientConfigBuilder::new()
            .with_data_dir(dir.as_ref().to_path_buf())
            .with_low_cost_kdf()
            .with_queue_capacity(8)
            .build()
    }

    /// Where the vault lives.
    pub fn vault_path(&self) -> PathBuf {
        self.storage.data_dir.join(VAULT_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "storage.data_dir".into(),
                reason: "data directory cannot be empty".into(),
            });
        }

        if self.kdf.iterations == 0 {
            return Err(ConfigError::InvalidValue {
                field: "kdf.iterations".into(),
                reason: "at least one pass is required".into(),
            });
        }
        if self.kdf.parallelism == 0 {
            return Err(ConfigError::InvalidValue {
                field: "kdf.parallelism".into(),
                reason: "at least one lane is required".into(),
            });
        }
        if self.kdf.memory_kib < 8 * self.kdf.parallelism {
            return Err(ConfigError::InvalidValue {
                field: "kdf.memory_kib".into(),
                reason: "memory must be at least 8 KiB per lane".into(),
            });
        }

        if self.queue.capacity == 0 || self.queue.capacity > MAX_QUEUE_CAPACITY {
            return Err(ConfigError::InvalidValue {
                field: "queue.capacity".into(),
                reason: format!("capacity must be between 1 and {}", MAX_QUEUE_CAPACITY),
            });
        }

        if self.messaging.event_channel_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "messaging.event_channel_capacity".into(),
                reason: "event channel capacity must be greater than zero".into(),
            });
        }

        Ok(())
    }
}

/// Storage configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for storing data.
    ///
    /// Defaults to the platform-specific data directory:
    /// - Linux: `~/.local/share/whistle`
    /// - macOS: `~/Library/Application Support/whistle`
    /// - Windows: `C:\Users\<User>\AppData\Roaming\whistle`
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Argon2id cost used when creating a vault.
///
/// Existing vaults keep the cost they were created with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfConfig {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Parallel lanes.
    pub parallelism: u32,
}

impl Default for KdfConfig {
    fn default() -> Self {
        KdfParams::production().into()
    }
}

impl From<KdfParams> for KdfConfig {
    fn from(params: KdfParams) -> Self {
        Self {
            memory_kib: params.memory_kib,
            iterations: params.iterations,
            parallelism: params.parallelism,
        }
    }
}

impl From<KdfConfig> for KdfParams {
    fn from(config: KdfConfig) -> Self {
        Self {
            memory_kib: config.memory_kib,
            iterations: config.iterations,
            parallelism: config.parallelism,
        }
    }
}

/// Private sending queue configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Number of slots, real plus cover.
    ///
    /// Only applies to new vaults; an existing queue keeps its size.
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Messaging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessagingConfig {
    /// Buffered mailbox events per subscriber before old ones are dropped.
    pub event_channel_capacity: usize,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

/// Builder for constructing `ClientConfig` with custom values.
#[derive(Clone, Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    /// Build the final configuration.
    pub fn build(self) -> ClientConfig {
        self.config
    }

    /// Build and validate the configuration.
    pub fn build_validated(self) -> Result<ClientConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }

    /// Set the data directory.
    pub fn with_data_dir(mut self, path: PathBuf) -> Self {
        self.config.storage.data_dir = path;
        self
    }

    /// Set the Argon2id cost for new vaults.
    pub fn with_kdf_params(mut self, memory_kib: u32, iterations: u32, parallelism: u32) -> Self {
        self.config.kdf = KdfConfig {
            memory_kib,
            iterations,
            parallelism,
        };
        self
    }

    /// Use the cheapest KDF cost. Tests only.
    pub fn with_low_cost_kdf(mut self) -> Self {
        self.config.kdf = KdfParams::low_cost().into();
        self
    }

    /// Set the sending queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue.capacity = capacity;
        self
    }

    /// Set the mailbox event buffer size.
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.config.messaging.event_channel_capacity = capacity;
        self
    }
}

/// Configuration error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue {
        /// The field name.
        field: String,
        /// The reason it's invalid.
        reason: String,
    },
}

/// Get the default data directory for the current platform.
fn default_data_dir() -> PathBuf {
    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("whistle");
    }

    if let Some(home_dir) = dirs::home_dir() {
        return home_dir.join(".whistle");
    }

    PathBuf::from(".whistle")
}
