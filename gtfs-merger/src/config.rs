//! Configuration for a merge run.

use gtfs_config::shared::{MergeSettings, OutputCompression, ValidationError};

use crate::key::KeyTable;

/// Configuration for a merge run.
#[derive(Debug, Clone, Default)]
pub struct MergerConfig {
    /// Deduplication rules per member name.
    pub key_table: KeyTable,

    /// Compression of the output members.
    pub compression: OutputCompression,
}

impl MergerConfig {
    /// Creates a configuration with the given key table and stored output members.
    pub fn new(key_table: KeyTable) -> Self {
        Self {
            key_table,
            ..Default::default()
        }
    }

    /// Builds the configuration from loaded settings, validating them first.
    pub fn from_settings(settings: &MergeSettings) -> Result<Self, ValidationError> {
        settings.validate()?;

        let key_table = KeyTable::from_rules(settings.resolved_rules(), settings.fallback_policy);

        Ok(Self {
            key_table,
            compression: settings.compression,
        })
    }

    /// Sets the output compression.
    pub fn with_compression(mut self, compression: OutputCompression) -> Self {
        self.compression = compression;
        self
    }

    /// Sets the key table.
    pub fn with_key_table(mut self, key_table: KeyTable) -> Self {
        self.key_table = key_table;
        self
    }
}
