/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Configuration for a [`Messenger`](crate::common::Messenger).
///
/// Loaded from `$XDG_CONFIG_HOME/courier/config.toml` by [`MessengerConfig::load`].
/// Every section and field is optional; anything left out keeps its default.
///
/// ```toml
/// [limits]
/// bucket_capacity = 8
///
/// [behavior]
/// log_async_faults = true
/// prune_on_subscribe = false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessengerConfig {
    /// Sizing of internal structures
    pub limits: LimitsConfig,
    /// Behavioral switches
    pub behavior: BehaviorConfig,
}

/// Sizing of internal structures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Initial capacity of a newly created routing bucket
    pub bucket_capacity: usize,
}

/// Behavioral configuration switches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Log failures of asynchronous handlers at `warn` before dropping them.
    /// When false they are dropped silently (they are counted either way).
    pub log_async_faults: bool,
    /// Also prune dead records of the target bucket when subscribing.
    pub prune_on_subscribe: bool,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self { bucket_capacity: 4 }
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            log_async_faults: true,
            prune_on_subscribe: false,
        }
    }
}

impl MessengerConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns the parser error if the text is not valid TOML or does not
    /// match the configuration schema.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load configuration from XDG-compliant locations
    ///
    /// Looks for `courier/config.toml` under the XDG configuration
    /// directories. A missing file yields the defaults; an unreadable or
    /// malformed file is logged and also yields the defaults.
    #[must_use]
    pub fn load() -> Self {
        let xdg_dirs = match xdg::BaseDirectories::with_prefix("courier") {
            Ok(dirs) => dirs,
            Err(e) => {
                error!("Failed to initialize XDG directories: {}", e);
                return Self::default();
            }
        };

        match xdg_dirs.find_config_file("config.toml") {
            Some(path) => Self::load_from(&path),
            None => {
                info!("No configuration file found, using defaults");
                Self::default()
            }
        }
    }

    /// Load configuration from an explicit file, falling back to defaults
    /// when it cannot be read or parsed.
    #[must_use]
    pub fn load_from(path: &Path) -> Self {
        info!("Loading configuration from: {}", path.display());
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to read configuration file {}: {}", path.display(), e);
                return Self::default();
            }
        };
        match Self::from_toml_str(&text) {
            Ok(config) => {
                info!("Successfully loaded configuration");
                config
            }
            Err(e) => {
                error!("Failed to parse configuration file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}
