// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Marketplace configuration.
//!
//! Every field has a default, so a TOML file only needs the keys it overrides:
//!
//! ```
//! use course_market::MarketConfig;
//!
//! let config = MarketConfig::from_toml_str("starting_bonuses = 500").unwrap();
//! assert_eq!(config.starting_bonuses, 500);
//! assert_eq!(config.course_capacity, 300);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading a [`MarketConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

/// Tunable limits of the marketplace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Enrolled students at which a course closes for purchase.
    pub course_capacity: usize,
    /// Soft per-group limit. Allocation past it is logged, not rejected.
    pub group_capacity: usize,
    /// Bonuses credited to every new user's balance.
    pub starting_bonuses: u32,
}

impl MarketConfig {
    pub const DEFAULT_COURSE_CAPACITY: usize = 300;
    pub const DEFAULT_GROUP_CAPACITY: usize = 30;
    pub const DEFAULT_STARTING_BONUSES: u32 = 1000;

    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.course_capacity == 0 {
            return Err(ConfigError::Invalid("course_capacity must be positive"));
        }
        if self.group_capacity == 0 {
            return Err(ConfigError::Invalid("group_capacity must be positive"));
        }
        Ok(())
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            course_capacity: Self::DEFAULT_COURSE_CAPACITY,
            group_capacity: Self::DEFAULT_GROUP_CAPACITY,
            starting_bonuses: Self::DEFAULT_STARTING_BONUSES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = MarketConfig::from_toml_str("").unwrap();
        assert_eq!(config, MarketConfig::default());
        assert_eq!(config.course_capacity, 300);
        assert_eq!(config.group_capacity, 30);
        assert_eq!(config.starting_bonuses, 1000);
    }

    #[test]
    fn overrides_are_applied() {
        let config = MarketConfig::from_toml_str(
            "course_capacity = 5\ngroup_capacity = 2\nstarting_bonuses = 40\n",
        )
        .unwrap();
        assert_eq!(config.course_capacity, 5);
        assert_eq!(config.group_capacity, 2);
        assert_eq!(config.starting_bonuses, 40);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let result = MarketConfig::from_toml_str("course_capacity = 0");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let result = MarketConfig::from_toml_str("course_capacity = \"many\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = MarketConfig::from_toml_file("/nonexistent/market.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
