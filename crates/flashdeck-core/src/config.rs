// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Configuration, read once at startup from `flashdeck.toml` and passed
//! explicitly to the [`CorpusManager`](crate::manager::CorpusManager).

use std::time::Duration;

use serde::Deserialize;

use crate::error::Fallible;
use crate::error::fail;
use crate::source::SourceDescriptor;
use crate::source::SourceRegistry;
use crate::types::entry::Weight;
use crate::weights::WeightRules;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub loading: LoadingConfig,
    pub schema: SchemaConfig,
    pub weights: WeightRules,
    pub sources: Vec<SourceDescriptor>,
}

impl Config {
    /// Parse and validate a TOML configuration file.
    pub fn from_toml(text: &str) -> Fallible<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Fallible<()> {
        self.loading.validate()?;
        self.schema.validate()?;
        SourceRegistry::new(self.sources.clone())?;
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LoadingConfig {
    /// Rows read per batch.
    pub batch_size: usize,
    /// Seconds between background loading cycles.
    pub loading_interval: f64,
    /// Ceiling on resident entries per source.
    pub max_loaded_entries: usize,
    /// When false, every activated source is loaded in full, synchronously.
    pub enable_progressive_loading: bool,
    /// When false, sources only ever hold their initial batch unless
    /// batches are loaded by hand.
    pub background_loading: bool,
}

impl Default for LoadingConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            loading_interval: 180.0,
            max_loaded_entries: 10000,
            enable_progressive_loading: true,
            background_loading: true,
        }
    }
}

impl LoadingConfig {
    pub fn validate(&self) -> Fallible<()> {
        if self.batch_size == 0 {
            return fail("loading.batch_size must be at least 1.");
        }
        if !self.loading_interval.is_finite()
            || self.loading_interval <= 0.0
            || Duration::try_from_secs_f64(self.loading_interval).is_err()
        {
            return fail("loading.loading_interval must be a positive number of seconds.");
        }
        if self.max_loaded_entries < self.batch_size {
            return fail(format!(
                "loading.max_loaded_entries ({}) must not be smaller than loading.batch_size ({}).",
                self.max_loaded_entries, self.batch_size
            ));
        }
        Ok(())
    }

    /// The loading interval as a duration. Only meaningful after
    /// [`LoadingConfig::validate`] has passed.
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.loading_interval)
    }

    /// Whether a background ticker should run while sources are active.
    pub fn schedules_background_loads(&self) -> bool {
        self.enable_progressive_loading && self.background_loading
    }
}

/// Column names looked up in each file's header row.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Columns {
    pub front: String,
    pub front_note: String,
    pub back: String,
    pub back_note: String,
    pub weight: String,
    pub source: String,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            front: "Word_1".to_string(),
            front_note: "Part_1".to_string(),
            back: "Word_2".to_string(),
            back_note: "Part_2".to_string(),
            weight: "Weight".to_string(),
            source: "source".to_string(),
        }
    }
}

/// How rows are turned into entries.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaConfig {
    pub columns: Columns,
    pub default_front_note: String,
    pub default_back_note: String,
    /// Weight of rows without a usable weight when dynamic weights are off.
    pub default_weight: f64,
    /// Derive the weight of rows without a usable weight from their content.
    pub dynamic_weights: bool,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            columns: Columns::default(),
            default_front_note: "Unbekannt".to_string(),
            default_back_note: "Неизвестно".to_string(),
            default_weight: Weight::DEFAULT.value(),
            dynamic_weights: true,
        }
    }
}

impl SchemaConfig {
    pub fn validate(&self) -> Fallible<()> {
        if Weight::new(self.default_weight).is_none() {
            return fail("schema.default_weight must be a finite, non-negative number.");
        }
        if self.columns.front == self.columns.back {
            return fail("schema.columns.front and schema.columns.back must differ.");
        }
        Ok(())
    }

    pub fn default_weight(&self) -> Weight {
        Weight::new(self.default_weight).unwrap_or(Weight::DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorReport;
    use crate::source::Delimiter;

    #[test]
    fn test_empty_file_uses_defaults() -> Fallible<()> {
        let config = Config::from_toml("")?;
        assert_eq!(config.loading, LoadingConfig::default());
        assert_eq!(config.schema, SchemaConfig::default());
        assert_eq!(config.weights, WeightRules::default());
        assert!(config.sources.is_empty());
        assert_eq!(config.loading.interval(), Duration::from_secs(180));
        Ok(())
    }

    #[test]
    fn test_full_file() -> Fallible<()> {
        let text = r#"
            [loading]
            batch_size = 500
            loading_interval = 0.5
            max_loaded_entries = 2000
            background_loading = false

            [schema]
            default_front_note = ""
            dynamic_weights = false

            [schema.columns]
            front = "Word"
            back = "Meaning"

            [weights]
            base = 10
            length_steps = [{ above = 5, add = 1 }]

            [[sources]]
            id = "deutsch"
            file = "Words_deu-rus_v1.csv"
            delimiter = "\t"
            label = "5k Wörter"
            default_active = true
            front_title = "Deutsch"
            back_title = "Русский"

            [[sources]]
            id = "oxford"
            file = "5k_Oxford_eng_words.csv"
            delimiter = ","
            source = "english"
        "#;
        let config = Config::from_toml(text)?;
        assert_eq!(config.loading.batch_size, 500);
        assert_eq!(config.loading.interval(), Duration::from_millis(500));
        assert!(config.loading.enable_progressive_loading);
        assert!(!config.loading.schedules_background_loads());
        assert_eq!(config.schema.columns.front, "Word");
        assert_eq!(config.schema.columns.front_note, "Part_1");
        assert!(!config.schema.dynamic_weights);
        assert_eq!(config.weights.base, 10);
        assert_eq!(config.weights.domain_bonus, 50);
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].label(), "5k Wörter");
        assert!(config.sources[0].default_active);
        assert_eq!(config.sources[1].delimiter, Delimiter::COMMA);
        assert_eq!(config.sources[1].source.as_deref(), Some("english"));
        Ok(())
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(Config::from_toml("[loading]\nbatch = 5\n").is_err());
    }

    #[test]
    fn test_invalid_loading_values() {
        let batch = Config::from_toml("[loading]\nbatch_size = 0\n");
        assert_eq!(
            batch.err(),
            Some(ErrorReport::new("loading.batch_size must be at least 1."))
        );
        assert!(Config::from_toml("[loading]\nloading_interval = 0\n").is_err());
        assert!(Config::from_toml("[loading]\nloading_interval = -3.0\n").is_err());
        assert!(
            Config::from_toml("[loading]\nbatch_size = 100\nmax_loaded_entries = 99\n").is_err()
        );
    }

    #[test]
    fn test_interval_too_large_for_duration() {
        let result = Config::from_toml("[loading]\nloading_interval = 1e30\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_schema_values() {
        assert!(Config::from_toml("[schema]\ndefault_weight = -1.0\n").is_err());
    }

    #[test]
    fn test_invalid_sources() {
        let text = r#"
            [[sources]]
            id = "a"
            file = "a.csv"

            [[sources]]
            id = "a"
            file = "b.csv"
        "#;
        assert!(Config::from_toml(text).is_err());
        let text = r#"
            [[sources]]
            id = "a"
            file = "a.csv"
            delimiter = "::"
        "#;
        assert!(Config::from_toml(text).is_err());
    }
}
