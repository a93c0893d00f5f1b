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

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::Fallible;
use crate::loader::SourceStatus;
use crate::types::aliases::SourceId;

/// A point-in-time view of what the loader has done so far.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LoadingStatistics {
    pub progressive_loading: bool,
    pub total_batches_loaded: usize,
    pub total_entries_loaded: usize,
    pub initial_loads: usize,
    pub ticks_run: usize,
    pub ticks_skipped: usize,
    pub peak_concurrent_reads: usize,
    pub active_sources: Vec<SourceId>,
    /// Entries resident in memory, per source.
    pub per_source_loaded: BTreeMap<SourceId, usize>,
    /// Data rows in the backing file, per source.
    pub per_source_total: BTreeMap<SourceId, usize>,
    /// Distinct rows covered by the loaded ranges, per source.
    pub per_source_covered: BTreeMap<SourceId, usize>,
    pub per_source_status: BTreeMap<SourceId, SourceStatus>,
}

impl LoadingStatistics {
    pub fn to_json(&self) -> Fallible<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Resident entries across every source.
    pub fn resident_total(&self) -> usize {
        self.per_source_loaded.values().sum()
    }

    /// Percentage of a source's rows covered so far.
    pub fn coverage(&self, id: &str) -> Option<f64> {
        let total = *self.per_source_total.get(id)?;
        let covered = self.per_source_covered.get(id).copied().unwrap_or(0);
        if total == 0 {
            return None;
        }
        Some(covered as f64 * 100.0 / total as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coverage() {
        let mut stats = LoadingStatistics::default();
        stats.per_source_total.insert("big".to_string(), 200);
        stats.per_source_covered.insert("big".to_string(), 50);
        stats.per_source_total.insert("empty".to_string(), 0);
        assert_eq!(stats.coverage("big"), Some(25.0));
        assert_eq!(stats.coverage("empty"), None);
        assert_eq!(stats.coverage("unknown"), None);
    }

    #[test]
    fn test_json_shape() -> Fallible<()> {
        let mut stats = LoadingStatistics {
            progressive_loading: true,
            initial_loads: 2,
            ..Default::default()
        };
        stats
            .per_source_status
            .insert("custom".to_string(), SourceStatus::Missing);
        stats.per_source_loaded.insert("custom".to_string(), 0);
        stats.per_source_loaded.insert("big".to_string(), 1000);
        let json: serde_json::Value = serde_json::from_str(&stats.to_json()?)?;
        assert_eq!(json["initial_loads"], 2);
        assert_eq!(json["progressive_loading"], true);
        assert_eq!(json["per_source_status"]["custom"], "missing");
        assert_eq!(stats.resident_total(), 1000);
        Ok(())
    }
}
