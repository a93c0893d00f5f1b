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

//! The ingestion boundary: raw rows become [`Entry`] values here, once, with
//! every default filled in.

use crate::config::Columns;
use crate::config::SchemaConfig;
use crate::parser::RawRow;
use crate::source::SourceDescriptor;
use crate::types::entry::Entry;
use crate::types::entry::Weight;
use crate::weights::DynamicWeightAssigner;
use crate::weights::WeightRules;

pub struct Normalizer {
    schema: SchemaConfig,
    assigner: DynamicWeightAssigner,
}

impl Normalizer {
    pub fn new(schema: SchemaConfig, rules: WeightRules) -> Self {
        Self {
            schema,
            assigner: DynamicWeightAssigner::new(rules),
        }
    }

    pub fn columns(&self) -> &Columns {
        &self.schema.columns
    }

    /// Turn one decoded row into an entry.
    ///
    /// An explicit weight is kept when it is a finite, non-negative number.
    /// Otherwise the weight is derived from the back text, or set to the
    /// configured default when dynamic weights are off.
    pub fn entry(&self, source: &SourceDescriptor, row: RawRow) -> Entry {
        let weight = match row.weight.as_deref().map(|w| (w, Weight::parse(w))) {
            Some((_, Some(weight))) => weight,
            Some((text, None)) => {
                log::debug!("Ignoring malformed weight '{text}' in {}", source.id);
                self.fallback_weight(&row.back)
            }
            None => self.fallback_weight(&row.back),
        };
        let tag = source
            .source
            .clone()
            .or(row.tag)
            .unwrap_or_else(|| source.id.clone());
        Entry::new(row.front, row.back, tag, weight).with_notes(
            row.front_note.unwrap_or_else(|| self.schema.default_front_note.clone()),
            row.back_note.unwrap_or_else(|| self.schema.default_back_note.clone()),
        )
    }

    pub fn entries(&self, source: &SourceDescriptor, rows: Vec<RawRow>) -> Vec<Entry> {
        let entries: Vec<Entry> = rows.into_iter().map(|row| self.entry(source, row)).collect();
        log_weight_summary(&source.id, &entries);
        entries
    }

    fn fallback_weight(&self, back: &str) -> Weight {
        if self.schema.dynamic_weights {
            self.assigner.weight(back)
        } else {
            self.schema.default_weight()
        }
    }
}

fn log_weight_summary(id: &str, entries: &[Entry]) {
    if entries.is_empty() || !log::log_enabled!(log::Level::Debug) {
        return;
    }
    let weights = entries.iter().map(|e| e.weight().value());
    let min = weights.clone().fold(f64::INFINITY, f64::min);
    let max = weights.clone().fold(0.0, f64::max);
    let mean = weights.sum::<f64>() / entries.len() as f64;
    log::debug!("Weights for {id}: min {min:.0}, max {max:.0}, mean {mean:.0}");
}
