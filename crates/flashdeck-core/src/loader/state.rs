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

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::corpus::CorpusFile;
use crate::types::aliases::SourceId;
use crate::types::entry::Entry;
use crate::types::range::LoadedRange;

/// What the loader knows about a source after its initial load.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    /// Rows were found and entries may be resident.
    Ready,
    /// The file has no data rows.
    Empty,
    /// The file does not exist.
    Missing,
    /// The file exists but could not be read or has an unusable header.
    Unreadable,
}

/// Everything guarded by the loader's state lock.
#[derive(Default)]
pub(crate) struct LoaderState {
    pub sources: HashMap<SourceId, SourceState>,
    pub active: BTreeSet<SourceId>,
    pub counters: Counters,
    /// Bumped by every shutdown. Batches read under an older epoch are
    /// discarded instead of committed.
    pub epoch: u64,
}

#[derive(Default)]
pub(crate) struct Counters {
    pub batches_loaded: usize,
    pub entries_loaded: usize,
    pub initial_loads: usize,
    pub ticks_run: usize,
    pub ticks_skipped: usize,
    /// Highest number of simultaneous batch reads seen for any one source.
    pub peak_concurrent_reads: usize,
}

pub(crate) struct SourceState {
    pub status: SourceStatus,
    pub file: Option<Arc<CorpusFile>>,
    /// Data rows in the backing file, counted once.
    pub total: usize,
    pub entries: Vec<Arc<Entry>>,
    pub ranges: Vec<LoadedRange>,
    /// True when the initial load read the whole file.
    pub complete: bool,
    pub reads_in_flight: usize,
    /// Rows reserved by reads that have not committed yet.
    pub pending_rows: usize,
}

impl SourceState {
    /// A source that will never have entries.
    pub fn unavailable(status: SourceStatus) -> Self {
        Self {
            status,
            file: None,
            total: 0,
            entries: Vec::new(),
            ranges: Vec::new(),
            complete: true,
            reads_in_flight: 0,
            pending_rows: 0,
        }
    }

    /// Rows that may still be loaded before the ceiling is reached.
    pub fn room(&self, max_loaded_entries: usize) -> usize {
        max_loaded_entries.saturating_sub(self.entries.len() + self.pending_rows)
    }

    /// Whether a background cycle should load another batch for this source.
    pub fn wants_more(&self, batch_size: usize, max_loaded_entries: usize) -> bool {
        self.status == SourceStatus::Ready
            && !self.complete
            && self.total > batch_size
            && self.room(max_loaded_entries) > 0
    }
}
