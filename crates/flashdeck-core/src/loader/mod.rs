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

//! The windowed corpus loader.
//!
//! Each active source keeps a growing, bounded window of its rows in memory.
//! Activation loads one random batch per new source. A background task then
//! adds one random batch per source every interval, until the file is covered
//! or the per-source ceiling is reached.
//!
//! All mutable state sits behind a single lock. File reads happen outside it,
//! so readers never wait on I/O.

mod state;
mod ticker;

use std::collections::BTreeSet;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use rand::Rng;
use tokio::runtime::Handle;

pub use crate::loader::state::SourceStatus;
use crate::config::LoadingConfig;
use crate::corpus::CorpusError;
use crate::corpus::CorpusFile;
use crate::loader::state::LoaderState;
use crate::loader::state::SourceState;
use crate::loader::ticker::Ticker;
use crate::normalize::Normalizer;
use crate::parser::ParserError;
use crate::source::SourceDescriptor;
use crate::source::SourceRegistry;
use crate::stats::LoadingStatistics;
use crate::types::aliases::SourceId;
use crate::types::entry::Entry;
use crate::types::range::LoadedRange;
use crate::types::range::covered_rows;

/// What a background loading cycle did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Another cycle was still running.
    Skipped,
    Ran { batches: usize, entries: usize },
}

/// A cheap handle to the loader. Clones share the same state.
#[derive(Clone)]
pub struct WindowedCorpusLoader {
    shared: Arc<Shared>,
}

pub(crate) struct Shared {
    registry: SourceRegistry,
    config: LoadingConfig,
    normalizer: Normalizer,
    state: Mutex<LoaderState>,
    /// Serializes activation and shutdown.
    activation: Mutex<()>,
    tick_in_flight: AtomicBool,
    ticker: Mutex<Option<Ticker>>,
    runtime: Option<Handle>,
}

/// Held for the duration of a loading cycle.
struct TickGuard<'a>(&'a AtomicBool);

impl<'a> TickGuard<'a> {
    fn claim(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A batch read that has been admitted under the ceiling.
struct Reservation {
    file: Arc<CorpusFile>,
    count: usize,
    epoch: u64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Uniform start offset such that a full batch fits inside the file.
fn random_start(total: usize, batch_size: usize) -> usize {
    let last = total.saturating_sub(batch_size);
    rand::rng().random_range(0..=last)
}

fn report_skipped(id: &str, errors: &[ParserError]) {
    if errors.is_empty() {
        return;
    }
    for err in errors {
        log::debug!("{err}");
    }
    log::warn!("Skipped {} malformed rows in {id}", errors.len());
}

impl WindowedCorpusLoader {
    /// Create a loader. Background loading uses the ambient tokio runtime,
    /// if there is one.
    pub fn new(registry: SourceRegistry, config: LoadingConfig, normalizer: Normalizer) -> Self {
        Self::with_runtime(registry, config, normalizer, Handle::try_current().ok())
    }

    pub fn with_runtime(
        registry: SourceRegistry,
        config: LoadingConfig,
        normalizer: Normalizer,
        runtime: Option<Handle>,
    ) -> Self {
        if runtime.is_none() && config.schedules_background_loads() {
            log::warn!("No async runtime available, background loading is disabled.");
        }
        Self {
            shared: Arc::new(Shared {
                registry,
                config,
                normalizer,
                state: Mutex::new(LoaderState::default()),
                activation: Mutex::new(()),
                tick_in_flight: AtomicBool::new(false),
                ticker: Mutex::new(None),
                runtime,
            }),
        }
    }

    pub(crate) fn from_shared(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.shared.registry
    }

    pub fn config(&self) -> &LoadingConfig {
        &self.shared.config
    }

    fn state(&self) -> MutexGuard<'_, LoaderState> {
        lock(&self.shared.state)
    }

    /// Replace the active set with `ids`.
    ///
    /// Sources seen for the first time get their initial load before this
    /// returns. Sources leaving the set keep their entries, so reactivating
    /// them is free. Unknown ids are logged and ignored.
    pub fn activate<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let _activation = lock(&self.shared.activation);
        let mut requested = BTreeSet::new();
        for id in ids {
            let id = id.as_ref();
            if self.shared.registry.contains(id) {
                requested.insert(id.to_string());
            } else {
                log::warn!("Ignoring unknown source '{id}'");
            }
        }

        let pending: Vec<SourceId> = {
            let mut state = self.state();
            for id in state.active.difference(&requested) {
                log::info!("Deactivated {id}");
            }
            for id in requested.difference(&state.active) {
                if state.sources.contains_key(id) {
                    log::info!("Reactivated {id}");
                } else {
                    log::info!("Activated {id}");
                }
            }
            let pending = requested
                .iter()
                .filter(|id| !state.sources.contains_key(*id))
                .cloned()
                .collect();
            state.active = requested;
            pending
        };

        for id in &pending {
            self.load_initial_exclusive(id);
        }
        self.update_ticker();
    }

    /// Run the initial load for a source, unless it has already happened.
    pub fn load_initial(&self, id: &str) -> SourceStatus {
        let _activation = lock(&self.shared.activation);
        self.load_initial_exclusive(id)
    }

    fn load_initial_exclusive(&self, id: &str) -> SourceStatus {
        if let Some(status) = self.status(id) {
            return status;
        }
        let Some(descriptor) = self.shared.registry.get(id) else {
            log::warn!("Ignoring unknown source '{id}'");
            return SourceStatus::Missing;
        };
        let source = self.read_initial(descriptor);
        let status = source.status;

        let mut state = self.state();
        state.counters.initial_loads += 1;
        if !source.ranges.is_empty() {
            state.counters.batches_loaded += 1;
            state.counters.entries_loaded += source.entries.len();
        }
        state.sources.insert(id.to_string(), source);
        status
    }

    fn read_initial(&self, descriptor: &SourceDescriptor) -> SourceState {
        let id = &descriptor.id;
        let file = match CorpusFile::scan(
            &descriptor.file,
            descriptor.delimiter.as_char(),
            self.shared.normalizer.columns(),
        ) {
            Ok(file) => Arc::new(file),
            Err(CorpusError::Missing(path)) => {
                log::warn!("Source file for {id} not found: {}", path.display());
                return SourceState::unavailable(SourceStatus::Missing);
            }
            Err(err) => {
                log::warn!("Could not load {id}: {err}");
                return SourceState::unavailable(SourceStatus::Unreadable);
            }
        };

        let total = file.total_rows();
        if total == 0 {
            log::warn!("Source {id} has no rows");
            return SourceState::unavailable(SourceStatus::Empty);
        }

        let config = &self.shared.config;
        let whole = !config.enable_progressive_loading || total <= config.batch_size;
        let (start, count) = if whole {
            (0, total)
        } else {
            (random_start(total, config.batch_size), config.batch_size)
        };
        let batch = match file.read(start, count) {
            Ok(batch) => batch,
            Err(err) => {
                log::warn!("Could not load {id}: {err}");
                return SourceState::unavailable(SourceStatus::Unreadable);
            }
        };
        report_skipped(id, &batch.errors);
        let entries: Vec<Arc<Entry>> = self
            .shared
            .normalizer
            .entries(descriptor, batch.rows)
            .into_iter()
            .map(Arc::new)
            .collect();
        if whole {
            log::info!("Loaded entire {id} ({} entries)", entries.len());
        } else {
            log::info!(
                "Loaded initial batch for {id} ({} entries, rows {}..{} of {total})",
                entries.len(),
                batch.range.start,
                batch.range.end
            );
        }

        SourceState {
            status: SourceStatus::Ready,
            file: Some(file),
            total,
            entries,
            ranges: vec![batch.range],
            complete: whole,
            reads_in_flight: 0,
            pending_rows: 0,
        }
    }

    fn reserve(&self, id: &str) -> Option<Reservation> {
        let config = &self.shared.config;
        let mut guard = self.state();
        let state = &mut *guard;
        let source = state.sources.get_mut(id)?;
        if source.status != SourceStatus::Ready || source.complete {
            return None;
        }
        let room = source.room(config.max_loaded_entries);
        if room == 0 {
            return None;
        }
        let file = source.file.clone()?;
        let count = config.batch_size.min(room);
        source.reads_in_flight += 1;
        source.pending_rows += count;
        state.counters.peak_concurrent_reads = state
            .counters
            .peak_concurrent_reads
            .max(source.reads_in_flight);
        Some(Reservation {
            file,
            count,
            epoch: state.epoch,
        })
    }

    /// Read one more random batch for a source and append it.
    ///
    /// The batch is truncated so the source never exceeds the ceiling.
    /// Returns the entries that were added, which may be none.
    pub fn load_random_batch(&self, id: &str) -> Vec<Arc<Entry>> {
        let Some(reservation) = self.reserve(id) else {
            return Vec::new();
        };
        let start = random_start(reservation.file.total_rows(), self.shared.config.batch_size);
        let read = reservation.file.read(start, reservation.count);
        let loaded = match (read, self.shared.registry.get(id)) {
            (Ok(batch), Some(descriptor)) => {
                report_skipped(id, &batch.errors);
                let entries: Vec<Arc<Entry>> = self
                    .shared
                    .normalizer
                    .entries(descriptor, batch.rows)
                    .into_iter()
                    .map(Arc::new)
                    .collect();
                Some((entries, batch.range))
            }
            (Err(err), _) => {
                log::warn!("Progressive load for {id} failed: {err}");
                None
            }
            (Ok(_), None) => None,
        };

        let mut guard = self.state();
        let state = &mut *guard;
        // A shutdown happened while reading: the source is gone.
        if state.epoch != reservation.epoch {
            return Vec::new();
        }
        let Some(source) = state.sources.get_mut(id) else {
            return Vec::new();
        };
        source.reads_in_flight -= 1;
        source.pending_rows -= reservation.count;
        let Some((entries, range)) = loaded else {
            return Vec::new();
        };
        source.entries.extend(entries.iter().cloned());
        if !range.is_empty() {
            source.ranges.push(range);
        }
        state.counters.batches_loaded += 1;
        state.counters.entries_loaded += entries.len();
        log::info!(
            "Progressive load: added {} entries to {id} (total: {})",
            entries.len(),
            source.entries.len()
        );
        entries
    }

    /// One background loading cycle: a batch for every active source that
    /// can still grow. Cycles never overlap; a cycle that finds another one
    /// running returns [`TickOutcome::Skipped`].
    pub fn tick(&self) -> TickOutcome {
        let Some(_guard) = TickGuard::claim(&self.shared.tick_in_flight) else {
            self.state().counters.ticks_skipped += 1;
            return TickOutcome::Skipped;
        };
        let config = &self.shared.config;
        let due: Vec<SourceId> = {
            let state = self.state();
            state
                .active
                .iter()
                .filter(|id| {
                    state.sources.get(*id).is_some_and(|source| {
                        source.wants_more(config.batch_size, config.max_loaded_entries)
                    })
                })
                .cloned()
                .collect()
        };

        let mut batches = 0;
        let mut entries = 0;
        for id in &due {
            let loaded = self.load_random_batch(id);
            if !loaded.is_empty() {
                batches += 1;
                entries += loaded.len();
            }
        }
        self.state().counters.ticks_run += 1;
        TickOutcome::Ran { batches, entries }
    }

    /// Resident entries of the requested sources that are active.
    pub fn get_entries<I, S>(&self, ids: I) -> Vec<Arc<Entry>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let state = self.state();
        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        for id in ids {
            let id = id.as_ref();
            if !seen.insert(id.to_string()) || !state.active.contains(id) {
                continue;
            }
            if let Some(source) = state.sources.get(id) {
                entries.extend(source.entries.iter().cloned());
            }
        }
        entries
    }

    pub fn active_sources(&self) -> Vec<SourceId> {
        self.state().active.iter().cloned().collect()
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.state().active.contains(id)
    }

    pub fn status(&self, id: &str) -> Option<SourceStatus> {
        self.state().sources.get(id).map(|source| source.status)
    }

    /// Data rows in the source's file. `None` before the initial load.
    pub fn total_entry_count(&self, id: &str) -> Option<usize> {
        self.state().sources.get(id).map(|source| source.total)
    }

    pub fn resident_count(&self, id: &str) -> usize {
        self.state()
            .sources
            .get(id)
            .map_or(0, |source| source.entries.len())
    }

    pub fn loaded_ranges(&self, id: &str) -> Vec<LoadedRange> {
        self.state()
            .sources
            .get(id)
            .map(|source| source.ranges.clone())
            .unwrap_or_default()
    }

    pub fn statistics(&self) -> LoadingStatistics {
        let state = self.state();
        let counters = &state.counters;
        let mut stats = LoadingStatistics {
            progressive_loading: self.shared.config.enable_progressive_loading,
            total_batches_loaded: counters.batches_loaded,
            total_entries_loaded: counters.entries_loaded,
            initial_loads: counters.initial_loads,
            ticks_run: counters.ticks_run,
            ticks_skipped: counters.ticks_skipped,
            peak_concurrent_reads: counters.peak_concurrent_reads,
            active_sources: state.active.iter().cloned().collect(),
            ..Default::default()
        };
        for (id, source) in &state.sources {
            stats.per_source_loaded.insert(id.clone(), source.entries.len());
            stats.per_source_total.insert(id.clone(), source.total);
            stats
                .per_source_covered
                .insert(id.clone(), covered_rows(&source.ranges));
            stats.per_source_status.insert(id.clone(), source.status);
        }
        stats
    }

    /// Whether the background task is currently scheduled.
    pub fn is_ticking(&self) -> bool {
        lock(&self.shared.ticker)
            .as_ref()
            .is_some_and(Ticker::is_running)
    }

    /// Start or stop the background task to match the active set.
    fn update_ticker(&self) {
        let config = &self.shared.config;
        let wanted = config.schedules_background_loads() && !self.state().active.is_empty();
        let mut ticker = lock(&self.shared.ticker);
        if !wanted {
            if let Some(running) = ticker.take() {
                running.stop();
                log::debug!("Background loading stopped");
            }
            return;
        }
        if ticker.as_ref().is_some_and(Ticker::is_running) {
            return;
        }
        let Some(runtime) = &self.shared.runtime else {
            return;
        };
        *ticker = Some(Ticker::start(
            runtime,
            Arc::downgrade(&self.shared),
            config.interval(),
        ));
        log::debug!("Background loading every {:?}", config.interval());
    }

    /// Cancel background loading and drop every resident entry. Counters
    /// survive. Calling this more than once is harmless.
    pub fn shutdown(&self) {
        let _activation = lock(&self.shared.activation);
        if let Some(ticker) = lock(&self.shared.ticker).take() {
            ticker.stop();
        }
        let mut state = self.state();
        if !state.sources.is_empty() {
            log::info!("Releasing {} sources", state.sources.len());
        }
        state.sources.clear();
        state.active.clear();
        state.epoch += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::thread;
    use std::time::Duration;

    use tempfile::tempdir;

    use super::*;
    use crate::config::SchemaConfig;
    use crate::error::Fallible;
    use crate::helper::write_corpus_in;
    use crate::weights::WeightRules;

    fn loading(batch_size: usize, max_loaded_entries: usize) -> LoadingConfig {
        LoadingConfig {
            batch_size,
            max_loaded_entries,
            background_loading: false,
            ..Default::default()
        }
    }

    fn make_loader(
        sources: Vec<SourceDescriptor>,
        config: LoadingConfig,
    ) -> Fallible<WindowedCorpusLoader> {
        let registry = SourceRegistry::new(sources)?;
        let normalizer = Normalizer::new(SchemaConfig::default(), WeightRules::default());
        Ok(WindowedCorpusLoader::with_runtime(registry, config, normalizer, None))
    }

    fn corpus(dir: &Path, id: &str, rows: usize) -> Fallible<SourceDescriptor> {
        let path = write_corpus_in(dir, &format!("{id}.csv"), rows)?;
        Ok(SourceDescriptor::new(id, path))
    }

    #[test]
    fn test_small_file_is_loaded_whole() -> Fallible<()> {
        let dir = tempdir()?;
        let loader = make_loader(vec![corpus(dir.path(), "custom", 50)?], loading(1000, 10000))?;
        loader.activate(["custom"]);
        assert_eq!(loader.get_entries(["custom"]).len(), 50);
        assert_eq!(loader.loaded_ranges("custom"), vec![LoadedRange::new(0, 50)]);
        assert_eq!(loader.total_entry_count("custom"), Some(50));
        assert_eq!(loader.status("custom"), Some(SourceStatus::Ready));

        assert_eq!(loader.tick(), TickOutcome::Ran { batches: 0, entries: 0 });
        assert!(loader.load_random_batch("custom").is_empty());
        assert_eq!(loader.resident_count("custom"), 50);
        Ok(())
    }

    #[test]
    fn test_big_file_grows_up_to_ceiling() -> Fallible<()> {
        let dir = tempdir()?;
        let loader = make_loader(vec![corpus(dir.path(), "big", 100_000)?], loading(1000, 5000))?;
        loader.activate(["big"]);
        assert_eq!(loader.total_entry_count("big"), Some(100_000));
        assert_eq!(loader.resident_count("big"), 1000);

        let mut previous = 1000;
        for _ in 0..5 {
            loader.tick();
            let resident = loader.resident_count("big");
            assert!(resident >= previous);
            assert!(resident <= 5000);
            previous = resident;
        }
        assert_eq!(previous, 5000);

        assert_eq!(loader.tick(), TickOutcome::Ran { batches: 0, entries: 0 });
        assert_eq!(loader.resident_count("big"), 5000);

        let stats = loader.statistics();
        assert_eq!(stats.total_batches_loaded, 5);
        assert_eq!(stats.total_entries_loaded, 5000);
        assert!(stats.per_source_covered["big"] <= 5000);
        assert!(stats.per_source_covered["big"] >= 1000);
        assert_eq!(loader.loaded_ranges("big").len(), 5);
        Ok(())
    }

    #[test]
    fn test_batch_is_truncated_at_ceiling() -> Fallible<()> {
        let dir = tempdir()?;
        let loader = make_loader(vec![corpus(dir.path(), "big", 10_000)?], loading(1000, 2500))?;
        loader.activate(["big"]);
        assert_eq!(loader.load_random_batch("big").len(), 1000);
        assert_eq!(loader.load_random_batch("big").len(), 500);
        assert!(loader.load_random_batch("big").is_empty());
        assert_eq!(loader.resident_count("big"), 2500);
        Ok(())
    }

    #[test]
    fn test_activation_is_idempotent() -> Fallible<()> {
        let dir = tempdir()?;
        let loader = make_loader(vec![corpus(dir.path(), "big", 5000)?], loading(1000, 5000))?;
        loader.activate(["big"]);
        let before = loader.get_entries(["big"]);
        loader.activate(["big"]);
        loader.activate(["big", "big"]);
        assert_eq!(loader.statistics().initial_loads, 1);
        assert_eq!(loader.get_entries(["big"]), before);
        assert_eq!(loader.get_entries(["big", "big"]).len(), 1000);
        Ok(())
    }

    #[test]
    fn test_deactivated_sources_keep_entries() -> Fallible<()> {
        let dir = tempdir()?;
        let sources = vec![corpus(dir.path(), "a", 10)?, corpus(dir.path(), "b", 20)?];
        let loader = make_loader(sources, loading(1000, 5000))?;
        loader.activate(["a", "b"]);
        assert_eq!(loader.get_entries(["a", "b"]).len(), 30);

        loader.activate(["a"]);
        assert_eq!(loader.get_entries(["a", "b"]).len(), 10);
        assert!(!loader.is_active("b"));
        assert_eq!(loader.resident_count("b"), 20);

        loader.activate(["b", "a"]);
        assert_eq!(loader.get_entries(["a", "b"]).len(), 30);
        assert_eq!(loader.statistics().initial_loads, 2);
        assert_eq!(loader.active_sources(), vec!["a".to_string(), "b".to_string()]);
        Ok(())
    }

    #[test]
    fn test_missing_file_is_not_fatal() -> Fallible<()> {
        let dir = tempdir()?;
        let missing = SourceDescriptor::new("custom", dir.path().join("nope.csv"));
        let loader = make_loader(vec![missing], loading(1000, 5000))?;
        loader.activate(["custom"]);
        assert!(loader.get_entries(["custom"]).is_empty());
        assert_eq!(loader.status("custom"), Some(SourceStatus::Missing));
        assert_eq!(loader.total_entry_count("custom"), Some(0));

        loader.activate(Vec::<&str>::new());
        loader.activate(["custom"]);
        assert_eq!(loader.statistics().initial_loads, 1);
        assert_eq!(loader.tick(), TickOutcome::Ran { batches: 0, entries: 0 });
        Ok(())
    }

    #[test]
    fn test_empty_file() -> Fallible<()> {
        let dir = tempdir()?;
        let loader = make_loader(vec![corpus(dir.path(), "empty", 0)?], loading(1000, 5000))?;
        assert_eq!(loader.load_initial("empty"), SourceStatus::Empty);
        assert_eq!(loader.load_initial("empty"), SourceStatus::Empty);
        assert_eq!(loader.statistics().initial_loads, 1);
        assert_eq!(loader.resident_count("empty"), 0);
        Ok(())
    }

    #[test]
    fn test_unknown_source_is_ignored() -> Fallible<()> {
        let dir = tempdir()?;
        let loader = make_loader(vec![corpus(dir.path(), "a", 10)?], loading(1000, 5000))?;
        loader.activate(["a", "ghost"]);
        assert_eq!(loader.active_sources(), vec!["a".to_string()]);
        assert_eq!(loader.get_entries(["a", "ghost"]).len(), 10);
        assert_eq!(loader.status("ghost"), None);
        Ok(())
    }

    #[test]
    fn test_full_load_when_progressive_is_off() -> Fallible<()> {
        let dir = tempdir()?;
        let config = LoadingConfig {
            enable_progressive_loading: false,
            ..loading(1000, 1000)
        };
        let loader = make_loader(vec![corpus(dir.path(), "big", 3000)?], config)?;
        loader.activate(["big"]);
        assert_eq!(loader.resident_count("big"), 3000);
        assert_eq!(loader.loaded_ranges("big"), vec![LoadedRange::new(0, 3000)]);
        assert!(loader.load_random_batch("big").is_empty());
        assert_eq!(loader.tick(), TickOutcome::Ran { batches: 0, entries: 0 });
        assert!(!loader.statistics().progressive_loading);
        Ok(())
    }

    #[test]
    fn test_tick_is_skipped_while_another_runs() -> Fallible<()> {
        let dir = tempdir()?;
        let loader = make_loader(vec![corpus(dir.path(), "big", 10_000)?], loading(100, 5000))?;
        loader.activate(["big"]);
        {
            let _running = TickGuard::claim(&loader.shared.tick_in_flight);
            assert_eq!(loader.tick(), TickOutcome::Skipped);
        }
        assert_eq!(loader.tick(), TickOutcome::Ran { batches: 1, entries: 100 });
        let stats = loader.statistics();
        assert_eq!(stats.ticks_skipped, 1);
        assert_eq!(stats.ticks_run, 1);
        Ok(())
    }

    #[test]
    fn test_concurrent_ticks_never_overlap_reads() -> Fallible<()> {
        let dir = tempdir()?;
        let loader = make_loader(vec![corpus(dir.path(), "big", 20_000)?], loading(100, 2000))?;
        loader.activate(["big"]);
        thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..5 {
                        loader.tick();
                        let _ = loader.get_entries(["big"]);
                    }
                });
            }
        });
        let stats = loader.statistics();
        assert_eq!(stats.peak_concurrent_reads, 1);
        assert_eq!(stats.ticks_run + stats.ticks_skipped, 40);
        assert!(loader.resident_count("big") <= 2000);
        Ok(())
    }

    #[test]
    fn test_shutdown_is_idempotent() -> Fallible<()> {
        let dir = tempdir()?;
        let loader = make_loader(vec![corpus(dir.path(), "a", 10)?], loading(1000, 5000))?;
        loader.activate(["a"]);
        loader.shutdown();
        loader.shutdown();
        assert!(loader.get_entries(["a"]).is_empty());
        assert!(loader.active_sources().is_empty());
        assert_eq!(loader.statistics().initial_loads, 1);

        loader.activate(["a"]);
        assert_eq!(loader.get_entries(["a"]).len(), 10);
        Ok(())
    }

    #[test]
    fn test_random_start_keeps_batch_inside_file() {
        for _ in 0..1000 {
            assert!(random_start(10, 3) <= 7);
        }
        assert_eq!(random_start(2, 5), 0);
        assert_eq!(random_start(5, 5), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_background_loading() -> Fallible<()> {
        let dir = tempdir()?;
        let config = LoadingConfig {
            batch_size: 100,
            max_loaded_entries: 1000,
            loading_interval: 0.01,
            ..Default::default()
        };
        let loader = make_loader(vec![corpus(dir.path(), "big", 10_000)?], config.clone())?;
        assert!(!loader.is_ticking());
        // No runtime handle was given: activation works, nothing is scheduled.
        loader.activate(["big"]);
        assert!(!loader.is_ticking());

        let registry = SourceRegistry::new(vec![corpus(dir.path(), "big", 10_000)?])?;
        let normalizer = Normalizer::new(SchemaConfig::default(), WeightRules::default());
        let loader = WindowedCorpusLoader::new(registry, config, normalizer);
        loader.activate(["big"]);
        assert!(loader.is_ticking());

        tokio::time::sleep(Duration::from_millis(500)).await;
        let resident = loader.resident_count("big");
        assert!(resident > 100);
        assert!(resident <= 1000);

        loader.activate(Vec::<&str>::new());
        assert!(!loader.is_ticking());
        loader.activate(["big"]);
        assert!(loader.is_ticking());

        loader.shutdown();
        assert!(!loader.is_ticking());
        tokio::time::sleep(Duration::from_millis(100)).await;
        let ticks = loader.statistics().ticks_run;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(loader.statistics().ticks_run, ticks);
        Ok(())
    }
}
