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

use std::path::Path;
use std::sync::Arc;

use rand::Rng;
use tokio::runtime::Handle;

use crate::config::Config;
use crate::error::Fallible;
use crate::loader::TickOutcome;
use crate::loader::WindowedCorpusLoader;
use crate::normalize::Normalizer;
use crate::sampler::SampleError;
use crate::sampler::choose;
use crate::source::SourceRegistry;
use crate::stats::LoadingStatistics;
use crate::types::aliases::SourceId;
use crate::types::entry::Entry;

/// The application-facing corpus: sources from the configuration, loaded
/// through a [`WindowedCorpusLoader`]. Dropping the manager shuts the
/// loader down.
pub struct CorpusManager {
    loader: WindowedCorpusLoader,
}

impl CorpusManager {
    /// Build a manager from a configuration. Relative source paths are
    /// resolved against `root`.
    pub fn new(config: Config, root: &Path) -> Fallible<Self> {
        Self::with_runtime(config, root, Handle::try_current().ok())
    }

    pub fn with_runtime(config: Config, root: &Path, runtime: Option<Handle>) -> Fallible<Self> {
        config.validate()?;
        let registry = SourceRegistry::new(config.sources)?.resolve(root);
        log::debug!("Registered {} sources", registry.len());
        let normalizer = Normalizer::new(config.schema, config.weights);
        Ok(Self {
            loader: WindowedCorpusLoader::with_runtime(
                registry,
                config.loading,
                normalizer,
                runtime,
            ),
        })
    }

    pub fn loader(&self) -> &WindowedCorpusLoader {
        &self.loader
    }

    pub fn registry(&self) -> &SourceRegistry {
        self.loader.registry()
    }

    pub fn default_active(&self) -> Vec<SourceId> {
        self.registry().default_active()
    }

    pub fn activate<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.loader.activate(ids);
    }

    /// Activate the sources marked active by default.
    pub fn activate_defaults(&self) {
        self.loader.activate(self.default_active());
    }

    pub fn get_entries<I, S>(&self, ids: I) -> Vec<Arc<Entry>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.loader.get_entries(ids)
    }

    /// Make `ids` the active set and return its resident entries.
    pub fn select<S: AsRef<str>>(&self, ids: &[S]) -> Vec<Arc<Entry>> {
        self.loader.activate(ids);
        self.loader.get_entries(ids)
    }

    /// Resident entries of every active source.
    pub fn active_entries(&self) -> Vec<Arc<Entry>> {
        self.loader.get_entries(self.loader.active_sources())
    }

    /// Draw one entry from the active sources, proportionally to weight.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Arc<Entry>, SampleError> {
        let entries = self.active_entries();
        choose(&entries, rng).cloned()
    }

    pub fn tick(&self) -> TickOutcome {
        self.loader.tick()
    }

    pub fn statistics(&self) -> LoadingStatistics {
        self.loader.statistics()
    }

    pub fn shutdown(&self) {
        self.loader.shutdown();
    }
}

impl Drop for CorpusManager {
    fn drop(&mut self) {
        self.loader.shutdown();
    }
}
