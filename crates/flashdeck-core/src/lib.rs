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

//! flashdeck-core: windowed loading and weighted sampling for large
//! flashcard corpora.
//!
//! Sources are delimited text files with a header row. Instead of reading a
//! whole file up front, the loader keeps a random, growing window of each
//! active source in memory:
//! - one random batch when a source is first activated
//! - one more random batch per source on every background cycle
//! - never more than a fixed number of entries per source
//!
//! Entries are drawn with probability proportional to their weight.

pub mod config;
pub mod corpus;
pub mod error;
pub mod loader;
pub mod manager;
pub mod normalize;
pub mod parser;
pub mod sampler;
pub mod source;
pub mod stats;
pub mod types;
pub mod weights;

#[cfg(test)]
mod helper;

// Re-exports for convenience
pub use config::{Columns, Config, LoadingConfig, SchemaConfig};
pub use error::{ErrorReport, Fallible, fail};
pub use loader::{SourceStatus, TickOutcome, WindowedCorpusLoader};
pub use manager::CorpusManager;
pub use sampler::{SampleError, Weighted, choose, choose_random};
pub use source::{Delimiter, SourceDescriptor, SourceRegistry};
pub use stats::LoadingStatistics;
pub use types::aliases::{SourceId, SourceTag};
pub use types::entry::{Entry, Weight};
pub use types::range::LoadedRange;
pub use weights::{DynamicWeightAssigner, WeightRules};
