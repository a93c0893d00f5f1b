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

use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Write;

use clap::ValueEnum;
use flashdeck_core::Fallible;
use flashdeck_core::LoadingStatistics;

use crate::collection::Collection;

#[derive(ValueEnum, Clone, Copy, PartialEq)]
pub enum StatsFormat {
    /// Human-readable summary.
    Text,
    /// JSON object.
    Json,
}

impl Display for StatsFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StatsFormat::Text => write!(f, "text"),
            StatsFormat::Json => write!(f, "json"),
        }
    }
}

pub fn print_stats(
    directory: Option<String>,
    sources: Vec<String>,
    ticks: usize,
    format: StatsFormat,
) -> Fallible<()> {
    let collection = Collection::new(directory)?;
    let ids = collection.selection(sources);
    collection.manager.activate(&ids);
    for _ in 0..ticks {
        collection.manager.tick();
    }
    let stats = collection.manager.statistics();
    println!("{}", render(&stats, format)?);
    Ok(())
}

fn render(stats: &LoadingStatistics, format: StatsFormat) -> Fallible<String> {
    match format {
        StatsFormat::Json => stats.to_json(),
        StatsFormat::Text => Ok(render_text(stats)),
    }
}

fn render_text(stats: &LoadingStatistics) -> String {
    let mode = if stats.progressive_loading {
        "progressive"
    } else {
        "full"
    };
    let mut out = String::new();
    let _ = writeln!(out, "Loading mode: {mode}");
    let _ = writeln!(
        out,
        "Batches loaded: {} ({} entries, {} initial loads)",
        stats.total_batches_loaded, stats.total_entries_loaded, stats.initial_loads
    );
    let _ = writeln!(
        out,
        "Loading cycles: {} run, {} skipped",
        stats.ticks_run, stats.ticks_skipped
    );
    let _ = writeln!(out, "Active sources: {}", stats.active_sources.join(", "));
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{:<24} {:>10} {:>10} {:>9}  status",
        "source", "resident", "rows", "covered"
    );
    for (id, status) in &stats.per_source_status {
        let resident = stats.per_source_loaded.get(id).copied().unwrap_or(0);
        let total = stats.per_source_total.get(id).copied().unwrap_or(0);
        let covered = match stats.coverage(id) {
            Some(percent) => format!("{percent:.1}%"),
            None => "-".to_string(),
        };
        let _ = writeln!(
            out,
            "{id:<24} {resident:>10} {total:>10} {covered:>9}  {status:?}"
        );
    }
    out.trim_end().to_string()
}
