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

use clap::Parser;

use crate::cmd::drill::DrillConfig;
use crate::cmd::drill::start_drill;
use crate::cmd::history::print_history;
use crate::cmd::sample::print_sample;
use crate::cmd::sources::list_sources;
use crate::cmd::stats::StatsFormat;
use crate::cmd::stats::print_stats;
use flashdeck_core::Fallible;

#[derive(Parser)]
#[command(version, about, long_about = None)]
enum Command {
    /// Drill entries in the terminal.
    Drill {
        /// Path to the collection directory. By default, the current working directory is used.
        directory: Option<String>,
        /// Only drill these sources. By default, the sources marked active by default are used.
        #[arg(long = "source")]
        sources: Vec<String>,
        /// Maximum number of entries to drill in a session. By default, the session runs until it is quit.
        #[arg(long)]
        card_limit: Option<usize>,
    },
    /// Print weighted random draws from the active sources.
    Sample {
        /// Path to the collection directory. By default, the current working directory is used.
        directory: Option<String>,
        /// Sample from these sources. By default, the sources marked active by default are used.
        #[arg(long = "source")]
        sources: Vec<String>,
        /// Number of draws.
        #[arg(long, default_value_t = 10)]
        count: usize,
        /// Seed for reproducible draws.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print loading statistics.
    Stats {
        /// Path to the collection directory. By default, the current working directory is used.
        directory: Option<String>,
        /// Activate these sources. By default, the sources marked active by default are used.
        #[arg(long = "source")]
        sources: Vec<String>,
        /// Run this many loading cycles before printing.
        #[arg(long, default_value_t = 0)]
        ticks: usize,
        /// Which output format to use.
        #[arg(long, default_value_t = StatsFormat::Text)]
        format: StatsFormat,
    },
    /// List the sources of a collection.
    Sources {
        /// Path to the collection directory. By default, the current working directory is used.
        directory: Option<String>,
    },
    /// Print recent drill sessions.
    History {
        /// Path to the collection directory. By default, the current working directory is used.
        directory: Option<String>,
        /// Maximum number of sessions to print.
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

pub async fn entrypoint() -> Fallible<()> {
    let cli: Command = Command::parse();
    match cli {
        Command::Drill {
            directory,
            sources,
            card_limit,
        } => {
            let config = DrillConfig {
                directory,
                sources,
                card_limit,
            };
            start_drill(config).await
        }
        Command::Sample {
            directory,
            sources,
            count,
            seed,
        } => print_sample(directory, sources, count, seed),
        Command::Stats {
            directory,
            sources,
            ticks,
            format,
        } => print_stats(directory, sources, ticks, format),
        Command::Sources { directory } => list_sources(directory),
        Command::History { directory, limit } => print_history(directory, limit),
    }
}
