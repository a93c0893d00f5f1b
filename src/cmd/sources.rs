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

use flashdeck_core::Fallible;
use flashdeck_core::SourceRegistry;

use crate::collection::Collection;

pub fn list_sources(directory: Option<String>) -> Fallible<()> {
    let collection = Collection::new(directory)?;
    let registry = collection.manager.registry();
    if registry.is_empty() {
        println!("No sources found in {}.", collection.directory.display());
        return Ok(());
    }
    for line in describe(registry) {
        println!("{line}");
    }
    Ok(())
}

fn describe(registry: &SourceRegistry) -> Vec<String> {
    registry
        .iter()
        .map(|source| {
            let marker = if source.default_active { "*" } else { " " };
            let titles = match (&source.front_title, &source.back_title) {
                (Some(front), Some(back)) => format!(" [{front} -> {back}]"),
                _ => String::new(),
            };
            format!(
                "{marker} {}\t{}{titles}\t{}",
                source.id,
                source.label(),
                source.file.display()
            )
        })
        .collect()
}
