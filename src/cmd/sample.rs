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

use flashdeck_core::CorpusManager;
use flashdeck_core::Fallible;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::collection::Collection;

pub fn print_sample(
    directory: Option<String>,
    sources: Vec<String>,
    count: usize,
    seed: Option<u64>,
) -> Fallible<()> {
    let collection = Collection::new(directory)?;
    let ids = collection.selection(sources);
    collection.manager.activate(&ids);
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    for line in sample_lines(&collection.manager, count, &mut rng)? {
        println!("{line}");
    }
    Ok(())
}

/// One tab-separated line per draw: source, front, back, weight.
fn sample_lines<R: Rng + ?Sized>(
    manager: &CorpusManager,
    count: usize,
    rng: &mut R,
) -> Fallible<Vec<String>> {
    let mut lines = Vec::with_capacity(count);
    for _ in 0..count {
        let entry = manager.sample(rng)?;
        lines.push(format!(
            "{}\t{}\t{}\t{}",
            entry.source(),
            entry.front(),
            entry.back(),
            entry.weight().value()
        ));
    }
    Ok(lines)
}
