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

use serde::Serialize;

/// A half-open interval `[start, end)` of data-row offsets that has been
/// read into memory. Row 0 is the first line after the header.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Serialize)]
pub struct LoadedRange {
    pub start: usize,
    pub end: usize,
}

impl LoadedRange {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Number of distinct rows covered by a set of possibly overlapping ranges.
pub fn covered_rows(ranges: &[LoadedRange]) -> usize {
    let mut sorted: Vec<LoadedRange> = ranges.iter().copied().filter(|r| !r.is_empty()).collect();
    sorted.sort();
    let mut covered = 0;
    let mut reach = 0;
    for range in sorted {
        let start = range.start.max(reach);
        if range.end > start {
            covered += range.end - start;
        }
        reach = reach.max(range.end);
    }
    covered
}
