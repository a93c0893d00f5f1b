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

use std::error::Error;
use std::fmt::Display;
use std::fmt::Formatter;
use std::sync::Arc;

use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;

use crate::error::ErrorReport;
use crate::types::entry::Entry;

/// Signals that there is nothing to sample: no active source has entries.
#[derive(Debug, PartialEq, Eq)]
pub enum SampleError {
    Empty,
}

impl Display for SampleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleError::Empty => write!(f, "No entries available. Select at least one source."),
        }
    }
}

impl Error for SampleError {}

impl From<SampleError> for ErrorReport {
    fn from(value: SampleError) -> Self {
        ErrorReport::new(value.to_string())
    }
}

/// Anything that can be drawn by weight.
pub trait Weighted {
    /// The selection weight. Negative and non-finite values count as zero.
    fn sampling_weight(&self) -> f64;
}

impl Weighted for Entry {
    fn sampling_weight(&self) -> f64 {
        self.weight().value()
    }
}

impl<T: Weighted + ?Sized> Weighted for Arc<T> {
    fn sampling_weight(&self) -> f64 {
        (**self).sampling_weight()
    }
}

impl<T: Weighted + ?Sized> Weighted for &T {
    fn sampling_weight(&self) -> f64 {
        (**self).sampling_weight()
    }
}

/// Draw one item with probability proportional to its weight.
///
/// Zero-weight items are never drawn, unless every weight is zero, in which
/// case the draw is uniform.
pub fn choose<'a, T, R>(items: &'a [T], rng: &mut R) -> Result<&'a T, SampleError>
where
    T: Weighted,
    R: Rng + ?Sized,
{
    if items.is_empty() {
        return Err(SampleError::Empty);
    }
    let weights: Vec<f64> = items
        .iter()
        .map(|item| sanitize(item.sampling_weight()))
        .collect();
    // An infinite total is not a valid sampling range.
    if !weights.iter().sum::<f64>().is_finite() {
        return Ok(&items[rng.random_range(0..items.len())]);
    }
    match WeightedIndex::new(&weights) {
        Ok(dist) => Ok(&items[dist.sample(rng)]),
        Err(err) => {
            log::debug!("Falling back to a uniform draw: {err}");
            Ok(&items[rng.random_range(0..items.len())])
        }
    }
}

/// [`choose`] with the thread-local generator.
pub fn choose_random<T: Weighted>(items: &[T]) -> Result<&T, SampleError> {
    choose(items, &mut rand::rng())
}

fn sanitize(weight: f64) -> f64 {
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        0.0
    }
}
