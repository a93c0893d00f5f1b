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

use crate::types::aliases::SourceTag;

/// A sampling weight. Always finite and non-negative.
#[derive(Clone, Copy, PartialEq, PartialOrd, Debug, Serialize)]
#[serde(transparent)]
pub struct Weight(f64);

impl Weight {
    /// The weight given to entries whose weight is missing or malformed and
    /// that are not weighted dynamically.
    pub const DEFAULT: Weight = Weight(1.0);

    pub const ZERO: Weight = Weight(0.0);

    /// Returns `None` for NaN, infinities and negative values.
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && value >= 0.0 {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Parse a weight field from a corpus row.
    pub fn parse(text: &str) -> Option<Self> {
        text.trim().parse::<f64>().ok().and_then(Self::new)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<u32> for Weight {
    fn from(value: u32) -> Self {
        Self(f64::from(value))
    }
}

impl Default for Weight {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// One practice item. Entries are immutable once the loader has produced
/// them.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Entry {
    front: String,
    front_note: String,
    back: String,
    back_note: String,
    source: SourceTag,
    weight: Weight,
}

impl Entry {
    pub fn new(
        front: impl Into<String>,
        back: impl Into<String>,
        source: impl Into<SourceTag>,
        weight: Weight,
    ) -> Self {
        Self {
            front: front.into(),
            front_note: String::new(),
            back: back.into(),
            back_note: String::new(),
            source: source.into(),
            weight,
        }
    }

    pub fn with_notes(self, front_note: impl Into<String>, back_note: impl Into<String>) -> Self {
        Self {
            front_note: front_note.into(),
            back_note: back_note.into(),
            ..self
        }
    }

    pub fn front(&self) -> &str {
        &self.front
    }

    /// Annotation shown under the front text, e.g. a part of speech.
    pub fn front_note(&self) -> &str {
        &self.front_note
    }

    pub fn back(&self) -> &str {
        &self.back
    }

    pub fn back_note(&self) -> &str {
        &self.back_note
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn weight(&self) -> Weight {
        self.weight
    }
}
