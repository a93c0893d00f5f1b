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

use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::error::fail;
use crate::types::aliases::SourceId;
use crate::types::aliases::SourceTag;

/// The field separator of a corpus file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Delimiter(char);

impl Delimiter {
    pub const TAB: Delimiter = Delimiter('\t');
    pub const COMMA: Delimiter = Delimiter(',');

    pub fn as_char(self) -> char {
        self.0
    }
}

impl Default for Delimiter {
    fn default() -> Self {
        Self::TAB
    }
}

impl TryFrom<String> for Delimiter {
    type Error = ErrorReport;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "tab" {
            return Ok(Self::TAB);
        }
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c != '"' && c != '\\' && c != '\n' => Ok(Delimiter(c)),
            _ => Err(ErrorReport::new(format!(
                "Invalid delimiter: '{value}'. A delimiter is a single character other than a quote, backslash or newline."
            ))),
        }
    }
}

/// Static description of one corpus. Never mutated after startup.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SourceDescriptor {
    pub id: SourceId,
    /// Path to the backing file. Relative paths are resolved against the
    /// collection directory.
    pub file: PathBuf,
    #[serde(default)]
    pub delimiter: Delimiter,
    /// Human-readable name, e.g. `5k Wörter`.
    #[serde(default)]
    pub label: Option<String>,
    /// Tag stamped on the entries of this source.
    #[serde(default)]
    pub source: Option<SourceTag>,
    #[serde(default)]
    pub default_active: bool,
    #[serde(default)]
    pub front_title: Option<String>,
    #[serde(default)]
    pub back_title: Option<String>,
}

impl SourceDescriptor {
    pub fn new(id: impl Into<SourceId>, file: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            file: file.into(),
            delimiter: Delimiter::default(),
            label: None,
            source: None,
            default_active: false,
            front_title: None,
            back_title: None,
        }
    }

    pub fn with_delimiter(self, delimiter: Delimiter) -> Self {
        Self { delimiter, ..self }
    }

    pub fn with_tag(self, tag: impl Into<SourceTag>) -> Self {
        Self {
            source: Some(tag.into()),
            ..self
        }
    }

    pub fn active_by_default(self) -> Self {
        Self {
            default_active: true,
            ..self
        }
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }
}

/// The set of sources available to the application, in configuration order.
#[derive(Clone, Debug, Default)]
pub struct SourceRegistry {
    sources: Vec<SourceDescriptor>,
}

impl SourceRegistry {
    pub fn new(sources: Vec<SourceDescriptor>) -> Fallible<Self> {
        let mut seen = HashSet::new();
        for source in sources.iter() {
            if source.id.trim().is_empty() {
                return fail("Source ids must not be empty.");
            }
            if !seen.insert(source.id.as_str()) {
                return fail(format!("Duplicate source id: '{}'.", source.id));
            }
        }
        Ok(Self { sources })
    }

    /// Resolve relative file paths against `root`.
    pub fn resolve(self, root: &Path) -> Self {
        let sources = self
            .sources
            .into_iter()
            .map(|source| {
                let file = if source.file.is_absolute() {
                    source.file.clone()
                } else {
                    root.join(&source.file)
                };
                SourceDescriptor { file, ..source }
            })
            .collect();
        Self { sources }
    }

    pub fn get(&self, id: &str) -> Option<&SourceDescriptor> {
        self.sources.iter().find(|source| source.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceDescriptor> {
        self.sources.iter()
    }

    pub fn ids(&self) -> Vec<SourceId> {
        self.sources.iter().map(|source| source.id.clone()).collect()
    }

    /// Ids of the sources that should be selected when the application starts.
    pub fn default_active(&self) -> Vec<SourceId> {
        self.sources
            .iter()
            .filter(|source| source.default_active)
            .map(|source| source.id.clone())
            .collect()
    }

    /// Backing files of the given sources. Unknown ids are skipped.
    pub fn file_paths<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> Vec<&Path> {
        ids.into_iter()
            .filter_map(|id| self.get(id))
            .map(|source| source.file.as_path())
            .collect()
    }

    /// The entry tag of the source backed by `path`, if any.
    pub fn source_tag_for_path(&self, path: &Path) -> Option<&str> {
        self.sources
            .iter()
            .find(|source| source.file == path)
            .map(|source| source.source.as_deref().unwrap_or(&source.id))
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
