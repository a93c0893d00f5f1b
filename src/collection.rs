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

use std::env::current_dir;
use std::ffi::OsStr;
use std::fs::File;
use std::fs::read_to_string;
use std::io::BufRead;
use std::io::BufReader;
use std::path::Path;
use std::path::PathBuf;

use flashdeck_core::Config;
use flashdeck_core::CorpusManager;
use flashdeck_core::Delimiter;
use flashdeck_core::ErrorReport;
use flashdeck_core::Fallible;
use flashdeck_core::SourceDescriptor;
use flashdeck_core::SourceId;
use flashdeck_core::fail;
use walkdir::WalkDir;

use crate::db::Database;

pub const CONFIG_FILE: &str = "flashdeck.toml";
pub const DATABASE_FILE: &str = "flashdeck.db";

pub struct Collection {
    pub directory: PathBuf,
    pub db: Database,
    pub manager: CorpusManager,
}

impl Collection {
    /// Open the collection in `directory`, or the working directory.
    ///
    /// Sources come from `flashdeck.toml` when it lists any. Otherwise every
    /// `.csv` and `.tsv` file under the directory becomes a source.
    pub fn new(directory: Option<String>) -> Fallible<Self> {
        let directory: PathBuf = match directory {
            Some(directory) => PathBuf::from(directory),
            None => current_dir()?,
        };
        if !directory.exists() {
            return fail("directory does not exist.");
        }
        let directory = directory.canonicalize()?;
        let config = load_config(&directory)?;
        let db = Database::new(&directory.join(DATABASE_FILE))?;
        let manager = CorpusManager::new(config, &directory)?;
        Ok(Self {
            directory,
            db,
            manager,
        })
    }

    /// The requested sources, or the defaults when none were requested.
    pub fn selection(&self, requested: Vec<String>) -> Vec<SourceId> {
        if requested.is_empty() {
            self.manager.default_active()
        } else {
            requested
        }
    }
}

fn load_config(directory: &Path) -> Fallible<Config> {
    let path = directory.join(CONFIG_FILE);
    let mut config = if path.exists() {
        log::debug!("Reading {}", path.display());
        Config::from_toml(&read_to_string(&path)?)?
    } else {
        Config::default()
    };
    if config.sources.is_empty() {
        config.sources = discover_sources(directory)?;
        config.validate()?;
    }
    Ok(config)
}

/// Every delimited text file under `directory`, in path order. Ids are the
/// directory-relative paths without extension.
pub fn discover_sources(directory: &Path) -> Fallible<Vec<SourceDescriptor>> {
    let mut sources: Vec<SourceDescriptor> = Vec::new();
    for entry in WalkDir::new(directory).sort_by_file_name() {
        let entry = entry.map_err(|e| ErrorReport::new(format!("Failed to read directory: {e}")))?;
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        let extension = path.extension().and_then(OsStr::to_str);
        if !matches!(extension, Some("csv" | "tsv")) {
            continue;
        }
        let relative = path
            .strip_prefix(directory)
            .map_err(|_| ErrorReport::new(format!("Path outside collection: {}", path.display())))?;
        let mut id = source_id(&relative.with_extension(""));
        // `words.csv` next to `words.tsv`: the second one keeps its extension.
        if sources.iter().any(|s| s.id == id) {
            id = source_id(relative);
        }
        let delimiter = sniff_delimiter(path)?;
        log::debug!("Discovered source {id} ({})", relative.display());
        sources.push(
            SourceDescriptor::new(id, relative)
                .with_delimiter(delimiter)
                .active_by_default(),
        );
    }
    Ok(sources)
}

fn source_id(relative: &Path) -> SourceId {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Guess the delimiter from the header line, falling back on the extension.
fn sniff_delimiter(path: &Path) -> Fallible<Delimiter> {
    let mut header = String::new();
    BufReader::new(File::open(path)?).read_line(&mut header)?;
    for candidate in ['\t', ',', ';', '|'] {
        if header.contains(candidate) {
            return Delimiter::try_from(candidate.to_string());
        }
    }
    match path.extension().and_then(OsStr::to_str) {
        Some("csv") => Ok(Delimiter::COMMA),
        _ => Ok(Delimiter::TAB),
    }
}

#[cfg(test)]
mod tests {
    use std::fs::create_dir_all;
    use std::fs::write;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_non_existent_directory() {
        let result = Collection::new(Some("./derpherp".to_string()));
        assert!(result.is_err());
        let err = result.err().unwrap();
        assert_eq!(err.to_string(), "error: directory does not exist.");
    }

    #[test]
    fn test_discovery() -> Fallible<()> {
        let dir = tempdir()?;
        create_dir_all(dir.path().join("de"))?;
        write(dir.path().join("de/verbs.tsv"), "Word_1\tWord_2\ngehen\tидти\n")?;
        write(dir.path().join("nouns.csv"), "Word_1,Word_2\nHaus,дом\n")?;
        write(dir.path().join("notes.txt"), "not a corpus")?;

        let sources = discover_sources(dir.path())?;
        let ids: Vec<&str> = sources.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["de/verbs", "nouns"]);
        assert_eq!(sources[0].delimiter, Delimiter::TAB);
        assert_eq!(sources[1].delimiter, Delimiter::COMMA);
        assert!(sources.iter().all(|s| s.default_active));
        Ok(())
    }

    #[test]
    fn test_discovery_with_same_stem() -> Fallible<()> {
        let dir = tempdir()?;
        write(dir.path().join("words.csv"), "Word_1,Word_2\nHaus,дом\n")?;
        write(dir.path().join("words.tsv"), "Word_1\tWord_2\nBaum\tдерево\n")?;
        let sources = discover_sources(dir.path())?;
        let ids: Vec<&str> = sources.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["words", "words.tsv"]);
        Ok(())
    }

    #[test]
    fn test_open_discovered_collection() -> Fallible<()> {
        let dir = tempdir()?;
        write(dir.path().join("nouns.csv"), "Word_1,Word_2\nHaus,дом\nBaum,дерево\n")?;
        let collection = Collection::new(Some(dir.path().display().to_string()))?;
        let ids = collection.selection(Vec::new());
        assert_eq!(ids, vec!["nouns".to_string()]);
        collection.manager.activate(&ids);
        assert_eq!(collection.manager.active_entries().len(), 2);
        assert!(dir.path().join(DATABASE_FILE).exists());
        Ok(())
    }

    #[test]
    fn test_config_file() -> Fallible<()> {
        let dir = tempdir()?;
        write(dir.path().join("words.txt"), "Word_1;Word_2\nHaus;дом\n")?;
        write(
            dir.path().join(CONFIG_FILE),
            r#"
[[sources]]
id = "words"
file = "words.txt"
delimiter = ";"
label = "Wörter"
"#,
        )?;
        let collection = Collection::new(Some(dir.path().display().to_string()))?;
        assert!(collection.manager.default_active().is_empty());
        assert_eq!(collection.selection(vec!["words".to_string()]), vec!["words"]);
        assert_eq!(collection.manager.select(&["words"]).len(), 1);
        Ok(())
    }

    #[test]
    fn test_bad_config_file() -> Fallible<()> {
        let dir = tempdir()?;
        write(dir.path().join(CONFIG_FILE), "[loading]\nbatch_size = 0\n")?;
        assert!(Collection::new(Some(dir.path().display().to_string())).is_err());
        Ok(())
    }
}
