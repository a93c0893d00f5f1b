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

use std::fs::write;
use std::path::Path;
use std::path::PathBuf;

use tempfile::TempDir;
use tempfile::tempdir;

use crate::error::Fallible;

/// Write `text` to a file in a fresh temporary directory.
pub fn write_file(text: &str) -> Fallible<(TempDir, PathBuf)> {
    let dir = tempdir()?;
    let path = dir.path().join("corpus.csv");
    write(&path, text)?;
    Ok((dir, path))
}

/// A tab-separated corpus with `rows` rows: `front {i}` / `back {i}`.
pub fn write_corpus(rows: usize) -> Fallible<(TempDir, PathBuf)> {
    let dir = tempdir()?;
    let path = write_corpus_in(dir.path(), "corpus.csv", rows)?;
    Ok((dir, path))
}

pub fn write_corpus_in(dir: &Path, name: &str, rows: usize) -> Fallible<PathBuf> {
    let mut text = String::from("Word_1\tWord_2\n");
    for i in 0..rows {
        text.push_str(&format!("front {i}\tback {i}\n"));
    }
    let path = dir.join(name);
    write(&path, text)?;
    Ok(path)
}
