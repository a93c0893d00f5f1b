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

//! Read-only access to a corpus file: one counting pass, then batches of
//! rows read from arbitrary offsets.

use std::fmt::Display;
use std::fmt::Formatter;
use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::ErrorKind;
use std::io::Seek;
use std::io::SeekFrom;
use std::path::Path;
use std::path::PathBuf;

use crate::config::Columns;
use crate::error::ErrorReport;
use crate::parser::Header;
use crate::parser::ParserError;
use crate::parser::RawRow;
use crate::parser::RowParser;
use crate::types::range::LoadedRange;

/// A checkpoint is recorded every this many data rows.
pub const CHECKPOINT_STRIDE: usize = 1024;

/// File-level failures. None of them are fatal to the application: the
/// loader treats the source as empty and remembers why.
#[derive(Debug)]
pub enum CorpusError {
    /// The backing file does not exist.
    Missing(PathBuf),
    /// The file exists but could not be read.
    Io(PathBuf, std::io::Error),
    /// The header row is unusable, so no row can be decoded.
    Header(ParserError),
}

impl Display for CorpusError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CorpusError::Missing(path) => write!(f, "File not found: {}", path.display()),
            CorpusError::Io(path, err) => write!(f, "Failed to read {}: {err}", path.display()),
            CorpusError::Header(err) => write!(f, "{err}"),
        }
    }
}

impl From<CorpusError> for ErrorReport {
    fn from(value: CorpusError) -> Self {
        ErrorReport::new(value.to_string())
    }
}

/// Rows decoded from one contiguous slice of a file.
#[derive(Debug)]
pub struct Batch {
    pub rows: Vec<RawRow>,
    /// Rows that could not be decoded. They still count toward `range`.
    pub errors: Vec<ParserError>,
    /// The data rows this batch covered, whether or not they decoded.
    pub range: LoadedRange,
}

/// A scanned corpus file.
pub struct CorpusFile {
    path: PathBuf,
    parser: RowParser,
    header: Option<Header>,
    total_rows: usize,
    /// `checkpoints[k]` is the byte offset of data row `k * CHECKPOINT_STRIDE`.
    checkpoints: Vec<u64>,
}

impl CorpusFile {
    /// Count the data rows of the file and index it. This is the only pass
    /// over the whole file.
    pub fn scan(path: &Path, delimiter: char, columns: &Columns) -> Result<Self, CorpusError> {
        let parser = RowParser::new(path, delimiter);
        let mut reader = BufReader::new(open(path)?);
        let mut line = Vec::new();
        let header_len = read_line(&mut reader, &mut line, path)?;
        if header_len == 0 {
            return Ok(Self {
                path: path.to_path_buf(),
                parser,
                header: None,
                total_rows: 0,
                checkpoints: Vec::new(),
            });
        }
        let header_text = String::from_utf8_lossy(trim_newline(&line)).into_owned();
        let header = parser
            .header(&header_text, columns)
            .map_err(CorpusError::Header)?;

        let mut offset = header_len as u64;
        let mut total_rows = 0;
        let mut checkpoints = Vec::new();
        loop {
            if total_rows % CHECKPOINT_STRIDE == 0 {
                checkpoints.push(offset);
            }
            line.clear();
            let len = read_line(&mut reader, &mut line, path)?;
            if len == 0 {
                break;
            }
            offset += len as u64;
            total_rows += 1;
        }
        // The loop pushes one checkpoint past the last row when the row count
        // is a multiple of the stride.
        checkpoints.truncate(total_rows.div_ceil(CHECKPOINT_STRIDE));
        log::debug!("Counted {total_rows} rows in {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            parser,
            header: Some(header),
            total_rows,
            checkpoints,
        })
    }

    /// Number of data rows, excluding the header.
    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    /// Read up to `count` rows starting at data row `start`.
    pub fn read(&self, start: usize, count: usize) -> Result<Batch, CorpusError> {
        let start = start.min(self.total_rows);
        let empty = Batch {
            rows: Vec::new(),
            errors: Vec::new(),
            range: LoadedRange::new(start, start),
        };
        let header = match &self.header {
            Some(header) if count > 0 && start < self.total_rows => header,
            _ => return Ok(empty),
        };

        let checkpoint = start / CHECKPOINT_STRIDE;
        let mut reader = BufReader::new(open(&self.path)?);
        reader
            .seek(SeekFrom::Start(self.checkpoints[checkpoint]))
            .map_err(|e| CorpusError::Io(self.path.clone(), e))?;

        let mut line = Vec::new();
        for _ in (checkpoint * CHECKPOINT_STRIDE)..start {
            line.clear();
            if read_line(&mut reader, &mut line, &self.path)? == 0 {
                return Ok(empty);
            }
        }

        let mut rows = Vec::new();
        let mut errors = Vec::new();
        let mut row_num = start;
        while row_num < start + count {
            line.clear();
            if read_line(&mut reader, &mut line, &self.path)? == 0 {
                break;
            }
            // Line 0 is the header.
            let line_num = row_num + 1;
            row_num += 1;
            let text = match String::from_utf8(trim_newline(&line).to_vec()) {
                Ok(text) => text,
                Err(_) => {
                    errors.push(self.parser.invalid_utf8(line_num));
                    continue;
                }
            };
            match self.parser.row(header, &text, line_num) {
                Ok(Some(row)) => rows.push(row),
                Ok(None) => {}
                Err(err) => errors.push(err),
            }
        }
        Ok(Batch {
            rows,
            errors,
            range: LoadedRange::new(start, row_num),
        })
    }
}

fn open(path: &Path) -> Result<File, CorpusError> {
    File::open(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => CorpusError::Missing(path.to_path_buf()),
        _ => CorpusError::Io(path.to_path_buf(), err),
    })
}

fn read_line(
    reader: &mut BufReader<File>,
    buf: &mut Vec<u8>,
    path: &Path,
) -> Result<usize, CorpusError> {
    reader
        .read_until(b'\n', buf)
        .map_err(|e| CorpusError::Io(path.to_path_buf(), e))
}

fn trim_newline(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\n").unwrap_or(line)
}
