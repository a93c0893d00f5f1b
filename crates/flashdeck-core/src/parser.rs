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
use std::mem::take;
use std::path::Path;
use std::path::PathBuf;

use crate::config::Columns;

const QUOTE: char = '"';
const ESCAPE: char = '\\';
const BYTE_ORDER_MARK: char = '\u{feff}';

#[derive(Debug)]
pub struct ParserError {
    pub message: String,
    pub file_path: PathBuf,
    /// Zero-based physical line number. The header is line 0.
    pub line_num: usize,
}

impl ParserError {
    fn new(message: impl Into<String>, file_path: &Path, line_num: usize) -> Self {
        ParserError {
            message: message.into(),
            file_path: file_path.to_path_buf(),
            line_num,
        }
    }
}

impl Display for ParserError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} Location: {}:{}",
            self.message,
            self.file_path.display(),
            self.line_num + 1
        )
    }
}

impl Error for ParserError {}

/// The fields of one data row, before defaults are filled in.
#[derive(Debug, PartialEq)]
pub struct RawRow {
    pub front: String,
    pub back: String,
    pub front_note: Option<String>,
    pub back_note: Option<String>,
    pub weight: Option<String>,
    pub tag: Option<String>,
}

/// Column positions resolved from a header line.
#[derive(Clone, Debug, PartialEq)]
pub struct Header {
    width: usize,
    front: usize,
    back: usize,
    front_note: Option<usize>,
    back_note: Option<usize>,
    weight: Option<usize>,
    tag: Option<usize>,
}

impl Header {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn has_weight(&self) -> bool {
        self.weight.is_some()
    }
}

enum State {
    /// Reading an unquoted field, or at the start of a field.
    Unquoted,
    /// Inside a double-quoted field.
    Quoted,
    /// Just read a quote inside a quoted field: either the field ends here
    /// or the quote was the first half of `""`.
    QuoteInQuoted,
}

/// Parses the lines of one delimited corpus file.
pub struct RowParser {
    file_path: PathBuf,
    delimiter: char,
}

impl RowParser {
    pub fn new(file_path: impl Into<PathBuf>, delimiter: char) -> Self {
        RowParser {
            file_path: file_path.into(),
            delimiter,
        }
    }

    /// Resolve the configured column names against the header line. The
    /// front and back columns are required.
    pub fn header(&self, line: &str, columns: &Columns) -> Result<Header, ParserError> {
        let line = line.trim_start_matches(BYTE_ORDER_MARK);
        let names: Vec<String> = self
            .fields(line, 0)?
            .into_iter()
            .map(|name| name.trim().to_string())
            .collect();
        let find = |wanted: &str| names.iter().position(|name| name == wanted);
        let front = find(&columns.front).ok_or_else(|| {
            ParserError::new(
                format!(
                    "Header has no '{}' column. Found columns: {:?}. The delimiter might be incorrect.",
                    columns.front, names
                ),
                &self.file_path,
                0,
            )
        })?;
        let back = find(&columns.back).ok_or_else(|| {
            ParserError::new(
                format!(
                    "Header has no '{}' column. Found columns: {:?}. The delimiter might be incorrect.",
                    columns.back, names
                ),
                &self.file_path,
                0,
            )
        })?;
        Ok(Header {
            width: names.len(),
            front,
            back,
            front_note: find(&columns.front_note),
            back_note: find(&columns.back_note),
            weight: find(&columns.weight),
            tag: find(&columns.source),
        })
    }

    pub fn invalid_utf8(&self, line_num: usize) -> ParserError {
        ParserError::new("Row is not valid UTF-8.", &self.file_path, line_num)
    }

    /// Parse one data line. Blank lines yield `Ok(None)`.
    pub fn row(
        &self,
        header: &Header,
        line: &str,
        line_num: usize,
    ) -> Result<Option<RawRow>, ParserError> {
        if line.trim().is_empty() {
            return Ok(None);
        }
        let mut fields: Vec<Option<String>> =
            self.fields(line, line_num)?.into_iter().map(Some).collect();
        if fields.len() > header.width {
            return Err(ParserError::new(
                format!(
                    "Row has {} fields but the header has {} columns.",
                    fields.len(),
                    header.width
                ),
                &self.file_path,
                line_num,
            ));
        }
        let mut column = |index: Option<usize>| -> Option<String> {
            index
                .and_then(|i| fields.get_mut(i))
                .and_then(Option::take)
                .map(|field| field.trim().to_string())
                .filter(|field| !field.is_empty())
        };
        let front = column(Some(header.front));
        let back = column(Some(header.back));
        let front_note = column(header.front_note);
        let back_note = column(header.back_note);
        let weight = column(header.weight);
        let tag = column(header.tag);
        let (front, back) = match (front, back) {
            (Some(front), Some(back)) => (front, back),
            (None, _) => {
                return Err(ParserError::new(
                    "Row has no front text.",
                    &self.file_path,
                    line_num,
                ));
            }
            (_, None) => {
                return Err(ParserError::new(
                    "Row has no back text.",
                    &self.file_path,
                    line_num,
                ));
            }
        };
        Ok(Some(RawRow {
            front,
            back,
            front_note,
            back_note,
            weight,
            tag,
        }))
    }

    /// Split a line into fields. Quotes and backslash escapes are removed.
    fn fields(&self, line: &str, line_num: usize) -> Result<Vec<String>, ParserError> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let mut fields = Vec::new();
        let mut field = String::new();
        let mut state = State::Unquoted;
        let mut chars = line.chars();
        while let Some(c) = chars.next() {
            state = match state {
                State::Unquoted => {
                    if c == ESCAPE {
                        field.push(chars.next().unwrap_or(ESCAPE));
                        State::Unquoted
                    } else if c == self.delimiter {
                        fields.push(take(&mut field));
                        State::Unquoted
                    } else if c == QUOTE && field.is_empty() {
                        // An opening quote is only recognized at the start of a field.
                        State::Quoted
                    } else {
                        field.push(c);
                        State::Unquoted
                    }
                }
                State::Quoted => {
                    if c == ESCAPE {
                        field.push(chars.next().unwrap_or(ESCAPE));
                        State::Quoted
                    } else if c == QUOTE {
                        State::QuoteInQuoted
                    } else {
                        field.push(c);
                        State::Quoted
                    }
                }
                State::QuoteInQuoted => {
                    if c == QUOTE {
                        field.push(QUOTE);
                        State::Quoted
                    } else if c == self.delimiter {
                        fields.push(take(&mut field));
                        State::Unquoted
                    } else if c == ESCAPE {
                        field.push(chars.next().unwrap_or(ESCAPE));
                        State::Unquoted
                    } else {
                        // Text after the closing quote belongs to the same field.
                        field.push(c);
                        State::Unquoted
                    }
                }
            };
        }
        if matches!(state, State::Quoted) {
            return Err(ParserError::new(
                "Unterminated quoted field.",
                &self.file_path,
                line_num,
            ));
        }
        fields.push(field);
        Ok(fields)
    }
}
