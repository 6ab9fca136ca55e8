//! Annotated CSV parser: row classification and table segmentation
//!
//! Input is read line by line. Rows whose first field starts with `#` are
//! annotation rows; every other row is the header (first one seen for a
//! table) or a data row. Tables may follow each other with or without blank
//! lines in between, so a boundary is recognised structurally: an annotation
//! row arriving after at least one data row closes the open table.

use crate::builder::TableState;
use crate::error::{Error, Result};
use crate::table::Table;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, trace};

/// Marker that starts an annotation row
pub const ANNOTATION_PREFIX: char = '#';

/// Options controlling how lines are split into fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Field separator
    pub delimiter: u8,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl ParseOptions {
    /// Use a different single-byte field separator
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

/// Parse an annotated CSV file into tables
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Vec<Table>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    debug!(path = %path.display(), "parsing file");
    parse_reader(BufReader::new(file), &ParseOptions::default())
}

/// Parse annotated CSV from a string (useful for testing)
pub fn parse_str(content: &str) -> Result<Vec<Table>> {
    parse_reader(content.as_bytes(), &ParseOptions::default())
}

/// Parse annotated CSV from any buffered reader.
///
/// The whole input is consumed before anything is returned; the first
/// error aborts the run and no partial tables are produced.
pub fn parse_reader<R: BufRead>(reader: R, options: &ParseOptions) -> Result<Vec<Table>> {
    let mut segmenter = Segmenter::default();

    for line in LogicalLines::new(reader, options.delimiter) {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let fields = split_line(&line, options)?;
        segmenter.push(fields)?;
    }

    segmenter.finish()
}

/// Split one logical line into fields.
///
/// Quotes are read permissively: a quote inside an unquoted field is kept
/// as a literal character, and an unterminated quoted field runs to the end
/// of the line. Text following a closing quote is appended to the field
/// without the quote (`"abc"def` reads as `abcdef`).
///
/// The line is expected to have its terminator stripped already, so only
/// `\n` (which can appear inside a joined quoted field) ends a record and a
/// bare `\r` stays field text.
pub fn split_line(line: &str, options: &ParseOptions) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(options.delimiter)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_reader(line.as_bytes());

    let mut record = csv::StringRecord::new();
    match reader.read_record(&mut record) {
        Ok(true) => Ok(record.iter().map(str::to_string).collect()),
        Ok(false) => Ok(Vec::new()),
        Err(source) => Err(Error::Line {
            line: line.to_string(),
            source,
        }),
    }
}

/// Table segmentation state: at most one open accumulator, plus whether it
/// has received a data row yet.
#[derive(Debug, Default)]
struct Segmenter {
    tables: Vec<Table>,
    state: Option<TableState>,
    has_data: bool,
}

impl Segmenter {
    fn push(&mut self, fields: Vec<String>) -> Result<()> {
        let mut fields = fields.into_iter();
        let Some(first) = fields.next() else {
            return Ok(());
        };

        match first.strip_prefix(ANNOTATION_PREFIX) {
            Some(name) => self.annotation_row(name, fields.collect()),
            None => {
                // The leading annotation column is always empty for header
                // and data rows.
                self.header_or_data_row(fields.collect());
                Ok(())
            }
        }
    }

    fn annotation_row(&mut self, name: &str, values: Vec<String>) -> Result<()> {
        if self.has_data {
            debug!(annotation = name, "annotation after data rows starts a new table");
            self.close_table()?;
        }

        trace!(annotation = name, columns = values.len(), "annotation row");
        self.state
            .get_or_insert_with(TableState::new)
            .set_annotation(name, values);
        Ok(())
    }

    fn header_or_data_row(&mut self, cells: Vec<String>) {
        let state = self.state.get_or_insert_with(TableState::new);
        if state.push_row(cells) {
            self.has_data = true;
        } else {
            trace!(columns = state.headers.len(), "header row");
        }
    }

    fn close_table(&mut self) -> Result<()> {
        self.has_data = false;
        if let Some(state) = self.state.take() {
            let table = state.build()?;
            debug!(
                table = self.tables.len(),
                columns = table.column_count(),
                rows = table.row_count(),
                "finished table"
            );
            self.tables.push(table);
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<Table>> {
        if self.state.as_ref().is_some_and(|s| s.has_header) {
            self.close_table()?;
        } else if let Some(state) = &self.state {
            debug!(
                annotations = state.annotations.len(),
                "discarding trailing annotations without a header"
            );
        }
        Ok(self.tables)
    }
}

/// Iterator over logical lines. Line terminators (`\n` or `\r\n`) are
/// stripped, and a physical line ending inside a quoted field is joined
/// with the following line(s) so the field keeps its embedded newline.
///
/// A quote that is still open at end of input was never a multi-line
/// field: the lines gathered for it are handed back one at a time, so the
/// damage stays on the line holding the stray quote.
struct LogicalLines<R> {
    reader: R,
    delimiter: u8,
    buf: Vec<u8>,
    /// Physical lines read ahead while looking for a closing quote
    pending: VecDeque<String>,
}

impl<R: BufRead> LogicalLines<R> {
    fn new(reader: R, delimiter: u8) -> Self {
        Self {
            reader,
            delimiter,
            buf: Vec::new(),
            pending: VecDeque::new(),
        }
    }

    fn next_physical(&mut self) -> std::io::Result<Option<String>> {
        match self.pending.pop_front() {
            Some(line) => Ok(Some(line)),
            None => self.read_physical(),
        }
    }

    fn read_physical(&mut self) -> std::io::Result<Option<String>> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }

        if self.buf.ends_with(b"\n") {
            self.buf.pop();
        }
        if self.buf.ends_with(b"\r") {
            self.buf.pop();
        }
        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }
}

impl<R: BufRead> Iterator for LogicalLines<R> {
    type Item = std::io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = match self.next_physical() {
            Ok(Some(line)) => line,
            Ok(None) => return None,
            Err(e) => return Some(Err(e)),
        };
        if !ends_inside_quotes(&first, self.delimiter) {
            return Some(Ok(first));
        }

        let mut line = first.clone();
        let mut joined = Vec::new();
        loop {
            match self.next_physical() {
                Ok(Some(next)) => {
                    line.push('\n');
                    line.push_str(&next);
                    joined.push(next);
                    if !ends_inside_quotes(&line, self.delimiter) {
                        return Some(Ok(line));
                    }
                }
                Ok(None) => break,
                Err(e) => return Some(Err(e)),
            }
        }

        if !joined.is_empty() {
            debug!(lines = joined.len() + 1, "unterminated quote, reading lines separately");
        }
        for next in joined.into_iter().rev() {
            self.pending.push_front(next);
        }
        Some(Ok(first))
    }
}

/// Whether `line` ends while a quoted field is still open. Only a quote at
/// the very start of a field opens one; `""` inside it is an escaped quote.
fn ends_inside_quotes(line: &str, delimiter: u8) -> bool {
    let bytes = line.as_bytes();
    let mut in_quotes = false;
    let mut field_start = true;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if in_quotes {
            if b == b'"' {
                if bytes.get(i + 1) == Some(&b'"') {
                    i += 1;
                } else {
                    in_quotes = false;
                }
            }
        } else if b == delimiter {
            field_start = true;
            i += 1;
            continue;
        } else if field_start && b == b'"' {
            in_quotes = true;
        }
        field_start = false;
        i += 1;
    }

    in_quotes
}
