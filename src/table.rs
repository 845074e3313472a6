use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{ComposeError, ComposeResult};

const DELIMITER_CANDIDATES: [char; 4] = [',', ';', '\t', '|'];

/// Header names plus data rows aligned positionally to them.
///
/// Rows whose cells are all blank after trimming never make it into a table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let rows = rows.into_iter().filter(|row| !is_blank_row(row)).collect();
        Self { headers, rows }
    }

    pub fn parse(text: &str, delimiter: Option<char>) -> ComposeResult<Self> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        if text.trim().is_empty() {
            return Err(ComposeError::table("input is empty"));
        }
        let delimiter = match delimiter {
            Some(value) => value,
            None => detect_delimiter(text),
        };
        if delimiter == '"' || delimiter == '\n' || delimiter == '\r' {
            return Err(ComposeError::table(format!(
                "unsupported delimiter {:?}",
                delimiter
            )));
        }

        let mut records = parse_records(text, delimiter)?.into_iter();
        let headers = records
            .next()
            .ok_or_else(|| ComposeError::table("missing header row"))?;
        let table = Self::new(headers, records.collect());
        debug!(
            "table: {} columns, {} rows (delimiter {:?})",
            table.headers.len(),
            table.rows.len(),
            delimiter
        );
        Ok(table)
    }

    pub fn load(path: &Path, delimiter: Option<char>) -> ComposeResult<Self> {
        let text = fs::read_to_string(path).map_err(|err| {
            ComposeError::table(format!("failed to read {}: {}", path.display(), err))
        })?;
        Self::parse(&text, delimiter)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[String]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub fn is_blank_row<C: AsRef<str>>(row: &[C]) -> bool {
    row.iter().all(|cell| cell.as_ref().trim().is_empty())
}

fn detect_delimiter(text: &str) -> char {
    let mut counts = [0usize; DELIMITER_CANDIDATES.len()];
    let mut in_quotes = false;
    for ch in text.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '\n' | '\r' if !in_quotes => break,
            _ if !in_quotes => {
                if let Some(idx) = DELIMITER_CANDIDATES.iter().position(|c| *c == ch) {
                    counts[idx] += 1;
                }
            }
            _ => {}
        }
    }
    let mut best = 0usize;
    for idx in 1..counts.len() {
        if counts[idx] > counts[best] {
            best = idx;
        }
    }
    DELIMITER_CANDIDATES[best]
}

fn parse_records(text: &str, delimiter: char) -> ComposeResult<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1usize;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(ch);
                }
                _ => field.push(ch),
            }
            continue;
        }
        match ch {
            '"' if field.is_empty() => in_quotes = true,
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
                line += 1;
            }
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
                line += 1;
            }
            _ if ch == delimiter => record.push(std::mem::take(&mut field)),
            _ => field.push(ch),
        }
    }
    if in_quotes {
        return Err(ComposeError::table(format!(
            "unterminated quoted field at line {}",
            line
        )));
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    Ok(records)
}
