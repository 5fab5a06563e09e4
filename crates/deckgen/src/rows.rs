//! CSV row reading.
//!
//! The file has no header. Each record is kept as its raw list of fields;
//! deciding whether a record is usable is the pipeline's job. A blank line
//! is a record with no fields, so row numbers line up with the file.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::error::{Error, Result};

/// One usable input row: the first two fields of a CSV record, trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabRow {
    /// Word in the source language (card front).
    pub source_text: String,
    /// Word in the target language (card back, spoken).
    pub target_text: String,
    /// Zero-based position of the record in the input.
    pub row_index: usize,
}

impl VocabRow {
    /// Build a row from raw fields, or `None` if there are fewer than two.
    ///
    /// Fields past the second are ignored.
    pub fn from_fields(row_index: usize, fields: &[String]) -> Option<Self> {
        match fields {
            [source, target, ..] => Some(Self {
                source_text: source.trim().to_string(),
                target_text: target.trim().to_string(),
                row_index,
            }),
            _ => None,
        }
    }
}

/// Read every record of a CSV file as raw fields.
///
/// A missing file is [`Error::InputNotFound`]; undecodable content is
/// [`Error::Input`].
pub fn read_rows(path: impl AsRef<Path>) -> Result<Vec<Vec<String>>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::InputNotFound(path.to_path_buf())
        } else {
            Error::Io(e)
        }
    })?;
    parse_rows(file)
}

/// Read every record from any reader as raw fields.
///
/// Records are framed by line breaks outside quoted fields. Each record is
/// then split into fields by the `csv` parser.
pub fn parse_rows<R: Read>(reader: R) -> Result<Vec<Vec<String>>> {
    let mut parser = csv::ReaderBuilder::new();
    parser.has_headers(false).flexible(true);

    let mut rows = Vec::new();
    let mut pending: Vec<u8> = Vec::new();
    let mut open_quote = false;

    for line in BufReader::new(reader).split(b'\n') {
        let mut line = line?;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        if open_quote {
            pending.push(b'\n');
        }
        open_quote ^= line.iter().filter(|&&b| b == b'"').count() % 2 == 1;
        pending.extend_from_slice(&line);

        if !open_quote {
            rows.push(parse_record(&parser, &pending)?);
            pending.clear();
        }
    }
    // unterminated quote at end of input
    if !pending.is_empty() {
        rows.push(parse_record(&parser, &pending)?);
    }
    Ok(rows)
}

fn parse_record(parser: &csv::ReaderBuilder, record: &[u8]) -> Result<Vec<String>> {
    if record.is_empty() {
        return Ok(Vec::new());
    }
    match parser.from_reader(record).records().next() {
        Some(fields) => Ok(fields?.iter().map(str::to_string).collect()),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uneven_rows() {
        let data = "hello,ciao\nonlyonecolumn\ncat, gatto ,extra\n";
        let rows = parse_rows(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], vec!["onlyonecolumn"]);
        assert_eq!(rows[2].len(), 3);
    }

    #[test]
    fn test_quoted_fields() {
        let data = "\"good morning, sir\",\"buongiorno\"\n";
        let rows = parse_rows(data.as_bytes()).unwrap();
        assert_eq!(rows[0], vec!["good morning, sir", "buongiorno"]);
    }

    #[test]
    fn test_blank_lines_are_empty_records() {
        let data = "hello,ciao\n\ncat,gatto\r\n\r\n";
        let rows = parse_rows(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], vec!["hello", "ciao"]);
        assert!(rows[1].is_empty());
        assert_eq!(rows[2], vec!["cat", "gatto"]);
        assert!(rows[3].is_empty());
    }

    #[test]
    fn test_quoted_line_break_stays_in_record() {
        let data = "\"two\nlines\",due righe\n\"say \"\"hi\"\"\",ciao\n";
        let rows = parse_rows(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["two\nlines", "due righe"]);
        assert_eq!(rows[1], vec!["say \"hi\"", "ciao"]);
    }

    #[test]
    fn test_from_fields() {
        let fields = vec![" cat ".to_string(), "gatto\t".to_string(), "x".to_string()];
        let row = VocabRow::from_fields(4, &fields).unwrap();
        assert_eq!(row.source_text, "cat");
        assert_eq!(row.target_text, "gatto");
        assert_eq!(row.row_index, 4);

        assert!(VocabRow::from_fields(0, &["alone".to_string()]).is_none());
        assert!(VocabRow::from_fields(0, &[]).is_none());
    }

    #[test]
    fn test_empty_target_is_kept() {
        let row = VocabRow::from_fields(1, &["x".to_string(), String::new()]).unwrap();
        assert_eq!(row.target_text, "");
    }

    #[test]
    fn test_missing_file() {
        let result = read_rows("/definitely/not/here.csv");
        assert!(matches!(result, Err(Error::InputNotFound(_))));
    }

    #[test]
    fn test_invalid_utf8() {
        let data: &[u8] = b"ok,fine\n\xff\xfe,bad\n";
        assert!(matches!(parse_rows(data), Err(Error::Input(_))));
    }
}
