//! CSV File Source
//!
//! Reads a flat comma-separated file one line at a time. Fields are split on
//! the delimiter with double-quote awareness; no whitespace is trimmed, so
//! padded numbers fail measurement parsing downstream. A line that is not
//! valid UTF-8 is reported as [`SourceError::InvalidEncoding`] and reading
//! continues with the next line.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{RawRow, RecordSource, RowReader, SourceError};

/// A telemetry CSV file on disk
#[derive(Clone, Debug)]
pub struct CsvSource {
    path: PathBuf,
    delimiter: char,
}

impl CsvSource {
    /// Create a source for the file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: ',',
        }
    }

    /// Use a delimiter other than `,`
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Path of the underlying file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordSource for CsvSource {
    type Reader = CsvReader;

    async fn open(&self) -> Result<CsvReader, SourceError> {
        let file = File::open(&self.path)
            .await
            .map_err(|source| SourceError::Open {
                location: self.path.clone(),
                source,
            })?;

        Ok(CsvReader {
            reader: BufReader::new(file),
            buf: Vec::new(),
            line: 0,
            location: self.path.clone(),
            delimiter: self.delimiter,
        })
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Cursor over one pass of a [`CsvSource`]
pub struct CsvReader {
    reader: BufReader<File>,
    buf: Vec<u8>,
    line: u64,
    location: PathBuf,
    delimiter: char,
}

#[async_trait]
impl RowReader for CsvReader {
    async fn next_row(&mut self) -> Result<Option<RawRow>, SourceError> {
        loop {
            self.buf.clear();
            let read = self
                .reader
                .read_until(b'\n', &mut self.buf)
                .await
                .map_err(|source| SourceError::Read {
                    location: self.location.clone(),
                    source,
                })?;
            if read == 0 {
                return Ok(None);
            }
            self.line += 1;

            let bytes = self.buf.strip_suffix(b"\n").unwrap_or(&self.buf[..]);
            let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
            let Ok(line) = std::str::from_utf8(bytes) else {
                return Err(SourceError::InvalidEncoding {
                    location: self.location.clone(),
                    line: self.line,
                });
            };

            if !line.trim().is_empty() {
                return Ok(Some(split_fields(line, self.delimiter)));
            }
        }
    }
}

/// Split one CSV line into fields
///
/// A field that starts with `"` runs to the matching closing quote and may
/// contain the delimiter; `""` inside it is a literal quote.
#[must_use]
pub fn split_fields(line: &str, delimiter: char) -> RawRow {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() => in_quotes = true,
            c if c == delimiter && !in_quotes => fields.push(std::mem::take(&mut field)),
            c => field.push(c),
        }
    }
    fields.push(field);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_split_plain() {
        assert_eq!(
            split_fields("h1,g1,50,30,70", ','),
            vec!["h1", "g1", "50", "30", "70"]
        );
    }

    #[test]
    fn test_split_keeps_empty_and_padded_fields() {
        assert_eq!(split_fields("a,, b,", ','), vec!["a", "", " b", ""]);
    }

    #[test]
    fn test_split_quoted() {
        assert_eq!(
            split_fields(r#""host, rack 4","say ""hi""",1"#, ','),
            vec!["host, rack 4", r#"say "hi""#, "1"]
        );
    }

    #[test]
    fn test_split_custom_delimiter() {
        assert_eq!(split_fields("a;b;c", ';'), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_reads_rows_and_skips_blank_lines() {
        let file = csv_file("host_id,gpu_id\r\nh1,g1\n\n   \nh2,g2");
        let source = CsvSource::new(file.path());
        let mut reader = source.open().await.unwrap();

        assert_eq!(
            reader.next_row().await.unwrap(),
            Some(vec!["host_id".to_string(), "gpu_id".to_string()])
        );
        assert_eq!(
            reader.next_row().await.unwrap(),
            Some(vec!["h1".to_string(), "g1".to_string()])
        );
        assert_eq!(
            reader.next_row().await.unwrap(),
            Some(vec!["h2".to_string(), "g2".to_string()])
        );
        assert_eq!(reader.next_row().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reopen_starts_from_top() {
        let file = csv_file("a,b\nc,d\n");
        let source = CsvSource::new(file.path());

        let mut first = source.open().await.unwrap();
        first.next_row().await.unwrap();
        first.next_row().await.unwrap();
        assert_eq!(first.next_row().await.unwrap(), None);

        let mut second = source.open().await.unwrap();
        assert_eq!(
            second.next_row().await.unwrap(),
            Some(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[tokio::test]
    async fn test_invalid_utf8_row_does_not_end_pass() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"h1,g1\nh\xff,g2\nh3,g3\n").unwrap();
        file.flush().unwrap();
        let source = CsvSource::new(file.path());
        let mut reader = source.open().await.unwrap();

        assert!(reader.next_row().await.unwrap().is_some());

        let err = reader.next_row().await.unwrap_err();
        assert!(err.is_row_error());
        assert!(matches!(err, SourceError::InvalidEncoding { line: 2, .. }));

        assert_eq!(
            reader.next_row().await.unwrap(),
            Some(vec!["h3".to_string(), "g3".to_string()])
        );
        assert_eq!(reader.next_row().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvSource::new(dir.path().join("missing.csv"));

        let err = source.open().await.err().unwrap();
        assert!(matches!(err, SourceError::Open { .. }));
        assert!(err.to_string().contains("missing.csv"));
    }
}
