//! In-Memory Source

use std::sync::Arc;

use async_trait::async_trait;

use super::{RawRow, RecordSource, RowReader, SourceError};

/// A fixed list of rows, replayed from the start on every open
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    rows: Arc<[RawRow]>,
}

impl MemorySource {
    /// Create a source from rows of anything string-like
    pub fn new<R, S>(rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rows: Vec<RawRow> = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();
        Self { rows: rows.into() }
    }

    /// Number of rows, header included
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the source has no rows at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl RecordSource for MemorySource {
    type Reader = MemoryReader;

    async fn open(&self) -> Result<MemoryReader, SourceError> {
        Ok(MemoryReader {
            rows: Arc::clone(&self.rows),
            next: 0,
        })
    }

    fn location(&self) -> String {
        format!("memory ({} rows)", self.rows.len())
    }
}

/// Cursor over one pass of a [`MemorySource`]
pub struct MemoryReader {
    rows: Arc<[RawRow]>,
    next: usize,
}

#[async_trait]
impl RowReader for MemoryReader {
    async fn next_row(&mut self) -> Result<Option<RawRow>, SourceError> {
        let row = self.rows.get(self.next).cloned();
        if row.is_some() {
            self.next += 1;
        }
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_source_replays() {
        let source = MemorySource::new([["a", "b"], ["c", "d"]]);
        assert_eq!(source.len(), 2);

        for _ in 0..2 {
            let mut reader = source.open().await.unwrap();
            assert_eq!(
                reader.next_row().await.unwrap(),
                Some(vec!["a".to_string(), "b".to_string()])
            );
            assert!(reader.next_row().await.unwrap().is_some());
            assert!(reader.next_row().await.unwrap().is_none());
        }
    }
}
