//! Record Sources
//!
//! Row-oriented, re-openable data sources feeding the streamer. Each call to
//! [`RecordSource::open`] starts a fresh pass from the first row; the streamer
//! reopens the source whenever it loops.
//!
//! Two implementations ship with the crate:
//!
//! - [`CsvSource`]: a flat comma-separated file on disk
//! - [`MemorySource`]: a fixed list of rows, for tests and embedding

mod csv;
mod memory;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

pub use self::csv::{split_fields, CsvReader, CsvSource};
pub use self::memory::{MemoryReader, MemorySource};

/// One row of raw string fields
pub type RawRow = Vec<String>;

/// Errors raised by a source
///
/// `Open` and `Read` abort a streaming run. `InvalidEncoding` concerns a
/// single row; the reader stays usable and the streamer skips that row.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source could not be opened for a pass
    #[error("failed to open source {}: {source}", location.display())]
    Open {
        /// Where the source lives
        location: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Reading the next row failed mid-pass
    #[error("failed to read source {}: {source}", location.display())]
    Read {
        /// Where the source lives
        location: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// One row is not valid UTF-8
    #[error("row {line} of {} is not valid UTF-8", location.display())]
    InvalidEncoding {
        /// Where the source lives
        location: PathBuf,
        /// 1-based line number of the row
        line: u64,
    },
}

impl SourceError {
    /// Whether the error is confined to one row and the pass can continue
    #[must_use]
    pub fn is_row_error(&self) -> bool {
        matches!(self, Self::InvalidEncoding { .. })
    }
}

/// A sequential source that can be traversed any number of times
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Reader type for a single pass
    type Reader: RowReader;

    /// Open the source positioned at its first row
    async fn open(&self) -> Result<Self::Reader, SourceError>;

    /// Human-readable location, used in logs
    fn location(&self) -> String;
}

/// A cursor over the rows of one pass
#[async_trait]
pub trait RowReader: Send {
    /// Next row, or `Ok(None)` at end of source
    async fn next_row(&mut self) -> Result<Option<RawRow>, SourceError>;
}
