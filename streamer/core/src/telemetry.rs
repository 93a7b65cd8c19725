//! Telemetry Records
//!
//! Types for GPU telemetry as it moves through the pipeline.
//!
//! # Design
//!
//! A row is parsed into a [`TelemetryReading`], which carries only what the
//! source supplied: host, device and measurements. Identity and time are
//! assigned when the reading is accepted into the pipeline, producing a
//! [`Telemetry`]. Only this crate can perform that step, so a record's
//! timestamp is always its ingestion time and never a value handed in by a
//! caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Number of leading fields a row must carry
pub const MIN_FIELDS: usize = 5;

// ============================================================================
// Errors
// ============================================================================

/// Errors produced while parsing a raw row
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ParseError {
    /// The row has fewer fields than a reading needs
    #[error("expected at least {expected} fields, got {actual}")]
    FieldCount {
        /// Minimum field count
        expected: usize,
        /// Fields present in the row
        actual: usize,
    },

    /// A measurement field is not a finite decimal number
    #[error("invalid {field} value: {value:?}")]
    InvalidNumber {
        /// Name of the offending field
        field: &'static str,
        /// Raw text of the field
        value: String,
    },
}

// ============================================================================
// Reading
// ============================================================================

/// A parsed row, not yet accepted into the pipeline
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct TelemetryReading {
    /// Host the device is attached to
    pub host_id: String,
    /// Device identifier
    pub gpu_id: String,
    /// Utilization percentage
    pub utilization: f64,
    /// Memory in use
    pub memory_used: f64,
    /// Temperature
    pub temperature: f64,
}

impl TelemetryReading {
    /// Create a reading from its parts
    pub fn new(
        host_id: impl Into<String>,
        gpu_id: impl Into<String>,
        utilization: f64,
        memory_used: f64,
        temperature: f64,
    ) -> Self {
        Self {
            host_id: host_id.into(),
            gpu_id: gpu_id.into(),
            utilization,
            memory_used,
            temperature,
        }
    }

    /// Parse a row laid out as `host_id,gpu_id,utilization,memory_used,temperature`
    ///
    /// Fields past the fifth are ignored. Measurements must parse as finite
    /// `f64` values with no surrounding whitespace: `NaN`, `inf` and `-inf`
    /// are rejected, as JSON has no encoding for them.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::FieldCount`] for short rows and
    /// [`ParseError::InvalidNumber`] for any measurement that does not parse.
    pub fn from_fields<S: AsRef<str>>(fields: &[S]) -> Result<Self, ParseError> {
        if fields.len() < MIN_FIELDS {
            return Err(ParseError::FieldCount {
                expected: MIN_FIELDS,
                actual: fields.len(),
            });
        }

        Ok(Self {
            host_id: fields[0].as_ref().to_string(),
            gpu_id: fields[1].as_ref().to_string(),
            utilization: parse_measurement("utilization", fields[2].as_ref())?,
            memory_used: parse_measurement("memory_used", fields[3].as_ref())?,
            temperature: parse_measurement("temperature", fields[4].as_ref())?,
        })
    }

    /// Accept the reading with a fresh identifier and the given ingestion time
    pub(crate) fn stamp(self, timestamp: DateTime<Utc>) -> Telemetry {
        Telemetry {
            id: Uuid::new_v4(),
            host_id: self.host_id,
            gpu_id: self.gpu_id,
            utilization: self.utilization,
            memory_used: self.memory_used,
            temperature: self.temperature,
            timestamp,
        }
    }
}

fn parse_measurement(field: &'static str, raw: &str) -> Result<f64, ParseError> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ParseError::InvalidNumber {
            field,
            value: raw.to_string(),
        }),
    }
}

// ============================================================================
// Telemetry
// ============================================================================

/// A telemetry record accepted into the pipeline
///
/// Immutable once created. Records are only built by stamping a
/// [`TelemetryReading`], see [`crate::Producer`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Telemetry {
    id: Uuid,
    host_id: String,
    gpu_id: String,
    utilization: f64,
    memory_used: f64,
    temperature: f64,
    timestamp: DateTime<Utc>,
}

impl Telemetry {
    /// Unique identifier assigned at ingestion
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Host the device is attached to
    #[must_use]
    pub fn host_id(&self) -> &str {
        &self.host_id
    }

    /// Device identifier
    #[must_use]
    pub fn gpu_id(&self) -> &str {
        &self.gpu_id
    }

    /// Utilization percentage
    #[must_use]
    pub fn utilization(&self) -> f64 {
        self.utilization
    }

    /// Memory in use
    #[must_use]
    pub fn memory_used(&self) -> f64 {
        self.memory_used
    }

    /// Temperature
    #[must_use]
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Time the record was accepted into the pipeline
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The measurements in row order: utilization, memory used, temperature
    #[must_use]
    pub fn measurements(&self) -> [f64; 3] {
        [self.utilization, self.memory_used, self.temperature]
    }
}
