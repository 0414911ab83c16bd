//! Error types shared by the calculation modules.

use thiserror::Error;

use crate::fault::FaultType;

/// Top-level error type for the crate.
#[derive(Debug, Error, PartialEq)]
pub enum FaultError {
    /// A required field of an input record is absent or blank.
    #[error("{record} record is missing required field '{field}'")]
    MissingField {
        record: &'static str,
        field: &'static str,
    },

    /// A field is present but cannot be read as a number.
    #[error("cannot parse '{value}' for field '{field}'")]
    Parse { field: &'static str, value: String },

    /// A line segment that would scale a per-unit-length impedance by a
    /// non-positive length.
    #[error("segment {index} has invalid length {length} ft")]
    InvalidSegment { index: usize, length: f64 },

    /// Winding connection outside the supported set.
    #[error("invalid transformer connection '{0}'")]
    InvalidConnection(String),

    /// Transformer nameplate values that cannot produce an impedance.
    #[error("invalid transformer: {0}")]
    InvalidTransformer(String),

    /// Ground fault requested where the network has no zero-sequence path.
    #[error("{fault} fault is not supported: {reason}")]
    UnsupportedFaultType {
        fault: FaultType,
        reason: &'static str,
    },

    /// Division by zero or a non-finite intermediate value.
    #[error("numeric domain error: {0}")]
    NumericDomain(String),

    /// Measured current supplied to the locator is not a positive magnitude.
    #[error("invalid measured fault current {0} A")]
    InvalidMeasurement(f64),

    /// Calculation options that cannot be honoured.
    #[error("invalid options: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, FaultError>;
