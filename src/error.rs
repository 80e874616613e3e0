use std::io;

use chrono::{DateTime, Utc};
use itertools::Itertools;
use mtreader_format::DecodeError;

use crate::{unit::UnitId, validate::Gap};

/// Failure reading the bytes of a single storage unit.
#[derive(Debug, thiserror::Error)]
pub enum UnitError {
    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Decode(#[from] DecodeError),
}

#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    #[error("No storage units to index")]
    EmptyIndex,

    #[error("Invalid storage unit {unit}: {reason}")]
    InvalidUnit { unit: UnitId, reason: String },

    /// Units disagree, `values` lists every distinct value in order of first
    /// appearance
    #[error("Units disagree on {field}, found {}", .values.join(" | "))]
    Consistency {
        field: ConsistencyField,
        values: Vec<String>,
    },

    #[error("Found {} gaps in the recording:\n{}", .gaps.len(), format_gaps(.gaps))]
    Gap { gaps: Vec<Gap> },

    #[error("Invalid sample range, from {from} is after to {to}")]
    InvalidRange { from: u64, to: u64 },

    #[error("Resolved {actual} samples, expected {expected}")]
    RangeMismatch { expected: u64, actual: u64 },

    #[error("No samples between {from} and {to}")]
    NoSamplesBetween {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },

    #[error("Failed reading samples {from} to {to} from {unit}, {source}")]
    Read {
        unit: UnitId,
        from: u64,
        to: u64,
        source: UnitError,
    },

    #[error("Failed scanning records of {unit}, {source}")]
    Scan { unit: UnitId, source: UnitError },

    #[error("Read of samples {from} to {to} was cancelled")]
    Cancelled { from: u64, to: u64 },

    #[error("Unknown channel {0}")]
    UnknownChannel(String),

    #[error("Cannot convert channel {channel} to field units: {reason}")]
    InvalidConversion { channel: String, reason: String },
}

/// Field compared across units by [`crate::check_consistency`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsistencyField {
    SamplingRate,
    ChannelCount,
    Channels,
}

impl std::fmt::Display for ConsistencyField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConsistencyField::SamplingRate => "sampling rate",
            ConsistencyField::ChannelCount => "channel count",
            ConsistencyField::Channels => "channels",
        };
        f.write_str(name)
    }
}

pub(crate) fn format_gaps(gaps: &[Gap]) -> String {
    gaps.iter().map(|gap| format!("  {gap}")).join("\n")
}
