//! Reading continuous magnetotelluric recordings split across files and
//! in-file records.
//!
//! A recording is described by a list of [`StorageUnit`]s, each naming where
//! its bytes live, how they are laid out and how its channels are
//! calibrated. [`SegmentIndex::build`] orders the units and numbers their
//! samples, [`validate`] checks the units form one gap-free recording, and
//! [`SegmentedReader`] reads any range of samples into a [`ChannelBuffer`],
//! touching only the bytes that hold them.
pub use chrono;
pub use mtreader_format;

mod buffer;
mod error;
mod index;
mod reader;
mod records;
mod resolve;
mod scale;
pub mod time;
mod unit;
mod validate;

pub use buffer::ChannelBuffer;
pub use error::{ConsistencyField, ReaderError, UnitError};
pub use index::{SampleSpan, SegmentIndex};
pub use reader::{CancelToken, ReadOptions, ReadState, SegmentedReader};
pub use records::{open_tagged, tagged_record_units};
pub use resolve::{resolve, ResolvedRead};
pub use scale::{AffineScaler, ChannelKind, ChannelMeta, ScaleStage};
pub use unit::{ChannelScaling, StorageUnit, StorageUnitBuilder, UnitId, UnitSource};
pub use validate::{check_consistency, check_continuity, validate, Gap};

#[cfg(doctest)]
doc_comment::doctest!("../README.md", readme);
