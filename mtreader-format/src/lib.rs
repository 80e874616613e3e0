//! Record layouts of magnetotelluric logger files.
//!
//! Each layout knows how to locate the bytes of a sample range inside one
//! storage unit and how to decode them into a channel-major [`Block`]:
//!
//! * [`DenseArrayDecoder`], per-channel runs of fixed-width values (ATS)
//! * [`InterleavedStructDecoder`], fixed-size multi-channel records (Lemi
//!   B423/B423E, SPAM RAW)
//! * [`TaggedVariableDecoder`], tagged records of packed 24-bit scans
//!   (Phoenix MTU-5)
mod block;
mod decoder;
mod dense;
mod error;
mod interleaved;
mod layout;
mod sample;
pub mod tagged;

pub use block::Block;
pub use decoder::{read_spans, ByteSpan, RecordDecoder};
pub use dense::{DenseArrayDecoder, ATS_HEADER_SIZE};
pub use error::DecodeError;
pub use interleaved::{InterleavedStructDecoder, LEMI_HEADER_SIZE};
pub use layout::ByteLayout;
pub use sample::SampleType;
pub use tagged::{scan_records, Tag, TaggedRecord, TaggedVariableDecoder, TAG_SIZE};
