//! The contract shared by every record layout.
//!
//! Decoding is split in two steps so that callers only ever touch the bytes
//! they need: [`RecordDecoder::spans`] says which byte ranges of a storage
//! unit hold a sample range, and [`RecordDecoder::parse`] turns those bytes,
//! concatenated in span order, into a channel-major [`Block`].
use std::io::{Read, Seek, SeekFrom};

use crate::{block::Block, error::DecodeError};

/// A contiguous range of bytes, relative to the start of a unit's source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteSpan {
    pub offset: u64,
    pub len: u64,
}

impl ByteSpan {
    pub const fn new(offset: u64, len: u64) -> Self {
        Self { offset, len }
    }

    pub const fn end(&self) -> u64 {
        self.offset + self.len
    }

    fn check(&self, source_len: u64) -> Result<(), DecodeError> {
        if self.end() > source_len {
            return Err(DecodeError::Truncated {
                offset: self.offset,
                needed: self.len,
                available: source_len.saturating_sub(self.offset),
            });
        }
        Ok(())
    }
}

/// Number of samples in the inclusive range `from..=to`.
pub(crate) fn n_samples(from: u64, to: u64) -> u64 {
    to.checked_sub(from).map_or(0, |n| n.saturating_add(1))
}

pub trait RecordDecoder {
    /// Byte ranges holding samples `from..=to` (unit-local, inclusive) of
    /// `n_channels` channels.
    fn spans(&self, n_channels: usize, from: u64, to: u64) -> Result<Vec<ByteSpan>, DecodeError>;

    /// Decode the bytes of [`RecordDecoder::spans`], concatenated in order.
    fn parse(&self, bytes: &[u8], n_channels: usize, n_samples: usize)
        -> Result<Block, DecodeError>;

    /// Decode samples `from..=to` out of the complete bytes of a unit.
    fn decode(
        &self,
        bytes: &[u8],
        n_channels: usize,
        from: u64,
        to: u64,
    ) -> Result<Block, DecodeError> {
        let spans = self.spans(n_channels, from, to)?;
        let mut buf = Vec::with_capacity(spans.iter().map(|s| s.len as usize).sum());
        for span in spans {
            span.check(bytes.len() as u64)?;
            buf.extend_from_slice(&bytes[span.offset as usize..span.end() as usize]);
        }
        self.parse(&buf, n_channels, n_samples(from, to) as usize)
    }

    /// Decode samples `from..=to` by seeking to and reading only the bytes
    /// that hold them.
    fn read<R>(
        &self,
        reader: &mut R,
        n_channels: usize,
        from: u64,
        to: u64,
    ) -> Result<Block, DecodeError>
    where
        R: Read + Seek,
    {
        let spans = self.spans(n_channels, from, to)?;
        let bytes = read_spans(reader, &spans)?;
        self.parse(&bytes, n_channels, n_samples(from, to) as usize)
    }
}

/// Read the bytes of each span, in order, into one buffer.
pub fn read_spans<R>(reader: &mut R, spans: &[ByteSpan]) -> Result<Vec<u8>, DecodeError>
where
    R: Read + Seek,
{
    let source_len = reader.seek(SeekFrom::End(0))?;
    let mut buf = Vec::with_capacity(spans.iter().map(|s| s.len as usize).sum());
    for span in spans {
        span.check(source_len)?;
        let start = buf.len();
        buf.resize(start + span.len as usize, 0u8);
        reader.seek(SeekFrom::Start(span.offset))?;
        reader.read_exact(&mut buf[start..])?;
    }
    Ok(buf)
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_read_spans() -> eyre::Result<()> {
        let mut source = Cursor::new((0u8..16).collect::<Vec<_>>());
        let bytes = read_spans(&mut source, &[ByteSpan::new(2, 3), ByteSpan::new(12, 4)])?;
        assert_eq!(bytes, [2, 3, 4, 12, 13, 14, 15]);
        Ok(())
    }

    #[test]
    fn test_read_spans_truncated() {
        let mut source = Cursor::new(vec![0u8; 10]);
        let err = read_spans(&mut source, &[ByteSpan::new(8, 4)]).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Truncated {
                offset: 8,
                needed: 4,
                available: 2
            }
        ));
    }

    #[test]
    fn test_n_samples() {
        assert_eq!(n_samples(0, 0), 1);
        assert_eq!(n_samples(5, 9), 5);
        assert_eq!(n_samples(3, 2), 0);
        assert_eq!(n_samples(0, u64::MAX), u64::MAX);
        assert_eq!(n_samples(u64::MAX, u64::MAX), 1);
    }
}
