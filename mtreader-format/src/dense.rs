//! Channels stored as contiguous runs of fixed-width values.
//!
//! This is the layout of Metronix ATS files (one 32-bit integer channel per
//! file after a 1024 byte header) and of any source where each channel's
//! samples follow each other on disk.
use crate::{
    block::Block,
    decoder::{n_samples, ByteSpan, RecordDecoder},
    error::DecodeError,
    sample::SampleType,
};

/// Header length of a Metronix ATS file.
pub const ATS_HEADER_SIZE: u64 = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenseArrayDecoder {
    sample_type: SampleType,
    header_size: u64,
    channel_stride: Option<u64>,
}

impl DenseArrayDecoder {
    pub fn new(sample_type: SampleType, header_size: u64) -> Self {
        Self {
            sample_type,
            header_size,
            channel_stride: None,
        }
    }

    /// ATS data: 32-bit integer counts after the XML-described header.
    pub fn ats() -> Self {
        Self::new(SampleType::I32, ATS_HEADER_SIZE)
    }

    /// Byte distance between the start of consecutive channel runs.
    pub fn with_channel_stride(mut self, stride: u64) -> Self {
        self.channel_stride = Some(stride);
        self
    }

    /// Channel runs of `samples` values each, back to back.
    pub fn with_channel_samples(self, samples: u64) -> Self {
        let size = self.sample_type.size() as u64;
        self.with_channel_stride(samples * size)
    }

    pub fn sample_type(&self) -> SampleType {
        self.sample_type
    }

    pub fn header_size(&self) -> u64 {
        self.header_size
    }

    /// Number of samples held by a single channel source of `source_len`
    /// bytes.
    pub fn samples_in(&self, source_len: u64) -> Result<u64, DecodeError> {
        let size = self.sample_type.size() as u64;
        let bytes = source_len.saturating_sub(self.header_size);
        if bytes % size != 0 {
            return Err(DecodeError::NonIntegralSamples {
                bytes,
                record_size: size,
            });
        }
        Ok(bytes / size)
    }
}

impl RecordDecoder for DenseArrayDecoder {
    fn spans(&self, n_channels: usize, from: u64, to: u64) -> Result<Vec<ByteSpan>, DecodeError> {
        let stride = match (n_channels, self.channel_stride) {
            (0 | 1, stride) => stride.unwrap_or(0),
            (_, Some(stride)) => stride,
            (n_channels, None) => return Err(DecodeError::MissingStride { n_channels }),
        };
        let size = self.sample_type.size() as u64;
        let len = n_samples(from, to) * size;
        Ok((0..n_channels as u64)
            .map(|chan| ByteSpan::new(self.header_size + chan * stride + from * size, len))
            .collect())
    }

    fn parse(
        &self,
        bytes: &[u8],
        n_channels: usize,
        n_samples: usize,
    ) -> Result<Block, DecodeError> {
        let size = self.sample_type.size();
        let expected = n_channels * n_samples * size;
        let truncated = || DecodeError::Truncated {
            offset: 0,
            needed: expected as u64,
            available: bytes.len() as u64,
        };
        if bytes.len() != expected {
            return Err(truncated());
        }
        let data = bytes
            .chunks_exact(size)
            .map(|value| self.sample_type.read(value))
            .collect();
        Block::from_channel_major(n_channels, n_samples, data).ok_or_else(truncated)
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use pretty_assertions::assert_eq;

    use super::*;

    fn ats_bytes(values: &[i32]) -> Vec<u8> {
        let mut bytes = vec![0xAAu8; ATS_HEADER_SIZE as usize];
        for v in values {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn test_single_channel() -> eyre::Result<()> {
        let values: Vec<i32> = (0..20).map(|x| x * 7 - 50).collect();
        let bytes = ats_bytes(&values);
        let decoder = DenseArrayDecoder::ats();
        assert_eq!(decoder.samples_in(bytes.len() as u64)?, 20);

        let spans = decoder.spans(1, 5, 9)?;
        assert_eq!(spans, [ByteSpan::new(1024 + 5 * 4, 5 * 4)]);

        let block = decoder.decode(&bytes, 1, 5, 9)?;
        assert_eq!(block.row(0), [-15.0, -8.0, -1.0, 6.0, 13.0]);

        let read = decoder.read(&mut Cursor::new(&bytes), 1, 5, 9)?;
        assert_eq!(read, block);
        Ok(())
    }

    #[test]
    fn test_contiguous_channel_runs() -> eyre::Result<()> {
        // two channels of 4 f32 samples after a 16 byte header
        let mut bytes = vec![0u8; 16];
        for v in [1.0f32, 2.0, 3.0, 4.0, -1.0, -2.0, -3.0, -4.0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        let decoder = DenseArrayDecoder::new(SampleType::F32, 16).with_channel_samples(4);
        let block = decoder.decode(&bytes, 2, 1, 2)?;
        assert_eq!(block.row(0), [2.0, 3.0]);
        assert_eq!(block.row(1), [-2.0, -3.0]);
        Ok(())
    }

    #[test]
    fn test_missing_stride() {
        let decoder = DenseArrayDecoder::new(SampleType::I16, 0);
        assert!(matches!(
            decoder.spans(3, 0, 1),
            Err(DecodeError::MissingStride { n_channels: 3 })
        ));
    }

    #[test]
    fn test_truncated_source() {
        let bytes = ats_bytes(&[1, 2, 3]);
        let err = DenseArrayDecoder::ats().decode(&bytes, 1, 2, 3).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Truncated {
                offset: 1032,
                needed: 8,
                available: 4
            }
        ));
    }

    #[test]
    fn test_parse_wrong_length() {
        let decoder = DenseArrayDecoder::new(SampleType::I16, 0).with_channel_samples(2);
        for len in [7, 9] {
            assert!(matches!(
                decoder.parse(&vec![0u8; len], 2, 2),
                Err(DecodeError::Truncated {
                    offset: 0,
                    needed: 8,
                    ..
                })
            ));
        }
        assert_eq!(decoder.parse(&[1, 0, 2, 0, 3, 0, 4, 0], 2, 2).unwrap().row(1), [3.0, 4.0]);
    }

    #[test]
    fn test_non_integral() {
        let decoder = DenseArrayDecoder::ats();
        assert!(matches!(
            decoder.samples_in(ATS_HEADER_SIZE + 10),
            Err(DecodeError::NonIntegralSamples {
                bytes: 10,
                record_size: 4
            })
        ));
    }
}
