//! Fixed-size records holding one instant of every channel.
//!
//! A record is `leading` fields, then `channel_fields` values of one type, then
//! `trailing` fields. Lemi B423 loggers write records of a `u32` second
//! counter and a `u16` sample index, five `i32` channels and two `i16`
//! status words. SPAM RAW files are bare interleaved `f32` scans.
use crate::{
    block::Block,
    decoder::{n_samples, ByteSpan, RecordDecoder},
    error::DecodeError,
    sample::{fields_size, SampleType},
};

/// Header length of Lemi B423 and B423E files.
pub const LEMI_HEADER_SIZE: u64 = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterleavedStructDecoder {
    header_size: u64,
    leading: Vec<SampleType>,
    channel_type: SampleType,
    channel_fields: usize,
    trailing: Vec<SampleType>,
}

impl InterleavedStructDecoder {
    pub fn new(header_size: u64, channel_type: SampleType, channel_fields: usize) -> Self {
        Self {
            header_size,
            leading: Vec::new(),
            channel_type,
            channel_fields,
            trailing: Vec::new(),
        }
    }

    pub fn with_leading(mut self, fields: Vec<SampleType>) -> Self {
        self.leading = fields;
        self
    }

    pub fn with_trailing(mut self, fields: Vec<SampleType>) -> Self {
        self.trailing = fields;
        self
    }

    /// Lemi B423 magnetotelluric records: Hx, Hy, Hz, Ex, Ey.
    pub fn lemi_b423() -> Self {
        Self::new(LEMI_HEADER_SIZE, SampleType::I32, 5)
            .with_leading(vec![SampleType::U32, SampleType::U16])
            .with_trailing(vec![SampleType::I16, SampleType::I16])
    }

    /// Lemi B423E telluric records: E1 to E4.
    pub fn lemi_b423e() -> Self {
        Self::new(LEMI_HEADER_SIZE, SampleType::I32, 4)
            .with_leading(vec![SampleType::U32, SampleType::U16])
            .with_trailing(vec![SampleType::I16, SampleType::I16])
    }

    /// SPAM RAW scans of `recorded_channels` floats after `header_size` bytes.
    pub fn spam_raw(header_size: u64, recorded_channels: usize) -> Self {
        Self::new(header_size, SampleType::F32, recorded_channels)
    }

    pub fn header_size(&self) -> u64 {
        self.header_size
    }

    pub fn channel_fields(&self) -> usize {
        self.channel_fields
    }

    /// Size of one record in bytes.
    pub fn record_size(&self) -> usize {
        fields_size(&self.leading)
            + self.channel_type.size() * self.channel_fields
            + fields_size(&self.trailing)
    }

    /// Number of records in a source of `source_len` bytes.
    pub fn records_in(&self, source_len: u64) -> Result<u64, DecodeError> {
        let record_size = self.record_size() as u64;
        let bytes = source_len.saturating_sub(self.header_size);
        if bytes % record_size != 0 {
            return Err(DecodeError::NonIntegralSamples { bytes, record_size });
        }
        Ok(bytes / record_size)
    }

    fn check_channels(&self, n_channels: usize) -> Result<(), DecodeError> {
        if n_channels > self.channel_fields {
            return Err(DecodeError::TooManyChannels {
                requested: n_channels,
                available: self.channel_fields,
            });
        }
        Ok(())
    }
}

impl RecordDecoder for InterleavedStructDecoder {
    fn spans(&self, n_channels: usize, from: u64, to: u64) -> Result<Vec<ByteSpan>, DecodeError> {
        self.check_channels(n_channels)?;
        let record_size = self.record_size() as u64;
        Ok(vec![ByteSpan::new(
            self.header_size + from * record_size,
            n_samples(from, to) * record_size,
        )])
    }

    fn parse(
        &self,
        bytes: &[u8],
        n_channels: usize,
        n_samples: usize,
    ) -> Result<Block, DecodeError> {
        self.check_channels(n_channels)?;
        let record_size = self.record_size();
        if bytes.len() % record_size != 0 {
            return Err(DecodeError::NonIntegralSamples {
                bytes: bytes.len() as u64,
                record_size: record_size as u64,
            });
        }
        if bytes.len() / record_size != n_samples {
            return Err(DecodeError::Truncated {
                offset: 0,
                needed: (n_samples * record_size) as u64,
                available: bytes.len() as u64,
            });
        }

        let base = fields_size(&self.leading);
        let width = self.channel_type.size();
        let mut block = Block::zeros(n_channels, n_samples);
        for chan in 0..n_channels {
            let start = base + chan * width;
            let row = block.row_mut(chan);
            for (value, record) in row.iter_mut().zip(bytes.chunks_exact(record_size)) {
                *value = self.channel_type.read(&record[start..start + width]);
            }
        }
        Ok(block)
    }
}
