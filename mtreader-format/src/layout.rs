use crate::{
    block::Block,
    decoder::{ByteSpan, RecordDecoder},
    dense::DenseArrayDecoder,
    error::DecodeError,
    interleaved::InterleavedStructDecoder,
    tagged::TaggedVariableDecoder,
};

/// Byte layout of a storage unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ByteLayout {
    Dense(DenseArrayDecoder),
    Interleaved(InterleavedStructDecoder),
    Tagged(TaggedVariableDecoder),
}

impl ByteLayout {
    pub fn name(&self) -> &'static str {
        match self {
            ByteLayout::Dense(_) => "dense",
            ByteLayout::Interleaved(_) => "interleaved",
            ByteLayout::Tagged(_) => "tagged",
        }
    }

    pub fn is_dense(&self) -> bool {
        matches!(self, ByteLayout::Dense(_))
    }

    /// Number of samples the layout is known to hold, if it records one.
    pub fn sample_limit(&self) -> Option<u64> {
        match self {
            ByteLayout::Tagged(d) => d.n_scans(),
            ByteLayout::Dense(_) | ByteLayout::Interleaved(_) => None,
        }
    }
}

impl From<DenseArrayDecoder> for ByteLayout {
    fn from(value: DenseArrayDecoder) -> Self {
        ByteLayout::Dense(value)
    }
}

impl From<InterleavedStructDecoder> for ByteLayout {
    fn from(value: InterleavedStructDecoder) -> Self {
        ByteLayout::Interleaved(value)
    }
}

impl From<TaggedVariableDecoder> for ByteLayout {
    fn from(value: TaggedVariableDecoder) -> Self {
        ByteLayout::Tagged(value)
    }
}

impl RecordDecoder for ByteLayout {
    fn spans(&self, n_channels: usize, from: u64, to: u64) -> Result<Vec<ByteSpan>, DecodeError> {
        match self {
            ByteLayout::Dense(d) => d.spans(n_channels, from, to),
            ByteLayout::Interleaved(d) => d.spans(n_channels, from, to),
            ByteLayout::Tagged(d) => d.spans(n_channels, from, to),
        }
    }

    fn parse(
        &self,
        bytes: &[u8],
        n_channels: usize,
        n_samples: usize,
    ) -> Result<Block, DecodeError> {
        match self {
            ByteLayout::Dense(d) => d.parse(bytes, n_channels, n_samples),
            ByteLayout::Interleaved(d) => d.parse(bytes, n_channels, n_samples),
            ByteLayout::Tagged(d) => d.parse(bytes, n_channels, n_samples),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sample::SampleType;

    #[test]
    fn test_dispatch() -> eyre::Result<()> {
        let mut bytes = vec![0u8; 4];
        for v in [7i16, -7, 8, -8] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        let inner = InterleavedStructDecoder::new(4, SampleType::I16, 2);
        let layout = ByteLayout::from(inner.clone());
        assert_eq!(layout.name(), "interleaved");
        assert!(!layout.is_dense());
        assert_eq!(layout.sample_limit(), None);
        let tagged = ByteLayout::from(TaggedVariableDecoder::new(32).with_scans(6));
        assert_eq!(tagged.sample_limit(), Some(6));
        assert_eq!(layout.spans(2, 1, 1)?, inner.spans(2, 1, 1)?);
        assert_eq!(layout.decode(&bytes, 2, 0, 1)?, inner.decode(&bytes, 2, 0, 1)?);
        Ok(())
    }
}
