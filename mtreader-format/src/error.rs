#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    /// The source ended before all of the requested bytes could be read
    #[error("Needed {needed} bytes at byte offset {offset}, only {available} available")]
    Truncated {
        offset: u64,
        needed: u64,
        available: u64,
    },

    /// Not enough bytes left for a full 32 byte tag
    #[error("Truncated tag at byte offset {offset}")]
    TruncatedTag { offset: u64 },

    #[error("{bytes} bytes is not a whole number of {record_size} byte records")]
    NonIntegralSamples { bytes: u64, record_size: u64 },

    /// Tagged records only support packed 3 byte samples
    #[error("Unsupported sample width of {width} bytes in tag at byte offset {offset}")]
    UnsupportedSampleWidth { width: u8, offset: u64 },

    #[error("Tag at byte offset {offset} holds an invalid start time")]
    InvalidTagTime { offset: u64 },

    #[error("Sample {to} is past the end of a record of {n_scans} scans")]
    PastRecordEnd { to: u64, n_scans: u64 },

    #[error("Record holds {found} channels, expected {expected}")]
    ChannelMismatch { found: usize, expected: usize },

    #[error("Requested {requested} channels, records only hold {available}")]
    TooManyChannels { requested: usize, available: usize },

    /// Channels sharing a dense source need the byte distance between runs
    #[error("Dense layout with {n_channels} channels in one source has no channel stride")]
    MissingStride { n_channels: usize },

    #[error("Decode IO Error: {0}")]
    Io(#[from] std::io::Error),
}
