//! Storage units, the files or in-file records holding one contiguous slice
//! of a recording.
use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use mtreader_format::ByteLayout;

use crate::{error::ReaderError, time};

/// Display handle of a unit, a name and an optional record in that file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnitId {
    name: String,
    record: Option<usize>,
}

impl UnitId {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            record: None,
        }
    }

    pub fn with_record<S: Into<String>>(name: S, record: usize) -> Self {
        Self {
            name: name.into(),
            record: Some(record),
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        Self::new(path.as_ref().display().to_string())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn record(&self) -> Option<usize> {
        self.record
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.record {
            Some(record) => write!(f, "{}[{record}]", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Where the bytes of a unit live.
#[derive(Debug, Clone)]
pub enum UnitSource {
    File(PathBuf),
    /// One file per channel, in channel order.
    PerChannel(Vec<PathBuf>),
    Bytes(Arc<[u8]>),
}

impl UnitSource {
    pub fn bytes<B: Into<Vec<u8>>>(bytes: B) -> Self {
        UnitSource::Bytes(Arc::from(bytes.into()))
    }
}

/// Linear calibration `value * multiplier + offset` of one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelScaling {
    pub multiplier: f64,
    pub offset: f64,
}

impl ChannelScaling {
    pub const IDENTITY: ChannelScaling = ChannelScaling {
        multiplier: 1.0,
        offset: 0.0,
    };

    pub const fn new(multiplier: f64, offset: f64) -> Self {
        Self { multiplier, offset }
    }

    #[inline]
    pub fn apply(&self, value: f64) -> f64 {
        value * self.multiplier + self.offset
    }
}

impl Default for ChannelScaling {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone)]
pub struct StorageUnit {
    unit_id: UnitId,
    source: UnitSource,
    fs: f64,
    channels: Vec<String>,
    sample_count: u64,
    first_time: DateTime<Utc>,
    last_time: DateTime<Utc>,
    byte_layout: ByteLayout,
    channel_scalings: Vec<ChannelScaling>,
}

impl StorageUnit {
    pub fn builder(unit_id: UnitId, source: UnitSource, byte_layout: ByteLayout) -> StorageUnitBuilder {
        StorageUnitBuilder {
            unit_id,
            source,
            byte_layout,
            fs: None,
            channels: Vec::new(),
            sample_count: None,
            first_time: None,
            last_time: None,
            channel_scalings: None,
        }
    }

    pub fn unit_id(&self) -> &UnitId {
        &self.unit_id
    }

    pub fn source(&self) -> &UnitSource {
        &self.source
    }

    pub fn fs(&self) -> f64 {
        self.fs
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    pub fn n_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    pub fn first_time(&self) -> DateTime<Utc> {
        self.first_time
    }

    /// Time of the last sample.
    pub fn last_time(&self) -> DateTime<Utc> {
        self.last_time
    }

    pub fn byte_layout(&self) -> &ByteLayout {
        &self.byte_layout
    }

    pub fn channel_scalings(&self) -> &[ChannelScaling] {
        &self.channel_scalings
    }

    pub fn channel_position(&self, name: &str) -> Option<usize> {
        self.channels.iter().position(|c| c == name)
    }
}

/// Collects and checks the description of a [`StorageUnit`].
///
/// The last time may be left out, it is then derived from the first time,
/// the sampling rate and the sample count. Scalings default to the
/// identity.
#[derive(Debug, Clone)]
pub struct StorageUnitBuilder {
    unit_id: UnitId,
    source: UnitSource,
    byte_layout: ByteLayout,
    fs: Option<f64>,
    channels: Vec<String>,
    sample_count: Option<u64>,
    first_time: Option<DateTime<Utc>>,
    last_time: Option<DateTime<Utc>>,
    channel_scalings: Option<Vec<ChannelScaling>>,
}

impl StorageUnitBuilder {
    pub fn fs(mut self, fs: f64) -> Self {
        self.fs = Some(fs);
        self
    }

    pub fn channels<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.channels = channels.into_iter().map(Into::into).collect();
        self
    }

    pub fn sample_count(mut self, sample_count: u64) -> Self {
        self.sample_count = Some(sample_count);
        self
    }

    pub fn first_time(mut self, first_time: DateTime<Utc>) -> Self {
        self.first_time = Some(first_time);
        self
    }

    pub fn last_time(mut self, last_time: DateTime<Utc>) -> Self {
        self.last_time = Some(last_time);
        self
    }

    pub fn channel_scalings(mut self, scalings: Vec<ChannelScaling>) -> Self {
        self.channel_scalings = Some(scalings);
        self
    }

    fn invalid<S: Into<String>>(&self, reason: S) -> ReaderError {
        ReaderError::InvalidUnit {
            unit: self.unit_id.clone(),
            reason: reason.into(),
        }
    }

    pub fn build(self) -> Result<StorageUnit, ReaderError> {
        let fs = self.fs.ok_or_else(|| self.invalid("missing sampling rate"))?;
        if !fs.is_finite() || fs <= 0.0 {
            return Err(self.invalid(format!("sampling rate {fs} is not positive")));
        }
        if self.channels.is_empty() {
            return Err(self.invalid("no channels"));
        }
        let sample_count = self
            .sample_count
            .ok_or_else(|| self.invalid("missing sample count"))?;
        let first_time = self
            .first_time
            .ok_or_else(|| self.invalid("missing first time"))?;
        let last_time = match self.last_time {
            Some(last_time) => last_time,
            None if sample_count > 0 => time::offset_time(first_time, sample_count - 1, fs),
            None => return Err(self.invalid("cannot derive last time of an empty unit")),
        };

        let expected = time::sample_count(first_time, last_time, fs);
        if expected != sample_count as i64 {
            return Err(self.invalid(format!(
                "{sample_count} samples, but {first_time} to {last_time} at {fs} Hz holds {expected}"
            )));
        }

        if let Some(limit) = self.byte_layout.sample_limit() {
            if sample_count > limit {
                return Err(self.invalid(format!(
                    "{sample_count} samples, but the {} layout holds {limit}",
                    self.byte_layout.name()
                )));
            }
        }

        let n_channels = self.channels.len();
        let channel_scalings = match &self.channel_scalings {
            Some(scalings) if scalings.len() != n_channels => {
                return Err(self.invalid(format!(
                    "{} scalings for {n_channels} channels",
                    scalings.len()
                )))
            }
            Some(scalings) => scalings.clone(),
            None => vec![ChannelScaling::IDENTITY; n_channels],
        };

        if let UnitSource::PerChannel(paths) = &self.source {
            if paths.len() != n_channels {
                return Err(self.invalid(format!(
                    "{} channel files for {n_channels} channels",
                    paths.len()
                )));
            }
            if !self.byte_layout.is_dense() {
                return Err(self.invalid(format!(
                    "channel files need a dense layout, not {}",
                    self.byte_layout.name()
                )));
            }
        }

        Ok(StorageUnit {
            unit_id: self.unit_id,
            source: self.source,
            fs,
            channels: self.channels,
            sample_count,
            first_time,
            last_time,
            byte_layout: self.byte_layout,
            channel_scalings,
        })
    }
}
