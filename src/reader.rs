//! Reading sample ranges across the units of a [`SegmentIndex`].
use std::{
    fs::File,
    io::Cursor,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use chrono::{DateTime, Utc};
use mtreader_format::{read_spans, Block, RecordDecoder};
use rayon::prelude::*;

use crate::{
    buffer::{partition_columns, ChannelBuffer},
    error::{ReaderError, UnitError},
    index::SegmentIndex,
    resolve::{resolve, ResolvedRead},
    scale::{AffineScaler, ChannelMeta, ScaleStage},
    time,
    unit::{StorageUnit, UnitSource},
};

/// Progress of a read, published to the observer of
/// [`SegmentedReader::read_observed`]. Positions are those of the units in
/// the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    Idle,
    Resolving,
    Reading(usize),
    Decoding(usize),
    Scaling,
    Assembled,
}

/// Shared flag to stop a read between units.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadOptions {
    /// Read and decode units on the rayon thread pool.
    pub parallel: bool,
    pub stage: ScaleStage,
    /// Output only these channels, in this order.
    pub channels: Option<Vec<String>>,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn stage(mut self, stage: ScaleStage) -> Self {
        self.stage = stage;
        self
    }

    pub fn channels<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.channels = Some(channels.into_iter().map(Into::into).collect());
        self
    }
}

type Observer<'o> = &'o (dyn Fn(ReadState) + Sync);

pub struct SegmentedReader<'a> {
    index: &'a SegmentIndex,
    options: ReadOptions,
    meta: Vec<ChannelMeta>,
}

impl<'a> SegmentedReader<'a> {
    pub fn new(index: &'a SegmentIndex) -> Self {
        Self {
            index,
            options: ReadOptions::default(),
            meta: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: ReadOptions) -> Self {
        self.options = options;
        self
    }

    /// Dipole lengths and gains used to reach [`ScaleStage::FieldUnits`].
    pub fn with_channel_meta(mut self, meta: Vec<ChannelMeta>) -> Self {
        self.meta = meta;
        self
    }

    pub fn index(&self) -> &SegmentIndex {
        self.index
    }

    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    /// Read global samples `from..=to`.
    pub fn read(&self, from: u64, to: u64) -> Result<ChannelBuffer, ReaderError> {
        self.read_with(from, to, &CancelToken::default())
    }

    pub fn read_with(
        &self,
        from: u64,
        to: u64,
        cancel: &CancelToken,
    ) -> Result<ChannelBuffer, ReaderError> {
        self.read_observed(from, to, cancel, &|_| {})
    }

    /// Read every sample of the recording.
    pub fn read_all(&self) -> Result<ChannelBuffer, ReaderError> {
        self.read(0, self.index.last_sample())
    }

    /// Read the samples between two instants, inclusive.
    pub fn read_time(
        &self,
        from_time: DateTime<Utc>,
        to_time: DateTime<Utc>,
    ) -> Result<ChannelBuffer, ReaderError> {
        let no_samples = || ReaderError::NoSamplesBetween {
            from: from_time,
            to: to_time,
        };
        let from = self.index.sample_at(from_time).ok_or_else(no_samples)?;
        let to = self.index.sample_before(to_time).ok_or_else(no_samples)?;
        if from > to {
            return Err(no_samples());
        }
        self.read(from, to)
    }

    /// Read global samples `from..=to`, publishing each state the read goes
    /// through to `observer`.
    ///
    /// Nothing is returned unless every unit was read, a failure or a
    /// cancellation drops the samples read so far.
    pub fn read_observed(
        &self,
        from: u64,
        to: u64,
        cancel: &CancelToken,
        observer: Observer<'_>,
    ) -> Result<ChannelBuffer, ReaderError> {
        let publish = |state: ReadState| {
            log::trace!("Samples {from} to {to}: {state:?}");
            observer(state);
        };
        publish(ReadState::Idle);
        publish(ReadState::Resolving);
        let reads = resolve(self.index, from, to)?;
        let channels = self.output_channels()?;

        let mut data = Block::zeros(channels.len(), (to - from + 1) as usize);
        let request = Request {
            from,
            to,
            channels: &channels,
            cancel,
            publish: &publish,
        };
        if self.options.parallel && reads.len() > 1 {
            self.read_parallel(&reads, &request, &mut data)?;
        } else {
            self.read_sequential(&reads, &request, &mut data)?;
        }

        publish(ReadState::Scaling);
        let (first_time, last_time) = self.time_span(&reads);
        let mut buffer = ChannelBuffer::new(self.index.fs(), first_time, last_time, channels, data);
        self.scale(&mut buffer, &reads)?;

        publish(ReadState::Assembled);
        log::info!(
            "Read {} channels of samples {from} to {to} from {} units",
            buffer.n_channels(),
            reads.len()
        );
        Ok(buffer)
    }

    fn output_channels(&self) -> Result<Vec<String>, ReaderError> {
        let available = self.index.channels();
        match &self.options.channels {
            None => Ok(available.to_vec()),
            Some(requested) => {
                if let Some(unknown) = requested.iter().find(|c| !available.contains(c)) {
                    return Err(ReaderError::UnknownChannel(unknown.clone()));
                }
                Ok(requested.clone())
            }
        }
    }

    fn read_sequential(
        &self,
        reads: &[ResolvedRead],
        request: &Request<'_>,
        data: &mut Block,
    ) -> Result<(), ReaderError> {
        let mut cursor = 0usize;
        for read in reads {
            request.check_cancelled()?;
            let block = self.decode_unit(read, request)?;
            let n = read.n_samples as usize;
            for (chan, row) in block.rows().enumerate() {
                data.row_mut(chan)[cursor..cursor + n].copy_from_slice(row);
            }
            cursor += n;
        }
        Ok(())
    }

    fn read_parallel(
        &self,
        reads: &[ResolvedRead],
        request: &Request<'_>,
        data: &mut Block,
    ) -> Result<(), ReaderError> {
        let widths: Vec<usize> = reads.iter().map(|r| r.n_samples as usize).collect();
        let parts = partition_columns(data, &widths);
        reads
            .par_iter()
            .zip(parts)
            .try_for_each(|(read, columns)| {
                request.check_cancelled()?;
                let block = self.decode_unit(read, request)?;
                for (dst, src) in columns.into_iter().zip(block.rows()) {
                    dst.copy_from_slice(src);
                }
                Ok(())
            })
    }

    /// Read and decode the samples of one unit, keeping the requested
    /// channels.
    fn decode_unit(&self, read: &ResolvedRead, request: &Request<'_>) -> Result<Block, ReaderError> {
        let unit = &self.index.units()[read.position];
        let selection = request
            .channels
            .iter()
            .map(|name| {
                unit.channel_position(name)
                    .ok_or_else(|| ReaderError::UnknownChannel(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let failed = |source: UnitError| ReaderError::Read {
            unit: read.unit_id.clone(),
            from: request.from,
            to: request.to,
            source,
        };

        (request.publish)(ReadState::Reading(read.position));
        let bytes = read_unit_bytes(unit, read.read_from, read.read_to).map_err(failed)?;

        (request.publish)(ReadState::Decoding(read.position));
        let block = unit
            .byte_layout()
            .parse(&bytes, unit.n_channels(), read.n_samples as usize)
            .map_err(|e| failed(e.into()))?;
        log::debug!(
            "Decoded samples {} to {} of {} ({} layout)",
            read.read_from,
            read.read_to,
            read.unit_id,
            unit.byte_layout().name()
        );
        Ok(block.select(&selection))
    }

    fn time_span(&self, reads: &[ResolvedRead]) -> (DateTime<Utc>, DateTime<Utc>) {
        let time_of = |read: &ResolvedRead, local: u64| {
            let unit = &self.index.units()[read.position];
            time::offset_time(unit.first_time(), local, unit.fs())
        };
        match (reads.first(), reads.last()) {
            (Some(first), Some(last)) => (time_of(first, first.read_from), time_of(last, last.read_to)),
            _ => (self.index.first_time(), self.index.first_time()),
        }
    }

    fn scale(&self, buffer: &mut ChannelBuffer, reads: &[ResolvedRead]) -> Result<(), ReaderError> {
        let stage = self.options.stage;
        if stage == ScaleStage::Raw {
            return Ok(());
        }
        let mut cursor = 0usize;
        for read in reads {
            let unit = &self.index.units()[read.position];
            let columns = cursor..cursor + read.n_samples as usize;
            for chan in 0..buffer.n_channels() {
                let scaling = unit
                    .channel_position(&buffer.channels()[chan])
                    .and_then(|src| read.channel_scalings.get(src))
                    .copied()
                    .unwrap_or_default();
                AffineScaler::scale_row(&mut buffer.row_mut(chan)[columns.clone()], &scaling);
            }
            cursor = columns.end;
        }
        buffer.set_stage(ScaleStage::Affine);

        if stage == ScaleStage::FieldUnits {
            AffineScaler::convert_units(buffer, &self.meta)?;
            buffer.set_stage(ScaleStage::FieldUnits);
        }
        Ok(())
    }
}

/// The parts of a read shared by every unit.
struct Request<'r> {
    from: u64,
    to: u64,
    channels: &'r [String],
    cancel: &'r CancelToken,
    publish: Observer<'r>,
}

impl Request<'_> {
    fn check_cancelled(&self) -> Result<(), ReaderError> {
        if self.cancel.is_cancelled() {
            log::info!("Read of samples {} to {} cancelled", self.from, self.to);
            return Err(ReaderError::Cancelled {
                from: self.from,
                to: self.to,
            });
        }
        Ok(())
    }
}

/// Bytes of unit-local samples `from..=to` for every channel of `unit`.
///
/// Files are opened here and closed before returning.
fn read_unit_bytes(unit: &StorageUnit, from: u64, to: u64) -> Result<Vec<u8>, UnitError> {
    let layout = unit.byte_layout();
    match unit.source() {
        UnitSource::File(path) => {
            let spans = layout.spans(unit.n_channels(), from, to)?;
            let mut file = File::open(path)?;
            Ok(read_spans(&mut file, &spans)?)
        }
        UnitSource::PerChannel(paths) => {
            let spans = layout.spans(1, from, to)?;
            let mut bytes = Vec::new();
            for path in paths {
                let mut file = File::open(path)?;
                bytes.extend(read_spans(&mut file, &spans)?);
            }
            Ok(bytes)
        }
        UnitSource::Bytes(source) => {
            let spans = layout.spans(unit.n_channels(), from, to)?;
            Ok(read_spans(&mut Cursor::new(&source[..]), &spans)?)
        }
    }
}
