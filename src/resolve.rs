use crate::{
    error::ReaderError,
    index::SegmentIndex,
    unit::{ChannelScaling, UnitId},
};

/// The part of one unit contributing to a read.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRead {
    /// Position of the unit in its [`SegmentIndex`].
    pub position: usize,
    pub unit_id: UnitId,
    /// First unit-local sample, inclusive.
    pub read_from: u64,
    /// Last unit-local sample, inclusive.
    pub read_to: u64,
    pub n_samples: u64,
    pub channel_scalings: Vec<ChannelScaling>,
}

/// Map global samples `from..=to` onto the units holding them, in time
/// order, clipped to each unit.
///
/// The resolved sample counts always add up to the request, a request past
/// the end of the recording is a [`ReaderError::RangeMismatch`].
pub fn resolve(index: &SegmentIndex, from: u64, to: u64) -> Result<Vec<ResolvedRead>, ReaderError> {
    if from > to {
        return Err(ReaderError::InvalidRange { from, to });
    }
    let last = index.last_sample();
    if to > last {
        return Err(ReaderError::RangeMismatch {
            expected: (to - from).saturating_add(1),
            actual: last.checked_sub(from).map_or(0, |n| n + 1),
        });
    }
    let spans = index.spans();
    let start = spans.partition_point(|span| span.last_sample < from);
    let reads: Vec<ResolvedRead> = index
        .iter()
        .enumerate()
        .skip(start)
        .take_while(|(_, (_, span))| span.first_sample <= to)
        .map(|(position, (unit, span))| {
            let read_from = from.saturating_sub(span.first_sample);
            let read_to = (unit.sample_count() - 1).min(to - span.first_sample);
            ResolvedRead {
                position,
                unit_id: unit.unit_id().clone(),
                read_from,
                read_to,
                n_samples: read_to - read_from + 1,
                channel_scalings: unit.channel_scalings().to_vec(),
            }
        })
        .collect();

    let expected = to - from + 1;
    let actual: u64 = reads.iter().map(|r| r.n_samples).sum();
    if actual != expected {
        return Err(ReaderError::RangeMismatch { expected, actual });
    }
    log::trace!("Resolved samples {from} to {to} onto {} units", reads.len());
    Ok(reads)
}
