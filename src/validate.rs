//! Pre-flight checks on a [`SegmentIndex`].
//!
//! Nothing here repairs an index, every divergence is reported and left to
//! the caller.
use std::fmt;

use chrono::Duration;
use itertools::Itertools;

use crate::{
    error::{format_gaps, ConsistencyField, ReaderError},
    index::SegmentIndex,
    time,
    unit::UnitId,
};

/// Missing time between two adjacent units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gap {
    pub unit_before: UnitId,
    pub unit_after: UnitId,
    pub duration: Duration,
}

impl fmt::Display for Gap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}: {} s",
            self.unit_before,
            self.unit_after,
            time::as_secs_f64(self.duration)
        )
    }
}

fn distinct<I, T>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = T>,
    T: fmt::Display,
{
    values.into_iter().map(|v| v.to_string()).unique().collect()
}

/// Check that every unit shares one sampling rate, one channel count and
/// one ordered list of channels.
pub fn check_consistency(index: &SegmentIndex) -> Result<(), ReaderError> {
    let checks = [
        (
            ConsistencyField::SamplingRate,
            distinct(index.units().iter().map(|u| u.fs())),
        ),
        (
            ConsistencyField::ChannelCount,
            distinct(index.units().iter().map(|u| u.n_channels())),
        ),
        (
            ConsistencyField::Channels,
            distinct(index.units().iter().map(|u| u.channels().join(", "))),
        ),
    ];
    for (field, values) in checks {
        if values.len() > 1 {
            log::error!("Units disagree on {field}: {values:?}");
            return Err(ReaderError::Consistency { field, values });
        }
    }
    Ok(())
}

/// Check that each unit starts one sample period after the previous one
/// ends, reporting every gap found.
pub fn check_continuity(index: &SegmentIndex) -> Result<(), ReaderError> {
    let period = time::sample_period(index.fs());
    let tolerance = time::time_tolerance(index.fs());
    let mut gaps = Vec::new();
    for (before, after) in index.units().iter().tuple_windows() {
        let gap = after.first_time() - before.last_time() - period;
        if gap > tolerance {
            gaps.push(Gap {
                unit_before: before.unit_id().clone(),
                unit_after: after.unit_id().clone(),
                duration: gap,
            });
        } else if gap < -tolerance {
            log::warn!(
                "{} overlaps {} by {} s",
                after.unit_id(),
                before.unit_id(),
                -time::as_secs_f64(gap)
            );
        }
    }
    if gaps.is_empty() {
        return Ok(());
    }
    log::error!("Found {} gaps in the recording:\n{}", gaps.len(), format_gaps(&gaps));
    Err(ReaderError::Gap { gaps })
}

/// [`check_consistency`] then [`check_continuity`].
pub fn validate(index: &SegmentIndex) -> Result<(), ReaderError> {
    check_consistency(index)?;
    check_continuity(index)
}
