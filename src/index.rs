use chrono::{DateTime, Utc};

use crate::{
    error::ReaderError,
    resolve::{resolve, ResolvedRead},
    time,
    unit::StorageUnit,
};

/// Inclusive range of global samples held by one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleSpan {
    pub first_sample: u64,
    pub last_sample: u64,
}

impl SampleSpan {
    pub fn n_samples(&self) -> u64 {
        self.last_sample - self.first_sample + 1
    }

    pub fn contains(&self, sample: u64) -> bool {
        (self.first_sample..=self.last_sample).contains(&sample)
    }
}

/// The units of one recording, in time order, with the span of global
/// samples each one holds.
#[derive(Debug, Clone)]
pub struct SegmentIndex {
    units: Vec<StorageUnit>,
    spans: Vec<SampleSpan>,
}

impl SegmentIndex {
    /// Sort the units by first time, ties keeping their input order, and
    /// number their samples.
    pub fn build(mut units: Vec<StorageUnit>) -> Result<Self, ReaderError> {
        if units.is_empty() {
            return Err(ReaderError::EmptyIndex);
        }
        units.sort_by_key(StorageUnit::first_time);

        let mut next = 0u64;
        let spans = units
            .iter()
            .map(|unit| {
                let span = SampleSpan {
                    first_sample: next,
                    last_sample: next + unit.sample_count() - 1,
                };
                next += unit.sample_count();
                span
            })
            .collect();
        log::debug!("Indexed {} units holding {next} samples", units.len());
        Ok(Self { units, spans })
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn units(&self) -> &[StorageUnit] {
        &self.units
    }

    pub fn unit(&self, position: usize) -> Option<&StorageUnit> {
        self.units.get(position)
    }

    pub fn spans(&self) -> &[SampleSpan] {
        &self.spans
    }

    pub fn span(&self, position: usize) -> Option<SampleSpan> {
        self.spans.get(position).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StorageUnit, SampleSpan)> {
        self.units.iter().zip(self.spans.iter().copied())
    }

    fn first(&self) -> &StorageUnit {
        &self.units[0]
    }

    fn last(&self) -> &StorageUnit {
        &self.units[self.units.len() - 1]
    }

    pub fn n_samples(&self) -> u64 {
        self.spans[self.spans.len() - 1].last_sample + 1
    }

    pub fn last_sample(&self) -> u64 {
        self.n_samples() - 1
    }

    /// Sampling rate of the first unit, see [`crate::check_consistency`].
    pub fn fs(&self) -> f64 {
        self.first().fs()
    }

    /// Channels of the first unit, see [`crate::check_consistency`].
    pub fn channels(&self) -> &[String] {
        self.first().channels()
    }

    pub fn first_time(&self) -> DateTime<Utc> {
        self.first().first_time()
    }

    pub fn last_time(&self) -> DateTime<Utc> {
        self.last().last_time()
    }

    /// Position of the unit holding global `sample`.
    pub fn locate(&self, sample: u64) -> Option<usize> {
        let position = self.spans.partition_point(|s| s.last_sample < sample);
        (position < self.spans.len()).then_some(position)
    }

    /// Time of global `sample`.
    pub fn time_at(&self, sample: u64) -> Option<DateTime<Utc>> {
        let position = self.locate(sample)?;
        let unit = &self.units[position];
        let local = sample - self.spans[position].first_sample;
        Some(time::offset_time(unit.first_time(), local, unit.fs()))
    }

    /// First sample at or after `time`, `None` past the last sample.
    pub fn sample_at(&self, time: DateTime<Utc>) -> Option<u64> {
        let tolerance = time::time_tolerance(self.fs());
        let position = self
            .units
            .partition_point(|u| u.last_time() + tolerance < time);
        let unit = self.units.get(position)?;
        let span = self.spans[position];

        let periods = time::periods_between(unit.first_time(), time, unit.fs());
        let local = if periods <= 0.0 {
            0
        } else if (periods - periods.round()).abs() < 1e-6 {
            periods.round() as u64
        } else {
            periods.ceil() as u64
        };
        Some(span.first_sample + local.min(span.n_samples() - 1))
    }

    /// Last sample at or before `time`, `None` before the first sample.
    pub fn sample_before(&self, time: DateTime<Utc>) -> Option<u64> {
        let sample = match self.sample_at(time) {
            Some(sample) => sample,
            None => return Some(self.last_sample()),
        };
        let at = self.time_at(sample)?;
        if at <= time + time::time_tolerance(self.fs()) {
            Some(sample)
        } else {
            sample.checked_sub(1)
        }
    }

    /// See [`resolve`].
    pub fn resolve(&self, from: u64, to: u64) -> Result<Vec<ResolvedRead>, ReaderError> {
        resolve(self, from, to)
    }
}

impl<'a> IntoIterator for &'a SegmentIndex {
    type Item = &'a StorageUnit;
    type IntoIter = std::slice::Iter<'a, StorageUnit>;

    fn into_iter(self) -> Self::IntoIter {
        self.units.iter()
    }
}
