//! Indexing the records of a tagged file.
//!
//! Each record of a tagged file becomes its own storage unit, so a file of
//! many records is read through the same [`SegmentIndex`] as a set of files.
use std::{fs::File, io::BufReader, path::Path};

use mtreader_format::{scan_records, TaggedRecord, TaggedVariableDecoder};

use crate::{
    error::{ReaderError, UnitError},
    index::SegmentIndex,
    unit::{ChannelScaling, StorageUnit, UnitId, UnitSource},
};

/// One storage unit per scanned record of the tagged file at `path`.
///
/// An empty `scalings` means identity scaling for every channel. Records
/// without scans hold no samples and are skipped.
pub fn tagged_record_units<P, S>(
    path: P,
    records: &[TaggedRecord],
    fs: f64,
    channels: &[S],
    scalings: &[ChannelScaling],
) -> Result<Vec<StorageUnit>, ReaderError>
where
    P: AsRef<Path>,
    S: AsRef<str>,
{
    let path = path.as_ref();
    let name = path.display().to_string();
    let scalings = if scalings.is_empty() {
        vec![ChannelScaling::IDENTITY; channels.len()]
    } else {
        scalings.to_vec()
    };

    let mut units = Vec::with_capacity(records.len());
    for record in records {
        let unit_id = UnitId::with_record(name.clone(), record.index);
        if record.n_scans() == 0 {
            log::warn!("Skipping {unit_id}, record holds no scans");
            continue;
        }
        let n_chans = record.tag.n_chans as usize;
        if n_chans != channels.len() {
            return Err(ReaderError::InvalidUnit {
                unit: unit_id,
                reason: format!("record holds {n_chans} channels, {} named", channels.len()),
            });
        }
        let unit = StorageUnit::builder(
            unit_id,
            UnitSource::File(path.to_path_buf()),
            TaggedVariableDecoder::from_record(record).into(),
        )
        .fs(fs)
        .channels(channels.iter().map(|c| c.as_ref().to_string()))
        .first_time(record.tag.from_time)
        .sample_count(record.n_scans())
        .channel_scalings(scalings.clone())
        .build()?;
        units.push(unit);
    }
    Ok(units)
}

/// Scan the tagged file at `path` and index all of its records.
pub fn open_tagged<P, S>(
    path: P,
    fs: f64,
    channels: &[S],
    scalings: &[ChannelScaling],
) -> Result<SegmentIndex, ReaderError>
where
    P: AsRef<Path>,
    S: AsRef<str>,
{
    let path = path.as_ref();
    let scan = || -> Result<Vec<TaggedRecord>, UnitError> {
        let mut reader = BufReader::new(File::open(path)?);
        Ok(scan_records(&mut reader)?)
    };
    let records = scan().map_err(|source| ReaderError::Scan {
        unit: UnitId::from_path(path),
        source,
    })?;
    log::info!("{} holds {} records", path.display(), records.len());
    SegmentIndex::build(tagged_record_units(path, &records, fs, channels, scalings)?)
}
