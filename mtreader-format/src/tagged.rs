//! Variable-length tagged records of packed 24-bit samples.
//!
//! A tagged file (Phoenix MTU-5 `.TS*`) is a sequence of records, each a
//! 32 byte [`Tag`] followed by `n_scans` scans of `n_chans` signed 24-bit
//! little-endian samples:
//!
//! ```text
//! | tag (32) | scan 0: c0 c1 .. cN (3 bytes each) | scan 1 | ... | tag (32) | ...
//! ```
//!
//! Record boundaries can only be found by walking the tags from the start of
//! the file, see [`scan_records`].
use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Timelike, Utc};

use crate::{
    block::Block,
    decoder::{n_samples, ByteSpan, RecordDecoder},
    error::DecodeError,
};

pub const TAG_SIZE: usize = 32;

/// Record header of a tagged file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Time of the first scan, second resolution.
    pub from_time: DateTime<Utc>,
    pub day_of_week: u8,
    pub serial: i16,
    pub n_scans: u16,
    pub n_chans: u8,
    pub tag_length: u8,
    pub status: u8,
    /// Bit flags of channels that saturated in this record.
    pub saturation: u8,
    pub sample_length: u8,
    pub sample_rate: i16,
    pub sample_rate_units: u8,
    pub clock_status: u8,
    pub clock_error: i32,
}

impl Tag {
    /// Tag for a record of `n_scans` scans of `n_chans` 24-bit samples.
    pub fn new(from_time: DateTime<Utc>, n_scans: u16, n_chans: u8) -> Self {
        Self {
            from_time,
            day_of_week: from_time.weekday().num_days_from_sunday() as u8,
            serial: 0,
            n_scans,
            n_chans,
            tag_length: TAG_SIZE as u8,
            status: 0,
            saturation: 0,
            sample_length: int24::SAMPLE_SIZE as u8,
            sample_rate: 0,
            sample_rate_units: 0,
            clock_status: 0,
            clock_error: 0,
        }
    }

    /// Parse the tag found at byte `offset` of a file.
    pub fn parse(bytes: &[u8; TAG_SIZE], offset: u64) -> Result<Self, DecodeError> {
        let mut rdr = &bytes[..];
        let second = rdr.read_u8()?;
        let minute = rdr.read_u8()?;
        let hour = rdr.read_u8()?;
        let day = rdr.read_u8()?;
        let month = rdr.read_u8()?;
        let year = rdr.read_u8()?;
        let day_of_week = rdr.read_u8()?;
        let century = rdr.read_u8()?;

        let from_time = NaiveDate::from_ymd_opt(
            century as i32 * 100 + year as i32,
            month as u32,
            day as u32,
        )
        .and_then(|date| date.and_hms_opt(hour as u32, minute as u32, second as u32))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or(DecodeError::InvalidTagTime { offset })?;

        let serial = rdr.read_i16::<LittleEndian>()?;
        let n_scans = rdr.read_u16::<LittleEndian>()?;
        let n_chans = rdr.read_u8()?;
        let tag_length = rdr.read_u8()?;
        let status = rdr.read_u8()?;
        let saturation = rdr.read_u8()?;
        let _reserved = rdr.read_u8()?;
        let sample_length = rdr.read_u8()?;

        let tag = Self {
            from_time,
            day_of_week,
            serial,
            n_scans,
            n_chans,
            tag_length,
            status,
            saturation,
            sample_length,
            sample_rate: rdr.read_i16::<LittleEndian>()?,
            sample_rate_units: rdr.read_u8()?,
            clock_status: rdr.read_u8()?,
            clock_error: rdr.read_i32::<LittleEndian>()?,
        };
        if tag.sample_length as usize != int24::SAMPLE_SIZE {
            return Err(DecodeError::UnsupportedSampleWidth {
                width: tag.sample_length,
                offset,
            });
        }
        Ok(tag)
    }

    pub fn to_bytes(&self) -> [u8; TAG_SIZE] {
        let time = &self.from_time;
        let mut buf = Vec::with_capacity(TAG_SIZE);
        buf.extend_from_slice(&[
            time.second() as u8,
            time.minute() as u8,
            time.hour() as u8,
            time.day() as u8,
            time.month() as u8,
            time.year().rem_euclid(100) as u8,
            self.day_of_week,
            time.year().div_euclid(100) as u8,
        ]);
        // writes into a Vec never fail
        let _ = buf.write_i16::<LittleEndian>(self.serial);
        let _ = buf.write_u16::<LittleEndian>(self.n_scans);
        buf.extend_from_slice(&[
            self.n_chans,
            self.tag_length,
            self.status,
            self.saturation,
            0,
            self.sample_length,
        ]);
        let _ = buf.write_i16::<LittleEndian>(self.sample_rate);
        buf.extend_from_slice(&[self.sample_rate_units, self.clock_status]);
        let _ = buf.write_i32::<LittleEndian>(self.clock_error);

        let mut bytes = [0u8; TAG_SIZE];
        bytes[..buf.len()].copy_from_slice(&buf);
        bytes
    }

    /// Length of the sample data following the tag.
    pub fn data_len(&self) -> u64 {
        self.n_scans as u64 * self.n_chans as u64 * self.sample_length as u64
    }

    pub fn is_saturated(&self) -> bool {
        self.saturation != 0
    }
}

/// A record located by [`scan_records`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedRecord {
    /// Position of the record in the file.
    pub index: usize,
    pub tag: Tag,
    pub tag_offset: u64,
    /// Offset of the first sample byte.
    pub data_start: u64,
}

impl TaggedRecord {
    pub fn n_scans(&self) -> u64 {
        self.tag.n_scans as u64
    }

    pub fn data_end(&self) -> u64 {
        self.data_start + self.tag.data_len()
    }
}

/// Walk the tags of a tagged file from its start, locating every record.
pub fn scan_records<R>(reader: &mut R) -> Result<Vec<TaggedRecord>, DecodeError>
where
    R: Read + Seek,
{
    let source_len = reader.seek(SeekFrom::End(0))?;
    let mut records = Vec::new();
    let mut offset = 0u64;
    let mut buf = [0u8; TAG_SIZE];
    while offset < source_len {
        if source_len - offset < TAG_SIZE as u64 {
            return Err(DecodeError::TruncatedTag { offset });
        }
        reader.seek(SeekFrom::Start(offset))?;
        reader.read_exact(&mut buf)?;
        let tag = Tag::parse(&buf, offset)?;

        let data_start = offset + TAG_SIZE as u64;
        let data_len = tag.data_len();
        if data_start + data_len > source_len {
            return Err(DecodeError::Truncated {
                offset: data_start,
                needed: data_len,
                available: source_len - data_start,
            });
        }
        log::trace!(
            "Record {} at byte {offset}: {} scans from {}",
            records.len(),
            tag.n_scans,
            tag.from_time
        );
        records.push(TaggedRecord {
            index: records.len(),
            tag,
            tag_offset: offset,
            data_start,
        });
        offset = data_start + data_len;
    }
    log::debug!("Found {} tagged records in {source_len} bytes", records.len());
    Ok(records)
}

/// Decodes the scans of one tagged record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedVariableDecoder {
    data_start: u64,
    expected_channels: Option<usize>,
    n_scans: Option<u64>,
}

impl TaggedVariableDecoder {
    /// Decoder for a record whose samples start at byte `data_start`.
    pub fn new(data_start: u64) -> Self {
        Self {
            data_start,
            expected_channels: None,
            n_scans: None,
        }
    }

    /// Decoder that also checks requests against the record's channel and
    /// scan counts.
    pub fn from_record(record: &TaggedRecord) -> Self {
        Self {
            expected_channels: Some(record.tag.n_chans as usize),
            ..Self::new(record.data_start)
        }
        .with_scans(record.n_scans())
    }

    /// Reject requests for samples at or past `n_scans`.
    pub fn with_scans(mut self, n_scans: u64) -> Self {
        self.n_scans = Some(n_scans);
        self
    }

    pub fn data_start(&self) -> u64 {
        self.data_start
    }

    pub fn n_scans(&self) -> Option<u64> {
        self.n_scans
    }
}

impl RecordDecoder for TaggedVariableDecoder {
    fn spans(&self, n_channels: usize, from: u64, to: u64) -> Result<Vec<ByteSpan>, DecodeError> {
        if let Some(expected) = self.expected_channels {
            if expected != n_channels {
                return Err(DecodeError::ChannelMismatch {
                    found: expected,
                    expected: n_channels,
                });
            }
        }
        if let Some(n_scans) = self.n_scans {
            if to >= n_scans {
                return Err(DecodeError::PastRecordEnd { to, n_scans });
            }
        }
        let scan_size = (n_channels * int24::SAMPLE_SIZE) as u64;
        Ok(vec![ByteSpan::new(
            self.data_start + from * scan_size,
            n_samples(from, to) * scan_size,
        )])
    }

    fn parse(
        &self,
        bytes: &[u8],
        n_channels: usize,
        n_samples: usize,
    ) -> Result<Block, DecodeError> {
        let expected = n_channels * n_samples * int24::SAMPLE_SIZE;
        if bytes.len() != expected {
            return Err(DecodeError::Truncated {
                offset: 0,
                needed: expected as u64,
                available: bytes.len() as u64,
            });
        }
        let scans = int24::DecodeIter::new(bytes).map(f64::from);
        Ok(Block::from_scans(n_channels, n_samples, scans))
    }
}

#[cfg(test)]
mod test {
    use std::io::{Cursor, Write};

    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2016, 3, 17, 22, 30, 0).unwrap()
    }

    /// A record of `n_scans` scans over `n_chans` channels, sample value
    /// `sign * (scan * 16 + chan)`.
    fn record(time: DateTime<Utc>, n_scans: u16, n_chans: u8, sign: i32) -> Vec<u8> {
        let mut bytes = Tag::new(time, n_scans, n_chans).to_bytes().to_vec();
        let values: Vec<i32> = (0..n_scans as i32)
            .flat_map(|scan| (0..n_chans as i32).map(move |chan| sign * (scan * 16 + chan)))
            .collect();
        bytes.extend(int24::encode(&values).unwrap());
        bytes
    }

    #[test]
    fn test_tag_round_trip() -> eyre::Result<()> {
        let mut tag = Tag::new(start(), 2400, 5);
        tag.serial = 1690;
        tag.saturation = 0b100;
        tag.sample_rate = 2400;
        tag.clock_error = -12;
        let bytes = tag.to_bytes();
        assert_eq!(&bytes[..8], [0, 30, 22, 17, 3, 16, 4, 20]);
        assert_eq!(Tag::parse(&bytes, 0)?, tag);
        assert!(tag.is_saturated());
        assert_eq!(tag.data_len(), 2400 * 5 * 3);
        Ok(())
    }

    #[test]
    fn test_invalid_tag_time() {
        let mut bytes = Tag::new(start(), 1, 1).to_bytes();
        // month 13
        bytes[4] = 13;
        assert!(matches!(
            Tag::parse(&bytes, 64),
            Err(DecodeError::InvalidTagTime { offset: 64 })
        ));
    }

    #[test]
    fn test_unsupported_width() {
        let mut tag = Tag::new(start(), 1, 1);
        tag.sample_length = 4;
        assert!(matches!(
            Tag::parse(&tag.to_bytes(), 0),
            Err(DecodeError::UnsupportedSampleWidth { width: 4, offset: 0 })
        ));
    }

    #[test]
    fn test_scan_records() -> eyre::Result<()> {
        let mut file = record(start(), 10, 3, 1);
        file.extend(record(start() + chrono::Duration::seconds(1), 4, 3, -1));
        file.extend(record(start() + chrono::Duration::seconds(2), 7, 3, 1));
        let records = scan_records(&mut Cursor::new(&file))?;

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].data_start, 32);
        assert_eq!(records[1].tag_offset, 32 + 90);
        assert_eq!(records[1].data_start, 32 + 90 + 32);
        assert_eq!(records[2].tag_offset, records[1].data_end());
        assert_eq!(records[2].data_end(), file.len() as u64);
        assert_eq!(
            records.iter().map(TaggedRecord::n_scans).collect::<Vec<_>>(),
            [10, 4, 7]
        );
        Ok(())
    }

    #[test]
    fn test_scan_truncated() {
        let mut file = record(start(), 2, 2, 1);
        file.extend_from_slice(&[0u8; 10]);
        assert!(matches!(
            scan_records(&mut Cursor::new(&file)),
            Err(DecodeError::TruncatedTag { offset: 44 })
        ));

        let mut file = record(start(), 2, 2, 1);
        file.truncate(file.len() - 1);
        assert!(matches!(
            scan_records(&mut Cursor::new(&file)),
            Err(DecodeError::Truncated {
                offset: 32,
                needed: 12,
                available: 11
            })
        ));
    }

    #[test]
    fn test_decode_record() -> eyre::Result<()> {
        let mut file = record(start(), 3, 2, 1);
        file.extend(record(start(), 5, 2, -1));
        let records = scan_records(&mut Cursor::new(&file))?;
        let decoder = TaggedVariableDecoder::from_record(&records[1]);

        let block = decoder.decode(&file, 2, 1, 3)?;
        assert_eq!(block.row(0), [-16.0, -32.0, -48.0]);
        assert_eq!(block.row(1), [-17.0, -33.0, -49.0]);
        assert_eq!(decoder.read(&mut Cursor::new(&file), 2, 1, 3)?, block);

        assert!(matches!(
            decoder.spans(3, 0, 0),
            Err(DecodeError::ChannelMismatch {
                found: 2,
                expected: 3
            })
        ));
        Ok(())
    }

    #[test]
    fn test_request_past_record_end() -> eyre::Result<()> {
        let mut file = record(start(), 2, 1, 1);
        file.extend(record(start(), 2, 1, -1));
        let records = scan_records(&mut Cursor::new(&file))?;
        let decoder = TaggedVariableDecoder::from_record(&records[0]);
        assert_eq!(decoder.n_scans(), Some(2));

        assert_eq!(decoder.decode(&file, 1, 0, 1)?.row(0), [0.0, 16.0]);
        assert!(matches!(
            decoder.decode(&file, 1, 0, 5),
            Err(DecodeError::PastRecordEnd { to: 5, n_scans: 2 })
        ));
        assert!(matches!(
            decoder.spans(1, 2, 2),
            Err(DecodeError::PastRecordEnd { to: 2, n_scans: 2 })
        ));
        Ok(())
    }

    proptest! {
        #[test]
        fn proptest_sub_range(
            ref values in prop::collection::vec(int24::MIN..=int24::MAX, 3..300),
            a in 0usize..100,
            b in 0usize..100,
        ) {
            let n_chans = 3;
            let n_scans = values.len() / n_chans;
            let mut file = Tag::new(start(), n_scans as u16, n_chans as u8).to_bytes().to_vec();
            file.extend(int24::encode(&values[..n_scans * n_chans]).unwrap());

            let decoder = TaggedVariableDecoder::new(TAG_SIZE as u64);
            let full = decoder.decode(&file, n_chans, 0, n_scans as u64 - 1).unwrap();
            let (from, to) = (a.min(b) % n_scans, a.max(b) % n_scans);
            let (from, to) = (from.min(to), from.max(to));
            let part = decoder.decode(&file, n_chans, from as u64, to as u64).unwrap();
            for chan in 0..n_chans {
                prop_assert_eq!(part.row(chan), &full.row(chan)[from..=to]);
            }
        }
    }

    #[test]
    fn test_decode_mapped_file() -> eyre::Result<()> {
        let mut tmp = tempfile::NamedTempFile::new()?;
        tmp.write_all(&record(start(), 8, 5, -1))?;
        tmp.flush()?;

        let file = std::fs::File::open(tmp.path())?;
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        let records = scan_records(&mut Cursor::new(&mmap[..]))?;
        let block = TaggedVariableDecoder::from_record(&records[0]).decode(&mmap, 5, 6, 7)?;
        assert_eq!(block.row(4), [-100.0, -116.0]);
        Ok(())
    }
}
