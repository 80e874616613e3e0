//! Packed 24-bit two's-complement samples.
//!
//! Phoenix MTU data records store every channel sample in 3 bytes, little
//! endian. A sample is decoded by zero-extending the 3 bytes to a `u32` and
//! then subtracting `0x1000000` when bit 23 (the sign bit of the 24-bit value)
//! is set. Encoding is the exact inverse for the range [`MIN`, `MAX`].

use std::iter::FusedIterator;

/// Number of bytes used by a single packed sample.
pub const SAMPLE_SIZE: usize = 3;

/// Smallest value representable in 24 bits.
pub const MIN: i32 = -0x80_0000;

/// Largest value representable in 24 bits.
pub const MAX: i32 = 0x7f_ffff;

const SIGN_BIT: u32 = 0x80_0000;
const WRAP: i32 = 0x100_0000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Int24Error {
    #[error("{len} bytes is not a whole number of 3-byte samples")]
    Truncated { len: usize },

    #[error("{0} does not fit in a 24-bit two's complement sample")]
    OutOfRange(i32),

    #[error("{samples} packed samples do not fit an output of {out} values")]
    LengthMismatch { samples: usize, out: usize },
}

/// Decode one packed sample.
#[inline]
pub fn decode_sample(bytes: [u8; SAMPLE_SIZE]) -> i32 {
    let raw = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0]);
    if raw & SIGN_BIT != 0 {
        raw as i32 - WRAP
    } else {
        raw as i32
    }
}

/// Encode one sample into its packed form.
#[inline]
pub fn encode_sample(value: i32) -> Result<[u8; SAMPLE_SIZE], Int24Error> {
    if !(MIN..=MAX).contains(&value) {
        return Err(Int24Error::OutOfRange(value));
    }
    let raw = (if value < 0 { value + WRAP } else { value }) as u32;
    let [b0, b1, b2, _] = raw.to_le_bytes();
    Ok([b0, b1, b2])
}

/// Iterator over the samples packed in a byte slice.
///
/// Trailing bytes that do not form a full sample are ignored, use [`decode`]
/// to have them reported instead.
#[derive(Debug, Clone)]
pub struct DecodeIter<'a> {
    chunks: std::slice::ChunksExact<'a, u8>,
}

impl<'a> DecodeIter<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            chunks: bytes.chunks_exact(SAMPLE_SIZE),
        }
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = i32;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk = self.chunks.next()?;
        Some(decode_sample([chunk[0], chunk[1], chunk[2]]))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for DecodeIter<'_> {}
impl FusedIterator for DecodeIter<'_> {}

/// Decode every sample in `bytes`.
pub fn decode(bytes: &[u8]) -> Result<Vec<i32>, Int24Error> {
    check_len(bytes.len())?;
    Ok(DecodeIter::new(bytes).collect())
}

/// Decode `bytes` into an existing buffer, which must hold exactly
/// `bytes.len() / 3` values.
pub fn decode_into(bytes: &[u8], out: &mut [i32]) -> Result<(), Int24Error> {
    check_len(bytes.len())?;
    let samples = bytes.len() / SAMPLE_SIZE;
    if samples != out.len() {
        return Err(Int24Error::LengthMismatch {
            samples,
            out: out.len(),
        });
    }
    for (dst, value) in out.iter_mut().zip(DecodeIter::new(bytes)) {
        *dst = value;
    }
    Ok(())
}

/// Pack samples, the inverse of [`decode`].
pub fn encode(values: &[i32]) -> Result<Vec<u8>, Int24Error> {
    let mut packed = Vec::with_capacity(values.len() * SAMPLE_SIZE);
    for &value in values {
        packed.extend_from_slice(&encode_sample(value)?);
    }
    Ok(packed)
}

fn check_len(len: usize) -> Result<(), Int24Error> {
    if len % SAMPLE_SIZE != 0 {
        Err(Int24Error::Truncated { len })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use proptest::{prelude::proptest, prop_assert_eq};

    use super::*;

    #[test]
    fn test_decode_extremes() {
        assert_eq!(decode_sample([0xff, 0xff, 0x7f]), 8_388_607);
        assert_eq!(decode_sample([0x00, 0x00, 0x80]), -8_388_608);
        assert_eq!(decode_sample([0x00, 0x00, 0x00]), 0);
        assert_eq!(decode_sample([0xff, 0xff, 0xff]), -1);
        assert_eq!(decode_sample([0x01, 0x00, 0x00]), 1);
    }

    #[test]
    fn test_decode_stream() {
        let bytes = [0xff, 0xff, 0x7f, 0x00, 0x00, 0x80, 0x34, 0x12, 0x00];
        assert_eq!(decode(&bytes).unwrap(), [MAX, MIN, 0x1234]);
        assert_eq!(DecodeIter::new(&bytes).len(), 3);
    }

    #[test]
    fn test_truncated() {
        assert_eq!(
            decode(&[0x00, 0x01, 0x02, 0x03]),
            Err(Int24Error::Truncated { len: 4 })
        );
        let mut out = [0; 2];
        assert_eq!(
            decode_into(&[0; 4], &mut out),
            Err(Int24Error::Truncated { len: 4 })
        );
    }

    #[test]
    fn test_decode_into_wrong_output_len() {
        let mut out = [0; 2];
        assert_eq!(
            decode_into(&[0; 3], &mut out),
            Err(Int24Error::LengthMismatch { samples: 1, out: 2 })
        );
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(encode_sample(MAX + 1), Err(Int24Error::OutOfRange(MAX + 1)));
        assert_eq!(encode_sample(MIN - 1), Err(Int24Error::OutOfRange(MIN - 1)));
    }

    #[test]
    fn test_roundtrip_boundaries() {
        let values = [MAX, MIN, 0, -1];
        let packed = encode(&values).unwrap();
        assert_eq!(
            packed,
            [0xff, 0xff, 0x7f, 0x00, 0x00, 0x80, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff]
        );
        assert_eq!(decode(&packed).unwrap(), values);
        assert_eq!(encode(&decode(&packed).unwrap()).unwrap(), packed);
    }

    proptest! {
        #[test]
        fn proptest_round_trip(ref vec in proptest::collection::vec(MIN..=MAX, 0..512)) {
            let packed = encode(vec).unwrap();
            prop_assert_eq!(packed.len(), vec.len() * SAMPLE_SIZE);
            let mut out = vec![0; vec.len()];
            decode_into(&packed, &mut out).unwrap();
            prop_assert_eq!(vec, &out);
        }

        #[test]
        fn proptest_bytes_round_trip(ref bytes in proptest::collection::vec(proptest::arbitrary::any::<u8>(), 0..64)) {
            let whole = &bytes[..bytes.len() - bytes.len() % SAMPLE_SIZE];
            let values = decode(whole).unwrap();
            prop_assert_eq!(encode(&values).unwrap(), whole.to_vec());
        }
    }
}
