//! Fixed-width little-endian sample fields.

/// Type of a fixed-width field in a dense or interleaved layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleType {
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl SampleType {
    /// Width of one value in bytes.
    pub const fn size(self) -> usize {
        match self {
            SampleType::I16 | SampleType::U16 => 2,
            SampleType::I32 | SampleType::U32 | SampleType::F32 => 4,
            SampleType::F64 => 8,
        }
    }

    /// Read one value from the start of `bytes`.
    ///
    /// `bytes` must hold at least [`SampleType::size`] bytes, callers slice
    /// whole records before parsing.
    #[inline]
    pub fn read(self, bytes: &[u8]) -> f64 {
        match self {
            SampleType::I16 => i16::from_le_bytes([bytes[0], bytes[1]]) as f64,
            SampleType::U16 => u16::from_le_bytes([bytes[0], bytes[1]]) as f64,
            SampleType::I32 => i32::from_le_bytes(le4(bytes)) as f64,
            SampleType::U32 => u32::from_le_bytes(le4(bytes)) as f64,
            SampleType::F32 => f32::from_le_bytes(le4(bytes)) as f64,
            SampleType::F64 => f64::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ]),
        }
    }
}

#[inline]
fn le4(bytes: &[u8]) -> [u8; 4] {
    [bytes[0], bytes[1], bytes[2], bytes[3]]
}

/// Total width of a list of fields.
pub fn fields_size(fields: &[SampleType]) -> usize {
    fields.iter().map(|f| f.size()).sum()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_read() {
        assert_eq!(SampleType::I16.read(&(-2i16).to_le_bytes()), -2.0);
        assert_eq!(SampleType::U16.read(&65535u16.to_le_bytes()), 65535.0);
        assert_eq!(SampleType::I32.read(&(-100_000i32).to_le_bytes()), -100_000.0);
        assert_eq!(SampleType::U32.read(&u32::MAX.to_le_bytes()), u32::MAX as f64);
        assert_eq!(SampleType::F32.read(&1.5f32.to_le_bytes()), 1.5);
        assert_eq!(SampleType::F64.read(&(-0.25f64).to_le_bytes()), -0.25);
    }

    #[test]
    fn test_sizes() {
        assert_eq!(
            fields_size(&[SampleType::U32, SampleType::U16, SampleType::I16, SampleType::F64]),
            16
        );
    }
}
