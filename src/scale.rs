//! Calibration of raw counts into field units.
//!
//! Scaling happens in two passes. The affine pass applies each unit's own
//! `(multiplier, offset)` to the samples that unit contributed. The unit
//! conversion pass then divides electric channels by their dipole length in
//! kilometres (giving mV/km) and magnetic channels by their gain.
use mtreader_format::Block;

use crate::{buffer::ChannelBuffer, error::ReaderError, unit::ChannelScaling};

/// How far along the calibration a read goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleStage {
    /// Decoded counts.
    Raw,
    /// Counts with each unit's coefficients applied.
    Affine,
    #[default]
    FieldUnits,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelKind {
    /// Dipole length in metres.
    Electric { dipole_length: f64 },
    Magnetic { gain: f64 },
    Other,
}

/// Conversion parameters of a named channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMeta {
    pub name: String,
    pub kind: ChannelKind,
}

impl ChannelMeta {
    pub fn electric<S: Into<String>>(name: S, dipole_length: f64) -> Self {
        Self {
            name: name.into(),
            kind: ChannelKind::Electric { dipole_length },
        }
    }

    pub fn magnetic<S: Into<String>>(name: S, gain: f64) -> Self {
        Self {
            name: name.into(),
            kind: ChannelKind::Magnetic { gain },
        }
    }

    pub fn other<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            kind: ChannelKind::Other,
        }
    }

    fn divisor(&self) -> Result<Option<f64>, ReaderError> {
        let invalid = |reason: String| ReaderError::InvalidConversion {
            channel: self.name.clone(),
            reason,
        };
        match self.kind {
            ChannelKind::Electric { dipole_length } => {
                if !dipole_length.is_finite() || dipole_length <= 0.0 {
                    return Err(invalid(format!("dipole length {dipole_length} m")));
                }
                Ok(Some(dipole_length / 1000.0))
            }
            ChannelKind::Magnetic { gain } => {
                if !gain.is_finite() || gain == 0.0 {
                    return Err(invalid(format!("gain {gain}")));
                }
                Ok(Some(gain))
            }
            ChannelKind::Other => Ok(None),
        }
    }
}

pub struct AffineScaler;

impl AffineScaler {
    /// Scale each row of `block` by the matching coefficients.
    pub fn scale(mut block: Block, scalings: &[ChannelScaling]) -> Block {
        for (row, scaling) in block.rows_mut().zip(scalings) {
            Self::scale_row(row, scaling);
        }
        block
    }

    #[inline]
    pub fn scale_row(row: &mut [f64], scaling: &ChannelScaling) {
        if *scaling == ChannelScaling::IDENTITY {
            return;
        }
        for value in row {
            *value = scaling.apply(*value);
        }
    }

    /// Convert the channels of `buffer` named in `meta` to field units.
    ///
    /// Every divisor is checked before any sample is touched. Channels
    /// without metadata are left as they are.
    pub fn convert_units(buffer: &mut ChannelBuffer, meta: &[ChannelMeta]) -> Result<(), ReaderError> {
        let mut divisors = Vec::with_capacity(buffer.n_channels());
        for name in buffer.channels() {
            let divisor = match meta.iter().find(|m| &m.name == name) {
                Some(m) => m.divisor()?,
                None => None,
            };
            divisors.push(divisor);
        }
        for (chan, divisor) in divisors.into_iter().enumerate() {
            if let Some(divisor) = divisor {
                for value in buffer.row_mut(chan) {
                    *value /= divisor;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::index::test::t0;

    fn buffer(channels: &[&str], data: Vec<f64>) -> ChannelBuffer {
        let n_samples = data.len() / channels.len();
        ChannelBuffer::new(
            10.0,
            t0(),
            t0(),
            channels.iter().map(|c| c.to_string()).collect(),
            Block::from_channel_major(channels.len(), n_samples, data).unwrap(),
        )
    }

    #[test]
    fn test_scale() {
        let block = Block::from_channel_major(2, 2, vec![10.0, -10.0, 3.0, 4.0]).unwrap();
        let scaled = AffineScaler::scale(
            block,
            &[ChannelScaling::new(2.0, 1.0), ChannelScaling::IDENTITY],
        );
        assert_eq!(scaled.row(0), [21.0, -19.0]);
        assert_eq!(scaled.row(1), [3.0, 4.0]);
    }

    #[test]
    fn test_electric_dipole() -> eyre::Result<()> {
        // 2 * 10 + 1 = 21 counts over a 60 m dipole
        let block = AffineScaler::scale(
            Block::from_channel_major(1, 1, vec![10.0]).unwrap(),
            &[ChannelScaling::new(2.0, 1.0)],
        );
        let mut buf = buffer(&["Ex"], block.into_inner());
        AffineScaler::convert_units(&mut buf, &[ChannelMeta::electric("Ex", 60.0)])?;
        assert!((buf.row(0)[0] - 350.0).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_gain_and_other() -> eyre::Result<()> {
        let mut buf = buffer(&["Hx", "Ex", "T"], vec![16.0, 32.0, 5.0, 5.0, 1.0, 2.0]);
        AffineScaler::convert_units(
            &mut buf,
            &[
                ChannelMeta::magnetic("Hx", 16.0),
                ChannelMeta::electric("Ex", 1000.0),
                ChannelMeta::other("T"),
            ],
        )?;
        assert_eq!(buf.row(0), [1.0, 2.0]);
        assert_eq!(buf.row(1), [5.0, 5.0]);
        assert_eq!(buf.row(2), [1.0, 2.0]);
        Ok(())
    }

    #[test]
    fn test_invalid_conversion_leaves_buffer() {
        let mut buf = buffer(&["Hx", "Ex"], vec![16.0, 32.0, 5.0, 5.0]);
        let before = buf.clone();
        let err = AffineScaler::convert_units(
            &mut buf,
            &[ChannelMeta::magnetic("Hx", 4.0), ChannelMeta::electric("Ex", 0.0)],
        );
        assert!(matches!(err, Err(ReaderError::InvalidConversion { channel, .. }) if channel == "Ex"));
        assert_eq!(buf, before);

        let err = AffineScaler::convert_units(&mut buf, &[ChannelMeta::magnetic("Hx", 0.0)]);
        assert!(matches!(err, Err(ReaderError::InvalidConversion { .. })));
    }
}
