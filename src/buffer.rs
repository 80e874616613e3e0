use chrono::{DateTime, Utc};
use mtreader_format::Block;

use crate::scale::ScaleStage;

/// Samples of a read, one row per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelBuffer {
    fs: f64,
    first_time: DateTime<Utc>,
    last_time: DateTime<Utc>,
    channels: Vec<String>,
    stage: ScaleStage,
    data: Block,
}

impl ChannelBuffer {
    pub fn new(
        fs: f64,
        first_time: DateTime<Utc>,
        last_time: DateTime<Utc>,
        channels: Vec<String>,
        data: Block,
    ) -> Self {
        Self {
            fs,
            first_time,
            last_time,
            channels,
            stage: ScaleStage::Raw,
            data,
        }
    }

    pub(crate) fn set_stage(&mut self, stage: ScaleStage) {
        self.stage = stage;
    }

    pub fn fs(&self) -> f64 {
        self.fs
    }

    pub fn first_time(&self) -> DateTime<Utc> {
        self.first_time
    }

    pub fn last_time(&self) -> DateTime<Utc> {
        self.last_time
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    /// Calibration applied to the samples.
    pub fn stage(&self) -> ScaleStage {
        self.stage
    }

    pub fn n_channels(&self) -> usize {
        self.data.n_channels()
    }

    pub fn n_samples(&self) -> usize {
        self.data.n_samples()
    }

    pub fn row(&self, chan: usize) -> &[f64] {
        self.data.row(chan)
    }

    pub fn row_mut(&mut self, chan: usize) -> &mut [f64] {
        self.data.row_mut(chan)
    }

    pub fn channel(&self, name: &str) -> Option<&[f64]> {
        let chan = self.channels.iter().position(|c| c == name)?;
        Some(self.row(chan))
    }

    pub fn data(&self) -> &Block {
        &self.data
    }

    pub fn into_block(self) -> Block {
        self.data
    }
}

/// Split every row of `block` into consecutive column ranges of `widths`.
///
/// Entry `i` of the result holds the `i`th range of each row, so disjoint
/// ranges can be filled from separate threads.
pub(crate) fn partition_columns<'a>(block: &'a mut Block, widths: &[usize]) -> Vec<Vec<&'a mut [f64]>> {
    let mut parts: Vec<Vec<&'a mut [f64]>> = widths
        .iter()
        .map(|_| Vec::with_capacity(block.n_channels()))
        .collect();
    for row in block.rows_mut() {
        let mut rest = row;
        for (part, &width) in parts.iter_mut().zip(widths) {
            let (head, tail) = rest.split_at_mut(width);
            part.push(head);
            rest = tail;
        }
    }
    parts
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::index::test::t0;

    #[test]
    fn test_partition_columns() {
        let mut block = Block::zeros(2, 5);
        {
            let parts = partition_columns(&mut block, &[2, 3]);
            assert_eq!(parts.len(), 2);
            for (i, part) in parts.into_iter().enumerate() {
                for (chan, cols) in part.into_iter().enumerate() {
                    cols.fill((10 * chan + i) as f64);
                }
            }
        }
        assert_eq!(block.row(0), [0.0, 0.0, 1.0, 1.0, 1.0]);
        assert_eq!(block.row(1), [10.0, 10.0, 11.0, 11.0, 11.0]);
    }

    #[test]
    fn test_channel_lookup() {
        let block = Block::from_channel_major(2, 1, vec![1.0, 2.0]).unwrap();
        let buf = ChannelBuffer::new(10.0, t0(), t0(), vec!["Ex".into(), "Ey".into()], block);
        assert_eq!(buf.channel("Ey"), Some(&[2.0][..]));
        assert_eq!(buf.channel("Hz"), None);
        assert_eq!(buf.stage(), ScaleStage::Raw);
    }
}
