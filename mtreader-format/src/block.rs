/// Decoded samples for one storage unit, stored channel-major.
///
/// Row `c` holds the `n_samples` consecutive values of channel `c`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    n_channels: usize,
    n_samples: usize,
    data: Vec<f64>,
}

impl Block {
    pub fn zeros(n_channels: usize, n_samples: usize) -> Self {
        Self {
            n_channels,
            n_samples,
            data: vec![0.0; n_channels * n_samples],
        }
    }

    /// Wrap channel-major data. Returns `None` if the length does not match.
    pub fn from_channel_major(n_channels: usize, n_samples: usize, data: Vec<f64>) -> Option<Self> {
        (data.len() == n_channels * n_samples).then_some(Self {
            n_channels,
            n_samples,
            data,
        })
    }

    /// Build a block from scan-major values, where the channels of one
    /// instant are adjacent.
    pub fn from_scans<I>(n_channels: usize, n_samples: usize, scans: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut block = Self::zeros(n_channels, n_samples);
        for (idx, value) in scans.into_iter().take(n_channels * n_samples).enumerate() {
            let (sample, chan) = (idx / n_channels, idx % n_channels);
            block.data[chan * n_samples + sample] = value;
        }
        block
    }

    pub fn n_channels(&self) -> usize {
        self.n_channels
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn row(&self, chan: usize) -> &[f64] {
        &self.data[chan * self.n_samples..(chan + 1) * self.n_samples]
    }

    pub fn row_mut(&mut self, chan: usize) -> &mut [f64] {
        &mut self.data[chan * self.n_samples..(chan + 1) * self.n_samples]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks_exact panics on a zero chunk size
        self.data.chunks_exact(self.n_samples.max(1)).take(self.n_channels)
    }

    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut [f64]> {
        let n_channels = self.n_channels;
        self.data
            .chunks_exact_mut(self.n_samples.max(1))
            .take(n_channels)
    }

    /// Keep only the rows in `chans`, in that order.
    pub fn select(&self, chans: &[usize]) -> Self {
        let mut data = Vec::with_capacity(chans.len() * self.n_samples);
        for &chan in chans {
            data.extend_from_slice(self.row(chan));
        }
        Self {
            n_channels: chans.len(),
            n_samples: self.n_samples,
            data,
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.data
    }
}
