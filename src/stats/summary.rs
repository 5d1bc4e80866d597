use ndarray::ArrayView2;
use serde::Serialize;

/// Number of fixed-width histogram bins
pub const HISTOGRAM_BINS: usize = 256;
/// Histogram covers sample values `[0, HISTOGRAM_RANGE)`
pub const HISTOGRAM_RANGE: u32 = 65536;

const BIN_WIDTH: u32 = HISTOGRAM_RANGE / HISTOGRAM_BINS as u32;

/// Pixel statistics over a region
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub count: usize,
    pub min: u16,
    pub mean: f64,
    pub max: u16,
    /// Population standard deviation
    pub std_dev: f64,
    pub histogram: Vec<u64>,
}

/// Statistics without the histogram, for status documents
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub count: usize,
    pub min: u16,
    pub mean: f64,
    pub max: u16,
    pub std_dev: f64,
}

impl Statistics {
    /// Statistics of a region with no pixels
    pub fn empty() -> Self {
        Self {
            count: 0,
            min: 0,
            mean: 0.0,
            max: 0,
            std_dev: 0.0,
            histogram: vec![0; HISTOGRAM_BINS],
        }
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            count: self.count,
            min: self.min,
            mean: self.mean,
            max: self.max,
            std_dev: self.std_dev,
        }
    }

    /// Standard deviation as a percentage of the mean; zero when the mean is zero
    pub fn std_dev_percent(&self) -> f64 {
        if self.mean > 0.0 {
            100.0 * self.std_dev / self.mean
        } else {
            0.0
        }
    }

    /// Lower edge of histogram bin `index`
    pub fn bin_lower_edge(index: usize) -> u32 {
        index as u32 * BIN_WIDTH
    }
}

/// Compute min/mean/max/stddev and a 256-bin histogram over `region`
pub fn compute_statistics(region: ArrayView2<u16>) -> Statistics {
    let count = region.len();
    if count == 0 {
        return Statistics::empty();
    }

    let mut histogram = vec![0u64; HISTOGRAM_BINS];
    let mut min = u16::MAX;
    let mut max = u16::MIN;
    let mut sum = 0f64;

    for &value in region.iter() {
        min = min.min(value);
        max = max.max(value);
        sum += value as f64;
        histogram[(value as u32 / BIN_WIDTH) as usize] += 1;
    }

    let mean = sum / count as f64;
    let variance = region
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / count as f64;

    Statistics {
        count,
        min,
        mean,
        max,
        std_dev: variance.sqrt(),
        histogram,
    }
}
