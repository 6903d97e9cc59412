//! Numeric summaries and histograms for INTEGER/FLOAT columns.

use crate::types::StatKey;
use crate::utils::format_2dp;
use std::collections::BTreeMap;

/// Running min/max/sum over every numeric value of a column.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NumericSummary {
    min: Option<f64>,
    max: Option<f64>,
    sum: f64,
    count: u64,
}

impl NumericSummary {
    pub fn update(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn average(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    /// Two-decimal `min/max/sum/average`, or an empty map if nothing was seen.
    pub fn to_stats(&self) -> BTreeMap<StatKey, String> {
        let (Some(min), Some(max), Some(average)) = (self.min, self.max, self.average()) else {
            return BTreeMap::new();
        };
        BTreeMap::from([
            (StatKey::Min, format_2dp(min)),
            (StatKey::Max, format_2dp(max)),
            (StatKey::Sum, format_2dp(self.sum)),
            (StatKey::Average, format_2dp(average)),
        ])
    }
}

/// Equal-width histogram over `values`.
///
/// Labels are `"{lo:.2}-{hi:.2}"`; the maximum falls in the last bucket. If
/// every value is equal there is a single bucket keyed by that value.
/// Returns `None` for an empty sample.
pub fn histogram(values: &[f64], buckets: usize) -> Option<BTreeMap<String, usize>> {
    let (&first, rest) = values.split_first()?;
    let (min, max) = rest
        .iter()
        .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v)));

    let range = max - min;
    if range == 0.0 || buckets == 0 {
        return Some(BTreeMap::from([(format_2dp(min), values.len())]));
    }

    let step = range / buckets as f64;
    let mut counts = vec![0usize; buckets];
    for &v in values {
        let index = (((v - min) / step) as usize).min(buckets - 1);
        counts[index] += 1;
    }

    let labelled = counts
        .into_iter()
        .enumerate()
        .filter(|&(_, count)| count > 0)
        .map(|(i, count)| {
            let start = min + i as f64 * step;
            (format!("{:.2}-{:.2}", start, start + step), count)
        })
        .collect();
    Some(labelled)
}
