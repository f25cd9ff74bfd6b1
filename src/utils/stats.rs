//! Summary statistics over scalar series and per-epoch metric reporting
//!
//! `SeriesStats` is the leaf utility shared by the rollout buffer (advantage
//! normalization) and the reporting layer. `MetricTally` accumulates named
//! scalar series over one epoch and prints aggregate statistics, clearing
//! each series as it is logged.

use std::collections::BTreeMap;

/// Mean, standard deviation, max and min of a scalar series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesStats {
    /// Arithmetic mean
    pub mean: f32,

    /// Population standard deviation, `sqrt(sum((x - mean)^2) / n)`
    pub std: f32,

    /// Largest value
    pub max: f32,

    /// Smallest value
    pub min: f32,
}

impl SeriesStats {
    /// Compute statistics over a non-empty series
    ///
    /// Uses the two-pass population formula for the standard deviation.
    ///
    /// # Panics
    ///
    /// Panics if `values` is empty.
    pub fn compute(values: &[f32]) -> Self {
        assert!(!values.is_empty(), "cannot compute statistics of an empty series");

        let n = values.len() as f32;
        let mean = values.iter().sum::<f32>() / n;

        let var = values.iter().map(|x| (x - mean) * (x - mean)).sum::<f32>() / n;
        let std = var.sqrt();

        let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let min = values.iter().copied().fold(f32::INFINITY, f32::min);

        Self { mean, std, max, min }
    }
}

/// Epoch-scoped accumulator of named scalar series
///
/// Replaces ambient/global logging state: the trainer receives a
/// `&mut MetricTally`, records values under string keys during collection
/// and update, and the reporting methods print aggregates and drain the
/// recorded series so the tally starts the next epoch empty.
#[derive(Debug, Default)]
pub struct MetricTally {
    series: BTreeMap<String, Vec<f32>>,
}

impl MetricTally {
    /// Create an empty tally
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value to the named series
    pub fn record(&mut self, key: &str, value: f32) {
        self.series.entry(key.to_string()).or_default().push(value);
    }

    /// Number of values currently recorded under `key`
    pub fn count(&self, key: &str) -> usize {
        self.series.get(key).map_or(0, Vec::len)
    }

    /// Statistics of the named series without draining it
    ///
    /// Returns `None` if nothing was recorded under `key`.
    pub fn stats(&self, key: &str) -> Option<SeriesStats> {
        let values = self.series.get(key)?;
        if values.is_empty() {
            return None;
        }
        Some(SeriesStats::compute(values))
    }

    /// Log a bare scalar that is not an aggregate of a series
    pub fn log_value(&self, key: &str, value: f32) {
        tracing::info!("{:<16} {:.4}", key, value);
    }

    /// Log the average of the named series and drain it
    pub fn log_avg(&mut self, key: &str) {
        if let Some(stats) = self.stats(key) {
            tracing::info!("{:<16} {:.4}", format!("Avg{}", key), stats.mean);
        }
        self.series.remove(key);
    }

    /// Log average, std, max and min of the named series and drain it
    pub fn log_full(&mut self, key: &str) {
        if let Some(stats) = self.stats(key) {
            tracing::info!("{:<16} {:.4}", format!("Avg{}", key), stats.mean);
            tracing::info!("{:<16} {:.4}", format!("Std{}", key), stats.std);
            tracing::info!("{:<16} {:.4}", format!("Max{}", key), stats.max);
            tracing::info!("{:<16} {:.4}", format!("Min{}", key), stats.min);
        }
        self.series.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_constant_series() {
        let stats = SeriesStats::compute(&[2.0, 2.0, 2.0, 2.0]);
        assert_eq!(stats.mean, 2.0);
        assert_eq!(stats.std, 0.0);
        assert_eq!(stats.max, 2.0);
        assert_eq!(stats.min, 2.0);
    }

    #[test]
    fn test_stats_known_values() {
        // mean 3, deviations [-2, 0, 2], population var 8/3
        let stats = SeriesStats::compute(&[1.0, 3.0, 5.0]);
        assert!((stats.mean - 3.0).abs() < 1e-6);
        assert!((stats.std - (8.0f32 / 3.0).sqrt()).abs() < 1e-6);
        assert_eq!(stats.max, 5.0);
        assert_eq!(stats.min, 1.0);
    }

    #[test]
    fn test_stats_single_value() {
        let stats = SeriesStats::compute(&[-1.5]);
        assert_eq!(stats.mean, -1.5);
        assert_eq!(stats.std, 0.0);
        assert_eq!(stats.max, -1.5);
        assert_eq!(stats.min, -1.5);
    }

    #[test]
    #[should_panic(expected = "empty series")]
    fn test_stats_empty_panics() {
        SeriesStats::compute(&[]);
    }

    #[test]
    fn test_tally_record_and_stats() {
        let mut tally = MetricTally::new();
        tally.record("EpRet", 10.0);
        tally.record("EpRet", 20.0);

        assert_eq!(tally.count("EpRet"), 2);
        let stats = tally.stats("EpRet").unwrap();
        assert_eq!(stats.mean, 15.0);
        assert_eq!(stats.max, 20.0);
    }

    #[test]
    fn test_tally_drains_on_log() {
        let mut tally = MetricTally::new();
        tally.record("LossPi", 0.5);
        tally.log_avg("LossPi");

        assert_eq!(tally.count("LossPi"), 0);
        assert!(tally.stats("LossPi").is_none());
    }

    #[test]
    fn test_tally_missing_key() {
        let mut tally = MetricTally::new();
        assert!(tally.stats("nope").is_none());
        // Logging a missing key is a no-op, not an error
        tally.log_full("nope");
    }
}
