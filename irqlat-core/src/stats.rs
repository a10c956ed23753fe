// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Latency summary over one series of trials.

use serde::{Deserialize, Serialize};

use crate::error::StatsError;
use crate::sampler::Trial;

/// Summary statistics for a series, in microseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub count: usize,
    pub min_us: u64,
    pub max_us: u64,
    pub mean_us: f64,
    /// Population standard deviation (divides by N).
    pub std_dev_us: f64,
}

impl LatencyStats {
    /// Summarize raw intervals.
    ///
    /// Two passes: the integer sum gives the mean, then squared deviations
    /// from that mean are averaged over N.
    pub fn from_intervals(intervals: &[u64]) -> Result<Self, StatsError> {
        if intervals.is_empty() {
            return Err(StatsError::EmptySeries);
        }

        let count = intervals.len();
        let mut min_us = u64::MAX;
        let mut max_us = 0;
        let mut sum: u128 = 0;
        for &interval in intervals {
            min_us = min_us.min(interval);
            max_us = max_us.max(interval);
            sum += interval as u128;
        }
        let mean_us = sum as f64 / count as f64;

        let variance = intervals
            .iter()
            .map(|&x| {
                let diff = x as f64 - mean_us;
                diff * diff
            })
            .sum::<f64>()
            / count as f64;

        Ok(Self {
            count,
            min_us,
            max_us,
            mean_us,
            std_dev_us: variance.sqrt(),
        })
    }
}

/// Summarize a non-empty series of trials.
pub fn summarize(trials: &[Trial]) -> Result<LatencyStats, StatsError> {
    let intervals: Vec<u64> = trials.iter().map(|t| t.interval_us).collect();
    LatencyStats::from_intervals(&intervals)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trials(intervals: &[u64]) -> Vec<Trial> {
        intervals
            .iter()
            .enumerate()
            .map(|(i, &us)| Trial::from_interval(i, us))
            .collect()
    }

    #[test]
    fn test_known_series() {
        let stats = summarize(&trials(&[10, 12, 11, 50, 9])).unwrap();
        assert_eq!(stats.count, 5);
        assert_eq!(stats.min_us, 9);
        assert_eq!(stats.max_us, 50);
        assert!((stats.mean_us - 18.4).abs() < 1e-9);
        assert!((stats.std_dev_us - 15.83).abs() < 0.005);
    }

    #[test]
    fn test_constant_series_has_zero_deviation() {
        let stats = summarize(&trials(&[7, 7, 7, 7])).unwrap();
        assert_eq!(stats.std_dev_us, 0.0);
        assert_eq!(stats.mean_us, 7.0);
    }

    #[test]
    fn test_single_trial() {
        let stats = summarize(&trials(&[123])).unwrap();
        assert_eq!(stats.min_us, 123);
        assert_eq!(stats.max_us, 123);
        assert_eq!(stats.std_dev_us, 0.0);
    }

    #[test]
    fn test_empty_series_rejected() {
        assert!(matches!(summarize(&[]), Err(StatsError::EmptySeries)));
    }

    #[test]
    fn test_order_independent() {
        let forward = summarize(&trials(&[3, 1, 4, 1, 5, 9, 2, 6])).unwrap();
        let reversed = summarize(&trials(&[6, 2, 9, 5, 1, 4, 1, 3])).unwrap();
        assert_eq!(forward, reversed);
    }

    #[test]
    fn test_bounds_hold() {
        let stats = summarize(&trials(&[100, 3, 57, 57, 2, 80])).unwrap();
        assert!(stats.min_us as f64 <= stats.mean_us);
        assert!(stats.mean_us <= stats.max_us as f64);
        assert!(stats.std_dev_us >= 0.0);
    }
}
