//! Benchmark statistics: nearest-rank percentiles, per-path aggregates,
//! pairwise comparisons and the weighted overall score.

use serde::{Deserialize, Serialize};

use super::{BenchPath, QueryRunRecord};

/// Nearest-rank percentile over an already-sorted ascending sample.
/// Returns 0 for an empty sample.
pub fn percentile(sorted: &[u64], pct: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let rank = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
    let index = rank.clamp(1, sorted.len()) - 1;
    sorted[index]
}

/// Fraction of expected keywords present in the context as case-insensitive
/// substrings. A query with no expected keywords scores 1.0 by definition.
pub fn accuracy_score(context: &str, expected_keywords: &[String]) -> f64 {
    if expected_keywords.is_empty() {
        return 1.0;
    }
    let haystack = context.to_lowercase();
    let matched = expected_keywords
        .iter()
        .filter(|k| haystack.contains(k.to_lowercase().as_str()))
        .count();
    matched as f64 / expected_keywords.len() as f64
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencyStats {
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    pub min: u64,
    pub max: u64,
    pub avg: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccuracyStats {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    /// Runs where every expected keyword was found.
    pub perfect_matches: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceStats {
    pub avg: f64,
    pub min: f32,
    pub max: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathStatistics {
    pub path: BenchPath,
    pub total_runs: usize,
    pub successes: usize,
    pub failures: usize,
    /// Over successful runs only.
    pub latency: LatencyStats,
    pub accuracy: AccuracyStats,
    pub confidence: ConfidenceStats,
    /// Runs that errored or came back empty.
    pub fallback_count: usize,
    pub fallback_pct: f64,
}

/// Aggregate the records belonging to one path.
pub fn compute_path_statistics(path: BenchPath, records: &[QueryRunRecord]) -> PathStatistics {
    let runs: Vec<&QueryRunRecord> = records.iter().filter(|r| r.path == path).collect();
    let successes: Vec<&QueryRunRecord> = runs.iter().copied().filter(|r| r.error.is_none()).collect();
    let failures = runs.len() - successes.len();

    let mut latencies: Vec<u64> = successes.iter().map(|r| r.latency_ms).collect();
    latencies.sort_unstable();

    let latency = LatencyStats {
        p50: percentile(&latencies, 50.0),
        p95: percentile(&latencies, 95.0),
        p99: percentile(&latencies, 99.0),
        min: latencies.first().copied().unwrap_or(0),
        max: latencies.last().copied().unwrap_or(0),
        avg: mean(latencies.iter().map(|&v| v as f64)),
    };

    let accuracies: Vec<f64> = successes.iter().map(|r| r.accuracy).collect();
    let accuracy = AccuracyStats {
        avg: mean(accuracies.iter().copied()),
        min: if accuracies.is_empty() {
            0.0
        } else {
            accuracies.iter().copied().fold(f64::INFINITY, f64::min)
        },
        max: accuracies.iter().copied().fold(0.0, f64::max),
        perfect_matches: accuracies.iter().filter(|&&a| a >= 1.0).count(),
    };

    let confidences: Vec<f32> = successes.iter().map(|r| r.confidence).collect();
    let confidence = ConfidenceStats {
        avg: mean(confidences.iter().map(|&c| c as f64)),
        min: if confidences.is_empty() {
            0.0
        } else {
            confidences.iter().copied().fold(f32::INFINITY, f32::min)
        },
        max: confidences.iter().copied().fold(0.0f32, f32::max),
    };

    let fallback_count = runs
        .iter()
        .filter(|r| r.error.is_some() || r.result_count == 0)
        .count();
    let fallback_pct = if runs.is_empty() {
        0.0
    } else {
        fallback_count as f64 / runs.len() as f64 * 100.0
    };

    PathStatistics {
        path,
        total_runs: runs.len(),
        successes: successes.len(),
        failures,
        latency,
        accuracy,
        confidence,
        fallback_count,
        fallback_pct,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for value in values {
        sum += value;
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathComparison {
    pub left: BenchPath,
    pub right: BenchPath,
    /// Lower p50 wins.
    pub latency_winner: BenchPath,
    /// Higher average accuracy wins.
    pub accuracy_winner: BenchPath,
    pub recommendation: String,
}

/// Accuracy gaps below this are treated as noise.
const ACCURACY_EPSILON: f64 = 0.01;
/// The accurate path is preferred while its p50 stays within this factor of
/// the faster one.
const LATENCY_TOLERANCE: f64 = 1.5;

pub fn compare_paths(left: &PathStatistics, right: &PathStatistics) -> PathComparison {
    let latency_winner = if left.latency.p50 <= right.latency.p50 {
        left.path
    } else {
        right.path
    };
    let accuracy_winner = if left.accuracy.avg >= right.accuracy.avg {
        left.path
    } else {
        right.path
    };

    let (accurate, other) = if accuracy_winner == left.path {
        (left, right)
    } else {
        (right, left)
    };

    let recommendation = if (left.accuracy.avg - right.accuracy.avg).abs() < ACCURACY_EPSILON {
        format!(
            "accuracy is comparable; prefer {} for its lower latency",
            latency_winner
        )
    } else if accurate.latency.p50 as f64 <= other.latency.p50 as f64 * LATENCY_TOLERANCE {
        format!(
            "prefer {}: higher accuracy at acceptable latency cost",
            accurate.path
        )
    } else {
        format!(
            "prefer {}: {} is more accurate but over {}x slower at p50",
            other.path, accurate.path, LATENCY_TOLERANCE
        )
    };

    PathComparison {
        left: left.path,
        right: right.path,
        latency_winner,
        accuracy_winner,
        recommendation,
    }
}

/// Weighted overall score: accuracy 60%, latency 40% (p50 normalized against
/// a 5 s budget).
pub fn weighted_score(stats: &PathStatistics) -> f64 {
    let latency_component = 1.0 - (stats.latency.p50 as f64 / 5000.0).min(1.0);
    stats.accuracy.avg * 0.6 + latency_component * 0.4
}
