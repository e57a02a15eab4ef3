//! Benchmark harness.
//!
//! Runs the built-in corpus through the hybrid facade along one or more
//! forced paths, records per-run latency, accuracy and confidence, and
//! aggregates them into per-path statistics, pairwise recommendations and an
//! acceptance verdict for the hybrid configuration.

pub mod dataset;
pub mod stats;

pub use dataset::{benchmark_corpus, BenchmarkQuery, QueryType};
pub use stats::{
    accuracy_score, compare_paths, compute_path_statistics, percentile, weighted_score,
    AccuracyStats, ConfidenceStats, LatencyStats, PathComparison, PathStatistics,
};

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::BenchmarkConfig;
use crate::hybrid::HybridFacade;
use crate::router::{RetrievalPath, RouteOptions};

/// Which retrieval configuration a benchmark run exercises. `Embeddings` and
/// `TreeSearch` force their path; `Hybrid` lets the classifier decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchPath {
    Embeddings,
    TreeSearch,
    Hybrid,
}

impl BenchPath {
    fn route_options(&self) -> RouteOptions {
        match self {
            BenchPath::Embeddings => RouteOptions::forcing(RetrievalPath::Embeddings),
            BenchPath::TreeSearch => RouteOptions::forcing(RetrievalPath::PageIndex),
            BenchPath::Hybrid => RouteOptions::new(),
        }
    }

    pub const ALL: [BenchPath; 3] = [BenchPath::Embeddings, BenchPath::TreeSearch, BenchPath::Hybrid];
}

impl std::fmt::Display for BenchPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BenchPath::Embeddings => write!(f, "embeddings"),
            BenchPath::TreeSearch => write!(f, "tree_search"),
            BenchPath::Hybrid => write!(f, "hybrid"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BenchmarkOptions {
    pub paths: Vec<BenchPath>,
    pub query_types: Vec<QueryType>,
    /// Cap per query type; `None` runs all 50.
    pub max_queries_per_type: Option<usize>,
    /// Unmeasured queries run first to warm caches.
    pub warmup: usize,
    pub timeout_ms: u64,
}

impl BenchmarkOptions {
    pub fn new() -> Self {
        Self::from_config(&BenchmarkConfig::default())
    }

    pub fn from_config(config: &BenchmarkConfig) -> Self {
        Self {
            paths: BenchPath::ALL.to_vec(),
            query_types: vec![
                QueryType::Simple,
                QueryType::Complex,
                QueryType::Legal,
                QueryType::Mixed,
            ],
            max_queries_per_type: None,
            warmup: config.warmup_queries,
            timeout_ms: config.query_timeout_ms,
        }
    }
}

impl Default for BenchmarkOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// One (query, path) measurement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRunRecord {
    pub query_id: String,
    pub path: BenchPath,
    pub latency_ms: u64,
    pub result_count: usize,
    pub confidence: f32,
    pub accuracy: f64,
    /// Set when the run timed out; such runs count as failures.
    pub error: Option<String>,
}

/// Verdict on whether the hybrid configuration earns its keep: it must hold
/// at least 95% of the best single path's accuracy while keeping p95 under
/// three seconds. Each criterion is reported on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptanceReport {
    pub passed: bool,
    pub accuracy_ok: bool,
    pub accuracy_detail: String,
    pub latency_ok: bool,
    pub latency_detail: String,
    pub hybrid_accuracy: f64,
    pub best_single_accuracy: f64,
    pub hybrid_p95_ms: u64,
}

const ACCEPTANCE_ACCURACY_RATIO: f64 = 0.95;
const ACCEPTANCE_P95_MS: u64 = 3000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub records: Vec<QueryRunRecord>,
    pub path_stats: Vec<PathStatistics>,
    pub comparisons: Vec<PathComparison>,
    /// Highest weighted score (accuracy 60%, latency 40%).
    pub best_path: BenchPath,
    /// Only present when all three paths were benchmarked.
    pub acceptance: Option<AcceptanceReport>,
    pub total_queries: usize,
    pub duration_ms: u64,
}

pub struct BenchmarkHarness {
    facade: Arc<HybridFacade>,
}

impl BenchmarkHarness {
    pub fn new(facade: Arc<HybridFacade>) -> Self {
        Self { facade }
    }

    /// Run the corpus subset selected by `options` through every requested
    /// path, sequentially so runs never contend with each other.
    pub async fn run_benchmark(&self, options: &BenchmarkOptions) -> BenchmarkResult {
        let started = Instant::now();
        let queries = select_queries(options);
        info!(
            queries = queries.len(),
            paths = options.paths.len(),
            "benchmark starting"
        );

        for query in queries.iter().take(options.warmup) {
            let _ = self.facade.search(&query.text, &RouteOptions::new()).await;
        }

        let timeout = Duration::from_millis(options.timeout_ms);
        let mut records = Vec::with_capacity(queries.len() * options.paths.len());
        for query in &queries {
            for path in &options.paths {
                records.push(self.run_one(query, *path, timeout).await);
            }
        }

        let path_stats: Vec<PathStatistics> = options
            .paths
            .iter()
            .map(|path| compute_path_statistics(*path, &records))
            .collect();

        let mut comparisons = Vec::new();
        for i in 0..path_stats.len() {
            for j in i + 1..path_stats.len() {
                comparisons.push(compare_paths(&path_stats[i], &path_stats[j]));
            }
        }

        let best_path = path_stats
            .iter()
            .max_by(|a, b| {
                weighted_score(a)
                    .partial_cmp(&weighted_score(b))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|s| s.path)
            .unwrap_or(BenchPath::Hybrid);

        let acceptance = acceptance_report(&path_stats);

        info!(
            best_path = %best_path,
            duration_ms = started.elapsed().as_millis() as u64,
            "benchmark finished"
        );

        BenchmarkResult {
            records,
            path_stats,
            comparisons,
            best_path,
            acceptance,
            total_queries: queries.len(),
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Small smoke run: five queries per type, all paths.
    pub async fn run_quick_benchmark(&self) -> BenchmarkResult {
        let mut options = BenchmarkOptions::new();
        options.max_queries_per_type = Some(5);
        self.run_benchmark(&options).await
    }

    async fn run_one(
        &self,
        query: &BenchmarkQuery,
        path: BenchPath,
        timeout: Duration,
    ) -> QueryRunRecord {
        let route_options = path.route_options();
        match tokio::time::timeout(timeout, self.facade.search(&query.text, &route_options)).await {
            Ok(result) => QueryRunRecord {
                query_id: query.id.clone(),
                path,
                latency_ms: result.latency_ms,
                result_count: result.metadata.result_count,
                confidence: result.confidence,
                accuracy: accuracy_score(&result.context, &query.expected_keywords),
                error: None,
            },
            Err(_) => {
                warn!(query_id = %query.id, path = %path, "benchmark query timed out");
                QueryRunRecord {
                    query_id: query.id.clone(),
                    path,
                    latency_ms: timeout.as_millis() as u64,
                    result_count: 0,
                    confidence: 0.0,
                    accuracy: 0.0,
                    error: Some(format!("timed out after {}ms", timeout.as_millis())),
                }
            }
        }
    }
}

fn select_queries(options: &BenchmarkOptions) -> Vec<BenchmarkQuery> {
    let corpus = benchmark_corpus();
    let mut selected = Vec::new();
    for query_type in &options.query_types {
        let of_type = corpus.iter().filter(|q| q.query_type == *query_type);
        match options.max_queries_per_type {
            Some(cap) => selected.extend(of_type.take(cap).cloned()),
            None => selected.extend(of_type.cloned()),
        }
    }
    selected
}

fn acceptance_report(path_stats: &[PathStatistics]) -> Option<AcceptanceReport> {
    let stat = |path: BenchPath| path_stats.iter().find(|s| s.path == path);
    let hybrid = stat(BenchPath::Hybrid)?;
    let embeddings = stat(BenchPath::Embeddings)?;
    let tree = stat(BenchPath::TreeSearch)?;

    let best_single_accuracy = embeddings.accuracy.avg.max(tree.accuracy.avg);
    let accuracy_ok = hybrid.accuracy.avg >= best_single_accuracy * ACCEPTANCE_ACCURACY_RATIO;
    let latency_ok = hybrid.latency.p95 < ACCEPTANCE_P95_MS;

    let accuracy_detail = format!(
        "hybrid accuracy {:.3} {} {:.0}% of best single path {:.3}",
        hybrid.accuracy.avg,
        if accuracy_ok { "holds" } else { "falls below" },
        ACCEPTANCE_ACCURACY_RATIO * 100.0,
        best_single_accuracy
    );
    let latency_detail = format!(
        "hybrid p95 {}ms {} the {}ms budget",
        hybrid.latency.p95,
        if latency_ok { "within" } else { "exceeds" },
        ACCEPTANCE_P95_MS
    );

    Some(AcceptanceReport {
        passed: accuracy_ok && latency_ok,
        accuracy_ok,
        accuracy_detail,
        latency_ok,
        latency_detail,
        hybrid_accuracy: hybrid.accuracy.avg,
        best_single_accuracy,
        hybrid_p95_ms: hybrid.latency.p95,
    })
}

/// Human-readable report, one block per path plus comparisons and verdict.
pub fn format_report(result: &BenchmarkResult) -> String {
    let mut out = String::new();
    out.push_str("=== Retrieval Benchmark Report ===\n");
    out.push_str(&format!(
        "Queries: {}  Runs: {}  Duration: {}ms\n\n",
        result.total_queries,
        result.records.len(),
        result.duration_ms
    ));

    for stats in &result.path_stats {
        out.push_str(&format!("--- {} ---\n", stats.path));
        out.push_str(&format!(
            "  runs: {} ({} ok, {} failed, {} fallbacks)\n",
            stats.total_runs, stats.successes, stats.failures, stats.fallback_count
        ));
        out.push_str(&format!(
            "  latency ms: p50={} p95={} p99={} avg={:.1}\n",
            stats.latency.p50, stats.latency.p95, stats.latency.p99, stats.latency.avg
        ));
        out.push_str(&format!(
            "  accuracy: avg={:.3} perfect={}  confidence: avg={:.3}\n",
            stats.accuracy.avg, stats.accuracy.perfect_matches, stats.confidence.avg
        ));
    }

    if !result.comparisons.is_empty() {
        out.push_str("\nComparisons:\n");
        for comparison in &result.comparisons {
            out.push_str(&format!(
                "  {} vs {}: {}\n",
                comparison.left, comparison.right, comparison.recommendation
            ));
        }
    }

    out.push_str(&format!("\nBest path: {}\n", result.best_path));
    if let Some(acceptance) = &result.acceptance {
        let mark = |ok: bool| if ok { "PASS" } else { "FAIL" };
        out.push_str(&format!(
            "Acceptance: {}\n  accuracy {}: {}\n  latency {}: {}\n",
            mark(acceptance.passed),
            mark(acceptance.accuracy_ok),
            acceptance.accuracy_detail,
            mark(acceptance.latency_ok),
            acceptance.latency_detail
        ));
    }
    out
}
