//! Translation metrics and observability module.
//!
//! Tracks how content requests are satisfied: cache hits (memo, loaded item,
//! or store), provider calls and failures, fallbacks, best-effort persistence
//! failures, and the audio cache.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

/// Translation and audio counters.
#[derive(Debug)]
pub struct TranslationMetrics {
    started_at: DateTime<Utc>,
    cache_hits: AtomicUsize,
    cache_misses: AtomicUsize,
    api_calls: AtomicUsize,
    api_failures: AtomicUsize,
    fallbacks: AtomicUsize,
    persist_failures: AtomicUsize,
    audio_hits: AtomicUsize,
    audio_misses: AtomicUsize,
}

static METRICS: OnceLock<TranslationMetrics> = OnceLock::new();

impl Default for TranslationMetrics {
    fn default() -> Self {
        Self {
            started_at: Utc::now(),
            cache_hits: AtomicUsize::new(0),
            cache_misses: AtomicUsize::new(0),
            api_calls: AtomicUsize::new(0),
            api_failures: AtomicUsize::new(0),
            fallbacks: AtomicUsize::new(0),
            persist_failures: AtomicUsize::new(0),
            audio_hits: AtomicUsize::new(0),
            audio_misses: AtomicUsize::new(0),
        }
    }
}

impl TranslationMetrics {
    /// A fresh set of counters, all zero, starting now.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the process-wide metrics instance.
    pub fn global() -> &'static TranslationMetrics {
        METRICS.get_or_init(TranslationMetrics::new)
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_api_call(&self) {
        self.api_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_api_failure(&self) {
        self.api_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a resolve that returned source-language content after a failure.
    pub fn record_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persist_failure(&self) {
        self.persist_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_audio_hit(&self) {
        self.audio_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_audio_miss(&self) {
        self.audio_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_hits(&self) -> usize {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> usize {
        self.cache_misses.load(Ordering::Relaxed)
    }

    pub fn api_calls(&self) -> usize {
        self.api_calls.load(Ordering::Relaxed)
    }

    pub fn api_failures(&self) -> usize {
        self.api_failures.load(Ordering::Relaxed)
    }

    pub fn fallbacks(&self) -> usize {
        self.fallbacks.load(Ordering::Relaxed)
    }

    pub fn persist_failures(&self) -> usize {
        self.persist_failures.load(Ordering::Relaxed)
    }

    /// Generate a metrics report.
    pub fn report(&self) -> MetricsReport {
        let hits = self.cache_hits();
        let misses = self.cache_misses();
        let cache_hit_rate = percentage(hits, hits + misses);

        let calls = self.api_calls();
        let failures = self.api_failures();
        let api_success_rate = percentage(calls.saturating_sub(failures), calls);

        MetricsReport {
            since: self.started_at,
            cache_hits: hits,
            cache_misses: misses,
            cache_hit_rate,
            api_calls: calls,
            api_failures: failures,
            api_success_rate,
            fallbacks: self.fallbacks(),
            persist_failures: self.persist_failures(),
            audio_hits: self.audio_hits.load(Ordering::Relaxed),
            audio_misses: self.audio_misses.load(Ordering::Relaxed),
        }
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total > 0 {
        (part as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

/// Snapshot of the counters, served by `GET /metrics`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    /// When counting began (process start for the global instance)
    pub since: DateTime<Utc>,
    pub cache_hits: usize,
    pub cache_misses: usize,
    /// Percentage (0-100)
    pub cache_hit_rate: f64,
    pub api_calls: usize,
    pub api_failures: usize,
    /// Percentage (0-100)
    pub api_success_rate: f64,
    pub fallbacks: usize,
    pub persist_failures: usize,
    pub audio_hits: usize,
    pub audio_misses: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_metrics_start_at_zero() {
        let report = TranslationMetrics::new().report();

        assert_eq!(report.cache_hits, 0);
        assert_eq!(report.cache_misses, 0);
        assert_eq!(report.cache_hit_rate, 0.0);
        assert_eq!(report.api_calls, 0);
        assert_eq!(report.api_success_rate, 0.0);
        assert_eq!(report.fallbacks, 0);
    }

    #[test]
    fn test_report_cache_hit_rate() {
        let metrics = TranslationMetrics::new();

        // 3 hits, 1 miss = 75% hit rate
        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_cache_miss();

        let report = metrics.report();
        assert_eq!(report.cache_hits, 3);
        assert_eq!(report.cache_misses, 1);
        assert_eq!(report.cache_hit_rate, 75.0);
    }

    #[test]
    fn test_report_api_success_rate() {
        let metrics = TranslationMetrics::new();

        for _ in 0..4 {
            metrics.record_api_call();
        }
        metrics.record_api_failure();

        let report = metrics.report();
        assert_eq!(report.api_calls, 4);
        assert_eq!(report.api_failures, 1);
        assert_eq!(report.api_success_rate, 75.0);
    }

    #[test]
    fn test_report_all_api_failures() {
        let metrics = TranslationMetrics::new();

        metrics.record_api_call();
        metrics.record_api_failure();
        metrics.record_api_call();
        metrics.record_api_failure();

        assert_eq!(metrics.report().api_success_rate, 0.0);
    }

    #[test]
    fn test_fallback_persist_and_audio_counters() {
        let metrics = TranslationMetrics::new();

        metrics.record_fallback();
        metrics.record_persist_failure();
        metrics.record_persist_failure();
        metrics.record_audio_hit();
        metrics.record_audio_miss();
        metrics.record_audio_miss();

        let report = metrics.report();
        assert_eq!(report.fallbacks, 1);
        assert_eq!(report.persist_failures, 2);
        assert_eq!(report.audio_hits, 1);
        assert_eq!(report.audio_misses, 2);
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let json = serde_json::to_value(TranslationMetrics::new().report()).unwrap();
        assert!(json.get("cacheHitRate").is_some());
        assert!(json.get("persistFailures").is_some());
        assert!(json["since"].is_string());
    }

    #[test]
    fn test_report_since_is_creation_time() {
        let before = Utc::now();
        let metrics = TranslationMetrics::new();
        let after = Utc::now();

        let since = metrics.report().since;
        assert!(since >= before && since <= after);
    }

    #[test]
    fn test_global_returns_same_instance() {
        let metrics1 = TranslationMetrics::global();
        let metrics2 = TranslationMetrics::global();
        assert!(std::ptr::eq(metrics1, metrics2));
    }
}
