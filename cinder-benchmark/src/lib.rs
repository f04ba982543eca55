use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct BenchmarkMetrics {
    // Load Stats
    pub total_chunks_loaded: AtomicUsize,
    pub total_load_time_us: AtomicU64,
    pub max_load_time_us: AtomicU64,
    pub total_chunks_missing: AtomicUsize,
    pub total_load_failures: AtomicUsize,

    // Save Stats
    pub total_chunks_saved: AtomicUsize,
    pub total_save_time_us: AtomicU64,
    pub max_save_time_us: AtomicU64,
    pub total_save_failures: AtomicUsize,

    // Region handle cache
    pub total_cache_hits: AtomicUsize,
    pub total_cache_misses: AtomicUsize,
    pub total_regions_opened: AtomicUsize,
    pub total_regions_created: AtomicUsize,

    // Recovered per-block / per-record problems
    pub total_diagnostics: AtomicUsize,

    // Session
    pub start_time: Option<Instant>,
    pub config_summary: String,
}

impl BenchmarkMetrics {
    pub fn new(config_summary: String) -> Self {
        Self {
            start_time: Some(Instant::now()),
            config_summary,
            ..Default::default()
        }
    }

    pub fn record_load(&self, duration: Duration) {
        self.total_chunks_loaded.fetch_add(1, Ordering::Relaxed);
        let us = duration.as_micros() as u64;
        self.total_load_time_us.fetch_add(us, Ordering::Relaxed);
        self.max_load_time_us.fetch_max(us, Ordering::Relaxed);
    }

    pub fn record_missing(&self) {
        self.total_chunks_missing.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load_failure(&self) {
        self.total_load_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_save(&self, duration: Duration) {
        self.total_chunks_saved.fetch_add(1, Ordering::Relaxed);
        let us = duration.as_micros() as u64;
        self.total_save_time_us.fetch_add(us, Ordering::Relaxed);
        self.max_save_time_us.fetch_max(us, Ordering::Relaxed);
    }

    pub fn record_save_failure(&self) {
        self.total_save_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.total_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.total_cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_region_opened(&self) {
        self.total_regions_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_region_created(&self) {
        self.total_regions_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_diagnostic(&self) {
        self.total_diagnostics.fetch_add(1, Ordering::Relaxed);
    }

    pub fn regions_created(&self) -> usize {
        self.total_regions_created.load(Ordering::Relaxed)
    }

    pub fn regions_opened(&self) -> usize {
        self.total_regions_opened.load(Ordering::Relaxed)
    }

    pub fn generate_report(&self) -> String {
        let uptime = self.start_time.unwrap_or_else(Instant::now).elapsed();

        let loaded = self.total_chunks_loaded.load(Ordering::Relaxed);
        let load_time = self.total_load_time_us.load(Ordering::Relaxed) as f64 / 1000.0; // ms
        let load_max = self.max_load_time_us.load(Ordering::Relaxed) as f64 / 1000.0; // ms
        let load_avg = if loaded > 0 { load_time / loaded as f64 } else { 0.0 };
        let missing = self.total_chunks_missing.load(Ordering::Relaxed);
        let load_failures = self.total_load_failures.load(Ordering::Relaxed);

        let saved = self.total_chunks_saved.load(Ordering::Relaxed);
        let save_time = self.total_save_time_us.load(Ordering::Relaxed) as f64 / 1000.0;
        let save_max = self.max_save_time_us.load(Ordering::Relaxed) as f64 / 1000.0;
        let save_avg = if saved > 0 { save_time / saved as f64 } else { 0.0 };
        let save_failures = self.total_save_failures.load(Ordering::Relaxed);

        // Cache stats
        let hits = self.total_cache_hits.load(Ordering::Relaxed);
        let misses = self.total_cache_misses.load(Ordering::Relaxed);
        let total_requests = hits + misses;
        let hit_rate = if total_requests > 0 { (hits as f64 / total_requests as f64) * 100.0 } else { 0.0 };

        let throughput = if uptime.as_secs_f64() > 0.0 {
            (loaded + saved) as f64 / uptime.as_secs_f64()
        } else { 0.0 };

        format!(
            "Cinder Loader Report\n\
             ====================\n\
             Configuration: {}\n\
             Session Duration: {:.2?}\n\n\
             [Load]\n\
             Chunks Loaded: {}\n\
             Not Found: {}\n\
             Failed: {}\n\
             Avg Time: {:.2} ms/chunk\n\
             Max Time: {:.2} ms\n\n\
             [Save]\n\
             Chunks Saved: {}\n\
             Failed: {}\n\
             Avg Time: {:.2} ms/chunk\n\
             Max Time: {:.2} ms\n\n\
             [Region Cache]\n\
             Hits: {}\n\
             Misses: {}\n\
             Hit Rate: {:.1}%\n\
             Regions Opened: {}\n\
             Regions Created: {}\n\n\
             Recovered Problems: {}\n\
             Throughput: {:.1} chunks/s\n",
            self.config_summary,
            uptime,
            loaded, missing, load_failures, load_avg, load_max,
            saved, save_failures, save_avg, save_max,
            hits, misses, hit_rate,
            self.regions_opened(), self.regions_created(),
            self.total_diagnostics.load(Ordering::Relaxed),
            throughput
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_show_up_in_report() {
        let metrics = BenchmarkMetrics::new("height=256".to_string());
        metrics.record_load(Duration::from_millis(2));
        metrics.record_load(Duration::from_millis(4));
        metrics.record_cache_hit();
        metrics.record_cache_miss();
        metrics.record_region_created();

        assert_eq!(metrics.max_load_time_us.load(Ordering::Relaxed), 4000);
        assert_eq!(metrics.regions_created(), 1);

        let report = metrics.generate_report();
        assert!(report.contains("Configuration: height=256"));
        assert!(report.contains("Chunks Loaded: 2"));
        assert!(report.contains("Avg Time: 3.00 ms/chunk"));
        assert!(report.contains("Hit Rate: 50.0%"));
    }
}
