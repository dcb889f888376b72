//! Stats Module - Collector Statistics
//!
//! Counters exposed to drivers for reporting and serialization:
//! - collections run and their pause times
//! - objects collected and bytes freed, across every deletion path
//! - leak scan hits and repaired anomalies

pub mod timer;

pub use timer::GcTimer;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Running counters for one collector instance
///
/// `objects_collected` and `bytes_freed` include reactive cascades, not only
/// explicit `collect()` calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcStats {
    /// Explicit and automatic collections
    pub collections_run: u64,
    /// Objects reclaimed by any path
    pub objects_collected: u64,
    /// Bytes reclaimed by any path
    pub bytes_freed: u64,
    /// Sum of collection pause times
    pub total_collection_time_us: u64,
    /// Longest single collection
    pub max_collection_time_us: u64,
    /// Objects flagged by leak scans
    pub leaks_detected: u64,
    /// Reference-count underflows clamped to zero
    pub anomalies: u64,
}

impl GcStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished collection's pause
    pub fn record_collection(&mut self, duration: Duration) {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        self.collections_run += 1;
        self.total_collection_time_us = self.total_collection_time_us.saturating_add(micros);
        self.max_collection_time_us = self.max_collection_time_us.max(micros);
    }

    /// Record one reclaimed object
    pub fn record_deletion(&mut self, size: usize) {
        self.objects_collected += 1;
        self.bytes_freed += size as u64;
    }

    pub fn record_leaks(&mut self, count: usize) {
        self.leaks_detected += count as u64;
    }

    pub fn record_anomaly(&mut self) {
        self.anomalies += 1;
    }

    /// Get summary statistics
    pub fn summary(&self) -> GcSummary {
        let runs = self.collections_run;
        GcSummary {
            collections_run: runs,
            objects_collected: self.objects_collected,
            bytes_freed: self.bytes_freed,
            total_time_ms: self.total_collection_time_us as f64 / 1000.0,
            avg_time_ms: if runs == 0 {
                0.0
            } else {
                self.total_collection_time_us as f64 / 1000.0 / runs as f64
            },
            max_time_ms: self.max_collection_time_us as f64 / 1000.0,
            leaks_detected: self.leaks_detected,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Display for GcStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.summary();
        writeln!(f, "Collections run:    {}", summary.collections_run)?;
        writeln!(f, "Objects collected:  {}", summary.objects_collected)?;
        writeln!(f, "Bytes freed:        {}", summary.bytes_freed)?;
        writeln!(f, "Total GC time:      {:.3} ms", summary.total_time_ms)?;
        writeln!(f, "Average GC time:    {:.3} ms", summary.avg_time_ms)?;
        writeln!(f, "Longest GC:         {:.3} ms", summary.max_time_ms)?;
        write!(f, "Leaks detected:     {}", summary.leaks_detected)
    }
}

/// Summary statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GcSummary {
    pub collections_run: u64,
    pub objects_collected: u64,
    pub bytes_freed: u64,
    pub total_time_ms: f64,
    pub avg_time_ms: f64,
    pub max_time_ms: f64,
    pub leaks_detected: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_collection_tracks_max() {
        let mut stats = GcStats::new();
        stats.record_collection(Duration::from_micros(300));
        stats.record_collection(Duration::from_micros(100));

        assert_eq!(stats.collections_run, 2);
        assert_eq!(stats.total_collection_time_us, 400);
        assert_eq!(stats.max_collection_time_us, 300);

        let summary = stats.summary();
        assert!((summary.avg_time_ms - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_summary_without_collections() {
        let summary = GcStats::new().summary();
        assert_eq!(summary.avg_time_ms, 0.0);
    }

    #[test]
    fn test_record_deletion() {
        let mut stats = GcStats::new();
        stats.record_deletion(64);
        stats.record_deletion(32);
        assert_eq!(stats.objects_collected, 2);
        assert_eq!(stats.bytes_freed, 96);
    }

    #[test]
    fn test_display_report() {
        let mut stats = GcStats::new();
        stats.record_deletion(10);
        let text = stats.to_string();
        assert!(text.contains("Objects collected:  1"));
        assert!(text.contains("Bytes freed:        10"));
    }
}
