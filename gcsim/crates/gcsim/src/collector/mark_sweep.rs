//! Mark-and-Sweep collector.
//!
//! Each `collect()` clears every mark bit, traces from the alive roots and
//! then sweeps every alive, non-root, unmarked object. Reachability is the
//! only criterion, so unreachable cycles are reclaimed like any other
//! garbage. The set of objects freed does not depend on traversal order.

use crate::collector::{Collector, CollectorCore};
use crate::config::{GcConfig, Strategy};
use crate::heap::ObjectId;
use crate::logging::BoxedSink;
use crate::marker::{self, Trace};
use crate::stats::GcTimer;

pub struct MarkSweepCollector {
    core: CollectorCore,
}

impl MarkSweepCollector {
    pub fn new(config: &GcConfig, sink: BoxedSink) -> Self {
        Self {
            core: CollectorCore::new(Strategy::MarkSweep, config, sink),
        }
    }

    /// Mark phase
    pub fn mark(&mut self) -> Trace {
        let trace = marker::mark_from_roots(&mut self.core.heap);
        log::debug!(
            "mark: {} roots, {} marked, {} edges scanned",
            trace.stats.roots,
            trace.stats.marked,
            trace.stats.edges_scanned
        );
        trace
    }

    /// Sweep phase: reclaim alive, non-root, unmarked objects
    ///
    /// Returns bytes and objects freed.
    pub fn sweep(&mut self) -> (usize, usize) {
        let garbage: Vec<ObjectId> = self
            .core
            .heap
            .alive_objects()
            .filter(|record| !record.is_root() && !record.is_marked())
            .map(|record| record.id())
            .collect();

        let mut freed = 0;
        for &id in &garbage {
            freed += self.core.reclaim(id);
        }
        log::debug!("sweep: {} objects, {} bytes", garbage.len(), freed);
        (freed, garbage.len())
    }
}

impl Collector for MarkSweepCollector {
    fn strategy(&self) -> Strategy {
        Strategy::MarkSweep
    }

    fn core(&self) -> &CollectorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CollectorCore {
        &mut self.core
    }

    fn collect(&mut self) -> usize {
        let timer = GcTimer::start();
        self.mark();
        let (freed, objects) = self.sweep();
        self.core.finish_collection(timer, freed, objects);
        freed
    }

    /// Unreachable objects still occupying the heap
    ///
    /// Traces without touching mark bits; these are exactly what the next
    /// `collect()` will sweep.
    fn detect_leaks(&mut self) -> Vec<ObjectId> {
        let trace = marker::trace(&self.core.heap);
        let unreachable = self
            .core
            .heap
            .alive_objects()
            .filter(|record| !record.is_root() && !trace.is_reachable(record.id()))
            .map(|record| record.id())
            .collect();
        self.core.report_leaks(unreachable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemorySink;

    fn collector() -> (MarkSweepCollector, MemorySink) {
        let sink = MemorySink::new();
        let config = GcConfig::default().with_capacity(1024);
        (MarkSweepCollector::new(&config, Box::new(sink.clone())), sink)
    }

    #[test]
    fn test_collect_frees_unreachable_only() {
        let (mut gc, sink) = collector();
        let root = gc.allocate(16).unwrap();
        let kept = gc.allocate(16).unwrap();
        let lost = gc.allocate(32).unwrap();
        gc.mark_root(root).unwrap();
        gc.add_reference(root, kept).unwrap();

        assert_eq!(gc.collect(), 32);
        assert!(gc.heap().is_alive(kept));
        assert!(!gc.heap().is_alive(lost));
        assert_eq!(sink.count("delete"), 1);
        assert_eq!(sink.count("collection"), 1);
        gc.check_invariants().unwrap();
    }

    #[test]
    fn test_collect_reclaims_two_cycle() {
        let (mut gc, _) = collector();
        let a = gc.allocate(16).unwrap();
        let b = gc.allocate(16).unwrap();
        gc.add_reference(a, b).unwrap();
        gc.add_reference(b, a).unwrap();

        assert_eq!(gc.collect(), 32);
        assert_eq!(gc.alive_count(), 0);
    }

    #[test]
    fn test_remove_reference_does_not_free_eagerly() {
        let (mut gc, _) = collector();
        let root = gc.allocate(16).unwrap();
        let child = gc.allocate(16).unwrap();
        gc.mark_root(root).unwrap();
        gc.add_reference(root, child).unwrap();
        gc.remove_reference(root, child).unwrap();

        assert!(gc.heap().is_alive(child));
        assert_eq!(gc.collect(), 16);
    }

    #[test]
    fn test_detect_leaks_reports_pending_garbage() {
        let (mut gc, sink) = collector();
        let root = gc.allocate(16).unwrap();
        let lost = gc.allocate(16).unwrap();
        gc.mark_root(root).unwrap();

        assert_eq!(gc.detect_leaks(), vec![lost]);
        assert_eq!(sink.count("leak"), 1);
        assert!(!gc.heap().get(root).unwrap().is_marked());
    }
}
