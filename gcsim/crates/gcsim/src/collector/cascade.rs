//! Cascade (orphan-deletion) collector.
//!
//! An object is an orphan when it is alive, not a root and has no incoming
//! edges. Orphans are deleted through a breadth-first cascade: deleting an
//! object drops its outgoing edges, which may orphan its children, which
//! are queued in turn.
//!
//! Two entry points feed the same cascade:
//! - reactive: `remove_reference` cascades immediately when the target is
//!   left orphaned
//! - batch: `collect()` scans the whole heap for orphans first, which also
//!   catches objects orphaned by `unmark_root`
//!
//! Like reference counting, a cycle with no outside references is never
//! orphaned and never reclaimed.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use crate::collector::{Collector, CollectorCore};
use crate::config::{GcConfig, Strategy};
use crate::error::Result;
use crate::heap::ObjectId;
use crate::logging::{BoxedSink, GcEvent};
use crate::stats::GcTimer;

pub struct CascadeCollector {
    core: CollectorCore,
}

impl CascadeCollector {
    pub fn new(config: &GcConfig, sink: BoxedSink) -> Self {
        Self {
            core: CollectorCore::new(Strategy::Cascade, config, sink),
        }
    }

    /// Orphan predicate shared by both deletion paths
    pub fn is_orphan(&self, id: ObjectId) -> bool {
        self.core
            .heap
            .get(id)
            .map_or(false, |record| record.is_orphan())
    }

    /// Phase 1 of a batch collection: every current orphan, in id order
    pub fn find_orphans(&self) -> Vec<ObjectId> {
        self.core.heap.orphans()
    }

    /// Breadth-first cascade starting at `start`
    ///
    /// `start` must be an orphan, otherwise nothing happens. A root pulled
    /// from the work list stops that branch. Returns bytes freed.
    pub fn cascade_delete(&mut self, start: ObjectId) -> usize {
        let mut queue = VecDeque::from([start]);
        let mut processed: FxHashSet<ObjectId> = FxHashSet::default();
        let mut freed = 0;

        while let Some(id) = queue.pop_front() {
            if !processed.insert(id) {
                continue;
            }

            match self.core.heap.get(id) {
                Some(record) if !record.is_alive() => continue,
                Some(record) if record.is_root() => {
                    log::debug!("cascade stops at root {}", id);
                    continue;
                },
                Some(record) if !record.is_orphan() => {
                    log::debug!("cascade skips {}: {} incoming", id, record.in_degree());
                    continue;
                },
                Some(_) => {},
                None => continue,
            }

            let step = self.core.heap.step();
            for child in self.core.heap.detach_outgoing(id) {
                let ref_count = self.core.reference_count(child);
                self.core.emit(GcEvent::RemoveRef {
                    from: Some(id),
                    to: child,
                    ref_count,
                    step,
                });
                if self.is_orphan(child) && !processed.contains(&child) {
                    queue.push_back(child);
                }
            }

            freed += self.core.reclaim(id);
        }

        freed
    }
}

impl Collector for CascadeCollector {
    fn strategy(&self) -> Strategy {
        Strategy::Cascade
    }

    fn core(&self) -> &CollectorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CollectorCore {
        &mut self.core
    }

    /// Batch path: scan for orphans, then cascade from each
    fn collect(&mut self) -> usize {
        let timer = GcTimer::start();
        let before = self.core.stats.objects_collected;

        let orphans = self.find_orphans();
        log::debug!("orphan scan found {} objects", orphans.len());

        let mut freed = 0;
        for id in orphans {
            if self.is_orphan(id) {
                freed += self.cascade_delete(id);
            }
        }

        let objects = (self.core.stats.objects_collected - before) as usize;
        self.core.finish_collection(timer, freed, objects);
        freed
    }

    /// Every alive object with at least one reference (edge or root flag)
    ///
    /// Same over-approximation as reference counting while roots are set.
    fn detect_leaks(&mut self) -> Vec<ObjectId> {
        let roots = self.core.heap.roots().len();
        if roots > 0 {
            log::warn!(
                "leak scan with {} live roots also flags objects they keep alive",
                roots
            );
        }

        let leaked = self
            .core
            .heap
            .alive_objects()
            .filter(|record| record.reference_count() > 0)
            .map(|record| record.id())
            .collect();
        self.core.report_leaks(leaked)
    }

    /// Reactive path: cascade at once if `to` is left orphaned
    fn remove_reference(&mut self, from: ObjectId, to: ObjectId) -> Result<()> {
        self.core.heap.unlink(from, to)?;

        let ref_count = self.core.reference_count(to);
        let step = self.core.heap.step();
        self.core.emit(GcEvent::RemoveRef {
            from: Some(from),
            to,
            ref_count,
            step,
        });

        if self.is_orphan(to) {
            log::debug!("{} orphaned by removal of {} -> {}", to, from, to);
            self.cascade_delete(to);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemorySink;

    fn collector() -> (CascadeCollector, MemorySink) {
        let sink = MemorySink::new();
        let config = GcConfig::default()
            .with_strategy(Strategy::Cascade)
            .with_capacity(1024);
        (CascadeCollector::new(&config, Box::new(sink.clone())), sink)
    }

    #[test]
    fn test_reactive_cascade_on_edge_removal() {
        let (mut gc, sink) = collector();
        let root = gc.allocate(8).unwrap();
        let a = gc.allocate(8).unwrap();
        let b = gc.allocate(8).unwrap();
        gc.mark_root(root).unwrap();
        gc.add_reference(root, a).unwrap();
        gc.add_reference(a, b).unwrap();

        gc.remove_reference(root, a).unwrap();

        assert_eq!(gc.heap().alive_ids(), vec![root]);
        assert_eq!(sink.count("delete"), 2);
        gc.check_invariants().unwrap();
    }

    #[test]
    fn test_cascade_stops_at_shared_child() {
        let (mut gc, _) = collector();
        let root = gc.allocate(8).unwrap();
        let a = gc.allocate(8).unwrap();
        let shared = gc.allocate(8).unwrap();
        gc.mark_root(root).unwrap();
        gc.add_reference(root, a).unwrap();
        gc.add_reference(root, shared).unwrap();
        gc.add_reference(a, shared).unwrap();

        gc.remove_reference(root, a).unwrap();

        assert!(!gc.heap().is_alive(a));
        assert!(gc.heap().is_alive(shared));
    }

    #[test]
    fn test_unmark_root_waits_for_collect() {
        let (mut gc, _) = collector();
        let root = gc.allocate(8).unwrap();
        let child = gc.allocate(8).unwrap();
        gc.mark_root(root).unwrap();
        gc.add_reference(root, child).unwrap();

        gc.unmark_root(root).unwrap();
        assert_eq!(gc.alive_count(), 2);
        assert_eq!(gc.find_orphans(), vec![root]);

        assert_eq!(gc.collect(), 16);
        assert_eq!(gc.alive_count(), 0);
    }

    #[test]
    fn test_cascade_delete_requires_orphan() {
        let (mut gc, _) = collector();
        let root = gc.allocate(8).unwrap();
        let child = gc.allocate(8).unwrap();
        gc.mark_root(root).unwrap();
        gc.add_reference(root, child).unwrap();

        assert_eq!(gc.cascade_delete(root), 0);
        assert_eq!(gc.cascade_delete(child), 0);
        assert_eq!(gc.alive_count(), 2);
    }

    #[test]
    fn test_two_cycle_never_orphaned() {
        let (mut gc, _) = collector();
        let a = gc.allocate(8).unwrap();
        let b = gc.allocate(8).unwrap();
        gc.add_reference(a, b).unwrap();
        gc.add_reference(b, a).unwrap();

        assert_eq!(gc.collect(), 0);
        assert_eq!(gc.detect_leaks(), vec![a, b]);
    }
}
