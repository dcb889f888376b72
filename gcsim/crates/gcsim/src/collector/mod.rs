//! Collector Module - Strategy Engines
//!
//! Every strategy exposes the same capability surface, the [`Collector`]
//! trait. Shared state (heap, statistics, event sink) lives in a
//! [`CollectorCore`] owned by each engine; the trait's provided methods
//! implement the behavior the graph-based strategies have in common and
//! the engines override what differs.
//!
//! | Strategy | Edge removal | `collect()` | Cycles |
//! |----------|--------------|-------------|--------|
//! | [`MarkSweepCollector`] | unlink only | mark from roots, sweep the rest | reclaimed |
//! | [`RefCountCollector`] | decrement, cascade at zero | cascade zero-count objects | leaked |
//! | [`CascadeCollector`] | cascade if target orphaned | orphan scan, then cascade | leaked |

pub mod cascade;
pub mod mark_sweep;
pub mod refcount;

pub use cascade::CascadeCollector;
pub use mark_sweep::MarkSweepCollector;
pub use refcount::RefCountCollector;

use std::io;

use crate::config::{GcConfig, Strategy};
use crate::error::{GcError, Result};
use crate::heap::{Heap, ObjectId, ObjectRecord};
use crate::logging::{BoxedSink, GcEvent};
use crate::stats::{GcStats, GcTimer};

/// State shared by every collector engine
pub struct CollectorCore {
    pub(crate) heap: Heap,
    pub(crate) stats: GcStats,
    sink: BoxedSink,
    strategy: Strategy,
    threshold: usize,
    verbose: bool,
}

impl CollectorCore {
    pub(crate) fn new(strategy: Strategy, config: &GcConfig, sink: BoxedSink) -> Self {
        Self {
            heap: Heap::new(config.capacity),
            stats: GcStats::new(),
            sink,
            strategy,
            threshold: config.collection_threshold.min(config.capacity),
            verbose: config.verbose,
        }
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn stats(&self) -> &GcStats {
        &self.stats
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Used-bytes level above which allocation forces a collection
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub(crate) fn emit(&mut self, event: GcEvent) {
        if self.verbose {
            log::debug!("{}", event);
        }
        self.sink.record(&event);
    }

    /// Count reported in events: the explicit count under reference
    /// counting, in-degree plus root flag otherwise
    pub(crate) fn reference_count(&self, id: ObjectId) -> u32 {
        match self.heap.get(id) {
            Some(record) if self.strategy == Strategy::RefCount => record.ref_count,
            Some(record) => record.reference_count(),
            None => 0,
        }
    }

    /// Charge a new object against the heap and announce it
    pub(crate) fn admit(&mut self, size: usize) -> Result<ObjectId> {
        let id = self.heap.insert(size)?;
        let step = self.heap.step();
        self.emit(GcEvent::Allocate {
            object: id,
            size,
            step,
        });
        Ok(id)
    }

    /// Kill one object, update statistics and announce the deletion
    pub(crate) fn reclaim(&mut self, id: ObjectId) -> usize {
        let size = self.heap.release(id);
        if size > 0 {
            self.stats.record_deletion(size);
            let step = self.heap.step();
            self.emit(GcEvent::Delete {
                object: id,
                size,
                step,
            });
        }
        size
    }

    pub(crate) fn finish_collection(&mut self, timer: GcTimer, freed: usize, objects: usize) {
        let duration = timer.elapsed();
        self.stats.record_collection(duration);

        let cycle = self.stats.collections_run;
        log::info!(
            "{} collection #{}: freed {} bytes in {} objects ({:.3} ms), {} alive",
            self.strategy,
            cycle,
            freed,
            objects,
            timer.elapsed_ms(),
            self.heap.alive_count()
        );

        let step = self.heap.step();
        self.emit(GcEvent::Collection {
            strategy: self.strategy,
            cycle,
            freed_bytes: freed,
            objects_collected: objects,
            duration_us: u64::try_from(duration.as_micros()).unwrap_or(u64::MAX),
            step,
        });
    }

    /// Emit a leak event per id and count them
    pub(crate) fn report_leaks(&mut self, ids: Vec<ObjectId>) -> Vec<ObjectId> {
        let step = self.heap.step();
        for &id in &ids {
            let ref_count = self.reference_count(id);
            self.emit(GcEvent::Leak {
                object: id,
                ref_count,
                step,
            });
        }
        if !ids.is_empty() {
            log::warn!("{} leak scan flagged {} objects", self.strategy, ids.len());
        }
        self.stats.record_leaks(ids.len());
        ids
    }

    pub(crate) fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }

    pub(crate) fn close(&mut self) -> io::Result<()> {
        self.sink.close()
    }
}

/// Capability surface shared by every collection strategy
///
/// Mutating operations report failure through [`GcError`] and leave the
/// heap untouched when they fail validation.
pub trait Collector {
    fn strategy(&self) -> Strategy;

    fn core(&self) -> &CollectorCore;

    fn core_mut(&mut self) -> &mut CollectorCore;

    /// Run a collection, returning the bytes freed
    fn collect(&mut self) -> usize;

    /// Report objects this strategy considers leaked
    fn detect_leaks(&mut self) -> Vec<ObjectId>;

    /// Allocate `size` bytes, collecting once under allocation pressure
    fn allocate(&mut self, size: usize) -> Result<ObjectId> {
        let capacity = self.core().heap.capacity();
        if size == 0 || size > capacity {
            return Err(GcError::InvalidSize { size, capacity });
        }

        let threshold = self.core().threshold();
        if !self.core().heap.fits_under(size, threshold) {
            log::debug!(
                "allocation of {} bytes crosses threshold ({} of {} used), collecting",
                size,
                self.core().heap.used_bytes(),
                threshold
            );
            self.collect();
        }

        if !self.core().heap.fits_under(size, capacity) {
            let available = self.core().heap.free_bytes();
            log::warn!(
                "out of memory: requested {} bytes, {} available",
                size,
                available
            );
            return Err(GcError::OutOfMemory {
                requested: size,
                available,
            });
        }

        self.core_mut().admit(size)
    }

    /// Add `from -> to`; an existing edge is a successful no-op
    fn add_reference(&mut self, from: ObjectId, to: ObjectId) -> Result<()> {
        let core = self.core_mut();
        if !core.heap.link(from, to)? {
            log::trace!("reference {} -> {} already present", from, to);
            return Ok(());
        }

        let ref_count = core.reference_count(to);
        let step = core.heap.step();
        core.emit(GcEvent::AddRef {
            from: Some(from),
            to,
            ref_count,
            step,
        });
        Ok(())
    }

    /// Remove `from -> to`
    fn remove_reference(&mut self, from: ObjectId, to: ObjectId) -> Result<()> {
        let core = self.core_mut();
        core.heap.unlink(from, to)?;

        let ref_count = core.reference_count(to);
        let step = core.heap.step();
        core.emit(GcEvent::RemoveRef {
            from: Some(from),
            to,
            ref_count,
            step,
        });
        Ok(())
    }

    /// Set the root flag; marking an existing root is a no-op
    fn mark_root(&mut self, id: ObjectId) -> Result<()> {
        let core = self.core_mut();
        if core.heap.set_root(id, true)? {
            let ref_count = core.reference_count(id);
            let step = core.heap.step();
            core.emit(GcEvent::AddRef {
                from: None,
                to: id,
                ref_count,
                step,
            });
        }
        Ok(())
    }

    /// Clear the root flag; unmarking a non-root is a no-op
    fn unmark_root(&mut self, id: ObjectId) -> Result<()> {
        let core = self.core_mut();
        if core.heap.set_root(id, false)? {
            let ref_count = core.reference_count(id);
            let step = core.heap.step();
            core.emit(GcEvent::RemoveRef {
                from: None,
                to: id,
                ref_count,
                step,
            });
        }
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    fn heap(&self) -> &Heap {
        &self.core().heap
    }

    fn stats(&self) -> &GcStats {
        &self.core().stats
    }

    fn object(&self, id: ObjectId) -> Option<&ObjectRecord> {
        self.core().heap.get(id)
    }

    fn alive_count(&self) -> usize {
        self.core().heap.alive_count()
    }

    /// Bytes held by alive objects
    fn used_bytes(&self) -> usize {
        self.core().heap.used_bytes()
    }

    fn free_bytes(&self) -> usize {
        self.core().heap.free_bytes()
    }

    /// Current reference count of an object, `None` if unknown
    fn reference_count(&self, id: ObjectId) -> Option<u32> {
        self.core().heap.get(id)?;
        Some(self.core().reference_count(id))
    }

    /// Verify heap invariants for this strategy
    fn check_invariants(&self) -> Result<()> {
        self.core()
            .heap
            .check_invariants(self.strategy() == Strategy::RefCount)
    }

    // ========================================================================
    // Driver hooks
    // ========================================================================

    /// Set the simulation step stamped on subsequent events and records
    fn set_step(&mut self, step: u64) {
        self.core_mut().heap.set_step(step);
    }

    fn flush_events(&mut self) -> io::Result<()> {
        self.core_mut().flush()
    }

    /// Flush and close the event sink
    fn close_events(&mut self) -> io::Result<()> {
        self.core_mut().close()
    }
}
