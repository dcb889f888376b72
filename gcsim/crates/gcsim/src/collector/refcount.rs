//! Reference-counting collector with eager cascade.
//!
//! Every object carries `ref_count == in_degree + (1 if root)`. Removing an
//! edge or a root flag decrements the target; when the count reaches exactly
//! zero the object is deleted on the spot and its own outgoing edges are
//! released, which may cascade further.
//!
//! Cycles are never reclaimed: members of an unreachable cycle keep each
//! other's counts above zero. `detect_leaks()` exists to surface them.

use rustc_hash::FxHashSet;

use crate::collector::{Collector, CollectorCore};
use crate::config::{GcConfig, Strategy};
use crate::error::{GcError, Result};
use crate::heap::ObjectId;
use crate::logging::{BoxedSink, GcEvent};
use crate::stats::GcTimer;

pub struct RefCountCollector {
    core: CollectorCore,
}

/// Pending cascade work for one object
///
/// Children are released one at a time so a child whose count hits zero
/// is finished before its next sibling is decremented, matching a
/// recursive post-order walk.
struct Frame {
    id: ObjectId,
    children: Vec<ObjectId>,
    next: usize,
}

impl RefCountCollector {
    pub fn new(config: &GcConfig, sink: BoxedSink) -> Self {
        Self {
            core: CollectorCore::new(Strategy::RefCount, config, sink),
        }
    }

    /// Explicit count of an object, `None` if unknown
    pub fn ref_count(&self, id: ObjectId) -> Option<u32> {
        self.core.heap.get(id).map(|record| record.ref_count)
    }

    /// Decrement `to` on behalf of `from` (`None` for the root flag)
    ///
    /// A count already at zero is left at zero, reported as an anomaly and
    /// returned as `RefCountUnderflow`.
    fn release(&mut self, from: Option<ObjectId>, to: ObjectId) -> Result<u32> {
        let step = self.core.heap.step();
        let Some(record) = self.core.heap.get_mut(to) else {
            return Err(GcError::UnknownObject(to));
        };

        if record.ref_count == 0 {
            self.core.stats.record_anomaly();
            log::error!("reference count underflow on {}, clamped to 0", to);
            self.core.emit(GcEvent::Anomaly {
                object: to,
                message: "reference count would go negative".to_string(),
                step,
            });
            return Err(GcError::RefCountUnderflow(to));
        }

        record.ref_count -= 1;
        let ref_count = record.ref_count;
        self.core.emit(GcEvent::RemoveRef {
            from,
            to,
            ref_count,
            step,
        });
        Ok(ref_count)
    }

    fn retain(&mut self, from: Option<ObjectId>, to: ObjectId) {
        let step = self.core.heap.step();
        let ref_count = match self.core.heap.get_mut(to) {
            Some(record) => {
                record.ref_count += 1;
                record.ref_count
            },
            None => return,
        };
        self.core.emit(GcEvent::AddRef {
            from,
            to,
            ref_count,
            step,
        });
    }

    /// Delete `start` and everything whose count drops to zero as a result
    ///
    /// Only an alive, non-root object with a zero count is deleted; anything
    /// else makes this a no-op. Each object is finalized at most once per
    /// cascade, children before their parent. Returns bytes freed.
    pub fn cascade_delete(&mut self, start: ObjectId) -> usize {
        let mut visited = FxHashSet::default();
        let mut stack: Vec<Frame> = Vec::new();
        let mut freed = 0;

        if let Some(frame) = self.enter(start, &mut visited) {
            stack.push(frame);
        }

        while let Some(frame) = stack.last_mut() {
            let parent = frame.id;
            match frame.children.get(frame.next).copied() {
                Some(child) => {
                    frame.next += 1;
                    match self.release(Some(parent), child) {
                        Ok(0) => {
                            if let Some(frame) = self.enter(child, &mut visited) {
                                stack.push(frame);
                            }
                        },
                        Ok(_) => {},
                        Err(e) => log::error!("cascade from {}: {}", parent, e),
                    }
                },
                None => {
                    stack.pop();
                    freed += self.core.reclaim(parent);
                },
            }
        }

        freed
    }

    /// Claim an object for deletion and detach its outgoing edges
    fn enter(&mut self, id: ObjectId, visited: &mut FxHashSet<ObjectId>) -> Option<Frame> {
        if !visited.insert(id) {
            return None;
        }

        match self.core.heap.get(id) {
            Some(record) if record.is_alive() && !record.is_root() && record.ref_count == 0 => {},
            Some(record) if record.is_alive() => {
                log::debug!(
                    "cascade skips {}: count {}, root {}",
                    id,
                    record.ref_count,
                    record.is_root()
                );
                return None;
            },
            _ => return None,
        }

        let children = self.core.heap.detach_outgoing(id);
        Some(Frame {
            id,
            children,
            next: 0,
        })
    }
}

impl Collector for RefCountCollector {
    fn strategy(&self) -> Strategy {
        Strategy::RefCount
    }

    fn core(&self) -> &CollectorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CollectorCore {
        &mut self.core
    }

    /// Reclaim alive, non-root objects whose count is zero
    ///
    /// Objects that were allocated and never referenced only die here;
    /// anything with a positive count, cycles included, survives.
    fn collect(&mut self) -> usize {
        let timer = GcTimer::start();
        let before = self.core.stats.objects_collected;

        let zero: Vec<ObjectId> = self
            .core
            .heap
            .alive_objects()
            .filter(|record| !record.is_root() && record.ref_count == 0)
            .map(|record| record.id())
            .collect();

        let mut freed = 0;
        for id in zero {
            freed += self.cascade_delete(id);
        }

        let objects = (self.core.stats.objects_collected - before) as usize;
        self.core.finish_collection(timer, freed, objects);
        freed
    }

    /// Every alive object with a positive count
    ///
    /// Over-approximates while roots are still set: rooted objects and
    /// everything they keep alive are flagged as well.
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
            .filter(|record| record.ref_count > 0)
            .map(|record| record.id())
            .collect();
        self.core.report_leaks(leaked)
    }

    fn add_reference(&mut self, from: ObjectId, to: ObjectId) -> Result<()> {
        if !self.core.heap.link(from, to)? {
            log::trace!("reference {} -> {} already present", from, to);
            return Ok(());
        }
        self.retain(Some(from), to);
        Ok(())
    }

    fn remove_reference(&mut self, from: ObjectId, to: ObjectId) -> Result<()> {
        self.core.heap.unlink(from, to)?;
        if self.release(Some(from), to)? == 0 {
            self.cascade_delete(to);
        }
        Ok(())
    }

    fn mark_root(&mut self, id: ObjectId) -> Result<()> {
        if self.core.heap.set_root(id, true)? {
            self.retain(None, id);
        }
        Ok(())
    }

    fn unmark_root(&mut self, id: ObjectId) -> Result<()> {
        if !self.core.heap.set_root(id, false)? {
            return Ok(());
        }
        if self.release(None, id)? == 0 {
            self.cascade_delete(id);
        }
        Ok(())
    }
}
