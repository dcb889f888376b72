//! Marker Module - Reachability Tracing
//!
//! Depth-first traversal from the root set over outgoing edges. The
//! traversal runs on an explicit [`MarkStack`] so that graph depth never
//! turns into call-stack depth, and visits nodes in the same preorder a
//! recursive walk would: children are pushed in reverse so the first
//! outgoing edge is popped first.
//!
//! A node is expanded at most once, which keeps tracing O(V + E) and makes
//! it terminate on cycles.

pub mod mark_stack;

pub use mark_stack::{MarkStack, MarkStackStats};

use rustc_hash::FxHashSet;

use crate::heap::{Heap, ObjectId};

/// Result of one trace over the heap
#[derive(Debug, Default, Clone)]
pub struct Trace {
    /// Every object reachable from an alive root
    pub reachable: FxHashSet<ObjectId>,
    /// Reachable objects in visitation order
    pub order: Vec<ObjectId>,
    pub stats: MarkStats,
}

impl Trace {
    pub fn is_reachable(&self, id: ObjectId) -> bool {
        self.reachable.contains(&id)
    }
}

/// Counters from one mark phase
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MarkStats {
    pub roots: usize,
    pub marked: usize,
    pub edges_scanned: usize,
}

/// Trace the heap without touching mark bits
pub fn trace(heap: &Heap) -> Trace {
    let mut result = Trace::default();
    let mut stack = MarkStack::new();

    for root in heap.roots() {
        result.stats.roots += 1;
        stack.push(root);

        while let Some(id) = stack.pop() {
            if !heap.is_alive(id) || !result.reachable.insert(id) {
                continue;
            }
            result.order.push(id);

            let Some(record) = heap.get(id) else {
                continue;
            };
            for child in record.outgoing().collect::<Vec<_>>().into_iter().rev() {
                result.stats.edges_scanned += 1;
                if !result.reachable.contains(&child) {
                    stack.push(child);
                }
            }
        }
    }

    result.stats.marked = result.order.len();
    log::trace!(
        "trace: {} roots, {} reachable, {} edges scanned, stack peak {}",
        result.stats.roots,
        result.stats.marked,
        result.stats.edges_scanned,
        stack.stats().peak
    );
    result
}

/// Mark phase: clear every mark bit, then set it on each reachable object
pub fn mark_from_roots(heap: &mut Heap) -> Trace {
    heap.clear_marks();
    let trace = trace(heap);
    for &id in &trace.order {
        if let Some(record) = heap.get_mut(id) {
            record.marked = true;
        }
    }
    trace
}
