//! Test Utilities for the gcsim Test Suite
//!
//! Fixtures wrap a collector together with an in-memory event sink so
//! every test can assert on both heap state and the event stream.
//!
//! ============================================================================
//! Assertions here are exact. A helper that tolerates drift hides bugs.
//! ============================================================================

#![allow(dead_code)]

use gcsim::{
    Collector, GarbageCollector, GcConfig, GcEvent, MemorySink, ObjectId, Strategy,
};

/// Default heap size for tests (64KB)
pub const DEFAULT_HEAP_SIZE: usize = 64 * 1024;

/// Object size used by graph builders
pub const OBJECT_SIZE: usize = 64;

/// ============================================================================
/// GC FIXTURE
/// ============================================================================

/// Test fixture for GC operations
///
/// Owns one collector and a handle on every event it emitted.
pub struct GcFixture {
    pub gc: GarbageCollector,
    pub events: MemorySink,
    pub config: GcConfig,
}

impl GcFixture {
    /// Create fixture for `strategy` with the default test heap
    ///
    /// **Bug this finds:** Configuration validation bugs, initialization failures
    pub fn new(strategy: Strategy) -> Self {
        Self::with_config(
            GcConfig::default()
                .with_strategy(strategy)
                .with_capacity(DEFAULT_HEAP_SIZE),
        )
    }

    /// Create fixture with custom heap size
    pub fn with_heap_size(strategy: Strategy, capacity: usize) -> Self {
        Self::with_config(
            GcConfig::default()
                .with_strategy(strategy)
                .with_capacity(capacity),
        )
    }

    pub fn with_config(config: GcConfig) -> Self {
        let events = MemorySink::new();
        let gc = GarbageCollector::new(config.clone(), Box::new(events.clone()))
            .expect("GC initialization should succeed with valid config");
        Self { gc, events, config }
    }

    /// One fixture per strategy
    pub fn all() -> Vec<Self> {
        Strategy::ALL.into_iter().map(Self::new).collect()
    }

    pub fn strategy(&self) -> Strategy {
        self.gc.strategy()
    }

    /// Allocate and return the id
    ///
    /// **Bug this finds:** Allocation failures, id sequencing bugs
    pub fn allocate(&mut self, size: usize) -> ObjectId {
        self.gc
            .allocate(size)
            .unwrap_or_else(|e| panic!("Allocation of {} bytes failed: {}", size, e))
    }

    pub fn allocate_many(&mut self, count: usize) -> Vec<ObjectId> {
        (0..count).map(|_| self.allocate(OBJECT_SIZE)).collect()
    }

    pub fn root(&mut self, id: ObjectId) {
        self.gc
            .mark_root(id)
            .unwrap_or_else(|e| panic!("mark_root({}) failed: {}", id, e));
    }

    pub fn unroot(&mut self, id: ObjectId) {
        self.gc
            .unmark_root(id)
            .unwrap_or_else(|e| panic!("unmark_root({}) failed: {}", id, e));
    }

    pub fn link(&mut self, from: ObjectId, to: ObjectId) {
        self.gc
            .add_reference(from, to)
            .unwrap_or_else(|e| panic!("add_reference({}, {}) failed: {}", from, to, e));
    }

    pub fn unlink(&mut self, from: ObjectId, to: ObjectId) {
        self.gc
            .remove_reference(from, to)
            .unwrap_or_else(|e| panic!("remove_reference({}, {}) failed: {}", from, to, e));
    }

    /// Chain `ids[0] -> ids[1] -> ...`
    pub fn chain(&mut self, ids: &[ObjectId]) {
        for pair in ids.windows(2) {
            self.link(pair[0], pair[1]);
        }
    }

    /// Ring `ids[0] -> ... -> ids[n-1] -> ids[0]`
    pub fn ring(&mut self, ids: &[ObjectId]) {
        self.chain(ids);
        if ids.len() > 1 {
            self.link(ids[ids.len() - 1], ids[0]);
        }
    }

    pub fn is_alive(&self, id: ObjectId) -> bool {
        self.gc.heap().is_alive(id)
    }

    /// Ids of deleted objects in event order
    pub fn deleted(&self) -> Vec<ObjectId> {
        self.events
            .events_of("delete")
            .into_iter()
            .filter_map(|event| match event {
                GcEvent::Delete { object, .. } => Some(object),
                _ => None,
            })
            .collect()
    }
}

/// ============================================================================
/// STRICT ASSERTION HELPERS
/// ============================================================================

/// Assert that every id is alive
///
/// **Bug this finds:** Live objects reclaimed early
/// **Tolerance:** ZERO
#[track_caller]
pub fn assert_alive(fixture: &GcFixture, ids: &[ObjectId], context: &str) {
    for &id in ids {
        assert!(
            fixture.is_alive(id),
            "{} [{}]: {} was reclaimed but should be alive",
            context,
            fixture.strategy(),
            id
        );
    }
}

/// Assert that every id is dead
///
/// **Bug this finds:** Garbage retained, cascade stopping early
/// **Tolerance:** ZERO
#[track_caller]
pub fn assert_dead(fixture: &GcFixture, ids: &[ObjectId], context: &str) {
    for &id in ids {
        assert!(
            !fixture.is_alive(id),
            "{} [{}]: {} is still alive but should be reclaimed",
            context,
            fixture.strategy(),
            id
        );
    }
}

/// Assert heap invariants hold
///
/// **Bug this finds:** Asymmetric edges, accounting drift, count drift
#[track_caller]
pub fn assert_invariants(fixture: &GcFixture, context: &str) {
    if let Err(e) = fixture.gc.check_invariants() {
        panic!("{} [{}]: invariant violated: {}", context, fixture.strategy(), e);
    }
}

/// Assert that used bytes equal the sum of alive sizes
///
/// **Bug this finds:** Byte accounting drift on deletion
#[track_caller]
pub fn assert_accounting(fixture: &GcFixture, context: &str) {
    let heap = fixture.gc.heap();
    let expected: usize = heap.alive_objects().map(|record| record.size()).sum();
    assert_eq!(
        heap.used_bytes(),
        expected,
        "{} [{}]: used bytes drifted from alive sizes",
        context,
        fixture.strategy()
    );
    assert_eq!(
        heap.used_bytes() + heap.free_bytes(),
        heap.capacity(),
        "{} [{}]: used + free != capacity",
        context,
        fixture.strategy()
    );
}
