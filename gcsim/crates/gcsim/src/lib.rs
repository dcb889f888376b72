//! # gcsim - Garbage Collection Strategy Simulator
//!
//! gcsim models a heap as an explicit object graph and runs three classic
//! collection strategies over it, so their behavior on the same operation
//! stream can be observed and compared.
//!
//! ## Overview
//!
//! - **Mark-Sweep**: trace from the roots, sweep everything unmarked; reclaims cycles
//! - **Reference Counting**: per-object counts with eager cascading deletion; leaks cycles
//! - **Cascade**: delete orphans (no root, no incoming edge) breadth-first; leaks cycles
//!
//! Objects carry only a size and their edges. Nothing is really allocated:
//! the heap tracks byte accounting against a fixed capacity.
//!
//! ## Quick Start
//!
//! ```rust
//! use gcsim::{Collector, GarbageCollector, Strategy};
//!
//! fn main() -> Result<(), gcsim::GcError> {
//!     let mut gc = GarbageCollector::with_strategy(Strategy::MarkSweep)?;
//!
//!     let root = gc.allocate(64)?;
//!     let a = gc.allocate(64)?;
//!     let b = gc.allocate(64)?;
//!     gc.mark_root(root)?;
//!     gc.add_reference(root, a)?;
//!
//!     // b forms a cycle with a, then a is cut loose from the root
//!     gc.add_reference(a, b)?;
//!     gc.add_reference(b, a)?;
//!     gc.remove_reference(root, a)?;
//!
//!     assert_eq!(gc.collect(), 128);
//!     assert_eq!(gc.alive_count(), 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Running Scenarios
//!
//! ```rust
//! use gcsim::{simulator, scenario::generate, GcConfig, Strategy};
//!
//! let scenario = generate::cycle_leak(2);
//! let reports = simulator::compare(&scenario, &GcConfig::default()).unwrap();
//!
//! for report in &reports {
//!     let expected = if report.strategy == Strategy::MarkSweep { 0 } else { 4 };
//!     assert_eq!(report.leaked.len(), expected);
//! }
//! ```
//!
//! ## Strategy Comparison
//!
//! | Strategy | Deletes on edge removal | `collect()` | Unreachable cycles |
//! |----------|-------------------------|-------------|--------------------|
//! | Mark-Sweep | never | mark, then sweep | reclaimed |
//! | Reference Counting | when a count hits zero | zero-count objects | leaked |
//! | Cascade | when the target is orphaned | orphan scan | leaked |
//!
//! ## Modules
//!
//! - [`collector`]: the [`Collector`] trait and the three engines
//! - [`config`]: collector configuration and strategy selection
//! - [`error`]: error types for every operation
//! - [`gc`]: [`GarbageCollector`], the strategy chosen at construction
//! - [`heap`]: object records, edges and byte accounting
//! - [`logging`]: structured GC events and event sinks
//! - [`marker`]: reachability tracing used by Mark-Sweep
//! - [`perf`]: timed workload comparisons
//! - [`scenario`]: operation streams, loading and generators
//! - [`simulator`]: drives collectors through scenarios
//! - [`stats`]: collection statistics
//!
//! ## Limitations
//!
//! - **Single-threaded**: one collector instance per thread; nothing is `Sync`
//! - **No compaction**: freed bytes are only accounted for, never moved
//! - **Ids are never reused**: dead records stay in the table for inspection

// Core GC modules
pub mod config;
pub mod error;
pub mod gc;

// Object graph
pub mod heap;
pub mod marker;

// Collection strategies
pub mod collector;

// Observation
pub mod logging;
pub mod stats;

// Drivers
pub mod perf;
pub mod scenario;
pub mod simulator;

// Re-export main types for convenience
pub use collector::{CascadeCollector, Collector, MarkSweepCollector, RefCountCollector};
pub use config::{ConfigError, GcConfig, Strategy};
pub use error::{GcError, Result};
pub use gc::GarbageCollector;
pub use heap::{Heap, HeapSnapshot, ObjectId, ObjectRecord};
pub use logging::{
    BoxedSink, EventSink, FanoutSink, GcEvent, JsonLinesSink, LogSink, MemorySink, NullSink,
};
pub use perf::{PerfReport, PerfResult, PerfSuite, Workload};
pub use scenario::{Operation, Scenario, ScenarioBuilder};
pub use simulator::{SimulationReport, Simulator, StepOutcome, StepRecord};
pub use stats::{GcStats, GcSummary, GcTimer};

/// gcsim version string from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Create a collector with the default configuration for `strategy`
///
/// Events are discarded. Use [`GarbageCollector::new`] to attach a sink.
///
/// # Examples
///
/// ```rust
/// use gcsim::Collector;
///
/// let mut gc = gcsim::init(gcsim::Strategy::RefCount)?;
/// let id = gc.allocate(32)?;
/// assert_eq!(gc.reference_count(id), Some(0));
/// # Ok::<(), gcsim::GcError>(())
/// ```
pub fn init(strategy: Strategy) -> Result<GarbageCollector> {
    GarbageCollector::with_strategy(strategy)
}

/// Create a collector from a full configuration
pub fn init_with_config(config: GcConfig, sink: BoxedSink) -> Result<GarbageCollector> {
    GarbageCollector::new(config, sink)
}
