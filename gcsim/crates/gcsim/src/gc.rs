//! Garbage Collector - Strategy Selection
//!
//! [`GarbageCollector`] is the single entry point drivers use: the strategy
//! is chosen once from [`GcConfig::strategy`] and every operation is
//! dispatched to the matching engine.

use crate::collector::{
    CascadeCollector, Collector, CollectorCore, MarkSweepCollector, RefCountCollector,
};
use crate::config::{GcConfig, Strategy};
use crate::error::{GcError, Result};
use crate::heap::ObjectId;
use crate::logging::{BoxedSink, NullSink};

/// Collector selected at construction
pub enum GarbageCollector {
    MarkSweep(MarkSweepCollector),
    RefCount(RefCountCollector),
    Cascade(CascadeCollector),
}

macro_rules! dispatch {
    ($self:expr, $gc:ident => $body:expr) => {
        match $self {
            GarbageCollector::MarkSweep($gc) => $body,
            GarbageCollector::RefCount($gc) => $body,
            GarbageCollector::Cascade($gc) => $body,
        }
    };
}

impl GarbageCollector {
    /// Create a collector for `config.strategy`, reporting to `sink`
    ///
    /// # Errors
    ///
    /// `GcError::Configuration` if the configuration does not validate.
    pub fn new(config: GcConfig, sink: BoxedSink) -> Result<Self> {
        config
            .validate()
            .map_err(|e| GcError::Configuration(e.to_string()))?;

        log::debug!(
            "creating {} collector: capacity {} bytes, threshold {} bytes",
            config.strategy,
            config.capacity,
            config.collection_threshold
        );

        Ok(match config.strategy {
            Strategy::MarkSweep => {
                GarbageCollector::MarkSweep(MarkSweepCollector::new(&config, sink))
            },
            Strategy::RefCount => GarbageCollector::RefCount(RefCountCollector::new(&config, sink)),
            Strategy::Cascade => GarbageCollector::Cascade(CascadeCollector::new(&config, sink)),
        })
    }

    /// Default configuration for `strategy`, events discarded
    pub fn with_strategy(strategy: Strategy) -> Result<Self> {
        Self::new(GcConfig::default().with_strategy(strategy), Box::new(NullSink))
    }

    pub fn as_mark_sweep(&mut self) -> Option<&mut MarkSweepCollector> {
        match self {
            GarbageCollector::MarkSweep(gc) => Some(gc),
            _ => None,
        }
    }

    pub fn as_ref_count(&mut self) -> Option<&mut RefCountCollector> {
        match self {
            GarbageCollector::RefCount(gc) => Some(gc),
            _ => None,
        }
    }

    pub fn as_cascade(&mut self) -> Option<&mut CascadeCollector> {
        match self {
            GarbageCollector::Cascade(gc) => Some(gc),
            _ => None,
        }
    }
}

impl Collector for GarbageCollector {
    fn strategy(&self) -> Strategy {
        dispatch!(self, gc => gc.strategy())
    }

    fn core(&self) -> &CollectorCore {
        dispatch!(self, gc => gc.core())
    }

    fn core_mut(&mut self) -> &mut CollectorCore {
        dispatch!(self, gc => gc.core_mut())
    }

    fn collect(&mut self) -> usize {
        dispatch!(self, gc => gc.collect())
    }

    fn detect_leaks(&mut self) -> Vec<ObjectId> {
        dispatch!(self, gc => gc.detect_leaks())
    }

    fn allocate(&mut self, size: usize) -> Result<ObjectId> {
        dispatch!(self, gc => gc.allocate(size))
    }

    fn add_reference(&mut self, from: ObjectId, to: ObjectId) -> Result<()> {
        dispatch!(self, gc => gc.add_reference(from, to))
    }

    fn remove_reference(&mut self, from: ObjectId, to: ObjectId) -> Result<()> {
        dispatch!(self, gc => gc.remove_reference(from, to))
    }

    fn mark_root(&mut self, id: ObjectId) -> Result<()> {
        dispatch!(self, gc => gc.mark_root(id))
    }

    fn unmark_root(&mut self, id: ObjectId) -> Result<()> {
        dispatch!(self, gc => gc.unmark_root(id))
    }
}
