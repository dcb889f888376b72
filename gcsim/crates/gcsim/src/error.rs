//! Error Module - gcsim Error Types
//!
//! Defines all error types returned by the collectors and their collaborators.
//!
//! # Error Categories
//!
//! ## Allocation Errors
//! - `InvalidSize` - Zero-sized or larger-than-capacity request
//! - `OutOfMemory` - Heap exhausted even after a forced collection
//!
//! ## Graph Errors
//! - `UnknownObject` - Id was never allocated
//! - `DeadObject` - Id refers to an object that has already been collected
//! - `SelfReference` - Edge from an object to itself
//! - `EdgeNotFound` - Removing an edge that does not exist
//!
//! ## Invariant Errors
//! - `RefCountUnderflow` - A reference count would have gone negative
//! - `InvariantViolation` - Heap consistency check failed
//!
//! ## Collaborator Errors
//! - `Configuration` - Invalid configuration
//! - `Scenario` - Malformed operation stream
//! - `Io` / `Json` - Event sink, scenario or report I/O

use thiserror::Error;

use crate::heap::ObjectId;

/// Main error type for all gcsim operations
///
/// # Examples
///
/// ```rust
/// use gcsim::GcError;
///
/// fn describe(err: &GcError) -> String {
///     match err {
///         GcError::OutOfMemory { requested, available } => {
///             format!("OOM: requested {}, available {}", requested, available)
///         }
///         GcError::DeadObject(id) => format!("{} is gone", id),
///         _ => err.to_string(),
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum GcError {
    /// Allocation size rejected
    ///
    /// **When returned:** `allocate(0)` or a request larger than the whole heap
    ///
    /// **Recovery strategy:** Fix the caller; no state was mutated
    #[error("Invalid allocation size {size} (heap capacity {capacity} bytes)")]
    InvalidSize { size: usize, capacity: usize },

    /// Out of memory - heap exhaustion
    ///
    /// **When returned:** Allocation still does not fit after one forced collection
    ///
    /// **Recovery strategy:** Drop roots or references, then retry
    #[error("Out of memory: requested {requested} bytes, available {available} bytes")]
    OutOfMemory { requested: usize, available: usize },

    /// Object id was never allocated
    ///
    /// **When returned:** Any operation naming an id beyond the allocation counter
    #[error("Unknown object: {0}")]
    UnknownObject(ObjectId),

    /// Object has already been collected
    ///
    /// **When returned:** Edge or root operations on a dead object
    ///
    /// **Recovery strategy:** None; ids are never reused
    #[error("Object {0} has already been collected")]
    DeadObject(ObjectId),

    /// Self-referencing edge
    ///
    /// **When returned:** `add_reference(a, a)`
    #[error("Self reference on {0} is not allowed")]
    SelfReference(ObjectId),

    /// Edge to remove does not exist
    ///
    /// **When returned:** `remove_reference` for an absent edge
    #[error("No reference from {from} to {to}")]
    EdgeNotFound { from: ObjectId, to: ObjectId },

    /// Reference count would have gone below zero
    ///
    /// **When returned:** A decrement found the count already at zero. The count
    /// is clamped to zero and an anomaly event is emitted before returning.
    ///
    /// **Recovery strategy:** Cannot recover - this is a bug
    #[error("Reference count underflow on {0}")]
    RefCountUnderflow(ObjectId),

    /// Heap consistency check failed
    ///
    /// **When returned:** `Heap::check_invariants` found a broken invariant
    ///
    /// **Action required:** Report with the operation sequence that produced it
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Configuration error
    ///
    /// **When returned:** `GcConfig::validate` rejected the configuration
    ///
    /// **Recovery strategy:** Use default configuration or fail fast
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed scenario or operation stream
    #[error("Scenario error: {0}")]
    Scenario(String),

    /// I/O failure in a sink, scenario loader or report writer
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GcError {
    /// Check if this error is recoverable
    ///
    /// Recoverable errors leave the heap untouched and the simulation can
    /// continue with the next operation.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            GcError::InvalidSize { .. }
                | GcError::OutOfMemory { .. }
                | GcError::UnknownObject(_)
                | GcError::DeadObject(_)
                | GcError::SelfReference(_)
                | GcError::EdgeNotFound { .. }
        )
    }

    /// Check if this error indicates a bug in the code
    pub fn is_bug(&self) -> bool {
        matches!(
            self,
            GcError::RefCountUnderflow(_) | GcError::InvariantViolation(_)
        )
    }
}

/// Result type alias for gcsim operations
pub type Result<T> = std::result::Result<T, GcError>;

/// Ensure condition is true, otherwise return error
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err);
        }
    };
}
