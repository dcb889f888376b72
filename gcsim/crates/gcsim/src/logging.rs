//! GC Event Logging
//!
//! Collectors report what they do as structured [`GcEvent`]s pushed into an
//! injected [`EventSink`]. The sink decides the format; collectors never
//! touch files or global state.
//!
//! Sinks provided:
//! - [`NullSink`] - discards everything
//! - [`MemorySink`] - shared in-memory buffer, for tests and reports
//! - [`JsonLinesSink`] - one JSON object per line in a file
//! - [`LogSink`] - human-readable lines through the `log` facade
//! - [`FanoutSink`] - forwards to several sinks
//!
//! Event levels (used by [`LogSink`]):
//! - ERROR: anomalies
//! - WARN: leaks
//! - INFO: collections
//! - DEBUG: deletions
//! - TRACE: allocations and edge changes

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::Strategy;
use crate::heap::ObjectId;

/// Structured GC event
///
/// `from: None` on reference events denotes the virtual edge contributed
/// by the root flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GcEvent {
    /// Object allocated
    Allocate {
        object: ObjectId,
        size: usize,
        step: u64,
    },

    /// Reference added (or object rooted)
    AddRef {
        from: Option<ObjectId>,
        to: ObjectId,
        ref_count: u32,
        step: u64,
    },

    /// Reference removed (or object unrooted)
    RemoveRef {
        from: Option<ObjectId>,
        to: ObjectId,
        ref_count: u32,
        step: u64,
    },

    /// Object reclaimed
    Delete {
        object: ObjectId,
        size: usize,
        step: u64,
    },

    /// Object flagged by a leak scan
    Leak {
        object: ObjectId,
        ref_count: u32,
        step: u64,
    },

    /// Explicit or automatic collection finished
    Collection {
        strategy: Strategy,
        cycle: u64,
        freed_bytes: usize,
        objects_collected: usize,
        duration_us: u64,
        step: u64,
    },

    /// Invariant breach detected and repaired
    Anomaly {
        object: ObjectId,
        message: String,
        step: u64,
    },
}

impl GcEvent {
    /// Snake-case event name, as written in the `event` field
    pub fn kind(&self) -> &'static str {
        match self {
            GcEvent::Allocate { .. } => "allocate",
            GcEvent::AddRef { .. } => "add_ref",
            GcEvent::RemoveRef { .. } => "remove_ref",
            GcEvent::Delete { .. } => "delete",
            GcEvent::Leak { .. } => "leak",
            GcEvent::Collection { .. } => "collection",
            GcEvent::Anomaly { .. } => "anomaly",
        }
    }

    /// Simulation step the event belongs to
    pub fn step(&self) -> u64 {
        match self {
            GcEvent::Allocate { step, .. }
            | GcEvent::AddRef { step, .. }
            | GcEvent::RemoveRef { step, .. }
            | GcEvent::Delete { step, .. }
            | GcEvent::Leak { step, .. }
            | GcEvent::Collection { step, .. }
            | GcEvent::Anomaly { step, .. } => *step,
        }
    }

    /// Log level for the event
    pub fn level(&self) -> log::Level {
        match self {
            GcEvent::Anomaly { .. } => log::Level::Error,
            GcEvent::Leak { .. } => log::Level::Warn,
            GcEvent::Collection { .. } => log::Level::Info,
            GcEvent::Delete { .. } => log::Level::Debug,
            GcEvent::Allocate { .. } | GcEvent::AddRef { .. } | GcEvent::RemoveRef { .. } => {
                log::Level::Trace
            },
        }
    }
}

impl fmt::Display for GcEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[step {}] ", self.step())?;
        match self {
            GcEvent::Allocate { object, size, .. } => {
                write!(f, "allocate {} ({} bytes)", object, size)
            },
            GcEvent::AddRef {
                from, to, ref_count, ..
            } => match from {
                Some(from) => write!(f, "add_ref {} -> {} (count {})", from, to, ref_count),
                None => write!(f, "root {} (count {})", to, ref_count),
            },
            GcEvent::RemoveRef {
                from, to, ref_count, ..
            } => match from {
                Some(from) => write!(f, "remove_ref {} -> {} (count {})", from, to, ref_count),
                None => write!(f, "unroot {} (count {})", to, ref_count),
            },
            GcEvent::Delete { object, size, .. } => {
                write!(f, "delete {} ({} bytes)", object, size)
            },
            GcEvent::Leak {
                object, ref_count, ..
            } => write!(f, "leak {} (count {})", object, ref_count),
            GcEvent::Collection {
                strategy,
                cycle,
                freed_bytes,
                objects_collected,
                duration_us,
                ..
            } => write!(
                f,
                "{} collection #{} freed {} bytes, {} objects ({} us)",
                strategy, cycle, freed_bytes, objects_collected, duration_us
            ),
            GcEvent::Anomaly {
                object, message, ..
            } => write!(f, "anomaly on {}: {}", object, message),
        }
    }
}

// ============================================================================
// SINK TRAIT
// ============================================================================

/// Destination for GC events
///
/// Opening happens at construction; `flush` and `close` finish the
/// lifecycle. Recording never fails from the collector's point of view: a
/// sink that hits an I/O error reports it through `log` and carries on.
#[cfg_attr(test, mockall::automock)]
pub trait EventSink {
    /// Record one event
    fn record(&mut self, event: &GcEvent);

    /// Push buffered events to their destination
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Flush and release the destination
    fn close(&mut self) -> io::Result<()> {
        self.flush()
    }
}

/// Owned, sendable sink as held by collectors
pub type BoxedSink = Box<dyn EventSink + Send>;

/// Sink that discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&mut self, _event: &GcEvent) {}
}

/// In-memory sink backed by a shared buffer
///
/// Clones share the same buffer, so a test can keep one handle while the
/// collector owns the other.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<GcEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every event recorded so far
    pub fn events(&self) -> Vec<GcEvent> {
        self.events.lock().clone()
    }

    /// Events of one kind, e.g. `"delete"`
    pub fn events_of(&self, kind: &str) -> Vec<GcEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.kind() == kind)
            .cloned()
            .collect()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| event.kind() == kind)
            .count()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for MemorySink {
    fn record(&mut self, event: &GcEvent) {
        self.events.lock().push(event.clone());
    }
}

/// File sink writing one JSON object per line
pub struct JsonLinesSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    timestamps: bool,
    written: u64,
}

impl JsonLinesSink {
    /// Create (truncate) the log file, creating parent directories as needed
    pub fn create(path: impl AsRef<Path>, timestamps: bool) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = File::create(&path)?;
        Ok(Self {
            path,
            writer: Some(BufWriter::new(file)),
            timestamps,
            written: 0,
        })
    }

    /// Open a file sink, or fall back to [`NullSink`] if the file is unavailable
    pub fn open_or_null(path: impl AsRef<Path>, timestamps: bool) -> BoxedSink {
        let path = path.as_ref();
        match Self::create(path, timestamps) {
            Ok(sink) => Box::new(sink),
            Err(e) => {
                log::warn!(
                    "event log {} unavailable ({}), events will be discarded",
                    path.display(),
                    e
                );
                Box::new(NullSink)
            },
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lines written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    fn encode(&self, event: &GcEvent) -> serde_json::Result<String> {
        let mut value = serde_json::to_value(event)?;
        if self.timestamps {
            if let Some(map) = value.as_object_mut() {
                let now = chrono::Local::now();
                map.insert(
                    "timestamp".to_string(),
                    serde_json::Value::String(now.format("%Y-%m-%d %H:%M:%S%.3f").to_string()),
                );
            }
        }
        serde_json::to_string(&value)
    }
}

impl EventSink for JsonLinesSink {
    fn record(&mut self, event: &GcEvent) {
        let line = match self.encode(event) {
            Ok(line) => line,
            Err(e) => {
                log::error!("failed to encode {} event: {}", event.kind(), e);
                return;
            },
        };

        let Some(writer) = self.writer.as_mut() else {
            return;
        };

        if let Err(e) = writeln!(writer, "{}", line) {
            log::warn!(
                "writing to {} failed ({}), disabling event log",
                self.path.display(),
                e
            );
            self.writer = None;
            return;
        }
        self.written += 1;
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }

    fn close(&mut self) -> io::Result<()> {
        let result = self.flush();
        self.writer = None;
        result
    }
}

/// Sink rendering events as text through the `log` facade
#[derive(Debug, Clone)]
pub struct LogSink {
    target: String,
}

impl LogSink {
    pub fn new() -> Self {
        Self::with_target("gcsim::events")
    }

    pub fn with_target(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogSink {
    fn record(&mut self, event: &GcEvent) {
        log::log!(target: self.target.as_str(), event.level(), "{}", event);
    }
}

/// Sink forwarding every event to each child sink in order
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<BoxedSink>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: BoxedSink) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn push(&mut self, sink: BoxedSink) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for FanoutSink {
    fn record(&mut self, event: &GcEvent) {
        for sink in &mut self.sinks {
            sink.record(event);
        }
    }

    /// Flushes every child, returning the first error
    fn flush(&mut self) -> io::Result<()> {
        let mut first_error = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.flush() {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn close(&mut self) -> io::Result<()> {
        let mut first_error = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.close() {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
