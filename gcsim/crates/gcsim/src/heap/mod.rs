//! Heap Module - Object Graph Storage
//!
//! The heap owns every object record and the reference edges between them.
//! It is shared by all collectors: they decide *what* dies, the heap keeps
//! the bookkeeping consistent while it happens.
//!
//! Guarantees maintained here:
//! - an edge `a -> b` is present in `a.outgoing` iff it is present in `b.incoming`
//! - no self edges
//! - a dead object has no edges and a stamped collection step
//! - `used_bytes` is the sum of the sizes of alive objects
//!
//! Ids index a dense record table; dead records stay in place so that an
//! id is never handed out twice.

pub mod object;
pub mod snapshot;

pub use object::{ObjectId, ObjectRecord};
pub use snapshot::{HeapSnapshot, ObjectSnapshot};

use crate::error::{GcError, Result};

/// Simulated heap with a fixed byte capacity
#[derive(Debug, Clone)]
pub struct Heap {
    objects: Vec<ObjectRecord>,
    capacity: usize,
    used: usize,
    live: usize,
    step: u64,
}

impl Heap {
    /// Create an empty heap
    pub fn new(capacity: usize) -> Self {
        Self {
            objects: Vec::new(),
            capacity,
            used: 0,
            live: 0,
            step: 0,
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes held by alive objects
    pub fn used_bytes(&self) -> usize {
        self.used
    }

    pub fn free_bytes(&self) -> usize {
        self.capacity - self.used
    }

    /// Percentage of capacity in use
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.used as f64 * 100.0 / self.capacity as f64
    }

    pub fn alive_count(&self) -> usize {
        self.live
    }

    /// Number of ids handed out so far, dead ones included
    pub fn allocated_count(&self) -> usize {
        self.objects.len()
    }

    /// Current simulation step
    pub fn step(&self) -> u64 {
        self.step
    }

    pub(crate) fn set_step(&mut self, step: u64) {
        self.step = step;
    }

    /// Look up a record, dead or alive
    pub fn get(&self, id: ObjectId) -> Option<&ObjectRecord> {
        self.objects.get(id.index())
    }

    pub(crate) fn get_mut(&mut self, id: ObjectId) -> Option<&mut ObjectRecord> {
        self.objects.get_mut(id.index())
    }

    /// Look up an alive record
    ///
    /// Fails with `UnknownObject` for ids never allocated and `DeadObject`
    /// for ids already collected.
    pub fn alive(&self, id: ObjectId) -> Result<&ObjectRecord> {
        match self.get(id) {
            None => Err(GcError::UnknownObject(id)),
            Some(record) if !record.alive => Err(GcError::DeadObject(id)),
            Some(record) => Ok(record),
        }
    }

    pub fn is_alive(&self, id: ObjectId) -> bool {
        self.get(id).map_or(false, ObjectRecord::is_alive)
    }

    pub fn is_root(&self, id: ObjectId) -> bool {
        self.get(id).map_or(false, |record| record.alive && record.root)
    }

    pub fn has_edge(&self, from: ObjectId, to: ObjectId) -> bool {
        self.get(from).map_or(false, |record| record.references(to))
    }

    /// All records in id order, dead ones included
    pub fn records(&self) -> impl Iterator<Item = &ObjectRecord> {
        self.objects.iter()
    }

    /// Alive records in id order
    pub fn alive_objects(&self) -> impl Iterator<Item = &ObjectRecord> {
        self.objects.iter().filter(|record| record.alive)
    }

    pub fn alive_ids(&self) -> Vec<ObjectId> {
        self.alive_objects().map(ObjectRecord::id).collect()
    }

    /// Alive roots in id order
    pub fn roots(&self) -> Vec<ObjectId> {
        self.alive_objects()
            .filter(|record| record.root)
            .map(ObjectRecord::id)
            .collect()
    }

    /// Alive, non-root objects without incoming edges, in id order
    pub fn orphans(&self) -> Vec<ObjectId> {
        self.alive_objects()
            .filter(|record| record.is_orphan())
            .map(ObjectRecord::id)
            .collect()
    }

    /// Whether `size` more bytes fit under `limit`
    pub fn fits_under(&self, size: usize, limit: usize) -> bool {
        self.used
            .checked_add(size)
            .map_or(false, |total| total <= limit)
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Record a new object and charge its size
    ///
    /// Callers check capacity first; the heap only accounts. Fails without
    /// mutating once every `u32` id has been handed out.
    pub(crate) fn insert(&mut self, size: usize) -> Result<ObjectId> {
        let id = ObjectId::from_index(self.objects.len()).ok_or_else(|| {
            violation(format!(
                "object id space exhausted after {} allocations",
                self.objects.len()
            ))
        })?;
        self.objects.push(ObjectRecord::new(id, size, self.step));
        self.used += size;
        self.live += 1;
        Ok(id)
    }

    /// Insert `from -> to` into both adjacency views
    ///
    /// Returns `Ok(false)` when the edge already existed.
    pub(crate) fn link(&mut self, from: ObjectId, to: ObjectId) -> Result<bool> {
        self.alive(from)?;
        self.alive(to)?;
        crate::ensure!(from != to, GcError::SelfReference(from));

        if self.objects[from.index()].outgoing.contains(&to) {
            return Ok(false);
        }

        self.objects[from.index()].outgoing.insert(to);
        self.objects[to.index()].incoming.insert(from);
        Ok(true)
    }

    /// Remove `from -> to` from both adjacency views
    pub(crate) fn unlink(&mut self, from: ObjectId, to: ObjectId) -> Result<()> {
        self.alive(from)?;
        self.alive(to)?;
        crate::ensure!(
            self.objects[from.index()].outgoing.contains(&to),
            GcError::EdgeNotFound { from, to }
        );

        self.objects[from.index()].outgoing.shift_remove(&to);
        self.objects[to.index()].incoming.shift_remove(&from);
        Ok(())
    }

    /// Set or clear the root flag on an alive object
    ///
    /// Returns whether the flag changed.
    pub(crate) fn set_root(&mut self, id: ObjectId, root: bool) -> Result<bool> {
        self.alive(id)?;
        let record = &mut self.objects[id.index()];
        if record.root == root {
            return Ok(false);
        }
        record.root = root;
        Ok(true)
    }

    /// Drop every outgoing edge of `id`, returning the former targets in order
    pub(crate) fn detach_outgoing(&mut self, id: ObjectId) -> Vec<ObjectId> {
        let targets: Vec<ObjectId> = match self.get_mut(id) {
            Some(record) => record.outgoing.drain(..).collect(),
            None => return Vec::new(),
        };
        for target in &targets {
            self.objects[target.index()].incoming.shift_remove(&id);
        }
        targets
    }

    /// Drop every incoming edge of `id`, returning the former sources in order
    pub(crate) fn detach_incoming(&mut self, id: ObjectId) -> Vec<ObjectId> {
        let sources: Vec<ObjectId> = match self.get_mut(id) {
            Some(record) => record.incoming.drain(..).collect(),
            None => return Vec::new(),
        };
        for source in &sources {
            self.objects[source.index()].outgoing.shift_remove(&id);
        }
        sources
    }

    /// Kill an alive object: detach what is left of its edges, stamp the
    /// current step and return the bytes freed
    ///
    /// Roots are refused; a dead or unknown id frees nothing.
    pub(crate) fn release(&mut self, id: ObjectId) -> usize {
        match self.get(id) {
            Some(record) if record.alive && !record.root => {},
            Some(record) if record.root => {
                log::error!("refusing to release root {}", id);
                return 0;
            },
            _ => return 0,
        }

        self.detach_outgoing(id);
        self.detach_incoming(id);

        let step = self.step;
        let record = &mut self.objects[id.index()];
        record.alive = false;
        record.marked = false;
        record.ref_count = 0;
        record.collection_step = Some(step);

        let size = record.size;
        self.used -= size;
        self.live -= 1;
        size
    }

    pub(crate) fn clear_marks(&mut self) {
        for record in &mut self.objects {
            record.marked = false;
        }
    }

    // ========================================================================
    // Consistency
    // ========================================================================

    /// Verify every structural invariant
    ///
    /// With `counted` set, also checks `ref_count == in_degree + root` for
    /// alive objects (the reference-counting collector's invariant).
    pub fn check_invariants(&self, counted: bool) -> Result<()> {
        let mut used = 0usize;
        let mut live = 0usize;

        for (index, record) in self.objects.iter().enumerate() {
            let id = record.id;
            if id.index() != index {
                return Err(violation(format!("record at slot {} carries id {}", index, id)));
            }

            if !record.alive {
                if record.root {
                    return Err(violation(format!("{} died while rooted", id)));
                }
                if !record.outgoing.is_empty() || !record.incoming.is_empty() {
                    return Err(violation(format!("dead {} still has edges", id)));
                }
                if record.collection_step.is_none() {
                    return Err(violation(format!("dead {} has no collection step", id)));
                }
                continue;
            }

            used += record.size;
            live += 1;

            if record.collection_step.is_some() {
                return Err(violation(format!("alive {} has a collection step", id)));
            }

            for &to in &record.outgoing {
                if to == id {
                    return Err(violation(format!("self edge on {}", id)));
                }
                match self.get(to) {
                    Some(target) if target.alive && target.incoming.contains(&id) => {},
                    Some(target) if !target.alive => {
                        return Err(violation(format!("{} references dead {}", id, to)));
                    },
                    _ => {
                        return Err(violation(format!(
                            "edge {} -> {} missing from incoming view",
                            id, to
                        )));
                    },
                }
            }

            for &from in &record.incoming {
                match self.get(from) {
                    Some(source) if source.alive && source.outgoing.contains(&id) => {},
                    _ => {
                        return Err(violation(format!(
                            "edge {} -> {} missing from outgoing view",
                            from, id
                        )));
                    },
                }
            }

            if counted && record.ref_count != record.reference_count() {
                return Err(violation(format!(
                    "{} has ref_count {} but {} incoming edges (root: {})",
                    id,
                    record.ref_count,
                    record.incoming.len(),
                    record.root
                )));
            }
        }

        if used != self.used || live != self.live {
            return Err(violation(format!(
                "accounting drift: tracked {} bytes / {} objects, actual {} bytes / {} objects",
                self.used, self.live, used, live
            )));
        }

        if self.used > self.capacity {
            return Err(violation(format!(
                "used {} bytes exceeds capacity {}",
                self.used, self.capacity
            )));
        }

        Ok(())
    }

    /// Serializable view of the whole heap
    pub fn snapshot(&self) -> HeapSnapshot {
        HeapSnapshot::capture(self)
    }
}

fn violation(message: String) -> GcError {
    GcError::InvariantViolation(message)
}
