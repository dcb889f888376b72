//! Object records stored in the simulated heap.

use std::fmt;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Identifier of a simulated object
///
/// Ids are handed out sequentially from zero and index the heap's record
/// table directly. A dead id is never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(u32);

impl ObjectId {
    /// Wrap a raw id
    pub const fn new(raw: u32) -> Self {
        ObjectId(raw)
    }

    /// Raw numeric id
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Slot in the heap's record table
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Id for a record table slot, `None` once the id space is used up
    pub(crate) fn from_index(index: usize) -> Option<Self> {
        u32::try_from(index).ok().map(ObjectId)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj_{}", self.0)
    }
}

impl From<u32> for ObjectId {
    fn from(raw: u32) -> Self {
        ObjectId(raw)
    }
}

/// One simulated heap object
///
/// Fields are private to the heap; collectors mutate records only through
/// `Heap` so that edge symmetry and byte accounting stay consistent.
#[derive(Debug, Clone)]
pub struct ObjectRecord {
    pub(crate) id: ObjectId,
    pub(crate) size: usize,
    pub(crate) alive: bool,
    pub(crate) root: bool,
    pub(crate) marked: bool,
    pub(crate) ref_count: u32,
    pub(crate) allocation_step: u64,
    pub(crate) collection_step: Option<u64>,
    pub(crate) outgoing: IndexSet<ObjectId>,
    pub(crate) incoming: IndexSet<ObjectId>,
}

impl ObjectRecord {
    pub(crate) fn new(id: ObjectId, size: usize, step: u64) -> Self {
        Self {
            id,
            size,
            alive: true,
            root: false,
            marked: false,
            ref_count: 0,
            allocation_step: step,
            collection_step: None,
            outgoing: IndexSet::new(),
            incoming: IndexSet::new(),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Size in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn is_root(&self) -> bool {
        self.root
    }

    /// Mark bit left by the last mark phase (Mark-Sweep only)
    pub fn is_marked(&self) -> bool {
        self.marked
    }

    /// Explicit reference count
    ///
    /// Maintained by the reference-counting collector only; always zero
    /// under the graph-based collectors. See [`ObjectRecord::reference_count`]
    /// for the strategy-independent value.
    pub fn ref_count(&self) -> u32 {
        self.ref_count
    }

    /// Incoming edges plus one for the root flag
    pub fn reference_count(&self) -> u32 {
        self.incoming.len() as u32 + u32::from(self.root)
    }

    pub fn allocation_step(&self) -> u64 {
        self.allocation_step
    }

    /// Step at which the object died, `None` while alive
    pub fn collection_step(&self) -> Option<u64> {
        self.collection_step
    }

    /// Objects this one references, in insertion order
    pub fn outgoing(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.outgoing.iter().copied()
    }

    /// Objects referencing this one, in insertion order
    pub fn incoming(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.incoming.iter().copied()
    }

    pub fn references(&self, to: ObjectId) -> bool {
        self.outgoing.contains(&to)
    }

    pub fn in_degree(&self) -> usize {
        self.incoming.len()
    }

    pub fn out_degree(&self) -> usize {
        self.outgoing.len()
    }

    /// Alive, not a root and nothing points at it
    pub fn is_orphan(&self) -> bool {
        self.alive && !self.root && self.incoming.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_id_display() {
        assert_eq!(ObjectId::new(7).to_string(), "obj_7");
        assert_eq!(ObjectId::from(3).index(), 3);
    }

    #[test]
    fn test_from_index_stops_at_id_space() {
        assert_eq!(ObjectId::from_index(0), Some(ObjectId::new(0)));
        assert_eq!(
            ObjectId::from_index(u32::MAX as usize),
            Some(ObjectId::new(u32::MAX))
        );
        #[cfg(target_pointer_width = "64")]
        assert_eq!(ObjectId::from_index(u32::MAX as usize + 1), None);
    }

    #[test]
    fn test_new_record_is_orphan() {
        let record = ObjectRecord::new(ObjectId::new(0), 32, 4);
        assert!(record.is_alive());
        assert!(record.is_orphan());
        assert_eq!(record.allocation_step(), 4);
        assert_eq!(record.collection_step(), None);
        assert_eq!(record.reference_count(), 0);
    }

    #[test]
    fn test_root_counts_as_reference() {
        let mut record = ObjectRecord::new(ObjectId::new(0), 32, 0);
        record.root = true;
        assert!(!record.is_orphan());
        assert_eq!(record.reference_count(), 1);
    }
}
