//! Heap snapshots for reporting and text dumps.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Heap, ObjectId, ObjectRecord};

/// Serializable view of the heap at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeapSnapshot {
    pub step: u64,
    pub capacity: usize,
    pub used_bytes: usize,
    pub free_bytes: usize,
    pub total_objects: usize,
    pub alive_objects: usize,
    pub objects: Vec<ObjectSnapshot>,
}

/// One object as seen in a [`HeapSnapshot`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSnapshot {
    pub id: ObjectId,
    pub size: usize,
    pub alive: bool,
    pub root: bool,
    pub marked: bool,
    pub ref_count: u32,
    pub allocation_step: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_step: Option<u64>,
    pub refs_to: Vec<ObjectId>,
    pub refs_from: Vec<ObjectId>,
}

impl From<&ObjectRecord> for ObjectSnapshot {
    fn from(record: &ObjectRecord) -> Self {
        Self {
            id: record.id(),
            size: record.size(),
            alive: record.is_alive(),
            root: record.is_root(),
            marked: record.is_marked(),
            ref_count: record.reference_count(),
            allocation_step: record.allocation_step(),
            collection_step: record.collection_step(),
            refs_to: record.outgoing().collect(),
            refs_from: record.incoming().collect(),
        }
    }
}

impl HeapSnapshot {
    pub(crate) fn capture(heap: &Heap) -> Self {
        Self {
            step: heap.step(),
            capacity: heap.capacity(),
            used_bytes: heap.used_bytes(),
            free_bytes: heap.free_bytes(),
            total_objects: heap.allocated_count(),
            alive_objects: heap.alive_count(),
            objects: heap.records().map(ObjectSnapshot::from).collect(),
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for HeapSnapshot {
    /// Text dump: header, then alive roots, then other alive objects, then the dead
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Heap @ step {}: {}/{} bytes used, {} of {} objects alive",
            self.step, self.used_bytes, self.capacity, self.alive_objects, self.total_objects
        )?;

        let roots = self.objects.iter().filter(|o| o.alive && o.root);
        let others = self.objects.iter().filter(|o| o.alive && !o.root);
        let dead = self.objects.iter().filter(|o| !o.alive);

        for object in roots.chain(others) {
            writeln!(
                f,
                "  {}{} [{}B] refs={} -> {}",
                object.id,
                if object.root { " (root)" } else { "" },
                object.size,
                object.ref_count,
                join_ids(&object.refs_to)
            )?;
        }

        for object in dead {
            writeln!(
                f,
                "  {} [{}B] collected at step {}",
                object.id,
                object.size,
                object.collection_step.unwrap_or_default()
            )?;
        }

        Ok(())
    }
}

fn join_ids(ids: &[ObjectId]) -> String {
    if ids.is_empty() {
        return "-".to_string();
    }
    ids.iter()
        .map(ObjectId::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
