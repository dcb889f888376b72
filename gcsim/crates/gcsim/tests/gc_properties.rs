//! GC Property Tests - Randomized Operation Streams
//!
//! quickcheck drives every collector with arbitrary operation streams.
//! Individual operations may fail; the properties below must hold no
//! matter what.

mod common;

use std::collections::{HashMap, HashSet, VecDeque};

use common::GcFixture;
use gcsim::{marker, Collector, Heap, ObjectId, Strategy};
use quickcheck_macros::quickcheck;

#[derive(Debug, Clone, Copy)]
enum Op {
    Allocate(usize),
    AddRef(ObjectId, ObjectId),
    RemoveRef(ObjectId, ObjectId),
    MakeRoot(ObjectId),
    RemoveRoot(ObjectId),
    Collect,
}

/// Decode a raw tuple against the ids handed out so far
fn decode(raw: (u8, u8, u8), allocated: usize) -> Op {
    let (kind, x, y) = raw;
    if allocated == 0 {
        return Op::Allocate(usize::from(x % 64) + 1);
    }
    let pick = |v: u8| ObjectId::new((usize::from(v) % allocated) as u32);
    match kind % 8 {
        0 | 1 => Op::Allocate(usize::from(x % 64) + 1),
        2 | 3 => Op::AddRef(pick(x), pick(y)),
        4 => Op::RemoveRef(pick(x), pick(y)),
        5 => Op::MakeRoot(pick(x)),
        6 => Op::RemoveRoot(pick(x)),
        _ => Op::Collect,
    }
}

fn apply(gc: &mut impl Collector, op: Op) {
    let _ = match op {
        Op::Allocate(size) => gc.allocate(size).map(|_| ()),
        Op::AddRef(from, to) => gc.add_reference(from, to),
        Op::RemoveRef(from, to) => gc.remove_reference(from, to),
        Op::MakeRoot(id) => gc.mark_root(id),
        Op::RemoveRoot(id) => gc.unmark_root(id),
        Op::Collect => {
            gc.collect();
            Ok(())
        },
    };
}

/// Objects reachable from the roots once `op`'s edge or root change lands
fn reachable_after(heap: &Heap, op: Op) -> HashSet<ObjectId> {
    let mut edges: HashMap<ObjectId, Vec<ObjectId>> = heap
        .alive_objects()
        .map(|record| (record.id(), record.outgoing().collect()))
        .collect();
    let mut roots: Vec<ObjectId> = heap.roots();

    match op {
        Op::RemoveRef(from, to) => {
            if let Some(targets) = edges.get_mut(&from) {
                targets.retain(|&t| t != to);
            }
        },
        Op::RemoveRoot(id) => roots.retain(|&r| r != id),
        _ => {},
    }

    let mut seen: HashSet<ObjectId> = roots.iter().copied().collect();
    let mut queue: VecDeque<ObjectId> = roots.into_iter().collect();
    while let Some(id) = queue.pop_front() {
        for &child in edges.get(&id).map(Vec::as_slice).unwrap_or(&[]) {
            if seen.insert(child) {
                queue.push_back(child);
            }
        }
    }
    seen
}

/// Heap invariants hold after every operation under every strategy
///
/// **Bug this finds:** Asymmetric edges, count drift, accounting drift
#[quickcheck]
fn prop_invariants_hold(raw: Vec<(u8, u8, u8)>) -> bool {
    GcFixture::all().into_iter().all(|mut fixture| {
        raw.iter().all(|&r| {
            let op = decode(r, fixture.gc.heap().allocated_count());
            apply(&mut fixture.gc, op);
            fixture.gc.check_invariants().is_ok()
        })
    })
}

/// Mark-Sweep frees exactly the unreachable objects
///
/// **Invariant verified:** After collect, alive == reachable from roots
#[quickcheck]
fn prop_mark_sweep_frees_exactly_unreachable(raw: Vec<(u8, u8, u8)>) -> bool {
    let mut fixture = GcFixture::new(Strategy::MarkSweep);
    for &r in &raw {
        let op = decode(r, fixture.gc.heap().allocated_count());
        apply(&mut fixture.gc, op);
    }

    let trace = marker::trace(fixture.gc.heap());
    fixture.gc.collect();

    let alive: HashSet<ObjectId> = fixture.gc.heap().alive_ids().into_iter().collect();
    let reachable: HashSet<ObjectId> = trace.reachable.iter().copied().collect();
    alive == reachable
}

/// Counting strategies never delete an object a trace would keep
///
/// **Bug this finds:** Cascades freeing live data
/// **Invariant verified:** Every deletion is unreachable once the
/// operation's own change is applied
#[quickcheck]
fn prop_counting_never_frees_reachable(raw: Vec<(u8, u8, u8)>) -> bool {
    [Strategy::RefCount, Strategy::Cascade]
        .into_iter()
        .all(|strategy| {
            let mut fixture = GcFixture::new(strategy);
            raw.iter().all(|&r| {
                let op = decode(r, fixture.gc.heap().allocated_count());
                let before: HashSet<ObjectId> =
                    fixture.gc.heap().alive_ids().into_iter().collect();
                let keep = reachable_after(fixture.gc.heap(), op);

                apply(&mut fixture.gc, op);

                let after: HashSet<ObjectId> =
                    fixture.gc.heap().alive_ids().into_iter().collect();
                before.difference(&after).all(|id| !keep.contains(id))
            })
        })
}

/// Counting strategies free a subset of what Mark-Sweep would free
///
/// **Invariant verified:** Leak scan after teardown finds only cycle
/// members, never objects with an empty in-degree
#[quickcheck]
fn prop_leaks_are_cyclic_garbage(raw: Vec<(u8, u8, u8)>) -> bool {
    [Strategy::RefCount, Strategy::Cascade]
        .into_iter()
        .all(|strategy| {
            let mut fixture = GcFixture::new(strategy);
            for &r in &raw {
                let op = decode(r, fixture.gc.heap().allocated_count());
                apply(&mut fixture.gc, op);
            }

            // teardown: drop every root, then collect until stable
            for root in fixture.gc.heap().roots() {
                let _ = fixture.gc.unmark_root(root);
            }
            while fixture.gc.collect() > 0 {}

            let leaked = fixture.gc.detect_leaks();
            leaked.len() == fixture.gc.alive_count()
                && leaked.iter().all(|&id| {
                    fixture
                        .gc
                        .object(id)
                        .map_or(false, |record| record.in_degree() > 0)
                })
        })
}
