//! Scenario generators.
//!
//! Every generator produces a stream that validates. The graph-shaped
//! generators share one layout: build the structure under a root, collect
//! (nothing should go), drop the root, collect again and finish with a leak
//! scan. What the second collection frees is what tells the strategies
//! apart.

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::GcError;
use crate::heap::ObjectId;
use crate::scenario::{Scenario, ScenarioBuilder};

/// Object size used by the graph-shaped generators
pub const OBJECT_SIZE: usize = 64;

/// Named generator, as selected from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Generator {
    Basic,
    CascadeChain,
    CycleLeak,
    LinearChain,
    CyclicGraph,
    CascadeTree,
    Random,
}

impl Generator {
    pub const ALL: [Generator; 7] = [
        Generator::Basic,
        Generator::CascadeChain,
        Generator::CycleLeak,
        Generator::LinearChain,
        Generator::CyclicGraph,
        Generator::CascadeTree,
        Generator::Random,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Generator::Basic => "basic",
            Generator::CascadeChain => "cascade_chain",
            Generator::CycleLeak => "cycle_leak",
            Generator::LinearChain => "linear_chain",
            Generator::CyclicGraph => "cyclic_graph",
            Generator::CascadeTree => "cascade_tree",
            Generator::Random => "random",
        }
    }

    /// Produce a scenario; `size` is the generator's main dimension and
    /// `seed` only matters for [`Generator::Random`]
    pub fn generate(&self, size: usize, seed: u64) -> Scenario {
        let size = size.max(1);
        match self {
            Generator::Basic => basic(size),
            Generator::CascadeChain => cascade_chain(size),
            Generator::CycleLeak => cycle_leak(size),
            Generator::LinearChain => linear_chain(size),
            Generator::CyclicGraph => cyclic_graph(size, 3),
            Generator::CascadeTree => cascade_tree(size, 3),
            Generator::Random => random(size, seed),
        }
    }
}

impl fmt::Display for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Generator {
    type Err = GcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Generator::ALL
            .into_iter()
            .find(|generator| generator.as_str() == normalized)
            .ok_or_else(|| {
                let known: Vec<&str> = Generator::ALL.iter().map(|g| g.as_str()).collect();
                GcError::Scenario(format!(
                    "unknown generator '{}' (expected one of: {})",
                    s,
                    known.join(", ")
                ))
            })
    }
}

/// `n` rooted objects, each unrooted again, then a collection
pub fn basic(n: usize) -> Scenario {
    let mut builder = ScenarioBuilder::new(format!("basic_{}", n))
        .description("allocate, root and unroot independent objects");

    let ids: Vec<ObjectId> = (0..n).map(|_| builder.allocate(OBJECT_SIZE)).collect();
    for &id in &ids {
        builder.make_root(id);
    }
    for &id in &ids {
        builder.remove_root(id);
    }
    builder.collect().detect_leaks();
    builder.build()
}

/// A rooted head holding a chain `depth` objects long; cutting the first
/// link drops the whole chain
pub fn cascade_chain(depth: usize) -> Scenario {
    let mut builder = ScenarioBuilder::new(format!("cascade_chain_{}", depth))
        .description("cut the link below a root and drop the chain under it");

    let head = builder.allocate(OBJECT_SIZE);
    builder.make_root(head);

    let mut prev = head;
    let mut first = None;
    for _ in 0..depth {
        let next = builder.allocate(OBJECT_SIZE);
        builder.add_ref(prev, next);
        first.get_or_insert(next);
        prev = next;
    }

    if let Some(first) = first {
        builder.remove_ref(head, first);
    }
    builder.collect().detect_leaks();
    builder.build()
}

/// `num_cycles` two-object cycles, each briefly rooted through one member
pub fn cycle_leak(num_cycles: usize) -> Scenario {
    let mut builder = ScenarioBuilder::new(format!("cycle_leak_{}", num_cycles))
        .description("two-object cycles left without roots");

    for _ in 0..num_cycles {
        let a = builder.allocate(OBJECT_SIZE);
        let b = builder.allocate(OBJECT_SIZE);
        builder.make_root(a).add_ref(a, b).add_ref(b, a).remove_root(a);
    }
    builder.collect().detect_leaks();
    builder.build()
}

/// Root followed by a singly linked chain, `n` objects in total
pub fn linear_chain(n: usize) -> Scenario {
    let mut builder = ScenarioBuilder::new(format!("linear_chain_{}", n))
        .description("singly linked chain hanging off a root");

    let root = builder.allocate(OBJECT_SIZE);
    builder.make_root(root);
    let mut prev = root;
    for _ in 1..n {
        let next = builder.allocate(OBJECT_SIZE);
        builder.add_ref(prev, next);
        prev = next;
    }
    finish_rooted(builder, root)
}

/// Root referencing the head of each cycle of `cycle_len` objects
pub fn cyclic_graph(n: usize, cycle_len: usize) -> Scenario {
    let cycle_len = cycle_len.max(2);
    let mut builder = ScenarioBuilder::new(format!("cyclic_graph_{}_{}", n, cycle_len))
        .description("rings of objects hanging off a root");

    let root = builder.allocate(OBJECT_SIZE);
    builder.make_root(root);
    let mut remaining = n.saturating_sub(1);
    while remaining > 0 {
        let len = remaining.min(cycle_len);
        let head = builder.allocate(OBJECT_SIZE);
        builder.add_ref(root, head);

        let mut prev = head;
        for _ in 1..len {
            let next = builder.allocate(OBJECT_SIZE);
            builder.add_ref(prev, next);
            prev = next;
        }
        if len > 1 {
            builder.add_ref(prev, head);
        }
        remaining -= len;
    }
    finish_rooted(builder, root)
}

/// Breadth-first tree of `n` objects where every node has up to
/// `branching` children
pub fn cascade_tree(n: usize, branching: usize) -> Scenario {
    let branching = branching.max(1);
    let mut builder = ScenarioBuilder::new(format!("cascade_tree_{}_{}", n, branching))
        .description("tree hanging off a root");

    let root = builder.allocate(OBJECT_SIZE);
    builder.make_root(root);
    let mut ids = vec![root];
    for i in 1..n.max(1) {
        let child = builder.allocate(OBJECT_SIZE);
        builder.add_ref(ids[(i - 1) / branching], child);
        ids.push(child);
    }
    finish_rooted(builder, root)
}

/// Tail shared by the rooted shapes; every object is linked as soon as it
/// is allocated, so pressure collections during the build free nothing
fn finish_rooted(mut builder: ScenarioBuilder, root: ObjectId) -> Scenario {
    builder
        .collect()
        .remove_root(root)
        .collect()
        .detect_leaks();
    builder.build()
}

/// Seeded random stream of `ops` operations
///
/// The generator keeps its own view of edges and roots but not of which
/// objects a strategy has already freed, so some operations fail at run
/// time. The same seed always yields the same stream.
pub fn random(ops: usize, seed: u64) -> Scenario {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut builder = ScenarioBuilder::new(format!("random_{}_{}", ops, seed))
        .description("seeded random operation stream");

    let mut edges: Vec<(ObjectId, ObjectId)> = Vec::new();
    let mut roots: Vec<ObjectId> = Vec::new();

    for _ in 0..ops {
        let allocated = builder.allocated();
        let pick = |rng: &mut StdRng| ObjectId::new(rng.gen_range(0..allocated));

        match rng.gen_range(0..100u32) {
            _ if allocated < 2 => {
                builder.allocate(rng.gen_range(8..=256));
            },
            0..=29 => {
                builder.allocate(rng.gen_range(8..=256));
            },
            30..=59 => {
                let from = pick(&mut rng);
                let to = pick(&mut rng);
                if from != to {
                    builder.add_ref(from, to);
                    edges.push((from, to));
                }
            },
            60..=74 if !edges.is_empty() => {
                let (from, to) = edges.swap_remove(rng.gen_range(0..edges.len()));
                builder.remove_ref(from, to);
            },
            75..=84 => {
                let id = pick(&mut rng);
                builder.make_root(id);
                roots.push(id);
            },
            85..=92 if !roots.is_empty() => {
                let id = roots.swap_remove(rng.gen_range(0..roots.len()));
                builder.remove_root(id);
            },
            _ => {
                builder.collect();
            },
        }
    }

    builder.detect_leaks();
    builder.build()
}
