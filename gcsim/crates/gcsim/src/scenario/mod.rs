//! Scenario Module - Operation Streams
//!
//! A scenario is an ordered list of [`Operation`]s fed to one collector.
//! Object ids in operations are the ids the heap hands out: the n-th
//! successful `allocate` yields `obj_n`, counting from zero.
//!
//! File format (JSON):
//!
//! ```json
//! {
//!   "name": "cycle",
//!   "description": "two objects referencing each other",
//!   "collector": "ref_count",
//!   "operations": [
//!     { "op": "allocate", "size": 64 },
//!     { "op": "allocate", "size": 64 },
//!     { "op": "add_ref", "from": 0, "to": 1 },
//!     { "op": "add_ref", "from": 1, "to": 0 },
//!     { "op": "collect" },
//!     { "op": "detect_leaks" }
//!   ]
//! }
//! ```

pub mod generate;

pub use generate::Generator;

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::Strategy;
use crate::error::{GcError, Result};
use crate::heap::ObjectId;

/// One step of a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Allocate {
        size: usize,
    },
    AddRef {
        #[serde(alias = "from_id")]
        from: ObjectId,
        #[serde(alias = "to_id")]
        to: ObjectId,
    },
    RemoveRef {
        #[serde(alias = "from_id")]
        from: ObjectId,
        #[serde(alias = "to_id")]
        to: ObjectId,
    },
    #[serde(alias = "add_root", alias = "mark_root")]
    MakeRoot {
        #[serde(alias = "object_id")]
        id: ObjectId,
    },
    #[serde(alias = "unmark_root")]
    RemoveRoot {
        #[serde(alias = "object_id")]
        id: ObjectId,
    },
    Collect,
    DetectLeaks,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Allocate { size } => write!(f, "allocate {}", size),
            Operation::AddRef { from, to } => write!(f, "add_ref {} -> {}", from, to),
            Operation::RemoveRef { from, to } => write!(f, "remove_ref {} -> {}", from, to),
            Operation::MakeRoot { id } => write!(f, "make_root {}", id),
            Operation::RemoveRoot { id } => write!(f, "remove_root {}", id),
            Operation::Collect => f.write_str("collect"),
            Operation::DetectLeaks => f.write_str("detect_leaks"),
        }
    }
}

/// Named operation stream with optional collector hints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Preferred strategy; drivers may override it
    #[serde(default, alias = "collection_type", skip_serializing_if = "Option::is_none")]
    pub collector: Option<Strategy>,

    /// Preferred heap capacity in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<usize>,

    #[serde(alias = "ops")]
    pub operations: Vec<Operation>,
}

impl Scenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            collector: None,
            capacity: None,
            operations: Vec::new(),
        }
    }

    /// Parse and validate a scenario from JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        let scenario: Scenario = serde_json::from_str(json)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Load a scenario file; an unnamed scenario takes the file stem as name
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let mut scenario = Self::from_json_str(&content)
            .map_err(|e| GcError::Scenario(format!("{}: {}", path.display(), e)))?;

        if scenario.name.is_empty() {
            scenario.name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        log::debug!(
            "loaded scenario '{}' ({} operations) from {}",
            scenario.name,
            scenario.operations.len(),
            path.display()
        );
        Ok(scenario)
    }

    /// Load every `.json` scenario in a directory, sorted by file name
    ///
    /// Files that fail to load are skipped with a warning; it is an error
    /// if none load.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Vec<Self>> {
        let dir = dir.as_ref();
        let mut paths: Vec<_> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.extension().map_or(false, |ext| ext == "json"))
            .collect();
        paths.sort();

        let mut scenarios = Vec::with_capacity(paths.len());
        for path in &paths {
            match Self::load(path) {
                Ok(scenario) => scenarios.push(scenario),
                Err(e) => log::warn!("skipping {}: {}", path.display(), e),
            }
        }

        if scenarios.is_empty() {
            return Err(GcError::Scenario(format!(
                "no loadable scenarios in {}",
                dir.display()
            )));
        }
        Ok(scenarios)
    }

    /// Write the scenario as pretty JSON, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject streams a collector could never make sense of
    ///
    /// Checks for an empty stream, zero-sized allocations, self edges and
    /// references to ids that no earlier `allocate` can have produced.
    pub fn validate(&self) -> Result<()> {
        if self.operations.is_empty() {
            return Err(GcError::Scenario(format!(
                "scenario '{}' has no operations",
                self.name
            )));
        }

        let mut allocated: u32 = 0;
        for (index, op) in self.operations.iter().enumerate() {
            let invalid = |reason: String| {
                GcError::Scenario(format!("operation {} ({}): {}", index, op, reason))
            };
            let check_known = |id: ObjectId| {
                if id.as_u32() >= allocated {
                    Err(invalid(format!("{} is referenced before it is allocated", id)))
                } else {
                    Ok(())
                }
            };

            match op {
                Operation::Allocate { size } => {
                    if *size == 0 {
                        return Err(invalid("size must be > 0".to_string()));
                    }
                    allocated += 1;
                },
                Operation::AddRef { from, to } | Operation::RemoveRef { from, to } => {
                    if from == to {
                        return Err(invalid("self reference".to_string()));
                    }
                    check_known(*from)?;
                    check_known(*to)?;
                },
                Operation::MakeRoot { id } | Operation::RemoveRoot { id } => check_known(*id)?,
                Operation::Collect | Operation::DetectLeaks => {},
            }
        }
        Ok(())
    }

    /// Number of `allocate` operations
    pub fn allocation_count(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::Allocate { .. }))
            .count()
    }

    /// Sum of all allocation sizes
    pub fn requested_bytes(&self) -> usize {
        self.operations
            .iter()
            .map(|op| match op {
                Operation::Allocate { size } => *size,
                _ => 0,
            })
            .sum()
    }
}

/// Incremental scenario construction that tracks the ids allocations will get
#[derive(Debug, Clone)]
pub struct ScenarioBuilder {
    scenario: Scenario,
    next_id: u32,
}

impl ScenarioBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            scenario: Scenario::new(name),
            next_id: 0,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.scenario.description = description.into();
        self
    }

    pub fn collector(mut self, strategy: Strategy) -> Self {
        self.scenario.collector = Some(strategy);
        self
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.scenario.capacity = Some(capacity);
        self
    }

    /// Append an allocation and return the id it will produce
    pub fn allocate(&mut self, size: usize) -> ObjectId {
        self.scenario.operations.push(Operation::Allocate { size });
        let id = ObjectId::new(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn add_ref(&mut self, from: ObjectId, to: ObjectId) -> &mut Self {
        self.scenario.operations.push(Operation::AddRef { from, to });
        self
    }

    pub fn remove_ref(&mut self, from: ObjectId, to: ObjectId) -> &mut Self {
        self.scenario
            .operations
            .push(Operation::RemoveRef { from, to });
        self
    }

    pub fn make_root(&mut self, id: ObjectId) -> &mut Self {
        self.scenario.operations.push(Operation::MakeRoot { id });
        self
    }

    pub fn remove_root(&mut self, id: ObjectId) -> &mut Self {
        self.scenario.operations.push(Operation::RemoveRoot { id });
        self
    }

    pub fn collect(&mut self) -> &mut Self {
        self.scenario.operations.push(Operation::Collect);
        self
    }

    pub fn detect_leaks(&mut self) -> &mut Self {
        self.scenario.operations.push(Operation::DetectLeaks);
        self
    }

    /// Ids handed out so far
    pub fn allocated(&self) -> u32 {
        self.next_id
    }

    pub fn build(self) -> Scenario {
        self.scenario
    }
}
