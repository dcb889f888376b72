//! Performance comparison across strategies.
//!
//! Each run builds one workload graph under a root, collects, drops the
//! root, collects again and finishes with a leak scan. Results are plain
//! serde records so they can be archived as JSON and compared later.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::config::{GcConfig, Strategy};
use crate::error::Result;
use crate::logging::NullSink;
use crate::scenario::generate::{self, OBJECT_SIZE};
use crate::scenario::Scenario;
use crate::simulator::run_scenario;

/// Graph shape measured by one perf run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Workload {
    LinearChain,
    CyclicGraph { cycle_len: usize },
    CascadeTree { branching: usize },
}

impl Workload {
    pub fn defaults() -> Vec<Workload> {
        vec![
            Workload::LinearChain,
            Workload::CyclicGraph { cycle_len: 3 },
            Workload::CascadeTree { branching: 3 },
        ]
    }

    pub fn name(&self) -> String {
        match self {
            Workload::LinearChain => "linear_chain".to_string(),
            Workload::CyclicGraph { cycle_len } => format!("cyclic_graph_{}", cycle_len),
            Workload::CascadeTree { branching } => format!("cascade_tree_{}", branching),
        }
    }

    pub fn scenario(&self, objects: usize) -> Scenario {
        match *self {
            Workload::LinearChain => generate::linear_chain(objects),
            Workload::CyclicGraph { cycle_len } => generate::cyclic_graph(objects, cycle_len),
            Workload::CascadeTree { branching } => generate::cascade_tree(objects, branching),
        }
    }
}

/// Measurements of one (workload, size, strategy) run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerfResult {
    pub test_name: String,
    pub workload: Workload,
    pub strategy: Strategy,
    pub total_objects: usize,
    pub total_operations: usize,
    pub execution_time_ms: f64,
    pub objects_collected: u64,
    pub objects_leaked: usize,
    pub memory_used: usize,
    pub memory_freed: u64,
    pub collection_runs: u64,
    pub timestamp: String,
}

/// Matrix of workloads, sizes and strategies
#[derive(Debug, Clone)]
pub struct PerfSuite {
    sizes: Vec<usize>,
    strategies: Vec<Strategy>,
    workloads: Vec<Workload>,
}

impl Default for PerfSuite {
    fn default() -> Self {
        Self {
            sizes: vec![100, 1000],
            strategies: Strategy::ALL.to_vec(),
            workloads: Workload::defaults(),
        }
    }
}

impl PerfSuite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sizes(mut self, sizes: Vec<usize>) -> Self {
        self.sizes = sizes;
        self
    }

    pub fn with_strategies(mut self, strategies: Vec<Strategy>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn with_workloads(mut self, workloads: Vec<Workload>) -> Self {
        self.workloads = workloads;
        self
    }

    /// Measure a single run
    pub fn run_one(workload: Workload, objects: usize, strategy: Strategy) -> Result<PerfResult> {
        let scenario = workload.scenario(objects);
        let capacity = (scenario.requested_bytes() * 2).max(OBJECT_SIZE);
        let config = GcConfig::default()
            .with_strategy(strategy)
            .with_capacity(capacity);

        let report = run_scenario(&scenario, &config, Box::new(NullSink))?;
        if report.failures > 0 {
            log::warn!(
                "{} under {}: {} operations failed",
                scenario.name,
                strategy,
                report.failures
            );
        }

        Ok(PerfResult {
            test_name: format!("{}_{}", workload.name(), objects),
            workload,
            strategy,
            total_objects: scenario.allocation_count(),
            total_operations: scenario.operations.len(),
            execution_time_ms: report.elapsed_ms,
            objects_collected: report.stats.objects_collected,
            objects_leaked: report.leaked.len(),
            memory_used: scenario.requested_bytes(),
            memory_freed: report.stats.bytes_freed,
            collection_runs: report.stats.collections_run,
            timestamp: Local::now().to_rfc3339(),
        })
    }

    pub fn run(&self) -> Result<PerfReport> {
        let mut results = Vec::new();
        for workload in &self.workloads {
            for &objects in &self.sizes {
                for &strategy in &self.strategies {
                    log::info!("perf: {} x {} under {}", workload.name(), objects, strategy);
                    results.push(Self::run_one(*workload, objects, strategy)?);
                }
            }
        }
        Ok(PerfReport {
            generated_at: Local::now().to_rfc3339(),
            results,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerfReport {
    pub generated_at: String,
    pub results: Vec<PerfResult>,
}

impl PerfReport {
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        log::info!("perf results written to {}", path.display());
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn for_strategy(&self, strategy: Strategy) -> impl Iterator<Item = &PerfResult> {
        self.results.iter().filter(move |r| r.strategy == strategy)
    }

    /// Fixed-width table, one row per result
    pub fn summary_table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<24} {:<12} {:>8} {:>10} {:>10} {:>8} {:>12}",
            "Test", "Strategy", "Objects", "Time (ms)", "Collected", "Leaked", "Freed (B)"
        );
        let _ = writeln!(out, "{}", "-".repeat(90));
        for r in &self.results {
            let _ = writeln!(
                out,
                "{:<24} {:<12} {:>8} {:>10.3} {:>10} {:>8} {:>12}",
                r.test_name,
                r.strategy.as_str(),
                r.total_objects,
                r.execution_time_ms,
                r.objects_collected,
                r.objects_leaked,
                r.memory_freed
            );
        }
        out
    }
}
