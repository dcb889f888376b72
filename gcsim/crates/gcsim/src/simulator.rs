//! Simulator - Scenario Driver
//!
//! Feeds a [`Scenario`] to a collector one operation at a time, stamping
//! each with its step number. A failing operation is recorded in the report
//! and the run carries on; the heap is left as the failed call left it,
//! which for every validation failure means untouched.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::collector::Collector;
use crate::config::{GcConfig, Strategy};
use crate::error::Result;
use crate::gc::GarbageCollector;
use crate::heap::ObjectId;
use crate::logging::{BoxedSink, NullSink};
use crate::scenario::{Operation, Scenario};
use crate::stats::{GcStats, GcTimer};

/// What one operation did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    Allocated { id: ObjectId },
    Applied,
    Collected { freed_bytes: usize },
    Leaks { objects: Vec<ObjectId> },
    Failed { error: String },
}

impl StepOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, StepOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: u64,
    pub operation: Operation,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// Result of running one scenario under one strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub scenario: String,
    pub strategy: Strategy,
    pub steps: Vec<StepRecord>,
    pub failures: usize,
    pub alive_objects: usize,
    pub used_bytes: usize,
    pub free_bytes: usize,
    /// Leak scan taken after the last operation
    pub leaked: Vec<ObjectId>,
    pub stats: GcStats,
    pub elapsed_ms: f64,
}

impl SimulationReport {
    pub fn failed_steps(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps.iter().filter(|record| record.outcome.is_failure())
    }

    /// Ids returned by successful allocations, in order
    pub fn allocated_ids(&self) -> Vec<ObjectId> {
        self.steps
            .iter()
            .filter_map(|record| match record.outcome {
                StepOutcome::Allocated { id } => Some(id),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Scenario:        {}", self.scenario)?;
        writeln!(f, "Strategy:        {}", self.strategy)?;
        writeln!(
            f,
            "Operations:      {} ({} failed)",
            self.steps.len(),
            self.failures
        )?;
        writeln!(f, "Alive objects:   {}", self.alive_objects)?;
        writeln!(
            f,
            "Heap:            {} used / {} free bytes",
            self.used_bytes, self.free_bytes
        )?;
        writeln!(f, "Collections:     {}", self.stats.collections_run)?;
        writeln!(
            f,
            "Collected:       {} objects, {} bytes",
            self.stats.objects_collected, self.stats.bytes_freed
        )?;

        let leaked: Vec<String> = self.leaked.iter().map(|id| id.to_string()).collect();
        if leaked.is_empty() {
            writeln!(f, "Leaked:          none")?;
        } else {
            writeln!(f, "Leaked:          {} [{}]", leaked.len(), leaked.join(", "))?;
        }
        write!(f, "Elapsed:         {:.3} ms", self.elapsed_ms)
    }
}

/// Drives one collector through scenarios
pub struct Simulator<C: Collector = GarbageCollector> {
    collector: C,
    final_leak_scan: bool,
}

impl<C: Collector> Simulator<C> {
    pub fn new(collector: C) -> Self {
        Self {
            collector,
            final_leak_scan: true,
        }
    }

    /// Skip the leak scan normally taken after the last operation
    pub fn without_final_leak_scan(mut self) -> Self {
        self.final_leak_scan = false;
        self
    }

    pub fn collector(&self) -> &C {
        &self.collector
    }

    pub fn collector_mut(&mut self) -> &mut C {
        &mut self.collector
    }

    pub fn into_collector(self) -> C {
        self.collector
    }

    /// Apply one operation at `step`
    pub fn apply(&mut self, step: u64, op: &Operation) -> StepOutcome {
        self.collector.set_step(step);

        let result = match *op {
            Operation::Allocate { size } => self
                .collector
                .allocate(size)
                .map(|id| StepOutcome::Allocated { id }),
            Operation::AddRef { from, to } => self
                .collector
                .add_reference(from, to)
                .map(|()| StepOutcome::Applied),
            Operation::RemoveRef { from, to } => self
                .collector
                .remove_reference(from, to)
                .map(|()| StepOutcome::Applied),
            Operation::MakeRoot { id } => {
                self.collector.mark_root(id).map(|()| StepOutcome::Applied)
            },
            Operation::RemoveRoot { id } => {
                self.collector.unmark_root(id).map(|()| StepOutcome::Applied)
            },
            Operation::Collect => Ok(StepOutcome::Collected {
                freed_bytes: self.collector.collect(),
            }),
            Operation::DetectLeaks => Ok(StepOutcome::Leaks {
                objects: self.collector.detect_leaks(),
            }),
        };

        result.unwrap_or_else(|e| {
            log::warn!("step {} ({}) failed: {}", step, op, e);
            StepOutcome::Failed {
                error: e.to_string(),
            }
        })
    }

    /// Run every operation of `scenario` in order
    pub fn run(&mut self, scenario: &Scenario) -> SimulationReport {
        let timer = GcTimer::start();
        let strategy = self.collector.strategy();
        log::info!(
            "running '{}' ({} operations) under {}",
            scenario.name,
            scenario.operations.len(),
            strategy
        );

        let mut steps = Vec::with_capacity(scenario.operations.len());
        for (index, op) in scenario.operations.iter().enumerate() {
            let step = index as u64;
            let outcome = self.apply(step, op);
            steps.push(StepRecord {
                step,
                operation: op.clone(),
                outcome,
            });
        }

        let leaked = if self.final_leak_scan {
            self.collector.set_step(scenario.operations.len() as u64);
            self.collector.detect_leaks()
        } else {
            Vec::new()
        };

        if let Err(e) = self.collector.flush_events() {
            log::warn!("failed to flush events: {}", e);
        }
        if let Err(e) = self.collector.check_invariants() {
            log::error!("heap invariant broken after '{}': {}", scenario.name, e);
        }

        let failures = steps.iter().filter(|r| r.outcome.is_failure()).count();
        SimulationReport {
            scenario: scenario.name.clone(),
            strategy,
            steps,
            failures,
            alive_objects: self.collector.alive_count(),
            used_bytes: self.collector.used_bytes(),
            free_bytes: self.collector.free_bytes(),
            leaked,
            stats: self.collector.stats().clone(),
            elapsed_ms: timer.elapsed_ms(),
        }
    }
}

/// Run a scenario under a fresh collector configured by `config`
///
/// The scenario's own capacity hint wins over `config.capacity`.
pub fn run_scenario(scenario: &Scenario, config: &GcConfig, sink: BoxedSink) -> Result<SimulationReport> {
    let mut config = config.clone();
    if let Some(capacity) = scenario.capacity {
        config = config.with_capacity(capacity);
    }
    let collector = GarbageCollector::new(config, sink)?;
    let mut simulator = Simulator::new(collector);
    let report = simulator.run(scenario);

    if let Err(e) = simulator.collector_mut().close_events() {
        log::warn!("failed to close event sink: {}", e);
    }
    Ok(report)
}

/// Run a scenario once per strategy, events discarded
pub fn compare(scenario: &Scenario, base: &GcConfig) -> Result<Vec<SimulationReport>> {
    compare_with(scenario, base, |_| Box::new(NullSink))
}

/// Run a scenario once per strategy with a sink chosen per strategy
pub fn compare_with<F>(scenario: &Scenario, base: &GcConfig, mut sink_for: F) -> Result<Vec<SimulationReport>>
where
    F: FnMut(Strategy) -> BoxedSink,
{
    Strategy::ALL
        .into_iter()
        .map(|strategy| {
            let config = base.clone().with_strategy(strategy);
            run_scenario(scenario, &config, sink_for(strategy))
        })
        .collect()
}
