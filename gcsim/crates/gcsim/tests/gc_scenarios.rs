//! Scenario Tests - Loading, Simulation and Comparison
//!
//! End-to-end runs through the public driver surface: scenario files,
//! the simulator, the JSON event log and the perf suite.

use std::fs;

use gcsim::scenario::generate::{self, Generator};
use gcsim::simulator::{self, run_scenario};
use gcsim::{
    Collector, GcConfig, JsonLinesSink, NullSink, ObjectId, Operation, PerfSuite, Scenario,
    Simulator, StepOutcome, Strategy, Workload,
};
use tempfile::TempDir;

const ROOTED_CYCLE: &str = r#"{
    "name": "rooted_cycle",
    "description": "root holding a three-object cycle, then dropped",
    "operations": [
        { "op": "allocate", "size": 64 },
        { "op": "allocate", "size": 64 },
        { "op": "allocate", "size": 64 },
        { "op": "allocate", "size": 64 },
        { "op": "make_root", "id": 0 },
        { "op": "add_ref", "from": 0, "to": 1 },
        { "op": "add_ref", "from": 1, "to": 2 },
        { "op": "add_ref", "from": 2, "to": 3 },
        { "op": "add_ref", "from": 3, "to": 1 },
        { "op": "remove_root", "id": 0 },
        { "op": "collect" },
        { "op": "detect_leaks" }
    ]
}"#;

fn ids(raw: &[u32]) -> Vec<ObjectId> {
    raw.iter().copied().map(ObjectId::new).collect()
}

/// ============================================================================
/// SIMULATION
/// ============================================================================

/// Test the rooted cycle scenario under every strategy
///
/// **Invariant verified:** Mark-Sweep frees 256 bytes and reports no
/// leaks; counting strategies keep the cycle and report it
#[test]
fn test_rooted_cycle_scenario() {
    let scenario = Scenario::from_json_str(ROOTED_CYCLE).unwrap();
    let reports = simulator::compare(&scenario, &GcConfig::default()).unwrap();

    for report in reports {
        assert_eq!(report.failures, 0, "[{}]", report.strategy);
        let collect = &report.steps[10];
        let leaks = &report.steps[11];

        match report.strategy {
            Strategy::MarkSweep => {
                assert_eq!(collect.outcome, StepOutcome::Collected { freed_bytes: 256 });
                assert_eq!(leaks.outcome, StepOutcome::Leaks { objects: vec![] });
                assert_eq!(report.used_bytes, 0);
            },
            Strategy::RefCount => {
                assert_eq!(collect.outcome, StepOutcome::Collected { freed_bytes: 0 });
                assert_eq!(leaks.outcome, StepOutcome::Leaks { objects: ids(&[1, 2, 3]) });
                assert_eq!(report.used_bytes, 192);
            },
            Strategy::Cascade => {
                assert_eq!(collect.outcome, StepOutcome::Collected { freed_bytes: 64 });
                assert_eq!(leaks.outcome, StepOutcome::Leaks { objects: ids(&[1, 2, 3]) });
                assert_eq!(report.used_bytes, 192);
            },
        }
    }
}

/// Test that a scenario's collector hint is honored by drivers that ask
#[test]
fn test_collector_hint_parsed() {
    let json = r#"{ "collector": "rc", "operations": [ { "op": "allocate", "size": 8 } ] }"#;
    let scenario = Scenario::from_json_str(json).unwrap();
    let strategy = scenario.collector.unwrap_or_default();

    let config = GcConfig::default().with_strategy(strategy);
    let report = run_scenario(&scenario, &config, Box::new(NullSink)).unwrap();
    assert_eq!(report.strategy, Strategy::RefCount);
}

/// Test that every generator runs cleanly under every strategy
///
/// **Bug this finds:** Generators emitting streams a collector rejects
#[test]
fn test_generators_run_without_failures() {
    for generator in Generator::ALL {
        if generator == Generator::Random {
            continue;
        }
        let scenario = generator.generate(20, 0);
        for report in simulator::compare(&scenario, &GcConfig::default()).unwrap() {
            assert_eq!(
                report.failures, 0,
                "{} under {}: {:?}",
                generator,
                report.strategy,
                report.failed_steps().collect::<Vec<_>>()
            );
        }
    }
}

/// Test that rooted shapes survive pressure collections while being built
///
/// **Invariant verified:** with a threshold well below the scenario's
/// total bytes, collections during the build free nothing and no later
/// operation touches a dead object
#[test]
fn test_rooted_generators_survive_pressure_collections() {
    let shapes = [
        generate::linear_chain(10),
        generate::cyclic_graph(10, 3),
        generate::cascade_tree(10, 3),
    ];

    for scenario in &shapes {
        let requested = scenario.requested_bytes();
        let config = GcConfig::default()
            .with_capacity(requested)
            .with_threshold(requested / 3);

        for report in simulator::compare(scenario, &config).unwrap() {
            assert_eq!(
                report.failures, 0,
                "{} under {}: {:?}",
                scenario.name,
                report.strategy,
                report.failed_steps().collect::<Vec<_>>()
            );
            // Two explicit collections plus at least one forced by pressure.
            assert!(report.stats.collections_run > 2, "{}", scenario.name);
        }
    }
}

/// Test that random streams never break heap invariants
#[test]
fn test_random_scenarios_keep_invariants() {
    for seed in 0..20 {
        let scenario = generate::random(300, seed);
        for strategy in Strategy::ALL {
            let config = GcConfig::default().with_strategy(strategy);
            let gc = gcsim::GarbageCollector::new(config, Box::new(NullSink)).unwrap();
            let mut sim = Simulator::new(gc);
            sim.run(&scenario);
            sim.collector().check_invariants().unwrap();
        }
    }
}

/// Test the cascade chain generator
#[test]
fn test_cascade_chain_scenario() {
    let scenario = generate::cascade_chain(10);
    for report in simulator::compare(&scenario, &GcConfig::default()).unwrap() {
        assert_eq!(report.alive_objects, 1, "[{}] only the head remains", report.strategy);
        assert_eq!(report.stats.objects_collected, 10);
    }
}

/// ============================================================================
/// EVENT LOG
/// ============================================================================

/// Test that the JSON lines log records one line per event
#[test]
fn test_json_event_log() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("logs").join("events.jsonl");
    let scenario = Scenario::from_json_str(ROOTED_CYCLE).unwrap();

    let sink = JsonLinesSink::create(&path, true).unwrap();
    let config = GcConfig::default().with_strategy(Strategy::RefCount);
    run_scenario(&scenario, &config, Box::new(sink)).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<serde_json::Value> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert!(lines.iter().all(|line| line.get("timestamp").is_some()));
    assert_eq!(lines[0]["event"], "allocate");
    assert_eq!(lines[0]["object"], 0);

    let deletes: Vec<&serde_json::Value> =
        lines.iter().filter(|line| line["event"] == "delete").collect();
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0]["object"], 0);
    assert_eq!(deletes[0]["step"], 9);

    // three leaks from the scenario, three from the final scan
    let leaks = lines.iter().filter(|line| line["event"] == "leak").count();
    assert_eq!(leaks, 6);
}

/// ============================================================================
/// FILES
/// ============================================================================

/// Test saving generated scenarios and loading the directory back
#[test]
fn test_generated_scenarios_round_trip_through_files() {
    let dir = TempDir::new().unwrap();
    for generator in [Generator::Basic, Generator::CycleLeak] {
        let scenario = generator.generate(3, 0);
        scenario
            .save(dir.path().join(format!("{}.json", generator)))
            .unwrap();
    }

    let loaded = Scenario::load_dir(dir.path()).unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].name, "basic_3");
    assert_eq!(loaded[1], generate::cycle_leak(3));
    assert!(matches!(loaded[1].operations[0], Operation::Allocate { size: 64 }));
}

/// ============================================================================
/// PERF
/// ============================================================================

/// Test that the perf suite tells cycle-reclaiming strategies apart
#[test]
fn test_perf_suite_cyclic_workload() {
    let report = PerfSuite::new()
        .with_sizes(vec![31])
        .with_workloads(vec![Workload::CyclicGraph { cycle_len: 5 }])
        .run()
        .unwrap();

    for result in &report.results {
        assert_eq!(result.total_objects, 31);
        if result.strategy.reclaims_cycles() {
            assert_eq!(result.objects_leaked, 0);
        } else {
            assert_eq!(result.objects_leaked, 30);
        }
    }
}
