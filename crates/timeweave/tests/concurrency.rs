//! Independent solves sharing one read-only snapshot.

use std::sync::{Arc, Mutex};

use timeweave::prelude::*;
use timeweave::{
    EntityStore, JobResult, JobStatus, OptimizationConfig, RequirementId, SharedEntityStore,
};
use timeweave_test::campus;

fn config() -> SchedulerConfig {
    SchedulerConfig {
        optimization: OptimizationConfig {
            time_budget_millis: None,
            node_limit: 200,
            ..OptimizationConfig::default()
        },
        ..SchedulerConfig::default()
    }
}

#[test]
fn test_parallel_generations_agree() {
    let scheduler = Scheduler::new(config());
    let snapshot = Arc::new(campus::small_campus());
    let results: Mutex<Vec<AssignmentSet>> = Mutex::new(Vec::new());

    rayon::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|_| {
                let set = scheduler
                    .generate(snapshot.clone(), Deadline::none())
                    .unwrap()
                    .into_solution()
                    .unwrap()
                    .assignments;
                results.lock().unwrap().push(set);
            });
        }
    });

    let results = results.into_inner().unwrap();
    assert_eq!(results.len(), 4);
    assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
}

#[test]
fn test_concurrent_repairs_of_one_base_are_independent() {
    let scheduler = Scheduler::new(config());
    let snapshot = Arc::new(campus::three_sections());
    let base = campus::three_section_schedule();
    let changes = [
        ProposedChange::remove_room(2),
        ProposedChange::move_assignment(2, 3, 0, 3),
    ];

    let outcomes: Vec<RepairOutcome> = std::thread::scope(|scope| {
        let handles: Vec<_> = changes
            .iter()
            .map(|change| {
                let (scheduler, snapshot, base) = (&scheduler, snapshot.clone(), &base);
                scope.spawn(move || {
                    let graph = scheduler.propose_change(snapshot.clone(), base, change).unwrap();
                    scheduler.repair(snapshot, base, &graph, 2).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(outcomes[0].best().unwrap().moved, vec![RequirementId(1)]);
    assert_eq!(
        outcomes[1].best().unwrap().moved,
        vec![RequirementId(0), RequirementId(2)]
    );
    assert_eq!(base, campus::three_section_schedule());
}

#[test]
fn test_in_flight_solve_keeps_its_snapshot() {
    let store = SharedEntityStore::new(campus::single_lecture());
    let held = store.snapshot();
    store.publish(campus::small_campus());

    let scheduler = Scheduler::new(config());
    let old = scheduler.generate(held, Deadline::none()).unwrap();
    let new = scheduler.generate_from(&store, Deadline::none()).unwrap();
    assert_eq!(old.solution().unwrap().assignments.len(), 1);
    assert_eq!(new.solution().unwrap().assignments.len(), 14);
}

#[test]
fn test_background_jobs_through_the_scheduler() {
    let scheduler = Scheduler::new(config());
    let manager = scheduler.manager();
    let snapshot = Arc::new(campus::small_campus());

    let jobs: Vec<_> = (0..3)
        .map(|_| manager.submit_generate(snapshot.clone()))
        .collect();
    for job in &jobs {
        manager.wait(*job);
        assert_eq!(manager.status(*job), JobStatus::Finished);
    }
    let sets: Vec<AssignmentSet> = jobs
        .iter()
        .map(|job| match manager.take_result(*job) {
            Some(JobResult::Generated(Ok(outcome))) => outcome.into_solution().unwrap().assignments,
            other => panic!("unexpected result: {:?}", other),
        })
        .collect();
    assert!(sets.windows(2).all(|pair| pair[0] == pair[1]));
}
