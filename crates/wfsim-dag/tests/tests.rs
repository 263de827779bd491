use std::rc::Rc;

use rand::prelude::*;
use rand_pcg::Pcg64;

use wfsim_dag::config::SimulationConfig;
use wfsim_dag::error::{ActionError, ConfigError, GraphError, SimulationError};
use wfsim_dag::event::{Event, EventKind, SimEvent};
use wfsim_dag::resource::Resource;
use wfsim_dag::scheduler::{Action, Scheduler, Settings};
use wfsim_dag::scheduler_resolver::{default_scheduler_resolver, SchedulerParams};
use wfsim_dag::schedulers::adaptive::AdaptiveScheduler;
use wfsim_dag::schedulers::common::ExactCosts;
use wfsim_dag::schedulers::greedy::GreedyScheduler;
use wfsim_dag::schedulers::heft::HeftScheduler;
use wfsim_dag::simulator::Simulator;
use wfsim_dag::trace_log::TraceEvent;
use wfsim_dag::workflow::Workflow;

const EPS: f64 = 1e-9;
const SCHEDULERS: [&str; 4] = ["greedy", "heft", "adaptive", "adaptive[hide_profile=false]"];

fn assert_float_eq(x: f64, y: f64, eps: f64) {
    assert!(
        (x - y).abs() < eps || (x.max(y) - x.min(y)) / x.min(y) < eps,
        "Values do not match: {:.15} vs {:.15}",
        x,
        y
    );
}

fn gen_dag(rng: &mut Pcg64, num_tasks: usize, num_edges: usize) -> Workflow {
    let mut workflow = Workflow::new();
    for _ in 0..num_tasks {
        workflow.add_task(rng.gen_range(0.5..10.));
    }

    let mut tasks_topsort: Vec<usize> = (0..num_tasks).collect();
    for i in 0..num_tasks {
        tasks_topsort.swap(i, rng.gen_range(0..i + 1));
    }

    for _ in 0..num_edges {
        let a = rng.gen_range(0..num_tasks);
        let b = rng.gen_range(0..num_tasks);
        if a == b {
            continue;
        }
        let (from, to) = (a.min(b), a.max(b));
        workflow
            .add_dependency(tasks_topsort[from], tasks_topsort[to], rng.gen_range(0. ..3.))
            .unwrap();
    }
    workflow
}

fn gen_cyclic(rng: &mut Pcg64, num_tasks: usize, num_edges: usize) -> Workflow {
    let mut workflow = gen_dag(rng, num_tasks, num_edges);
    let cycle_len = rng.gen_range(2..num_tasks + 1);
    let mut cycle: Vec<usize> = (0..num_tasks).collect();
    cycle.shuffle(rng);
    cycle.truncate(cycle_len);
    for i in 0..cycle_len {
        workflow.add_dependency(cycle[i], cycle[(i + 1) % cycle_len], 1.).unwrap();
    }
    workflow
}

fn gen_resources(rng: &mut Pcg64, sim: &mut Simulator, num_resources: usize) {
    for _ in 0..num_resources {
        sim.add_resource(Resource::new(
            rng.gen_range(1..4),
            rng.gen_range(0.5..2.),
            rng.gen_range(0. ..0.5),
        ));
    }
}

fn make_scheduler(name: &str) -> Box<dyn Scheduler> {
    default_scheduler_resolver(&SchedulerParams::from_str(name).unwrap()).unwrap()
}

fn quiet_settings() -> Settings {
    Settings {
        logging: false,
        ..Settings::default()
    }
}

fn task_events(sim: &Simulator, task: usize) -> Vec<TraceEvent> {
    sim.trace_log()
        .events
        .iter()
        .filter(|e| e.task() == Some(task))
        .copied()
        .collect()
}

fn check_dependency_order(sim: &Simulator, settings: &Settings) {
    let workflow = sim.workflow();
    for task in 0..workflow.task_count() {
        let finish = sim.completion_time()[task].unwrap();
        for &(pred, weight) in workflow.predecessors(task) {
            let pred_finish = sim.completion_time()[pred].unwrap();
            let transfer = if settings.optimize_transfers && sim.task_location()[pred] == sim.task_location()[task] {
                0.
            } else {
                settings.transfer_time(weight)
            };
            assert!(
                finish >= pred_finish + transfer - EPS,
                "task {} finished at {} before its input from {} ({} + {})",
                task,
                finish,
                pred,
                pred_finish,
                transfer
            );
        }
    }
}

fn check_slot_usage(sim: &Simulator) {
    let mut used = vec![0; sim.resources().len()];
    for event in sim.trace_log().events.iter() {
        match *event {
            TraceEvent::TaskScheduled { resource, .. } => {
                used[resource] += 1;
                assert!(used[resource] <= sim.resources()[resource].slots);
            }
            TraceEvent::TaskFinished { resource, .. }
            | TraceEvent::TaskFailed { resource, .. }
            | TraceEvent::TaskLost { resource, .. } => {
                used[resource] -= 1;
            }
            TraceEvent::TaskStarted { resource, slot, .. } => {
                assert!(slot < sim.resources()[resource].slots);
            }
            TraceEvent::ResourceDown { .. } | TraceEvent::ResourceUp { .. } => {}
        }
    }
    assert!(used.iter().all(|&u| u == 0));
}

#[test]
fn test_acyclicity() {
    for seed in 0..50 {
        let mut rng = Pcg64::seed_from_u64(seed);
        let num_tasks = rng.gen_range(2..40);
        let num_edges = rng.gen_range(0..num_tasks * 3);
        assert_eq!(gen_dag(&mut rng, num_tasks, num_edges).check_correctness(), Ok(()));
        assert!(matches!(
            gen_cyclic(&mut rng, num_tasks, num_edges).check_correctness(),
            Err(GraphError::Cycle { .. })
        ));
    }
}

#[test]
fn test_cyclic_workflow_is_rejected() {
    let workflow = Workflow::from_parts(vec![1., 1.], vec![vec![(1, 0.)], vec![(0, 0.)]]);
    let mut sim = Simulator::new(123, workflow, Box::new(GreedyScheduler::new()), quiet_settings());
    sim.add_resource(Resource::new(1, 1., 0.));
    assert!(matches!(
        sim.run(),
        Err(SimulationError::Graph(GraphError::Cycle { .. }))
    ));
    assert!(sim.trace_log().events.is_empty());
}

#[test]
fn test_random_runs() {
    for name in SCHEDULERS {
        for seed in 0..5 {
            let mut rng = Pcg64::seed_from_u64(seed);
            let workflow = gen_dag(&mut rng, 40, 80);
            let settings = Settings {
                task_fail_prob: 0.2,
                net_speed: rng.gen_range(0.5..2.),
                ..quiet_settings()
            };
            let mut sim = Simulator::new(seed, workflow, make_scheduler(name), settings.clone());
            gen_resources(&mut rng, &mut sim, 3);
            sim.inject_resource_failure(0, 5., 3.).unwrap();
            sim.inject_resource_failure(1, 10., 4.).unwrap();
            sim.inject_resource_failure(0, 20., 1.).unwrap();

            let stats = sim.run().unwrap();
            assert_eq!(stats.completed_tasks, 40, "scheduler {}", name);
            assert!(sim.completed().iter().all(|&c| c));
            check_dependency_order(&sim, &settings);
            check_slot_usage(&sim);
            assert_eq!(
                stats.task_failures,
                sim.task_failures().iter().map(|&f| f as usize).sum::<usize>()
            );
        }
    }
}

#[test]
fn test_runs_are_reproducible() {
    for name in SCHEDULERS {
        let run = || {
            let mut rng = Pcg64::seed_from_u64(7);
            let workflow = gen_dag(&mut rng, 30, 60);
            let settings = Settings {
                task_fail_prob: 0.3,
                ..quiet_settings()
            };
            let mut sim = Simulator::new(123, workflow, make_scheduler(name), settings);
            gen_resources(&mut rng, &mut sim, 4);
            sim.inject_resource_failure(2, 3., 2.).unwrap();
            sim.run().unwrap();
            sim.trace_log().events.clone()
        };
        assert_eq!(run(), run());
    }
}

#[test]
fn test_greedy_first_fit() {
    let mut sim = Simulator::new(
        123,
        Workflow::from_parts(vec![1.], vec![vec![]]),
        Box::new(GreedyScheduler::new()),
        quiet_settings(),
    );
    sim.add_resource(Resource::new(1, 1., 0.));
    sim.add_resource(Resource::new(1, 1., 0.));
    sim.run().unwrap();
    assert_eq!(sim.task_location()[0], Some(0));
    assert_eq!(
        sim.trace_log().events[0],
        TraceEvent::TaskScheduled {
            time: 0.,
            task: 0,
            resource: 0
        }
    );

    let mut sim = Simulator::new(
        123,
        Workflow::from_parts(vec![1., 1., 1.], vec![vec![], vec![], vec![]]),
        Box::new(GreedyScheduler::new()),
        quiet_settings(),
    );
    sim.add_resource(Resource::new(2, 1., 0.));
    sim.add_resource(Resource::new(1, 1., 0.));
    sim.run().unwrap();
    assert_eq!(sim.task_location(), &[Some(0), Some(0), Some(1)]);
}

#[test]
fn test_heft_plan_reconstruction() {
    let workflow = Rc::new(Workflow::topcuoglu());
    let mut resources = vec![
        Resource::new(1, 1., 0.),
        Resource::new(2, 2., 0.),
        Resource::new(1, 0.5, 0.),
    ];
    for (id, resource) in resources.iter_mut().enumerate() {
        resource.id = id;
    }
    let settings = Settings {
        optimize_transfers: false,
        ..quiet_settings()
    };

    let mut scheduler = HeftScheduler::new();
    let actions = scheduler.init(workflow.clone(), resources.clone(), &settings);
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].task, 0);

    let planner = scheduler.planner();
    let mut makespan: f64 = 0.;
    for task in 0..workflow.task_count() {
        let planned = planner.plan[task].unwrap();
        let time = planner.task_time(
            task,
            &resources[planned.resource],
            &workflow,
            &settings,
            &ExactCosts,
        );
        assert_float_eq(planned.eft, planned.est + time, EPS);
        for &(pred, _) in workflow.predecessors(task) {
            assert!(planned.est >= planner.plan[pred].unwrap().eft - EPS);
        }
        makespan = makespan.max(planned.eft);
    }
    assert_float_eq(scheduler.expected_makespan().unwrap(), makespan, EPS);

    for (resource_id, resource) in resources.iter().enumerate() {
        for slot in 0..resource.slots {
            let intervals = planner.timeline(resource_id, slot).intervals().collect::<Vec<_>>();
            for pair in intervals.windows(2) {
                assert!(pair[1].start >= pair[0].finish - EPS);
            }
        }
    }

    // the plan is kept by the simulation without failures
    let mut sim = Simulator::new(123, Workflow::topcuoglu(), Box::new(HeftScheduler::new()), settings);
    for resource in resources.into_iter() {
        sim.add_resource(resource);
    }
    let stats = sim.run().unwrap();
    assert_float_eq(stats.expected_makespan.unwrap(), makespan, EPS);
    assert_eq!(stats.completed_tasks, 10);
}

#[test]
fn test_heft_reported_makespan() {
    let resources = vec![Resource::new(1, 1., 0.)];
    let mut scheduler = HeftScheduler::new();
    let settings = Settings {
        optimize_transfers: false,
        ..quiet_settings()
    };
    scheduler.init(Rc::new(Workflow::diamond()), resources, &settings);
    assert_float_eq(scheduler.expected_makespan().unwrap(), 17., EPS);
    assert_eq!(GreedyScheduler::new().expected_makespan(), None);
}

fn diamond_simulator(name: &str, settings: Settings) -> Simulator {
    let mut sim = Simulator::new(123, Workflow::diamond(), make_scheduler(name), settings);
    sim.add_resource(Resource::new(1, 1., 0.));
    sim.add_resource(Resource::new(1, 1., 0.));
    sim
}

#[test]
fn test_diamond() {
    let mut sim = diamond_simulator("greedy", quiet_settings());
    let stats = sim.run().unwrap();
    assert_eq!(stats.completed_tasks, 4);
    assert_eq!(stats.total_tasks, 4);
    assert_eq!(stats.task_failures, 0);
    assert_eq!(stats.max_used_slots, 2);

    let c = sim.completion_time().iter().map(|t| t.unwrap()).collect::<Vec<_>>();
    assert!(c[0] < c[1] && c[0] < c[2]);
    assert!(c[1].max(c[2]) < c[3]);
    assert_float_eq(stats.makespan, c[3], EPS);
    // 1 and 2 run in parallel on different resources
    assert_ne!(sim.task_location()[1], sim.task_location()[2]);
}

#[test]
fn test_diamond_with_failures() {
    for name in SCHEDULERS {
        let settings = Settings {
            task_fail_prob: 1.,
            max_task_failures: Some(1),
            ..quiet_settings()
        };
        let mut sim = diamond_simulator(name, settings);
        let stats = sim.run().unwrap();
        assert_eq!(stats.completed_tasks, 4);
        assert_eq!(stats.task_failures, 4);
        assert_eq!(sim.task_failures(), &[1, 1, 1, 1]);
        for task in 0..4 {
            let outcomes = task_events(&sim, task)
                .into_iter()
                .filter(|e| matches!(e, TraceEvent::TaskFailed { .. } | TraceEvent::TaskFinished { .. }))
                .collect::<Vec<_>>();
            assert_eq!(outcomes.len(), 2);
            assert!(matches!(outcomes[0], TraceEvent::TaskFailed { .. }));
            assert!(matches!(outcomes[1], TraceEvent::TaskFinished { .. }));
        }
    }
}

#[test]
fn test_outage_during_task() {
    for name in SCHEDULERS {
        let mut sim = Simulator::new(
            123,
            Workflow::from_parts(vec![10.], vec![vec![]]),
            make_scheduler(name),
            quiet_settings(),
        );
        sim.add_resource(Resource::new(1, 1., 0.));
        sim.inject_resource_failure(0, 1., 5.).unwrap();
        let stats = sim.run().unwrap();

        assert!(sim.completed()[0]);
        assert_eq!(stats.invalidated_events, 1);
        assert_eq!(stats.lost_tasks, 1);

        let events = task_events(&sim, 0);
        assert_eq!(events.len(), 6);
        assert!(matches!(events[0], TraceEvent::TaskScheduled { .. }));
        assert!(matches!(events[1], TraceEvent::TaskStarted { .. }));
        assert_eq!(
            events[2],
            TraceEvent::TaskLost {
                time: 1.,
                task: 0,
                resource: 0
            }
        );
        assert!(matches!(events[3], TraceEvent::TaskScheduled { .. }));
        assert_float_eq(events[3].time(), 6., EPS);
        assert!(matches!(events[4], TraceEvent::TaskStarted { .. }));
        assert!(matches!(events[5], TraceEvent::TaskFinished { .. }));
        assert!(events[5].time() > 6.);
        assert_float_eq(sim.completion_time()[0].unwrap(), events[5].time(), EPS);
    }
}

#[test]
fn test_outage_moves_tasks() {
    for name in SCHEDULERS {
        let mut sim = Simulator::new(
            123,
            Workflow::from_parts(vec![10., 10.], vec![vec![], vec![]]),
            make_scheduler(name),
            quiet_settings(),
        );
        sim.add_resource(Resource::new(2, 2., 0.));
        sim.add_resource(Resource::new(1, 1., 0.));
        sim.inject_resource_failure(0, 1., 100.).unwrap();
        let stats = sim.run().unwrap();

        assert_eq!(stats.completed_tasks, 2, "scheduler {}", name);
        for task in 0..2 {
            let finish = sim.completion_time()[task].unwrap();
            if sim.task_location()[task] == Some(0) {
                assert!(finish > 101.);
            }
        }
        check_slot_usage(&sim);
    }
}

#[test]
fn test_adaptive_learns_durations() {
    // three isolated tasks form a single structural class
    let workflow = Rc::new(Workflow::from_parts(vec![4., 4., 4.], vec![vec![], vec![], vec![]]));
    let mut scheduler = AdaptiveScheduler::new(true);
    let actions = scheduler.init(workflow, vec![Resource::new(1, 1., 0.)], &quiet_settings());
    assert_eq!(actions, vec![Action::new(0, 0)]);
    for &rank in scheduler.ranks() {
        assert_float_eq(rank, 1., EPS);
    }
    assert_eq!(scheduler.costs().estimate(1), None);
    let planned = scheduler.planner().plan[2].unwrap();
    assert_float_eq(planned.est, 2., EPS);
    assert_float_eq(planned.eft, 3., EPS);

    let started = SimEvent::TaskStarted {
        task: 0,
        resource: 0,
        slot: 0,
    };
    assert!(scheduler.notify(&Event { id: 0, time: 0.5, data: started }).is_empty());
    let finished = SimEvent::TaskFinished {
        task: 0,
        resource: 0,
        slot: 0,
    };
    let actions = scheduler.notify(&Event { id: 1, time: 4.5, data: finished });
    assert_eq!(actions, vec![Action::new(1, 0)]);

    // the observed duration becomes the estimate of the whole class
    assert_float_eq(scheduler.costs().estimate(2).unwrap(), 4., EPS);
    for &rank in scheduler.ranks() {
        assert_float_eq(rank, 4., EPS);
    }
    let planned = scheduler.planner().plan[1].unwrap();
    assert_float_eq(planned.est, 4.5, EPS);
    assert_float_eq(planned.eft, 8.5, EPS);
    let planned = scheduler.planner().plan[2].unwrap();
    assert_float_eq(planned.est, 8.5, EPS);
    assert_float_eq(planned.eft, 12.5, EPS);

    let actions = scheduler.notify(&Event {
        id: 2,
        time: 5.,
        data: SimEvent::ResourceDown { resource: 0 },
    });
    assert!(actions.is_empty());
    assert!(scheduler.planner().plan[1].is_none());
    assert!(scheduler.planner().plan[2].is_none());

    // slot becomes free at recovery time instead of the eft of the lost task
    let actions = scheduler.notify(&Event {
        id: 3,
        time: 7.,
        data: SimEvent::ResourceUp { resource: 0 },
    });
    assert_eq!(actions, vec![Action::new(1, 0)]);
    let planned = scheduler.planner().plan[1].unwrap();
    assert_float_eq(planned.est, 7., EPS);
    assert_float_eq(planned.eft, 11., EPS);
    let planned = scheduler.planner().plan[2].unwrap();
    assert_float_eq(planned.est, 11., EPS);
    assert_float_eq(scheduler.planner().slot_free_time[0][0], 11., EPS);
}

#[test]
fn test_adaptive_completes_random_workflow() {
    let mut rng = Pcg64::seed_from_u64(3);
    let workflow = gen_dag(&mut rng, 30, 50);
    let mut sim = Simulator::new(123, workflow, Box::new(AdaptiveScheduler::new(true)), quiet_settings());
    gen_resources(&mut rng, &mut sim, 3);
    let stats = sim.run().unwrap();
    assert_eq!(stats.completed_tasks, 30);
    assert!(stats.expected_makespan.is_some());
    check_dependency_order(&sim, &Settings::default());
}

struct ScriptedScheduler {
    init_actions: Vec<Action>,
    reactions: Vec<(EventKind, Action)>,
}

impl Scheduler for ScriptedScheduler {
    fn init(&mut self, _workflow: Rc<Workflow>, _resources: Vec<Resource>, _settings: &Settings) -> Vec<Action> {
        std::mem::take(&mut self.init_actions)
    }

    fn notify(&mut self, event: &Event) -> Vec<Action> {
        self.reactions
            .iter()
            .filter(|(kind, _)| *kind == event.data.kind())
            .map(|&(_, action)| action)
            .collect()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn run_scripted(
    workflow: Workflow,
    slots: &[usize],
    init_actions: Vec<Action>,
    reactions: Vec<(EventKind, Action)>,
    failures: &[(usize, f64, f64)],
) -> Result<(), SimulationError> {
    let scheduler = ScriptedScheduler {
        init_actions,
        reactions,
    };
    let mut sim = Simulator::new(123, workflow, Box::new(scheduler), quiet_settings());
    for &slots in slots {
        sim.add_resource(Resource::new(slots, 1., 0.));
    }
    for &(resource, start, duration) in failures {
        sim.inject_resource_failure(resource, start, duration)?;
    }
    sim.run().map(|_| ())
}

#[test]
fn test_action_errors() {
    let single = || Workflow::from_parts(vec![1.], vec![vec![]]);
    let pair = || Workflow::from_parts(vec![1., 1.], vec![vec![], vec![]]);

    let err = run_scripted(single(), &[1], vec![Action::new(5, 0)], vec![], &[]);
    assert_eq!(err, Err(SimulationError::Action(ActionError::UnknownTask(5))));

    let err = run_scripted(single(), &[1], vec![Action::new(0, 3)], vec![], &[]);
    assert_eq!(err, Err(SimulationError::Action(ActionError::UnknownResource(3))));

    let err = run_scripted(Workflow::diamond(), &[1], vec![Action::new(1, 0)], vec![], &[]);
    assert_eq!(err, Err(SimulationError::Action(ActionError::DependencyNotDone { task: 1, pred: 0 })));

    let err = run_scripted(single(), &[1, 1], vec![Action::new(0, 0), Action::new(0, 1)], vec![], &[]);
    assert_eq!(err, Err(SimulationError::Action(ActionError::TaskRunning { task: 0, resource: 0 })));

    let err = run_scripted(pair(), &[1], vec![Action::new(0, 0), Action::new(1, 0)], vec![], &[]);
    assert_eq!(err, Err(SimulationError::Action(ActionError::NoFreeSlot(0))));

    let err = run_scripted(
        single(),
        &[1],
        vec![Action::new(0, 0)],
        vec![(EventKind::TaskFinished, Action::new(0, 0))],
        &[],
    );
    assert_eq!(err, Err(SimulationError::Action(ActionError::TaskCompleted(0))));

    let err = run_scripted(
        single(),
        &[1],
        vec![],
        vec![(EventKind::ResourceDown, Action::new(0, 0))],
        &[(0, 1., 1.)],
    );
    assert_eq!(err, Err(SimulationError::Action(ActionError::ResourceDown(0))));

    let ok = run_scripted(pair(), &[2], vec![Action::new(0, 0), Action::new(1, 0)], vec![], &[]);
    assert_eq!(ok, Ok(()));
}

#[test]
fn test_resource_failure_errors() {
    let err = run_scripted(Workflow::diamond(), &[1], vec![], vec![], &[(0, 1., 5.), (0, 2., 5.)]);
    assert_eq!(
        err,
        Err(SimulationError::DuplicateStateTransition { resource: 0, up: false })
    );
    assert_eq!(
        err.unwrap_err().to_string(),
        "resource 0 is already down"
    );

    let err = run_scripted(Workflow::diamond(), &[1], vec![], vec![], &[(1, 1., 5.)]);
    assert_eq!(err, Err(SimulationError::UnknownResource(1)));

    let err = run_scripted(Workflow::diamond(), &[1], vec![], vec![], &[(0, -1., 5.)]);
    assert!(matches!(err, Err(SimulationError::InvalidFailure { resource: 0, .. })));

    // consecutive outages of the same resource are fine
    let ok = run_scripted(Workflow::diamond(), &[1], vec![], vec![], &[(0, 1., 1.), (0, 3., 1.)]);
    assert_eq!(ok, Ok(()));
}

#[test]
fn test_run_only_once() {
    let mut sim = diamond_simulator("heft", quiet_settings());
    assert!(sim.run().is_ok());
    assert_eq!(sim.run().unwrap_err(), SimulationError::AlreadyRun);
}

#[test]
fn test_json_config() {
    let config = SimulationConfig::from_json_str(
        r#"{
            "scheduler": "adaptive[hide_profile=false]",
            "settings": {"net_speed": 2, "optimize_transfers": false, "task_fail_prob": 0.1, "logging": false},
            "workflow": {
                "tasks": [2, 4, 5, 3],
                "edges": [
                    {"from": 0, "to": 1, "weight": 1},
                    {"from": 0, "to": 2, "weight": 1},
                    {"from": 1, "to": 3, "weight": 1},
                    {"from": 2, "to": 3, "weight": 0}
                ]
            },
            "resources": [{"slots": 2, "speed": 1.5, "delay": 0.1}, {"slots": 1, "speed": 1, "delay": 0}],
            "resource_failures": [{"resource": 1, "start": 2, "duration": 3}]
        }"#,
    )
    .unwrap();
    assert_eq!(config.seed, 123);
    assert!(!config.settings.optimize_transfers);
    assert_float_eq(config.settings.net_speed, 2., EPS);
    assert_eq!(config.settings.max_task_failures, None);

    let mut sim = config.build().unwrap();
    assert_eq!(sim.workflow().edge_count(), 4);
    assert_eq!(sim.resources()[1].id, 1);
    let stats = sim.run().unwrap();
    assert_eq!(stats.completed_tasks, 4);
}

#[test]
fn test_yaml_config() {
    let config = SimulationConfig::from_yaml_str(
        "
scheduler: heft
seed: 5
settings:
  net_speed: 1.0
  optimize_transfers: true
  task_fail_prob: 0.0
workflow:
  tasks: [1.0, 2.0]
  edges:
    - {from: 0, to: 1, weight: 0.5}
resources:
  - {slots: 1, speed: 1.0, delay: 0.0}
",
    )
    .unwrap();
    assert_eq!(config.seed, 5);
    assert!(config.settings.logging);
    assert!(config.resource_failures.is_empty());
    let mut sim = config.build().unwrap();
    assert_eq!(sim.run().unwrap().completed_tasks, 2);
}

const SETTINGS: &str = r#"{"net_speed": 1, "optimize_transfers": true, "task_fail_prob": 0}"#;

fn missing_field(json: &str, field: &str) -> bool {
    matches!(SimulationConfig::from_json_str(json), Err(ConfigError::Json(e)) if e.to_string().contains(field))
}

#[test]
fn test_config_errors() {
    let workflow = r#"{"tasks": [1, 1], "edges": [{"from": 0, "to": 1, "weight": 1}]}"#;
    let json = |settings: &str, workflow: &str| {
        format!(r#"{{"scheduler": "heft", "settings": {settings}, "workflow": {workflow}, "resources": []}}"#)
    };
    assert!(missing_field(
        &format!(r#"{{"scheduler": "heft", "settings": {SETTINGS}, "resources": []}}"#),
        "workflow"
    ));
    assert!(missing_field(
        &format!(r#"{{"scheduler": "heft", "workflow": {workflow}, "resources": []}}"#),
        "settings"
    ));
    assert!(missing_field(
        &json(r#"{"net_speed": 1, "task_fail_prob": 0}"#, workflow),
        "optimize_transfers"
    ));
    assert!(missing_field(&json(SETTINGS, r#"{"tasks": [1]}"#), "edges"));
    assert!(missing_field(
        &json(SETTINGS, r#"{"tasks": [1, 1], "edges": [{"from": 0, "to": 1}]}"#),
        "weight"
    ));

    let base = json("SETTINGS", r#"{"tasks": [1], "edges": EDGES}"#).replace("heft", "SCHEDULER");
    let config = |scheduler: &str, edges: &str| {
        SimulationConfig::from_json_str(
            &base
                .replace("SCHEDULER", scheduler)
                .replace("SETTINGS", SETTINGS)
                .replace("EDGES", edges),
        )
        .unwrap()
    };

    assert!(matches!(
        config("fifo", "[]").build(),
        Err(ConfigError::UnknownScheduler(name)) if name == "fifo"
    ));
    assert!(matches!(
        config("adaptive[hide_profile=maybe]", "[]").build(),
        Err(ConfigError::UnknownScheduler(_))
    ));
    assert!(matches!(
        config("heft", r#"[{"from": 0, "to": 1, "weight": 1}]"#).build(),
        Err(ConfigError::Simulation(SimulationError::Graph(GraphError::UnknownTask { pred: 0, succ: 1 })))
    ));
    assert!(matches!(
        SimulationConfig::from_file("config.toml"),
        Err(ConfigError::Io { .. })
    ));
}

#[test]
fn test_config_invalid_values() {
    let valid = || {
        let mut config = SimulationConfig::from_file(format!("{}/../../demos/diamond.json", env!("CARGO_MANIFEST_DIR")))
            .unwrap();
        config.settings.logging = false;
        config
    };
    let invalid_field = |config: SimulationConfig| match config.build() {
        Err(ConfigError::InvalidValue { field, .. }) => field,
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("invalid config is accepted"),
    };
    assert!(valid().build().is_ok());

    let mut config = valid();
    config.resources[1].slots = 0;
    assert_eq!(invalid_field(config), "resources[1].slots");

    for speed in [0., -1., f64::NAN, f64::INFINITY] {
        let mut config = valid();
        config.resources[0].speed = speed;
        assert_eq!(invalid_field(config), "resources[0].speed");
    }

    for delay in [-5., f64::NAN] {
        let mut config = valid();
        config.resources[1].delay = delay;
        assert_eq!(invalid_field(config), "resources[1].delay");
    }

    for net_speed in [0., -2.] {
        let mut config = valid();
        config.settings.net_speed = net_speed;
        assert_eq!(invalid_field(config), "settings.net_speed");
    }

    for prob in [-0.1, 1.5] {
        let mut config = valid();
        config.settings.task_fail_prob = prob;
        assert_eq!(invalid_field(config), "settings.task_fail_prob");
    }

    let json = r#"{
        "scheduler": "heft",
        "settings": {"net_speed": 1, "optimize_transfers": true, "task_fail_prob": 0, "logging": false},
        "workflow": {"tasks": [1, 1], "edges": [{"from": 0, "to": 1, "weight": 1}]},
        "resources": [{"slots": 1, "speed": 1.0, "delay": -5.0}]
    }"#;
    assert!(matches!(
        SimulationConfig::from_json_str(json).unwrap().build(),
        Err(ConfigError::InvalidValue { value, .. }) if value == -5.
    ));
}

#[test]
fn test_demo_configs() {
    for name in ["diamond.json", "topcuoglu_failures.yaml"] {
        let path = format!("{}/../../demos/{}", env!("CARGO_MANIFEST_DIR"), name);
        let mut config = SimulationConfig::from_file(&path).unwrap();
        config.settings.logging = false;
        let total = config.workflow.tasks.len();
        for scheduler in SCHEDULERS {
            config.scheduler = scheduler.to_string();
            let stats = config.build().unwrap().run().unwrap();
            assert_eq!(stats.completed_tasks, total, "{} with {}", name, scheduler);
        }
    }
}
