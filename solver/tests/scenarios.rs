//! End-to-end scenarios (§8) against the reference `NativeBackend`: each
//! drives a small but complete model through `Solver::solve` and checks the
//! literal expected schedule or the invariant the scenario is meant to
//! exercise.

use rcpsp_model::{
    Buffer, Constraint, CountKind, FolConstraint, HorizonSpec, Indicator, IndicatorKind, Objective, PrecedenceKind, Problem, Resource,
    Task, TaskConstraint,
};
use rcpsp_solver::{Solver, SolverOptions};
use smt_backend::{eq, LinExpr, NativeBackend};

#[test]
fn hello_world_precedence_minimizes_makespan() {
    let mut problem = Problem::new(HorizonSpec::Fixed(10));
    problem.add_task(Task::fixed_duration("A", 2).build().unwrap()).unwrap();
    problem.add_task(Task::fixed_duration("B", 2).build().unwrap()).unwrap();
    problem
        .add_constraint(Constraint::task("a_before_b", TaskConstraint::Precedence("A".into(), "B".into(), PrecedenceKind::Lax, 0)))
        .unwrap();
    problem.add_indicator(Indicator::new("makespan", IndicatorKind::Makespan)).unwrap();
    problem.add_objective(Objective::minimize("min_makespan", "makespan")).unwrap();

    let mut solver = Solver::new(NativeBackend::new(), problem, SolverOptions::default());
    let solution = solver.solve().unwrap();

    assert_eq!(solution.tasks["A"].start, 0);
    assert_eq!(solution.tasks["A"].end, 2);
    assert_eq!(solution.tasks["B"].start, 2);
    assert_eq!(solution.tasks["B"].end, 4);
    assert_eq!(solution.indicators["makespan"], 4);
}

/// All 24 orderings of 4 jobs, used to pick the single permutation shared by
/// every machine (a permutation flow shop).
const JOB_PERMUTATIONS: [[usize; 4]; 24] = [
    [0, 1, 2, 3],
    [0, 1, 3, 2],
    [0, 2, 1, 3],
    [0, 2, 3, 1],
    [0, 3, 1, 2],
    [0, 3, 2, 1],
    [1, 0, 2, 3],
    [1, 0, 3, 2],
    [1, 2, 0, 3],
    [1, 2, 3, 0],
    [1, 3, 0, 2],
    [1, 3, 2, 0],
    [2, 0, 1, 3],
    [2, 0, 3, 1],
    [2, 1, 0, 3],
    [2, 1, 3, 0],
    [2, 3, 0, 1],
    [2, 3, 1, 0],
    [3, 0, 1, 2],
    [3, 0, 2, 1],
    [3, 1, 0, 2],
    [3, 1, 2, 0],
    [3, 2, 0, 1],
    [3, 2, 1, 0],
];

fn op_label(job: usize, machine: usize) -> String {
    format!("J{job}_M{machine}")
}

#[test]
fn permutation_flow_shop_minimizes_makespan() {
    const DURATIONS: [[i64; 3]; 4] = [[2, 5, 6], [1, 5, 7], [1, 4, 1], [3, 4, 7]];
    const RELEASE: [i64; 4] = [0, 9, 2, 7];

    let mut problem = Problem::new(HorizonSpec::Fixed(22));

    for machine in 0..3 {
        problem.add_resource(Resource::worker(format!("M{machine}"), 1).build().unwrap()).unwrap();
    }
    for job in 0..4 {
        for machine in 0..3 {
            let mut builder = Task::fixed_duration(op_label(job, machine), DURATIONS[job][machine]).require_resource(format!("M{machine}"));
            if machine == 0 {
                builder = builder.release_date(RELEASE[job]);
            }
            problem.add_task(builder.build().unwrap()).unwrap();
        }
        for machine in 0..2 {
            problem
                .add_constraint(Constraint::task(
                    format!("route_{job}_{machine}"),
                    TaskConstraint::Precedence(op_label(job, machine), op_label(job, machine + 1), PrecedenceKind::Lax, 0),
                ))
                .unwrap();
        }
    }

    let perm_choices: Vec<Constraint> = JOB_PERMUTATIONS
        .iter()
        .enumerate()
        .map(|(idx, perm)| {
            let per_machine: Vec<Constraint> = (0..3)
                .map(|machine| {
                    let order: Vec<String> = perm.iter().map(|&job| op_label(job, machine)).collect();
                    Constraint::task(format!("perm_{idx}_m{machine}"), TaskConstraint::OrderedGroup(order, PrecedenceKind::Lax, 0))
                })
                .collect();
            Constraint::fol(format!("perm_{idx}"), FolConstraint::And(per_machine))
        })
        .collect();
    problem.add_constraint(Constraint::fol("job_order_choice", FolConstraint::Or(perm_choices))).unwrap();

    problem.add_indicator(Indicator::new("makespan", IndicatorKind::Makespan)).unwrap();
    problem.add_objective(Objective::minimize("min_makespan", "makespan")).unwrap();

    let mut solver = Solver::new(NativeBackend::new(), problem, SolverOptions::default());
    let solution = solver.solve().unwrap();

    assert_eq!(solution.indicators["makespan"], 21);

    let mut starts: Vec<(usize, i64)> = (0..4).map(|job| (job, solution.tasks[&op_label(job, 0)].start)).collect();
    starts.sort_by_key(|&(_, s)| s);
    let order: Vec<usize> = starts.into_iter().map(|(job, _)| job).collect();
    assert_eq!(order, vec![0, 2, 3, 1]);
}

#[test]
fn force_schedule_n_optional_tasks() {
    let mut problem = Problem::new(HorizonSpec::Fixed(10));
    let labels: Vec<String> = (1..=5).map(|i| format!("Opt{i}")).collect();
    for label in &labels {
        problem.add_task(Task::fixed_duration(label.clone(), 1).optional().build().unwrap()).unwrap();
    }
    problem
        .add_constraint(Constraint::task("force_three", TaskConstraint::ForceScheduleNOptional(labels.clone(), 3, CountKind::Exact)))
        .unwrap();

    let mut solver = Solver::new(NativeBackend::new(), problem, SolverOptions::default());
    let solution = solver.solve().unwrap();

    let scheduled_count = labels.iter().filter(|l| solution.tasks[l.as_str()].scheduled).count();
    assert_eq!(scheduled_count, 3);
}

#[test]
fn buffer_flow_timelines() {
    let mut problem = Problem::new(HorizonSpec::Fixed(10));
    problem.add_task(Task::fixed_duration("T1", 4).build().unwrap()).unwrap();
    problem
        .add_buffer(Buffer::non_concurrent("Buffer1").initial_level(5).unload("T1", 1).build().unwrap())
        .unwrap();
    problem
        .add_buffer(Buffer::non_concurrent("Buffer2").initial_level(0).load("T1", 1).build().unwrap())
        .unwrap();
    problem
        .add_constraint(Constraint::task("t1_start_at_1", TaskConstraint::StartAt("T1".into(), 1)))
        .unwrap();

    let mut solver = Solver::new(NativeBackend::new(), problem, SolverOptions::default());
    let solution = solver.solve().unwrap();

    assert_eq!(solution.buffers["Buffer1"], vec![(0, 5), (1, 4)]);
    assert_eq!(solution.buffers["Buffer2"], vec![(0, 0), (5, 1)]);
}

#[test]
fn weighted_multi_objective_incremental() {
    let mut problem = Problem::new(HorizonSpec::Fixed(20));
    problem.add_task(Task::fixed_duration("t1", 3).build().unwrap()).unwrap();
    problem.add_task(Task::fixed_duration("t2", 3).build().unwrap()).unwrap();
    problem
        .add_constraint(Constraint::fol(
            "t1_end_mirrors_t2_start",
            FolConstraint::FromExpression(std::sync::Arc::new(|resolved| {
                let t1 = resolved.task("t1")?;
                let t2 = resolved.task("t2")?;
                Ok(eq(LinExpr::var(t1.end), LinExpr::constant(20).sub(LinExpr::var(t2.start))))
            })),
        ))
        .unwrap();
    problem
        .add_indicator(Indicator::custom("t1_end", |resolved| Ok(LinExpr::var(resolved.task("t1")?.end))))
        .unwrap();
    problem
        .add_indicator(Indicator::custom("t2_start", |resolved| Ok(LinExpr::var(resolved.task("t2")?.start))))
        .unwrap();
    problem.add_objective(Objective::maximize("max_t1_end", "t1_end")).unwrap();
    problem.add_objective(Objective::maximize("max_t2_start", "t2_start").with_weight(2)).unwrap();

    let mut solver = Solver::new(NativeBackend::new(), problem, SolverOptions::default());
    let solution = solver.solve().unwrap();

    assert_eq!(solution.tasks["t1"].end, 3);
    assert_eq!(solution.tasks["t2"].start, 17);
}

#[test]
fn cumulative_worker_respects_capacity() {
    let mut problem = Problem::new(HorizonSpec::Fixed(10));
    problem.add_resource(Resource::cumulative_worker("M", 2, 1).build().unwrap()).unwrap();
    let labels = ["C1", "C2", "C3"];
    for label in labels {
        problem.add_task(Task::fixed_duration(label, 5).require_resource("M").build().unwrap()).unwrap();
    }

    let mut solver = Solver::new(NativeBackend::new(), problem, SolverOptions::default());
    let solution = solver.solve().unwrap();

    for label in labels {
        let record = &solution.tasks[label];
        assert_eq!(record.duration, 5);
        assert!(record.start >= 0 && record.end <= 10);
    }
    for instant in 0..10 {
        let overlapping = labels
            .iter()
            .filter(|&&label| {
                let record = &solution.tasks[label];
                record.start <= instant && instant < record.end
            })
            .count();
        assert!(overlapping <= 2);
    }
}

#[test]
fn find_another_solution_excludes_the_current_value() {
    let mut problem = Problem::new(HorizonSpec::Fixed(5));
    problem.add_task(Task::fixed_duration("A", 2).build().unwrap()).unwrap();

    let mut solver = Solver::new(NativeBackend::new(), problem, SolverOptions::default());
    let first = solver.solve().unwrap();
    let start_var = solver.encoded().unwrap().resolved.task("A").unwrap().start;

    // A's start ranges over 0..=3, so an alternative always exists; the
    // scoped push/pop must not leave the exclusion behind for `solve`.
    let second = solver.find_another_solution(start_var).unwrap().expect("another start value should exist");
    assert_ne!(first.tasks["A"].start, second.tasks["A"].start);
    assert!(second.tasks["A"].start >= 0 && second.tasks["A"].end <= 5);

    let again = solver.solve().unwrap();
    assert_eq!(again.tasks["A"].start, first.tasks["A"].start);
}

#[test]
fn find_another_solution_is_none_when_the_value_is_forced() {
    let mut problem = Problem::new(HorizonSpec::Fixed(2));
    problem.add_task(Task::fixed_duration("A", 2).build().unwrap()).unwrap();

    let mut solver = Solver::new(NativeBackend::new(), problem, SolverOptions::default());
    let solution = solver.solve().unwrap();
    assert_eq!(solution.tasks["A"].start, 0);

    let start_var = solver.encoded().unwrap().resolved.task("A").unwrap().start;
    assert!(solver.find_another_solution(start_var).unwrap().is_none());
}
