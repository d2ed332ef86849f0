use clap::ValueEnum;
use rcpsp_model::{
    Buffer, Constraint, CountKind, FolConstraint, HorizonSpec, Indicator, IndicatorKind, Objective, PrecedenceKind, Problem, Resource,
    Task, TaskConstraint,
};
use smt_backend::{eq, LinExpr};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Scenario {
    HelloWorld,
    FlowShop,
    OptionalTasks,
    BufferFlow,
    WeightedObjectives,
    CumulativeCapacity,
}

impl Scenario {
    pub fn build(self) -> Problem {
        match self {
            Scenario::HelloWorld => hello_world(),
            Scenario::FlowShop => flow_shop(),
            Scenario::OptionalTasks => optional_tasks(),
            Scenario::BufferFlow => buffer_flow(),
            Scenario::WeightedObjectives => weighted_objectives(),
            Scenario::CumulativeCapacity => cumulative_capacity(),
        }
    }
}

/// Two tasks, one precedence, minimize makespan.
pub fn hello_world() -> Problem {
    let mut problem = Problem::new(HorizonSpec::Fixed(10));
    problem.add_task(Task::fixed_duration("A", 2).build().unwrap()).unwrap();
    problem.add_task(Task::fixed_duration("B", 2).build().unwrap()).unwrap();
    problem
        .add_constraint(Constraint::task("a_before_b", TaskConstraint::Precedence("A".into(), "B".into(), PrecedenceKind::Lax, 0)))
        .unwrap();
    problem.add_indicator(Indicator::new("makespan", IndicatorKind::Makespan)).unwrap();
    problem.add_objective(Objective::minimize("min_makespan", "makespan")).unwrap();
    problem
}

fn op_label(job: usize, machine: usize) -> String {
    format!("J{job}_M{machine}")
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

/// 4 jobs x 3 machines permutation flow shop (Tao et al.), minimize makespan.
pub fn flow_shop() -> Problem {
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
    problem
}

/// 5 optional tasks, exactly 3 must be scheduled.
pub fn optional_tasks() -> Problem {
    let mut problem = Problem::new(HorizonSpec::Fixed(10));
    let labels: Vec<String> = (1..=5).map(|i| format!("Opt{i}")).collect();
    for label in &labels {
        problem.add_task(Task::fixed_duration(label.clone(), 1).optional().build().unwrap()).unwrap();
    }
    problem
        .add_constraint(Constraint::task("force_three", TaskConstraint::ForceScheduleNOptional(labels, 3, CountKind::Exact)))
        .unwrap();
    problem
}

/// One task unloading from one buffer and loading into another.
pub fn buffer_flow() -> Problem {
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
    problem
}

/// Two linked tasks, two maximize objectives with different weights.
pub fn weighted_objectives() -> Problem {
    let mut problem = Problem::new(HorizonSpec::Fixed(20));
    problem.add_task(Task::fixed_duration("t1", 3).build().unwrap()).unwrap();
    problem.add_task(Task::fixed_duration("t2", 3).build().unwrap()).unwrap();
    problem
        .add_constraint(Constraint::fol(
            "t1_end_mirrors_t2_start",
            FolConstraint::FromExpression(std::sync::Arc::new(|resolved: &rcpsp_model::Resolved| {
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
    problem
}

/// A size-2 cumulative worker shared by three duration-5 tasks.
pub fn cumulative_capacity() -> Problem {
    let mut problem = Problem::new(HorizonSpec::Fixed(10));
    problem.add_resource(Resource::cumulative_worker("M", 2, 1).build().unwrap()).unwrap();
    for label in ["C1", "C2", "C3"] {
        problem.add_task(Task::fixed_duration(label, 5).require_resource("M").build().unwrap()).unwrap();
    }
    problem
}
