use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use defaultvfi::{BorrowingGrid, DefaultProblem, IncomeProcess, Parameters, SolverOptions};

fn reference_problem(grid_size: usize, options: SolverOptions) -> DefaultProblem {
    let income = IncomeProcess::iid(vec![0.2, 1.2], vec![0.2, 0.8]).expect("valid income");
    let grid = BorrowingGrid::uniform(-0.15, 2.0, grid_size).expect("valid grid");
    let parameters = Parameters::builder(income, grid)
        .build()
        .expect("valid parameters");
    DefaultProblem::new(parameters, options).expect("valid problem")
}

// ── hard-max solve: serial vs rayon sweeps ──────────────────────────────────

fn bench_hard_max(c: &mut Criterion) {
    let mut group = c.benchmark_group("hard_max_solve");
    group.sample_size(10);
    for &grid_size in &[50usize, 150] {
        for parallel in [false, true] {
            let label = if parallel { "parallel" } else { "serial" };
            let problem =
                reference_problem(grid_size, SolverOptions::default().with_parallel(parallel));
            group.bench_with_input(BenchmarkId::new(label, grid_size), &problem, |b, problem| {
                b.iter(|| problem.solve().expect("converged"))
            });
        }
    }
    group.finish();
}

// ── smoothed solve ──────────────────────────────────────────────────────────

fn bench_smoothed(c: &mut Criterion) {
    let mut group = c.benchmark_group("smoothed_solve");
    group.sample_size(10);
    let options = SolverOptions::default()
        .with_smoothing(2.0)
        .with_tolerances(1e-8, 1e-6)
        .with_parallel(true);
    let problem = reference_problem(150, options);
    group.bench_function("alpha_2", |b| b.iter(|| problem.solve().expect("converged")));
    group.finish();
}

criterion_group!(benches, bench_hard_max, bench_smoothed);
criterion_main!(benches);
