//! Benchmarks for flow planning.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stagebuild::prelude::*;
use std::sync::Arc;

/// A chain of `len` stages, each mapping its output under `build/`.
fn chain(len: usize) -> Vec<StageDescriptor> {
    (0..len)
        .map(|i| {
            let output = format!("a{}", i + 1);
            let path = format!("build/{output}.out");
            let module: Arc<dyn StageModule> =
                Arc::new(FnModule::new(format!("s{i}"), move |_ctx: &ModuleContext| {
                    let mut out = OutputMap::new();
                    out.insert(output.clone(), PathSet::single(path.clone()));
                    Ok(out)
                }));
            let stage = StageDescriptor::new(format!("s{i}"), module)
                .with_produces([format!("a{}", i + 1).as_str()]);
            if i == 0 {
                stage
            } else {
                stage.with_takes([format!("a{i}").as_str()])
            }
        })
        .collect()
}

fn planning_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_chain");
    for len in [10usize, 100, 500] {
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, &len| {
            b.iter(|| {
                let flow = Flow::builder(format!("a{len}"))
                    .stages(chain(len))
                    .sink(Arc::new(NoOpReportSink))
                    .build()
                    .expect("chain plans");
                black_box(flow.state().run_stages().len())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, planning_benchmark);
criterion_main!(benches);
