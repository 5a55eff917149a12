use std::sync::Arc;

use arrow::{
    array::{Int64Array, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mergetree_scan::{MemoryProvider, OrderedScan, ScanPlan};

const ROWS_PER_SOURCE: usize = 64 * 1024;
const SOURCE_BATCH: usize = 4096;

fn sorted_batches(schema: &Arc<Schema>, keys: Vec<i64>) -> Vec<RecordBatch> {
    keys.chunks(SOURCE_BATCH)
        .map(|chunk| {
            let payload: Vec<String> = chunk
                .iter()
                .map(|_| std::iter::repeat_with(fastrand::alphanumeric).take(16).collect())
                .collect();
            RecordBatch::try_new(
                schema.clone(),
                vec![
                    Arc::new(Int64Array::from(chunk.to_vec())),
                    Arc::new(StringArray::from(payload)),
                ],
            )
            .unwrap()
        })
        .collect()
}

/// `sources` sources whose keys either interleave row by row or occupy
/// disjoint ranges.
fn plan(sources: usize, interleaved: bool) -> Arc<ScanPlan> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("ts", DataType::Int64, false),
        Field::new("payload", DataType::Utf8, false),
    ]));
    let mut provider = MemoryProvider::new();
    for source in 0..sources {
        let keys: Vec<i64> = (0..ROWS_PER_SOURCE)
            .map(|row| {
                if interleaved {
                    (row * sources + source) as i64
                } else {
                    (source * ROWS_PER_SOURCE + row) as i64
                }
            })
            .collect();
        provider = provider.with_source(
            format!("part-{source}"),
            schema.clone(),
            sorted_batches(&schema, keys),
        );
    }
    OrderedScan::new(Arc::new(provider))
        .bind(&["part-*"], "ts")
        .unwrap()
}

#[inline(never)]
fn drain(plan: &ScanPlan) -> usize {
    plan.execute()
        .unwrap()
        .map(|batch| batch.unwrap().num_rows())
        .sum()
}

fn merge(c: &mut Criterion) {
    fastrand::seed(42);
    let mut group = c.benchmark_group("merge");

    for sources in [2, 8, 32] {
        group.throughput(Throughput::Elements((sources * ROWS_PER_SOURCE) as u64));

        let disjoint = plan(sources, false);
        group.bench_with_input(
            BenchmarkId::new("disjoint", sources),
            &disjoint,
            |b, plan| b.iter(|| drain(plan)),
        );

        let interleaved = plan(sources, true);
        group.bench_with_input(
            BenchmarkId::new("interleaved", sources),
            &interleaved,
            |b, plan| b.iter(|| drain(plan)),
        );
    }

    group.finish();
}

criterion_group!(benches, merge);
criterion_main!(benches);
