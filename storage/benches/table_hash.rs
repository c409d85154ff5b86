use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use state_storage::state_storage::StateStorage;

fn populate(num_rows: u64) -> Arc<StateStorage> {
    let storage = Arc::new(StateStorage::new(None, None, 0));
    storage
        .create_table("t_bench", vec!["value".to_string()])
        .unwrap();
    let table = storage.open_table("t_bench").unwrap();

    for i in 0..num_rows {
        let mut entry = table.new_entry();
        entry.set_field("value", format!("row-{i}")).unwrap();
        table.set_row(i.to_le_bytes().to_vec(), entry).unwrap();
    }
    storage
}

fn table_hashes_benchmark(c: &mut Criterion) {
    let storage = populate(10_000);
    c.bench_function("table_hashes 10k dirty rows", |b| {
        b.iter(|| black_box(storage.table_hashes()))
    });
}

criterion_group!(benches, table_hashes_benchmark);
criterion_main!(benches);
