use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use shanty::serializer::RequestSerializer;
use shanty::Request;

fn bench_digest_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("digest");
    let serializer = RequestSerializer::default();

    for size in [100, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let request = Request::new(
                "POST",
                "https://api.example.com/v1/items",
                vec![("Content-Type".to_string(), "application/json".to_string())],
                Some(Bytes::from(vec![b'x'; size])),
            )
            .unwrap();

            b.iter(|| serializer.relative_path(black_box(&request)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_digest_sizes);
criterion_main!(benches);
