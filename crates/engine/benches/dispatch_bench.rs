//! 디스패처 벤치마크
//!
//! 데모 카탈로그로 라인 유형별 처리량과, 헤더 후보 수에 따른 선택 비용을 측정합니다.

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use msgparse_engine::{
    ActionChain, CatalogBuilder, CatalogLoader, Dispatcher, EngineConfig, FieldStore,
    FunctionRegistry, Pattern,
};

const DEMO_CATALOG: &str = include_str!("../../../catalogs/demo.yml");

/// 단순 메시지
const THRESHOLD_LINE: &[u8] =
    b"<134>2024-01-15 12:00:00 fw01 fw[123]: 10: Policy ID=10 Rate=50 exceeds threshold";

/// Sequence + Alternative + 액션 다수
const CONNECTION_LINE: &[u8] = b"<134>2024-01-15 12:00:00 fw01 fw[123]: 20: src=10.0.0.1:51000 dst=2.2.2.2:443 sent=100 rcvd=23 dur=0h1m30s act=1";

/// 헤더 불일치
const GARBAGE_LINE: &[u8] = b"this line does not belong to any vendor format at all";

fn demo_dispatcher() -> Dispatcher {
    let functions = FunctionRegistry::with_builtins();
    let catalog = CatalogLoader::parse_yaml(DEMO_CATALOG, "demo.yml", &functions).unwrap();
    Dispatcher::new(
        Arc::new(catalog),
        Arc::new(functions),
        EngineConfig::default(),
    )
}

fn bench_dispatch(c: &mut Criterion) {
    let d = demo_dispatcher();

    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Elements(1));

    group.bench_function("threshold", |b| b.iter(|| d.dispatch(black_box(THRESHOLD_LINE))));
    group.bench_function("connection", |b| {
        b.iter(|| d.dispatch(black_box(CONNECTION_LINE)))
    });
    group.bench_function("no_header_match", |b| {
        b.iter(|| d.dispatch(black_box(GARBAGE_LINE)))
    });

    // 저장소 재사용
    group.bench_function("connection_reused_store", |b| {
        let mut store = FieldStore::new();
        b.iter(|| d.dispatch_into(black_box(CONNECTION_LINE), &mut store))
    });

    group.finish();
}

fn bench_header_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("header_fanout");

    for count in [1usize, 10, 100] {
        // 앞의 헤더는 모두 실패하고 마지막 헤더만 매칭
        let mut builder = CatalogBuilder::new("fanout");
        for i in 0..count {
            let src = if i + 1 == count {
                "%{messageid}: %{payload}".to_owned()
            } else {
                format!("vendor{i} %{{messageid}}: %{{payload}}")
            };
            let matcher = builder.arena_mut().pattern(&src).unwrap();
            builder
                .add_header(&format!("HEADER#{i}"), matcher, ActionChain::default())
                .unwrap();
        }
        let message = builder.arena_mut().pattern("user=%{user}").unwrap();
        builder
            .add_message("1", "MESSAGE#0", message, ActionChain::default())
            .unwrap();

        let d = Dispatcher::new(
            Arc::new(builder.build().unwrap()),
            Arc::new(FunctionRegistry::new()),
            EngineConfig::default(),
        );

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(count), &d, |b, d| {
            b.iter(|| d.dispatch(black_box(b"1: user=root")))
        });
    }

    group.finish();
}

fn bench_pattern_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("pattern");

    group.bench_function("compile", |b| {
        b.iter(|| {
            Pattern::compile(black_box(
                "src=%{saddr}:%{sport} dst=%{daddr}:%{dport} proto=%{proto->} %{rest}",
            ))
            .unwrap()
        })
    });

    let pattern =
        Pattern::compile("src=%{saddr}:%{sport} dst=%{daddr}:%{dport} proto=%{proto->} %{rest}")
            .unwrap();
    group.bench_function("match", |b| {
        b.iter(|| {
            pattern.match_prefix(black_box(
                "src=10.0.0.1:51000 dst=2.2.2.2:443 proto=tcp    remaining text",
            ))
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_dispatch,
    bench_header_fanout,
    bench_pattern_compile
);
criterion_main!(benches);
