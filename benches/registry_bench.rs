//! Benchmarks for the service registry and field injection

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use service_injector::{Descriptor, Field, Inject, Key, Registry, Service, ServiceKey};
use std::borrow::Cow;
use std::hint::black_box;
use std::sync::Arc;

#[allow(dead_code)]
#[derive(Clone)]
struct SmallService {
    value: i32,
}

#[allow(dead_code)]
#[derive(Clone)]
struct MediumService {
    name: String,
    values: Vec<i32>,
}

#[derive(PartialEq, Eq, Hash)]
struct TaggedKey(&'static str);

impl ServiceKey for TaggedKey {
    fn tag(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(self.0))
    }
}

#[allow(dead_code)]
#[derive(Default)]
struct Handler {
    small: Option<Arc<SmallService>>,
    medium: Option<Arc<MediumService>>,
    port: u16,
}

impl Inject for Handler {
    fn describe() -> Descriptor<Self> {
        Descriptor::new()
            .field(Field::service::<Option<Arc<SmallService>>>(
                "small",
                "small",
                |handler: &mut Self, service: &Service| {
                    service
                        .downcast::<SmallService>()
                        .map(|small| handler.small = Some(small))
                        .is_some()
                },
            ))
            .field(Field::service::<Option<Arc<MediumService>>>(
                "medium",
                "medium",
                |handler: &mut Self, service: &Service| {
                    service
                        .downcast::<MediumService>()
                        .map(|medium| handler.medium = Some(medium))
                        .is_some()
                },
            ))
            .field(
                Field::service::<u16>("port", "port", |handler: &mut Self, service: &Service| {
                    service.cloned::<u16>().map(|port| handler.port = port).is_some()
                })
                .optional("true"),
            )
    }
}

fn populated() -> Registry {
    let registry = Registry::new();
    registry.set("small", SmallService { value: 42 }).unwrap();
    registry
        .set(
            "medium",
            MediumService {
                name: "test".to_string(),
                values: vec![1, 2, 3, 4, 5],
            },
        )
        .unwrap();
    registry
        .set(Key::new(TaggedKey("tagged")), SmallService { value: 7 })
        .unwrap();
    registry
}

fn bench_registration(c: &mut Criterion) {
    let mut group = c.benchmark_group("registration");

    group.bench_function("set_string_key", |b| {
        b.iter(|| {
            let registry = Registry::new();
            registry.set("small", SmallService { value: 42 }).unwrap();
            black_box(registry)
        })
    });

    group.bench_function("set_tagged_key", |b| {
        b.iter(|| {
            let registry = Registry::new();
            registry
                .set(Key::new(TaggedKey("small")), SmallService { value: 42 })
                .unwrap();
            black_box(registry)
        })
    });

    group.bench_function("set_duplicate_rejected", |b| {
        let registry = populated();
        b.iter(|| black_box(registry.set("small", SmallService { value: 0 }).is_err()))
    });

    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");
    group.throughput(Throughput::Elements(1));

    let registry = populated();
    let small = Key::from("small");
    let by_tag = Key::from("tagged");
    let missing = Key::from("missing");

    group.bench_function("get_by_key", |b| {
        b.iter(|| black_box(registry.get(&small).unwrap()))
    });

    group.bench_function("get_by_tag", |b| {
        b.iter(|| black_box(registry.get(&by_tag).unwrap()))
    });

    group.bench_function("get_not_found", |b| {
        b.iter(|| black_box(registry.get(&missing).is_err()))
    });

    group.bench_function("get_and_downcast", |b| {
        b.iter(|| black_box(registry.get(&small).unwrap().downcast::<SmallService>()))
    });

    group.finish();
}

fn bench_layers(c: &mut Criterion) {
    let mut group = c.benchmark_group("layers");

    group.bench_function("with_values", |b| {
        let root = populated();
        b.iter(|| {
            let child = root
                .with_values([("request", Service::new(SmallService { value: 1 }))])
                .unwrap();
            black_box(child)
        })
    });

    for depth in [1u32, 4, 16] {
        let root = populated();
        let mut leaf = root.clone();
        for _ in 0..depth {
            leaf = leaf.with_values(Vec::<(Key, Service)>::new()).unwrap();
        }
        let key = Key::from("small");

        group.bench_with_input(BenchmarkId::new("resolve_from_root", depth), &depth, |b, _| {
            b.iter(|| black_box(leaf.get(&key).unwrap()))
        });
    }

    group.bench_function("overlay_shadowed", |b| {
        let root = populated();
        let overlay = root.overlay([("small", Service::new(SmallService { value: 100 }))]);
        let key = Key::from("small");
        b.iter(|| black_box(overlay.get(&key).unwrap()))
    });

    group.bench_function("overlay_fallthrough", |b| {
        let root = populated();
        let overlay = root.overlay([("small", Service::new(SmallService { value: 100 }))]);
        let key = Key::from("medium");
        b.iter(|| black_box(overlay.get(&key).unwrap()))
    });

    group.finish();
}

fn bench_injection(c: &mut Criterion) {
    let mut group = c.benchmark_group("injection");
    group.throughput(Throughput::Elements(1));

    let registry = populated();

    group.bench_function("inject_three_fields", |b| {
        b.iter(|| {
            let mut handler = Handler::default();
            registry.inject(&mut handler).unwrap();
            black_box(handler)
        })
    });

    group.bench_function("inject_through_overlay", |b| {
        let overlay = registry.overlay([("port", Service::new(8080u16))]);
        b.iter(|| {
            let mut handler = Handler::default();
            overlay.inject(&mut handler).unwrap();
            black_box(handler)
        })
    });

    group.finish();
}

fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");

    group.bench_function("concurrent_reads_4", |b| {
        let registry = populated();

        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let registry = registry.clone();
                    thread::spawn(move || {
                        for _ in 0..100 {
                            let _ = registry.get("small").unwrap();
                        }
                    })
                })
                .collect();

            for h in handles {
                h.join().unwrap();
            }
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_registration,
    bench_lookup,
    bench_layers,
    bench_injection,
    bench_concurrent,
);

criterion_main!(benches);
