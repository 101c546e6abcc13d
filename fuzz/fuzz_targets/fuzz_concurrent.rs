#![no_main]

//! Fuzz target for concurrent registry operations
//!
//! Threads race registrations through the root and through layered views.
//! Each key must be won by exactly one writer.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use service_injector::{Key, Registry, Service};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

/// Thread operation
#[derive(Debug, Clone, Arbitrary)]
enum ThreadOp {
    Set(u8),
    Get(u8),
    Contains(u8),
    Inject,
}

/// Concurrent test scenario
#[derive(Debug, Arbitrary)]
struct ConcurrentScenario {
    // Keys registered before the threads start
    initial: Vec<u8>,
    // Number of threads (clamped to 1-8)
    thread_count: u8,
    // Operations per thread (clamped)
    ops_per_thread: Vec<ThreadOp>,
}

fn name(id: u8) -> String {
    format!("k{}", id % 32)
}

#[derive(Default)]
struct Probe {
    seen: Option<Arc<u64>>,
}

impl service_injector::Inject for Probe {
    fn describe() -> service_injector::Descriptor<Self> {
        service_injector::Descriptor::new().field(
            service_injector::Field::service::<Option<Arc<u64>>>(
                "seen",
                "k0",
                |probe: &mut Self, service: &Service| {
                    probe.seen = service.downcast::<u64>();
                    probe.seen.is_some()
                },
            )
            .optional("true"),
        )
    }
}

fuzz_target!(|scenario: ConcurrentScenario| {
    let root = Registry::new();
    let wins: Arc<Vec<AtomicUsize>> = Arc::new((0..32).map(|_| AtomicUsize::new(0)).collect());

    for id in scenario.initial.into_iter().take(10) {
        if root.set(name(id), u64::from(id % 32)).is_ok() {
            wins[usize::from(id % 32)].fetch_add(1, Ordering::SeqCst);
        }
    }

    // Clamp thread count
    let thread_count = (scenario.thread_count % 8).max(1) as usize;
    let ops: Vec<ThreadOp> = scenario.ops_per_thread.into_iter().take(64).collect();

    let handles: Vec<_> = (0..thread_count)
        .map(|i| {
            let view = if i % 2 == 0 {
                root.clone()
            } else {
                root.with_values(Vec::<(Key, Service)>::new())
                    .expect("empty layer is always valid")
            };
            let ops = ops.clone();
            let wins = Arc::clone(&wins);

            thread::spawn(move || {
                for op in ops {
                    match op {
                        ThreadOp::Set(id) => {
                            if view.set(name(id), u64::from(id % 32)).is_ok() {
                                wins[usize::from(id % 32)].fetch_add(1, Ordering::SeqCst);
                            }
                        }
                        ThreadOp::Get(id) => {
                            if let Ok(service) = view.get(name(id)) {
                                assert_eq!(service.cloned::<u64>(), Some(u64::from(id % 32)));
                            }
                        }
                        ThreadOp::Contains(id) => {
                            let _ = view.contains(name(id));
                        }
                        ThreadOp::Inject => {
                            let mut probe = Probe::default();
                            view.inject(&mut probe).expect("optional field");
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker panicked");
    }

    for (id, won) in wins.iter().enumerate() {
        let won = won.load(Ordering::SeqCst);
        assert!(won <= 1);
        assert_eq!(won == 1, root.contains(name(id as u8)));
    }
});
