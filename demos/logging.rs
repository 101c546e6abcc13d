//! Example demonstrating logging capabilities
//!
//! Run with JSON logging (production):
//! ```bash
//! cargo run --example logging --features logging-json
//! ```
//!
//! Run with pretty logging (development):
//! ```bash
//! cargo run --example logging --features logging-pretty
//! ```
//!
//! `RUST_LOG=service_injector=trace` adds per-field injection events.

use service_injector::{Descriptor, Field, Inject, Registry, Service};
use std::sync::Arc;

// Example services
#[allow(dead_code)]
struct Database {
    url: String,
}

#[allow(dead_code)]
#[derive(Clone)]
struct RequestContext {
    request_id: String,
}

#[allow(dead_code)]
#[derive(Default)]
struct Handler {
    db: Option<Arc<Database>>,
    context: Option<RequestContext>,
}

impl Inject for Handler {
    fn describe() -> Descriptor<Self> {
        Descriptor::new()
            .field(Field::service::<Option<Arc<Database>>>(
                "db",
                "db",
                |handler: &mut Self, service: &Service| {
                    handler.db = service.downcast::<Database>();
                    handler.db.is_some()
                },
            ))
            .field(
                Field::service::<Option<RequestContext>>(
                    "context",
                    "request",
                    |handler: &mut Self, service: &Service| {
                        handler.context = service.cloned::<RequestContext>();
                        handler.context.is_some()
                    },
                )
                .optional("true"),
            )
    }
}

fn main() {
    // Uses JSON if logging-json is enabled, pretty otherwise
    service_injector::logging::builder().trace().injector_only().init();

    println!("=== Service Injector Logging Demo ===\n");

    // Creating the root registry (logs: "Creating new root registry")
    let registry = Registry::new();

    // Register services (logs: "Registered service")
    registry.must_set(
        "db",
        Database {
            url: "postgres://localhost/mydb".into(),
        },
    );

    // Duplicate registration (logs: "Rejected duplicate registration")
    let duplicate = registry.set(
        "db",
        Database {
            url: "other".into(),
        },
    );
    assert!(duplicate.is_err());

    // Missing service (logs: "Service not found in registry or parent chain")
    assert!(registry.get("cache").is_err());

    // Inject with the optional field missing; that miss is not logged
    let mut handler = Handler::default();
    registry.inject(&mut handler).unwrap();

    // Layer request values over the registry (logs: "Creating layered registry")
    let request = registry
        .with_values([(
            "request",
            Service::new(RequestContext {
                request_id: "req-12345".into(),
            }),
        )])
        .unwrap();

    // Resolve from the layer and from the root (logs: "Service resolved")
    let mut handler = Handler::default();
    request.inject(&mut handler).unwrap();

    // Writes through the layer land in the root (logs: delegated = true)
    request.must_set("audit", true);

    // Overlay for a single code path (logs: "Creating overlay")
    let overlay = registry.overlay([(
        "db",
        Service::new(Database {
            url: "postgres://replica/mydb".into(),
        }),
    )]);
    let _replica = overlay.get("db").unwrap();

    println!("\n=== Demo Complete ===");
    println!("Check the log output above to see structured logging in action!");
    println!("\nTip: Use --features logging-json for production (JSON output)");
    println!("     Use --features logging-pretty for development (pretty output)");
}
