//! Example: layered registries and overlays for per-request services
//!
//! Run with:
//!   cargo run --example overlay

use service_injector::{Key, Registry, Service, context};

#[derive(Clone, Debug)]
struct Logger {
    fields: Vec<(&'static str, String)>,
}

impl Logger {
    fn log(&self, message: &str) {
        let fields: Vec<String> = self.fields.iter().map(|(k, v)| format!("{k}={v}")).collect();
        println!("  [{}] {}", fields.join(" "), message);
    }

    fn with(&self, key: &'static str, value: impl Into<String>) -> Logger {
        let mut fields = self.fields.clone();
        fields.push((key, value.into()));
        Logger { fields }
    }
}

fn logger(source: &Registry) -> Logger {
    source
        .get("logger")
        .ok()
        .and_then(|service| service.cloned::<Logger>())
        .unwrap_or(Logger { fields: Vec::new() })
}

fn handle_request(id: u32) {
    // Whatever registry the caller made current
    let registry = context::current_or_global();
    let base = logger(&registry);

    // Re-point "logger" for this request only
    let overlay = registry.overlay([(
        Key::from("logger"),
        Service::new(base.with("request", id.to_string())),
    )]);

    if let Some(logger) = overlay.get("logger").ok().and_then(|s| s.cloned::<Logger>()) {
        logger.log("handling request");
    }

    // Counted in the shared registry, not the overlay
    let key = format!("request.{id}.done");
    overlay.must_set(key.as_str(), true);
}

fn main() {
    println!("=== Layers and Overlays Demo ===\n");

    let root = Registry::new();
    root.must_set(
        "logger",
        Logger {
            fields: vec![("app", "demo".into())],
        },
    );

    println!("1. Overlays shadow reads for one code path:");
    context::with_registry(&root, || {
        for id in 1..=3 {
            handle_request(id);
        }
    });
    logger(&root).log("root logger unchanged");
    println!("   requests recorded in root: {}", root.len() - 1);

    println!("\n2. Layers shadow reads and write through to the root:");
    let tenant = root
        .with_values([(
            "logger",
            Service::new(logger(&root).with("tenant", "acme")),
        )])
        .expect("fresh layer");
    context::with_registry(&tenant, || handle_request(4));
    println!(
        "   request.4.done visible from root: {}",
        root.contains("request.4.done")
    );

    println!("\n3. Duplicate keys are rejected on every layer:");
    match tenant.set("logger", logger(&root)) {
        Ok(()) => println!("   unexpected success"),
        Err(err) => println!("   Error: {err}"),
    }

    println!("\n=== Demo Complete ===");
}
