//! Example demonstrating the #[derive(Inject)] macro
//!
//! Run with:
//!   cargo run --example derive --features derive

use service_injector::{BoxError, Inject, Key, PostInject, Registry, ServiceKey};
use std::borrow::Cow;
use std::sync::Arc;

// Dependencies
struct Database {
    url: String,
}

#[derive(Clone)]
struct Cache {
    size: usize,
}

/// Value key tagged "logger", so a string annotation can reach it
#[derive(PartialEq, Eq, Hash)]
struct LoggerKey;

impl ServiceKey for LoggerKey {
    fn tag(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed("logger"))
    }
}

struct Logger {
    level: String,
}

// Embedded into services that count their requests
#[derive(Default, Inject)]
struct Metrics {
    #[inject(key = "metrics.prefix", optional)]
    pub prefix: String,
}

// Service with injected dependencies
#[derive(Default, Inject)]
#[inject(post_inject)]
struct UserService {
    #[inject("db")]
    pub db: Option<Arc<Database>>,
    #[inject("cache")]
    pub cache: Option<Cache>,
    #[inject(key = "logger", optional)]
    pub logger: Option<Arc<Logger>>,
    #[inject(embed)]
    pub metrics: Metrics,
    // Not annotated, left alone
    pub request_count: u64,
    // Built from the injected fields
    summary: String,
}

impl PostInject for UserService {
    fn post_inject(&mut self) -> Result<(), BoxError> {
        let db = self.db.as_ref().ok_or("database missing")?;
        let cache = self.cache.as_ref().ok_or("cache missing")?;
        let logging = match &self.logger {
            Some(logger) => format!("logging at {}", logger.level),
            None => "without logging".to_string(),
        };

        self.summary = format!(
            "UserService connected to {} with cache size {} ({}, prefix {:?}, requests: {})",
            db.url, cache.size, logging, self.metrics.prefix, self.request_count
        );
        Ok(())
    }
}

// A private annotated field cannot be written
#[derive(Default, Inject)]
struct Misconfigured {
    #[inject("db")]
    #[allow(dead_code)]
    db: Option<Arc<Database>>,
}

fn main() {
    println!("=== #[derive(Inject)] Demo ===\n");

    let registry = Registry::new();
    registry.must_set(
        "db",
        Database {
            url: "postgres://localhost/app".into(),
        },
    );
    registry.must_set("cache", Cache { size: 1024 });

    // Without a logger or prefix: optional fields are left alone
    let mut users = UserService::default();
    registry.inject(&mut users).expect("injection failed");
    println!("1. {}", users.summary);

    // Registering the optional services fills them in
    registry.must_set(
        Key::new(LoggerKey),
        Logger {
            level: "debug".into(),
        },
    );
    registry.must_set("metrics.prefix", String::from("users"));

    let mut users = UserService::default();
    registry.inject(&mut users).expect("injection failed");
    println!("2. {}", users.summary);

    // A missing required service stops injection
    let empty = Registry::new();
    let mut users = UserService::default();
    match empty.inject(&mut users) {
        Ok(()) => println!("3. unexpected success"),
        Err(err) => println!("3. Error: {err}"),
    }

    // Private fields are reported
    let mut broken = Misconfigured::default();
    match registry.inject(&mut broken) {
        Ok(()) => println!("4. unexpected success"),
        Err(err) => println!("4. Error: {err}"),
    }

    println!("\n=== Demo Complete ===");
}
