//! Working with documents at runtime.
//!
//! Run with: cargo run --example dynamic_values

use flexjson::{doc, to_value, Context, Document, LogEvent, Options, Value};
use serde::Serialize;
use std::error::Error;

#[derive(Debug, Serialize)]
struct Service {
    name: String,
    replicas: u32,
    roles: Vec<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let config = doc!({
        "host": "localhost",
        "port": "8080",
        "features": ["auth", "logging", "metrics"],
        "debug": "TRUE"
    });

    println!("Config:\n{}\n", config.to_text_pretty());

    // Text holding numbers and booleans coerces on the way out
    let port: u16 = config.require("port")?;
    let debug: bool = config.require("debug")?;
    let features: Vec<String> = config.require("features")?;
    println!("port {} debug {} features {:?}", port, debug, features);

    // Optional reads fall back to the zero value; failures go to the sink
    let ctx = Context::new(Options::new().with_trimmed_strings(true))
        .with_sink(|event: &LogEvent| println!("  [{}] {}", event.severity, event.message));
    let timeout: u32 = ctx.optional(&config, "timeout")?;
    let broken: u32 = ctx.optional(&config, "host")?;
    println!("timeout {} broken {}\n", timeout, broken);

    // Serde types become values
    let service = Service {
        name: "api".to_string(),
        replicas: 3,
        roles: vec!["admin".to_string(), "developer".to_string()],
    };
    let value = to_value(&service)?;
    config.set("service", value);

    let shared = config.clone();
    shared.set("port", 9090);
    println!("Clones share storage: port is now {}", config.get("port"));

    let reparsed: Document = config.to_text().parse()?;
    println!("Equal after a text round trip: {}", reparsed == config);
    println!("Has 'replicas' somewhere: {}", config.contains_key_recursive("replicas"));
    println!("Is 'service' an object: {}", matches!(config.get("service"), Value::Object(_)));

    Ok(())
}
