//! Telemetry Simulator
//!
//! Posts IoT Central style export batches to a running relay so it can be
//! exercised without real devices. Point the relay's `ttn.base_url` at a
//! scratch endpoint first unless real downlinks are wanted.
//!
//! Usage: cargo run --bin telemetry-sim [relay_url]

use chrono::Utc;
use serde_json::{json, Value};
use std::env;
use std::time::Duration;

const DEFAULT_URL: &str = "http://127.0.0.1:3000/api/PlantTypeDownlink";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let url = env::args().nth(1).unwrap_or_else(|| DEFAULT_URL.to_string());

    println!("🌱 Plant Downlink Relay Telemetry Simulator");
    println!("  Target: {}", url);
    println!();

    let client = reqwest::Client::new();

    let scenarios: Vec<(&str, Option<Value>)> = vec![
        (
            "Properties array, string value",
            Some(properties_array_message("plant-node-01", json!("2"))),
        ),
        (
            "Desired object, numeric value",
            Some(desired_message("plant-node-02", json!(5))),
        ),
        (
            "Batch of three (one without properties)",
            Some(json!([
                properties_array_message("plant-node-01", json!(1)),
                json!({ "deviceId": "plant-node-03", "enqueuedTime": now() }),
                desired_message("plant-node-02", json!("3")),
            ])),
        ),
        ("Null body", Some(Value::Null)),
        ("Empty body", None),
        (
            "Out-of-range plant type",
            Some(desired_message("plant-node-04", json!(300))),
        ),
    ];

    for (desc, body) in &scenarios {
        println!("📡 Sending: {}", desc);

        let request = client.post(&url).header("Content-Type", "application/json");
        let request = match body {
            Some(value) => request.body(serde_json::to_vec(value)?),
            None => request,
        };

        match request.send().await {
            Ok(resp) => {
                let status = resp.status();
                let text = resp.text().await.unwrap_or_default();
                println!("   ✅ {} {:?}", status.as_u16(), text);
            }
            Err(e) => println!("   ❌ Request failed: {}", e),
        }
        println!();

        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    println!("✨ Simulation complete!");
    Ok(())
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

/// IoT Central property export: list of named properties
fn properties_array_message(device_id: &str, plant_type: Value) -> Value {
    json!({
        "deviceId": device_id,
        "enqueuedTime": now(),
        "messageSource": "properties",
        "properties": [
            { "name": "Firmware", "value": "1.4.0" },
            { "name": "Type", "value": plant_type },
        ],
    })
}

/// Device twin change: desired properties object
fn desired_message(device_id: &str, plant_type: Value) -> Value {
    json!({
        "deviceId": device_id,
        "enqueuedTime": now(),
        "messageSource": "twinChangeEvents",
        "properties": {
            "desired": { "Type": plant_type, "$version": 4 },
            "reported": {},
        },
    })
}
