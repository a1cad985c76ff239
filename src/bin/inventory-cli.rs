use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use futures_util::future::join_all;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "inventory-cli")]
#[command(about = "Management CLI for the inventory service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the vendor circuit breaker state
    State,
    /// Look up a vendor price
    Price {
        product_id: u64,
        #[arg(long, default_value = "flaky")]
        mode: String,
        #[arg(long, default_value_t = 0.3)]
        fail_rate: f64,
        #[arg(long, default_value_t = 0)]
        delay_ms: u64,
        /// `resilient` or anything else for a direct call
        #[arg(long, default_value = "resilient")]
        strategy: String,
    },
    /// Show a warehouse item
    Item { id: u64 },
    /// Atomically add `delta` to an item
    Increment {
        id: u64,
        #[arg(allow_hyphen_values = true)]
        delta: i64,
    },
    /// Overwrite an item's quantity
    Set {
        id: u64,
        quantity: u64,
        #[arg(long)]
        version: Option<u64>,
    },
    /// Fire concurrent +1 updates at one item and compare the result
    Race {
        id: u64,
        #[arg(long, default_value_t = 20)]
        workers: usize,
        #[arg(long, value_enum, default_value_t = RaceMode::LostUpdate)]
        mode: RaceMode,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RaceMode {
    /// GET then PUT quantity + 1
    LostUpdate,
    /// POST /increment with delta 1
    Atomic,
}

#[derive(Default)]
struct RaceTally {
    committed: u64,
    conflicts: u64,
    errors: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/').to_string();

    match cli.command {
        Commands::State => {
            let res = client
                .get(format!("{}/warehouse_items/vendor_state", base))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Price {
            product_id,
            mode,
            fail_rate,
            delay_ms,
            strategy,
        } => {
            let res = client
                .get(format!("{}/warehouse_items/vendor_price/{}", base, product_id))
                .query(&[
                    ("mode", mode),
                    ("fail_rate", fail_rate.to_string()),
                    ("delay_ms", delay_ms.to_string()),
                    ("strategy", strategy),
                ])
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Item { id } => {
            let res = client
                .get(format!("{}/warehouse_items/{}", base, id))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Increment { id, delta } => {
            let res = client
                .post(format!("{}/warehouse_items/{}/increment", base, id))
                .json(&json!({ "delta": delta }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Set { id, quantity, version } => {
            let mut body = json!({ "quantity": quantity });
            if let Some(v) = version {
                body["version"] = json!(v);
            }
            let res = client
                .put(format!("{}/warehouse_items/{}", base, id))
                .json(&body)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Race { id, workers, mode } => {
            race(client, base, id, workers, mode).await?;
        }
    }

    Ok(())
}

async fn race(
    client: reqwest::Client,
    base: String,
    id: u64,
    workers: usize,
    mode: RaceMode,
) -> Result<(), Box<dyn std::error::Error>> {
    let item_url = Arc::new(format!("{}/warehouse_items/{}", base, id));
    let initial = quantity(&client, &item_url).await?;
    println!("Initial quantity: {}", initial);

    let start = Instant::now();
    let tasks = (0..workers).map(|_| {
        let client = client.clone();
        let item_url = Arc::clone(&item_url);
        tokio::spawn(async move {
            match mode {
                RaceMode::LostUpdate => lost_update_worker(&client, &item_url).await,
                RaceMode::Atomic => atomic_worker(&client, &item_url).await,
            }
        })
    });

    let mut tally = RaceTally::default();
    for outcome in join_all(tasks).await {
        match outcome {
            Ok(Ok(status)) if status.is_success() => tally.committed += 1,
            Ok(Ok(status)) if status == StatusCode::CONFLICT => tally.conflicts += 1,
            _ => tally.errors += 1,
        }
    }
    let elapsed = start.elapsed();

    let actual = quantity(&client, &item_url).await?;
    let expected = initial + tally.committed;
    println!(
        "Workers: {}  committed: {}  conflicts: {}  errors: {}  elapsed: {:.2?}",
        workers, tally.committed, tally.conflicts, tally.errors, elapsed
    );
    println!("Expected quantity: {}  actual: {}", expected, actual);
    if actual < initial + workers as u64 {
        println!("Updates not applied: {}", initial + workers as u64 - actual);
    }
    Ok(())
}

async fn quantity(client: &reqwest::Client, item_url: &str) -> Result<u64, Box<dyn std::error::Error>> {
    let item: Value = client.get(item_url).send().await?.error_for_status()?.json().await?;
    item["quantity"]
        .as_u64()
        .ok_or_else(|| "item response has no quantity".into())
}

async fn lost_update_worker(client: &reqwest::Client, item_url: &str) -> Result<StatusCode, reqwest::Error> {
    let item: Value = client.get(item_url).send().await?.json().await?;
    let current = item["quantity"].as_u64().unwrap_or(0);
    let res = client
        .put(item_url)
        .json(&json!({ "quantity": current + 1 }))
        .send()
        .await?;
    Ok(res.status())
}

async fn atomic_worker(client: &reqwest::Client, item_url: &str) -> Result<StatusCode, reqwest::Error> {
    let res = client
        .post(format!("{}/increment", item_url))
        .json(&json!({ "delta": 1 }))
        .send()
        .await?;
    Ok(res.status())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
