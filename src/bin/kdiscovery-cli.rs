use std::collections::BTreeMap;

use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "kdiscovery-cli")]
#[command(about = "Query a running kdiscovery instance", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the full target snapshot
    Targets,
    /// Summarize groups and targets per job
    Jobs,
    /// Check the liveness probe
    Health,
    /// Check the readiness probe
    Readiness,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Targets => {
            let snapshot = fetch_snapshot(&client, base).await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Commands::Jobs => {
            let snapshot = fetch_snapshot(&client, base).await?;
            println!("{:<32} {:>8} {:>8}", "JOB", "GROUPS", "TARGETS");
            for (job, groups) in &snapshot {
                let targets: usize = groups
                    .iter()
                    .filter_map(|group| group.get("targets").and_then(Value::as_array))
                    .map(Vec::len)
                    .sum();
                println!("{:<32} {:>8} {:>8}", job, groups.len(), targets);
            }
        }
        Commands::Health => probe(&client, base, "/health").await?,
        Commands::Readiness => probe(&client, base, "/readiness").await?,
    }

    Ok(())
}

async fn fetch_snapshot(
    client: &reqwest::Client,
    base: &str,
) -> Result<BTreeMap<String, Vec<Value>>, Box<dyn std::error::Error>> {
    let res = client.get(format!("{}/", base)).send().await?;
    let status = res.status();
    if !status.is_success() {
        let text = res.text().await.unwrap_or_default();
        return Err(format!("kdiscovery returned status {}: {}", status, text).into());
    }
    Ok(res.json().await?)
}

async fn probe(
    client: &reqwest::Client,
    base: &str,
    path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let status = client.get(format!("{}{}", base, path)).send().await?.status();
    if status.is_success() {
        println!("{}: ok", path);
        Ok(())
    } else {
        Err(format!("{} returned status {}", path, status).into())
    }
}
