//! textpace bulk send client
//!
//! Posts one `/sendBulkMessages` request to a running tp-server. Numbers come
//! from `--number` flags and/or a file with one number per line; duplicates
//! are dropped before sending, keeping the first occurrence.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::{json, Value};
use tracing::{debug, error};

/// Send the same messages to many numbers through tp-server
#[derive(Parser, Debug)]
#[command(name = "tp-bulk-send")]
#[command(about = "Send the same messages to many phone numbers")]
struct Args {
    /// Base URL of the tp-server
    #[arg(long, env = "TEXTPACE_URL", default_value = "http://localhost:5001")]
    url: String,

    /// Shared API key
    #[arg(long, env = "API_KEY")]
    api_key: String,

    /// Phone number (repeatable)
    #[arg(long = "number", short = 'n')]
    numbers: Vec<String>,

    /// File with one phone number per line; blank lines and `#` comments are ignored
    #[arg(long)]
    numbers_file: Option<PathBuf>,

    /// Message to send (repeatable, sent in order)
    #[arg(long = "message", short = 'm', required = true)]
    messages: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tp_common::logging::init_logging("tp-bulk-send");

    let args = Args::parse();

    let mut numbers = args.numbers.clone();
    if let Some(path) = &args.numbers_file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read numbers file {}", path.display()))?;
        numbers.extend(parse_numbers_file(&content));
    }

    let unique = dedup_preserving_order(numbers);
    if unique.is_empty() {
        bail!("No phone numbers given (use --number or --numbers-file)");
    }

    println!("Sending message to {} unique numbers...", unique.len());

    let endpoint = format!("{}/sendBulkMessages", args.url.trim_end_matches('/'));
    let body = json!({
        "phone_numbers": unique,
        "messages": args.messages,
    });

    debug!(endpoint = %endpoint, "Posting bulk request");

    let response = reqwest::Client::new()
        .post(&endpoint)
        .header("X-API-Key", &args.api_key)
        .json(&body)
        .send()
        .await
        .with_context(|| format!("Request to {} failed", endpoint))?;

    let status = response.status();
    let text = response.text().await.context("Failed to read response body")?;
    let payload = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));

    if status.is_success() {
        println!("Success: {}", payload);
        Ok(())
    } else {
        error!(status_code = status.as_u16(), "Server rejected bulk request");
        bail!("Error ({}): {}", status, payload);
    }
}

fn parse_numbers_file(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

fn dedup_preserving_order(numbers: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    numbers
        .into_iter()
        .filter(|n| seen.insert(n.clone()))
        .collect()
}
