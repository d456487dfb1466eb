use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "rate-gate-cli")]
#[command(about = "Management CLI for the rate-gate admin API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "RATE_GATE_ADMIN_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway status
    Status,
    /// Show attempts and time to reset for a rate limit key
    Inspect {
        /// Full key, e.g. "public_rate_limit:auth:203.0.113.9|e3b0c442"
        key: String,
    },
    /// Reset the counter for a rate limit key
    Reset { key: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    match cli.command {
        Commands::Status => {
            let res = client
                .get(format!("{}/admin/status", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Inspect { key } => {
            let res = client
                .get(limit_url(&cli.url, &key))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Reset { key } => {
            let res = client
                .delete(limit_url(&cli.url, &key))
                .headers(headers)
                .send()
                .await?;
            if res.status() == StatusCode::NO_CONTENT {
                println!("Cleared {key}");
            } else {
                print_response(res).await?;
            }
        }
    }

    Ok(())
}

/// Keys carry `|` between IP and user agent hash.
fn limit_url(base: &str, key: &str) -> String {
    format!("{}/admin/limits/{}", base, key.replace('|', "%7C"))
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
