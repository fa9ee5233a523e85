use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "console-cli")]
#[command(about = "Management CLI for the nginx console", long_about = None)]
struct Cli {
    #[arg(short, long, env = "CONSOLE_URL", default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "CONSOLE_API_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check console status
    Status,
    /// List sites with their enabled state
    Sites,
    /// Link a site into sites-enabled and reload
    Enable { name: String },
    /// Remove a site's activation link and reload
    Disable { name: String },
    /// Show recent access log entries, newest first
    Logs {
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Traffic stats over a recent window
    Stats {
        #[arg(short, long)]
        minutes: Option<u32>,
    },
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

    let request = match cli.command {
        Commands::Status => client.get(format!("{}/api/status", cli.url)),
        Commands::Sites => client.get(format!("{}/api/sites", cli.url)),
        Commands::Enable { name } => client
            .post(format!("{}/api/sites", cli.url))
            .json(&json!({ "action": "enable", "configName": name })),
        Commands::Disable { name } => client
            .post(format!("{}/api/sites", cli.url))
            .json(&json!({ "action": "disable", "configName": name })),
        Commands::Logs { limit } => {
            let mut request = client.get(format!("{}/api/logs", cli.url));
            if let Some(limit) = limit {
                request = request.query(&[("limit", limit)]);
            }
            request
        }
        Commands::Stats { minutes } => {
            let mut request = client.get(format!("{}/api/stats", cli.url));
            if let Some(minutes) = minutes {
                request = request.query(&[("minutes", minutes)]);
            }
            request
        }
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
