use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "kickoff-cli")]
#[command(about = "Management CLI for the kickoff daemon", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:8081")]
    url: String,

    #[arg(short, long, env = "KICKOFF_ADMIN_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Daemon summary: active endpoint and healthy count
    Status,
    /// Health snapshot of every RPC endpoint
    Endpoints,
    /// Show the active RPC endpoint
    Active,
    /// Clear an endpoint's failures and mark it healthy
    Reset { name: String },
    /// Report a failure against an endpoint
    Fail { name: String },
    /// Run a health check sweep now
    Check,
    /// Show the active season
    Season,
    /// End the active season and open the next one
    SeasonReset {
        /// Name of the next season
        #[arg(long)]
        name: Option<String>,
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

    let base = cli.url.trim_end_matches('/');
    let request = match cli.command {
        Commands::Status => client.get(format!("{}/admin/status", base)),
        Commands::Endpoints => client.get(format!("{}/admin/endpoints", base)),
        Commands::Active => client.get(format!("{}/admin/endpoints/active", base)),
        Commands::Reset { name } => client.post(format!("{}/admin/endpoints/{}/reset", base, name)),
        Commands::Fail { name } => client.post(format!("{}/admin/endpoints/{}/failure", base, name)),
        Commands::Check => client.post(format!("{}/admin/health-checks", base)),
        Commands::Season => client.get(format!("{}/admin/seasons/current", base)),
        Commands::SeasonReset { name } => client
            .post(format!("{}/admin/seasons/reset", base))
            .json(&serde_json::json!({ "name": name })),
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

    if status == StatusCode::NO_CONTENT {
        println!("OK");
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
