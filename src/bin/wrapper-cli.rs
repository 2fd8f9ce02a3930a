use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

use openclaw_wrapper::config::load_or_default;
use openclaw_wrapper::gateway_config::generator_from_config;

#[derive(Parser)]
#[command(name = "wrapper-cli")]
#[command(about = "Management CLI for the OpenClaw wrapper", long_about = None)]
struct Cli {
    /// Base URL of the admin listener.
    #[arg(short, long, default_value = "http://127.0.0.1:3002")]
    url: String,

    #[arg(short, long, env = "WRAPPER_ADMIN_KEY")]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show gateway state and readiness
    Status,
    /// Dump the gateway log file
    Logs,
    /// List processes known to the backend
    Processes,
    /// Show buffered output of one process
    ProcessLogs { id: String },
    /// Generate the gateway configuration locally
    GenConfig {
        #[arg(short, long, env = "WRAPPER_CONFIG")]
        config: Option<PathBuf>,

        /// Print the resulting document
        #[arg(long)]
        print: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let path = match cli.command {
        Commands::Status => "/admin/status".to_string(),
        Commands::Logs => "/admin/logs".to_string(),
        Commands::Processes => "/admin/processes".to_string(),
        Commands::ProcessLogs { id } => format!("/admin/processes/{}/logs", id),
        Commands::GenConfig { config, print } => {
            return gen_config(config, print).await;
        }
    };

    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", key))?,
        );
    }

    let res = reqwest::Client::new()
        .get(format!("{}{}", cli.url.trim_end_matches('/'), path))
        .headers(headers)
        .send()
        .await?;
    print_response(res).await
}

async fn gen_config(config: Option<PathBuf>, print: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_or_default(config.as_deref())?;
    let generator = generator_from_config(&config);
    generator.generate().await?;

    let output = &config.generator.output_path;
    eprintln!("{} generator wrote {}", generator.name(), output.display());
    if print {
        println!("{}", tokio::fs::read_to_string(output).await?);
    }
    Ok(())
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

    let is_json = res
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));

    if is_json {
        let json: Value = res.json().await?;
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        print!("{}", res.text().await?);
    }
    Ok(())
}
