//! ets-agent: interactive agent client for the tool server

use std::env;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::info;

use ets::agent::{GeminiModel, Orchestrator, RpcClient};

const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[tokio::main]
async fn main() -> Result<()> {
    ets::initialize_logging()?;

    let server_addr =
        env::var("ETS_SERVER_ADDR").unwrap_or_else(|_| DEFAULT_SERVER_ADDR.to_string());
    let api_key = env::var("GOOGLE_API_KEY")
        .or_else(|_| env::var("GEMINI_API_KEY"))
        .context("GOOGLE_API_KEY or GEMINI_API_KEY must be set")?;
    let model_name = env::var("GOOGLE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
    let sheets_id = env::var("GOOGLE_SHEETS_ID")
        .or_else(|_| env::var("SHEETS_ID"))
        .ok();

    println!("Connecting to tool server at {}", server_addr);
    let mut client = RpcClient::connect(&server_addr)
        .await
        .with_context(|| format!("failed to connect to {}", server_addr))?;
    let init = client.initialize("ets-agent").await?;
    info!(server = %init.server_info.name, version = %init.server_info.version, "connected");

    let tools = client.list_tools().await?;
    println!("Loaded {} tools from {}:", tools.len(), init.server_info.name);
    for (index, tool) in tools.iter().enumerate() {
        println!("  {}. {} - {}", index + 1, tool.name, tool.description);
    }
    println!();

    let model = GeminiModel::new(api_key, model_name, &tools, sheets_id.as_deref());
    let mut orchestrator = Orchestrator::new(model, client);

    let (cancel_tx, mut cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupted.");
            let _ = cancel_tx.send(true);
        }
    });

    let args: Vec<String> = env::args().skip(1).collect();
    if !args.is_empty() {
        let query = args.join(" ");
        let answer = orchestrator.run_query(&query, &mut cancel_rx).await?;
        println!("{}", answer);
        return Ok(());
    }

    println!("Interactive mode. Type 'quit' or 'exit' to leave.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        println!();
        print!("Your request: ");
        use std::io::Write;
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = cancel_rx.changed() => break,
        };
        let Some(line) = line else { break };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input.to_lowercase().as_str(), "quit" | "exit" | "q") {
            println!("Goodbye.");
            break;
        }

        match orchestrator.run_query(input, &mut cancel_rx).await {
            Ok(answer) => println!("\n{}\n", answer),
            Err(ets::AppError::Cancelled) => break,
            Err(err) if err.is_recoverable() => eprintln!("\nError: {}\n", err),
            Err(err) => bail!(err),
        }
    }
    Ok(())
}
