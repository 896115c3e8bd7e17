//! Command-line interface for the trading copilot
//!
//! # Usage
//!
//! ```bash
//! export OPENAI_API_KEY=...
//!
//! copilot ask "What's the trend for BTC over the last week?" --stream
//! copilot ask "What does this chart say?" --image chart.png
//! copilot repl
//! copilot indicators ETH --interval 1d --lookback 3mo
//! ```

mod table;

use anyhow::Context;
use clap::{Parser, Subcommand};
use copilot_graph::{ChatService, StreamEvent};
use copilot_llm::Message;
use copilot_market::{
    Interval, MarketConfig, MarketDataSource, SeriesRequest, YahooFinanceClient, indicator_rows,
    recommend,
};
use futures::StreamExt;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "copilot")]
#[command(about = "Trading copilot: ask about a coin, get an indicator-backed answer", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask a single question
    Ask {
        message: String,
        /// Print the answer as it is produced
        #[arg(long)]
        stream: bool,
        /// Chart screenshot to analyse with the question
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Interactive session; prior turns are re-submitted with each question
    Repl,
    /// Print the indicator table for a symbol
    Indicators {
        symbol: String,
        #[arg(long, default_value = "1d")]
        interval: Interval,
        /// How far back to fetch (e.g. 7d, 2mo, 1y)
        #[arg(long, default_value = "2mo")]
        lookback: String,
        /// Number of most recent bars to show
        #[arg(long, default_value_t = 10)]
        rows: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    copilot_utils::init_tracing();

    let args = Args::parse();
    info!(command = ?args.command, "Starting copilot");

    match args.command {
        Command::Ask {
            message,
            stream,
            image,
        } => ask(&message, stream, image).await,
        Command::Repl => repl().await,
        Command::Indicators {
            symbol,
            interval,
            lookback,
            rows,
        } => indicators(&symbol, interval, &lookback, rows).await,
    }
}

async fn ask(message: &str, stream: bool, image: Option<PathBuf>) -> anyhow::Result<()> {
    let service = ChatService::from_env()?;
    let image = match image {
        Some(path) => Some(
            copilot_market::vision::image_from_file(&path)
                .await
                .with_context(|| format!("loading {}", path.display()))?,
        ),
        None => None,
    };

    if stream {
        let mut events = match image {
            Some(image) => service.chat_with_image_stream(message, image).await,
            None => service.chat_stream(message),
        };
        let mut stdout = io::stdout();
        while let Some(event) = events.next().await {
            match event {
                StreamEvent::Content { content } => {
                    writeln!(stdout, "{content}")?;
                    stdout.flush()?;
                }
                StreamEvent::Done { .. } => break,
                StreamEvent::Error { error } => anyhow::bail!(error),
            }
        }
    } else {
        let answer = match image {
            Some(image) => service.chat_with_image(message, image).await?,
            None => service.chat(message).await?,
        };
        println!("{answer}");
    }
    Ok(())
}

async fn repl() -> anyhow::Result<()> {
    let service = ChatService::from_env()?;
    let mut history: Vec<Message> = Vec::new();

    println!("Trading copilot. Ask about a coin, or /exit to quit.\n");
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("> ");
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            println!("\nGoodbye!");
            break;
        }
        let input = input.trim();
        match input {
            "" => continue,
            "/exit" | "/quit" => {
                println!("Goodbye!");
                break;
            }
            _ => {}
        }

        match service.chat_with_history(history.clone(), input).await {
            Ok(answer) => {
                println!("{answer}\n");
                history.push(Message::human(input));
                history.push(Message::assistant(answer));
            }
            Err(e) => eprintln!("Error ({}): {e}\n", e.kind()),
        }
    }
    Ok(())
}

async fn indicators(symbol: &str, interval: Interval, lookback: &str, rows: usize) -> anyhow::Result<()> {
    let config = Arc::new(MarketConfig::builder().default_lookback(lookback).build()?);
    let end = chrono::Utc::now();
    let start = copilot_market::config::parse_lookback(lookback)?.start_from(end)?;
    let request = SeriesRequest::new(symbol, interval, start, end)?;

    let series = YahooFinanceClient::new(config).fetch_series(&request).await?;
    let all_rows = indicator_rows(&series)?;
    let Some(latest) = all_rows.last() else {
        anyhow::bail!("no bars returned for {}", request.symbol);
    };
    let recommendation = recommend(latest);

    let shown = &all_rows[all_rows.len().saturating_sub(rows)..];
    println!("{}", table::render(shown));
    println!(
        "{} {}: {} (score {:+})",
        request.symbol, interval, recommendation.signal, recommendation.score
    );
    for reason in &recommendation.reasons {
        println!("  - {reason}");
    }
    Ok(())
}
