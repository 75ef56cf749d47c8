mod calendar;
mod cli;
mod config;
mod engine;
mod error;
mod extract;
mod sheets;
mod ui;
mod workflow;

use anyhow::{Result, bail};
use chrono::Utc;
use clap::Parser;

use crate::calendar::{CalendarClient, CalendarStore};
use crate::cli::{Cli, Command};
use crate::config::EvsyncConfig;
use crate::engine::Engine;
use crate::error::RunError;
use crate::extract::ExtractorClient;
use crate::sheets::{RowStore, SheetsClient};
use crate::ui::RunProgress;
use crate::workflow::{RunReport, RunState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = EvsyncConfig::load()?;

    match &cli.command {
        Command::Run => run_batch(&cli, &config).await,
        Command::Status => show_status(&config).await,
        Command::Upcoming { limit } => show_upcoming(&config, *limit).await,
        Command::InitSheet => init_sheet(&config).await,
    }
}

fn sheets_client(config: &EvsyncConfig) -> Result<SheetsClient> {
    if config.google_access_token.is_empty() {
        bail!("GOOGLE_ACCESS_TOKEN is not set");
    }
    if config.sheet_id.is_empty() {
        bail!("GOOGLE_SHEET_ID is not set");
    }
    Ok(SheetsClient::new(
        config.google_access_token.clone(),
        config.sheet_id.clone(),
        config.sheet_name.clone(),
    ))
}

fn calendar_client(config: &EvsyncConfig) -> Result<CalendarClient> {
    if config.google_access_token.is_empty() {
        bail!("GOOGLE_ACCESS_TOKEN is not set");
    }
    Ok(CalendarClient::new(
        config.google_access_token.clone(),
        config.calendar_id.clone(),
        config.timezone.clone(),
        config.default_event_time.clone(),
    ))
}

async fn run_batch(cli: &Cli, config: &EvsyncConfig) -> Result<()> {
    if config.anthropic_api_key.is_empty() {
        bail!("ANTHROPIC_API_KEY is not set");
    }
    let extractor = ExtractorClient::new(config.anthropic_api_key.clone());
    let rows = sheets_client(config)?;
    let calendar = calendar_client(config)?;
    let max_loops = cli.max_loops.unwrap_or(config.max_loop_iterations);
    let engine = Engine::new(extractor, rows, calendar).with_max_loops(max_loops);

    let started_at = Utc::now();
    let progress = RunProgress::start("processing pending rows");
    let outcome = engine.run(RunState::new()).await;
    progress.finish();

    let state = match outcome {
        Ok(state) => state,
        Err(RunError::GuardExceeded { iterations, state }) => {
            progress.warn(&format!(
                "run stopped early after {iterations} loop iterations"
            ));
            *state
        }
    };

    if cli.verbose {
        for message in &state.messages {
            println!("  {message}");
        }
    }
    progress.errors(&state.error_log);

    let report = RunReport::from_state(&state, started_at);
    progress.summary(&report);
    progress.print_report(&report);
    Ok(())
}

async fn show_status(config: &EvsyncConfig) -> Result<()> {
    let rows = sheets_client(config)?;
    let pending = rows.fetch_unprocessed().await?;
    println!("{} rows waiting to be processed", pending.len());
    for row in &pending {
        let preview: String = row.text.chars().take(60).collect();
        println!("  row {}: {preview}", row.row_number);
    }
    Ok(())
}

async fn show_upcoming(config: &EvsyncConfig, limit: u32) -> Result<()> {
    let calendar = calendar_client(config)?;
    let events = calendar.list_upcoming(limit).await?;
    if events.is_empty() {
        println!("no upcoming events");
        return Ok(());
    }
    for event in &events {
        println!("  {}  {}", event.start, event.summary);
    }
    Ok(())
}

async fn init_sheet(config: &EvsyncConfig) -> Result<()> {
    let sheets = sheets_client(config)?;
    sheets.write_headers().await?;
    println!("sheet headers written");
    Ok(())
}
