use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use rust_decimal::Decimal;
use std::ops::ControlFlow;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use lookback_common::{LoadOptions, PriceTable, TradeEventKind};
use lookback_core::{
    analysis::{summarize, AnalysisError, LookbackAnalyzer, LookbackRange, MetricsCalculator},
    config::Settings,
    report::{self, SweepReport},
};

#[derive(Parser)]
#[command(name = "lookback")]
#[command(about = "Profit sensitivity of a marked trade list to the lookback window")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a price table and list its entries and exits
    Inspect {
        file: PathBuf,
        #[arg(long)]
        skip_rows: Option<usize>,
    },
    /// Sweep lookback values over the marked trades of a price table
    Analyze {
        file: PathBuf,
        #[arg(long)]
        min: Option<usize>,
        #[arg(long)]
        max: Option<usize>,
        #[arg(long)]
        interval: Option<usize>,
        #[arg(long)]
        tick_offset: Option<Decimal>,
        #[arg(long)]
        skip_rows: Option<usize>,
        /// Evaluate lookback values in parallel
        #[arg(long)]
        parallel: bool,
        /// Write the full report as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::new().context("Failed to load settings")?;

    match cli.command {
        Commands::Inspect { file, skip_rows } => {
            let options = LoadOptions::default()
                .with_skip_rows(skip_rows.unwrap_or(settings.input.skip_rows));
            let table = PriceTable::from_path(&file, &options)
                .with_context(|| format!("Failed to load {}", file.display()))?;

            println!("\nPrice table: {}", file.display());
            println!("Bars: {}", table.len());
            if let Some((first, last)) = table.time_range() {
                println!("Range: {} .. {}", first, last);
            }

            if !table.has_markers() {
                println!("No trade markers (Order/Entry/Exit) in this table");
                return Ok(());
            }

            let events = table.trade_events()?;
            println!("Number of entries and exits: {}", events.len());
            println!("\nEntries and exits:");
            for event in &events {
                match &event.kind {
                    TradeEventKind::Entry { order_type, price } => println!(
                        "{:>8}  {:<20}  {:<3}  entry @ {}",
                        event.row_index, event.time, order_type, price
                    ),
                    TradeEventKind::Exit { price } => println!(
                        "{:>8}  {:<20}  {:<3}  exit  @ {}",
                        event.row_index, event.time, "", price
                    ),
                }
            }
        }

        Commands::Analyze {
            file,
            min,
            max,
            interval,
            tick_offset,
            skip_rows,
            parallel,
            json,
        } => {
            let options = LoadOptions::default()
                .with_skip_rows(skip_rows.unwrap_or(settings.input.skip_rows));
            let table = PriceTable::from_path(&file, &options)
                .with_context(|| format!("Failed to load {}", file.display()))?;
            let events = table.trade_events()?;
            if events.is_empty() {
                bail!("No marked entries or exits in {}", file.display());
            }
            info!(
                "Loaded {} bars and {} entry/exit rows",
                table.len(),
                events.len()
            );

            let defaults = settings.lookback_range();
            let range = LookbackRange::new(
                min.unwrap_or(defaults.min),
                max.unwrap_or(defaults.max),
                interval.unwrap_or(defaults.interval),
            )?;
            let lookbacks = range.values()?;

            let mut config = settings.analysis_config();
            if let Some(offset) = tick_offset {
                config.tick_offset = offset;
            }

            let analyzer = LookbackAnalyzer::new(table.bars(), config);
            let outcome = if parallel || settings.analysis.parallel {
                analyzer.par_sweep(&events, &lookbacks)
            } else {
                analyzer.sweep_with_progress(&events, &lookbacks, |p| {
                    info!(
                        "Analysis in progress: {:.0}% (lookback {})",
                        p.fraction() * 100.0,
                        p.lookback
                    );
                    ControlFlow::Continue(())
                })
            };

            let results = match outcome {
                Ok(results) => results,
                Err(e) => {
                    if e.is_input_error() {
                        error!("Input table cannot be analyzed: {}", e);
                    } else if let AnalysisError::InvalidLookback { entry_index, .. } = &e {
                        error!(
                            "Lower --max to at most {} to cover the earliest entry",
                            entry_index
                        );
                    }
                    return Err(e.into());
                }
            };
            info!("Analysis complete");

            let summary = summarize(&results);
            let calculator = MetricsCalculator::new();
            let stats: Vec<_> = results.iter().map(|r| calculator.calculate(r)).collect();

            print!(
                "{}",
                report::render_analysis(&results, summary.as_ref(), &stats)
            );

            if let Some(path) = json {
                let sweep_report = SweepReport::new(
                    file.display().to_string(),
                    analyzer.config().tick_offset,
                    results,
                    summary,
                );
                std::fs::write(&path, sweep_report.to_json()?)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!("Report written to {}", path.display());
            }
        }
    }

    Ok(())
}
