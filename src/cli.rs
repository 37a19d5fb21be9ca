//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, Level};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::{
    build_data_config, build_engine_config, build_strategies, DataConfig,
};
use crate::domain::error::{RankfolioError, Result};
use crate::domain::research::{run_research, EngineConfig, ResearchReport};
use crate::domain::strategy::StrategyDefinition;
use crate::domain::universe::load_universe;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "rankfolio",
    about = "Signal research, strategy ranking and portfolio allocation"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the full research pipeline
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long)]
        verbose: bool,
    },
    /// Validate a research configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List instruments available in a data directory
    ListSymbols {
        #[arg(short, long)]
        data: PathBuf,
    },
}

/// Everything a run needs, parsed and validated.
#[derive(Debug, Clone)]
pub struct ResearchPlan {
    pub data: DataConfig,
    pub engine: EngineConfig,
    pub strategies: Vec<StrategyDefinition>,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            output,
            verbose,
        } => {
            init_logging(verbose);
            run_pipeline(&config, output.as_deref())
        }
        Command::Validate { config } => {
            init_logging(false);
            run_validate(&config)
        }
        Command::ListSymbols { data } => run_list_symbols(&data),
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    // A subscriber may already be installed when embedded or under test.
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .try_init();
}

fn fail(err: &RankfolioError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(err)
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter> {
    FileConfigAdapter::from_file(path).map_err(|e| RankfolioError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

pub fn build_plan(config: &dyn ConfigPort) -> Result<ResearchPlan> {
    Ok(ResearchPlan {
        data: build_data_config(config)?,
        engine: build_engine_config(config)?,
        strategies: build_strategies(config)?,
    })
}

/// Loads the universe and runs the research over it.
pub fn execute_plan(data_port: &dyn DataPort, plan: &ResearchPlan) -> Result<ResearchReport> {
    let universe = load_universe(
        data_port,
        &plan.data.instruments,
        plan.data.start_date,
        plan.data.end_date,
        plan.engine.min_bars(),
    )?;

    info!(
        instruments = universe.count(),
        skipped = universe.skipped.len(),
        strategies = plan.strategies.len(),
        "running research"
    );
    Ok(run_research(&universe.bars, &plan.strategies, &plan.engine))
}

fn run_pipeline(config_path: &Path, output_path: Option<&Path>) -> ExitCode {
    info!(path = %config_path.display(), "loading config");
    let plan = match load_config(config_path).and_then(|c| build_plan(&c)) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };

    let data_port = CsvAdapter::new(plan.data.directory.clone());
    let report = match execute_plan(&data_port, &plan) {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };

    print_summary(&report);

    let reporter = CsvReportAdapter::new();
    let written = match output_path {
        Some(path) => reporter.write(&report, path).map(|()| {
            info!(path = %path.display(), "report written");
        }),
        None => reporter.render(&report).map(|csv| print!("{csv}")),
    };
    if let Err(e) = written {
        return fail(&e);
    }

    match &report.portfolio {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => fail(e),
    }
}

fn print_summary(report: &ResearchReport) {
    eprintln!("\n=== Selections ===");
    for (code, outcome) in &report.selections {
        match outcome {
            Ok(best) => {
                let m = &best.result.metrics;
                eprintln!(
                    "  {}: {} (score {:.3}, return {:.2}%, sharpe {:.2}, {} trades)",
                    code,
                    best.strategy_id,
                    best.rank_score,
                    m.total_return * 100.0,
                    m.sharpe_ratio,
                    m.trade_count,
                );
            }
            Err(e) => eprintln!("  {code}: skipped ({e})"),
        }
    }

    if let Ok(portfolio) = &report.portfolio {
        eprintln!("\n=== Portfolio ({}) ===", portfolio.method);
        for (code, weight) in &portfolio.weights {
            eprintln!("  {}: {:.2}%", code, weight * 100.0);
        }
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let plan = match load_config(config_path).and_then(|c| build_plan(&c)) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };

    eprintln!("\nInstruments: {}", plan.data.instruments.join(", "));

    let mut indicators: Vec<String> = plan
        .engine
        .enrichment_plan()
        .indicators
        .iter()
        .map(|i| i.to_string())
        .collect();
    indicators.sort();
    eprintln!("Indicators:  {}", indicators.join(", "));
    eprintln!("Min bars:    {}", plan.engine.min_bars());
    eprintln!("Optimizer:   {}", plan.engine.portfolio.method);

    eprintln!("\nStrategies:");
    for s in &plan.strategies {
        eprintln!(
            "  {}: {} entry {:+.2} exit {:+.2}",
            s.id, s.side, s.entry_threshold, s.exit_threshold
        );
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_list_symbols(data_dir: &Path) -> ExitCode {
    let adapter = CsvAdapter::new(data_dir.to_path_buf());
    let symbols = match adapter.list_symbols() {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    if symbols.is_empty() {
        eprintln!("No symbols found in {}", data_dir.display());
    } else {
        for symbol in &symbols {
            println!("{symbol}");
        }
        eprintln!("{} symbols found", symbols.len());
    }
    ExitCode::SUCCESS
}
