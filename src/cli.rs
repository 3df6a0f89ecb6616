//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::adapters::cached_source::CachedPriceSource;
use crate::adapters::csv_adapter::CsvPriceSource;
use crate::adapters::csv_report_adapter::{default_output_path, CsvReportAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::metrics::{BacktestConfig, TRADING_DAYS_PER_YEAR};
use crate::domain::config_validation::{parse_date, validate_config};
use crate::domain::error::TrendEdgeError;
use crate::domain::params::{validate_windows, BacktestParams};
use crate::domain::pipeline::{run_pipeline, BacktestReport};
use crate::domain::research::{next_day_direction, MIN_ROWS};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::PriceSource;
use crate::ports::report_port::ReportPort;

pub const DEFAULT_SYMBOL: &str = "SPY";
pub const DEFAULT_FAST_WINDOW: usize = 20;
pub const DEFAULT_SLOW_WINDOW: usize = 50;
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_CACHE_TTL_SECS: i64 = 30 * 60;

#[derive(Parser, Debug)]
#[command(name = "trendedge", about = "Moving-average crossover backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest(BacktestArgs),
    /// Validate moving-average window parameters
    Validate {
        #[arg(long)]
        fast: usize,
        #[arg(long)]
        slow: usize,
    },
    /// List symbols available in the data directory
    ListSymbols {
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Show the data range for a symbol
    Info {
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Default, Clone)]
pub struct BacktestArgs {
    #[arg(long)]
    pub symbol: Option<String>,
    #[arg(long)]
    pub fast: Option<usize>,
    #[arg(long)]
    pub slow: Option<usize>,
    /// First date (YYYY-MM-DD); omit for full history
    #[arg(long)]
    pub start: Option<NaiveDate>,
    /// Last date (YYYY-MM-DD); omit for latest
    #[arg(long)]
    pub end: Option<NaiveDate>,
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Number of signal preview rows to print
    #[arg(long, default_value_t = 0)]
    pub preview: usize,
    /// Also run the next-day direction prototype
    #[arg(long)]
    pub research: bool,
}

pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trendedge=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest(args) => run_backtest(&args),
        Command::Validate { fast, slow } => run_validate(fast, slow),
        Command::ListSymbols { data_dir, config } => {
            run_list_symbols(data_dir.as_ref(), config.as_ref())
        }
        Command::Info {
            symbol,
            data_dir,
            config,
        } => run_info(&symbol, data_dir.as_ref(), config.as_ref()),
    }
}

pub fn load_config(path: Option<&PathBuf>) -> Result<FileConfigAdapter, ExitCode> {
    let Some(path) = path else {
        return Ok(FileConfigAdapter::empty());
    };
    info!(path = %path.display(), "loading config");
    let adapter = FileConfigAdapter::from_file(path).map_err(|e| {
        let err = TrendEdgeError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })?;
    validate_config(&adapter).map_err(|e| report_error(&e))?;
    Ok(adapter)
}

fn report_error(err: &TrendEdgeError) -> ExitCode {
    match err {
        TrendEdgeError::InvalidParameters { messages } => {
            for message in messages {
                eprintln!("error: {message}");
            }
        }
        TrendEdgeError::InsufficientData { .. } => {
            eprintln!("warning: {err}");
            eprintln!("warning: not enough data after the chosen start/end to compute both moving averages");
        }
        _ => eprintln!("error: {err}"),
    }
    err.into()
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> BacktestConfig {
    let periods = adapter.get_int("backtest", "periods_per_year", TRADING_DAYS_PER_YEAR as i64);
    BacktestConfig {
        periods_per_year: u32::try_from(periods).unwrap_or(TRADING_DAYS_PER_YEAR),
        risk_free_rate: adapter.get_double("backtest", "risk_free_rate", 0.0),
    }
}

/// Command-line flags win over config values, which win over defaults.
pub fn build_params(
    adapter: &dyn ConfigPort,
    args: &BacktestArgs,
) -> Result<BacktestParams, TrendEdgeError> {
    let symbol = args
        .symbol
        .clone()
        .or_else(|| adapter.get_string("backtest", "symbol"))
        .unwrap_or_else(|| DEFAULT_SYMBOL.to_string());

    let window = |arg: Option<usize>, key: &str, default: usize| {
        arg.unwrap_or_else(|| {
            usize::try_from(adapter.get_int("backtest", key, default as i64)).unwrap_or(default)
        })
    };
    let fast = window(args.fast, "fast_window", DEFAULT_FAST_WINDOW);
    let slow = window(args.slow, "slow_window", DEFAULT_SLOW_WINDOW);

    let start = match args.start {
        Some(d) => Some(d),
        None => parse_date(adapter.get_string("backtest", "start_date").as_deref(), "start_date")?,
    };
    let end = match args.end {
        Some(d) => Some(d),
        None => parse_date(adapter.get_string("backtest", "end_date").as_deref(), "end_date")?,
    };

    Ok(BacktestParams::new(&symbol, fast, slow).with_range(start, end))
}

pub fn resolve_data_dir(flag: Option<&PathBuf>, adapter: &dyn ConfigPort) -> PathBuf {
    flag.cloned()
        .or_else(|| adapter.get_string("data", "csv_dir").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

pub fn resolve_cache_ttl(adapter: &dyn ConfigPort) -> Duration {
    let secs = adapter.get_int("data", "cache_ttl_secs", DEFAULT_CACHE_TTL_SECS);
    Duration::from_secs(u64::try_from(secs).unwrap_or(0))
}

pub fn resolve_output_path(
    flag: Option<&PathBuf>,
    adapter: &dyn ConfigPort,
    report: &BacktestReport,
) -> PathBuf {
    match flag {
        Some(p) => p.clone(),
        None => {
            let dir = adapter
                .get_string("report", "output_dir")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            default_output_path(&dir, report)
        }
    }
}

pub fn fmt_pct(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.2}%", v * 100.0),
        _ => "n/a".to_string(),
    }
}

pub fn fmt_ratio(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.2}", v),
        _ => "n/a".to_string(),
    }
}

fn print_summary(report: &BacktestReport) {
    let m = &report.metrics;
    eprintln!(
        "\n=== {} MA {}/{} ===",
        report.params.symbol, report.params.fast_window, report.params.slow_window
    );
    eprintln!("CAGR (Strategy):    {}", fmt_pct(m.cagr_strategy));
    eprintln!("CAGR (Buy & Hold):  {}", fmt_pct(m.cagr_buyhold));
    eprintln!("Sharpe:             {}", fmt_ratio(m.sharpe_strategy));
    eprintln!("Sharpe (Buy & Hold):{}", fmt_ratio(m.sharpe_buyhold));
    eprintln!("Max Drawdown:       {}", fmt_pct(m.max_drawdown_strategy));
    eprintln!("Total Return:       {}", fmt_pct(m.total_return_strategy));
    eprintln!("Exposure:           {}", fmt_pct(m.exposure));
}

fn print_preview(report: &BacktestReport, limit: usize) {
    let rows = report.signal_preview(limit);
    if rows.is_empty() {
        return;
    }
    eprintln!(
        "\n{:<12} {:>12} {:>12} {:>12} {:>6}",
        "date",
        "price",
        format!("MA{}", report.params.fast_window),
        format!("MA{}", report.params.slow_window),
        "signal"
    );
    for row in rows {
        eprintln!(
            "{:<12} {:>12.4} {:>12.4} {:>12.4} {:>6}",
            row.date,
            row.price,
            row.fast_ma,
            row.slow_ma,
            row.signal.as_i32()
        );
    }
}

fn print_research(report: &BacktestReport) {
    let params = &report.params;
    match next_day_direction(&report.prices, params.fast_window, params.slow_window) {
        Some(result) => {
            eprintln!("\n=== Research (next-day direction) ===");
            eprintln!(
                "Prototype accuracy (holdout): {:.1}% ({} train / {} test rows)",
                result.accuracy * 100.0,
                result.train_rows,
                result.test_rows
            );
            if let Some((date, prob)) = result.probabilities.last() {
                eprintln!("P(up next day) on {}: {:.3}", date, prob);
            }
        }
        None => eprintln!(
            "\nResearch: not enough data for the demo model yet (need more than {} rows)",
            MIN_ROWS
        ),
    }
}

fn run_backtest(args: &BacktestArgs) -> ExitCode {
    let adapter = match load_config(args.config.as_ref()) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let params = match build_params(&adapter, args) {
        Ok(p) => p,
        Err(e) => return report_error(&e),
    };
    if let Err(e) = params.validate() {
        return report_error(&e);
    }
    let bt_config = build_backtest_config(&adapter);

    let data_dir = resolve_data_dir(args.data_dir.as_ref(), &adapter);
    let source = CachedPriceSource::new(CsvPriceSource::new(data_dir), resolve_cache_ttl(&adapter));

    run_backtest_pipeline(&source, &adapter, &params, &bt_config, args)
}

pub fn run_backtest_pipeline(
    source: &dyn PriceSource,
    adapter: &dyn ConfigPort,
    params: &BacktestParams,
    bt_config: &BacktestConfig,
    args: &BacktestArgs,
) -> ExitCode {
    let report = match run_pipeline(source, params, bt_config) {
        Ok(r) => r,
        Err(e) => return report_error(&e),
    };

    print_summary(&report);
    if args.preview > 0 {
        print_preview(&report, args.preview);
    }
    if args.research {
        print_research(&report);
    }

    let output = resolve_output_path(args.output.as_ref(), adapter, &report);
    match CsvReportAdapter.write(&report, &output) {
        Ok(()) => {
            eprintln!("\nResults written to: {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => report_error(&e),
    }
}

fn run_validate(fast: usize, slow: usize) -> ExitCode {
    let messages = validate_windows(fast, slow);
    if messages.is_empty() {
        eprintln!("Parameters are valid: fast={} slow={}", fast, slow);
        return ExitCode::SUCCESS;
    }
    report_error(&TrendEdgeError::InvalidParameters { messages })
}

fn run_list_symbols(data_dir: Option<&PathBuf>, config_path: Option<&PathBuf>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let data_dir = resolve_data_dir(data_dir, &adapter);
    let source = CsvPriceSource::new(data_dir.clone());

    let symbols = match source.list_symbols() {
        Ok(s) => s,
        Err(e) => return report_error(&e),
    };

    if symbols.is_empty() {
        eprintln!("No symbols found in {}", data_dir.display());
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    ExitCode::SUCCESS
}

pub fn describe_range(source: &dyn PriceSource, symbol: &str) -> Result<String, TrendEdgeError> {
    let prices = source.fetch_prices(symbol, None, None)?;
    match (prices.first_date(), prices.last_date()) {
        (Some(first), Some(last)) => Ok(format!(
            "{}: {} bars, {} to {}",
            symbol,
            prices.len(),
            first,
            last
        )),
        _ => Err(TrendEdgeError::NoData {
            symbol: symbol.to_string(),
            reason: "empty price series".into(),
        }),
    }
}

fn run_info(symbol: &str, data_dir: Option<&PathBuf>, config_path: Option<&PathBuf>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let source = CsvPriceSource::new(resolve_data_dir(data_dir, &adapter));
    let symbol = crate::domain::params::normalize_symbol(symbol);

    match describe_range(&source, &symbol) {
        Ok(line) => {
            println!("{}", line);
            ExitCode::SUCCESS
        }
        Err(e) => report_error(&e),
    }
}
