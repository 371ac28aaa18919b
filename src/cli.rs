//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use crate::adapters::csv_adapter::CsvCandleAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_record_store::JsonRecordStore;
use crate::adapters::system_clock::SystemClock;
use crate::domain::analysis::{run_technical_analysis, technical_sentiment};
use crate::domain::backtest::{BacktestConfig, BacktestResult, run_backtest};
use crate::domain::batch::run_batch;
use crate::domain::catalog;
use crate::domain::config_validation::{
    ALL_STRATEGIES, backtest_config_from, cache_ttl_from, signal_config_from, strategies_from,
    symbols_from, validate_backtest_config, validate_data_config, validate_signal_config,
};
use crate::domain::error::CallerError;
use crate::domain::record::BacktestRecord;
use crate::domain::scanner::{ScanReport, SignalScanner};
use crate::domain::signal::MIN_CANDLES;
use crate::domain::strategy::Strategy;
use crate::domain::timeframe::Timeframe;
use crate::domain::token::{Token, parse_symbols};
use crate::domain::win_rates::{RsiPriorWinRates, WinRateLedger};
use crate::ports::candle_port::CandlePort;
use crate::ports::config_port::ConfigPort;
use crate::ports::record_port::RecordPort;
use crate::ports::win_rate_port::WinRateProvider;

#[derive(Parser, Debug)]
#[command(
    name = "tradecaller",
    about = "Technical-analysis trade signals and strategy backtests for crypto OHLCV data"
)]
pub struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest catalog strategies over CSV candles
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated symbols, overriding [backtest] symbol(s)
        #[arg(long)]
        symbol: Option<String>,
        /// Catalog strategy name or "all", overriding [backtest] strategy
        #[arg(short, long)]
        strategy: Option<String>,
        /// Directory for JSON backtest records, overriding [records] directory
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print results as JSON records
        #[arg(long)]
        json: bool,
    },
    /// Run the technical analysis for one symbol
    Analyze {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
        #[arg(short, long, default_value = "4H")]
        timeframe: Timeframe,
        #[arg(long)]
        json: bool,
    },
    /// Generate trade signals for one or more symbols
    Signal {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated symbols; defaults to every 4H file in [data] directory
        #[arg(long)]
        symbols: Option<String>,
        /// Score history from catalog backtests instead of RSI priors
        #[arg(long)]
        learn: bool,
        /// Skip the historical win-rate factor
        #[arg(long, conflicts_with = "learn")]
        no_history: bool,
        #[arg(long)]
        json: bool,
    },
    /// List the built-in strategies
    Strategies,
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    crate::logging::init_logging(cli.log_json);

    let result = match cli.command {
        Command::Backtest {
            config,
            symbol,
            strategy,
            output,
            json,
        } => run_backtest_command(
            &config,
            symbol.as_deref(),
            strategy.as_deref(),
            output.as_deref(),
            json,
        ),
        Command::Analyze {
            config,
            symbol,
            timeframe,
            json,
        } => run_analyze(&config, &symbol, timeframe, json),
        Command::Signal {
            config,
            symbols,
            learn,
            no_history,
            json,
        } => run_signal(&config, symbols.as_deref(), learn, no_history, json),
        Command::Strategies => {
            run_strategies();
            Ok(())
        }
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            if let CallerError::UnknownStrategy(_) = e {
                eprintln!("available strategies: {}", catalog::names().join(", "));
            }
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, CallerError> {
    tracing::debug!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

fn candle_port(config: &dyn ConfigPort) -> Result<CsvCandleAdapter, CallerError> {
    validate_data_config(config)?;
    let dir = config
        .get_string("data", "directory")
        .ok_or_else(|| CallerError::ConfigMissing {
            section: "data".into(),
            key: "directory".into(),
        })?;
    Ok(CsvCandleAdapter::new(dir.trim()))
}

/// Symbols from the command line when given, else from the config.
pub fn resolve_symbols(
    symbol_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<Vec<String>, CallerError> {
    match symbol_override {
        Some(list) => parse_symbols(list).map_err(|e| CallerError::ConfigInvalid {
            section: "cli".into(),
            key: "symbol".into(),
            reason: e.to_string(),
        }),
        None => symbols_from(config),
    }
}

fn resolve_strategies(
    strategy_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<Vec<Strategy>, CallerError> {
    match strategy_override {
        Some(name) if name.trim().eq_ignore_ascii_case(ALL_STRATEGIES) => Ok(catalog::all()),
        Some(name) => catalog::find(name).map(|s| vec![s]),
        None => strategies_from(config),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, CallerError> {
    serde_json::to_string_pretty(value).map_err(|e| CallerError::Record {
        reason: format!("encode output: {e}"),
    })
}

fn run_backtest_command(
    config_path: &Path,
    symbol_override: Option<&str>,
    strategy_override: Option<&str>,
    output: Option<&Path>,
    json: bool,
) -> Result<(), CallerError> {
    let config = load_config(config_path)?;
    let port = candle_port(&config)?;
    let base = backtest_config_from(&config)?;
    let symbols = resolve_symbols(symbol_override, &config)?;
    let strategies = resolve_strategies(strategy_override, &config)?;
    let clock = SystemClock;

    let results: Vec<BacktestResult> = match (symbols.as_slice(), strategies.as_slice()) {
        ([symbol], [strategy]) => {
            let candles = port.fetch_candles(symbol, base.timeframe)?;
            let mut single = base.clone();
            single.symbol = symbol.clone();
            vec![run_backtest(&single, strategy, &candles, &clock)?]
        }
        _ => {
            let report = run_batch(&base, &symbols, &strategies, &port, &clock);
            for failure in &report.failures {
                eprintln!(
                    "warning: {} / {} failed: {}",
                    failure.symbol, failure.strategy, failure.error
                );
            }
            if report.results.is_empty() {
                return Err(CallerError::DataSource {
                    reason: format!("all {} backtest runs failed", report.failures.len()),
                });
            }
            report.results
        }
    };

    let records: Vec<BacktestRecord> = results.iter().map(BacktestRecord::from_result).collect();
    if json {
        println!("{}", to_json(&records)?);
    } else {
        for result in &results {
            print_result(result);
        }
    }

    let store = match output {
        Some(dir) => Some(JsonRecordStore::new(dir)),
        None if config.get_string("records", "directory").is_some() => {
            Some(JsonRecordStore::from_config(&config)?)
        }
        None => None,
    };
    if let Some(store) = store {
        for record in &records {
            store.save(record)?;
        }
        eprintln!("Saved {} backtest record(s)", records.len());
    }
    Ok(())
}

fn print_result(result: &BacktestResult) {
    let m = &result.metrics;
    println!(
        "{} {} | {}",
        result.config.symbol, result.config.timeframe, result.strategy_name
    );
    println!(
        "  trades {:>4}  win rate {:>6.2}%  return {:>+12.2} ({:+.2}%)",
        m.total_trades, m.win_rate, m.total_return, m.total_return_percent
    );
    let profit_factor = if m.profit_factor.is_finite() {
        format!("{:.2}", m.profit_factor)
    } else {
        "inf".to_string()
    };
    println!(
        "  max drawdown {:.2}%  profit factor {}  sharpe {:.2}  sortino {:.2}",
        m.max_drawdown_percent, profit_factor, m.sharpe_ratio, m.sortino_ratio
    );
    println!("  final equity {:.2}", result.final_equity());
    for recommendation in &result.analysis.recommendations {
        println!("  - {recommendation}");
    }
}

fn run_analyze(
    config_path: &Path,
    symbol: &str,
    timeframe: Timeframe,
    json: bool,
) -> Result<(), CallerError> {
    let config = load_config(config_path)?;
    let port = candle_port(&config)?;
    let candles = port.fetch_candles(symbol, timeframe)?;
    if candles.len() < MIN_CANDLES {
        return Err(CallerError::InsufficientData {
            symbol: symbol.to_ascii_uppercase(),
            timeframe: timeframe.to_string(),
            candles: candles.len(),
            minimum: MIN_CANDLES,
        });
    }

    let report = run_technical_analysis(&candles);
    if json {
        println!("{}", to_json(&report.analysis)?);
    } else {
        println!("{} {}", symbol.to_ascii_uppercase(), timeframe);
        println!("{}", report.summary);
        println!(
            "Technical sentiment: {:+.1}",
            technical_sentiment(&report.analysis)
        );
    }
    Ok(())
}

fn run_signal(
    config_path: &Path,
    symbols: Option<&str>,
    learn: bool,
    no_history: bool,
    json: bool,
) -> Result<(), CallerError> {
    let config = load_config(config_path)?;
    let port = candle_port(&config)?;
    let signal_config = signal_config_from(&config)?;

    let symbols = match symbols {
        Some(list) => resolve_symbols(Some(list), &config)?,
        None => port.list_symbols(Timeframe::FourHours)?,
    };
    let tokens: Vec<Token> = symbols.iter().map(|s| Token::new(s.as_str(), "")).collect();

    let ledger = learn.then(|| learn_win_rates(&symbols, &port));
    let priors = RsiPriorWinRates;
    let provider: Option<&dyn WinRateProvider> = match (&ledger, no_history) {
        (_, true) => None,
        (Some(ledger), false) => Some(ledger),
        (None, false) => Some(&priors),
    };

    let mut scanner = SignalScanner::new(
        &port,
        Arc::new(SystemClock),
        cache_ttl_from(&config),
        signal_config,
    );
    if let Some(provider) = provider {
        scanner = scanner.with_win_rates(provider);
    }
    let report = scanner.scan(&tokens);

    if json {
        println!("{}", to_json(&report.signals)?);
    } else {
        print_scan(&report);
    }
    Ok(())
}

/// Backtest the whole catalog on 4H candles and tally its trades.
fn learn_win_rates(symbols: &[String], port: &dyn CandlePort) -> WinRateLedger {
    let base = BacktestConfig::new("", Timeframe::FourHours);
    let report = run_batch(&base, symbols, &catalog::all(), port, &SystemClock);
    let ledger = report.win_rate_ledger();
    tracing::info!(setups = ledger.len(), "learned historical win rates");
    ledger
}

fn print_scan(report: &ScanReport) {
    for signal in &report.signals {
        let targets: Vec<String> = signal.targets.iter().map(|t| format!("{t}")).collect();
        println!(
            "{:<5} {:<8} entry {}  stop {}  targets [{}]  confidence {:.1}%  risk {}  ({})",
            signal.action,
            signal.token.symbol,
            signal.entry,
            signal.stop_loss,
            targets.join(", "),
            signal.confidence,
            signal.risk_level,
            signal.timeframe
        );
        println!("      {}", signal.reasoning.technical.trim());
    }
    for held in &report.held {
        println!("HOLD  {:<8} {}", held.symbol, held.reason);
    }
    for avoided in &report.avoided {
        println!("AVOID {:<8} {}", avoided.symbol, avoided.reason);
    }
    for skipped in &report.skipped {
        eprintln!("warning: skipped {} ({})", skipped.symbol, skipped.reason);
    }
}

fn run_strategies() {
    for strategy in catalog::all() {
        println!("{:<22} {}", strategy.name, strategy.description);
    }
}

fn run_validate(config_path: &Path) -> Result<(), CallerError> {
    let config = load_config(config_path)?;
    validate_data_config(&config)?;
    validate_backtest_config(&config)?;
    validate_signal_config(&config)?;
    println!("{}: OK", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn parses_global_log_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["tradecaller", "strategies", "--log-json"]).unwrap();
        assert!(cli.log_json);
        assert!(matches!(cli.command, Command::Strategies));
    }

    #[test]
    fn parses_analyze_timeframe() {
        let cli = Cli::try_parse_from([
            "tradecaller",
            "analyze",
            "-c",
            "app.ini",
            "--symbol",
            "SOL",
            "-t",
            "1d",
        ])
        .unwrap();
        match cli.command {
            Command::Analyze { timeframe, .. } => assert_eq!(timeframe, Timeframe::OneDay),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn learn_and_no_history_conflict() {
        let result = Cli::try_parse_from([
            "tradecaller",
            "signal",
            "-c",
            "app.ini",
            "--learn",
            "--no-history",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn symbol_override_wins() {
        let cfg = config("[backtest]\nsymbol = SOL\n");
        assert_eq!(resolve_symbols(Some("jup,bonk"), &cfg).unwrap(), vec!["JUP", "BONK"]);
        assert_eq!(resolve_symbols(None, &cfg).unwrap(), vec!["SOL"]);
    }

    #[test]
    fn strategy_override_wins() {
        let cfg = config("[backtest]\nsymbol = SOL\n");
        assert_eq!(resolve_strategies(Some("ALL"), &cfg).unwrap().len(), 8);
        assert_eq!(
            resolve_strategies(Some("aggressive rsi"), &cfg).unwrap()[0].name,
            "Aggressive RSI"
        );
        assert!(matches!(
            resolve_strategies(Some("nope"), &cfg),
            Err(CallerError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn missing_data_directory_is_config_error() {
        assert!(matches!(
            candle_port(&config("[backtest]\nsymbol = SOL\n")),
            Err(CallerError::ConfigMissing { key, .. }) if key == "directory"
        ));
    }
}
