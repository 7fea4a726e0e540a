//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{BacktestConfig, StrategyRun, run_strategy};
use crate::domain::cadence::Cadence;
use crate::domain::config_validation::{
    read_date, read_double, read_optional_double, read_usize, validate_all,
};
use crate::domain::cost::TradeCost;
use crate::domain::error::BalanceBotError;
use crate::domain::liquidity::TierSlippage;
use crate::domain::metrics::Metrics;
use crate::domain::strategy::{
    ConstantMixParams, DriftThreshold, DynamicThresholdParams, StrategyKind, StrategyParams,
};
use crate::domain::universe::{LoadedUniverse, load_universe, parse_symbols};
use crate::domain::wallet::{Holdings, Wallet, WalletItem, market_symbol};
use crate::domain::weights::{Weights, parse_symbol_values, resolve_targets};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

pub const DEFAULT_QUOTE: &str = "EUR";

#[derive(Parser, Debug)]
#[command(name = "balancebot", about = "Portfolio rebalancing backtester")]
pub struct Cli {
    /// Verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Override [strategy] name
        #[arg(short, long)]
        strategy: Option<String>,
        /// Write the history table to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range for symbol(s)
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
    },
}

impl Cli {
    pub fn init_logging(&self) {
        let level = match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };

        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(false)
            .with_writer(std::io::stderr)
            .finish();

        if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
            eprintln!("warning: failed to install logger: {e}");
        }
    }
}

pub fn run(cli: Cli) -> ExitCode {
    cli.init_logging();
    match cli.command {
        Command::Backtest {
            config,
            strategy,
            output,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config, strategy.as_deref())
            } else {
                run_backtest(&config, strategy.as_deref(), output.as_deref())
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::Info { config, symbol } => run_info(&config, symbol.as_deref()),
    }
}

fn fail(err: BalanceBotError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(fail)
}

/// Where to read prices from and which market symbols to load.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub data_dir: PathBuf,
    pub quote: String,
    /// Market symbols, e.g. `BTCEUR`.
    pub symbols: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

pub fn quote_currency(config: &dyn ConfigPort) -> String {
    config
        .get_string("backtest", "quote")
        .map(|q| q.trim().to_uppercase())
        .filter(|q| !q.is_empty())
        .unwrap_or_else(|| DEFAULT_QUOTE.to_string())
}

pub fn build_run_settings(config: &dyn ConfigPort) -> Result<RunSettings, BalanceBotError> {
    let data_dir = config
        .get_string("backtest", "data_dir")
        .ok_or_else(|| BalanceBotError::ConfigMissing {
            section: "backtest".into(),
            key: "data_dir".into(),
        })?;
    let quote = quote_currency(config);
    let symbols = resolve_symbols(None, config, &quote)?;

    Ok(RunSettings {
        data_dir: PathBuf::from(data_dir.trim()),
        symbols,
        start_date: read_date(config, "backtest", "start_date")?.unwrap_or(NaiveDate::MIN),
        end_date: read_date(config, "backtest", "end_date")?.unwrap_or(NaiveDate::MAX),
        quote,
    })
}

/// Symbols from the override (one symbol) or `[backtest] symbols`,
/// suffixed with the quote currency.
pub fn resolve_symbols(
    symbol_override: Option<&str>,
    config: &dyn ConfigPort,
    quote: &str,
) -> Result<Vec<String>, BalanceBotError> {
    let raw = match symbol_override {
        Some(s) => s.to_string(),
        None => config
            .get_string("backtest", "symbols")
            .ok_or_else(|| BalanceBotError::ConfigMissing {
                section: "backtest".into(),
                key: "symbols".into(),
            })?,
    };
    Ok(parse_symbols(&raw)?
        .iter()
        .map(|s| market_symbol(s, quote))
        .collect())
}

/// Cost model, tier slippage and fee asset for a universe of `assets`.
pub fn build_backtest_config(
    config: &dyn ConfigPort,
    assets: &[String],
) -> Result<BacktestConfig, BalanceBotError> {
    let quote = quote_currency(config);
    let trade_cost = TradeCost::new(
        read_double(config, "backtest", "fee_rate", 0.001)?,
        read_double(config, "backtest", "fixed_fee", 1.0)?,
        read_double(config, "backtest", "slippage", 0.0002)?,
    )?;

    let majors = read_optional_double(config, "slippage", "majors")?;
    let high_liq = read_optional_double(config, "slippage", "high_liq")?;
    let others = read_optional_double(config, "slippage", "others")?;
    let slippage_map = if majors.is_some() || high_liq.is_some() || others.is_some() {
        let fallback = trade_cost.slippage;
        let tiers = TierSlippage::new(
            majors.unwrap_or(fallback),
            high_liq.unwrap_or(fallback),
            others.unwrap_or(fallback),
        )?;
        Some(tiers.slippage_map(assets))
    } else {
        None
    };

    let fee_asset = config
        .get_string("backtest", "fee_asset")
        .filter(|s| !s.trim().is_empty())
        .map(|s| market_symbol(&s, &quote));

    Ok(BacktestConfig {
        trade_cost,
        slippage_map,
        fee_asset,
        risk_free_rate: read_double(config, "backtest", "risk_free_rate", 0.0)?,
        verbose: config.get_bool("strategy", "verbose", false),
    })
}

fn market_weights(raw: &Weights, quote: &str) -> Weights {
    let mut out = Weights::new();
    for (sym, w) in raw {
        *out.entry(market_symbol(sym, quote)).or_insert(0.0) += w;
    }
    out
}

fn target_weights(config: &dyn ConfigPort, quote: &str) -> Result<Weights, BalanceBotError> {
    let raw = config
        .get_string("strategy", "weights")
        .ok_or_else(|| BalanceBotError::ConfigMissing {
            section: "strategy".into(),
            key: "weights".into(),
        })?;
    Ok(market_weights(&parse_symbol_values(&raw, "weights")?, quote))
}

pub fn build_strategy_params(
    config: &dyn ConfigPort,
    name_override: Option<&str>,
) -> Result<StrategyParams, BalanceBotError> {
    let quote = quote_currency(config);
    let name = match name_override {
        Some(n) => n.to_string(),
        None => config
            .get_string("strategy", "name")
            .ok_or_else(|| BalanceBotError::ConfigMissing {
                section: "strategy".into(),
                key: "name".into(),
            })?,
    };

    let params = match name.parse::<StrategyKind>()? {
        StrategyKind::Hold => StrategyParams::Hold,
        StrategyKind::ConstantMix => StrategyParams::ConstantMix(ConstantMixParams {
            target_weights: target_weights(config, &quote)?,
            rebalance: config
                .get_string("strategy", "rebalance")
                .map(|r| r.parse::<Cadence>())
                .transpose()?
                .unwrap_or(Cadence::Monthly),
            drift_threshold: DriftThreshold::parse(
                config.get_string("strategy", "drift_threshold").as_deref(),
            )?,
            compare_cadences: config.get_bool("strategy", "compare_cadences", true),
        }),
        StrategyKind::DynamicThreshold => {
            let defaults = DynamicThresholdParams::default();
            StrategyParams::DynamicThreshold(DynamicThresholdParams {
                target_weights: target_weights(config, &quote)?,
                vol_window: read_usize(config, "strategy", "vol_window", defaults.vol_window)?,
                k: read_double(config, "strategy", "k", defaults.k)?,
                min_th: read_double(config, "strategy", "min_th", defaults.min_th)?,
                max_th: read_double(config, "strategy", "max_th", defaults.max_th)?,
                stable_assets: config
                    .get_list("strategy", "stable_assets")
                    .map(|list| list.iter().map(|s| s.to_uppercase()).collect())
                    .unwrap_or(defaults.stable_assets),
                stable_threshold: read_double(
                    config,
                    "strategy",
                    "stable_threshold",
                    defaults.stable_threshold,
                )?,
                rebal_frac: read_double(config, "strategy", "rebal_frac", defaults.rebal_frac)?,
                cooldown_days: read_usize(
                    config,
                    "strategy",
                    "cooldown_days",
                    defaults.cooldown_days,
                )?,
            })
        }
    };
    params.validate()?;
    Ok(params)
}

/// `[wallet] holdings` as market-symbol holdings.
pub fn build_holdings(config: &dyn ConfigPort) -> Result<Holdings, BalanceBotError> {
    let raw = config
        .get_string("wallet", "holdings")
        .ok_or_else(|| BalanceBotError::ConfigMissing {
            section: "wallet".into(),
            key: "holdings".into(),
        })?;
    let items = parse_symbol_values(&raw, "holdings")?
        .into_iter()
        .map(|(symbol, amount)| WalletItem { symbol, amount })
        .collect();
    Wallet::new(items).to_holdings(&quote_currency(config))
}

fn load_prices(
    data_port: &dyn DataPort,
    settings: &RunSettings,
) -> Result<LoadedUniverse, BalanceBotError> {
    let loaded = load_universe(
        data_port,
        &settings.symbols,
        settings.start_date,
        settings.end_date,
    )?;
    for skipped in &loaded.skipped {
        eprintln!("warning: skipping {} ({:?})", skipped.symbol, skipped.reason);
    }
    Ok(loaded)
}

/// Load prices, build the strategy, run it and optionally write the
/// history CSV.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    config: &dyn ConfigPort,
    strategy_override: Option<&str>,
    output_path: Option<&Path>,
) -> Result<StrategyRun, BalanceBotError> {
    let settings = build_run_settings(config)?;
    let params = build_strategy_params(config, strategy_override)?;
    let holdings = build_holdings(config)?;

    let loaded = load_prices(data_port, &settings)?;
    let prices = &loaded.prices;
    let bt_config = build_backtest_config(config, prices.assets())?;

    eprintln!(
        "Running {} backtest: {} assets, {} rows",
        params.kind(),
        prices.width(),
        prices.len()
    );
    let run = run_strategy(prices, &holdings, &params, &bt_config)?;

    if let Some(path) = output_path {
        let path_str = path.display().to_string();
        let report = CsvReportAdapter::new();
        match &run.comparison {
            Some(comparison) => report.write_comparison(comparison, &path_str)?,
            None => report.write(&run.result, &path_str)?,
        }
        eprintln!("History written to: {path_str}");
    }
    Ok(run)
}

pub fn print_metrics(metrics: &Metrics) {
    eprintln!("Initial Value:    {:.2}", metrics.initial_value);
    eprintln!("Final Value:      {:.2}", metrics.final_value);
    eprintln!("Total Return:     {:.2}%", metrics.total_return * 100.0);
    eprintln!(
        "Annualized:       {:.2}%",
        metrics.annualized_return * 100.0
    );
    eprintln!("Volatility:       {:.2}%", metrics.volatility * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", metrics.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.2}", metrics.sortino_ratio);
    eprintln!("Max Drawdown:     -{:.1}%", metrics.max_drawdown * 100.0);
    eprintln!("Drawdown Days:    {}", metrics.max_drawdown_duration);
    eprintln!("Rebalances:       {}", metrics.rebalance_count);
    eprintln!("Total Cost:       {:.2}", metrics.total_cost);
}

pub fn print_summary(run: &StrategyRun) {
    if let Some(comparison) = &run.comparison {
        eprintln!("\n=== Cadence Comparison ===");
        eprintln!(
            "Weekly:           {:.2}%",
            comparison.weekly.metrics.annualized_return * 100.0
        );
        eprintln!(
            "Monthly:          {:.2}%",
            comparison.monthly.metrics.annualized_return * 100.0
        );
        eprintln!("Selected:         {}", comparison.best);
    }

    eprintln!("\n=== Results ({}) ===", run.result.strategy);
    print_metrics(&run.result.metrics);

    if !run.result.warnings.is_empty() {
        eprintln!("\n{} warning(s) during the run", run.result.warnings.len());
    }
}

fn run_backtest(
    config_path: &Path,
    strategy_override: Option<&str>,
    output_path: Option<&Path>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_all(&adapter) {
        return fail(e);
    }

    let data_dir = adapter
        .get_string("backtest", "data_dir")
        .unwrap_or_default();
    let data_port = CsvAdapter::new(PathBuf::from(data_dir.trim()));

    match run_backtest_pipeline(&data_port, &adapter, strategy_override, output_path) {
        Ok(run) => {
            print_summary(&run);
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

pub fn run_dry_run(config_path: &Path, strategy_override: Option<&str>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_all(&adapter) {
        return fail(e);
    }

    let (settings, params, holdings) = match (
        build_run_settings(&adapter),
        build_strategy_params(&adapter, strategy_override),
        build_holdings(&adapter),
    ) {
        (Ok(s), Ok(p), Ok(h)) => (s, p, h),
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => return fail(e),
    };

    eprintln!("Config validated successfully");
    eprintln!("\nUniverse ({}):", settings.quote);
    eprintln!("  symbols: {}", settings.symbols.join(", "));
    eprintln!("\nWallet:");
    for (symbol, qty) in &holdings {
        eprintln!("  {symbol}: {qty}");
    }

    let data_port = CsvAdapter::new(settings.data_dir.clone());
    let loaded = match load_prices(&data_port, &settings) {
        Ok(l) => l,
        Err(e) => return fail(e),
    };
    eprintln!(
        "\nPrices: {} rows for {}",
        loaded.prices.len(),
        loaded.prices.assets().join(", ")
    );

    eprintln!("\nStrategy: {}", params.kind());
    let raw_targets = match &params {
        StrategyParams::Hold => None,
        StrategyParams::ConstantMix(cm) => {
            eprintln!("  rebalance: {}", cm.rebalance);
            eprintln!("  drift_threshold: {:?}", cm.drift_threshold);
            eprintln!("  compare_cadences: {}", cm.compare_cadences);
            Some(&cm.target_weights)
        }
        StrategyParams::DynamicThreshold(dt) => {
            eprintln!(
                "  vol_window: {}, k: {}, min_th: {}, max_th: {}",
                dt.vol_window, dt.k, dt.min_th, dt.max_th
            );
            eprintln!(
                "  rebal_frac: {}, cooldown_days: {}",
                dt.rebal_frac, dt.cooldown_days
            );
            Some(&dt.target_weights)
        }
    };
    if let Some(raw) = raw_targets {
        eprintln!("\nTarget weights (resolved):");
        for (symbol, w) in resolve_targets(raw, loaded.prices.assets()) {
            eprintln!("  {symbol}: {w:.4}");
        }
    }

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_all(&adapter) {
        return fail(e);
    }
    match build_strategy_params(&adapter, None) {
        Ok(params) => eprintln!("  strategy: {}", params.kind()),
        Err(e) => return fail(e),
    }
    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_info(config_path: &Path, symbol: Option<&str>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let Some(data_dir) = config.get_string("backtest", "data_dir") else {
        return fail(BalanceBotError::ConfigMissing {
            section: "backtest".into(),
            key: "data_dir".into(),
        });
    };
    let adapter = CsvAdapter::new(PathBuf::from(data_dir.trim()));
    let quote = quote_currency(&config);

    let symbols = if symbol.is_some() || config.get_string("backtest", "symbols").is_some() {
        resolve_symbols(symbol, &config, &quote)
    } else {
        adapter.list_symbols()
    };
    let symbols = match symbols {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    for sym in &symbols {
        match adapter.get_data_range(sym) {
            Ok(Some((first, last, rows))) => {
                println!("{sym}: {first} to {last} ({rows} rows)");
            }
            Ok(None) => println!("{sym}: no data"),
            Err(e) => eprintln!("warning: {sym}: {e}"),
        }
    }
    ExitCode::SUCCESS
}
