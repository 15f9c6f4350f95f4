//! CLI definition and dispatch.

use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::clock::{FixedClock, SystemClock};
use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::memory_adapter::MemoryDataAdapter;
use crate::adapters::paper_broker::{CommissionConfig, PaperBroker};
use crate::domain::config::SignalConfig;
use crate::domain::config_validation::{
    parse_invoke_times, parse_optional_date, parse_time, validate_replay_config,
    validate_signal_config, REPLAY, SIGNAL,
};
use crate::domain::engine::{BreakoutEngine, Evaluation, Session, SignalEvent, SkipReason};
use crate::domain::error::PullbackError;
use crate::domain::position::Position;
use crate::domain::runner::StrategyRunner;
use crate::domain::signal::SignalState;
use crate::domain::universe::{parse_codes, validate_universe};
use crate::logging;
use crate::ports::clock_port::ClockPort;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::replay::{self, build_timeline, ReplayConfig, ReplaySummary};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Parser, Debug)]
#[command(name = "pullback", about = "Breakout-and-pullback signal engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay stored daily bars through the engine with a paper broker
    Replay {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        /// First session, YYYY-MM-DD
        #[arg(long)]
        start: Option<String>,
        /// Last session, YYYY-MM-DD
        #[arg(long)]
        end: Option<String>,
    },
    /// Evaluate one symbol at one instant from a fresh state
    Evaluate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
        /// Invocation time, "YYYY-MM-DD HH:MM:SS" (defaults to now)
        #[arg(long)]
        at: Option<String>,
        /// Shares currently held
        #[arg(long, default_value_t = 0)]
        amount: i64,
        /// Available cash (defaults to [replay] initial_cash)
        #[arg(long)]
        cash: Option<f64>,
        /// Treat this date as an unresolved breakout
        #[arg(long)]
        breakout_date: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show stored data range for symbol(s)
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
    },
    /// List symbols with stored bars
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Replay {
            config,
            symbol,
            start,
            end,
        } => run_replay(&config, symbol.as_deref(), start.as_deref(), end.as_deref()),
        Command::Evaluate {
            config,
            symbol,
            at,
            amount,
            cash,
            breakout_date,
        } => run_evaluate(
            &config,
            &symbol,
            at.as_deref(),
            amount,
            cash,
            breakout_date.as_deref(),
        ),
        Command::Validate { config } => run_validate(&config),
        Command::Info { config, symbol } => run_info(&config, symbol.as_deref()),
        Command::ListSymbols { config } => run_list_symbols(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    let adapter = FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })?;

    if let Err(reason) = logging::init_from_config(&adapter) {
        let err = PullbackError::ConfigInvalid {
            section: "log".into(),
            key: "format".into(),
            reason,
        };
        eprintln!("error: {err}");
        return Err(ExitCode::from(&err));
    }

    Ok(adapter)
}

fn fail(err: PullbackError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

/// Validates `[signal]` and builds the engine parameters, defaults filled in.
pub fn build_signal_config(adapter: &dyn ConfigPort) -> Result<SignalConfig, PullbackError> {
    validate_signal_config(adapter)?;
    let d = SignalConfig::default();

    Ok(SignalConfig {
        ma_days: adapter.get_int(SIGNAL, "ma_days", d.ma_days as i64) as usize,
        volume_increase_ratio: adapter.get_double(
            SIGNAL,
            "volume_increase_ratio",
            d.volume_increase_ratio,
        ),
        price_increase_ratio: adapter.get_double(
            SIGNAL,
            "price_increase_ratio",
            d.price_increase_ratio,
        ),
        volume_decrease_ratio: adapter.get_double(
            SIGNAL,
            "volume_decrease_ratio",
            d.volume_decrease_ratio,
        ),
        buy_time: parse_time(
            SIGNAL,
            "buy_time",
            adapter.get_string(SIGNAL, "buy_time").as_deref(),
        )?,
        upper_shadow_ratio: adapter.get_double(
            SIGNAL,
            "upper_shadow_ratio",
            d.upper_shadow_ratio,
        ),
        shadow_volume_ratio: adapter.get_double(
            SIGNAL,
            "shadow_volume_ratio",
            d.shadow_volume_ratio,
        ),
        recent_increase_ratio: adapter.get_double(
            SIGNAL,
            "recent_increase_ratio",
            d.recent_increase_ratio,
        ),
        recent_days: adapter.get_int(SIGNAL, "recent_days", d.recent_days as i64) as usize,
        buy_cash_fraction: adapter.get_double(
            SIGNAL,
            "buy_cash_fraction",
            d.buy_cash_fraction,
        ),
    })
}

pub fn build_replay_config(adapter: &dyn ConfigPort) -> Result<ReplayConfig, PullbackError> {
    validate_replay_config(adapter)?;

    Ok(ReplayConfig {
        data_dir: data_dir(adapter)?,
        symbols: resolve_codes(None, adapter)?,
        start_date: parse_optional_date(
            adapter.get_string(REPLAY, "start_date").as_deref(),
            "start_date",
        )?,
        end_date: parse_optional_date(
            adapter.get_string(REPLAY, "end_date").as_deref(),
            "end_date",
        )?,
        initial_cash: adapter.get_double(REPLAY, "initial_cash", 100_000.0),
        commission: CommissionConfig {
            commission_per_trade: adapter.get_double(REPLAY, "commission_per_trade", 0.0),
            commission_pct: adapter.get_double(REPLAY, "commission_pct", 0.0),
        },
        invoke_times: parse_invoke_times(adapter.get_string(REPLAY, "invoke_times").as_deref())?,
    })
}

pub fn data_dir(adapter: &dyn ConfigPort) -> Result<PathBuf, PullbackError> {
    adapter
        .get_string(REPLAY, "data_dir")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| PullbackError::ConfigMissing {
            section: REPLAY.into(),
            key: "data_dir".into(),
        })
}

/// `--symbol` wins over `[replay] symbols`.
pub fn resolve_codes(
    symbol_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<Vec<String>, PullbackError> {
    let raw = match symbol_override {
        Some(s) => s.to_string(),
        None => config
            .get_string(REPLAY, "symbols")
            .ok_or_else(|| PullbackError::ConfigMissing {
                section: REPLAY.into(),
                key: "symbols".into(),
            })?,
    };

    parse_codes(&raw).map_err(|e| PullbackError::ConfigInvalid {
        section: REPLAY.into(),
        key: "symbols".into(),
        reason: e.to_string(),
    })
}

fn run_replay(
    config_path: &PathBuf,
    symbol: Option<&str>,
    start: Option<&str>,
    end: Option<&str>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let signal = match build_signal_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let mut replay_config = match build_replay_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };

    if symbol.is_some() {
        replay_config.symbols = match resolve_codes(symbol, &adapter) {
            Ok(codes) => codes,
            Err(e) => return fail(e),
        };
    }
    match (
        parse_optional_date(start, "start_date"),
        parse_optional_date(end, "end_date"),
    ) {
        (Ok(s), Ok(e)) => {
            replay_config.start_date = s.or(replay_config.start_date);
            replay_config.end_date = e.or(replay_config.end_date);
        }
        (Err(e), _) | (_, Err(e)) => return fail(e),
    }

    let data = CsvAdapter::new(replay_config.data_dir.clone());
    match run_replay_pipeline(&data, signal, &replay_config) {
        Ok(summary) => {
            print_summary(&replay_config, &summary);
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

/// Validates the universe, builds the timeline and replays it.
pub fn run_replay_pipeline(
    data: &dyn DataPort,
    signal: SignalConfig,
    replay_config: &ReplayConfig,
) -> Result<ReplaySummary, PullbackError> {
    let minimum = signal.window_len();
    eprintln!("Validating {} symbols...", replay_config.symbols.len());
    let validation = validate_universe(data, replay_config.symbols.clone(), minimum)?;
    for skipped in &validation.skipped {
        eprintln!("warning: skipping {} ({:?})", skipped.code, skipped.reason);
    }
    eprintln!(
        "Loading history for {} symbols...",
        validation.universe.count()
    );
    let codes = validation.universe.codes;
    let preloaded = MemoryDataAdapter::preload(data, &codes)?;

    let timeline = build_timeline(
        &preloaded,
        &codes,
        replay_config.start_date,
        replay_config.end_date,
    )?;
    let (Some(&first), Some(&first_time)) =
        (timeline.first(), replay_config.invoke_times.first())
    else {
        return Err(PullbackError::NoData {
            code: codes.join(","),
        });
    };

    eprintln!(
        "Replaying {} symbols over {} sessions ({} to {}), {} invocation(s) per session",
        codes.len(),
        timeline.len(),
        first,
        timeline.last().copied().unwrap_or(first),
        replay_config.invoke_times.len(),
    );

    let mut runner = StrategyRunner::new(BreakoutEngine::new(signal), codes);
    let mut broker = PaperBroker::new(
        replay_config.initial_cash,
        replay_config.commission.clone(),
    );
    let clock = FixedClock::new(first.and_time(first_time));

    Ok(replay::replay(
        &mut runner,
        &preloaded,
        &mut broker,
        &clock,
        &timeline,
        &replay_config.invoke_times,
    ))
}

fn print_summary(replay_config: &ReplayConfig, summary: &ReplaySummary) {
    for record in &summary.orders {
        match &record.error {
            Some(reason) => {
                println!("{}  {}  [rejected: {}]", record.at, record.order, reason)
            }
            None => println!("{}  {}", record.at, record.order),
        }
    }

    let total_return = if replay_config.initial_cash > 0.0 {
        (summary.final_equity / replay_config.initial_cash - 1.0) * 100.0
    } else {
        0.0
    };
    let realised: f64 = summary.fills.iter().map(|f| f.pnl).sum();

    eprintln!("\n=== Replay Results ===");
    eprintln!("Sessions:         {}", summary.sessions);
    eprintln!("Invocations:      {}", summary.invocations);
    eprintln!("Breakouts:        {}", summary.breakouts);
    eprintln!("Orders:           {}", summary.orders.len());
    eprintln!("Fills:            {}", summary.fills.len());
    eprintln!("Realised P&L:     {:.2}", realised);
    eprintln!("Unrealised P&L:   {:.2}", summary.unrealized_pnl);
    for position in &summary.open_positions {
        eprintln!(
            "  holding {} x{} @ {:.2}",
            position.code, position.amount, position.avg_cost
        );
    }
    eprintln!("Final Cash:       {:.2}", summary.final_cash);
    eprintln!("Final Equity:     {:.2}", summary.final_equity);
    eprintln!("Total Return:     {:.2}%", total_return);
}

fn run_evaluate(
    config_path: &PathBuf,
    symbol: &str,
    at: Option<&str>,
    amount: i64,
    cash: Option<f64>,
    breakout_date: Option<&str>,
) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let signal = match build_signal_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let dir = match data_dir(&adapter) {
        Ok(d) => d,
        Err(e) => return fail(e),
    };

    let now = match at.map(|t| NaiveDateTime::parse_from_str(t.trim(), DATETIME_FORMAT)) {
        None => SystemClock.now(),
        Some(Ok(t)) => t,
        Some(Err(_)) => {
            eprintln!("error: invalid --at {at:?}, expected \"YYYY-MM-DD HH:MM:SS\"");
            return ExitCode::from(2);
        }
    };
    let breakout = match breakout_date.map(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d")) {
        None => None,
        Some(Ok(d)) => Some(d),
        Some(Err(_)) => {
            eprintln!("error: invalid --breakout-date, expected YYYY-MM-DD");
            return ExitCode::from(2);
        }
    };

    let code = symbol.trim().to_uppercase();
    let cash = cash.unwrap_or_else(|| adapter.get_double(REPLAY, "initial_cash", 100_000.0));
    let data = CsvAdapter::new(dir);

    match evaluate_once(&data, signal, &code, now, amount, cash, breakout) {
        Ok(evaluation) => {
            for event in &evaluation.events {
                println!("{}", describe_event(event));
            }
            match &evaluation.order {
                Some(order) => println!("order: {order}"),
                None => println!("order: none"),
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

/// A single engine call against stored bars, optionally with an armed plan.
pub fn evaluate_once(
    data: &dyn DataPort,
    signal: SignalConfig,
    code: &str,
    now: NaiveDateTime,
    amount: i64,
    cash: f64,
    breakout_date: Option<NaiveDate>,
) -> Result<Evaluation, PullbackError> {
    let engine = BreakoutEngine::new(signal);
    let bars = data.fetch_bars(code, now.date(), engine.config().window_len())?;
    if bars.is_empty() {
        return Err(PullbackError::NoData {
            code: code.to_string(),
        });
    }

    let mut state = SignalState::new();
    if let Some(date) = breakout_date {
        state.arm(date);
    }
    let position = (amount != 0).then(|| Position {
        code: code.to_string(),
        amount,
        avg_cost: 0.0,
    });

    let session = Session {
        code,
        now,
        bars: &bars,
        position: position.as_ref(),
        cash,
    };
    Ok(engine.evaluate(&mut state, &session))
}

pub fn describe_event(event: &SignalEvent) -> String {
    match event {
        SignalEvent::Skipped(SkipReason::InsufficientHistory { have, need }) => {
            format!("skipped: {have} bars, need {need}")
        }
        SignalEvent::Skipped(SkipReason::RecentRunUp { increase }) => {
            format!("skipped: recent run-up {:.2}%", increase * 100.0)
        }
        SignalEvent::StopLoss { close, current_ma } => {
            format!("stop-loss: close {close:.2} below MA {current_ma:.2}")
        }
        SignalEvent::TakeProfit {
            shadow_ratio,
            volume_ratio,
        } => format!(
            "take-profit: upper shadow {:.2}%, volume x{:.2}",
            shadow_ratio * 100.0,
            volume_ratio
        ),
        SignalEvent::PullbackBuy { price, amount } => {
            format!("pullback buy: {amount:.2} at {price:.2}")
        }
        SignalEvent::AwaitingBuyTime { time } => format!("waiting: {time} is before buy time"),
        SignalEvent::VolumeNotShrunk { volume_ratio } => {
            format!("holding plan: volume x{volume_ratio:.2} has not shrunk")
        }
        SignalEvent::PlanCancelled => "plan cancelled: session closed bullish".to_string(),
        SignalEvent::PlanExpired { breakout_date } => {
            format!("plan expired: breakout on {breakout_date}")
        }
        SignalEvent::BreakoutDetected {
            price_increase,
            volume_increase,
            close,
            current_ma,
        } => format!(
            "breakout: +{:.2}% on volume x{:.2}, close {:.2} above MA {:.2}",
            price_increase * 100.0,
            volume_increase,
            close,
            current_ma
        ),
        SignalEvent::RatioUndefined { metric } => format!("undefined ratio: {metric}"),
    }
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let signal = match build_signal_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };

    eprintln!("\n[{}]", SIGNAL);
    eprintln!("  ma_days:               {}", signal.ma_days);
    eprintln!("  volume_increase_ratio: {}", signal.volume_increase_ratio);
    eprintln!("  price_increase_ratio:  {}", signal.price_increase_ratio);
    eprintln!("  volume_decrease_ratio: {}", signal.volume_decrease_ratio);
    eprintln!("  buy_time:              {}", signal.buy_time);
    eprintln!("  upper_shadow_ratio:    {}", signal.upper_shadow_ratio);
    eprintln!("  shadow_volume_ratio:   {}", signal.shadow_volume_ratio);
    eprintln!("  recent_increase_ratio: {}", signal.recent_increase_ratio);
    eprintln!("  recent_days:           {}", signal.recent_days);
    eprintln!("  buy_cash_fraction:     {}", signal.buy_cash_fraction);

    if adapter.has_section(REPLAY) {
        let replay_config = match build_replay_config(&adapter) {
            Ok(c) => c,
            Err(e) => return fail(e),
        };
        eprintln!("\n[{}]", REPLAY);
        eprintln!("  data_dir:     {}", replay_config.data_dir.display());
        eprintln!("  symbols:      {}", replay_config.symbols.join(", "));
        eprintln!("  initial_cash: {:.2}", replay_config.initial_cash);
        let times: Vec<String> = replay_config
            .invoke_times
            .iter()
            .map(|t| t.to_string())
            .collect();
        eprintln!("  invoke_times: {}", times.join(", "));
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_info(config_path: &PathBuf, symbol: Option<&str>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let (dir, codes, signal) = match (
        data_dir(&config),
        resolve_codes(symbol, &config),
        build_signal_config(&config),
    ) {
        (Ok(d), Ok(c), Ok(s)) => (d, c, s),
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => return fail(e),
    };
    let minimum = signal.window_len();
    let data = CsvAdapter::new(dir);

    for code in &codes {
        match data.get_data_range(code) {
            Ok(Some((first, last, count))) => {
                let note = if count < minimum {
                    format!(" (short: need {minimum})")
                } else {
                    String::new()
                };
                println!("{code}: {count} bars, {first} to {last}{note}");
            }
            Ok(None) => eprintln!("{code}: no data found"),
            Err(e) => eprintln!("error querying {code}: {e}"),
        }
    }
    ExitCode::SUCCESS
}

fn run_list_symbols(config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let dir = match data_dir(&config) {
        Ok(d) => d,
        Err(e) => return fail(e),
    };

    let symbols = match CsvAdapter::new(dir.clone()).list_symbols() {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    if symbols.is_empty() {
        eprintln!("No symbols found in {}", dir.display());
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    ExitCode::SUCCESS
}
