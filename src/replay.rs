//! Replays stored daily bars through the runner, session by session.
//!
//! Each trading date is invoked once per configured time of day with a
//! simulated clock, so the pullback buy's time gate is exercised the same
//! way a live host would. Only daily bars exist here: every invocation sees
//! the full-day bar, and the paper broker fills at that day's close.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::adapters::clock::FixedClock;
use crate::adapters::paper_broker::{CommissionConfig, Fill, PaperBroker};
use crate::domain::error::PullbackError;
use crate::domain::order::OrderInstruction;
use crate::domain::position::Position;
use crate::domain::runner::StrategyRunner;
use crate::ports::broker_port::BrokerPort;
use crate::ports::data_port::DataPort;

#[derive(Debug, Clone, PartialEq)]
pub struct ReplayConfig {
    pub data_dir: PathBuf,
    pub symbols: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub initial_cash: f64,
    pub commission: CommissionConfig,
    /// Ascending, at least one.
    pub invoke_times: Vec<NaiveTime>,
}

#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub at: NaiveDateTime,
    pub order: OrderInstruction,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReplaySummary {
    pub sessions: usize,
    pub invocations: usize,
    pub breakouts: usize,
    pub orders: Vec<OrderRecord>,
    pub fills: Vec<Fill>,
    /// Positions still held after the last session, by code.
    pub open_positions: Vec<Position>,
    pub unrealized_pnl: f64,
    pub final_cash: f64,
    pub final_equity: f64,
}

/// Every date any symbol traded on, within the optional bounds.
pub fn build_timeline(
    data: &dyn DataPort,
    codes: &[String],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Vec<NaiveDate>, PullbackError> {
    let mut dates = BTreeSet::new();

    for code in codes {
        let Some((_, last, count)) = data.get_data_range(code)? else {
            continue;
        };
        let as_of = end.map_or(last, |e| e.min(last));
        for bar in data.fetch_bars(code, as_of, count)? {
            if start.is_none_or(|s| bar.date >= s) {
                dates.insert(bar.date);
            }
        }
    }

    Ok(dates.into_iter().collect())
}

pub fn replay(
    runner: &mut StrategyRunner,
    data: &dyn DataPort,
    broker: &mut PaperBroker,
    clock: &FixedClock,
    timeline: &[NaiveDate],
    invoke_times: &[NaiveTime],
) -> ReplaySummary {
    let codes = runner.codes().to_vec();
    let mut orders = Vec::new();
    let mut invocations = 0;
    let mut breakouts = 0;

    for &date in timeline {
        for code in &codes {
            match data.fetch_bars(code, date, 1) {
                Ok(bars) => {
                    if let Some(bar) = bars.last().filter(|b| b.date == date) {
                        broker.set_mark(code, date, bar.close);
                    }
                }
                Err(e) => tracing::warn!(code = code.as_str(), %date, error = %e, "no mark"),
            }
        }

        for &time in invoke_times {
            let at = date.and_time(time);
            clock.set(at);
            invocations += 1;

            for report in runner.run_session(data, broker, clock) {
                let Some(evaluation) = report.evaluation else {
                    continue;
                };
                if evaluation.breakout_detected() {
                    breakouts += 1;
                }
                if let Some(order) = evaluation.order {
                    orders.push(OrderRecord {
                        at,
                        order,
                        error: report.error,
                    });
                }
            }
        }
    }

    tracing::info!(
        sessions = timeline.len(),
        invocations,
        orders = orders.len(),
        "replay finished"
    );

    let mut open_positions: Vec<Position> = broker.positions().cloned().collect();
    open_positions.sort_by(|a, b| a.code.cmp(&b.code));

    ReplaySummary {
        sessions: timeline.len(),
        invocations,
        breakouts,
        orders,
        fills: broker.fills().to_vec(),
        open_positions,
        unrealized_pnl: broker.unrealized_pnl(),
        final_cash: broker.get_cash(),
        final_equity: broker.total_equity(),
    }
}
