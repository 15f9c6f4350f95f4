//! Per-session host loop over a set of symbols.
//!
//! Fetches each symbol's window, snapshots position and cash, runs the
//! engine against that symbol's own [`SignalState`] and hands any order to
//! the broker. A failure for one symbol never stops the others.

use crate::domain::engine::{BreakoutEngine, Evaluation, Session};
use crate::domain::error::PullbackError;
use crate::domain::order::OrderInstruction;
use crate::domain::signal::{SignalBook, SignalState};
use crate::ports::broker_port::BrokerPort;
use crate::ports::clock_port::ClockPort;
use crate::ports::data_port::DataPort;

#[derive(Debug, Clone)]
pub struct SessionReport {
    pub code: String,
    /// `None` when bars could not be fetched.
    pub evaluation: Option<Evaluation>,
    pub error: Option<String>,
}

impl SessionReport {
    pub fn order(&self) -> Option<&OrderInstruction> {
        self.evaluation.as_ref().and_then(|e| e.order.as_ref())
    }
}

pub struct StrategyRunner {
    engine: BreakoutEngine,
    codes: Vec<String>,
    book: SignalBook,
}

impl StrategyRunner {
    pub fn new(engine: BreakoutEngine, codes: Vec<String>) -> Self {
        Self {
            engine,
            codes,
            book: SignalBook::new(),
        }
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    pub fn engine(&self) -> &BreakoutEngine {
        &self.engine
    }

    pub fn state(&self, code: &str) -> Option<&SignalState> {
        self.book.get(code)
    }

    pub fn book(&self) -> &SignalBook {
        &self.book
    }

    /// One invocation for every tracked symbol.
    pub fn run_session(
        &mut self,
        data: &dyn DataPort,
        broker: &mut dyn BrokerPort,
        clock: &dyn ClockPort,
    ) -> Vec<SessionReport> {
        let now = clock.now();
        let count = self.engine.config().window_len();
        let mut reports = Vec::with_capacity(self.codes.len());

        for code in &self.codes {
            let bars = match data.fetch_bars(code, now.date(), count) {
                Ok(bars) => bars,
                Err(e) => {
                    tracing::warn!(code = code.as_str(), error = %e, "failed to fetch bars");
                    reports.push(SessionReport {
                        code: code.clone(),
                        evaluation: None,
                        error: Some(e.to_string()),
                    });
                    continue;
                }
            };

            let position = broker.get_position(code);
            let session = Session {
                code,
                now,
                bars: &bars,
                position: position.as_ref(),
                cash: broker.get_cash(),
            };
            let evaluation = self.engine.evaluate(self.book.state_mut(code), &session);

            let error = match &evaluation.order {
                Some(order) => dispatch(broker, order).err().map(|e| {
                    tracing::warn!(
                        code = code.as_str(),
                        %order,
                        error = %e,
                        "order dispatch failed"
                    );
                    e.to_string()
                }),
                None => None,
            };

            reports.push(SessionReport {
                code: code.clone(),
                evaluation: Some(evaluation),
                error,
            });
        }

        reports
    }
}

pub fn dispatch(
    broker: &mut dyn BrokerPort,
    order: &OrderInstruction,
) -> Result<(), PullbackError> {
    tracing::info!(%order, "submitting order");
    match order {
        OrderInstruction::Liquidate { code, .. } => broker.liquidate(code),
        OrderInstruction::BuyValue { code, amount, .. } => broker.buy_value(code, *amount),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::OhlcvBar;
    use crate::domain::position::Position;
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use std::collections::HashMap;

    struct StubData {
        bars: HashMap<String, Vec<OhlcvBar>>,
    }

    impl DataPort for StubData {
        fn fetch_bars(
            &self,
            code: &str,
            as_of: NaiveDate,
            count: usize,
        ) -> Result<Vec<OhlcvBar>, PullbackError> {
            let bars = self.bars.get(code).ok_or_else(|| PullbackError::NoData {
                code: code.to_string(),
            })?;
            let upto: Vec<OhlcvBar> = bars.iter().filter(|b| b.date <= as_of).cloned().collect();
            let start = upto.len().saturating_sub(count);
            Ok(upto[start..].to_vec())
        }

        fn list_symbols(&self) -> Result<Vec<String>, PullbackError> {
            Ok(self.bars.keys().cloned().collect())
        }

        fn get_data_range(
            &self,
            _code: &str,
        ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, PullbackError> {
            Ok(None)
        }
    }

    #[derive(Default)]
    struct RecordingBroker {
        cash: f64,
        positions: HashMap<String, Position>,
        orders: Vec<String>,
        reject: bool,
    }

    impl BrokerPort for RecordingBroker {
        fn get_position(&self, code: &str) -> Option<Position> {
            self.positions.get(code).cloned()
        }

        fn get_cash(&self) -> f64 {
            self.cash
        }

        fn liquidate(&mut self, code: &str) -> Result<(), PullbackError> {
            self.orders.push(format!("liquidate {code}"));
            Ok(())
        }

        fn buy_value(&mut self, code: &str, amount: f64) -> Result<(), PullbackError> {
            if self.reject {
                return Err(PullbackError::Order {
                    code: code.to_string(),
                    reason: "rejected".into(),
                });
            }
            self.orders.push(format!("buy {code} {amount:.0}"));
            Ok(())
        }
    }

    struct At(NaiveDateTime);

    impl ClockPort for At {
        fn now(&self) -> NaiveDateTime {
            self.0
        }
    }

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(n)
    }

    fn bar(code: &str, n: i64, open: f64, close: f64, volume: f64) -> OhlcvBar {
        OhlcvBar {
            code: code.into(),
            date: day(n),
            open,
            high: open.max(close),
            low: open.min(close),
            close,
            volume,
        }
    }

    /// Breakout on day 61, bearish low-volume pullback on day 62.
    fn breakout_then_pullback(code: &str) -> Vec<OhlcvBar> {
        let mut bars: Vec<OhlcvBar> = (0..61).map(|i| bar(code, i, 100.0, 100.0, 100.0)).collect();
        bars.push(bar(code, 61, 101.0, 110.0, 300.0));
        bars.push(bar(code, 62, 112.0, 108.0, 40.0));
        bars
    }

    fn runner(codes: &[&str]) -> StrategyRunner {
        StrategyRunner::new(
            BreakoutEngine::default(),
            codes.iter().map(|c| c.to_string()).collect(),
        )
    }

    #[test]
    fn states_are_kept_per_symbol() {
        let mut bars = HashMap::new();
        bars.insert("AAA".to_string(), breakout_then_pullback("AAA"));
        bars.insert(
            "BBB".to_string(),
            (0..63).map(|i| bar("BBB", i, 100.0, 100.0, 100.0)).collect(),
        );
        let data = StubData { bars };
        let mut broker = RecordingBroker {
            cash: 10_000.0,
            ..Default::default()
        };
        let mut runner = runner(&["AAA", "BBB"]);

        runner.run_session(&data, &mut broker, &At(day(61).and_hms_opt(15, 0, 0).unwrap()));
        assert!(runner.state("AAA").unwrap().is_breakout);
        assert!(!runner.state("BBB").unwrap().is_breakout);

        let reports =
            runner.run_session(&data, &mut broker, &At(day(62).and_hms_opt(15, 0, 0).unwrap()));
        assert_eq!(reports.len(), 2);
        assert!(reports[0].order().is_some());
        assert!(reports[1].order().is_none());
        assert_eq!(broker.orders, vec!["buy AAA 9000".to_string()]);
        assert_eq!(runner.state("AAA").unwrap().buy_price, 108.0);
    }

    #[test]
    fn missing_data_reports_error_and_continues() {
        let mut bars = HashMap::new();
        bars.insert("AAA".to_string(), breakout_then_pullback("AAA"));
        let data = StubData { bars };
        let mut broker = RecordingBroker::default();
        let mut runner = runner(&["ZZZ", "AAA"]);

        let reports =
            runner.run_session(&data, &mut broker, &At(day(61).and_hms_opt(15, 0, 0).unwrap()));
        assert!(reports[0].evaluation.is_none());
        assert!(reports[0].error.as_deref().unwrap().contains("ZZZ"));
        assert!(reports[1].evaluation.as_ref().unwrap().breakout_detected());
    }

    #[test]
    fn rejected_order_is_reported() {
        let mut bars = HashMap::new();
        bars.insert("AAA".to_string(), breakout_then_pullback("AAA"));
        let data = StubData { bars };
        let mut broker = RecordingBroker {
            cash: 10_000.0,
            reject: true,
            ..Default::default()
        };
        let mut runner = runner(&["AAA"]);

        runner.run_session(&data, &mut broker, &At(day(61).and_hms_opt(15, 0, 0).unwrap()));
        let reports =
            runner.run_session(&data, &mut broker, &At(day(62).and_hms_opt(15, 0, 0).unwrap()));
        assert!(reports[0].order().is_some());
        assert!(reports[0].error.is_some());
    }

    #[test]
    fn held_position_is_passed_to_engine() {
        let mut bars: Vec<OhlcvBar> = (0..61).map(|i| bar("AAA", i, 100.0, 100.0, 100.0)).collect();
        bars.push(bar("AAA", 61, 96.0, 95.0, 100.0));
        let data = StubData {
            bars: HashMap::from([("AAA".to_string(), bars)]),
        };
        let mut broker = RecordingBroker::default();
        broker.positions.insert(
            "AAA".into(),
            Position {
                code: "AAA".into(),
                amount: 100,
                avg_cost: 100.0,
            },
        );
        let mut runner = runner(&["AAA"]);

        runner.run_session(&data, &mut broker, &At(day(61).and_hms_opt(15, 0, 0).unwrap()));
        assert_eq!(broker.orders, vec!["liquidate AAA".to_string()]);
    }
}
