//! In-memory paper broker.
//!
//! Fills market orders immediately at the last mark, in whole shares, and
//! charges `commission_per_trade + value * commission_pct / 100`.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::domain::error::PullbackError;
use crate::domain::position::Position;
use crate::ports::broker_port::BrokerPort;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommissionConfig {
    pub commission_per_trade: f64,
    pub commission_pct: f64,
}

impl CommissionConfig {
    pub fn commission(&self, trade_value: f64) -> f64 {
        self.commission_per_trade + (trade_value * self.commission_pct / 100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub code: String,
    pub date: NaiveDate,
    pub side: Side,
    pub quantity: i64,
    pub price: f64,
    pub commission: f64,
    /// Realised on sells, net of the sell commission.
    pub pnl: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Mark {
    date: NaiveDate,
    price: f64,
}

#[derive(Debug, Clone)]
pub struct PaperBroker {
    cash: f64,
    positions: HashMap<String, Position>,
    marks: HashMap<String, Mark>,
    fills: Vec<Fill>,
    commission: CommissionConfig,
}

impl PaperBroker {
    pub fn new(initial_cash: f64, commission: CommissionConfig) -> Self {
        Self {
            cash: initial_cash,
            positions: HashMap::new(),
            marks: HashMap::new(),
            fills: Vec::new(),
            commission,
        }
    }

    /// Price at which the next order for `code` fills.
    pub fn set_mark(&mut self, code: &str, date: NaiveDate, price: f64) {
        self.marks.insert(code.to_string(), Mark { date, price });
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    /// Open P&L of every position at its last mark.
    pub fn unrealized_pnl(&self) -> f64 {
        self.positions
            .values()
            .filter_map(|pos| {
                self.marks
                    .get(&pos.code)
                    .map(|mark| pos.unrealized_pnl(mark.price))
            })
            .sum()
    }

    /// Cash plus every position at its last mark.
    pub fn total_equity(&self) -> f64 {
        let position_value: f64 = self
            .positions
            .values()
            .filter_map(|pos| {
                self.marks
                    .get(&pos.code)
                    .map(|mark| pos.market_value(mark.price))
            })
            .sum();
        self.cash + position_value
    }

    fn mark(&self, code: &str) -> Result<Mark, PullbackError> {
        self.marks
            .get(code)
            .copied()
            .filter(|m| m.price > 0.0)
            .ok_or_else(|| PullbackError::Order {
                code: code.to_string(),
                reason: "no price available".into(),
            })
    }
}

impl BrokerPort for PaperBroker {
    fn get_position(&self, code: &str) -> Option<Position> {
        self.positions.get(code).cloned()
    }

    fn get_cash(&self) -> f64 {
        self.cash
    }

    fn liquidate(&mut self, code: &str) -> Result<(), PullbackError> {
        let Some(position) = self.positions.get(code).cloned() else {
            return Ok(());
        };
        let mark = self.mark(code)?;

        let value = position.amount as f64 * mark.price;
        let commission = self.commission.commission(value);
        let pnl = position.amount as f64 * (mark.price - position.avg_cost) - commission;

        self.cash += value - commission;
        self.positions.remove(code);
        self.fills.push(Fill {
            code: code.to_string(),
            date: mark.date,
            side: Side::Sell,
            quantity: position.amount,
            price: mark.price,
            commission,
            pnl,
        });
        tracing::debug!(
            code,
            quantity = position.amount,
            price = mark.price,
            pnl,
            "paper sell filled"
        );
        Ok(())
    }

    fn buy_value(&mut self, code: &str, amount: f64) -> Result<(), PullbackError> {
        let mark = self.mark(code)?;
        let budget = amount.min(self.cash);
        let quantity = (budget / mark.price).floor() as i64;

        if quantity <= 0 {
            return Err(PullbackError::Order {
                code: code.to_string(),
                reason: format!("{:.2} buys no whole shares at {:.2}", amount, mark.price),
            });
        }

        let cost = quantity as f64 * mark.price;
        let commission = self.commission.commission(cost);
        if cost + commission > self.cash {
            return Err(PullbackError::Order {
                code: code.to_string(),
                reason: "insufficient cash".into(),
            });
        }

        self.cash -= cost + commission;
        let position = self
            .positions
            .entry(code.to_string())
            .or_insert_with(|| Position {
                code: code.to_string(),
                amount: 0,
                avg_cost: 0.0,
            });
        let total = position.amount + quantity;
        position.avg_cost =
            (position.avg_cost * position.amount as f64 + cost) / total as f64;
        position.amount = total;

        self.fills.push(Fill {
            code: code.to_string(),
            date: mark.date,
            side: Side::Buy,
            quantity,
            price: mark.price,
            commission,
            pnl: 0.0,
        });
        tracing::debug!(code, quantity, price = mark.price, "paper buy filled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
    }

    fn broker(cash: f64) -> PaperBroker {
        PaperBroker::new(
            cash,
            CommissionConfig {
                commission_per_trade: 5.0,
                commission_pct: 0.1,
            },
        )
    }

    #[test]
    fn commission_basic() {
        let c = CommissionConfig {
            commission_per_trade: 10.0,
            commission_pct: 0.1,
        };
        assert_relative_eq!(c.commission(10_000.0), 20.0);
        assert_relative_eq!(CommissionConfig::default().commission(10_000.0), 0.0);
    }

    #[test]
    fn buy_value_fills_whole_shares() {
        let mut b = broker(10_000.0);
        b.set_mark("AAA", date(), 108.0);
        b.buy_value("AAA", 9_000.0).unwrap();

        // floor(9000 / 108) = 83 shares
        let pos = b.get_position("AAA").unwrap();
        assert_eq!(pos.amount, 83);
        assert_relative_eq!(pos.avg_cost, 108.0);

        let cost = 83.0 * 108.0;
        let commission = 5.0 + cost * 0.1 / 100.0;
        assert_relative_eq!(b.get_cash(), 10_000.0 - cost - commission, epsilon = 1e-9);
        assert_eq!(b.fills().len(), 1);
        assert_eq!(b.fills()[0].side, Side::Buy);
        assert_eq!(b.fills()[0].date, date());
    }

    #[test]
    fn buy_without_mark_is_rejected() {
        let mut b = broker(10_000.0);
        let err = b.buy_value("AAA", 1_000.0).unwrap_err();
        assert!(matches!(err, PullbackError::Order { .. }));
        assert!(b.get_position("AAA").is_none());
    }

    #[test]
    fn buy_too_small_is_rejected() {
        let mut b = broker(10_000.0);
        b.set_mark("AAA", date(), 500.0);
        assert!(b.buy_value("AAA", 100.0).is_err());
        assert_relative_eq!(b.get_cash(), 10_000.0);
    }

    #[test]
    fn buy_adds_to_existing_position() {
        let mut b = PaperBroker::new(100_000.0, CommissionConfig::default());
        b.set_mark("AAA", date(), 100.0);
        b.buy_value("AAA", 1_000.0).unwrap();
        b.set_mark("AAA", date(), 200.0);
        b.buy_value("AAA", 2_000.0).unwrap();

        let pos = b.get_position("AAA").unwrap();
        assert_eq!(pos.amount, 20);
        assert_relative_eq!(pos.avg_cost, 150.0);
    }

    #[test]
    fn liquidate_closes_position_and_books_pnl() {
        let mut b = PaperBroker::new(10_000.0, CommissionConfig::default());
        b.set_mark("AAA", date(), 100.0);
        b.buy_value("AAA", 5_000.0).unwrap();
        b.set_mark("AAA", date(), 110.0);
        b.liquidate("AAA").unwrap();

        assert!(b.get_position("AAA").is_none());
        assert_relative_eq!(b.get_cash(), 10_500.0);
        let sell = b.fills().last().unwrap();
        assert_eq!(sell.side, Side::Sell);
        assert_eq!(sell.quantity, 50);
        assert_relative_eq!(sell.pnl, 500.0);
    }

    #[test]
    fn liquidate_without_position_is_noop() {
        let mut b = broker(10_000.0);
        b.liquidate("AAA").unwrap();
        assert!(b.fills().is_empty());
    }

    #[test]
    fn total_equity_uses_marks() {
        let mut b = PaperBroker::new(10_000.0, CommissionConfig::default());
        b.set_mark("AAA", date(), 100.0);
        b.buy_value("AAA", 5_000.0).unwrap();
        b.set_mark("AAA", date(), 120.0);
        assert_relative_eq!(b.total_equity(), 5_000.0 + 50.0 * 120.0);
        assert_relative_eq!(b.unrealized_pnl(), 50.0 * 20.0);
        assert_eq!(b.positions().count(), 1);
    }
}
