//! Held position snapshot, as reported by the broker.

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub code: String,
    pub amount: i64,
    pub avg_cost: f64,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.amount > 0
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.amount.unsigned_abs() as f64 * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.amount as f64 * (price - self.avg_cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_position() -> Position {
        Position {
            code: "000001.XSHE".into(),
            amount: 100,
            avg_cost: 50.0,
        }
    }

    #[test]
    fn is_long_positive_amount() {
        assert!(sample_position().is_long());
    }

    #[test]
    fn empty_position_is_not_long() {
        let pos = Position {
            amount: 0,
            ..sample_position()
        };
        assert!(!pos.is_long());
    }

    #[test]
    fn market_value() {
        let pos = sample_position();
        assert!((pos.market_value(55.0) - 5500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unrealized_pnl_profit_and_loss() {
        let pos = sample_position();
        assert!((pos.unrealized_pnl(55.0) - 500.0).abs() < f64::EPSILON);
        assert!((pos.unrealized_pnl(45.0) - (-500.0)).abs() < f64::EPSILON);
    }
}
