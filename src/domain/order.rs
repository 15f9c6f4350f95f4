//! Order instructions produced by the engine.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderReason {
    /// Close fell below the moving average.
    StopLoss,
    /// Long upper shadow on expanding volume.
    TakeProfit,
    /// Bearish, low-volume session after a breakout.
    PullbackBuy,
}

impl fmt::Display for OrderReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderReason::StopLoss => write!(f, "stop-loss"),
            OrderReason::TakeProfit => write!(f, "take-profit"),
            OrderReason::PullbackBuy => write!(f, "pullback-buy"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderInstruction {
    /// Sell the whole position down to zero value.
    Liquidate { code: String, reason: OrderReason },
    /// Buy spending `amount` of cash.
    BuyValue {
        code: String,
        amount: f64,
        reason: OrderReason,
    },
}

impl OrderInstruction {
    pub fn code(&self) -> &str {
        match self {
            OrderInstruction::Liquidate { code, .. } | OrderInstruction::BuyValue { code, .. } => {
                code
            }
        }
    }

    pub fn reason(&self) -> OrderReason {
        match self {
            OrderInstruction::Liquidate { reason, .. }
            | OrderInstruction::BuyValue { reason, .. } => *reason,
        }
    }
}

impl fmt::Display for OrderInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderInstruction::Liquidate { code, reason } => {
                write!(f, "LIQUIDATE {} ({})", code, reason)
            }
            OrderInstruction::BuyValue {
                code,
                amount,
                reason,
            } => write!(f, "BUY {} value {:.2} ({})", code, amount, reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_liquidate() {
        let order = OrderInstruction::Liquidate {
            code: "AAA".into(),
            reason: OrderReason::StopLoss,
        };
        assert_eq!(order.to_string(), "LIQUIDATE AAA (stop-loss)");
        assert_eq!(order.code(), "AAA");
        assert_eq!(order.reason(), OrderReason::StopLoss);
    }

    #[test]
    fn display_buy_value() {
        let order = OrderInstruction::BuyValue {
            code: "AAA".into(),
            amount: 9000.0,
            reason: OrderReason::PullbackBuy,
        };
        assert_eq!(order.to_string(), "BUY AAA value 9000.00 (pullback-buy)");
        assert_eq!(order.reason(), OrderReason::PullbackBuy);
    }
}
