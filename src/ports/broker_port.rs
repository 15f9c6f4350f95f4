//! Portfolio and order execution port.
//!
//! The broker owns positions and cash; the engine only reads snapshots and
//! submits instructions.

use crate::domain::error::PullbackError;
use crate::domain::position::Position;

pub trait BrokerPort {
    fn get_position(&self, code: &str) -> Option<Position>;

    fn get_cash(&self) -> f64;

    /// Sell `code` down to zero value.
    fn liquidate(&mut self, code: &str) -> Result<(), PullbackError>;

    /// Buy `code` spending up to `amount` of cash.
    fn buy_value(&mut self, code: &str, amount: f64) -> Result<(), PullbackError>;
}
