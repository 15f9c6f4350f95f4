//! pullback: breakout-and-pullback trading signal engine.
//!
//! Hexagonal architecture: rule logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`]. [`replay`] drives the engine over
//! stored bars; [`cli`] wires everything to the command line.

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
pub mod logging;
pub mod replay;
