//! Port traits for the collaborators the engine depends on.

pub mod broker_port;
pub mod clock_port;
pub mod config_port;
pub mod data_port;
