//! vantage-bus: the key-value control bus
//!
//! Vision results leave the node as named numeric entries grouped in tables.
//! Robot control software reads them back by name or subscribes to updates.

pub mod bootstrap;
pub mod bus;

pub use bootstrap::{team_address, BusBootstrap, BusEndpoint};
pub use bus::{
    BusUpdate, ControlBus, MemoryBus, CENTER_X, DISTANCE_TARGET, LEFT_TARGET, RIGHT_TARGET,
};
pub use vantage_core::BusMode;
