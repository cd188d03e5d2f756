//! Domain types and the ports the settlement flow talks through.

pub mod checkout;
pub mod commission;
pub mod contract;
pub mod event;
pub mod money;
pub mod party;
pub mod ports;
pub mod settlement;
