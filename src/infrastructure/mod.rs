//! Port implementations: storage backends and payment gateways.

pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod sandbox;
pub mod stripe;
