#![doc = include_str!("../../../README.md")]

//! Multi-instance Zabbix client pool: version-adaptive JSON-RPC clients,
//! leased out of a fixed roster with at-most-one-user-per-client semantics.

pub mod adapter;
pub mod client;
pub mod config;
pub mod lease;
pub mod logging;
pub mod params;
pub mod pool;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::{AuthStyle, Client};
pub use config::{InstanceConfig, load_instances, parse_instances};
pub use lease::Lease;
pub use pool::{ClientInfo, ClientPool};

pub use zabbix_rpc_core as wire;
