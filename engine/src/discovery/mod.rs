//! Discovery adapters
//!
//! Concrete [`beacon_core::Discovery`] implementations. Currently etcd,
//! where TTLs map onto v3 leases.

mod etcd;

pub use etcd::EtcdDiscovery;
