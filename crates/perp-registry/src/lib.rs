//! perp-registry: address registry for the Perpetual deployment tooling
//!
//! Remembers, per chain, where each supporting component and the main
//! upgradeable component were deployed, so the deployer can reuse them
//! instead of deploying again.
//!
//! ## Key Components
//!
//! - `AddressRegistry`: async trait with resolve / record / completeness checks
//! - `MemoryAddressRegistry`: in-memory implementation (seeded, not persisted)
//! - `JsonFileRegistry`: JSON document on disk, written back atomically

mod error;
pub mod fakes;
pub mod json_registry;
pub mod registry_traits;

pub use error::RegistryError;
pub use fakes::MemoryAddressRegistry;
pub use json_registry::JsonFileRegistry;
pub use registry_traits::{AddressRegistry, ChainId, ComponentGroup, RegistryResult};
