//! Locality catalog storage.
//!
//! The catalog is a static lookup table; the in-memory backend is the only
//! implementation.

mod memory;
mod traits;

pub use memory::{builtin_localities, InMemoryLocalityStore};
pub use traits::{
    CityMap, CityRecord, DistrictMap, LocalityHierarchy, LocalityStore, OrderedMap, StateMap,
    StorageError,
};

use crate::error::{ExecutionError, TwinResult};
use crate::locality::BaselineStats;

/// Resolves `name` or reports `ExecutionError::LocalityNotFound`.
pub fn require_baseline(store: &dyn LocalityStore, name: &str) -> TwinResult<BaselineStats> {
    store.baseline(name)?.ok_or_else(|| {
        ExecutionError::LocalityNotFound {
            name: name.to_string(),
        }
        .into()
    })
}
