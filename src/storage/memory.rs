//! In-memory catalog backend.
//!
//! Thread-safe, used for the built-in demo catalog, embedded use and tests.

use std::sync::RwLock;

use crate::locality::{BaselineStats, Locality};
use crate::storage::traits::{CityRecord, LocalityHierarchy, LocalityStore, StorageError};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

fn require_name(field: &str, value: &str) -> Result<(), StorageError> {
    if value.trim().is_empty() {
        return Err(StorageError::InvalidLocality(format!("{field} is empty")));
    }
    Ok(())
}

/// Catalog held in nested insertion-ordered maps behind a `RwLock`.
#[derive(Debug, Default)]
pub struct InMemoryLocalityStore {
    tree: RwLock<LocalityHierarchy>,
}

impl InMemoryLocalityStore {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The Kerala demo catalog the product ships with, in its listing order.
    #[must_use]
    pub fn with_builtin_catalog() -> Self {
        let mut tree = LocalityHierarchy::new();
        for (locality, baseline) in builtin_localities() {
            tree.get_or_insert_default(locality.country)
                .get_or_insert_default(locality.state)
                .get_or_insert_default(locality.district)
                .insert(locality.city, CityRecord { baseline });
        }
        Self {
            tree: RwLock::new(tree),
        }
    }
}

/// Built-in catalog entries, in listing order.
#[must_use]
pub fn builtin_localities() -> Vec<(Locality, BaselineStats)> {
    vec![
        (
            Locality::new("India", "Kerala", "Palakkad", "Palakkad Town"),
            BaselineStats::new(75.0, 65.0, 40.0, 1200.0, 150_000),
        ),
        (
            Locality::new("India", "Kerala", "Palakkad", "Chittur"),
            BaselineStats::new(60.0, 70.0, 30.0, 1500.0, 80_000),
        ),
        (
            Locality::new("India", "Kerala", "Ernakulam", "Kochi"),
            BaselineStats::new(95.0, 50.0, 80.0, 800.0, 600_000),
        ),
    ]
}

impl LocalityStore for InMemoryLocalityStore {
    fn insert(&self, locality: Locality, baseline: BaselineStats) -> Result<(), StorageError> {
        require_name("country", &locality.country)?;
        require_name("state", &locality.state)?;
        require_name("district", &locality.district)?;
        require_name("city", &locality.city)?;

        let mut tree = self.tree.write().map_err(|_| lock_err("catalog"))?;
        let cities = tree
            .get_or_insert_default(locality.country)
            .get_or_insert_default(locality.state)
            .get_or_insert_default(locality.district);
        if cities.contains_key(&locality.city) {
            return Err(StorageError::DuplicateLocality(locality.city));
        }
        cities.insert(locality.city, CityRecord { baseline });
        Ok(())
    }

    fn hierarchy(&self) -> Result<LocalityHierarchy, StorageError> {
        let tree = self.tree.read().map_err(|_| lock_err("catalog"))?;
        Ok(tree.clone())
    }

    fn baseline(&self, name: &str) -> Result<Option<BaselineStats>, StorageError> {
        let tree = self.tree.read().map_err(|_| lock_err("catalog"))?;
        for states in tree.values() {
            for districts in states.values() {
                for (district, cities) in districts.iter() {
                    if let Some(record) = cities.get(name) {
                        return Ok(Some(record.baseline));
                    }
                    if district == name {
                        return Ok(cities.first().map(|(_, r)| r.baseline));
                    }
                }
            }
        }
        Ok(None)
    }

    fn locate(&self, city: &str) -> Result<Option<Locality>, StorageError> {
        let tree = self.tree.read().map_err(|_| lock_err("catalog"))?;
        for (country, states) in tree.iter() {
            for (state, districts) in states.iter() {
                for (district, cities) in districts.iter() {
                    if cities.contains_key(city) {
                        return Ok(Some(Locality::new(country, state, district, city)));
                    }
                }
            }
        }
        Ok(None)
    }

    fn count(&self) -> Result<usize, StorageError> {
        let tree = self.tree.read().map_err(|_| lock_err("catalog"))?;
        Ok(tree
            .values()
            .flat_map(|states| states.values())
            .flat_map(|districts| districts.values())
            .map(|cities| cities.len())
            .sum())
    }
}
