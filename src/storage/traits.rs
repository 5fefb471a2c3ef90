//! Abstract storage traits for the locality catalog.
//!
//! The engine only needs a baseline per locality; the catalog is a
//! country / state / district / city tree of those baselines.

use std::fmt;
use std::marker::PhantomData;
use std::ops::Index;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::error::{ExecutionError, TwinError};
use crate::locality::{BaselineStats, Locality};

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A city already exists at that position.
    #[error("Duplicate locality: {0}")]
    DuplicateLocality(String),

    /// A required name component is empty.
    #[error("Invalid locality: {0}")]
    InvalidLocality(String),

    /// Backend error.
    #[error("Storage backend error: {0}")]
    BackendError(String),
}

impl From<StorageError> for TwinError {
    fn from(err: StorageError) -> Self {
        Self::Execution(ExecutionError::Catalog {
            message: err.to_string(),
        })
    }
}

/// Catalog leaf: what is known about one city.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CityRecord {
    /// Baseline measurements for the city.
    pub baseline: BaselineStats,
}

/// String-keyed map that keeps keys in insertion order.
///
/// Serializes as a JSON object with keys in that order. Catalog levels are
/// small, so lookups are linear scans.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V> OrderedMap<V> {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    /// Value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&V> {
        self.position(key).map(|i| &self.entries[i].1)
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Inserts or replaces; a replaced key keeps its original position.
    pub fn insert(&mut self, key: String, value: V) -> Option<V> {
        match self.position(&key) {
            Some(i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Value under `key`, appending a default one when absent.
    pub fn get_or_insert_default(&mut self, key: String) -> &mut V
    where
        V: Default,
    {
        let idx = match self.position(&key) {
            Some(i) => i,
            None => {
                self.entries.push((key, V::default()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx].1
    }

    /// The earliest inserted entry.
    #[must_use]
    pub fn first(&self) -> Option<(&str, &V)> {
        self.entries.first().map(|(k, v)| (k.as_str(), v))
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Index<&str> for OrderedMap<V> {
    type Output = V;

    /// # Panics
    ///
    /// Panics if `key` is not present, like `BTreeMap`'s `Index`.
    fn index(&self, key: &str) -> &V {
        match self.get(key) {
            Some(v) => v,
            None => panic!("key not found in catalog: {key}"),
        }
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct OrderedMapVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
    type Value = OrderedMap<V>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map keyed by locality name")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = OrderedMap::new();
        while let Some((key, value)) = access.next_entry::<String, V>()? {
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

/// city -> record
pub type CityMap = OrderedMap<CityRecord>;
/// district -> cities
pub type DistrictMap = OrderedMap<CityMap>;
/// state -> districts
pub type StateMap = OrderedMap<DistrictMap>;

/// Full catalog tree: country -> state -> district -> city -> record.
///
/// Every level keeps insertion order, and serializes to the nested JSON
/// object the front end renders selectors from.
pub type LocalityHierarchy = OrderedMap<StateMap>;

/// Storage trait for the locality catalog.
///
/// Implementations must be safe for concurrent readers.
pub trait LocalityStore: Send + Sync {
    /// Insert a city. Returns error if the exact position already exists.
    fn insert(&self, locality: Locality, baseline: BaselineStats) -> Result<(), StorageError>;

    /// Snapshot of the whole catalog.
    fn hierarchy(&self) -> Result<LocalityHierarchy, StorageError>;

    /// Resolve a city or district name to a baseline.
    ///
    /// A city name matches exactly. A district name resolves to the first
    /// city inserted into that district. Districts are visited in insertion
    /// order and the city check runs before the district check for each one.
    fn baseline(&self, name: &str) -> Result<Option<BaselineStats>, StorageError>;

    /// Full position of a city, if present.
    fn locate(&self, city: &str) -> Result<Option<Locality>, StorageError>;

    /// Number of cities in the catalog.
    fn count(&self) -> Result<usize, StorageError>;
}
