//! Person and driver records, and the store they are kept in.
//!
//! The simulation only reads and writes a driver's availability and rating
//! aggregate. The storage format belongs to whoever implements
//! [`RecordStore`]; [`MemoryRecordStore`] keeps everything in a map.

use anyhow::{Context, Result};
use std::collections::HashMap;

use super::types::VehicleCategory;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersonRecord {
    pub name: String,
    pub email: String,
    pub gender: Gender,
    pub phone: String,
    pub age: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DriverRecord {
    pub person: PersonRecord,
    pub category: VehicleCategory,
    pub license_id: String,
    pub years_experience: u32,
    pub average_rating: f64,
    pub rides_completed: u32,
    pub available: bool,
}

impl DriverRecord {
    pub fn new(
        person: PersonRecord,
        category: VehicleCategory,
        license_id: impl Into<String>,
    ) -> Self {
        Self {
            person,
            category,
            license_id: license_id.into(),
            years_experience: 0,
            average_rating: 0.0,
            rides_completed: 0,
            available: true,
        }
    }
}

/// Keyed-by-identity storage for driver records
pub trait RecordStore {
    fn load(&self, key: &str) -> Result<Option<DriverRecord>>;
    fn save(&mut self, key: &str, record: DriverRecord) -> Result<()>;

    /// Load a record that must exist
    fn load_existing(&self, key: &str) -> Result<DriverRecord> {
        self.load(key)?
            .with_context(|| format!("no driver record for {key:?}"))
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryRecordStore {
    records: HashMap<String, DriverRecord>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordStore for MemoryRecordStore {
    fn load(&self, key: &str) -> Result<Option<DriverRecord>> {
        Ok(self.records.get(key).cloned())
    }

    fn save(&mut self, key: &str, record: DriverRecord) -> Result<()> {
        self.records.insert(key.to_string(), record);
        Ok(())
    }
}
