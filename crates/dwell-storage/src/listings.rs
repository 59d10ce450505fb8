//! Repository for writing listings into the store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dwell_core::{DwellError, PropertyStatus};

use crate::db::Database;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBuilding {
    pub name: String,
    #[serde(default)]
    pub address: String,
    pub district: String,
    #[serde(default)]
    pub city: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProperty {
    #[serde(default)]
    pub unit_number: String,
    pub floor: Option<i64>,
    pub area: f64,
    pub bedrooms: u32,
    pub bathrooms: u32,
    #[serde(default)]
    pub balcony: bool,
    #[serde(default)]
    pub terrace: bool,
    #[serde(default)]
    pub furnished: bool,
    #[serde(default)]
    pub pet_friendly: bool,
    pub price: f64,
    pub monthly_fee: Option<f64>,
    pub status: PropertyStatus,
}

pub struct ListingRepository {
    db: Arc<Database>,
}

impl ListingRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Store a building and return its generated id.
    pub fn add_building(&self, building: &NewBuilding) -> Result<String, DwellError> {
        let id = Uuid::new_v4().to_string();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO building (id, name, address, district, city)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    id,
                    building.name,
                    building.address,
                    building.district,
                    building.city,
                ],
            )
            .map_err(|e| DwellError::Storage(format!("Failed to save building: {}", e)))?;
            Ok(())
        })?;
        Ok(id)
    }

    /// Store a unit inside `building_id` and return its generated id.
    pub fn add_property(
        &self,
        building_id: &str,
        property: &NewProperty,
    ) -> Result<String, DwellError> {
        let id = Uuid::new_v4().to_string();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO property (id, building_id, unit_number, floor, area, bedrooms,
                     bathrooms, balcony, terrace, furnished, pet_friendly, price, monthly_fee, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                rusqlite::params![
                    id,
                    building_id,
                    property.unit_number,
                    property.floor,
                    property.area,
                    property.bedrooms,
                    property.bathrooms,
                    property.balcony,
                    property.terrace,
                    property.furnished,
                    property.pet_friendly,
                    property.price,
                    property.monthly_fee,
                    property.status.as_str(),
                ],
            )
            .map_err(|e| DwellError::Storage(format!("Failed to save property: {}", e)))?;
            Ok(())
        })?;
        Ok(id)
    }

    pub fn count_properties(&self) -> Result<u64, DwellError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM property", [], |row| row.get(0))
                .map_err(|e| DwellError::Storage(e.to_string()))?;
            Ok(count.max(0) as u64)
        })
    }
}
