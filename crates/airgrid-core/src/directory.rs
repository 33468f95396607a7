//! Read-only lookups: regions, the classification table and confirmed
//! measurements.

use std::sync::Arc;

use tracing::info;

use airgrid_store::MeasurementQuery;
use airgrid_types::{City, Measurement, PollutantRange, Province, RangeTable};

use crate::error::Result;
use crate::handle::StoreHandle;

#[derive(Clone)]
pub struct DirectoryService {
    store: StoreHandle,
    ranges: Arc<RangeTable>,
}

impl DirectoryService {
    pub fn new(store: StoreHandle, ranges: Arc<RangeTable>) -> Self {
        Self { store, ranges }
    }

    /// Insert or update the known provinces and cities.
    pub async fn seed(&self, provinces: &[Province], cities: &[City]) -> Result<()> {
        self.store
            .run("seed_regions", |store| {
                for province in provinces {
                    store.upsert_province(province)?;
                }
                for city in cities {
                    store.upsert_city(city)?;
                }
                Ok(())
            })
            .await?;

        info!(
            provinces = provinces.len(),
            cities = cities.len(),
            "Region directory seeded"
        );
        Ok(())
    }

    pub async fn provinces(&self) -> Result<Vec<Province>> {
        self.store
            .run("list_provinces", |store| Ok(store.list_provinces()?))
            .await
    }

    pub async fn cities(&self, province_id: i64) -> Result<Vec<City>> {
        self.store
            .run("list_cities", |store| Ok(store.list_cities(province_id)?))
            .await
    }

    /// Classification levels, lowest first.
    pub fn levels(&self) -> &[PollutantRange] {
        self.ranges.ranges()
    }

    /// Confirmed measurements, newest first unless the query says otherwise.
    pub async fn measurements(&self, query: MeasurementQuery) -> Result<Vec<Measurement>> {
        self.store
            .run("list_measurements", |store| Ok(store.query_measurements(&query)?))
            .await
    }
}
