//! Inspector roster maintenance for administrators.

use serde::{Deserialize, Serialize};
use tracing::info;

use airgrid_store::NewInspector;
use airgrid_types::{Availability, Inspector, Region};

use crate::error::{Error, Result};
use crate::handle::StoreHandle;
use crate::identity::Identity;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectorRequest {
    pub name: String,
    /// Login code, unique across the roster.
    pub code: String,
    pub province_id: i64,
    pub city_id: i64,
    #[serde(default)]
    pub tel: String,
    #[serde(default)]
    pub remarks: Option<String>,
}

impl InspectorRequest {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() || self.code.trim().is_empty() {
            return Err(Error::InvalidInspectorInput(
                "name and code must not be empty".to_string(),
            ));
        }
        if !Region::new(self.province_id, self.city_id).is_well_formed() {
            return Err(Error::InvalidInspectorInput(
                "province and city must be positive ids".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct RosterService {
    store: StoreHandle,
}

impl RosterService {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Register a working inspector for a known region.
    pub async fn register(&self, caller: &Identity, request: InspectorRequest) -> Result<Inspector> {
        caller.require_admin()?;
        request.validate()?;

        let inspector = self
            .store
            .run("register_inspector", |store| {
                let region = Region::new(request.province_id, request.city_id);
                if !store.region_exists(region)? {
                    return Err(Error::InvalidInspectorInput(format!("unknown region {region}")));
                }
                Ok(store.insert_inspector(&NewInspector {
                    name: request.name.trim().to_string(),
                    code: request.code.trim().to_string(),
                    province_id: request.province_id,
                    city_id: request.city_id,
                    tel: request.tel.trim().to_string(),
                    availability: Availability::Working,
                    remarks: request.remarks.clone(),
                })?)
            })
            .await?;

        info!(inspector_id = inspector.id, region = %inspector.region(), "Inspector registered");
        Ok(inspector)
    }

    pub async fn list(&self, caller: &Identity, region: Option<Region>) -> Result<Vec<Inspector>> {
        caller.require_admin()?;
        self.store
            .run("list_inspectors", |store| Ok(store.list_inspectors(region)?))
            .await
    }

    /// Mark an inspector working or inactive. Inactive inspectors keep their
    /// current assignments but receive no new ones.
    pub async fn set_availability(
        &self,
        caller: &Identity,
        inspector_id: i64,
        availability: Availability,
    ) -> Result<Inspector> {
        caller.require_admin()?;

        let inspector = self
            .store
            .run("set_inspector_availability", |store| {
                if !store.set_inspector_availability(inspector_id, availability)? {
                    return Err(Error::InspectorNotFound(inspector_id));
                }
                store
                    .get_inspector(inspector_id)?
                    .ok_or(Error::InspectorNotFound(inspector_id))
            })
            .await?;

        info!(inspector_id, %availability, "Inspector availability changed");
        Ok(inspector)
    }
}
