//! Shared fixtures for service tests.

use airgrid_store::{MeasurementQuery, Store};
use airgrid_types::{City, Feedback, Measurement, Province, RangeTable};

use crate::{
    AssignRequest, FeedbackRequest, Identity, InspectorRequest, Services, StoreHandle,
};

pub(crate) const SUPERVISOR: &str = "13800000000";

pub(crate) struct Fixture {
    pub services: Services,
    pub handle: StoreHandle,
    pub admin: Identity,
    pub supervisor: Identity,
}

pub(crate) async fn fixture() -> Fixture {
    fixture_with(RangeTable::standard()).await
}

/// Provinces 1 (cities 1, 2) and 2 (city 5).
pub(crate) async fn fixture_with(ranges: RangeTable) -> Fixture {
    let handle = StoreHandle::new(Store::open_in_memory().unwrap());
    let services = Services::new(handle.clone(), ranges);

    let province = |id: i64, name: &str| Province {
        id,
        name: name.to_string(),
        abbr: String::new(),
    };
    let city = |id: i64, name: &str, province_id: i64| City {
        id,
        name: name.to_string(),
        province_id,
    };
    services
        .directory
        .seed(
            &[province(1, "Liaoning"), province(2, "Jilin")],
            &[
                city(1, "Shenyang", 1),
                city(2, "Dalian", 1),
                city(5, "Changchun", 2),
            ],
        )
        .await
        .unwrap();

    Fixture {
        services,
        handle,
        admin: Identity::admin(1),
        supervisor: Identity::supervisor(SUPERVISOR),
    }
}

impl Fixture {
    pub async fn feedback(&self, province_id: i64, city_id: i64) -> i64 {
        self.services
            .feedback
            .submit(
                &self.supervisor,
                FeedbackRequest {
                    province_id,
                    city_id,
                    address: "North gate".to_string(),
                    description: "Smoke from a chimney".to_string(),
                    estimated_grade: 3,
                },
            )
            .await
            .unwrap()
            .id
    }

    pub async fn inspector(&self, code: &str, province_id: i64, city_id: i64) -> i64 {
        self.services
            .roster
            .register(
                &self.admin,
                InspectorRequest {
                    name: format!("Inspector {code}"),
                    code: code.to_string(),
                    province_id,
                    city_id,
                    tel: String::new(),
                    remarks: None,
                },
            )
            .await
            .unwrap()
            .id
    }

    pub async fn assign(&self, feedback_id: i64, inspector_id: i64) {
        self.services
            .assignment
            .assign(
                &self.admin,
                AssignRequest {
                    feedback_id,
                    inspector_id,
                    remarks: None,
                },
            )
            .await
            .unwrap();
    }

    pub async fn stored_feedback(&self, id: i64) -> Feedback {
        self.handle.lock().await.get_feedback(id).unwrap().unwrap()
    }

    pub async fn measurements(&self) -> Vec<Measurement> {
        self.handle
            .lock()
            .await
            .query_measurements(&MeasurementQuery::new())
            .unwrap()
    }
}
