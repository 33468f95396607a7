//! Recording classified measurements and confirming feedback.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use airgrid_store::{NewMeasurement, Store};
use airgrid_types::{Assessment, Classification, FeedbackState, Measurement, RangeTable, Region};

use crate::clock;
use crate::error::{Error, Result};
use crate::handle::StoreHandle;
use crate::identity::Identity;

/// An inspector's on-site reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementRequest {
    /// Feedback this reading confirms. Absent for ad-hoc readings.
    #[serde(default)]
    pub feedback_id: Option<i64>,
    pub province_id: i64,
    pub city_id: i64,
    pub address: String,
    pub so2: i64,
    pub co: i64,
    pub spm: i64,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub remarks: Option<String>,
}

impl MeasurementRequest {
    pub fn region(&self) -> Region {
        Region::new(self.province_id, self.city_id)
    }

    /// Check the request shape before anything is classified or stored.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(Error::InvalidMeasurementInput(msg.to_string()));

        if self.province_id <= 0 || self.city_id <= 0 {
            return invalid("province and city must be positive ids");
        }
        if self.address.trim().is_empty() {
            return invalid("address must not be empty");
        }
        if let Some(id) = self.feedback_id
            && id <= 0
        {
            return invalid("feedback id must be positive");
        }
        for (name, value) in [("so2", self.so2), ("co", self.co), ("spm", self.spm)] {
            if value < 0 {
                return Err(Error::InvalidMeasurementInput(format!(
                    "{name} reading must not be negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementResult {
    pub measurement: Measurement,
    pub classification: Classification,
}

/// Accepts inspector readings.
#[derive(Clone)]
pub struct MeasurementService {
    store: StoreHandle,
    ranges: Arc<RangeTable>,
}

impl MeasurementService {
    pub fn new(store: StoreHandle, ranges: Arc<RangeTable>) -> Self {
        Self { store, ranges }
    }

    /// Validate, classify and store a reading.
    ///
    /// When the request names a feedback, the feedback moves from `Assigned`
    /// to `Confirmed` in the same transaction that stores the measurement.
    /// Only the assigned inspector may confirm it.
    #[tracing::instrument(level = "info", skip_all, fields(caller = %caller, feedback_id = ?request.feedback_id))]
    pub async fn submit(
        &self,
        caller: &Identity,
        request: MeasurementRequest,
    ) -> Result<MeasurementResult> {
        let inspector_id = caller.require_inspector()?;
        request.validate()?;

        let assessment = self
            .ranges
            .assess(request.so2, request.co, request.spm)
            .map_err(|e| {
                error!(
                    target: "airgrid::classification",
                    pollutant = %e.pollutant,
                    value = e.value,
                    "Range table does not cover reading"
                );
                Error::ClassificationFailed(e)
            })?;

        let measurement = self
            .store
            .run("submit_measurement", |store| {
                record(store, inspector_id, &request, &assessment)
            })
            .await?;

        info!(
            measurement_id = measurement.id,
            overall_level = %measurement.overall_level,
            "Measurement recorded"
        );

        Ok(MeasurementResult {
            measurement,
            classification: assessment.classification,
        })
    }
}

fn record(
    store: &mut Store,
    inspector_id: i64,
    request: &MeasurementRequest,
    assessment: &Assessment,
) -> Result<Measurement> {
    let (date, time) = clock::now();
    let tx = store.transaction()?;

    let reporter = match request.feedback_id {
        Some(feedback_id) => {
            let feedback = tx
                .feedback(feedback_id)?
                .ok_or(Error::FeedbackNotFound(feedback_id))?;

            feedback
                .state
                .transition_to(FeedbackState::Confirmed)
                .map_err(|e| Error::transition(feedback_id, e))?;

            let assigned = feedback.inspector_id();
            if assigned != Some(inspector_id) {
                return Err(Error::InspectorMismatch {
                    feedback_id,
                    assigned,
                    caller: inspector_id,
                });
            }

            if request.region() != feedback.region() {
                return Err(Error::InvalidMeasurementInput(format!(
                    "reading is for {} but feedback {feedback_id} is in {}",
                    request.region(),
                    feedback.region()
                )));
            }

            if !tx.mark_confirmed(feedback_id, inspector_id)? {
                return Err(Error::InvalidStateTransition {
                    feedback_id,
                    from: feedback.state,
                    to: FeedbackState::Confirmed,
                });
            }
            Some(feedback.reporter)
        }
        None => {
            if tx.inspector(inspector_id)?.is_none() {
                return Err(Error::InspectorUnavailable(inspector_id));
            }
            None
        }
    };

    let measurement = tx.insert_measurement(&NewMeasurement {
        province_id: request.province_id,
        city_id: request.city_id,
        address: request.address.trim().to_string(),
        so2_value: request.so2,
        co_value: request.co,
        spm_value: request.spm,
        levels: assessment.levels,
        confirm_date: date,
        confirm_time: time,
        inspector_id,
        feedback_id: request.feedback_id,
        reporter,
        notes: request.notes.clone(),
        remarks: request
            .remarks
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string),
    })?;
    tx.commit()?;

    Ok(measurement)
}
