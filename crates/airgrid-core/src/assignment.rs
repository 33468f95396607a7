//! Binding unassigned feedback to a field inspector.

use serde::{Deserialize, Serialize};
use time::{Date, Time};
use tracing::info;

use airgrid_store::Store;
use airgrid_types::FeedbackState;

use crate::clock;
use crate::error::{Error, NotAssignableReason, Result};
use crate::handle::StoreHandle;
use crate::identity::Identity;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignRequest {
    pub feedback_id: i64,
    pub inspector_id: i64,
    #[serde(default)]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentResult {
    pub feedback_id: i64,
    pub inspector_id: i64,
    #[serde(with = "airgrid_types::wire::date")]
    pub assign_date: Date,
    #[serde(with = "airgrid_types::wire::time_of_day")]
    pub assign_time: Time,
}

/// Assigns feedback to inspectors on behalf of administrators.
#[derive(Clone)]
pub struct AssignmentService {
    store: StoreHandle,
}

impl AssignmentService {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Bind an unassigned feedback to a working inspector of the same region.
    ///
    /// Checks run in one transaction, in this order:
    ///
    /// 1. the feedback exists and is unassigned
    ///    ([`Error::FeedbackNotAssignable`], or
    ///    [`Error::InvalidStateTransition`] once confirmed)
    /// 2. the inspector exists and is working ([`Error::InspectorUnavailable`])
    /// 3. province and city match ([`Error::RegionMismatch`])
    ///
    /// Of two concurrent calls for the same feedback exactly one succeeds.
    #[tracing::instrument(level = "info", skip_all, fields(caller = %caller, feedback_id = request.feedback_id, inspector_id = request.inspector_id))]
    pub async fn assign(&self, caller: &Identity, request: AssignRequest) -> Result<AssignmentResult> {
        caller.require_admin()?;

        let result = self
            .store
            .run("assign", |store| assign_in(store, &request))
            .await?;

        info!(
            assign_date = %result.assign_date,
            assign_time = %result.assign_time,
            "Feedback assigned"
        );
        Ok(result)
    }
}

fn assign_in(store: &mut Store, request: &AssignRequest) -> Result<AssignmentResult> {
    let (date, time) = clock::now();
    let feedback_id = request.feedback_id;
    let not_assignable = |reason| Error::FeedbackNotAssignable {
        feedback_id,
        reason,
    };

    let tx = store.transaction()?;

    let feedback = tx
        .feedback(feedback_id)?
        .ok_or(not_assignable(NotAssignableReason::NotFound))?;

    if let Err(e) = feedback.state.transition_to(FeedbackState::Assigned) {
        return Err(if feedback.state.is_terminal() {
            Error::transition(feedback_id, e)
        } else {
            not_assignable(NotAssignableReason::AlreadyAssigned)
        });
    }

    let inspector = tx
        .inspector(request.inspector_id)?
        .filter(|i| i.is_working())
        .ok_or(Error::InspectorUnavailable(request.inspector_id))?;

    if !inspector.covers(feedback.region()) {
        return Err(Error::RegionMismatch {
            feedback_id,
            inspector_id: inspector.id,
            feedback_region: feedback.region(),
            inspector_region: inspector.region(),
        });
    }

    if !tx.mark_assigned(
        feedback_id,
        inspector.id,
        date,
        time,
        request.remarks.as_deref(),
    )? {
        return Err(not_assignable(NotAssignableReason::AlreadyAssigned));
    }
    tx.commit()?;

    Ok(AssignmentResult {
        feedback_id,
        inspector_id: inspector.id,
        assign_date: date,
        assign_time: time,
    })
}
