//! Feedback intake and listings.

use serde::{Deserialize, Serialize};
use tracing::info;

use airgrid_store::{FeedbackQuery, NewFeedback};
use airgrid_types::{Feedback, FeedbackState, Region, is_valid_grade};

use crate::clock;
use crate::error::{Error, Result};
use crate::handle::StoreHandle;
use crate::identity::Identity;

/// A supervisor's incident report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub province_id: i64,
    pub city_id: i64,
    pub address: String,
    pub description: String,
    /// Reporter's severity estimate, `1..=6`.
    pub estimated_grade: i64,
}

impl FeedbackRequest {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidFeedbackInput(msg));

        if !Region::new(self.province_id, self.city_id).is_well_formed() {
            return invalid("province and city must be positive ids".to_string());
        }
        if self.address.trim().is_empty() {
            return invalid("address must not be empty".to_string());
        }
        if self.description.trim().is_empty() {
            return invalid("description must not be empty".to_string());
        }
        if !is_valid_grade(self.estimated_grade) {
            return invalid(format!(
                "estimated grade must be between 1 and 6, got {}",
                self.estimated_grade
            ));
        }
        Ok(())
    }
}

/// Pagination for listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl Page {
    fn apply(self, mut query: FeedbackQuery) -> FeedbackQuery {
        query.limit = self.limit;
        query.offset = self.offset;
        query
    }
}

/// Administrator listing filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackFilter {
    pub province_id: Option<i64>,
    pub city_id: Option<i64>,
    pub state: Option<FeedbackState>,
}

/// Supervisor intake plus role-scoped feedback listings.
#[derive(Clone)]
pub struct FeedbackService {
    store: StoreHandle,
}

impl FeedbackService {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Store a new unassigned report. The region must be a known
    /// (province, city) pair.
    #[tracing::instrument(level = "info", skip_all, fields(caller = %caller))]
    pub async fn submit(&self, caller: &Identity, request: FeedbackRequest) -> Result<Feedback> {
        let reporter = caller.require_supervisor()?;
        request.validate()?;

        let feedback = self
            .store
            .run("submit_feedback", |store| {
                let region = Region::new(request.province_id, request.city_id);
                if !store.region_exists(region)? {
                    return Err(Error::InvalidFeedbackInput(format!("unknown region {region}")));
                }

                let (date, time) = clock::now();
                Ok(store.insert_feedback(&NewFeedback {
                    reporter: reporter.to_string(),
                    province_id: request.province_id,
                    city_id: request.city_id,
                    address: request.address.trim().to_string(),
                    description: request.description.trim().to_string(),
                    estimated_grade: request.estimated_grade as u8,
                    submitted_date: date,
                    submitted_time: time,
                })?)
            })
            .await?;

        info!(feedback_id = feedback.id, "Feedback submitted");
        Ok(feedback)
    }

    /// The caller's own reports, newest first.
    pub async fn list_own(&self, caller: &Identity, page: Page) -> Result<Vec<Feedback>> {
        let reporter = caller.require_supervisor()?;
        let query = page.apply(FeedbackQuery::new().reporter(reporter));
        self.query("list_own_feedback", query).await
    }

    /// Every report, newest first, optionally filtered.
    pub async fn list_all(
        &self,
        caller: &Identity,
        filter: FeedbackFilter,
        page: Page,
    ) -> Result<Vec<Feedback>> {
        caller.require_admin()?;

        let mut query = FeedbackQuery::new();
        query.province_id = filter.province_id;
        query.city_id = filter.city_id;
        query.state = filter.state;
        self.query("list_feedback", page.apply(query)).await
    }

    /// Feedback assigned to the calling inspector, pending work first.
    ///
    /// `state` may narrow the list to `Assigned` or `Confirmed`.
    pub async fn inspector_tasks(
        &self,
        caller: &Identity,
        state: Option<FeedbackState>,
        page: Page,
    ) -> Result<Vec<Feedback>> {
        let inspector_id = caller.require_inspector()?;

        let mut query = FeedbackQuery::new()
            .inspector(inspector_id)
            .assigned_only()
            .order_by_state();
        match state {
            Some(FeedbackState::Unassigned) => {
                return Err(Error::InvalidFeedbackInput(
                    "task state filter must be Assigned or Confirmed".to_string(),
                ));
            }
            Some(s) => query = query.state(s),
            None => {}
        }
        self.query("inspector_tasks", page.apply(query)).await
    }

    async fn query(&self, operation: &str, query: FeedbackQuery) -> Result<Vec<Feedback>> {
        self.store
            .run(operation, |store| Ok(store.query_feedback(&query)?))
            .await
    }
}
