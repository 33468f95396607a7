//! Query builders for feedback and measurement listings.
//!
//! Both builders follow the same pattern: every filter is optional, filters
//! combine with `AND`, and pagination is applied after ordering.
//!
//! # Example
//!
//! ```
//! use airgrid_store::{FeedbackQuery, MeasurementQuery, Store};
//! use airgrid_types::FeedbackState;
//!
//! let store = Store::open_in_memory()?;
//!
//! // An inspector's open tasks, pending work first
//! let tasks = store.query_feedback(
//!     &FeedbackQuery::new()
//!         .inspector(4)
//!         .state(FeedbackState::Assigned)
//!         .order_by_state(),
//! )?;
//!
//! // Latest confirmed measurements in a city
//! let recent = store.query_measurements(&MeasurementQuery::new().city(1).limit(20))?;
//! # Ok::<(), airgrid_store::Error>(())
//! ```

use time::Date;

use airgrid_types::FeedbackState;
use airgrid_types::wire::format_date;

pub(crate) const FEEDBACK_COLUMNS: &str = "id, reporter, province_id, city_id, address, \
     description, estimated_grade, submitted_date, submitted_time, inspector_id, \
     assign_date, assign_time, remarks, state";

pub(crate) const MEASUREMENT_COLUMNS: &str = "id, province_id, city_id, address, so2_value, \
     so2_level, co_value, co_level, spm_value, spm_level, overall_level, confirm_date, \
     confirm_time, inspector_id, feedback_id, reporter, notes, remarks";

type Params = Vec<Box<dyn rusqlite::ToSql>>;

/// Result ordering for [`FeedbackQuery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedbackOrder {
    /// Most recently submitted first.
    #[default]
    NewestFirst,
    /// Oldest submission first.
    OldestFirst,
    /// Lowest lifecycle state first, newest first within a state.
    StateThenNewest,
}

/// Fluent query builder for feedback records.
///
/// Use this with [`Store::query_feedback`](crate::Store::query_feedback).
#[derive(Debug, Default, Clone)]
pub struct FeedbackQuery {
    /// Filter by reporting supervisor.
    pub reporter: Option<String>,
    /// Filter by assigned inspector.
    pub inspector_id: Option<i64>,
    pub province_id: Option<i64>,
    pub city_id: Option<i64>,
    /// Filter by exact state.
    pub state: Option<FeedbackState>,
    /// Exclude unassigned records.
    pub assigned_only: bool,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub order: FeedbackOrder,
}

impl FeedbackQuery {
    /// Create a query matching every record, newest first.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reporter(mut self, reporter: &str) -> Self {
        self.reporter = Some(reporter.to_string());
        self
    }

    pub fn inspector(mut self, inspector_id: i64) -> Self {
        self.inspector_id = Some(inspector_id);
        self
    }

    pub fn province(mut self, province_id: i64) -> Self {
        self.province_id = Some(province_id);
        self
    }

    pub fn city(mut self, city_id: i64) -> Self {
        self.city_id = Some(city_id);
        self
    }

    pub fn state(mut self, state: FeedbackState) -> Self {
        self.state = Some(state);
        self
    }

    /// Only records that have been assigned (state `Assigned` or later).
    pub fn assigned_only(mut self) -> Self {
        self.assigned_only = true;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn oldest_first(mut self) -> Self {
        self.order = FeedbackOrder::OldestFirst;
        self
    }

    /// Order by lifecycle state, so pending work sorts before finished work.
    pub fn order_by_state(mut self) -> Self {
        self.order = FeedbackOrder::StateThenNewest;
        self
    }

    pub(crate) fn build_where(&self) -> (String, Params) {
        let mut conditions = Vec::new();
        let mut params: Params = Vec::new();

        if let Some(ref reporter) = self.reporter {
            conditions.push("reporter = ?");
            params.push(Box::new(reporter.clone()));
        }

        if let Some(inspector_id) = self.inspector_id {
            conditions.push("inspector_id = ?");
            params.push(Box::new(inspector_id));
        }

        if let Some(province_id) = self.province_id {
            conditions.push("province_id = ?");
            params.push(Box::new(province_id));
        }

        if let Some(city_id) = self.city_id {
            conditions.push("city_id = ?");
            params.push(Box::new(city_id));
        }

        if let Some(state) = self.state {
            conditions.push("state = ?");
            params.push(Box::new(state.code()));
        }

        if self.assigned_only {
            conditions.push("state > 0");
        }

        (where_clause(&conditions), params)
    }

    pub(crate) fn build_sql(&self) -> String {
        let (where_clause, _) = self.build_where();
        let order = match self.order {
            FeedbackOrder::NewestFirst => "submitted_date DESC, submitted_time DESC, id DESC",
            FeedbackOrder::OldestFirst => "submitted_date ASC, submitted_time ASC, id ASC",
            FeedbackOrder::StateThenNewest => "state ASC, id DESC",
        };

        let mut sql = format!(
            "SELECT {FEEDBACK_COLUMNS} FROM feedback {where_clause} ORDER BY {order}"
        );
        push_pagination(&mut sql, self.limit, self.offset);
        sql
    }
}

/// Fluent query builder for confirmed measurements.
///
/// Results are ordered by confirmation time, newest first unless
/// [`oldest_first`](Self::oldest_first) is set.
#[derive(Debug, Default, Clone)]
pub struct MeasurementQuery {
    pub province_id: Option<i64>,
    pub city_id: Option<i64>,
    pub inspector_id: Option<i64>,
    /// Confirmed on or after this date.
    pub since: Option<Date>,
    /// Confirmed on or before this date.
    pub until: Option<Date>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub newest_first: bool,
}

impl MeasurementQuery {
    pub fn new() -> Self {
        Self {
            newest_first: true,
            ..Default::default()
        }
    }

    pub fn province(mut self, province_id: i64) -> Self {
        self.province_id = Some(province_id);
        self
    }

    pub fn city(mut self, city_id: i64) -> Self {
        self.city_id = Some(city_id);
        self
    }

    pub fn inspector(mut self, inspector_id: i64) -> Self {
        self.inspector_id = Some(inspector_id);
        self
    }

    pub fn since(mut self, date: Date) -> Self {
        self.since = Some(date);
        self
    }

    pub fn until(mut self, date: Date) -> Self {
        self.until = Some(date);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn oldest_first(mut self) -> Self {
        self.newest_first = false;
        self
    }

    pub(crate) fn build_where(&self) -> (String, Params) {
        let mut conditions = Vec::new();
        let mut params: Params = Vec::new();

        if let Some(province_id) = self.province_id {
            conditions.push("province_id = ?");
            params.push(Box::new(province_id));
        }

        if let Some(city_id) = self.city_id {
            conditions.push("city_id = ?");
            params.push(Box::new(city_id));
        }

        if let Some(inspector_id) = self.inspector_id {
            conditions.push("inspector_id = ?");
            params.push(Box::new(inspector_id));
        }

        // YYYY-MM-DD compares correctly as text.
        if let Some(since) = self.since {
            conditions.push("confirm_date >= ?");
            params.push(Box::new(format_date(since)));
        }

        if let Some(until) = self.until {
            conditions.push("confirm_date <= ?");
            params.push(Box::new(format_date(until)));
        }

        (where_clause(&conditions), params)
    }

    pub(crate) fn build_sql(&self) -> String {
        let (where_clause, _) = self.build_where();
        let order = if self.newest_first { "DESC" } else { "ASC" };

        let mut sql = format!(
            "SELECT {MEASUREMENT_COLUMNS} FROM measurements {where_clause} \
             ORDER BY confirm_date {order}, confirm_time {order}, id {order}"
        );
        push_pagination(&mut sql, self.limit, self.offset);
        sql
    }
}

fn where_clause(conditions: &[&str]) -> String {
    if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    }
}

fn push_pagination(sql: &mut String, limit: Option<u32>, offset: Option<u32>) {
    match (limit, offset) {
        (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
        (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
        // SQLite only accepts OFFSET after a LIMIT.
        (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
        (None, None) => {}
    }
}
