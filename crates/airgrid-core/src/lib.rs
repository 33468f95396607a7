//! Workflow services for the airgrid feedback lifecycle.
//!
//! A supervisor's report moves through three states:
//!
//! ```text
//! submit ──► Unassigned ──assign──► Assigned ──submit measurement──► Confirmed
//! ```
//!
//! - [`FeedbackService`]: intake and role-scoped listings
//! - [`AssignmentService`]: binds a report to a working inspector of the same region
//! - [`MeasurementService`]: classifies an inspector's reading, stores it and
//!   confirms the report
//! - [`RosterService`] and [`DirectoryService`]: inspector roster and
//!   read-only lookups
//!
//! Every operation takes the caller's [`Identity`] explicitly and runs its
//! checks and writes in a single store transaction.
//!
//! # Example
//!
//! ```
//! use airgrid_core::{Identity, Services, StoreHandle};
//! use airgrid_store::Store;
//! use airgrid_types::RangeTable;
//!
//! # async fn example() -> airgrid_core::Result<()> {
//! let handle = StoreHandle::new(Store::open_in_memory()?);
//! let services = Services::new(handle, RangeTable::standard());
//!
//! let tasks = services
//!     .feedback
//!     .inspector_tasks(&Identity::inspector(4), None, Default::default())
//!     .await?;
//! assert!(tasks.is_empty());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use airgrid_types::RangeTable;

mod assignment;
mod clock;
mod directory;
mod error;
mod feedback;
mod handle;
mod identity;
mod measurement;
mod retry;
mod roster;

#[cfg(test)]
mod testing;

pub use assignment::{AssignRequest, AssignmentResult, AssignmentService};
pub use directory::DirectoryService;
pub use error::{Error, NotAssignableReason, Result};
pub use feedback::{FeedbackFilter, FeedbackRequest, FeedbackService, Page};
pub use handle::{DEFAULT_ACQUIRE_TIMEOUT, StoreHandle};
pub use identity::{Identity, Role};
pub use measurement::{MeasurementRequest, MeasurementResult, MeasurementService};
pub use retry::{RetryConfig, with_retry};
pub use roster::{InspectorRequest, RosterService};

/// All workflow services over one store and one range table.
#[derive(Clone)]
pub struct Services {
    pub feedback: FeedbackService,
    pub assignment: AssignmentService,
    pub measurement: MeasurementService,
    pub roster: RosterService,
    pub directory: DirectoryService,
}

impl Services {
    pub fn new(store: StoreHandle, ranges: RangeTable) -> Self {
        let ranges = Arc::new(ranges);
        Self {
            feedback: FeedbackService::new(store.clone()),
            assignment: AssignmentService::new(store.clone()),
            measurement: MeasurementService::new(store.clone(), Arc::clone(&ranges)),
            roster: RosterService::new(store.clone()),
            directory: DirectoryService::new(store, ranges),
        }
    }
}
