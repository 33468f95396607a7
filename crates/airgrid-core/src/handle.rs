//! Shared, bounded access to the store.

use std::sync::Arc;
use std::time::Duration;

use airgrid_store::Store;
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::error::{Error, Result};
use crate::retry::{RetryConfig, with_retry};

/// Default time to wait for the store before reporting it unavailable.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(2);

/// Cloneable handle to the one [`Store`] opened at startup.
///
/// Every operation acquires the store with a timeout. Expiry and SQLite
/// busy errors both surface as [`Error::StoreUnavailable`], which is retried
/// according to the handle's [`RetryConfig`].
#[derive(Clone)]
pub struct StoreHandle {
    store: Arc<Mutex<Store>>,
    acquire_timeout: Duration,
    retry: RetryConfig,
}

impl StoreHandle {
    pub fn new(store: Store) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            retry: RetryConfig::default(),
        }
    }

    #[must_use]
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    #[must_use]
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Run `f` with exclusive access to the store.
    ///
    /// `f` may run more than once if an attempt fails with
    /// [`Error::StoreUnavailable`], so it must not have effects outside the
    /// store transaction it opens.
    pub async fn run<T, F>(&self, operation: &str, f: F) -> Result<T>
    where
        F: Fn(&mut Store) -> Result<T> + Sync,
        T: Send,
    {
        let f = &f;
        let this = self;
        with_retry(&self.retry, operation, || async move {
            let mut store = timeout(this.acquire_timeout, this.store.lock())
                .await
                .map_err(|_| {
                    Error::StoreUnavailable(format!(
                        "{operation}: store not acquired within {:?}",
                        this.acquire_timeout
                    ))
                })?;
            f(&mut store)
        })
        .await
    }

    #[cfg(test)]
    pub(crate) async fn lock(&self) -> tokio::sync::MutexGuard<'_, Store> {
        self.store.lock().await
    }
}
