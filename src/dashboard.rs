use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::checks;
use crate::error::DashboardError;
use crate::financials::{self, DEFAULT_PAGE_SIZE};
use crate::models::{CheckGroup, FinancialTotals};
use crate::source::DataSource;

/// Latest published result of one pipeline plus its in-flight flag.
struct Slot<T> {
    name: &'static str,
    busy: AtomicBool,
    generation: AtomicU64,
    value: Mutex<Option<T>>,
}

/// Clears the busy flag when a run finishes or is dropped mid-flight.
struct RunGuard<'a> {
    busy: &'a AtomicBool,
    generation: u64,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

impl<T: Clone> Slot<T> {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            busy: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            value: Mutex::new(None),
        }
    }

    fn begin(&self) -> Result<RunGuard<'_>, DashboardError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| DashboardError::Busy(self.name))?;
        Ok(RunGuard {
            busy: &self.busy,
            generation: self.generation.load(Ordering::Acquire),
        })
    }

    /// Publishes unless the slot was invalidated after the run started.
    async fn publish(&self, guard: &RunGuard<'_>, value: Option<T>) {
        let mut slot = self.value.lock().await;
        if self.generation.load(Ordering::Acquire) == guard.generation {
            *slot = value;
        } else {
            log::debug!("Discarding stale {} result", self.name);
        }
    }

    async fn invalidate(&self) {
        let mut slot = self.value.lock().await;
        self.generation.fetch_add(1, Ordering::AcqRel);
        *slot = None;
    }

    async fn snapshot(&self) -> Option<T> {
        self.value.lock().await.clone()
    }

    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Entry point for the presentation layer. Each pipeline runs on demand,
/// one run at a time, and publishes into its own slot.
pub struct Dashboard {
    source: Arc<dyn DataSource>,
    page_size: i64,
    totals: Slot<FinancialTotals>,
    checks: Slot<Vec<CheckGroup>>,
}

impl Dashboard {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self {
            source,
            page_size: DEFAULT_PAGE_SIZE,
            totals: Slot::new("financial totals"),
            checks: Slot::new("system check"),
        }
    }

    pub fn with_page_size(mut self, page_size: i64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Drops published results and orphans any run still in flight.
    pub async fn refresh(&self) {
        self.totals.invalidate().await;
        self.checks.invalidate().await;
    }

    pub async fn load_totals(&self) -> Result<FinancialTotals, DashboardError> {
        let guard = self.totals.begin()?;
        match financials::compute_financial_totals(self.source.as_ref(), self.page_size).await {
            Ok(totals) => {
                self.totals.publish(&guard, Some(totals.clone())).await;
                Ok(totals)
            }
            Err(err) => {
                self.totals.publish(&guard, None).await;
                Err(err.into())
            }
        }
    }

    pub async fn load_checks(&self) -> Result<Vec<CheckGroup>, DashboardError> {
        let guard = self.checks.begin()?;
        match checks::run_system_checks(self.source.as_ref()).await {
            Ok(results) => {
                let groups = checks::group_by_check_type(results);
                self.checks.publish(&guard, Some(groups.clone())).await;
                Ok(groups)
            }
            Err(err) => {
                self.checks.publish(&guard, None).await;
                Err(err.into())
            }
        }
    }

    pub async fn totals(&self) -> Option<FinancialTotals> {
        self.totals.snapshot().await
    }

    pub async fn checks(&self) -> Option<Vec<CheckGroup>> {
        self.checks.snapshot().await
    }

    pub fn totals_in_flight(&self) -> bool {
        self.totals.is_busy()
    }

    pub fn checks_in_flight(&self) -> bool {
        self.checks.is_busy()
    }
}
