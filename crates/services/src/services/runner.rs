//! The sync state machine: per-mode exclusive locks, the run pipeline, and
//! mapping of validated rows into local domain upserts.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use db::{
    DBService,
    models::{
        UpsertOutcome,
        inventory::InventoryLevel,
        product::Product,
        receipt::{Receipt, ReceiptData},
        shipment::{Shipment, ShipmentData},
        sync_config::{SyncConfig, SyncConfigError, SyncMode},
        sync_log::SyncLogEntry,
    },
};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use super::{connector, connector::ConnectorError, validator};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("a sync for mode '{0}' is already running")]
    AlreadyRunning(SyncMode),
    #[error("mode '{0}' is not configured: connection host and extraction SQL are required")]
    NotConfigured(SyncMode),
    #[error(transparent)]
    Connector(#[from] ConnectorError),
    #[error("result shape invalid, missing required columns: {}", .0.join(", "))]
    Validation(Vec<String>),
    #[error(transparent)]
    Config(#[from] SyncConfigError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Per-mode lock state. A run is either not happening or happening; a failed
/// run has no state of its own, the outcome lives in the log.
#[derive(Debug, Clone, Copy)]
pub enum LockState {
    Idle,
    Running { since: DateTime<Utc> },
}

/// The three per-mode exclusive locks. Modes are independent: an outbound run
/// never blocks an inventory run.
pub struct SyncLocks {
    states: DashMap<SyncMode, LockState>,
}

impl SyncLocks {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            states: DashMap::new(),
        })
    }

    fn try_acquire(self: &Arc<Self>, mode: SyncMode) -> Option<SyncLockGuard> {
        let mut entry = self.states.entry(mode).or_insert(LockState::Idle);
        match *entry {
            LockState::Running { .. } => None,
            LockState::Idle => {
                *entry = LockState::Running { since: Utc::now() };
                drop(entry);
                Some(SyncLockGuard {
                    locks: Arc::clone(self),
                    mode,
                })
            }
        }
    }

    fn is_running(&self, mode: SyncMode) -> bool {
        self.states
            .get(&mode)
            .map(|state| matches!(*state, LockState::Running { .. }))
            .unwrap_or(false)
    }

    /// Unconditionally return every mode to `Idle`, reporting which modes were
    /// marked running. This does not stop an in-flight run; it only clears the
    /// flag, so using it while a run is genuinely live allows a second run to
    /// start concurrently. Operator escape hatch for a crashed runner.
    fn force_reset(&self) -> Vec<SyncMode> {
        let mut cleared = Vec::new();
        for mode in SyncMode::ALL {
            let mut entry = self.states.entry(mode).or_insert(LockState::Idle);
            if matches!(*entry, LockState::Running { .. }) {
                cleared.push(mode);
            }
            *entry = LockState::Idle;
        }
        cleared
    }
}

/// Releases the mode's lock on drop, so the lock always returns to `Idle`
/// whatever happens to the run, panics included.
pub struct SyncLockGuard {
    locks: Arc<SyncLocks>,
    mode: SyncMode,
}

impl Drop for SyncLockGuard {
    fn drop(&mut self) {
        self.locks.states.insert(self.mode, LockState::Idle);
    }
}

/// Lock status for one mode, as exposed to the API.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SyncStatus {
    pub is_syncing: bool,
}

/// Outcome tally of one run. Row-level errors are data here, not failures:
/// a bad row is skipped and recorded, the batch carries on.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunSummary {
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub errors: Vec<String>,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} processed, {} created, {} updated, {} errors",
            self.processed,
            self.created,
            self.updated,
            self.errors.len()
        )
    }
}

/// Drives sync runs for all three modes against one local database.
#[derive(Clone)]
pub struct SyncService {
    pub db: DBService,
    locks: Arc<SyncLocks>,
}

impl SyncService {
    pub fn new(db: DBService) -> Self {
        Self {
            db,
            locks: SyncLocks::new(),
        }
    }

    pub fn status(&self, mode: SyncMode) -> SyncStatus {
        SyncStatus {
            is_syncing: self.locks.is_running(mode),
        }
    }

    /// Acquire the mode's lock or reject immediately. No queueing, no retry.
    pub fn try_start(&self, mode: SyncMode) -> Result<SyncLockGuard, SyncError> {
        self.locks
            .try_acquire(mode)
            .ok_or(SyncError::AlreadyRunning(mode))
    }

    /// Start an asynchronous run. Returns as soon as the lock is held; the
    /// outcome is observable through the mode's log and `status`.
    pub fn sync_now(&self, mode: SyncMode) -> Result<(), SyncError> {
        let guard = self.try_start(mode)?;
        let service = self.clone();
        tokio::spawn(async move {
            let _guard = guard;
            match service.execute(mode).await {
                Ok(summary) => {
                    info!(%mode, processed = summary.processed, "sync run finished")
                }
                Err(e) => warn!(%mode, error = %e, "sync run failed"),
            }
        });
        Ok(())
    }

    /// Run a sync to completion on the caller's task. Same locking semantics
    /// as [`Self::sync_now`].
    pub async fn run_blocking(&self, mode: SyncMode) -> Result<RunSummary, SyncError> {
        let _guard = self.try_start(mode)?;
        self.execute(mode).await
    }

    /// Clear every mode's lock unconditionally and note it in the affected
    /// logs. See [`SyncLocks::force_reset`] for the caveat about live runs.
    pub async fn force_reset(&self) {
        for mode in self.locks.force_reset() {
            self.log(mode, "sync lock force-reset by operator while a run was marked in progress")
                .await;
        }
    }

    /// The pipeline body. The caller holds the mode's lock.
    async fn execute(&self, mode: SyncMode) -> Result<RunSummary, SyncError> {
        let config = SyncConfig::get_or_default(&self.db.pool, mode).await?;
        if !config.is_configured() {
            self.log(mode, "sync aborted: connection and extraction SQL are not configured")
                .await;
            return Err(SyncError::NotConfigured(mode));
        }

        self.log(mode, "sync started").await;

        let rows = match connector::run_query(&config.connection, &config.sql, None).await {
            Ok(rows) => rows,
            Err(e) => {
                // Driver message logged verbatim to aid operator debugging.
                self.log(mode, &format!("sync failed: {e}")).await;
                return Err(e.into());
            }
        };

        let report = validator::validate(&rows, mode);
        if !report.valid {
            self.log(
                mode,
                &format!("validation failed: {}", report.errors.join(", ")),
            )
            .await;
            return Err(SyncError::Validation(report.errors));
        }
        if !report.warnings.is_empty() {
            self.log(
                mode,
                &format!("optional columns absent: {}", report.warnings.join(", ")),
            )
            .await;
        }

        let summary = self.apply_rows(mode, &rows).await;
        for error in &summary.errors {
            self.log(mode, &format!("row skipped: {error}")).await;
        }
        self.log(mode, &format!("sync finished: {summary}")).await;

        Ok(summary)
    }

    /// Upsert validated rows into the mode's local target. Each row stands
    /// alone: a mapping or write failure is recorded and the row skipped.
    pub(crate) async fn apply_rows(
        &self,
        mode: SyncMode,
        rows: &[Map<String, Value>],
    ) -> RunSummary {
        let mut summary = RunSummary::default();

        for (index, row) in rows.iter().enumerate() {
            summary.processed += 1;
            let outcome = match mode {
                SyncMode::Outbound => self.apply_outbound(row).await,
                SyncMode::Inbound => self.apply_inbound(row).await,
                SyncMode::Inventory => self.apply_inventory(mode, row).await,
            };
            match outcome {
                Ok(UpsertOutcome::Created) => summary.created += 1,
                Ok(UpsertOutcome::Updated) => summary.updated += 1,
                Err(e) => summary.errors.push(format!("row {}: {e}", index + 1)),
            }
        }

        summary
    }

    async fn apply_outbound(&self, row: &Map<String, Value>) -> Result<UpsertOutcome, RowError> {
        let data = ShipmentData {
            outbound_id: opt_string(row, "outbound_id"),
            product_model: require_string(row, "product_model")?,
            product_name: require_string(row, "product_name")?,
            quantity: require_i64(row, "quantity")?,
            customer_name: require_string(row, "customer_name")?,
            outbound_date: require_date(row, "outbound_date")?,
            unit_price: opt_f64(row, "unit_price"),
            warehouse: opt_string(row, "warehouse"),
            customer_code: opt_string(row, "customer_code"),
            product_type: opt_string(row, "product_type"),
        };
        Ok(Shipment::upsert(&self.db.pool, &data).await?)
    }

    async fn apply_inbound(&self, row: &Map<String, Value>) -> Result<UpsertOutcome, RowError> {
        let data = ReceiptData {
            entry_id: opt_string(row, "entry_id"),
            product_model: require_string(row, "product_model")?,
            product_name: require_string(row, "product_name")?,
            quantity: require_i64(row, "quantity")?,
            arrival_date: require_date(row, "arrival_date")?,
            supplier: require_string(row, "supplier")?,
            unit_price: opt_f64(row, "unit_price"),
            warehouse: opt_string(row, "warehouse"),
        };
        Ok(Receipt::upsert(&self.db.pool, &data).await?)
    }

    async fn apply_inventory(
        &self,
        mode: SyncMode,
        row: &Map<String, Value>,
    ) -> Result<UpsertOutcome, RowError> {
        let warehouse = require_string(row, "warehouse")?;
        let product_model = require_string(row, "product_model")?;
        let quantity = require_i64(row, "quantity")?;
        let product_name = opt_string(row, "product_name");

        // Inventory is allowed to introduce unknown models; the auto-created
        // catalog entry is an explicit, logged side effect.
        if Product::ensure_exists(&self.db.pool, &product_model, product_name.as_deref()).await? {
            self.log(
                mode,
                &format!("auto-created catalog entry for unknown product model '{product_model}'"),
            )
            .await;
        }

        Ok(InventoryLevel::upsert_snapshot(&self.db.pool, &warehouse, &product_model, quantity)
            .await?)
    }

    async fn log(&self, mode: SyncMode, message: &str) {
        if let Err(e) = SyncLogEntry::append(&self.db.pool, mode, message).await {
            warn!(%mode, error = %e, "failed to append sync log line");
        }
    }
}

/// A single row failed to convert or write. Recorded, never fatal to the run.
#[derive(Debug, Error)]
enum RowError {
    #[error("{0}")]
    Mapping(String),
    #[error("write failed: {0}")]
    Write(#[from] sqlx::Error),
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn opt_string(row: &Map<String, Value>, column: &str) -> Option<String> {
    row.get(column).and_then(value_as_string)
}

fn require_string(row: &Map<String, Value>, column: &str) -> Result<String, RowError> {
    opt_string(row, column)
        .ok_or_else(|| RowError::Mapping(format!("column '{column}' is empty")))
}

fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|u| u as i64))
            .or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().map(|f| f as i64))
        }
        _ => None,
    }
}

fn require_i64(row: &Map<String, Value>, column: &str) -> Result<i64, RowError> {
    row.get(column).and_then(value_as_i64).ok_or_else(|| {
        RowError::Mapping(format!("column '{column}' is not a number"))
    })
}

fn opt_f64(row: &Map<String, Value>, column: &str) -> Option<f64> {
    match row.get(column) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let trimmed = s.trim();
    // DATETIME strings carry a time suffix; the first ten characters are the date.
    let head = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(head, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(head, "%Y/%m/%d"))
        .ok()
}

fn require_date(row: &Map<String, Value>, column: &str) -> Result<NaiveDate, RowError> {
    row.get(column)
        .and_then(value_as_string)
        .as_deref()
        .and_then(parse_date)
        .ok_or_else(|| RowError::Mapping(format!("column '{column}' is not a valid date")))
}
