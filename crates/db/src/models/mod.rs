pub mod inventory;
pub mod product;
pub mod receipt;
pub mod shipment;
pub mod sync_config;
pub mod sync_log;

/// Outcome of a keyed write, reported in sync run summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}
