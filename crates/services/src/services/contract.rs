//! Column contracts: the output shape a mode's extraction SQL must satisfy.

pub use db::models::sync_config::SyncMode;

/// Required and optional column names for one sync mode. Compiled-in; the
/// extraction SQL is operator-authored, so satisfying the contract is a
/// runtime invariant checked by the validator before any write.
#[derive(Debug, Clone, Copy)]
pub struct ColumnContract {
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
}

const OUTBOUND: ColumnContract = ColumnContract {
    required: &[
        "outbound_id",
        "product_model",
        "product_name",
        "quantity",
        "customer_name",
        "outbound_date",
    ],
    optional: &["unit_price", "warehouse", "customer_code", "product_type"],
};

const INBOUND: ColumnContract = ColumnContract {
    required: &[
        "entry_id",
        "product_model",
        "product_name",
        "quantity",
        "arrival_date",
        "supplier",
    ],
    optional: &["unit_price", "warehouse"],
};

const INVENTORY: ColumnContract = ColumnContract {
    required: &["warehouse", "product_model", "quantity"],
    optional: &["product_name"],
};

impl ColumnContract {
    pub fn for_mode(mode: SyncMode) -> &'static ColumnContract {
        match mode {
            SyncMode::Outbound => &OUTBOUND,
            SyncMode::Inbound => &INBOUND,
            SyncMode::Inventory => &INVENTORY,
        }
    }
}
