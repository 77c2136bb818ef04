//! Result-shape validation against a mode's column contract.

use serde::Serialize;
use serde_json::{Map, Value};

use super::contract::{ColumnContract, SyncMode};

/// Verdict on a query result's column shape. `errors` lists missing required
/// columns (or the empty-result reason); `warnings` lists missing optional
/// columns.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Check the first row's key set against the contract for `mode`.
///
/// An empty result set cannot prove column presence, so it is reported as
/// invalid rather than silently passing.
pub fn validate(rows: &[Map<String, Value>], mode: SyncMode) -> ValidationReport {
    let contract = ColumnContract::for_mode(mode);

    let Some(first) = rows.first() else {
        return ValidationReport {
            valid: false,
            errors: vec![
                "query returned no rows; column shape cannot be verified".to_string(),
            ],
            warnings: Vec::new(),
        };
    };

    let errors: Vec<String> = contract
        .required
        .iter()
        .filter(|col| !first.contains_key(**col))
        .map(|col| col.to_string())
        .collect();

    let warnings: Vec<String> = contract
        .optional
        .iter()
        .filter(|col| !first.contains_key(**col))
        .map(|col| col.to_string())
        .collect();

    ValidationReport {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn complete_outbound_row_is_valid() {
        let rows = vec![row(json!({
            "outbound_id": "IN-001",
            "product_model": "SKU1",
            "product_name": "Widget",
            "quantity": 10,
            "customer_name": "Acme",
            "outbound_date": "2024-01-01",
        }))];

        let report = validate(&rows, SyncMode::Outbound);
        assert!(report.valid);
        assert!(report.errors.is_empty());
        // All optional columns absent, so all four are warnings.
        assert_eq!(report.warnings.len(), 4);
    }

    #[test]
    fn missing_required_column_is_reported_by_name() {
        let rows = vec![row(json!({
            "outbound_id": "IN-001",
            "product_model": "SKU1",
            "product_name": "Widget",
            "quantity": 10,
            "outbound_date": "2024-01-01",
        }))];

        let report = validate(&rows, SyncMode::Outbound);
        assert!(!report.valid);
        assert_eq!(report.errors, vec!["customer_name"]);
    }

    #[test]
    fn empty_result_set_is_never_valid() {
        let report = validate(&[], SyncMode::Inventory);
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("no rows"));
    }
}
