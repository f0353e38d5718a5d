use anyhow::Result;
use serde::Serialize;

/// Final output record, one per surviving transaction.
///
/// `sum` is signed: negative means expense. The BCS export already states
/// expenses as positive magnitudes, the Tinkoff one is sign-flipped by its
/// projector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedTransaction {
    /// ISO-8601 day, `YYYY-MM-DD`.
    pub date: String,
    pub sum: f64,
    /// Budget label, or `""` when the description is unmapped.
    pub category: String,
    pub comment: String,
}

/// Renders the whole run as one pretty-printed JSON array.
pub fn render(transactions: &[NormalizedTransaction]) -> Result<String> {
    Ok(serde_json::to_string_pretty(transactions)?)
}
