use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// The two fields the category mapper needs from any statement row.
pub trait StatementRecord {
    /// Category label assigned by the bank/export source.
    fn raw_category(&self) -> &str;
    /// Free-text transaction description.
    fn description(&self) -> &str;
}

/// Hand-authored mapping from budget labels to the bank's raw categories.
///
/// Declaration order is significant: when a description ends up under more
/// than one budget label, the later declaration wins (see
/// [`BudgetIndex::category_for`]).
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryMapping {
    #[serde(default = "default_version")]
    pub version: u32,
    pub categories: Vec<CategoryRule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryRule {
    /// Household budget label, e.g. "Проезд".
    pub budget: String,
    /// Raw source categories assigned to this label.
    #[serde(default)]
    pub raw: Vec<String>,
}

fn default_version() -> u32 {
    1
}

impl CategoryMapping {
    pub fn new(rules: impl IntoIterator<Item = (&'static str, Vec<&'static str>)>) -> Self {
        Self {
            version: 1,
            categories: rules
                .into_iter()
                .map(|(budget, raw)| CategoryRule {
                    budget: budget.to_string(),
                    raw: raw.into_iter().map(str::to_string).collect(),
                })
                .collect(),
        }
    }

    /// Loads a mapping override from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("cannot read mapping file {}", path.as_ref().display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("invalid mapping file {}", path.as_ref().display()))
    }
}

/// Groups the distinct descriptions seen under each raw source category.
pub fn raw_category_index<R: StatementRecord>(records: &[R]) -> HashMap<String, BTreeSet<String>> {
    let mut index: HashMap<String, BTreeSet<String>> = HashMap::new();
    for record in records {
        index
            .entry(record.raw_category().to_string())
            .or_default()
            .insert(record.description().to_string());
    }
    index
}

/// Budget label -> description set, in mapping declaration order.
#[derive(Debug, Default)]
pub struct BudgetIndex {
    entries: Vec<(String, BTreeSet<String>)>,
}

impl BudgetIndex {
    /// Expands the raw-category index through the mapping table.
    ///
    /// Raw categories absent from the table are dropped; budget labels that
    /// end up with no descriptions are omitted.
    pub fn build<R: StatementRecord>(records: &[R], mapping: &CategoryMapping) -> Self {
        let raw_index = raw_category_index(records);

        let mut entries = Vec::new();
        for rule in &mapping.categories {
            let mut descriptions = BTreeSet::new();
            for raw in &rule.raw {
                if let Some(seen) = raw_index.get(raw.as_str()) {
                    descriptions.extend(seen.iter().cloned());
                }
            }
            if !descriptions.is_empty() {
                entries.push((rule.budget.clone(), descriptions));
            }
        }

        tracing::debug!(
            raw_categories = raw_index.len(),
            budget_categories = entries.len(),
            "built budget category index"
        );
        BudgetIndex { entries }
    }

    /// Budget label for a transaction description, or `""` if unmapped.
    ///
    /// Scans every entry and keeps the last hit: a description listed under
    /// two budget labels resolves to the later declaration.
    pub fn category_for(&self, description: &str) -> &str {
        let mut found = "";
        for (budget, descriptions) in &self.entries {
            if descriptions.contains(description) {
                found = budget;
            }
        }
        found
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
