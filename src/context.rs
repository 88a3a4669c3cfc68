//! Per-request execution context.
//!
//! A request owns one [`ExecutionContext`]: the mapping from named
//! inputs to values that agents draw their declared inputs from. It is
//! created at the start of each request and never shared across
//! concurrent requests.

use std::collections::{BTreeMap, BTreeSet};

/// Context field carrying the dataset summary (name + columns).
pub const FIELD_DATASET: &str = "dataset";

/// Context field carrying the current goal text.
pub const FIELD_GOAL: &str = "goal";

/// Context field carrying the serialized agent descriptions.
/// The capitalized spelling is part of the agent-facing contract.
pub const FIELD_AGENT_DESC: &str = "Agent_desc";

/// The per-request key→value store supplying each agent's inputs.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    fields: BTreeMap<String, String>,
}

impl ExecutionContext {
    /// Build a fresh context from the three standard inputs.
    pub fn new(dataset_summary: String, goal: String, agent_desc: String) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(FIELD_DATASET.to_string(), dataset_summary);
        fields.insert(FIELD_GOAL.to_string(), goal);
        fields.insert(FIELD_AGENT_DESC.to_string(), agent_desc);
        Self { fields }
    }

    /// The set of field names this context can supply.
    pub fn supplied_fields() -> BTreeSet<String> {
        [FIELD_DATASET, FIELD_GOAL, FIELD_AGENT_DESC]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn goal(&self) -> &str {
        self.get(FIELD_GOAL).unwrap_or_default()
    }

    /// Project the context down to exactly the given fields.
    ///
    /// Extra context fields are never passed through. Returns the name
    /// of the first missing field on failure; the caller tags it with
    /// the agent it was projecting for.
    pub fn project(
        &self,
        required: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, String>, String> {
        let mut projected = BTreeMap::new();
        for field in required {
            match self.fields.get(field) {
                Some(value) => {
                    projected.insert(field.clone(), value.clone());
                }
                None => return Err(field.clone()),
            }
        }
        Ok(projected)
    }
}
