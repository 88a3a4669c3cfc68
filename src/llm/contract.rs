//! Prompt contracts and the language-model boundary.
//!
//! Every stage of the pipeline — planner, refiner, analysis agents,
//! combiner — is one [`PromptContract`] invoked through the single
//! [`LanguageModel`] trait, so the underlying provider can be swapped
//! without touching orchestration logic.

use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One named input or output field of a contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    /// Shown to the model to describe what belongs in the field.
    pub desc: String,
}

impl FieldSpec {
    pub fn new(name: &str, desc: &str) -> Self {
        Self {
            name: name.to_string(),
            desc: desc.to_string(),
        }
    }
}

/// A stage's declared contract: instructions plus typed input and
/// output fields. Immutable after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptContract {
    /// Unique identifier; for analysis agents this is the registry key.
    pub name: String,
    /// Free-text instructions describing the stage's job.
    pub instructions: String,
    pub inputs: Vec<FieldSpec>,
    pub outputs: Vec<FieldSpec>,
}

impl PromptContract {
    pub fn new(
        name: &str,
        instructions: &str,
        inputs: Vec<FieldSpec>,
        outputs: Vec<FieldSpec>,
    ) -> Self {
        Self {
            name: name.to_string(),
            instructions: instructions.to_string(),
            inputs,
            outputs,
        }
    }

    /// Render the contract header in `name(in, .. -> out, ..)` form.
    pub fn signature_line(&self) -> String {
        let inputs: Vec<&str> = self.inputs.iter().map(|f| f.name.as_str()).collect();
        let outputs: Vec<&str> = self.outputs.iter().map(|f| f.name.as_str()).collect();
        format!(
            "{}({} -> {})",
            self.name,
            inputs.join(", "),
            outputs.join(", ")
        )
    }

    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.outputs.iter().map(|f| f.name.as_str())
    }
}

/// Parsed output fields of one model invocation.
#[derive(Debug, Clone, Default)]
pub struct StructuredOutput {
    fields: BTreeMap<String, String>,
}

impl StructuredOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: &str, value: String) {
        self.fields.insert(field.to_string(), value);
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Fetch a field the contract promises, failing if absent.
    pub fn require(&self, field: &str) -> Result<&str, LlmError> {
        self.get(field).ok_or_else(|| LlmError::MissingField {
            field: field.to_string(),
        })
    }
}

impl FromIterator<(String, String)> for StructuredOutput {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// The single capability boundary for "ask the model".
///
/// Implementations receive a contract and the exact input set projected
/// for it, and return the contract's output fields.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn invoke(
        &self,
        contract: &PromptContract,
        inputs: &BTreeMap<String, String>,
    ) -> Result<StructuredOutput, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_line() {
        let contract = PromptContract::new(
            "preprocessing_agent",
            "preprocess the data",
            vec![FieldSpec::new("dataset", ""), FieldSpec::new("goal", "")],
            vec![FieldSpec::new("commentary", ""), FieldSpec::new("code", "")],
        );
        assert_eq!(
            contract.signature_line(),
            "preprocessing_agent(dataset, goal -> commentary, code)"
        );
    }

    #[test]
    fn test_structured_output_require() {
        let mut out = StructuredOutput::new();
        out.insert("code", "df.head()".to_string());

        assert_eq!(out.require("code").unwrap(), "df.head()");
        assert!(matches!(
            out.require("commentary"),
            Err(LlmError::MissingField { field }) if field == "commentary"
        ));
    }
}
