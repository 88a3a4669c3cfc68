//! Agent registry and capability descriptors.
//!
//! Each analysis agent registers a structured contract at startup; the
//! registry derives an immutable [`AgentDescriptor`] from it (name,
//! required inputs, description) and validates it against the context
//! fields the orchestrator guarantees to supply. A malformed contract
//! blocks registration outright rather than being silently dropped.

use crate::context::ExecutionContext;
use crate::error::OrchestratorError;
use crate::llm::contract::{FieldSpec, PromptContract};
use serde::Serialize;
use std::collections::BTreeSet;

/// The structured, validated contract for one agent.
#[derive(Debug, Clone, Serialize)]
pub struct AgentDescriptor {
    /// Unique registry key.
    pub name: String,
    /// Context fields the agent must receive; unordered, deduplicated.
    pub required_inputs: BTreeSet<String>,
    /// Human-readable capability summary, serialized into the planner's
    /// `Agent_desc` input.
    pub description: String,
}

impl AgentDescriptor {
    fn from_contract(contract: &PromptContract) -> Result<Self, OrchestratorError> {
        let malformed = |reason: &str| OrchestratorError::MalformedCapability {
            agent: contract.name.clone(),
            reason: reason.to_string(),
        };

        if contract.name.trim().is_empty() {
            return Err(malformed("agent name is empty"));
        }
        if contract.inputs.is_empty() {
            return Err(malformed("agent declares no input fields"));
        }

        let required_inputs: BTreeSet<String> =
            contract.inputs.iter().map(|f| f.name.clone()).collect();

        let supplied = ExecutionContext::supplied_fields();
        for field in &required_inputs {
            if !supplied.contains(field) {
                return Err(malformed(&format!(
                    "required input '{}' is not a supplied context field",
                    field
                )));
            }
        }

        let outputs: BTreeSet<&str> = contract.output_names().collect();
        for expected in ["commentary", "code"] {
            if !outputs.contains(expected) {
                return Err(malformed(&format!(
                    "agent does not declare '{}' output",
                    expected
                )));
            }
        }

        // One line per agent: signature header plus flattened instructions.
        let summary = contract.instructions.split_whitespace().collect::<Vec<_>>().join(" ");
        let description = format!("{}: {}", contract.signature_line(), summary);

        Ok(Self {
            name: contract.name.clone(),
            required_inputs,
            description,
        })
    }
}

/// One registered agent: descriptor plus the contract used to invoke it.
#[derive(Debug, Clone)]
pub struct RegisteredAgent {
    pub descriptor: AgentDescriptor,
    pub contract: PromptContract,
}

/// The process-wide agent set. Read-only after initialization.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: Vec<RegisteredAgent>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one agent from its structured contract.
    pub fn register(&mut self, contract: PromptContract) -> Result<(), OrchestratorError> {
        let descriptor = AgentDescriptor::from_contract(&contract)?;

        if self.get(&descriptor.name).is_some() {
            return Err(OrchestratorError::MalformedCapability {
                agent: descriptor.name,
                reason: "an agent with this name is already registered".to_string(),
            });
        }

        tracing::debug!("Registered agent '{}'", descriptor.name);
        self.agents.push(RegisteredAgent {
            descriptor,
            contract,
        });
        Ok(())
    }

    /// Register an agent declared as signature text, e.g.
    /// `my_agent(dataset, goal -> commentary, code)`.
    ///
    /// Field descriptions are left empty; the instructions become the
    /// agent's prompt. Kept for config-declared custom agents.
    pub fn register_signature(
        &mut self,
        signature: &str,
        instructions: &str,
    ) -> Result<(), OrchestratorError> {
        let contract = parse_signature(signature, instructions)?;
        self.register(contract)
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredAgent> {
        self.agents
            .iter()
            .find(|agent| agent.descriptor.name == name)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &AgentDescriptor> {
        self.agents.iter().map(|agent| &agent.descriptor)
    }

    /// Serialize all agent descriptions for the `Agent_desc` context
    /// field, one agent per line in registration order.
    pub fn describe_all(&self) -> String {
        self.descriptors()
            .map(|d| d.description.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// Parse a textual signature header into a contract.
///
/// The header lists input field names, an `->` arrow, then output field
/// names, all inside the parenthesis after the agent name. Anything
/// else fails with a malformed-capability error.
pub fn parse_signature(
    signature: &str,
    instructions: &str,
) -> Result<PromptContract, OrchestratorError> {
    let malformed = |reason: &str| OrchestratorError::MalformedCapability {
        agent: signature.trim().to_string(),
        reason: reason.to_string(),
    };

    let (name, rest) = signature
        .split_once('(')
        .ok_or_else(|| malformed("missing '(' before input list"))?;
    let body = rest
        .rsplit_once(')')
        .map(|(body, _)| body)
        .ok_or_else(|| malformed("missing closing ')'"))?;
    let (input_part, output_part) = body
        .split_once("->")
        .ok_or_else(|| malformed("missing '->' between inputs and outputs"))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(malformed("missing agent name before '('"));
    }

    let fields = |part: &str| -> Vec<FieldSpec> {
        part.split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(|f| FieldSpec::new(f, ""))
            .collect()
    };

    Ok(PromptContract::new(
        name,
        instructions,
        fields(input_part),
        fields(output_part),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::prompts;

    #[test]
    fn test_register_default_agents() {
        let mut registry = AgentRegistry::new();
        for contract in prompts::default_analysis_agents() {
            registry.register(contract).unwrap();
        }

        assert_eq!(registry.len(), 3);
        let names: Vec<&str> = registry.descriptors().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "preprocessing_agent",
                "statistical_analytics_agent",
                "sk_learn_agent"
            ]
        );

        let agent = registry.get("sk_learn_agent").unwrap();
        assert!(agent.descriptor.required_inputs.contains("dataset"));
        assert!(agent.descriptor.required_inputs.contains("goal"));
    }

    #[test]
    fn test_required_inputs_subset_of_supplied_fields() {
        let mut registry = AgentRegistry::new();
        for contract in prompts::default_analysis_agents() {
            registry.register(contract).unwrap();
        }

        let supplied = ExecutionContext::supplied_fields();
        for descriptor in registry.descriptors() {
            assert!(descriptor.required_inputs.is_subset(&supplied));
        }
    }

    #[test]
    fn test_register_rejects_unsupplied_input() {
        let contract = parse_signature(
            "viz_agent(dataset, goal, styling_index -> commentary, code)",
            "plots things",
        )
        .unwrap();

        let mut registry = AgentRegistry::new();
        let err = registry.register(contract).unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::MalformedCapability { agent, .. } if agent == "viz_agent"
        ));
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = AgentRegistry::new();
        registry.register(prompts::preprocessing_agent()).unwrap();
        assert!(registry.register(prompts::preprocessing_agent()).is_err());
    }

    #[test]
    fn test_register_rejects_missing_code_output() {
        let contract = parse_signature(
            "summary_agent(dataset, goal -> commentary)",
            "summarizes",
        )
        .unwrap();

        let mut registry = AgentRegistry::new();
        assert!(registry.register(contract).is_err());
    }

    #[test]
    fn test_parse_signature_roundtrip() {
        let contract = parse_signature(
            "preprocessing_agent( dataset , goal -> commentary, code )",
            "does preprocessing",
        )
        .unwrap();

        assert_eq!(contract.name, "preprocessing_agent");
        assert_eq!(
            contract.signature_line(),
            "preprocessing_agent(dataset, goal -> commentary, code)"
        );
    }

    #[test]
    fn test_parse_signature_without_arrow_fails() {
        let err = parse_signature("broken_agent(dataset, goal)", "").unwrap_err();
        assert!(err.to_string().contains("->"));
    }

    #[test]
    fn test_describe_all_one_line_per_agent() {
        let mut registry = AgentRegistry::new();
        for contract in prompts::default_analysis_agents() {
            registry.register(contract).unwrap();
        }

        let description = registry.describe_all();
        assert_eq!(description.lines().count(), 3);
        assert!(description.contains("preprocessing_agent(dataset, goal -> commentary, code)"));
    }
}
