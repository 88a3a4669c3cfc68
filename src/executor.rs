//! Agent execution stage.
//!
//! For one planned agent name: look up its descriptor, project the
//! context down to exactly its declared inputs, invoke it, and capture
//! the commentary and code outputs. Failures are tagged with the agent
//! name so one agent's failure is never conflated with another's.

use crate::context::ExecutionContext;
use crate::error::{LlmError, OrchestratorError};
use crate::models::AgentResult;
use crate::registry::AgentRegistry;
use crate::llm::contract::LanguageModel;
use std::sync::Arc;
use tracing::debug;

/// Executes individual agents from the registry.
pub struct AgentExecutor {
    registry: Arc<AgentRegistry>,
    model: Arc<dyn LanguageModel>,
    timeout_secs: u64,
}

impl AgentExecutor {
    pub fn new(
        registry: Arc<AgentRegistry>,
        model: Arc<dyn LanguageModel>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            registry,
            model,
            timeout_secs,
        }
    }

    /// Run one agent against the current context.
    pub async fn execute(
        &self,
        agent_name: &str,
        ctx: &ExecutionContext,
    ) -> Result<AgentResult, OrchestratorError> {
        // The planner may hallucinate a name outside the registry; that
        // fails the request, not the process.
        let agent = self
            .registry
            .get(agent_name)
            .ok_or_else(|| OrchestratorError::UnknownAgent {
                agent: agent_name.to_string(),
            })?;

        let inputs = ctx
            .project(&agent.descriptor.required_inputs)
            .map_err(|field| OrchestratorError::MissingContextField {
                agent: agent_name.to_string(),
                field,
            })?;

        debug!(
            "Executing agent '{}' with inputs: {:?}",
            agent_name,
            inputs.keys().collect::<Vec<_>>()
        );

        let output = self
            .model
            .invoke(&agent.contract, &inputs)
            .await
            .map_err(|e| self.tag_error(agent_name, e))?;

        let commentary = output
            .require("commentary")
            .map_err(|e| self.tag_error(agent_name, e))?
            .to_string();
        let code = output
            .require("code")
            .map_err(|e| self.tag_error(agent_name, e))?
            .to_string();

        Ok(AgentResult { commentary, code })
    }

    fn tag_error(&self, agent_name: &str, err: LlmError) -> OrchestratorError {
        match err {
            // A transport-level timeout is this stage's deadline expiring.
            LlmError::Timeout { .. } => OrchestratorError::StageTimeout {
                stage: agent_name.to_string(),
                timeout_secs: self.timeout_secs,
            },
            source => OrchestratorError::AgentExecution {
                agent: agent_name.to_string(),
                source,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{FIELD_AGENT_DESC, FIELD_DATASET, FIELD_GOAL};
    use crate::llm::prompts;
    use crate::llm::testing::ScriptedModel;

    fn make_registry() -> Arc<AgentRegistry> {
        let mut registry = AgentRegistry::new();
        for contract in prompts::default_analysis_agents() {
            registry.register(contract).unwrap();
        }
        Arc::new(registry)
    }

    fn make_context() -> ExecutionContext {
        ExecutionContext::new(
            "df_name: bookings".to_string(),
            "clean the data".to_string(),
            "agents...".to_string(),
        )
    }

    #[tokio::test]
    async fn test_execute_projects_exact_inputs() {
        let model = Arc::new(ScriptedModel::new());
        model.script(
            "preprocessing_agent",
            &[("commentary", "cleaned nulls"), ("code", "df = df.dropna()")],
        );

        let executor = AgentExecutor::new(make_registry(), model.clone(), 300);
        let result = executor
            .execute("preprocessing_agent", &make_context())
            .await
            .unwrap();

        assert_eq!(result.commentary, "cleaned nulls");
        assert_eq!(result.code, "df = df.dropna()");

        // The agent declares dataset+goal, so Agent_desc must not be passed.
        let (_, inputs) = &model.calls()[0];
        assert!(inputs.contains_key(FIELD_DATASET));
        assert!(inputs.contains_key(FIELD_GOAL));
        assert!(!inputs.contains_key(FIELD_AGENT_DESC));
    }

    #[tokio::test]
    async fn test_unknown_agent_fails_with_its_name() {
        let model = Arc::new(ScriptedModel::new());
        let executor = AgentExecutor::new(make_registry(), model, 300);

        let err = executor
            .execute("clustering_agent", &make_context())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::UnknownAgent { agent } if agent == "clustering_agent"
        ));
    }

    #[tokio::test]
    async fn test_invocation_failure_is_tagged_with_agent() {
        let model = Arc::new(ScriptedModel::new());
        model.script_err(
            "sk_learn_agent",
            LlmError::Api {
                status: 500,
                body: "model crashed".to_string(),
            },
        );

        let executor = AgentExecutor::new(make_registry(), model, 300);
        let err = executor
            .execute("sk_learn_agent", &make_context())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::AgentExecution { agent, .. } if agent == "sk_learn_agent"
        ));
    }

    #[tokio::test]
    async fn test_transport_timeout_becomes_stage_timeout() {
        let model = Arc::new(ScriptedModel::new());
        model.script_err("sk_learn_agent", LlmError::Timeout { seconds: 300 });

        let executor = AgentExecutor::new(make_registry(), model, 300);
        let err = executor
            .execute("sk_learn_agent", &make_context())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::StageTimeout { stage, .. } if stage == "sk_learn_agent"
        ));
    }

    #[tokio::test]
    async fn test_execute_twice_does_not_mutate_shared_state() {
        let model = Arc::new(ScriptedModel::new());
        model.script("preprocessing_agent", &[("commentary", "a"), ("code", "x=1")]);
        model.script("preprocessing_agent", &[("commentary", "a"), ("code", "x=1")]);

        let registry = make_registry();
        let before: Vec<String> = registry
            .descriptors()
            .map(|d| format!("{}:{:?}", d.name, d.required_inputs))
            .collect();

        let executor = AgentExecutor::new(registry.clone(), model.clone(), 300);
        let ctx = make_context();
        executor.execute("preprocessing_agent", &ctx).await.unwrap();
        executor.execute("preprocessing_agent", &ctx).await.unwrap();

        let after: Vec<String> = registry
            .descriptors()
            .map(|d| format!("{}:{:?}", d.name, d.required_inputs))
            .collect();
        assert_eq!(before, after);

        // Identical projections on both invocations.
        let calls = model.calls();
        assert_eq!(calls[0].1, calls[1].1);
    }
}
