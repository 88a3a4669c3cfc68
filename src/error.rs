//! Error taxonomy for the orchestration engine.
//!
//! Every failure the engine can surface is a distinct variant carrying
//! enough context (stage name, agent name) for the caller to tell
//! failure causes apart. Nothing is recovered silently except the
//! bounded plan-refinement loop in the orchestrator.

use thiserror::Error;

/// Errors surfaced by the orchestrator and its stages.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// An agent's declared contract could not be registered.
    /// Fatal at startup; the agent is refused, never silently omitted.
    #[error("malformed capability for agent '{agent}': {reason}")]
    MalformedCapability { agent: String, reason: String },

    /// The planner (or the goal refiner assisting it) failed to respond.
    #[error("planning failed: {source}")]
    Planning {
        #[source]
        source: LlmError,
    },

    /// The planner never produced a parseable plan, even after the
    /// allowed number of goal refinements.
    #[error("goal remained unplannable after {refinements} refinement attempt(s)")]
    RefinementExhausted { refinements: usize },

    /// The planner named an agent that is not in the registry.
    #[error("planner selected unknown agent '{agent}'")]
    UnknownAgent { agent: String },

    /// A context field an agent requires was not supplied.
    #[error("agent '{agent}' requires context field '{field}' which is not present")]
    MissingContextField { agent: String, field: String },

    /// A specific analysis agent's invocation failed.
    #[error("agent '{agent}' failed: {source}")]
    AgentExecution {
        agent: String,
        #[source]
        source: LlmError,
    },

    /// A stage exceeded its deadline. No partial work is salvaged.
    #[error("stage '{stage}' exceeded its {timeout_secs}s deadline")]
    StageTimeout { stage: String, timeout_secs: u64 },

    /// The code combiner failed after all agents had succeeded.
    #[error("code combination failed: {source}")]
    Combination {
        #[source]
        source: LlmError,
    },
}

/// Errors from a single language-model invocation.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("cannot connect to Ollama at {url}")]
    Connect { url: String },

    #[error("request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Ollama API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("failed to send request: {0}")]
    Transport(String),

    #[error("model response is missing required field '{field}'")]
    MissingField { field: String },

    #[error("failed to parse model response: {0}")]
    MalformedResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_stage_context() {
        let err = OrchestratorError::StageTimeout {
            stage: "analytical_planner".to_string(),
            timeout_secs: 300,
        };
        let msg = err.to_string();
        assert!(msg.contains("analytical_planner"));
        assert!(msg.contains("300"));

        let err = OrchestratorError::AgentExecution {
            agent: "sk_learn_agent".to_string(),
            source: LlmError::MissingField {
                field: "code".to_string(),
            },
        };
        assert!(err.to_string().contains("sk_learn_agent"));
    }

    #[test]
    fn test_agent_failures_are_distinguishable() {
        let unknown = OrchestratorError::UnknownAgent {
            agent: "clustering_agent".to_string(),
        };
        assert!(unknown.to_string().contains("clustering_agent"));

        let missing = OrchestratorError::MissingContextField {
            agent: "viz_agent".to_string(),
            field: "styling_index".to_string(),
        };
        let msg = missing.to_string();
        assert!(msg.contains("viz_agent"));
        assert!(msg.contains("styling_index"));
    }

    #[test]
    fn test_source_error_is_preserved() {
        let err = OrchestratorError::Planning {
            source: LlmError::Api {
                status: 500,
                body: "overloaded".to_string(),
            },
        };
        let source = std::error::Error::source(&err).expect("planning error has a source");
        assert!(source.to_string().contains("500"));
    }

    #[test]
    fn test_refinement_exhausted_names_attempt_count() {
        let err = OrchestratorError::RefinementExhausted { refinements: 1 };
        assert!(err.to_string().contains("1 refinement attempt"));
    }
}
