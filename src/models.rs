//! Data models for the orchestration engine.
//!
//! This module contains the core structures flowing through a request:
//! the plan, per-agent results, and the ordered request outcome
//! returned to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stage key under which the planner's output is recorded.
pub const PLANNER_STAGE: &str = "analytical_planner";

/// Stage key under which the combined script is recorded.
pub const COMBINER_STAGE: &str = "code_combiner_agent";

/// An ordered agent sequence plus the planner's reasoning.
///
/// The sequence order is meaningful: it determines both execution order
/// and the order code fragments are handed to the combiner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    /// Free text explaining the chosen agent ordering.
    pub rationale: String,
    /// Ordered agent names. Empty when the planner's response could not
    /// be parsed, signaling "plan not actionable".
    pub sequence: Vec<String>,
}

impl Plan {
    /// Parse the planner's free-text plan field.
    ///
    /// Agents are expected to be separated by `->`. A response without
    /// the delimiter yields an empty sequence; the orchestrator treats
    /// that as a cue to refine the goal.
    pub fn parse(plan_text: &str, rationale: &str) -> Self {
        let sequence = if plan_text.contains("->") {
            plan_text
                .split("->")
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(String::from)
                .collect()
        } else {
            Vec::new()
        };

        Self {
            rationale: rationale.trim().to_string(),
            sequence,
        }
    }

    /// Whether the plan names at least one agent.
    pub fn is_actionable(&self) -> bool {
        !self.sequence.is_empty()
    }
}

/// Output of one analysis agent invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    /// Free text describing what the agent did.
    pub commentary: String,
    /// Generated source code for this analysis step.
    pub code: String,
}

/// The combiner's merged script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinedCode {
    /// One corrected script assembled from all fragments. Opaque,
    /// unverified text as far as the orchestrator is concerned.
    pub code: String,
}

/// Output of one pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageOutput {
    Plan(Plan),
    Agent(AgentResult),
    Combined(CombinedCode),
}

/// One stage's record in the outcome ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    /// Stage key: [`PLANNER_STAGE`], an agent name, or [`COMBINER_STAGE`].
    pub stage: String,
    pub output: StageOutput,
}

/// Metadata about one completed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeMetadata {
    /// The goal as originally submitted.
    pub goal: String,
    /// The goal actually planned against, after any refinement.
    pub effective_goal: String,
    /// Name of the dataset the request ran against.
    pub dataset_name: String,
    /// Name of the model used for all stages.
    pub model_used: String,
    /// Number of goal refinements performed (0 when the first plan parsed).
    pub refinements: usize,
    /// When the request started.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the request in seconds.
    pub duration_seconds: f64,
}

/// The end-to-end artifact returned to the caller: every stage's output
/// in execution order. Transient per call; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestOutcome {
    pub metadata: OutcomeMetadata,
    pub stages: Vec<StageRecord>,
}

impl RequestOutcome {
    /// Look up a stage's output by key.
    pub fn stage(&self, name: &str) -> Option<&StageOutput> {
        self.stages
            .iter()
            .find(|record| record.stage == name)
            .map(|record| &record.output)
    }

    /// The final combined script, if the request reached the combiner.
    pub fn final_code(&self) -> Option<&str> {
        match self.stage(COMBINER_STAGE) {
            Some(StageOutput::Combined(combined)) => Some(&combined.code),
            _ => None,
        }
    }

    /// Per-agent results in execution order.
    pub fn agent_results(&self) -> impl Iterator<Item = (&str, &AgentResult)> {
        self.stages.iter().filter_map(|record| match &record.output {
            StageOutput::Agent(result) => Some((record.stage.as_str(), result)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_parse_two_agents() {
        let plan = Plan::parse("preprocessing_agent->sk_learn_agent", "preprocess then model");
        assert_eq!(
            plan.sequence,
            vec!["preprocessing_agent", "sk_learn_agent"]
        );
        assert!(plan.is_actionable());
    }

    #[test]
    fn test_plan_parse_trims_whitespace() {
        let plan = Plan::parse(" preprocessing_agent -> statistical_analytics_agent ", "");
        assert_eq!(
            plan.sequence,
            vec!["preprocessing_agent", "statistical_analytics_agent"]
        );
    }

    #[test]
    fn test_plan_without_delimiter_is_not_actionable() {
        let plan = Plan::parse("please clarify what you want to analyze", "");
        assert!(plan.sequence.is_empty());
        assert!(!plan.is_actionable());
    }

    #[test]
    fn test_plan_ignores_empty_segments() {
        let plan = Plan::parse("preprocessing_agent->->sk_learn_agent->", "");
        assert_eq!(
            plan.sequence,
            vec!["preprocessing_agent", "sk_learn_agent"]
        );
    }

    #[test]
    fn test_outcome_stage_lookup_and_final_code() {
        let outcome = RequestOutcome {
            metadata: OutcomeMetadata {
                goal: "g".to_string(),
                effective_goal: "g".to_string(),
                dataset_name: "bookings".to_string(),
                model_used: "test".to_string(),
                refinements: 0,
                started_at: Utc::now(),
                duration_seconds: 0.1,
            },
            stages: vec![
                StageRecord {
                    stage: PLANNER_STAGE.to_string(),
                    output: StageOutput::Plan(Plan::parse("a->b", "r")),
                },
                StageRecord {
                    stage: "a".to_string(),
                    output: StageOutput::Agent(AgentResult {
                        commentary: "did a".to_string(),
                        code: "A=1".to_string(),
                    }),
                },
                StageRecord {
                    stage: COMBINER_STAGE.to_string(),
                    output: StageOutput::Combined(CombinedCode {
                        code: "A=1".to_string(),
                    }),
                },
            ],
        };

        assert!(matches!(
            outcome.stage(PLANNER_STAGE),
            Some(StageOutput::Plan(_))
        ));
        assert_eq!(outcome.final_code(), Some("A=1"));
        let agents: Vec<&str> = outcome.agent_results().map(|(name, _)| name).collect();
        assert_eq!(agents, vec!["a"]);
    }
}
