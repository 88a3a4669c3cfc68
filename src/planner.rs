//! Planning stage: the analytical planner and the goal refiner.
//!
//! Both consume the same context inputs. The planner produces an
//! ordered agent sequence; the refiner rewrites an ambiguous goal when
//! the planner's output could not be parsed. Neither retries on its
//! own; invocation failures propagate to the orchestrator.

use crate::context::ExecutionContext;
use crate::error::LlmError;
use crate::llm::contract::{LanguageModel, PromptContract};
use crate::llm::prompts;
use crate::models::Plan;
use std::sync::Arc;
use tracing::debug;

/// Invokes the planning agent and parses its plan text.
pub struct Planner {
    model: Arc<dyn LanguageModel>,
    contract: PromptContract,
}

impl Planner {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            contract: prompts::analytical_planner(),
        }
    }

    /// Produce a plan for the context's current goal.
    ///
    /// A response without the `->` delimiter yields an empty sequence;
    /// deciding what to do about that is the orchestrator's job.
    pub async fn plan(&self, ctx: &ExecutionContext) -> Result<Plan, LlmError> {
        let inputs = project_for(&self.contract, ctx)?;
        let output = self.model.invoke(&self.contract, &inputs).await?;

        let plan_text = output.require("plan")?;
        let rationale = output.get("plan_desc").unwrap_or_default();

        let plan = Plan::parse(plan_text, rationale);
        debug!(
            "Planner produced {} step(s) for goal: {}",
            plan.sequence.len(),
            ctx.goal()
        );
        Ok(plan)
    }
}

/// Rewrites an ambiguous goal into a more actionable one.
pub struct GoalRefiner {
    model: Arc<dyn LanguageModel>,
    contract: PromptContract,
}

impl GoalRefiner {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            contract: prompts::goal_refiner_agent(),
        }
    }

    /// Produce refined goal text. Does not mutate the context; the
    /// orchestrator substitutes the new goal and replans.
    pub async fn refine(&self, ctx: &ExecutionContext) -> Result<String, LlmError> {
        let inputs = project_for(&self.contract, ctx)?;
        let output = self.model.invoke(&self.contract, &inputs).await?;
        let refined = output.require("refined_goal")?.trim().to_string();
        debug!("Refined goal: {}", refined);
        Ok(refined)
    }
}

/// Project the context onto a pipeline contract's declared inputs.
fn project_for(
    contract: &PromptContract,
    ctx: &ExecutionContext,
) -> Result<std::collections::BTreeMap<String, String>, LlmError> {
    let required = contract.inputs.iter().map(|f| f.name.clone()).collect();
    ctx.project(&required)
        .map_err(|field| LlmError::MalformedResponse(format!(
            "context is missing field '{}'",
            field
        )))
}
