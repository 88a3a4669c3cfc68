//! End-to-end request orchestration.
//!
//! One request runs a strictly sequential pipeline:
//! Plan -> [Refine -> Plan]* -> Execute(agents in plan order) -> Combine.
//! The refinement loop is bounded; everything else fails the request on
//! first error. The registry and dataset reference are shared read-only
//! across requests; each request owns its own context and outcome.

use crate::combiner::CodeCombiner;
use crate::context::ExecutionContext;
use crate::dataset::DatasetRef;
use crate::error::{LlmError, OrchestratorError};
use crate::executor::AgentExecutor;
use crate::llm::contract::LanguageModel;
use crate::models::{
    OutcomeMetadata, RequestOutcome, StageOutput, StageRecord, COMBINER_STAGE, PLANNER_STAGE,
};
use crate::planner::{GoalRefiner, Planner};
use crate::registry::AgentRegistry;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{info, warn};

/// Stage key used when the goal refiner times out.
const REFINER_STAGE: &str = "goal_refiner_agent";

/// Orchestration policy knobs.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// How many goal refinements may be attempted before giving up.
    pub max_refinements: usize,
    /// Deadline applied to every individual stage invocation.
    pub stage_timeout_seconds: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_refinements: 1,
            stage_timeout_seconds: 300,
        }
    }
}

/// Composes planner, refiner, executor, and combiner into the
/// per-request control flow.
pub struct Orchestrator {
    registry: Arc<AgentRegistry>,
    dataset: Arc<DatasetRef>,
    planner: Planner,
    refiner: GoalRefiner,
    executor: AgentExecutor,
    combiner: CodeCombiner,
    config: OrchestratorConfig,
    model_name: String,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<AgentRegistry>,
        dataset: Arc<DatasetRef>,
        model: Arc<dyn LanguageModel>,
        model_name: &str,
        config: OrchestratorConfig,
    ) -> Self {
        let executor = AgentExecutor::new(
            registry.clone(),
            model.clone(),
            config.stage_timeout_seconds,
        );
        Self {
            registry,
            dataset,
            planner: Planner::new(model.clone()),
            refiner: GoalRefiner::new(model.clone()),
            executor,
            combiner: CodeCombiner::new(model),
            config,
            model_name: model_name.to_string(),
        }
    }

    /// Run one analysis request end to end.
    ///
    /// Returns either a complete [`RequestOutcome`] or a tagged error;
    /// there is no partial outcome on failure.
    pub async fn run_request(&self, goal: &str) -> Result<RequestOutcome, OrchestratorError> {
        self.forward(goal).await
    }

    async fn forward(&self, goal: &str) -> Result<RequestOutcome, OrchestratorError> {
        let started_at = Utc::now();
        let start = Instant::now();

        let original_goal = goal.trim().to_string();
        let agent_desc = self.registry.describe_all();
        let mut goal = original_goal.clone();
        let mut refinements = 0;

        // Plan, refining the goal a bounded number of times when the
        // planner's response has no parseable agent sequence. Each
        // attempt restarts from a fresh context and outcome ledger.
        let (ctx, plan, mut stages) = loop {
            let ctx = ExecutionContext::new(
                self.dataset.summary(),
                goal.clone(),
                agent_desc.clone(),
            );

            let plan = self
                .with_deadline(PLANNER_STAGE, self.planner.plan(&ctx), |source| {
                    OrchestratorError::Planning { source }
                })
                .await?;

            let stages = vec![StageRecord {
                stage: PLANNER_STAGE.to_string(),
                output: StageOutput::Plan(plan.clone()),
            }];

            if plan.is_actionable() {
                break (ctx, plan, stages);
            }

            if refinements >= self.config.max_refinements {
                return Err(OrchestratorError::RefinementExhausted { refinements });
            }

            warn!("Plan not actionable; refining goal: {}", goal);
            goal = self
                .with_deadline(REFINER_STAGE, self.refiner.refine(&ctx), |source| {
                    OrchestratorError::Planning { source }
                })
                .await?;
            refinements += 1;
        };

        info!(
            "Executing plan with {} agent(s): {}",
            plan.sequence.len(),
            plan.sequence.join(" -> ")
        );

        // Execute agents strictly in plan order; fragment order must
        // match, since later fragments may depend on earlier variables.
        let mut code_list = Vec::with_capacity(plan.sequence.len());
        for agent_name in &plan.sequence {
            let deadline = Duration::from_secs(self.config.stage_timeout_seconds);
            let result = match timeout(deadline, self.executor.execute(agent_name, &ctx)).await {
                Err(_) => {
                    return Err(OrchestratorError::StageTimeout {
                        stage: agent_name.clone(),
                        timeout_secs: self.config.stage_timeout_seconds,
                    })
                }
                Ok(result) => result?,
            };

            info!("Agent '{}' produced {} bytes of code", agent_name, result.code.len());
            code_list.push(result.code.clone());
            stages.push(StageRecord {
                stage: agent_name.clone(),
                output: StageOutput::Agent(result),
            });
        }

        let combined = self
            .with_deadline(COMBINER_STAGE, self.combiner.combine(&code_list), |source| {
                OrchestratorError::Combination { source }
            })
            .await?;
        stages.push(StageRecord {
            stage: COMBINER_STAGE.to_string(),
            output: StageOutput::Combined(combined),
        });

        Ok(RequestOutcome {
            metadata: OutcomeMetadata {
                goal: original_goal,
                effective_goal: goal,
                dataset_name: self.dataset.name.clone(),
                model_used: self.model_name.clone(),
                refinements,
                started_at,
                duration_seconds: start.elapsed().as_secs_f64(),
            },
            stages,
        })
    }

    /// Apply the stage deadline to a model-backed stage and map its
    /// failures into the error taxonomy.
    async fn with_deadline<T, F>(
        &self,
        stage: &str,
        fut: F,
        wrap: fn(LlmError) -> OrchestratorError,
    ) -> Result<T, OrchestratorError>
    where
        F: Future<Output = Result<T, LlmError>>,
    {
        let timeout_secs = self.config.stage_timeout_seconds;
        match timeout(Duration::from_secs(timeout_secs), fut).await {
            Err(_) | Ok(Err(LlmError::Timeout { .. })) => Err(OrchestratorError::StageTimeout {
                stage: stage.to_string(),
                timeout_secs,
            }),
            Ok(Err(e)) => Err(wrap(e)),
            Ok(Ok(value)) => Ok(value),
        }
    }
}
