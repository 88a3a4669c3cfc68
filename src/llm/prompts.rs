//! Built-in prompt contracts.
//!
//! The planner, goal refiner, and code combiner run the pipeline; the
//! analysis agents are the middle layer producing code for specialised
//! data-analysis tasks. Field names here are part of the agent-facing
//! contract and must stay stable.

use crate::llm::contract::{FieldSpec, PromptContract};

const DATASET_DESC: &str =
    "Available datasets loaded in the system, use this df_name,columns. Set df as a copy of df_name";
const GOAL_DESC: &str = "The user defined goal";
const AGENT_DESC_DESC: &str = "The agents available in the system";

/// The planning agent: selects and orders agents for a goal.
pub fn analytical_planner() -> PromptContract {
    PromptContract::new(
        "analytical_planner",
        r#"You are a data analytics planner agent. You have access to three inputs:
1. Datasets
2. Data agent descriptions
3. User-defined goal
You take these three inputs to develop a comprehensive plan to achieve the
user-defined goal from the data and agents available. In case you think the
user-defined goal is infeasible you can ask the user to redefine or add more
description to the goal.

Give your output in this format:
plan: Agent1->Agent2->Agent3
plan_desc: Use Agent1 for this reason, then Agent2 for this reason and lastly Agent3 for this reason.

You don't have to use all the agents in response to the query."#,
        vec![
            FieldSpec::new("dataset", DATASET_DESC),
            FieldSpec::new("Agent_desc", AGENT_DESC_DESC),
            FieldSpec::new("goal", GOAL_DESC),
        ],
        vec![
            FieldSpec::new("plan", "The plan that would achieve the user defined goal"),
            FieldSpec::new("plan_desc", "The reasoning behind the chosen plan"),
        ],
    )
}

/// The goal refiner: rewrites an ambiguous goal into an actionable one.
pub fn goal_refiner_agent() -> PromptContract {
    PromptContract::new(
        "goal_refiner_agent",
        r#"You take a user-defined goal given to an AI data analyst planner agent,
and make the goal more elaborate using the datasets available and the agent
descriptions."#,
        vec![
            FieldSpec::new("dataset", DATASET_DESC),
            FieldSpec::new("Agent_desc", AGENT_DESC_DESC),
            FieldSpec::new("goal", GOAL_DESC),
        ],
        vec![FieldSpec::new(
            "refined_goal",
            "Refined goal that helps the planner agent plan better",
        )],
    )
}

/// The code combiner: merges all fragments into one corrected script.
pub fn code_combiner_agent() -> PromptContract {
    PromptContract::new(
        "code_combiner_agent",
        r#"You are a code combiner agent, taking Python code output from many
agents and combining the operations into one output. You also fix any errors
in the code."#,
        vec![FieldSpec::new(
            "agent_code_list",
            "A list of code given by each agent",
        )],
        vec![FieldSpec::new(
            "refined_complete_code",
            "Refined complete code base",
        )],
    )
}

/// Pre-processing agent: numpy/pandas exploratory pipeline.
pub fn preprocessing_agent() -> PromptContract {
    PromptContract::new(
        "preprocessing_agent",
        r#"You are a data pre-processing agent. Your job is to take a user-defined
goal and the available dataset, and build an exploratory analytics pipeline.
You do this by outputting the required Python code. You will only use numpy
and pandas, to perform pre-processing and introductory analysis."#,
        analysis_inputs(),
        analysis_outputs("The code that does the data preprocessing and introductory analysis"),
    )
}

/// Statistical analytics agent: statsmodels-based analysis.
pub fn statistical_analytics_agent() -> PromptContract {
    PromptContract::new(
        "statistical_analytics_agent",
        r#"You are a statistical analytics agent. Your task is to take a dataset
and a user-defined goal, and output Python code that performs the appropriate
statistical analysis to achieve that goal. You should use the Python
statsmodels library."#,
        analysis_inputs(),
        analysis_outputs("The code that does the statistical analysis using statsmodels"),
    )
}

/// Machine-learning agent: scikit-learn-based analysis.
pub fn sk_learn_agent() -> PromptContract {
    PromptContract::new(
        "sk_learn_agent",
        r#"You are a machine learning agent. Your task is to take a dataset and a
user-defined goal, and output Python code that performs the appropriate
machine learning analysis to achieve that goal. You should use the
scikit-learn library."#,
        analysis_inputs(),
        analysis_outputs("The code that does the machine learning analysis"),
    )
}

/// The analysis agents registered at startup, in registration order.
pub fn default_analysis_agents() -> Vec<PromptContract> {
    vec![
        preprocessing_agent(),
        statistical_analytics_agent(),
        sk_learn_agent(),
    ]
}

fn analysis_inputs() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new("dataset", DATASET_DESC),
        FieldSpec::new("goal", GOAL_DESC),
    ]
}

fn analysis_outputs(code_desc: &str) -> Vec<FieldSpec> {
    vec![
        FieldSpec::new(
            "commentary",
            "The comments about what analysis is being performed",
        ),
        FieldSpec::new("code", code_desc),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_agents_declare_commentary_and_code() {
        for contract in default_analysis_agents() {
            let outputs: Vec<&str> = contract.output_names().collect();
            assert_eq!(outputs, vec!["commentary", "code"], "{}", contract.name);
        }
    }

    #[test]
    fn test_planner_contract_fields() {
        let planner = analytical_planner();
        let inputs: Vec<&str> = planner.inputs.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(inputs, vec!["dataset", "Agent_desc", "goal"]);
        let outputs: Vec<&str> = planner.output_names().collect();
        assert_eq!(outputs, vec!["plan", "plan_desc"]);
    }
}
