//! Code combination stage.
//!
//! Invoked exactly once per successful request, after every planned
//! agent has executed, with the code fragments in plan order. The
//! merged script is best-effort model output; the orchestrator treats
//! it as opaque text and never validates it statically.

use crate::error::LlmError;
use crate::llm::contract::{LanguageModel, PromptContract};
use crate::llm::prompts;
use crate::models::CombinedCode;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

pub struct CodeCombiner {
    model: Arc<dyn LanguageModel>,
    contract: PromptContract,
}

impl CodeCombiner {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            contract: prompts::code_combiner_agent(),
        }
    }

    /// Merge the ordered fragments into one script. Order matters:
    /// later fragments may use variables defined by earlier ones.
    pub async fn combine(&self, fragments: &[String]) -> Result<CombinedCode, LlmError> {
        debug!("Combining {} code fragment(s)", fragments.len());

        let listing = serde_json::to_string_pretty(fragments)
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        let mut inputs = BTreeMap::new();
        inputs.insert("agent_code_list".to_string(), listing);

        let output = self.model.invoke(&self.contract, &inputs).await?;
        let code = output.require("refined_complete_code")?.to_string();
        Ok(CombinedCode { code })
    }
}
