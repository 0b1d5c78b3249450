//! Agent roles: the fixed configuration used to drive one pipeline stage.

use super::tools::tool_definitions;
use crate::outputs::StageOutput;
use async_openai::types::ChatCompletionTool;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The four pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Analysis,
    Planning,
    Execution,
    QualityCheck,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Analysis,
        Stage::Planning,
        Stage::Execution,
        Stage::QualityCheck,
    ];

    /// Banner label, e.g. `QUALITY CHECK`.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Analysis => "ANALYSIS",
            Stage::Planning => "PLANNING",
            Stage::Execution => "EXECUTION",
            Stage::QualityCheck => "QUALITY CHECK",
        }
    }

    /// Default name of the role that drives this stage.
    pub fn role_name(&self) -> &'static str {
        match self {
            Stage::Analysis => "Client Requirements Analyst",
            Stage::Planning => "Senior Media Post-Production Task Planner",
            Stage::Execution => "Senior Media Post-Production Client Delivery Expert",
            Stage::QualityCheck => "Senior Media Post-Production Quality Checker",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The structured output a role must produce.
#[derive(Debug, Clone)]
pub struct OutputContract {
    pub name: &'static str,
    pub schema: serde_json::Value,
}

impl OutputContract {
    pub fn of<T: StageOutput>() -> Self {
        Self {
            name: T::CONTRACT,
            schema: <T as StageOutput>::json_schema(),
        }
    }
}

/// Immutable role configuration.
///
/// All roles share the tool set and the model; they differ in name,
/// instructions and output contract.
#[derive(Debug, Clone)]
pub struct Role {
    name: String,
    instructions: String,
    model: String,
    tools: Vec<ChatCompletionTool>,
    contract: OutputContract,
}

impl Role {
    /// Create a role producing output of type `T`.
    pub fn new<T: StageOutput>(
        name: impl Into<String>,
        instructions: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            model: model.into(),
            tools: tool_definitions(),
            contract: OutputContract::of::<T>(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn tools(&self) -> &[ChatCompletionTool] {
        &self.tools
    }

    pub fn contract(&self) -> &OutputContract {
        &self.contract
    }

    /// System message: instructions followed by the output contract.
    pub fn system_prompt(&self) -> String {
        let schema = serde_json::to_string_pretty(&self.contract.schema).unwrap_or_default();
        format!(
            "{}\n\n\
            OUTPUT FORMAT: When you have finished using tools, reply with a single JSON object \
            ({}) that matches this JSON Schema, with no surrounding text:\n{}\n\
            If you need input from the user, set any_user_input_required to true and put your \
            question in question_to_user.",
            self.instructions.trim(),
            self.contract.name,
            schema
        )
    }
}
