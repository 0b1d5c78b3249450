//! Structured outputs produced by the four pipeline stages.
//!
//! Every container carries one [`Clarification`] flattened into its top
//! level, so the JSON the model writes has `any_user_input_required` and
//! `question_to_user` next to the stage's own fields.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A role's request for more input from the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Clarification {
    pub any_user_input_required: bool,
    /// Ask additional inputs from the user if needed or if all requirements cannot be satisfied.
    #[serde(default)]
    pub question_to_user: Option<String>,
}

impl Clarification {
    /// The question to put to the user, if one is pending.
    pub fn pending_question(&self) -> Option<&str> {
        if !self.any_user_input_required {
            return None;
        }
        self.question_to_user
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }

    fn validate(&self) -> Result<(), String> {
        if self.any_user_input_required && self.pending_question().is_none() {
            return Err(
                "any_user_input_required is true but question_to_user is empty".to_string(),
            );
        }
        Ok(())
    }
}

/// Contract shared by the four stage outputs.
pub trait StageOutput:
    Serialize + DeserializeOwned + JsonSchema + fmt::Debug + Clone + Send + Sync + 'static
{
    /// Name of the contract as shown to the model.
    const CONTRACT: &'static str;

    fn clarification(&self) -> &Clarification;

    /// JSON Schema describing the expected object, derived from the type.
    fn json_schema() -> Value {
        serde_json::to_value(schemars::schema_for!(Self)).unwrap_or(Value::Null)
    }

    /// Checks that serde cannot express.
    fn validate(&self) -> Result<(), String> {
        self.clarification().validate()
    }
}

/// Analyst verdict on one requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RequirementAnalysis {
    pub requirement_number: u32,
    pub requirement_specification: String,
    pub relevant_available_files: Vec<String>,
    pub requirement_satisfied_already: bool,
    /// Left empty when the requirement is already satisfied.
    #[serde(default)]
    pub possible_to_satisfy_requirement: Option<bool>,
    #[serde(default)]
    pub plan_of_action: Option<String>,
    pub reasoning: String,
}

/// Output of the Analysis stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AllRequirementsAnalysis {
    pub all_requirements_analysis: Vec<RequirementAnalysis>,
    pub can_satisfy_all_requirements: bool,
    #[serde(flatten)]
    pub clarification: Clarification,
}

impl StageOutput for AllRequirementsAnalysis {
    const CONTRACT: &'static str = "AllRequirementsAnalysis";

    fn clarification(&self) -> &Clarification {
        &self.clarification
    }
}

/// One planned terminal command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PlannerStep {
    pub step_number: u32,
    pub description: String,
    /// Complete, self-contained command for the host shell.
    pub terminal_command: String,
    pub reasoning: String,
}

/// Output of the Planning stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AllPlannerSteps {
    pub all_planner_steps: Vec<PlannerStep>,
    pub can_satisfy_all_requirements: bool,
    #[serde(flatten)]
    pub clarification: Clarification,
}

impl StageOutput for AllPlannerSteps {
    const CONTRACT: &'static str = "AllPlannerSteps";

    fn clarification(&self) -> &Clarification {
        &self.clarification
    }
}

/// Outcome of one executed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ExecutionStatus {
    Success,
    Failure,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStatus::Success => write!(f, "Success"),
            ExecutionStatus::Failure => write!(f, "Failure"),
        }
    }
}

/// Executor record for one planned step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExecutorStep {
    pub step_number: u32,
    pub terminal_command: String,
    pub execution_status: ExecutionStatus,
    pub command_changed: bool,
    /// The command actually run, when it differs from the planned one.
    #[serde(default)]
    pub updated_command: Option<String>,
    #[serde(default)]
    pub challenges_faced: Option<String>,
}

/// Output of the Execution stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AllExecutorSteps {
    pub all_executor_steps: Vec<ExecutorStep>,
    pub can_satisfy_all_requirements: bool,
    #[serde(flatten)]
    pub clarification: Clarification,
}

impl AllExecutorSteps {
    /// Steps that ended in failure.
    pub fn failures(&self) -> impl Iterator<Item = &ExecutorStep> {
        self.all_executor_steps
            .iter()
            .filter(|s| s.execution_status == ExecutionStatus::Failure)
    }
}

impl StageOutput for AllExecutorSteps {
    const CONTRACT: &'static str = "AllExecutorSteps";

    fn clarification(&self) -> &Clarification {
        &self.clarification
    }
}

/// QC verdict on one requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QcStep {
    pub requirement_number: u32,
    pub requirement_specification: String,
    pub relevant_available_files: Vec<String>,
    pub requirement_satisfied_successfully: bool,
    pub reasoning: String,
}

/// Output of the Quality Check stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AllQcSteps {
    pub all_qc_steps: Vec<QcStep>,
    pub all_requirements_satisfied: bool,
    #[serde(flatten)]
    pub clarification: Clarification,
}

impl AllQcSteps {
    /// Requirements QC could not confirm.
    pub fn unmet(&self) -> impl Iterator<Item = &QcStep> {
        self.all_qc_steps
            .iter()
            .filter(|s| !s.requirement_satisfied_successfully)
    }
}

impl StageOutput for AllQcSteps {
    const CONTRACT: &'static str = "AllQCSteps";

    fn clarification(&self) -> &Clarification {
        &self.clarification
    }
}
