//! Prompt templates for Cutroom.
//!
//! Two families of prompts drive the pipeline: the stage prompts, appended to
//! the transcript as a user message when a stage begins, and the role
//! instructions, sent as the system message of every call a role makes.
//! Both can be customized by placing TOML files in the custom prompts
//! directory (`stages.toml` and `roles.toml`).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub stages: StagePrompts,
    pub roles: RoleInstructions,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Stage prompts, one per pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StagePrompts {
    pub analysis: String,
    pub planning: String,
    pub execution: String,
    pub quality_check: String,
}

impl Default for StagePrompts {
    fn default() -> Self {
        Self {
            analysis: r#"OVERALL WORKFLOW: Analysis (We are here now) --> Task Planning --> Execution --> Quality Check
INSTRUCTIONS:
We need to deliver the media package as per the specifications mentioned in the client's requirements document.
Analyse the client requirements thoroughly and compare them to the available input files.
Decide if it is possible to achieve the expectations using the available input files and tools.

AVAILABLE TOOLS: You can use FFMPEG, FFPROBE, ImageMagick and other terminal commands as required.
WORKING FOLDER: {{working_dir}} (All input files and requirements are in this folder)
IMPORTANT: You are only an analyst. Do not perform any actions or modify any files.
ASK QUESTIONS: If you need user input, please ask."#
                .to_string(),

            planning: r#"OVERALL WORKFLOW: Analysis --> Task Planning (We are here now) --> Execution --> Quality Check
INSTRUCTIONS:
Create a detailed step-by-step plan to achieve the desired output based on the previous analysis.
All tasks like transformation, extraction, renaming etc should be done in a separate sub-directory called '{{scratch_name}}'.
The '{{scratch_name}}' folder should be created in the '{{working_dir}}' folder. Creating this sub-directory should be the first step if it doesn't exist.
Each terminal command should be complete and self-contained.

CONTEXT: The output of the previous 'Analysis' step is attached above.
AVAILABLE TOOLS: You can use FFMPEG, FFPROBE, ImageMagick and other terminal commands.
WORKING FOLDER: {{working_dir}}
IMPORTANT: You are only a task planner. The actual execution will be performed later."#
                .to_string(),

            execution: r#"OVERALL WORKFLOW: Analysis --> Task Planning --> Execution (We are here now) --> Quality Check
INSTRUCTIONS:
You have been provided with a step-by-step plan. Execute the plan and record your observations.
If any step fails, analyse the reason, make necessary modifications to the command if needed, and try again until it succeeds.

CONTEXT: The outputs of the previous 'Analysis' and 'Task Planning' steps are attached.
AVAILABLE TOOLS: You can use FFMPEG, FFPROBE, ImageMagick and other terminal commands.
WORKING FOLDER: {{working_dir}}
IMPORTANT: Keep task executions safe and localized to the working folder."#
                .to_string(),

            quality_check: r#"OVERALL WORKFLOW: Analysis --> Task Planning --> Execution --> Quality Check (We are here now)
INSTRUCTIONS:
Check if the available files (input files and generated files in the '{{scratch_name}}' folder) satisfy the client's requirements.
You are allowed to make minor modifications if needed (like renaming files or cleaning up unnecessary files in the '{{scratch_name}}' directory).

CONTEXT: The outputs of 'Analysis', 'Task Planning' and 'Execution' are attached.
AVAILABLE TOOLS: You can use FFMPEG, FFPROBE, ImageMagick and other terminal commands.
WORKING FOLDER: {{working_dir}}
IMPORTANT: Keep task executions safe and localized to the working folder."#
                .to_string(),
        }
    }
}

/// System instructions, one per role.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleInstructions {
    pub analyst: String,
    pub planner: String,
    pub executor: String,
    pub quality_checker: String,
}

impl Default for RoleInstructions {
    fn default() -> Self {
        Self {
            analyst: r#"Your goal is to thoroughly understand the client requirements and decide if they can be achieved or not with the available input files.
You are known for your exceptional ability to clearly understand the client's requirements and decide if those targets are achievable using the available files and tools.
You will raise a flag if you find that we do not have the necessary files or tools to deliver the client's expectations."#
                .to_string(),

            planner: r#"You are an expert task planner.
You are known for your exceptional ability to understand the client requirements, the available inputs, the desired output and the available tools in hand to devise a detailed step-by-step plan.
Clearly understand the client requirements, the analysis performed by the Client Requirements Analyst and the available input files and set out a detailed step by step plan to achieve the desired outcome."#
                .to_string(),

            executor: r#"You are an expert task executor. You are known for your exceptional ability to understand the given sequence of steps and execute them successfully using the available tools.
Execute the sequence of steps provided to you."#
                .to_string(),

            quality_checker: r#"You are an expert quality checker. You are known for your exceptional ability to understand the given client requirements and check if they have been satisfied or not.
Thoroughly understand the client requirements, compare them to the available files and check if all the requirements have been met or not.
You will raise a flag if you find that the client's expectations are not successfully met."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let stages_path = custom_path.join("stages.toml");
            if stages_path.exists() {
                let content = std::fs::read_to_string(&stages_path)?;
                prompts.stages = toml::from_str(&content)?;
            }

            let roles_path = custom_path.join("roles.toml");
            if roles_path.exists() {
                let content = std::fs::read_to_string(&roles_path)?;
                prompts.roles = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
