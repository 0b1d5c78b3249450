//! Configuration module for Cutroom.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, RoleInstructions, StagePrompts};
pub use settings::{
    ApiKey, GeneralSettings, ModelSettings, PromptSettings, RunnerSettings, Settings,
    WorkspaceSettings,
};
