//! Cutroom - media deliverables from a written brief
//!
//! Drives a fixed four-stage pipeline of LLM roles over a working folder of
//! media assets: an analyst reads the requirements, a planner turns them into
//! shell commands, an executor runs those commands, and a quality checker
//! verifies the result. Any role may pause to ask the user a question.
//!
//! # Architecture
//!
//! - `config` - Settings, API credential and prompt templates
//! - `outputs` - Structured output contracts of the four stages
//! - `agent` - Roles, transcripts, shell tools, narration events and the
//!   tool-calling runner
//! - `step` - Clarification loop around a single role
//! - `orchestrator` - Stage sequencing and transcript hand-off
//! - `cli` - Command-line surface and terminal narration
//!
//! # Example
//!
//! ```rust,no_run
//! use cutroom::agent::{event_channel, Agent, OpenAIBackend, ToolContext};
//! use cutroom::cli::TerminalResponder;
//! use cutroom::config::{ApiKey, Prompts, Settings};
//! use cutroom::orchestrator::Pipeline;
//! use cutroom::step::StepRunner;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load_from(None)?;
//!     let key = ApiKey::from_env(&settings.model)?;
//!     let client = cutroom::openai::create_client(&settings.model, &key)?;
//!     let agent = Agent::new(Arc::new(OpenAIBackend::new(client)), ToolContext::new())
//!         .with_settings(&settings.runner);
//!
//!     let (events, _stream) = event_channel();
//!     let runner = StepRunner::new(agent, Box::new(TerminalResponder::stdin()), events.clone(), 8);
//!     let mut pipeline = Pipeline::new(&settings, &Prompts::default(), runner, events);
//!
//!     let report = pipeline.run().await?;
//!     println!("all satisfied: {}", report.quality_check.all_requirements_satisfied);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod openai;
pub mod orchestrator;
pub mod outputs;
pub mod step;

pub use error::{CutroomError, Result};
