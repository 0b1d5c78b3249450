//! Agent runtime: roles, tools, and the tool calling loop.
//!
//! A [`Role`] is invoked by an [`Agent`] against a [`Transcript`]. The agent
//! talks to a [`ModelBackend`], executes the shell tools the model asks for,
//! and parses the final reply into the role's stage output. Progress is
//! reported on an [`EventSink`].

mod backend;
mod events;
mod role;
mod runner;
mod tools;
mod transcript;

#[cfg(test)]
pub(crate) use backend::scripted;
pub use backend::{AssistantTurn, CompletionRequest, ModelBackend, OpenAIBackend};
pub use events::{event_channel, AgentEvent, EventSink, EventStream};
pub use role::{OutputContract, Role, Stage};
pub use runner::{Agent, AgentResponse, ToolCallRecord};
pub use tools::{
    execute_terminal_command, get_current_os, parse_tool_call, tool_definitions, CommandOutcome,
    Shell, ToolCall, ToolContext, EXIT_FAULT, EXIT_NOT_FOUND,
};
pub use transcript::{Message, ToolInvocation, Transcript};
