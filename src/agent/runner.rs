//! Agent runner with tool calling loop.

use super::backend::{CompletionRequest, ModelBackend};
use super::events::{AgentEvent, EventSink};
use super::role::Role;
use super::tools::{parse_tool_call, ToolContext};
use super::transcript::{Message, ToolInvocation, Transcript};
use crate::config::RunnerSettings;
use crate::error::{CutroomError, Result};
use crate::outputs::StageOutput;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Drives a role against a transcript until it produces its structured output.
pub struct Agent {
    backend: Arc<dyn ModelBackend>,
    tools: ToolContext,
    max_iterations: usize,
    max_schema_retries: usize,
    temperature: Option<f32>,
}

impl Agent {
    /// Create a new agent with the given backend and tool context.
    pub fn new(backend: Arc<dyn ModelBackend>, tools: ToolContext) -> Self {
        let defaults = RunnerSettings::default();
        Self {
            backend,
            tools,
            max_iterations: defaults.max_tool_iterations,
            max_schema_retries: defaults.max_schema_retries,
            temperature: None,
        }
    }

    /// Apply the limits from the runner settings.
    pub fn with_settings(mut self, settings: &RunnerSettings) -> Self {
        self.max_iterations = settings.max_tool_iterations;
        self.max_schema_retries = settings.max_schema_retries;
        self
    }

    /// Set maximum backend calls for one invocation.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Set how many times a malformed output is sent back for correction.
    pub fn with_max_schema_retries(mut self, max: usize) -> Self {
        self.max_schema_retries = max;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Invoke `role` against `transcript`, appending every turn it produces.
    ///
    /// Tool calls are executed sequentially and their results fed back until
    /// the model answers without tools. That answer must parse as `T`;
    /// otherwise the violation is reported back to the model as a user
    /// message, up to the configured retry budget.
    pub async fn invoke<T: StageOutput>(
        &self,
        role: &Role,
        transcript: &mut Transcript,
        events: &EventSink,
    ) -> Result<AgentResponse<T>> {
        events.emit(AgentEvent::RoleStarted {
            role: role.name().to_string(),
        });

        let system = role.system_prompt();
        let mut iterations = 0;
        let mut schema_failures = 0;
        let mut tool_calls_made = Vec::new();

        loop {
            iterations += 1;
            if iterations > self.max_iterations {
                return Err(CutroomError::ToolIterationLimit {
                    role: role.name().to_string(),
                    limit: self.max_iterations,
                });
            }

            debug!("{} iteration {}", role.name(), iterations);

            let request = CompletionRequest {
                model: role.model().to_string(),
                system: system.clone(),
                messages: transcript.messages().to_vec(),
                tools: role.tools().to_vec(),
                temperature: self.temperature,
            };

            let turn = self.backend.complete(request, events).await?;

            if !turn.tool_calls.is_empty() {
                transcript.push(Message::Assistant {
                    content: turn.content,
                    tool_calls: turn.tool_calls.clone(),
                });

                for call in &turn.tool_calls {
                    let record = self.execute_tool_call(call, events).await;
                    transcript.push(Message::Tool {
                        tool_call_id: call.id.clone(),
                        content: record.result.clone(),
                    });
                    tool_calls_made.push(record);
                }
                continue;
            }

            let content = turn.content.unwrap_or_default();
            transcript.push(Message::assistant(content.clone()));

            match parse_output::<T>(&content) {
                Ok(output) => {
                    info!(
                        "{} produced {} after {} iteration(s)",
                        role.name(),
                        T::CONTRACT,
                        iterations
                    );
                    return Ok(AgentResponse {
                        output,
                        tool_calls: tool_calls_made,
                        iterations,
                    });
                }
                Err(reason) => {
                    schema_failures += 1;
                    if schema_failures > self.max_schema_retries {
                        return Err(CutroomError::Schema {
                            role: role.name().to_string(),
                            contract: T::CONTRACT.to_string(),
                            attempts: schema_failures,
                            reason,
                        });
                    }
                    warn!(
                        "{} returned an invalid {}: {}",
                        role.name(),
                        T::CONTRACT,
                        reason
                    );
                    transcript.push_user(format!(
                        "Your last reply is not a valid {} object: {}. \
                        Reply again with only the JSON object described in your instructions.",
                        T::CONTRACT,
                        reason
                    ));
                }
            }
        }
    }

    /// Execute a single tool call and return a record of it.
    async fn execute_tool_call(&self, call: &ToolInvocation, events: &EventSink) -> ToolCallRecord {
        info!("Agent calling tool: {} with args: {}", call.name, call.arguments);
        events.emit(AgentEvent::ToolCalled {
            name: call.name.clone(),
            arguments: call.arguments.clone(),
        });

        let result = match parse_tool_call(&call.name, &call.arguments) {
            Ok(tool) => match self.tools.execute(&tool).await {
                Ok(output) => output,
                Err(e) => format!("Tool error: {}", e),
            },
            Err(e) => format!("Failed to parse tool call: {}", e),
        };

        events.emit(AgentEvent::ToolOutput {
            name: call.name.clone(),
            output: result.clone(),
        });

        ToolCallRecord {
            name: call.name.clone(),
            arguments: call.arguments.clone(),
            result,
        }
    }
}

/// Parse the model's final text as a stage output.
fn parse_output<T: StageOutput>(content: &str) -> std::result::Result<T, String> {
    let json = strip_code_fence(content);
    if json.is_empty() {
        return Err("the reply was empty".to_string());
    }
    let output: T = serde_json::from_str(json).map_err(|e| e.to_string())?;
    output.validate()?;
    Ok(output)
}

/// Remove a surrounding markdown code fence, if any.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}

/// Response from an agent invocation.
#[derive(Debug)]
pub struct AgentResponse<T> {
    /// The parsed structured output.
    pub output: T,
    /// Record of all tool calls made during execution.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of iterations (backend calls) used.
    pub iterations: usize,
}

/// Record of a tool call made by the agent.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    /// Name of the tool called.
    pub name: String,
    /// JSON arguments passed to the tool.
    pub arguments: String,
    /// Result returned by the tool.
    pub result: String,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::backend::scripted::{json_turn, tool_turn, ScriptedBackend};
    use crate::agent::backend::AssistantTurn;
    use crate::agent::role::Stage;
    use crate::outputs::{AllExecutorSteps, Clarification, ExecutionStatus, ExecutorStep};
    use serde_json::json;

    fn executor_role() -> Role {
        Role::new::<AllExecutorSteps>(
            Stage::Execution.role_name(),
            "Execute the plan.",
            "test-model",
        )
    }

    fn executed(command: &str) -> AllExecutorSteps {
        AllExecutorSteps {
            all_executor_steps: vec![ExecutorStep {
                step_number: 1,
                terminal_command: command.to_string(),
                execution_status: ExecutionStatus::Success,
                command_changed: false,
                updated_command: None,
                challenges_faced: None,
            }],
            can_satisfy_all_requirements: true,
            clarification: Clarification::default(),
        }
    }

    #[test]
    fn test_tool_call_record_display() {
        let record = ToolCallRecord {
            name: "execute_terminal_command".to_string(),
            arguments: r#"{"command": "ls"}"#.to_string(),
            result: "{}".to_string(),
        };
        assert_eq!(
            format!("{}", record),
            r#"execute_terminal_command({"command": "ls"})"#
        );
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[tokio::test]
    async fn test_tool_results_are_fed_back() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            tool_turn("call_1", "execute_terminal_command", json!({"command": "echo hi"})),
            json_turn(&executed("echo hi")),
        ]));
        let agent = Agent::new(backend.clone(), ToolContext::new());
        let mut transcript = Transcript::starting_with("Execute the plan");

        let response = agent
            .invoke::<AllExecutorSteps>(&executor_role(), &mut transcript, &EventSink::disabled())
            .await
            .unwrap();

        assert_eq!(response.iterations, 2);
        assert_eq!(response.tool_calls.len(), 1);
        assert!(response.tool_calls[0].result.contains("\"return_code\":0"));

        // user, assistant(tool call), tool result, assistant(final)
        assert_eq!(transcript.len(), 4);
        match &transcript.messages()[2] {
            Message::Tool {
                tool_call_id,
                content,
            } => {
                assert_eq!(tool_call_id, "call_1");
                assert!(content.contains("hi"));
            }
            other => panic!("Expected tool message, got {:?}", other),
        }

        let requests = backend.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].system.starts_with("Execute the plan."));
        assert_eq!(requests[1].messages.len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_to_model() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            tool_turn("call_1", "delete_everything", json!({})),
            json_turn(&executed("noop")),
        ]));
        let agent = Agent::new(backend, ToolContext::new());
        let mut transcript = Transcript::starting_with("go");

        let response = agent
            .invoke::<AllExecutorSteps>(&executor_role(), &mut transcript, &EventSink::disabled())
            .await
            .unwrap();

        assert!(response.tool_calls[0]
            .result
            .starts_with("Failed to parse tool call"));
    }

    #[tokio::test]
    async fn test_invalid_output_is_reprompted() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            AssistantTurn::text("I ran everything, it went great!"),
            AssistantTurn::text(format!(
                "```json\n{}\n```",
                serde_json::to_string(&executed("ls")).unwrap()
            )),
        ]));
        let agent = Agent::new(backend, ToolContext::new()).with_max_schema_retries(1);
        let mut transcript = Transcript::starting_with("go");

        let response = agent
            .invoke::<AllExecutorSteps>(&executor_role(), &mut transcript, &EventSink::disabled())
            .await
            .unwrap();

        assert_eq!(response.output.all_executor_steps[0].terminal_command, "ls");
        // user, bad assistant, correction, good assistant
        assert_eq!(transcript.len(), 4);
        assert_eq!(transcript.user_message_count(), 2);
    }

    #[tokio::test]
    async fn test_schema_retry_budget_is_enforced() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            AssistantTurn::text("not json"),
            AssistantTurn::text("still not json"),
        ]));
        let agent = Agent::new(backend, ToolContext::new()).with_max_schema_retries(1);
        let mut transcript = Transcript::starting_with("go");

        let err = agent
            .invoke::<AllExecutorSteps>(&executor_role(), &mut transcript, &EventSink::disabled())
            .await
            .unwrap_err();

        assert!(matches!(err, CutroomError::Schema { attempts: 2, .. }));
    }

    #[tokio::test]
    async fn test_tool_iteration_limit() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            tool_turn("call_1", "get_current_os", json!({})),
            tool_turn("call_2", "get_current_os", json!({})),
            tool_turn("call_3", "get_current_os", json!({})),
        ]));
        let agent = Agent::new(backend, ToolContext::new()).with_max_iterations(2);
        let mut transcript = Transcript::starting_with("go");

        let err = agent
            .invoke::<AllExecutorSteps>(&executor_role(), &mut transcript, &EventSink::disabled())
            .await
            .unwrap_err();

        assert!(matches!(err, CutroomError::ToolIterationLimit { limit: 2, .. }));
    }

    #[tokio::test]
    async fn test_backend_failure_propagates() {
        let backend = Arc::new(ScriptedBackend::new(Vec::new()));
        let agent = Agent::new(backend, ToolContext::new());
        let mut transcript = Transcript::starting_with("go");

        let err = agent
            .invoke::<AllExecutorSteps>(&executor_role(), &mut transcript, &EventSink::disabled())
            .await
            .unwrap_err();

        assert!(matches!(err, CutroomError::OpenAI(_)));
    }
}
