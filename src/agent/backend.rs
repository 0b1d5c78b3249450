//! Chat completion backends.

use super::events::{AgentEvent, EventSink};
use super::transcript::{Message, ToolInvocation};
use crate::error::{CutroomError, Result};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolType, CreateChatCompletionRequestArgs, FunctionCall,
    ResponseFormat,
};
use async_openai::Client;
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::BTreeMap;
use tracing::debug;

/// One backend call.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ChatCompletionTool>,
    pub temperature: Option<f32>,
}

/// The model's reply to one call: narration text and/or tool calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssistantTurn {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolInvocation>,
}

impl AssistantTurn {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }
}

/// Trait for chat completion backends.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Run one completion. Narration produced along the way goes to `events`.
    async fn complete(&self, request: CompletionRequest, events: &EventSink)
        -> Result<AssistantTurn>;
}

/// Streaming backend for OpenAI-compatible chat completion APIs.
pub struct OpenAIBackend {
    client: Client<OpenAIConfig>,
    json_mode: bool,
}

#[derive(Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

impl OpenAIBackend {
    pub fn new(client: Client<OpenAIConfig>) -> Self {
        Self {
            client,
            json_mode: true,
        }
    }

    /// Whether to request `json_object` responses.
    pub fn with_json_mode(mut self, enabled: bool) -> Self {
        self.json_mode = enabled;
        self
    }

    fn to_request_messages(request: &CompletionRequest) -> Result<Vec<ChatCompletionRequestMessage>> {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::with_capacity(request.messages.len() + 1);

        messages.push(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(request.system.clone())
                .build()
                .map_err(|e| CutroomError::Agent(e.to_string()))?
                .into(),
        );

        for message in &request.messages {
            let converted: ChatCompletionRequestMessage = match message {
                Message::User { content } => ChatCompletionRequestUserMessageArgs::default()
                    .content(content.clone())
                    .build()
                    .map_err(|e| CutroomError::Agent(e.to_string()))?
                    .into(),
                Message::Assistant {
                    content,
                    tool_calls,
                } => {
                    let mut args = ChatCompletionRequestAssistantMessageArgs::default();
                    if let Some(text) = content {
                        args.content(text.clone());
                    }
                    if !tool_calls.is_empty() {
                        args.tool_calls(
                            tool_calls
                                .iter()
                                .map(|call| ChatCompletionMessageToolCall {
                                    id: call.id.clone(),
                                    r#type: ChatCompletionToolType::Function,
                                    function: FunctionCall {
                                        name: call.name.clone(),
                                        arguments: call.arguments.clone(),
                                    },
                                })
                                .collect::<Vec<_>>(),
                        );
                    }
                    args.build()
                        .map_err(|e| CutroomError::Agent(e.to_string()))?
                        .into()
                }
                Message::Tool {
                    tool_call_id,
                    content,
                } => ChatCompletionRequestToolMessageArgs::default()
                    .tool_call_id(tool_call_id.clone())
                    .content(content.clone())
                    .build()
                    .map_err(|e| CutroomError::Agent(e.to_string()))?
                    .into(),
            };
            messages.push(converted);
        }

        Ok(messages)
    }
}

#[async_trait]
impl ModelBackend for OpenAIBackend {
    async fn complete(
        &self,
        request: CompletionRequest,
        events: &EventSink,
    ) -> Result<AssistantTurn> {
        let messages = Self::to_request_messages(&request)?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&request.model).messages(messages);
        if self.json_mode {
            args.response_format(ResponseFormat::JsonObject);
        }
        if !request.tools.is_empty() {
            args.tools(request.tools.clone());
        }
        if let Some(temperature) = request.temperature {
            args.temperature(temperature);
        }
        let chat_request = args
            .build()
            .map_err(|e| CutroomError::Agent(e.to_string()))?;

        let mut stream = self
            .client
            .chat()
            .create_stream(chat_request)
            .await
            .map_err(|e| CutroomError::OpenAI(format!("Chat stream error: {}", e)))?;

        let mut content = String::new();
        let mut calls: BTreeMap<u32, PartialToolCall> = BTreeMap::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| CutroomError::OpenAI(format!("Chat stream error: {}", e)))?;

            for choice in chunk.choices.into_iter().filter(|c| c.index == 0) {
                if let Some(text) = choice.delta.content {
                    if !text.is_empty() {
                        events.emit(AgentEvent::TextDelta(text.clone()));
                        content.push_str(&text);
                    }
                }

                for call in choice.delta.tool_calls.unwrap_or_default() {
                    let entry = calls.entry(call.index).or_default();
                    if let Some(id) = call.id {
                        entry.id = id;
                    }
                    if let Some(function) = call.function {
                        if let Some(name) = function.name {
                            entry.name.push_str(&name);
                        }
                        if let Some(arguments) = function.arguments {
                            entry.arguments.push_str(&arguments);
                        }
                    }
                }
            }
        }

        let tool_calls: Vec<ToolInvocation> = calls
            .into_iter()
            .map(|(index, call)| ToolInvocation {
                id: if call.id.is_empty() {
                    format!("call_{}", index)
                } else {
                    call.id
                },
                name: call.name,
                arguments: call.arguments,
            })
            .collect();

        debug!(
            "Backend reply: {} chars, {} tool call(s)",
            content.len(),
            tool_calls.len()
        );

        Ok(AssistantTurn {
            content: if content.is_empty() { None } else { Some(content) },
            tool_calls,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::events::event_channel;
    use crate::config::{ApiKey, ModelSettings};
    use crate::openai::create_client;
    use serde_json::{json, Value};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve one chat completion request with `chunks` as server-sent events.
    /// Resolves to the JSON body of the request.
    async fn serve_stream(chunks: Vec<Value>) -> (String, JoinHandle<Value>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/v1", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();

            let mut buf = Vec::new();
            let mut read_buf = [0u8; 4096];
            let body = loop {
                let n = socket.read(&mut read_buf).await.unwrap();
                assert!(n > 0, "connection closed before the request was complete");
                buf.extend_from_slice(&read_buf[..n]);

                let text = String::from_utf8_lossy(&buf).to_string();
                let Some(end) = text.find("\r\n\r\n") else {
                    continue;
                };
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break buf[end + 4..end + 4 + length].to_vec();
                }
            };

            let mut response = String::from(
                "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ncache-control: no-cache\r\nconnection: close\r\n\r\n",
            );
            for event in chunks {
                response.push_str(&format!("data: {}\n\n", event));
            }
            response.push_str("data: [DONE]\n\n");
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();

            serde_json::from_slice(&body).unwrap()
        });

        (base_url, handle)
    }

    fn chunk(delta: Value) -> Value {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion.chunk",
            "created": 1700000000,
            "model": "test-model",
            "choices": [{ "index": 0, "delta": delta, "finish_reason": null }]
        })
    }

    fn backend_for(base_url: &str, json_mode: bool) -> OpenAIBackend {
        let model = ModelSettings {
            base_url: Some(base_url.to_string()),
            timeout_secs: 10,
            ..ModelSettings::default()
        };
        let client = create_client(&model, &ApiKey::new("test-key").unwrap()).unwrap();
        OpenAIBackend::new(client).with_json_mode(json_mode)
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "test-model".to_string(),
            system: "You are an expert task executor.".to_string(),
            messages: vec![Message::user("Execute the plan")],
            tools: crate::agent::tools::tool_definitions(),
            temperature: None,
        }
    }

    #[tokio::test]
    async fn test_stream_joins_split_tool_calls() {
        let (base_url, server) = serve_stream(vec![
            chunk(json!({ "role": "assistant", "tool_calls": [{
                "index": 0, "id": "call_a", "type": "function",
                "function": { "name": "execute_terminal_command", "arguments": "{\"comm" }
            }]})),
            chunk(json!({ "tool_calls": [{
                "index": 0, "function": { "arguments": "and\":\"ls\"}" }
            }]})),
            // Second call arrives without an id
            chunk(json!({ "tool_calls": [{
                "index": 1, "type": "function",
                "function": { "name": "get_current_os", "arguments": "{}" }
            }]})),
        ])
        .await;

        let turn = backend_for(&base_url, false)
            .complete(request(), &EventSink::disabled())
            .await
            .unwrap();

        assert_eq!(turn.content, None);
        assert_eq!(
            turn.tool_calls,
            vec![
                ToolInvocation {
                    id: "call_a".to_string(),
                    name: "execute_terminal_command".to_string(),
                    arguments: r#"{"command":"ls"}"#.to_string(),
                },
                ToolInvocation {
                    id: "call_1".to_string(),
                    name: "get_current_os".to_string(),
                    arguments: "{}".to_string(),
                },
            ]
        );

        // Without JSON mode the tools go out alone
        let body = server.await.unwrap();
        assert!(body.get("response_format").is_none());
        assert_eq!(body["tools"].as_array().unwrap().len(), 2);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["stream"], json!(true));
    }

    #[tokio::test]
    async fn test_stream_emits_text_deltas() {
        let (base_url, server) = serve_stream(vec![
            chunk(json!({ "role": "assistant", "content": "{\"all_" })),
            chunk(json!({ "content": "" })),
            chunk(json!({ "content": "qc_steps\": []}" })),
        ])
        .await;
        let (events, stream) = event_channel();

        let turn = backend_for(&base_url, true)
            .complete(request(), &events)
            .await
            .unwrap();
        drop(events);

        assert_eq!(turn.content.as_deref(), Some(r#"{"all_qc_steps": []}"#));
        assert!(turn.tool_calls.is_empty());
        assert_eq!(
            stream.collect().await,
            vec![
                AgentEvent::TextDelta(r#"{"all_"#.to_string()),
                AgentEvent::TextDelta(r#"qc_steps": []}"#.to_string()),
            ]
        );

        let body = server.await.unwrap();
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_request_messages_start_with_system() {
        let request = CompletionRequest {
            model: "gpt-4o-mini".to_string(),
            system: "You are an expert task executor.".to_string(),
            messages: vec![
                Message::user("Execute the plan"),
                Message::Assistant {
                    content: None,
                    tool_calls: vec![ToolInvocation {
                        id: "call_1".to_string(),
                        name: "get_current_os".to_string(),
                        arguments: "{}".to_string(),
                    }],
                },
                Message::Tool {
                    tool_call_id: "call_1".to_string(),
                    content: "Linux".to_string(),
                },
                Message::assistant("{}"),
            ],
            tools: Vec::new(),
            temperature: None,
        };

        let messages = OpenAIBackend::to_request_messages(&request).unwrap();
        assert_eq!(messages.len(), 5);
        assert!(matches!(messages[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(messages[1], ChatCompletionRequestMessage::User(_)));
        assert!(matches!(messages[2], ChatCompletionRequestMessage::Assistant(_)));
        assert!(matches!(messages[3], ChatCompletionRequestMessage::Tool(_)));
        assert!(matches!(messages[4], ChatCompletionRequestMessage::Assistant(_)));
    }
}
