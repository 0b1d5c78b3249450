//! Tool definitions and implementations for the agent roles.
//!
//! Every role gets the same two tools: one reports the host operating
//! system, the other runs a command through the host shell. The shell tool
//! never fails from the caller's point of view; execution faults come back
//! as a [`CommandOutcome`] with a synthetic exit code.

use crate::error::{CutroomError, Result};
use serde::{Deserialize, Serialize};
use std::process::ExitStatus;
use tracing::{debug, warn};

/// Exit code reported when the shell or command cannot be found.
pub const EXIT_NOT_FOUND: i32 = 127;
/// Exit code reported for any other execution fault.
pub const EXIT_FAULT: i32 = -1;

/// Available tools for the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    /// Report the host operating system.
    GetCurrentOs,

    /// Run a command through the host shell.
    ExecuteTerminalCommand { command: String },
}

/// Result of a shell command, as returned to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub stdout: String,
    pub stderr: String,
    pub return_code: i32,
}

impl CommandOutcome {
    fn fault(stderr: String, return_code: i32) -> Self {
        Self {
            stdout: String::new(),
            stderr,
            return_code,
        }
    }

    pub fn success(&self) -> bool {
        self.return_code == 0
    }
}

/// Shell used to interpret commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shell {
    pub program: String,
    pub flag: String,
}

impl Default for Shell {
    fn default() -> Self {
        if cfg!(windows) {
            Self {
                program: "cmd".to_string(),
                flag: "/C".to_string(),
            }
        } else {
            Self {
                program: "sh".to_string(),
                flag: "-c".to_string(),
            }
        }
    }
}

/// Normalized name of the host operating system.
///
/// Uses the conventional kernel names (`Linux`, `Darwin`, `Windows`, ...).
/// Unknown targets report the compile-time target OS string.
pub fn get_current_os() -> &'static str {
    normalize_os(std::env::consts::OS)
}

fn normalize_os(os: &'static str) -> &'static str {
    match os {
        "linux" | "android" => "Linux",
        "macos" | "ios" => "Darwin",
        "windows" => "Windows",
        "freebsd" => "FreeBSD",
        "openbsd" => "OpenBSD",
        "netbsd" => "NetBSD",
        "dragonfly" => "DragonFly",
        "solaris" | "illumos" => "SunOS",
        other => other,
    }
}

/// Run `command` through the default host shell.
pub async fn execute_terminal_command(command: &str) -> CommandOutcome {
    run_in_shell(&Shell::default(), command).await
}

async fn run_in_shell(shell: &Shell, command: &str) -> CommandOutcome {
    debug!("Running shell command: {}", command);

    let result = tokio::process::Command::new(&shell.program)
        .arg(&shell.flag)
        .arg(command)
        .output()
        .await;

    match result {
        Ok(output) => CommandOutcome {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            return_code: exit_code(output.status),
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let first = command.split_whitespace().next().unwrap_or("");
            let msg = format!("Error: The shell or command '{}' was not found.", first);
            warn!("{}", msg);
            CommandOutcome::fault(msg, EXIT_NOT_FOUND)
        }
        Err(e) => {
            let msg = format!(
                "An unexpected error occurred while executing '{}': {}",
                command, e
            );
            warn!("{}", msg);
            CommandOutcome::fault(msg, EXIT_FAULT)
        }
    }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|s| -s))
        .unwrap_or(EXIT_FAULT)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(EXIT_FAULT)
}

/// Tool execution context.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    shell: Shell,
}

impl ToolContext {
    /// Create a tool context using the default host shell.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tool context with an explicit shell.
    pub fn with_shell(shell: Shell) -> Self {
        Self { shell }
    }

    /// Execute a tool call and return the result as a string.
    pub async fn execute(&self, tool: &ToolCall) -> Result<String> {
        match tool {
            ToolCall::GetCurrentOs => Ok(get_current_os().to_string()),
            ToolCall::ExecuteTerminalCommand { command } => {
                let outcome = run_in_shell(&self.shell, command).await;
                Ok(serde_json::to_string(&outcome)?)
            }
        }
    }
}

/// Get OpenAI function/tool definitions for the agent.
pub fn tool_definitions() -> Vec<async_openai::types::ChatCompletionTool> {
    use async_openai::types::{ChatCompletionTool, ChatCompletionToolType, FunctionObject};

    vec![
        ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: "get_current_os".to_string(),
                description: Some(
                    "Returns the name of the current operating system \
                    (e.g. 'Linux', 'Windows', 'Darwin'). Use it to pick the right command syntax."
                        .to_string(),
                ),
                parameters: Some(serde_json::json!({
                    "type": "object",
                    "properties": {}
                })),
                strict: None,
            },
        },
        ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: "execute_terminal_command".to_string(),
                description: Some(
                    "Executes a terminal command string using the system's shell. \
                    Returns a JSON string containing stdout, stderr and return_code."
                        .to_string(),
                ),
                parameters: Some(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "command": {
                            "type": "string",
                            "description": "The command string to execute (e.g. \"ls -l\", \"ffprobe input.mp4\")"
                        }
                    },
                    "required": ["command"]
                })),
                strict: None,
            },
        },
    ]
}

/// Parse a tool call from the OpenAI response format.
pub fn parse_tool_call(name: &str, arguments: &str) -> Result<ToolCall> {
    match name {
        "get_current_os" => Ok(ToolCall::GetCurrentOs),
        "execute_terminal_command" => {
            let args: serde_json::Value = serde_json::from_str(arguments)
                .map_err(|e| CutroomError::Agent(format!("Invalid tool arguments: {}", e)))?;
            let command = args["command"]
                .as_str()
                .ok_or_else(|| CutroomError::Agent("Missing 'command' argument".to_string()))?
                .to_string();
            Ok(ToolCall::ExecuteTerminalCommand { command })
        }
        _ => Err(CutroomError::Agent(format!("Unknown tool: {}", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_execute_tool() {
        let tool =
            parse_tool_call("execute_terminal_command", r#"{"command": "ffprobe a.mp4"}"#).unwrap();
        assert_eq!(
            tool,
            ToolCall::ExecuteTerminalCommand {
                command: "ffprobe a.mp4".to_string()
            }
        );
    }

    #[test]
    fn test_parse_os_tool_ignores_arguments() {
        assert_eq!(parse_tool_call("get_current_os", "").unwrap(), ToolCall::GetCurrentOs);
    }

    #[test]
    fn test_parse_rejects_bad_calls() {
        assert!(parse_tool_call("execute_terminal_command", "{}").is_err());
        assert!(parse_tool_call("execute_terminal_command", "not json").is_err());
        assert!(parse_tool_call("rm_rf", "{}").is_err());
    }

    #[test]
    fn test_current_os_is_recognized() {
        let os = get_current_os();
        assert!(!os.is_empty());
        if cfg!(target_os = "linux") {
            assert_eq!(os, "Linux");
        }
        if cfg!(target_os = "macos") {
            assert_eq!(os, "Darwin");
        }
        if cfg!(windows) {
            assert_eq!(os, "Windows");
        }
    }

    #[test]
    fn test_normalize_os_passes_unknown_through() {
        assert_eq!(normalize_os("macos"), "Darwin");
        assert_eq!(normalize_os("haiku"), "haiku");
    }

    #[tokio::test]
    async fn test_echo_succeeds() {
        let outcome = execute_terminal_command("echo hi").await;
        assert_eq!(outcome.return_code, 0);
        assert!(outcome.stdout.contains("hi"));
        assert!(outcome.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_missing_command_reports_127() {
        let outcome = execute_terminal_command("nonexistent-cmd-xyz").await;
        assert_eq!(outcome.return_code, EXIT_NOT_FOUND);
        assert!(!outcome.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_missing_shell_reports_127() {
        let context = ToolContext::with_shell(Shell {
            program: "definitely-not-a-shell-xyz".to_string(),
            flag: "-c".to_string(),
        });
        let result = context
            .execute(&ToolCall::ExecuteTerminalCommand {
                command: "ffmpeg -version".to_string(),
            })
            .await
            .unwrap();
        let outcome: CommandOutcome = serde_json::from_str(&result).unwrap();
        assert_eq!(outcome.return_code, EXIT_NOT_FOUND);
        assert_eq!(
            outcome.stderr,
            "Error: The shell or command 'ffmpeg' was not found."
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_reported() {
        let outcome = execute_terminal_command("echo oops >&2; exit 3").await;
        assert_eq!(outcome.return_code, 3);
        assert_eq!(outcome.stderr.trim(), "oops");
        assert!(!outcome.success());
    }

    #[tokio::test]
    async fn test_context_returns_json_outcome() {
        let result = ToolContext::new()
            .execute(&ToolCall::ExecuteTerminalCommand {
                command: "echo hi".to_string(),
            })
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&result).unwrap();
        assert_eq!(value["return_code"], 0);
        assert!(value["stdout"].as_str().unwrap().contains("hi"));
    }
}
