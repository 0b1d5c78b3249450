//! Terminal printer for the narration channel.

use super::output::truncate;
use crate::agent::{AgentEvent, EventStream};
use console::style;
use std::io::{self, Write};

/// Longest tool output echoed to the terminal.
const MAX_TOOL_OUTPUT: usize = 2000;

/// Print events until every sink is dropped.
pub async fn print_events(mut stream: EventStream) {
    let mut printer = Printer::default();
    while let Some(event) = stream.next().await {
        printer.print(&event);
    }
    printer.end_line();
}

#[derive(Default)]
struct Printer {
    /// Streamed text left the cursor mid-line.
    mid_line: bool,
}

impl Printer {
    fn print(&mut self, event: &AgentEvent) {
        match event {
            AgentEvent::TextDelta(text) => {
                print!("{}", style(text).green());
                io::stdout().flush().ok();
                self.mid_line = !text.ends_with('\n');
                return;
            }
            AgentEvent::StageStarted { stage } => {
                self.end_line();
                println!("{}", style(format!("----- STARTING {} -----", stage)).bold());
            }
            AgentEvent::RoleStarted { role } => {
                self.end_line();
                println!("{}", style(format!("> Current Agent: {}", role)).green());
            }
            AgentEvent::ToolCalled { name, arguments } => {
                self.end_line();
                println!("{}", style(format!("> Tool Called: {}", name)).green());
                println!("{}", style(format!("> Tool Args: {}", arguments)).green());
            }
            AgentEvent::ToolOutput { output, .. } => {
                self.end_line();
                println!(
                    "{}",
                    style(format!("> Tool Output: {}", truncate(output, MAX_TOOL_OUTPUT))).green()
                );
            }
            AgentEvent::StageCompleted { output, .. } => {
                self.end_line();
                println!();
                println!("{}", output);
            }
            AgentEvent::PipelineCompleted => {
                self.end_line();
                println!("{}", style("----- WORKFLOW COMPLETE -----").bold());
            }
        }
        self.mid_line = false;
    }

    fn end_line(&mut self) {
        if self.mid_line {
            println!();
            self.mid_line = false;
        }
    }
}
