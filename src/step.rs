//! Interactive step runner.
//!
//! Runs one role to completion, looping in the user whenever the role's
//! output asks for clarification.

use crate::agent::{Agent, EventSink, Role, Transcript};
use crate::error::{CutroomError, Result};
use crate::outputs::StageOutput;
use async_trait::async_trait;
use tracing::info;

/// Source of answers to clarification questions.
#[async_trait]
pub trait Responder: Send {
    /// Put `question` from `role_name` to the user and return the answer.
    async fn respond(&mut self, role_name: &str, question: &str) -> Result<String>;
}

/// Result of running one stage.
#[derive(Debug)]
pub struct StepOutcome<T> {
    pub output: T,
    /// Input transcript plus everything appended while running the stage.
    pub transcript: Transcript,
    pub role_name: String,
    pub clarifications: usize,
    pub tool_calls: usize,
}

/// Drives roles, asking the user for input when a role needs it.
pub struct StepRunner {
    agent: Agent,
    responder: Box<dyn Responder>,
    events: EventSink,
    max_clarification_rounds: usize,
}

impl StepRunner {
    pub fn new(
        agent: Agent,
        responder: Box<dyn Responder>,
        events: EventSink,
        max_clarification_rounds: usize,
    ) -> Self {
        Self {
            agent,
            responder,
            events,
            max_clarification_rounds,
        }
    }

    /// Run `role` until its output no longer asks for user input.
    ///
    /// Each clarification round appends exactly one user message (the
    /// answer) after the role's own turn, then re-invokes the same role.
    pub async fn run<T: StageOutput>(
        &mut self,
        role: &Role,
        transcript: Transcript,
    ) -> Result<StepOutcome<T>> {
        let mut transcript = transcript;
        let mut clarifications = 0;
        let mut tool_calls = 0;

        loop {
            let response = self
                .agent
                .invoke::<T>(role, &mut transcript, &self.events)
                .await?;
            tool_calls += response.tool_calls.len();

            let Some(question) = response.output.clarification().pending_question() else {
                return Ok(StepOutcome {
                    output: response.output,
                    transcript,
                    role_name: role.name().to_string(),
                    clarifications,
                    tool_calls,
                });
            };

            clarifications += 1;
            if clarifications > self.max_clarification_rounds {
                return Err(CutroomError::ClarificationLimit {
                    role: role.name().to_string(),
                    limit: self.max_clarification_rounds,
                });
            }

            info!("{} asked for clarification (round {})", role.name(), clarifications);

            // The question must appear after everything narrated so far.
            self.events.flush().await;
            let answer = self.responder.respond(role.name(), question).await?;
            transcript.push_user(answer);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Responder that replays canned answers and records the questions.
    #[derive(Clone, Default)]
    pub struct ScriptedResponder {
        answers: Arc<Mutex<VecDeque<String>>>,
        pub asked: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl ScriptedResponder {
        pub fn new(answers: &[&str]) -> Self {
            Self {
                answers: Arc::new(Mutex::new(answers.iter().map(|a| a.to_string()).collect())),
                asked: Arc::default(),
            }
        }

        pub fn questions(&self) -> Vec<(String, String)> {
            self.asked.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Responder for ScriptedResponder {
        async fn respond(&mut self, role_name: &str, question: &str) -> Result<String> {
            self.asked
                .lock()
                .unwrap()
                .push((role_name.to_string(), question.to_string()));
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| CutroomError::InvalidInput("no scripted answer left".to_string()))
        }
    }
}
