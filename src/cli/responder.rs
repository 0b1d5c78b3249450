//! Clarification answers read from the terminal.

use crate::error::{CutroomError, Result};
use crate::step::Responder;
use async_trait::async_trait;
use console::style;
use std::io::{self, Write};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};

/// Asks clarification questions on the terminal, one line per answer.
pub struct TerminalResponder<R> {
    lines: Lines<R>,
}

impl TerminalResponder<BufReader<Stdin>> {
    /// Read answers from standard input.
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin + Send> TerminalResponder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> Responder for TerminalResponder<R> {
    async fn respond(&mut self, role_name: &str, question: &str) -> Result<String> {
        println!("\n{} {}", style(format!("{} >>", role_name)).cyan().bold(), question);

        loop {
            print!("{} ", style("User Response >>").green().bold());
            io::stdout().flush()?;

            let Some(line) = self.lines.next_line().await? else {
                return Err(CutroomError::InvalidInput(
                    "standard input closed while waiting for an answer".to_string(),
                ));
            };

            let answer = line.trim();
            if !answer.is_empty() {
                return Ok(answer.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_blank_lines_are_skipped() {
        let mut responder = TerminalResponder::new(&b"\n   \n 25 fps \nstereo\n"[..]);

        let first = responder
            .respond("Client Requirements Analyst", "Which frame rate?")
            .await
            .unwrap();
        let second = responder
            .respond("Client Requirements Analyst", "Stereo or 5.1?")
            .await
            .unwrap();

        assert_eq!(first, "25 fps");
        assert_eq!(second, "stereo");
    }

    #[tokio::test]
    async fn test_closed_input_is_an_error() {
        let mut responder = TerminalResponder::new(&b"\n"[..]);
        let err = responder
            .respond("Senior Media Post-Production Quality Checker", "Retry?")
            .await
            .unwrap_err();
        assert!(matches!(err, CutroomError::InvalidInput(_)));
    }
}
