//! Run command implementation.

use crate::agent::{event_channel, Agent, OpenAIBackend, ToolContext};
use crate::cli::{preflight, print_events, Output, TerminalResponder};
use crate::config::{ApiKey, Prompts, Settings};
use crate::openai::create_client;
use crate::orchestrator::{Pipeline, PipelineReport};
use crate::step::StepRunner;
use anyhow::{anyhow, Context, Result};
use std::sync::Arc;

/// Run the four-stage pipeline against the configured working folder.
pub async fn run_pipeline(settings: &Settings) -> Result<()> {
    // Failures are reported once, by the caller.
    preflight::check(settings)
        .map_err(|e| anyhow!("{}\nRun 'cutroom doctor' for detailed diagnostics.", e))?;
    let api_key = ApiKey::from_env(&settings.model)?;

    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;

    let client = create_client(&settings.model, &api_key)?;
    let backend = OpenAIBackend::new(client).with_json_mode(settings.model.json_mode);
    let agent = Agent::new(Arc::new(backend), ToolContext::new())
        .with_settings(&settings.runner)
        .with_temperature(settings.model.temperature);

    let (events, stream) = event_channel();
    let printer = tokio::spawn(print_events(stream));

    let runner = StepRunner::new(
        agent,
        Box::new(TerminalResponder::stdin()),
        events.clone(),
        settings.runner.max_clarification_rounds,
    );

    Output::info(&format!(
        "Working folder: {} (model {})",
        settings.working_dir().display(),
        settings.model.name
    ));

    let mut pipeline = Pipeline::new(settings, &prompts, runner, events);
    let result = pipeline.run().await;

    // Dropping the last sink lets the printer drain and exit.
    drop(pipeline);
    printer.await.ok();

    let report = result.context("Pipeline failed")?;
    print_summary(&report);
    Ok(())
}

fn print_summary(report: &PipelineReport) {
    Output::header("Summary");
    Output::kv("Run", &report.run_id.to_string());
    Output::kv(
        "Duration",
        &format!(
            "{}s",
            (report.finished_at - report.started_at).num_seconds()
        ),
    );
    Output::kv("Clarifications", &report.clarifications.to_string());
    Output::kv("Tool calls", &report.tool_calls.to_string());

    let failed = report.execution.failures().count();
    if failed > 0 {
        Output::warning(&format!("{} execution step(s) failed", failed));
    }

    let unmet: Vec<_> = report.quality_check.unmet().collect();
    if unmet.is_empty() && report.quality_check.all_requirements_satisfied {
        Output::success("All requirements satisfied.");
    } else {
        Output::warning("Quality check found unmet requirements:");
        for step in unmet {
            Output::list_item(&format!(
                "#{} {}: {}",
                step.requirement_number, step.requirement_specification, step.reasoning
            ));
        }
    }
}
