//! Pipeline orchestrator for Cutroom.
//!
//! Runs the four stages in fixed order. Each stage starts from the previous
//! stage's finalized transcript with its own stage prompt appended, so later
//! roles see every earlier turn and structured output.

use crate::agent::{AgentEvent, EventSink, Role, Stage, Transcript};
use crate::config::{Prompts, Settings};
use crate::error::Result;
use crate::outputs::{
    AllExecutorSteps, AllPlannerSteps, AllQcSteps, AllRequirementsAnalysis, StageOutput,
};
use crate::step::StepRunner;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, instrument};
use uuid::Uuid;

/// Finalized outputs of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub analysis: AllRequirementsAnalysis,
    pub plan: AllPlannerSteps,
    pub execution: AllExecutorSteps,
    pub quality_check: AllQcSteps,
    /// Clarification questions answered across all stages.
    pub clarifications: usize,
    /// Tool calls made across all stages.
    pub tool_calls: usize,
}

/// Role and rendered prompt for one stage.
struct StagePlan {
    role: Role,
    prompt: String,
}

/// The four-stage delivery pipeline.
pub struct Pipeline {
    runner: StepRunner,
    events: EventSink,
    analysis: StagePlan,
    planning: StagePlan,
    execution: StagePlan,
    quality_check: StagePlan,
    clarifications: usize,
    tool_calls: usize,
}

impl Pipeline {
    /// Build the pipeline's roles and stage prompts from configuration.
    pub fn new(settings: &Settings, prompts: &Prompts, runner: StepRunner, events: EventSink) -> Self {
        let vars = prompt_variables(settings);
        let model = settings.model.name.as_str();
        let render = |template: &str| prompts.render_with_custom(template, &vars);

        let analysis = StagePlan {
            role: Role::new::<AllRequirementsAnalysis>(
                Stage::Analysis.role_name(),
                render(&prompts.roles.analyst),
                model,
            ),
            prompt: render(&prompts.stages.analysis),
        };
        let planning = StagePlan {
            role: Role::new::<AllPlannerSteps>(
                Stage::Planning.role_name(),
                render(&prompts.roles.planner),
                model,
            ),
            prompt: render(&prompts.stages.planning),
        };
        let execution = StagePlan {
            role: Role::new::<AllExecutorSteps>(
                Stage::Execution.role_name(),
                render(&prompts.roles.executor),
                model,
            ),
            prompt: render(&prompts.stages.execution),
        };
        let quality_check = StagePlan {
            role: Role::new::<AllQcSteps>(
                Stage::QualityCheck.role_name(),
                render(&prompts.roles.quality_checker),
                model,
            ),
            prompt: render(&prompts.stages.quality_check),
        };

        Self {
            runner,
            events,
            analysis,
            planning,
            execution,
            quality_check,
            clarifications: 0,
            tool_calls: 0,
        }
    }

    /// Run Analysis, Planning, Execution and Quality Check, once each.
    ///
    /// Completes after QC whatever its verdict; unmet requirements are
    /// reported, not re-planned.
    #[instrument(skip(self), fields(run_id = tracing::field::Empty))]
    pub async fn run(&mut self) -> Result<PipelineReport> {
        let run_id = Uuid::new_v4();
        tracing::Span::current().record("run_id", tracing::field::display(run_id));
        let started_at = Utc::now();
        info!("Starting pipeline run {}", run_id);

        let transcript = Transcript::starting_with(self.analysis.prompt.clone());
        let (analysis, mut transcript) = self
            .stage::<AllRequirementsAnalysis>(Stage::Analysis, transcript)
            .await?;

        transcript.push_user(self.planning.prompt.clone());
        let (plan, mut transcript) = self
            .stage::<AllPlannerSteps>(Stage::Planning, transcript)
            .await?;

        transcript.push_user(self.execution.prompt.clone());
        let (execution, mut transcript) = self
            .stage::<AllExecutorSteps>(Stage::Execution, transcript)
            .await?;

        transcript.push_user(self.quality_check.prompt.clone());
        let (quality_check, _transcript) = self
            .stage::<AllQcSteps>(Stage::QualityCheck, transcript)
            .await?;

        self.events.emit(AgentEvent::PipelineCompleted);
        self.events.flush().await;

        info!(
            "Pipeline run {} complete: all requirements satisfied = {}",
            run_id, quality_check.all_requirements_satisfied
        );

        Ok(PipelineReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            analysis,
            plan,
            execution,
            quality_check,
            clarifications: self.clarifications,
            tool_calls: self.tool_calls,
        })
    }

    async fn stage<T: StageOutput>(
        &mut self,
        stage: Stage,
        transcript: Transcript,
    ) -> Result<(T, Transcript)> {
        self.events.emit(AgentEvent::StageStarted { stage });

        let role = match stage {
            Stage::Analysis => &self.analysis.role,
            Stage::Planning => &self.planning.role,
            Stage::Execution => &self.execution.role,
            Stage::QualityCheck => &self.quality_check.role,
        };
        let outcome = self.runner.run::<T>(role, transcript).await?;

        self.clarifications += outcome.clarifications;
        self.tool_calls += outcome.tool_calls;
        info!(
            "{} finished by {} ({} tool call(s), {} clarification(s))",
            stage, outcome.role_name, outcome.tool_calls, outcome.clarifications
        );

        self.events.emit(AgentEvent::StageCompleted {
            stage,
            output: serde_json::to_string_pretty(&outcome.output)?,
        });

        Ok((outcome.output, outcome.transcript))
    }
}

/// Variables available to every prompt template.
fn prompt_variables(settings: &Settings) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    vars.insert(
        "working_dir".to_string(),
        settings.workspace.working_dir.clone(),
    );
    vars.insert(
        "scratch_name".to_string(),
        settings.workspace.scratch_dir.clone(),
    );
    vars.insert(
        "scratch_dir".to_string(),
        settings.scratch_dir().display().to_string(),
    );
    vars
}
