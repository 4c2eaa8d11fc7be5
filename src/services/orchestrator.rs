// Analysis Orchestrator
// Runs normalize -> build -> send -> parse and owns the single analysis session.
//
// Status transitions:
//   Idle | Succeeded | Failed --start--> Running
//   Running --ok--> Succeeded, Running --err--> Failed
//   Idle | Succeeded | Failed --reset--> Idle
//   Running --dropped--> Idle (input kept for retry)
// A start or reset while Running is rejected, so at most one upstream call is in flight.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AnalysisError;
use crate::models::{AnalysisReport, AnalysisSession, InputSource, SessionStatus};
use crate::services::input_normalizer::normalize;
use crate::services::prompt_builder::{InstructionTemplate, PromptBuilder};
use crate::services::providers::ModelGateway;
use crate::services::response_parser;

pub struct AnalysisOrchestrator {
    gateway: Arc<dyn ModelGateway>,
    builder: PromptBuilder,
    template: InstructionTemplate,
    session: Mutex<AnalysisSession>,
}

impl AnalysisOrchestrator {
    pub fn new(gateway: Arc<dyn ModelGateway>, builder: PromptBuilder) -> Self {
        Self {
            gateway,
            builder,
            template: InstructionTemplate::DEFAULT,
            session: Mutex::new(AnalysisSession::default()),
        }
    }

    fn lock_session(&self) -> MutexGuard<'_, AnalysisSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot for rendering.
    pub fn session(&self) -> AnalysisSession {
        self.lock_session().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.lock_session().status
    }

    /// Run one analysis to completion. Rejected with `AnalysisInProgress` while
    /// another run is pending; every other outcome is recorded on the session.
    /// Dropping the future mid-run returns the session to Idle with its input kept.
    pub async fn start(&self, input: InputSource) -> Result<AnalysisReport, AnalysisError> {
        let run = self.begin(&input)?;
        let started = Instant::now();

        let outcome = self.execute(run.run_id, &input).await;

        match &outcome {
            Ok(report) => info!(
                "[ORCHESTRATOR] run={} succeeded likelihood={:?} confidence={} elapsed_ms={}",
                run.run_id,
                report.ai_likelihood,
                report.confidence_score,
                started.elapsed().as_millis()
            ),
            Err(e) => warn!(
                "[ORCHESTRATOR] run={} failed kind={:?} elapsed_ms={} : {}",
                run.run_id,
                e.kind(),
                started.elapsed().as_millis(),
                e
            ),
        }

        run.finish(input.is_file(), &outcome);
        outcome
    }

    /// Restart the last input from scratch.
    pub async fn retry(&self) -> Result<AnalysisReport, AnalysisError> {
        let input = {
            let session = self.lock_session();
            if session.status == SessionStatus::Running {
                return Err(AnalysisError::AnalysisInProgress);
            }
            session.input.clone()
        };
        match input {
            Some(input) => self.start(input).await,
            None => Err(AnalysisError::EmptyInput),
        }
    }

    /// Back to Idle, dropping input, result and error.
    pub fn reset(&self) -> Result<(), AnalysisError> {
        let mut session = self.lock_session();
        if session.status == SessionStatus::Running {
            return Err(AnalysisError::AnalysisInProgress);
        }
        *session = AnalysisSession::default();
        info!("[ORCHESTRATOR] session reset");
        Ok(())
    }

    fn begin(&self, input: &InputSource) -> Result<RunGuard<'_>, AnalysisError> {
        let mut session = self.lock_session();
        if session.status == SessionStatus::Running {
            warn!(
                "[ORCHESTRATOR] start rejected, run={:?} still pending",
                session.run_id
            );
            return Err(AnalysisError::AnalysisInProgress);
        }

        let run_id = Uuid::new_v4();
        *session = AnalysisSession {
            run_id: Some(run_id),
            input: Some(input.clone()),
            status: SessionStatus::Running,
            result: None,
            error: None,
            started_at: Some(Utc::now()),
            finished_at: None,
        };
        info!(
            "[ORCHESTRATOR] run={} started source={}",
            run_id,
            if input.is_file() { "file" } else { "text" }
        );
        Ok(RunGuard {
            orchestrator: self,
            run_id,
            finished: false,
        })
    }

    async fn execute(&self, run_id: Uuid, input: &InputSource) -> Result<AnalysisReport, AnalysisError> {
        let payload = normalize(input)?;
        let request = self.builder.build(&payload, &self.template);
        info!(
            "[ORCHESTRATOR] run={} sending model={} attachment={} instruction_chars={}",
            run_id,
            request.model,
            request.attachment.is_some(),
            request.instruction.chars().count()
        );

        let raw = self.gateway.send(&request).await?;
        response_parser::parse(&raw)
    }

    fn finish(&self, run_id: Uuid, from_file: bool, outcome: &Result<AnalysisReport, AnalysisError>) {
        let mut session = self.lock_session();
        if session.run_id != Some(run_id) {
            return;
        }
        session.finished_at = Some(Utc::now());
        match outcome {
            Ok(report) => {
                session.status = SessionStatus::Succeeded;
                session.result = Some(report.clone());
                session.error = None;
            }
            Err(e) => {
                session.status = SessionStatus::Failed;
                session.result = None;
                session.error = Some(e.to_info(from_file));
            }
        }
    }

    fn abandon(&self, run_id: Uuid) {
        let mut session = self.lock_session();
        if session.run_id != Some(run_id) || session.status != SessionStatus::Running {
            return;
        }
        session.status = SessionStatus::Idle;
        session.result = None;
        session.error = None;
        session.finished_at = Some(Utc::now());
        warn!("[ORCHESTRATOR] run={} cancelled before completion", run_id);
    }
}

/// Owns the Running state of one run until `finish` records its outcome.
struct RunGuard<'a> {
    orchestrator: &'a AnalysisOrchestrator,
    run_id: Uuid,
    finished: bool,
}

impl RunGuard<'_> {
    fn finish(mut self, from_file: bool, outcome: &Result<AnalysisReport, AnalysisError>) {
        self.orchestrator.finish(self.run_id, from_file, outcome);
        self.finished = true;
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.orchestrator.abandon(self.run_id);
        }
    }
}
