//! Assessment engine.
//!
//! Routes each submission to its scorer and stores the result on the
//! patient's session. Input is validated before anything is written, and a
//! result is stored in one read-modify-write after scoring succeeded, so a
//! failed evaluation leaves the session as it was.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::artifact::{Artifact, DrawingMetadata, StoredDrawing};
use crate::assisted::{is_drawing_task, AssistedScorer};
use crate::catalog::{self, TaskDefinition};
use crate::clock::{Clock, SystemClock};
use crate::error::EvalError;
use crate::model::{EvaluationResult, ExaminerCapture, Module, TaskId};
use crate::report::{compute_report, FinalReport};
use crate::scoring::naming::{self, NamingAnswers, NamingOutcome};
use crate::scoring::orientation::{self, OrientationSubmission};
use crate::scoring::recall::{self, DelayedRecallSubmission};
use crate::scoring::{examiner, memory};
use crate::session::{RawSubmission, SessionStatus, TestSession};
use crate::store::{InMemoryStore, Store};

/// Outcome of one drawing in a batch evaluation.
#[derive(Debug)]
pub struct DrawingOutcome {
    pub submission_id: String,
    pub result: Result<EvaluationResult, EvalError>,
}

/// The scoring engine.
pub struct AssessmentEngine {
    sessions: Arc<dyn Store<TestSession>>,
    drawings: Arc<dyn Store<StoredDrawing>>,
    scorer: Arc<AssistedScorer>,
    clock: Arc<dyn Clock>,
    // Serialises session read-modify-write.
    write_lock: Mutex<()>,
}

impl AssessmentEngine {
    /// Engine with in-memory stores and the system clock.
    pub fn new(scorer: AssistedScorer) -> Self {
        Self::with_stores(
            scorer,
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryStore::new()),
        )
    }

    pub fn with_stores(
        scorer: AssistedScorer,
        sessions: Arc<dyn Store<TestSession>>,
        drawings: Arc<dyn Store<StoredDrawing>>,
    ) -> Self {
        Self {
            sessions,
            drawings,
            scorer: Arc::new(scorer),
            clock: Arc::new(SystemClock),
            write_lock: Mutex::new(()),
        }
    }

    /// Replace the clock used for orientation scoring.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Score the three naming pictures.
    pub async fn submit_naming(
        &self,
        session_id: &str,
        answers: &NamingAnswers,
    ) -> Result<NamingOutcome, EvalError> {
        check_session_id(session_id)?;
        let outcome = naming::score(answers);
        let records: Vec<_> = outcome
            .results
            .values()
            .map(|item| RawSubmission::Naming {
                answer: item.user_answer.clone(),
            })
            .zip(outcome.evaluations())
            .collect();
        self.update(session_id, |session| {
            for (submission, result) in records {
                session.record(submission, result);
            }
            Ok(())
        })
        .await?;
        info!(session = session_id, score = outcome.total_score, "naming scored");
        Ok(outcome)
    }

    /// Capture one immediate-recall trial. Never counted.
    pub async fn submit_memory_trial(
        &self,
        session_id: &str,
        task: &str,
        transcript: &str,
    ) -> Result<EvaluationResult, EvalError> {
        check_session_id(session_id)?;
        let definition = catalog::lookup(task)?;
        let result = memory::capture_trial(definition.id, transcript)?;
        self.store_result(
            session_id,
            RawSubmission::Transcript {
                text: transcript.to_string(),
            },
            result,
        )
        .await
    }

    /// Capture raw performance for an attention or language task.
    pub async fn submit_examiner_capture(
        &self,
        session_id: &str,
        task: &str,
        capture: ExaminerCapture,
    ) -> Result<EvaluationResult, EvalError> {
        check_session_id(session_id)?;
        let definition = catalog::lookup(task)?;
        let result = examiner::capture(definition.id, capture.clone())?;
        self.store_result(session_id, RawSubmission::Examiner(capture), result)
            .await
    }

    /// Enter the examiner's score for an attention or language module.
    pub async fn record_examiner_score(
        &self,
        session_id: &str,
        module: Module,
        score: u32,
    ) -> Result<u32, EvalError> {
        check_session_id(session_id)?;
        let score = examiner::validate_module_score(module, score)?;
        self.update(session_id, |session| {
            session.examiner_scores.insert(module, score);
            Ok(())
        })
        .await?;
        info!(session = session_id, %module, score, "examiner score recorded");
        Ok(score)
    }

    /// Score one abstraction pair through the model.
    pub async fn submit_abstraction(
        &self,
        session_id: &str,
        task: &str,
        response: &str,
    ) -> Result<EvaluationResult, EvalError> {
        check_session_id(session_id)?;
        let definition = catalog::lookup(task)?;
        if definition.module != Module::Abstraction {
            return Err(EvalError::Validation(format!(
                "{} is not an abstraction task",
                definition.id
            )));
        }
        let result = self
            .scorer
            .evaluate(definition.id, &Artifact::text(response))
            .await?;
        self.store_result(
            session_id,
            RawSubmission::Abstraction {
                response: response.to_string(),
            },
            result,
        )
        .await
    }

    /// Store a drawing for later evaluation. Returns its submission id.
    pub async fn submit_drawing(
        &self,
        session_id: &str,
        task: &str,
        artifact: Artifact,
        metadata: DrawingMetadata,
    ) -> Result<String, EvalError> {
        check_session_id(session_id)?;
        let definition = catalog::lookup(task)?;
        check_drawing(definition, &artifact)?;

        let submission_id = Uuid::new_v4().to_string();
        let drawing = StoredDrawing {
            session_id: session_id.to_string(),
            task_id: definition.id,
            artifact,
            metadata,
            submitted_at: chrono::Utc::now(),
        };
        self.drawings.put(&submission_id, drawing).await?;
        self.update(session_id, |_| Ok(())).await?;
        debug!(session = session_id, task = %definition.id, %submission_id, "drawing stored");
        Ok(submission_id)
    }

    /// Evaluate a stored drawing and record the result on its session.
    pub async fn evaluate_drawing(&self, submission_id: &str) -> Result<EvaluationResult, EvalError> {
        let drawing = self.drawings.get(submission_id).await.map_err(|e| match e {
            EvalError::NotFound(id) => EvalError::NotFound(format!("submission {id}")),
            other => other,
        })?;
        let result = self.scorer.evaluate(drawing.task_id, &drawing.artifact).await?;
        self.store_result(
            &drawing.session_id,
            RawSubmission::Drawing {
                submission_id: submission_id.to_string(),
            },
            result,
        )
        .await
    }

    /// Evaluate several drawings with at most `parallelism` model calls in
    /// flight. One failure does not affect the others.
    pub async fn evaluate_drawings(
        &self,
        submission_ids: &[String],
        parallelism: usize,
    ) -> Vec<DrawingOutcome> {
        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(parallelism.max(1)));
        let mut futures = FuturesUnordered::new();

        for id in submission_ids {
            let semaphore = Arc::clone(&semaphore);
            futures.push(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => self.evaluate_drawing(id).await,
                    Err(_) => Err(EvalError::EvaluationBackend),
                };
                DrawingOutcome {
                    submission_id: id.clone(),
                    result,
                }
            });
        }

        let mut outcomes = Vec::with_capacity(submission_ids.len());
        while let Some(outcome) = futures.next().await {
            if let Err(e) = &outcome.result {
                warn!(submission = %outcome.submission_id, error = %e, "drawing evaluation failed");
            }
            outcomes.push(outcome);
        }
        info!(
            count = outcomes.len(),
            failed = outcomes.iter().filter(|o| o.result.is_err()).count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "drawing batch complete"
        );
        outcomes
    }

    /// Score delayed recall. Only spontaneous recall counts.
    pub async fn submit_delayed_recall(
        &self,
        session_id: &str,
        submission: &DelayedRecallSubmission,
    ) -> Result<EvaluationResult, EvalError> {
        check_session_id(session_id)?;
        let result = recall::score(submission);
        self.store_result(
            session_id,
            RawSubmission::DelayedRecall(submission.clone()),
            result,
        )
        .await
    }

    /// Score orientation against the engine clock. Completes the session.
    pub async fn submit_orientation(
        &self,
        session_id: &str,
        submission: &OrientationSubmission,
    ) -> Result<EvaluationResult, EvalError> {
        check_session_id(session_id)?;
        let result = orientation::score(submission, self.clock.today());
        let stored = result.clone();
        let raw = RawSubmission::Orientation(submission.clone());
        self.update(session_id, move |session| {
            session.record(raw, stored);
            session.status = SessionStatus::Completed;
            Ok(())
        })
        .await?;
        info!(session = session_id, score = result.score, "session completed");
        Ok(result)
    }

    pub async fn set_education_adjustment(
        &self,
        session_id: &str,
        enabled: bool,
    ) -> Result<(), EvalError> {
        check_session_id(session_id)?;
        self.update(session_id, |session| {
            session.education_adjustment = enabled;
            Ok(())
        })
        .await
    }

    /// Current state of a session.
    pub async fn session(&self, session_id: &str) -> Result<TestSession, EvalError> {
        self.sessions.get(session_id).await.map_err(|e| match e {
            EvalError::NotFound(id) => EvalError::NotFound(format!("session {id}")),
            other => other,
        })
    }

    /// Final report for a session, computed now.
    pub async fn report(&self, session_id: &str) -> Result<FinalReport, EvalError> {
        let session = self.session(session_id).await?;
        Ok(compute_report(&session))
    }

    pub fn scorer(&self) -> &AssistedScorer {
        &self.scorer
    }

    async fn store_result(
        &self,
        session_id: &str,
        submission: RawSubmission,
        result: EvaluationResult,
    ) -> Result<EvaluationResult, EvalError> {
        let stored = result.clone();
        self.update(session_id, move |session| {
            session.record(submission, stored);
            Ok(())
        })
        .await?;
        info!(
            session = session_id,
            task = %result.task_id,
            score = result.score,
            max_score = result.max_score,
            status = ?result.status,
            "result stored"
        );
        Ok(result)
    }

    /// Load (or create) a session, apply `f`, write it back. Nothing is
    /// written when `f` fails.
    async fn update<F>(&self, session_id: &str, f: F) -> Result<(), EvalError>
    where
        F: FnOnce(&mut TestSession) -> Result<(), EvalError>,
    {
        let _guard = self.write_lock.lock().await;
        let mut session = match self.sessions.get(session_id).await {
            Ok(session) => session,
            Err(EvalError::NotFound(_)) => {
                debug!(session = session_id, "creating session");
                TestSession::new(session_id)
            }
            Err(e) => return Err(e),
        };
        f(&mut session)?;
        session.touch();
        self.sessions.put(session_id, session).await
    }
}

fn check_session_id(session_id: &str) -> Result<(), EvalError> {
    if session_id.trim().is_empty() {
        return Err(EvalError::Validation("session id is required".into()));
    }
    Ok(())
}

fn check_drawing(definition: &TaskDefinition, artifact: &Artifact) -> Result<(), EvalError> {
    if !is_drawing_task(definition) {
        return Err(EvalError::Validation(format!(
            "{} is not a drawing task",
            definition.id
        )));
    }
    match artifact {
        Artifact::Image { .. } => artifact.validate(),
        Artifact::Text { .. } => Err(EvalError::Validation(format!(
            "{} expects an image",
            definition.id
        ))),
    }
}

/// Task ids a client can submit drawings for.
pub fn drawing_tasks() -> Vec<TaskId> {
    catalog::all()
        .iter()
        .filter(|d| is_drawing_task(d))
        .map(|d| d.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use super::*;
    use crate::artifact::image_data_url;
    use crate::assisted::AssistedConfig;
    use crate::clock::FixedClock;
    use crate::model::{ResultStatus, ScoringStrategy};
    use crate::report::{ModuleScore, Verdict};
    use crate::scoring::orientation::{DateAnswer, ExaminerMarked};
    use crate::traits::{CompletionRequest, CompletionResponse, ModelBackend, TokenUsage};

    /// Replies keyed by task id found in the user text.
    struct ByTask {
        replies: StdMutex<VecDeque<(TaskId, String)>>,
        calls: StdMutex<u32>,
    }

    impl ByTask {
        fn new(replies: Vec<(TaskId, String)>) -> Arc<Self> {
            Arc::new(Self {
                replies: StdMutex::new(replies.into()),
                calls: StdMutex::new(0),
            })
        }
    }

    #[async_trait]
    impl ModelBackend for ByTask {
        fn name(&self) -> &str {
            "by-task"
        }

        async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<CompletionResponse> {
            *self.calls.lock().unwrap() += 1;
            let content = {
                let mut replies = self.replies.lock().unwrap();
                let pos = replies
                    .iter()
                    .position(|(task, _)| request.system_prompt.contains(task.as_str()));
                pos.and_then(|p| replies.remove(p)).map(|(_, c)| c)
            };
            match content {
                Some(content) => Ok(CompletionResponse {
                    content,
                    model: request.model.clone(),
                    token_usage: TokenUsage::default(),
                    latency_ms: 1,
                }),
                None => anyhow::bail!("no scripted reply"),
            }
        }
    }

    fn drawing_reply(task: TaskId, score: u32) -> String {
        let checks: serde_json::Map<String, serde_json::Value> = catalog::definition(task)
            .checks
            .iter()
            .map(|c| (c.to_string(), serde_json::json!({"pass": score > 0, "notes": ""})))
            .collect();
        serde_json::json!({
            "taskId": task.as_str(),
            "unscorable": false,
            "score": score,
            "confidence": 0.9,
            "checks": checks,
            "overallNotes": ""
        })
        .to_string()
    }

    fn engine(backend: Arc<ByTask>) -> AssessmentEngine {
        let scorer = AssistedScorer::new(
            backend,
            AssistedConfig {
                retry_delay: Duration::from_millis(1),
                ..Default::default()
            },
        );
        AssessmentEngine::new(scorer).with_clock(Arc::new(FixedClock(
            NaiveDate::from_ymd_opt(2024, 5, 15).unwrap(),
        )))
    }

    fn png() -> Artifact {
        Artifact::image(image_data_url("image/png", b"drawing"))
    }

    fn orientation(day: u32) -> OrientationSubmission {
        OrientationSubmission {
            date: DateAnswer {
                day,
                month: 5,
                year: 2024,
                day_of_week: "Miércoles".into(),
            },
            place: ExaminerMarked {
                value: "Hospital".into(),
                is_correct: true,
            },
            city: ExaminerMarked {
                value: "Madrid".into(),
                is_correct: true,
            },
        }
    }

    #[tokio::test]
    async fn full_administration() {
        let backend = ByTask::new(vec![
            (TaskId::ATrail, drawing_reply(TaskId::ATrail, 1)),
            (TaskId::BCube, drawing_reply(TaskId::BCube, 1)),
            (TaskId::CClock, drawing_reply(TaskId::CClock, 3)),
            (
                TaskId::AbstractionTrain,
                r#"{"taskId":"ABSTRACTION_TRAIN","score":1,"notes":"transport"}"#.into(),
            ),
            (
                TaskId::AbstractionWatch,
                r#"{"taskId":"ABSTRACTION_WATCH","score":1,"notes":"measure"}"#.into(),
            ),
        ]);
        let engine = engine(backend);
        let sid = "patient-1";

        let mut ids = Vec::new();
        for task in drawing_tasks() {
            ids.push(
                engine
                    .submit_drawing(sid, task.as_str(), png(), DrawingMetadata::default())
                    .await
                    .unwrap(),
            );
        }
        let outcomes = engine.evaluate_drawings(&ids, 2).await;
        assert!(outcomes.iter().all(|o| o.result.is_ok()));

        let naming = engine
            .submit_naming(
                sid,
                &NamingAnswers {
                    lion: "León".into(),
                    rhino: "rinoceronte".into(),
                    camel: "dromedario".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(naming.total_score, 3);

        engine
            .submit_memory_trial(sid, "MEMORY_TRIAL_1", "rostro seda iglesia")
            .await
            .unwrap();
        engine.record_examiner_score(sid, Module::Attention, 6).await.unwrap();
        engine.record_examiner_score(sid, Module::Language, 3).await.unwrap();
        engine
            .submit_abstraction(sid, "ABSTRACTION_TRAIN", "medios de transporte")
            .await
            .unwrap();
        engine
            .submit_abstraction(sid, "ABSTRACTION_WATCH", "sirven para medir")
            .await
            .unwrap();
        engine
            .submit_delayed_recall(
                sid,
                &DelayedRecallSubmission {
                    words: vec!["rostro seda iglesia clavel rojo".into()],
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let result = engine.submit_orientation(sid, &orientation(15)).await.unwrap();
        assert_eq!(result.score, 6);

        let session = engine.session(sid).await.unwrap();
        assert!(session.is_completed());

        let report = engine.report(sid).await.unwrap();
        assert_eq!(report.total, 30);
        assert_eq!(report.verdict, Verdict::Normal);
    }

    #[tokio::test]
    async fn orientation_uses_the_injected_clock() {
        let engine = engine(ByTask::new(vec![]));
        let result = engine.submit_orientation("s", &orientation(16)).await.unwrap();
        assert_eq!(result.score, 5);
    }

    #[tokio::test]
    async fn validation_happens_before_any_write() {
        let engine = engine(ByTask::new(vec![]));
        assert!(matches!(
            engine.submit_memory_trial("s", "MEMORY_TRIAL_9", "x").await,
            Err(EvalError::UnknownTask(_))
        ));
        assert!(matches!(
            engine.submit_naming("  ", &NamingAnswers::default()).await,
            Err(EvalError::Validation(_))
        ));
        assert!(matches!(
            engine.record_examiner_score("s", Module::Attention, 7).await,
            Err(EvalError::Validation(_))
        ));
        assert!(matches!(
            engine.record_examiner_score("s", Module::Naming, 1).await,
            Err(EvalError::Validation(_))
        ));
        assert!(matches!(
            engine
                .submit_drawing("s", "NAMING_LION", png(), DrawingMetadata::default())
                .await,
            Err(EvalError::Validation(_))
        ));
        assert!(matches!(
            engine.submit_abstraction("s", "C_CLOCK", "circle").await,
            Err(EvalError::Validation(_))
        ));
        assert!(matches!(engine.session("s").await, Err(EvalError::NotFound(_))));
    }

    #[tokio::test]
    async fn failed_evaluation_leaves_session_untouched() {
        let backend = ByTask::new(vec![(TaskId::CClock, "not json at all".into())]);
        let engine = engine(backend);
        let id = engine
            .submit_drawing("s", "C_CLOCK", png(), DrawingMetadata::default())
            .await
            .unwrap();
        let before = engine.session("s").await.unwrap();

        let err = engine.evaluate_drawing(&id).await.unwrap_err();
        assert!(matches!(err, EvalError::EvaluationBackend));

        let after = engine.session("s").await.unwrap();
        assert_eq!(after.results, before.results);
        assert!(after.results.is_empty());
    }

    #[tokio::test]
    async fn unknown_submission_is_not_found() {
        let engine = engine(ByTask::new(vec![]));
        assert!(matches!(
            engine.evaluate_drawing("missing").await,
            Err(EvalError::NotFound(msg)) if msg.contains("missing")
        ));
    }

    #[tokio::test]
    async fn examiner_capture_waits_for_score() {
        let engine = engine(ByTask::new(vec![]));
        let result = engine
            .submit_examiner_capture(
                "s",
                "ATTENTION_LETTER_TAP",
                ExaminerCapture {
                    error_count: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(result.status, ResultStatus::AwaitingExaminer);
        assert_eq!(
            catalog::module_strategy(Module::Attention),
            ScoringStrategy::Examiner
        );

        let report = engine.report("s").await.unwrap();
        assert_eq!(
            report.line(Module::Attention).unwrap().score,
            ModuleScore::AwaitingExaminer
        );

        engine.record_examiner_score("s", Module::Attention, 4).await.unwrap();
        engine.set_education_adjustment("s", true).await.unwrap();
        let report = engine.report("s").await.unwrap();
        assert_eq!(report.raw_total, 4);
        assert_eq!(report.total, 5);
    }

    #[tokio::test]
    async fn batch_isolates_failures() {
        let backend = ByTask::new(vec![(TaskId::ATrail, drawing_reply(TaskId::ATrail, 1))]);
        let engine = engine(backend.clone());
        let ok = engine
            .submit_drawing("s", "A_TRAIL", png(), DrawingMetadata::default())
            .await
            .unwrap();
        let bad = engine
            .submit_drawing("s", "B_CUBE", png(), DrawingMetadata::default())
            .await
            .unwrap();
        let outcomes = engine
            .evaluate_drawings(&[ok.clone(), bad.clone(), "ghost".to_string()], 1)
            .await;
        assert_eq!(outcomes.len(), 3);
        for o in &outcomes {
            match o.submission_id.as_str() {
                id if id == ok => assert_eq!(o.result.as_ref().unwrap().score, 1),
                id if id == bad => assert!(matches!(o.result, Err(EvalError::EvaluationBackend))),
                _ => assert!(matches!(o.result, Err(EvalError::NotFound(_)))),
            }
        }
        let session = engine.session("s").await.unwrap();
        assert_eq!(session.results.len(), 1);
    }
}
