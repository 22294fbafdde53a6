//! Model-assisted scorer.
//!
//! Sends a task's rubric prompt plus the patient's artifact to a
//! [`ModelBackend`] and turns the reply into an [`EvaluationResult`].
//! Backend detail is logged here and replaced by a generic error before it
//! reaches the caller.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, instrument, warn};

use crate::artifact::Artifact;
use crate::catalog::{self, TaskDefinition};
use crate::error::{EvalError, ProviderError};
use crate::model::{EvaluationResult, ResultDetails, ScoringStrategy, TaskId};
use crate::response;
use crate::rubric;
use crate::traits::{CompletionRequest, CompletionResponse, ModelBackend};

/// Settings for model-assisted scoring.
#[derive(Debug, Clone)]
pub struct AssistedConfig {
    /// Model identifier passed to the backend.
    pub model: String,
    /// Upper bound for a single backend call.
    pub timeout: Duration,
    /// Retries on transient backend errors. Values above 1 are treated as 1.
    pub max_retries: u32,
    /// Pause before the retry. A rate-limit hint from the backend wins, unless
    /// it is longer than `timeout`, in which case the call is not retried.
    pub retry_delay: Duration,
    pub drawing_max_tokens: u32,
    pub text_max_tokens: u32,
    pub temperature: f64,
}

impl Default for AssistedConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            timeout: Duration::from_secs(20),
            max_retries: 1,
            retry_delay: Duration::from_millis(500),
            drawing_max_tokens: 500,
            text_max_tokens: 50,
            temperature: 0.0,
        }
    }
}

/// Scores drawings and abstraction answers through a model backend.
pub struct AssistedScorer {
    backend: Arc<dyn ModelBackend>,
    config: AssistedConfig,
}

impl AssistedScorer {
    pub fn new(backend: Arc<dyn ModelBackend>, config: AssistedConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &AssistedConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Score one artifact for a model-assisted task.
    ///
    /// Fails with `Validation` for a task that is not model-assisted or an
    /// artifact of the wrong kind, `EmptyResponse` when the model returns
    /// nothing, and `EvaluationBackend` for every other backend failure.
    #[instrument(skip(self, artifact), fields(model = %self.config.model))]
    pub async fn evaluate(
        &self,
        task: TaskId,
        artifact: &Artifact,
    ) -> Result<EvaluationResult, EvalError> {
        let definition = catalog::definition(task);
        if definition.strategy != ScoringStrategy::ModelAssisted {
            return Err(EvalError::Validation(format!(
                "{task} is not scored by the model"
            )));
        }
        let system_prompt = rubric::system_prompt(definition).ok_or_else(|| {
            EvalError::Validation(format!("{task} has no rubric"))
        })?;

        let request = match (is_drawing_task(definition), artifact) {
            (true, Artifact::Image { data_url }) => {
                artifact.validate()?;
                CompletionRequest {
                    model: self.config.model.clone(),
                    system_prompt,
                    user_text: rubric::drawing_user_text(definition),
                    image_data_url: Some(data_url.clone()),
                    max_tokens: self.config.drawing_max_tokens,
                    temperature: self.config.temperature,
                    json_output: true,
                }
            }
            (false, Artifact::Text { text }) => {
                if text.trim().is_empty() {
                    debug!(task = %task, "blank answer, scoring 0 without a model call");
                    return Ok(EvaluationResult::scored(
                        task,
                        0,
                        ResultDetails::Abstraction {
                            response: String::new(),
                            notes: "no answer".to_string(),
                        },
                    ));
                }
                CompletionRequest {
                    model: self.config.model.clone(),
                    system_prompt,
                    user_text: rubric::abstraction_user_text(text.trim()),
                    image_data_url: None,
                    max_tokens: self.config.text_max_tokens,
                    temperature: self.config.temperature,
                    json_output: true,
                }
            }
            (true, Artifact::Text { .. }) => {
                return Err(EvalError::Validation(format!("{task} expects an image")));
            }
            (false, Artifact::Image { .. }) => {
                return Err(EvalError::Validation(format!("{task} expects a text answer")));
            }
        };

        let start = Instant::now();
        let reply = self.call_with_retry(task, &request).await?;
        let content = reply.content.trim();
        if content.is_empty() {
            error!(task = %task, backend = self.backend.name(), "model returned empty content");
            return Err(EvalError::EmptyResponse);
        }

        let parsed = match artifact {
            Artifact::Text { text } => response::parse_abstraction(definition, text.trim(), content),
            Artifact::Image { .. } => response::parse_drawing(definition, content),
        };
        match parsed {
            Ok(result) => {
                info!(
                    task = %task,
                    score = result.score,
                    max_score = result.max_score,
                    tokens = reply.token_usage.total_tokens,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "model-assisted evaluation complete"
                );
                Ok(result)
            }
            Err(e) => {
                error!(task = %task, error = %e, raw = %content, "model reply rejected");
                Err(EvalError::EvaluationBackend)
            }
        }
    }

    async fn call_with_retry(
        &self,
        task: TaskId,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, EvalError> {
        let retries = self.config.max_retries.min(1);
        let mut attempt = 0;
        loop {
            let err = match tokio::time::timeout(self.config.timeout, self.backend.complete(request)).await
            {
                Ok(Ok(reply)) => return Ok(reply),
                Ok(Err(e)) => e,
                Err(_) => ProviderError::Timeout(self.config.timeout.as_secs()).into(),
            };

            let provider_error = err.downcast_ref::<ProviderError>();
            let transient = provider_error.is_some_and(ProviderError::is_transient);
            if transient && attempt < retries {
                let delay = provider_error
                    .and_then(ProviderError::retry_after_ms)
                    .map(Duration::from_millis)
                    .unwrap_or(self.config.retry_delay);
                // A wait longer than one call's budget is not worth retrying.
                if delay <= self.config.timeout {
                    attempt += 1;
                    warn!(task = %task, error = %err, ?delay, "transient backend error, retrying once");
                    tokio::time::sleep(delay).await;
                    continue;
                }
                warn!(task = %task, ?delay, timeout = ?self.config.timeout, "retry hint exceeds the call timeout, not retrying");
            }

            error!(
                task = %task,
                backend = self.backend.name(),
                error = %format!("{err:#}"),
                "model backend call failed"
            );
            return Err(EvalError::EvaluationBackend);
        }
    }
}

/// Model-assisted tasks that take an image.
pub fn is_drawing_task(definition: &TaskDefinition) -> bool {
    definition.strategy == ScoringStrategy::ModelAssisted && !definition.checks.is_empty()
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::artifact::image_data_url;
    use crate::traits::TokenUsage;

    enum Step {
        Reply(&'static str),
        Fail(ProviderError),
        Hang,
    }

    struct Scripted {
        steps: Mutex<VecDeque<Step>>,
        calls: Mutex<Vec<CompletionRequest>>,
    }

    impl Scripted {
        fn new(steps: Vec<Step>) -> Arc<Self> {
            Arc::new(Self {
                steps: Mutex::new(steps.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ModelBackend for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<CompletionResponse> {
            self.calls.lock().unwrap().push(request.clone());
            let step = self.steps.lock().unwrap().pop_front();
            match step {
                Some(Step::Reply(content)) => Ok(CompletionResponse {
                    content: content.to_string(),
                    model: request.model.clone(),
                    token_usage: TokenUsage::default(),
                    latency_ms: 1,
                }),
                Some(Step::Fail(e)) => Err(e.into()),
                Some(Step::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    anyhow::bail!("unreachable")
                }
                None => anyhow::bail!("script exhausted"),
            }
        }
    }

    const TRAIL_OK: &str = r#"{"taskId":"A_TRAIL","unscorable":false,"score":1,"maxScore":1,
        "confidence":0.9,"checks":{"sequenceCorrect":{"pass":true,"notes":"ok"}},"overallNotes":"fine"}"#;

    fn scorer(backend: Arc<Scripted>) -> AssistedScorer {
        AssistedScorer::new(
            backend,
            AssistedConfig {
                retry_delay: Duration::from_millis(1),
                timeout: Duration::from_secs(5),
                ..Default::default()
            },
        )
    }

    fn png() -> Artifact {
        Artifact::image(image_data_url("image/png", b"\x89PNG fake"))
    }

    #[tokio::test]
    async fn scores_a_drawing() {
        let backend = Scripted::new(vec![Step::Reply(TRAIL_OK)]);
        let result = scorer(backend.clone())
            .evaluate(TaskId::ATrail, &png())
            .await
            .unwrap();
        assert_eq!(result.score, 1);
        let sent = backend.calls.lock().unwrap()[0].clone();
        assert!(sent.image_data_url.is_some());
        assert!(sent.json_output);
        assert_eq!(sent.max_tokens, 500);
    }

    #[tokio::test]
    async fn retries_once_on_transient_error() {
        let backend = Scripted::new(vec![
            Step::Fail(ProviderError::ApiError {
                status: 503,
                message: "overloaded".into(),
            }),
            Step::Reply(TRAIL_OK),
        ]);
        let result = scorer(backend.clone()).evaluate(TaskId::ATrail, &png()).await;
        assert!(result.is_ok());
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn gives_up_after_one_retry() {
        let backend = Scripted::new(vec![
            Step::Fail(ProviderError::NetworkError("reset".into())),
            Step::Fail(ProviderError::NetworkError("reset".into())),
            Step::Reply(TRAIL_OK),
        ]);
        let err = scorer(backend.clone())
            .evaluate(TaskId::ATrail, &png())
            .await
            .unwrap_err();
        assert!(matches!(err, EvalError::EvaluationBackend));
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn no_retry_on_structural_failure() {
        let backend = Scripted::new(vec![
            Step::Reply(r#"{"taskId":"A_TRAIL","unscorable":false}"#),
            Step::Reply(TRAIL_OK),
        ]);
        let err = scorer(backend.clone())
            .evaluate(TaskId::ATrail, &png())
            .await
            .unwrap_err();
        assert!(matches!(err, EvalError::EvaluationBackend));
        assert_eq!(err.to_string(), "evaluation failed");
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn no_retry_on_missing_credentials() {
        let backend = Scripted::new(vec![Step::Fail(ProviderError::MissingCredentials(
            "openai".into(),
        ))]);
        let err = scorer(backend.clone())
            .evaluate(TaskId::CClock, &png())
            .await
            .unwrap_err();
        assert!(matches!(err, EvalError::EvaluationBackend));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn empty_reply_is_its_own_error() {
        let backend = Scripted::new(vec![Step::Reply("   ")]);
        let err = scorer(backend.clone())
            .evaluate(TaskId::BCube, &png())
            .await
            .unwrap_err();
        assert!(matches!(err, EvalError::EmptyResponse));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_transient_then_fails() {
        let backend = Scripted::new(vec![Step::Hang, Step::Hang]);
        let err = scorer(backend.clone())
            .evaluate(TaskId::ATrail, &png())
            .await
            .unwrap_err();
        assert!(matches!(err, EvalError::EvaluationBackend));
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn honours_a_short_rate_limit_hint() {
        let backend = Scripted::new(vec![
            Step::Fail(ProviderError::RateLimited {
                retry_after_ms: 2_000,
            }),
            Step::Reply(TRAIL_OK),
        ]);
        let start = tokio::time::Instant::now();
        let result = scorer(backend.clone()).evaluate(TaskId::ATrail, &png()).await;
        assert!(result.is_ok());
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_hint_beyond_timeout_is_not_waited_for() {
        let backend = Scripted::new(vec![
            Step::Fail(ProviderError::RateLimited {
                retry_after_ms: 3_600_000,
            }),
            Step::Reply(TRAIL_OK),
        ]);
        let start = tokio::time::Instant::now();
        let err = scorer(backend.clone())
            .evaluate(TaskId::ATrail, &png())
            .await
            .unwrap_err();
        assert!(matches!(err, EvalError::EvaluationBackend));
        assert!(start.elapsed() <= Duration::from_secs(5));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn abstraction_text_flow() {
        let backend = Scripted::new(vec![Step::Reply(
            r#"{"taskId":"ABSTRACTION_TRAIN","score":1,"notes":"transport"}"#,
        )]);
        let result = scorer(backend.clone())
            .evaluate(TaskId::AbstractionTrain, &Artifact::text("  sirven para viajar "))
            .await
            .unwrap();
        assert_eq!(result.score, 1);
        let sent = backend.calls.lock().unwrap()[0].clone();
        assert_eq!(sent.user_text, "Input: \"sirven para viajar\"");
        assert_eq!(sent.max_tokens, 50);
        assert!(sent.image_data_url.is_none());
    }

    #[tokio::test]
    async fn blank_abstraction_skips_the_model() {
        let backend = Scripted::new(vec![]);
        let result = scorer(backend.clone())
            .evaluate(TaskId::AbstractionWatch, &Artifact::text("  "))
            .await
            .unwrap();
        assert_eq!(result.score, 0);
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn wrong_artifact_or_task_is_rejected_before_the_call() {
        let backend = Scripted::new(vec![]);
        let s = scorer(backend.clone());
        assert!(matches!(
            s.evaluate(TaskId::CClock, &Artifact::text("a clock")).await,
            Err(EvalError::Validation(_))
        ));
        assert!(matches!(
            s.evaluate(TaskId::AbstractionTrain, &png()).await,
            Err(EvalError::Validation(_))
        ));
        assert!(matches!(
            s.evaluate(TaskId::NamingLion, &Artifact::text("leon")).await,
            Err(EvalError::Validation(_))
        ));
        assert!(matches!(
            s.evaluate(TaskId::CClock, &Artifact::image("data:image/png;base64,")).await,
            Err(EvalError::Validation(_))
        ));
        assert_eq!(backend.calls(), 0);
    }

    #[test]
    fn drawing_tasks() {
        let drawings: Vec<_> = catalog::all()
            .iter()
            .filter(|d| is_drawing_task(d))
            .map(|d| d.id)
            .collect();
        assert_eq!(drawings, vec![TaskId::ATrail, TaskId::BCube, TaskId::CClock]);
    }
}
