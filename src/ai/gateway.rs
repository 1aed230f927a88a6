// src/ai/gateway.rs

use std::{fmt, str::FromStr, sync::Arc};

use super::{
    backend::{ModelBackend, ModelError, Part},
    json::extract_json_object,
    prompts,
};
use crate::models::result::{CheckResult, SolutionResult};

/// Which model failures fall through to the next model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// Every failure moves on to the next model.
    #[default]
    All,
    /// Requests the service rejects outright abort the loop.
    Retryable,
}

impl FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(FallbackPolicy::All),
            "retryable" => Ok(FallbackPolicy::Retryable),
            other => Err(format!("unknown fallback policy '{}'", other)),
        }
    }
}

impl fmt::Display for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackPolicy::All => write!(f, "all"),
            FallbackPolicy::Retryable => write!(f, "retryable"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("no AI models are configured")]
    NoModels,

    #[error("all {attempts} AI models failed; last error: {last}")]
    Exhausted { attempts: usize, last: ModelError },

    #[error("AI request rejected: {0}")]
    Rejected(ModelError),
}

/// Sends prompts to an ordered list of models and parses their replies.
pub struct AiGateway {
    backend: Arc<dyn ModelBackend>,
    models: Vec<String>,
    policy: FallbackPolicy,
}

impl AiGateway {
    pub fn new(backend: Arc<dyn ModelBackend>, models: Vec<String>, policy: FallbackPolicy) -> Self {
        Self {
            backend,
            models,
            policy,
        }
    }

    /// Tries each model in order until one returns text.
    ///
    /// Models are attempted one after another, never concurrently. When all of
    /// them fail the last error is returned.
    pub async fn generate(&self, parts: &[Part]) -> Result<String, AiError> {
        let mut last_error = None;

        for model in &self.models {
            tracing::info!("Trying model: {}", model);
            match self.backend.generate(model, parts).await {
                Ok(text) => {
                    tracing::info!("Success with model: {}", model);
                    return Ok(text);
                }
                Err(e) => {
                    tracing::warn!("Model {} failed: {}", model, e);
                    if self.policy == FallbackPolicy::Retryable && !e.is_retryable() {
                        return Err(AiError::Rejected(e));
                    }
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(last) => Err(AiError::Exhausted {
                attempts: self.models.len(),
                last,
            }),
            None => Err(AiError::NoModels),
        }
    }

    /// Solves a question, degrading to a freeform result when the reply has no usable JSON.
    pub async fn solve(
        &self,
        question: &str,
        image_base64: Option<&str>,
    ) -> Result<SolutionResult, AiError> {
        let reply = self
            .generate(&prompts::solve_parts(question, image_base64))
            .await?;
        Ok(parse_solution(&reply))
    }

    /// Grades an answer out of `max_marks`.
    pub async fn check(
        &self,
        question: &str,
        answer: &str,
        max_marks: f64,
        image_base64: Option<&str>,
    ) -> Result<CheckResult, AiError> {
        let reply = self
            .generate(&prompts::check_parts(question, answer, max_marks, image_base64))
            .await?;
        Ok(parse_check(&reply, max_marks))
    }
}

pub fn parse_solution(reply: &str) -> SolutionResult {
    extract_json_object(reply)
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_else(|| {
            tracing::debug!("Model reply had no usable JSON, returning it as freeform text");
            SolutionResult::freeform(reply)
        })
}

pub fn parse_check(reply: &str, max_marks: f64) -> CheckResult {
    match extract_json_object(reply).and_then(|value| serde_json::from_value::<CheckResult>(value).ok()) {
        Some(result) => result.normalize(max_marks),
        None => {
            tracing::debug!("Model reply had no usable JSON, returning it as feedback");
            CheckResult::freeform(reply, max_marks)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays one scripted outcome per call and records the models asked.
    struct Scripted {
        outcomes: Mutex<Vec<Result<String, ModelError>>>,
        calls: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(outcomes: Vec<Result<String, ModelError>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into_iter().rev().collect()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ModelBackend for Scripted {
        async fn generate(&self, model: &str, _parts: &[Part]) -> Result<String, ModelError> {
            self.calls.lock().unwrap().push(model.to_string());
            self.outcomes
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(ModelError::EmptyResponse { model: model.into() }))
        }
    }

    fn quota(model: &str) -> ModelError {
        ModelError::Quota {
            model: model.into(),
            message: "429 RESOURCE_EXHAUSTED".into(),
        }
    }

    fn models(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn falls_through_every_model_before_failing() {
        let backend = Scripted::new(vec![Err(quota("a")), Err(quota("b")), Err(quota("c"))]);
        let gateway = AiGateway::new(backend.clone(), models(&["a", "b", "c"]), FallbackPolicy::All);

        let err = gateway.generate(&[Part::Text("q".into())]).await.unwrap_err();

        assert_eq!(backend.calls(), vec!["a", "b", "c"]);
        match err {
            AiError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert_eq!(last.model(), "c");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn stops_at_first_success() {
        let backend = Scripted::new(vec![Err(quota("a")), Ok("answer".into()), Ok("unused".into())]);
        let gateway = AiGateway::new(backend.clone(), models(&["a", "b", "c"]), FallbackPolicy::All);

        let text = gateway.generate(&[]).await.unwrap();

        assert_eq!(text, "answer");
        assert_eq!(backend.calls(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn blanket_policy_retries_rejections() {
        let rejected = ModelError::Rejected {
            model: "a".into(),
            status: 400,
            message: "bad".into(),
        };
        let backend = Scripted::new(vec![Err(rejected), Ok("ok".into())]);
        let gateway = AiGateway::new(backend.clone(), models(&["a", "b"]), FallbackPolicy::All);

        assert_eq!(gateway.generate(&[]).await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn retryable_policy_aborts_on_rejection() {
        let rejected = ModelError::Rejected {
            model: "a".into(),
            status: 400,
            message: "bad".into(),
        };
        let backend = Scripted::new(vec![Err(rejected), Ok("never".into())]);
        let gateway = AiGateway::new(backend.clone(), models(&["a", "b"]), FallbackPolicy::Retryable);

        let err = gateway.generate(&[]).await.unwrap_err();

        assert!(matches!(err, AiError::Rejected(_)));
        assert_eq!(backend.calls(), vec!["a"]);
    }

    #[tokio::test]
    async fn empty_model_list_fails() {
        let gateway = AiGateway::new(Scripted::new(vec![]), Vec::new(), FallbackPolicy::All);
        assert!(matches!(gateway.generate(&[]).await, Err(AiError::NoModels)));
    }

    #[tokio::test]
    async fn solve_degrades_to_freeform_text() {
        let backend = Scripted::new(vec![Ok("Cash A/c Dr 1000\nTo Sales A/c 1000".into())]);
        let gateway = AiGateway::new(backend, models(&["a"]), FallbackPolicy::All);

        let solution = gateway.solve("Cash sale", None).await.unwrap();

        assert_eq!(solution, SolutionResult::freeform("Cash A/c Dr 1000\nTo Sales A/c 1000"));
        assert_eq!(solution.topic, "Accountancy");
    }

    #[tokio::test]
    async fn check_parses_structured_reply() {
        let reply = r#"Evaluation:
{"score": 4, "maxMarks": 5, "percentage": 80, "overallFeedback": "Good",
 "mistakes": [{"description": "No narration", "correction": "Add narration", "marksLost": 1}],
 "correctParts": ["Debit cash"], "markingBreakdown": [], "improvementTips": []}"#;
        let backend = Scripted::new(vec![Ok(reply.into())]);
        let gateway = AiGateway::new(backend, models(&["a"]), FallbackPolicy::All);

        let result = gateway.check("Q", "A", 5.0, None).await.unwrap();

        assert_eq!(result.score, 4.0);
        assert_eq!(result.mistakes[0].marks_lost, 1.0);
        assert_eq!(result.correct_parts, vec!["Debit cash"]);
    }

    #[test]
    fn check_fallback_keeps_raw_text_and_requested_marks() {
        let result = parse_check("Looks fine to me", 8.0);
        assert_eq!(result.overall_feedback, "Looks fine to me");
        assert_eq!(result.max_marks, 8.0);
        assert_eq!(result.score, 0.0);
        assert!(result.mistakes.is_empty());
    }

    #[test]
    fn policy_parses_from_config_strings() {
        assert_eq!("ALL".parse::<FallbackPolicy>(), Ok(FallbackPolicy::All));
        assert_eq!("retryable".parse::<FallbackPolicy>(), Ok(FallbackPolicy::Retryable));
        assert!("sometimes".parse::<FallbackPolicy>().is_err());
    }
}
