//! AI question building and grading.
//!
//! The gateway wraps an optional [`TextGenerator`]. Every remote step is
//! bounded by a timeout, and any failure (offline, timeout, transport error,
//! unparseable reply) falls back to the deterministic logic in
//! [`crate::grading`]. Callers always get a usable question or grade.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, ProviderError};
use crate::grading::{
    self, BuiltQuestion, GradeResult, QuestionTypeBalancer, Subscores, NO_MATERIAL_ANSWER,
    PASS_THRESHOLD,
};
use crate::model::{Entry, FieldLabel};
use crate::traits::{extract_json_object, ChatRequest, TextGenerator};

/// Default bound on a single remote call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(45);

const QUESTION_TEMPERATURE: f64 = 0.35;
const GRADING_TEMPERATURE: f64 = 0.0;

const QUESTION_SYSTEM_PROMPT: &str = "你是中医针灸测评出题官。请严格按指定维度(forced_q_type)出题：\
仅输出 JSON：{\"question\":string,\"canonical_answer\":string,\"q_type\":string}；\
其中 q_type 必须等于 forced_q_type。题目需包含穴位名与维度。\
答案以题库原文为准，可以做必要整合，但不得凭空加入未提供信息。";

const GRADING_SYSTEM_PROMPT: &str = "你是中医针灸测评判卷官。只输出 JSON：\
{\"subscores\":{\"accuracy\":number,\"coverage\":number,\"key_terms\":number,\"specificity\":number,\"clarity\":number},\
\"score\":number,\"pass\":boolean,\"feedback\":string,\"model_answer\":string,\"incorrect_reason\":string}。\
评分 0~100，≥80 通过。严格依据提供的题库资料与指定的 q_type，不得凭空扩展或改题。\
评分方法：在以下 5 个维度各打 0~5 分（允许 0.5 分）：\
accuracy=与标准答案含义一致性（权重40%）；coverage=关键要点覆盖度（25%）；\
key_terms=术语/名称正确性（15%）；specificity=细节与限定（10%）；clarity=表达清晰与条理（10%）。\
总分 = (accuracy*0.4 + coverage*0.25 + key_terms*0.15 + specificity*0.10 + clarity*0.10) * 20，\
并四舍五入到 1 位小数。务必使用整个分数区间，合理给出部分分；空答案给 0 分。\
若用户答案与标准答案在无声调拼音上一致或等价，应按完全正确评分，并在反馈中不要提及拼音/同音/读音等。\
当判为不通过时，请在 incorrect_reason 中简要列出缺失的具体要点；通过时留空。";

/// Tunables for remote calls.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub model: String,
    pub timeout: Duration,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f64>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            model: "deepseek-chat".to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_tokens: None,
            top_p: None,
        }
    }
}

/// Everything needed to grade one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRequest {
    pub question: String,
    pub user_answer: String,
    pub entry_name: String,
    pub field_label: FieldLabel,
    /// Bank text for `field_label`; may be empty.
    pub reference_answer: String,
    /// All non-empty fields of the entry keyed by Chinese label.
    pub materials: BTreeMap<String, String>,
}

impl GradeRequest {
    /// Build a request for an answer to `question` about `entry`.
    pub fn for_entry(question: &BuiltQuestion, entry: &Entry, user_answer: &str) -> Self {
        Self {
            question: question.question.clone(),
            user_answer: user_answer.to_string(),
            entry_name: entry.name.clone(),
            field_label: question.field_label,
            reference_answer: entry.field(question.field_label).trim().to_string(),
            materials: grading::materials(entry),
        }
    }
}

#[derive(Serialize)]
struct QuestionPayload<'a> {
    #[serde(rename = "穴位名")]
    entry_name: &'a str,
    forced_q_type: &'a str,
    #[serde(rename = "对应文本")]
    field_text: &'a str,
    #[serde(rename = "资料")]
    materials: &'a BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct QuestionReply {
    #[serde(default)]
    question: String,
    #[serde(default)]
    canonical_answer: String,
    #[serde(default)]
    q_type: String,
}

#[derive(Serialize)]
struct GradePayload<'a> {
    question: &'a str,
    user_answer: &'a str,
    #[serde(rename = "穴位名")]
    entry_name: &'a str,
    q_type: &'a str,
    #[serde(rename = "标准答案")]
    reference_answer: &'a str,
    #[serde(rename = "题库资料")]
    materials: &'a BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct GradeReply {
    #[serde(default)]
    subscores: Option<Subscores>,
    #[serde(default)]
    score: f64,
    #[serde(default)]
    pass: bool,
    #[serde(default)]
    feedback: String,
    #[serde(default)]
    model_answer: String,
    #[serde(default)]
    incorrect_reason: String,
}

/// Builds questions and grades answers, remotely when possible.
pub struct GradingGateway {
    generator: Option<Arc<dyn TextGenerator>>,
    config: GatewayConfig,
    balancer: QuestionTypeBalancer,
    rng: StdRng,
}

impl GradingGateway {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, config: GatewayConfig) -> Self {
        Self {
            generator,
            config,
            balancer: QuestionTypeBalancer::new(),
            rng: StdRng::from_os_rng(),
        }
    }

    /// A gateway that only uses the local fallbacks.
    pub fn offline() -> Self {
        Self::new(None, GatewayConfig::default())
    }

    /// Fix the label-picking order.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn is_online(&self) -> bool {
        self.generator.is_some()
    }

    pub fn balancer(&self) -> &QuestionTypeBalancer {
        &self.balancer
    }

    /// Start a fresh AI session for balancing purposes.
    pub fn reset_balance(&mut self) {
        self.balancer.reset();
    }

    /// Build a question about `entry`.
    ///
    /// Without `forced`, the label is picked among the entry's least-asked
    /// non-empty fields.
    pub async fn build_question(
        &mut self,
        entry: &Entry,
        forced: Option<FieldLabel>,
    ) -> BuiltQuestion {
        let label = forced
            .or_else(|| self.balancer.pick(entry, &mut self.rng))
            .unwrap_or(FieldLabel::Location);
        self.balancer.record(label);

        if !entry.has_fields() {
            return BuiltQuestion {
                question: grading::template_question(&entry.name, label),
                canonical_answer: NO_MATERIAL_ANSWER.to_string(),
                field_label: label,
            };
        }

        match self.remote_question(entry, label).await {
            Ok(question) => question,
            Err(e) => {
                log_fallback(&entry.name, "question", &e);
                BuiltQuestion {
                    question: grading::template_question(&entry.name, label),
                    canonical_answer: grading::reference_answer(entry, label),
                    field_label: label,
                }
            }
        }
    }

    async fn remote_question(
        &self,
        entry: &Entry,
        label: FieldLabel,
    ) -> Result<BuiltQuestion, GatewayError> {
        let materials = grading::materials(entry);
        let payload = QuestionPayload {
            entry_name: &entry.name,
            forced_q_type: label.display_name(),
            field_text: entry.field(label).trim(),
            materials: &materials,
        };
        let reply: QuestionReply = self
            .call(QUESTION_SYSTEM_PROMPT, &payload, QUESTION_TEMPERATURE)
            .await?;

        if !reply.q_type.is_empty() && reply.q_type != label.display_name() {
            tracing::debug!(requested = %label, returned = %reply.q_type, "examiner changed q_type");
        }

        let question = if reply.question.contains(&entry.name) {
            reply.question
        } else {
            grading::template_question(&entry.name, label)
        };
        let canonical_answer = if reply.canonical_answer.trim().is_empty() {
            grading::reference_answer(entry, label)
        } else {
            reply.canonical_answer
        };

        Ok(BuiltQuestion {
            question,
            canonical_answer,
            field_label: label,
        })
    }

    /// Grade an answer.
    ///
    /// Short answers that textually match the reference pass locally without
    /// a remote call.
    pub async fn grade(&self, request: &GradeRequest) -> GradeResult {
        if grading::local_precheck(&request.user_answer, &request.reference_answer) {
            tracing::debug!(entry = %request.entry_name, "accepted by local pre-check");
            return GradeResult::full_marks(&request.reference_answer);
        }

        match self.remote_grade(request).await {
            Ok(result) => result,
            Err(e) => {
                log_fallback(&request.entry_name, "grading", &e);
                grading::fallback_grade(&request.user_answer, &request.reference_answer)
            }
        }
    }

    async fn remote_grade(&self, request: &GradeRequest) -> Result<GradeResult, GatewayError> {
        let payload = GradePayload {
            question: &request.question,
            user_answer: &request.user_answer,
            entry_name: &request.entry_name,
            q_type: request.field_label.display_name(),
            reference_answer: &request.reference_answer,
            materials: &request.materials,
        };
        let reply: GradeReply = self
            .call(GRADING_SYSTEM_PROMPT, &payload, GRADING_TEMPERATURE)
            .await?;

        let (score, pass) = match &reply.subscores {
            Some(subscores) => {
                let score = subscores.weighted_score();
                (score, score >= PASS_THRESHOLD)
            }
            None => (reply.score.clamp(0.0, 100.0), reply.pass),
        };

        let failure_reason = if !pass && reply.incorrect_reason.trim().is_empty() {
            grading::incorrect_reason(&request.user_answer, &request.reference_answer).to_string()
        } else {
            reply.incorrect_reason
        };
        let model_answer = if reply.model_answer.trim().is_empty() {
            request.reference_answer.clone()
        } else {
            reply.model_answer
        };

        Ok(GradeResult {
            score,
            pass,
            feedback: grading::scrub_homophone_terms(&reply.feedback),
            model_answer,
            failure_reason,
            subscores: reply.subscores,
        })
    }

    /// One JSON-in, JSON-out exchange with the generator.
    async fn call<P, R>(
        &self,
        system_prompt: &str,
        payload: &P,
        temperature: f64,
    ) -> Result<R, GatewayError>
    where
        P: Serialize,
        R: for<'de> Deserialize<'de>,
    {
        let generator = self.generator.as_ref().ok_or(GatewayError::Offline)?;
        let user_content = serde_json::to_string(payload)
            .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;

        let request = ChatRequest {
            model: self.config.model.clone(),
            system_prompt: system_prompt.to_string(),
            user_content,
            temperature,
            top_p: self.config.top_p,
            max_tokens: self.config.max_tokens,
            json_response: true,
        };

        let secs = self.config.timeout.as_secs();
        let response = tokio::time::timeout(self.config.timeout, generator.complete(&request))
            .await
            .map_err(|_| GatewayError::Timeout(secs))?
            .map_err(|e| match e.downcast_ref::<ProviderError>() {
                Some(ProviderError::Timeout(s)) => GatewayError::Timeout(*s),
                _ => GatewayError::Remote(e),
            })?;

        let json = extract_json_object(&response.content).ok_or_else(|| {
            GatewayError::MalformedResponse("no JSON object in response".to_string())
        })?;
        serde_json::from_str(json).map_err(|e| GatewayError::MalformedResponse(e.to_string()))
    }
}

fn log_fallback(entry: &str, step: &str, error: &GatewayError) {
    match error {
        GatewayError::Offline => tracing::debug!(entry, "{step} fallback: {error}"),
        _ => tracing::warn!(entry, "{step} fallback: {error}"),
    }
}
