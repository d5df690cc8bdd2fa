//! Mock provider for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use acuquiz_core::traits::{ChatRequest, ChatResponse, TextGenerator};

/// A mock text generator for exercising the gateway without real API calls.
///
/// Returns configurable responses based on user-content matching.
pub struct MockProvider {
    /// Map of user-content substring → response body.
    responses: HashMap<String, String>,
    /// Default response if nothing matches.
    default_response: String,
    call_count: AtomicU32,
    last_request: Mutex<Option<ChatRequest>>,
}

impl MockProvider {
    /// Create a mock with the given substring→response mappings.
    pub fn new(responses: HashMap<String, String>) -> Self {
        Self {
            responses,
            default_response: "{}".to_string(),
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock that always returns the same response.
    pub fn with_fixed_response(response: &str) -> Self {
        Self {
            responses: HashMap::new(),
            default_response: response.to_string(),
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn last_request(&self) -> Option<ChatRequest> {
        self.last_request
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TextGenerator for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &ChatRequest) -> anyhow::Result<ChatResponse> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }

        let content = self
            .responses
            .iter()
            .find(|(key, _)| request.user_content.contains(key.as_str()))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| self.default_response.clone());

        Ok(ChatResponse {
            content,
            model: request.model.clone(),
            latency_ms: 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use acuquiz_core::gateway::{GatewayConfig, GradeRequest, GradingGateway};
    use acuquiz_core::model::{Entry, FieldLabel};

    fn request(user_content: &str) -> ChatRequest {
        ChatRequest {
            model: "mock".into(),
            system_prompt: String::new(),
            user_content: user_content.into(),
            temperature: 0.0,
            top_p: None,
            max_tokens: None,
            json_response: true,
        }
    }

    #[tokio::test]
    async fn fixed_response() {
        let provider = MockProvider::with_fixed_response(r#"{"score": 90}"#);

        let response = provider.complete(&request("anything")).await.unwrap();
        assert_eq!(response.content, r#"{"score": 90}"#);
        assert_eq!(provider.call_count(), 1);
        assert_eq!(provider.last_request().unwrap().user_content, "anything");
    }

    #[tokio::test]
    async fn content_matching() {
        let mut responses = HashMap::new();
        responses.insert("太渊".to_string(), r#"{"question":"太渊？"}"#.to_string());
        responses.insert("列缺".to_string(), r#"{"question":"列缺？"}"#.to_string());
        let provider = MockProvider::new(responses);

        let resp = provider.complete(&request(r#"{"穴位名":"列缺"}"#)).await.unwrap();
        assert!(resp.content.contains("列缺"));
        let resp = provider.complete(&request("unknown")).await.unwrap();
        assert_eq!(resp.content, "{}");
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn drives_gateway_grading() {
        let provider = Arc::new(MockProvider::with_fixed_response(
            r#"{"subscores":{"accuracy":5,"coverage":4,"key_terms":5,"specificity":4,"clarity":5},
                "feedback":"要点齐全","model_answer":"咳嗽，气喘，无脉症"}"#,
        ));
        let gateway = GradingGateway::new(
            Some(provider.clone() as Arc<dyn TextGenerator>),
            GatewayConfig::default(),
        );

        let entry = Entry {
            name: "太渊".into(),
            treatment: "咳嗽，气喘，无脉症，胸痛，咽喉肿痛".into(),
            ..Entry::default()
        };
        let question = gateway_question(&entry);
        let result = gateway
            .grade(&GradeRequest::for_entry(&question, &entry, "咳嗽气喘"))
            .await;

        // (2.0 + 1.0 + 0.75 + 0.4 + 0.5) * 20
        assert_eq!(result.score, 93.0);
        assert!(result.pass);
        assert_eq!(result.feedback, "要点齐全");
        assert_eq!(provider.call_count(), 1);
        assert_eq!(provider.last_request().unwrap().temperature, 0.0);
    }

    fn gateway_question(entry: &Entry) -> acuquiz_core::grading::BuiltQuestion {
        acuquiz_core::grading::BuiltQuestion {
            question: acuquiz_core::grading::template_question(&entry.name, FieldLabel::Treatment),
            canonical_answer: entry.treatment.clone(),
            field_label: FieldLabel::Treatment,
        }
    }
}
