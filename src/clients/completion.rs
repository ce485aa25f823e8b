//! Gemini `generateContent` client for the AI guide chat

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::CompletionConfig;
use crate::error::{GuideError, Service};
use crate::session::ChatHistory;

const SLOW_RESPONSE: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate
    fn text(self) -> Option<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

#[derive(Clone)]
pub struct CompletionClient {
    http: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    fallback_model: String,
    answer_language: String,
    timeout: Duration,
}

impl CompletionClient {
    pub fn new(http: Client, config: &CompletionConfig) -> Self {
        Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            fallback_model: config.fallback_model.clone(),
            answer_language: config.answer_language.clone(),
            timeout: config.timeout(),
        }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Wrap a user question in the guide preamble
    #[must_use]
    pub fn prompt_for(&self, question: &str) -> String {
        format!(
            "You are an expert travel guide for Taiwan. Answer kindly in {}. Question: {}",
            self.answer_language, question
        )
    }

    /// Ask the guide a question and return its answer
    #[instrument(skip(self), fields(model = %self.model))]
    pub async fn ask(&self, question: &str) -> Result<String, GuideError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(GuideError::unconfigured(
                Service::Completion,
                "completion.api_key (or GOOGLE_API_KEY)",
            ));
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let prompt = self.prompt_for(question);
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: &prompt }],
            }],
        };

        debug!("Calling completion backend");
        let start = Instant::now();
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| GuideError::from_transport(Service::Completion, &e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(%status, "Completion backend rejected the request");
            return Err(GuideError::from_status(
                Service::Completion,
                status,
                &format!("model '{}'", self.model),
                &text,
            )
            .with_suggestion(format!("'{}'", self.fallback_model)));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GuideError::unknown(Service::Completion, e.to_string()))?;

        let elapsed = start.elapsed();
        if elapsed > SLOW_RESPONSE {
            warn!("Slow completion response: {:.3}s", elapsed.as_secs_f64());
        }

        let answer = parsed.text().ok_or_else(|| {
            GuideError::unknown(Service::Completion, "the model returned an empty answer")
        })?;
        info!(
            chars = answer.chars().count(),
            "Completion answered in {:.3}s",
            elapsed.as_secs_f64()
        );
        Ok(answer)
    }

    /// Ask a question and, on success, record the exchange in `history`.
    /// A failed call leaves `history` untouched.
    pub async fn converse(
        &self,
        history: &mut ChatHistory,
        question: &str,
    ) -> Result<String, GuideError> {
        let answer = self.ask(question).await?;
        history.record_exchange(question, answer.clone());
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(api_key: Option<&str>) -> CompletionClient {
        let config = CompletionConfig {
            api_key: api_key.map(str::to_string),
            ..CompletionConfig::default()
        };
        CompletionClient::new(Client::new(), &config)
    }

    #[test]
    fn test_is_configured_follows_key() {
        assert!(!client(None).is_configured());
        assert!(client(Some("key")).is_configured());
    }

    #[test]
    fn test_prompt_wraps_question() {
        let prompt = client(None).prompt_for("How do I get to Jiufen?");
        assert!(prompt.contains("travel guide for Taiwan"));
        assert!(prompt.contains("Korean"));
        assert!(prompt.ends_with("Question: How do I get to Jiufen?"));
    }

    #[test]
    fn test_parse_response_joins_parts() {
        let json = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "Take bus "}, {"text": "1062."}], "role": "model"}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }"#;
        let parsed: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.text().as_deref(), Some("Take bus 1062."));
    }

    #[test]
    fn test_parse_response_without_candidates() {
        let parsed: GenerateResponse = serde_json::from_str(r#"{"promptFeedback": {}}"#).unwrap();
        assert!(parsed.text().is_none());
    }

    #[tokio::test]
    async fn test_unconfigured_leaves_history_untouched() {
        let mut history = ChatHistory::default();
        let err = client(None)
            .converse(&mut history, "Is the MRT open late?")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Unconfigured);
        assert!(err.user_message().contains("GOOGLE_API_KEY"));
        assert!(history.is_empty());
    }
}
