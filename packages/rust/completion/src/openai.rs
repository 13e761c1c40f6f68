//! OpenAI-compatible chat-completions client.
//!
//! Each prompt is sent as a single user message; the first choice's content
//! is returned verbatim.

use async_trait::async_trait;
use conceptlens_shared::{ApiKey, CompletionConfig, CompletionError, ConceptLensError, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::CompletionClient;

/// User-Agent string for completion requests.
const USER_AGENT: &str = concat!("ConceptLens/", env!("CARGO_PKG_VERSION"));

/// Longest slice of an error body kept in error messages.
const ERROR_BODY_PREVIEW: usize = 300;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP client for `POST {base_url}/chat/completions`.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    endpoint: String,
    api_key: ApiKey,
    model: String,
    max_tokens: u32,
    temperature: f32,
    timeout_ms: u64,
}

impl OpenAiClient {
    /// Build a client from the completion config and a resolved key.
    pub fn new(config: &CompletionConfig, api_key: ApiKey) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout())
            .build()
            .map_err(|e| ConceptLensError::config(format!("failed to build HTTP client: {e}")))?;

        let endpoint = format!(
            "{}/chat/completions",
            config.base_url.as_str().trim_end_matches('/')
        );

        Ok(Self {
            client,
            endpoint,
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout_ms: config.timeout().as_millis() as u64,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip_all, fields(model = %self.model, prompt_len = prompt.len()))]
    async fn complete(&self, prompt: &str) -> std::result::Result<String, CompletionError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let preview = &text[..floor_char_boundary(&text, ERROR_BODY_PREVIEW)];
            return Err(classify_status(status, preview));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| self.classify_body_error(e))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CompletionError::Malformed("response contained no choices".into()))?
            .message
            .content
            .unwrap_or_default();

        debug!(output_len = content.len(), "completion received");
        Ok(content)
    }
}

impl OpenAiClient {
    fn classify_transport_error(&self, err: reqwest::Error) -> CompletionError {
        if err.is_timeout() {
            CompletionError::Timeout(self.timeout_ms)
        } else {
            CompletionError::Transient(format!("{}: {err}", self.endpoint))
        }
    }

    /// Only a body that arrived but does not parse is malformed; a body cut
    /// short by the network or the deadline goes through transport rules.
    fn classify_body_error(&self, err: reqwest::Error) -> CompletionError {
        if err.is_decode() {
            CompletionError::Malformed(format!("invalid response body: {err}"))
        } else {
            self.classify_transport_error(err)
        }
    }
}

/// Map a non-success HTTP status onto the completion error taxonomy.
fn classify_status(status: StatusCode, body: &str) -> CompletionError {
    let msg = format!("HTTP {status}: {body}");
    if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        CompletionError::Transient(msg)
    } else {
        CompletionError::Permanent(msg)
    }
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    let mut idx = max;
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
