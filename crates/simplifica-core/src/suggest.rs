//! Plain-language rewrites from a chat-completions endpoint.
//!
//! The contract has three parts:
//!
//! - [`build_prompt`]: a Portuguese instruction asking for exactly three
//!   rewrites of one sentence, as a JSON array of strings and nothing else.
//! - [`SuggestionClient::suggest`]: one POST with a bearer credential and a
//!   referrer; non-2xx answers become [`SuggestError::Api`] carrying the
//!   status and body text.
//! - [`parse_suggestions`]: tolerant parsing of what the model actually
//!   sends back, fences and chatter included.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{SuggestError, SuggestResult};
use crate::readability::{self, ReadabilityResult};

/// Most rewrites ever returned for one sentence.
pub const MAX_SUGGESTIONS: usize = 3;

/// Fallback lines must be longer than this many characters.
const MIN_LINE_CHARS: usize = 5;

/// Double-quoted spans, for responses that are not valid JSON.
static QUOTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""([^"]+)""#).expect("valid regex"));

/// Build the rewrite instruction for `sentence`.
pub fn build_prompt(sentence: &str, target_score: u32) -> String {
    format!(
        "TASK: Reescrever a seguinte sentença em Linguagem Simples (Plain Language), garantindo \
alta legibilidade no Índice Flesch-Kincaid (target: {target_score}+).

REGRAS:
1. Use palavras curtas e comuns do cotidiano
2. Prefira frases diretas e objetivas
3. Evite jargões técnicos ou termos rebuscados
4. Use voz ativa quando possível
5. Mantenha o significado original
6. Público-alvo: Ensino Fundamental completo
7. O resultado DEVE ter score Flesch superior a {target_score}

INPUT: \"{sentence}\"

OUTPUT FORMAT: JSON Array com exatamente {MAX_SUGGESTIONS} alternativas diferentes. Cada \
alternativa deve ser uma string completa.
Exemplo: [\"Alternativa 1 simples\", \"Alternativa 2 direta\", \"Alternativa 3 objetiva\"]

RESPONDA APENAS COM O JSON, sem explicações adicionais."
    )
}

/// One chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `user`, `assistant` or `system`.
    pub role: String,
    /// Message text.
    pub content: String,
}

/// Request body of the chat-completions call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model identifier.
    pub model: String,
    /// Conversation; a single user message here.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature.
    pub temperature: f64,
    /// Completion length limit.
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

/// Extract up to [`MAX_SUGGESTIONS`] rewrites from a model response.
///
/// Code fences are stripped first. A JSON array is taken element by
/// element; any other valid JSON yields nothing. Text that is not JSON
/// falls back to every double-quoted span, and failing that to every
/// line longer than five characters.
pub fn parse_suggestions(content: &str) -> Vec<String> {
    let content = content.replace("```json", "").replace("```", "");
    let content = content.trim();
    if content.is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<serde_json::Value>(content) {
        Ok(serde_json::Value::Array(items)) => items
            .into_iter()
            .take(MAX_SUGGESTIONS)
            .map(|item| match item {
                serde_json::Value::String(s) => s.trim().to_string(),
                other => other.to_string(),
            })
            .collect(),
        Ok(_) => Vec::new(),
        Err(_) => {
            let quoted: Vec<String> = QUOTED
                .captures_iter(content)
                .map(|c| c[1].trim().to_string())
                .take(MAX_SUGGESTIONS)
                .collect();
            if !quoted.is_empty() {
                return quoted;
            }
            content
                .lines()
                .map(str::trim)
                .filter(|line| line.chars().count() > MIN_LINE_CHARS)
                .take(MAX_SUGGESTIONS)
                .map(str::to_string)
                .collect()
        }
    }
}

/// A rewrite with its own readability score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredSuggestion {
    /// The rewrite.
    pub text: String,
    /// Its score, when long enough to score.
    pub readability: Option<ReadabilityResult>,
}

/// Score each rewrite so the panel can show how much simpler it is.
pub fn score_suggestions(suggestions: Vec<String>) -> Vec<ScoredSuggestion> {
    suggestions
        .into_iter()
        .map(|text| {
            let readability = readability::score(&text);
            ScoredSuggestion { text, readability }
        })
        .collect()
}

/// HTTP client for the suggestion endpoint.
#[derive(Debug, Clone)]
pub struct SuggestionClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    referer: String,
    temperature: f64,
    max_tokens: u32,
    target_score: u32,
}

impl SuggestionClient {
    /// A client configured from `config`.
    pub fn new(config: &Config) -> SuggestResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("simplifica/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            referer: config.referer.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            target_score: config.target_score,
        })
    }

    /// Send requests to `endpoint` instead of the configured one.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// The request body for `sentence`.
    pub fn request_for(&self, sentence: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: build_prompt(sentence, self.target_score),
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Ask for rewrites of `sentence`.
    ///
    /// Fails with [`SuggestError::MissingCredential`] before any request
    /// when `api_key` is absent or blank.
    #[tracing::instrument(skip_all, fields(sentence_len = sentence.len(), model = %self.model))]
    pub async fn suggest(&self, api_key: Option<&str>, sentence: &str) -> SuggestResult<Vec<String>> {
        let api_key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(SuggestError::MissingCredential)?;

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .header("HTTP-Referer", &self.referer)
            .json(&self.request_for(sentence))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "suggestion request failed");
            return Err(SuggestError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| SuggestError::MalformedResponse(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| SuggestError::MalformedResponse("response has no choices".into()))?;

        let suggestions = parse_suggestions(&content);
        tracing::debug!(count = suggestions.len(), "parsed suggestions");
        Ok(suggestions)
    }
}
