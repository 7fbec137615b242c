//! Language-model binding of the [`Translator`] contract.
//!
//! Both providers get the same prompts; OpenAI additionally gets the response
//! schema as a strict `json_schema` response format.

use anyhow::{Context, Result, anyhow, bail};
use fintrack_core::prompt::{
    build_commands_prompt, build_context_prompt, build_system_prompt, decode_response, response_schema,
};
use fintrack_core::{TranslationError, TranslationRequest, Translator, WireCommand};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::str::FromStr;
use std::time::Duration;

use crate::auth;
use crate::config::LlmSection;

const OPENAI_BASE_URL: &str = "https://api.openai.com";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAI,
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAI),
            "anthropic" => Ok(Provider::Anthropic),
            other => bail!("unknown llm provider '{other}' (expected openai or anthropic)"),
        }
    }
}

pub struct LlmTranslator {
    provider: Provider,
    model: String,
    base_url: String,
    temperature: f32,
    api_key: String,
    client: reqwest::Client,
}

impl LlmTranslator {
    /// Build from config, with the key from the environment or auth.json.
    pub fn from_config(cfg: &LlmSection) -> Result<Self> {
        let provider: Provider = cfg.provider.parse()?;
        let api_key = match provider {
            Provider::OpenAI => auth::openai_api_key()?.ok_or_else(|| {
                anyhow!(
                    "no OpenAI API key; set {} or run: fintrack auth paste-openai-api-key",
                    auth::OPENAI_KEY_ENV
                )
            })?,
            Provider::Anthropic => auth::anthropic_token()?.ok_or_else(|| {
                anyhow!(
                    "no Anthropic API key; set {} or run: fintrack auth paste-anthropic-token",
                    auth::ANTHROPIC_KEY_ENV
                )
            })?,
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs.max(1)))
            .build()
            .context("build http client")?;

        Ok(Self {
            provider,
            model: cfg.model.clone(),
            base_url: base_url_for(provider, &cfg.base_url),
            temperature: cfg.temperature,
            api_key,
            client,
        })
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    async fn translate_async(&self, request: &TranslationRequest) -> Result<Vec<WireCommand>, TranslationError> {
        let (system, user) = build_messages(request);
        let text = match self.provider {
            Provider::OpenAI => self.openai_complete(&system, &user).await?,
            Provider::Anthropic => self.anthropic_complete(&system, &user).await?,
        };
        tracing::debug!(response = %text, "model response");
        decode_response(&text)
    }

    async fn openai_complete(&self, system: &str, user: &str) -> Result<String, TranslationError> {
        let body = openai_body(&self.model, self.temperature, system, user);
        let resp = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;

        let text = checked_text(resp).await?;
        openai_content(&text)
    }

    async fn anthropic_complete(&self, system: &str, user: &str) -> Result<String, TranslationError> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            max_tokens: u32,
            temperature: f32,
            system: String,
            messages: Vec<Msg<'a>>,
        }

        let body = Req {
            model: &self.model,
            max_tokens: ANTHROPIC_MAX_TOKENS,
            temperature: self.temperature,
            system: format!("{system}\n\nRespond with the JSON object only, no prose."),
            messages: vec![Msg { role: "user", content: user }],
        };

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|e| TranslationError::Request(format!("invalid API key header: {e}")))?;
        headers.insert("x-api-key", key);
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let resp = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;

        let text = checked_text(resp).await?;
        anthropic_content(&text)
    }
}

impl Translator for LlmTranslator {
    fn translate(&self, request: &TranslationRequest) -> Result<Vec<WireCommand>, TranslationError> {
        // The binary runs under #[tokio::main]; a nested block_on would panic.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            tokio::task::block_in_place(|| handle.block_on(self.translate_async(request)))
        } else {
            let rt = tokio::runtime::Runtime::new()
                .map_err(|e| TranslationError::Request(format!("create tokio runtime: {e}")))?;
            rt.block_on(self.translate_async(request))
        }
    }
}

/// An unchanged default OpenAI URL means "the provider's own endpoint".
fn base_url_for(provider: Provider, configured: &str) -> String {
    let configured = configured.trim().trim_end_matches('/');
    match provider {
        Provider::Anthropic if configured.is_empty() || configured == OPENAI_BASE_URL => {
            ANTHROPIC_BASE_URL.to_string()
        }
        Provider::OpenAI if configured.is_empty() => OPENAI_BASE_URL.to_string(),
        _ => configured.to_string(),
    }
}

/// System and user message for one translation.
fn build_messages(request: &TranslationRequest) -> (String, String) {
    let system = format!("{}\n\n{}", build_system_prompt(), build_commands_prompt());
    let user = format!(
        "{}\n\nUser input: {}",
        build_context_prompt(request),
        request.utterance
    );
    (system, user)
}

fn openai_body(model: &str, temperature: f32, system: &str, user: &str) -> Value {
    json!({
        "model": model,
        "temperature": temperature,
        "messages": [
            { "role": "system", "content": system },
            { "role": "user", "content": user }
        ],
        "response_format": {
            "type": "json_schema",
            "json_schema": {
                "name": "command_sequence",
                "strict": true,
                "schema": response_schema()
            }
        }
    })
}

fn request_error(e: reqwest::Error) -> TranslationError {
    if e.is_timeout() {
        TranslationError::Timeout
    } else {
        TranslationError::Request(e.to_string())
    }
}

async fn checked_text(resp: reqwest::Response) -> Result<String, TranslationError> {
    let status = resp.status();
    let text = resp.text().await.map_err(request_error)?;
    if !status.is_success() {
        tracing::warn!(status = status.as_u16(), "model request rejected");
        return Err(TranslationError::Status {
            status: status.as_u16(),
            body: text,
        });
    }
    Ok(text)
}

fn openai_content(body: &str) -> Result<String, TranslationError> {
    #[derive(Deserialize)]
    struct Resp {
        choices: Vec<Choice>,
    }

    #[derive(Deserialize)]
    struct Choice {
        message: MsgOut,
    }

    #[derive(Deserialize)]
    struct MsgOut {
        content: Option<String>,
        refusal: Option<String>,
    }

    let out: Resp = serde_json::from_str(body).map_err(|e| TranslationError::InvalidResponse(e.to_string()))?;
    let Some(choice) = out.choices.into_iter().next() else {
        return Err(TranslationError::InvalidResponse("no choices in response".to_string()));
    };
    if let Some(refusal) = choice.message.refusal {
        return Err(TranslationError::InvalidResponse(format!("model refused: {refusal}")));
    }
    Ok(choice.message.content.unwrap_or_default().trim().to_string())
}

fn anthropic_content(body: &str) -> Result<String, TranslationError> {
    #[derive(Deserialize)]
    struct Resp {
        content: Vec<ContentBlock>,
    }

    #[derive(Deserialize)]
    struct ContentBlock {
        #[serde(rename = "type")]
        t: String,
        text: Option<String>,
    }

    let out: Resp = serde_json::from_str(body).map_err(|e| TranslationError::InvalidResponse(e.to_string()))?;
    let mut s = String::new();
    for b in out.content {
        if b.t == "text"
            && let Some(t) = b.text
        {
            s.push_str(&t);
        }
    }
    Ok(s.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn request() -> TranslationRequest {
        TranslationRequest {
            utterance: "I spent 20 on lunch".to_string(),
            today: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            categories: vec!["Dining".to_string(), "Rent".to_string()],
            transactions: Vec::new(),
        }
    }

    #[test]
    fn provider_names_parse() {
        assert_eq!("OpenAI".parse::<Provider>().unwrap(), Provider::OpenAI);
        assert_eq!("anthropic".parse::<Provider>().unwrap(), Provider::Anthropic);
        assert!("gemini".parse::<Provider>().is_err());
    }

    #[test]
    fn anthropic_swaps_in_its_own_endpoint() {
        assert_eq!(base_url_for(Provider::Anthropic, OPENAI_BASE_URL), ANTHROPIC_BASE_URL);
        assert_eq!(base_url_for(Provider::Anthropic, "http://localhost:8080/"), "http://localhost:8080");
        assert_eq!(base_url_for(Provider::OpenAI, ""), OPENAI_BASE_URL);
    }

    #[test]
    fn user_message_carries_context_and_utterance() {
        let (system, user) = build_messages(&request());
        assert!(system.contains("negative amount"));
        assert!(user.contains("Today's date: 05/03/2024"));
        assert!(user.contains(r#"["Dining", "Rent"]"#));
        assert!(user.ends_with("User input: I spent 20 on lunch"));
    }

    #[test]
    fn openai_body_requests_strict_schema() {
        let body = openai_body("gpt-4o-mini", 0.0, "sys", "usr");
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["strict"], true);
        assert_eq!(body["messages"][1]["content"], "usr");
    }

    #[test]
    fn openai_content_extracts_message() {
        let body = r#"{"choices":[{"message":{"content":" {\"commands\":[]} ","refusal":null}}]}"#;
        assert_eq!(openai_content(body).unwrap(), r#"{"commands":[]}"#);
    }

    #[test]
    fn openai_refusal_is_a_failure() {
        let body = r#"{"choices":[{"message":{"content":null,"refusal":"no"}}]}"#;
        assert!(matches!(openai_content(body), Err(TranslationError::InvalidResponse(_))));
    }

    #[test]
    fn anthropic_content_joins_text_blocks() {
        let body = r#"{"content":[{"type":"text","text":"{\"commands\":"},{"type":"text","text":"[]}"}]}"#;
        assert_eq!(anthropic_content(body).unwrap(), r#"{"commands":[]}"#);
        assert!(decode_response(&anthropic_content(body).unwrap()).unwrap().is_empty());
    }
}
