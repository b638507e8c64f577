//! Клиент языковой модели (OpenAI-совместимый chat completions API)
//!
//! Ключ API выбирается на каждый запрос политикой `CredentialPolicy`,
//! которая передаётся клиенту явно.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use rand::seq::SliceRandom;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::RecapConfig;
use crate::error::{RecapError, Result};

/// Выбор ключа API из пула
pub trait CredentialPolicy: Send + Sync {
    fn choose<'a>(&self, pool: &'a [String]) -> Option<&'a str>;
}

/// Случайный ключ на каждый запрос (простое распределение нагрузки)
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomCredential;

impl CredentialPolicy for RandomCredential {
    fn choose<'a>(&self, pool: &'a [String]) -> Option<&'a str> {
        pool.choose(&mut rand::thread_rng()).map(String::as_str)
    }
}

/// Всегда первый ключ
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstCredential;

impl CredentialPolicy for FirstCredential {
    fn choose<'a>(&self, pool: &'a [String]) -> Option<&'a str> {
        pool.first().map(String::as_str)
    }
}

/// Один запрос к чату: системный промпт (необязательный), промпт пользователя, лимит токенов
#[derive(Debug, Clone, PartialEq)]
pub struct ChatPrompt {
    pub system: Option<String>,
    pub user: String,
    pub max_tokens: u32,
}

/// Языковая модель
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &ChatPrompt) -> Result<String>;
}

// Chat message structure for OpenAI API
#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

fn build_messages(prompt: &ChatPrompt) -> Vec<Message> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = &prompt.system {
        messages.push(Message {
            role: "system".to_string(),
            content: system.clone(),
        });
    }
    messages.push(Message {
        role: "user".to_string(),
        content: prompt.user.clone(),
    });
    messages
}

fn first_choice_text(completion: ChatCompletion) -> Result<String> {
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| RecapError::Language("response contained no choices".to_string()))
}

/// Клиент chat completions
pub struct ChatClient {
    client: Client,
    base_url: String,
    model: String,
    credentials: Vec<String>,
    policy: Arc<dyn CredentialPolicy>,
}

impl ChatClient {
    pub fn new(config: &RecapConfig, policy: Arc<dyn CredentialPolicy>) -> Result<Self> {
        if config.credentials.is_empty() {
            return Err(RecapError::Configuration(
                "language model credential pool is empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.llm_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.llm_base_url.trim_end_matches('/').to_string(),
            model: config.llm_model.clone(),
            credentials: config.credentials.clone(),
            policy,
        })
    }
}

#[async_trait]
impl LanguageModel for ChatClient {
    async fn complete(&self, prompt: &ChatPrompt) -> Result<String> {
        let api_key = self
            .policy
            .choose(&self.credentials)
            .ok_or_else(|| RecapError::Configuration("no credential available".to_string()))?;

        let request = ChatRequest {
            model: &self.model,
            messages: build_messages(prompt),
            max_tokens: prompt.max_tokens,
        };

        debug!(
            "Sending chat request to {} (model {}, max_tokens {})",
            self.base_url, self.model, prompt.max_tokens
        );
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = match response.text().await {
                Ok(text) => text,
                Err(e) => format!("Failed to read error response: {}", e),
            };
            error!("Chat API error: HTTP {}, body: {}", status, error_text);
            return Err(RecapError::Language(format!("HTTP {}: {}", status, error_text)));
        }

        let completion: ChatCompletion = response.json().await?;
        first_choice_text(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> Vec<String> {
        vec!["k1".to_string(), "k2".to_string(), "k3".to_string()]
    }

    #[test]
    fn test_first_credential_is_deterministic() {
        assert_eq!(FirstCredential.choose(&pool()), Some("k1"));
        assert_eq!(FirstCredential.choose(&[]), None);
    }

    #[test]
    fn test_random_credential_stays_in_pool() {
        let pool = pool();
        for _ in 0..20 {
            let key = RandomCredential.choose(&pool).unwrap();
            assert!(pool.iter().any(|k| k == key));
        }
        assert_eq!(RandomCredential.choose(&[]), None);
    }

    #[test]
    fn test_request_shape() {
        let prompt = ChatPrompt {
            system: Some("system prompt".to_string()),
            user: "transcript".to_string(),
            max_tokens: 8192,
        };
        let request = ChatRequest {
            model: "gemini-2.5-flash-lite",
            messages: build_messages(&prompt),
            max_tokens: prompt.max_tokens,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gemini-2.5-flash-lite");
        assert_eq!(json["max_tokens"], 8192);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "transcript");
    }

    #[test]
    fn test_user_only_prompt() {
        let prompt = ChatPrompt {
            system: None,
            user: "title please".to_string(),
            max_tokens: 200,
        };
        let messages = build_messages(&prompt);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "user");
    }

    #[test]
    fn test_completion_parsing() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  ဇာတ်လမ်း။ \n"}}]}"#;
        let completion: ChatCompletion = serde_json::from_str(body).unwrap();
        assert_eq!(first_choice_text(completion).unwrap(), "ဇာတ်လမ်း။");

        let empty: ChatCompletion = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(first_choice_text(empty), Err(RecapError::Language(_))));
    }

    #[test]
    fn test_client_requires_credentials() {
        let config = RecapConfig::default();
        assert!(ChatClient::new(&config, Arc::new(FirstCredential)).is_err());
    }
}
