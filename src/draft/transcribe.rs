//! Распознавание речи
//!
//! Сервис создаётся один раз при старте и затем только читается, поэтому
//! его можно разделять между задачами (`Arc<dyn Transcriber>`).

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info};
use reqwest::Client;
use reqwest::multipart::{Form, Part};

use crate::config::RecapConfig;
use crate::error::{RecapError, Result};
use crate::media::{Transcoder, extract_audio};

/// Распознавание речи: локальный медиафайл на входе, текст на выходе
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, media_path: &Path) -> Result<String>;
}

/// Клиент OpenAI-совместимого `/audio/transcriptions`.
///
/// Звуковая дорожка сначала извлекается во временный mp3, видео целиком
/// не загружается.
pub struct WhisperApiTranscriber {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    transcoder: Arc<dyn Transcoder>,
}

impl WhisperApiTranscriber {
    pub fn new(config: &RecapConfig, transcoder: Arc<dyn Transcoder>) -> Result<Self> {
        let api_key = config.transcription_key()?.to_string();

        // long videos take a while to transcribe
        let client = Client::builder()
            .timeout(Duration::from_secs(config.llm_timeout_secs))
            .build()?;

        info!(
            "Transcription service ready ({} at {})",
            config.transcribe_model, config.transcribe_base_url
        );

        Ok(Self {
            client,
            base_url: config.transcribe_base_url.trim_end_matches('/').to_string(),
            model: config.transcribe_model.clone(),
            api_key,
            transcoder,
        })
    }
}

#[async_trait]
impl Transcriber for WhisperApiTranscriber {
    async fn transcribe(&self, media_path: &Path) -> Result<String> {
        let temp_dir = tempfile::tempdir()?;
        let audio_path = temp_dir.path().join("speech.mp3");

        extract_audio(self.transcoder.as_ref(), media_path, &audio_path)
            .await
            .map_err(|e| RecapError::Transcription(format!("audio extraction failed: {}", e)))?;

        let bytes = tokio::fs::read(&audio_path).await?;
        debug!("Uploading {} bytes of audio for transcription", bytes.len());

        let part = Part::bytes(bytes)
            .file_name("speech.mp3")
            .mime_str("audio/mpeg")?;
        let form = Form::new()
            .text("model", self.model.clone())
            .text("response_format", "text")
            .part("file", part);

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            error!("Transcription API error: HTTP {}, body: {}", status, body);
            return Err(RecapError::Transcription(format!("HTTP {}: {}", status, body)));
        }

        let transcript = body.trim().to_string();
        info!("Transcribed {} characters", transcript.chars().count());
        Ok(transcript)
    }
}
