//! Черновик: распознавание речи и переписывание текста языковой моделью
//!
//! `generate_draft` возвращает пару (сценарий, заголовок). Ошибки не
//! пробрасываются: вместо сценария возвращается строка `"Error: ..."`.

pub mod llm;
pub mod transcribe;

use std::path::Path;
use std::sync::Arc;

use log::{error, info};

use crate::config::{RecapConfig, Voice};
use crate::error::{Result, error_status};

pub use llm::{
    ChatClient, ChatPrompt, CredentialPolicy, FirstCredential, LanguageModel, RandomCredential,
};
pub use transcribe::{Transcriber, WhisperApiTranscriber};

/// Системный промпт для переписывания транскрипта в сценарий
pub fn script_system_prompt(voice: Voice) -> String {
    format!(
        "Translate to Burmese storytelling style. Remove timelines. No English. \
         Use {} naturally. No intro/outro.",
        voice.particle()
    )
}

/// Промпт для заголовка с хэштегами
pub fn title_prompt(transcript: &str) -> String {
    format!("Viral Burmese title + 5 hashtags: {}", transcript)
}

/// Генератор черновика (сценарий + заголовок)
pub struct DraftGenerator {
    transcriber: Arc<dyn Transcriber>,
    model: Arc<dyn LanguageModel>,
    script_max_tokens: u32,
    title_max_tokens: u32,
}

impl DraftGenerator {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        model: Arc<dyn LanguageModel>,
        config: &RecapConfig,
    ) -> Self {
        Self {
            transcriber,
            model,
            script_max_tokens: config.script_max_tokens,
            title_max_tokens: config.title_max_tokens,
        }
    }

    /// Возвращает `(сценарий, заголовок)`; при ошибке `("Error: ...", "")`.
    pub async fn generate_draft(
        &self,
        video_path: Option<&Path>,
        voice: Voice,
    ) -> (String, String) {
        let Some(video_path) = video_path.filter(|p| !p.as_os_str().is_empty()) else {
            return ("Error: No Video".to_string(), String::new());
        };

        match self.draft(video_path, voice).await {
            Ok(draft) => draft,
            Err(e) => {
                error!("Draft error: {}", e);
                (error_status(&e), String::new())
            }
        }
    }

    async fn draft(&self, video_path: &Path, voice: Voice) -> Result<(String, String)> {
        info!("Transcribing {}", video_path.display());
        let transcript = self.transcriber.transcribe(video_path).await?;

        let script = self
            .model
            .complete(&ChatPrompt {
                system: Some(script_system_prompt(voice)),
                user: transcript.clone(),
                max_tokens: self.script_max_tokens,
            })
            .await?;

        let title = self
            .model
            .complete(&ChatPrompt {
                system: None,
                user: title_prompt(&transcript),
                max_tokens: self.title_max_tokens,
            })
            .await?;

        info!("Draft ready: {} chars of script, title '{}'", script.chars().count(), title);
        Ok((script.trim().to_string(), title.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecapError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedTranscriber(Option<&'static str>);

    #[async_trait]
    impl Transcriber for FixedTranscriber {
        async fn transcribe(&self, _media_path: &Path) -> Result<String> {
            self.0
                .map(str::to_string)
                .ok_or_else(|| RecapError::Transcription("model crashed".to_string()))
        }
    }

    #[derive(Default)]
    struct EchoModel {
        prompts: Mutex<Vec<ChatPrompt>>,
    }

    #[async_trait]
    impl LanguageModel for EchoModel {
        async fn complete(&self, prompt: &ChatPrompt) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.clone());
            Ok(format!("  reply to {} \n", prompt.max_tokens))
        }
    }

    fn generator(transcript: Option<&'static str>, model: Arc<EchoModel>) -> DraftGenerator {
        DraftGenerator::new(
            Arc::new(FixedTranscriber(transcript)),
            model,
            &RecapConfig::default(),
        )
    }

    #[test]
    fn test_prompt_uses_voice_particle() {
        assert!(script_system_prompt(Voice::Female).contains("ရှင်"));
        assert!(script_system_prompt(Voice::Male).contains("ဗျာ"));
        assert!(title_prompt("story").ends_with("hashtags: story"));
    }

    #[tokio::test]
    async fn test_missing_video() {
        let model = Arc::new(EchoModel::default());
        let (script, title) = generator(Some("t"), model.clone())
            .generate_draft(None, Voice::Male)
            .await;
        assert_eq!(script, "Error: No Video");
        assert_eq!(title, "");
        assert!(model.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_draft_makes_two_calls() {
        let model = Arc::new(EchoModel::default());
        let (script, title) = generator(Some("the transcript"), model.clone())
            .generate_draft(Some(Path::new("movie.mp4")), Voice::Female)
            .await;

        assert_eq!(script, "reply to 8192");
        assert_eq!(title, "reply to 200");

        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[0].system, Some(script_system_prompt(Voice::Female)));
        assert_eq!(prompts[0].user, "the transcript");
        assert_eq!(prompts[1].system, None);
        assert_eq!(prompts[1].user, title_prompt("the transcript"));
    }

    #[tokio::test]
    async fn test_transcription_failure_becomes_status() {
        let model = Arc::new(EchoModel::default());
        let (script, title) = generator(None, model)
            .generate_draft(Some(Path::new("movie.mp4")), Voice::Male)
            .await;
        assert!(script.starts_with("Error: "));
        assert!(script.contains("model crashed"));
        assert_eq!(title, "");
    }
}
