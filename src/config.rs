//! Модуль конфигурации recapnova
//!
//! Этот модуль содержит настройки сервиса (`RecapConfig`) и неизменяемые
//! настройки одной задачи (`ProductionSettings`).

use std::env;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::MAX_SPEED_PERCENT;
use crate::error::{RecapError, Result};

/// Количество слотов `GEMINI_API_KEY_n` в окружении
const CREDENTIAL_SLOTS: usize = 5;

/// Поддиректория системного temp, в которой живут задачи по умолчанию
const WORKSPACE_DIR_NAME: &str = "recapnova";

/// Голос диктора
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Voice {
    /// Мужской голос
    #[default]
    Male,
    /// Женский голос
    Female,
}

impl Voice {
    /// Разбор имени голоса без учёта регистра
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            other => Err(RecapError::InvalidInput(format!(
                "unknown voice '{}', expected male or female",
                other
            ))),
        }
    }

    /// Профиль голоса edge-tts
    pub fn profile(&self) -> &'static str {
        match self {
            Self::Male => "my-MM-ThihaNeural",
            Self::Female => "my-MM-NilarNeural",
        }
    }

    /// Вежливая частица, которой диктор заканчивает предложения
    pub fn particle(&self) -> &'static str {
        match self {
            Self::Male => "ဗျာ",
            Self::Female => "ရှင်",
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Male => write!(f, "Male"),
            Self::Female => write!(f, "Female"),
        }
    }
}

/// Настройки одной задачи. Не меняются, пока задача выполняется.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductionSettings {
    pub voice: Voice,
    /// Ускорение речи в процентах (0 - 50)
    pub speed: u32,
    pub watermark: Option<String>,
}

impl ProductionSettings {
    pub fn new(voice: Voice, speed: u32, watermark: Option<String>) -> Result<Self> {
        if speed > MAX_SPEED_PERCENT {
            return Err(RecapError::InvalidInput(format!(
                "speed must be between 0 and {}, got {}",
                MAX_SPEED_PERCENT, speed
            )));
        }

        let watermark = watermark
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty());

        Ok(Self {
            voice,
            speed,
            watermark,
        })
    }

    /// Скорость в формате edge-tts, например `+30%`
    pub fn rate(&self) -> String {
        format!("+{}%", self.speed)
    }
}

impl Default for ProductionSettings {
    fn default() -> Self {
        Self {
            voice: Voice::Male,
            speed: 30,
            watermark: Some("MM RECAP".to_string()),
        }
    }
}

/// Конфигурация сервиса
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecapConfig {
    /// Директория для временных файлов задач и готовых видео.
    /// Очистка при старте удаляет в ней старые `temp_<id>` и `final_<id>.mp4`.
    pub workspace: PathBuf,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub edge_tts_path: String,
    /// OpenAI-совместимый endpoint чата
    pub llm_base_url: String,
    pub llm_model: String,
    pub script_max_tokens: u32,
    pub title_max_tokens: u32,
    /// Таймаут запроса к языковой модели в секундах
    pub llm_timeout_secs: u64,
    /// OpenAI-совместимый endpoint распознавания речи
    pub transcribe_base_url: String,
    pub transcribe_model: String,
    /// Если пусто, берётся первый ключ языковой модели, но только когда
    /// распознавание идёт через того же провайдера
    pub transcribe_api_key: String,
    /// Пул API ключей языковой модели
    pub credentials: Vec<String>,
    /// Максимальное количество одновременных вызовов синтеза
    pub max_concurrent_synthesis: usize,
    /// Остатки моложе этого возраста считаются файлами работающей задачи
    pub stale_after_secs: u64,
}

impl Default for RecapConfig {
    fn default() -> Self {
        Self {
            workspace: env::temp_dir().join(WORKSPACE_DIR_NAME),
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            edge_tts_path: "edge-tts".to_string(),
            llm_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            llm_model: "gemini-2.5-flash-lite".to_string(),
            script_max_tokens: 8192,
            title_max_tokens: 200,
            llm_timeout_secs: 600,
            transcribe_base_url: "https://api.openai.com/v1".to_string(),
            transcribe_model: "whisper-1".to_string(),
            transcribe_api_key: String::new(),
            credentials: Vec::new(),
            max_concurrent_synthesis: 1,
            stale_after_secs: 3600,
        }
    }
}

impl RecapConfig {
    /// Загрузка конфигурации из переменных окружения.
    ///
    /// Должен быть задан хотя бы один `GEMINI_API_KEY_n` (n = 1..=5).
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let credentials: Vec<String> = (1..=CREDENTIAL_SLOTS)
            .filter_map(|i| env::var(format!("GEMINI_API_KEY_{}", i)).ok())
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        if credentials.is_empty() {
            return Err(RecapError::Configuration(
                "at least one GEMINI_API_KEY_n is required".to_string(),
            ));
        }

        let var_or = |name: &str, fallback: String| env::var(name).unwrap_or(fallback);

        Ok(Self {
            workspace: env::var("RECAP_WORKSPACE")
                .map(PathBuf::from)
                .unwrap_or(defaults.workspace),
            ffmpeg_path: var_or("FFMPEG_PATH", defaults.ffmpeg_path),
            ffprobe_path: var_or("FFPROBE_PATH", defaults.ffprobe_path),
            edge_tts_path: var_or("EDGE_TTS_PATH", defaults.edge_tts_path),
            llm_base_url: var_or("RECAP_LLM_BASE_URL", defaults.llm_base_url),
            llm_model: var_or("RECAP_LLM_MODEL", defaults.llm_model),
            transcribe_base_url: var_or(
                "RECAP_TRANSCRIBE_BASE_URL",
                defaults.transcribe_base_url,
            ),
            transcribe_model: var_or("RECAP_TRANSCRIBE_MODEL", defaults.transcribe_model),
            transcribe_api_key: var_or(
                "RECAP_TRANSCRIBE_API_KEY",
                defaults.transcribe_api_key,
            ),
            credentials,
            ..defaults
        })
    }

    /// Ключ для сервиса распознавания речи.
    ///
    /// Ключи языковой модели уходят только на её собственный хост.
    pub fn transcription_key(&self) -> Result<&str> {
        if !self.transcribe_api_key.is_empty() {
            return Ok(&self.transcribe_api_key);
        }

        let llm_host = url_host(&self.llm_base_url);
        if llm_host.is_none() || llm_host != url_host(&self.transcribe_base_url) {
            return Err(RecapError::Configuration(
                "RECAP_TRANSCRIBE_API_KEY required".to_string(),
            ));
        }

        self.credentials
            .first()
            .map(String::as_str)
            .ok_or_else(|| RecapError::Configuration("no transcription API key".to_string()))
    }
}

fn url_host(url: &str) -> Option<String> {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
}
