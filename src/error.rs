//! Модуль обработки ошибок recapnova
//!
//! Все этапы конвейера возвращают `RecapError`; наружу (в обработчик запросов)
//! ошибки уходят только в виде строки статуса `"Error: ..."`.

use thiserror::Error;

/// Ошибки библиотеки recapnova
#[derive(Debug, Error)]
pub enum RecapError {
    /// Ошибка ввода-вывода
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка HTTP запроса
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Ошибка сериализации/десериализации JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Некорректные входные данные (нет видео, пустой сценарий, неверные настройки)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Ошибка конфигурации
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Ошибка распознавания речи
    #[error("Transcription error: {0}")]
    Transcription(String),

    /// Ошибка языковой модели
    #[error("Language model error: {0}")]
    Language(String),

    /// Ошибка синтеза речи
    #[error("Speech synthesis error: {0}")]
    Synthesis(String),

    /// Ошибка сборки аудиодорожки
    #[error("Audio assembly error: {0}")]
    AudioAssembly(String),

    /// Ошибка сборки итогового видео
    #[error("Video composition error: {0}")]
    VideoComposition(String),

    /// Внешняя утилита завершилась с ненулевым кодом
    #[error("{program} exited with code {code:?}: {stderr}")]
    Transcoder {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    /// Другая ошибка
    #[error("Other error: {0}")]
    Other(String),
}

/// Тип Result для библиотеки recapnova
pub type Result<T> = std::result::Result<T, RecapError>;

/// Строка статуса для пользователя: `Error: ...`
pub fn error_status(error: &RecapError) -> String {
    format!("Error: {}", error)
}
