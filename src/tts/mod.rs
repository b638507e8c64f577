//! Модуль для работы с TTS
//!
//! Синтезатор речи подключается через трейт `SpeechSynthesizer`; по умолчанию
//! используется утилита edge-tts.

pub mod edge;
pub mod segments;

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

pub use edge::EdgeTtsCli;
pub use segments::{segment_file_name, synthesize_segments};

/// Превращает один абзац в один аудиофайл
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Озвучивает `text` голосом `profile` со скоростью `rate` (например `+30%`)
    /// в файл `output`.
    async fn synthesize(&self, text: &str, profile: &str, rate: &str, output: &Path) -> Result<()>;
}
