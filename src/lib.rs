//! recapnova: из исходного видео в озвученный пересказ на бирманском.
//!
//! Конвейер: распознавание речи -> сценарий и заголовок от языковой модели ->
//! разбиение сценария на абзацы -> синтез речи по абзацам -> склейка
//! озвучки -> сборка видео с растяжением, обрезкой, отражением,
//! цветокоррекцией и водяным знаком.
//!
//! - `draft`: транскрипция и языковая модель (`generate_draft`)
//! - `pipeline`: оркестратор производства (`final_production`)
//! - `text`, `tts`, `media`: этапы конвейера
//! - `job`, `progress`: жизненный цикл задачи

pub mod config;
pub mod constants;
pub mod draft;
pub mod error;
pub mod job;
pub mod logger;
pub mod media;
pub mod pipeline;
pub mod progress;
pub mod text;
pub mod tts;

pub use config::{ProductionSettings, RecapConfig, Voice};
pub use draft::DraftGenerator;
pub use error::{RecapError, Result};
pub use job::DeliveredOutput;
pub use pipeline::{ProductionOutcome, RecapProducer, SUCCESS_STATUS};
