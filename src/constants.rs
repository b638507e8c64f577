//! Подобранные вручную константы обработки текста, аудио и видео.
//!
//! Значения взяты с продакшн-бота; менять только вместе с обоснованием.

/// Количество предложений в одном озвучиваемом абзаце
pub const SENTENCES_PER_PARAGRAPH: usize = 3;

/// Символы конца предложения в сценарии
pub const SENTENCE_TERMINATORS: &[char] = &['။', '।', '.'];

/// Знак, которым заканчивается каждый абзац для синтеза
pub const PARAGRAPH_TERMINATOR: char = '။';

/// Тишина ниже этого уровня считается паузой
pub const SILENCE_THRESHOLD_DB: i32 = -50;

/// Минимальная длина удаляемой паузы для `silenceremove`, секунды
pub const SILENCE_MIN_DURATION_SECS: f64 = 0.1;

/// Качество LAME VBR для склеенной озвучки
pub const MP3_QUALITY: u8 = 2;

/// Доля высоты кадра, остающаяся после обрезки (срезает вшитый футер)
pub const CROP_KEEP_RATIO: f64 = 0.82;

pub const EQ_BRIGHTNESS: f64 = 0.06;
pub const EQ_CONTRAST: f64 = 1.2;
pub const EQ_SATURATION: f64 = 1.4;

pub const WATERMARK_FONT_SIZE: u32 = 35;
/// Отступ от правого верхнего угла, пиксели
pub const WATERMARK_MARGIN: u32 = 40;
pub const WATERMARK_SHADOW_OFFSET: u32 = 2;

/// edge-tts пишет тихо, дорожка озвучки усиливается в это число раз
pub const NARRATION_GAIN: f64 = 9.0;

pub const VIDEO_CRF: u8 = 23;
pub const VIDEO_PRESET: &str = "fast";
pub const VIDEO_CODEC: &str = "libx264";

/// Максимальное ускорение речи в процентах
pub const MAX_SPEED_PERCENT: u32 = 50;
