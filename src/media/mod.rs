//! Работа с медиафайлами через FFmpeg
//!
//! - `ffmpeg`: запуск ffmpeg/ffprobe (трейт `Transcoder`)
//! - `audio`: склейка сегментов в одну дорожку
//! - `probe`: длительность, размер кадра и коэффициент растяжения
//! - `video`: граф фильтров и сборка итогового видео

pub mod audio;
pub mod ffmpeg;
pub mod probe;
pub mod video;

pub use audio::{assemble_segments, extract_audio};
pub use ffmpeg::{FfmpegCli, Tool, ToolOutput, Transcoder, ensure_success};
pub use probe::{FrameSize, frame_size, media_duration, stretch_ratio};
pub use video::{build_filter_complex, composite, sanitize_watermark};
