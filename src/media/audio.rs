//! Модуль для работы с аудио
//!
//! Склейка сегментов озвучки в одну дорожку и извлечение звука из видео.

use std::path::{Path, PathBuf};

use log::{debug, info};

use super::ffmpeg::{Tool, Transcoder, ensure_success};
use crate::constants::{MP3_QUALITY, SILENCE_MIN_DURATION_SECS, SILENCE_THRESHOLD_DB};
use crate::error::{RecapError, Result};

/// Имя файла со списком сегментов для concat demuxer
pub const CONCAT_LIST_NAME: &str = "list.txt";
/// Имя собранной дорожки внутри временной директории
pub const COMBINED_AUDIO_NAME: &str = "combined.mp3";

/// Фильтр `silenceremove`, убирающий паузы на стыках сегментов
pub fn silence_filter() -> String {
    format!(
        "silenceremove=start_periods=1:stop_periods=-1:stop_duration={}:stop_threshold={}dB",
        SILENCE_MIN_DURATION_SECS, SILENCE_THRESHOLD_DB
    )
}

/// Строка для concat demuxer. Одинарные кавычки в пути закрываются,
/// экранируются и открываются снова.
fn concat_entry(path: &Path) -> String {
    let escaped = path.to_string_lossy().replace('\'', r"'\''");
    format!("file '{}'\n", escaped)
}

/// Склеивает сегменты в одну mp3-дорожку, сохраняя порядок.
pub async fn assemble_segments(
    transcoder: &dyn Transcoder,
    segments: &[PathBuf],
    scratch_dir: &Path,
) -> Result<PathBuf> {
    if segments.is_empty() {
        return Err(RecapError::AudioAssembly(
            "no audio segments to assemble".to_string(),
        ));
    }

    // Создаем файл со списком аудиофайлов для FFmpeg
    let mut concat_list = String::new();
    for segment in segments {
        let absolute = tokio::fs::canonicalize(segment).await.map_err(|e| {
            RecapError::AudioAssembly(format!("segment {} is missing: {}", segment.display(), e))
        })?;
        concat_list.push_str(&concat_entry(&absolute));
    }

    let list_path = scratch_dir.join(CONCAT_LIST_NAME);
    tokio::fs::write(&list_path, concat_list).await?;

    let output_path = scratch_dir.join(COMBINED_AUDIO_NAME);
    let args = vec![
        "-y".to_string(),
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        list_path.to_string_lossy().into_owned(),
        "-af".to_string(),
        silence_filter(),
        "-c:a".to_string(),
        "libmp3lame".to_string(),
        "-q:a".to_string(),
        MP3_QUALITY.to_string(),
        output_path.to_string_lossy().into_owned(),
    ];

    info!("Concatenating {} segments into {}", segments.len(), output_path.display());
    let output = transcoder.run(Tool::Ffmpeg, &args).await?;
    ensure_success(Tool::Ffmpeg, &output)?;

    debug!("Audio assembled at {}", output_path.display());
    Ok(output_path)
}

/// Извлечение аудио из видео (для распознавания речи)
pub async fn extract_audio(
    transcoder: &dyn Transcoder,
    video_path: &Path,
    output_path: &Path,
) -> Result<()> {
    let args = vec![
        "-y".to_string(),
        "-i".to_string(),
        video_path.to_string_lossy().into_owned(),
        "-vn".to_string(), // Отключаем видео
        "-acodec".to_string(),
        "libmp3lame".to_string(),
        "-q:a".to_string(),
        MP3_QUALITY.to_string(),
        output_path.to_string_lossy().into_owned(),
    ];

    let output = transcoder.run(Tool::Ffmpeg, &args).await?;
    ensure_success(Tool::Ffmpeg, &output)
}
