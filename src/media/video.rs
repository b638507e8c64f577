//! Модуль для работы с видео
//!
//! Видео растягивается под длительность озвучки, обрезается снизу, отражается
//! по горизонтали и перекрашивается; поверх может накладываться водяной знак.
//! Исходный звук полностью заменяется озвучкой.

use std::path::{Path, PathBuf};

use log::{error, info, warn};

use super::probe::{FrameSize, frame_size, media_duration, stretch_ratio};
use super::ffmpeg::{Tool, Transcoder, ensure_success};
use crate::config::ProductionSettings;
use crate::constants::{
    CROP_KEEP_RATIO, EQ_BRIGHTNESS, EQ_CONTRAST, EQ_SATURATION, NARRATION_GAIN, VIDEO_CODEC,
    VIDEO_CRF, VIDEO_PRESET, WATERMARK_FONT_SIZE, WATERMARK_MARGIN, WATERMARK_SHADOW_OFFSET,
};
use crate::error::{RecapError, Result};

const VIDEO_OUT_LABEL: &str = "[outv]";
const AUDIO_OUT_LABEL: &str = "[outa]";

/// Подготовка пользовательского текста для `drawtext=text='...'`.
///
/// Кавычки, `%` и `\` удаляются (drawtext сам раскрывает `%` и `\`),
/// разделители графа фильтров экранируются, переводы строк становятся пробелами.
pub fn sanitize_watermark(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 8);
    for ch in text.trim().chars() {
        match ch {
            '\'' | '%' | '\\' => {}
            '\n' | '\r' | '\t' => escaped.push(' '),
            ':' | ',' | ';' | '[' | ']' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            c if c.is_control() => {}
            c => escaped.push(c),
        }
    }
    escaped
}

/// Масштабирование обрезанного кадра обратно к размеру исходника.
///
/// Без известного размера высота восстанавливается приблизительно: crop
/// округляет высоту вниз, и результат может оказаться на пару пикселей меньше.
fn restore_scale(frame: Option<FrameSize>) -> String {
    match frame {
        Some(size) => format!("scale={}:{}", size.width, size.height),
        None => format!("scale=iw:trunc(ih/{}/2)*2", CROP_KEEP_RATIO),
    }
}

fn drawtext_filter(text: &str) -> String {
    format!(
        "drawtext=text='{}':x=w-tw-{margin}:y={margin}:fontsize={}:fontcolor=white:\
         shadowcolor=black:shadowx={shadow}:shadowy={shadow}",
        text,
        WATERMARK_FONT_SIZE,
        margin = WATERMARK_MARGIN,
        shadow = WATERMARK_SHADOW_OFFSET,
    )
}

/// Цепочка видеофильтров в фиксированном порядке
pub fn video_filter_chain(
    ratio: f64,
    frame: Option<FrameSize>,
    watermark: Option<&str>,
) -> Vec<String> {
    let mut filters = vec![
        format!("setpts={:.6}*PTS", ratio),
        // срезаем нижнюю полосу и возвращаем исходный размер
        format!("crop=iw:ih*{}:0:0", CROP_KEEP_RATIO),
        restore_scale(frame),
        "hflip".to_string(),
        format!(
            "eq=brightness={}:contrast={}:saturation={}",
            EQ_BRIGHTNESS, EQ_CONTRAST, EQ_SATURATION
        ),
    ];

    if let Some(text) = watermark.map(sanitize_watermark).filter(|t| !t.is_empty()) {
        filters.push(drawtext_filter(&text));
    }

    filters
}

/// Полный `-filter_complex`: видео из входа 0, озвучка из входа 1.
pub fn build_filter_complex(
    ratio: f64,
    frame: Option<FrameSize>,
    watermark: Option<&str>,
) -> String {
    format!(
        "[0:v]{}{};[1:a]volume={:.1}{}",
        video_filter_chain(ratio, frame, watermark).join(","),
        VIDEO_OUT_LABEL,
        NARRATION_GAIN,
        AUDIO_OUT_LABEL
    )
}

/// Аргументы ffmpeg для финальной сборки
pub fn composition_args(
    video_path: &Path,
    audio_path: &Path,
    output_path: &Path,
    filter_complex: &str,
) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        video_path.to_string_lossy().into_owned(),
        "-i".to_string(),
        audio_path.to_string_lossy().into_owned(),
        "-filter_complex".to_string(),
        filter_complex.to_string(),
        "-map".to_string(),
        VIDEO_OUT_LABEL.to_string(),
        "-map".to_string(),
        AUDIO_OUT_LABEL.to_string(),
        "-c:v".to_string(),
        VIDEO_CODEC.to_string(),
        "-crf".to_string(),
        VIDEO_CRF.to_string(),
        "-preset".to_string(),
        VIDEO_PRESET.to_string(),
        "-shortest".to_string(),
        output_path.to_string_lossy().into_owned(),
    ]
}

/// Собирает итоговое видео с озвучкой.
///
/// При ошибке частично записанный файл удаляется: путь возвращается
/// только для полностью собранного видео.
pub async fn composite(
    transcoder: &dyn Transcoder,
    video_path: &Path,
    audio_path: &Path,
    settings: &ProductionSettings,
    output_path: &Path,
) -> Result<PathBuf> {
    let video_duration = media_duration(transcoder, video_path).await;
    let audio_duration = media_duration(transcoder, audio_path).await;
    let ratio = stretch_ratio(video_duration, audio_duration);
    let frame = frame_size(transcoder, video_path).await;
    if frame.is_none() {
        warn!(
            "Frame size of {} unknown, restoring height approximately",
            video_path.display()
        );
    }

    info!(
        "Compositing: video {:.2}s, narration {:.2}s, stretch ratio {:.4}",
        video_duration, audio_duration, ratio
    );

    let filter_complex = build_filter_complex(ratio, frame, settings.watermark.as_deref());
    let args = composition_args(video_path, audio_path, output_path, &filter_complex);

    let result = transcoder
        .run(Tool::Ffmpeg, &args)
        .await
        .and_then(|output| ensure_success(Tool::Ffmpeg, &output));

    if let Err(e) = result {
        error!("Video composition failed: {}", e);
        discard_partial_output(output_path).await;
        return Err(e);
    }

    match tokio::fs::metadata(output_path).await {
        Ok(meta) if meta.len() > 0 => Ok(output_path.to_path_buf()),
        _ => {
            discard_partial_output(output_path).await;
            Err(RecapError::VideoComposition(format!(
                "ffmpeg reported success but {} is missing or empty",
                output_path.display()
            )))
        }
    }
}

async fn discard_partial_output(output_path: &Path) {
    match tokio::fs::remove_file(output_path).await {
        Ok(()) => warn!("Removed partial output {}", output_path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial output {}: {}", output_path.display(), e),
    }
}
