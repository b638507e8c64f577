//! Параметры медиафайлов через ffprobe: длительность и размер кадра

use std::fmt;
use std::path::Path;

use log::{debug, warn};

use super::ffmpeg::{Tool, ToolOutput, Transcoder};

/// Размер кадра видеопотока в пикселях
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

async fn run_probe(
    transcoder: &dyn Transcoder,
    path: &Path,
    args: Vec<String>,
) -> Option<ToolOutput> {
    match transcoder.run(Tool::Ffprobe, &args).await {
        Ok(output) if output.success() => Some(output),
        Ok(output) => {
            warn!(
                "ffprobe failed for {} (code {:?}): {}",
                path.display(),
                output.code,
                output.stderr.trim()
            );
            None
        }
        Err(e) => {
            warn!("Failed to run ffprobe for {}: {}", path.display(), e);
            None
        }
    }
}

/// Длительность медиафайла в секундах.
///
/// Возвращает `0.0`, если длительность определить не удалось; вызывающий
/// считает её неизвестной.
pub async fn media_duration(transcoder: &dyn Transcoder, path: &Path) -> f64 {
    let args = vec![
        "-v".to_string(),
        "error".to_string(),
        "-show_entries".to_string(),
        "format=duration".to_string(),
        "-of".to_string(),
        "default=noprint_wrappers=1:nokey=1".to_string(),
        path.to_string_lossy().into_owned(),
    ];

    let Some(output) = run_probe(transcoder, path, args).await else {
        return 0.0;
    };

    match parse_duration(&output.stdout) {
        Some(duration) => {
            debug!("Duration of {}: {:.3}s", path.display(), duration);
            duration
        }
        None => {
            warn!(
                "Failed to parse duration of {}: {:?}",
                path.display(),
                output.stdout.trim()
            );
            0.0
        }
    }
}

fn parse_duration(stdout: &str) -> Option<f64> {
    stdout
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d > 0.0)
}

/// Размер кадра первого видеопотока, `None` если определить не удалось.
pub async fn frame_size(transcoder: &dyn Transcoder, path: &Path) -> Option<FrameSize> {
    let args = vec![
        "-v".to_string(),
        "error".to_string(),
        "-select_streams".to_string(),
        "v:0".to_string(),
        "-show_entries".to_string(),
        "stream=width,height".to_string(),
        "-of".to_string(),
        "csv=s=x:p=0".to_string(),
        path.to_string_lossy().into_owned(),
    ];

    let output = run_probe(transcoder, path, args).await?;
    let size = parse_frame_size(&output.stdout);
    match size {
        Some(size) => debug!("Frame size of {}: {}", path.display(), size),
        None => warn!(
            "Failed to parse frame size of {}: {:?}",
            path.display(),
            output.stdout.trim()
        ),
    }
    size
}

fn parse_frame_size(stdout: &str) -> Option<FrameSize> {
    // ffprobe может вывести лишний разделитель в конце: "1920x1080x"
    let line = stdout.lines().next()?.trim().trim_end_matches('x');
    let (width, height) = line.split_once('x')?;
    let width = width.trim().parse::<u32>().ok().filter(|w| *w > 0)?;
    let height = height.trim().parse::<u32>().ok().filter(|h| *h > 0)?;
    Some(FrameSize { width, height })
}

/// Коэффициент растяжения видео под длительность озвучки.
///
/// Неизвестная (нулевая) длительность любой из дорожек даёт нейтральный 1.0.
pub fn stretch_ratio(video_duration: f64, audio_duration: f64) -> f64 {
    if video_duration <= 0.0 || audio_duration <= 0.0 {
        return 1.0;
    }
    audio_duration / video_duration
}
