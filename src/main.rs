use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use log::{error, info, warn};
use tokio::sync::mpsc;

use recapnova::draft::{ChatClient, DraftGenerator, RandomCredential, WhisperApiTranscriber};
use recapnova::error::RecapError;
use recapnova::job::DeliveredOutput;
use recapnova::media::FfmpegCli;
use recapnova::progress::ProductionProgress;
use recapnova::{ProductionSettings, RecapConfig, RecapProducer, Voice, logger};

/// Turn a video into a narrated Burmese recap.
#[derive(Parser, Debug)]
#[command(name = "recapnova", version)]
struct Args {
    /// Source video file
    video: PathBuf,

    /// Narrator voice: male or female
    #[arg(long, default_value = "male")]
    voice: String,

    /// Speech speed-up in percent (0-50)
    #[arg(long, default_value_t = 30)]
    speed: u32,

    /// Text drawn in the top-right corner
    #[arg(long, default_value = "MM RECAP", conflicts_with = "no_watermark")]
    watermark: String,

    /// Do not draw a watermark
    #[arg(long)]
    no_watermark: bool,

    /// Use this script instead of transcribing and rewriting the video
    #[arg(long)]
    script: Option<PathBuf>,

    /// Where to put the finished video (default: <video>_recap.mp4)
    #[arg(long)]
    out: Option<PathBuf>,

    /// Directory for job scratch files
    #[arg(long)]
    workspace: Option<PathBuf>,
}

fn default_output(video: &Path) -> PathBuf {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    video.with_file_name(format!("{}_recap.mp4", stem))
}

fn load_config(args: &Args) -> Result<RecapConfig> {
    let mut config = match RecapConfig::from_env() {
        Ok(config) => config,
        // a ready-made script needs no language model
        Err(RecapError::Configuration(reason)) if args.script.is_some() => {
            warn!("{}; continuing without language model", reason);
            RecapConfig::default()
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(workspace) = &args.workspace {
        config.workspace = workspace.clone();
    }
    Ok(config)
}

async fn load_draft(args: &Args, config: &RecapConfig, voice: Voice) -> Result<(String, String)> {
    if let Some(script_path) = &args.script {
        let script = tokio::fs::read_to_string(script_path)
            .await
            .with_context(|| format!("failed to read script {}", script_path.display()))?;
        return Ok((script, String::new()));
    }

    let transcoder = Arc::new(FfmpegCli::new(
        config.ffmpeg_path.clone(),
        config.ffprobe_path.clone(),
    ));
    let transcriber = Arc::new(WhisperApiTranscriber::new(config, transcoder)?);
    let model = Arc::new(ChatClient::new(config, Arc::new(RandomCredential))?);
    let generator = DraftGenerator::new(transcriber, model, config);

    info!("STEP 1: Script generation...");
    let (script, title) = generator.generate_draft(Some(args.video.as_path()), voice).await;
    if script.starts_with("Error") {
        bail!("{}", script);
    }
    Ok((script, title))
}

/// Перемещает готовый файл; между файловыми системами копирует.
async fn deliver(from: &Path, to: &Path) -> Result<()> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(from, to)
        .await
        .with_context(|| format!("failed to copy {} to {}", from.display(), to.display()))?;
    Ok(())
}

/// Доставляет результат и в любом случае удаляет его из рабочей директории.
async fn hand_over(output: DeliveredOutput, destination: &Path) -> Result<()> {
    let delivered = deliver(&output.path, destination).await;
    let path = output.path.clone();
    if let Err(e) = output.cleanup().await {
        warn!("Failed to remove {}: {}", path.display(), e);
    }
    delivered
}

async fn run(args: Args) -> Result<()> {
    let config = Arc::new(load_config(&args)?);

    FfmpegCli::new(config.ffmpeg_path.clone(), config.ffprobe_path.clone()).check_installed()?;
    if which::which(&config.edge_tts_path).is_err() {
        bail!("{} not found in PATH", config.edge_tts_path);
    }

    let voice = Voice::parse(&args.voice)?;
    let watermark = (!args.no_watermark).then(|| args.watermark.clone());
    let settings = ProductionSettings::new(voice, args.speed, watermark)?;

    let (script, title) = load_draft(&args, &config, voice).await?;
    if !title.is_empty() {
        println!("{}", title);
    }

    info!("STEP 2: Video rendering...");
    let (progress_tx, mut progress_rx) = mpsc::channel::<ProductionProgress>(16);
    let progress_task = tokio::spawn(async move {
        while let Some(update) = progress_rx.recv().await {
            info!("[{}] {}: {}", update.job_id, update.state.as_str(), update.message);
        }
    });

    let producer = RecapProducer::from_config(config.clone());
    let outcome = producer
        .final_production(&args.video, &script, &title, &settings, Some(progress_tx))
        .await;
    let _ = progress_task.await;

    let output = outcome
        .output
        .ok_or_else(|| anyhow!("{}", outcome.status))?;

    let destination = args.out.clone().unwrap_or_else(|| default_output(&args.video));
    hand_over(output, &destination).await?;

    println!("{}", destination.display());
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    logger::init_logger();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_next_to_source() {
        assert_eq!(
            default_output(Path::new("/videos/movie.mp4")),
            PathBuf::from("/videos/movie_recap.mp4")
        );
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "recapnova",
            "in.mp4",
            "--voice",
            "female",
            "--speed",
            "10",
            "--no-watermark",
        ])
        .unwrap();
        assert_eq!(args.voice, "female");
        assert_eq!(args.speed, 10);
        assert!(args.no_watermark);
        assert!(args.script.is_none());
    }

    #[tokio::test]
    async fn test_hand_over_moves_output() {
        let dir = tempfile::tempdir().unwrap();
        let produced = dir.path().join("final_abcd1234.mp4");
        std::fs::write(&produced, b"video").unwrap();
        let destination = dir.path().join("movie_recap.mp4");

        let output = DeliveredOutput {
            job_id: "abcd1234".to_string(),
            path: produced.clone(),
        };
        hand_over(output, &destination).await.unwrap();

        assert!(destination.exists());
        assert!(!produced.exists());
    }

    #[tokio::test]
    async fn test_failed_delivery_still_cleans_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let produced = dir.path().join("final_abcd1234.mp4");
        std::fs::write(&produced, b"video").unwrap();
        let destination = dir.path().join("missing").join("movie_recap.mp4");

        let output = DeliveredOutput {
            job_id: "abcd1234".to_string(),
            path: produced.clone(),
        };
        assert!(hand_over(output, &destination).await.is_err());

        assert!(!produced.exists());
        assert!(!destination.exists());
    }
}
