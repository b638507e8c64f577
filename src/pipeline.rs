//! Оркестратор производства recap-видео
//!
//! Idle -> ScratchCreated -> SynthesizingSegments -> Assembling -> Compositing -> Done | Failed
//!
//! Этапы выполняются строго последовательно, каждый ждёт полного результата
//! предыдущего. Ошибка любого этапа превращается в `(None, "Error: ...")`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::{error, info};
use tokio::sync::mpsc;

use crate::config::{ProductionSettings, RecapConfig};
use crate::error::{RecapError, Result, error_status};
use crate::job::{DeliveredOutput, Job, sweep_stale_artifacts};
use crate::media::{FfmpegCli, Transcoder, assemble_segments, composite};
use crate::progress::{JobState, ProductionProgress, ProgressReporter};
use crate::text::chunk_script;
use crate::tts::{EdgeTtsCli, SpeechSynthesizer, synthesize_segments};

/// Статус успешной задачи
pub const SUCCESS_STATUS: &str = "Success";

/// Итог задачи: файл (только при успехе) и строка статуса
#[derive(Debug, Clone, PartialEq)]
pub struct ProductionOutcome {
    pub output: Option<DeliveredOutput>,
    pub status: String,
}

impl ProductionOutcome {
    fn success(output: DeliveredOutput) -> Self {
        Self {
            output: Some(output),
            status: SUCCESS_STATUS.to_string(),
        }
    }

    fn failure(error: &RecapError) -> Self {
        Self {
            output: None,
            status: error_status(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.output.is_some() && self.status == SUCCESS_STATUS
    }
}

/// Производит видео из исходника и готового сценария.
pub struct RecapProducer {
    config: Arc<RecapConfig>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    transcoder: Arc<dyn Transcoder>,
}

impl RecapProducer {
    pub fn new(
        config: Arc<RecapConfig>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        Self {
            config,
            synthesizer,
            transcoder,
        }
    }

    /// Производитель на основе утилит edge-tts и ffmpeg
    pub fn from_config(config: Arc<RecapConfig>) -> Self {
        let synthesizer = Arc::new(EdgeTtsCli::new(config.edge_tts_path.clone()));
        let transcoder = Arc::new(FfmpegCli::new(
            config.ffmpeg_path.clone(),
            config.ffprobe_path.clone(),
        ));
        Self::new(config, synthesizer, transcoder)
    }

    /// Основной метод производства.
    ///
    /// Ошибку не возвращает: при сбое `output: None` и статус `"Error: ..."`.
    /// Временная директория удаляется в любом случае; выходной файл
    /// принадлежит вызывающему, который удаляет его после доставки через
    /// `DeliveredOutput::cleanup`.
    pub async fn final_production(
        &self,
        video_path: &Path,
        script: &str,
        title: &str,
        settings: &ProductionSettings,
        progress_tx: Option<mpsc::Sender<ProductionProgress>>,
    ) -> ProductionOutcome {
        let mut progress = ProgressReporter::new(progress_tx);

        if script.trim().is_empty() {
            return ProductionOutcome {
                output: None,
                status: "Error: No Script".to_string(),
            };
        }
        if !tokio::fs::metadata(video_path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
        {
            return ProductionOutcome {
                output: None,
                status: "Error: No Video".to_string(),
            };
        }

        sweep_stale_artifacts(
            &self.config.workspace,
            Duration::from_secs(self.config.stale_after_secs),
        )
        .await;

        let (job, scratch) = match Job::create(&self.config.workspace).await {
            Ok(created) => created,
            Err(e) => {
                error!("Production error: {}", e);
                progress.report(JobState::Failed, e.to_string()).await;
                return ProductionOutcome::failure(&e);
            }
        };
        progress.set_job_id(&job.id);
        progress
            .report(JobState::ScratchCreated, scratch.path().display().to_string())
            .await;

        info!(
            "Job {}: producing '{}' from {} (voice {}, speed {}%)",
            job.id,
            title,
            video_path.display(),
            settings.voice,
            settings.speed
        );

        // директория живёт до конца задачи и удаляется при любом исходе
        let result = self
            .run_job(&job, video_path, script, settings, &progress)
            .await;
        let outcome = match result {
            Ok(path) => {
                info!("Job {} finished: {}", job.id, path.display());
                progress.report(JobState::Done, path.display().to_string()).await;
                ProductionOutcome::success(DeliveredOutput {
                    job_id: job.id.clone(),
                    path,
                })
            }
            Err(e) => {
                error!("Production error (job {}): {}", job.id, e);
                progress.report(JobState::Failed, e.to_string()).await;
                ProductionOutcome::failure(&e)
            }
        };
        scratch.cleanup().await;

        outcome
    }

    async fn run_job(
        &self,
        job: &Job,
        video_path: &Path,
        script: &str,
        settings: &ProductionSettings,
        progress: &ProgressReporter,
    ) -> Result<PathBuf> {
        let paragraphs = chunk_script(script);
        if paragraphs.is_empty() {
            return Err(RecapError::InvalidInput(
                "script has no speakable sentences".to_string(),
            ));
        }

        progress
            .report(
                JobState::SynthesizingSegments,
                format!("{} paragraphs", paragraphs.len()),
            )
            .await;
        let segments = synthesize_segments(
            self.synthesizer.clone(),
            &paragraphs,
            settings.voice.profile(),
            &settings.rate(),
            &job.scratch_dir,
            self.config.max_concurrent_synthesis,
        )
        .await?;

        progress
            .report(JobState::Assembling, format!("{} segments", segments.len()))
            .await;
        let narration =
            assemble_segments(self.transcoder.as_ref(), &segments, &job.scratch_dir).await?;

        progress
            .report(JobState::Compositing, job.output_path.display().to_string())
            .await;
        composite(
            self.transcoder.as_ref(),
            video_path,
            &narration,
            settings,
            &job.output_path,
        )
        .await
    }
}
