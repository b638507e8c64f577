//! Генерация аудиосегментов для абзацев сценария
//!
//! Каждый абзац озвучивается отдельно, файл сегмента получает порядковый номер
//! абзаца в имени (`p_000.mp3`, `p_001.mp3`, ...). Задачи могут завершаться в
//! любом порядке: результат собирается по индексу.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use log::{error, info};
use tokio::sync::Semaphore;

use super::SpeechSynthesizer;
use crate::error::{RecapError, Result};

/// Имя файла сегмента для абзаца с индексом `index`
pub fn segment_file_name(index: usize) -> String {
    format!("p_{:03}.mp3", index)
}

/// Озвучивает все абзацы в `scratch_dir`.
///
/// Возвращает пути сегментов в порядке абзацев. Ошибка любого абзаца
/// проваливает весь пакет.
pub async fn synthesize_segments(
    synthesizer: Arc<dyn SpeechSynthesizer>,
    paragraphs: &[String],
    profile: &str,
    rate: &str,
    scratch_dir: &Path,
    max_concurrent: usize,
) -> Result<Vec<PathBuf>> {
    if paragraphs.is_empty() {
        return Err(RecapError::Synthesis(
            "no paragraphs to synthesize".to_string(),
        ));
    }

    info!(
        "Synthesizing {} paragraphs (voice {}, rate {}, {} at a time)",
        paragraphs.len(),
        profile,
        rate,
        max_concurrent.max(1)
    );

    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut tasks = Vec::with_capacity(paragraphs.len());

    for (i, paragraph) in paragraphs.iter().enumerate() {
        let synthesizer = synthesizer.clone();
        let semaphore = semaphore.clone();
        let text = paragraph.clone();
        let profile = profile.to_string();
        let rate = rate.to_string();
        let file_path = scratch_dir.join(segment_file_name(i));

        let task = tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => return (i, Err(RecapError::Synthesis(e.to_string()))),
            };

            let result = synthesizer
                .synthesize(&text, &profile, &rate, &file_path)
                .await
                .map(|_| file_path);
            (i, result)
        });

        tasks.push(task);
    }

    let results = join_all(tasks).await;

    let mut segments: Vec<Option<PathBuf>> = vec![None; paragraphs.len()];
    let mut failed_segments = Vec::new();
    let mut first_error = None;

    for (task_index, result) in results.into_iter().enumerate() {
        match result {
            Ok((i, Ok(path))) => segments[i] = Some(path),
            Ok((i, Err(e))) => {
                error!("Failed to synthesize paragraph {}: {}", i, e);
                failed_segments.push(i);
                if first_error.is_none() {
                    first_error = Some(e.to_string());
                }
            }
            Err(join_error) => {
                error!("Synthesis task {} panicked: {}", task_index, join_error);
                failed_segments.push(task_index);
                if first_error.is_none() {
                    first_error = Some(join_error.to_string());
                }
            }
        }
    }

    if !failed_segments.is_empty() {
        failed_segments.sort_unstable();
        return Err(RecapError::Synthesis(format!(
            "failed to synthesize paragraphs {:?}: {}",
            failed_segments,
            first_error.unwrap_or_default()
        )));
    }

    info!("Synthesized {} segments", segments.len());
    Ok(segments.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Пишет текст абзаца в файл; первые абзацы "синтезируются" дольше.
    struct SlowFirstSynth {
        total: usize,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SpeechSynthesizer for SlowFirstSynth {
        async fn synthesize(
            &self,
            text: &str,
            _profile: &str,
            rate: &str,
            output: &Path,
        ) -> Result<()> {
            let index: usize = output
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.trim_start_matches("p_").parse().ok())
                .unwrap();
            tokio::time::sleep(Duration::from_millis(((self.total - index) * 20) as u64)).await;
            self.calls.lock().unwrap().push(rate.to_string());
            tokio::fs::write(output, text).await?;
            Ok(())
        }
    }

    struct FailingSynth {
        fail_on: usize,
    }

    #[async_trait]
    impl SpeechSynthesizer for FailingSynth {
        async fn synthesize(
            &self,
            text: &str,
            _profile: &str,
            _rate: &str,
            output: &Path,
        ) -> Result<()> {
            if output.ends_with(segment_file_name(self.fail_on)) {
                return Err(RecapError::Synthesis("voice service unavailable".to_string()));
            }
            tokio::fs::write(output, text).await?;
            Ok(())
        }
    }

    #[test]
    fn test_segment_file_name_is_zero_padded() {
        assert_eq!(segment_file_name(0), "p_000.mp3");
        assert_eq!(segment_file_name(42), "p_042.mp3");
        assert!(segment_file_name(9) < segment_file_name(10));
    }

    #[tokio::test]
    async fn test_order_survives_out_of_order_completion() {
        let dir = tempfile::tempdir().unwrap();
        let paragraphs: Vec<String> = vec!["p0".into(), "p1".into(), "p2".into()];
        let synth = Arc::new(SlowFirstSynth {
            total: paragraphs.len(),
            calls: Mutex::new(Vec::new()),
        });

        let segments =
            synthesize_segments(synth.clone(), &paragraphs, "voice", "+10%", dir.path(), 3)
                .await
                .unwrap();

        assert_eq!(segments.len(), 3);
        for (i, path) in segments.iter().enumerate() {
            assert_eq!(path, &dir.path().join(segment_file_name(i)));
            assert_eq!(std::fs::read_to_string(path).unwrap(), paragraphs[i]);
        }
        assert!(synth.calls.lock().unwrap().iter().all(|r| r == "+10%"));
    }

    #[tokio::test]
    async fn test_single_failure_fails_batch() {
        let dir = tempfile::tempdir().unwrap();
        let paragraphs: Vec<String> = vec!["a".into(), "b".into(), "c".into()];

        let synth = Arc::new(FailingSynth { fail_on: 1 });
        let err = synthesize_segments(synth, &paragraphs, "v", "+0%", dir.path(), 2)
            .await
            .unwrap_err();

        match err {
            RecapError::Synthesis(message) => {
                assert!(message.contains("[1]"));
                assert!(message.contains("voice service unavailable"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_paragraphs_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let synth = Arc::new(FailingSynth { fail_on: 0 });
        assert!(synthesize_segments(synth, &[], "v", "+0%", dir.path(), 1).await.is_err());
    }
}
