//! Синтез речи через утилиту edge-tts

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use log::{debug, error};
use tokio::process::Command;

use super::SpeechSynthesizer;
use crate::error::{RecapError, Result};

/// Вызывает утилиту `edge-tts` по одному разу на абзац
#[derive(Debug, Clone)]
pub struct EdgeTtsCli {
    program: String,
}

impl EdgeTtsCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Аргументы командной строки edge-tts
    pub fn args(text: &str, profile: &str, rate: &str, output: &Path) -> Vec<String> {
        vec![
            "--voice".to_string(),
            profile.to_string(),
            // "--rate +30%" would be parsed as a separate flag
            format!("--rate={}", rate),
            "--text".to_string(),
            text.to_string(),
            "--write-media".to_string(),
            output.to_string_lossy().into_owned(),
        ]
    }
}

impl Default for EdgeTtsCli {
    fn default() -> Self {
        Self::new("edge-tts")
    }
}

#[async_trait]
impl SpeechSynthesizer for EdgeTtsCli {
    async fn synthesize(&self, text: &str, profile: &str, rate: &str, output: &Path) -> Result<()> {
        debug!("edge-tts {} {} -> {}", profile, rate, output.display());

        let result = Command::new(&self.program)
            .args(Self::args(text, profile, rate, output))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                RecapError::Synthesis(format!("failed to start {}: {}", self.program, e))
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            error!("edge-tts failed ({}): {}", result.status, stderr.trim());
            return Err(RecapError::Synthesis(format!(
                "{} exited with {}: {}",
                self.program,
                result.status,
                stderr.trim()
            )));
        }

        match tokio::fs::metadata(output).await {
            Ok(meta) if meta.len() > 0 => Ok(()),
            _ => Err(RecapError::Synthesis(format!(
                "{} produced no audio at {}",
                self.program,
                output.display()
            ))),
        }
    }
}
