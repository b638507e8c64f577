//! Модуль для работы с FFmpeg
//!
//! Внешние утилиты вызываются только со списком аргументов, без оболочки.

use std::fmt;
use std::process::Stdio;

use async_trait::async_trait;
use log::{debug, info};
use tokio::process::Command;

use crate::error::{RecapError, Result};

/// Внешняя утилита
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Ffmpeg,
    Ffprobe,
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tool::Ffmpeg => write!(f, "ffmpeg"),
            Tool::Ffprobe => write!(f, "ffprobe"),
        }
    }
}

/// Результат запуска утилиты
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    /// Код выхода; `None`, если процесс убит сигналом
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Запуск ffmpeg/ffprobe (или тестовой подмены)
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn run(&self, tool: Tool, args: &[String]) -> Result<ToolOutput>;
}

/// Ненулевой код выхода превращается в `RecapError::Transcoder`.
pub fn ensure_success(tool: Tool, output: &ToolOutput) -> Result<()> {
    if output.success() {
        return Ok(());
    }

    // ffmpeg prints the real reason on the last lines
    let tail: Vec<&str> = output.stderr.lines().rev().take(5).collect();
    let stderr = tail.into_iter().rev().collect::<Vec<_>>().join("\n");

    Err(RecapError::Transcoder {
        program: tool.to_string(),
        code: output.code,
        stderr,
    })
}

/// Запуск настоящих процессов ffmpeg/ffprobe
#[derive(Debug, Clone)]
pub struct FfmpegCli {
    ffmpeg: String,
    ffprobe: String,
}

impl FfmpegCli {
    pub fn new(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    fn program(&self, tool: Tool) -> &str {
        match tool {
            Tool::Ffmpeg => &self.ffmpeg,
            Tool::Ffprobe => &self.ffprobe,
        }
    }

    /// Проверка наличия ffmpeg и ffprobe в PATH
    pub fn check_installed(&self) -> Result<()> {
        for tool in [Tool::Ffmpeg, Tool::Ffprobe] {
            let program = self.program(tool);
            let path = which::which(program).map_err(|e| {
                RecapError::Configuration(format!("{} not found: {}", program, e))
            })?;
            info!("Found {} at {}", tool, path.display());
        }
        Ok(())
    }
}

impl Default for FfmpegCli {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

#[async_trait]
impl Transcoder for FfmpegCli {
    async fn run(&self, tool: Tool, args: &[String]) -> Result<ToolOutput> {
        let program = self.program(tool);
        debug!("Executing {} {:?}", program, args);

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await?;

        Ok(ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
