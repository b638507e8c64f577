//! Отслеживание состояния задачи производства
//!
//! Оркестратор сообщает о каждом переходе состояния через необязательный
//! канал Tokio. Отправка никогда не роняет задачу.

use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Состояние задачи после создания временной директории.
///
/// До вызова `final_production` задача находится в состоянии ожидания,
/// о нём не сообщается.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum JobState {
    ScratchCreated,
    SynthesizingSegments,
    Assembling,
    Compositing,
    Done,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScratchCreated => "scratch_created",
            Self::SynthesizingSegments => "synthesizing_segments",
            Self::Assembling => "assembling",
            Self::Compositing => "compositing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

/// Сообщение о прогрессе задачи
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductionProgress {
    pub job_id: String,
    pub state: JobState,
    pub message: String,
}

/// Отправитель прогресса одной задачи
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    job_id: String,
    tx: Option<mpsc::Sender<ProductionProgress>>,
}

impl ProgressReporter {
    pub fn new(tx: Option<mpsc::Sender<ProductionProgress>>) -> Self {
        Self {
            job_id: String::new(),
            tx,
        }
    }

    pub fn set_job_id(&mut self, job_id: &str) {
        self.job_id = job_id.to_string();
    }

    pub async fn report(&self, state: JobState, message: impl Into<String>) {
        let message = message.into();
        debug!("[job {}] {} - {}", self.job_id, state.as_str(), message);

        if let Some(tx) = &self.tx {
            let update = ProductionProgress {
                job_id: self.job_id.clone(),
                state,
                message,
            };
            // a dropped receiver just means nobody is watching
            let _ = tx.send(update).await;
        }
    }
}
