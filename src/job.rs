//! Задача производства: идентификатор, временная директория, выходной файл.
//!
//! Все пути задачи содержат её идентификатор, поэтому параллельные задачи
//! не пересекаются по именам файлов.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use log::{debug, info, warn};
use uuid::Uuid;

use crate::error::{RecapError, Result};

const JOB_ID_LEN: usize = 8;
const MAX_ID_ATTEMPTS: usize = 16;

pub const SCRATCH_PREFIX: &str = "temp_";
pub const OUTPUT_PREFIX: &str = "final_";
const OUTPUT_EXTENSION: &str = ".mp4";

/// Одна задача производства
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: String,
    pub scratch_dir: PathBuf,
    pub output_path: PathBuf,
}

impl Job {
    fn with_id(workspace: &Path, id: String) -> Self {
        Self {
            scratch_dir: workspace.join(format!("{}{}", SCRATCH_PREFIX, id)),
            output_path: workspace.join(format!(
                "{}{}{}",
                OUTPUT_PREFIX, id, OUTPUT_EXTENSION
            )),
            id,
        }
    }

    /// Короткий случайный идентификатор (hex)
    pub fn new_id() -> String {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(JOB_ID_LEN);
        id
    }

    /// Создает задачу и её временную директорию.
    ///
    /// Директория создаётся эксклюзивно: занятый другой задачей
    /// идентификатор повторно не используется.
    pub async fn create(workspace: &Path) -> Result<(Self, ScratchGuard)> {
        tokio::fs::create_dir_all(workspace).await?;

        for _ in 0..MAX_ID_ATTEMPTS {
            let job = Self::with_id(workspace, Self::new_id());
            if tokio::fs::try_exists(&job.output_path).await.unwrap_or(true) {
                continue;
            }
            match tokio::fs::create_dir(&job.scratch_dir).await {
                Ok(()) => {
                    info!("Created job {} in {}", job.id, job.scratch_dir.display());
                    let guard = ScratchGuard::new(job.scratch_dir.clone());
                    return Ok((job, guard));
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(RecapError::Other(
            "could not allocate a unique job id".to_string(),
        ))
    }
}

/// Удаляет временную директорию задачи при выходе из области видимости.
#[derive(Debug)]
pub struct ScratchGuard {
    path: PathBuf,
    keep: bool,
}

impl ScratchGuard {
    pub fn new(path: PathBuf) -> Self {
        Self { path, keep: false }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Оставить директорию на диске (для отладки)
    pub fn keep(mut self) -> PathBuf {
        self.keep = true;
        self.path.clone()
    }

    /// Асинхронно удаляет директорию, не блокируя рабочий поток рантайма.
    pub async fn cleanup(mut self) {
        self.keep = true;
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => debug!("Removed scratch directory {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove scratch directory {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

impl Drop for ScratchGuard {
    // Запасной путь (паника, отмена задачи): обычно вызывается `cleanup`.
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!("Removed scratch directory {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove scratch directory {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

/// Результат успешной задачи. Вызывающий удаляет файл после доставки.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredOutput {
    pub job_id: String,
    pub path: PathBuf,
}

impl DeliveredOutput {
    /// Удаляет готовое видео после передачи заказчику
    pub async fn cleanup(self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn is_job_id(id: &str) -> bool {
    id.len() == JOB_ID_LEN && id.chars().all(|c| c.is_ascii_hexdigit())
}

/// Имена, которые создаёт задача: `temp_<id>` и `final_<id>.mp4`,
/// где `<id>` состоит из 8 hex-символов.
pub fn is_job_artifact(name: &str) -> bool {
    if let Some(id) = name.strip_prefix(SCRATCH_PREFIX) {
        return is_job_id(id);
    }
    name.strip_prefix(OUTPUT_PREFIX)
        .and_then(|rest| rest.strip_suffix(OUTPUT_EXTENSION))
        .is_some_and(is_job_id)
}

/// Удаляет остатки прошлых задач из рабочей директории.
///
/// Удаляются только записи старше `stale_after`, артефакты работающих
/// задач не трогаются. Возвращает число удалённых записей.
pub async fn sweep_stale_artifacts(workspace: &Path, stale_after: Duration) -> usize {
    let mut entries = match tokio::fs::read_dir(workspace).await {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Nothing to sweep in {}: {}", workspace.display(), e);
            return 0;
        }
    };

    let now = SystemTime::now();
    let mut removed = 0;

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read {}: {}", workspace.display(), e);
                break;
            }
        };

        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_job_artifact(&name) {
            continue;
        }

        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Skipping {}: {}", name, e);
                continue;
            }
        };

        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age < stale_after {
            continue;
        }

        let path = entry.path();
        let result = if metadata.is_dir() {
            tokio::fs::remove_dir_all(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        };

        match result {
            Ok(()) => {
                debug!("Swept stale artifact {}", path.display());
                removed += 1;
            }
            Err(e) => warn!("Failed to remove stale artifact {}: {}", path.display(), e),
        }
    }

    if removed > 0 {
        info!("Swept {} stale artifacts from {}", removed, workspace.display());
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_paths_embed_id() {
        let job = Job::with_id(Path::new("/work"), "deadbeef".to_string());
        assert_eq!(job.scratch_dir, PathBuf::from("/work/temp_deadbeef"));
        assert_eq!(job.output_path, PathBuf::from("/work/final_deadbeef.mp4"));
    }

    #[test]
    fn test_new_id_is_short_hex() {
        let id = Job::new_id();
        assert_eq!(id.len(), JOB_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(Job::new_id(), Job::new_id());
    }

    #[test]
    fn test_artifact_patterns() {
        assert!(is_job_artifact("final_1234abcd.mp4"));
        assert!(is_job_artifact("temp_1234abcd"));
        assert!(!is_job_artifact("temp_projects"));
        assert!(!is_job_artifact("temp_1234abcd5"));
        assert!(!is_job_artifact("final_cut.mp4"));
        assert!(!is_job_artifact("final_1234abcd.mov"));
        assert!(!is_job_artifact("telegram_42_1234abcd.mp4"));
        assert!(!is_job_artifact("list.txt"));
        assert!(!is_job_artifact("movie.mp4"));
    }

    #[tokio::test]
    async fn test_create_and_guard_cleanup() {
        let workspace = tempfile::tempdir().unwrap();
        let (job, guard) = Job::create(workspace.path()).await.unwrap();
        assert!(job.scratch_dir.is_dir());
        assert_eq!(guard.path(), job.scratch_dir.as_path());

        std::fs::write(job.scratch_dir.join("p_000.mp3"), b"x").unwrap();
        guard.cleanup().await;
        assert!(!job.scratch_dir.exists());
    }

    #[tokio::test]
    async fn test_dropped_guard_still_removes_scratch() {
        let workspace = tempfile::tempdir().unwrap();
        let (job, guard) = Job::create(workspace.path()).await.unwrap();
        drop(guard);
        assert!(!job.scratch_dir.exists());
    }

    #[tokio::test]
    async fn test_guard_keep() {
        let workspace = tempfile::tempdir().unwrap();
        let (job, guard) = Job::create(workspace.path()).await.unwrap();
        let kept = guard.keep();
        assert_eq!(kept, job.scratch_dir);
        assert!(job.scratch_dir.is_dir());
    }

    #[tokio::test]
    async fn test_concurrent_jobs_get_disjoint_paths() {
        let workspace = tempfile::tempdir().unwrap();
        let (a, _ga) = Job::create(workspace.path()).await.unwrap();
        let (b, _gb) = Job::create(workspace.path()).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_ne!(a.scratch_dir, b.scratch_dir);
        assert_ne!(a.output_path, b.output_path);
    }

    #[tokio::test]
    async fn test_sweep_removes_only_matching_entries() {
        let workspace = tempfile::tempdir().unwrap();
        let root = workspace.path();
        std::fs::create_dir(root.join("temp_aaaa1111")).unwrap();
        std::fs::write(root.join("temp_aaaa1111/p_000.mp3"), b"x").unwrap();
        std::fs::write(root.join("final_aaaa1111.mp4"), b"x").unwrap();
        std::fs::write(root.join("source.mp4"), b"x").unwrap();

        let removed = sweep_stale_artifacts(root, Duration::ZERO).await;
        assert_eq!(removed, 2);
        assert!(!root.join("temp_aaaa1111").exists());
        assert!(!root.join("final_aaaa1111.mp4").exists());
        assert!(root.join("source.mp4").exists());
    }

    #[tokio::test]
    async fn test_sweep_spares_user_files() {
        let workspace = tempfile::tempdir().unwrap();
        let root = workspace.path();
        std::fs::write(root.join("list.txt"), b"groceries").unwrap();
        std::fs::create_dir(root.join("temp_projects")).unwrap();
        std::fs::write(root.join("temp_projects/notes.md"), b"x").unwrap();
        std::fs::write(root.join("final_cut.mp4"), b"x").unwrap();
        std::fs::write(root.join("telegram_video.mp4"), b"x").unwrap();

        let removed = sweep_stale_artifacts(root, Duration::ZERO).await;
        assert_eq!(removed, 0);
        assert!(root.join("list.txt").exists());
        assert!(root.join("temp_projects/notes.md").exists());
        assert!(root.join("final_cut.mp4").exists());
        assert!(root.join("telegram_video.mp4").exists());
    }

    #[tokio::test]
    async fn test_sweep_spares_fresh_artifacts() {
        let workspace = tempfile::tempdir().unwrap();
        std::fs::create_dir(workspace.path().join("temp_bbbb2222")).unwrap();

        let removed = sweep_stale_artifacts(workspace.path(), Duration::from_secs(3600)).await;
        assert_eq!(removed, 0);
        assert!(workspace.path().join("temp_bbbb2222").exists());
    }

    #[tokio::test]
    async fn test_delivered_output_cleanup() {
        let workspace = tempfile::tempdir().unwrap();
        let path = workspace.path().join("final_cccc3333.mp4");
        std::fs::write(&path, b"video").unwrap();

        let output = DeliveredOutput {
            job_id: "cccc3333".to_string(),
            path: path.clone(),
        };
        output.clone().cleanup().await.unwrap();
        assert!(!path.exists());
        // second cleanup is a no-op
        output.cleanup().await.unwrap();
    }
}
