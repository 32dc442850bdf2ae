//! Batch driver.
//!
//! Iterates a directory of videos (or a single file) through the per-video
//! pipeline. Directory mode records every outcome and never aborts on one
//! file's failure; single-file mode propagates the error to the caller.

use std::future::Future;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::{
    error::Result,
    pipeline::{CleanerPipeline, PipelineRun},
};

/// Input container extensions handled by the batch driver
pub const RECOGNIZED_EXTENSIONS: [&str; 4] = ["mp4", "avi", "mkv", "mov"];

/// Prefix given to outputs in directory mode; also used to skip outputs of an
/// earlier run when re-scanning the same directory
const OUTPUT_PREFIX: &str = "output_";

/// One unit of batch work
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Result of one video in a batch
#[derive(Debug)]
pub struct VideoOutcome {
    pub input: PathBuf,
    pub output: PathBuf,
    pub status: OutcomeStatus,
}

#[derive(Debug)]
pub enum OutcomeStatus {
    Success(PipelineRun),
    Failed { detail: String },
}

impl VideoOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Success(_))
    }
}

/// Accumulated outcomes of a directory run
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<VideoOutcome>,
}

impl BatchReport {
    pub fn successes(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failures(&self) -> usize {
        self.outcomes.len() - self.successes()
    }
}

/// Drives the per-video pipeline over a file or directory input
pub struct BatchDriver {
    remove_watermark: bool,
}

impl BatchDriver {
    pub fn new(remove_watermark: bool) -> Self {
        Self { remove_watermark }
    }

    /// Whether a path carries one of the recognized container extensions
    pub fn is_recognized(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                RECOGNIZED_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
            .unwrap_or(false)
    }

    /// Directory-mode output path: `output_<basename>` beside the input
    pub fn directory_output_path(input: &Path) -> PathBuf {
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "video".to_string());
        input.with_file_name(format!("{}{}", OUTPUT_PREFIX, name))
    }

    /// Single-file output path: `<stem>_output.mp4` beside the input
    pub fn single_output_path(input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "video".to_string());
        input.with_file_name(format!("{}_output.mp4", stem))
    }

    /// Enumerate the directory into jobs, deterministic name order.
    ///
    /// Hidden files, unrecognized extensions, and outputs of a previous run are
    /// skipped. An empty result is a warning, not an error.
    pub fn plan_directory(&self, dir: &Path) -> Result<Vec<BatchJob>> {
        let mut inputs: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                !name.starts_with('.') && !name.starts_with(OUTPUT_PREFIX)
            })
            .filter(|path| Self::is_recognized(path))
            .collect();

        inputs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        if inputs.is_empty() {
            warn!("No video files found in directory: {:?}", dir);
        }

        Ok(inputs
            .into_iter()
            .map(|input| BatchJob {
                output: Self::directory_output_path(&input),
                input,
            })
            .collect())
    }

    /// Run a directory batch, isolating per-file failures
    pub async fn run_directory(
        &self,
        pipeline: &CleanerPipeline,
        dir: &Path,
    ) -> Result<BatchReport> {
        let jobs = self.plan_directory(dir)?;
        info!("Found {} videos for processing in {:?}", jobs.len(), dir);

        let remove_watermark = self.remove_watermark;
        let report = self
            .run_jobs_with(jobs, |job| async move {
                pipeline
                    .process(&job.input, &job.output, remove_watermark)
                    .await
            })
            .await;

        info!(
            "Batch complete: {} succeeded, {} failed",
            report.successes(),
            report.failures()
        );
        Ok(report)
    }

    /// Run a single file, surfacing its failure to the caller
    pub async fn run_single(
        &self,
        pipeline: &CleanerPipeline,
        input: &Path,
    ) -> Result<PipelineRun> {
        let output = Self::single_output_path(input);
        pipeline
            .process(input, &output, self.remove_watermark)
            .await
    }

    /// Run jobs through an arbitrary processor, recording outcomes.
    ///
    /// A failing job is converted into a recorded failure; the remaining jobs
    /// always run.
    pub async fn run_jobs_with<F, Fut>(&self, jobs: Vec<BatchJob>, mut process: F) -> BatchReport
    where
        F: FnMut(BatchJob) -> Fut,
        Fut: Future<Output = Result<PipelineRun>>,
    {
        let mut report = BatchReport::default();

        for job in jobs {
            let (input, output) = (job.input.clone(), job.output.clone());

            let status = match process(job).await {
                Ok(run) => {
                    if let Some(notice) = &run.notice {
                        info!("{:?}: {}", input, notice);
                    }
                    OutcomeStatus::Success(run)
                }
                Err(err) => {
                    error!("Failed to process {:?}: {}", input, err.user_message());
                    OutcomeStatus::Failed {
                        detail: err.to_string(),
                    }
                }
            };

            report.outcomes.push(VideoOutcome {
                input,
                output,
                status,
            });
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CleanerError;
    use tempfile::tempdir;

    fn dummy_run() -> PipelineRun {
        PipelineRun {
            frame_count: 10,
            inpainted: true,
            notice: None,
        }
    }

    #[test]
    fn recognizes_container_extensions() {
        assert!(BatchDriver::is_recognized(Path::new("a.mp4")));
        assert!(BatchDriver::is_recognized(Path::new("a.MKV")));
        assert!(BatchDriver::is_recognized(Path::new("a.avi")));
        assert!(BatchDriver::is_recognized(Path::new("a.mov")));
        assert!(!BatchDriver::is_recognized(Path::new("a.txt")));
        assert!(!BatchDriver::is_recognized(Path::new("noext")));
    }

    #[test]
    fn output_naming() {
        assert_eq!(
            BatchDriver::directory_output_path(Path::new("/videos/clip.mp4")),
            Path::new("/videos/output_clip.mp4")
        );
        assert_eq!(
            BatchDriver::single_output_path(Path::new("/videos/clip.mkv")),
            Path::new("/videos/clip_output.mp4")
        );
    }

    #[test]
    fn plan_skips_non_videos_hidden_and_prior_outputs() {
        let dir = tempdir().unwrap();
        for name in [
            "b.avi",
            "a.mp4",
            "notes.txt",
            ".hidden.mp4",
            "output_a.mp4",
        ] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let driver = BatchDriver::new(true);
        let jobs = driver.plan_directory(dir.path()).unwrap();

        let names: Vec<String> = jobs
            .iter()
            .map(|j| j.input.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.mp4", "b.avi"]);
        assert_eq!(
            jobs[0].output.file_name().unwrap().to_string_lossy(),
            "output_a.mp4"
        );
    }

    #[test]
    fn empty_directory_plans_no_jobs() {
        let dir = tempdir().unwrap();
        let driver = BatchDriver::new(true);
        assert!(driver.plan_directory(dir.path()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_the_batch() {
        let driver = BatchDriver::new(true);
        let jobs: Vec<BatchJob> = ["one.mp4", "two.mp4", "three.mp4"]
            .iter()
            .map(|name| BatchJob {
                input: PathBuf::from(name),
                output: PathBuf::from(format!("output_{}", name)),
            })
            .collect();

        let report = driver
            .run_jobs_with(jobs, |job| async move {
                if job.input == Path::new("two.mp4") {
                    Err(CleanerError::generic("decode blew up"))
                } else {
                    Ok(dummy_run())
                }
            })
            .await;

        assert_eq!(report.outcomes.len(), 3);
        assert!(report.outcomes[0].is_success());
        assert!(!report.outcomes[1].is_success());
        assert!(report.outcomes[2].is_success());
        assert_eq!(report.successes(), 2);
        assert_eq!(report.failures(), 1);
    }
}
