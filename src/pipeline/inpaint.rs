//! Inpainting orchestration.
//!
//! The neural network itself is an external capability behind [`InpaintBackend`];
//! this module owns everything around it: the neighbor-stride window schedule,
//! the exactly-once assembly of the output sequence, and the model session whose
//! lock serializes access to the single inference device.

use std::ops::Range;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::config::InpaintConfig;
use crate::error::InferenceError;
use crate::media::command;
use crate::media::types::{Frame, Mask};

use super::stager::sorted_frame_paths;

/// The external temporal inpainting capability.
///
/// Implementations receive a window of temporally adjacent frames with their
/// masks and return the same number of frames in the same order.
pub trait InpaintBackend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Load model state. Called once per process, before the first inference.
    fn load(&self) -> Result<(), InferenceError>;

    /// Inpaint one window of frames. `exchange` is a scratch directory inside
    /// the calling video's workspace.
    fn infer(
        &self,
        frames: &[Frame],
        masks: &[Mask],
        exchange: &Path,
    ) -> Result<Vec<Frame>, InferenceError>;
}

/// Lazily-loaded model session shared across all videos in a batch.
///
/// Lifecycle: loaded on first use, reused for every subsequent video, released
/// when the process exits. The mutex models the singleton inference device: at
/// most one inpainting invocation is in flight process-wide, even if callers
/// parallelize the other pipeline stages.
pub struct InpaintSession {
    backend: Box<dyn InpaintBackend>,
    loaded: OnceCell<()>,
    device: tokio::sync::Mutex<()>,
}

impl InpaintSession {
    pub fn new(backend: Box<dyn InpaintBackend>) -> Self {
        Self {
            backend,
            loaded: OnceCell::new(),
            device: tokio::sync::Mutex::new(()),
        }
    }

    /// Build the session around the configured external runner
    pub fn from_config(config: &InpaintConfig, index_pad: usize) -> Self {
        Self::new(Box::new(ProcessBackend::new(
            config.runner.clone(),
            config.checkpoint.clone(),
            index_pad,
        )))
    }

    /// Inpaint a full frame sequence.
    ///
    /// Drives the backend over neighbor-stride windows and assembles an output
    /// sequence of exactly the input length, with a deterministic
    /// output-to-index mapping (first window to produce a frame wins).
    /// Capability failures propagate; they are treated as non-transient and
    /// never retried.
    pub async fn inpaint(
        &self,
        frames: &[Frame],
        masks: &[Mask],
        neighbor_stride: usize,
        exchange: &Path,
    ) -> Result<Vec<Frame>, InferenceError> {
        if frames.len() != masks.len() {
            return Err(InferenceError::ExchangeFailed {
                reason: format!(
                    "{} masks for {} frames",
                    masks.len(),
                    frames.len()
                ),
            });
        }

        let _device = self.device.lock().await;

        self.loaded.get_or_try_init(|| {
            info!("loading inpainting model ({})", self.backend.name());
            self.backend.load()
        })?;

        let total = frames.len();
        let mut output: Vec<Option<Frame>> = vec![None; total];

        for window in neighbor_windows(total, neighbor_stride) {
            debug!("inpainting window {}..{}", window.start, window.end);

            let result = self.backend.infer(
                &frames[window.clone()],
                &masks[window.clone()],
                exchange,
            )?;

            if result.len() != window.len() {
                return Err(InferenceError::FrameCountMismatch {
                    expected: window.len(),
                    actual: result.len(),
                });
            }

            for (offset, frame) in result.into_iter().enumerate() {
                let index = window.start + offset;
                if output[index].is_none() {
                    output[index] = Some(frame);
                }
            }
        }

        output
            .into_iter()
            .enumerate()
            .map(|(index, frame)| {
                frame.ok_or(InferenceError::FrameCountMismatch {
                    expected: total,
                    actual: index,
                })
            })
            .collect()
    }
}

/// Neighbor-stride window schedule.
///
/// Window centers sit at `0, stride, 2*stride, ...`; each window spans
/// `[center - stride, center + stride]` clamped to the sequence, so consecutive
/// windows overlap and every index is covered at least once.
fn neighbor_windows(len: usize, stride: usize) -> Vec<Range<usize>> {
    if len == 0 {
        return Vec::new();
    }
    (0..len)
        .step_by(stride.max(1))
        .map(|center| center.saturating_sub(stride)..(center + stride + 1).min(len))
        .collect()
}

/// Backend invoking an external inference runner process.
///
/// Each window is exchanged as zero-padded PNG files under the per-video
/// workspace: frames and masks written out, the runner invoked with the
/// checkpoint, and the inpainted frames read back in filename order.
pub struct ProcessBackend {
    runner: String,
    checkpoint: PathBuf,
    index_pad: usize,
}

impl ProcessBackend {
    pub fn new(runner: String, checkpoint: PathBuf, index_pad: usize) -> Self {
        Self {
            runner,
            checkpoint,
            index_pad,
        }
    }

    fn write_window(
        &self,
        frames: &[Frame],
        masks: &[Mask],
        exchange: &Path,
    ) -> Result<(PathBuf, PathBuf, PathBuf), InferenceError> {
        let frames_dir = fresh_dir(exchange, "input")?;
        let masks_dir = fresh_dir(exchange, "mask")?;
        let output_dir = fresh_dir(exchange, "output")?;

        for (index, (frame, mask)) in frames.iter().zip(masks).enumerate() {
            let name = format!("{:0pad$}.png", index, pad = self.index_pad);
            frame
                .save_png(frames_dir.join(&name))
                .map_err(|error| InferenceError::ExchangeFailed {
                    reason: error.to_string(),
                })?;
            mask.save_png(masks_dir.join(&name))
                .map_err(|error| InferenceError::ExchangeFailed {
                    reason: error.to_string(),
                })?;
        }

        Ok((frames_dir, masks_dir, output_dir))
    }
}

impl InpaintBackend for ProcessBackend {
    fn name(&self) -> &'static str {
        "external-runner"
    }

    fn load(&self) -> Result<(), InferenceError> {
        if !self.checkpoint.is_file() {
            return Err(InferenceError::CheckpointMissing {
                path: self.checkpoint.display().to_string(),
            });
        }
        Ok(())
    }

    fn infer(
        &self,
        frames: &[Frame],
        masks: &[Mask],
        exchange: &Path,
    ) -> Result<Vec<Frame>, InferenceError> {
        let (frames_dir, masks_dir, output_dir) = self.write_window(frames, masks, exchange)?;

        let output = command::run(
            &self.runner,
            &[
                "--checkpoint",
                &self.checkpoint.display().to_string(),
                "--frames",
                &frames_dir.display().to_string(),
                "--masks",
                &masks_dir.display().to_string(),
                "--output",
                &output_dir.display().to_string(),
            ],
        )
        .map_err(|error| InferenceError::RunnerUnavailable {
            runner: self.runner.clone(),
            reason: error.to_string(),
        })?;

        if !output.success() {
            return Err(InferenceError::RunnerFailed {
                runner: self.runner.clone(),
                status: output.status,
                stderr: output.stderr_tail(),
            });
        }

        let paths =
            sorted_frame_paths(&output_dir).map_err(|error| InferenceError::ExchangeFailed {
                reason: error.to_string(),
            })?;

        if paths.len() != frames.len() {
            return Err(InferenceError::FrameCountMismatch {
                expected: frames.len(),
                actual: paths.len(),
            });
        }

        paths
            .iter()
            .map(|path| {
                Frame::load(path).map_err(|error| InferenceError::ExchangeFailed {
                    reason: format!("{}: {}", path.display(), error),
                })
            })
            .collect()
    }
}

/// Recreate an exchange subdirectory, dropping any previous window's files
fn fresh_dir(exchange: &Path, name: &str) -> Result<PathBuf, InferenceError> {
    let dir = exchange.join(name);
    if dir.exists() {
        std::fs::remove_dir_all(&dir).map_err(|error| InferenceError::ExchangeFailed {
            reason: error.to_string(),
        })?;
    }
    std::fs::create_dir_all(&dir).map_err(|error| InferenceError::ExchangeFailed {
        reason: error.to_string(),
    })?;
    Ok(dir)
}
