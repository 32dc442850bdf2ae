//! # Pipeline Module
//!
//! Per-video orchestration: probe → stage → mask → inpaint → reassemble →
//! cleanup, strictly in sequence. Each stage's complete output is the next
//! stage's complete input.

pub mod inpaint;
pub mod mask;
pub mod reassemble;
pub mod stager;
pub mod staging;

pub use inpaint::{InpaintBackend, InpaintSession, ProcessBackend};
pub use reassemble::Reassembler;
pub use stager::{DiskStager, FrameStager, InMemoryStager};
pub use staging::{StagingWorkspace, WorkspaceState};

use std::path::Path;
use std::sync::Arc;

use tokio::task;
use tracing::{info, warn};

use crate::{
    config::Config,
    error::{CleanerError, Result},
    media::probe,
    media::types::{Frame, StreamInfo},
};

/// Summary of one successfully processed video
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// Frames carried through to the output
    pub frame_count: usize,

    /// Whether the inpainting capability was actually invoked
    pub inpainted: bool,

    /// Recorded notice when the pipeline short-circuited to passthrough
    pub notice: Option<String>,
}

/// The per-video watermark removal pipeline
///
/// Owns the configuration and a shared handle to the inpainting session; one
/// instance processes any number of videos, one at a time.
pub struct CleanerPipeline {
    config: Config,
    session: Arc<InpaintSession>,
}

impl CleanerPipeline {
    pub fn new(config: Config, session: Arc<InpaintSession>) -> Self {
        Self { config, session }
    }

    /// Process a single video from `input` to `output`.
    ///
    /// The staging workspace is removed on every exit path once created; a
    /// failure in any stage aborts this video only.
    pub async fn process(
        &self,
        input: &Path,
        output: &Path,
        remove_watermark: bool,
    ) -> Result<PipelineRun> {
        info!("🎬 Processing {:?}", input);

        // Step 1: probe stream metadata
        let stream = probe::probe(input)?;
        info!(
            "   Stream: {}x{} @ {:.3}fps, audio={}, {}",
            stream.width,
            stream.height,
            stream.fps,
            stream.has_audio,
            stream.orientation.as_str()
        );

        // Step 2: per-video workspace; its Drop guard covers every early return
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "video".to_string());
        let mut workspace =
            StagingWorkspace::create(&self.config.staging.resolve_workspace_root(), &stem)?;

        // Step 3: stage frames
        let mut stager = stager::for_config(&self.config.staging);
        info!("   Staging frames ({} strategy)...", stager.strategy());

        let frames = {
            let frames_dir = workspace.frames_dir()?;
            let input = input.to_path_buf();
            let stream = stream.clone();
            let (returned, frames) = task::spawn_blocking(move || {
                let frames = stager.stage(&input, &stream, &frames_dir)?;
                Ok::<_, crate::error::DecodeError>((stager, frames))
            })
            .await
            .map_err(|error| CleanerError::Generic(format!("staging task failed: {}", error)))??;
            stager = returned;
            frames
        };
        workspace.mark_populated();
        info!("   {} frames staged", frames.len());

        // Step 4: masks + inpainting, or passthrough
        let (frames, inpainted, notice) = self
            .restore(frames, &stream, &workspace, remove_watermark)
            .await?;
        workspace.mark_consumed();

        // Step 5: reassemble with the original audio
        info!("   Reassembling {:?}...", output);
        let frame_count = frames.len();
        {
            let reassembler = Reassembler::new(self.config.encode.clone());
            let stream = stream.clone();
            let audio = stream.has_audio.then(|| input.to_path_buf());
            let output = output.to_path_buf();
            task::spawn_blocking(move || {
                reassembler.write_video(&frames, &stream, audio.as_deref(), &output)
            })
            .await
            .map_err(|error| CleanerError::Generic(format!("encode task failed: {}", error)))??;
        }

        // Step 6: release staged storage and the workspace
        if let Err(error) = stager.unstage() {
            warn!("   unstage failed (workspace cleanup will cover it): {}", error);
        }
        workspace.cleanup()?;

        info!("✅ Done: {:?} ({} frames)", output, frame_count);
        Ok(PipelineRun {
            frame_count,
            inpainted,
            notice,
        })
    }

    /// Mask and inpaint the staged frames, or pass them through untouched when
    /// removal is disabled or no regions exist for the stream's orientation.
    ///
    /// Returns the output frames, whether inference ran, and the recorded
    /// notice for a passthrough.
    async fn restore(
        &self,
        frames: Vec<Frame>,
        stream: &StreamInfo,
        workspace: &StagingWorkspace,
        remove_watermark: bool,
    ) -> Result<(Vec<Frame>, bool, Option<String>)> {
        if !remove_watermark {
            info!("   Watermark removal disabled, passing frames through");
            return Ok((
                frames,
                false,
                Some("watermark removal disabled".to_string()),
            ));
        }

        let regions = self.config.watermark.regions_for(stream.orientation);
        if regions.is_empty() {
            warn!(
                "   No watermark regions configured for {} orientation, passing frames through",
                stream.orientation.as_str()
            );
            return Ok((
                frames,
                false,
                Some(format!(
                    "no watermark regions for {} orientation",
                    stream.orientation.as_str()
                )),
            ));
        }

        info!(
            "   Inpainting {} regions (stride {})...",
            regions.len(),
            self.config.inpaint.neighbor_stride
        );
        let masks = mask::build_masks(
            stream.width,
            stream.height,
            regions,
            self.config.watermark.mask_expand,
            frames.len(),
        );
        let exchange = workspace.exchange_dir()?;
        let restored = self
            .session
            .inpaint(
                &frames,
                &masks,
                self.config.inpaint.neighbor_stride,
                &exchange,
            )
            .await?;

        Ok((restored, true, None))
    }
}
