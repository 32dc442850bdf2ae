//! # Clearmark
//!
//! Remove burned-in watermarks from video footage with temporal inpainting while
//! preserving the original audio track and timing.
//!
//! The crate is the frame pipeline and staging layer around two external
//! capabilities: the ffmpeg tools for probing/decoding/encoding containers, and
//! an inference runner for the inpainting network itself. Frames are staged
//! (in memory or on disk), occlusion masks are rasterized from configured
//! watermark regions, the inpainting capability is driven over a sliding
//! temporal window, and the result is re-encoded with the source audio
//! copy-muxed in.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use clearmark::{
//!     batch::BatchDriver,
//!     config::Config,
//!     pipeline::{CleanerPipeline, InpaintSession},
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = Config::default();
//! let session = Arc::new(InpaintSession::from_config(
//!     &config.inpaint,
//!     config.staging.index_pad,
//! ));
//! let pipeline = CleanerPipeline::new(config, session);
//!
//! let driver = BatchDriver::new(true);
//! driver.run_single(&pipeline, Path::new("clip.mp4")).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`media`] - Stream probing, frame/mask types, ffmpeg subprocess capability
//! - [`pipeline`] - Staging strategies, mask builder, inpaint orchestration, reassembly
//! - [`batch`] - Directory/single-file driver with per-file failure isolation
//! - [`config`] - Configuration management
//!
//! ## Custom Inpainting Backends
//!
//! The inference capability sits behind the
//! [`InpaintBackend`](pipeline::InpaintBackend) trait, so a different network
//! integration only has to implement three methods:
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use clearmark::error::InferenceError;
//! use clearmark::media::{Frame, Mask};
//! use clearmark::pipeline::InpaintBackend;
//!
//! struct MyBackend;
//!
//! impl InpaintBackend for MyBackend {
//!     fn name(&self) -> &'static str {
//!         "my_backend"
//!     }
//!
//!     fn load(&self) -> Result<(), InferenceError> {
//!         Ok(())
//!     }
//!
//!     fn infer(
//!         &self,
//!         frames: &[Frame],
//!         masks: &[Mask],
//!         exchange: &Path,
//!     ) -> Result<Vec<Frame>, InferenceError> {
//!         // Your inference integration
//!         Ok(frames.to_vec())
//!     }
//! }
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod media;
pub mod pipeline;

// Re-export commonly used types for convenience
pub use crate::{
    batch::{BatchDriver, BatchReport},
    config::Config,
    error::{CleanerError, Result},
    pipeline::{CleanerPipeline, InpaintBackend, InpaintSession},
};
