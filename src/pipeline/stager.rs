//! Frame staging strategies.
//!
//! Both strategies satisfy the same contract: stage a video into a finite,
//! order-preserving, index-addressable RGB frame sequence, then release any
//! backing storage on `unstage`. The strategy is chosen once from configuration;
//! downstream stages never inspect which one is in use.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::{StagingConfig, StagingStrategy};
use crate::error::DecodeError;
use crate::media::command;
use crate::media::types::{Frame, StreamInfo};

/// Frame staging capability
pub trait FrameStager: Send {
    /// Short strategy name for logging
    fn strategy(&self) -> &'static str;

    /// Materialize the video's frames in sequence order.
    ///
    /// `frames_dir` is the workspace area available for staged files; the
    /// in-memory strategy ignores it.
    fn stage(
        &mut self,
        input: &Path,
        info: &StreamInfo,
        frames_dir: &Path,
    ) -> Result<Vec<Frame>, DecodeError>;

    /// Release any backing storage. Idempotent.
    fn unstage(&mut self) -> Result<(), DecodeError>;
}

/// Construct the stager selected by configuration
pub fn for_config(config: &StagingConfig) -> Box<dyn FrameStager> {
    match config.strategy {
        StagingStrategy::Memory => Box::new(InMemoryStager::new()),
        StagingStrategy::Disk => Box::new(DiskStager::new(config.index_pad, config.parallel_loads)),
    }
}

/// Decodes the entire stream straight into process memory.
///
/// One ffmpeg invocation emits packed RGB frames on stdout; the byte stream is
/// chunked into frames. No intermediate files; memory cost is frame count times
/// frame size.
pub struct InMemoryStager;

impl InMemoryStager {
    pub fn new() -> Self {
        Self
    }
}

impl Default for InMemoryStager {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameStager for InMemoryStager {
    fn strategy(&self) -> &'static str {
        "memory"
    }

    fn stage(
        &mut self,
        input: &Path,
        info: &StreamInfo,
        _frames_dir: &Path,
    ) -> Result<Vec<Frame>, DecodeError> {
        let input_str = input.display().to_string();

        let output = command::run(
            "ffmpeg",
            &[
                "-v",
                "error",
                "-i",
                &input_str,
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgb24",
                "-",
            ],
        )
        .map_err(|error| DecodeError::CommandFailed {
            reason: error.to_string(),
        })?;

        if !output.success() {
            return Err(DecodeError::DecodeFailed {
                path: input_str,
                stderr: output.stderr_tail(),
            });
        }

        let frames = chunk_raw_frames(info.width, info.height, output.stdout)?;
        if frames.is_empty() {
            return Err(DecodeError::EmptyStream { path: input_str });
        }

        info!("decoded {} frames into memory", frames.len());
        Ok(frames)
    }

    fn unstage(&mut self) -> Result<(), DecodeError> {
        // Frames are handed out by value; nothing is retained here
        Ok(())
    }
}

/// Stages frames as sequentially numbered image files in the workspace.
///
/// An external ffmpeg call emits one file per frame at the requested rate; the
/// sequence is reconstructed by lexicographic filename sort, which the
/// zero-padded numbering makes equal to numeric order.
pub struct DiskStager {
    index_pad: usize,
    parallel_loads: usize,
    staged_dir: Option<PathBuf>,
}

impl DiskStager {
    pub fn new(index_pad: usize, parallel_loads: usize) -> Self {
        Self {
            index_pad,
            parallel_loads,
            staged_dir: None,
        }
    }
}

impl FrameStager for DiskStager {
    fn strategy(&self) -> &'static str {
        "disk"
    }

    fn stage(
        &mut self,
        input: &Path,
        info: &StreamInfo,
        frames_dir: &Path,
    ) -> Result<Vec<Frame>, DecodeError> {
        let input_str = input.display().to_string();
        let pattern = frames_dir
            .join(format!("%0{}d.png", self.index_pad))
            .display()
            .to_string();

        let output = command::run(
            "ffmpeg",
            &[
                "-v",
                "error",
                "-i",
                &input_str,
                "-r",
                &info.frame_rate_arg(),
                "-y",
                &pattern,
            ],
        )
        .map_err(|error| DecodeError::CommandFailed {
            reason: error.to_string(),
        })?;

        if !output.success() {
            return Err(DecodeError::DecodeFailed {
                path: input_str,
                stderr: output.stderr_tail(),
            });
        }

        self.staged_dir = Some(frames_dir.to_path_buf());

        let paths = sorted_frame_paths(frames_dir).map_err(|error| DecodeError::FrameLoadFailed {
            path: frames_dir.display().to_string(),
            reason: error.to_string(),
        })?;

        if paths.is_empty() {
            return Err(DecodeError::EmptyStream { path: input_str });
        }

        // Numbering past the padding width would break lexicographic ordering,
        // so an overflow is an error rather than a silently shuffled sequence.
        let cap = 10usize.pow(self.index_pad as u32) - 1;
        if paths.len() > cap {
            return Err(DecodeError::FrameIndexOverflow {
                count: paths.len(),
                cap,
                pad: self.index_pad,
            });
        }

        debug!(
            "loading {} staged frames with {} parallel readers",
            paths.len(),
            self.parallel_loads
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.parallel_loads)
            .build()
            .map_err(|error| DecodeError::FrameLoadFailed {
                path: frames_dir.display().to_string(),
                reason: error.to_string(),
            })?;

        let frames = pool.install(|| {
            paths
                .par_iter()
                .map(|path| {
                    Frame::load(path).map_err(|error| DecodeError::FrameLoadFailed {
                        path: path.display().to_string(),
                        reason: error.to_string(),
                    })
                })
                .collect::<Result<Vec<Frame>, DecodeError>>()
        })?;

        info!("staged {} frames to {}", frames.len(), frames_dir.display());
        Ok(frames)
    }

    fn unstage(&mut self) -> Result<(), DecodeError> {
        if let Some(dir) = self.staged_dir.take() {
            match std::fs::remove_dir_all(&dir) {
                Ok(()) => debug!("removed staged frames in {}", dir.display()),
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
                Err(error) => {
                    return Err(DecodeError::FrameLoadFailed {
                        path: dir.display().to_string(),
                        reason: error.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Split a packed RGB byte stream into frames
fn chunk_raw_frames(width: u32, height: u32, data: Vec<u8>) -> Result<Vec<Frame>, DecodeError> {
    let frame_bytes = width as usize * height as usize * 3;
    let complete = data.len() / frame_bytes;
    let trailing = data.len() % frame_bytes;

    if trailing != 0 {
        return Err(DecodeError::TruncatedStream {
            frames: complete,
            trailing,
        });
    }

    let mut frames = Vec::with_capacity(complete);
    for chunk in data.chunks_exact(frame_bytes) {
        // from_rgb_bytes only fails on a length mismatch, which chunks_exact rules out
        match Frame::from_rgb_bytes(width, height, chunk.to_vec()) {
            Some(frame) => frames.push(frame),
            None => {
                return Err(DecodeError::TruncatedStream {
                    frames: frames.len(),
                    trailing: chunk.len(),
                })
            }
        }
    }
    Ok(frames)
}

/// Staged frame files in sequence order (lexicographic filename sort)
pub(crate) fn sorted_frame_paths(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("png"))
                .unwrap_or(false)
        })
        .collect();

    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn chunks_raw_stream_into_frames() {
        let frame_bytes = 2 * 2 * 3;
        let data: Vec<u8> = (0..frame_bytes * 3).map(|v| (v % 251) as u8).collect();

        let frames = chunk_raw_frames(2, 2, data.clone()).unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].as_rgb_bytes(), &data[..frame_bytes]);
        assert_eq!(frames[2].as_rgb_bytes(), &data[frame_bytes * 2..]);
    }

    #[test]
    fn trailing_bytes_are_a_truncated_stream() {
        let data = vec![0u8; 2 * 2 * 3 + 5];
        let result = chunk_raw_frames(2, 2, data);
        assert!(matches!(
            result,
            Err(DecodeError::TruncatedStream {
                frames: 1,
                trailing: 5
            })
        ));
    }

    #[test]
    fn empty_stream_yields_no_frames() {
        let frames = chunk_raw_frames(2, 2, Vec::new()).unwrap();
        assert!(frames.is_empty());
    }

    #[test]
    fn zero_padded_names_sort_numerically() {
        let dir = tempdir().unwrap();

        // Created out of order on purpose; 1..=12 crosses the point where
        // unpadded names would sort 1, 10, 11, 12, 2, ...
        for index in [3usize, 12, 1, 10, 7, 2, 11, 4, 5, 9, 6, 8] {
            std::fs::write(dir.path().join(format!("{:04}.png", index)), b"x").unwrap();
        }
        std::fs::write(dir.path().join("manifest.txt"), b"ignored").unwrap();

        let paths = sorted_frame_paths(dir.path()).unwrap();
        let names: Vec<String> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();

        let expected: Vec<String> = (1..=12).map(|i| format!("{:04}.png", i)).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn strategy_selection_from_config() {
        let mut config = StagingConfig::default();
        config.strategy = StagingStrategy::Memory;
        assert_eq!(for_config(&config).strategy(), "memory");

        config.strategy = StagingStrategy::Disk;
        assert_eq!(for_config(&config).strategy(), "disk");
    }

    #[test]
    fn disk_unstage_is_idempotent() {
        let dir = tempdir().unwrap();
        let staged = dir.path().join("frames");
        std::fs::create_dir_all(&staged).unwrap();
        std::fs::write(staged.join("0001.png"), b"x").unwrap();

        let mut stager = DiskStager::new(4, 2);
        stager.staged_dir = Some(staged.clone());

        stager.unstage().unwrap();
        assert!(!staged.exists());
        stager.unstage().unwrap();
    }
}
