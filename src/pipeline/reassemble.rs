//! Output reassembly.
//!
//! Re-encodes the processed frame sequence at the original frame rate and, when
//! the source has an audio track, copy-muxes its packets into the output
//! container without re-encoding. Output duration follows the shortest
//! constituent stream, so audio can never run past the processed video.

use std::io::Write;
use std::path::Path;

use tracing::{info, warn};

use crate::config::EncodeConfig;
use crate::error::EncodeError;
use crate::media::command;
use crate::media::types::{Frame, StreamInfo};

/// Encodes frame sequences back into audio-preserving containers
#[derive(Debug, Clone)]
pub struct Reassembler {
    encode: EncodeConfig,
}

impl Reassembler {
    pub fn new(encode: EncodeConfig) -> Self {
        Self { encode }
    }

    /// Encode `frames` to `output`, copy-muxing audio from `audio_source` when
    /// present.
    ///
    /// All frames must share the first frame's dimensions. On encoder failure
    /// any partially-written output file is removed, so an existing output path
    /// always means a completed reassembly.
    pub fn write_video(
        &self,
        frames: &[Frame],
        info: &StreamInfo,
        audio_source: Option<&Path>,
        output: &Path,
    ) -> Result<(), EncodeError> {
        let (width, height) = validate_dimensions(frames)?;

        let audio = audio_source.filter(|_| info.has_audio);
        let audio_str = audio.map(|path| path.display().to_string());
        let output_str = output.display().to_string();

        let args = encoder_args(
            &self.encode,
            info,
            width,
            height,
            audio_str.as_deref(),
            &output_str,
        );
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();

        let result = command::run_with_stdin("ffmpeg", &arg_refs, |stdin| {
            for frame in frames {
                stdin.write_all(frame.as_rgb_bytes())?;
            }
            Ok(())
        })
        .map_err(|error| EncodeError::CommandFailed {
            reason: error.to_string(),
        })?;

        if !result.success() {
            if let Err(error) = std::fs::remove_file(output) {
                if error.kind() != std::io::ErrorKind::NotFound {
                    warn!("could not remove partial output {}: {}", output_str, error);
                }
            }
            return Err(EncodeError::EncoderFailed {
                stderr: result.stderr_tail(),
            });
        }

        info!(
            "wrote {} frames @ {} to {}{}",
            frames.len(),
            info.frame_rate_arg(),
            output_str,
            if audio.is_some() { " (audio copied)" } else { "" }
        );
        Ok(())
    }
}

/// Check that every frame matches the first frame's dimensions
fn validate_dimensions(frames: &[Frame]) -> Result<(u32, u32), EncodeError> {
    let first = frames.first().ok_or(EncodeError::NoFrames)?;
    let (width, height) = (first.width(), first.height());

    for (index, frame) in frames.iter().enumerate() {
        if frame.width() != width || frame.height() != height {
            return Err(EncodeError::DimensionMismatch {
                index,
                width,
                height,
                actual_width: frame.width(),
                actual_height: frame.height(),
            });
        }
    }

    Ok((width, height))
}

/// Build the single ffmpeg invocation: raw RGB on stdin, optional audio source
/// as a second input with its packets copied, `-shortest` so the output
/// truncates to the shorter stream, and an even-dimension pad for the codec.
fn encoder_args(
    encode: &EncodeConfig,
    info: &StreamInfo,
    width: u32,
    height: u32,
    audio_source: Option<&str>,
    output: &str,
) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-v".into(),
        "error".into(),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "rgb24".into(),
        "-s".into(),
        format!("{}x{}", width, height),
        "-r".into(),
        info.frame_rate_arg(),
        "-i".into(),
        "-".into(),
    ];

    if let Some(audio) = audio_source {
        args.extend([
            "-i".into(),
            audio.to_string(),
            "-map".into(),
            "0:v:0".into(),
            "-map".into(),
            "1:a:0".into(),
            "-c:a".into(),
            "copy".into(),
        ]);
    }

    args.extend([
        "-c:v".into(),
        encode.codec.clone(),
        "-pix_fmt".into(),
        encode.pixel_format.clone(),
        "-crf".into(),
        encode.crf().to_string(),
        "-vf".into(),
        "pad=ceil(iw/2)*2:ceil(ih/2)*2".into(),
    ]);

    if audio_source.is_some() {
        args.push("-shortest".into());
    }

    args.extend(["-y".into(), output.to_string()]);
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::types::Orientation;

    fn test_info(has_audio: bool) -> StreamInfo {
        StreamInfo {
            width: 640,
            height: 480,
            fps: 25.0,
            fps_rational: (25, 1),
            has_audio,
            orientation: Orientation::Landscape,
        }
    }

    #[test]
    fn uniform_dimensions_pass() {
        let frames = vec![Frame::new_filled(640, 480, [0, 0, 0]); 3];
        assert_eq!(validate_dimensions(&frames).unwrap(), (640, 480));
    }

    #[test]
    fn mismatched_frame_is_reported_with_index() {
        let mut frames = vec![Frame::new_filled(640, 480, [0, 0, 0]); 3];
        frames[2] = Frame::new_filled(320, 240, [0, 0, 0]);

        let error = validate_dimensions(&frames).unwrap_err();
        assert!(matches!(
            error,
            EncodeError::DimensionMismatch {
                index: 2,
                actual_width: 320,
                ..
            }
        ));
    }

    #[test]
    fn empty_sequence_is_rejected() {
        assert!(matches!(
            validate_dimensions(&[]),
            Err(EncodeError::NoFrames)
        ));
    }

    #[test]
    fn audio_source_adds_copy_mux_and_shortest() {
        let args = encoder_args(
            &EncodeConfig::default(),
            &test_info(true),
            640,
            480,
            Some("input.mp4"),
            "out.mp4",
        );

        let has = |flag: &str| args.iter().any(|a| a == flag);
        assert!(has("-shortest"));
        assert!(has("copy"));
        assert!(has("1:a:0"));
        assert!(args.windows(2).any(|w| w[0] == "-c:a" && w[1] == "copy"));
    }

    #[test]
    fn silent_source_encodes_video_only() {
        let args = encoder_args(
            &EncodeConfig::default(),
            &test_info(false),
            640,
            480,
            None,
            "out.mp4",
        );

        assert!(!args.iter().any(|a| a == "-shortest"));
        assert!(!args.iter().any(|a| a == "-c:a"));
        assert!(args.windows(2).any(|w| w[0] == "-s" && w[1] == "640x480"));
        assert!(args.windows(2).any(|w| w[0] == "-r" && w[1] == "25/1"));
    }

    #[test]
    fn odd_dimensions_get_pad_filter() {
        let args = encoder_args(
            &EncodeConfig::default(),
            &test_info(false),
            641,
            479,
            None,
            "out.mp4",
        );
        assert!(args
            .windows(2)
            .any(|w| w[0] == "-vf" && w[1].starts_with("pad=")));
    }
}
