//! Stream probing via `ffprobe -print_format json`.
//!
//! Derives the per-video [`StreamInfo`]: dimensions, frame rate (with rational
//! provenance), audio presence and orientation. Probing happens exactly once per
//! input; everything downstream treats the result as immutable.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ProbeError;
use crate::media::command;
use crate::media::types::{Orientation, StreamInfo};

/// Frame rate assumed when the container reports a rate we cannot parse.
///
/// A malformed rate must not fail the probe: downstream encode correctness
/// matters more than exact rate fidelity when metadata is broken.
const FALLBACK_FPS: (u32, u32) = (30, 1);

/// Probe a video file for stream metadata
pub fn probe(path: &Path) -> Result<StreamInfo, ProbeError> {
    let path_str = path.display().to_string();

    let output = command::run(
        "ffprobe",
        &[
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            &path_str,
        ],
    )
    .map_err(|error| ProbeError::CommandFailed {
        reason: error.to_string(),
    })?;

    if !output.success() {
        return Err(ProbeError::ProbeFailed {
            status: output.status,
            stderr: output.stderr_tail(),
        });
    }

    let json: Value =
        serde_json::from_slice(&output.stdout).map_err(|error| ProbeError::InvalidMetadata {
            path: path_str.clone(),
            detail: format!("invalid ffprobe output: {}", error),
        })?;

    parse_probe_output(&json, &path_str)
}

/// Extract [`StreamInfo`] from parsed ffprobe JSON
fn parse_probe_output(json: &Value, path: &str) -> Result<StreamInfo, ProbeError> {
    let streams = json
        .get("streams")
        .and_then(|s| s.as_array())
        .ok_or_else(|| ProbeError::InvalidMetadata {
            path: path.to_string(),
            detail: "no streams array".to_string(),
        })?;

    let video = streams
        .iter()
        .find(|stream| stream_type(stream) == Some("video"))
        .ok_or_else(|| ProbeError::NoVideoStream {
            path: path.to_string(),
        })?;

    let width = video
        .get("width")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| ProbeError::InvalidMetadata {
            path: path.to_string(),
            detail: "video stream missing width".to_string(),
        })? as u32;

    let height = video
        .get("height")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| ProbeError::InvalidMetadata {
            path: path.to_string(),
            detail: "video stream missing height".to_string(),
        })? as u32;

    if width == 0 || height == 0 {
        return Err(ProbeError::InvalidMetadata {
            path: path.to_string(),
            detail: format!("degenerate dimensions {}x{}", width, height),
        });
    }

    // The container's average rate matches the stream as a whole better than
    // r_frame_rate, which reports the smallest interval seen.
    let fps_rational = video
        .get("avg_frame_rate")
        .and_then(|v| v.as_str())
        .and_then(parse_rational)
        .or_else(|| {
            video
                .get("r_frame_rate")
                .and_then(|v| v.as_str())
                .and_then(parse_rational)
        })
        .unwrap_or_else(|| {
            warn!(
                "could not parse frame rate for {}, assuming {}fps",
                path, FALLBACK_FPS.0
            );
            FALLBACK_FPS
        });

    let has_audio = streams
        .iter()
        .any(|stream| stream_type(stream) == Some("audio"));

    let info = StreamInfo {
        width,
        height,
        fps: fps_rational.0 as f64 / fps_rational.1 as f64,
        fps_rational,
        has_audio,
        orientation: Orientation::of_dimensions(width, height),
    };

    debug!(
        "probed {}: {}x{} @ {:.3}fps, audio={}, {}",
        path,
        info.width,
        info.height,
        info.fps,
        info.has_audio,
        info.orientation.as_str()
    );

    Ok(info)
}

fn stream_type(stream: &Value) -> Option<&str> {
    stream.get("codec_type").and_then(|v| v.as_str())
}

/// Parse a frame rate like `"30000/1001"` or `"25"` into a positive rational
fn parse_rational(rate: &str) -> Option<(u32, u32)> {
    let (num, den) = match rate.split_once('/') {
        Some((num, den)) => (num.parse().ok()?, den.parse().ok()?),
        None => (rate.parse().ok()?, 1),
    };
    if num == 0 || den == 0 {
        return None;
    }
    Some((num, den))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe_json(streams: &str) -> Value {
        serde_json::from_str(&format!("{{\"streams\": [{}]}}", streams)).unwrap()
    }

    const VIDEO_NTSC: &str = r#"{"codec_type": "video", "width": 1920, "height": 1080,
        "avg_frame_rate": "30000/1001", "r_frame_rate": "30000/1001"}"#;
    const AUDIO_AAC: &str = r#"{"codec_type": "audio", "codec_name": "aac"}"#;

    #[test]
    fn parses_video_with_audio() {
        let json = probe_json(&format!("{}, {}", VIDEO_NTSC, AUDIO_AAC));
        let info = parse_probe_output(&json, "clip.mp4").unwrap();

        assert_eq!(info.width, 1920);
        assert_eq!(info.height, 1080);
        assert_eq!(info.fps_rational, (30000, 1001));
        assert!((info.fps - 29.97).abs() < 0.01);
        assert!(info.has_audio);
        assert_eq!(info.orientation, Orientation::Landscape);
    }

    #[test]
    fn detects_missing_audio_and_portrait() {
        let json = probe_json(
            r#"{"codec_type": "video", "width": 1080, "height": 1920, "avg_frame_rate": "25/1"}"#,
        );
        let info = parse_probe_output(&json, "clip.mp4").unwrap();

        assert!(!info.has_audio);
        assert_eq!(info.orientation, Orientation::Portrait);
        assert_eq!(info.fps, 25.0);
    }

    #[test]
    fn malformed_rate_falls_back_instead_of_failing() {
        let json = probe_json(
            r#"{"codec_type": "video", "width": 640, "height": 480,
                "avg_frame_rate": "0/0", "r_frame_rate": "garbage"}"#,
        );
        let info = parse_probe_output(&json, "clip.mp4").unwrap();
        assert_eq!(info.fps_rational, FALLBACK_FPS);
    }

    #[test]
    fn degenerate_average_rate_uses_real_rate() {
        let json = probe_json(
            r#"{"codec_type": "video", "width": 640, "height": 480,
                "avg_frame_rate": "0/0", "r_frame_rate": "24/1"}"#,
        );
        let info = parse_probe_output(&json, "clip.mp4").unwrap();
        assert_eq!(info.fps_rational, (24, 1));
    }

    #[test]
    fn audio_only_file_is_an_error() {
        let json = probe_json(AUDIO_AAC);
        let result = parse_probe_output(&json, "song.mp4");
        assert!(matches!(result, Err(ProbeError::NoVideoStream { .. })));
    }

    #[test]
    fn missing_dimensions_are_an_error() {
        let json = probe_json(r#"{"codec_type": "video", "avg_frame_rate": "25/1"}"#);
        let result = parse_probe_output(&json, "clip.mp4");
        assert!(matches!(result, Err(ProbeError::InvalidMetadata { .. })));
    }

    #[test]
    fn rational_parsing() {
        assert_eq!(parse_rational("30000/1001"), Some((30000, 1001)));
        assert_eq!(parse_rational("25"), Some((25, 1)));
        assert_eq!(parse_rational("0/0"), None);
        assert_eq!(parse_rational("x/y"), None);
        assert_eq!(parse_rational(""), None);
    }
}
