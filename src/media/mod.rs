//! # Media Module
//!
//! Stream probing, frame/mask buffer types, and the typed subprocess capability
//! wrapping the external ffmpeg tools.

pub mod command;
pub mod probe;
pub mod types;

pub use types::{Frame, Mask, Orientation, StreamInfo, WatermarkRegion};
