use image::{GrayImage, ImageBuffer, Rgb, RgbImage};
use serde::{
    de::{Deserializer, Error as DeError},
    ser::{SerializeSeq, Serializer},
    Deserialize, Serialize,
};
use std::path::Path;

/// Represents a single video frame
///
/// A thin wrapper around an RGB image buffer. Frames are 0-indexed elements of a
/// video's image sequence; sequence order is the single source of temporal truth,
/// so masks and inpainted output always align to frames by index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    buffer: RgbImage,
}

impl Frame {
    /// Create a new frame from an RGB image buffer
    pub fn new(buffer: RgbImage) -> Self {
        Self { buffer }
    }

    /// Create a new frame with the given dimensions filled with the specified color
    pub fn new_filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        let buffer = ImageBuffer::from_fn(width, height, |_, _| Rgb(color));
        Self { buffer }
    }

    /// Create a frame from packed RGB bytes (3 bytes per pixel, row-major)
    pub fn from_rgb_bytes(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        ImageBuffer::from_raw(width, height, data).map(|buffer| Self { buffer })
    }

    /// Load a frame from an image file, converting to RGB
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, image::ImageError> {
        let image = image::open(path)?;
        Ok(Self {
            buffer: image.to_rgb8(),
        })
    }

    /// Get the width of the frame
    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    /// Get the height of the frame
    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// Get a pixel at the given coordinates (returns RGB array)
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let pixel = self.buffer.get_pixel(x, y);
        [pixel[0], pixel[1], pixel[2]]
    }

    /// Set a pixel at the given coordinates
    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 3]) {
        self.buffer.put_pixel(x, y, Rgb(color));
    }

    /// Get the underlying image buffer
    pub fn as_image(&self) -> &RgbImage {
        &self.buffer
    }

    /// View the frame as packed RGB bytes
    pub fn as_rgb_bytes(&self) -> &[u8] {
        self.buffer.as_raw()
    }

    /// Save the frame as a PNG file
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<(), image::ImageError> {
        self.buffer.save(path)
    }
}

/// A per-frame binary occlusion mask
///
/// Same dimensions as its frame; a pixel is either clear (0) or occluded (255).
/// Masks are pure functions of frame geometry and the configured watermark
/// regions, never of frame content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    buffer: GrayImage,
}

impl Mask {
    /// Create an all-clear mask with the given dimensions
    pub fn new_blank(width: u32, height: u32) -> Self {
        Self {
            buffer: GrayImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// Mark the inclusive rectangle `[x0, x1] x [y0, y1]` as occluded.
    ///
    /// Coordinates must already be clamped to the mask bounds; overlapping
    /// rectangles union rather than overwrite.
    pub fn fill_rect(&mut self, x0: u32, y0: u32, x1: u32, y1: u32) {
        for y in y0..=y1 {
            for x in x0..=x1 {
                self.buffer.put_pixel(x, y, image::Luma([255u8]));
            }
        }
    }

    /// Whether the pixel at the given coordinates is occluded
    pub fn is_set(&self, x: u32, y: u32) -> bool {
        self.buffer.get_pixel(x, y)[0] != 0
    }

    /// True when no pixel is occluded
    pub fn is_blank(&self) -> bool {
        self.buffer.as_raw().iter().all(|&v| v == 0)
    }

    /// Get the underlying grayscale buffer
    pub fn as_image(&self) -> &GrayImage {
        &self.buffer
    }

    /// Save the mask as a PNG file
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<(), image::ImageError> {
        self.buffer.save(path)
    }
}

/// Frame orientation classification, used to select the applicable watermark
/// region profile. Square frames count as landscape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Landscape,
    Portrait,
}

impl Orientation {
    /// Classify from pixel dimensions: landscape iff `width >= height`
    pub fn of_dimensions(width: u32, height: u32) -> Self {
        if width >= height {
            Self::Landscape
        } else {
            Self::Portrait
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Landscape => "landscape",
            Self::Portrait => "portrait",
        }
    }
}

/// A configured rectangular watermark area in pixel coordinates of the original
/// frame, inclusive on both corners.
///
/// Serialized as a 4-element array `[xmin, ymin, xmax, ymax]` so region lists
/// read naturally in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatermarkRegion {
    pub xmin: u32,
    pub ymin: u32,
    pub xmax: u32,
    pub ymax: u32,
}

impl WatermarkRegion {
    pub fn new(xmin: u32, ymin: u32, xmax: u32, ymax: u32) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// A region is well-formed when both corner orderings hold
    pub fn is_valid(&self) -> bool {
        self.xmin <= self.xmax && self.ymin <= self.ymax
    }
}

impl Serialize for WatermarkRegion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(4))?;
        seq.serialize_element(&self.xmin)?;
        seq.serialize_element(&self.ymin)?;
        seq.serialize_element(&self.xmax)?;
        seq.serialize_element(&self.ymax)?;
        seq.end()
    }
}

impl<'de> Deserialize<'de> for WatermarkRegion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let values = <Vec<u32>>::deserialize(deserializer)?;
        if values.len() != 4 {
            return Err(D::Error::custom(format!(
                "watermark region needs 4 coordinates, got {}",
                values.len()
            )));
        }
        Ok(Self {
            xmin: values[0],
            ymin: values[1],
            xmax: values[2],
            ymax: values[3],
        })
    }
}

/// Stream metadata derived once per input video by the probe; immutable after.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    /// Evaluated frame rate
    pub fps: f64,
    /// Frame rate numerator/denominator as reported by the container, kept so
    /// the encoder receives the exact rational rather than a rounded float
    pub fps_rational: (u32, u32),
    pub has_audio: bool,
    pub orientation: Orientation,
}

impl StreamInfo {
    /// Frame rate in ffmpeg's `num/den` argument form
    pub fn frame_rate_arg(&self) -> String {
        format!("{}/{}", self.fps_rational.0, self.fps_rational.1)
    }

    /// Byte length of one packed RGB frame
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}
