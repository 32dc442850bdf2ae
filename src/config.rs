use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{
    error::{ConfigError, Result},
    media::types::{Orientation, WatermarkRegion},
};

/// Main configuration for clearmark
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Watermark region profiles and mask geometry
    pub watermark: WatermarkConfig,

    /// Inpainting capability settings
    pub inpaint: InpaintConfig,

    /// Frame staging settings
    pub staging: StagingConfig,

    /// Output encoding settings
    pub encode: EncodeConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|_| ConfigError::ParseFailed {
            path: path.display().to_string(),
        })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue {
            key: "config".to_string(),
            value: e.to_string(),
        })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.watermark.validate()?;
        self.inpaint.validate()?;
        self.staging.validate()?;
        self.encode.validate()?;
        Ok(())
    }
}

/// Watermark region profiles, selected per stream orientation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkConfig {
    /// Regions applied to landscape streams, `[xmin, ymin, xmax, ymax]` each
    pub positions_landscape: Vec<WatermarkRegion>,

    /// Regions applied to portrait streams
    pub positions_portrait: Vec<WatermarkRegion>,

    /// Margin added to every region side before clamping to frame bounds
    pub mask_expand: u32,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            positions_landscape: Vec::new(),
            positions_portrait: Vec::new(),
            mask_expand: 20,
        }
    }
}

impl WatermarkConfig {
    /// The region profile applicable to the given orientation
    pub fn regions_for(&self, orientation: Orientation) -> &[WatermarkRegion] {
        match orientation {
            Orientation::Landscape => &self.positions_landscape,
            Orientation::Portrait => &self.positions_portrait,
        }
    }

    fn validate(&self) -> Result<()> {
        for (profile, regions) in [
            ("positions_landscape", &self.positions_landscape),
            ("positions_portrait", &self.positions_portrait),
        ] {
            for region in regions {
                if !region.is_valid() {
                    return Err(ConfigError::InvalidValue {
                        key: format!("watermark.{}", profile),
                        value: format!(
                            "[{}, {}, {}, {}]",
                            region.xmin, region.ymin, region.xmax, region.ymax
                        ),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }
}

/// Inpainting capability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InpaintConfig {
    /// Temporal window spacing handed through to the inference capability
    pub neighbor_stride: usize,

    /// Model checkpoint consumed by the inference runner
    pub checkpoint: PathBuf,

    /// External inference runner program
    pub runner: String,
}

impl Default for InpaintConfig {
    fn default() -> Self {
        Self {
            neighbor_stride: 5,
            checkpoint: PathBuf::from("checkpoints/sttn.pth"),
            runner: "sttn-infer".to_string(),
        }
    }
}

impl InpaintConfig {
    fn validate(&self) -> Result<()> {
        if self.neighbor_stride == 0 {
            return Err(ConfigError::InvalidValue {
                key: "inpaint.neighbor_stride".to_string(),
                value: self.neighbor_stride.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Frame staging strategy selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StagingStrategy {
    /// Decode the whole stream into process memory, no intermediate files
    Memory,
    /// Extract numbered frame files into the per-video workspace
    Disk,
}

impl StagingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Disk => "disk",
        }
    }
}

/// Frame staging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingConfig {
    /// Which staging strategy to use
    pub strategy: StagingStrategy,

    /// Zero-padding width for staged frame filenames. Caps the addressable
    /// frame count at `10^index_pad - 1`; the stager enforces the cap.
    pub index_pad: usize,

    /// Workspace root directory; empty means the system temp dir
    pub workspace_root: PathBuf,

    /// Number of staged frame files loaded in parallel
    pub parallel_loads: usize,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            strategy: StagingStrategy::Memory,
            index_pad: 4,
            workspace_root: PathBuf::new(),
            parallel_loads: num_cpus::get(),
        }
    }
}

impl StagingConfig {
    /// Highest frame count addressable by the configured padding width
    pub fn frame_cap(&self) -> usize {
        10usize.pow(self.index_pad as u32) - 1
    }

    /// Workspace root with the system temp dir as the fallback
    pub fn resolve_workspace_root(&self) -> PathBuf {
        if self.workspace_root.as_os_str().is_empty() {
            std::env::temp_dir().join(format!("clearmark-{}", std::process::id()))
        } else {
            self.workspace_root.clone()
        }
    }

    fn validate(&self) -> Result<()> {
        if !(4..=9).contains(&self.index_pad) {
            return Err(ConfigError::InvalidValue {
                key: "staging.index_pad".to_string(),
                value: self.index_pad.to_string(),
            }
            .into());
        }

        if self.parallel_loads == 0 {
            return Err(ConfigError::InvalidValue {
                key: "staging.parallel_loads".to_string(),
                value: self.parallel_loads.to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// Output encoding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeConfig {
    /// Video codec for re-encoded output
    pub codec: String,

    /// Output pixel format
    pub pixel_format: String,

    /// Quality setting (0-100, higher is better), mapped to CRF
    pub quality: u8,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            codec: "libx264".to_string(),
            pixel_format: "yuv420p".to_string(),
            quality: 85,
        }
    }
}

impl EncodeConfig {
    /// Map the 0-100 quality setting onto the encoder's 51-0 CRF scale
    pub fn crf(&self) -> u8 {
        (51 - ((self.quality as f32 / 100.0) * 51.0) as u8).clamp(0, 51)
    }

    fn validate(&self) -> Result<()> {
        if self.quality > 100 {
            return Err(ConfigError::InvalidValue {
                key: "encode.quality".to_string(),
                value: self.quality.to_string(),
            }
            .into());
        }

        if self.codec.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "encode.codec".to_string(),
                value: self.codec.clone(),
            }
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test_config.toml");

        let mut original = Config::default();
        original.watermark.positions_landscape = vec![WatermarkRegion::new(1013, 45, 1176, 79)];
        original.staging.strategy = StagingStrategy::Disk;

        original.save_to_file(&file_path).unwrap();
        let loaded = Config::from_file(&file_path).unwrap();

        assert_eq!(
            original.watermark.positions_landscape,
            loaded.watermark.positions_landscape
        );
        assert_eq!(original.staging.strategy, loaded.staging.strategy);
        assert_eq!(original.inpaint.neighbor_stride, loaded.inpaint.neighbor_stride);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("partial.toml");
        std::fs::write(
            &file_path,
            "[watermark]\npositions_landscape = [[10, 10, 60, 40]]\n",
        )
        .unwrap();

        let config = Config::from_file(&file_path).unwrap();
        assert_eq!(config.watermark.positions_landscape.len(), 1);
        assert_eq!(config.watermark.mask_expand, 20);
        assert_eq!(config.staging.strategy, StagingStrategy::Memory);
    }

    #[test]
    fn test_invalid_neighbor_stride() {
        let mut config = Config::default();
        config.inpaint.neighbor_stride = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_index_pad() {
        let mut config = Config::default();
        config.staging.index_pad = 3;
        assert!(config.validate().is_err());
        config.staging.index_pad = 10;
        assert!(config.validate().is_err());
        config.staging.index_pad = 6;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_inverted_region_rejected() {
        let mut config = Config::default();
        config.watermark.positions_portrait = vec![WatermarkRegion::new(100, 10, 50, 40)];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_regions_for_orientation() {
        let mut config = Config::default();
        config.watermark.positions_landscape = vec![WatermarkRegion::new(0, 0, 10, 10)];

        assert_eq!(
            config.watermark.regions_for(Orientation::Landscape).len(),
            1
        );
        assert!(config
            .watermark
            .regions_for(Orientation::Portrait)
            .is_empty());
    }

    #[test]
    fn test_frame_cap_tracks_padding() {
        let mut staging = StagingConfig::default();
        assert_eq!(staging.frame_cap(), 9_999);
        staging.index_pad = 6;
        assert_eq!(staging.frame_cap(), 999_999);
    }

    #[test]
    fn test_quality_to_crf() {
        let mut encode = EncodeConfig::default();
        encode.quality = 100;
        assert_eq!(encode.crf(), 0);
        encode.quality = 0;
        assert_eq!(encode.crf(), 51);
    }
}
