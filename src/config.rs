//! Configuration for the overlay engine

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Serializable color representation for config storage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Default for ShapeColor {
    fn default() -> Self {
        Self {
            r: 0.9,
            g: 0.1,
            b: 0.1,
        }
    }
}

impl ShapeColor {
    pub const BLACK: ShapeColor = ShapeColor {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    /// Convert to image crate RGBA format (0-255)
    pub fn to_rgba_u8(self) -> [u8; 4] {
        [
            (self.r.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.g.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.b.clamp(0.0, 1.0) * 255.0).round() as u8,
            255,
        ]
    }
}

/// Engine configuration persisted between sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of undo entries kept per session
    pub undo_capacity: usize,
    /// Gap between selection and toolbar in logical pixels
    pub toolbar_margin: f64,
    /// Distance from the selection's bottom-right corner used to pick the toolbar's screen
    pub screen_probe_inset: f64,
    /// Arrow-key nudge distance
    pub nudge_step: f64,
    /// Nudge distance with the modifier held
    pub nudge_step_large: f64,
    /// Offset applied to pasted and duplicated annotations
    pub paste_offset: f64,
    /// Color for new shape annotations
    pub shape_color: ShapeColor,
    /// Whether new shapes get a shadow/border
    pub shape_shadow: bool,
    /// Pixelation block size (range 4-64)
    pub pixelation_block_size: u32,
    /// Font size for new text annotations
    pub text_size: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            undo_capacity: 50,
            toolbar_margin: 8.0,
            screen_probe_inset: 2.0,
            nudge_step: 1.0,
            nudge_step_large: 10.0,
            paste_offset: 10.0,
            shape_color: ShapeColor::default(),
            shape_shadow: true,
            pixelation_block_size: 16,
            text_size: 16.0,
        }
    }
}

impl EngineConfig {
    /// Application directory name under the platform config dir
    pub const APP_DIR: &'static str = "snapframe";
    const FILE_NAME: &'static str = "config.json";

    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(Self::APP_DIR).join(Self::FILE_NAME))
    }

    /// Load configuration from disk, or return defaults if unavailable
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                log::warn!("Could not determine config directory, using defaults");
                Self::default()
            }
        }
    }

    /// Load configuration from a specific file, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::read(path) {
            Ok(config) => config.sanitized(),
            Err(err) => {
                log::warn!("Error loading config, using defaults: {:?}", err);
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to disk
    pub fn save(&self) {
        let Some(path) = Self::default_path() else {
            log::error!("Could not determine config directory for saving");
            return;
        };
        if let Err(err) = self.save_to(&path) {
            log::error!("Failed to save config: {:?}", err);
        }
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    /// Clamp out-of-range values loaded from disk
    fn sanitized(mut self) -> Self {
        if self.undo_capacity == 0 {
            log::warn!("undo_capacity of 0 is not allowed, using 1");
            self.undo_capacity = 1;
        }
        self.pixelation_block_size = self.pixelation_block_size.clamp(4, 64);
        self.toolbar_margin = self.toolbar_margin.max(0.0);
        self.screen_probe_inset = self.screen_probe_inset.max(0.0);
        self
    }
}
